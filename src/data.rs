use crate::config::AppConfig;
use crate::topology::Topology;
use crate::types::EducationRecord;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::info;

/// Both inputs, parsed. Only built once both loads succeed.
#[derive(Debug, Clone)]
pub struct Datasets {
    pub education: Vec<EducationRecord>,
    pub topology: Topology,
}

pub async fn load_data(config: &AppConfig) -> Result<Datasets> {
    load_with(&reqwest::Client::new(), config).await
}

async fn load_with(client: &reqwest::Client, config: &AppConfig) -> Result<Datasets> {
    info!("Loading data...");
    let (education, topology) = tokio::try_join!(
        fetch_json::<Vec<EducationRecord>>(client, &config.input.education),
        fetch_json::<Topology>(client, &config.input.counties),
    )?;

    info!(
        records = education.len(),
        arcs = topology.arc_count(),
        "Loaded education records and county topology"
    );
    Ok(Datasets {
        education,
        topology,
    })
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Loads `source` (an http(s) URL or a local path) and parses it as JSON.
pub async fn fetch_json<T: DeserializeOwned>(client: &reqwest::Client, source: &str) -> Result<T> {
    if is_url(source) {
        let resp = client
            .get(source)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", source))?
            .error_for_status()
            .with_context(|| format!("Bad response from {}", source))?;
        resp.json::<T>()
            .await
            .with_context(|| format!("Failed to parse JSON from {}", source))
    } else {
        let bytes = tokio::fs::read(source)
            .await
            .with_context(|| format!("Failed to read {}", source))?;
        serde_json::from_slice(&bytes).with_context(|| format!("Failed to parse JSON from {}", source))
    }
}
