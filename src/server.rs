use crate::config::AppConfig;
use crate::render::Choropleth;
use crate::tooltip::{self, Pointer};
use crate::types::{EducationRecord, Fips};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, Json},
    routing::get,
    Router,
};
use geo::{BoundingRect, Contains, Point};
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

// Wrapper for RTree indexing
pub struct CountyIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for CountyIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub struct AppState {
    pub page_html: String,
    pub map: Choropleth,
    pub tree: RTree<CountyIndex>,
    pub by_fips: HashMap<Fips, usize>,
}

impl AppState {
    pub fn new(page_html: String, map: Choropleth) -> Self {
        let items: Vec<CountyIndex> = map
            .pairs
            .iter()
            .enumerate()
            .filter_map(|(index, pair)| {
                let rect = pair.county.geometry.bounding_rect()?;
                Some(CountyIndex {
                    index,
                    aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                })
            })
            .collect();
        let by_fips = map
            .pairs
            .iter()
            .enumerate()
            .map(|(i, pair)| (pair.edu.fips, i))
            .collect();

        Self {
            page_html,
            tree: RTree::bulk_load(items),
            by_fips,
            map,
        }
    }

    fn record(&self, fips: Fips) -> Option<&EducationRecord> {
        self.by_fips.get(&fips).map(|&i| &self.map.pairs[i].edu)
    }
}

#[derive(Deserialize)]
pub struct QueryParams {
    x: f64,
    y: f64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    fips: Fips,
    state: String,
    area_name: String,
    #[serde(rename = "bachelorsOrHigher")]
    bachelors_or_higher: f64,
    color: String,
    /// Value range of the county's color bucket.
    bucket: Option<(f64, f64)>,
}

#[derive(Deserialize)]
pub struct TooltipParams {
    fips: Fips,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TooltipResponse {
    fips: Fips,
    text: String,
    education: f64,
    html: String,
}

pub fn build_app(state: Arc<AppState>, static_dir: &Path) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/query", get(query_handler))
        .route("/api/tooltip", get(tooltip_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: &AppConfig, state: AppState) -> Result<()> {
    info!(counties = state.map.pairs.len(), "Spatial index built");

    let static_dir = config
        .output
        .html
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let app = build_app(Arc::new(state), &static_dir);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.page_html.clone())
}

/// Hit-tests a point in view-box units.
async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<QueryResponse>> {
    let point = Point::new(params.x, params.y);
    let envelope = AABB::from_point([params.x, params.y]);

    for candidate in state.tree.locate_in_envelope_intersecting(&envelope) {
        if let Some(pair) = state.map.pairs.get(candidate.index) {
            if pair.county.geometry.contains(&point) {
                let edu = &pair.edu;
                let color = state.map.scale.color_for(edu.bachelors_or_higher);
                return Json(Some(QueryResponse {
                    fips: edu.fips,
                    state: edu.state.clone(),
                    area_name: edu.area_name.clone(),
                    bachelors_or_higher: edu.bachelors_or_higher,
                    color: color.to_string(),
                    bucket: state.map.scale.invert_extent(color),
                }));
            }
        }
    }

    Json(None)
}

async fn tooltip_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TooltipParams>,
) -> Result<Json<TooltipResponse>, StatusCode> {
    let record = state.record(params.fips).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(TooltipResponse {
        fips: record.fips,
        text: tooltip::message(record),
        education: record.bachelors_or_higher,
        html: tooltip::fragment(record, Pointer { x: params.x, y: params.y }),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::tests::{scenario_datasets, two_color_config};
    use crate::render::{render, Page};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app() -> Router {
        let config = two_color_config();
        let mut page = Page::new(&config.render);
        let container = page.container;
        let map = render(&mut page.doc, container, &scenario_datasets(), &config).unwrap();
        let state = AppState::new(page.to_html(), map);
        build_app(Arc::new(state), Path::new("."))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(uri: &str) -> (StatusCode, Option<T>) {
        let resp = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).ok())
    }

    #[tokio::test]
    async fn serves_rendered_page() {
        let resp = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains(r#"data-fips="2""#));
        assert!(html.contains(r#"id="legend""#));
    }

    #[tokio::test]
    async fn query_hits_county_under_point() {
        let (status, body) = get_json::<Option<QueryResponse>>("/api/query?x=1.5&y=0.5").await;
        assert_eq!(status, StatusCode::OK);
        let hit = body.flatten().unwrap();
        assert_eq!(hit.fips, 2);
        assert_eq!(hit.area_name, "B");
        assert_eq!(hit.color, "#222222");
        assert_eq!(hit.bucket, Some((50.0, 90.0)));
    }

    #[tokio::test]
    async fn query_outside_map_returns_null() {
        let (status, body) = get_json::<Option<QueryResponse>>("/api/query?x=10&y=10").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Some(None));
    }

    #[tokio::test]
    async fn tooltip_for_known_county() {
        let (status, body) = get_json::<TooltipResponse>("/api/tooltip?fips=2&x=100&y=40").await;
        assert_eq!(status, StatusCode::OK);
        let tooltip = body.unwrap();
        assert_eq!(tooltip.text, "B, AL: 90%");
        assert_eq!(tooltip.education, 90.0);
        assert!(tooltip.html.starts_with(r#"<div id="tooltip" data-education="90""#));
        assert!(tooltip.html.contains("left: 105px; top: 45px;"));
    }

    #[tokio::test]
    async fn tooltip_for_unknown_county_is_404() {
        let (status, _) = get_json::<TooltipResponse>("/api/tooltip?fips=99").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
