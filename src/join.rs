use crate::config::JoinStrategy;
use crate::types::{CountyFeature, EducationRecord, Fips, JoinedPair};
use std::collections::HashMap;
use tracing::{debug, warn};

pub fn join(
    strategy: JoinStrategy,
    counties: Vec<CountyFeature>,
    records: &[EducationRecord],
) -> Vec<JoinedPair> {
    match strategy {
        JoinStrategy::Keyed => join_keyed(counties, records),
        JoinStrategy::Positional => join_positional(counties, records),
    }
}

/// Pairs counties and records by index. The result has the length of the
/// shorter input; ids are not compared.
pub fn join_positional(counties: Vec<CountyFeature>, records: &[EducationRecord]) -> Vec<JoinedPair> {
    if counties.len() != records.len() {
        warn!(
            counties = counties.len(),
            records = records.len(),
            "Positional join over inputs of different length; extra entries are dropped"
        );
    }
    counties
        .into_iter()
        .zip(records.iter().cloned())
        .map(|(county, edu)| JoinedPair { county, edu })
        .collect()
}

/// Pairs each county with the record carrying its FIPS code, in county order.
pub fn join_keyed(counties: Vec<CountyFeature>, records: &[EducationRecord]) -> Vec<JoinedPair> {
    let by_fips: HashMap<Fips, &EducationRecord> = records.iter().map(|r| (r.fips, r)).collect();

    let total = counties.len();
    let pairs: Vec<JoinedPair> = counties
        .into_iter()
        .filter_map(|county| {
            let edu = county.id.and_then(|id| by_fips.get(&id)).map(|r| (*r).clone())?;
            Some(JoinedPair { county, edu })
        })
        .collect();

    let unmatched = total - pairs.len();
    if unmatched > 0 {
        warn!(unmatched, "Counties without a matching education record were skipped");
    }
    debug!(joined = pairs.len(), "Keyed join complete");
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::MultiPolygon;

    fn county(id: Option<Fips>) -> CountyFeature {
        CountyFeature {
            id,
            geometry: MultiPolygon::new(vec![]),
        }
    }

    fn record(fips: Fips, name: &str, value: f64) -> EducationRecord {
        EducationRecord {
            fips,
            state: "AL".to_string(),
            area_name: name.to_string(),
            bachelors_or_higher: value,
        }
    }

    #[test]
    fn positional_join_pairs_by_index() {
        let records = vec![record(1, "A", 10.0), record(2, "B", 90.0), record(3, "C", 40.0)];
        let counties = vec![county(Some(3)), county(Some(2)), county(Some(1))];

        let pairs = join_positional(counties, &records);
        assert_eq!(pairs.len(), records.len());
        for (pair, source) in pairs.iter().zip(&records) {
            assert_eq!(&pair.edu, source);
        }
        // ids are not consulted
        assert_eq!(pairs[0].county.id, Some(3));
    }

    #[test]
    fn positional_join_truncates_to_shorter_input() {
        let records = vec![record(1, "A", 10.0)];
        let pairs = join_positional(vec![county(Some(1)), county(Some(2))], &records);
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn keyed_join_matches_by_fips_in_county_order() {
        let records = vec![record(1, "A", 10.0), record(2, "B", 90.0)];
        let pairs = join_keyed(vec![county(Some(2)), county(Some(1))], &records);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].edu.area_name, "B");
        assert_eq!(pairs[1].edu.area_name, "A");
    }

    #[test]
    fn keyed_join_skips_unmatched_counties() {
        let records = vec![record(1, "A", 10.0)];
        let pairs = join_keyed(vec![county(Some(9)), county(None), county(Some(1))], &records);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].county.id, Some(1));
    }

    #[test]
    fn strategy_dispatch() {
        let records = vec![record(1, "A", 10.0), record(2, "B", 90.0)];
        let counties = || vec![county(Some(2)), county(Some(1))];
        assert_eq!(join(JoinStrategy::Keyed, counties(), &records)[0].edu.fips, 2);
        assert_eq!(join(JoinStrategy::Positional, counties(), &records)[0].edu.fips, 1);
    }
}
