use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

/// County FIPS code, e.g. 1001 for Autauga County, AL.
pub type Fips = u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationRecord {
    pub fips: Fips,
    pub state: String,
    pub area_name: String,
    #[serde(rename = "bachelorsOrHigher")]
    pub bachelors_or_higher: f64, // percent, 0-100
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountyFeature {
    pub id: Option<Fips>,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinedPair {
    pub county: CountyFeature,
    pub edu: EducationRecord,
}
