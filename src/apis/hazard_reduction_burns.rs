use crate::apis::scalar::scalar_or_null;
use crate::app::fetch::fetch_json;
use crate::app::ports::HttpRequest;
use crate::constants::HAZARD_REDUCTION_BURNS_JOB;
use crate::error::Result;
use crate::normalize::multipolygon_from_strings;
use crate::output::{feature_collection, multipolygon_feature, write_geojson, Properties};
use crate::types::{DatasetJob, JobContext, JobReport};
use geojson::{Feature, FeatureCollection};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

/// A burn as returned by the map-data search endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnResult {
    #[serde(default)]
    pub polygons: Vec<BurnPolygon>,
    pub lead_agency: Option<Value>,
    pub lga: Option<Value>,
    pub supporting_agencies: Option<Value>,
    pub size: Option<Value>,
    pub location: Option<Value>,
    pub guar_reference: Option<Value>,
    pub tenure: Option<Value>,
    pub start_date: Option<Value>,
    pub end_date: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BurnPolygon {
    pub polygon: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BurnSearchResponse {
    #[serde(default)]
    results: Vec<Value>,
}

impl BurnResult {
    fn properties(&self) -> Properties {
        let fields = [
            ("leadAgency", &self.lead_agency),
            ("lga", &self.lga),
            ("supportingAgencies", &self.supporting_agencies),
            ("size", &self.size),
            ("location", &self.location),
            ("guarReference", &self.guar_reference),
            ("tenure", &self.tenure),
            ("startDate", &self.start_date),
            ("endDate", &self.end_date),
        ];
        fields
            .into_iter()
            .map(|(key, value)| (key.to_string(), scalar_or_null(value.clone())))
            .collect()
    }

    /// MultiPolygon feature, or `None` when no polygon string yields a ring
    pub fn to_feature(&self) -> Option<Feature> {
        let rings = self.polygons.iter().filter_map(|p| p.polygon.as_deref());
        let polygons = multipolygon_from_strings(rings);
        if polygons.is_empty() {
            return None;
        }
        Some(multipolygon_feature(polygons, self.properties()))
    }
}

/// Convert a decoded search response into a collection. Burns that fail to
/// decode or have no usable geometry are dropped and counted as skipped.
pub fn burns_to_collection(response: Value) -> Result<(FeatureCollection, usize, usize)> {
    let response: BurnSearchResponse = serde_json::from_value(response)?;
    let seen = response.results.len();
    let mut skipped = 0;
    let features = response
        .results
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let burn: BurnResult = match serde_json::from_value(entry) {
                Ok(burn) => burn,
                Err(e) => {
                    warn!("Skipping malformed burn {}: {}", index, e);
                    skipped += 1;
                    return None;
                }
            };
            let feature = burn.to_feature();
            if feature.is_none() {
                warn!("Skipping burn {}: no parseable polygon", index);
                skipped += 1;
            }
            feature
        })
        .collect();
    Ok((feature_collection(features), seen, skipped))
}

pub struct HazardReductionBurnsJob;

impl Default for HazardReductionBurnsJob {
    fn default() -> Self {
        Self::new()
    }
}

impl HazardReductionBurnsJob {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl DatasetJob for HazardReductionBurnsJob {
    fn job_name(&self) -> &'static str {
        HAZARD_REDUCTION_BURNS_JOB
    }

    #[instrument(skip(self, ctx))]
    async fn run(&self, ctx: &JobContext<'_>) -> Result<JobReport> {
        let cfg = &ctx.config.hazard_reduction_burns;

        info!("Querying the API...");
        let request = cfg
            .query
            .iter()
            .fold(HttpRequest::new(&cfg.url), |req, (k, v)| req.with_query(k, v));
        let response: Value = fetch_json(ctx.http, &request, cfg.retry).await?;

        let (collection, seen, skipped) = burns_to_collection(response)?;
        let output = ctx.config.output_path(&cfg.output_file);
        write_geojson(&output, &collection)?;

        Ok(JobReport {
            records_seen: seen,
            features_written: collection.features.len(),
            records_skipped: skipped,
            outputs: vec![output],
            ..JobReport::written(self.job_name())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_burn_becomes_closed_multipolygon() {
        let response = json!({"results": [{
            "polygons": [
                {"polygon": "=-33.1;151.2|-33.2;151.3|-33.3;151.1"},
                {"polygon": "-34.0;150.0|-34.1;150.1|-34.0;150.0"}
            ],
            "leadAgency": "NPWS",
            "size": 120.5,
            "supportingAgencies": ["FRNSW"],
            "startDate": "2025-03-01"
        }]});

        let (collection, seen, skipped) = burns_to_collection(response).unwrap();
        assert_eq!((seen, skipped), (1, 0));

        let json = serde_json::to_value(&collection.features[0]).unwrap();
        assert_eq!(json["geometry"]["type"], "MultiPolygon");
        let polygons = json["geometry"]["coordinates"].as_array().unwrap();
        assert_eq!(polygons.len(), 2);
        assert_eq!(polygons[0][0][0], json!([151.2, -33.1]));
        assert_eq!(polygons[0][0][3], json!([151.2, -33.1]));
        assert_eq!(polygons[1][0].as_array().unwrap().len(), 3);

        let props = &json["properties"];
        assert_eq!(props["leadAgency"], "NPWS");
        assert_eq!(props["size"], 120.5);
        assert!(props["supportingAgencies"].is_null());
        assert!(props["lga"].is_null());
        assert_eq!(props.as_object().unwrap().len(), 9);
    }

    #[test]
    fn test_burn_without_geometry_is_skipped() {
        let response = json!({"results": [
            {"polygons": [], "lga": "Blue Mountains"},
            {"polygons": [{"polygon": "garbage"}]},
            {"lga": "Penrith"}
        ]});
        let (collection, seen, skipped) = burns_to_collection(response).unwrap();
        assert_eq!(seen, 3);
        assert_eq!(skipped, 3);
        assert!(collection.features.is_empty());
    }

    #[test]
    fn test_missing_results_key_is_empty() {
        let (collection, seen, _) = burns_to_collection(json!({})).unwrap();
        assert_eq!(seen, 0);
        assert!(collection.features.is_empty());
    }

    #[test]
    fn test_malformed_burn_only_skips_itself() {
        let response = json!({"results": [
            {"polygons": [{"polygon": "-33.1;151.2|-33.2;151.3|-33.3;151.1"}], "lga": "Hawkesbury"},
            {"polygons": null},
            {"polygons": [{"polygon": 42}]}
        ]});

        let (collection, seen, skipped) = burns_to_collection(response).unwrap();
        assert_eq!((seen, skipped), (3, 2));
        assert_eq!(collection.features.len(), 1);
        let props = collection.features[0].properties.as_ref().unwrap();
        assert_eq!(props["lga"], "Hawkesbury");
    }

    #[test]
    fn test_non_list_results_is_fatal() {
        assert!(burns_to_collection(json!({"results": "none"})).is_err());
    }
}
