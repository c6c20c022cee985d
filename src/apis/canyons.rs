use crate::apis::scalar::{scalar_or_null, scalar_to_string};
use crate::app::fetch::fetch_json;
use crate::app::ports::HttpRequest;
use crate::constants::CANYONS_JOB;
use crate::error::{JobError, Result};
use crate::normalize::{coordinate_from_json, feet_to_meters};
use crate::output::features::{put_f64, put_str};
use crate::output::{feature_collection, point_feature, write_geojson, Properties};
use crate::types::{DatasetJob, JobContext, JobReport};
use geojson::{Feature, FeatureCollection};
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

const COORDINATES: &str = "Has coordinates";
const SUMMARY: &str = "Has summary";
const REGIONS: &str = "Has info regions";
const MAJOR_REGION: &str = "Has info major region";
const RAPPELS: &str = "Has info rappels";
const LONGEST_RAPPEL: &str = "Has longest rappel";
const PAGEID: &str = "Has pageid";

/// One canyon page from the ask query, flattened out of its printouts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanyonRecord {
    pub title: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub summary: Option<String>,
    pub regions: Vec<String>,
    pub major_region: Option<String>,
    pub rappels: Value,
    /// Source value, in feet
    pub longest_rappel: Option<f64>,
    pub pageid: Value,
}

/// First value of a printout; printouts are always arrays, possibly empty
fn first<'a>(printouts: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    printouts.get(key)?.as_array()?.first()
}

/// Page-typed printouts come back as objects carrying `fulltext`
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Object(obj) => obj.get("fulltext").and_then(scalar_to_string),
        other => scalar_to_string(other),
    }
}

impl CanyonRecord {
    pub fn from_result(title: &str, result: &Value) -> Self {
        let empty = Map::new();
        let printouts = result
            .get("printouts")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        let coords = first(printouts, COORDINATES);
        let regions: Vec<String> = printouts
            .get(REGIONS)
            .and_then(Value::as_array)
            .map(|values| values.iter().filter_map(text_of).collect())
            .unwrap_or_default();
        let longest_rappel = first(printouts, LONGEST_RAPPEL).and_then(|v| match v {
            Value::Object(obj) => obj.get("value").and_then(coordinate_from_json),
            other => coordinate_from_json(other),
        });

        CanyonRecord {
            title: title.to_string(),
            lat: coords.and_then(|c| c.get("lat")).and_then(coordinate_from_json),
            lon: coords.and_then(|c| c.get("lon")).and_then(coordinate_from_json),
            name: result.get("fulltext").and_then(scalar_to_string),
            url: result.get("fullurl").and_then(scalar_to_string),
            summary: first(printouts, SUMMARY).and_then(text_of),
            regions,
            major_region: first(printouts, MAJOR_REGION).and_then(text_of),
            rappels: scalar_or_null(first(printouts, RAPPELS).cloned()),
            longest_rappel,
            pageid: scalar_or_null(first(printouts, PAGEID).cloned()),
        }
    }

    pub fn to_feature(&self) -> Option<Feature> {
        let (lon, lat) = (self.lon?, self.lat?);

        let mut props = Properties::new();
        put_str(&mut props, "name", self.name.as_deref());
        put_str(&mut props, "url", self.url.as_deref());
        put_str(&mut props, "summary", self.summary.as_deref());
        let regions = (!self.regions.is_empty()).then(|| self.regions.join("; "));
        put_str(&mut props, "regions", regions.as_deref());
        put_str(&mut props, "major_region", self.major_region.as_deref());
        props.insert("rappels".to_string(), self.rappels.clone());
        put_f64(&mut props, "longest_rappel", self.longest_rappel);
        put_f64(&mut props, "longest_rappel_m", self.longest_rappel.map(feet_to_meters));
        props.insert("pageid".to_string(), self.pageid.clone());
        Some(point_feature(lon, lat, props))
    }
}

/// Read `query.results` out of an ask response.
///
/// Results are keyed by page title; an empty result set comes back as `[]`
/// rather than `{}`. An `error` member means the query itself was rejected.
pub fn parse_ask_response(response: &Value) -> Result<Vec<CanyonRecord>> {
    if let Some(error) = response.get("error") {
        let message = error
            .get("info")
            .and_then(scalar_to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(JobError::parse("ask response", message));
    }

    match response.get("query").and_then(|q| q.get("results")) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) if items.is_empty() => Ok(Vec::new()),
        Some(Value::Object(results)) => Ok(results
            .iter()
            .map(|(title, result)| CanyonRecord::from_result(title, result))
            .collect()),
        Some(other) => Err(JobError::parse(
            "ask response",
            format!("unexpected results shape: {other}"),
        )),
    }
}

pub fn canyons_to_collection(records: &[CanyonRecord]) -> (FeatureCollection, usize) {
    let mut skipped = 0;
    let features = records
        .iter()
        .filter_map(|record| {
            let feature = record.to_feature();
            if feature.is_none() {
                warn!("Skipping canyon {}: no coordinates", record.title);
                skipped += 1;
            }
            feature
        })
        .collect();
    (feature_collection(features), skipped)
}

pub struct CanyonsJob;

impl Default for CanyonsJob {
    fn default() -> Self {
        Self::new()
    }
}

impl CanyonsJob {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl DatasetJob for CanyonsJob {
    fn job_name(&self) -> &'static str {
        CANYONS_JOB
    }

    #[instrument(skip(self, ctx))]
    async fn run(&self, ctx: &JobContext<'_>) -> Result<JobReport> {
        let cfg = &ctx.config.canyons;

        info!("Fetching canyons from Ropewiki...");
        let request = HttpRequest::new(&cfg.url)
            .with_query("action", "ask")
            .with_query("format", "json")
            .with_query("query", &cfg.query);
        let response: Value = fetch_json(ctx.http, &request, cfg.retry).await?;

        let records = parse_ask_response(&response)?;
        let (collection, skipped) = canyons_to_collection(&records);
        info!("Processed {} canyons", collection.features.len());

        let output = ctx.config.output_path(&cfg.output_file);
        write_geojson(&output, &collection)?;

        Ok(JobReport {
            records_seen: records.len(),
            features_written: collection.features.len(),
            records_skipped: skipped,
            outputs: vec![output],
            ..JobReport::written(self.job_name())
        })
    }
}
