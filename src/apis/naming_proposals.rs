use crate::apis::scalar::opt_scalar_string;
use crate::app::fetch::fetch_json;
use crate::app::ports::HttpRequest;
use crate::constants::{
    fill_template, ADVERTISEMENT_PAGE_URL_TEMPLATE, GEONAME_PAGE_URL_TEMPLATE,
    NAMING_PROPOSALS_JOB,
};
use crate::error::Result;
use crate::normalize::coordinate_from_json;
use crate::output::features::put_str;
use crate::output::{feature_collection, point_feature, write_geojson, Properties};
use crate::types::{DatasetJob, JobContext, JobReport};
use geojson::Feature;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

/// One entry of `naming.current` in the advertised proposals listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamingRecord {
    #[serde(default, deserialize_with = "opt_scalar_string")]
    pub advertisement_identifier: Option<String>,
    #[serde(default, deserialize_with = "opt_scalar_string")]
    pub geoname_identifier: Option<String>,
    #[serde(default, deserialize_with = "opt_scalar_string")]
    pub date_start: Option<String>,
    #[serde(default, deserialize_with = "opt_scalar_string")]
    pub date_end: Option<String>,
    #[serde(default, deserialize_with = "opt_scalar_string")]
    pub designation: Option<String>,
}

/// The parts of a geoname detail document that end up in the feature
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeonameDetail {
    #[serde(default)]
    pub longitude: Value,
    #[serde(default)]
    pub latitude: Value,
    #[serde(default, deserialize_with = "opt_scalar_string")]
    pub geographical_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProposalListing {
    #[serde(default)]
    naming: NamingSection,
}

#[derive(Debug, Default, Deserialize)]
struct NamingSection {
    #[serde(default)]
    current: Vec<Value>,
}

/// Pull `naming.current` out of the listing. Entries are decoded one by one
/// so that a single odd record does not sink the whole listing.
pub fn parse_listing(listing: Value) -> Result<Vec<Option<NamingRecord>>> {
    let listing: ProposalListing = serde_json::from_value(listing)?;
    Ok(listing
        .naming
        .current
        .into_iter()
        .map(|entry| match serde_json::from_value::<NamingRecord>(entry) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping malformed naming record: {}", e);
                None
            }
        })
        .collect())
}

/// Build the point feature for a proposal. `None` when the detail carries
/// no usable coordinates.
pub fn proposal_feature(record: &NamingRecord, geoname_id: &str, detail: &GeonameDetail) -> Option<Feature> {
    let lon = coordinate_from_json(&detail.longitude)?;
    let lat = coordinate_from_json(&detail.latitude)?;

    let advertisement_url = fill_template(
        ADVERTISEMENT_PAGE_URL_TEMPLATE,
        record.advertisement_identifier.as_deref().unwrap_or_default(),
    );
    let geoname_url = fill_template(GEONAME_PAGE_URL_TEMPLATE, geoname_id);

    let mut props = Properties::new();
    put_str(&mut props, "advertisement_identifier", record.advertisement_identifier.as_deref());
    put_str(&mut props, "geoname_identifier", Some(geoname_id));
    put_str(&mut props, "advertisement_url", Some(&advertisement_url));
    put_str(&mut props, "geoname_url", Some(&geoname_url));
    put_str(&mut props, "geographical_name", detail.geographical_name.as_deref());
    put_str(&mut props, "date_start", record.date_start.as_deref());
    put_str(&mut props, "date_end", record.date_end.as_deref());
    put_str(&mut props, "designation", record.designation.as_deref());

    Some(point_feature(lon, lat, props))
}

pub struct NamingProposalsJob;

impl Default for NamingProposalsJob {
    fn default() -> Self {
        Self::new()
    }
}

impl NamingProposalsJob {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl DatasetJob for NamingProposalsJob {
    fn job_name(&self) -> &'static str {
        NAMING_PROPOSALS_JOB
    }

    #[instrument(skip(self, ctx))]
    async fn run(&self, ctx: &JobContext<'_>) -> Result<JobReport> {
        let cfg = &ctx.config.naming_proposals;

        info!("Fetching naming proposals...");
        let listing: Value = fetch_json(ctx.http, &HttpRequest::new(&cfg.url), cfg.retry).await?;
        let records = parse_listing(listing)?;
        let records_seen = records.len();

        let mut features = Vec::new();
        let mut skipped = 0usize;
        for record in records {
            let Some(record) = record else {
                skipped += 1;
                continue;
            };
            let Some(geoname_id) = record.geoname_identifier.clone().filter(|id| !id.is_empty()) else {
                debug!("Skipping proposal without geoname identifier");
                skipped += 1;
                continue;
            };

            let detail_url = fill_template(&cfg.detail_url_template, &geoname_id);
            let detail: GeonameDetail =
                match fetch_json(ctx.http, &HttpRequest::new(detail_url), cfg.retry).await {
                    Ok(detail) => detail,
                    Err(e) => {
                        warn!("Skipping record {} due to error fetching geoname data: {}", geoname_id, e);
                        skipped += 1;
                        continue;
                    }
                };

            match proposal_feature(&record, &geoname_id, &detail) {
                Some(feature) => features.push(feature),
                None => {
                    warn!("Skipping record {}: geoname has no usable coordinates", geoname_id);
                    skipped += 1;
                }
            }
        }

        let collection = feature_collection(features);
        let output = ctx.config.output_path(&cfg.output_file);
        write_geojson(&output, &collection)?;

        Ok(JobReport {
            records_seen,
            features_written: collection.features.len(),
            records_skipped: skipped,
            outputs: vec![output],
            ..JobReport::written(self.job_name())
        })
    }
}
