use crate::app::fetch::fetch_bytes;
use crate::app::ports::HttpRequest;
use crate::classify::{classify_activity, require_expiry_column};
use crate::constants::CROWN_ROAD_SALES_JOB;
use crate::error::Result;
use crate::gateway::{GateDecision, SnapshotGate};
use crate::normalize::{
    extract_description_from_html, extract_fields_from_html, normalize_header, parse_coordinate,
    HtmlFields,
};
use crate::output::features::{number_from_str, put_f64, put_str};
use crate::output::{feature_collection, point_feature, write_geojson, Properties};
use crate::types::{DatasetJob, JobContext, JobReport};
use chrono::NaiveDateTime;
use geojson::{FeatureCollection, JsonValue};
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument, warn};

/// Columns present in the sheet that are not published
const DROPPED_COLUMNS: &[&str] = &["date", "comments"];

/// Columns always published as text
const TEXT_COLUMNS: &[&str] = &["expiry_date", "html"];

/// One spreadsheet row, decoded once with canonical column names
#[derive(Debug, Clone, Default)]
pub struct SaleRecord {
    pub row: usize,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub expiry_date: Option<String>,
    pub html: Option<String>,
    /// Published source columns in header order; empty cells are `None`
    pub columns: Vec<(String, Option<String>)>,
}

impl SaleRecord {
    pub fn from_row(row: usize, header: &[String], record: &csv::StringRecord) -> Self {
        let mut sale = SaleRecord {
            row,
            ..Default::default()
        };
        for (index, name) in header.iter().enumerate() {
            let cell = record
                .get(index)
                .filter(|c| !c.is_empty())
                .map(|c| c.to_string());
            match name.as_str() {
                "latitude" => sale.latitude = cell.as_deref().and_then(parse_coordinate),
                "longitude" => sale.longitude = cell.as_deref().and_then(parse_coordinate),
                "expiry_date" => sale.expiry_date = cell.clone(),
                "html" => sale.html = cell.clone(),
                _ => {}
            }
            if !DROPPED_COLUMNS.contains(&name.as_str()) {
                sale.columns.push((name.clone(), cell));
            }
        }
        sale
    }

    fn properties(&self, active: bool, numeric: &HashSet<String>) -> Properties {
        let mut props = Properties::new();
        for (name, cell) in &self.columns {
            match name.as_str() {
                "latitude" => put_f64(&mut props, name, self.latitude),
                "longitude" => put_f64(&mut props, name, self.longitude),
                _ => {
                    let number = cell
                        .as_deref()
                        .filter(|_| numeric.contains(name))
                        .and_then(number_from_str);
                    match number {
                        Some(number) => {
                            props.insert(name.clone(), number);
                        }
                        None => put_str(&mut props, name, cell.as_deref()),
                    }
                }
            }
        }

        let fields = self
            .html
            .as_deref()
            .map(extract_fields_from_html)
            .unwrap_or_else(HtmlFields::default);
        put_str(&mut props, "cluster", fields.cluster.as_deref());
        put_str(&mut props, "file_ref", fields.file_ref.as_deref());
        put_str(&mut props, "contact_email", fields.contact_email.as_deref());
        let description = self.html.as_deref().and_then(extract_description_from_html);
        put_str(&mut props, "description", description.as_deref());
        props.insert("active".to_string(), JsonValue::Bool(active));
        props
    }
}

/// Sales split into the two published collections
#[derive(Debug)]
pub struct SalesSplit {
    pub active: FeatureCollection,
    pub inactive: FeatureCollection,
    pub records_seen: usize,
    pub records_skipped: usize,
}

/// Decode the TSV export. The header is normalized before anything else.
pub fn parse_sales_tsv(bytes: &[u8]) -> Result<(Vec<String>, Vec<SaleRecord>)> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let raw_header: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let header = normalize_header(&raw_header);

    let mut records = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result?;
        records.push(SaleRecord::from_row(index + 1, &header, &record));
    }
    Ok((header, records))
}

/// Columns where every non-empty cell reads as a number
fn numeric_columns(records: &[SaleRecord]) -> HashSet<String> {
    let mut verdicts: HashMap<&str, bool> = HashMap::new();
    for record in records {
        for (name, cell) in &record.columns {
            if TEXT_COLUMNS.contains(&name.as_str()) {
                continue;
            }
            if let Some(cell) = cell {
                let numeric = number_from_str(cell).is_some();
                verdicts
                    .entry(name.as_str())
                    .and_modify(|v| *v &= numeric)
                    .or_insert(numeric);
            }
        }
    }
    verdicts
        .into_iter()
        .filter(|(_, numeric)| *numeric)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Parse, classify against `now` and build both collections. Rows without
/// usable coordinates are skipped with a warning.
pub fn process_sales_tsv(bytes: &[u8], now: NaiveDateTime) -> Result<SalesSplit> {
    let (header, records) = parse_sales_tsv(bytes)?;
    require_expiry_column(&header)?;

    let records_seen = records.len();
    let numeric = numeric_columns(&records);
    let (located, unlocated): (Vec<SaleRecord>, Vec<SaleRecord>) = records
        .into_iter()
        .partition(|r| r.latitude.is_some() && r.longitude.is_some());
    for record in &unlocated {
        warn!("Skipping sale row {}: missing or invalid coordinates", record.row);
    }

    let split = classify_activity(located, now, |r| r.expiry_date.as_deref());
    let to_features = |records: Vec<SaleRecord>, active: bool| {
        records
            .into_iter()
            .filter_map(|r| {
                let (lon, lat) = (r.longitude?, r.latitude?);
                Some(point_feature(lon, lat, r.properties(active, &numeric)))
            })
            .collect::<Vec<_>>()
    };

    Ok(SalesSplit {
        active: feature_collection(to_features(split.active, true)),
        inactive: feature_collection(to_features(split.inactive, false)),
        records_seen,
        records_skipped: unlocated.len(),
    })
}

pub struct CrownRoadSalesJob;

impl Default for CrownRoadSalesJob {
    fn default() -> Self {
        Self::new()
    }
}

impl CrownRoadSalesJob {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl DatasetJob for CrownRoadSalesJob {
    fn job_name(&self) -> &'static str {
        CROWN_ROAD_SALES_JOB
    }

    #[instrument(skip(self, ctx))]
    async fn run(&self, ctx: &JobContext<'_>) -> Result<JobReport> {
        let cfg = &ctx.config.crown_road_sales;

        info!("Downloading TSV file...");
        let bytes = fetch_bytes(ctx.http, &HttpRequest::new(&cfg.url), cfg.retry).await?;

        let gate = SnapshotGate::new(
            ctx.config.output_path(&cfg.incoming_file),
            ctx.config.output_path(&cfg.snapshot_file),
        );
        gate.stage(&bytes)?;

        if gate.check()? == GateDecision::Unchanged {
            info!("File has not been updated. No further processing required.");
            gate.discard()?;
            return Ok(JobReport::unchanged(self.job_name()));
        }
        info!("File has been updated. Processing...");

        let split = process_sales_tsv(&bytes, ctx.now)?;
        let active_path = ctx.config.output_path(&cfg.active_file);
        let inactive_path = ctx.config.output_path(&cfg.inactive_file);
        write_geojson(&active_path, &split.active)?;
        write_geojson(&inactive_path, &split.inactive)?;

        // only a fully processed payload becomes the new baseline
        gate.commit()?;

        info!(
            "Crown road sales: {} active, {} inactive",
            split.active.features.len(),
            split.inactive.features.len()
        );
        Ok(JobReport {
            records_seen: split.records_seen,
            features_written: split.active.features.len() + split.inactive.features.len(),
            records_skipped: split.records_skipped,
            outputs: vec![active_path, inactive_path],
            ..JobReport::written(self.job_name())
        })
    }
}
