use crate::app::fetch::fetch_bytes;
use crate::app::ports::HttpRequest;
use crate::constants::STREAM_HEIGHTS_JOB;
use crate::error::{JobError, Result};
use crate::normalize::{format_compact_timestamp, parse_coordinate};
use crate::output::features::{put_f64, put_str};
use crate::output::{feature_collection, point_feature, write_collection, Properties};
use crate::types::{DatasetJob, JobContext, JobReport};
use geojson::{Feature, FeatureCollection};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, info, instrument, warn};

const SITE_ELEMENT: &[u8] = b"site";

/// Attributes of one `<site>` element, decoded and typed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteRecord {
    pub station: Option<String>,
    pub grpvals: Option<String>,
    pub grpvalsdesc: Option<String>,
    pub latdec: Option<f64>,
    pub lngdec: Option<f64>,
    pub shortname: Option<String>,
    pub stname: Option<String>,
    /// `var_100x00_100`
    pub height: Option<f64>,
    /// `var_100x00_100_dt`, reformatted to ISO 8601
    pub height_datetime: Option<String>,
    pub colour: Option<String>,
}

impl SiteRecord {
    fn from_element(element: &BytesStart<'_>) -> Result<Self> {
        let mut site = SiteRecord::default();
        for attr in element.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let value = attr.unescape_value()?;
            let text = Some(value.trim()).filter(|v| !v.is_empty());
            match attr.key.as_ref() {
                b"station" => site.station = text.map(str::to_string),
                b"grpvals" => site.grpvals = text.map(str::to_string),
                b"grpvalsdesc" => site.grpvalsdesc = text.map(str::to_string),
                b"latdec" => site.latdec = text.and_then(parse_coordinate),
                b"lngdec" => site.lngdec = text.and_then(parse_coordinate),
                b"shortname" => site.shortname = text.map(str::to_string),
                b"stname" => site.stname = text.map(str::to_string),
                b"var_100x00_100" => site.height = text.and_then(parse_coordinate),
                b"var_100x00_100_dt" => {
                    site.height_datetime = text.and_then(format_compact_timestamp)
                }
                b"colour" => site.colour = text.map(str::to_string),
                _ => {}
            }
        }
        Ok(site)
    }

    pub fn to_feature(&self) -> Option<Feature> {
        let (lon, lat) = (self.lngdec?, self.latdec?);

        let mut props = Properties::new();
        put_str(&mut props, "site_station", self.station.as_deref());
        put_str(&mut props, "grpvals", self.grpvals.as_deref());
        put_str(&mut props, "grpvalsdesc", self.grpvalsdesc.as_deref());
        put_f64(&mut props, "latdec", self.latdec);
        put_f64(&mut props, "lngdec", self.lngdec);
        put_str(&mut props, "shortname", self.shortname.as_deref());
        put_str(&mut props, "stname", self.stname.as_deref());
        put_f64(&mut props, "height", self.height);
        put_str(&mut props, "height_datetime", self.height_datetime.as_deref());
        put_str(&mut props, "colour", self.colour.as_deref());
        Some(point_feature(lon, lat, props))
    }
}

/// Collect every `<site>` element at any depth. Broken markup, or a payload
/// with no root element, is a parse error.
pub fn parse_sites(xml: &[u8]) -> Result<Vec<SiteRecord>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut sites = Vec::new();
    let mut depth = 0usize;
    let mut saw_root = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) => {
                depth += 1;
                saw_root = true;
                if element.local_name().as_ref() == SITE_ELEMENT {
                    sites.push(SiteRecord::from_element(&element)?);
                }
            }
            Event::Empty(element) => {
                saw_root = true;
                if element.local_name().as_ref() == SITE_ELEMENT {
                    sites.push(SiteRecord::from_element(&element)?);
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(JobError::parse("stream sites XML", "document has no root element"));
    }
    if depth != 0 {
        return Err(JobError::parse("stream sites XML", "document ended inside an element"));
    }
    Ok(sites)
}

pub fn sites_to_collection(sites: &[SiteRecord]) -> (FeatureCollection, usize) {
    let mut skipped = 0;
    let features = sites
        .iter()
        .filter_map(|site| {
            let feature = site.to_feature();
            if feature.is_none() {
                debug!(
                    "Skipping site {}: no coordinates",
                    site.station.as_deref().unwrap_or("<unnamed>")
                );
                skipped += 1;
            }
            feature
        })
        .collect();
    (feature_collection(features), skipped)
}

pub struct StreamHeightsJob;

impl Default for StreamHeightsJob {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamHeightsJob {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl DatasetJob for StreamHeightsJob {
    fn job_name(&self) -> &'static str {
        STREAM_HEIGHTS_JOB
    }

    #[instrument(skip(self, ctx))]
    async fn run(&self, ctx: &JobContext<'_>) -> Result<JobReport> {
        let cfg = &ctx.config.stream_heights;

        let request = HttpRequest::new(&cfg.url).with_user_agent(cfg.user_agent.clone());
        let xml = fetch_bytes(ctx.http, &request, cfg.retry).await?;

        let sites = parse_sites(&xml)?;
        let (collection, skipped) = sites_to_collection(&sites);
        if skipped > 0 {
            warn!("{} of {} sites had no coordinates", skipped, sites.len());
        }

        let output = ctx.config.output_path(&cfg.output_file);
        write_collection(cfg.format, &output, &cfg.layer, &collection)?;
        info!("Stream heights saved to {}", output.display());

        Ok(JobReport {
            records_seen: sites.len(),
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

    const SITES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sites>
  <site station="212270" grpvals="A" grpvalsdesc="Stream &amp; river" latdec="-33.6" lngdec="150.6"
        shortname="Grose R" stname="GROSE RIVER AT BURRALOW" var_100x00_100="1.234"
        var_100x00_100_dt="20240115103000" colour="green"/>
  <group>
    <site station="212271" latdec="-33.7" lngdec="150.7" var_100x00_100="n/a" var_100x00_100_dt="bad"></site>
  </group>
  <site station="212272" latdec="" lngdec="150.8"/>
</sites>"#;

    #[test]
    fn test_parse_sites_reads_attributes() {
        let sites = parse_sites(SITES.as_bytes()).unwrap();
        assert_eq!(sites.len(), 3);

        let first = &sites[0];
        assert_eq!(first.station.as_deref(), Some("212270"));
        assert_eq!(first.grpvalsdesc.as_deref(), Some("Stream & river"));
        assert_eq!(first.height, Some(1.234));
        assert_eq!(first.height_datetime.as_deref(), Some("2024-01-15T10:30:00Z"));

        // unparseable values degrade to null
        assert_eq!(sites[1].height, None);
        assert_eq!(sites[1].height_datetime, None);
        assert_eq!(sites[2].latdec, None);
    }

    #[test]
    fn test_sites_without_coordinates_are_dropped() {
        let sites = parse_sites(SITES.as_bytes()).unwrap();
        let (collection, skipped) = sites_to_collection(&sites);
        assert_eq!(skipped, 1);
        assert_eq!(collection.features.len(), 2);

        let props = collection.features[0].properties.as_ref().unwrap();
        assert_eq!(props["site_station"], "212270");
        assert_eq!(props["height"], 1.234);
        assert_eq!(props["colour"], "green");
        assert_eq!(props.len(), 10);
    }

    #[test]
    fn test_malformed_xml_is_fatal() {
        assert!(parse_sites(b"<sites><site station=\"1\"></sites>").is_err());
        assert!(parse_sites(b"<sites><site station=\"1\"/>").is_err());
        assert!(parse_sites(b"").is_err());
    }
}
