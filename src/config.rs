use crate::constants::*;
use crate::error::{JobError, Result};
use crate::output::OutputFormat;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Process-wide settings handed to every job.
///
/// Every field has a default equal to the production endpoint or file name,
/// so an empty (or absent) config file reproduces the scheduled behaviour
/// while tests can point jobs at substitute URLs and directories.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output_dir: PathBuf,
    pub log_dir: PathBuf,
    pub crown_road_sales: CrownRoadSalesConfig,
    pub naming_proposals: NamingProposalsConfig,
    pub hazard_reduction_burns: HazardReductionBurnsConfig,
    pub canyons: CanyonsConfig,
    pub stream_heights: StreamHeightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrownRoadSalesConfig {
    pub url: String,
    pub active_file: String,
    pub inactive_file: String,
    pub incoming_file: String,
    pub snapshot_file: String,
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NamingProposalsConfig {
    pub url: String,
    pub detail_url_template: String,
    pub output_file: String,
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HazardReductionBurnsConfig {
    pub url: String,
    /// Extra query parameters for the search endpoint; none are needed by default
    pub query: Vec<(String, String)>,
    pub output_file: String,
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CanyonsConfig {
    pub url: String,
    pub query: String,
    pub output_file: String,
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamHeightsConfig {
    pub url: String,
    pub user_agent: Option<String>,
    pub output_file: String,
    pub layer: String,
    pub format: OutputFormat,
    pub retry: RetrySettings,
}

/// Transfer-level retry settings, as written in the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl RetrySettings {
    pub fn none() -> Self {
        Self {
            attempts: 1,
            delay_ms: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self::none()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            crown_road_sales: CrownRoadSalesConfig::default(),
            naming_proposals: NamingProposalsConfig::default(),
            hazard_reduction_burns: HazardReductionBurnsConfig::default(),
            canyons: CanyonsConfig::default(),
            stream_heights: StreamHeightsConfig::default(),
        }
    }
}

impl Default for CrownRoadSalesConfig {
    fn default() -> Self {
        Self {
            url: CROWN_ROAD_SALES_URL.to_string(),
            active_file: CROWN_ROAD_SALES_ACTIVE_FILE.to_string(),
            inactive_file: CROWN_ROAD_SALES_INACTIVE_FILE.to_string(),
            incoming_file: CROWN_ROAD_SALES_INCOMING_FILE.to_string(),
            snapshot_file: CROWN_ROAD_SALES_SNAPSHOT_FILE.to_string(),
            retry: RetrySettings::none(),
        }
    }
}

impl Default for NamingProposalsConfig {
    fn default() -> Self {
        Self {
            url: NAMING_PROPOSALS_URL.to_string(),
            detail_url_template: GEONAME_DETAIL_URL_TEMPLATE.to_string(),
            output_file: NAMING_PROPOSALS_FILE.to_string(),
            retry: RetrySettings::none(),
        }
    }
}

impl Default for HazardReductionBurnsConfig {
    fn default() -> Self {
        Self {
            url: HAZARD_REDUCTION_BURNS_URL.to_string(),
            query: Vec::new(),
            output_file: HAZARD_REDUCTION_BURNS_FILE.to_string(),
            retry: RetrySettings::none(),
        }
    }
}

impl Default for CanyonsConfig {
    fn default() -> Self {
        Self {
            url: ROPEWIKI_API_URL.to_string(),
            query: ROPEWIKI_CANYON_QUERY.to_string(),
            output_file: CANYONS_FILE.to_string(),
            retry: RetrySettings::none(),
        }
    }
}

impl Default for StreamHeightsConfig {
    fn default() -> Self {
        Self {
            url: STREAM_SITES_URL.to_string(),
            user_agent: Some(BROWSER_USER_AGENT.to_string()),
            output_file: STREAM_HEIGHTS_FILE.to_string(),
            layer: STREAM_HEIGHTS_LAYER.to_string(),
            format: OutputFormat::GeoPackage,
            // The WaterNSW feed is the flaky one
            retry: RetrySettings {
                attempts: 3,
                delay_ms: 2_000,
            },
        }
    }
}

impl Config {
    /// Load configuration: explicit file, else `map_datasets.toml` if present,
    /// else defaults. `OUTPUT_DIR` in the environment overrides `output_dir`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        if let Ok(dir) = std::env::var(OUTPUT_DIR_ENV) {
            if !dir.trim().is_empty() {
                config.output_dir = PathBuf::from(dir.trim());
            }
        }

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            JobError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Resolve a configured file name against the output directory
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_production_paths() {
        let config = Config::default();
        assert_eq!(config.output_dir, PathBuf::from("datasets"));
        assert_eq!(
            config.output_path(&config.crown_road_sales.active_file),
            PathBuf::from("datasets").join("crown_road_sales_active.geojson")
        );
        assert_eq!(config.stream_heights.format, OutputFormat::GeoPackage);
        assert_eq!(config.stream_heights.retry.attempts, 3);
        assert_eq!(config.canyons.retry, RetrySettings::none());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            output_dir = "/tmp/maps"

            [canyons]
            url = "http://localhost:9000/api.php"

            [stream_heights]
            format = "geojson"
            output_file = "stream_height_data.geojson"
            "#,
        )
        .unwrap();

        assert_eq!(config.output_dir, PathBuf::from("/tmp/maps"));
        assert_eq!(config.canyons.url, "http://localhost:9000/api.php");
        assert_eq!(config.canyons.output_file, "canyons.geojson");
        assert_eq!(config.stream_heights.format, OutputFormat::GeoJson);
        assert_eq!(config.stream_heights.layer, "site_data");
        assert_eq!(config.naming_proposals.url, NAMING_PROPOSALS_URL);
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        let err = Config::from_toml_str("output_dir = [").unwrap_err();
        assert!(matches!(err, JobError::Toml(_)));
    }
}
