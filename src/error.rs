use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Transfer failed for {url}: {message}")]
    Transfer { url: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("XML parsing failed: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Failed to parse {what}: {message}")]
    Parse { what: String, message: String },

    #[error("Source is missing required column '{0}'")]
    MissingColumn(String),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Geometry encoding failed: {0}")]
    Geometry(String),

    #[error("GeoPackage write failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl JobError {
    pub fn parse(what: impl Into<String>, message: impl Into<String>) -> Self {
        JobError::Parse {
            what: what.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, JobError>;
