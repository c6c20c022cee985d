// Feature construction and file writers

pub mod features;
pub mod geojson_out;
pub mod gpkg_out;

use crate::error::Result;
use geojson::FeatureCollection;
use serde::Deserialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

pub use features::{feature_collection, multipolygon_feature, point_feature, Properties};
pub use geojson_out::write_geojson;
pub use gpkg_out::write_geopackage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    GeoJson,
    GeoPackage,
}

/// Write a collection in the requested format. `layer` only matters for
/// GeoPackage output.
pub fn write_collection(
    format: OutputFormat,
    path: &Path,
    layer: &str,
    collection: &FeatureCollection,
) -> Result<()> {
    match format {
        OutputFormat::GeoJson => write_geojson(path, collection),
        OutputFormat::GeoPackage => write_geopackage(path, layer, collection),
    }
}

/// Sibling path used while a file is being produced
pub(crate) fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("output"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write via a staging file and rename, so readers never see a partial file
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let staging = staging_path(path);
    fs::write(&staging, bytes)?;
    fs::rename(&staging, path)?;
    Ok(())
}
