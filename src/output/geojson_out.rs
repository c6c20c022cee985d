use super::write_atomic;
use crate::error::Result;
use geojson::FeatureCollection;
use std::path::Path;
use tracing::info;

/// Indented GeoJSON text for a collection
pub fn to_pretty_json(collection: &FeatureCollection) -> Result<String> {
    Ok(serde_json::to_string_pretty(collection)?)
}

pub fn write_geojson(path: &Path, collection: &FeatureCollection) -> Result<()> {
    let text = to_pretty_json(collection)?;
    write_atomic(path, text.as_bytes())?;
    info!(
        "GeoJSON written: {} ({} features)",
        path.display(),
        collection.features.len()
    );
    Ok(())
}
