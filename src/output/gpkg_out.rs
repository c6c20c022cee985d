//! Minimal OGC GeoPackage writer.
//!
//! A GeoPackage is a SQLite database with a handful of metadata tables and
//! one table per feature layer. Geometries are stored as "GeoPackage binary":
//! a short header followed by little-endian WKB. Only what a single
//! WGS84 feature layer needs is written (no spatial index, no extensions).

use super::staging_path;
use crate::error::{JobError, Result};
use geo::{BoundingRect, Coord, Geometry, Rect};
use geojson::{Feature, FeatureCollection, JsonValue, Value};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

const GPKG_APPLICATION_ID: i64 = 0x4750_4B47;
const GPKG_USER_VERSION: i64 = 10200;
const WGS84_SRS_ID: i32 = 4326;
const GEOMETRY_COLUMN: &str = "geom";

const WGS84_WKT: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]]"#;

const METADATA_DDL: &str = r#"
CREATE TABLE gpkg_spatial_ref_sys (
    srs_name TEXT NOT NULL,
    srs_id INTEGER NOT NULL PRIMARY KEY,
    organization TEXT NOT NULL,
    organization_coordsys_id INTEGER NOT NULL,
    definition TEXT NOT NULL,
    description TEXT
);
CREATE TABLE gpkg_contents (
    table_name TEXT NOT NULL PRIMARY KEY,
    data_type TEXT NOT NULL,
    identifier TEXT UNIQUE,
    description TEXT DEFAULT '',
    last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
    min_x DOUBLE,
    min_y DOUBLE,
    max_x DOUBLE,
    max_y DOUBLE,
    srs_id INTEGER,
    CONSTRAINT fk_gc_r_srs_id FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
);
CREATE TABLE gpkg_geometry_columns (
    table_name TEXT NOT NULL,
    column_name TEXT NOT NULL,
    geometry_type_name TEXT NOT NULL,
    srs_id INTEGER NOT NULL,
    z TINYINT NOT NULL,
    m TINYINT NOT NULL,
    CONSTRAINT pk_geom_cols PRIMARY KEY (table_name, column_name),
    CONSTRAINT uk_gc_table_name UNIQUE (table_name),
    CONSTRAINT fk_gc_tn FOREIGN KEY (table_name) REFERENCES gpkg_contents(table_name),
    CONSTRAINT fk_gc_srs FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
);
"#;

/// Write `collection` as the single layer `layer` of a new GeoPackage at
/// `path`, replacing any existing file once the new one is complete.
pub fn write_geopackage(path: &Path, layer: &str, collection: &FeatureCollection) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let staging = staging_path(path);
    if staging.exists() {
        fs::remove_file(&staging)?;
    }

    let written = {
        let mut conn = Connection::open(&staging)?;
        init_metadata(&conn)?;
        let columns = infer_columns(collection);
        let geometry_type = layer_geometry_type(collection);
        let geometries: Vec<Option<Geometry<f64>>> = collection.features.iter().map(to_geo).collect();
        create_layer(&conn, layer, &columns, geometry_type)?;

        let tx = conn.transaction()?;
        let mut written = 0usize;
        {
            let placeholders: Vec<String> =
                (1..=columns.len() + 1).map(|i| format!("?{i}")).collect();
            let column_list: Vec<String> = std::iter::once(GEOMETRY_COLUMN.to_string())
                .chain(columns.iter().map(|c| quote_ident(&c.name)))
                .collect();
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(layer),
                column_list.join(", "),
                placeholders.join(", ")
            );
            let mut stmt = tx.prepare(&sql)?;

            for (index, (feature, geometry)) in collection.features.iter().zip(&geometries).enumerate() {
                let Some(geometry) = geometry else {
                    warn!("Feature {} has no writable geometry; not written to {}", index, layer);
                    continue;
                };
                let mut values = Vec::with_capacity(columns.len() + 1);
                values.push(SqlValue::Blob(gpkg_blob(geometry)?));
                for column in &columns {
                    let value = feature
                        .properties
                        .as_ref()
                        .and_then(|p| p.get(&column.name));
                    values.push(to_sql_value(value, column.sql_type));
                }
                stmt.execute(params_from_iter(values))?;
                written += 1;
            }
        }
        tx.commit()?;

        let extent = extent(&geometries);
        conn.execute(
            "INSERT INTO gpkg_contents (table_name, data_type, identifier, description, min_x, min_y, max_x, max_y, srs_id)
             VALUES (?1, 'features', ?1, '', ?2, ?3, ?4, ?5, ?6)",
            params![
                layer,
                extent.map(|r| r.min().x),
                extent.map(|r| r.min().y),
                extent.map(|r| r.max().x),
                extent.map(|r| r.max().y),
                WGS84_SRS_ID
            ],
        )?;
        conn.execute(
            "INSERT INTO gpkg_geometry_columns (table_name, column_name, geometry_type_name, srs_id, z, m)
             VALUES (?1, ?2, ?3, ?4, 0, 0)",
            params![layer, GEOMETRY_COLUMN, geometry_type, WGS84_SRS_ID],
        )?;
        written
    };

    fs::rename(&staging, path)?;
    info!(
        "GeoPackage written: {} layer '{}' ({} features)",
        path.display(),
        layer,
        written
    );
    Ok(())
}

fn init_metadata(conn: &Connection) -> Result<()> {
    conn.execute_batch(&format!(
        "PRAGMA application_id = {GPKG_APPLICATION_ID};\nPRAGMA user_version = {GPKG_USER_VERSION};\n{METADATA_DDL}"
    ))?;
    conn.execute(
        "INSERT INTO gpkg_spatial_ref_sys (srs_name, srs_id, organization, organization_coordsys_id, definition, description)
         VALUES ('Undefined cartesian SRS', -1, 'NONE', -1, 'undefined', 'undefined cartesian coordinate reference system'),
                ('Undefined geographic SRS', 0, 'NONE', 0, 'undefined', 'undefined geographic coordinate reference system'),
                ('WGS 84 geodetic', ?1, 'EPSG', ?1, ?2, 'longitude/latitude coordinates in decimal degrees on the WGS 84 spheroid')",
        params![WGS84_SRS_ID, WGS84_WKT],
    )?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SqlType {
    Integer,
    Real,
    Text,
}

impl SqlType {
    fn as_sql(self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Text => "TEXT",
        }
    }
}

#[derive(Debug, Clone)]
struct Column {
    name: String,
    sql_type: SqlType,
}

/// Columns in first-seen order; the type comes from the first non-null value
fn infer_columns(collection: &FeatureCollection) -> Vec<Column> {
    let mut columns: Vec<Column> = Vec::new();
    let mut undecided: Vec<String> = Vec::new();

    for properties in collection.features.iter().filter_map(|f| f.properties.as_ref()) {
        for (key, value) in properties {
            if key == "fid" || key == GEOMETRY_COLUMN {
                continue;
            }
            let sql_type = match value {
                JsonValue::Null => None,
                JsonValue::Bool(_) => Some(SqlType::Integer),
                JsonValue::Number(_) => Some(SqlType::Real),
                _ => Some(SqlType::Text),
            };
            if columns.iter().any(|c| &c.name == key) {
                continue;
            }
            match sql_type {
                Some(sql_type) => {
                    undecided.retain(|k| k != key);
                    columns.push(Column {
                        name: key.clone(),
                        sql_type,
                    });
                }
                None => {
                    if !undecided.contains(key) {
                        undecided.push(key.clone());
                    }
                }
            }
        }
    }

    // all-null columns still appear in the layer
    columns.extend(undecided.into_iter().map(|name| Column {
        name,
        sql_type: SqlType::Text,
    }));
    columns
}

fn create_layer(conn: &Connection, layer: &str, columns: &[Column], geometry_type: &str) -> Result<()> {
    let mut ddl = format!(
        "CREATE TABLE {} (fid INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, {} {}",
        quote_ident(layer),
        GEOMETRY_COLUMN,
        geometry_type
    );
    for column in columns {
        ddl.push_str(&format!(", {} {}", quote_ident(&column.name), column.sql_type.as_sql()));
    }
    ddl.push(')');
    conn.execute_batch(&ddl)?;
    Ok(())
}

fn layer_geometry_type(collection: &FeatureCollection) -> &'static str {
    let mut names = collection
        .features
        .iter()
        .filter_map(|f| f.geometry.as_ref())
        .map(|g| wkb_type_name(&g.value));
    let Some(first) = names.next() else {
        return "GEOMETRY";
    };
    if names.all(|n| n == first) {
        first
    } else {
        "GEOMETRY"
    }
}

fn wkb_type_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "POINT",
        Value::LineString(_) => "LINESTRING",
        Value::Polygon(_) => "POLYGON",
        Value::MultiPoint(_) => "MULTIPOINT",
        Value::MultiLineString(_) => "MULTILINESTRING",
        Value::MultiPolygon(_) => "MULTIPOLYGON",
        Value::GeometryCollection(_) => "GEOMETRYCOLLECTION",
    }
}

fn to_sql_value(value: Option<&JsonValue>, sql_type: SqlType) -> SqlValue {
    match value {
        None | Some(JsonValue::Null) => SqlValue::Null,
        Some(JsonValue::Bool(b)) => SqlValue::Integer(i64::from(*b)),
        Some(JsonValue::Number(n)) => match (sql_type, n.as_i64()) {
            (SqlType::Integer, Some(i)) => SqlValue::Integer(i),
            _ => n.as_f64().map_or(SqlValue::Null, SqlValue::Real),
        },
        Some(JsonValue::String(s)) => SqlValue::Text(s.clone()),
        Some(other) => SqlValue::Text(other.to_string()),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// GeoPackage binary: "GP", version 0, flags (little-endian, no envelope),
/// srs id, then the WKB body.
fn gpkg_blob(geometry: &Geometry<f64>) -> Result<Vec<u8>> {
    let mut blob = Vec::with_capacity(64);
    blob.extend_from_slice(b"GP");
    blob.push(0);
    blob.push(0b0000_0001);
    blob.extend_from_slice(&WGS84_SRS_ID.to_le_bytes());
    let write_options = wkb::writer::WriteOptions {
        endianness: wkb::Endianness::LittleEndian,
    };
    wkb::writer::write_geometry(&mut blob, geometry, &write_options)
        .map_err(|e| JobError::Geometry(format!("failed to write geometry as WKB: {e}")))?;
    Ok(blob)
}

fn to_geo(feature: &Feature) -> Option<Geometry<f64>> {
    let value = &feature.geometry.as_ref()?.value;
    Geometry::try_from(value).ok()
}

/// Bounding box of every geometry in the layer
fn extent(geometries: &[Option<Geometry<f64>>]) -> Option<Rect<f64>> {
    geometries
        .iter()
        .flatten()
        .filter_map(|g| g.bounding_rect())
        .reduce(|a, b| {
            Rect::new(
                Coord {
                    x: a.min().x.min(b.min().x),
                    y: a.min().y.min(b.min().y),
                },
                Coord {
                    x: a.max().x.max(b.max().x),
                    y: a.max().y.max(b.max().y),
                },
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::features::{put_f64, put_str};
    use crate::output::{feature_collection, multipolygon_feature, point_feature, Properties};
    use tempfile::tempdir;

    fn site(name: &str, lon: f64, lat: f64, height: Option<f64>) -> geojson::Feature {
        let mut props = Properties::new();
        put_str(&mut props, "stname", Some(name));
        put_f64(&mut props, "height", height);
        put_str(&mut props, "colour", None);
        point_feature(lon, lat, props)
    }

    #[test]
    fn test_writes_point_layer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stream_height_data.gpkg");
        let collection = feature_collection(vec![
            site("Nepean River at Wallacia", 150.64, -33.86, Some(1.25)),
            site("Cox River at Kelpie Point", 150.25, -33.87, None),
        ]);

        write_geopackage(&path, "site_data", &collection).unwrap();
        assert!(!staging_path(&path).exists());

        let conn = Connection::open(&path).unwrap();
        let app_id: i64 = conn
            .query_row("PRAGMA application_id", params![], |r| r.get(0))
            .unwrap();
        assert_eq!(app_id, GPKG_APPLICATION_ID);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM \"site_data\"", params![], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 2);

        let (geom_type, srs): (String, i64) = conn
            .query_row(
                "SELECT geometry_type_name, srs_id FROM gpkg_geometry_columns WHERE table_name = 'site_data'",
                params![],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(geom_type, "POINT");
        assert_eq!(srs, 4326);

        let min_x: f64 = conn
            .query_row("SELECT min_x FROM gpkg_contents WHERE table_name = 'site_data'", params![], |r| r.get(0))
            .unwrap();
        assert_eq!(min_x, 150.25);

        let (blob, height): (Vec<u8>, Option<f64>) = conn
            .query_row(
                "SELECT geom, height FROM \"site_data\" ORDER BY fid LIMIT 1",
                params![],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(&blob[0..2], b"GP");
        assert_eq!(blob.len(), 8 + 21);
        let x = f64::from_le_bytes(blob[13..21].try_into().unwrap());
        let y = f64::from_le_bytes(blob[21..29].try_into().unwrap());
        assert_eq!((x, y), (150.64, -33.86));
        assert_eq!(height, Some(1.25));
    }

    #[test]
    fn test_rewrite_replaces_previous_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("layer.gpkg");

        write_geopackage(&path, "site_data", &feature_collection(vec![site("a", 150.0, -33.0, None)])).unwrap();
        write_geopackage(&path, "site_data", &feature_collection(Vec::new())).unwrap();

        let conn = Connection::open(&path).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM \"site_data\"", params![], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_column_inference() {
        let mut first = Properties::new();
        first.insert("label".into(), JsonValue::Null);
        first.insert("active".into(), JsonValue::Bool(true));
        let mut second = Properties::new();
        second.insert("label".into(), JsonValue::String("x".into()));
        second.insert("size".into(), serde_json::json!(12.5));
        let collection = feature_collection(vec![
            point_feature(0.0, 0.0, first),
            multipolygon_feature(vec![vec![vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0], vec![0.0, 0.0]]]], second),
        ]);

        let columns = infer_columns(&collection);
        let summary: Vec<(&str, SqlType)> = columns.iter().map(|c| (c.name.as_str(), c.sql_type)).collect();
        assert!(summary.contains(&("active", SqlType::Integer)));
        assert!(summary.contains(&("label", SqlType::Text)));
        assert!(summary.contains(&("size", SqlType::Real)));
        assert_eq!(layer_geometry_type(&collection), "GEOMETRY");
    }

    #[test]
    fn test_multipolygon_wkb_layout() {
        let value = Value::MultiPolygon(vec![vec![vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.0, 0.0],
        ]]]);
        let geometry = Geometry::try_from(&value).unwrap();
        let blob = gpkg_blob(&geometry).unwrap();
        // header 8 + multi header 9 + polygon header 9 + ring count 4 + 4 points * 16
        assert_eq!(blob.len(), 8 + 9 + 9 + 4 + 64);
        assert_eq!(&blob[0..4], &[b'G', b'P', 0, 1]);
        assert_eq!(i32::from_le_bytes(blob[4..8].try_into().unwrap()), WGS84_SRS_ID);
        // little-endian byte order marker, then the MultiPolygon type code
        assert_eq!(blob[8], 1);
        assert_eq!(u32::from_le_bytes(blob[9..13].try_into().unwrap()), 6);
        assert_eq!(u32::from_le_bytes(blob[13..17].try_into().unwrap()), 1);
        let x = f64::from_le_bytes(blob[46..54].try_into().unwrap());
        let y = f64::from_le_bytes(blob[54..62].try_into().unwrap());
        assert_eq!((x, y), (1.0, 0.0));
    }

    #[test]
    fn test_extent_spans_mixed_geometries() {
        let collection = feature_collection(vec![
            site("east", 151.5, -33.5, None),
            multipolygon_feature(
                vec![vec![vec![vec![149.0, -35.0], vec![150.0, -35.0], vec![150.0, -34.0], vec![149.0, -35.0]]]],
                Properties::new(),
            ),
        ]);
        let geometries: Vec<Option<Geometry<f64>>> = collection.features.iter().map(to_geo).collect();

        let rect = extent(&geometries).unwrap();
        assert_eq!((rect.min().x, rect.min().y), (149.0, -35.0));
        assert_eq!((rect.max().x, rect.max().y), (151.5, -33.5));
        assert!(extent(&[None]).is_none());
    }
}
