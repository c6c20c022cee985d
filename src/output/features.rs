use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Position, Value};

pub type Properties = JsonObject;

pub fn point_feature(lon: f64, lat: f64, properties: Properties) -> Feature {
    feature(Value::Point(vec![lon, lat]), properties)
}

pub fn multipolygon_feature(polygons: Vec<Vec<Vec<Position>>>, properties: Properties) -> Feature {
    feature(Value::MultiPolygon(polygons), properties)
}

fn feature(value: Value, properties: Properties) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

pub fn feature_collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Insert an optional string, mapping `None` to JSON null
pub fn put_str(properties: &mut Properties, key: &str, value: Option<&str>) {
    let value = value.map_or(JsonValue::Null, |v| JsonValue::String(v.to_string()));
    properties.insert(key.to_string(), value);
}

/// Insert an optional number, mapping `None` (and non-finite values) to null
pub fn put_f64(properties: &mut Properties, key: &str, value: Option<f64>) {
    let value = value
        .and_then(serde_json::Number::from_f64)
        .map_or(JsonValue::Null, JsonValue::Number);
    properties.insert(key.to_string(), value);
}

/// Read a text cell as a JSON number. Integers stay integral; NaN and
/// infinities are rejected.
pub fn number_from_str(text: &str) -> Option<JsonValue> {
    let text = text.trim();
    if let Ok(int) = text.parse::<i64>() {
        return Some(JsonValue::from(int));
    }
    text.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(JsonValue::Number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_feature_serializes_lon_lat() {
        let mut props = Properties::new();
        put_str(&mut props, "name", Some("Wollangambe"));
        put_f64(&mut props, "height", None);

        let collection = feature_collection(vec![point_feature(150.3, -33.5, props)]);
        let json = serde_json::to_value(&collection).unwrap();

        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"][0]["type"], "Feature");
        assert_eq!(json["features"][0]["geometry"]["type"], "Point");
        assert_eq!(json["features"][0]["geometry"]["coordinates"][0], 150.3);
        assert_eq!(json["features"][0]["geometry"]["coordinates"][1], -33.5);
        assert_eq!(json["features"][0]["properties"]["name"], "Wollangambe");
        assert!(json["features"][0]["properties"]["height"].is_null());
    }

    #[test]
    fn test_number_from_str() {
        assert_eq!(number_from_str("42"), Some(JsonValue::from(42)));
        assert_eq!(number_from_str(" 2.5 "), Some(serde_json::json!(2.5)));
        assert_eq!(number_from_str("NaN"), None);
        assert_eq!(number_from_str("7A"), None);
        assert_eq!(number_from_str(""), None);
    }
}
