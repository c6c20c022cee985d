// Record-level normalization shared by the dataset jobs

pub mod fields;
pub mod html;
pub mod polygon;
pub mod units;

pub use fields::{normalize_field_name, normalize_header};
pub use html::{extract_description_from_html, extract_fields_from_html, HtmlFields};
pub use polygon::{close_ring, multipolygon_from_strings, parse_polygon};
pub use units::{
    coordinate_from_json, feet_to_meters, format_compact_timestamp, parse_coordinate,
    parse_expiry,
};
