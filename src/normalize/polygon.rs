use geojson::Position;

/// Parse `"lat;lon|lat;lon|…"` into `[lon, lat]` positions.
///
/// The feed sometimes prefixes the whole string with `=`. Segments that are
/// blank or not exactly two numbers are dropped without error.
pub fn parse_polygon(polygon: &str) -> Vec<Position> {
    polygon
        .trim()
        .trim_start_matches('=')
        .split('|')
        .filter_map(parse_point)
        .collect()
}

fn parse_point(segment: &str) -> Option<Position> {
    let segment = segment.trim();
    if segment.is_empty() {
        return None;
    }
    let mut parts = segment.split(';');
    let lat: f64 = parts.next()?.trim().parse().ok()?;
    let lon: f64 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() || !lat.is_finite() || !lon.is_finite() {
        return None;
    }
    Some(vec![lon, lat])
}

/// Append the first position when the ring is not already closed
pub fn close_ring(mut ring: Vec<Position>) -> Vec<Position> {
    if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
        if first != last {
            let first = first.clone();
            ring.push(first);
        }
    }
    ring
}

/// Build MultiPolygon coordinates, one single-ring polygon per input string.
/// Strings that yield no valid positions contribute nothing.
pub fn multipolygon_from_strings<I, S>(polygons: I) -> Vec<Vec<Vec<Position>>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    polygons
        .into_iter()
        .map(|p| parse_polygon(p.as_ref()))
        .filter(|ring| !ring.is_empty())
        .map(|ring| vec![close_ring(ring)])
        .collect()
}
