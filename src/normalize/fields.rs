/// Header spellings the sales spreadsheet is known to get wrong
const CORRECTIONS: &[(&str, &str)] = &[("longtitude", "longitude"), ("latitiude", "latitude")];

/// Canonical column name: trimmed, lowercase, spaces replaced by underscores,
/// with known misspellings corrected. Never fails; unknown names pass through.
pub fn normalize_field_name(raw: &str) -> String {
    let name = raw.trim().to_lowercase().replace(' ', "_");
    CORRECTIONS
        .iter()
        .find(|(wrong, _)| *wrong == name)
        .map(|(_, right)| right.to_string())
        .unwrap_or(name)
}

pub fn normalize_header<S: AsRef<str>>(columns: &[S]) -> Vec<String> {
    columns
        .iter()
        .map(|c| normalize_field_name(c.as_ref()))
        .collect()
}
