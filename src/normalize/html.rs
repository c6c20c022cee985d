//! Pattern-based scraping of the markup cell in the sales spreadsheet.
//!
//! The spreadsheet carries a free-form `html` column written by hand. Each
//! function here takes that one cell and returns optional fields; a missing
//! match is the common case, not an error.

use once_cell::sync::Lazy;
use regex::Regex;

static FILE_BRACKET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\(([^)]*file[^)]*)\)").expect("valid regex"));
static FILE_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+/\d+\b").expect("valid regex"));
static CLUSTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:cluster|cluster_no|cluster_number)[^\d]*(\d+)").expect("valid regex")
});
static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("valid regex")
});
static FIRST_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<ul>(.*?)</ul>").expect("valid regex"));
static LIST_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<li.*?>(.*?)</li>").expect("valid regex"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<.*?>").expect("valid regex"));

const NBSP_ENTITY: &str = "&nbsp;";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlFields {
    pub cluster: Option<String>,
    pub file_ref: Option<String>,
    pub contact_email: Option<String>,
}

/// Extract `cluster`, `file_ref` and `contact_email` from one cell.
///
/// `cluster` and `file_ref` are only looked for inside the first bracketed
/// span mentioning "file"; the email is searched across the whole cell.
pub fn extract_fields_from_html(html: &str) -> HtmlFields {
    let bracket_text = FILE_BRACKET
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or("");

    let file_ref = FILE_REF
        .find(bracket_text)
        .map(|m| m.as_str().to_string());

    let cluster = CLUSTER
        .captures(bracket_text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    let contact_email = EMAIL.find(html).map(|m| m.as_str().to_string());

    HtmlFields {
        cluster,
        file_ref,
        contact_email,
    }
}

/// Flatten the first `<ul>` block into `"item; item; …"`.
pub fn extract_description_from_html(html: &str) -> Option<String> {
    let list_content = FIRST_LIST.captures(html)?.get(1)?.as_str();

    let items: Vec<String> = LIST_ITEM
        .captures_iter(list_content)
        .filter_map(|c| c.get(1))
        .map(|m| {
            TAG.replace_all(m.as_str(), "")
                .replace(NBSP_ENTITY, "")
                .trim()
                .to_string()
        })
        .collect();

    Some(items.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_bracket_yields_cluster_and_file_ref() {
        let fields = extract_fields_from_html("(see file 1234/5678, cluster 3)");
        assert_eq!(fields.cluster.as_deref(), Some("3"));
        assert_eq!(fields.file_ref.as_deref(), Some("1234/5678"));
        assert_eq!(fields.contact_email, None);
    }

    #[test]
    fn test_no_file_bracket_only_email_survives() {
        let html = "<p>Road 10/2020 cluster 7 - contact roads.sales@crownlands.nsw.gov.au</p>";
        let fields = extract_fields_from_html(html);
        assert_eq!(fields.cluster, None);
        assert_eq!(fields.file_ref, None);
        assert_eq!(
            fields.contact_email.as_deref(),
            Some("roads.sales@crownlands.nsw.gov.au")
        );

        assert_eq!(extract_fields_from_html("plain text"), HtmlFields::default());
    }

    #[test]
    fn test_cluster_outside_bracket_is_ignored() {
        let html = "Cluster 9 <b>(File ref 22/0456)</b>";
        let fields = extract_fields_from_html(html);
        assert_eq!(fields.file_ref.as_deref(), Some("22/0456"));
        assert_eq!(fields.cluster, None);
    }

    #[test]
    fn test_cluster_variants_and_case() {
        let fields = extract_fields_from_html("(FILE: 15/99; Cluster_No: 12)");
        assert_eq!(fields.cluster.as_deref(), Some("12"));
        assert_eq!(fields.file_ref.as_deref(), Some("15/99"));
    }

    #[test]
    fn test_description_from_first_list_only() {
        let html = "<p>Proposal</p><UL>\n<li class=\"x\"><b>Lot 1</b> DP 123&nbsp;</li>\n<li>Lot 2</li></UL><ul><li>ignored</li></ul>";
        assert_eq!(
            extract_description_from_html(html).as_deref(),
            Some("Lot 1 DP 123; Lot 2")
        );
    }

    #[test]
    fn test_description_absent_without_list() {
        assert_eq!(extract_description_from_html("<p>No list here</p>"), None);
    }
}
