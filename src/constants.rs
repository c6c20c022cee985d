/// Job name constants to ensure consistency across the codebase
/// These are the names accepted by `--jobs` on the command line

pub const CROWN_ROAD_SALES_JOB: &str = "crown_road_sales";
pub const NAMING_PROPOSALS_JOB: &str = "naming_proposals";
pub const HAZARD_REDUCTION_BURNS_JOB: &str = "hazard_reduction_burns";
pub const CANYONS_JOB: &str = "canyons";
pub const STREAM_HEIGHTS_JOB: &str = "stream_heights";

/// Get all supported job names, in the order `run` executes them by default
pub fn get_supported_jobs() -> Vec<&'static str> {
    vec![
        CROWN_ROAD_SALES_JOB,
        NAMING_PROPOSALS_JOB,
        HAZARD_REDUCTION_BURNS_JOB,
        CANYONS_JOB,
        STREAM_HEIGHTS_JOB,
    ]
}

// Output location and transport
pub const DEFAULT_OUTPUT_DIR: &str = "datasets";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_CONFIG_FILE: &str = "map_datasets.toml";
pub const OUTPUT_DIR_ENV: &str = "OUTPUT_DIR";
pub const HTTP_TIMEOUT_SECS: u64 = 60;

// Crown road sales (published spreadsheet, TSV export)
pub const CROWN_ROAD_SALES_URL: &str = "https://docs.google.com/spreadsheets/d/e/2PACX-1vQ8EJKOwIGPMQlyBKPjeetZXSdH5vnxNvWJIAzftzclQ6m2UMjk_D42gE--WxvtsPRdMvDGbXtIqpNx/pub?gid=0&single=true&output=tsv";
pub const CROWN_ROAD_SALES_ACTIVE_FILE: &str = "crown_road_sales_active.geojson";
pub const CROWN_ROAD_SALES_INACTIVE_FILE: &str = "crown_road_sales_inactive.geojson";
pub const CROWN_ROAD_SALES_INCOMING_FILE: &str = "crown_road_sales_new.tsv";
pub const CROWN_ROAD_SALES_SNAPSHOT_FILE: &str = "crown_road_sales.tsv";

// Geographical Names Board advertised proposals
pub const NAMING_PROPOSALS_URL: &str = "https://dcok8xuap4.execute-api.ap-southeast-2.amazonaws.com/prod/public/placenames/advertised-proposals";
pub const GEONAME_DETAIL_URL_TEMPLATE: &str = "https://dcok8xuap4.execute-api.ap-southeast-2.amazonaws.com/prod/public/placenames/geonames/{}";
pub const ADVERTISEMENT_PAGE_URL_TEMPLATE: &str = "https://proposals.gnb.nsw.gov.au/currentproposals/{}";
pub const GEONAME_PAGE_URL_TEMPLATE: &str = "https://proposals.gnb.nsw.gov.au/public/geonames/{}";
pub const NAMING_PROPOSALS_FILE: &str = "naming_proposals.geojson";

// Rural Fire Service hazard reduction burns
pub const HAZARD_REDUCTION_BURNS_URL: &str = "https://www.rfs.nsw.gov.au/funnelback/hr-map-data";
pub const HAZARD_REDUCTION_BURNS_FILE: &str = "rfs_hr_burns.geojson";

// Ropewiki canyons (Semantic MediaWiki ask query)
pub const ROPEWIKI_API_URL: &str = "https://ropewiki.com/api.php";
pub const ROPEWIKI_CANYON_QUERY: &str = "[[Category:Canyons]][[Has coordinates::+]][[Located in region.Located in regions::X||Australia]]|?Has_coordinates|?Has_summary|?Has_info_regions|?Has_info_major_region|?Has_info_rappels|?Has_longest_rappel|?Has_pageid|limit=1000|order=ascending|sort=Has name";
pub const CANYONS_FILE: &str = "canyons.geojson";

// WaterNSW real-time stream sites
pub const STREAM_SITES_URL: &str = "https://realtimedata.waternsw.com.au/wgen/sites.rs.anon.xml";
pub const STREAM_HEIGHTS_FILE: &str = "stream_height_data.gpkg";
pub const STREAM_HEIGHTS_LAYER: &str = "site_data";
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Expand a `{}` URL template with a single identifier
pub fn fill_template(template: &str, value: &str) -> String {
    template.replacen("{}", value, 1)
}
