use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use std::time::Duration;

pub const BASE_URL: &str = "https://beta.my.harvard.edu";
pub const SEARCH_PATH: &str = "search/";

pub const DEFAULT_RESULTS_DIR: &str = "./results";
pub const DEFAULT_TARGETS_FILE: &str = "./results/course_lines.txt";
pub const DEFAULT_COURSES_FILE: &str = "./results/all_courses.json";
pub const DEFAULT_CLEANED_FILE: &str = "./results/all_courses_cleaned.json";
pub const DEFAULT_ANALYTICS_FILE: &str = "./qguide/results/course_analytics.json";
pub const LAST_UPDATED_FILE: &str = "last_updated.json";
pub const MERGE_SUMMARY_FILE: &str = "merge_summary.json";

pub const DEFAULT_TERM: &str = "Fall";
pub const DEFAULT_YEAR: &str = "2025";
pub const DEFAULT_SCHOOL: &str = "All";

/// Hits per search page, fixed by the remote endpoint.
pub const PAGE_SIZE: u64 = 15;

pub const MAX_DISCOVERY_CONCUR: usize = 20;
pub const MAX_DETAIL_CONCUR: usize = 50;
pub const HTTP_TIMEOUT_SECONDS: u64 = 30;
pub const HTTP_CONNECT_TIMEOUT: u64 = 20;
pub const DISCOVERY_MAX_RETRIES: u32 = 8;
pub const DETAIL_MAX_RETRIES: u32 = 3;
pub const RETRY_DELAY_BASE_SECS: f32 = 1.0;

pub const CHUNK_SIZE: usize = 500;
pub const CHUNK_DELAY_MILLIS: u64 = 500;

/// Section id used when a record carries none.
pub const DEFAULT_SECTION: &str = "default";
pub const UNKNOWN_SEMESTER: &str = "N/A";
/// Sorts after every real course code.
pub const MISSING_CODE_SENTINEL: &str = "\u{10FFFF}";

pub const TOP_RATED_LIMIT: usize = 10;
pub const MOST_SECTIONS_LIMIT: usize = 5;

const USER_AGENT_VAL: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub static BASE_UA_HEADERS: Lazy<HeaderMap> = Lazy::new(|| {
    let mut h = HeaderMap::new();
    h.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VAL));
    h.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8"),
    );
    h
});

pub static COURSE_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/course/[A-Z]").expect("valid course link regex"));
pub static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
pub static MIT_DOT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z0-9]+)\s+\.([A-Za-z0-9]+)").expect("valid MIT dot regex")
});

/// Runtime knobs of the fetch pipeline. All plain scalars.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub base_url: String,
    pub max_concurrent: usize,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
    pub chunk_size: usize,
    pub chunk_delay: Duration,
}

impl FetchSettings {
    pub fn discovery_defaults() -> Self {
        Self {
            max_concurrent: MAX_DISCOVERY_CONCUR,
            max_retries: DISCOVERY_MAX_RETRIES,
            ..Self::default()
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            max_concurrent: MAX_DETAIL_CONCUR,
            timeout: Duration::from_secs(HTTP_TIMEOUT_SECONDS),
            connect_timeout: Duration::from_secs(HTTP_CONNECT_TIMEOUT),
            max_retries: DETAIL_MAX_RETRIES,
            base_delay: Duration::from_secs_f32(RETRY_DELAY_BASE_SECS),
            chunk_size: CHUNK_SIZE,
            chunk_delay: Duration::from_millis(CHUNK_DELAY_MILLIS),
        }
    }
}

/// Listing selectors for one discovery run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub term: String,
    pub year: String,
    pub school: String,
}

impl SearchQuery {
    pub fn page_path(&self, page: u64) -> String {
        format!(
            "{}?q=&sort=subject_catalog&school={}&term={}+{}&page={}",
            SEARCH_PATH, self.school, self.year, self.term, page
        )
    }
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            term: DEFAULT_TERM.to_string(),
            year: DEFAULT_YEAR.to_string(),
            school: DEFAULT_SCHOOL.to_string(),
        }
    }
}

pub fn total_pages(total_hits: u64) -> u64 {
    total_hits.div_ceil(PAGE_SIZE)
}
