use super::common::{
    deserialize_flexible_f64, deserialize_string_or_default, CourseId, FetchTarget, WeekdayFlags,
};
use crate::config;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

fn default_section() -> String {
    config::DEFAULT_SECTION.to_string()
}

fn default_semester() -> String {
    config::UNKNOWN_SEMESTER.to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct SectionInfo {
    #[serde(default = "default_section")]
    pub section: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub instructors: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub enrollment: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub class_number: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub instruction_mode: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub course_component: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub start_time: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub end_time: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub weekdays: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub location: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub grading_basis: String,
    #[serde(flatten)]
    pub days: WeekdayFlags,
}

/// One currently offered course joined with its history.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct MergedEntry {
    #[serde(deserialize_with = "deserialize_string_or_default")]
    pub course_id: CourseId,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub course_code: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub course_title: String,

    #[serde(default, deserialize_with = "deserialize_flexible_f64")]
    pub latest_course_rating: f64,
    #[serde(default, deserialize_with = "deserialize_flexible_f64")]
    pub latest_hours_per_week: f64,
    #[serde(default, deserialize_with = "deserialize_flexible_f64")]
    pub latest_num_students: f64,
    #[serde(default = "default_semester")]
    pub latest_semester_with_data: String,

    #[serde(default)]
    pub historical_semesters: Map<String, Value>,
    #[serde(default)]
    pub all_historical_codes: Vec<String>,
    #[serde(default)]
    pub all_historical_titles: Vec<String>,

    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub current_term: String,
    #[serde(default)]
    pub current_sections: Vec<SectionInfo>,

    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub credits: String,
    #[serde(default)]
    pub course_requirements: String,
    #[serde(default)]
    pub course_url: String,
    #[serde(default)]
    pub course_website: String,
    #[serde(default)]
    pub general_education: String,
    #[serde(default)]
    pub divisional_distribution: String,
    #[serde(default)]
    pub quantitative_reasoning: String,
    #[serde(default)]
    pub course_level: String,
    #[serde(default)]
    pub consent: String,
    #[serde(default)]
    pub term_type: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub exam: String,
    #[serde(default)]
    pub cross_registration: String,
}

impl MergedEntry {
    pub fn has_analytics(&self) -> bool {
        !self.historical_semesters.is_empty()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RankedCourse {
    pub course_code: String,
    pub course_title: String,
    pub value: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MergeSummary {
    pub total_courses: usize,
    pub total_sections: usize,
    pub courses_with_analytics: usize,
    pub courses_without_analytics: usize,
    pub courses_with_ratings: usize,
    pub courses_with_multiple_sections: usize,
    pub avg_rating: f64,
    pub avg_hours: f64,
    pub top_rated_courses: Vec<RankedCourse>,
    pub most_sections: Vec<RankedCourse>,
    pub locations_preserved: usize,
    pub skipped_without_id: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LastUpdated {
    pub timestamp: String,
    pub formatted: String,
    pub formatted_with_time: String,
}

impl LastUpdated {
    pub fn at<Tz>(now: chrono::DateTime<Tz>) -> Self
    where
        Tz: chrono::TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        LastUpdated {
            timestamp: now.to_rfc3339(),
            formatted: now.format("%b %d, %Y").to_string(),
            formatted_with_time: now.format("%b %d, %Y at %I:%M %p").to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CrawlStatistics {
    pub total_hits: u64,
    pub total_courses: usize,
    pub total_urls: usize,
    pub total_pages: u64,
    pub successful_pages: usize,
    pub failed_pages: usize,
    pub failed_groups: usize,
    pub retries: u64,
    pub elapsed_secs: f64,
    pub pages_per_second: f64,
    pub timestamp: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct FetchStatistics {
    pub total_requested: usize,
    pub successful: usize,
    pub parse_failed: usize,
    pub not_found: usize,
    pub failed: usize,
    pub retries: u64,
    pub by_outcome: BTreeMap<String, usize>,
    pub elapsed_secs: f64,
    pub courses_per_second: f64,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_courses: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicates_removed: Option<usize>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CleanStatistics {
    pub total: usize,
    pub mit_courses: usize,
    pub sections_extracted: usize,
    pub subject_catalog_cleaned: usize,
    pub empty_subject_catalog: usize,
    pub letter_sections: usize,
    pub numeric_sections: usize,
    pub mixed_sections: usize,
}

/// Output of one discovery run.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryResult {
    pub targets: Vec<FetchTarget>,
    pub failed_pages: Vec<u64>,
    pub failed_groups: Vec<String>,
    pub statistics: CrawlStatistics,
}
