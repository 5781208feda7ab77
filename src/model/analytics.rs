use super::common::{deserialize_flexible_f64, deserialize_string_or_default, CourseId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Historical evaluation aggregates for one course id.
///
/// Produced by an external analysis job; this crate only reads it. The
/// per-term map is kept in file order and passed through untouched.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct AnalyticsRecord {
    #[serde(default, deserialize_with = "deserialize_flexible_f64")]
    pub latest_course_rating: f64,
    #[serde(default, deserialize_with = "deserialize_flexible_f64")]
    pub latest_hours_per_week: f64,
    #[serde(default, deserialize_with = "deserialize_flexible_f64")]
    pub latest_num_students: f64,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub latest_semester: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub latest_course_title: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub latest_course_code: String,
    #[serde(default)]
    pub all_course_codes: Vec<String>,
    #[serde(default)]
    pub all_course_titles: Vec<String>,
    #[serde(default)]
    pub semesters: Map<String, Value>,
}

pub type AnalyticsMap = HashMap<CourseId, AnalyticsRecord>;
