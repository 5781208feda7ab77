use super::common::{deserialize_optional_string, deserialize_string_or_default, WeekdayFlags};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One current offering as extracted from a detail page.
///
/// Fields missing from a loaded file default to empty; fields this type
/// does not know survive a load/save round trip through `extra`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CourseRecord {
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub course_title: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub subject_catalog: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub year_term: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub term_type: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub course_id: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_string"
    )]
    pub section: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub instructors: String,

    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub class_number: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub consent: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub enrollment: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub waitlist: String,

    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub start_date: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub end_date: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub start_time: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub end_time: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub weekdays: String,
    #[serde(flatten)]
    pub days: WeekdayFlags,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub location: String,

    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub description: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub notes: String,
    #[serde(
        default,
        rename = "class-notes",
        deserialize_with = "deserialize_string_or_default"
    )]
    pub class_notes: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub school: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub units: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub credits: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub exam: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub cross_registration: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub department: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub course_component: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub instruction_mode: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub grading_basis: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub course_requirements: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub general_education: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub quantitative_reasoning: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub divisional_distribution: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub course_level: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub course_website: String,
    #[serde(default, deserialize_with = "deserialize_string_or_default")]
    pub course_url: String,

    #[serde(
        default,
        rename = "timestamp",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_string"
    )]
    pub fetched_at: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Deduplication identity: title, catalog code and term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey {
    pub course_title: String,
    pub subject_catalog: String,
    pub year_term: String,
}

impl CourseRecord {
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            course_title: self.course_title.clone(),
            subject_catalog: self.subject_catalog.clone(),
            year_term: self.year_term.clone(),
        }
    }

    pub fn has_course_id(&self) -> bool {
        !self.course_id.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn loads_loose_record_and_keeps_unknown_fields() {
        let raw = json!({
            "course_title": "Intro to CS",
            "subject_catalog": "COMPSCI 50",
            "year_term": "2025 Fall",
            "course_id": 160465,
            "lecture_monday": true,
            "class-notes": "Bring a laptop",
            "status": "success",
            "section": ""
        });
        let record: CourseRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(record.course_id, "160465");
        assert!(record.days.monday);
        assert_eq!(record.class_notes, "Bring a laptop");
        assert_eq!(record.section, None);
        assert_eq!(record.extra.get("status"), Some(&json!("success")));

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["lecture_monday"], json!(true));
        assert_eq!(back["status"], json!("success"));
        assert!(back.get("section").is_none());
    }

    #[test]
    fn natural_key_ignores_section_and_url() {
        let a = CourseRecord {
            course_title: "T".into(),
            subject_catalog: "C 1".into(),
            year_term: "2025 Fall".into(),
            course_url: "course/C1/2025-Fall/001".into(),
            ..Default::default()
        };
        let b = CourseRecord {
            course_url: "course/C1/2025-Fall/002".into(),
            section: Some("002".into()),
            ..a.clone()
        };
        assert_eq!(a.natural_key(), b.natural_key());
    }
}
