use crate::config;
use crate::model::common::section_from_url;
use crate::model::course::CourseRecord;
use crate::model::output::CleanStatistics;
use serde_json::Value;
use std::collections::HashMap;

pub const ORIGINAL_CATALOG_KEY: &str = "_original_subject_catalog";

fn strip_section(catalog: &str, section: &str) -> Option<String> {
    catalog
        .strip_suffix(section)
        .map(|rest| rest.trim().to_string())
}

fn normalize_catalog(catalog: &str, is_mit: bool) -> String {
    let collapsed = config::WHITESPACE_RE.replace_all(catalog, " ");
    let collapsed = collapsed.trim();
    if is_mit {
        config::MIT_DOT_RE.replace_all(collapsed, "$1.$2").into_owned()
    } else {
        collapsed.to_string()
    }
}

fn count_section_kind(section: &str, stats: &mut CleanStatistics) {
    if !section.is_empty() && section.chars().all(|c| c.is_ascii_digit()) {
        stats.numeric_sections += 1;
    } else if !section.is_empty() && section.chars().all(char::is_alphabetic) {
        stats.letter_sections += 1;
    } else {
        stats.mixed_sections += 1;
    }
}

/// Normalizes catalog codes and splits section ids off them.
///
/// Only records whose `course_id` occurs more than once are candidates for
/// section extraction, and the section is recorded only when the catalog
/// code actually ended with it. A changed catalog code keeps its raw form
/// under `_original_subject_catalog`.
pub fn clean_records(records: Vec<CourseRecord>) -> (Vec<CourseRecord>, CleanStatistics) {
    let mut id_counts: HashMap<String, usize> = HashMap::new();
    for record in records.iter().filter(|r| r.has_course_id()) {
        *id_counts.entry(record.course_id.clone()).or_default() += 1;
    }

    let mut stats = CleanStatistics::default();
    let mut cleaned = Vec::with_capacity(records.len());

    for mut record in records {
        stats.total += 1;
        let original = record.subject_catalog.clone();
        if original.is_empty() {
            stats.empty_subject_catalog += 1;
            cleaned.push(record);
            continue;
        }

        let mut catalog = original.clone();
        let shared_id = id_counts.get(&record.course_id).is_some_and(|n| *n > 1);
        if shared_id && !record.course_url.is_empty() {
            if let Some(section) = section_from_url(&record.course_url).map(str::to_string) {
                if let Some(stripped) = strip_section(&catalog, &section) {
                    if stripped != catalog {
                        catalog = stripped;
                        count_section_kind(&section, &mut stats);
                        record.section = Some(section);
                        stats.sections_extracted += 1;
                    }
                }
            }
        }

        let is_mit = catalog.trim().starts_with("MIT");
        if is_mit {
            stats.mit_courses += 1;
        }

        let normalized = normalize_catalog(&catalog, is_mit);
        if normalized != original {
            stats.subject_catalog_cleaned += 1;
            record.subject_catalog = normalized;
            record
                .extra
                .insert(ORIGINAL_CATALOG_KEY.to_string(), Value::String(original));
        }

        cleaned.push(record);
    }

    (cleaned, stats)
}
