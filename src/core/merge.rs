use crate::config;
use crate::logging::{log, LogLevel};
use crate::model::analytics::{AnalyticsMap, AnalyticsRecord};
use crate::model::common::CourseId;
use crate::model::course::CourseRecord;
use crate::model::output::{MergeSummary, MergedEntry, RankedCourse, SectionInfo};
use crate::utils;
use std::collections::HashMap;

/// Prior `(course_id, section) -> location` pairs, non-empty only.
pub type LocationIndex = HashMap<(CourseId, String), String>;

#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub entries: Vec<MergedEntry>,
    pub locations_preserved: usize,
    pub skipped_without_id: usize,
}

fn section_key(section: Option<&str>) -> String {
    match section {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => config::DEFAULT_SECTION.to_string(),
    }
}

/// Indexes the locations of a previous snapshot. When the same pair occurs
/// twice the first one is kept.
pub fn previous_locations(previous: &[MergedEntry]) -> LocationIndex {
    let mut index = LocationIndex::new();
    for entry in previous {
        for section in &entry.current_sections {
            if section.location.is_empty() {
                continue;
            }
            index
                .entry((entry.course_id.clone(), section_key(Some(&section.section))))
                .or_insert_with(|| section.location.clone());
        }
    }
    index
}

/// Groups records by `course_id` in first-seen order. Records without an
/// id are dropped; the second value counts them.
fn group_by_course(records: &[CourseRecord]) -> (Vec<(CourseId, Vec<&CourseRecord>)>, usize) {
    let mut order: Vec<(CourseId, Vec<&CourseRecord>)> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut skipped = 0;

    for record in records {
        if !record.has_course_id() {
            skipped += 1;
            continue;
        }
        match slots.get(record.course_id.as_str()) {
            Some(&slot) => order[slot].1.push(record),
            None => {
                slots.insert(record.course_id.as_str(), order.len());
                order.push((record.course_id.clone(), vec![record]));
            }
        }
    }
    (order, skipped)
}

fn section_info(
    course_id: &str,
    record: &CourseRecord,
    prior: Option<&LocationIndex>,
    preserved: &mut usize,
) -> SectionInfo {
    let section = section_key(record.section.as_deref());
    let mut location = record.location.clone();

    if location.is_empty() {
        if let Some(found) =
            prior.and_then(|index| index.get(&(course_id.to_string(), section.clone())))
        {
            location = found.clone();
            *preserved += 1;
        }
    }

    SectionInfo {
        section,
        instructors: record.instructors.clone(),
        enrollment: record.enrollment.clone(),
        class_number: record.class_number.clone(),
        instruction_mode: record.instruction_mode.clone(),
        course_component: record.course_component.clone(),
        start_time: record.start_time.clone(),
        end_time: record.end_time.clone(),
        weekdays: record.weekdays.clone(),
        location,
        grading_basis: record.grading_basis.clone(),
        days: record.days,
    }
}

fn entry_from(course_id: CourseId, first: &CourseRecord, sections: Vec<SectionInfo>) -> MergedEntry {
    MergedEntry {
        course_id,
        course_code: first.subject_catalog.clone(),
        course_title: first.course_title.clone(),
        latest_course_rating: 0.0,
        latest_hours_per_week: 0.0,
        latest_num_students: 0.0,
        latest_semester_with_data: config::UNKNOWN_SEMESTER.to_string(),
        historical_semesters: Default::default(),
        all_historical_codes: Vec::new(),
        all_historical_titles: Vec::new(),
        current_term: first.year_term.clone(),
        current_sections: sections,
        description: first.description.clone(),
        notes: first.notes.clone(),
        school: first.school.clone(),
        department: first.department.clone(),
        credits: first.credits.clone(),
        course_requirements: first.course_requirements.clone(),
        course_url: first.course_url.clone(),
        course_website: first.course_website.clone(),
        general_education: first.general_education.clone(),
        divisional_distribution: first.divisional_distribution.clone(),
        quantitative_reasoning: first.quantitative_reasoning.clone(),
        course_level: first.course_level.clone(),
        consent: first.consent.clone(),
        term_type: first.term_type.clone(),
        start_date: first.start_date.clone(),
        end_date: first.end_date.clone(),
        exam: first.exam.clone(),
        cross_registration: first.cross_registration.clone(),
    }
}

fn apply_analytics(entry: &mut MergedEntry, analytics: &AnalyticsRecord) {
    entry.latest_course_rating = analytics.latest_course_rating;
    entry.latest_hours_per_week = analytics.latest_hours_per_week;
    entry.latest_num_students = analytics.latest_num_students;
    if !analytics.latest_semester.is_empty() {
        entry.latest_semester_with_data = analytics.latest_semester.clone();
    }
    entry.historical_semesters = analytics.semesters.clone();
    entry.all_historical_codes = analytics.all_course_codes.clone();
    entry.all_historical_titles = analytics.all_course_titles.clone();

    if entry.course_title.is_empty() && !analytics.latest_course_title.is_empty() {
        entry.course_title = analytics.latest_course_title.clone();
    }
}

fn sort_key(entry: &MergedEntry) -> &str {
    if entry.course_code.is_empty() {
        config::MISSING_CODE_SENTINEL
    } else {
        &entry.course_code
    }
}

/// Joins the current records with the analytics map.
///
/// Exactly one entry is produced per `course_id` seen in `current`; ids
/// that exist only in `analytics` are ignored. Empty locations are filled
/// from `previous` when it holds a non-empty value for the same
/// `(course_id, section)`; nothing else is ever taken from it.
pub fn merge(
    current: &[CourseRecord],
    analytics: &AnalyticsMap,
    previous: Option<&[MergedEntry]>,
) -> MergeOutcome {
    let prior = previous.map(previous_locations);
    let (groups, skipped_without_id) = group_by_course(current);
    let mut locations_preserved = 0;
    let mut entries = Vec::with_capacity(groups.len());

    for (course_id, records) in groups {
        let unnamed = records
            .iter()
            .filter(|record| section_key(record.section.as_deref()) == config::DEFAULT_SECTION)
            .count();
        if unnamed > 1 && prior.is_some() {
            log(
                LogLevel::Warning,
                &format!(
                    "Course {} has {} sections without an id; not carrying locations over to them",
                    course_id, unnamed
                ),
            );
        }

        let sections = records
            .iter()
            .map(|record| {
                let ambiguous = unnamed > 1
                    && section_key(record.section.as_deref()) == config::DEFAULT_SECTION;
                let index = if ambiguous { None } else { prior.as_ref() };
                section_info(&course_id, record, index, &mut locations_preserved)
            })
            .collect();

        let first = records[0];
        let mut entry = entry_from(course_id, first, sections);
        if let Some(history) = analytics.get(&entry.course_id) {
            apply_analytics(&mut entry, history);
        }
        entries.push(entry);
    }

    entries.sort_by(|a, b| sort_key(a).cmp(sort_key(b)));

    MergeOutcome {
        entries,
        locations_preserved,
        skipped_without_id,
    }
}

fn mean_of_positive(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .filter(|v| *v > 0.0)
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        utils::round2(sum / count as f64)
    }
}

fn ranked(entry: &MergedEntry, value: f64) -> RankedCourse {
    RankedCourse {
        course_code: entry.course_code.clone(),
        course_title: entry.course_title.clone(),
        value,
    }
}

/// Summary statistics over a sorted merge result. Ties in both rankings
/// keep the order of `entries`.
pub fn summarize(
    entries: &[MergedEntry],
    locations_preserved: usize,
    skipped_without_id: usize,
) -> MergeSummary {
    let courses_with_analytics = entries.iter().filter(|e| e.has_analytics()).count();

    let mut top_rated: Vec<&MergedEntry> = entries
        .iter()
        .filter(|e| e.latest_course_rating > 0.0)
        .collect();
    top_rated.sort_by(|a, b| b.latest_course_rating.total_cmp(&a.latest_course_rating));

    let mut most_sections: Vec<&MergedEntry> = entries.iter().collect();
    most_sections.sort_by(|a, b| b.current_sections.len().cmp(&a.current_sections.len()));

    MergeSummary {
        total_courses: entries.len(),
        total_sections: entries.iter().map(|e| e.current_sections.len()).sum(),
        courses_with_analytics,
        courses_without_analytics: entries.len() - courses_with_analytics,
        courses_with_ratings: top_rated.len(),
        courses_with_multiple_sections: entries
            .iter()
            .filter(|e| e.current_sections.len() > 1)
            .count(),
        avg_rating: mean_of_positive(entries.iter().map(|e| e.latest_course_rating)),
        avg_hours: mean_of_positive(entries.iter().map(|e| e.latest_hours_per_week)),
        top_rated_courses: top_rated
            .iter()
            .take(config::TOP_RATED_LIMIT)
            .map(|e| ranked(e, e.latest_course_rating))
            .collect(),
        most_sections: most_sections
            .iter()
            .take(config::MOST_SECTIONS_LIMIT)
            .map(|e| ranked(e, e.current_sections.len() as f64))
            .collect(),
        locations_preserved,
        skipped_without_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn record(id: &str, code: &str, section: Option<&str>, location: &str) -> CourseRecord {
        CourseRecord {
            course_id: id.into(),
            subject_catalog: code.into(),
            course_title: format!("Title {}", code),
            year_term: "2025 Fall".into(),
            section: section.map(str::to_string),
            location: location.into(),
            ..Default::default()
        }
    }

    fn analytics(rating: f64, hours: f64, title: &str) -> AnalyticsRecord {
        let mut semesters = Map::new();
        semesters.insert("2024 Fall".into(), json!({"avg_course_rating": rating}));
        AnalyticsRecord {
            latest_course_rating: rating,
            latest_hours_per_week: hours,
            latest_num_students: 40.0,
            latest_semester: "2024 Fall".into(),
            latest_course_title: title.into(),
            latest_course_code: String::new(),
            all_course_codes: vec!["OLD 1".into()],
            all_course_titles: vec![title.into()],
            semesters,
        }
    }

    fn previous_entry(id: &str, sections: &[(&str, &str)]) -> MergedEntry {
        let sections: Vec<Value> = sections
            .iter()
            .map(|(section, location)| json!({"section": section, "location": location}))
            .collect();
        serde_json::from_value(json!({
            "course_id": id,
            "current_sections": sections,
        }))
        .unwrap()
    }

    #[test]
    fn missing_location_is_back_filled_from_previous_snapshot() {
        let current = vec![
            record("123", "HIST 10", Some("1"), "Hall 1"),
            record("123", "HIST 10", Some("2"), ""),
        ];
        let previous = vec![previous_entry("123", &[("1", "Old Hall"), ("2", "Hall 3")])];

        let outcome = merge(&current, &AnalyticsMap::new(), Some(&previous));

        assert_eq!(outcome.entries.len(), 1);
        let sections = &outcome.entries[0].current_sections;
        assert_eq!(sections[0].location, "Hall 1");
        assert_eq!(sections[1].location, "Hall 3");
        assert_eq!(outcome.locations_preserved, 1);
    }

    #[test]
    fn locations_are_never_fabricated() {
        let current = vec![
            record("7", "ECON 10", None, ""),
            record("8", "ECON 20", Some("2"), ""),
        ];
        let previous = vec![
            previous_entry("7", &[("default", "")]),
            previous_entry("8", &[("1", "Somewhere")]),
        ];

        let outcome = merge(&current, &AnalyticsMap::new(), Some(&previous));

        assert!(outcome
            .entries
            .iter()
            .flat_map(|e| &e.current_sections)
            .all(|s| s.location.is_empty()));
        assert_eq!(outcome.locations_preserved, 0);
    }

    #[test]
    fn several_unnamed_sections_do_not_share_a_prior_location() {
        let current = vec![
            record("40", "STAT 110", None, ""),
            record("40", "STAT 110", Some(""), ""),
            record("40", "STAT 110", Some("3"), ""),
        ];
        let previous = vec![previous_entry("40", &[("default", "Science Center B"), ("3", "Hall 3")])];

        let outcome = merge(&current, &AnalyticsMap::new(), Some(&previous));

        let sections: Vec<(&str, &str)> = outcome.entries[0]
            .current_sections
            .iter()
            .map(|s| (s.section.as_str(), s.location.as_str()))
            .collect();
        assert_eq!(sections, [("default", ""), ("default", ""), ("3", "Hall 3")]);
        assert_eq!(outcome.locations_preserved, 1);
    }

    #[test]
    fn single_unnamed_section_is_back_filled() {
        let current = vec![record("41", "STAT 111", None, "")];
        let previous = vec![previous_entry("41", &[("default", "Science Center B")])];

        let outcome = merge(&current, &AnalyticsMap::new(), Some(&previous));

        assert_eq!(outcome.entries[0].current_sections[0].location, "Science Center B");
        assert_eq!(outcome.locations_preserved, 1);
    }

    #[test]
    fn no_previous_snapshot_leaves_locations_alone() {
        let current = vec![record("5", "MATH 1", None, "")];
        let outcome = merge(&current, &AnalyticsMap::new(), None);
        assert_eq!(outcome.entries[0].current_sections[0].section, "default");
        assert_eq!(outcome.entries[0].current_sections[0].location, "");
        assert_eq!(outcome.locations_preserved, 0);
    }

    #[test]
    fn one_entry_per_current_id_and_analytics_only_ids_dropped() {
        let current = vec![
            record("1", "B 1", Some("1"), "x"),
            record("2", "A 1", None, "y"),
            record("1", "B 1", Some("2"), "z"),
            record("", "C 1", None, "w"),
        ];
        let mut history = AnalyticsMap::new();
        history.insert("1".into(), analytics(4.5, 6.0, "Title B 1"));
        history.insert("999".into(), analytics(5.0, 1.0, "Ghost"));

        let outcome = merge(&current, &history, None);

        let ids: Vec<&str> = outcome.entries.iter().map(|e| e.course_id.as_str()).collect();
        assert_eq!(ids, ["2", "1"]);
        assert_eq!(outcome.skipped_without_id, 1);
        assert_eq!(outcome.entries[1].current_sections.len(), 2);
        assert_eq!(outcome.entries[1].latest_course_rating, 4.5);
        assert_eq!(outcome.entries[1].latest_semester_with_data, "2024 Fall");
        assert_eq!(outcome.entries[1].all_historical_codes, vec!["OLD 1".to_string()]);
        assert_eq!(outcome.entries[0].latest_semester_with_data, "N/A");
        assert!(!outcome.entries[0].has_analytics());
    }

    #[test]
    fn empty_title_falls_back_to_history() {
        let mut current = record("9", "GOV 50", None, "");
        current.course_title.clear();
        let mut history = AnalyticsMap::new();
        history.insert("9".into(), analytics(3.0, 4.0, "Data Science"));

        let outcome = merge(&[current], &history, None);
        assert_eq!(outcome.entries[0].course_title, "Data Science");
    }

    #[test]
    fn empty_codes_sort_last() {
        let current = vec![
            record("1", "", None, ""),
            record("2", "ZOOL 1", None, ""),
            record("3", "ANTH 1", None, ""),
        ];
        let outcome = merge(&current, &AnalyticsMap::new(), None);
        let codes: Vec<&str> = outcome.entries.iter().map(|e| e.course_code.as_str()).collect();
        assert_eq!(codes, ["ANTH 1", "ZOOL 1", ""]);
    }

    #[test]
    fn summary_counts_agree_with_entries() {
        let current = vec![
            record("1", "A 1", Some("1"), ""),
            record("1", "A 1", Some("2"), ""),
            record("2", "B 1", None, ""),
            record("3", "C 1", None, ""),
        ];
        let mut history = AnalyticsMap::new();
        history.insert("1".into(), analytics(4.0, 5.0, "A"));
        history.insert("2".into(), analytics(3.0, 0.0, "B"));

        let outcome = merge(&current, &history, None);
        let summary = summarize(&outcome.entries, outcome.locations_preserved, 0);

        assert_eq!(summary.total_courses, 3);
        assert_eq!(summary.total_sections, 4);
        assert_eq!(
            summary.courses_with_analytics + summary.courses_without_analytics,
            summary.total_courses
        );
        assert_eq!(summary.courses_with_analytics, 2);
        assert_eq!(summary.courses_with_ratings, 2);
        assert_eq!(summary.courses_with_multiple_sections, 1);
        assert_eq!(summary.avg_rating, 3.5);
        assert_eq!(summary.avg_hours, 5.0);
        assert_eq!(summary.most_sections[0].course_code, "A 1");
        assert_eq!(summary.most_sections[0].value, 2.0);
    }

    #[test]
    fn rating_ties_keep_output_order() {
        let current = vec![
            record("1", "C 1", None, ""),
            record("2", "A 1", None, ""),
            record("3", "B 1", None, ""),
        ];
        let mut history = AnalyticsMap::new();
        for id in ["1", "2", "3"] {
            history.insert(id.into(), analytics(4.0, 1.0, "t"));
        }

        let outcome = merge(&current, &history, None);
        let summary = summarize(&outcome.entries, 0, 0);
        let codes: Vec<&str> = summary
            .top_rated_courses
            .iter()
            .map(|r| r.course_code.as_str())
            .collect();
        assert_eq!(codes, ["A 1", "B 1", "C 1"]);
    }

    #[test]
    fn averages_are_zero_without_data() {
        let summary = summarize(&[], 0, 0);
        assert_eq!(summary.avg_rating, 0.0);
        assert_eq!(summary.avg_hours, 0.0);
        assert!(summary.top_rated_courses.is_empty());
    }

    #[test]
    fn rankings_are_capped() {
        let current: Vec<CourseRecord> = (0..12)
            .map(|i| record(&i.to_string(), &format!("X {:02}", i), None, ""))
            .collect();
        let history: AnalyticsMap = (0..12)
            .map(|i| (i.to_string(), analytics(1.0 + i as f64 / 10.0, 1.0, "t")))
            .collect();

        let summary = summarize(&merge(&current, &history, None).entries, 0, 0);
        assert_eq!(summary.top_rated_courses.len(), 10);
        assert_eq!(summary.top_rated_courses[0].course_code, "X 11");
        assert_eq!(summary.most_sections.len(), 5);
    }
}
