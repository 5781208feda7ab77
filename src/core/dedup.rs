use crate::api::model::FetchReport;
use crate::error::AppResult;
use crate::io;
use crate::logging::{log, LogLevel};
use crate::model::common::FetchTarget;
use crate::model::course::CourseRecord;
use crate::model::output::FetchStatistics;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupResult {
    pub unique: Vec<CourseRecord>,
    pub duplicates_removed: usize,
}

/// Successful records in report order; every other outcome is dropped.
pub fn successful_records(reports: Vec<FetchReport<CourseRecord>>) -> Vec<CourseRecord> {
    reports
        .into_iter()
        .filter_map(|report| report.outcome.success())
        .collect()
}

/// Keeps the first record per natural key. Applying it twice changes nothing.
pub fn dedup_records(records: Vec<CourseRecord>) -> DedupResult {
    let mut seen = HashSet::with_capacity(records.len());
    let mut unique = Vec::with_capacity(records.len());
    let mut duplicates_removed = 0;

    for record in records {
        if seen.insert(record.natural_key()) {
            unique.push(record);
        } else {
            duplicates_removed += 1;
        }
    }

    DedupResult {
        unique,
        duplicates_removed,
    }
}

#[derive(Debug, Clone)]
pub struct WrittenDataset {
    pub records_path: PathBuf,
    pub stats_path: PathBuf,
    pub failed_path: Option<PathBuf>,
}

/// `<dir>/<stem>_stats.json` next to the dataset.
pub fn stats_path_for(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "courses".to_string());
    output.with_file_name(format!("{}_stats.json", stem))
}

pub fn failed_path_for(output: &Path, now: chrono::DateTime<chrono::Local>) -> PathBuf {
    output.with_file_name(format!("failed_{}.txt", now.format("%Y%m%d_%H%M%S")))
}

/// Persists the unique records, their statistics and, if any, the failed
/// targets for resubmission. Each file is replaced atomically.
pub async fn write_current_dataset(
    output: &Path,
    result: DedupResult,
    mut statistics: FetchStatistics,
    failed_targets: &[FetchTarget],
) -> AppResult<WrittenDataset> {
    statistics.unique_courses = Some(result.unique.len());
    statistics.duplicates_removed = Some(result.duplicates_removed);

    if result.duplicates_removed > 0 {
        log(
            LogLevel::Info,
            &format!("Removed {} duplicate course(s)", result.duplicates_removed),
        );
    }

    let unique_count = result.unique.len();
    io::save_json(
        output.to_path_buf(),
        result.unique,
        "current dataset".to_string(),
    )
    .await?;
    log(
        LogLevel::Success,
        &format!("Saved {} courses to {}", unique_count, output.display()),
    );

    let stats_path = stats_path_for(output);
    io::save_json(stats_path.clone(), statistics, "fetch statistics".to_string()).await?;

    let failed_path = if failed_targets.is_empty() {
        None
    } else {
        let path = failed_path_for(output, chrono::Local::now());
        io::write_lines(&path, failed_targets).await?;
        log(
            LogLevel::Warning,
            &format!(
                "{} failed target(s) written to {}",
                failed_targets.len(),
                path.display()
            ),
        );
        Some(path)
    };

    Ok(WrittenDataset {
        records_path: output.to_path_buf(),
        stats_path,
        failed_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::model::FetchOutcome;
    use chrono::TimeZone;

    fn course(title: &str, code: &str, term: &str, url: &str) -> CourseRecord {
        CourseRecord {
            course_title: title.into(),
            subject_catalog: code.into(),
            year_term: term.into(),
            course_url: url.into(),
            ..Default::default()
        }
    }

    #[test]
    fn first_occurrence_wins_and_is_idempotent() {
        let records = vec![
            course("Intro", "CS 50", "2025 Fall", "course/CS50/2025-Fall/001"),
            course("Intro", "CS 50", "2025 Fall", "course/CS50/2025-Fall/002"),
            course("Intro", "CS 50", "2026 Spring", "course/CS50/2026-Spring/001"),
            course("Writing", "EXPOS 20", "2025 Fall", "course/EXPOS20/2025-Fall/001"),
        ];

        let once = dedup_records(records);
        assert_eq!(once.unique.len(), 3);
        assert_eq!(once.duplicates_removed, 1);
        assert_eq!(once.unique[0].course_url, "course/CS50/2025-Fall/001");

        let twice = dedup_records(once.unique.clone());
        assert_eq!(twice.unique, once.unique);
        assert_eq!(twice.duplicates_removed, 0);
    }

    #[test]
    fn only_successes_survive() {
        let target = FetchTarget::from_path("course/X/2025-Fall/1");
        let report = |outcome| FetchReport {
            target: target.clone(),
            outcome,
            attempts: 1,
            delays: Vec::new(),
        };
        let records = successful_records(vec![
            report(FetchOutcome::Success(course("A", "A 1", "T", ""))),
            report(FetchOutcome::NotFound),
            report(FetchOutcome::ParseFailed("no title".into())),
            report(FetchOutcome::Timeout),
        ]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].course_title, "A");
    }

    #[test]
    fn side_files_sit_next_to_output() {
        let out = Path::new("results/all_courses.json");
        assert_eq!(stats_path_for(out), Path::new("results/all_courses_stats.json"));
        let now = chrono::Local.with_ymd_and_hms(2025, 9, 1, 8, 30, 5).unwrap();
        assert_eq!(
            failed_path_for(out, now),
            Path::new("results/failed_20250901_083005.txt")
        );
    }

    #[tokio::test]
    async fn writes_dataset_stats_and_failures() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("all_courses.json");
        let result = dedup_records(vec![
            course("A", "A 1", "2025 Fall", "course/A1/2025-Fall/001"),
            course("A", "A 1", "2025 Fall", "course/A1/2025-Fall/001"),
        ]);
        let failed = vec![FetchTarget::from_path("course/Z/2025-Fall/001")];

        let written = write_current_dataset(&output, result, FetchStatistics::default(), &failed)
            .await
            .unwrap();

        let records: Vec<CourseRecord> = io::load_json(&written.records_path).await.unwrap();
        assert_eq!(records.len(), 1);
        let stats: FetchStatistics = io::load_json(&written.stats_path).await.unwrap();
        assert_eq!(stats.unique_courses, Some(1));
        assert_eq!(stats.duplicates_removed, Some(1));
        let failed_path = written.failed_path.unwrap();
        assert_eq!(
            io::read_lines(&failed_path).await.unwrap(),
            vec!["course/Z/2025-Fall/001".to_string()]
        );
    }

    #[tokio::test]
    async fn no_failure_file_without_failures() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("all_courses.json");
        let written = write_current_dataset(
            &output,
            DedupResult::default(),
            FetchStatistics::default(),
            &[],
        )
        .await
        .unwrap();
        assert!(written.failed_path.is_none());
        assert!(output.exists());
    }
}
