use crate::error::{AppError, AppResult};
use crate::io;
use crate::logging::{log, LogLevel};
use crate::model::analytics::AnalyticsMap;
use crate::model::course::CourseRecord;
use crate::model::output::MergedEntry;
use std::path::Path;

/// Everything the merge stage reads, loaded up front so no file is touched
/// while merging.
#[derive(Debug, Default)]
pub struct MergeInputs {
    pub courses: Vec<CourseRecord>,
    pub analytics: AnalyticsMap,
    pub previous: Option<Vec<MergedEntry>>,
}

impl MergeInputs {
    /// Current courses and analytics are required and must be non-empty.
    /// The previous snapshot is optional: missing is silent, broken is a
    /// warning, and either way reconciliation is skipped.
    pub async fn load(
        courses_path: &Path,
        analytics_path: &Path,
        previous_path: &Path,
    ) -> AppResult<Self> {
        let (courses, analytics) = tokio::try_join!(
            io::load_json::<Vec<CourseRecord>>(courses_path),
            io::load_json::<AnalyticsMap>(analytics_path),
        )?;

        if courses.is_empty() {
            return Err(AppError::input_invalid(courses_path, "no course records"));
        }
        if analytics.is_empty() {
            return Err(AppError::input_invalid(analytics_path, "no analytics entries"));
        }
        log(
            LogLevel::Info,
            &format!(
                "Loaded {} current records and analytics for {} courses",
                courses.len(),
                analytics.len()
            ),
        );

        let previous = match io::load_optional_json::<Vec<MergedEntry>>(previous_path).await {
            Ok(Some(entries)) => {
                log(
                    LogLevel::Info,
                    &format!(
                        "Loaded previous snapshot with {} entries from {}",
                        entries.len(),
                        previous_path.display()
                    ),
                );
                Some(entries)
            }
            Ok(None) => None,
            Err(e) => {
                log(
                    LogLevel::Warning,
                    &format!("Ignoring previous snapshot: {}", e),
                );
                None
            }
        };

        Ok(MergeInputs {
            courses,
            analytics,
            previous,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    fn courses_json() -> String {
        json!([{"course_id": "1", "course_title": "A", "subject_catalog": "A 1"}]).to_string()
    }

    fn analytics_json() -> String {
        json!({"1": {"latest_course_rating": 4.2, "semesters": {}}}).to_string()
    }

    #[tokio::test]
    async fn loads_all_three_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let courses = write(dir.path(), "courses.json", &courses_json());
        let analytics = write(dir.path(), "analytics.json", &analytics_json());
        let previous = write(
            dir.path(),
            "master.json",
            &json!([{"course_id": "1", "current_sections": []}]).to_string(),
        );

        let inputs = MergeInputs::load(&courses, &analytics, &previous).await.unwrap();
        assert_eq!(inputs.courses.len(), 1);
        assert_eq!(inputs.analytics["1"].latest_course_rating, 4.2);
        assert_eq!(inputs.previous.map(|p| p.len()), Some(1));
    }

    #[tokio::test]
    async fn previous_snapshot_problems_are_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let courses = write(dir.path(), "courses.json", &courses_json());
        let analytics = write(dir.path(), "analytics.json", &analytics_json());

        let missing = dir.path().join("absent.json");
        let inputs = MergeInputs::load(&courses, &analytics, &missing).await.unwrap();
        assert!(inputs.previous.is_none());

        let broken = write(dir.path(), "broken.json", "[{");
        let inputs = MergeInputs::load(&courses, &analytics, &broken).await.unwrap();
        assert!(inputs.previous.is_none());
    }

    #[tokio::test]
    async fn required_inputs_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let courses = write(dir.path(), "courses.json", &courses_json());
        let analytics = write(dir.path(), "analytics.json", &analytics_json());
        let previous = dir.path().join("master.json");

        let err = MergeInputs::load(&dir.path().join("nope.json"), &analytics, &previous)
            .await
            .unwrap_err();
        assert!(err.is_fatal_input());
        assert!(matches!(err, AppError::InputMissing { .. }));

        let empty = write(dir.path(), "empty.json", "{}");
        let err = MergeInputs::load(&courses, &empty, &previous)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InputInvalid { .. }));

        let garbage = write(dir.path(), "garbage.json", "not json");
        let err = MergeInputs::load(&garbage, &analytics, &previous)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InputInvalid { .. }));
    }
}
