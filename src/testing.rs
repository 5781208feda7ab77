use crate::error::{AppError, AppResult};
use crate::logging::{log, LogLevel};
use crate::model::common::FetchTarget;
use crate::model::course::CourseRecord;
use crate::transform::detail;
use std::path::Path;
use tokio::fs;

/// Runs the detail extractor over a saved page, for spotting layout
/// changes on the site without touching the network.
pub async fn extract_detail_file(input_path: &Path, target: &FetchTarget) -> AppResult<CourseRecord> {
    log(LogLevel::Info, "--- Running Detail Extraction Check ---");
    log(
        LogLevel::Info,
        &format!("Input file: {}", input_path.display()),
    );

    let html = match fs::read_to_string(input_path).await {
        Ok(html) => html,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::input_missing(input_path))
        }
        Err(e) => return Err(AppError::input_invalid(input_path, e.to_string())),
    };

    let html_for_task = html;
    let target_for_task = target.clone();
    let record = crate::utils::run_blocking(move || {
        detail::extract_course_record(&html_for_task, &target_for_task)
    })
    .await;

    match record {
        Ok(record) => {
            let empty_fields = [
                ("subject_catalog", record.subject_catalog.is_empty()),
                ("course_id", record.course_id.is_empty()),
                ("year_term", record.year_term.is_empty()),
                ("instructors", record.instructors.is_empty()),
            ];
            for (name, _) in empty_fields.iter().filter(|(_, empty)| *empty) {
                log(
                    LogLevel::Warning,
                    &format!("Field '{}' came out empty; the page layout may have changed", name),
                );
            }
            Ok(record)
        }
        Err(e) => {
            log(LogLevel::Error, &format!("Extraction failed: {}", e));
            Err(e)
        }
    }
}
