use crate::api::executor::FetchExecutor;
use crate::api::fetchers;
use crate::cli::{
    CleanArgs, Command, DiscoverArgs, ExtractArgs, FetchCmdArgs, MergeArgs, SchemaArgs,
};
use crate::config::{self, FetchSettings};
use crate::core::data_store::MergeInputs;
use crate::core::stats::{self, CategoryStats, RunStats};
use crate::core::{crawler, dedup, merge, merged_schema, scheduler};
use crate::error::AppResult;
use crate::io;
use crate::logging::{log, LogLevel};
use crate::model::common::FetchTarget;
use crate::model::course::CourseRecord;
use crate::model::output::{LastUpdated, MergedEntry};
use crate::testing;
use crate::transform::catalog;
use chrono::Local;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Runs one pipeline stage and returns its exit code. Fatal input problems
/// come back as `Err` before anything is written.
pub async fn run(command: Command) -> AppResult<i32> {
    let start_ts_str = Local::now().format("%Y-%m-%d %H:%M:%S %Z").to_string();
    log(
        LogLevel::Step,
        &format!("--- Run started at {} ---", start_ts_str),
    );

    match command {
        Command::Discover(args) => run_discover(&args).await,
        Command::Fetch(args) => run_fetch(&args).await,
        Command::Clean(args) => run_clean(&args).await,
        Command::Merge(args) => run_merge(&args).await,
        Command::Extract(args) => run_extract(&args).await,
        Command::Schema(args) => run_schema(&args).await,
    }
}

fn note_save<T>(run_stats: &mut RunStats, what: &str, result: AppResult<T>) -> Option<T> {
    match result {
        Ok(value) => {
            stats::record_save(run_stats, true);
            Some(value)
        }
        Err(e) => {
            log(LogLevel::Error, &format!("Saving {} failed: {}", what, e));
            stats::record_save(run_stats, false);
            None
        }
    }
}

fn finish(run_stats: &RunStats, stage: &str, started: Instant) -> i32 {
    stats::print_summary(run_stats, stage, started.elapsed());
    stats::determine_exit_code(run_stats)
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!("{}{}", stem, suffix))
}

pub async fn run_discover(args: &DiscoverArgs) -> AppResult<i32> {
    let started = Instant::now();
    let settings = args.fetch.apply(FetchSettings::discovery_defaults())?;
    let query = args.query.query();
    let output = args.get_output();

    log(
        LogLevel::Step,
        &format!(
            "--- Discovery: {} {} (school: {}) ---",
            query.year, query.term, query.school
        ),
    );
    log(
        LogLevel::Info,
        &format!(
            "Concurrency {}, {} retries, base delay {:?}",
            settings.max_concurrent, settings.max_retries, settings.base_delay
        ),
    );

    let executor = FetchExecutor::new(&settings)?;
    let result = crawler::discover(&executor, &query).await;

    let mut run_stats = stats::initialize_stats();
    stats::record_crawl(&mut run_stats, &result.statistics);
    log_stage_completion(
        "Discovery",
        &run_stats[stats::LISTING_PAGES],
        started.elapsed(),
    );
    stats::print_crawl_statistics(&result.statistics);

    let saved = io::write_lines(&output, &result.targets).await;
    if note_save(&mut run_stats, "targets", saved).is_some() {
        log(
            LogLevel::Success,
            &format!("Wrote {} targets to {}", result.targets.len(), output.display()),
        );
    }

    let stats_path = dedup::stats_path_for(&output);
    let saved = io::save_json(
        stats_path,
        result.statistics.clone(),
        "crawl statistics".to_string(),
    )
    .await;
    note_save(&mut run_stats, "crawl statistics", saved);

    if !result.failed_pages.is_empty() {
        let failed_path = sibling_with_suffix(&output, "_failed_pages.txt");
        let pages: Vec<String> = result.failed_pages.iter().map(u64::to_string).collect();
        let saved = io::write_lines(&failed_path, &pages).await;
        if note_save(&mut run_stats, "failed pages", saved).is_some() {
            log(
                LogLevel::Warning,
                &format!(
                    "{} page(s) failed; listed in {}",
                    pages.len(),
                    failed_path.display()
                ),
            );
        }
    }

    Ok(finish(&run_stats, "discover", started))
}

async fn load_targets(path: &Path, sample: Option<usize>) -> AppResult<Vec<FetchTarget>> {
    let mut targets: Vec<FetchTarget> = io::read_lines(path)
        .await?
        .iter()
        .filter_map(|line| FetchTarget::new(line))
        .collect();
    if let Some(n) = sample {
        targets.truncate(n);
        log(
            LogLevel::Info,
            &format!("Sampling the first {} target(s)", targets.len()),
        );
    }
    Ok(targets)
}

pub async fn run_fetch(args: &FetchCmdArgs) -> AppResult<i32> {
    let started = Instant::now();
    let settings = args.fetch.apply(FetchSettings::default())?;
    let output = args.get_output();
    let targets = load_targets(&args.get_input(), args.sample).await?;

    log(
        LogLevel::Step,
        &format!(
            "--- Detail Fetch: {} targets in chunks of {} ---",
            targets.len(),
            settings.chunk_size
        ),
    );
    if targets.is_empty() {
        log(LogLevel::Warning, "No targets to fetch.");
    }

    let executor = FetchExecutor::new(&settings)?;
    let outcome = scheduler::run_chunked(
        &executor,
        &targets,
        settings.chunk_size,
        settings.chunk_delay,
        fetchers::decode_course_detail,
    )
    .await;

    let mut run_stats = stats::initialize_stats();
    stats::record_fetch(&mut run_stats, &outcome.statistics);
    log_stage_completion(
        "Detail Fetch",
        &run_stats[stats::DETAIL_FETCH],
        started.elapsed(),
    );

    let deduped = dedup::dedup_records(dedup::successful_records(outcome.reports));
    let mut statistics = outcome.statistics;
    statistics.unique_courses = Some(deduped.unique.len());
    statistics.duplicates_removed = Some(deduped.duplicates_removed);
    stats::print_fetch_statistics(&statistics);

    let written =
        dedup::write_current_dataset(&output, deduped, statistics, &outcome.failed_targets).await;
    note_save(&mut run_stats, "current dataset", written);

    Ok(finish(&run_stats, "fetch", started))
}

pub async fn run_clean(args: &CleanArgs) -> AppResult<i32> {
    let started = Instant::now();
    let input = args.get_input();
    let output = args.get_output();
    log(
        LogLevel::Step,
        &format!("--- Cleaning {} ---", input.display()),
    );

    let records: Vec<CourseRecord> = io::load_json(&input).await?;
    let (cleaned, clean_stats) = catalog::clean_records(records);
    stats::print_clean_statistics(&clean_stats);

    let mut run_stats = stats::initialize_stats();
    let count = cleaned.len();
    let saved = io::save_json(output.clone(), cleaned, "cleaned dataset".to_string()).await;
    if note_save(&mut run_stats, "cleaned dataset", saved).is_some() {
        log(
            LogLevel::Success,
            &format!("Saved {} cleaned records to {}", count, output.display()),
        );
    }

    Ok(finish(&run_stats, "clean", started))
}

pub async fn run_merge(args: &MergeArgs) -> AppResult<i32> {
    let started = Instant::now();
    let out_dir = args.get_out_dir();
    let snapshot_path = args.get_snapshot_path();
    log(LogLevel::Step, "--- Merge: current courses + analytics ---");

    let inputs = MergeInputs::load(
        &args.get_courses(),
        &args.get_analytics(),
        &args.get_previous(),
    )
    .await?;

    let outcome = merge::merge(&inputs.courses, &inputs.analytics, inputs.previous.as_deref());
    let summary = merge::summarize(
        &outcome.entries,
        outcome.locations_preserved,
        outcome.skipped_without_id,
    );

    if outcome.skipped_without_id > 0 {
        log(
            LogLevel::Info,
            &format!(
                "Dropped {} record(s) without a course id",
                outcome.skipped_without_id
            ),
        );
    }
    if outcome.locations_preserved > 0 {
        log(
            LogLevel::Warning,
            &format!(
                "{} location(s) were missing from this fetch and kept from the previous snapshot",
                outcome.locations_preserved
            ),
        );
    }

    let mut run_stats = stats::initialize_stats();
    let entry_count = outcome.entries.len();
    let saved = io::save_json(
        snapshot_path.clone(),
        outcome.entries,
        "merged snapshot".to_string(),
    )
    .await;
    if note_save(&mut run_stats, "merged snapshot", saved).is_some() {
        log(
            LogLevel::Success,
            &format!(
                "Saved {} merged courses to {}",
                entry_count,
                snapshot_path.display()
            ),
        );
    }

    let stamp = LastUpdated::at(Local::now());
    let saved = io::save_json(
        out_dir.join(config::LAST_UPDATED_FILE),
        stamp,
        "last updated".to_string(),
    )
    .await;
    note_save(&mut run_stats, "timestamp", saved);

    let saved = io::save_json(
        out_dir.join(config::MERGE_SUMMARY_FILE),
        summary.clone(),
        "merge summary".to_string(),
    )
    .await;
    note_save(&mut run_stats, "merge summary", saved);

    stats::print_merge_summary(&summary);
    Ok(finish(&run_stats, "merge", started))
}

pub async fn run_extract(args: &ExtractArgs) -> AppResult<i32> {
    let started = Instant::now();
    let input = args.get_input();
    let output = args.get_output();
    let target = args.get_target();
    log(
        LogLevel::Info,
        &format!("Extracting {} as '{}'", input.display(), target),
    );

    let record = testing::extract_detail_file(&input, &target).await?;
    log(
        LogLevel::Success,
        &format!(
            "Extracted '{}' ({})",
            record.course_title, record.subject_catalog
        ),
    );

    let mut run_stats = stats::initialize_stats();
    let saved = io::save_json(output.clone(), record, "extracted record".to_string()).await;
    if note_save(&mut run_stats, "extracted record", saved).is_some() {
        log(
            LogLevel::Success,
            &format!("Saved record to {}", output.display()),
        );
    }
    Ok(finish(&run_stats, "extract", started))
}

pub async fn run_schema(args: &SchemaArgs) -> AppResult<i32> {
    let started = Instant::now();
    let snapshot = match args.get_snapshot() {
        Some(path) => match io::load_optional_json::<Vec<MergedEntry>>(&path).await {
            Ok(Some(entries)) => Some(entries),
            Ok(None) => {
                log(
                    LogLevel::Warning,
                    &format!("Snapshot {} not found; using a placeholder example", path.display()),
                );
                None
            }
            Err(e) => {
                log(
                    LogLevel::Warning,
                    &format!("Ignoring snapshot: {}", e),
                );
                None
            }
        },
        None => None,
    };

    let mut run_stats = stats::initialize_stats();
    let files =
        merged_schema::create_merged_schema_files(snapshot.as_deref(), &args.get_out_dir()).await;
    if let Some(files) = note_save(&mut run_stats, "schema files", files) {
        log(
            LogLevel::Success,
            &format!(
                "Wrote {} and {}",
                files.schema_path.display(),
                files.example_path.display()
            ),
        );
    }
    Ok(finish(&run_stats, "schema", started))
}

fn log_stage_completion(stage: &str, stats: &CategoryStats, elapsed: Duration) {
    let level = if stats.fail > 0 {
        LogLevel::Warning
    } else {
        LogLevel::Success
    };
    log(
        level,
        &format!(
            "--- {} complete ({} OK, {} Skip/Empty, {} Fail / {} Total) | Elapsed: {:?} ---",
            stage, stats.ok, stats.skip_or_empty, stats.fail, stats.total_tasks, elapsed
        ),
    );
}
