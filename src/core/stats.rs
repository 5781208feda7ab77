use crate::api::model::{FetchOutcome, FetchReport};
use crate::logging::{log, LogLevel};
use crate::model::common::FetchTarget;
use crate::model::output::{CleanStatistics, CrawlStatistics, FetchStatistics, MergeSummary};
use crate::utils;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct CategoryStats {
    pub ok: usize,
    pub fail: usize,
    pub skip_or_empty: usize,
    pub total_tasks: usize,
}

impl CategoryStats {
    pub fn add_ok(&mut self) {
        self.ok += 1;
    }
    pub fn add_fail(&mut self) {
        self.fail += 1;
    }
    pub fn set_total(&mut self, total: usize) {
        self.total_tasks = total;
    }
    pub fn get_processed(&self) -> usize {
        self.ok + self.fail + self.skip_or_empty
    }
}

pub type RunStats = BTreeMap<String, CategoryStats>;

pub const LISTING_PAGES: &str = "Listing Pages";
pub const SECTION_GROUPS: &str = "Section Groups";
pub const DETAIL_FETCH: &str = "Detail Fetch";
pub const SAVE_FILES: &str = "Save Files";

const CATEGORY_ORDER: [&str; 4] = [LISTING_PAGES, SECTION_GROUPS, DETAIL_FETCH, SAVE_FILES];
const FETCH_CATEGORIES: [&str; 3] = [LISTING_PAGES, SECTION_GROUPS, DETAIL_FETCH];

pub fn initialize_stats() -> RunStats {
    CATEGORY_ORDER
        .iter()
        .map(|name| (name.to_string(), CategoryStats::default()))
        .collect()
}

pub fn record_crawl(stats: &mut RunStats, crawl: &CrawlStatistics) {
    let pages = stats.entry(LISTING_PAGES.to_string()).or_default();
    pages.ok += crawl.successful_pages;
    pages.fail += crawl.failed_pages;
    pages.set_total(crawl.total_pages as usize);

    let groups = stats.entry(SECTION_GROUPS.to_string()).or_default();
    groups.fail += crawl.failed_groups;
    groups.set_total(groups.get_processed());
}

pub fn record_fetch(stats: &mut RunStats, fetch: &FetchStatistics) {
    let detail = stats.entry(DETAIL_FETCH.to_string()).or_default();
    detail.ok += fetch.successful;
    detail.skip_or_empty += fetch.not_found + fetch.parse_failed;
    detail.fail += fetch.failed;
    detail.set_total(fetch.total_requested);
}

pub fn record_save(stats: &mut RunStats, ok: bool) {
    let save = stats.entry(SAVE_FILES.to_string()).or_default();
    if ok {
        save.add_ok();
    } else {
        save.add_fail();
    }
    save.set_total(save.get_processed());
}

/// Per-item progress; logs each completion at debug and every tenth at info.
pub struct Progress {
    label: &'static str,
    total: usize,
    done: usize,
    failed: usize,
    next_report: usize,
}

impl Progress {
    pub fn new(label: &'static str, total: usize) -> Self {
        Progress {
            label,
            total,
            done: 0,
            failed: 0,
            next_report: Self::step(total),
        }
    }

    fn step(total: usize) -> usize {
        (total / 10).max(1)
    }

    pub fn tick(&mut self, ok: bool) {
        self.done += 1;
        if !ok {
            self.failed += 1;
        }
        tracing::debug!(
            target: "progress",
            label = self.label,
            done = self.done,
            total = self.total,
            failed = self.failed
        );
        if self.done >= self.next_report || self.done == self.total {
            self.next_report = self.done + Self::step(self.total);
            log(
                LogLevel::Info,
                &format!(
                    "{}: {}/{} done ({} failed)",
                    self.label, self.done, self.total, self.failed
                ),
            );
        }
    }

    pub fn done(&self) -> usize {
        self.done
    }
}

/// Folds per-target reports into [`FetchStatistics`] plus the retry list.
///
/// Anything that is not a success, a 404 or a parse failure counts as
/// failed and its target is kept for resubmission.
#[derive(Debug, Default)]
pub struct FetchTally {
    statistics: FetchStatistics,
    failed_targets: Vec<FetchTarget>,
}

impl FetchTally {
    pub fn new(total_requested: usize) -> Self {
        FetchTally {
            statistics: FetchStatistics {
                total_requested,
                ..FetchStatistics::default()
            },
            failed_targets: Vec::new(),
        }
    }

    pub fn record<T>(&mut self, report: &FetchReport<T>) {
        let stats = &mut self.statistics;
        stats.retries += u64::from(report.retries());
        *stats
            .by_outcome
            .entry(report.outcome.kind().as_str().to_string())
            .or_default() += 1;

        match &report.outcome {
            FetchOutcome::Success(_) => stats.successful += 1,
            FetchOutcome::NotFound => stats.not_found += 1,
            FetchOutcome::ParseFailed(_) => stats.parse_failed += 1,
            _ => {
                stats.failed += 1;
                self.failed_targets.push(report.target.clone());
            }
        }
    }

    pub fn finish(mut self, elapsed: Duration) -> (FetchStatistics, Vec<FetchTarget>) {
        self.statistics.elapsed_secs = elapsed.as_secs_f64();
        self.statistics.courses_per_second = utils::per_second(self.statistics.successful, elapsed);
        self.statistics.timestamp = chrono::Local::now().to_rfc3339();
        self.failed_targets.sort();
        (self.statistics, self.failed_targets)
    }
}

fn banner(title: &str) {
    let sep = "=".repeat(60);
    println!("\n{}\n{:^60}\n{}", sep, title, sep);
}

pub fn print_crawl_statistics(stats: &CrawlStatistics) {
    banner("Discovery Summary");
    println!("Total hits:        {}", stats.total_hits);
    println!("Courses listed:    {}", stats.total_courses);
    println!("Unique targets:    {}", stats.total_urls);
    println!(
        "Pages:             {}/{} ok, {} failed",
        stats.successful_pages, stats.total_pages, stats.failed_pages
    );
    println!("Failed groups:     {}", stats.failed_groups);
    println!("Retries:           {}", stats.retries);
    println!(
        "Elapsed:           {:.2}s ({:.2} pages/s)",
        stats.elapsed_secs, stats.pages_per_second
    );
}

pub fn print_fetch_statistics(stats: &FetchStatistics) {
    banner("Detail Fetch Summary");
    println!("Requested:         {}", stats.total_requested);
    println!("Successful:        {}", stats.successful);
    println!("Not found:         {}", stats.not_found);
    println!("Parse failed:      {}", stats.parse_failed);
    println!("Failed:            {}", stats.failed);
    println!("Retries:           {}", stats.retries);
    if let Some(unique) = stats.unique_courses {
        println!(
            "Unique courses:    {} ({} duplicates removed)",
            unique,
            stats.duplicates_removed.unwrap_or(0)
        );
    }
    println!(
        "Elapsed:           {:.2}s ({:.2} courses/s)",
        stats.elapsed_secs, stats.courses_per_second
    );
    if !stats.by_outcome.is_empty() {
        println!("{}", "-".repeat(60));
        println!("{:<24} {:<8}", "Outcome", "Count");
        for (kind, count) in &stats.by_outcome {
            println!("{:<24} {:<8}", kind, count);
        }
    }
}

pub fn print_clean_statistics(stats: &CleanStatistics) {
    banner("Catalog Cleaning Summary");
    println!("Records processed: {}", stats.total);
    println!("MIT courses:       {}", stats.mit_courses);
    println!("Sections split:    {}", stats.sections_extracted);
    println!("  numeric:         {}", stats.numeric_sections);
    println!("  letter:          {}", stats.letter_sections);
    println!("  mixed:           {}", stats.mixed_sections);
    println!("Catalogs cleaned:  {}", stats.subject_catalog_cleaned);
    println!("Empty catalogs:    {}", stats.empty_subject_catalog);
}

pub fn print_merge_summary(summary: &MergeSummary) {
    banner("Merge Summary");
    println!("Courses:           {}", summary.total_courses);
    println!("Sections:          {}", summary.total_sections);
    println!(
        "With analytics:    {} (without: {})",
        summary.courses_with_analytics, summary.courses_without_analytics
    );
    println!("With ratings:      {}", summary.courses_with_ratings);
    println!("Multi-section:     {}", summary.courses_with_multiple_sections);
    println!("Average rating:    {:.2}", summary.avg_rating);
    println!("Average hours:     {:.2}", summary.avg_hours);
    println!("Locations kept:    {}", summary.locations_preserved);
    println!("Skipped (no id):   {}", summary.skipped_without_id);

    if !summary.top_rated_courses.is_empty() {
        println!("{}", "-".repeat(60));
        println!("Top rated:");
        for (i, course) in summary.top_rated_courses.iter().enumerate() {
            println!(
                "{:>3}. {:<16} {:<34} {:.2}",
                i + 1,
                course.course_code,
                course.course_title,
                course.value
            );
        }
    }
    if !summary.most_sections.is_empty() {
        println!("{}", "-".repeat(60));
        println!("Most sections:");
        for (i, course) in summary.most_sections.iter().enumerate() {
            println!(
                "{:>3}. {:<16} {:<34} {}",
                i + 1,
                course.course_code,
                course.course_title,
                course.value
            );
        }
    }
}

pub fn print_summary(stats: &RunStats, stage: &str, duration: Duration) {
    banner(&format!("Run Summary ({})", stage));
    println!("Total Run Time:    {:.3?}", duration);
    println!("{}", "-".repeat(60));
    println!(
        "{:<17} {:<8} {:<12} {:<8} {:<8}",
        "Category", "OK", "Skip/Empty", "Fail", "Total"
    );
    println!("{}", "-".repeat(60));

    for name in CATEGORY_ORDER {
        if let Some(s) = stats.get(name).filter(|s| s.total_tasks > 0) {
            println!(
                "{:<17} {:<8} {:<12} {:<8} {:<8}",
                name, s.ok, s.skip_or_empty, s.fail, s.total_tasks
            );
        }
    }
    println!("{}", "=".repeat(60));

    let fetch_failures: usize = FETCH_CATEGORIES
        .iter()
        .filter_map(|name| stats.get(*name))
        .map(|s| s.fail)
        .sum();
    let save_failures = stats.get(SAVE_FILES).map_or(0, |s| s.fail);
    if fetch_failures > 0 || save_failures > 0 {
        log(
            LogLevel::Warning,
            &format!(
                "Run completed with failures: {} fetch task(s) and {} save task(s) failed.",
                fetch_failures, save_failures
            ),
        );
    } else {
        log(LogLevel::Success, "Run completed successfully.");
    }

    let end_ts_str = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S %Z").to_string();
    log(
        LogLevel::Step,
        &format!("--- Run Finished at {} ---", end_ts_str),
    );
}

/// Per-item fetch failures are recorded, not fatal; only failed saves fail the run.
pub fn determine_exit_code(stats: &RunStats) -> i32 {
    if stats.get(SAVE_FILES).is_some_and(|s| s.fail > 0) {
        1
    } else {
        0
    }
}
