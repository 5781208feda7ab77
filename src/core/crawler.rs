use crate::api::executor::FetchExecutor;
use crate::api::fetchers;
use crate::api::model::{FetchOutcome, FetchReport, ListingPage};
use crate::config::{self, SearchQuery};
use crate::core::stats::Progress;
use crate::logging::{log, LogLevel};
use crate::model::common::FetchTarget;
use crate::model::output::{CrawlStatistics, DiscoveryResult};
use crate::utils;
use std::collections::BTreeSet;
use std::time::Instant;
use tokio::task::JoinSet;

enum CrawlEvent {
    Page(u64, FetchReport<ListingPage>),
    Group(FetchTarget, FetchReport<Vec<FetchTarget>>),
}

fn spawn_group(tasks: &mut JoinSet<CrawlEvent>, executor: &FetchExecutor, group: FetchTarget) {
    let executor = executor.clone();
    tasks.spawn(async move {
        let report = fetchers::fetch_section_group(&executor, &group).await;
        CrawlEvent::Group(group, report)
    });
}

fn finish(
    mut statistics: CrawlStatistics,
    targets: BTreeSet<FetchTarget>,
    failed_pages: Vec<u64>,
    failed_groups: Vec<String>,
    start: Instant,
) -> DiscoveryResult {
    let elapsed = start.elapsed();
    statistics.total_urls = targets.len();
    statistics.failed_groups = failed_groups.len();
    statistics.elapsed_secs = elapsed.as_secs_f64();
    statistics.pages_per_second = utils::per_second(statistics.total_pages as usize, elapsed);
    statistics.timestamp = chrono::Local::now().to_rfc3339();

    DiscoveryResult {
        targets: targets.into_iter().collect(),
        failed_pages,
        failed_groups,
        statistics,
    }
}

/// Walks every listing page for `query` and returns the deduplicated targets.
///
/// All pages are submitted at once and only the executor's limiter bounds
/// them. Section groups found on a page are expanded by further tasks on
/// the same join set, so this loop is the only owner of the target set.
/// Failed pages and groups are recorded and never abort the crawl.
pub async fn discover(executor: &FetchExecutor, query: &SearchQuery) -> DiscoveryResult {
    let start = Instant::now();
    let mut statistics = CrawlStatistics::default();
    let mut targets: BTreeSet<FetchTarget> = BTreeSet::new();
    let mut failed_pages: Vec<u64> = Vec::new();
    let mut failed_groups: Vec<String> = Vec::new();

    let probe = fetchers::fetch_probe(executor, query).await;
    statistics.retries += u64::from(probe.retries());
    let total_hits = match probe.outcome {
        FetchOutcome::Success(hits) => hits,
        other => {
            log(
                LogLevel::Error,
                &format!("Probe for {} {} failed: {}", query.year, query.term, other.reason()),
            );
            0
        }
    };

    if total_hits == 0 {
        log(
            LogLevel::Warning,
            &format!(
                "No results for {} {} (school: {}). Nothing to crawl.",
                query.year, query.term, query.school
            ),
        );
        return finish(statistics, targets, failed_pages, failed_groups, start);
    }

    let total_pages = config::total_pages(total_hits);
    statistics.total_hits = total_hits;
    statistics.total_pages = total_pages;
    log(
        LogLevel::Info,
        &format!(
            "Found {} hits across {} pages for {} {} (school: {})",
            total_hits, total_pages, query.year, query.term, query.school
        ),
    );

    let mut tasks: JoinSet<CrawlEvent> = JoinSet::new();
    for page in 1..=total_pages {
        let executor = executor.clone();
        let query = query.clone();
        tasks.spawn(async move {
            let report = fetchers::fetch_search_page(&executor, &query, page).await;
            CrawlEvent::Page(page, report)
        });
    }

    let mut progress = Progress::new("Pages", total_pages as usize);
    let mut lost_tasks = 0usize;

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(CrawlEvent::Page(page, report)) => {
                statistics.retries += u64::from(report.retries());
                match report.outcome {
                    FetchOutcome::Success(listing) => {
                        statistics.successful_pages += 1;
                        statistics.total_courses += listing.course_count;
                        targets.extend(listing.targets);
                        for group in listing.groups {
                            spawn_group(&mut tasks, executor, group);
                        }
                        progress.tick(true);
                    }
                    other => {
                        log(
                            LogLevel::Warning,
                            &format!("Page {} failed: {}", page, other.reason()),
                        );
                        failed_pages.push(page);
                        progress.tick(false);
                    }
                }
            }
            Ok(CrawlEvent::Group(group, report)) => {
                statistics.retries += u64::from(report.retries());
                match report.outcome {
                    FetchOutcome::Success(sections) => targets.extend(sections),
                    other => {
                        log(
                            LogLevel::Warning,
                            &format!("Section group '{}' failed: {}", group, other.reason()),
                        );
                        failed_groups.push(group.to_string());
                    }
                }
            }
            Err(e) => {
                log(LogLevel::Error, &format!("Crawl task panicked: {}", e));
                lost_tasks += 1;
            }
        }
    }

    failed_pages.sort_unstable();
    statistics.failed_pages = failed_pages.len() + lost_tasks;
    finish(statistics, targets, failed_pages, failed_groups, start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchSettings;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn executor_for(server: &MockServer) -> FetchExecutor {
        FetchExecutor::new(&FetchSettings {
            base_url: server.uri(),
            max_concurrent: 4,
            max_retries: 1,
            base_delay: Duration::from_millis(5),
            ..FetchSettings::discovery_defaults()
        })
        .unwrap()
    }

    async fn mount_page(server: &MockServer, page: u64, total_hits: u64, hits: &str) {
        Mock::given(method("GET"))
            .and(path("/search/"))
            .and(query_param("page", page.to_string()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({
                    "total_hits": total_hits,
                    "hits": hits,
                })),
            )
            .mount(server)
            .await;
    }

    fn card(inner: &str) -> String {
        format!(r#"<div class="bg-white">{}</div>"#, inner)
    }

    #[tokio::test]
    async fn zero_hits_stops_after_probe() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total_hits": 0})))
            .expect(1)
            .mount(&server)
            .await;

        let result = discover(&executor_for(&server), &SearchQuery::default()).await;

        assert!(result.targets.is_empty());
        assert!(result.failed_pages.is_empty());
        assert_eq!(result.statistics.total_pages, 0);
    }

    #[tokio::test]
    async fn pages_and_groups_merge_into_one_sorted_set() {
        let server = MockServer::start().await;
        let page_one = [
            card(r#"<a href="/course/COMPSCI50/2025-Fall/001">CS50</a>"#),
            card(r#"<button class="hu-multi-sections" data-url="/multi/EXPOS20">All</button>"#),
        ]
        .concat();
        let page_two = [
            card(r#"<a href="/course/COMPSCI50/2025-Fall/001">CS50 again</a>"#),
            card(r#"<a href="/course/AFRAMER11/2025-Fall/001">AAAS</a>"#),
        ]
        .concat();
        mount_page(&server, 1, 20, &page_one).await;
        mount_page(&server, 2, 20, &page_two).await;
        Mock::given(method("GET"))
            .and(path("/multi/EXPOS20"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "html": r#"<a href="/course/EXPOS20/2025-Fall/001">1</a><a href="/course/EXPOS20/2025-Fall/002">2</a>"#
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = discover(&executor_for(&server), &SearchQuery::default()).await;

        let paths: Vec<&str> = result.targets.iter().map(FetchTarget::as_str).collect();
        assert_eq!(
            paths,
            [
                "course/AFRAMER11/2025-Fall/001",
                "course/COMPSCI50/2025-Fall/001",
                "course/EXPOS20/2025-Fall/001",
                "course/EXPOS20/2025-Fall/002",
            ]
        );
        assert_eq!(result.statistics.total_pages, 2);
        assert_eq!(result.statistics.successful_pages, 2);
        assert_eq!(result.statistics.total_courses, 4);
        assert_eq!(result.statistics.total_urls, 4);
        assert!(result.failed_pages.is_empty());
    }

    #[tokio::test]
    async fn failed_pages_are_recorded_not_fatal() {
        let server = MockServer::start().await;
        let page_one = [
            card(r#"<a href="/course/GOV1010/2025-Fall/001">Gov</a>"#),
            card(r#"<button class="hu-multi-sections" data-url="/multi/broken">All</button>"#),
        ]
        .concat();
        mount_page(&server, 1, 30, &page_one).await;
        Mock::given(method("GET"))
            .and(path("/search/"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/multi/broken"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = discover(&executor_for(&server), &SearchQuery::default()).await;

        assert_eq!(result.failed_pages, vec![2]);
        assert_eq!(result.statistics.failed_pages, 1);
        assert_eq!(result.statistics.successful_pages, 1);
        assert_eq!(result.targets.len(), 1);
        assert_eq!(result.failed_groups, vec!["multi/broken".to_string()]);
        assert_eq!(result.statistics.failed_groups, 1);
        assert_eq!(result.statistics.total_courses, 2);
    }

    #[tokio::test]
    async fn empty_group_is_retried_then_recorded() {
        let server = MockServer::start().await;
        let page_one =
            card(r#"<button class="hu-multi-sections" data-url="/multi/EXPOS20">All</button>"#);
        mount_page(&server, 1, 1, &page_one).await;
        Mock::given(method("GET"))
            .and(path("/multi/EXPOS20"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"html": ""})))
            .expect(2)
            .mount(&server)
            .await;

        let result = discover(&executor_for(&server), &SearchQuery::default()).await;

        assert!(result.targets.is_empty());
        assert_eq!(result.failed_groups, vec!["multi/EXPOS20".to_string()]);
        assert_eq!(result.statistics.failed_groups, 1);
        assert_eq!(result.statistics.total_courses, 1);
    }
}
