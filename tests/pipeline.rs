use catalog_sync::cli::CliArgs;
use catalog_sync::core::processor;
use catalog_sync::io;
use catalog_sync::model::course::CourseRecord;
use catalog_sync::model::output::{FetchStatistics, MergeSummary, MergedEntry};
use clap::Parser;
use serde_json::json;
use std::path::Path;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn detail_page(title: &str, catalog: &str, course_id: &str, location: &str) -> String {
    format!(
        r#"<html><body>
        <h1 class="text-lg">
            <div id="course-sub-cat"><span>{catalog}</span></div>
            <span id="course-title">{title}</span>
        </h1>
        <div id="course-time"><span>2025 Fall</span><span>Full Term</span></div>
        <div id="course-info"><span>Course ID:</span><span>{course_id}</span></div>
        <div id="course-location"><div class="flex"><span>{location}</span></div></div>
        </body></html>"#
    )
}

async fn mount_site(server: &MockServer) {
    let hits = [
        r#"<div class="bg-white"><a href="/course/GOV50/2025-Fall/001">Gov 50</a></div>"#,
        r#"<div class="bg-white"><a href="/course/HIST10/2025-Fall/1">Hist 10</a></div>"#,
        r#"<div class="bg-white"><button class="hu-multi-sections" data-url="/multi/HIST10">All sections</button></div>"#,
    ]
    .concat();
    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_hits": 3,
            "hits": hits,
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/multi/HIST10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            "/course/HIST10/2025-Fall/1",
            "/course/HIST10/2025-Fall/2",
        ])))
        .mount(server)
        .await;

    let pages = [
        ("/course/GOV50/2025-Fall/001", detail_page("Data Science", "GOV 50", "456", "Sign In to see location")),
        ("/course/HIST10/2025-Fall/1", detail_page("World History", "HIST 10 1", "123", "Hall 1")),
        ("/course/HIST10/2025-Fall/2", detail_page("World History", "HIST 10 2", "123", "")),
    ];
    for (page_path, body) in pages {
        Mock::given(method("GET"))
            .and(path(page_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(server)
            .await;
    }
}

async fn run(args: &[&str]) -> i32 {
    let mut argv = vec!["catalog_sync"];
    argv.extend_from_slice(args);
    let cli = CliArgs::try_parse_from(argv).unwrap();
    processor::run(cli.command).await.unwrap()
}

fn s(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[tokio::test]
async fn discover_fetch_clean_merge() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let base_url = server.uri();

    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("results");
    let targets = results.join("course_lines.txt");
    let courses = results.join("all_courses.json");
    let cleaned = results.join("all_courses_cleaned.json");
    let analytics = dir.path().join("course_analytics.json");

    let code = run(&[
        "discover", "--base-url", &base_url, "--retries", "0", "--output", s(&targets),
    ])
    .await;
    assert_eq!(code, 0);
    assert_eq!(
        io::read_lines(&targets).await.unwrap(),
        [
            "course/GOV50/2025-Fall/001",
            "course/HIST10/2025-Fall/1",
            "course/HIST10/2025-Fall/2",
        ]
    );

    let code = run(&[
        "fetch", "--base-url", &base_url, "--retries", "0", "--chunk-size", "2",
        "--chunk-delay", "0", "--input", s(&targets), "--output", s(&courses),
    ])
    .await;
    assert_eq!(code, 0);
    let fetched: Vec<CourseRecord> = io::load_json(&courses).await.unwrap();
    assert_eq!(fetched.len(), 3);
    assert!(fetched.iter().all(|r| r.fetched_at.is_some()));
    let fetch_stats: FetchStatistics = io::load_json(&results.join("all_courses_stats.json"))
        .await
        .unwrap();
    assert_eq!(fetch_stats.successful, 3);
    assert_eq!(fetch_stats.unique_courses, Some(3));

    let code = run(&["clean", "--input", s(&courses), "--output", s(&cleaned)]).await;
    assert_eq!(code, 0);

    std::fs::write(
        &analytics,
        json!({
            "123": {
                "latest_course_rating": 4.5,
                "latest_hours_per_week": "6",
                "latest_semester": "2024 Fall",
                "semesters": {"2024 Fall": {"avg_course_rating": 4.5}}
            },
            "999": {"latest_course_rating": 5.0, "semesters": {"2020 Spring": {}}}
        })
        .to_string(),
    )
    .unwrap();
    std::fs::write(
        results.join("master_courses.json"),
        json!([{
            "course_id": "123",
            "current_sections": [
                {"section": "1", "location": "Old Hall"},
                {"section": "2", "location": "Hall 3"}
            ]
        }])
        .to_string(),
    )
    .unwrap();

    let code = run(&[
        "merge", "--courses", s(&cleaned), "--analytics", s(&analytics), "--out-dir", s(&results),
    ])
    .await;
    assert_eq!(code, 0);

    let merged: Vec<MergedEntry> = io::load_json(&results.join("master_courses.json"))
        .await
        .unwrap();
    let codes: Vec<&str> = merged.iter().map(|e| e.course_code.as_str()).collect();
    assert_eq!(codes, ["GOV 50", "HIST 10"]);

    let gov = &merged[0];
    assert!(!gov.has_analytics());
    assert_eq!(gov.current_sections[0].section, "default");
    assert_eq!(gov.current_sections[0].location, "");

    let hist = &merged[1];
    assert_eq!(hist.course_id, "123");
    assert_eq!(hist.latest_course_rating, 4.5);
    assert_eq!(hist.latest_hours_per_week, 6.0);
    let sections: Vec<(&str, &str)> = hist
        .current_sections
        .iter()
        .map(|s| (s.section.as_str(), s.location.as_str()))
        .collect();
    assert_eq!(sections, [("1", "Hall 1"), ("2", "Hall 3")]);

    let summary: MergeSummary = io::load_json(&results.join("merge_summary.json"))
        .await
        .unwrap();
    assert_eq!(summary.total_courses, 2);
    assert_eq!(summary.total_sections, 3);
    assert_eq!(summary.courses_with_analytics, 1);
    assert_eq!(summary.locations_preserved, 1);
    assert_eq!(summary.top_rated_courses.len(), 1);
    assert!(results.join("last_updated.json").exists());
}

#[tokio::test]
async fn zero_hits_writes_an_empty_target_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total_hits": 0})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let targets = dir.path().join("lines.txt");
    let code = run(&[
        "discover", "--base-url", &server.uri(), "--output", s(&targets),
    ])
    .await;

    assert_eq!(code, 0);
    assert!(io::read_lines(&targets).await.unwrap().is_empty());
    assert!(dir.path().join("lines_stats.json").exists());
    assert!(!dir.path().join("lines_failed_pages.txt").exists());
}
