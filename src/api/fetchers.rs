use super::executor::FetchExecutor;
use super::model::{
    ApiSearchResponse, ApiSectionGroupResponse, DecodeError, FetchReport, ListingPage,
};
use crate::config::SearchQuery;
use crate::model::common::FetchTarget;
use crate::model::course::CourseRecord;
use crate::transform::{detail, listing};
use bytes::Bytes;
use serde_json::Value;

pub fn page_target(query: &SearchQuery, page: u64) -> FetchTarget {
    FetchTarget::from_path(&query.page_path(page))
}

fn parse_search(body: &Bytes) -> Result<ApiSearchResponse, DecodeError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(DecodeError::Incomplete("empty search response".into()));
    }
    serde_json::from_slice(body)
        .map_err(|e| DecodeError::Incomplete(format!("invalid search JSON: {}", e)))
}

pub fn decode_probe(_: &FetchTarget, body: Bytes) -> Result<u64, DecodeError> {
    parse_search(&body).map(|resp| resp.total_hits)
}

pub fn decode_search_page(_: &FetchTarget, body: Bytes) -> Result<ListingPage, DecodeError> {
    let resp = parse_search(&body)?;
    match resp.hits {
        Some(hits) if !hits.trim().is_empty() => {
            Ok(listing::extract_listing(&hits, resp.total_hits))
        }
        _ => Err(DecodeError::Incomplete("search page without hits".into())),
    }
}

/// A group that yields no course links is incomplete, as is any response
/// shape other than HTML or a path list.
pub fn decode_section_group(_: &FetchTarget, body: Bytes) -> Result<Vec<FetchTarget>, DecodeError> {
    let resp: ApiSectionGroupResponse = serde_json::from_slice(&body)
        .map_err(|e| DecodeError::Incomplete(format!("invalid section JSON: {}", e)))?;

    let targets: Vec<FetchTarget> = match resp {
        ApiSectionGroupResponse::Html { html } => listing::extract_group_links(&html),
        ApiSectionGroupResponse::Paths(items) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|path| path.contains("/course/"))
            .filter_map(FetchTarget::new)
            .collect(),
        ApiSectionGroupResponse::Other(_) => {
            return Err(DecodeError::Incomplete("unrecognised section group shape".into()))
        }
    };

    if targets.is_empty() {
        return Err(DecodeError::Incomplete("section group without course links".into()));
    }
    Ok(targets)
}

pub fn decode_course_detail(target: &FetchTarget, body: Bytes) -> Result<CourseRecord, DecodeError> {
    let html = String::from_utf8_lossy(&body);
    if html.trim().is_empty() {
        return Err(DecodeError::Incomplete("empty detail page".into()));
    }
    let mut record = detail::extract_course_record(&html, target)
        .map_err(|e| DecodeError::Rejected(e.to_string()))?;
    record.fetched_at = Some(chrono::Local::now().to_rfc3339());
    Ok(record)
}

pub async fn fetch_probe(executor: &FetchExecutor, query: &SearchQuery) -> FetchReport<u64> {
    executor.execute(&page_target(query, 1), decode_probe).await
}

pub async fn fetch_search_page(
    executor: &FetchExecutor,
    query: &SearchQuery,
    page: u64,
) -> FetchReport<ListingPage> {
    executor
        .execute(&page_target(query, page), decode_search_page)
        .await
}

pub async fn fetch_section_group(
    executor: &FetchExecutor,
    group: &FetchTarget,
) -> FetchReport<Vec<FetchTarget>> {
    executor.execute(group, decode_section_group).await
}

pub async fn fetch_course_detail(
    executor: &FetchExecutor,
    target: &FetchTarget,
) -> FetchReport<CourseRecord> {
    executor.execute(target, decode_course_detail).await
}
