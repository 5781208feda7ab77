use crate::api::model::ListingPage;
use crate::config;
use crate::model::common::FetchTarget;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;

static CARD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.bg-white").expect("Invalid card selector"));
static MULTI_SECTION_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("button.hu-multi-sections").expect("Invalid multi-section selector")
});
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("Invalid link selector"));

fn card_links(card: ElementRef<'_>) -> BTreeSet<FetchTarget> {
    card.select(&LINK_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| config::COURSE_LINK_RE.is_match(href))
        .filter_map(FetchTarget::new)
        .collect()
}

/// Splits the rendered hits of one search page into direct targets and
/// section groups that still need expanding.
///
/// A card with a multi-section button contributes only its group; any
/// links it also renders are ignored. Cards with neither are skipped.
pub fn extract_listing(hits_html: &str, total_hits: u64) -> ListingPage {
    let document = Html::parse_fragment(hits_html);
    let mut page = ListingPage {
        total_hits,
        ..ListingPage::default()
    };

    for card in document.select(&CARD_SELECTOR) {
        if let Some(button) = card.select(&MULTI_SECTION_SELECTOR).next() {
            if let Some(group) = button.value().attr("data-url").and_then(FetchTarget::new) {
                page.groups.push(group);
                page.course_count += 1;
            }
            continue;
        }

        let links = card_links(card);
        if !links.is_empty() {
            page.targets.extend(links);
            page.course_count += 1;
        }
    }

    page
}

/// Section links inside the HTML fragment of a multi-section response.
pub fn extract_group_links(html: &str) -> Vec<FetchTarget> {
    let document = Html::parse_fragment(html);
    document
        .select(&LINK_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.contains("/course/"))
        .filter_map(FetchTarget::new)
        .collect()
}
