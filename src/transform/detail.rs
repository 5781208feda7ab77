use crate::error::{AppError, AppResult};
use crate::model::common::{FetchTarget, WeekdayFlags};
use crate::model::course::CourseRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

macro_rules! selector {
    ($name:ident, $css:literal) => {
        static $name: Lazy<Selector> =
            Lazy::new(|| Selector::parse($css).expect(concat!("Invalid selector: ", $css)));
    };
}

selector!(TITLE_SELECTOR, "h1.text-lg");
selector!(TITLE_TEXT_SELECTOR, "span#course-title");
selector!(SUB_CAT_SELECTOR, "div#course-sub-cat");
selector!(TIME_SELECTOR, "div#course-time");
selector!(SPAN_SELECTOR, "span");
selector!(WEEKDAYS_SELECTOR, r#"div[role="group"][aria-label="Week Days"]"#);
selector!(WEEKDAY_SELECTOR, r#"div[role="text"]"#);
selector!(INFO_SELECTOR, "div#course-info");
selector!(STRONG_SELECTOR, "strong");
selector!(DESC_SELECTOR, "div#course-desc");
selector!(NOTES_SELECTOR, "div#course-notes");
selector!(CLASS_NOTES_SELECTOR, "div.course-page-class-notes");
selector!(PARAGRAPH_SELECTOR, "p");
selector!(LOCATION_SELECTOR, "div#course-location div.flex");
selector!(LINKS_SELECTOR, "div#course-links a[href]");
selector!(DIV_SELECTOR, "div");
selector!(INSTRUCTOR_SELECTOR, "div#course-instructor a.flex");

static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(19|20)\d{2}\b").expect("Invalid year regex"));

const DATE_DASHES: [&str; 3] = ["–", "—", " - "];
const TIME_DASHES: [&str; 3] = ["–", " - ", "-"];

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn next_sibling_named<'a>(el: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    el.next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sib| sib.value().name() == name)
}

fn direct_children_named<'a>(
    el: ElementRef<'a>,
    name: &'a str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    el.children()
        .filter_map(ElementRef::wrap)
        .filter(move |child| child.value().name() == name)
}

/// Splits `text` on the first dash variant present; only a clean two-way
/// split counts.
fn split_range(text: &str, dashes: &[&str]) -> Option<(String, String)> {
    let dash = dashes.iter().find(|d| text.contains(*d))?;
    let parts: Vec<&str> = text.split(dash).collect();
    match parts.as_slice() {
        [start, end] => Some((start.trim().to_string(), end.trim().to_string())),
        _ => None,
    }
}

fn looks_like_date_range(text: &str) -> bool {
    DATE_DASHES.iter().any(|d| text.contains(d)) && YEAR_RE.is_match(text)
}

fn looks_like_time_range(text: &str) -> bool {
    let lower = text.to_lowercase();
    (lower.contains("am") || lower.contains("pm")) && (text.contains('-') || text.contains('–'))
}

#[derive(Default)]
struct Schedule {
    year_term: String,
    term_type: String,
    start_date: String,
    end_date: String,
    start_time: String,
    end_time: String,
    weekdays: String,
    days: WeekdayFlags,
}

fn extract_schedule(document: &Html) -> Schedule {
    let mut schedule = Schedule::default();

    let Some(time_div) = document.select(&TIME_SELECTOR).next() else {
        return schedule;
    };
    let spans: Vec<String> = time_div.select(&SPAN_SELECTOR).map(text_of).collect();

    schedule.year_term = spans.first().cloned().unwrap_or_default();
    schedule.term_type = spans.get(1).cloned().unwrap_or_default();

    if let Some(text) = spans.iter().find(|t| looks_like_date_range(t)) {
        if let Some((start, end)) = split_range(text, &DATE_DASHES) {
            schedule.start_date = start;
            schedule.end_date = end;
        }
    }
    if let Some(text) = spans.iter().find(|t| looks_like_time_range(t)) {
        if let Some((start, end)) = split_range(text, &TIME_DASHES) {
            schedule.start_time = start;
            schedule.end_time = end;
        }
    }

    let mut selected = Vec::new();
    if let Some(group) = time_div.select(&WEEKDAYS_SELECTOR).next() {
        for day in group.select(&WEEKDAY_SELECTOR) {
            let label = day.value().attr("aria-label").unwrap_or_default();
            if label.to_lowercase().contains(", selected") {
                let name = label.split(',').next().unwrap_or_default().trim();
                schedule.days.set(name);
                selected.push(name.to_string());
            }
        }
    }
    schedule.weekdays = selected.join(", ");
    schedule
}

fn info_value(document: &Html, label: &str) -> String {
    document
        .select(&INFO_SELECTOR)
        .next()
        .and_then(|info| info.select(&SPAN_SELECTOR).find(|s| text_of(*s) == label))
        .and_then(|s| next_sibling_named(s, "span"))
        .map(text_of)
        .unwrap_or_default()
}

fn labelled_value(document: &Html, label: &str) -> String {
    document
        .select(&STRONG_SELECTOR)
        .find(|s| text_of(*s) == label)
        .and_then(|s| {
            next_sibling_named(s, "span")
                .or_else(|| next_sibling_named(s, "a"))
                .or_else(|| next_sibling_named(s, "p"))
        })
        .map(text_of)
        .unwrap_or_default()
}

fn first_paragraph(document: &Html, container: &Selector) -> String {
    document
        .select(container)
        .next()
        .and_then(|div| div.select(&PARAGRAPH_SELECTOR).next())
        .map(text_of)
        .unwrap_or_default()
}

fn unique_paragraphs(document: &Html, container: &Selector) -> String {
    let Some(div) = document.select(container).next() else {
        return String::new();
    };
    let mut seen: Vec<String> = Vec::new();
    for text in div.select(&PARAGRAPH_SELECTOR).map(text_of) {
        if !text.is_empty() && !seen.contains(&text) {
            seen.push(text);
        }
    }
    seen.join("\n")
}

fn extract_location(document: &Html) -> String {
    let text = document
        .select(&LOCATION_SELECTOR)
        .next()
        .and_then(|flex| flex.select(&SPAN_SELECTOR).next())
        .map(text_of)
        .unwrap_or_default();
    let lower = text.to_lowercase();
    if lower.contains("sign in") || lower.contains("signin") {
        String::new()
    } else {
        text
    }
}

fn extract_website(document: &Html) -> String {
    document
        .select(&LINKS_SELECTOR)
        .find_map(|link| {
            let href = link.value().attr("href")?;
            let labelled = link
                .select(&DIV_SELECTOR)
                .next()
                .map(|d| text_of(d).eq_ignore_ascii_case("website"))
                .unwrap_or(false);
            (href.contains("locator.tlt.harvard.edu") || labelled).then(|| href.to_string())
        })
        .unwrap_or_default()
}

fn extract_instructors(document: &Html) -> String {
    document
        .select(&INSTRUCTOR_SELECTOR)
        .filter_map(|link| direct_children_named(link, "span").nth(1).map(text_of))
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Builds a course record from one rendered detail page.
///
/// Every field other than the title is optional and falls back to empty.
/// A page without a title is not a course page and is rejected. The
/// section id is left unset here; catalog cleaning derives it.
pub fn extract_course_record(html: &str, target: &FetchTarget) -> AppResult<CourseRecord> {
    let document = Html::parse_document(html);

    let title_block = document.select(&TITLE_SELECTOR).next();
    let course_title = title_block
        .and_then(|h1| h1.select(&TITLE_TEXT_SELECTOR).next())
        .map(text_of)
        .unwrap_or_default();
    if course_title.is_empty() {
        return Err(AppError::Extraction(format!(
            "No course title on page '{}'",
            target
        )));
    }
    let subject_catalog = title_block
        .and_then(|h1| h1.select(&SUB_CAT_SELECTOR).next())
        .and_then(|div| direct_children_named(div, "span").next())
        .map(text_of)
        .unwrap_or_default();

    let schedule = extract_schedule(&document);

    Ok(CourseRecord {
        course_title,
        subject_catalog,
        year_term: schedule.year_term,
        term_type: schedule.term_type,
        course_id: info_value(&document, "Course ID:"),
        section: None,
        instructors: extract_instructors(&document),
        class_number: info_value(&document, "Class Number:"),
        consent: info_value(&document, "Consent:"),
        enrollment: info_value(&document, "Enrollment:"),
        waitlist: info_value(&document, "Waitlist:"),
        start_date: schedule.start_date,
        end_date: schedule.end_date,
        start_time: schedule.start_time,
        end_time: schedule.end_time,
        weekdays: schedule.weekdays,
        days: schedule.days,
        location: extract_location(&document),
        description: first_paragraph(&document, &DESC_SELECTOR),
        notes: first_paragraph(&document, &NOTES_SELECTOR),
        class_notes: unique_paragraphs(&document, &CLASS_NOTES_SELECTOR),
        school: labelled_value(&document, "School"),
        units: labelled_value(&document, "Units"),
        credits: labelled_value(&document, "Credits"),
        exam: labelled_value(&document, "Exam/Final Deadline"),
        cross_registration: labelled_value(&document, "Cross Reg"),
        department: labelled_value(&document, "Department"),
        course_component: labelled_value(&document, "Course Component"),
        instruction_mode: labelled_value(&document, "Instruction Mode"),
        grading_basis: labelled_value(&document, "Grading Basis"),
        course_requirements: labelled_value(&document, "Course Requirements"),
        general_education: labelled_value(&document, "General Education"),
        quantitative_reasoning: labelled_value(&document, "Quantitative Reasoning with Data"),
        divisional_distribution: labelled_value(&document, "Divisional Distribution"),
        course_level: labelled_value(&document, "Course Level"),
        course_website: extract_website(&document),
        course_url: target.as_str().to_string(),
        fetched_at: None,
        extra: Default::default(),
    })
}
