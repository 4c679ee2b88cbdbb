//! Best-effort page metadata extraction.
//!
//! Each field has an ordered list of candidate extractors; the first one
//! that yields a non-empty value wins and later candidates are not run.

use std::num::IntErrorKind;

use scraper::{ElementRef, Html, Selector};

use super::url::base_url;

/// Metadata pulled from a page. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Parsed markup plus the url it was fetched for.
struct Page<'a> {
    document: Html,
    url: &'a str,
}

type Candidate = fn(&Page<'_>) -> Option<String>;

const TITLE_CANDIDATES: &[Candidate] = &[og_title, twitter_title, document_title, first_heading];

const DESCRIPTION_CANDIDATES: &[Candidate] = &[
    og_description,
    twitter_description,
    meta_description,
    first_paragraph,
];

const IMAGE_CANDIDATES: &[Candidate] = &[og_image, twitter_image, first_content_image];

/// Containers searched, in order, before falling back to the whole document.
const CONTENT_CONTAINERS: &[&str] = &["main", "article", ".content", "#content"];

/// Paragraph fallback bounds, exclusive, in characters.
const MIN_PARAGRAPH_CHARS: usize = 50;
const MAX_PARAGRAPH_CHARS: usize = 300;

/// Images with both dimensions above this are considered content images.
const MIN_IMAGE_DIMENSION: i64 = 200;

/// Extract title, description and image from raw markup.
///
/// Malformed or partial markup is tolerated; missing signals leave the
/// field as `None`. `url` is the page the markup came from and is used to
/// resolve relative image paths.
pub fn extract_metadata(html: &str, url: &str) -> PageMetadata {
    let page = Page {
        document: Html::parse_document(html),
        url,
    };

    PageMetadata {
        title: first_match(&page, TITLE_CANDIDATES),
        description: first_match(&page, DESCRIPTION_CANDIDATES),
        image_url: first_match(&page, IMAGE_CANDIDATES),
    }
}

fn first_match(page: &Page<'_>, candidates: &[Candidate]) -> Option<String> {
    candidates.iter().find_map(|candidate| candidate(page))
}

fn select_first<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    document.select(&selector).next()
}

/// `content` of the first `<meta {attr}="{key}">`, if non-empty.
fn meta_content(document: &Html, attr: &str, key: &str) -> Option<String> {
    select_first(document, &format!(r#"meta[{attr}="{key}"]"#))
        .and_then(|el| el.value().attr("content"))
        .filter(|content| !content.is_empty())
        .map(String::from)
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect()
}

/// `{container} {tag}` selectors in container order, then a bare `{tag}`.
fn scoped_selectors(tag: &str) -> impl Iterator<Item = String> + '_ {
    CONTENT_CONTAINERS
        .iter()
        .map(move |container| format!("{container} {tag}"))
        .chain(std::iter::once(tag.to_string()))
}

// ── Title ───────────────────────────────────────────────

fn og_title(page: &Page<'_>) -> Option<String> {
    meta_content(&page.document, "property", "og:title")
}

fn twitter_title(page: &Page<'_>) -> Option<String> {
    meta_content(&page.document, "name", "twitter:title")
}

fn document_title(page: &Page<'_>) -> Option<String> {
    select_first(&page.document, "title")
        .map(text_of)
        .filter(|title| !title.is_empty())
}

fn first_heading(page: &Page<'_>) -> Option<String> {
    select_first(&page.document, "h1")
        .map(|h1| text_of(h1).trim().to_string())
        .filter(|heading| !heading.is_empty())
}

// ── Description ─────────────────────────────────────────

fn og_description(page: &Page<'_>) -> Option<String> {
    meta_content(&page.document, "property", "og:description")
}

fn twitter_description(page: &Page<'_>) -> Option<String> {
    meta_content(&page.document, "name", "twitter:description")
}

fn meta_description(page: &Page<'_>) -> Option<String> {
    meta_content(&page.document, "name", "description")
}

fn first_paragraph(page: &Page<'_>) -> Option<String> {
    scoped_selectors("p").find_map(|css| {
        let selector = Selector::parse(&css).ok()?;
        page.document.select(&selector).find_map(|p| {
            let text = text_of(p);
            let text = text.trim();
            let len = text.chars().count();
            (len > MIN_PARAGRAPH_CHARS && len < MAX_PARAGRAPH_CHARS).then(|| text.to_string())
        })
    })
}

// ── Image ───────────────────────────────────────────────

fn og_image(page: &Page<'_>) -> Option<String> {
    meta_content(&page.document, "property", "og:image")
}

fn twitter_image(page: &Page<'_>) -> Option<String> {
    meta_content(&page.document, "name", "twitter:image")
}

fn first_content_image(page: &Page<'_>) -> Option<String> {
    let src = scoped_selectors("img").find_map(|css| {
        let selector = Selector::parse(&css).ok()?;
        page.document
            .select(&selector)
            .find_map(|img| content_image_src(img).map(String::from))
    })?;

    let cleaned = clean_src(&src);
    if cleaned.starts_with("http") {
        Some(cleaned.to_string())
    } else {
        Some(format!("{}{}", base_url(page.url), cleaned))
    }
}

/// The `src` of an image that looks like content rather than decoration:
/// not an icon or logo, and either larger than 200x200 or unsized.
fn content_image_src(img: ElementRef<'_>) -> Option<&str> {
    let attrs = img.value();
    let src = attrs.attr("src").filter(|src| !src.is_empty())?;
    if src.contains("icon") || src.contains("logo") {
        return None;
    }

    let width = parse_dimension(attrs.attr("width"));
    let height = parse_dimension(attrs.attr("height"));
    let large = matches!(
        (width, height),
        (Some(w), Some(h)) if w > MIN_IMAGE_DIMENSION && h > MIN_IMAGE_DIMENSION
    );
    let unspecified = width.unwrap_or(0) == 0 && height.unwrap_or(0) == 0;

    (large || unspecified).then_some(src)
}

/// Leading-integer parse of an HTML dimension attribute (`"300px"` is 300).
/// `None` when absent or when no digits lead the value. Digit runs too long
/// for an `i64` saturate.
fn parse_dimension(value: Option<&str>) -> Option<i64> {
    let value = value?.trim_start();
    let (negative, rest) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let number = match rest[..end].parse::<i64>() {
        Ok(number) => number,
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => i64::MAX,
        Err(_) => return None,
    };
    Some(if negative { -number } else { number })
}

/// Trim, then drop one leading backslash, one leading and one trailing
/// double quote, and one trailing backslash.
fn clean_src(src: &str) -> &str {
    let s = src.trim();
    let s = s.strip_prefix('\\').unwrap_or(s);
    let s = s.strip_prefix('"').unwrap_or(s);
    let s = s.strip_suffix('"').unwrap_or(s);
    s.strip_suffix('\\').unwrap_or(s)
}
