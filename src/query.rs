//! Element-query functions built on top of [`TagScanner`].
//!
//! Each query walks the candidate `<` offsets of the input (skipping spans
//! inside comments and script/style payloads), classifies the tag at each
//! candidate, and for every match runs a first-match scan over the rest of
//! the input to locate the element's closing tag. Results come back in
//! document order; "not found" is `None` or an empty `Vec`, never an error.
//!
//! The free functions scan in relaxed mode. The `try_*` tag family takes an
//! explicit [`ParseMode`] for callers that want structural defects reported.

use memchr::memchr_iter;

use crate::attrs::{AttrMap, parse_start_tag};
use crate::ignore::IgnoreRanges;
use crate::scanner::{HtmlParseError, OnClose, ParseMode, Tag, TagOrder, TagScanner};

/// Inner text of the first element whose full `class` value equals
/// `class_name`.
pub fn get_element_by_class<'a>(class_name: &str, html: &'a str) -> Option<&'a str> {
    first_relaxed(html, class_matcher(class_name)).map(|tag| tag.text())
}

/// Outer HTML of the first element whose full `class` value equals
/// `class_name`.
pub fn get_element_html_by_class<'a>(class_name: &str, html: &'a str) -> Option<&'a str> {
    first_relaxed(html, class_matcher(class_name)).map(|tag| tag.html())
}

/// Inner text of every element whose full `class` value equals `class_name`.
pub fn get_elements_by_class<'a>(class_name: &str, html: &'a str) -> Vec<&'a str> {
    all_relaxed(html, class_matcher(class_name))
        .iter()
        .map(Tag::text)
        .collect()
}

/// Outer HTML of every element whose full `class` value equals `class_name`.
pub fn get_elements_html_by_class<'a>(class_name: &str, html: &'a str) -> Vec<&'a str> {
    all_relaxed(html, class_matcher(class_name))
        .iter()
        .map(Tag::html)
        .collect()
}

/// `(text, html)` of every element whose full `class` value equals
/// `class_name`.
pub fn get_elements_text_and_html_by_class<'a>(
    class_name: &str,
    html: &'a str,
) -> Vec<(&'a str, &'a str)> {
    all_relaxed(html, class_matcher(class_name))
        .iter()
        .map(Tag::text_and_html)
        .collect()
}

/// Inner text of the first element carrying `attribute` with exactly
/// `value`. `tag` restricts the match to one element name.
pub fn get_element_by_attribute<'a>(
    attribute: &str,
    value: &str,
    html: &'a str,
    tag: Option<&str>,
) -> Option<&'a str> {
    first_relaxed(html, attribute_matcher(attribute, value, tag)).map(|t| t.text())
}

/// Outer HTML of the first element carrying `attribute` with exactly
/// `value`.
pub fn get_element_html_by_attribute<'a>(
    attribute: &str,
    value: &str,
    html: &'a str,
    tag: Option<&str>,
) -> Option<&'a str> {
    first_relaxed(html, attribute_matcher(attribute, value, tag)).map(|t| t.html())
}

/// Inner text of every element carrying `attribute` with exactly `value`.
pub fn get_elements_by_attribute<'a>(
    attribute: &str,
    value: &str,
    html: &'a str,
    tag: Option<&str>,
) -> Vec<&'a str> {
    all_relaxed(html, attribute_matcher(attribute, value, tag))
        .iter()
        .map(Tag::text)
        .collect()
}

/// Outer HTML of every element carrying `attribute` with exactly `value`.
pub fn get_elements_html_by_attribute<'a>(
    attribute: &str,
    value: &str,
    html: &'a str,
    tag: Option<&str>,
) -> Vec<&'a str> {
    all_relaxed(html, attribute_matcher(attribute, value, tag))
        .iter()
        .map(Tag::html)
        .collect()
}

/// `(text, html)` of every element carrying `attribute` with exactly
/// `value`.
pub fn get_elements_text_and_html_by_attribute<'a>(
    attribute: &str,
    value: &str,
    html: &'a str,
    tag: Option<&str>,
) -> Vec<(&'a str, &'a str)> {
    all_relaxed(html, attribute_matcher(attribute, value, tag))
        .iter()
        .map(Tag::text_and_html)
        .collect()
}

/// `(text, html)` of the first element named `tag`.
pub fn get_element_text_and_html_by_tag<'a>(
    tag: &str,
    html: &'a str,
) -> Option<(&'a str, &'a str)> {
    first_relaxed(html, tag_matcher(tag)).map(|t| t.text_and_html())
}

/// `(text, html)` of every element named `tag`.
pub fn get_elements_text_and_html_by_tag<'a>(tag: &str, html: &'a str) -> Vec<(&'a str, &'a str)> {
    all_relaxed(html, tag_matcher(tag))
        .iter()
        .map(Tag::text_and_html)
        .collect()
}

/// Mode-selectable variant of [`get_element_text_and_html_by_tag`]; strict
/// mode reports structural defects around the matched element instead of
/// recovering.
pub fn try_element_text_and_html_by_tag<'a>(
    mode: ParseMode,
    tag: &str,
    html: &'a str,
) -> Result<Option<(&'a str, &'a str)>, HtmlParseError> {
    let tags = matching_tags(mode, html, tag_matcher(tag), true)?;
    Ok(tags.first().map(Tag::text_and_html))
}

/// Mode-selectable variant of [`get_elements_text_and_html_by_tag`].
pub fn try_elements_text_and_html_by_tag<'a>(
    mode: ParseMode,
    tag: &str,
    html: &'a str,
) -> Result<Vec<(&'a str, &'a str)>, HtmlParseError> {
    let tags = matching_tags(mode, html, tag_matcher(tag), false)?;
    Ok(tags.iter().map(Tag::text_and_html).collect())
}

fn class_matcher(class_name: &str) -> impl Fn(&str, &AttrMap) -> bool {
    // Full-value equality, case-sensitive; "class" naming notwithstanding,
    // this is not per-token matching.
    move |_name: &str, attrs: &AttrMap| attrs.value("class") == Some(class_name)
}

fn attribute_matcher<'m>(
    attribute: &'m str,
    value: &'m str,
    tag: Option<&'m str>,
) -> impl Fn(&str, &AttrMap) -> bool + 'm {
    move |name: &str, attrs: &AttrMap| {
        tag.is_none_or(|t| name.eq_ignore_ascii_case(t)) && attrs.value(attribute) == Some(value)
    }
}

fn tag_matcher(tag: &str) -> impl Fn(&str, &AttrMap) -> bool {
    move |name: &str, _attrs: &AttrMap| name.eq_ignore_ascii_case(tag)
}

fn first_relaxed<'a, F>(html: &'a str, matches: F) -> Option<Tag<'a>>
where
    F: Fn(&str, &AttrMap) -> bool,
{
    // Relaxed scans never report structural errors.
    matching_tags(ParseMode::Relaxed, html, matches, true)
        .unwrap_or_default()
        .into_iter()
        .next()
}

fn all_relaxed<'a, F>(html: &'a str, matches: F) -> Vec<Tag<'a>>
where
    F: Fn(&str, &AttrMap) -> bool,
{
    matching_tags(ParseMode::Relaxed, html, matches, false).unwrap_or_default()
}

/// Candidate windowed scan: every `<` offset outside the ignore ranges whose
/// opening tag satisfies `matches` starts a first-match scan over the rest
/// of the input. Nested matches each get their own window, so the result
/// holds one tag per matching opening tag, in document order.
/// With `first_only` the walk ends at the first candidate, so defects near
/// later candidates cannot fail an otherwise-successful strict lookup.
fn matching_tags<'a, F>(
    mode: ParseMode,
    html: &'a str,
    matches: F,
    first_only: bool,
) -> Result<Vec<Tag<'a>>, HtmlParseError>
where
    F: Fn(&str, &AttrMap) -> bool,
{
    let ignored = IgnoreRanges::new(html);
    let scanner = TagScanner::new(mode);
    let mut found = Vec::new();

    for at in memchr_iter(b'<', html.as_bytes()) {
        if ignored.contains(at) {
            continue;
        }
        let Some(candidate) = parse_start_tag(html, at) else {
            continue;
        };
        if !matches(&candidate.name, &candidate.attrs) {
            continue;
        }
        log::trace!(
            target: "htmlscan.query",
            "matching candidate '{}' at offset {at}",
            candidate.name
        );
        if let Some(tag) = first_match(&scanner, &html[at..], &matches)? {
            found.push(tag);
        }
        if first_only && !found.is_empty() {
            break;
        }
    }

    Ok(found)
}

/// Scan `window` (which begins at a candidate's `<`) and return the first
/// tag satisfying `matches`, stopping the pass as soon as it closes. A
/// candidate that never closes still surfaces, with its text empty and its
/// HTML just the opening-tag literal.
fn first_match<'a, F>(
    scanner: &TagScanner,
    window: &'a str,
    matches: &F,
) -> Result<Option<Tag<'a>>, HtmlParseError>
where
    F: Fn(&str, &AttrMap) -> bool,
{
    let mut found = false;
    let tags = scanner.scan_with(
        window,
        TagOrder::Opened,
        |name, attrs| {
            if found {
                false
            } else if matches(name, attrs) {
                found = true;
                true
            } else {
                false
            }
        },
        |_| OnClose::Stop,
    )?;
    Ok(tags.into_iter().next())
}
