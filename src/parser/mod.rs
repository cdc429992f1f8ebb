//! Markup extraction
//!
//! Turns the origin's table-based pages into the typed records in
//! [`crate::models`]. Every function here is pure: the same input always
//! yields the same record, and missing optional fields come back as `None`
//! rather than as an error.

pub mod comments;
pub mod html;
pub mod sanitize;
pub mod selectors;

// Re-export main extractor and public helpers
pub use comments::build_comment_tree;
pub use html::{Extractor, DEFAULT_INDENT_UNIT};

use scraper::ElementRef;

use crate::parser::sanitize::item_id_from_url;
use crate::parser::selectors::{AGE, ITEM_LINK, USER_LINK};
use crate::utils::{leading_int, normalize_whitespace};

/// Collected, trimmed text of an element
pub(crate) fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Submitter name inside a metadata cell, `None` when the link is missing or blank
pub(crate) fn user_in(scope: ElementRef<'_>) -> Option<String> {
    scope
        .select(&USER_LINK)
        .next()
        .map(text_of)
        .filter(|user| !user.is_empty())
}

/// Relative age text of a metadata cell
///
/// Older layouts put the age as a bare text node right after the user link
/// (`by pg 2 hours ago |`). Newer ones wrap it in `.age`. The first item link
/// is the last resort.
pub(crate) fn time_ago_in(scope: ElementRef<'_>) -> String {
    let after_user = scope
        .select(&USER_LINK)
        .next()
        .and_then(|link| link.next_sibling())
        .and_then(|node| {
            node.value()
                .as_text()
                .map(|text| text.replace('|', "").trim().to_string())
        })
        .filter(|text| !text.is_empty());

    after_user
        .or_else(|| scope.select(&AGE).next().map(text_of))
        .or_else(|| scope.select(&ITEM_LINK).next().map(text_of))
        .map(|text| normalize_whitespace(&text))
        .unwrap_or_default()
}

/// Id of the first `item?id=` link in scope
pub(crate) fn first_item_id(scope: ElementRef<'_>) -> Option<u64> {
    scope
        .select(&ITEM_LINK)
        .next()
        .and_then(|link| link.value().attr("href"))
        .and_then(item_id_from_url)
}

/// Points from a `span[id^=score]` style text such as `"118 points"`
pub(crate) fn points_from(text: &str) -> Option<u32> {
    leading_int(text).and_then(|points| u32::try_from(points).ok())
}

/// Returns true when a row has a direct `td` child carrying `class`
pub(crate) fn has_cell_class(row: ElementRef<'_>, class: &str) -> bool {
    row.children()
        .filter_map(ElementRef::wrap)
        .any(|cell| cell.value().name() == "td" && cell.value().classes().any(|c| c == class))
}

/// Next sibling element with the given tag name
pub(crate) fn next_sibling_named<'a>(el: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    el.next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| sibling.value().name() == name)
}

/// Parent element, skipping over non-element nodes
pub(crate) fn parent_element(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.parent().and_then(ElementRef::wrap)
}
