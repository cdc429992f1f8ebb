//! Page extractors for listings, posts, comment batches and user profiles
//!
//! Each page of the origin is a nest of layout tables. The extractor locates
//! the content table for the page kind, then reads cells positionally with
//! the selectors in [`super::selectors`].

use scraper::{ElementRef, Html};

use crate::models::{paginate, Comment, CommentBatch, ItemType, ListingEntry, PollItem, Post, UserProfile};
use crate::parser::comments::{build_comment_tree, extract_comment_row};
use crate::parser::sanitize::{
    clean_content, continuation_token, domain_hint, is_item_permalink, item_id_from_url,
    strip_reply_link,
};
use crate::parser::selectors::{
    ANCHOR, CELL, COMHEAD, COMHEAD_SPAN, COMMENT, COMMENT_CELL, COMMTEXT, DEFAULT_CELL, FORM,
    FORM_ROW, ITEM_LINK, MORE_COMMENTS_LINK, NESTED_TABLE_IN_ROW, ROW, SCORE, SUBTEXT_CELL, TABLE,
    TABLE_IN_CELL, TEXTAREA, TITLE_CELL, TOPTEXT, VOTE_LINK,
};
use crate::parser::{
    first_item_id, has_cell_class, next_sibling_named, parent_element, points_from, text_of,
    time_ago_in, user_in,
};
use crate::utils::error::ExtractError;
use crate::utils::{first_digits, leading_float, leading_int, looks_like_markup, normalize_whitespace};

/// Spacer width of one comment nesting level
pub const DEFAULT_INDENT_UNIT: u32 = 40;

/// Markup extractor for the origin's page layouts
#[derive(Debug, Clone, Copy)]
pub struct Extractor {
    indent_unit: u32,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            indent_unit: DEFAULT_INDENT_UNIT,
        }
    }

    /// Use a different spacer width per nesting level
    #[must_use]
    pub fn with_indent_unit(indent_unit: u32) -> Self {
        Self {
            indent_unit: indent_unit.max(1),
        }
    }

    pub fn indent_unit(&self) -> u32 {
        self.indent_unit
    }

    // ========================================================================
    // Listings
    // ========================================================================

    /// Extract every story row of a listing page
    ///
    /// Rows come in pairs: a title row followed by a subtext row. Extraction
    /// stops at the first title row without a partner.
    ///
    /// # Errors
    /// Returns `ExtractError::NotMarkup` if the body has no tags at all.
    pub fn extract_listing(&self, raw: &str) -> Result<Vec<ListingEntry>, ExtractError> {
        ensure_markup(raw)?;
        let document = Html::parse_document(raw);

        let Some(table) = document.select(&TABLE_IN_CELL).find(|table| {
            table
                .select(&ROW)
                .any(|row| has_cell_class(row, "title"))
        }) else {
            return Ok(Vec::new());
        };

        let rows: Vec<ElementRef<'_>> = table
            .select(&ROW)
            .filter(|row| has_cell_class(*row, "title") || has_cell_class(*row, "subtext"))
            .collect();

        let entries = rows
            .chunks(2)
            .map_while(|pair| match pair {
                [title_row, meta_row] => Some(self.listing_entry(*title_row, *meta_row)),
                _ => None,
            })
            .flatten()
            .collect();

        Ok(entries)
    }

    /// Extract a listing and cut the 1-based `page` window out of it
    ///
    /// # Errors
    /// Same as [`Extractor::extract_listing`].
    pub fn extract_listing_page(
        &self,
        raw: &str,
        page: u32,
        page_size: usize,
    ) -> Result<Vec<ListingEntry>, ExtractError> {
        let entries = self.extract_listing(raw)?;
        Ok(paginate(&entries, page, page_size))
    }

    fn listing_entry(&self, title_row: ElementRef<'_>, meta_row: ElementRef<'_>) -> Option<ListingEntry> {
        let title_cell = title_row
            .select(&TITLE_CELL)
            .find(|cell| cell.select(&ANCHOR).next().is_some())?;
        let link = title_cell.select(&ANCHOR).next()?;

        let title = text_of(link);
        let url = link.value().attr("href").unwrap_or_default().to_string();
        let domain = title_cell
            .select(&COMHEAD)
            .next()
            .and_then(|head| domain_hint(&text_of(head)));

        let vote_id = title_row
            .select(&VOTE_LINK)
            .next()
            .and_then(|vote| vote.value().attr("id"))
            .and_then(first_digits);

        let subtext = meta_row.select(&SUBTEXT_CELL).next();
        let user = subtext.and_then(user_in);
        let points = subtext
            .and_then(|cell| cell.select(&SCORE).next())
            .and_then(|score| points_from(&text_of(score)));
        let time_ago = subtext.map(time_ago_in).unwrap_or_default();
        let comments_count = subtext.map(comments_count_in).unwrap_or(0);

        let classified = classify(&url, user.as_deref());
        let (id, time_ago) = match classified {
            ItemType::Job => (
                item_id_from_url(&url).or_else(|| row_id(title_row)),
                subtext
                    .map(|cell| normalize_whitespace(&text_of(cell)))
                    .unwrap_or_default(),
            ),
            _ => (vote_id.or_else(|| row_id(title_row)), time_ago),
        };

        Some(ListingEntry {
            id,
            title,
            url,
            domain,
            points: if classified == ItemType::Job { None } else { points },
            user,
            time_ago,
            comments_count,
            kind: classified,
        })
    }

    // ========================================================================
    // Posts
    // ========================================================================

    /// Extract a story page (or a comment permalink) with its comment forest
    ///
    /// # Errors
    /// Returns `ExtractError::NotMarkup` if the body has no tags at all or no
    /// post table can be found in it.
    pub fn extract_post(&self, raw: &str) -> Result<Post, ExtractError> {
        ensure_markup(raw)?;
        let document = Html::parse_document(raw);

        let Some(table) = document.select(&TABLE_IN_CELL).find(|table| {
            table.select(&TITLE_CELL).next().is_some()
                || table.select(&TEXTAREA).next().is_some()
                || table.select(&DEFAULT_CELL).next().is_some()
        }) else {
            return Err(ExtractError::NotMarkup);
        };

        let mut post = match table
            .select(&TITLE_CELL)
            .find(|cell| cell.select(&ANCHOR).next().is_some())
        {
            Some(title_cell) => self.story_header(table, title_cell),
            None => self.comment_header(table),
        };

        if let Some(comment_table) = next_sibling_named(table, "table") {
            let rows = comment_table.select(&NESTED_TABLE_IN_ROW);
            post.comments = self.comment_forest(rows);
            post.more_comments_id = more_comments_id(&document);
        }

        Ok(post)
    }

    fn story_header(&self, table: ElementRef<'_>, title_cell: ElementRef<'_>) -> Post {
        let link = title_cell.select(&ANCHOR).next();
        let title = link.map(text_of);
        let url = link
            .and_then(|a| a.value().attr("href"))
            .unwrap_or_default()
            .to_string();
        let domain = title_cell
            .select(&COMHEAD)
            .next()
            .and_then(|head| domain_hint(&text_of(head)));

        let vote_id = table
            .select(&VOTE_LINK)
            .next()
            .and_then(|vote| vote.value().attr("id"))
            .and_then(first_digits);

        let subtext = table.select(&SUBTEXT_CELL).next();
        let user = subtext.and_then(user_in);
        let points = subtext
            .and_then(|cell| cell.select(&SCORE).next())
            .and_then(|score| points_from(&text_of(score)));
        let comments_count = subtext.map(comments_count_in).unwrap_or(0);

        let (content, poll) = subtext
            .and_then(parent_element)
            .map(|row| self.text_and_poll(row))
            .unwrap_or((None, None));

        let kind = classify(&url, user.as_deref());
        let (id, time_ago) = if kind == ItemType::Job {
            (
                item_id_from_url(&url),
                subtext.map(|cell| normalize_whitespace(&text_of(cell))),
            )
        } else {
            (vote_id, subtext.map(time_ago_in))
        };

        Post {
            id,
            title,
            url: Some(url),
            domain,
            points: if kind == ItemType::Job { None } else { points },
            user,
            time_ago,
            comments_count,
            content,
            poll,
            kind,
            comments: Vec::new(),
            more_comments_id: None,
        }
    }

    /// Story text and poll options from the rows under the subtext row
    ///
    /// The first non-empty row is either the text (when it has no
    /// `td.comment`) or the poll. A poll following a text sits in the next row.
    fn text_and_poll(&self, subtext_row: ElementRef<'_>) -> (Option<String>, Option<Vec<PollItem>>) {
        let content_rows: Vec<ElementRef<'_>> = subtext_row
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .filter(|row| row.value().name() == "tr")
            .filter(|row| !is_empty_element(*row) && row.select(&TEXTAREA).next().is_none())
            .collect();

        let Some(first) = content_rows.first() else {
            return (None, None);
        };

        let text_cell = first
            .children()
            .filter_map(ElementRef::wrap)
            .find(|cell| cell.value().name() == "td" && !is_empty_element(*cell));

        let (content, poll_row) = match text_cell {
            Some(cell) if cell.select(&COMMENT_CELL).next().is_none() => {
                let body = cell.select(&TOPTEXT).next().unwrap_or(cell);
                (Some(clean_content(&body.inner_html())), content_rows.get(1))
            }
            _ => (None, Some(first)),
        };

        let poll = poll_row.and_then(|row| {
            let options: Vec<PollItem> = row
                .select(&COMMENT_CELL)
                .map(|option| PollItem {
                    item: text_of(option),
                    points: parent_element(option)
                        .and_then(|tr| next_sibling_named(tr, "tr"))
                        .and_then(|tr| tr.select(&COMHEAD_SPAN).next())
                        .and_then(|span| points_from(&text_of(span))),
                })
                .collect();
            (!options.is_empty()).then_some(options)
        });

        (content, poll)
    }

    fn comment_header(&self, table: ElementRef<'_>) -> Post {
        let Some(cell) = table.select(&DEFAULT_CELL).next() else {
            return Post::default();
        };

        let content = table.select(&COMMENT).next().map(|comment| {
            let body = comment.select(&COMMTEXT).next().unwrap_or(comment);
            clean_content(&strip_reply_link(&body.inner_html()))
        });

        Post {
            id: first_item_id(cell),
            user: user_in(cell),
            time_ago: Some(time_ago_in(cell)),
            content,
            kind: ItemType::Comment,
            ..Default::default()
        }
    }

    // ========================================================================
    // Comment batches
    // ========================================================================

    /// Extract a flat page of comments, typically a continuation fetch
    ///
    /// # Errors
    /// Returns `ExtractError::ExpiredContent` when the body is plain text
    /// mentioning expiry, `ExtractError::NotMarkup` for any other plain body.
    pub fn extract_comment_batch(&self, raw: &str) -> Result<CommentBatch, ExtractError> {
        if !looks_like_markup(raw) {
            return Err(if raw.to_lowercase().contains("expired") {
                ExtractError::ExpiredContent(raw.trim().to_string())
            } else {
                ExtractError::NotMarkup
            });
        }

        let document = Html::parse_document(raw);
        let rows = document.select(&TABLE).filter(|table| {
            table.select(&TABLE).next().is_none() && table.select(&COMMENT).next().is_some()
        });

        Ok(CommentBatch {
            comments: self.comment_forest(rows),
            more_comments_id: more_comments_id(&document),
        })
    }

    /// Extract the newest-comments feed
    ///
    /// # Errors
    /// Returns `ExtractError::NotMarkup` if the body has no tags at all.
    pub fn extract_new_comments(&self, raw: &str) -> Result<Vec<Comment>, ExtractError> {
        ensure_markup(raw)?;
        let document = Html::parse_document(raw);

        // Innermost rows holding a comment body
        let rows = document.select(&ROW).filter(|row| {
            row.select(&COMMENT).next().is_some()
                && row
                    .select(&ROW)
                    .all(|inner| inner.select(&COMMENT).next().is_none())
        });

        Ok(self.comment_forest(rows))
    }

    fn comment_forest<'a>(&self, rows: impl Iterator<Item = ElementRef<'a>>) -> Vec<Comment> {
        let flat = rows
            .map(|row| extract_comment_row(row, self.indent_unit))
            .collect();
        build_comment_tree(flat)
    }

    // ========================================================================
    // Users
    // ========================================================================

    /// Extract a user profile
    ///
    /// An unknown user yields a profile with an empty `id`; deciding that
    /// this means "not found" is left to the caller.
    ///
    /// # Errors
    /// Returns `ExtractError::NotMarkup` if the body has no tags at all.
    pub fn extract_user(&self, raw: &str) -> Result<UserProfile, ExtractError> {
        ensure_markup(raw)?;
        let document = Html::parse_document(raw);

        let rows: Vec<ElementRef<'_>> = if document.select(&FORM).next().is_some() {
            document.select(&FORM_ROW).collect()
        } else {
            document.select(&ROW).collect()
        };

        let mut cells = ProfileCells::default();
        for row in &rows {
            let tds: Vec<ElementRef<'_>> = row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|cell| cell.value().name() == "td")
                .collect();
            let [label, value, ..] = tds.as_slice() else {
                continue;
            };
            let label = text_of(*label).to_lowercase();
            match label.trim_end_matches(':') {
                "user" => cells.id = cells.id.or(Some(*value)),
                "created" => cells.created = cells.created.or(Some(*value)),
                "karma" => cells.karma = cells.karma.or(Some(*value)),
                "avg" => cells.avg = cells.avg.or(Some(*value)),
                "about" => cells.about = cells.about.or(Some(*value)),
                _ => {}
            }
        }

        // Older layouts: values sit in every odd cell, in a fixed order
        if cells.id.is_none() {
            let values: Vec<ElementRef<'_>> = rows
                .iter()
                .flat_map(|row| row.select(&CELL))
                .skip(1)
                .step_by(2)
                .collect();
            cells = ProfileCells {
                id: values.first().copied(),
                created: values.get(1).copied(),
                karma: values.get(2).copied(),
                avg: values.get(3).copied(),
                about: values.get(4).copied(),
            };
        }

        Ok(cells.into_profile())
    }
}

/// Value cells of a profile table, located by label or position
#[derive(Default)]
struct ProfileCells<'a> {
    id: Option<ElementRef<'a>>,
    created: Option<ElementRef<'a>>,
    karma: Option<ElementRef<'a>>,
    avg: Option<ElementRef<'a>>,
    about: Option<ElementRef<'a>>,
}

impl ProfileCells<'_> {
    fn into_profile(self) -> UserProfile {
        UserProfile {
            id: self.id.map(text_of).unwrap_or_default(),
            created: self.created.map(text_of).unwrap_or_default(),
            karma: self.karma.and_then(|cell| leading_int(&text_of(cell))),
            avg: self.avg.and_then(|cell| leading_float(&text_of(cell))),
            about: self
                .about
                .map(|cell| cell.inner_html())
                .filter(|html| !html.trim().is_empty())
                .map(|html| clean_content(&html)),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn ensure_markup(raw: &str) -> Result<(), ExtractError> {
    if looks_like_markup(raw) {
        Ok(())
    } else {
        Err(ExtractError::NotMarkup)
    }
}

/// Job rows have no submitter; self-referential links are Ask posts.
fn classify(url: &str, user: Option<&str>) -> ItemType {
    if user.is_none() {
        ItemType::Job
    } else if is_item_permalink(url) {
        ItemType::Ask
    } else {
        ItemType::Link
    }
}

/// Comment count from the subtext cell
///
/// Prefers the link labelled "comments"; otherwise takes the second item
/// link when it carries digits. "discuss" and missing links count as zero.
fn comments_count_in(subtext: ElementRef<'_>) -> u32 {
    let links: Vec<String> = subtext.select(&ITEM_LINK).map(text_of).collect();

    let labelled = links
        .iter()
        .find(|text| text.to_lowercase().contains("comment"));
    let positional = links
        .get(1)
        .filter(|text| text.chars().any(|c| c.is_ascii_digit()));

    labelled
        .or(positional)
        .and_then(|text| leading_int(text))
        .and_then(|count| u32::try_from(count).ok())
        .unwrap_or(0)
}

fn more_comments_id(document: &Html) -> Option<String> {
    document
        .select(&MORE_COMMENTS_LINK)
        .next()
        .and_then(|link| link.value().attr("href"))
        .and_then(continuation_token)
}

/// Numeric `id` attribute of a story row (`<tr class="athing" id="...">`)
fn row_id(row: ElementRef<'_>) -> Option<u64> {
    row.value().attr("id").and_then(|id| id.parse().ok())
}

fn is_empty_element(el: ElementRef<'_>) -> bool {
    el.children().all(|node| {
        node.value()
            .as_text()
            .is_some_and(|text| text.trim().is_empty())
    })
}
