//! Comment rows and comment-forest reconstruction
//!
//! The origin renders a thread as a flat list of rows, each indented by a
//! spacer image whose width encodes the nesting depth. Rows are first read
//! into flat [`Comment`] records, then folded into a forest.

use scraper::ElementRef;

use crate::models::Comment;
use crate::parser::sanitize::{clean_content, strip_reply_link};
use crate::parser::selectors::{COMHEAD, COMMENT, COMMTEXT, INDENT_CELL, INDENT_SPACER, USER_LINK};
use crate::parser::{first_item_id, time_ago_in, user_in};
use crate::utils::leading_int;

/// Rebuild the comment forest from document-ordered, level-annotated records
///
/// The parent of a comment is the nearest preceding comment with a strictly
/// lower level. Only parentless comments are returned; everything else hangs
/// off its parent's `comments`, in document order.
///
/// Runs in O(n) with an ancestor stack. The stack holds the indices of the
/// open ancestors with strictly increasing levels, so its top after popping
/// every entry at `level >= current` is exactly the nearest preceding
/// strictly-lower comment.
///
/// A comment whose level is above zero but that has no lower-level
/// predecessor becomes a root itself.
///
/// # Examples
///
/// ```
/// use hnapi::models::Comment;
/// use hnapi::parser::build_comment_tree;
///
/// let flat = [0, 1, 2, 1, 0]
///     .into_iter()
///     .map(|level| Comment { level, ..Default::default() })
///     .collect();
/// let forest = build_comment_tree(flat);
/// assert_eq!(forest.len(), 2);
/// assert_eq!(forest[0].comments.len(), 2);
/// assert_eq!(forest[0].comments[0].comments.len(), 1);
/// ```
pub fn build_comment_tree(flat: Vec<Comment>) -> Vec<Comment> {
    let parents = parent_indices(&flat);

    let mut children: Vec<Vec<Comment>> = vec![Vec::new(); flat.len()];
    let mut roots = Vec::new();

    // Children always follow their parent, so walking backwards finishes
    // every subtree before its parent is moved.
    for (index, mut comment) in flat.into_iter().enumerate().rev() {
        comment
            .comments
            .extend(std::mem::take(&mut children[index]).into_iter().rev());
        match parents[index] {
            Some(parent) => children[parent].push(comment),
            None => roots.push(comment),
        }
    }

    roots.reverse();
    roots
}

/// Parent index of every record, `None` for roots
fn parent_indices(flat: &[Comment]) -> Vec<Option<usize>> {
    let mut stack: Vec<usize> = Vec::new();
    let mut parents = Vec::with_capacity(flat.len());

    for (index, comment) in flat.iter().enumerate() {
        while stack
            .last()
            .is_some_and(|&top| flat[top].level >= comment.level)
        {
            stack.pop();
        }
        parents.push(if comment.level > 0 {
            stack.last().copied()
        } else {
            None
        });
        stack.push(index);
    }

    parents
}

/// Read one comment row into a flat record (no children yet)
///
/// The level comes from the indent spacer alone, so a row without author
/// metadata still lands at the right depth with [`Comment::DELETED`] content.
pub(crate) fn extract_comment_row(row: ElementRef<'_>, indent_unit: u32) -> Comment {
    let level = row_level(row, indent_unit);

    let Some(metadata) = row
        .select(&COMHEAD)
        .find(|head| head.select(&USER_LINK).next().is_some())
    else {
        return Comment {
            level,
            content: Comment::DELETED.to_string(),
            ..Default::default()
        };
    };

    let content = row
        .select(&COMMENT)
        .next()
        .map(|comment| {
            let body = comment.select(&COMMTEXT).next().unwrap_or(comment);
            clean_content(&strip_reply_link(&body.inner_html()))
        })
        .unwrap_or_else(|| clean_content(""));

    Comment {
        id: first_item_id(metadata),
        level,
        user: user_in(metadata).unwrap_or_default(),
        time_ago: time_ago_in(metadata),
        content,
        comments: Vec::new(),
    }
}

/// Nesting depth of a row
///
/// Primary signal is the spacer image width divided by `indent_unit`. Layouts
/// that carry an explicit `indent` attribute on the indent cell are used as
/// a fallback.
fn row_level(row: ElementRef<'_>, indent_unit: u32) -> u32 {
    let unit = i64::from(indent_unit.max(1));

    let from_spacer = row
        .select(&INDENT_SPACER)
        .next()
        .and_then(|img| img.value().attr("width"))
        .and_then(leading_int)
        .map(|width| width / unit);

    let level = from_spacer.or_else(|| {
        row.select(&INDENT_CELL)
            .next()
            .and_then(|cell| cell.value().attr("indent"))
            .and_then(leading_int)
    });

    level
        .and_then(|level| u32::try_from(level).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use scraper::{Html, Selector};

    fn flat(levels: &[u32]) -> Vec<Comment> {
        levels
            .iter()
            .enumerate()
            .map(|(i, &level)| Comment {
                id: Some(i as u64),
                level,
                ..Default::default()
            })
            .collect()
    }

    /// Reference parent assignment: scan backwards for the nearest
    /// strictly-lower level.
    fn naive_parents(levels: &[u32]) -> Vec<Option<usize>> {
        levels
            .iter()
            .enumerate()
            .map(|(i, &level)| {
                if level == 0 {
                    return None;
                }
                (0..i).rev().find(|&j| levels[j] < level)
            })
            .collect()
    }

    /// Flatten a forest back into (id, parent id) pairs in preorder
    fn edges(forest: &[Comment], parent: Option<u64>, out: &mut Vec<(Option<u64>, Option<u64>)>) {
        for comment in forest {
            out.push((comment.id, parent));
            edges(&comment.comments, comment.id, out);
        }
    }

    #[test]
    fn test_two_roots_with_nested_reply() {
        let forest = build_comment_tree(flat(&[0, 1, 2, 1, 0]));

        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].id, Some(0));
        assert_eq!(forest[1].id, Some(4));

        let first = &forest[0];
        assert_eq!(first.comments.len(), 2);
        assert_eq!(first.comments[0].id, Some(1));
        assert_eq!(first.comments[0].comments[0].id, Some(2));
        assert_eq!(first.comments[0].comments[0].level, 2);
        assert_eq!(first.comments[1].id, Some(3));
        assert!(forest[1].comments.is_empty());
    }

    #[test]
    fn test_second_root_keeps_its_own_subtree() {
        let forest = build_comment_tree(flat(&[0, 0, 1, 2]));

        assert_eq!(forest.len(), 2);
        assert!(forest[0].comments.is_empty());
        assert_eq!(forest[1].comments.len(), 1);
        assert_eq!(forest[1].comments[0].comments[0].id, Some(3));
    }

    #[test]
    fn test_level_jump_attaches_to_nearest_lower() {
        // 0 -> 3 skips levels; 2 then attaches to the level-0 comment
        let forest = build_comment_tree(flat(&[0, 3, 2]));

        assert_eq!(forest.len(), 1);
        let ids: Vec<_> = forest[0].comments.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_orphan_reply_becomes_root() {
        let forest = build_comment_tree(flat(&[1, 2, 0]));
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].id, Some(0));
        assert_eq!(forest[0].comments[0].id, Some(1));
        assert_eq!(forest[1].id, Some(2));
    }

    #[test]
    fn test_empty_input() {
        assert!(build_comment_tree(Vec::new()).is_empty());
    }

    #[test]
    fn test_row_without_metadata_is_deleted() {
        let doc = Html::parse_fragment(
            r#"<table><tr><td><img src="s.gif" width="80" height="1"></td>
               <td class="default"><div><span class="comhead"></span></div></td></tr></table>"#,
        );
        let selector = Selector::parse("table").unwrap();
        let row = doc.select(&selector).next().unwrap();

        let comment = extract_comment_row(row, 40);
        assert!(comment.is_deleted());
        assert_eq!(comment.level, 2);
        assert!(comment.user.is_empty());
        assert_eq!(comment.id, None);
    }

    #[test]
    fn test_row_with_metadata() {
        let doc = Html::parse_fragment(
            r#"<table><tr><td class="ind" indent="1"><img src="s.gif" width="40" height="1"></td>
               <td class="default">
                 <div><span class="comhead"><a href="user?id=alice" class="hnuser">alice</a>
                   <span class="age"><a href="item?id=501">3 hours ago</a></span></span></div>
                 <div class="comment"><span class="commtext c00">Agreed.<p>Second line</p></span>
                   <div class="reply"><p><font size="1"><u><a href="reply?id=501">reply</a></u></font></p></div>
                 </div>
               </td></tr></table>"#,
        );
        let selector = Selector::parse("table").unwrap();
        let row = doc.select(&selector).next().unwrap();

        let comment = extract_comment_row(row, 40);
        assert_eq!(comment.id, Some(501));
        assert_eq!(comment.level, 1);
        assert_eq!(comment.user, "alice");
        assert_eq!(comment.time_ago, "3 hours ago");
        assert_eq!(comment.content, "<p>Agreed.<p>Second line");
    }

    #[test]
    fn test_indent_unit_is_configurable() {
        let doc = Html::parse_fragment(
            r#"<table><tr><td><img src="s.gif" width="60"></td><td></td></tr></table>"#,
        );
        let selector = Selector::parse("table").unwrap();
        let row = doc.select(&selector).next().unwrap();

        assert_eq!(extract_comment_row(row, 20).level, 3);
        assert_eq!(extract_comment_row(row, 40).level, 1);
    }

    proptest! {
        #[test]
        fn prop_stack_matches_backward_scan(levels in prop::collection::vec(0u32..6, 0..60)) {
            let comments = flat(&levels);
            prop_assert_eq!(parent_indices(&comments), naive_parents(&levels));

            let forest = build_comment_tree(comments);
            let mut found = Vec::new();
            edges(&forest, None, &mut found);

            // Preorder of the forest is document order
            let order: Vec<_> = found.iter().map(|(id, _)| *id).collect();
            let expected: Vec<_> = (0..levels.len()).map(|i| Some(i as u64)).collect();
            prop_assert_eq!(order, expected);

            for (i, parent) in naive_parents(&levels).into_iter().enumerate() {
                prop_assert_eq!(found[i].1, parent.map(|p| p as u64));
            }
        }
    }
}
