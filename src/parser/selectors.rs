//! CSS selectors for the Hacker News page layouts
//!
//! The origin renders every page as nested tables. These selectors pick out
//! the cells the extractor reads; structural relationships (row pairing,
//! sibling tables) are walked by hand in [`super::html`].

use lazy_static::lazy_static;
use scraper::Selector;

// Helper macro to parse selectors safely at compile time
macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

lazy_static! {
    // Structure
    pub(crate) static ref TABLE_IN_CELL: Selector = parse_selector!("td table");
    pub(crate) static ref TABLE: Selector = parse_selector!("table");
    pub(crate) static ref ROW: Selector = parse_selector!("tr");
    pub(crate) static ref CELL: Selector = parse_selector!("td");
    pub(crate) static ref ANCHOR: Selector = parse_selector!("a");
    pub(crate) static ref NESTED_TABLE_IN_ROW: Selector = parse_selector!("tr table");
    pub(crate) static ref FORM: Selector = parse_selector!("form");
    pub(crate) static ref FORM_ROW: Selector = parse_selector!("form tr");
    pub(crate) static ref TEXTAREA: Selector = parse_selector!("textarea");

    // Story rows
    pub(crate) static ref TITLE_CELL: Selector = parse_selector!("td.title");
    pub(crate) static ref SUBTEXT_CELL: Selector = parse_selector!("td.subtext");
    pub(crate) static ref DEFAULT_CELL: Selector = parse_selector!("td.default");
    pub(crate) static ref VOTE_LINK: Selector = parse_selector!("td a[id^=up]");
    pub(crate) static ref COMHEAD: Selector = parse_selector!(".comhead");
    pub(crate) static ref SCORE: Selector = parse_selector!("span[id^=score]");
    pub(crate) static ref USER_LINK: Selector = parse_selector!("a[href^=user]");
    pub(crate) static ref ITEM_LINK: Selector = parse_selector!("a[href^=item]");
    pub(crate) static ref AGE: Selector = parse_selector!(".age");
    pub(crate) static ref TOPTEXT: Selector = parse_selector!(".toptext");

    // Comments and polls
    pub(crate) static ref COMMENT: Selector = parse_selector!(".comment");
    pub(crate) static ref COMMENT_CELL: Selector = parse_selector!("td.comment");
    pub(crate) static ref COMMTEXT: Selector = parse_selector!(".commtext");
    pub(crate) static ref INDENT_SPACER: Selector = parse_selector!("img[src*=\"s.gif\"]");
    pub(crate) static ref INDENT_CELL: Selector = parse_selector!("td.ind[indent]");
    pub(crate) static ref COMHEAD_SPAN: Selector = parse_selector!(".comhead span");
    pub(crate) static ref MORE_COMMENTS_LINK: Selector = parse_selector!("td.title a[href^=\"/x?\"]");
}
