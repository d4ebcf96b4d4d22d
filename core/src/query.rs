//! Read request shapes and the count/fetch statements built from them
//!
//! Every read is answered by two statements: one counting the full match
//! set and one fetching the requested page. Both are produced by
//! [`build`] from the same predicate value, so the total and the page
//! always describe the same filter branch.

use rusqlite::types::Value;

use crate::pagination::Window;
use crate::{Error, Result};

/// Table holding the phrasebook entries
pub const TABLE: &str = "words";

/// Tag values that select by usage category instead of tag membership
pub const USAGE_CATEGORIES: [&str; 2] = ["Proverb", "EL"];

/// Columns projected by fetch statements, in storage naming
const SELECT_COLUMNS: &str = "id, phrase, pronunciation, mandarin, definition, usage, tags, audiourl";

/// Unicode lowercase scalar function registered on every store connection
pub const CASEFOLD_FUNCTION: &str = "casefold";

/// Expressions a keyword is matched against
const SEARCH_FIELDS: [&str; 7] = [
    "phrase",
    "pronunciation",
    "mandarin",
    "definition",
    "usage",
    "(SELECT group_concat(json_each.value, ' ') FROM json_each(words.tags))",
    "audiourl",
];

/// How a tag/usage filter value is matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Entries whose usage category equals the value
    UsageEquals(String),
    /// Entries whose tag set contains the value
    TagContains(String),
}

/// A trimmed, non-empty search keyword
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword(String);

/// The shape of a read request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadRequest {
    /// Every entry, no pagination
    All,
    /// One page of every entry
    Page { page: i64 },
    /// One page of entries matching a tag or usage filter
    Filtered { filter: Filter, page: i64 },
    /// One page of entries containing a keyword in any text field
    Search { keyword: Keyword, page: i64 },
}

/// A statement with positional parameters (`?1`, `?2`, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Count and fetch statements built from one predicate
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPair {
    pub count: Query,
    pub fetch: Query,
}

/// WHERE clause body plus the parameters it binds, starting at `?1`
struct Predicate {
    clause: Option<String>,
    params: Vec<Value>,
}

impl Filter {
    /// Decide the filter semantics for a raw tag value
    ///
    /// Exactly "Proverb" and "EL" select by usage; everything else,
    /// including other casings of those words, is a tag lookup.
    pub fn from_tag(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if USAGE_CATEGORIES.contains(&tag.as_str()) {
            Filter::UsageEquals(tag)
        } else {
            Filter::TagContains(tag)
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Filter::UsageEquals(value) | Filter::TagContains(value) => value,
        }
    }
}

impl Keyword {
    /// Trim `raw` and reject it if nothing is left
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidRequest(
                "Search keyword cannot be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// LIKE pattern matching the lowercased keyword as a literal substring
    ///
    /// Compared against fields passed through [`CASEFOLD_FUNCTION`], so the
    /// match ignores case beyond ASCII.
    pub fn like_pattern(&self) -> String {
        let folded = self.0.to_lowercase();
        let mut pattern = String::with_capacity(folded.len() + 2);
        pattern.push('%');
        for c in folded.chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }
}

impl ReadRequest {
    /// Filtered request for a raw tag value
    pub fn filtered(tag: &str, page: i64) -> Self {
        ReadRequest::Filtered {
            filter: Filter::from_tag(tag),
            page,
        }
    }

    /// Search request for a raw keyword; fails if the keyword is blank
    pub fn search(keyword: &str, page: i64) -> Result<Self> {
        Ok(ReadRequest::Search {
            keyword: Keyword::parse(keyword)?,
            page,
        })
    }

    /// Requested page, or `None` for the unpaginated listing
    pub fn page(&self) -> Option<i64> {
        match self {
            ReadRequest::All => None,
            ReadRequest::Page { page }
            | ReadRequest::Filtered { page, .. }
            | ReadRequest::Search { page, .. } => Some(*page),
        }
    }

    fn predicate(&self) -> Predicate {
        match self {
            ReadRequest::All | ReadRequest::Page { .. } => Predicate {
                clause: None,
                params: Vec::new(),
            },
            ReadRequest::Filtered { filter, .. } => {
                let clause = match filter {
                    Filter::UsageEquals(_) => "usage = ?1".to_string(),
                    Filter::TagContains(_) => format!(
                        "EXISTS (SELECT 1 FROM json_each({}.tags) WHERE json_each.value = ?1)",
                        TABLE
                    ),
                };
                Predicate {
                    clause: Some(clause),
                    params: vec![Value::Text(filter.value().to_string())],
                }
            }
            ReadRequest::Search { keyword, .. } => {
                let clause = SEARCH_FIELDS
                    .iter()
                    .map(|field| {
                        format!("{}({}) LIKE ?1 ESCAPE '\\'", CASEFOLD_FUNCTION, field)
                    })
                    .collect::<Vec<_>>()
                    .join(" OR ");
                Predicate {
                    clause: Some(format!("({})", clause)),
                    params: vec![Value::Text(keyword.like_pattern())],
                }
            }
        }
    }
}

/// Build the count and fetch statements for a request
///
/// The fetch is ordered by id. When `window` is given it is appended as
/// `LIMIT`/`OFFSET`, bound after the predicate's own parameters.
pub fn build(request: &ReadRequest, window: Option<Window>) -> QueryPair {
    let Predicate { clause, params } = request.predicate();
    let where_sql = clause
        .map(|clause| format!(" WHERE {}", clause))
        .unwrap_or_default();

    let count = Query {
        sql: format!("SELECT COUNT(*) AS count FROM {}{}", TABLE, where_sql),
        params: params.clone(),
    };

    let mut fetch_sql = format!(
        "SELECT {} FROM {}{} ORDER BY id",
        SELECT_COLUMNS, TABLE, where_sql
    );
    let mut fetch_params = params;
    if let Some(window) = window {
        let limit_index = fetch_params.len() + 1;
        fetch_sql.push_str(&format!(
            " LIMIT ?{} OFFSET ?{}",
            limit_index,
            limit_index + 1
        ));
        fetch_params.push(Value::Integer(i64::from(window.limit())));
        fetch_params.push(Value::Integer(window.offset()));
    }

    QueryPair {
        count,
        fetch: Query {
            sql: fetch_sql,
            params: fetch_params,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::Pagination;

    fn text(value: &str) -> Value {
        Value::Text(value.to_string())
    }

    #[test]
    fn test_usage_categories_select_usage_equality() {
        for tag in ["Proverb", "EL"] {
            assert_eq!(Filter::from_tag(tag), Filter::UsageEquals(tag.to_string()));
        }
    }

    #[test]
    fn test_other_tags_select_membership() {
        for tag in ["greeting", "proverb", "el", "EL ", "Proverbs", ""] {
            assert_eq!(Filter::from_tag(tag), Filter::TagContains(tag.to_string()));
        }
    }

    #[test]
    fn test_usage_filter_statements() {
        let window = Pagination::default().window_for(2).unwrap();
        let pair = build(&ReadRequest::filtered("EL", 2), Some(window));

        assert_eq!(
            pair.count.sql,
            "SELECT COUNT(*) AS count FROM words WHERE usage = ?1"
        );
        assert_eq!(pair.count.params, vec![text("EL")]);

        assert!(pair.fetch.sql.contains("WHERE usage = ?1 ORDER BY id LIMIT ?2 OFFSET ?3"));
        assert!(!pair.fetch.sql.contains("json_each"));
        assert_eq!(
            pair.fetch.params,
            vec![text("EL"), Value::Integer(10), Value::Integer(10)]
        );
    }

    #[test]
    fn test_tag_filter_statements() {
        let window = Pagination::default().window_for(1).unwrap();
        let pair = build(&ReadRequest::filtered("greeting", 1), Some(window));

        assert!(pair.count.sql.contains("json_each(words.tags)"));
        assert!(!pair.count.sql.contains("usage"));
        assert!(pair.fetch.sql.contains("json_each.value = ?1"));
        assert!(!pair.fetch.sql.contains("usage ="));
        assert_eq!(
            pair.fetch.params,
            vec![text("greeting"), Value::Integer(10), Value::Integer(0)]
        );
    }

    #[test]
    fn test_count_and_fetch_share_predicate() {
        let window = Pagination::default().window_for(3).unwrap();
        let requests = [
            ReadRequest::Page { page: 3 },
            ReadRequest::filtered("Proverb", 3),
            ReadRequest::filtered("food", 3),
            ReadRequest::search("tea", 3).unwrap(),
        ];

        for request in &requests {
            let pair = build(request, Some(window));
            let count_where = pair.count.sql.split(" FROM words").nth(1).unwrap();
            assert!(
                pair.fetch.sql.contains(&format!("FROM words{} ORDER BY id", count_where)),
                "{:?}",
                request
            );
            assert_eq!(
                pair.count.params[..],
                pair.fetch.params[..pair.count.params.len()]
            );
        }
    }

    #[test]
    fn test_unpaginated_listing_has_no_window() {
        let pair = build(&ReadRequest::All, None);
        assert_eq!(pair.count.sql, "SELECT COUNT(*) AS count FROM words");
        assert!(pair.fetch.sql.ends_with("FROM words ORDER BY id"));
        assert!(pair.fetch.params.is_empty());
    }

    #[test]
    fn test_paginated_listing_uses_offset() {
        let window = Pagination::default().window_for(4).unwrap();
        let pair = build(&ReadRequest::Page { page: 4 }, Some(window));
        assert!(pair.fetch.sql.ends_with("ORDER BY id LIMIT ?1 OFFSET ?2"));
        assert_eq!(
            pair.fetch.params,
            vec![Value::Integer(10), Value::Integer(30)]
        );
        assert!(!pair.fetch.sql.contains("id >"));
    }

    #[test]
    fn test_search_covers_every_text_field() {
        let pair = build(&ReadRequest::search("  tea ", 1).unwrap(), None);
        for field in ["phrase", "pronunciation", "mandarin", "definition", "usage", "audiourl"] {
            assert!(
                pair.count.sql.contains(&format!("casefold({}) LIKE ?1", field)),
                "missing {}",
                field
            );
        }
        assert!(pair.count.sql.contains("group_concat(json_each.value, ' ')"));
        assert_eq!(pair.count.params, vec![text("%tea%")]);
    }

    #[test]
    fn test_blank_keyword_rejected() {
        for raw in ["", " ", "\t\n  "] {
            assert!(matches!(Keyword::parse(raw), Err(Error::InvalidRequest(_))));
            assert!(ReadRequest::search(raw, 1).is_err());
        }
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        let keyword = Keyword::parse("50%_off\\").unwrap();
        assert_eq!(keyword.like_pattern(), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn test_like_pattern_lowercases_beyond_ascii() {
        let keyword = Keyword::parse(" XIÈXIÈ ").unwrap();
        assert_eq!(keyword.as_str(), "XIÈXIÈ");
        assert_eq!(keyword.like_pattern(), "%xièxiè%");
    }

    #[test]
    fn test_request_page() {
        assert_eq!(ReadRequest::All.page(), None);
        assert_eq!(ReadRequest::filtered("x", 5).page(), Some(5));
    }
}
