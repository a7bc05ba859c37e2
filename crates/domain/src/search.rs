//! Search templates: pagination and free-text pattern parameters for a query.
//!
//! A [`SearchTemplate`] travels alongside a query example (a partially
//! populated entity) down to the DAO, which decides how to turn both into an
//! actual query. The service layer never interprets a template beyond copying
//! it and tightening its pagination bounds.

use serde::{Deserialize, Serialize};

/// How a text pattern is matched against searchable fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Whole value equals the pattern.
    #[default]
    Equals,
    /// Value starts with the pattern.
    StartingLike,
    /// Value ends with the pattern.
    EndingLike,
    /// Value contains the pattern.
    Anywhere,
    /// Pattern is a `LIKE` expression with `%` and `_` wildcards.
    Like,
}

/// Pagination and pattern-match parameters for a query.
///
/// Cloning is the copy constructor: callers keep their own template untouched
/// when the service derives a bounded copy from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchTemplate {
    /// Number of leading results to skip.
    pub first_result: u32,
    /// Maximum number of results to return, `None` meaning unbounded.
    pub max_results: Option<u32>,
    /// Free-text pattern applied to the entity's searchable fields.
    pub search_pattern: Option<String>,
    pub search_mode: SearchMode,
    pub case_sensitive: bool,
}

impl Default for SearchTemplate {
    fn default() -> Self {
        Self {
            first_result: 0,
            max_results: None,
            search_pattern: None,
            search_mode: SearchMode::default(),
            case_sensitive: true,
        }
    }
}

impl SearchTemplate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_first_result(mut self, first_result: u32) -> Self {
        self.first_result = first_result;
        self
    }

    #[must_use]
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Remove any result cap.
    #[must_use]
    pub fn unbounded(mut self) -> Self {
        self.max_results = None;
        self
    }

    #[must_use]
    pub fn with_search_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.search_pattern = Some(pattern.into());
        self
    }

    #[must_use]
    pub fn with_search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = mode;
        self
    }

    #[must_use]
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// The pattern, unless it is absent or empty.
    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        self.search_pattern.as_deref().filter(|p| !p.is_empty())
    }

    /// A copy restricted to the window `[0, max_results)`.
    ///
    /// Pattern, mode and case sensitivity are kept; `self` is not modified.
    #[must_use]
    pub fn first_page(&self, max_results: u32) -> Self {
        self.clone()
            .with_first_result(0)
            .with_max_results(max_results)
    }
}
