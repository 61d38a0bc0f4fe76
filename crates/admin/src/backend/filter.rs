//! Filter predicates for direct table operations.
//!
//! Renders to the backend's query-parameter grammar: `col=eq.v`,
//! `col=in.(a,b)`, `col=like.*v*`, `order=col.desc`, `limit=n`.

/// A composable set of filter predicates.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    params: Vec<(String, String)>,
}

impl Filter {
    /// Create an empty filter (matches everything policy allows).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Equality predicate.
    #[must_use]
    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.params
            .push((column.to_string(), format!("eq.{}", value.to_string())));
        self
    }

    /// Set-membership predicate.
    #[must_use]
    pub fn in_set(mut self, column: &str, values: &[&str]) -> Self {
        self.params
            .push((column.to_string(), format!("in.({})", values.join(","))));
        self
    }

    /// Pattern-match predicate (`*` wildcards).
    #[must_use]
    pub fn like(mut self, column: &str, pattern: &str) -> Self {
        self.params
            .push((column.to_string(), format!("like.{pattern}")));
        self
    }

    /// Greater-than-or-equal predicate.
    #[must_use]
    pub fn gte(mut self, column: &str, value: impl ToString) -> Self {
        self.params
            .push((column.to_string(), format!("gte.{}", value.to_string())));
        self
    }

    /// Non-null predicate.
    #[must_use]
    pub fn not_null(mut self, column: &str) -> Self {
        self.params
            .push((column.to_string(), "not.is.null".to_string()));
        self
    }

    /// Descending ordering.
    #[must_use]
    pub fn order_desc(mut self, column: &str) -> Self {
        self.params
            .push(("order".to_string(), format!("{column}.desc")));
        self
    }

    /// Row limit.
    #[must_use]
    pub fn limit(mut self, n: u32) -> Self {
        self.params.push(("limit".to_string(), n.to_string()));
        self
    }

    /// Rendered query parameters.
    #[must_use]
    pub fn as_query(&self) -> &[(String, String)] {
        &self.params
    }
}
