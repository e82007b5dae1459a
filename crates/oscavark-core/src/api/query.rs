//! PostgREST query builder.
//!
//! Builds the query-string half of a `rest/v1/<table>` request. Filters are
//! encoded the way PostgREST expects them (`column=op.value`), so a builder
//! with no filters selects every row the caller's policies allow.

use std::fmt::Display;

/// A single table query: select list, filters, ordering and paging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    table: String,
    select: Option<String>,
    filters: Vec<(String, String)>,
    order: Vec<String>,
    limit: Option<usize>,
    offset: Option<usize>,
    on_conflict: Option<String>,
}

impl Query {
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            select: None,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
            on_conflict: None,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.select = Some(columns.to_string());
        self
    }

    fn filter(mut self, column: &str, op: &str, value: impl Display) -> Self {
        self.filters
            .push((column.to_string(), format!("{}.{}", op, value)));
        self
    }

    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "eq", value)
    }

    pub fn neq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "neq", value)
    }

    pub fn gte(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "gte", value)
    }

    pub fn lte(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "lte", value)
    }

    pub fn is_null(self, column: &str) -> Self {
        self.filter(column, "is", "null")
    }

    /// Case-insensitive substring match. `*` is PostgREST's URL-safe `%`.
    pub fn ilike(self, column: &str, needle: &str) -> Self {
        let cleaned = needle.replace(['*', ',', '(', ')'], "");
        self.filter(column, "ilike", format!("*{}*", cleaned))
    }

    /// Substring match on any of several columns.
    pub fn search_any(mut self, columns: &[&str], needle: &str) -> Self {
        let cleaned = needle.trim().replace(['*', ',', '(', ')'], "");
        if cleaned.is_empty() || columns.is_empty() {
            return self;
        }
        let clauses: Vec<String> = columns
            .iter()
            .map(|c| format!("{}.ilike.*{}*", c, cleaned))
            .collect();
        self.filters
            .push(("or".to_string(), format!("({})", clauses.join(","))));
        self
    }

    pub fn in_list<T: Display>(self, column: &str, values: &[T]) -> Self {
        let joined = values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.filter(column, "in", format!("({})", joined))
    }

    /// Apply `eq` only when the value is present.
    pub fn eq_opt<T: Display>(self, column: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.eq(column, v),
            None => self,
        }
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let dir = if ascending { "asc" } else { "desc" };
        self.order.push(format!("{}.{}", column, dir));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Conflict target for upserts (`on_conflict=a,b`).
    pub fn on_conflict(mut self, columns: &str) -> Self {
        self.on_conflict = Some(columns.to_string());
        self
    }

    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    /// Key/value pairs ready for `RequestBuilder::query`.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(self.filters.len() + 5);
        if let Some(ref select) = self.select {
            params.push(("select".to_string(), select.clone()));
        }
        params.extend(self.filters.iter().cloned());
        if !self.order.is_empty() {
            params.push(("order".to_string(), self.order.join(",")));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            params.push(("offset".to_string(), offset.to_string()));
        }
        if let Some(ref target) = self.on_conflict {
            params.push(("on_conflict".to_string(), target.clone()));
        }
        params
    }
}

/// Parse the total out of a PostgREST `Content-Range` header
/// (`0-24/3573`, `*/0`). An unknown total (`*`) yields `None`.
pub fn parse_content_range_total(header: &str) -> Option<u64> {
    let (_, total) = header.trim().rsplit_once('/')?;
    total.parse().ok()
}
