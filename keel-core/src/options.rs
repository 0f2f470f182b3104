use crate::{Record, Result, Selector};
use std::{borrow::Cow, sync::LazyLock};

/// Rows read by a multi-row fetch unless overridden, `KEEL_MAX_ROWS` in the
/// environment replaces the default of 10 000.
pub static DEFAULT_MAX_ROWS: LazyLock<usize> = LazyLock::new(|| {
    const DEFAULT: usize = 10_000;
    match std::env::var("KEEL_MAX_ROWS") {
        Ok(v) => v.trim().parse().unwrap_or_else(|_| {
            log::warn!("KEEL_MAX_ROWS=`{v}` is not a number, using {DEFAULT}");
            DEFAULT
        }),
        Err(_) => DEFAULT,
    }
});

#[derive(Debug, Clone)]
enum SelectorSource {
    Text(String),
    Built(Selector),
}

/// Per call parameters of the record operations.
///
/// ```rust
/// use keel_core::QueryOptions;
/// let mut total = 0;
/// let options = QueryOptions::new()
///     .table("people")
///     .selector("age>30,name in (ann,bob)")
///     .limit(20, 10)
///     .total(&mut total);
/// assert_eq!(options.table_name(), Some("people"));
/// ```
#[derive(Debug, Default)]
pub struct QueryOptions<'a> {
    table: Option<String>,
    cols: Vec<String>,
    selector: Option<SelectorSource>,
    offset: Option<u64>,
    limit: Option<u64>,
    total: Option<&'a mut u64>,
    ignore_not_found: bool,
    max_rows: Option<usize>,
}

impl<'a> QueryOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn cols<I, S>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cols = cols.into_iter().map(Into::into).collect();
        self
    }

    /// Selector text, parsed when the statement is generated.
    pub fn selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(SelectorSource::Text(selector.into()));
        self
    }

    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = Some(SelectorSource::Built(selector));
        self
    }

    pub fn limit(mut self, offset: u64, limit: u64) -> Self {
        self.offset = Some(offset);
        self.limit = Some(limit);
        self
    }

    /// Receives the number of rows matching the selector, ignoring the limit.
    pub fn total(mut self, total: &'a mut u64) -> Self {
        self.total = Some(total);
        self
    }

    /// An empty single-row read returns the default record, an empty list
    /// returns no rows, instead of failing with `NotFound`.
    pub fn ignore_not_found(mut self) -> Self {
        self.ignore_not_found = true;
        self
    }

    pub fn max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    pub fn table_name(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Explicit table or the record table.
    pub fn table_or<R: Record>(&self) -> Cow<'_, str> {
        match &self.table {
            Some(v) => Cow::Borrowed(v),
            None => Cow::Owned(R::table_name()),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.cols
    }

    pub fn offset_limit(&self) -> (Option<u64>, Option<u64>) {
        (self.offset, self.limit)
    }

    pub fn is_ignore_not_found(&self) -> bool {
        self.ignore_not_found
    }

    pub fn row_cap(&self) -> usize {
        self.max_rows.unwrap_or(*DEFAULT_MAX_ROWS)
    }

    pub fn wants_total(&self) -> bool {
        self.total.is_some()
    }

    pub fn set_total(&mut self, value: u64) {
        if let Some(total) = &mut self.total {
            **total = value;
        }
    }

    /// The selector, parsing it when given as text.
    pub fn parsed_selector(&self) -> Result<Option<Cow<'_, Selector>>> {
        Ok(match &self.selector {
            None => None,
            Some(SelectorSource::Built(v)) => Some(Cow::Borrowed(v)),
            Some(SelectorSource::Text(v)) if v.trim().is_empty() => None,
            Some(SelectorSource::Text(v)) => Some(Cow::Owned(Selector::parse(v)?)),
        })
    }
}
