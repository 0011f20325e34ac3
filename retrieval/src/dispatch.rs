/// Which retrieval path a request takes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchPlan {
    /// No usable query and no pack or video scope
    Empty,
    /// No usable query, scroll the packs or videos in scope
    FilterOnly,
    /// Exactly one usable query
    Single(String),
    /// Two or more usable queries, in request order
    Temporal(Vec<String>),
}

impl DispatchPlan {
    /// Choose a path from the raw query list.
    ///
    /// Blank entries are removed before counting, so `["cat", ""]` is a
    /// single-query search on `cat`. Whitespace-only entries such as `"  "`
    /// count as blank too, not only the empty string.
    ///
    /// `has_scope` is true when the filters name packs or videos; with no
    /// usable query only a scoped request scrolls, exclusions alone do not.
    pub fn from_queries(queries: &[String], has_scope: bool) -> Self {
        let mut valid: Vec<String> = queries
            .iter()
            .filter(|q| !is_blank(q))
            .cloned()
            .collect();

        match valid.len() {
            0 if has_scope => DispatchPlan::FilterOnly,
            0 => DispatchPlan::Empty,
            1 => DispatchPlan::Single(valid.remove(0)),
            _ => DispatchPlan::Temporal(valid),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DispatchPlan::Empty => "empty",
            DispatchPlan::FilterOnly => "filter_only",
            DispatchPlan::Single(_) => "single",
            DispatchPlan::Temporal(_) => "temporal",
        }
    }
}

pub(crate) fn is_blank(query: &str) -> bool {
    query.trim().is_empty()
}
