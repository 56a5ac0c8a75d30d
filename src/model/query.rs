use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::model::{is_identifier, Record};
use crate::store::StoreError;

/// Sort key for a collection query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    pub ascending: bool,
}

impl SortSpec {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }
}

/// Free-text search over a set of candidate columns.
///
/// A row matches when any of the columns contains the term as a
/// case-insensitive substring. An empty term disables filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub term: String,
    pub columns: Vec<String>,
}

impl SearchFilter {
    pub fn new<I, S>(term: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            term: term.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.term.is_empty()
    }
}

/// Everything that determines the result of one collection fetch.
///
/// Descriptors are values: a change of any field means a new descriptor,
/// and equal descriptors are expected to yield equal results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    pub collection: String,
    pub select: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<SearchFilter>,
}

impl QueryDescriptor {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            select: "*".to_string(),
            sort: None,
            limit: None,
            offset: None,
            filter: None,
        }
    }

    pub fn select(mut self, select: impl Into<String>) -> Self {
        self.select = select.into();
        self
    }

    pub fn order_by(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn paginate(mut self, limit: usize, offset: usize) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    pub fn search(mut self, filter: SearchFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// The search filter, if it actually restricts rows
    pub fn active_filter(&self) -> Option<&SearchFilter> {
        self.filter.as_ref().filter(|f| f.is_active())
    }

    /// Row window `[offset, offset + limit)` of the filtered, sorted result.
    /// An offset without a limit does not paginate. The end saturates at
    /// `usize::MAX`.
    pub fn range(&self) -> Option<Range<usize>> {
        self.limit.map(|limit| {
            let start = self.offset.unwrap_or(0);
            start..start.saturating_add(limit)
        })
    }

    /// Reject descriptors no store could execute
    pub fn validate(&self) -> Result<(), StoreError> {
        if !is_identifier(&self.collection) {
            return Err(StoreError::InvalidQuery(format!(
                "invalid collection name '{}'",
                self.collection
            )));
        }
        if let Some(sort) = &self.sort {
            if !is_identifier(&sort.column) {
                return Err(StoreError::InvalidQuery(format!(
                    "invalid sort column '{}'",
                    sort.column
                )));
            }
        }
        if self.limit == Some(0) {
            return Err(StoreError::InvalidQuery(
                "page size must be at least 1".to_string(),
            ));
        }
        if let Some(filter) = self.active_filter() {
            if filter.columns.is_empty() {
                return Err(StoreError::InvalidQuery(
                    "search filter needs at least one column".to_string(),
                ));
            }
            if let Some(bad) = filter.columns.iter().find(|c| !is_identifier(c)) {
                return Err(StoreError::InvalidQuery(format!(
                    "invalid search column '{}'",
                    bad
                )));
            }
        }
        Ok(())
    }
}

/// What a reader currently shows for its descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub rows: Vec<Record>,
    pub loading: bool,
    pub error: Option<String>,
    /// Rows matching the filter before pagination, when known
    pub total_count: Option<u64>,
}

impl QueryResult {
    /// State before the first fetch completes
    pub fn pending() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    pub fn failed(message: String) -> Self {
        Self {
            rows: Vec::new(),
            loading: false,
            error: Some(message),
            total_count: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_requires_limit() {
        let descriptor = QueryDescriptor::new("organizations");
        assert_eq!(descriptor.range(), None);

        let mut offset_only = QueryDescriptor::new("organizations");
        offset_only.offset = Some(10);
        assert_eq!(offset_only.range(), None);

        let paged = QueryDescriptor::new("organizations").paginate(10, 20);
        assert_eq!(paged.range(), Some(20..30));
    }

    #[test]
    fn test_range_end_saturates() {
        let far = QueryDescriptor::new("organizations").paginate(10, usize::MAX - 3);
        assert_eq!(far.range(), Some(usize::MAX - 3..usize::MAX));
    }

    #[test]
    fn test_empty_term_is_inactive() {
        let descriptor = QueryDescriptor::new("partners")
            .search(SearchFilter::new("", ["partner_code"]));
        assert!(descriptor.active_filter().is_none());
        assert!(descriptor.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_descriptors() {
        assert!(QueryDescriptor::new("").validate().is_err());
        assert!(QueryDescriptor::new("orgs;--").validate().is_err());
        assert!(QueryDescriptor::new("uoms").paginate(0, 0).validate().is_err());

        let no_columns = QueryDescriptor::new("uoms")
            .search(SearchFilter::new("kg", Vec::<String>::new()));
        assert!(no_columns.validate().is_err());

        let bad_sort = QueryDescriptor::new("uoms").order_by(SortSpec::asc("uom code"));
        assert!(bad_sort.validate().is_err());
    }

    #[test]
    fn test_descriptor_equality_tracks_every_field() {
        let base = QueryDescriptor::new("branches")
            .order_by(SortSpec::asc("branch_code"))
            .paginate(10, 0);
        assert_eq!(base, base.clone());
        assert_ne!(base, base.clone().paginate(10, 10));
        assert_ne!(base, base.clone().order_by(SortSpec::desc("branch_code")));
        assert_ne!(
            base,
            base.clone().search(SearchFilter::new("hn", ["branch_code"]))
        );
    }
}
