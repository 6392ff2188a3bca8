//! Result shapes returned by repository query methods

use serde::{Deserialize, Serialize};

use crate::core::error::{QueryError, Result};
use crate::query::sort::Sort;

/// Request for one page of results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (0-based)
    pub page: usize,
    /// Page size, at least 1
    pub size: usize,
    #[serde(default)]
    pub sort: Sort,
}

impl PageRequest {
    pub fn of(page: usize, size: usize) -> Self {
        Self {
            page,
            size: size.max(1),
            sort: Sort::unsorted(),
        }
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// Index of the first row of the page
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }

    pub fn next(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            ..self.clone()
        }
    }
}

/// A page of results with the total number of matching entries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub number: usize,
    pub size: usize,
    pub total_elements: usize,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: usize) -> Self {
        Self {
            content,
            number: request.page,
            size: request.size,
            total_elements,
        }
    }

    /// A single page holding every result
    pub fn unpaged(content: Vec<T>) -> Self {
        let total_elements = content.len();
        Self {
            content,
            number: 0,
            size: total_elements,
            total_elements,
        }
    }

    /// `ceil(total_elements / size)`
    pub fn total_pages(&self) -> usize {
        if self.size == 0 {
            return 1;
        }
        self.total_elements.div_ceil(self.size)
    }

    pub fn has_next(&self) -> bool {
        self.number + 1 < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.number > 0
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// A page of results that only knows whether another page follows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice<T> {
    pub content: Vec<T>,
    pub number: usize,
    pub size: usize,
    pub has_next: bool,
}

impl<T> Slice<T> {
    pub fn has_previous(&self) -> bool {
        self.number > 0
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Single-pass sequence over query results.
///
/// The store contract returns collections, so the stream walks results that
/// were already fetched; it does not fetch lazily. The underlying cursor is
/// released once the sequence is exhausted, when
/// [`close`](ResultStream::close) is called, or when the stream is dropped.
/// A released stream yields nothing more.
#[derive(Debug)]
pub struct ResultStream<T> {
    source: String,
    cursor: Option<std::vec::IntoIter<T>>,
}

impl<T> ResultStream<T> {
    pub fn new(source: impl Into<String>, values: Vec<T>) -> Self {
        Self {
            source: source.into(),
            cursor: Some(values.into_iter()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.cursor.is_some()
    }

    /// Release the cursor without consuming the remaining results
    pub fn close(&mut self) {
        if let Some(cursor) = self.cursor.take() {
            tracing::debug!(
                source = %self.source,
                remaining = cursor.len(),
                "result stream closed"
            );
        }
    }
}

impl<T> Iterator for ResultStream<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let next = self.cursor.as_mut()?.next();
        if next.is_none() {
            self.close();
        }
        next
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.cursor
            .as_ref()
            .map_or((0, Some(0)), |cursor| cursor.size_hint())
    }
}

impl<T> Drop for ResultStream<T> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Outcome of a repository query method
#[derive(Debug)]
pub enum QueryResult<T> {
    Count(usize),
    Exists(bool),
    Single(Option<T>),
    List(Vec<T>),
    Stream(ResultStream<T>),
    Page(Page<T>),
    Slice(Slice<T>),
}

impl<T> QueryResult<T> {
    /// Name of the shape, for diagnostics
    pub fn shape(&self) -> &'static str {
        match self {
            QueryResult::Count(_) => "count",
            QueryResult::Exists(_) => "exists",
            QueryResult::Single(_) => "single",
            QueryResult::List(_) => "list",
            QueryResult::Stream(_) => "stream",
            QueryResult::Page(_) => "page",
            QueryResult::Slice(_) => "slice",
        }
    }

    fn mismatch(&self, expected: &'static str) -> crate::core::error::RepositoryError {
        QueryError::ResultShapeMismatch {
            expected,
            actual: self.shape(),
        }
        .into()
    }

    pub fn into_count(self) -> Result<usize> {
        match self {
            QueryResult::Count(count) => Ok(count),
            other => Err(other.mismatch("count")),
        }
    }

    pub fn into_exists(self) -> Result<bool> {
        match self {
            QueryResult::Exists(exists) => Ok(exists),
            other => Err(other.mismatch("exists")),
        }
    }

    pub fn into_single(self) -> Result<Option<T>> {
        match self {
            QueryResult::Single(value) => Ok(value),
            other => Err(other.mismatch("single")),
        }
    }

    /// The results as a list; a stream is drained
    pub fn into_list(self) -> Result<Vec<T>> {
        match self {
            QueryResult::List(values) => Ok(values),
            QueryResult::Stream(stream) => Ok(stream.collect()),
            other => Err(other.mismatch("list")),
        }
    }

    pub fn into_stream(self) -> Result<ResultStream<T>> {
        match self {
            QueryResult::Stream(stream) => Ok(stream),
            other => Err(other.mismatch("stream")),
        }
    }

    pub fn into_page(self) -> Result<Page<T>> {
        match self {
            QueryResult::Page(page) => Ok(page),
            other => Err(other.mismatch("page")),
        }
    }

    pub fn into_slice(self) -> Result<Slice<T>> {
        match self {
            QueryResult::Slice(slice) => Ok(slice),
            other => Err(other.mismatch("slice")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_offset() {
        assert_eq!(PageRequest::of(3, 5).offset(), 15);
        assert_eq!(PageRequest::of(0, 0).size, 1);
        assert_eq!(PageRequest::of(1, 5).next().page, 2);
    }

    #[test]
    fn test_total_pages() {
        let page = Page::new(vec![1, 2, 3], &PageRequest::of(4, 5), 23);
        assert_eq!(page.total_pages(), 5);
        assert!(!page.has_next());
        assert!(page.has_previous());

        let page = Page::new(vec![1; 5], &PageRequest::of(0, 5), 25);
        assert_eq!(page.total_pages(), 5);
        assert!(page.has_next());

        let empty: Page<i32> = Page::unpaged(vec![]);
        assert_eq!(empty.total_pages(), 1);
    }

    #[test]
    fn test_stream_is_single_pass() {
        let mut stream = ResultStream::new("people", vec![1, 2, 3]);
        assert_eq!(stream.next(), Some(1));
        let rest: Vec<i32> = stream.by_ref().collect();
        assert_eq!(rest, vec![2, 3]);
        assert!(!stream.is_open());
        assert_eq!(stream.next(), None);
    }

    #[test]
    fn test_closed_stream_yields_nothing() {
        let mut stream = ResultStream::new("people", vec![1, 2, 3]);
        stream.close();
        assert!(!stream.is_open());
        assert_eq!(stream.next(), None);
    }

    #[test]
    fn test_shape_mismatch() {
        let result: QueryResult<i32> = QueryResult::Count(3);
        let err = result.into_list().unwrap_err();
        assert_eq!(err.error_code(), "RESULT_SHAPE_MISMATCH");

        let result = QueryResult::Stream(ResultStream::new("people", vec![1, 2]));
        assert_eq!(result.into_list().unwrap(), vec![1, 2]);
    }
}
