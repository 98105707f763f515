//! Query specifications.
//!
//! The kind of a request is decided once, when the spec is built. Each arm
//! only carries the texts it needs; translation happens later in the
//! executor.

use std::fmt;
use std::str::FromStr;

use crate::error::{QueryError, QueryResult};

/// The operation a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// Filtered read.
    Find,
    /// Aggregation pipeline.
    Aggregate,
}

impl QueryKind {
    /// The lowercase name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Find => "find",
            Self::Aggregate => "aggregate",
        }
    }
}

impl FromStr for QueryKind {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "find" => Ok(Self::Find),
            "aggregate" => Ok(Self::Aggregate),
            _ => Err(QueryError::unsupported_kind(s)),
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Texts of a find request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindSpec {
    /// Filter, in Extended-JSON.
    pub filter: String,
    /// Sort specification, in plain JSON.
    pub sort: Option<String>,
    /// Projection, in plain JSON.
    pub projection: Option<String>,
    /// Maximum number of documents. Non-positive values mean no limit.
    pub limit: Option<i64>,
}

impl FindSpec {
    /// Create a find spec with only a filter.
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            sort: None,
            projection: None,
            limit: None,
        }
    }

    /// Set the sort text.
    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Set the projection text.
    pub fn projection(mut self, projection: impl Into<String>) -> Self {
        self.projection = Some(projection.into());
        self
    }

    /// Set the limit.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The limit as the driver should see it.
    pub fn effective_limit(&self) -> Option<i64> {
        self.limit.filter(|n| *n > 0)
    }
}

/// A validated query request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuerySpec {
    /// Filtered read.
    Find(FindSpec),
    /// Aggregation.
    Aggregate {
        /// Pipeline, in Extended-JSON.
        pipeline: String,
    },
}

impl QuerySpec {
    /// Build a find spec.
    pub fn find(spec: FindSpec) -> QueryResult<Self> {
        if spec.filter.trim().is_empty() {
            return Err(QueryError::empty_query());
        }
        Ok(Self::Find(spec))
    }

    /// Build an aggregate spec.
    pub fn aggregate(pipeline: impl Into<String>) -> QueryResult<Self> {
        let pipeline = pipeline.into();
        if pipeline.trim().is_empty() {
            return Err(QueryError::empty_query());
        }
        Ok(Self::Aggregate { pipeline })
    }

    /// Build a spec from loosely typed request fields.
    ///
    /// `kind` is matched case-insensitively. Sort, projection, and limit are
    /// ignored for aggregations. Blank sort and projection texts count as absent.
    pub fn from_parts(
        kind: &str,
        query: &str,
        sort: Option<&str>,
        projection: Option<&str>,
        limit: Option<i64>,
    ) -> QueryResult<Self> {
        match kind.parse::<QueryKind>()? {
            QueryKind::Find => Self::find(FindSpec {
                filter: query.to_string(),
                sort: present(sort),
                projection: present(projection),
                limit,
            }),
            QueryKind::Aggregate => Self::aggregate(query),
        }
    }

    /// The kind of this spec.
    pub fn kind(&self) -> QueryKind {
        match self {
            Self::Find(_) => QueryKind::Find,
            Self::Aggregate { .. } => QueryKind::Aggregate,
        }
    }
}

fn present(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
