//! Pagination value objects.
//!
//! List endpoints accept a `Pageable` descriptor and return a `Page<T>`.
//! Sort fields are free-form here; each component validates them against
//! its own whitelist before the store sees them.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Sort direction for list endpoints.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

/// A requested sort: wire field name plus direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub dir: SortDir,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, dir: SortDir) -> Self {
        Self {
            field: field.into(),
            dir,
        }
    }

    /// Reject sort fields outside the component's whitelist.
    pub fn ensure_allowed(&self, allowed: &[&str]) -> DomainResult<()> {
        if allowed.contains(&self.field.as_str()) {
            Ok(())
        } else {
            Err(DomainError::validation(
                "sort",
                format!(
                    "unknown sort field '{}', expected one of: {}",
                    self.field,
                    allowed.join(", ")
                ),
            ))
        }
    }
}

/// The `(offset, limit, sort)` descriptor for list endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pageable {
    pub page: u32,
    pub size: u32,
    pub sort: Option<SortSpec>,
}

impl Pageable {
    pub const DEFAULT_SIZE: u32 = 20;
    pub const MAX_SIZE: u32 = 100;

    pub fn new(page: u32, size: u32, sort: Option<SortSpec>) -> Self {
        Self {
            page,
            size: size.clamp(1, Self::MAX_SIZE),
            sort,
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }

    /// Validate the sort (when present) against a whitelist of wire fields.
    pub fn ensure_sort_allowed(&self, allowed: &[&str]) -> DomainResult<()> {
        match &self.sort {
            Some(sort) => sort.ensure_allowed(allowed),
            None => Ok(()),
        }
    }
}

impl Default for Pageable {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_SIZE, None)
    }
}

/// One page of results plus the total across all pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub size: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, pageable: &Pageable) -> Self {
        Self {
            items,
            total,
            page: pageable.page,
            size: pageable.size,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            size: self.size,
        }
    }
}
