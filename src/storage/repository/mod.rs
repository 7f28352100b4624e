// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the embedded database.
//!
//! Each repository provides CRUD operations for a specific entity type,
//! using the shared [`Database`](super::Database) handle for all table access.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

pub mod events;
pub mod invitations;

pub use events::{
    EventColumn, EventFilter, EventPatch, EventRepository, EventType, NewEvent, StoredEvent,
};
pub use invitations::{
    InvitationColumn, InvitationFilter, InvitationPatch, InvitationRepository,
    InvitationSearch, InvitationStatus, NewInvitation, PlatformRole, StoredInvitation,
};

/// Sort direction for listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// Offset/limit pagination. `page` is zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
}

impl Pagination {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self { page, page_size }
    }

    /// Slice one page out of an already ordered result set.
    fn slice<T>(&self, rows: Vec<T>) -> Vec<T> {
        rows.into_iter()
            .skip(self.page.saturating_mul(self.page_size))
            .take(self.page_size)
            .collect()
    }
}

/// Sort rows by `key` in the given direction, then paginate.
///
/// Returns the requested page and the total number of rows before
/// pagination.
pub(crate) fn sort_and_page<T, F>(
    mut rows: Vec<T>,
    order: SortOrder,
    pagination: Pagination,
    compare: F,
) -> (Vec<T>, usize)
where
    F: Fn(&T, &T) -> Ordering,
{
    rows.sort_by(|a, b| order.apply(compare(a, b)));
    let total = rows.len();
    (pagination.slice(rows), total)
}

/// Compare optional strings with absent values ordered first.
pub(crate) fn cmp_opt(a: Option<&str>, b: Option<&str>) -> Ordering {
    a.unwrap_or_default().cmp(b.unwrap_or_default())
}
