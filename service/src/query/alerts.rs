//! [`Query`] collection related to the multiple [`Alert`]s.

use common::operations::By;

#[cfg(doc)]
use crate::{domain::Alert, Query};
use crate::read;

use super::DatabaseQuery;

/// Queries a list of [`Alert`]s.
pub type List =
    DatabaseQuery<By<read::alert::list::Page, read::alert::list::Selector>>;

/// Queries total count of [`Alert`]s matching a filter.
pub type TotalCount = DatabaseQuery<
    By<read::alert::list::TotalCount, read::alert::list::Filter>,
>;
