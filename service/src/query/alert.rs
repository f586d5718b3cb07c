//! [`Query`] collection related to a single [`Alert`].

use common::operations::By;

use crate::domain::{alert, Alert};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries an [`Alert`] by its [`alert::Id`].
pub type ById = DatabaseQuery<By<Option<Alert>, alert::Id>>;
