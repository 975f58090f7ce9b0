//! [`Query`] collection related to a single [`Posting`].

use common::operations::By;

use crate::domain::{posting, Posting};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`Posting`] by its [`posting::Id`].
pub type ById = DatabaseQuery<By<Option<Posting>, posting::Id>>;
