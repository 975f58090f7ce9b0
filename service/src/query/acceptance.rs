//! [`Query`] collection related to a [`Posting`] binding.
//!
//! [`Posting`]: crate::domain::Posting

use common::operations::By;

use crate::domain::{posting, Acceptance};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries the [`Acceptance`] of a [`Posting`] by its [`posting::Id`].
///
/// [`Posting`]: crate::domain::Posting
pub type ByPosting = DatabaseQuery<By<Option<Acceptance>, posting::Id>>;
