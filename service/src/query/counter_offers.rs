//! [`Query`] collection related to multiple [`CounterOffer`]s.

use common::operations::By;

use crate::domain::{posting, CounterOffer};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries all the [`CounterOffer`]s proposed upon a [`Posting`], oldest
/// first, regardless of their status.
///
/// [`Posting`]: crate::domain::Posting
pub type ForPosting = DatabaseQuery<By<Vec<CounterOffer>, posting::Id>>;
