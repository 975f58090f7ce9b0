//! [`Query`] collection related to multiple [`Posting`]s.
//!
//! [`Posting`]: crate::domain::Posting

use common::operations::By;

use crate::read;
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries the feed of open [`Posting`]s, newest first, limited by the
/// provided [`read::posting::Limit`].
///
/// [`Posting`]: crate::domain::Posting
pub type Feed = DatabaseQuery<By<read::posting::Feed, read::posting::Limit>>;
