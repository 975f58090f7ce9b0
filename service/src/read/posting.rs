//! Read models of postings.

use derive_more::Deref;

use crate::domain::Posting;

/// Feed of open [`Posting`]s awaiting a technician, newest first.
#[derive(Clone, Debug, Deref)]
pub struct Feed(pub Vec<Posting>);

/// Maximum number of [`Posting`]s forming a [`Feed`].
pub type Limit = i64;
