//! [`Query`] collection related to a single [`CounterOffer`].

use common::operations::By;

use crate::domain::{offer, CounterOffer};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`CounterOffer`] by its [`offer::Id`].
pub type ById = DatabaseQuery<By<Option<CounterOffer>, offer::Id>>;
