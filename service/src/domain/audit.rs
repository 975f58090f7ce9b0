//! Audit trail definitions.

use std::str::FromStr;

use common::{define_kind, unit, DateTimeOf};
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::offer;

/// Recorded dealer response to a [`CounterOffer`].
///
/// [`CounterOffer`]: super::CounterOffer
#[derive(Clone, Debug)]
pub struct DealerAction {
    /// Unique ID of this [`DealerAction`].
    pub id: Id,

    /// ID of the [`CounterOffer`] responded to.
    ///
    /// [`CounterOffer`]: super::CounterOffer
    pub offer_id: offer::Id,

    /// [`Kind`] of the response.
    pub kind: Kind,

    /// Notes left by the dealer along with the response.
    pub notes: Option<offer::Notes>,

    /// [`DateTime`] when the response was recorded.
    ///
    /// [`DateTime`]: common::DateTime
    pub created_at: CreationDateTime,
}

/// Unique ID of a [`DealerAction`].
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    From,
    Hash,
    PartialEq,
    Serialize,
)]
#[cfg_attr(
    feature = "postgres",
    derive(postgres_types::FromSql, postgres_types::ToSql),
    postgres(transparent)
)]
pub struct Id(Uuid);

impl Id {
    /// Generates a new unique [`Id`].
    #[expect(clippy::new_without_default, reason = "not a default value")]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl FromStr for Id {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s).map(Self)
    }
}

define_kind! {
    #[doc = "Kind of a [`DealerAction`]."]
    enum Kind {
        #[doc = "Dealer accepted the counter-offer."]
        Accept = 1,

        #[doc = "Dealer rejected the counter-offer."]
        Reject = 2,
    }
}

/// [`DateTime`] of a [`DealerAction`] recording.
///
/// [`DateTime`]: common::DateTime
pub type CreationDateTime = DateTimeOf<(DealerAction, unit::Creation)>;
