//! [`CounterOffer`]-related definitions.

pub mod mirror;

use std::str::FromStr;

use common::{define_kind, unit, DateTimeOf, Money};
use derive_more::{Display, Error, From};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{posting, technician};

pub use self::mirror::Mirror;

/// Price renegotiation proposed by a technician upon a [`Posting`].
///
/// [`Posting`]: super::Posting
#[derive(Clone, Debug)]
pub struct CounterOffer {
    /// Unique ID of this [`CounterOffer`].
    pub id: Id,

    /// ID of the [`Posting`] this [`CounterOffer`] is proposed upon.
    ///
    /// [`Posting`]: super::Posting
    pub post_id: posting::Id,

    /// Email address of the technician having proposed this [`CounterOffer`].
    pub technician_email: technician::Email,

    /// Compensation offered by the dealer at the proposal moment.
    pub original_amount: Money,

    /// Compensation requested by the technician instead.
    pub requested_amount: Money,

    /// Reasoning of the technician behind the proposal.
    pub reason: Option<Reason>,

    /// [`DateTime`] when this [`CounterOffer`] was proposed.
    ///
    /// [`DateTime`]: common::DateTime
    pub requested_at: RequestDateTime,

    /// [`DateTime`] when this [`CounterOffer`] stops awaiting a dealer
    /// response.
    ///
    /// [`DateTime`]: common::DateTime
    pub expires_at: ExpirationDateTime,

    /// Stored [`Status`] of this [`CounterOffer`].
    ///
    /// Prefer [`CounterOffer::effective_status()`] for presenting.
    pub status: Status,

    /// [`DateTime`] when the dealer responded to this [`CounterOffer`].
    ///
    /// [`DateTime`]: common::DateTime
    pub responded_at: Option<ResponseDateTime>,

    /// Notes left by the dealer along with the response.
    pub dealer_notes: Option<Notes>,
}

impl CounterOffer {
    /// Returns the effective [`Status`] of this [`CounterOffer`] at the
    /// present moment.
    ///
    /// A [`Status::Pending`] [`CounterOffer`] past its expiration
    /// [`DateTime`] is reported as [`Status::Expired`], whether the sweeping
    /// has stored that fact already or not.
    ///
    /// [`DateTime`]: common::DateTime
    #[must_use]
    pub fn effective_status(&self) -> Status {
        if self.status == Status::Pending
            && self.expires_at <= ExpirationDateTime::now()
        {
            Status::Expired
        } else {
            self.status
        }
    }
}

/// Unique ID of a [`CounterOffer`].
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
    #[doc = "Status of a [`CounterOffer`]."]
    enum Status {
        #[doc = "[`CounterOffer`] awaits a dealer response."]
        Pending = 1,

        #[doc = "[`CounterOffer`] is accepted by the dealer."]
        Accepted = 2,

        #[doc = "[`CounterOffer`] is rejected by the dealer."]
        Rejected = 3,

        #[doc = "[`CounterOffer`] is withdrawn by its technician, or lost \
                 its subject [`Posting`](super::Posting)."]
        Withdrawn = 4,

        #[doc = "[`CounterOffer`] received no dealer response in time."]
        Expired = 5,
    }
}

impl Status {
    /// Indicates whether this [`Status`] is terminal.
    ///
    /// A terminal [`Status`] never changes again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self != Self::Pending
    }
}

/// Reasoning of a technician behind a [`CounterOffer`].
#[derive(Clone, Debug, Display, Eq, PartialEq, Serialize)]
#[cfg_attr(
    feature = "postgres",
    derive(postgres_types::FromSql, postgres_types::ToSql),
    postgres(transparent)
)]
pub struct Reason(String);

impl Reason {
    /// Maximum length of a [`Reason`], in characters.
    pub const MAX_LEN: usize = 1024;

    /// Creates a new [`Reason`] out of the provided value, if it meets the
    /// requirements.
    ///
    /// # Errors
    ///
    /// If the provided value is empty or too long.
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidReasonError> {
        let value = value.into();
        Self::check(&value)?;
        Ok(Self(value))
    }

    /// Creates a new [`Reason`] out of the provided value without checking
    /// its correctness.
    ///
    /// # Safety
    ///
    /// The provided value must represent a correct [`Reason`].
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Checks whether the provided value represents a correct [`Reason`].
    ///
    /// # Errors
    ///
    /// If the provided value is empty or too long.
    pub fn check(value: &str) -> Result<(), InvalidReasonError> {
        (!value.trim().is_empty() && value.chars().count() <= Self::MAX_LEN)
            .then_some(())
            .ok_or(InvalidReasonError)
    }

    /// Returns the string slice of this [`Reason`].
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Reason {
    type Err = InvalidReasonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Error of an incorrect [`Reason`] value.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("incorrect counter-offer reason")]
pub struct InvalidReasonError;

/// Notes of a dealer along with a [`CounterOffer`] response.
#[derive(Clone, Debug, Display, Eq, PartialEq, Serialize)]
#[cfg_attr(
    feature = "postgres",
    derive(postgres_types::FromSql, postgres_types::ToSql),
    postgres(transparent)
)]
pub struct Notes(String);

impl Notes {
    /// Maximum length of [`Notes`], in characters.
    pub const MAX_LEN: usize = 1024;

    /// Creates new [`Notes`] out of the provided value, if it meets the
    /// requirements.
    ///
    /// # Errors
    ///
    /// If the provided value is empty or too long.
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidNotesError> {
        let value = value.into();
        Self::check(&value)?;
        Ok(Self(value))
    }

    /// Creates new [`Notes`] out of the provided value without checking its
    /// correctness.
    ///
    /// # Safety
    ///
    /// The provided value must represent correct [`Notes`].
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Checks whether the provided value represents correct [`Notes`].
    ///
    /// # Errors
    ///
    /// If the provided value is empty or too long.
    pub fn check(value: &str) -> Result<(), InvalidNotesError> {
        (!value.trim().is_empty() && value.chars().count() <= Self::MAX_LEN)
            .then_some(())
            .ok_or(InvalidNotesError)
    }

    /// Returns the string slice of these [`Notes`].
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Notes {
    type Err = InvalidNotesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Error of incorrect [`Notes`] value.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("incorrect dealer notes")]
pub struct InvalidNotesError;

/// [`DateTime`] of a [`CounterOffer`] proposal.
///
/// [`DateTime`]: common::DateTime
pub type RequestDateTime = DateTimeOf<(CounterOffer, unit::Request)>;

/// [`DateTime`] when a [`CounterOffer`] stops awaiting a dealer response.
///
/// [`DateTime`]: common::DateTime
pub type ExpirationDateTime = DateTimeOf<(CounterOffer, unit::Expiration)>;

/// [`DateTime`] of a dealer response to a [`CounterOffer`].
///
/// [`DateTime`]: common::DateTime
pub type ResponseDateTime = DateTimeOf<(CounterOffer, unit::Response)>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{DateTime, Money};

    use crate::domain::{posting, technician};

    use super::{CounterOffer, ExpirationDateTime, Id, Status};

    fn counter_offer(expires_at: ExpirationDateTime) -> CounterOffer {
        CounterOffer {
            id: Id::new(),
            post_id: posting::Id::new(),
            technician_email: technician::Email::new("t@example.com")
                .unwrap(),
            original_amount: "500USD".parse::<Money>().unwrap(),
            requested_amount: "650USD".parse::<Money>().unwrap(),
            reason: None,
            requested_at: DateTime::now().coerce(),
            expires_at,
            status: Status::Pending,
            responded_at: None,
            dealer_notes: None,
        }
    }

    #[test]
    fn pending_within_window_stays_pending() {
        let offer = counter_offer(
            ExpirationDateTime::now() + Duration::from_secs(3600),
        );
        assert_eq!(offer.effective_status(), Status::Pending);
    }

    #[test]
    fn pending_past_expiration_reads_as_expired() {
        let offer = counter_offer(
            ExpirationDateTime::now() - Duration::from_secs(1),
        );
        assert_eq!(offer.status, Status::Pending);
        assert_eq!(offer.effective_status(), Status::Expired);
    }

    #[test]
    fn terminal_status_ignores_expiration() {
        let mut offer = counter_offer(
            ExpirationDateTime::now() - Duration::from_secs(1),
        );
        offer.status = Status::Rejected;
        assert_eq!(offer.effective_status(), Status::Rejected);
    }
}
