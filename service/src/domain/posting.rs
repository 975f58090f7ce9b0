//! [`Posting`]-related definitions.

use std::{str::FromStr, sync::LazyLock};

use common::{define_kind, unit, DateTimeOf, Money};
use derive_more::{Display, Error, From};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{dealer, technician};

/// Vehicle inspection job published by a dealer on the marketplace.
#[derive(Clone, Debug)]
pub struct Posting {
    /// Unique ID of this [`Posting`].
    pub id: Id,

    /// Email address of the dealer having published this [`Posting`].
    pub dealer_email: dealer::Email,

    /// Description of the inspection job.
    pub description: Description,

    /// Location of the vehicle to be inspected.
    pub location: Location,

    /// Compensation offered by the dealer for the job.
    pub offer_amount: Money,

    /// VIN of the vehicle to be inspected, if known.
    pub vin: Option<Vin>,

    /// Auction lot number of the vehicle, if any.
    pub lot_number: Option<LotNumber>,

    /// [`Status`] of this [`Posting`].
    pub status: Status,

    /// Email address of the technician this [`Posting`] is bound to.
    ///
    /// Set if and only if the [`Status`] is [`Status::Accepted`],
    /// [`Status::InProgress`] or [`Status::Completed`].
    pub technician_email: Option<technician::Email>,

    /// Full name of the technician this [`Posting`] is bound to.
    pub technician_name: Option<technician::Name>,

    /// [`DateTime`] when this [`Posting`] was published.
    ///
    /// [`DateTime`]: common::DateTime
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Posting`] was modified last time.
    ///
    /// [`DateTime`]: common::DateTime
    pub updated_at: ModificationDateTime,

    /// [`DateTime`] when this [`Posting`] was bound to a technician.
    ///
    /// [`DateTime`]: common::DateTime
    pub accepted_at: Option<AcceptanceDateTime>,

    /// [`DateTime`] when the inspection job is expected to be done.
    ///
    /// [`DateTime`]: common::DateTime
    pub expected_completion_at: Option<CompletionDateTime>,
}

/// Unique ID of a [`Posting`].
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
    #[doc = "Status of a [`Posting`]."]
    enum Status {
        #[doc = "[`Posting`] is published and awaits a technician."]
        Pending = 1,

        #[doc = "[`Posting`] is bound to a technician."]
        Accepted = 2,

        #[doc = "Inspection job is being performed."]
        InProgress = 3,

        #[doc = "Inspection job is done."]
        Completed = 4,

        #[doc = "[`Posting`] is cancelled by its dealer."]
        Cancelled = 5,

        #[doc = "[`Posting`] is removed from the marketplace."]
        Deleted = 6,
    }
}

impl Status {
    /// Indicates whether this [`Status`] may be directly replaced with the
    /// `next` one.
    ///
    /// [`Status::Accepted`] is never assigned directly, binding to a
    /// technician happens via acceptance arbitration only.
    #[must_use]
    pub fn allows(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Cancelled | Self::Deleted)
                | (
                    Self::Accepted,
                    Self::InProgress | Self::Cancelled | Self::Deleted,
                )
                | (
                    Self::InProgress,
                    Self::Completed | Self::Cancelled | Self::Deleted,
                )
                | (Self::Completed | Self::Cancelled, Self::Deleted),
        )
    }
}

/// Description of a [`Posting`]'s inspection job.
#[derive(Clone, Debug, Display, Eq, PartialEq, Serialize)]
#[cfg_attr(
    feature = "postgres",
    derive(postgres_types::FromSql, postgres_types::ToSql),
    postgres(transparent)
)]
pub struct Description(String);

impl Description {
    /// Maximum length of a [`Description`], in characters.
    pub const MAX_LEN: usize = 4096;

    /// Creates a new [`Description`] out of the provided value, if it meets
    /// the requirements.
    ///
    /// # Errors
    ///
    /// If the provided value is empty or too long.
    pub fn new(
        value: impl Into<String>,
    ) -> Result<Self, InvalidDescriptionError> {
        let value = value.into();
        Self::check(&value)?;
        Ok(Self(value))
    }

    /// Creates a new [`Description`] out of the provided value without
    /// checking its correctness.
    ///
    /// # Safety
    ///
    /// The provided value must represent a correct [`Description`].
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Checks whether the provided value represents a correct
    /// [`Description`].
    ///
    /// # Errors
    ///
    /// If the provided value is empty or too long.
    pub fn check(value: &str) -> Result<(), InvalidDescriptionError> {
        (!value.trim().is_empty() && value.chars().count() <= Self::MAX_LEN)
            .then_some(())
            .ok_or(InvalidDescriptionError)
    }

    /// Returns the string slice of this [`Description`].
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Description {
    type Err = InvalidDescriptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Error of an incorrect [`Description`] value.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("incorrect posting description")]
pub struct InvalidDescriptionError;

/// Location of a [`Posting`]'s vehicle.
#[derive(Clone, Debug, Display, Eq, PartialEq, Serialize)]
#[cfg_attr(
    feature = "postgres",
    derive(postgres_types::FromSql, postgres_types::ToSql),
    postgres(transparent)
)]
pub struct Location(String);

impl Location {
    /// Maximum length of a [`Location`], in characters.
    pub const MAX_LEN: usize = 512;

    /// Creates a new [`Location`] out of the provided value, if it meets the
    /// requirements.
    ///
    /// # Errors
    ///
    /// If the provided value is empty or too long.
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidLocationError> {
        let value = value.into();
        Self::check(&value)?;
        Ok(Self(value))
    }

    /// Creates a new [`Location`] out of the provided value without checking
    /// its correctness.
    ///
    /// # Safety
    ///
    /// The provided value must represent a correct [`Location`].
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Checks whether the provided value represents a correct [`Location`].
    ///
    /// # Errors
    ///
    /// If the provided value is empty or too long.
    pub fn check(value: &str) -> Result<(), InvalidLocationError> {
        (!value.trim().is_empty() && value.chars().count() <= Self::MAX_LEN)
            .then_some(())
            .ok_or(InvalidLocationError)
    }

    /// Returns the string slice of this [`Location`].
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Location {
    type Err = InvalidLocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Error of an incorrect [`Location`] value.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("incorrect posting location")]
pub struct InvalidLocationError;

/// VIN (vehicle identification number) of a vehicle.
#[derive(Clone, Debug, Display, Eq, PartialEq, Serialize)]
#[cfg_attr(
    feature = "postgres",
    derive(postgres_types::FromSql, postgres_types::ToSql),
    postgres(transparent)
)]
pub struct Vin(String);

impl Vin {
    /// Creates a new [`Vin`] out of the provided value, if it represents a
    /// correct VIN.
    ///
    /// # Errors
    ///
    /// If the provided value is not a correct VIN.
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidVinError> {
        let value = value.into();
        Self::check(&value)?;
        Ok(Self(value))
    }

    /// Creates a new [`Vin`] out of the provided value without checking its
    /// correctness.
    ///
    /// # Safety
    ///
    /// The provided value must represent a correct VIN.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Checks whether the provided value represents a correct [`Vin`].
    ///
    /// 17 characters, with `I`, `O` and `Q` never occurring.
    ///
    /// # Errors
    ///
    /// If the provided value is not a correct VIN.
    pub fn check(value: &str) -> Result<(), InvalidVinError> {
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new("^[A-HJ-NPR-Z0-9]{17}$").expect("correct regex")
        });

        REGEX.is_match(value).then_some(()).ok_or(InvalidVinError)
    }

    /// Returns the string slice of this [`Vin`].
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Vin {
    type Err = InvalidVinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Error of an incorrect [`Vin`] value.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("incorrect VIN")]
pub struct InvalidVinError;

/// Auction lot number of a vehicle.
#[derive(Clone, Debug, Display, Eq, PartialEq, Serialize)]
#[cfg_attr(
    feature = "postgres",
    derive(postgres_types::FromSql, postgres_types::ToSql),
    postgres(transparent)
)]
pub struct LotNumber(String);

impl LotNumber {
    /// Maximum length of a [`LotNumber`], in characters.
    pub const MAX_LEN: usize = 64;

    /// Creates a new [`LotNumber`] out of the provided value, if it meets the
    /// requirements.
    ///
    /// # Errors
    ///
    /// If the provided value is empty or too long.
    pub fn new(
        value: impl Into<String>,
    ) -> Result<Self, InvalidLotNumberError> {
        let value = value.into();
        Self::check(&value)?;
        Ok(Self(value))
    }

    /// Creates a new [`LotNumber`] out of the provided value without checking
    /// its correctness.
    ///
    /// # Safety
    ///
    /// The provided value must represent a correct [`LotNumber`].
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Checks whether the provided value represents a correct [`LotNumber`].
    ///
    /// # Errors
    ///
    /// If the provided value is empty or too long.
    pub fn check(value: &str) -> Result<(), InvalidLotNumberError> {
        (!value.trim().is_empty() && value.chars().count() <= Self::MAX_LEN)
            .then_some(())
            .ok_or(InvalidLotNumberError)
    }

    /// Returns the string slice of this [`LotNumber`].
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for LotNumber {
    type Err = InvalidLotNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Error of an incorrect [`LotNumber`] value.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("incorrect lot number")]
pub struct InvalidLotNumberError;

/// [`DateTime`] of a [`Posting`] publishing.
///
/// [`DateTime`]: common::DateTime
pub type CreationDateTime = DateTimeOf<(Posting, unit::Creation)>;

/// [`DateTime`] of a [`Posting`] modification.
///
/// [`DateTime`]: common::DateTime
pub type ModificationDateTime = DateTimeOf<(Posting, unit::Modification)>;

/// [`DateTime`] of a [`Posting`] binding to a technician.
///
/// [`DateTime`]: common::DateTime
pub type AcceptanceDateTime = DateTimeOf<(Posting, unit::Acceptance)>;

/// [`DateTime`] of a [`Posting`]'s expected job completion.
///
/// [`DateTime`]: common::DateTime
pub type CompletionDateTime = DateTimeOf<(Posting, unit::Completion)>;

#[cfg(test)]
mod spec {
    use super::{Status, Vin};

    #[test]
    fn status_never_allows_direct_binding() {
        for from in [
            Status::Pending,
            Status::Accepted,
            Status::InProgress,
            Status::Completed,
            Status::Cancelled,
            Status::Deleted,
        ] {
            assert!(!from.allows(Status::Accepted), "allowed from `{from}`");
            assert!(!from.allows(Status::Pending), "allowed from `{from}`");
        }
    }

    #[test]
    fn status_follows_job_lifecycle() {
        assert!(Status::Accepted.allows(Status::InProgress));
        assert!(Status::InProgress.allows(Status::Completed));
        assert!(Status::Pending.allows(Status::Cancelled));
        assert!(Status::Completed.allows(Status::Deleted));

        assert!(!Status::Pending.allows(Status::InProgress));
        assert!(!Status::Pending.allows(Status::Completed));
        assert!(!Status::Completed.allows(Status::Cancelled));
        assert!(!Status::Deleted.allows(Status::Deleted));
    }

    #[test]
    fn vin_requires_17_valid_characters() {
        assert!(Vin::check("1HGCM82633A004352").is_ok());

        assert!(Vin::check("1HGCM82633A00435").is_err());
        assert!(Vin::check("1HGCM82633A0043521").is_err());
        assert!(Vin::check("1HGCM82633A00435I").is_err());
        assert!(Vin::check("1hgcm82633a004352").is_err());
    }
}
