//! Technician-related definitions.

use std::{str::FromStr, sync::LazyLock};

use derive_more::{Display, Error};
use regex::Regex;
use serde::Serialize;

/// Email address of a technician.
#[derive(Clone, Debug, Display, Eq, Hash, PartialEq, Serialize)]
#[cfg_attr(
    feature = "postgres",
    derive(postgres_types::FromSql, postgres_types::ToSql),
    postgres(transparent)
)]
pub struct Email(String);

impl Email {
    /// Creates a new [`Email`] out of the provided value, if it represents a
    /// correct email address.
    ///
    /// # Errors
    ///
    /// If the provided value is not a correct email address.
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidEmailError> {
        let value = value.into();
        Self::check(&value)?;
        Ok(Self(value))
    }

    /// Creates a new [`Email`] out of the provided value without checking its
    /// correctness.
    ///
    /// # Safety
    ///
    /// The provided value must represent a correct email address.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Checks whether the provided value represents a correct [`Email`].
    ///
    /// # Errors
    ///
    /// If the provided value is not a correct email address.
    pub fn check(value: &str) -> Result<(), InvalidEmailError> {
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("correct regex")
        });

        (value.len() <= 320 && REGEX.is_match(value))
            .then_some(())
            .ok_or(InvalidEmailError)
    }

    /// Returns the string slice of this [`Email`].
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Email {
    type Err = InvalidEmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Error of an incorrect [`Email`] value.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("incorrect email address")]
pub struct InvalidEmailError;

/// Full name of a technician.
#[derive(Clone, Debug, Display, Eq, PartialEq, Serialize)]
#[cfg_attr(
    feature = "postgres",
    derive(postgres_types::FromSql, postgres_types::ToSql),
    postgres(transparent)
)]
pub struct Name(String);

impl Name {
    /// Maximum length of a [`Name`], in characters.
    pub const MAX_LEN: usize = 256;

    /// Creates a new [`Name`] out of the provided value, if it meets the
    /// requirements.
    ///
    /// # Errors
    ///
    /// If the provided value is empty or too long.
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidNameError> {
        let value = value.into();
        Self::check(&value)?;
        Ok(Self(value))
    }

    /// Creates a new [`Name`] out of the provided value without checking its
    /// correctness.
    ///
    /// # Safety
    ///
    /// The provided value must represent a correct [`Name`].
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Checks whether the provided value represents a correct [`Name`].
    ///
    /// # Errors
    ///
    /// If the provided value is empty or too long.
    pub fn check(value: &str) -> Result<(), InvalidNameError> {
        (!value.trim().is_empty() && value.chars().count() <= Self::MAX_LEN)
            .then_some(())
            .ok_or(InvalidNameError)
    }

    /// Returns the string slice of this [`Name`].
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Name {
    type Err = InvalidNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Error of an incorrect [`Name`] value.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("incorrect technician name")]
pub struct InvalidNameError;

#[cfg(test)]
mod spec {
    use super::Email;

    #[test]
    fn accepts_correct_emails() {
        for input in ["tech@example.com", "a.b+c@shop.co.uk"] {
            assert!(Email::check(input).is_ok(), "rejected: {input}");
        }
    }

    #[test]
    fn rejects_incorrect_emails() {
        for input in ["", "no-at-sign", "two@@example.com ", "a@b", "a @b.c"] {
            assert!(Email::check(input).is_err(), "accepted: {input}");
        }
    }
}
