//! [`Error`]-related definitions.

use std::fmt;

use axum::{response::IntoResponse, Json};
use derive_more::Error as StdError;
use serde::Serialize;
use service::{command, infra::database};
use tracerr::{Trace, Traced};

/// REST API [`Error`].
#[derive(Clone, Debug, StdError)]
pub struct Error {
    /// [`Error`] code.
    pub code: Code,

    /// [`http::StatusCode`] of this [`Error`].
    pub status_code: http::StatusCode,

    /// Backtrace of this [`Error`].
    #[error(not(backtrace))]
    pub backtrace: Option<Trace>,

    /// [`Error`] message.
    pub message: String,
}

impl Error {
    /// Create a new [`Error`] representing an internal server error.
    #[must_use]
    pub fn internal(msg: &impl ToString) -> Self {
        Self {
            code: "INTERNAL_SERVER_ERROR",
            status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            backtrace: None,
        }
    }

    /// Creates a new [`Error`] representing an invalid request input.
    #[must_use]
    pub fn bad_request(msg: &impl ToString) -> Self {
        Self {
            code: "BAD_REQUEST",
            status_code: http::StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            backtrace: None,
        }
    }

    /// Creates a new conflicting state [`Error`].
    #[must_use]
    pub fn conflict(code: Code, msg: &impl ToString) -> Self {
        Self {
            code,
            status_code: http::StatusCode::CONFLICT,
            message: msg.to_string(),
            backtrace: None,
        }
    }

    /// Creates a new missing entity [`Error`].
    #[must_use]
    pub fn not_found(code: Code, msg: &impl ToString) -> Self {
        Self {
            code,
            status_code: http::StatusCode::NOT_FOUND,
            message: msg.to_string(),
            backtrace: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            code,
            status_code: _,
            backtrace,
            message,
        } = self;

        write!(f, "[{code}]: {message}")?;
        if let Some(trace) = backtrace {
            write!(f, "\n{trace}")?;
        }
        Ok(())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        #[derive(Serialize)]
        struct Body {
            code: Code,
            message: String,
        }

        (
            self.status_code,
            Json(Body {
                code: self.code,
                message: self.message,
            }),
        )
            .into_response()
    }
}

/// [`Error`] code.
pub type Code = &'static str;

/// Helper trait for converting types into [`Error`]s.
pub trait AsError {
    /// Tries to convert the type into an [`Error`].
    ///
    /// [`None`] is returned if the type cannot be converted into an [`Error`].
    fn try_as_error(&self) -> Option<Error>;

    /// Converts the type into an [`Error`].
    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error()
            .unwrap_or_else(|| Error::internal(&self))
    }

    /// Converts the type into an [`Error`] by consuming it.
    fn into_error(self) -> Error
    where
        Self: fmt::Display + Sized,
    {
        self.as_error()
    }
}

impl<E: AsError> AsError for Traced<E> {
    fn try_as_error(&self) -> Option<Error> {
        let mut error = self.as_ref().try_as_error()?;
        error.backtrace = Some(self.trace().clone());
        Some(error)
    }
}

impl AsError for database::Error {
    fn try_as_error(&self) -> Option<Error> {
        None
    }
}

impl AsError for command::create_posting::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use command::create_posting::ExecutionError as E;

        match self {
            E::Db(_) => None,
        }
    }
}

impl AsError for command::accept_posting::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use command::accept_posting::ExecutionError as E;

        match self {
            E::AlreadyAccepted(_) => {
                Some(Error::conflict("POSTING_ALREADY_ACCEPTED", &self))
            }
            E::NotAcceptable { .. } => {
                Some(Error::conflict("POSTING_NOT_ACCEPTABLE", &self))
            }
            E::PostingNotFound(_) => {
                Some(Error::not_found("POSTING_NOT_FOUND", &self))
            }
            E::Db(_) => None,
        }
    }
}

impl AsError for command::decline_posting::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use command::decline_posting::ExecutionError as E;

        match self {
            E::PostingNotFound(_) => {
                Some(Error::not_found("POSTING_NOT_FOUND", &self))
            }
            E::Db(_) => None,
        }
    }
}

impl AsError for command::submit_counter_offer::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use command::submit_counter_offer::ExecutionError as E;

        match self {
            E::AlreadyAccepted(_) => {
                Some(Error::conflict("POSTING_ALREADY_ACCEPTED", &self))
            }
            E::CurrencyMismatch { .. } => Some(Error::bad_request(&self)),
            E::DuplicatePending { .. } => {
                Some(Error::conflict("COUNTER_OFFER_ALREADY_PENDING", &self))
            }
            E::NotPending { .. } => {
                Some(Error::conflict("POSTING_NOT_PENDING", &self))
            }
            E::PostingNotFound(_) => {
                Some(Error::not_found("POSTING_NOT_FOUND", &self))
            }
            E::Db(_) => None,
        }
    }
}

impl AsError for command::accept_counter_offer::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use command::accept_counter_offer::ExecutionError as E;

        match self {
            E::AlreadyAccepted(_) => {
                Some(Error::conflict("POSTING_ALREADY_ACCEPTED", &self))
            }
            E::OfferExpired(_) => {
                Some(Error::conflict("COUNTER_OFFER_EXPIRED", &self))
            }
            E::OfferNotFound(_) => {
                Some(Error::not_found("COUNTER_OFFER_NOT_FOUND", &self))
            }
            E::OfferNotPending { .. } => {
                Some(Error::conflict("COUNTER_OFFER_NOT_PENDING", &self))
            }
            E::PostingNotFound(_) => {
                Some(Error::not_found("POSTING_NOT_FOUND", &self))
            }
            E::Db(_) => None,
        }
    }
}

impl AsError for command::reject_counter_offer::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use command::reject_counter_offer::ExecutionError as E;

        match self {
            E::OfferExpired(_) => {
                Some(Error::conflict("COUNTER_OFFER_EXPIRED", &self))
            }
            E::OfferNotFound(_) => {
                Some(Error::not_found("COUNTER_OFFER_NOT_FOUND", &self))
            }
            E::OfferNotPending { .. } => {
                Some(Error::conflict("COUNTER_OFFER_NOT_PENDING", &self))
            }
            E::Db(_) => None,
        }
    }
}

impl AsError for command::withdraw_counter_offer::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use command::withdraw_counter_offer::ExecutionError as E;

        match self {
            E::Db(_) => None,
        }
    }
}

impl AsError for command::update_posting_status::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use command::update_posting_status::ExecutionError as E;

        match self {
            E::IllegalTransition { .. } => {
                Some(Error::conflict("POSTING_ILLEGAL_TRANSITION", &self))
            }
            E::PostingNotFound(_) => {
                Some(Error::not_found("POSTING_NOT_FOUND", &self))
            }
            E::Unassignable(_) => Some(Error::bad_request(&self)),
            E::Db(_) => None,
        }
    }
}

impl AsError for command::file_counter_offer::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use command::file_counter_offer::ExecutionError as E;

        match self {
            E::DuplicatePending { .. } => {
                Some(Error::conflict("COUNTER_OFFER_ALREADY_PENDING", &self))
            }
            E::Db(_) => None,
        }
    }
}

impl AsError for command::settle_mirrored_offer::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use command::settle_mirrored_offer::ExecutionError as E;

        match self {
            E::NotTerminal(_) => Some(Error::bad_request(&self)),
            E::Db(_) => None,
        }
    }
}
