//! Cross-service synchronization of counter-offers.
//!
//! The posting-facing side owns canonical counter-offers, while the
//! technician-facing side keeps mirrors of them. Either side notifies its
//! peer about changes after committing them locally. Delivery is
//! best-effort: the peer treats a repeated notification as success, so a
//! failed one may simply be retried by a later change or reconciliation.

#[cfg(test)]
pub(crate) mod mock;

pub mod http;

use common::Money;
use derive_more::{Display, Error as StdError, From};
use serde::Serialize;

use crate::domain::{offer, posting, technician};

pub use self::http::Http;

/// Peer service notification channel.
pub use common::Handler as Peer;

/// Notification about a pending counter-offer having lost its subject
/// posting, or having been taken back by its technician.
#[derive(Clone, Debug, Serialize)]
pub struct Withdrawal {
    /// ID of the posting the counter-offer was proposed upon.
    pub post_id: posting::Id,

    /// Email address of the technician having proposed the counter-offer.
    pub technician_email: technician::Email,
}

/// Notification about a dealer having responded to a counter-offer.
#[derive(Clone, Debug, Serialize)]
pub struct Resolution {
    /// ID of the posting the counter-offer was proposed upon.
    pub post_id: posting::Id,

    /// Email address of the technician having proposed the counter-offer.
    pub technician_email: technician::Email,

    /// Terminal status the counter-offer has settled into.
    pub status: offer::Status,

    /// [`DateTime`] of the dealer response.
    ///
    /// [`DateTime`]: common::DateTime
    #[serde(with = "common::datetime::serde::rfc3339::option")]
    pub responded_at: Option<offer::ResponseDateTime>,
}

/// Notification about a technician having proposed a counter-offer.
#[derive(Clone, Debug, Serialize)]
pub struct Submission {
    /// ID of the posting the counter-offer is proposed upon.
    pub post_id: posting::Id,

    /// Email address of the technician having proposed the counter-offer.
    pub technician_email: technician::Email,

    /// Compensation offered by the dealer at the proposal moment.
    pub original_amount: Money,

    /// Compensation requested by the technician instead.
    pub requested_amount: Money,

    /// Reasoning of the technician behind the proposal.
    pub reason: Option<offer::Reason>,

    /// [`DateTime`] when the counter-offer stops awaiting a dealer response.
    ///
    /// [`DateTime`]: common::DateTime
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub expires_at: offer::ExpirationDateTime,
}

/// Error of notifying the peer service.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// Failed to reach the peer service at all.
    #[display("HTTP request to the peer service failed: {_0}")]
    Http(reqwest::Error),

    /// Peer service responded with a non-success status.
    #[display("peer service responded with `{_0}` status")]
    Status(#[error(not(source))] reqwest::StatusCode),
}

#[cfg(test)]
mod spec {
    use crate::domain::{offer, posting, technician};

    use super::Resolution;

    #[test]
    fn resolution_serializes_status_as_screaming_snake_case() {
        let json = serde_json::to_value(Resolution {
            post_id: posting::Id::new(),
            technician_email: technician::Email::new("tech@example.com")
                .unwrap(),
            status: offer::Status::Rejected,
            responded_at: None,
        })
        .unwrap();

        assert_eq!(json["status"], "REJECTED");
        assert_eq!(json["technician_email"], "tech@example.com");
        assert!(json["responded_at"].is_null());
    }
}
