//! Inbound peer synchronization endpoints of the REST API.
//!
//! The peer service notifies this one about counter-offer changes committed
//! on its side. Every handler here is idempotent: a repeated notification
//! finds nothing left to change and still responds with success, so the
//! peer may safely retry.

use axum::{Extension, Json};
use common::Money;
use http::StatusCode;
use serde::Deserialize;
use service::{
    command,
    domain::{offer, posting},
    query::Query as _,
};

use crate::error::{AsError as _, Error};

/// Notification about a technician having proposed a counter-offer on the
/// peer service.
#[derive(Clone, Debug, Deserialize)]
pub struct SubmissionRequest {
    /// ID of the posting the counter-offer is proposed upon.
    pub post_id: posting::Id,

    /// Email address of the technician having proposed the counter-offer.
    pub technician_email: String,

    /// Compensation offered by the dealer at the proposal moment, as the
    /// peer service knows it.
    pub original_amount: Money,

    /// Compensation requested by the technician instead.
    pub requested_amount: Money,

    /// Reasoning of the technician behind the proposal.
    pub reason: Option<String>,

    /// [RFC 3339] date and time when the counter-offer stops awaiting a
    /// dealer response, as the peer service computed it.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub expires_at: offer::ExpirationDateTime,
}

/// Registers a counter-offer proposed on the peer service.
pub async fn submission(
    Extension(service): Extension<crate::Service>,
    Json(req): Json<SubmissionRequest>,
) -> Result<StatusCode, Error> {
    use command::submit_counter_offer::ExecutionError as E;

    // The local posting is authoritative for the original amount, and the
    // expiration is recomputed from the local negotiation window.
    let SubmissionRequest {
        post_id,
        technician_email,
        original_amount: _,
        requested_amount,
        reason,
        expires_at: _,
    } = req;

    match service
        .execute(command::SubmitCounterOffer {
            post_id,
            technician_email: technician_email
                .parse()
                .map_err(|e| Error::bad_request(&e))?,
            requested_amount,
            reason: reason
                .map(|r| r.parse())
                .transpose()
                .map_err(|e| Error::bad_request(&e))?,
        })
        .await
    {
        Ok(_) => Ok(StatusCode::CREATED),
        Err(e) if matches!(e.as_ref(), E::DuplicatePending { .. }) => {
            Ok(StatusCode::OK)
        }
        Err(e) => Err(e.into_error()),
    }
}

/// Notification about a pending counter-offer having been withdrawn on the
/// peer service.
#[derive(Clone, Debug, Deserialize)]
pub struct WithdrawalRequest {
    /// ID of the posting the counter-offer was proposed upon.
    pub post_id: posting::Id,

    /// Email address of the technician having proposed the counter-offer.
    pub technician_email: String,
}

/// Withdraws the pending counter-offer of the provided technician upon the
/// provided posting, on whichever side of the negotiation this service
/// keeps it.
pub async fn withdrawal(
    Extension(service): Extension<crate::Service>,
    Json(req): Json<WithdrawalRequest>,
) -> Result<StatusCode, Error> {
    let WithdrawalRequest {
        post_id,
        technician_email,
    } = req;
    let technician_email: service::domain::technician::Email =
        technician_email.parse().map_err(|e| Error::bad_request(&e))?;

    // Both sides are tried: one of them keeps the row, and the other one is
    // a no-op. A second withdrawal of the same counter-offer finds nothing
    // pending, which terminates the notification bounce between the peers.
    _ = service
        .execute(command::WithdrawCounterOffer {
            post_id,
            technician_email: technician_email.clone(),
        })
        .await
        .map_err(|e| e.into_error())?;
    _ = service
        .execute(command::SettleMirroredOffer {
            post_id,
            technician_email,
            status: offer::Status::Withdrawn,
            responded_at: None,
        })
        .await
        .map_err(|e| e.into_error())?;

    Ok(StatusCode::OK)
}

/// Notification about a dealer having responded to a counter-offer on the
/// peer service.
#[derive(Clone, Debug, Deserialize)]
pub struct SettlementRequest {
    /// ID of the posting the counter-offer was proposed upon.
    pub post_id: posting::Id,

    /// Email address of the technician having proposed the counter-offer.
    pub technician_email: String,

    /// Terminal status the counter-offer has settled into.
    pub status: offer::Status,

    /// [RFC 3339] date and time of the dealer response.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[serde(default, with = "common::datetime::serde::rfc3339::option")]
    pub responded_at: Option<offer::ResponseDateTime>,
}

/// Settles the mirrored counter-offer of the provided technician upon the
/// provided posting into a terminal status.
pub async fn settlement(
    Extension(service): Extension<crate::Service>,
    Json(req): Json<SettlementRequest>,
) -> Result<StatusCode, Error> {
    let SettlementRequest {
        post_id,
        technician_email,
        status,
        responded_at,
    } = req;

    _ = service
        .execute(command::SettleMirroredOffer {
            post_id,
            technician_email: technician_email
                .parse()
                .map_err(|e| Error::bad_request(&e))?,
            status,
            responded_at,
        })
        .await
        .map_err(|e| e.into_error())?;

    Ok(StatusCode::OK)
}
