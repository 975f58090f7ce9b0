//! Technician-side endpoints of the REST API.

use axum::{Extension, Json};
use common::Money;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use service::{
    command,
    domain::{offer, posting, technician},
    query::Query as _,
};

use crate::error::{AsError as _, Error};

/// Representation of a [`Mirror`]ed counter-offer served by the REST API.
///
/// [`Mirror`]: offer::Mirror
#[derive(Clone, Debug, Serialize)]
pub struct Mirror {
    /// Unique ID of the mirrored counter-offer.
    pub id: offer::Id,

    /// ID of the canonical counter-offer on the posting-facing service, once
    /// known.
    pub peer_id: Option<offer::Id>,

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

    /// [RFC 3339] date and time when the counter-offer was proposed.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub requested_at: offer::RequestDateTime,

    /// [RFC 3339] date and time when the counter-offer stops awaiting a
    /// dealer response.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub expires_at: offer::ExpirationDateTime,

    /// Effective status of the mirrored counter-offer.
    pub status: offer::Status,

    /// [RFC 3339] date and time when the dealer responded to the
    /// counter-offer.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[serde(with = "common::datetime::serde::rfc3339::option")]
    pub responded_at: Option<offer::ResponseDateTime>,
}

impl From<offer::Mirror> for Mirror {
    fn from(value: offer::Mirror) -> Self {
        let status = value.effective_status();
        let offer::Mirror {
            id,
            peer_id,
            post_id,
            technician_email,
            original_amount,
            requested_amount,
            reason,
            requested_at,
            expires_at,
            status: _,
            responded_at,
        } = value;

        Self {
            id,
            peer_id,
            post_id,
            technician_email,
            original_amount,
            requested_amount,
            reason,
            requested_at,
            expires_at,
            status,
            responded_at,
        }
    }
}

/// Request of filing a counter-offer on the technician side.
#[derive(Clone, Debug, Deserialize)]
pub struct FileRequest {
    /// ID of the posting the counter-offer is proposed upon.
    pub post_id: posting::Id,

    /// Email address of the proposing technician.
    pub technician_email: String,

    /// Compensation offered by the dealer at the proposal moment.
    pub original_amount: Money,

    /// Compensation requested by the technician instead.
    pub requested_amount: Money,

    /// Reasoning of the technician behind the proposal.
    pub reason: Option<String>,

    /// ID of the canonical counter-offer on the posting-facing service, if
    /// known already.
    #[serde(default)]
    pub peer_id: Option<offer::Id>,
}

/// Files a new counter-offer on the technician side, notifying the
/// posting-facing service about it.
pub async fn file(
    Extension(service): Extension<crate::Service>,
    Json(req): Json<FileRequest>,
) -> Result<(StatusCode, Json<Mirror>), Error> {
    let FileRequest {
        post_id,
        technician_email,
        original_amount,
        requested_amount,
        reason,
        peer_id,
    } = req;

    let mirror = service
        .execute(command::FileCounterOffer {
            post_id,
            technician_email: technician_email
                .parse()
                .map_err(|e| Error::bad_request(&e))?,
            original_amount,
            requested_amount,
            reason: reason
                .map(|r| r.parse())
                .transpose()
                .map_err(|e| Error::bad_request(&e))?,
            peer_id,
        })
        .await
        .map_err(|e| e.into_error())?;

    Ok((StatusCode::CREATED, Json(mirror.into())))
}
