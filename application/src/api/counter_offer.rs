//! Counter-offer endpoints of the REST API.

use axum::{extract::Path, Extension, Json};
use common::Money;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use service::{
    command,
    domain::{offer, posting, technician},
    query,
    query::Query as _,
};

use crate::error::{AsError as _, Error};

/// Representation of a [`CounterOffer`] served by the REST API.
///
/// The reported status is the effective one: a pending counter-offer past
/// its expiration reads as expired even before the sweeper stores that.
///
/// [`CounterOffer`]: offer::CounterOffer
#[derive(Clone, Debug, Serialize)]
pub struct CounterOffer {
    /// Unique ID of the counter-offer.
    pub id: offer::Id,

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

    /// Effective status of the counter-offer.
    pub status: offer::Status,

    /// [RFC 3339] date and time when the dealer responded to the
    /// counter-offer.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[serde(with = "common::datetime::serde::rfc3339::option")]
    pub responded_at: Option<offer::ResponseDateTime>,

    /// Notes left by the dealer along with the response.
    pub dealer_notes: Option<offer::Notes>,
}

impl From<offer::CounterOffer> for CounterOffer {
    fn from(value: offer::CounterOffer) -> Self {
        let status = value.effective_status();
        let offer::CounterOffer {
            id,
            post_id,
            technician_email,
            original_amount,
            requested_amount,
            reason,
            requested_at,
            expires_at,
            status: _,
            responded_at,
            dealer_notes,
        } = value;

        Self {
            id,
            post_id,
            technician_email,
            original_amount,
            requested_amount,
            reason,
            requested_at,
            expires_at,
            status,
            responded_at,
            dealer_notes,
        }
    }
}

/// Request of proposing a [`CounterOffer`] upon a [`Posting`].
///
/// [`Posting`]: service::domain::Posting
#[derive(Clone, Debug, Deserialize)]
pub struct SubmitRequest {
    /// Email address of the proposing technician.
    pub technician_email: String,

    /// Compensation requested by the technician.
    pub requested_amount: Money,

    /// Reasoning of the technician behind the proposal.
    pub reason: Option<String>,
}

/// Proposes a new [`CounterOffer`] upon the [`Posting`] with the provided
/// ID.
///
/// [`Posting`]: service::domain::Posting
pub async fn submit(
    Extension(service): Extension<crate::Service>,
    Path(id): Path<String>,
    Json(req): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<CounterOffer>), Error> {
    let SubmitRequest {
        technician_email,
        requested_amount,
        reason,
    } = req;

    let offer = service
        .execute(command::SubmitCounterOffer {
            post_id: id.parse().map_err(|e| Error::bad_request(&e))?,
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
        .map_err(|e| e.into_error())?;

    Ok((StatusCode::CREATED, Json(offer.into())))
}

/// Returns all the [`CounterOffer`]s proposed upon the [`Posting`] with the
/// provided ID.
///
/// [`Posting`]: service::domain::Posting
pub async fn for_posting(
    Extension(service): Extension<crate::Service>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CounterOffer>>, Error> {
    let id: posting::Id = id.parse().map_err(|e| Error::bad_request(&e))?;

    let offers = service
        .execute(query::counter_offers::ForPosting::by(id))
        .await
        .map_err(|e| e.into_error())?;

    Ok(Json(offers.into_iter().map(Into::into).collect()))
}

/// Returns the [`CounterOffer`] with the provided ID.
pub async fn by_id(
    Extension(service): Extension<crate::Service>,
    Path(id): Path<String>,
) -> Result<Json<CounterOffer>, Error> {
    let id: offer::Id = id.parse().map_err(|e| Error::bad_request(&e))?;

    service
        .execute(query::counter_offer::ById::by(id))
        .await
        .map_err(|e| e.into_error())?
        .map(|o| Json(o.into()))
        .ok_or_else(|| {
            Error::not_found(
                "COUNTER_OFFER_NOT_FOUND",
                &format!("counter-offer `{id}` does not exist"),
            )
        })
}

/// Request of responding to a [`CounterOffer`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RespondRequest {
    /// Notes of the dealer along with the response.
    pub notes: Option<String>,
}

/// Accepts the [`CounterOffer`] with the provided ID on behalf of the
/// dealer, rebinding its [`Posting`] at the requested amount.
///
/// [`Posting`]: service::domain::Posting
pub async fn accept(
    Extension(service): Extension<crate::Service>,
    Path(id): Path<String>,
    Json(req): Json<RespondRequest>,
) -> Result<Json<CounterOffer>, Error> {
    let offer = service
        .execute(command::AcceptCounterOffer {
            offer_id: id.parse().map_err(|e| Error::bad_request(&e))?,
            notes: req
                .notes
                .map(|n| n.parse())
                .transpose()
                .map_err(|e| Error::bad_request(&e))?,
        })
        .await
        .map_err(|e| e.into_error())?;

    Ok(Json(offer.into()))
}

/// Rejects the [`CounterOffer`] with the provided ID on behalf of the
/// dealer.
pub async fn reject(
    Extension(service): Extension<crate::Service>,
    Path(id): Path<String>,
    Json(req): Json<RespondRequest>,
) -> Result<Json<CounterOffer>, Error> {
    let offer = service
        .execute(command::RejectCounterOffer {
            offer_id: id.parse().map_err(|e| Error::bad_request(&e))?,
            notes: req
                .notes
                .map(|n| n.parse())
                .transpose()
                .map_err(|e| Error::bad_request(&e))?,
        })
        .await
        .map_err(|e| e.into_error())?;

    Ok(Json(offer.into()))
}
