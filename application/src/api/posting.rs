//! Posting endpoints of the REST API.

use axum::{
    extract::{Path, Query as Params},
    Extension, Json,
};
use common::Money;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use service::{
    command,
    domain::{self, dealer, posting, technician},
    query,
    query::Query as _,
    read,
};

use crate::error::{AsError as _, Error};

/// Representation of a [`Posting`] served by the REST API.
///
/// [`Posting`]: domain::Posting
#[derive(Clone, Debug, Serialize)]
pub struct Posting {
    /// Unique ID of the posting.
    pub id: posting::Id,

    /// Email address of the dealer having published the posting.
    pub dealer_email: dealer::Email,

    /// Description of the inspection job.
    pub description: posting::Description,

    /// Location of the vehicle to be inspected.
    pub location: posting::Location,

    /// Compensation offered by the dealer for the job.
    pub offer_amount: Money,

    /// VIN of the vehicle to be inspected, if known.
    pub vin: Option<posting::Vin>,

    /// Auction lot number of the vehicle, if any.
    pub lot_number: Option<posting::LotNumber>,

    /// Status of the posting.
    pub status: posting::Status,

    /// Email address of the technician the posting is bound to.
    pub technician_email: Option<technician::Email>,

    /// Full name of the technician the posting is bound to.
    pub technician_name: Option<technician::Name>,

    /// [RFC 3339] date and time when the posting was published.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub created_at: posting::CreationDateTime,

    /// [RFC 3339] date and time when the posting was modified last time.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub updated_at: posting::ModificationDateTime,

    /// [RFC 3339] date and time when the posting was bound to a technician.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[serde(with = "common::datetime::serde::rfc3339::option")]
    pub accepted_at: Option<posting::AcceptanceDateTime>,

    /// [RFC 3339] date and time when the inspection job is expected to be
    /// done.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[serde(with = "common::datetime::serde::rfc3339::option")]
    pub expected_completion_at: Option<posting::CompletionDateTime>,
}

impl From<domain::Posting> for Posting {
    fn from(value: domain::Posting) -> Self {
        let domain::Posting {
            id,
            dealer_email,
            description,
            location,
            offer_amount,
            vin,
            lot_number,
            status,
            technician_email,
            technician_name,
            created_at,
            updated_at,
            accepted_at,
            expected_completion_at,
        } = value;

        Self {
            id,
            dealer_email,
            description,
            location,
            offer_amount,
            vin,
            lot_number,
            status,
            technician_email,
            technician_name,
            created_at,
            updated_at,
            accepted_at,
            expected_completion_at,
        }
    }
}

/// Request of publishing a new [`Posting`].
#[derive(Clone, Debug, Deserialize)]
pub struct CreateRequest {
    /// Email address of the dealer publishing the posting.
    pub dealer_email: String,

    /// Description of the inspection job.
    pub description: String,

    /// Location of the vehicle to be inspected.
    pub location: String,

    /// Compensation offered by the dealer for the job.
    pub offer_amount: Money,

    /// VIN of the vehicle to be inspected, if known.
    pub vin: Option<String>,

    /// Auction lot number of the vehicle, if any.
    pub lot_number: Option<String>,

    /// [RFC 3339] date and time when the inspection job is expected to be
    /// done.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[serde(default, with = "common::datetime::serde::rfc3339::option")]
    pub expected_completion_at: Option<posting::CompletionDateTime>,
}

/// Publishes a new [`Posting`].
pub async fn create(
    Extension(service): Extension<crate::Service>,
    Json(req): Json<CreateRequest>,
) -> Result<(StatusCode, Json<Posting>), Error> {
    let CreateRequest {
        dealer_email,
        description,
        location,
        offer_amount,
        vin,
        lot_number,
        expected_completion_at,
    } = req;

    let posting = service
        .execute(command::CreatePosting {
            dealer_email: dealer_email
                .parse()
                .map_err(|e| Error::bad_request(&e))?,
            description: description
                .parse()
                .map_err(|e| Error::bad_request(&e))?,
            location: location.parse().map_err(|e| Error::bad_request(&e))?,
            offer_amount,
            vin: vin
                .map(|v| v.parse())
                .transpose()
                .map_err(|e| Error::bad_request(&e))?,
            lot_number: lot_number
                .map(|v| v.parse())
                .transpose()
                .map_err(|e| Error::bad_request(&e))?,
            expected_completion_at,
        })
        .await
        .map_err(|e| e.into_error())?;

    Ok((StatusCode::CREATED, Json(posting.into())))
}

/// Parameters of the [`feed()`] endpoint.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct FeedParams {
    /// Maximum number of [`Posting`]s to return.
    #[serde(default = "FeedParams::default_limit")]
    pub limit: read::posting::Limit,
}

impl FeedParams {
    /// Default [`Posting`]s number limit.
    fn default_limit() -> read::posting::Limit {
        50
    }
}

/// Returns the feed of open [`Posting`]s awaiting a technician, newest
/// first.
pub async fn feed(
    Extension(service): Extension<crate::Service>,
    Params(params): Params<FeedParams>,
) -> Result<Json<Vec<Posting>>, Error> {
    let feed = service
        .execute(query::postings::Feed::by(params.limit))
        .await
        .map_err(|e| e.into_error())?;

    Ok(Json(feed.0.into_iter().map(Into::into).collect()))
}

/// Returns the [`Posting`] with the provided ID.
pub async fn by_id(
    Extension(service): Extension<crate::Service>,
    Path(id): Path<String>,
) -> Result<Json<Posting>, Error> {
    let id: posting::Id = id.parse().map_err(|e| Error::bad_request(&e))?;

    service
        .execute(query::posting::ById::by(id))
        .await
        .map_err(|e| e.into_error())?
        .filter(|p| p.status != posting::Status::Deleted)
        .map(|p| Json(p.into()))
        .ok_or_else(|| {
            Error::not_found(
                "POSTING_NOT_FOUND",
                &format!("posting `{id}` does not exist"),
            )
        })
}

/// Request of accepting a [`Posting`].
#[derive(Clone, Debug, Deserialize)]
pub struct AcceptRequest {
    /// Email address of the accepting technician.
    pub technician_email: String,

    /// Full name of the accepting technician.
    pub technician_name: String,
}

/// Accepts the [`Posting`] with the provided ID on behalf of a technician,
/// returning the resulting [`Acceptance`].
pub async fn accept(
    Extension(service): Extension<crate::Service>,
    Path(id): Path<String>,
    Json(req): Json<AcceptRequest>,
) -> Result<Json<Acceptance>, Error> {
    let AcceptRequest {
        technician_email,
        technician_name,
    } = req;

    let acceptance = service
        .execute(command::AcceptPosting {
            post_id: id.parse().map_err(|e| Error::bad_request(&e))?,
            technician_email: technician_email
                .parse()
                .map_err(|e| Error::bad_request(&e))?,
            technician_name: technician_name
                .parse()
                .map_err(|e| Error::bad_request(&e))?,
        })
        .await
        .map_err(|e| e.into_error())?;

    Ok(Json(acceptance.into()))
}

/// Binding of a [`Posting`] to a technician, served by the REST API.
#[derive(Clone, Debug, Serialize)]
pub struct Acceptance {
    /// ID of the bound posting.
    pub post_id: posting::Id,

    /// Email address of the technician having won the posting.
    pub technician_email: technician::Email,

    /// Compensation the job is bound at.
    pub offer_amount: Money,

    /// [RFC 3339] date and time when the binding happened.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub accepted_at: posting::AcceptanceDateTime,
}

impl From<domain::Acceptance> for Acceptance {
    fn from(value: domain::Acceptance) -> Self {
        let domain::Acceptance {
            post_id,
            technician_email,
            offer_amount,
            accepted_at,
        } = value;

        Self {
            post_id,
            technician_email,
            offer_amount,
            accepted_at,
        }
    }
}

/// Returns the [`Acceptance`] of the [`Posting`] with the provided ID.
pub async fn acceptance(
    Extension(service): Extension<crate::Service>,
    Path(id): Path<String>,
) -> Result<Json<Acceptance>, Error> {
    let id: posting::Id = id.parse().map_err(|e| Error::bad_request(&e))?;

    service
        .execute(query::acceptance::ByPosting::by(id))
        .await
        .map_err(|e| e.into_error())?
        .map(|a| Json(a.into()))
        .ok_or_else(|| {
            Error::not_found(
                "ACCEPTANCE_NOT_FOUND",
                &format!("posting `{id}` is not bound to any technician"),
            )
        })
}

/// Request of declining a [`Posting`].
#[derive(Clone, Debug, Deserialize)]
pub struct DeclineRequest {
    /// Email address of the declining technician.
    pub technician_email: String,
}

/// Declines the [`Posting`] with the provided ID on behalf of a technician.
pub async fn decline(
    Extension(service): Extension<crate::Service>,
    Path(id): Path<String>,
    Json(req): Json<DeclineRequest>,
) -> Result<StatusCode, Error> {
    service
        .execute(command::DeclinePosting {
            post_id: id.parse().map_err(|e| Error::bad_request(&e))?,
            technician_email: req
                .technician_email
                .parse()
                .map_err(|e| Error::bad_request(&e))?,
        })
        .await
        .map_err(|e| e.into_error())?;

    Ok(StatusCode::OK)
}

/// Request of replacing a [`Posting`]'s status.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct StatusRequest {
    /// Status to be assigned.
    pub status: posting::Status,
}

/// Replaces the status of the [`Posting`] with the provided ID.
pub async fn update_status(
    Extension(service): Extension<crate::Service>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Posting>, Error> {
    let posting = service
        .execute(command::UpdatePostingStatus {
            post_id: id.parse().map_err(|e| Error::bad_request(&e))?,
            status: req.status,
        })
        .await
        .map_err(|e| e.into_error())?;

    Ok(Json(posting.into()))
}

#[cfg(test)]
mod spec {
    use common::DateTime;
    use service::domain::{self, posting, technician};

    use super::Acceptance;

    #[test]
    fn acceptance_converts_from_domain_binding() {
        let post_id = posting::Id::new();
        let acceptance = Acceptance::from(domain::Acceptance {
            post_id,
            technician_email: technician::Email::new("tech@example.com")
                .unwrap(),
            offer_amount: "150USD".parse().unwrap(),
            accepted_at: DateTime::now().coerce(),
        });

        assert_eq!(acceptance.post_id, post_id);

        let json = serde_json::to_value(&acceptance).unwrap();
        assert_eq!(json["technician_email"], "tech@example.com");
        assert!(json["accepted_at"].is_string());
    }
}
