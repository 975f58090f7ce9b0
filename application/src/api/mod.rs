//! REST API of the marketplace.

pub mod counter_offer;
pub mod posting;
pub mod sync;
pub mod technician;

use axum::{
    routing::{get, post, put},
    Router,
};

/// Builds a [`Router`] serving the REST API.
///
/// The [`Service`] is expected to be provided as an [`Extension`] layer.
///
/// [`Extension`]: axum::Extension
/// [`Service`]: crate::Service
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route("/postings", post(posting::create).get(posting::feed))
        .route("/postings/{id}", get(posting::by_id))
        .route("/postings/{id}/accept", post(posting::accept))
        .route("/postings/{id}/acceptance", get(posting::acceptance))
        .route("/postings/{id}/decline", post(posting::decline))
        .route("/postings/{id}/status", post(posting::update_status))
        .route(
            "/postings/{id}/counter-offers",
            post(counter_offer::submit).get(counter_offer::for_posting),
        )
        .route("/counter-offers/{id}", get(counter_offer::by_id))
        .route("/counter-offers/{id}/accept", put(counter_offer::accept))
        .route("/counter-offers/{id}/reject", put(counter_offer::reject))
        .route("/counter-offers/submit", post(sync::submission))
        .route("/counter-offers/withdraw", post(sync::withdrawal))
        .route("/tech/counter-offers", post(technician::file))
        .route("/tech/counter-offers/settle", post(sync::settlement))
}
