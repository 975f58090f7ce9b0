//! [`Command`] definition.

pub mod accept_counter_offer;
pub mod accept_posting;
pub mod create_posting;
pub mod decline_posting;
pub mod file_counter_offer;
pub mod reject_counter_offer;
pub mod settle_mirrored_offer;
pub mod submit_counter_offer;
pub mod update_posting_status;
pub mod withdraw_counter_offer;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    accept_counter_offer::AcceptCounterOffer, accept_posting::AcceptPosting,
    create_posting::CreatePosting, decline_posting::DeclinePosting,
    file_counter_offer::FileCounterOffer,
    reject_counter_offer::RejectCounterOffer,
    settle_mirrored_offer::SettleMirroredOffer,
    submit_counter_offer::SubmitCounterOffer,
    update_posting_status::UpdatePostingStatus,
    withdraw_counter_offer::WithdrawCounterOffer,
};
