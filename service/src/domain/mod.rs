//! Domain definitions.

pub mod acceptance;
pub mod audit;
pub mod dealer;
pub mod offer;
pub mod posting;
pub mod technician;

pub use self::{
    acceptance::{Acceptance, Decline},
    audit::DealerAction,
    offer::CounterOffer,
    posting::Posting,
};
