//! Background [`Task`]s definitions.

mod background;
pub mod expire_counter_offers;

pub use common::Handler as Task;

pub use self::{
    background::Background, expire_counter_offers::ExpireCounterOffers,
};
