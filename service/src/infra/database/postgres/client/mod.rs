//! Postgres clients: the pooled [`NonTx`] one, and a [`Tx`] one opening a
//! transaction lazily on top of it.

pub mod non_tx;
pub mod tx;

pub use self::{non_tx::NonTx, tx::Tx};
