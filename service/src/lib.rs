//! Service contains the business logic of the application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;
pub mod task;

use std::{error::Error, time};

use common::operations::{By, Start};
use rust_decimal as _;

#[cfg(doc)]
use infra::Database;

pub use self::{command::Command, query::Query, task::Task};

/// [`Service`] configuration.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Duration a proposed counter-offer awaits a dealer response before
    /// expiring.
    pub negotiation_window: time::Duration,

    /// [`task::ExpireCounterOffers`] configuration.
    pub expire_counter_offers: task::expire_counter_offers::Config,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db, P> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,

    /// Peer service notified about counter-offer changes.
    peer: P,
}

impl<Db, P> Service<Db, P> {
    /// Creates a new [`Service`] with the provided parameters.
    pub fn new(config: Config, database: Db, peer: P) -> (Self, task::Background)
    where
        Self: Task<
                Start<
                    By<
                        task::ExpireCounterOffers<Self>,
                        task::expire_counter_offers::Config,
                    >,
                >,
                Ok = (),
                Err: Error,
            > + Clone
            + 'static,
    {
        let this = Service {
            config,
            database,
            peer,
        };

        let mut bg = task::Background::default();
        let svc = this.clone();
        bg.spawn(async move {
            svc.execute(Start(By::new(svc.config().expire_counter_offers)))
                .await
        });

        (this, bg)
    }

    /// Returns [`Config`] of this [`Service`].
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns the peer notification channel of this [`Service`].
    #[must_use]
    pub fn peer(&self) -> &P {
        &self.peer
    }

    /// Creates a new [`Service`] without spawning its background tasks.
    #[cfg(test)]
    pub(crate) fn with_parts(config: Config, database: Db, peer: P) -> Self {
        Self {
            config,
            database,
            peer,
        }
    }
}
