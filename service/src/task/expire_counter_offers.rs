//! [`ExpireCounterOffers`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::operations::{By, Perform, Start, Update};
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        offer::{self, Mirror},
        CounterOffer,
    },
    infra::{database, Database},
    Service,
};

use super::Task;

/// Configuration for [`ExpireCounterOffers`] [`Task`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Interval between [`CounterOffer`] expiration sweeps.
    pub interval: time::Duration,
}

/// [`Task`] for marking overdue [`Status::Pending`] [`CounterOffer`]s (and
/// their [`Mirror`]s) as [`Status::Expired`].
///
/// Reads observe expiration implicitly via
/// [`CounterOffer::effective_status()`], so this [`Task`] only persists the
/// fact, making it visible to plain storage queries too.
///
/// [`Status::Expired`]: offer::Status::Expired
/// [`Status::Pending`]: offer::Status::Pending
#[derive(Clone, Copy, Debug)]
pub struct ExpireCounterOffers<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db, P> Task<Start<By<ExpireCounterOffers<Self>, Config>>>
    for Service<Db, P>
where
    ExpireCounterOffers<Service<Db, P>>:
        Task<Perform<()>, Ok = (), Err: Error> + Send + Sync + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<ExpireCounterOffers<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = ExpireCounterOffers {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            _ = task.execute(Perform(())).await.map_err(|e| {
                log::error!("`task::ExpireCounterOffers` failed: {e}");
            });
        }
    }
}

impl<Db, P> Task<Perform<()>> for ExpireCounterOffers<Service<Db, P>>
where
    Db: Database<
            Update<By<CounterOffer, offer::ExpirationDateTime>>,
            Ok = u64,
            Err = Traced<database::Error>,
        > + Database<
            Update<By<Mirror, offer::ExpirationDateTime>>,
            Ok = u64,
            Err = Traced<database::Error>,
        >,
{
    type Ok = ();
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let deadline = offer::ExpirationDateTime::now();

        let offers = self
            .service
            .database()
            .execute(Update(By::<CounterOffer, _>::new(deadline)))
            .await
            .map_err(tracerr::map_from_and_wrap!())?;
        let mirrors = self
            .service
            .database()
            .execute(Update(By::<Mirror, _>::new(deadline)))
            .await
            .map_err(tracerr::map_from_and_wrap!())?;

        if offers > 0 || mirrors > 0 {
            log::info!(
                "expired {offers} counter-offer(s) and {mirrors} mirror(s)",
            );
        }
        Ok(())
    }
}

/// Error of [`ExpireCounterOffers`] execution.
pub type ExecutionError = Traced<database::Error>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{
        operations::{Insert, Perform},
        DateTime, Money,
    };

    use crate::{
        domain::{
            offer::{self, Mirror},
            posting, technician, CounterOffer,
        },
        infra::{database::mock::Mock, sync, Database as _},
        Config, Service, Task as _,
    };

    use super::ExpireCounterOffers;

    fn config() -> Config {
        Config {
            negotiation_window: Duration::from_secs(24 * 60 * 60),
            expire_counter_offers: super::Config {
                interval: Duration::from_secs(60),
            },
        }
    }

    fn counter_offer(expires_at: offer::ExpirationDateTime) -> CounterOffer {
        CounterOffer {
            id: offer::Id::new(),
            post_id: posting::Id::new(),
            technician_email: technician::Email::new("t@example.com").unwrap(),
            original_amount: "500USD".parse::<Money>().unwrap(),
            requested_amount: "650USD".parse::<Money>().unwrap(),
            reason: None,
            requested_at: DateTime::now().coerce(),
            expires_at,
            status: offer::Status::Pending,
            responded_at: None,
            dealer_notes: None,
        }
    }

    fn mirror(expires_at: offer::ExpirationDateTime) -> Mirror {
        let offer = counter_offer(expires_at);
        Mirror {
            id: offer.id,
            peer_id: None,
            post_id: offer.post_id,
            technician_email: offer.technician_email,
            original_amount: offer.original_amount,
            requested_amount: offer.requested_amount,
            reason: None,
            requested_at: offer.requested_at,
            expires_at: offer.expires_at,
            status: offer::Status::Pending,
            responded_at: None,
        }
    }

    #[tokio::test]
    async fn expires_overdue_offers_and_mirrors_only() {
        let db = Mock::new();
        let past = offer::ExpirationDateTime::now() - Duration::from_secs(1);
        let future =
            offer::ExpirationDateTime::now() + Duration::from_secs(3600);
        let overdue = counter_offer(past);
        let live = counter_offer(future);
        db.execute(Insert(overdue.clone())).await.unwrap();
        db.execute(Insert(live.clone())).await.unwrap();
        db.execute(Insert(mirror(past))).await.unwrap();

        let task = ExpireCounterOffers {
            config: config().expire_counter_offers,
            service: Service::with_parts(
                config(),
                db.clone(),
                sync::mock::Mock::new(),
            ),
        };
        task.execute(Perform(())).await.unwrap();

        assert_eq!(
            db.offer(overdue.id).unwrap().status,
            offer::Status::Expired,
        );
        assert_eq!(db.offer(live.id).unwrap().status, offer::Status::Pending);
        assert_eq!(db.mirrors()[0].status, offer::Status::Expired);
    }

    #[tokio::test]
    async fn repeated_sweep_is_a_no_op() {
        let db = Mock::new();
        let overdue = counter_offer(
            offer::ExpirationDateTime::now() - Duration::from_secs(1),
        );
        db.execute(Insert(overdue.clone())).await.unwrap();

        let task = ExpireCounterOffers {
            config: config().expire_counter_offers,
            service: Service::with_parts(
                config(),
                db.clone(),
                sync::mock::Mock::new(),
            ),
        };
        task.execute(Perform(())).await.unwrap();
        task.execute(Perform(())).await.unwrap();

        assert_eq!(
            db.offer(overdue.id).unwrap().status,
            offer::Status::Expired,
        );
    }
}
