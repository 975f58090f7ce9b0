//! [`Command`] for rejecting a [`CounterOffer`] by the dealer.

use common::{
    operations::{
        By, Commit, Insert, Lock, Notify, Select, Transact, Transacted, Update,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{audit, offer, CounterOffer, DealerAction},
    infra::{database, sync, Database},
    read::offer::Pending,
    Service,
};

use super::Command;

/// [`Command`] for rejecting a [`CounterOffer`] by the dealer.
///
/// Rejecting settles the [`CounterOffer`] only, the [`Posting`] stays open
/// and the technician may propose a new one.
///
/// [`Posting`]: crate::domain::Posting
#[derive(Clone, Debug)]
pub struct RejectCounterOffer {
    /// ID of the [`CounterOffer`] to reject.
    pub offer_id: offer::Id,

    /// Notes of the dealer along with the response.
    pub notes: Option<offer::Notes>,
}

impl<Db, P> Command<RejectCounterOffer> for Service<Db, P>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<CounterOffer>, offer::Id>>,
            Ok = Option<CounterOffer>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<CounterOffer, offer::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Update<Pending<CounterOffer>>,
            Ok = bool,
            Err = Traced<database::Error>,
        > + Database<Insert<DealerAction>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    P: sync::Peer<Notify<sync::Resolution>, Ok = (), Err = Traced<sync::Error>>,
{
    type Ok = CounterOffer;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: RejectCounterOffer,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RejectCounterOffer { offer_id, notes } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Select(By::<Option<CounterOffer>, _>::new(offer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OfferNotFound(offer_id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        // Avoid concurrent actions upon the same `CounterOffer`.
        tx.execute(Lock(By::<CounterOffer, _>::new(offer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        // Re-read after locking, the sweeper could have settled it.
        let mut offer = tx
            .execute(Select(By::<Option<CounterOffer>, _>::new(offer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OfferNotFound(offer_id))
            .map_err(tracerr::wrap!())?;
        match offer.effective_status() {
            offer::Status::Pending => {}
            offer::Status::Expired => {
                return Err(tracerr::new!(E::OfferExpired(offer_id)));
            }
            s @ (offer::Status::Accepted
            | offer::Status::Rejected
            | offer::Status::Withdrawn) => {
                return Err(tracerr::new!(E::OfferNotPending {
                    id: offer_id,
                    status: s,
                }));
            }
        }

        let now = DateTime::now();
        offer.status = offer::Status::Rejected;
        offer.responded_at = Some(now.coerce());
        offer.dealer_notes = notes.clone();
        let done = tx
            .execute(Update(Pending(offer.clone())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !done {
            return Err(tracerr::new!(E::OfferExpired(offer_id)));
        }

        tx.execute(Insert(DealerAction {
            id: audit::Id::new(),
            offer_id,
            kind: audit::Kind::Reject,
            notes,
            created_at: now.coerce(),
        }))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        if let Err(e) = self
            .peer()
            .execute(Notify(sync::Resolution {
                post_id: offer.post_id,
                technician_email: offer.technician_email.clone(),
                status: offer::Status::Rejected,
                responded_at: offer.responded_at,
            }))
            .await
        {
            log::warn!(
                "failed to notify peer about a counter-offer rejection of \
                 `Technician(email: {})` upon `Posting(id: {})`: {e}",
                offer.technician_email,
                offer.post_id,
            );
        }

        Ok(offer)
    }
}

/// Error of [`RejectCounterOffer`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`CounterOffer`] has expired without a dealer response.
    #[display("`CounterOffer(id: {_0})` has expired")]
    OfferExpired(#[error(not(source))] offer::Id),

    /// [`CounterOffer`] with the provided ID does not exist.
    #[display("`CounterOffer(id: {_0})` does not exist")]
    OfferNotFound(#[error(not(source))] offer::Id),

    /// [`CounterOffer`] is not pending anymore.
    #[display("`CounterOffer(id: {id})` is not pending in `{status}` status")]
    OfferNotPending {
        /// ID of the [`CounterOffer`].
        id: offer::Id,

        /// Current [`offer::Status`] of the [`CounterOffer`].
        status: offer::Status,
    },
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{operations::Insert, DateTime, Money};

    use crate::{
        domain::{audit, offer, posting, technician, CounterOffer},
        infra::{database::mock::Mock, sync, Database as _},
        task, Command as _, Config, Service,
    };

    use super::{ExecutionError, RejectCounterOffer};

    fn config() -> Config {
        Config {
            negotiation_window: Duration::from_secs(24 * 60 * 60),
            expire_counter_offers: task::expire_counter_offers::Config {
                interval: Duration::from_secs(60),
            },
        }
    }

    fn counter_offer() -> CounterOffer {
        let now = DateTime::now();
        CounterOffer {
            id: offer::Id::new(),
            post_id: posting::Id::new(),
            technician_email: technician::Email::new("tech@example.com")
                .unwrap(),
            original_amount: "150USD".parse::<Money>().unwrap(),
            requested_amount: "220USD".parse::<Money>().unwrap(),
            reason: None,
            requested_at: now.coerce(),
            expires_at: now.coerce() + Duration::from_secs(3600),
            status: offer::Status::Pending,
            responded_at: None,
            dealer_notes: None,
        }
    }

    #[tokio::test]
    async fn settles_offer_and_notifies() {
        let db = Mock::new();
        let offer = counter_offer();
        db.execute(Insert(offer.clone())).await.unwrap();
        let peer = sync::mock::Mock::new();
        let service = Service::with_parts(config(), db.clone(), peer.clone());

        let rejected = service
            .execute(RejectCounterOffer {
                offer_id: offer.id,
                notes: Some(offer::Notes::new("Too pricey").unwrap()),
            })
            .await
            .unwrap();

        assert_eq!(rejected.status, offer::Status::Rejected);
        assert!(rejected.responded_at.is_some());
        assert_eq!(
            db.offer(offer.id).unwrap().status,
            offer::Status::Rejected,
        );
        assert_eq!(db.actions()[0].kind, audit::Kind::Reject);
        assert_eq!(
            peer.delivered(),
            vec![format!(
                "resolution {} tech@example.com REJECTED",
                offer.post_id,
            )],
        );
    }

    #[tokio::test]
    async fn expired_offer_is_reported() {
        let db = Mock::new();
        let mut offer = counter_offer();
        offer.expires_at =
            offer::ExpirationDateTime::now() - Duration::from_secs(1);
        db.execute(Insert(offer.clone())).await.unwrap();
        let service =
            Service::with_parts(config(), db.clone(), sync::mock::Mock::new());

        let err = service
            .execute(RejectCounterOffer {
                offer_id: offer.id,
                notes: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::OfferExpired(_)));
        assert!(db.actions().is_empty());
    }

    #[tokio::test]
    async fn repeated_rejection_is_reported() {
        let db = Mock::new();
        let offer = counter_offer();
        db.execute(Insert(offer.clone())).await.unwrap();
        let service =
            Service::with_parts(config(), db.clone(), sync::mock::Mock::new());

        service
            .execute(RejectCounterOffer {
                offer_id: offer.id,
                notes: None,
            })
            .await
            .unwrap();
        let err = service
            .execute(RejectCounterOffer {
                offer_id: offer.id,
                notes: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::OfferNotPending { .. },
        ));
    }
}
