//! [`Command`] for accepting a [`CounterOffer`] by the dealer.

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
    domain::{
        audit, offer, posting, Acceptance, CounterOffer, DealerAction,
        Posting,
    },
    infra::{database, sync, Database},
    read::offer::Pending,
    Service,
};

use super::Command;

/// [`Command`] for accepting a [`CounterOffer`] by the dealer.
///
/// Accepting binds the [`Posting`] to the proposing technician at the
/// requested amount, going through the same acceptance arbitration as
/// [`AcceptPosting`] does. Every other pending [`CounterOffer`] upon the
/// [`Posting`] is withdrawn.
///
/// [`AcceptPosting`]: super::AcceptPosting
#[derive(Clone, Debug)]
pub struct AcceptCounterOffer {
    /// ID of the [`CounterOffer`] to accept.
    pub offer_id: offer::Id,

    /// Notes of the dealer along with the response.
    pub notes: Option<offer::Notes>,
}

impl<Db, P> Command<AcceptCounterOffer> for Service<Db, P>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<CounterOffer>, offer::Id>>,
            Ok = Option<CounterOffer>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Posting, posting::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<CounterOffer, offer::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Posting>, posting::Id>>,
            Ok = Option<Posting>,
            Err = Traced<database::Error>,
        > + Database<Insert<Acceptance>, Err = Traced<database::Error>>
        + Database<Update<Posting>, Err = Traced<database::Error>>
        + Database<
            Update<Pending<CounterOffer>>,
            Ok = bool,
            Err = Traced<database::Error>,
        > + Database<Insert<DealerAction>, Err = Traced<database::Error>>
        + Database<
            Select<By<Vec<Pending<CounterOffer>>, posting::Id>>,
            Ok = Vec<Pending<CounterOffer>>,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
    P: sync::Peer<Notify<sync::Resolution>, Ok = (), Err = Traced<sync::Error>>
        + sync::Peer<
            Notify<sync::Withdrawal>,
            Ok = (),
            Err = Traced<sync::Error>,
        >,
{
    type Ok = CounterOffer;
    type Err = Traced<ExecutionError>;

    #[expect(clippy::too_many_lines, reason = "still readable")]
    async fn execute(
        &self,
        cmd: AcceptCounterOffer,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AcceptCounterOffer { offer_id, notes } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let found = tx
            .execute(Select(By::<Option<CounterOffer>, _>::new(offer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OfferNotFound(offer_id))
            .map_err(tracerr::wrap!())?;

        // Avoid concurrent actions upon the same `Posting` and
        // `CounterOffer`. Locking order matters: always the `Posting` first.
        tx.execute(Lock(By::<Posting, _>::new(found.post_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
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

        let mut posting = tx
            .execute(Select(By::<Option<Posting>, _>::new(offer.post_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|p| p.status != posting::Status::Deleted)
            .ok_or(E::PostingNotFound(offer.post_id))
            .map_err(tracerr::wrap!())?;
        if posting.status != posting::Status::Pending {
            return Err(tracerr::new!(E::AlreadyAccepted(offer.post_id)));
        }

        let now = DateTime::now();
        let acceptance = Acceptance {
            post_id: offer.post_id,
            technician_email: offer.technician_email.clone(),
            offer_amount: offer.requested_amount,
            accepted_at: now.coerce(),
        };
        tx.execute(Insert(acceptance)).await.map_err(|e| {
            if e.as_ref().is_unique_violation(Some("accepted_posts_pkey")) {
                tracerr::new!(E::AlreadyAccepted(offer.post_id))
            } else {
                tracerr::map_from_and_wrap!(=> E)(e)
            }
        })?;

        posting.offer_amount = offer.requested_amount;
        posting.status = posting::Status::Accepted;
        posting.technician_email = Some(offer.technician_email.clone());
        posting.accepted_at = Some(now.coerce());
        posting.updated_at = now.coerce();
        tx.execute(Update(posting))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        offer.status = offer::Status::Accepted;
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
            kind: audit::Kind::Accept,
            notes,
            created_at: now.coerce(),
        }))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;

        let pending = tx
            .execute(Select(By::<Vec<Pending<CounterOffer>>, _>::new(
                offer.post_id,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let mut withdrawn = Vec::new();
        for Pending(mut other) in pending {
            if other.id == offer_id {
                continue;
            }
            other.status = offer::Status::Withdrawn;
            let done = tx
                .execute(Update(Pending(other.clone())))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            if done {
                withdrawn.push(other.technician_email);
            }
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        if let Err(e) = self
            .peer()
            .execute(Notify(sync::Resolution {
                post_id: offer.post_id,
                technician_email: offer.technician_email.clone(),
                status: offer::Status::Accepted,
                responded_at: offer.responded_at,
            }))
            .await
        {
            log::warn!(
                "failed to notify peer about a counter-offer acceptance of \
                 `Technician(email: {})` upon `Posting(id: {})`: {e}",
                offer.technician_email,
                offer.post_id,
            );
        }
        for email in withdrawn {
            if let Err(e) = self
                .peer()
                .execute(Notify(sync::Withdrawal {
                    post_id: offer.post_id,
                    technician_email: email.clone(),
                }))
                .await
            {
                log::warn!(
                    "failed to notify peer about a counter-offer withdrawal \
                     of `Technician(email: {email})` upon \
                     `Posting(id: {})`: {e}",
                    offer.post_id,
                );
            }
        }

        Ok(offer)
    }
}

/// Error of [`AcceptCounterOffer`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Posting`] is already bound to a technician.
    #[display("`Posting(id: {_0})` is already accepted")]
    AlreadyAccepted(#[error(not(source))] posting::Id),

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

    /// [`Posting`] of the [`CounterOffer`] does not exist.
    #[display("`Posting(id: {_0})` does not exist")]
    PostingNotFound(#[error(not(source))] posting::Id),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{operations::Insert, DateTime, Money};

    use crate::{
        domain::{
            audit, dealer, offer, posting, technician, CounterOffer, Posting,
        },
        infra::{database::mock::Mock, sync, Database as _},
        task, Command as _, Config, Service,
    };

    use super::{AcceptCounterOffer, ExecutionError};

    fn config() -> Config {
        Config {
            negotiation_window: Duration::from_secs(24 * 60 * 60),
            expire_counter_offers: task::expire_counter_offers::Config {
                interval: Duration::from_secs(60),
            },
        }
    }

    fn posting() -> Posting {
        let now = DateTime::now();
        Posting {
            id: posting::Id::new(),
            dealer_email: dealer::Email::new("dealer@example.com").unwrap(),
            description: posting::Description::new("Body check").unwrap(),
            location: posting::Location::new("Tampa, FL").unwrap(),
            offer_amount: "150USD".parse::<Money>().unwrap(),
            vin: None,
            lot_number: None,
            status: posting::Status::Pending,
            technician_email: None,
            technician_name: None,
            created_at: now.coerce(),
            updated_at: now.coerce(),
            accepted_at: None,
            expected_completion_at: None,
        }
    }

    fn counter_offer(post_id: posting::Id, email: &str) -> CounterOffer {
        let now = DateTime::now();
        CounterOffer {
            id: offer::Id::new(),
            post_id,
            technician_email: technician::Email::new(email).unwrap(),
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
    async fn binds_posting_at_requested_amount() {
        let db = Mock::new();
        let posting = posting();
        db.execute(Insert(posting.clone())).await.unwrap();
        let offer = counter_offer(posting.id, "tech@example.com");
        db.execute(Insert(offer.clone())).await.unwrap();
        let peer = sync::mock::Mock::new();
        let service = Service::with_parts(config(), db.clone(), peer.clone());

        let accepted = service
            .execute(AcceptCounterOffer {
                offer_id: offer.id,
                notes: Some(offer::Notes::new("Deal").unwrap()),
            })
            .await
            .unwrap();

        assert_eq!(accepted.status, offer::Status::Accepted);
        assert!(accepted.responded_at.is_some());

        let stored = db.posting(posting.id).unwrap();
        assert_eq!(stored.status, posting::Status::Accepted);
        assert_eq!(stored.offer_amount, offer.requested_amount);
        assert_eq!(
            stored.technician_email.unwrap().as_str(),
            "tech@example.com",
        );
        assert_eq!(
            db.acceptance(posting.id).unwrap().offer_amount,
            offer.requested_amount,
        );
        assert_eq!(
            peer.delivered(),
            vec![format!(
                "resolution {} tech@example.com ACCEPTED",
                posting.id,
            )],
        );
    }

    #[tokio::test]
    async fn records_dealer_action() {
        let db = Mock::new();
        let posting = posting();
        db.execute(Insert(posting.clone())).await.unwrap();
        let offer = counter_offer(posting.id, "tech@example.com");
        db.execute(Insert(offer.clone())).await.unwrap();
        let service =
            Service::with_parts(config(), db.clone(), sync::mock::Mock::new());

        service
            .execute(AcceptCounterOffer {
                offer_id: offer.id,
                notes: None,
            })
            .await
            .unwrap();

        let actions = db.actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].offer_id, offer.id);
        assert_eq!(actions[0].kind, audit::Kind::Accept);
    }

    #[tokio::test]
    async fn withdraws_other_pending_counter_offers() {
        let db = Mock::new();
        let posting = posting();
        db.execute(Insert(posting.clone())).await.unwrap();
        let offer = counter_offer(posting.id, "tech@example.com");
        db.execute(Insert(offer.clone())).await.unwrap();
        let other = counter_offer(posting.id, "other@example.com");
        db.execute(Insert(other.clone())).await.unwrap();
        let peer = sync::mock::Mock::new();
        let service = Service::with_parts(config(), db.clone(), peer.clone());

        service
            .execute(AcceptCounterOffer {
                offer_id: offer.id,
                notes: None,
            })
            .await
            .unwrap();

        assert_eq!(
            db.offer(offer.id).unwrap().status,
            offer::Status::Accepted,
        );
        assert_eq!(
            db.offer(other.id).unwrap().status,
            offer::Status::Withdrawn,
        );
        assert!(peer
            .delivered()
            .contains(&format!("withdrawal {} other@example.com", posting.id)));
    }

    #[tokio::test]
    async fn expired_offer_is_reported() {
        let db = Mock::new();
        let posting = posting();
        db.execute(Insert(posting.clone())).await.unwrap();
        let mut offer = counter_offer(posting.id, "tech@example.com");
        offer.expires_at =
            offer::ExpirationDateTime::now() - Duration::from_secs(1);
        db.execute(Insert(offer.clone())).await.unwrap();
        let service =
            Service::with_parts(config(), db.clone(), sync::mock::Mock::new());

        let err = service
            .execute(AcceptCounterOffer {
                offer_id: offer.id,
                notes: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::OfferExpired(_)));
        assert_eq!(
            db.posting(posting.id).unwrap().status,
            posting::Status::Pending,
        );
    }

    #[tokio::test]
    async fn settled_offer_is_reported() {
        let db = Mock::new();
        let posting = posting();
        db.execute(Insert(posting.clone())).await.unwrap();
        let mut offer = counter_offer(posting.id, "tech@example.com");
        offer.status = offer::Status::Rejected;
        db.execute(Insert(offer.clone())).await.unwrap();
        let service =
            Service::with_parts(config(), db.clone(), sync::mock::Mock::new());

        let err = service
            .execute(AcceptCounterOffer {
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

    #[tokio::test]
    async fn missing_offer_is_reported() {
        let service = Service::with_parts(
            config(),
            Mock::new(),
            sync::mock::Mock::new(),
        );

        let err = service
            .execute(AcceptCounterOffer {
                offer_id: offer::Id::new(),
                notes: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::OfferNotFound(_)));
    }
}
