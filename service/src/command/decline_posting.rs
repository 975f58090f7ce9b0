//! [`Command`] for declining a [`Posting`].

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
    domain::{offer, posting, technician, CounterOffer, Decline, Posting},
    infra::{database, sync, Database},
    read::offer::Pending,
    Service,
};

use super::Command;

/// [`Command`] for declining a [`Posting`].
///
/// Declining is informational only, the [`Posting`] stays open for other
/// technicians. A still pending [`CounterOffer`] of the declining technician
/// is withdrawn along the way. Declining twice is a no-op.
#[derive(Clone, Debug)]
pub struct DeclinePosting {
    /// ID of the [`Posting`] to decline.
    pub post_id: posting::Id,

    /// Email address of the declining technician.
    pub technician_email: technician::Email,
}

impl<Db, P> Command<DeclinePosting> for Service<Db, P>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Posting, posting::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Posting>, posting::Id>>,
            Ok = Option<Posting>,
            Err = Traced<database::Error>,
        > + Database<Insert<Decline>, Err = Traced<database::Error>>
        + Database<
            Select<
                By<
                    Option<Pending<CounterOffer>>,
                    (posting::Id, technician::Email),
                >,
            >,
            Ok = Option<Pending<CounterOffer>>,
            Err = Traced<database::Error>,
        > + Database<
            Update<Pending<CounterOffer>>,
            Ok = bool,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
    P: sync::Peer<Notify<sync::Withdrawal>, Ok = (), Err = Traced<sync::Error>>,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: DeclinePosting,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeclinePosting {
            post_id,
            technician_email,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `Posting`.
        tx.execute(Lock(By::new(post_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Select(By::<Option<Posting>, _>::new(post_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|p| p.status != posting::Status::Deleted)
            .ok_or(E::PostingNotFound(post_id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        tx.execute(Insert(Decline {
            post_id,
            technician_email: technician_email.clone(),
            declined_at: DateTime::now().coerce(),
        }))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;

        let pending = tx
            .execute(Select(By::<Option<Pending<CounterOffer>>, _>::new((
                post_id,
                technician_email.clone(),
            ))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let mut withdrawn = false;
        if let Some(Pending(mut offer)) = pending {
            offer.status = offer::Status::Withdrawn;
            withdrawn = tx
                .execute(Update(Pending(offer)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        if withdrawn {
            if let Err(e) = self
                .peer()
                .execute(Notify(sync::Withdrawal {
                    post_id,
                    technician_email: technician_email.clone(),
                }))
                .await
            {
                log::warn!(
                    "failed to notify peer about a counter-offer withdrawal \
                     of `Technician(email: {technician_email})` upon \
                     `Posting(id: {post_id})`: {e}",
                );
            }
        }

        Ok(())
    }
}

/// Error of [`DeclinePosting`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Posting`] with the provided ID does not exist.
    #[display("`Posting(id: {_0})` does not exist")]
    PostingNotFound(#[error(not(source))] posting::Id),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{operations::Insert, DateTime, Money};

    use crate::{
        domain::{dealer, offer, posting, technician, CounterOffer, Posting},
        infra::{database::mock::Mock, sync, Database as _},
        task, Command as _, Config, Service,
    };

    use super::{DeclinePosting, ExecutionError};

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
            description: posting::Description::new("Engine check").unwrap(),
            location: posting::Location::new("Miami, FL").unwrap(),
            offer_amount: "120USD".parse::<Money>().unwrap(),
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

    fn cmd(post_id: posting::Id) -> DeclinePosting {
        DeclinePosting {
            post_id,
            technician_email: technician::Email::new("tech@example.com")
                .unwrap(),
        }
    }

    #[tokio::test]
    async fn records_decline_and_keeps_posting_open() {
        let db = Mock::new();
        let posting = posting();
        db.execute(Insert(posting.clone())).await.unwrap();
        let service =
            Service::with_parts(config(), db.clone(), sync::mock::Mock::new());

        service.execute(cmd(posting.id)).await.unwrap();

        assert_eq!(db.declines().len(), 1);
        assert_eq!(
            db.posting(posting.id).unwrap().status,
            posting::Status::Pending,
        );
    }

    #[tokio::test]
    async fn repeated_decline_is_a_no_op() {
        let db = Mock::new();
        let posting = posting();
        db.execute(Insert(posting.clone())).await.unwrap();
        let service =
            Service::with_parts(config(), db.clone(), sync::mock::Mock::new());

        service.execute(cmd(posting.id)).await.unwrap();
        service.execute(cmd(posting.id)).await.unwrap();

        assert_eq!(db.declines().len(), 1);
    }

    #[tokio::test]
    async fn withdraws_own_pending_counter_offer() {
        let db = Mock::new();
        let posting = posting();
        db.execute(Insert(posting.clone())).await.unwrap();
        let now = DateTime::now();
        let offer = CounterOffer {
            id: offer::Id::new(),
            post_id: posting.id,
            technician_email: technician::Email::new("tech@example.com")
                .unwrap(),
            original_amount: "120USD".parse::<Money>().unwrap(),
            requested_amount: "180USD".parse::<Money>().unwrap(),
            reason: None,
            requested_at: now.coerce(),
            expires_at: now.coerce() + Duration::from_secs(3600),
            status: offer::Status::Pending,
            responded_at: None,
            dealer_notes: None,
        };
        db.execute(Insert(offer.clone())).await.unwrap();
        let peer = sync::mock::Mock::new();
        let service = Service::with_parts(config(), db.clone(), peer.clone());

        service.execute(cmd(posting.id)).await.unwrap();

        assert_eq!(
            db.offer(offer.id).unwrap().status,
            offer::Status::Withdrawn,
        );
        assert_eq!(
            peer.delivered(),
            vec![format!("withdrawal {} tech@example.com", posting.id)],
        );
    }

    #[tokio::test]
    async fn missing_posting_is_reported() {
        let service = Service::with_parts(
            config(),
            Mock::new(),
            sync::mock::Mock::new(),
        );

        let err = service.execute(cmd(posting::Id::new())).await.unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::PostingNotFound(_),
        ));
    }
}
