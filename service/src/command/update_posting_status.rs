//! [`Command`] for moving a [`Posting`] along its lifecycle.

use common::{
    operations::{
        By, Commit, Lock, Notify, Select, Transact, Transacted, Update,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{offer, posting, CounterOffer, Posting},
    infra::{database, sync, Database},
    read::offer::Pending,
    Service,
};

use super::Command;

/// [`Command`] for moving a [`Posting`] along its lifecycle.
///
/// Only dealer-driven lifecycle transitions are assignable here, binding to a
/// technician happens via acceptance arbitration exclusively. Cancelling or
/// deleting a [`Posting`] withdraws its still pending [`CounterOffer`]s and
/// unbinds the technician.
#[derive(Clone, Debug)]
pub struct UpdatePostingStatus {
    /// ID of the [`Posting`] to update.
    pub post_id: posting::Id,

    /// [`posting::Status`] to move the [`Posting`] into.
    pub status: posting::Status,
}

impl<Db, P> Command<UpdatePostingStatus> for Service<Db, P>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Posting, posting::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Posting>, posting::Id>>,
            Ok = Option<Posting>,
            Err = Traced<database::Error>,
        > + Database<Update<Posting>, Err = Traced<database::Error>>
        + Database<
            Select<By<Vec<Pending<CounterOffer>>, posting::Id>>,
            Ok = Vec<Pending<CounterOffer>>,
            Err = Traced<database::Error>,
        > + Database<
            Update<Pending<CounterOffer>>,
            Ok = bool,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
    P: sync::Peer<Notify<sync::Withdrawal>, Ok = (), Err = Traced<sync::Error>>,
{
    type Ok = Posting;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdatePostingStatus,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdatePostingStatus { post_id, status } = cmd;

        if matches!(
            status,
            posting::Status::Pending | posting::Status::Accepted,
        ) {
            return Err(tracerr::new!(E::Unassignable(status)));
        }

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

        let mut posting = tx
            .execute(Select(By::<Option<Posting>, _>::new(post_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|p| p.status != posting::Status::Deleted)
            .ok_or(E::PostingNotFound(post_id))
            .map_err(tracerr::wrap!())?;
        if !posting.status.allows(status) {
            return Err(tracerr::new!(E::IllegalTransition {
                from: posting.status,
                to: status,
            }));
        }

        posting.status = status;
        posting.updated_at = DateTime::now().coerce();

        // A cancelled or deleted `Posting` carries no binding and no live
        // negotiation anymore.
        let mut withdrawn = Vec::new();
        if matches!(
            status,
            posting::Status::Cancelled | posting::Status::Deleted,
        ) {
            posting.technician_email = None;
            posting.technician_name = None;

            let pending = tx
                .execute(Select(By::<Vec<Pending<CounterOffer>>, _>::new(
                    post_id,
                )))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            for Pending(mut offer) in pending {
                offer.status = offer::Status::Withdrawn;
                let done = tx
                    .execute(Update(Pending(offer.clone())))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
                if done {
                    withdrawn.push(offer.technician_email);
                }
            }
        }

        tx.execute(Update(posting.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        for email in withdrawn {
            if let Err(e) = self
                .peer()
                .execute(Notify(sync::Withdrawal {
                    post_id,
                    technician_email: email.clone(),
                }))
                .await
            {
                log::warn!(
                    "failed to notify peer about a counter-offer withdrawal \
                     of `Technician(email: {email})` upon \
                     `Posting(id: {post_id})`: {e}",
                );
            }
        }

        Ok(posting)
    }
}

/// Error of [`UpdatePostingStatus`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Requested transition is not allowed by the [`Posting`] lifecycle.
    #[display("`Posting` cannot move from `{from}` to `{to}` status")]
    IllegalTransition {
        /// Current [`posting::Status`] of the [`Posting`].
        from: posting::Status,

        /// Requested [`posting::Status`].
        to: posting::Status,
    },

    /// [`Posting`] with the provided ID does not exist.
    #[display("`Posting(id: {_0})` does not exist")]
    PostingNotFound(#[error(not(source))] posting::Id),

    /// Requested [`posting::Status`] is never assigned directly.
    #[display("`{_0}` status is never assigned directly")]
    Unassignable(#[error(not(source))] posting::Status),
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

    use super::{ExecutionError, UpdatePostingStatus};

    fn config() -> Config {
        Config {
            negotiation_window: Duration::from_secs(24 * 60 * 60),
            expire_counter_offers: task::expire_counter_offers::Config {
                interval: Duration::from_secs(60),
            },
        }
    }

    fn posting(status: posting::Status) -> Posting {
        let now = DateTime::now();
        Posting {
            id: posting::Id::new(),
            dealer_email: dealer::Email::new("dealer@example.com").unwrap(),
            description: posting::Description::new("Interior check").unwrap(),
            location: posting::Location::new("Reno, NV").unwrap(),
            offer_amount: "150USD".parse::<Money>().unwrap(),
            vin: None,
            lot_number: None,
            status,
            technician_email: None,
            technician_name: None,
            created_at: now.coerce(),
            updated_at: now.coerce(),
            accepted_at: None,
            expected_completion_at: None,
        }
    }

    #[tokio::test]
    async fn moves_accepted_posting_in_progress() {
        let db = Mock::new();
        let mut posting = posting(posting::Status::Accepted);
        posting.technician_email =
            Some(technician::Email::new("tech@example.com").unwrap());
        db.execute(Insert(posting.clone())).await.unwrap();
        let service =
            Service::with_parts(config(), db.clone(), sync::mock::Mock::new());

        let updated = service
            .execute(UpdatePostingStatus {
                post_id: posting.id,
                status: posting::Status::InProgress,
            })
            .await
            .unwrap();

        assert_eq!(updated.status, posting::Status::InProgress);
        assert!(updated.technician_email.is_some());
    }

    #[tokio::test]
    async fn binding_statuses_are_unassignable() {
        let db = Mock::new();
        let posting = posting(posting::Status::Pending);
        db.execute(Insert(posting.clone())).await.unwrap();
        let service =
            Service::with_parts(config(), db.clone(), sync::mock::Mock::new());

        for status in [posting::Status::Accepted, posting::Status::Pending] {
            let err = service
                .execute(UpdatePostingStatus {
                    post_id: posting.id,
                    status,
                })
                .await
                .unwrap_err();
            assert!(matches!(
                err.as_ref(),
                ExecutionError::Unassignable(_),
            ));
        }
    }

    #[tokio::test]
    async fn illegal_transition_is_reported() {
        let db = Mock::new();
        let posting = posting(posting::Status::Pending);
        db.execute(Insert(posting.clone())).await.unwrap();
        let service =
            Service::with_parts(config(), db.clone(), sync::mock::Mock::new());

        let err = service
            .execute(UpdatePostingStatus {
                post_id: posting.id,
                status: posting::Status::Completed,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::IllegalTransition { .. },
        ));
    }

    #[tokio::test]
    async fn cancelling_withdraws_offers_and_unbinds() {
        let db = Mock::new();
        let mut posting = posting(posting::Status::Accepted);
        posting.technician_email =
            Some(technician::Email::new("tech@example.com").unwrap());
        posting.technician_name =
            Some(technician::Name::new("Alex Kim").unwrap());
        db.execute(Insert(posting.clone())).await.unwrap();
        let now = DateTime::now();
        let offer = CounterOffer {
            id: offer::Id::new(),
            post_id: posting.id,
            technician_email: technician::Email::new("other@example.com")
                .unwrap(),
            original_amount: "150USD".parse::<Money>().unwrap(),
            requested_amount: "220USD".parse::<Money>().unwrap(),
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

        let updated = service
            .execute(UpdatePostingStatus {
                post_id: posting.id,
                status: posting::Status::Cancelled,
            })
            .await
            .unwrap();

        assert_eq!(updated.status, posting::Status::Cancelled);
        assert!(updated.technician_email.is_none());
        assert!(updated.technician_name.is_none());
        assert_eq!(
            db.offer(offer.id).unwrap().status,
            offer::Status::Withdrawn,
        );
        assert_eq!(
            peer.delivered(),
            vec![format!("withdrawal {} other@example.com", posting.id)],
        );
    }

    #[tokio::test]
    async fn deleted_posting_is_not_found() {
        let db = Mock::new();
        let posting = posting(posting::Status::Deleted);
        db.execute(Insert(posting.clone())).await.unwrap();
        let service =
            Service::with_parts(config(), db.clone(), sync::mock::Mock::new());

        let err = service
            .execute(UpdatePostingStatus {
                post_id: posting.id,
                status: posting::Status::Cancelled,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::PostingNotFound(_),
        ));
    }
}
