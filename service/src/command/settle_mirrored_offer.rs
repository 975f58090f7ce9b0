//! [`Command`] for settling a [`Mirror`] from a peer notification.

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        offer::{self, Mirror},
        posting, technician,
    },
    infra::{database, Database},
    read::offer::Pending,
    Service,
};

use super::Command;

/// [`Command`] for settling a [`Mirror`] into a terminal status, as reported
/// by the peer service owning the canonical [`CounterOffer`].
///
/// Settling is idempotent: [`None`] is returned when no pending [`Mirror`]
/// of the technician exists upon the posting, which is exactly what a
/// repeated notification observes.
///
/// [`CounterOffer`]: crate::domain::CounterOffer
#[derive(Clone, Debug)]
pub struct SettleMirroredOffer {
    /// ID of the posting the counter-offer is proposed upon.
    pub post_id: posting::Id,

    /// Email address of the technician having proposed the counter-offer.
    pub technician_email: technician::Email,

    /// Terminal [`offer::Status`] the counter-offer has settled into.
    pub status: offer::Status,

    /// [`DateTime`] of the dealer response, if the settling is one.
    ///
    /// [`DateTime`]: common::DateTime
    pub responded_at: Option<offer::ResponseDateTime>,
}

impl<Db, P> Command<SettleMirroredOffer> for Service<Db, P>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<
                By<Option<Pending<Mirror>>, (posting::Id, technician::Email)>,
            >,
            Ok = Option<Pending<Mirror>>,
            Err = Traced<database::Error>,
        > + Database<Lock<By<Mirror, offer::Id>>, Err = Traced<database::Error>>
        + Database<
            Update<Pending<Mirror>>,
            Ok = bool,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Option<Mirror>;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: SettleMirroredOffer,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SettleMirroredOffer {
            post_id,
            technician_email,
            status,
            responded_at,
        } = cmd;

        if !status.is_terminal() {
            return Err(tracerr::new!(E::NotTerminal(status)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let Some(Pending(mut mirror)) = tx
            .execute(Select(By::<Option<Pending<Mirror>>, _>::new((
                post_id,
                technician_email,
            ))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
        else {
            return Ok(None);
        };

        // Avoid concurrent actions upon the same `Mirror`.
        tx.execute(Lock(By::<Mirror, _>::new(mirror.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        mirror.status = status;
        mirror.responded_at = responded_at;
        let done = tx
            .execute(Update(Pending(mirror.clone())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !done {
            // Settled by a concurrent notification already.
            return Ok(None);
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(Some(mirror))
    }
}

/// Error of [`SettleMirroredOffer`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Provided [`offer::Status`] is not a terminal one.
    #[display("`{_0}` is not a terminal status")]
    NotTerminal(#[error(not(source))] offer::Status),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{operations::Insert, DateTime, Money};

    use crate::{
        domain::{
            offer::{self, Mirror},
            posting, technician,
        },
        infra::{database::mock::Mock, sync, Database as _},
        task, Command as _, Config, Service,
    };

    use super::{ExecutionError, SettleMirroredOffer};

    fn config() -> Config {
        Config {
            negotiation_window: Duration::from_secs(24 * 60 * 60),
            expire_counter_offers: task::expire_counter_offers::Config {
                interval: Duration::from_secs(60),
            },
        }
    }

    fn mirror(post_id: posting::Id) -> Mirror {
        let now = DateTime::now();
        Mirror {
            id: offer::Id::new(),
            peer_id: None,
            post_id,
            technician_email: technician::Email::new("tech@example.com")
                .unwrap(),
            original_amount: "150USD".parse::<Money>().unwrap(),
            requested_amount: "220USD".parse::<Money>().unwrap(),
            reason: None,
            requested_at: now.coerce(),
            expires_at: now.coerce() + Duration::from_secs(3600),
            status: offer::Status::Pending,
            responded_at: None,
        }
    }

    fn cmd(post_id: posting::Id, status: offer::Status) -> SettleMirroredOffer {
        SettleMirroredOffer {
            post_id,
            technician_email: technician::Email::new("tech@example.com")
                .unwrap(),
            status,
            responded_at: Some(DateTime::now().coerce()),
        }
    }

    #[tokio::test]
    async fn settles_pending_mirror() {
        let db = Mock::new();
        let post_id = posting::Id::new();
        db.execute(Insert(mirror(post_id))).await.unwrap();
        let service =
            Service::with_parts(config(), db.clone(), sync::mock::Mock::new());

        let settled = service
            .execute(cmd(post_id, offer::Status::Rejected))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(settled.status, offer::Status::Rejected);
        assert!(settled.responded_at.is_some());
        assert_eq!(db.mirrors()[0].status, offer::Status::Rejected);
    }

    #[tokio::test]
    async fn repeated_notification_returns_none() {
        let db = Mock::new();
        let post_id = posting::Id::new();
        db.execute(Insert(mirror(post_id))).await.unwrap();
        let service =
            Service::with_parts(config(), db.clone(), sync::mock::Mock::new());

        assert!(service
            .execute(cmd(post_id, offer::Status::Withdrawn))
            .await
            .unwrap()
            .is_some());
        assert!(service
            .execute(cmd(post_id, offer::Status::Withdrawn))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn pending_status_is_not_settleable() {
        let service = Service::with_parts(
            config(),
            Mock::new(),
            sync::mock::Mock::new(),
        );

        let err = service
            .execute(cmd(posting::Id::new(), offer::Status::Pending))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NotTerminal(_)));
    }

    #[tokio::test]
    async fn absent_mirror_returns_none() {
        let service = Service::with_parts(
            config(),
            Mock::new(),
            sync::mock::Mock::new(),
        );

        let settled = service
            .execute(cmd(posting::Id::new(), offer::Status::Expired))
            .await
            .unwrap();

        assert!(settled.is_none());
    }
}
