//! [`Command`] for filing a [`Mirror`] of a counter-offer proposed locally.

use common::{
    operations::{Insert, Notify},
    DateTime, Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        offer::{self, Mirror},
        posting, technician,
    },
    infra::{database, sync, Database},
    Service,
};

use super::Command;

/// [`Command`] for filing a [`Mirror`] of a counter-offer proposed by a
/// local technician.
///
/// The [`Mirror`] is stored first, then the peer service holding the
/// canonical [`CounterOffer`] is notified about the submission. Notification
/// failure is tolerated, the peer catches up on a later change.
///
/// [`CounterOffer`]: crate::domain::CounterOffer
#[derive(Clone, Debug)]
pub struct FileCounterOffer {
    /// ID of the posting the counter-offer is proposed upon.
    pub post_id: posting::Id,

    /// Email address of the proposing technician.
    pub technician_email: technician::Email,

    /// Compensation offered by the dealer at the proposal moment.
    pub original_amount: Money,

    /// Compensation requested by the technician instead.
    pub requested_amount: Money,

    /// Reasoning behind the proposal.
    pub reason: Option<offer::Reason>,

    /// ID of the canonical [`CounterOffer`] on the peer service, if known
    /// already.
    ///
    /// [`CounterOffer`]: crate::domain::CounterOffer
    pub peer_id: Option<offer::Id>,
}

impl<Db, P> Command<FileCounterOffer> for Service<Db, P>
where
    Db: Database<Insert<Mirror>, Err = Traced<database::Error>>,
    P: sync::Peer<Notify<sync::Submission>, Ok = (), Err = Traced<sync::Error>>,
{
    type Ok = Mirror;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: FileCounterOffer,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let FileCounterOffer {
            post_id,
            technician_email,
            original_amount,
            requested_amount,
            reason,
            peer_id,
        } = cmd;

        let now = DateTime::now();
        let mirror = Mirror {
            id: offer::Id::new(),
            peer_id,
            post_id,
            technician_email: technician_email.clone(),
            original_amount,
            requested_amount,
            reason: reason.clone(),
            requested_at: now.coerce(),
            expires_at: (now + self.config().negotiation_window).coerce(),
            status: offer::Status::Pending,
            responded_at: None,
        };
        self.database()
            .execute(Insert(mirror.clone()))
            .await
            .map_err(|e| {
                if e.as_ref().is_unique_violation(Some(
                    "tech_counter_offers_pending_idx",
                )) {
                    tracerr::new!(E::DuplicatePending {
                        post_id,
                        technician_email: technician_email.clone(),
                    })
                } else {
                    tracerr::map_from_and_wrap!(=> E)(e)
                }
            })?;

        if let Err(e) = self
            .peer()
            .execute(Notify(sync::Submission {
                post_id,
                technician_email,
                original_amount,
                requested_amount,
                reason,
                expires_at: mirror.expires_at,
            }))
            .await
        {
            log::warn!(
                "failed to notify peer about a counter-offer submission of \
                 `Technician(email: {})` upon `Posting(id: {post_id})`: {e}",
                mirror.technician_email,
            );
        }

        Ok(mirror)
    }
}

/// Error of [`FileCounterOffer`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Technician already has a pending [`Mirror`] upon the posting.
    #[display(
        "counter-offer of `{technician_email}` upon \
         `Posting(id: {post_id})` is already pending"
    )]
    DuplicatePending {
        /// ID of the posting.
        post_id: posting::Id,

        /// Email address of the technician.
        technician_email: technician::Email,
    },
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::Money;

    use crate::{
        domain::{offer, posting, technician},
        infra::{database::mock::Mock, sync},
        task, Command as _, Config, Service,
    };

    use super::{ExecutionError, FileCounterOffer};

    fn config() -> Config {
        Config {
            negotiation_window: Duration::from_secs(24 * 60 * 60),
            expire_counter_offers: task::expire_counter_offers::Config {
                interval: Duration::from_secs(60),
            },
        }
    }

    fn cmd(post_id: posting::Id) -> FileCounterOffer {
        FileCounterOffer {
            post_id,
            technician_email: technician::Email::new("tech@example.com")
                .unwrap(),
            original_amount: "150USD".parse::<Money>().unwrap(),
            requested_amount: "220USD".parse::<Money>().unwrap(),
            reason: Some(offer::Reason::new("Travel distance").unwrap()),
            peer_id: None,
        }
    }

    #[tokio::test]
    async fn files_mirror_and_notifies() {
        let db = Mock::new();
        let peer = sync::mock::Mock::new();
        let service = Service::with_parts(config(), db.clone(), peer.clone());
        let post_id = posting::Id::new();

        let mirror = service.execute(cmd(post_id)).await.unwrap();

        assert_eq!(mirror.status, offer::Status::Pending);
        assert_eq!(db.mirrors().len(), 1);
        assert_eq!(
            peer.delivered(),
            vec![format!("submission {post_id} tech@example.com")],
        );
    }

    #[tokio::test]
    async fn second_pending_filing_is_rejected() {
        let db = Mock::new();
        let service =
            Service::with_parts(config(), db.clone(), sync::mock::Mock::new());
        let post_id = posting::Id::new();

        service.execute(cmd(post_id)).await.unwrap();
        let err = service.execute(cmd(post_id)).await.unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::DuplicatePending { .. },
        ));
    }

    #[tokio::test]
    async fn failing_peer_does_not_fail_filing() {
        let db = Mock::new();
        let service = Service::with_parts(
            config(),
            db.clone(),
            sync::mock::Mock::failing(),
        );

        service.execute(cmd(posting::Id::new())).await.unwrap();

        assert_eq!(db.mirrors().len(), 1);
    }
}
