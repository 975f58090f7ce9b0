//! [`Command`] for withdrawing a pending [`CounterOffer`].

use common::operations::{
    By, Commit, Lock, Notify, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{offer, posting, technician, CounterOffer},
    infra::{database, sync, Database},
    read::offer::Pending,
    Service,
};

use super::Command;

/// [`Command`] for withdrawing a pending [`CounterOffer`] by its technician.
///
/// Withdrawing is idempotent: [`None`] is returned when no pending
/// [`CounterOffer`] of the technician exists upon the [`Posting`], whether it
/// never did or was settled already.
///
/// [`Posting`]: crate::domain::Posting
#[derive(Clone, Debug)]
pub struct WithdrawCounterOffer {
    /// ID of the [`Posting`] the [`CounterOffer`] is proposed upon.
    ///
    /// [`Posting`]: crate::domain::Posting
    pub post_id: posting::Id,

    /// Email address of the withdrawing technician.
    pub technician_email: technician::Email,
}

impl<Db, P> Command<WithdrawCounterOffer> for Service<Db, P>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<
                By<
                    Option<Pending<CounterOffer>>,
                    (posting::Id, technician::Email),
                >,
            >,
            Ok = Option<Pending<CounterOffer>>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<CounterOffer, offer::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Update<Pending<CounterOffer>>,
            Ok = bool,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
    P: sync::Peer<Notify<sync::Withdrawal>, Ok = (), Err = Traced<sync::Error>>,
{
    type Ok = Option<CounterOffer>;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: WithdrawCounterOffer,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let WithdrawCounterOffer {
            post_id,
            technician_email,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let Some(Pending(mut offer)) = tx
            .execute(Select(By::<Option<Pending<CounterOffer>>, _>::new((
                post_id,
                technician_email.clone(),
            ))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
        else {
            return Ok(None);
        };

        // Avoid concurrent actions upon the same `CounterOffer`.
        tx.execute(Lock(By::<CounterOffer, _>::new(offer.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        offer.status = offer::Status::Withdrawn;
        let done = tx
            .execute(Update(Pending(offer.clone())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !done {
            // Settled by a concurrent transition, nothing to withdraw.
            return Ok(None);
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        if let Err(e) = self
            .peer()
            .execute(Notify(sync::Withdrawal {
                post_id,
                technician_email,
            }))
            .await
        {
            log::warn!(
                "failed to notify peer about a counter-offer withdrawal of \
                 `Technician(email: {})` upon `Posting(id: {})`: {e}",
                offer.technician_email,
                offer.post_id,
            );
        }

        Ok(Some(offer))
    }
}

/// Error of [`WithdrawCounterOffer`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),
}
