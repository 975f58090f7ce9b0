//! [`Command`] for proposing a new [`CounterOffer`] upon a [`Posting`].

use common::{
    money::Currency,
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    DateTime, Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{offer, posting, technician, CounterOffer, Posting},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for proposing a new [`CounterOffer`] upon a [`Posting`].
///
/// At most one [`offer::Status::Pending`] [`CounterOffer`] may exist per
/// technician per [`Posting`], enforced by a partial unique index. A new one
/// may be proposed once the previous reached a terminal status.
#[derive(Clone, Debug)]
pub struct SubmitCounterOffer {
    /// ID of the [`Posting`] to propose a [`CounterOffer`] upon.
    pub post_id: posting::Id,

    /// Email address of the proposing technician.
    pub technician_email: technician::Email,

    /// Compensation requested instead of the offered one.
    pub requested_amount: Money,

    /// Reasoning behind the proposal.
    pub reason: Option<offer::Reason>,
}

impl<Db, P> Command<SubmitCounterOffer> for Service<Db, P>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Posting, posting::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Posting>, posting::Id>>,
            Ok = Option<Posting>,
            Err = Traced<database::Error>,
        > + Database<Insert<CounterOffer>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = CounterOffer;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: SubmitCounterOffer,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SubmitCounterOffer {
            post_id,
            technician_email,
            requested_amount,
            reason,
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

        let posting = tx
            .execute(Select(By::<Option<Posting>, _>::new(post_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|p| p.status != posting::Status::Deleted)
            .ok_or(E::PostingNotFound(post_id))
            .map_err(tracerr::wrap!())?;
        match posting.status {
            posting::Status::Pending => {}
            posting::Status::Accepted
            | posting::Status::InProgress
            | posting::Status::Completed => {
                return Err(tracerr::new!(E::AlreadyAccepted(post_id)));
            }
            posting::Status::Cancelled | posting::Status::Deleted => {
                return Err(tracerr::new!(E::NotPending {
                    id: post_id,
                    status: posting.status,
                }));
            }
        }

        if requested_amount.currency != posting.offer_amount.currency {
            return Err(tracerr::new!(E::CurrencyMismatch {
                requested: requested_amount.currency,
                offered: posting.offer_amount.currency,
            }));
        }

        let now = DateTime::now();
        let offer = CounterOffer {
            id: offer::Id::new(),
            post_id,
            technician_email: technician_email.clone(),
            original_amount: posting.offer_amount,
            requested_amount,
            reason,
            requested_at: now.coerce(),
            expires_at: (now + self.config().negotiation_window).coerce(),
            status: offer::Status::Pending,
            responded_at: None,
            dealer_notes: None,
        };
        tx.execute(Insert(offer.clone())).await.map_err(|e| {
            if e.as_ref()
                .is_unique_violation(Some("counter_offers_pending_idx"))
            {
                tracerr::new!(E::DuplicatePending {
                    post_id,
                    technician_email,
                })
            } else {
                tracerr::map_from_and_wrap!(=> E)(e)
            }
        })?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(offer)
    }
}

/// Error of [`SubmitCounterOffer`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Posting`] is already bound to a technician.
    #[display("`Posting(id: {_0})` is already accepted")]
    AlreadyAccepted(#[error(not(source))] posting::Id),

    /// Requested amount is in a different [`Currency`] than the offered one.
    #[display(
        "requested amount is in `{requested}`, while the offer is in \
         `{offered}`"
    )]
    CurrencyMismatch {
        /// [`Currency`] of the requested amount.
        requested: Currency,

        /// [`Currency`] of the dealer's offer.
        offered: Currency,
    },

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Technician already has a pending [`CounterOffer`] upon the
    /// [`Posting`].
    #[display(
        "`CounterOffer` of `{technician_email}` upon \
         `Posting(id: {post_id})` is already pending"
    )]
    DuplicatePending {
        /// ID of the [`Posting`].
        post_id: posting::Id,

        /// Email address of the technician.
        technician_email: technician::Email,
    },

    /// [`Posting`] is not open for proposals.
    #[display("`Posting(id: {id})` is not open in `{status}` status")]
    NotPending {
        /// ID of the [`Posting`].
        id: posting::Id,

        /// Current [`posting::Status`] of the [`Posting`].
        status: posting::Status,
    },

    /// [`Posting`] with the provided ID does not exist.
    #[display("`Posting(id: {_0})` does not exist")]
    PostingNotFound(#[error(not(source))] posting::Id),
}
