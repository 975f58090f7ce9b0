//! [`Command`] for accepting a [`Posting`] at its offered price.

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
    domain::{offer, posting, technician, Acceptance, CounterOffer, Posting},
    infra::{database, sync, Database},
    read::offer::Pending,
    Service,
};

use super::Command;

/// [`Command`] for accepting a [`Posting`] at its offered price.
///
/// At most one technician ever binds to a [`Posting`]: the first [`Insert`]
/// of an [`Acceptance`] wins, every later attempt trips the primary key and
/// reports [`ExecutionError::AlreadyAccepted`].
#[derive(Clone, Debug)]
pub struct AcceptPosting {
    /// ID of the [`Posting`] to accept.
    pub post_id: posting::Id,

    /// Email address of the accepting technician.
    pub technician_email: technician::Email,

    /// Full name of the accepting technician.
    pub technician_name: technician::Name,
}

impl<Db, P> Command<AcceptPosting> for Service<Db, P>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Posting, posting::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Posting>, posting::Id>>,
            Ok = Option<Posting>,
            Err = Traced<database::Error>,
        > + Database<Insert<Acceptance>, Err = Traced<database::Error>>
        + Database<Update<Posting>, Err = Traced<database::Error>>
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
    type Ok = Acceptance;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: AcceptPosting) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AcceptPosting {
            post_id,
            technician_email,
            technician_name,
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

        let mut posting = tx
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
                return Err(tracerr::new!(E::NotAcceptable {
                    id: post_id,
                    status: posting.status,
                }));
            }
        }

        let acceptance = Acceptance {
            post_id,
            technician_email: technician_email.clone(),
            offer_amount: posting.offer_amount,
            accepted_at: DateTime::now().coerce(),
        };
        tx.execute(Insert(acceptance.clone())).await.map_err(|e| {
            if e.as_ref().is_unique_violation(Some("accepted_posts_pkey")) {
                tracerr::new!(E::AlreadyAccepted(post_id))
            } else {
                tracerr::map_from_and_wrap!(=> E)(e)
            }
        })?;

        posting.status = posting::Status::Accepted;
        posting.technician_email = Some(technician_email.clone());
        posting.technician_name = Some(technician_name);
        posting.accepted_at = Some(acceptance.accepted_at);
        posting.updated_at = DateTime::now().coerce();
        tx.execute(Update(posting))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        // Binding supersedes the whole negotiation, so every still pending
        // counter-offer is withdrawn along the way.
        let pending = tx
            .execute(Select(By::<Vec<Pending<CounterOffer>>, _>::new(post_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let mut withdrawn = Vec::new();
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

        Ok(acceptance)
    }
}

/// Error of [`AcceptPosting`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Posting`] is already bound to a technician.
    #[display("`Posting(id: {_0})` is already accepted")]
    AlreadyAccepted(#[error(not(source))] posting::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Posting`] cannot be accepted in its current [`posting::Status`].
    #[display("`Posting(id: {id})` cannot be accepted in `{status}` status")]
    NotAcceptable {
        /// ID of the [`Posting`].
        id: posting::Id,

        /// Current [`posting::Status`] of the [`Posting`].
        status: posting::Status,
    },

    /// [`Posting`] with the provided ID does not exist.
    #[display("`Posting(id: {_0})` does not exist")]
    PostingNotFound(#[error(not(source))] posting::Id),
}
