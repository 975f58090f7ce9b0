//! In-memory [`Database`] for tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use common::operations::{By, Commit, Insert, Lock, Select, Transact, Update};
use tracerr::Traced;

use crate::{
    domain::{
        offer::{self, Mirror},
        posting, technician, Acceptance, CounterOffer, DealerAction, Decline,
        Posting,
    },
    read,
};

use super::{Database, Error};

/// In-memory [`Database`] mirroring the semantics the Postgres
/// implementations rely upon: upserting entity writes, guarded counter-offer
/// transitions and uniqueness constraints surfacing as
/// [`Error::UniqueViolation`].
///
/// All clones share the same state, so a "transaction" is simply the same
/// storage. Locks are no-ops: atomicity of each single operation under the
/// mutex is what arbitration tests lean on, the same way the real database
/// leans on its constraints.
#[derive(Clone, Debug, Default)]
pub(crate) struct Mock(Arc<Mutex<State>>);

/// State of a [`Mock`] database.
#[derive(Debug, Default)]
struct State {
    /// `postings` table.
    postings: HashMap<posting::Id, Posting>,

    /// `accepted_posts` table, keyed by its primary key.
    acceptances: HashMap<posting::Id, Acceptance>,

    /// `declined_posts` table.
    declines: Vec<Decline>,

    /// `counter_offers` table.
    offers: HashMap<offer::Id, CounterOffer>,

    /// `tech_counter_offers` table.
    mirrors: HashMap<offer::Id, Mirror>,

    /// `dealer_counter_offer_actions` table.
    actions: Vec<DealerAction>,
}

impl Mock {
    /// Creates a new empty [`Mock`] database.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the stored [`Posting`] with the provided ID.
    pub(crate) fn posting(&self, id: posting::Id) -> Option<Posting> {
        self.0.lock().unwrap().postings.get(&id).cloned()
    }

    /// Returns the stored [`Acceptance`] of the provided [`Posting`].
    ///
    /// [`Posting`]: crate::domain::Posting
    pub(crate) fn acceptance(&self, id: posting::Id) -> Option<Acceptance> {
        self.0.lock().unwrap().acceptances.get(&id).cloned()
    }

    /// Returns the stored [`CounterOffer`] with the provided ID.
    pub(crate) fn offer(&self, id: offer::Id) -> Option<CounterOffer> {
        self.0.lock().unwrap().offers.get(&id).cloned()
    }

    /// Returns all the stored [`Mirror`]s.
    pub(crate) fn mirrors(&self) -> Vec<Mirror> {
        self.0.lock().unwrap().mirrors.values().cloned().collect()
    }

    /// Returns all the stored [`Decline`]s.
    pub(crate) fn declines(&self) -> Vec<Decline> {
        self.0.lock().unwrap().declines.clone()
    }

    /// Returns all the stored [`DealerAction`]s.
    pub(crate) fn actions(&self) -> Vec<DealerAction> {
        self.0.lock().unwrap().actions.clone()
    }
}

impl Database<Transact> for Mock {
    type Ok = Self;
    type Err = Traced<Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Mock {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl Database<Lock<By<Posting, posting::Id>>> for Mock {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        _: Lock<By<Posting, posting::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl Database<Lock<By<CounterOffer, offer::Id>>> for Mock {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        _: Lock<By<CounterOffer, offer::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl Database<Lock<By<Mirror, offer::Id>>> for Mock {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        _: Lock<By<Mirror, offer::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl Database<Select<By<Option<Posting>, posting::Id>>> for Mock {
    type Ok = Option<Posting>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Posting>, posting::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.posting(by.into_inner()))
    }
}

impl Database<Insert<Posting>> for Mock {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Insert(posting): Insert<Posting>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(posting)).await
    }
}

impl Database<Update<Posting>> for Mock {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Update(posting): Update<Posting>,
    ) -> Result<Self::Ok, Self::Err> {
        _ = self.0.lock().unwrap().postings.insert(posting.id, posting);
        Ok(())
    }
}

impl Database<Select<By<read::posting::Feed, read::posting::Limit>>>
    for Mock
{
    type Ok = read::posting::Feed;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::posting::Feed, read::posting::Limit>>,
    ) -> Result<Self::Ok, Self::Err> {
        let limit = usize::try_from(by.into_inner()).unwrap_or(0);

        let mut postings = self
            .0
            .lock()
            .unwrap()
            .postings
            .values()
            .filter(|p| p.status == posting::Status::Pending)
            .cloned()
            .collect::<Vec<_>>();
        postings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        postings.truncate(limit);

        Ok(read::posting::Feed(postings))
    }
}

impl Database<Insert<Acceptance>> for Mock {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Insert(acceptance): Insert<Acceptance>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut state = self.0.lock().unwrap();
        if state.acceptances.contains_key(&acceptance.post_id) {
            return Err(tracerr::new!(Error::UniqueViolation(
                "accepted_posts_pkey",
            )));
        }
        _ = state.acceptances.insert(acceptance.post_id, acceptance);
        Ok(())
    }
}

impl Database<Select<By<Option<Acceptance>, posting::Id>>> for Mock {
    type Ok = Option<Acceptance>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Acceptance>, posting::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.acceptance(by.into_inner()))
    }
}

impl Database<Insert<Decline>> for Mock {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Insert(decline): Insert<Decline>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut state = self.0.lock().unwrap();
        let duplicate = state.declines.iter().any(|d| {
            d.post_id == decline.post_id
                && d.technician_email == decline.technician_email
        });
        if !duplicate {
            state.declines.push(decline);
        }
        Ok(())
    }
}

impl Database<Insert<CounterOffer>> for Mock {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Insert(offer): Insert<CounterOffer>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut state = self.0.lock().unwrap();
        let duplicate = state.offers.values().any(|o| {
            o.post_id == offer.post_id
                && o.technician_email == offer.technician_email
                && o.status == offer::Status::Pending
        });
        if duplicate && offer.status == offer::Status::Pending {
            return Err(tracerr::new!(Error::UniqueViolation(
                "counter_offers_pending_idx",
            )));
        }
        _ = state.offers.insert(offer.id, offer);
        Ok(())
    }
}

impl Database<Select<By<Option<CounterOffer>, offer::Id>>> for Mock {
    type Ok = Option<CounterOffer>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<CounterOffer>, offer::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.offer(by.into_inner()))
    }
}

impl Database<Select<By<Vec<read::offer::Pending<CounterOffer>>, posting::Id>>>
    for Mock
{
    type Ok = Vec<read::offer::Pending<CounterOffer>>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<read::offer::Pending<CounterOffer>>, posting::Id>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let post_id = by.into_inner();

        let mut offers = self
            .0
            .lock()
            .unwrap()
            .offers
            .values()
            .filter(|o| {
                o.post_id == post_id && o.status == offer::Status::Pending
            })
            .cloned()
            .collect::<Vec<_>>();
        offers.sort_by(|a, b| a.requested_at.cmp(&b.requested_at));

        Ok(offers.into_iter().map(read::offer::Pending).collect())
    }
}

impl Database<Select<By<Vec<CounterOffer>, posting::Id>>> for Mock {
    type Ok = Vec<CounterOffer>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<CounterOffer>, posting::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let post_id = by.into_inner();

        let mut offers = self
            .0
            .lock()
            .unwrap()
            .offers
            .values()
            .filter(|o| o.post_id == post_id)
            .cloned()
            .collect::<Vec<_>>();
        offers.sort_by(|a, b| a.requested_at.cmp(&b.requested_at));

        Ok(offers)
    }
}

impl
    Database<
        Select<
            By<
                Option<read::offer::Pending<CounterOffer>>,
                (posting::Id, technician::Email),
            >,
        >,
    > for Mock
{
    type Ok = Option<read::offer::Pending<CounterOffer>>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<
                Option<read::offer::Pending<CounterOffer>>,
                (posting::Id, technician::Email),
            >,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let (post_id, technician_email) = by.into_inner();

        Ok(self
            .0
            .lock()
            .unwrap()
            .offers
            .values()
            .find(|o| {
                o.post_id == post_id
                    && o.technician_email == technician_email
                    && o.status == offer::Status::Pending
            })
            .cloned()
            .map(read::offer::Pending))
    }
}

impl Database<Update<read::offer::Pending<CounterOffer>>> for Mock {
    type Ok = bool;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Update(pending): Update<read::offer::Pending<CounterOffer>>,
    ) -> Result<Self::Ok, Self::Err> {
        let updated = pending.into_inner();

        let mut state = self.0.lock().unwrap();
        let Some(stored) = state.offers.get_mut(&updated.id) else {
            return Ok(false);
        };
        if stored.status != offer::Status::Pending {
            return Ok(false);
        }

        stored.status = updated.status;
        stored.responded_at = updated.responded_at;
        stored.dealer_notes = updated.dealer_notes;
        Ok(true)
    }
}

impl Database<Update<By<CounterOffer, offer::ExpirationDateTime>>> for Mock {
    type Ok = u64;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Update(by): Update<By<CounterOffer, offer::ExpirationDateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let deadline = by.into_inner();

        let mut expired = 0;
        for offer in self.0.lock().unwrap().offers.values_mut() {
            if offer.status == offer::Status::Pending
                && offer.expires_at <= deadline
            {
                offer.status = offer::Status::Expired;
                expired += 1;
            }
        }
        Ok(expired)
    }
}

impl Database<Insert<Mirror>> for Mock {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Insert(mirror): Insert<Mirror>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut state = self.0.lock().unwrap();
        let duplicate = state.mirrors.values().any(|m| {
            m.post_id == mirror.post_id
                && m.technician_email == mirror.technician_email
                && m.status == offer::Status::Pending
        });
        if duplicate && mirror.status == offer::Status::Pending {
            return Err(tracerr::new!(Error::UniqueViolation(
                "tech_counter_offers_pending_idx",
            )));
        }
        _ = state.mirrors.insert(mirror.id, mirror);
        Ok(())
    }
}

impl
    Database<
        Select<
            By<
                Option<read::offer::Pending<Mirror>>,
                (posting::Id, technician::Email),
            >,
        >,
    > for Mock
{
    type Ok = Option<read::offer::Pending<Mirror>>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<
                Option<read::offer::Pending<Mirror>>,
                (posting::Id, technician::Email),
            >,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let (post_id, technician_email) = by.into_inner();

        Ok(self
            .0
            .lock()
            .unwrap()
            .mirrors
            .values()
            .find(|m| {
                m.post_id == post_id
                    && m.technician_email == technician_email
                    && m.status == offer::Status::Pending
            })
            .cloned()
            .map(read::offer::Pending))
    }
}

impl Database<Update<read::offer::Pending<Mirror>>> for Mock {
    type Ok = bool;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Update(pending): Update<read::offer::Pending<Mirror>>,
    ) -> Result<Self::Ok, Self::Err> {
        let updated = pending.into_inner();

        let mut state = self.0.lock().unwrap();
        let Some(stored) = state.mirrors.get_mut(&updated.id) else {
            return Ok(false);
        };
        if stored.status != offer::Status::Pending {
            return Ok(false);
        }

        stored.peer_id = updated.peer_id;
        stored.status = updated.status;
        stored.responded_at = updated.responded_at;
        Ok(true)
    }
}

impl Database<Update<By<Mirror, offer::ExpirationDateTime>>> for Mock {
    type Ok = u64;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Update(by): Update<By<Mirror, offer::ExpirationDateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let deadline = by.into_inner();

        let mut expired = 0;
        for mirror in self.0.lock().unwrap().mirrors.values_mut() {
            if mirror.status == offer::Status::Pending
                && mirror.expires_at <= deadline
            {
                mirror.status = offer::Status::Expired;
                expired += 1;
            }
        }
        Ok(expired)
    }
}

impl Database<Insert<DealerAction>> for Mock {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Insert(action): Insert<DealerAction>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0.lock().unwrap().actions.push(action);
        Ok(())
    }
}
