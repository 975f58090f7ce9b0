//! [`Acceptance`]-related definitions.

use common::{unit, DateTimeOf, Money};

use super::{posting, technician};

/// Binding of a [`Posting`] to the single technician having won it.
///
/// At most one [`Acceptance`] may ever exist per [`Posting`], which is what
/// the acceptance arbitration is about.
///
/// [`Posting`]: super::Posting
#[derive(Clone, Debug)]
pub struct Acceptance {
    /// ID of the bound [`Posting`].
    ///
    /// [`Posting`]: super::Posting
    pub post_id: posting::Id,

    /// Email address of the technician having won the [`Posting`].
    ///
    /// [`Posting`]: super::Posting
    pub technician_email: technician::Email,

    /// Compensation the job is bound at.
    ///
    /// Either the dealer's original offer, or the amount of an accepted
    /// counter-offer.
    pub offer_amount: Money,

    /// [`DateTime`] when the binding happened.
    ///
    /// [`DateTime`]: common::DateTime
    pub accepted_at: posting::AcceptanceDateTime,
}

/// Recorded fact of a technician having declined a [`Posting`].
///
/// Declining is informational only and never blocks other technicians.
///
/// [`Posting`]: super::Posting
#[derive(Clone, Debug)]
pub struct Decline {
    /// ID of the declined [`Posting`].
    ///
    /// [`Posting`]: super::Posting
    pub post_id: posting::Id,

    /// Email address of the technician having declined the [`Posting`].
    ///
    /// [`Posting`]: super::Posting
    pub technician_email: technician::Email,

    /// [`DateTime`] when the [`Posting`] was declined.
    ///
    /// [`DateTime`]: common::DateTime
    pub declined_at: DeclineDateTime,
}

/// [`DateTime`] of a [`Posting`] declining.
///
/// [`DateTime`]: common::DateTime
/// [`Posting`]: super::Posting
pub type DeclineDateTime = DateTimeOf<(Decline, unit::Decline)>;
