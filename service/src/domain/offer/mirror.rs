//! [`Mirror`]ed counter-offer definitions.

use common::Money;

use crate::domain::{posting, technician};

use super::{ExpirationDateTime, RequestDateTime, ResponseDateTime, Status};

/// Local record of a [`CounterOffer`] kept by the technician-facing service.
///
/// The posting-facing service owns the canonical row, so a [`Mirror`] only
/// follows it: terminal statuses arrive over synchronization, and expiration
/// is swept locally by the same clock rules.
///
/// [`CounterOffer`]: super::CounterOffer
#[derive(Clone, Debug)]
pub struct Mirror {
    /// Unique ID of this [`Mirror`].
    pub id: super::Id,

    /// ID of the canonical counter-offer on the posting-facing service, once
    /// known.
    pub peer_id: Option<super::Id>,

    /// ID of the posting the mirrored counter-offer is proposed upon.
    pub post_id: posting::Id,

    /// Email address of the technician having proposed the counter-offer.
    pub technician_email: technician::Email,

    /// Compensation offered by the dealer at the proposal moment.
    pub original_amount: Money,

    /// Compensation requested by the technician instead.
    pub requested_amount: Money,

    /// Reasoning of the technician behind the proposal.
    pub reason: Option<super::Reason>,

    /// [`DateTime`] when the counter-offer was proposed.
    ///
    /// [`DateTime`]: common::DateTime
    pub requested_at: RequestDateTime,

    /// [`DateTime`] when the counter-offer stops awaiting a dealer response.
    ///
    /// [`DateTime`]: common::DateTime
    pub expires_at: ExpirationDateTime,

    /// Stored [`Status`] of the mirrored counter-offer.
    pub status: Status,

    /// [`DateTime`] when the dealer responded to the counter-offer.
    ///
    /// [`DateTime`]: common::DateTime
    pub responded_at: Option<ResponseDateTime>,
}

impl Mirror {
    /// Returns the effective [`Status`] of this [`Mirror`] at the present
    /// moment.
    ///
    /// Works the same way as [`CounterOffer::effective_status()`]: a
    /// [`Status::Pending`] row past its expiration [`DateTime`] reads as
    /// [`Status::Expired`].
    ///
    /// [`CounterOffer::effective_status()`]:
    /// super::CounterOffer::effective_status
    /// [`DateTime`]: common::DateTime
    #[must_use]
    pub fn effective_status(&self) -> Status {
        if self.status == Status::Pending
            && self.expires_at <= ExpirationDateTime::now()
        {
            Status::Expired
        } else {
            self.status
        }
    }
}
