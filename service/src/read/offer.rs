//! Read models of counter-offers.

use derive_more::Deref;

/// Counter-offer stored with the `PENDING` status.
///
/// Only reflects what the storage says: the wrapped value may still be past
/// its expiration and read as expired effectively.
#[derive(Clone, Debug, Deref)]
pub struct Pending<T>(pub T);

impl<T> Pending<T> {
    /// Unwraps this [`Pending`] into its inner value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}
