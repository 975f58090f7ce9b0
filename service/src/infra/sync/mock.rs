//! In-memory [`Peer`] for tests.

use std::sync::{Arc, Mutex};

use common::operations::Notify;
use tracerr::Traced;

use super::{Error, Peer, Resolution, Submission, Withdrawal};

/// In-memory [`Peer`] recording delivered notifications.
#[derive(Clone, Debug, Default)]
pub(crate) struct Mock {
    /// Log of delivered notifications.
    delivered: Arc<Mutex<Vec<String>>>,

    /// Indicator whether every notification should fail.
    failing: bool,
}

impl Mock {
    /// Creates a new [`Mock`] peer accepting all notifications.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Creates a new [`Mock`] peer failing all notifications.
    pub(crate) fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Returns the log of delivered notifications.
    pub(crate) fn delivered(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }

    /// Records the provided notification, or fails it.
    fn deliver(&self, entry: String) -> Result<(), Traced<Error>> {
        if self.failing {
            return Err(tracerr::new!(Error::Status(
                reqwest::StatusCode::GATEWAY_TIMEOUT,
            )));
        }
        self.delivered.lock().unwrap().push(entry);
        Ok(())
    }
}

impl Peer<Notify<Submission>> for Mock {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Notify(m): Notify<Submission>,
    ) -> Result<Self::Ok, Self::Err> {
        self.deliver(format!(
            "submission {} {}",
            m.post_id, m.technician_email,
        ))
    }
}

impl Peer<Notify<Withdrawal>> for Mock {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Notify(m): Notify<Withdrawal>,
    ) -> Result<Self::Ok, Self::Err> {
        self.deliver(format!(
            "withdrawal {} {}",
            m.post_id, m.technician_email,
        ))
    }
}

impl Peer<Notify<Resolution>> for Mock {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Notify(m): Notify<Resolution>,
    ) -> Result<Self::Ok, Self::Err> {
        self.deliver(format!(
            "resolution {} {} {}",
            m.post_id, m.technician_email, m.status,
        ))
    }
}
