//! HTTP [`Peer`] client.

use std::time::Duration;

use common::operations::Notify;
use serde::Serialize;
use tracerr::Traced;

use super::{Error, Peer, Resolution, Submission, Withdrawal};

/// Configuration of an [`Http`] peer client.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the peer service.
    pub base_url: String,

    /// Timeout of a single notification request.
    pub timeout: Duration,
}

/// HTTP client notifying the peer service.
#[derive(Clone, Debug)]
pub struct Http {
    /// Base URL of the peer service, without a trailing slash.
    base_url: String,

    /// Underlying HTTP client.
    client: reqwest::Client,
}

impl Http {
    /// Creates a new [`Http`] peer client with the provided [`Config`].
    ///
    /// # Errors
    ///
    /// If failed to initialize the underlying HTTP client.
    pub fn new(conf: &Config) -> Result<Self, Traced<Error>> {
        let client = reqwest::Client::builder()
            .timeout(conf.timeout)
            .build()
            .map_err(tracerr::from_and_wrap!(=> Error))?;
        Ok(Self {
            base_url: conf.base_url.trim_end_matches('/').to_owned(),
            client,
        })
    }

    /// `POST`s the provided message to the given path of the peer service.
    async fn post<M>(
        &self,
        path: &str,
        message: &M,
    ) -> Result<(), Traced<Error>>
    where
        M: Serialize + Sync,
    {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(message)
            .send()
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(tracerr::new!(Error::Status(status)))
        }
    }
}

impl Peer<Notify<Submission>> for Http {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Notify(message): Notify<Submission>,
    ) -> Result<Self::Ok, Self::Err> {
        self.post("/counter-offers/submit", &message)
            .await
            .map_err(tracerr::wrap!())
    }
}

impl Peer<Notify<Withdrawal>> for Http {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Notify(message): Notify<Withdrawal>,
    ) -> Result<Self::Ok, Self::Err> {
        self.post("/counter-offers/withdraw", &message)
            .await
            .map_err(tracerr::wrap!())
    }
}

impl Peer<Notify<Resolution>> for Http {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Notify(message): Notify<Resolution>,
    ) -> Result<Self::Ok, Self::Err> {
        self.post("/tech/counter-offers/settle", &message)
            .await
            .map_err(tracerr::wrap!())
    }
}
