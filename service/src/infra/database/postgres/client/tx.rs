//! [`Tx`] client definitions.

use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard};
use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{
    self,
    postgres::{self, connection, Connection},
};

use super::NonTx;

/// Transactional Postgres database client.
///
/// The transaction itself is opened on the first operation only. A [`Tx`]
/// never touched before [`Tx::commit()`] opens no transaction at all.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`connection::Pool`] to fall back to when the originating [`NonTx`]
    /// client holds no [`Connection`].
    pool: connection::Pool,

    /// Shared state of this client.
    state: Arc<State>,
}

/// Shared state of a [`Tx`] client.
#[derive(Debug)]
pub struct State {
    /// [`NonTx`] client whose [`Connection`] the transaction is started on,
    /// until it's consumed.
    origin: RwLock<Option<NonTx>>,

    /// Lazily opened [`connection::Tx`].
    tx: Arc<RwLock<Option<connection::Tx>>>,
}

impl Tx {
    /// Creates a new [`Tx`] client from the provided [`NonTx`] client.
    #[must_use]
    pub fn from_non_tx(client: NonTx) -> Self {
        Self {
            pool: client.pool.clone(),
            state: Arc::new(State {
                origin: RwLock::new(Some(client)),
                tx: Arc::new(RwLock::new(None)),
            }),
        }
    }

    /// Returns the transactional [`Connection`] of this [`Tx`] client,
    /// opening the transaction if none is opened yet.
    ///
    /// The transaction reuses the [`Connection`] held by the originating
    /// [`NonTx`] client when possible, and checks a fresh one out of the
    /// [`connection::Pool`] otherwise.
    async fn connection(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::Tx>, Traced<database::Error>>
    {
        {
            let opened = self.state.tx.read().await;
            if opened.is_some() {
                return Ok(RwLockReadGuard::map(opened, |conn| {
                    conn.as_ref().expect("checked above")
                }));
            }
        }

        let mut slot = self.state.tx.write().await;
        if slot.is_none() {
            let conn = match self.reuse_origin_connection().await {
                Some(conn) => conn,
                None => self
                    .pool
                    .get()
                    .await
                    .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                    .map_err(tracerr::map_from)?,
            };

            *slot = Some(
                connection::Tx::from_non_tx(conn)
                    .await
                    .map_err(tracerr::wrap!())?,
            );
        }

        Ok(RwLockReadGuard::map(slot.downgrade(), |conn| {
            conn.as_ref().expect("filled above")
        }))
    }

    /// Consumes the originating [`NonTx`] client and takes over its
    /// [`Connection`], if it still holds one.
    async fn reuse_origin_connection(&self) -> Option<connection::NonTx> {
        if self.state.origin.read().await.is_none() {
            return None;
        }

        let origin = self.state.origin.write().await.take()?;
        origin.take_connection().await
    }

    /// Commits the transaction of this [`Tx`] client.
    ///
    /// # Errors
    ///
    /// If committing the transaction fails.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        match self.state.tx.write().await.take() {
            Some(tx) => tx.commit().await.map_err(tracerr::wrap!()),
            // No operation touched this client, so no transaction was opened.
            None => Ok(()),
        }
    }
}

impl Connection for Tx {
    async fn query<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .query(stmt, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn query_opt<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .query_opt(stmt, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn exec<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .exec(stmt, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn batch_exec(
        &self,
        query: &str,
    ) -> Result<(), Traced<database::Error>> {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .batch_exec(query)
            .await
            .map_err(tracerr::wrap!())
    }
}
