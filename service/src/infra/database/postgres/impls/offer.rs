//! Counter-offer related [`Database`] implementations.

use common::{
    operations::{By, Insert, Lock, Select, Update},
    Money,
};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        offer::{self, Mirror},
        posting, technician, CounterOffer,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Extracts a [`CounterOffer`] out of the provided [`Row`].
fn from_row(row: &Row) -> CounterOffer {
    CounterOffer {
        id: row.get("id"),
        post_id: row.get("post_id"),
        technician_email: row.get("technician_email"),
        original_amount: Money {
            amount: row.get("original_amount"),
            currency: row.get("original_currency"),
        },
        requested_amount: Money {
            amount: row.get("requested_amount"),
            currency: row.get("requested_currency"),
        },
        reason: row.get("reason"),
        requested_at: row.get("requested_at"),
        expires_at: row.get("expires_at"),
        status: row.get("status"),
        responded_at: row.get("responded_at"),
        dealer_notes: row.get("dealer_notes"),
    }
}

/// Extracts a [`Mirror`] out of the provided [`Row`].
fn mirror_from_row(row: &Row) -> Mirror {
    Mirror {
        id: row.get("id"),
        peer_id: row.get("peer_id"),
        post_id: row.get("post_id"),
        technician_email: row.get("technician_email"),
        original_amount: Money {
            amount: row.get("original_amount"),
            currency: row.get("original_currency"),
        },
        requested_amount: Money {
            amount: row.get("requested_amount"),
            currency: row.get("requested_currency"),
        },
        reason: row.get("reason"),
        requested_at: row.get("requested_at"),
        expires_at: row.get("expires_at"),
        status: row.get("status"),
        responded_at: row.get("responded_at"),
    }
}

/// Columns of the `counter_offers` table, in the [`from_row`] order.
const COLUMNS: &str = "\
    id, post_id, technician_email, \
    original_amount, original_currency, \
    requested_amount, requested_currency, \
    reason, requested_at, expires_at, status, \
    responded_at, dealer_notes";

/// Columns of the `tech_counter_offers` table, in the [`mirror_from_row`]
/// order.
const MIRROR_COLUMNS: &str = "\
    id, peer_id, post_id, technician_email, \
    original_amount, original_currency, \
    requested_amount, requested_currency, \
    reason, requested_at, expires_at, status, \
    responded_at";

impl<C> Database<Insert<CounterOffer>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(offer): Insert<CounterOffer>,
    ) -> Result<Self::Ok, Self::Err> {
        let CounterOffer {
            id,
            post_id,
            technician_email,
            original_amount: Money {
                amount: original_amount,
                currency: original_currency,
            },
            requested_amount: Money {
                amount: requested_amount,
                currency: requested_currency,
            },
            reason,
            requested_at,
            expires_at,
            status,
            responded_at,
            dealer_notes,
        } = offer;

        // A second `PENDING` row per `(post_id, technician_email)` trips the
        // `counter_offers_pending_idx` partial unique index.
        const SQL: &str = "\
            INSERT INTO counter_offers (\
                id, post_id, technician_email, \
                original_amount, original_currency, \
                requested_amount, requested_currency, \
                reason, requested_at, expires_at, status, \
                responded_at, dealer_notes \
            ) VALUES (\
                $1::UUID, $2::UUID, $3::VARCHAR, \
                $4::NUMERIC, $5::INT2, \
                $6::NUMERIC, $7::INT2, \
                $8::VARCHAR, $9::TIMESTAMPTZ, $10::TIMESTAMPTZ, $11::INT2, \
                $12::TIMESTAMPTZ, $13::VARCHAR \
            )";
        self.exec(
            SQL,
            &[
                &id,
                &post_id,
                &technician_email,
                &original_amount,
                &original_currency,
                &requested_amount,
                &requested_currency,
                &reason,
                &requested_at,
                &expires_at,
                &status,
                &responded_at,
                &dealer_notes,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Select<By<Option<CounterOffer>, offer::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<CounterOffer>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<CounterOffer>, offer::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: offer::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM counter_offers \
             WHERE id = $1::UUID \
             LIMIT 1",
        );
        self.query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.as_ref().map(from_row))
    }
}

impl<C>
    Database<
        Select<By<Vec<read::offer::Pending<CounterOffer>>, posting::Id>>,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<read::offer::Pending<CounterOffer>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<read::offer::Pending<CounterOffer>>, posting::Id>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let post_id: posting::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM counter_offers \
             WHERE post_id = $1::UUID \
               AND status = $2::INT2 \
             ORDER BY requested_at ASC",
        );
        self.query(&sql, &[&post_id, &offer::Status::Pending])
            .await
            .map_err(tracerr::wrap!())
            .map(|rows| {
                rows.iter()
                    .map(|row| read::offer::Pending(from_row(row)))
                    .collect()
            })
    }
}

impl<C> Database<Select<By<Vec<CounterOffer>, posting::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<CounterOffer>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<CounterOffer>, posting::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let post_id: posting::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM counter_offers \
             WHERE post_id = $1::UUID \
             ORDER BY requested_at ASC",
        );
        self.query(&sql, &[&post_id])
            .await
            .map_err(tracerr::wrap!())
            .map(|rows| rows.iter().map(from_row).collect())
    }
}

impl<C>
    Database<
        Select<
            By<
                Option<read::offer::Pending<CounterOffer>>,
                (posting::Id, technician::Email),
            >,
        >,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<read::offer::Pending<CounterOffer>>;
    type Err = Traced<database::Error>;

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

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM counter_offers \
             WHERE post_id = $1::UUID \
               AND technician_email = $2::VARCHAR \
               AND status = $3::INT2 \
             LIMIT 1",
        );
        self.query_opt(
            &sql,
            &[&post_id, &technician_email, &offer::Status::Pending],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(|row| row.as_ref().map(|r| read::offer::Pending(from_row(r))))
    }
}

impl<C> Database<Update<read::offer::Pending<CounterOffer>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(pending): Update<read::offer::Pending<CounterOffer>>,
    ) -> Result<Self::Ok, Self::Err> {
        let CounterOffer {
            id,
            status,
            responded_at,
            dealer_notes,
            ..
        } = pending.into_inner();

        // Guarded transition: only a still `PENDING` row is touched, so
        // whichever transition lands first wins and the others see `false`.
        const SQL: &str = "\
            UPDATE counter_offers \
            SET status = $2::INT2, \
                responded_at = $3::TIMESTAMPTZ, \
                dealer_notes = $4::VARCHAR \
            WHERE id = $1::UUID \
              AND status = $5::INT2";
        self.exec(
            SQL,
            &[
                &id,
                &status,
                &responded_at,
                &dealer_notes,
                &offer::Status::Pending,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(|affected| affected > 0)
    }
}

impl<C> Database<Lock<By<CounterOffer, offer::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<CounterOffer, offer::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: offer::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO counter_offers_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO NOTHING";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Update<By<CounterOffer, offer::ExpirationDateTime>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(by): Update<By<CounterOffer, offer::ExpirationDateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let deadline: offer::ExpirationDateTime = by.into_inner();

        const SQL: &str = "\
            UPDATE counter_offers \
            SET status = $1::INT2 \
            WHERE status = $2::INT2 \
              AND expires_at <= $3::TIMESTAMPTZ";
        self.exec(
            SQL,
            &[&offer::Status::Expired, &offer::Status::Pending, &deadline],
        )
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Insert<Mirror>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(mirror): Insert<Mirror>,
    ) -> Result<Self::Ok, Self::Err> {
        let Mirror {
            id,
            peer_id,
            post_id,
            technician_email,
            original_amount: Money {
                amount: original_amount,
                currency: original_currency,
            },
            requested_amount: Money {
                amount: requested_amount,
                currency: requested_currency,
            },
            reason,
            requested_at,
            expires_at,
            status,
            responded_at,
        } = mirror;

        // A second `PENDING` row per `(post_id, technician_email)` trips the
        // `tech_counter_offers_pending_idx` partial unique index.
        const SQL: &str = "\
            INSERT INTO tech_counter_offers (\
                id, peer_id, post_id, technician_email, \
                original_amount, original_currency, \
                requested_amount, requested_currency, \
                reason, requested_at, expires_at, status, \
                responded_at \
            ) VALUES (\
                $1::UUID, $2::UUID, $3::UUID, $4::VARCHAR, \
                $5::NUMERIC, $6::INT2, \
                $7::NUMERIC, $8::INT2, \
                $9::VARCHAR, $10::TIMESTAMPTZ, $11::TIMESTAMPTZ, $12::INT2, \
                $13::TIMESTAMPTZ \
            )";
        self.exec(
            SQL,
            &[
                &id,
                &peer_id,
                &post_id,
                &technician_email,
                &original_amount,
                &original_currency,
                &requested_amount,
                &requested_currency,
                &reason,
                &requested_at,
                &expires_at,
                &status,
                &responded_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C>
    Database<
        Select<
            By<
                Option<read::offer::Pending<Mirror>>,
                (posting::Id, technician::Email),
            >,
        >,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<read::offer::Pending<Mirror>>;
    type Err = Traced<database::Error>;

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

        let sql = format!(
            "SELECT {MIRROR_COLUMNS} \
             FROM tech_counter_offers \
             WHERE post_id = $1::UUID \
               AND technician_email = $2::VARCHAR \
               AND status = $3::INT2 \
             LIMIT 1",
        );
        self.query_opt(
            &sql,
            &[&post_id, &technician_email, &offer::Status::Pending],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(|row| {
            row.as_ref().map(|r| read::offer::Pending(mirror_from_row(r)))
        })
    }
}

impl<C> Database<Update<read::offer::Pending<Mirror>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(pending): Update<read::offer::Pending<Mirror>>,
    ) -> Result<Self::Ok, Self::Err> {
        let Mirror {
            id,
            peer_id,
            status,
            responded_at,
            ..
        } = pending.into_inner();

        const SQL: &str = "\
            UPDATE tech_counter_offers \
            SET peer_id = $2::UUID, \
                status = $3::INT2, \
                responded_at = $4::TIMESTAMPTZ \
            WHERE id = $1::UUID \
              AND status = $5::INT2";
        self.exec(
            SQL,
            &[
                &id,
                &peer_id,
                &status,
                &responded_at,
                &offer::Status::Pending,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(|affected| affected > 0)
    }
}

impl<C> Database<Lock<By<Mirror, offer::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Mirror, offer::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: offer::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO tech_counter_offers_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO NOTHING";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Update<By<Mirror, offer::ExpirationDateTime>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(by): Update<By<Mirror, offer::ExpirationDateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let deadline: offer::ExpirationDateTime = by.into_inner();

        const SQL: &str = "\
            UPDATE tech_counter_offers \
            SET status = $1::INT2 \
            WHERE status = $2::INT2 \
              AND expires_at <= $3::TIMESTAMPTZ";
        self.exec(
            SQL,
            &[&offer::Status::Expired, &offer::Status::Pending, &deadline],
        )
        .await
        .map_err(tracerr::wrap!())
    }
}
