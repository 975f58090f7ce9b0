//! [`Posting`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Lock, Select, Update},
    Money,
};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{posting, Posting},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Extracts a [`Posting`] out of the provided [`Row`].
fn from_row(row: &Row) -> Posting {
    Posting {
        id: row.get("id"),
        dealer_email: row.get("dealer_email"),
        description: row.get("description"),
        location: row.get("location"),
        offer_amount: Money {
            amount: row.get("offer_amount"),
            currency: row.get("offer_currency"),
        },
        vin: row.get("vin"),
        lot_number: row.get("lot_number"),
        status: row.get("status"),
        technician_email: row.get("technician_email"),
        technician_name: row.get("technician_name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        accepted_at: row.get("accepted_at"),
        expected_completion_at: row.get("expected_completion_at"),
    }
}

/// Columns of the `postings` table, in the [`from_row`] order.
const COLUMNS: &str = "\
    id, dealer_email, description, location, \
    offer_amount, offer_currency, \
    vin, lot_number, status, \
    technician_email, technician_name, \
    created_at, updated_at, accepted_at, expected_completion_at";

impl<C> Database<Select<By<Option<Posting>, posting::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Posting>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Posting>, posting::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: posting::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM postings \
             WHERE id = $1::UUID \
             LIMIT 1",
        );
        self.query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.as_ref().map(from_row))
    }
}

impl<C> Database<Insert<Posting>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Posting>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(posting): Insert<Posting>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(posting))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Posting>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(posting): Update<Posting>,
    ) -> Result<Self::Ok, Self::Err> {
        let Posting {
            id,
            dealer_email,
            description,
            location,
            offer_amount: Money {
                amount: offer_amount,
                currency: offer_currency,
            },
            vin,
            lot_number,
            status,
            technician_email,
            technician_name,
            created_at,
            updated_at,
            accepted_at,
            expected_completion_at,
        } = posting;

        const SQL: &str = "\
            INSERT INTO postings (\
                id, dealer_email, description, location, \
                offer_amount, offer_currency, \
                vin, lot_number, status, \
                technician_email, technician_name, \
                created_at, updated_at, accepted_at, expected_completion_at \
            ) VALUES (\
                $1::UUID, $2::VARCHAR, $3::VARCHAR, $4::VARCHAR, \
                $5::NUMERIC, $6::INT2, \
                $7::VARCHAR, $8::VARCHAR, $9::INT2, \
                $10::VARCHAR, $11::VARCHAR, \
                $12::TIMESTAMPTZ, $13::TIMESTAMPTZ, \
                $14::TIMESTAMPTZ, $15::TIMESTAMPTZ \
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET description = EXCLUDED.description, \
                location = EXCLUDED.location, \
                offer_amount = EXCLUDED.offer_amount, \
                offer_currency = EXCLUDED.offer_currency, \
                vin = EXCLUDED.vin, \
                lot_number = EXCLUDED.lot_number, \
                status = EXCLUDED.status, \
                technician_email = EXCLUDED.technician_email, \
                technician_name = EXCLUDED.technician_name, \
                updated_at = EXCLUDED.updated_at, \
                accepted_at = EXCLUDED.accepted_at, \
                expected_completion_at = EXCLUDED.expected_completion_at";
        self.exec(
            SQL,
            &[
                &id,
                &dealer_email,
                &description,
                &location,
                &offer_amount,
                &offer_currency,
                &vin,
                &lot_number,
                &status,
                &technician_email,
                &technician_name,
                &created_at,
                &updated_at,
                &accepted_at,
                &expected_completion_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Posting, posting::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Posting, posting::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: posting::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO postings_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO NOTHING";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<read::posting::Feed, read::posting::Limit>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::posting::Feed;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::posting::Feed, read::posting::Limit>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let limit: read::posting::Limit = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM postings \
             WHERE status = $1::INT2 \
             ORDER BY created_at DESC \
             LIMIT $2::INT8",
        );
        self.query(&sql, &[&posting::Status::Pending, &limit])
            .await
            .map_err(tracerr::wrap!())
            .map(|rows| {
                read::posting::Feed(
                    rows.iter().map(from_row).collect(),
                )
            })
    }
}
