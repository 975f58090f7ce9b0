//! [`Acceptance`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Select},
    Money,
};
use tracerr::Traced;

use crate::{
    domain::{posting, Acceptance, Decline},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Insert<Acceptance>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(acceptance): Insert<Acceptance>,
    ) -> Result<Self::Ok, Self::Err> {
        let Acceptance {
            post_id,
            technician_email,
            offer_amount: Money {
                amount: offer_amount,
                currency: offer_currency,
            },
            accepted_at,
        } = acceptance;

        // A duplicate insert trips the `accepted_posts_pkey` constraint,
        // which the acceptance arbitration relies upon.
        const SQL: &str = "\
            INSERT INTO accepted_posts (\
                post_id, technician_email, \
                offer_amount, offer_currency, \
                accepted_at \
            ) VALUES (\
                $1::UUID, $2::VARCHAR, \
                $3::NUMERIC, $4::INT2, \
                $5::TIMESTAMPTZ \
            )";
        self.exec(
            SQL,
            &[
                &post_id,
                &technician_email,
                &offer_amount,
                &offer_currency,
                &accepted_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Select<By<Option<Acceptance>, posting::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Acceptance>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Acceptance>, posting::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let post_id: posting::Id = by.into_inner();

        const SQL: &str = "\
            SELECT post_id, technician_email, \
                   offer_amount, offer_currency, \
                   accepted_at \
            FROM accepted_posts \
            WHERE post_id = $1::UUID \
            LIMIT 1";
        self.query_opt(SQL, &[&post_id])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| {
                row.map(|row| Acceptance {
                    post_id: row.get("post_id"),
                    technician_email: row.get("technician_email"),
                    offer_amount: Money {
                        amount: row.get("offer_amount"),
                        currency: row.get("offer_currency"),
                    },
                    accepted_at: row.get("accepted_at"),
                })
            })
    }
}

impl<C> Database<Insert<Decline>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(decline): Insert<Decline>,
    ) -> Result<Self::Ok, Self::Err> {
        let Decline {
            post_id,
            technician_email,
            declined_at,
        } = decline;

        // Declining twice is a no-op, not an error.
        const SQL: &str = "\
            INSERT INTO declined_posts (\
                post_id, technician_email, declined_at \
            ) VALUES (\
                $1::UUID, $2::VARCHAR, $3::TIMESTAMPTZ \
            ) \
            ON CONFLICT (post_id, technician_email) DO NOTHING";
        self.exec(SQL, &[&post_id, &technician_email, &declined_at])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
