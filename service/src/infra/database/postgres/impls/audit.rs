//! [`DealerAction`]-related [`Database`] implementations.

use common::operations::Insert;
use tracerr::Traced;

use crate::{
    domain::DealerAction,
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Insert<DealerAction>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(action): Insert<DealerAction>,
    ) -> Result<Self::Ok, Self::Err> {
        let DealerAction {
            id,
            offer_id,
            kind,
            notes,
            created_at,
        } = action;

        const SQL: &str = "\
            INSERT INTO dealer_counter_offer_actions (\
                id, offer_id, kind, notes, created_at \
            ) VALUES (\
                $1::UUID, $2::UUID, $3::INT2, $4::VARCHAR, $5::TIMESTAMPTZ \
            )";
        self.exec(SQL, &[&id, &offer_id, &kind, &notes, &created_at])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
