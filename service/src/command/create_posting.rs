//! [`Command`] for publishing a new [`Posting`].

use common::{operations::Insert, DateTime, Money};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{dealer, posting, Posting},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for publishing a new [`Posting`].
#[derive(Clone, Debug)]
pub struct CreatePosting {
    /// Email address of the dealer publishing the [`Posting`].
    pub dealer_email: dealer::Email,

    /// Description of the inspection job.
    pub description: posting::Description,

    /// Location of the vehicle to be inspected.
    pub location: posting::Location,

    /// Compensation offered for the job.
    pub offer_amount: Money,

    /// VIN of the vehicle, if known.
    pub vin: Option<posting::Vin>,

    /// Auction lot number of the vehicle, if any.
    pub lot_number: Option<posting::LotNumber>,

    /// [`DateTime`] when the inspection job is expected to be done.
    pub expected_completion_at: Option<posting::CompletionDateTime>,
}

impl<Db, P> Command<CreatePosting> for Service<Db, P>
where
    Db: Database<Insert<Posting>, Err = Traced<database::Error>>,
{
    type Ok = Posting;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreatePosting) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreatePosting {
            dealer_email,
            description,
            location,
            offer_amount,
            vin,
            lot_number,
            expected_completion_at,
        } = cmd;

        let now = DateTime::now();
        let posting = Posting {
            id: posting::Id::new(),
            dealer_email,
            description,
            location,
            offer_amount,
            vin,
            lot_number,
            status: posting::Status::Pending,
            technician_email: None,
            technician_name: None,
            created_at: now.coerce(),
            updated_at: now.coerce(),
            accepted_at: None,
            expected_completion_at,
        };
        self.database()
            .execute(Insert(posting.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(posting)
    }
}

/// Error of [`CreatePosting`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),
}
