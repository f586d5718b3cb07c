//! [`Command`] for removing [`Alert`]s of resolved [`Borrowing`]s.

use common::operations::{By, Commit, Delete, Transact, Transacted};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::{alert, Borrowing};
use crate::{
    domain::Alert,
    infra::{database, Database},
    read::alert::Resolved,
    Service,
};

use super::Command;

/// [`Command`] for removing generated [`Alert`]s which no open [`Borrowing`]
/// corresponds to anymore.
///
/// [`alert::Kind::Custom`] [`Alert`]s are never removed. Returns the number of
/// removed [`Alert`]s.
#[derive(Clone, Copy, Debug)]
pub struct CleanupResolvedAlerts;

impl<Db> Command<CleanupResolvedAlerts> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Delete<By<Alert, Resolved>>,
            Ok = u64,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = u64;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        _: CleanupResolvedAlerts,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let removed = tx
            .execute(Delete(By::new(Resolved)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(removed)
    }
}

/// Error of [`CleanupResolvedAlerts`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),
}

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::{
        command::{
            fixture, CreateCustomAlert, GenerateOverdueAlerts, ReturnGame,
        },
        domain::alert,
        query::{self, Query as _},
        read,
    };

    use super::{CleanupResolvedAlerts, Command as _};

    #[tokio::test]
    async fn removes_only_generated_alerts_of_returned_games() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let returned = fixture::game(&svc, "Chess").await;
        let kept = fixture::game(&svc, "Go").await;
        let now = DateTime::now();
        let b = fixture::lend(
            &svc,
            &u,
            &returned,
            now - fixture::DAY * 4,
            now - fixture::DAY,
        )
        .await;
        _ = fixture::lend(
            &svc,
            &u,
            &kept,
            now - fixture::DAY * 4,
            now - fixture::DAY,
        )
        .await;
        assert_eq!(svc.execute(GenerateOverdueAlerts).await.unwrap(), 2);
        _ = svc
            .execute(CreateCustomAlert {
                user_id: u.id,
                game_id: returned.id,
                kind: alert::Kind::Custom,
                message: alert::Message::new("Thanks!").unwrap(),
            })
            .await
            .unwrap();
        _ = svc
            .execute(ReturnGame {
                borrowing_id: b.id,
            })
            .await
            .unwrap();

        let removed = svc.execute(CleanupResolvedAlerts).await.unwrap();

        assert_eq!(removed, 1);
        let left = svc
            .execute(query::alerts::TotalCount::by(
                read::alert::list::Filter::default(),
            ))
            .await
            .unwrap();
        assert_eq!(i32::from(left), 2);
    }
}
