//! [`Command`] for flagging overdue [`Borrowing`]s.

use std::ops::Range;

use common::{
    operations::{By, Commit, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{borrowing, Borrowing},
    infra::{database, Database},
    read::borrowing::Open,
    Service,
};

use super::Command;

/// [`Command`] for writing the stored [`Borrowing::is_overdue`] flag of every
/// open [`Borrowing`] past its due date.
///
/// Never scheduled automatically. Returns the number of newly flagged
/// [`Borrowing`]s.
#[derive(Clone, Copy, Debug)]
pub struct MarkOverdueBorrowings;

impl<Db> Command<MarkOverdueBorrowings> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Vec<Open<Borrowing>>, Range<borrowing::DueDateTime>>>,
            Ok = Vec<Open<Borrowing>>,
            Err = Traced<database::Error>,
        > + Database<Update<Borrowing>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = usize;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        _: MarkOverdueBorrowings,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let now = DateTime::now().coerce();
        let overdue = tx
            .execute(Select(By::new(borrowing::DueDateTime::UNIX_EPOCH..now)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut count = 0;
        for Open(mut borrowing) in overdue {
            if borrowing.is_overdue {
                continue;
            }
            borrowing.is_overdue = true;
            tx.execute(Update(borrowing))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            count += 1;
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(count)
    }
}

/// Error of [`MarkOverdueBorrowings`] [`Command`] execution.
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
        command::fixture,
        query::{self, Query as _},
    };

    use super::{Command as _, MarkOverdueBorrowings};

    #[tokio::test]
    async fn flags_only_past_due_open_borrowings() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let g1 = fixture::game(&svc, "Chess").await;
        let g2 = fixture::game(&svc, "Go").await;
        let now = DateTime::now();
        let late = fixture::lend(
            &svc,
            &u,
            &g1,
            now - fixture::DAY * 9,
            now - fixture::DAY * 2,
        )
        .await;
        let fresh =
            fixture::lend(&svc, &u, &g2, now, now + fixture::DAY * 3).await;

        let count = svc.execute(MarkOverdueBorrowings).await.unwrap();
        assert_eq!(count, 1);
        let again = svc.execute(MarkOverdueBorrowings).await.unwrap();
        assert_eq!(again, 0);

        let late = svc
            .execute(query::borrowing::ById::by(late.id))
            .await
            .unwrap()
            .unwrap();
        assert!(late.is_overdue);
        let fresh = svc
            .execute(query::borrowing::ById::by(fresh.id))
            .await
            .unwrap()
            .unwrap();
        assert!(!fresh.is_overdue);
    }
}
