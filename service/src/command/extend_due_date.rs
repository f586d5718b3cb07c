//! [`Command`] for moving the due date of a [`Borrowing`] forward.

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{borrowing, Borrowing},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for moving the due date of an open [`Borrowing`] forward.
///
/// The new due date is capped by [`Borrowing::extension_limit()`], which is
/// measured from [`Borrowing::borrowed_at`], so chained extensions can't go
/// beyond [`borrowing::MAX_TERM`].
#[derive(Clone, Copy, Debug)]
pub struct ExtendDueDate {
    /// ID of the [`Borrowing`] to extend.
    pub borrowing_id: borrowing::Id,

    /// New due date of the [`Borrowing`].
    pub due_at: borrowing::DueDateTime,
}

impl<Db> Command<ExtendDueDate> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Borrowing, borrowing::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Borrowing>, borrowing::Id>>,
            Ok = Option<Borrowing>,
            Err = Traced<database::Error>,
        > + Database<Update<Borrowing>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Borrowing;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        ExtendDueDate {
            borrowing_id,
            due_at,
        }: ExtendDueDate,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::new(borrowing_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut borrowing = tx
            .execute(Select(By::<Option<Borrowing>, _>::new(borrowing_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BorrowingNotExists(borrowing_id))
            .map_err(tracerr::wrap!())?;
        if borrowing.is_returned() {
            return Err(tracerr::new!(E::AlreadyReturned(borrowing_id)));
        }
        if due_at <= borrowing.due_at {
            return Err(tracerr::new!(E::DueDateNotExtended(borrowing.due_at)));
        }
        let limit = borrowing.extension_limit();
        if due_at > limit {
            return Err(tracerr::new!(E::ExtensionLimitExceeded(limit)));
        }

        borrowing.due_at = due_at;
        if !borrowing.is_overdue_at(DateTime::now()) {
            borrowing.is_overdue = false;
        }
        tx.execute(Update(borrowing))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(borrowing)
    }
}

/// Error of [`ExtendDueDate`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Borrowing`] has been returned already.
    #[display("`Borrowing(id: {_0})` is returned and cannot be extended")]
    AlreadyReturned(#[error(not(source))] borrowing::Id),

    /// [`Borrowing`] with the provided ID does not exist.
    #[display("`Borrowing(id: {_0})` does not exist")]
    BorrowingNotExists(#[error(not(source))] borrowing::Id),

    /// New due date is not after the current one.
    #[display("New due date must be after `{_0:?}`")]
    DueDateNotExtended(#[error(not(source))] borrowing::DueDateTime),

    /// New due date goes beyond [`borrowing::MAX_TERM`].
    #[display("Due date cannot exceed 90 days from borrowing: `{_0:?}`")]
    ExtensionLimitExceeded(#[error(not(source))] borrowing::DueDateTime),
}

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::{
        command::{fixture, MarkOverdueBorrowings, ReturnGame},
        domain::borrowing,
    };

    use super::{Command as _, ExecutionError as E, ExtendDueDate};

    #[tokio::test]
    async fn moves_due_date_forward() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let g = fixture::game(&svc, "Chess").await;
        let now = DateTime::now();
        let b = fixture::lend(&svc, &u, &g, now, now + fixture::DAY * 7).await;
        let due_at = (now + fixture::DAY * 21).coerce();

        let extended = svc
            .execute(ExtendDueDate {
                borrowing_id: b.id,
                due_at,
            })
            .await
            .unwrap();

        assert_eq!(extended.due_at, due_at);
        assert_eq!(extended.borrowed_at, b.borrowed_at);
    }

    #[tokio::test]
    async fn clears_stale_overdue_flag() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let g = fixture::game(&svc, "Chess").await;
        let now = DateTime::now();
        let b = fixture::lend(
            &svc,
            &u,
            &g,
            now - fixture::DAY * 10,
            now - fixture::DAY,
        )
        .await;
        _ = svc
            .execute(MarkOverdueBorrowings)
            .await
            .unwrap();

        let extended = svc
            .execute(ExtendDueDate {
                borrowing_id: b.id,
                due_at: (now + fixture::DAY).coerce(),
            })
            .await
            .unwrap();

        assert!(!extended.is_overdue);
    }

    #[tokio::test]
    async fn rejects_earlier_due_date() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let g = fixture::game(&svc, "Chess").await;
        let now = DateTime::now();
        let b = fixture::lend(&svc, &u, &g, now, now + fixture::DAY * 7).await;

        let err = svc
            .execute(ExtendDueDate {
                borrowing_id: b.id,
                due_at: (now + fixture::DAY * 3).coerce(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::DueDateNotExtended(_)), "{err}");
    }

    #[tokio::test]
    async fn caps_extension_from_borrow_date() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let g = fixture::game(&svc, "Chess").await;
        let borrowed_at = DateTime::now() - fixture::DAY * 30;
        let b = fixture::lend(
            &svc,
            &u,
            &g,
            borrowed_at,
            borrowed_at + fixture::DAY * 60,
        )
        .await;

        let err = svc
            .execute(ExtendDueDate {
                borrowing_id: b.id,
                due_at: (borrowed_at + borrowing::MAX_TERM + fixture::DAY)
                    .coerce(),
            })
            .await
            .unwrap_err();
        assert!(
            matches!(err.as_ref(), E::ExtensionLimitExceeded(_)),
            "{err}",
        );

        let extended = svc
            .execute(ExtendDueDate {
                borrowing_id: b.id,
                due_at: (borrowed_at + borrowing::MAX_TERM).coerce(),
            })
            .await
            .unwrap();
        assert_eq!(extended.due_at, b.extension_limit());
    }

    #[tokio::test]
    async fn rejects_returned_borrowing() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let g = fixture::game(&svc, "Chess").await;
        let now = DateTime::now();
        let b = fixture::lend(&svc, &u, &g, now, now + fixture::DAY).await;
        _ = svc
            .execute(ReturnGame {
                borrowing_id: b.id,
            })
            .await
            .unwrap();

        let err = svc
            .execute(ExtendDueDate {
                borrowing_id: b.id,
                due_at: (now + fixture::DAY * 2).coerce(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::AlreadyReturned(_)), "{err}");
    }
}
