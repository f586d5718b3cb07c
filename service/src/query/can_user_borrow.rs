//! [`CanUserBorrow`] definition.

use common::{
    operations::{By, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::User;
use crate::{
    domain::{borrowing, user, Borrowing},
    infra::{database, Database},
    read::borrowing::Open,
    Query, Service,
};

/// [`Query`] deciding whether a [`User`] may start a new [`Borrowing`].
///
/// A [`User`] is eligible unless any of their not returned [`Borrowing`]s is
/// past its due date. The overdue state is always recomputed, regardless of
/// the stored [`Borrowing::is_overdue`] flag.
#[derive(Clone, Copy, Debug)]
pub struct CanUserBorrow {
    /// ID of the [`User`] to check.
    pub user_id: user::Id,
}

impl<Db> Query<CanUserBorrow> for Service<Db>
where
    Db: Database<
        Select<By<Vec<Open<Borrowing>>, user::Id>>,
        Ok = Vec<Open<Borrowing>>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        CanUserBorrow { user_id }: CanUserBorrow,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let now = DateTime::now();
        let overdue = self
            .database()
            .execute(Select(By::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .into_iter()
            .filter(|Open(b)| b.is_overdue_at(now))
            .map(|Open(b)| b.id)
            .collect::<Vec<_>>();

        if overdue.is_empty() {
            Ok(())
        } else {
            Err(tracerr::new!(E::OverdueBorrowings(user_id, overdue)))
        }
    }
}

/// Error of [`CanUserBorrow`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`User`] has overdue [`Borrowing`]s.
    #[display("`User(id: {_0})` has overdue items: {_1:?}")]
    OverdueBorrowings(
        #[error(not(source))] user::Id,
        #[error(not(source))] Vec<borrowing::Id>,
    ),
}

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::{
        command::{
            borrow_game, fixture, BorrowGame, GenerateOverdueAlerts,
            MarkOverdueBorrowings, ReturnGame,
        },
        domain::alert,
        query::{self, Query as _},
        read, Command as _,
    };

    use super::{CanUserBorrow, ExecutionError as E};

    #[tokio::test]
    async fn user_without_borrowings_is_eligible() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;

        assert!(svc.execute(CanUserBorrow { user_id: u.id }).await.is_ok());
    }

    #[tokio::test]
    async fn recomputes_overdue_regardless_of_stored_flag() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let g = fixture::game(&svc, "Chess").await;
        let now = DateTime::now();
        let b = fixture::lend(
            &svc,
            &u,
            &g,
            now - fixture::DAY * 3,
            now - fixture::DAY,
        )
        .await;
        assert!(!b.is_overdue);

        let err = svc
            .execute(CanUserBorrow { user_id: u.id })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::OverdueBorrowings(..)), "{err}");
    }

    #[tokio::test]
    async fn overdue_borrowing_lifecycle() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let g = fixture::game(&svc, "Chess").await;
        let other = fixture::game(&svc, "Go").await;
        let now = DateTime::now();
        let b = fixture::lend(
            &svc,
            &u,
            &g,
            now - fixture::DAY * 7,
            now - fixture::DAY * 2,
        )
        .await;

        assert_eq!(svc.execute(MarkOverdueBorrowings).await.unwrap(), 1);
        assert_eq!(svc.execute(GenerateOverdueAlerts).await.unwrap(), 1);
        let overdue = svc
            .execute(query::alerts::TotalCount::by(read::alert::list::Filter {
                user_id: Some(u.id),
                game_id: Some(g.id),
                kind: Some(alert::Kind::Overdue),
                is_read: None,
            }))
            .await
            .unwrap();
        assert_eq!(i32::from(overdue), 1);
        assert!(svc.execute(CanUserBorrow { user_id: u.id }).await.is_err());
        let err = svc
            .execute(BorrowGame {
                user_id: u.id,
                game_id: other.id,
                due_at: (now + fixture::DAY).coerce(),
            })
            .await
            .unwrap_err();
        assert!(
            matches!(
                err.as_ref(),
                borrow_game::ExecutionError::UserHasOverdueBorrowings(..),
            ),
            "{err}",
        );

        _ = svc
            .execute(ReturnGame {
                borrowing_id: b.id,
            })
            .await
            .unwrap();

        assert!(svc.execute(CanUserBorrow { user_id: u.id }).await.is_ok());
    }
}
