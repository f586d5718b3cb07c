//! [`Command`] for deleting a [`User`].

use common::operations::{
    By, Commit, Delete, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::{Alert, Borrowing};
use crate::{
    domain::{user, User},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for deleting a [`User`] along with their [`Alert`]s.
///
/// A [`User`] referenced by any [`Borrowing`] is kept as a part of the
/// borrowing history.
#[derive(Clone, Copy, Debug)]
pub struct DeleteUser {
    /// ID of the [`User`] to delete.
    pub user_id: user::Id,
}

impl<Db> Command<DeleteUser> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<User, user::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<
                By<
                    read::borrowing::list::TotalCount,
                    read::borrowing::list::Filter,
                >,
            >,
            Ok = read::borrowing::list::TotalCount,
            Err = Traced<database::Error>,
        > + Database<Delete<By<User, user::Id>>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        DeleteUser { user_id }: DeleteUser,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        _ = tx
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;

        let borrowings = tx
            .execute(Select(By::<read::borrowing::list::TotalCount, _>::new(
                read::borrowing::list::Filter {
                    user_id: Some(user_id),
                    ..read::borrowing::list::Filter::default()
                },
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if i32::from(borrowings) > 0 {
            return Err(tracerr::new!(E::UserHasBorrowings(user_id)));
        }

        tx.execute(Delete(By::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(())
    }
}

/// Error of [`DeleteUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`User`] is referenced by [`Borrowing`]s.
    #[display("`User(id: {_0})` has borrowing history")]
    UserHasBorrowings(#[error(not(source))] user::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::{
        command::{fixture, CreateCustomAlert},
        domain::{alert, user},
        query::{self, Query as _},
    };

    use super::{Command as _, DeleteUser, ExecutionError as E};

    #[tokio::test]
    async fn deletes_user_with_alerts() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let g = fixture::game(&svc, "Chess").await;
        let a = svc
            .execute(CreateCustomAlert {
                user_id: u.id,
                game_id: g.id,
                kind: alert::Kind::Custom,
                message: alert::Message::new("Welcome!").unwrap(),
            })
            .await
            .unwrap();

        svc.execute(DeleteUser { user_id: u.id }).await.unwrap();

        let user = svc.execute(query::user::ById::by(u.id)).await.unwrap();
        assert!(user.is_none());
        let alert = svc.execute(query::alert::ById::by(a.id)).await.unwrap();
        assert!(alert.is_none());
    }

    #[tokio::test]
    async fn keeps_user_with_borrowing_history() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let g = fixture::game(&svc, "Chess").await;
        let now = DateTime::now();
        _ = fixture::lend(&svc, &u, &g, now, now + fixture::DAY).await;

        let err = svc.execute(DeleteUser { user_id: u.id }).await.unwrap_err();

        assert!(matches!(err.as_ref(), E::UserHasBorrowings(_)), "{err}");
    }

    #[tokio::test]
    async fn fails_for_unknown_user() {
        let svc = fixture::service();

        let err = svc
            .execute(DeleteUser {
                user_id: user::Id::new(3).unwrap(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::UserNotExists(_)), "{err}");
    }
}
