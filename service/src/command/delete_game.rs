//! [`Command`] for deleting a [`Game`].

use common::operations::{
    By, Commit, Delete, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::{Alert, Borrowing};
use crate::{
    domain::{game, Game},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for removing a [`Game`] from the catalog.
///
/// [`Alert`]s about the [`Game`] are removed too. A [`Game`] that was ever
/// borrowed stays in the catalog.
#[derive(Clone, Copy, Debug)]
pub struct DeleteGame {
    /// ID of the [`Game`] to delete.
    pub game_id: game::Id,
}

impl<Db> Command<DeleteGame> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Game, game::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Game>, game::Id>>,
            Ok = Option<Game>,
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
        > + Database<Delete<By<Game, game::Id>>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        DeleteGame { game_id }: DeleteGame,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::new(game_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        _ = tx
            .execute(Select(By::<Option<Game>, _>::new(game_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::GameNotExists(game_id))
            .map_err(tracerr::wrap!())?;

        let borrowings = tx
            .execute(Select(By::<read::borrowing::list::TotalCount, _>::new(
                read::borrowing::list::Filter {
                    game_id: Some(game_id),
                    ..read::borrowing::list::Filter::default()
                },
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if i32::from(borrowings) > 0 {
            return Err(tracerr::new!(E::GameHasBorrowings(game_id)));
        }

        tx.execute(Delete(By::new(game_id)))
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

/// Error of [`DeleteGame`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Game`] is referenced by [`Borrowing`]s.
    #[display("`Game(id: {_0})` has borrowing history")]
    GameHasBorrowings(#[error(not(source))] game::Id),

    /// [`Game`] with the provided ID does not exist.
    #[display("`Game(id: {_0})` does not exist")]
    GameNotExists(#[error(not(source))] game::Id),
}

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::{
        command::{fixture, ReturnGame},
        domain::game,
        query::{self, Query as _},
    };

    use super::{Command as _, DeleteGame, ExecutionError as E};

    #[tokio::test]
    async fn removes_never_borrowed_game() {
        let svc = fixture::service();
        let g = fixture::game(&svc, "Chess").await;

        svc.execute(DeleteGame { game_id: g.id }).await.unwrap();

        let game = svc.execute(query::game::ById::by(g.id)).await.unwrap();
        assert!(game.is_none());
    }

    #[tokio::test]
    async fn keeps_game_with_returned_borrowing() {
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

        let err = svc.execute(DeleteGame { game_id: g.id }).await.unwrap_err();

        assert!(matches!(err.as_ref(), E::GameHasBorrowings(_)), "{err}");
    }

    #[tokio::test]
    async fn fails_for_unknown_game() {
        let svc = fixture::service();

        let err = svc
            .execute(DeleteGame {
                game_id: game::Id::new(3).unwrap(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::GameNotExists(_)), "{err}");
    }
}
