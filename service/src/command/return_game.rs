//! [`Command`] for returning a borrowed [`Game`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{borrowing, game, Borrowing, Game},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for returning a borrowed [`Game`].
///
/// Closes the [`Borrowing`] and makes the [`Game`] available again within a
/// single transaction. The stored [`Borrowing::is_overdue`] flag is kept
/// as is.
#[derive(Clone, Copy, Debug)]
pub struct ReturnGame {
    /// ID of the [`Borrowing`] to close.
    pub borrowing_id: borrowing::Id,
}

impl<Db> Command<ReturnGame> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Borrowing, borrowing::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Borrowing>, borrowing::Id>>,
            Ok = Option<Borrowing>,
            Err = Traced<database::Error>,
        > + Database<Lock<By<Game, game::Id>>, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Game>, game::Id>>,
            Ok = Option<Game>,
            Err = Traced<database::Error>,
        > + Database<Update<Borrowing>, Err = Traced<database::Error>>
        + Database<Update<Game>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Borrowing;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        ReturnGame { borrowing_id }: ReturnGame,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Borrowing, _>::new(borrowing_id)))
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

        tx.execute(Lock(By::<Game, _>::new(borrowing.game_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut game = tx
            .execute(Select(By::<Option<Game>, _>::new(borrowing.game_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::GameNotExists(borrowing.game_id))
            .map_err(tracerr::wrap!())?;

        borrowing.returned_at = Some(DateTime::now().coerce());
        tx.execute(Update(borrowing))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        game.is_available = true;
        tx.execute(Update(game))
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

/// Error of [`ReturnGame`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Borrowing`] has been returned already.
    #[display("`Borrowing(id: {_0})` has already been returned")]
    AlreadyReturned(#[error(not(source))] borrowing::Id),

    /// [`Borrowing`] with the provided ID does not exist.
    #[display("`Borrowing(id: {_0})` does not exist")]
    BorrowingNotExists(#[error(not(source))] borrowing::Id),

    /// [`Game`] of the [`Borrowing`] does not exist.
    #[display("`Game(id: {_0})` does not exist")]
    GameNotExists(#[error(not(source))] game::Id),
}

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::{
        command::{fixture, BorrowGame},
        domain::{borrowing, Game},
        infra::Memory,
        query::{self, CanUserBorrow, Query as _},
        Service,
    };

    use super::{Command as _, ExecutionError as E, ReturnGame};

    async fn game_of(svc: &Service<Memory>, game: &Game) -> Game {
        svc.execute(query::game::ById::by(game.id))
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn borrow_and_return_round_trip() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let g = fixture::game(&svc, "Chess").await;

        let b = svc
            .execute(BorrowGame {
                user_id: u.id,
                game_id: g.id,
                due_at: (DateTime::now() + fixture::DAY * 14).coerce(),
            })
            .await
            .unwrap();
        assert!(!game_of(&svc, &g).await.is_available);

        let returned = svc
            .execute(ReturnGame {
                borrowing_id: b.id,
            })
            .await
            .unwrap();
        assert!(returned.is_returned());
        assert!(game_of(&svc, &g).await.is_available);

        let err = svc
            .execute(ReturnGame {
                borrowing_id: b.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::AlreadyReturned(_)), "{err}");
    }

    #[tokio::test]
    async fn restores_eligibility_of_overdue_user() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let g = fixture::game(&svc, "Chess").await;
        let now = DateTime::now();
        let b = fixture::lend(
            &svc,
            &u,
            &g,
            now - fixture::DAY * 5,
            now - fixture::DAY * 2,
        )
        .await;
        assert!(svc.execute(CanUserBorrow { user_id: u.id }).await.is_err());

        let returned = svc
            .execute(ReturnGame {
                borrowing_id: b.id,
            })
            .await
            .unwrap();

        assert!(!returned.is_overdue_at(DateTime::now()));
        assert!(svc.execute(CanUserBorrow { user_id: u.id }).await.is_ok());
    }

    #[tokio::test]
    async fn fails_for_unknown_borrowing() {
        let svc = fixture::service();

        let err = svc
            .execute(ReturnGame {
                borrowing_id: borrowing::Id::new(5).unwrap(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::BorrowingNotExists(_)), "{err}");
    }
}
