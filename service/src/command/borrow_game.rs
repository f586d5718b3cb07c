//! [`Command`] for lending a [`Game`] to a [`User`].

use common::{
    operations::{
        Allocate, By, Commit, Insert, Lock, Select, Transact, Transacted,
        Update,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{borrowing, game, user, Borrowing, Game, User},
    infra::{database, Database},
    query::{can_user_borrow, CanUserBorrow},
    Query, Service,
};

use super::Command;

/// [`Command`] for lending a [`Game`] to a [`User`].
///
/// Creates an open [`Borrowing`] and makes the [`Game`] unavailable within a
/// single transaction.
#[derive(Clone, Copy, Debug)]
pub struct BorrowGame {
    /// ID of the borrowing [`User`].
    pub user_id: user::Id,

    /// ID of the [`Game`] to borrow.
    pub game_id: game::Id,

    /// [`DateTime`] when the [`Game`] must be returned.
    pub due_at: borrowing::DueDateTime,
}

impl<Db> Command<BorrowGame> for Service<Db>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Game, game::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Game>, game::Id>>,
            Ok = Option<Game>,
            Err = Traced<database::Error>,
        > + Database<
            Allocate<borrowing::Id>,
            Ok = borrowing::Id,
            Err = Traced<database::Error>,
        > + Database<Insert<Borrowing>, Err = Traced<database::Error>>
        + Database<Update<Game>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Self: Query<
        CanUserBorrow,
        Ok = (),
        Err = Traced<can_user_borrow::ExecutionError>,
    >,
{
    type Ok = Borrowing;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: BorrowGame) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let BorrowGame {
            user_id,
            game_id,
            due_at,
        } = cmd;

        let now = DateTime::now();
        if due_at <= now.coerce() {
            return Err(tracerr::new!(E::DueDateNotInFuture(due_at)));
        }

        _ = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;

        self.execute(CanUserBorrow { user_id })
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Concurrent borrowers of the same game must queue here.
        tx.execute(Lock(By::new(game_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut game = tx
            .execute(Select(By::<Option<Game>, _>::new(game_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::GameNotExists(game_id))
            .map_err(tracerr::wrap!())?;
        if !game.is_available {
            return Err(tracerr::new!(E::GameNotAvailable(game_id)));
        }

        game.is_available = false;
        tx.execute(Update(game))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let borrowing = Borrowing {
            id: tx
                .execute(Allocate::new())
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?,
            user_id,
            game_id,
            borrowed_at: now.coerce(),
            due_at,
            returned_at: None,
            is_overdue: false,
        };
        tx.execute(Insert(borrowing))
            .await
            .map_err(|e| {
                if e.as_ref().is_unique_violation(Some(
                    database::BORROWINGS_OPEN_GAME_KEY,
                )) {
                    tracerr::new!(E::GameNotAvailable(game_id))
                } else {
                    tracerr::map_from_and_wrap!(=> E)(e)
                }
            })
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(borrowing)
    }
}

/// Error of [`BorrowGame`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Due date is not in the future.
    #[display("Due date `{_0:?}` is not in the future")]
    DueDateNotInFuture(#[error(not(source))] borrowing::DueDateTime),

    /// [`Game`] is borrowed already.
    #[display("`Game(id: {_0})` is not available")]
    GameNotAvailable(#[error(not(source))] game::Id),

    /// [`Game`] with the provided ID does not exist.
    #[display("`Game(id: {_0})` does not exist")]
    GameNotExists(#[error(not(source))] game::Id),

    /// [`User`] has overdue [`Borrowing`]s.
    #[display("`User(id: {_0})` has overdue items: {_1:?}")]
    UserHasOverdueBorrowings(
        #[error(not(source))] user::Id,
        #[error(not(source))] Vec<borrowing::Id>,
    ),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}

impl From<can_user_borrow::ExecutionError> for ExecutionError {
    fn from(e: can_user_borrow::ExecutionError) -> Self {
        use can_user_borrow::ExecutionError as E;

        match e {
            E::Db(e) => Self::Db(e),
            E::OverdueBorrowings(user_id, ids) => {
                Self::UserHasOverdueBorrowings(user_id, ids)
            }
        }
    }
}

#[cfg(test)]
mod spec {
    use common::{
        operations::{By, Commit, Select, Transact, Update},
        DateTime,
    };

    use crate::{
        command::fixture,
        domain::{game, user, Game},
        infra::Database as _,
        query::{self, Query as _},
        read,
    };

    use super::{BorrowGame, Command as _, ExecutionError as E};

    #[tokio::test]
    async fn makes_game_unavailable() {
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

        assert!(!b.is_returned());
        assert!(!b.is_overdue);
        let game = svc
            .execute(query::game::ById::by(g.id))
            .await
            .unwrap()
            .unwrap();
        assert!(!game.is_available);
    }

    #[tokio::test]
    async fn rejects_unavailable_game() {
        let svc = fixture::service();
        let u1 = fixture::user(&svc, "a@x.com").await;
        let u2 = fixture::user(&svc, "b@x.com").await;
        let g = fixture::game(&svc, "Chess").await;
        let due_at = (DateTime::now() + fixture::DAY).coerce();
        _ = svc
            .execute(BorrowGame {
                user_id: u1.id,
                game_id: g.id,
                due_at,
            })
            .await
            .unwrap();

        let err = svc
            .execute(BorrowGame {
                user_id: u2.id,
                game_id: g.id,
                due_at,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::GameNotAvailable(_)), "{err}");
    }

    #[tokio::test]
    async fn rejects_past_due_date() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let g = fixture::game(&svc, "Chess").await;

        let err = svc
            .execute(BorrowGame {
                user_id: u.id,
                game_id: g.id,
                due_at: (DateTime::now() - fixture::DAY).coerce(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::DueDateNotInFuture(_)), "{err}");
    }

    #[tokio::test]
    async fn accepts_far_due_date() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let g = fixture::game(&svc, "Chess").await;
        let due_at = (DateTime::now() + fixture::DAY * 100).coerce();

        let b = svc
            .execute(BorrowGame {
                user_id: u.id,
                game_id: g.id,
                due_at,
            })
            .await
            .unwrap();

        assert_eq!(b.due_at, due_at);
        assert!(!b.is_returned());
    }

    #[tokio::test]
    async fn rejects_user_with_overdue_borrowing() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let g1 = fixture::game(&svc, "Chess").await;
        let g2 = fixture::game(&svc, "Go").await;
        let now = DateTime::now();
        let overdue = fixture::lend(
            &svc,
            &u,
            &g1,
            now - fixture::DAY * 10,
            now - fixture::DAY * 2,
        )
        .await;

        let err = svc
            .execute(BorrowGame {
                user_id: u.id,
                game_id: g2.id,
                due_at: (now + fixture::DAY).coerce(),
            })
            .await
            .unwrap_err();

        match err.as_ref() {
            E::UserHasOverdueBorrowings(id, ids) => {
                assert_eq!(*id, u.id);
                assert_eq!(ids, &[overdue.id]);
            }
            _ => panic!("unexpected error: {err}"),
        }
        let game = svc
            .execute(query::game::ById::by(g2.id))
            .await
            .unwrap()
            .unwrap();
        assert!(game.is_available);
    }

    #[tokio::test]
    async fn fails_for_unknown_user_or_game() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let g = fixture::game(&svc, "Chess").await;
        let due_at = (DateTime::now() + fixture::DAY).coerce();

        let err = svc
            .execute(BorrowGame {
                user_id: user::Id::new(99).unwrap(),
                game_id: g.id,
                due_at,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::UserNotExists(_)), "{err}");

        let err = svc
            .execute(BorrowGame {
                user_id: u.id,
                game_id: game::Id::new(99).unwrap(),
                due_at,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::GameNotExists(_)), "{err}");
    }

    #[tokio::test]
    async fn lets_only_one_of_concurrent_borrowers_win() {
        let svc = fixture::service();
        let u1 = fixture::user(&svc, "a@x.com").await;
        let u2 = fixture::user(&svc, "b@x.com").await;
        let g = fixture::game(&svc, "Chess").await;
        let due_at = (DateTime::now() + fixture::DAY * 7).coerce();

        let (r1, r2) = tokio::join!(
            svc.execute(BorrowGame {
                user_id: u1.id,
                game_id: g.id,
                due_at,
            }),
            svc.execute(BorrowGame {
                user_id: u2.id,
                game_id: g.id,
                due_at,
            }),
        );

        let (ok, err) = match (r1, r2) {
            (Ok(b), Err(e)) | (Err(e), Ok(b)) => (b, e),
            (r1, r2) => panic!("exactly one must win: {r1:?}, {r2:?}"),
        };
        assert_eq!(ok.game_id, g.id);
        assert!(matches!(err.as_ref(), E::GameNotAvailable(_)), "{err}");

        let open = svc
            .execute(query::borrowings::TotalCount::by(
                read::borrowing::list::Filter {
                    game_id: Some(g.id),
                    ..Default::default()
                },
            ))
            .await
            .unwrap();
        assert_eq!(i32::from(open), 1);
    }

    #[tokio::test]
    async fn rolls_back_availability_when_insert_fails() {
        let svc = fixture::service();
        let u1 = fixture::user(&svc, "a@x.com").await;
        let u2 = fixture::user(&svc, "b@x.com").await;
        let g = fixture::game(&svc, "Chess").await;
        let now = DateTime::now();
        _ = fixture::lend(&svc, &u1, &g, now, now + fixture::DAY).await;
        // Corrupt the availability flag, so only the unique index guards.
        let tx = svc.database().execute(Transact).await.unwrap();
        tx.execute(Update(Game {
            is_available: true,
            ..g.clone()
        }))
        .await
        .unwrap();
        tx.execute(Commit).await.unwrap();

        let err = svc
            .execute(BorrowGame {
                user_id: u2.id,
                game_id: g.id,
                due_at: (now + fixture::DAY).coerce(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::GameNotAvailable(_)), "{err}");
        let game = svc
            .database()
            .execute(Select(By::<Option<Game>, _>::new(g.id)))
            .await
            .unwrap()
            .unwrap();
        assert!(game.is_available, "game update must be rolled back");
    }
}
