//! [`Command`] for adding a new [`Game`] to the catalog.

use common::{
    operations::{Allocate, Commit, Insert, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{game, Game},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for adding a new [`Game`] to the catalog.
#[derive(Clone, Debug)]
pub struct AddGame {
    /// [`game::Name`] of a new [`Game`].
    pub name: game::Name,

    /// [`game::Description`] of a new [`Game`].
    pub description: game::Description,

    /// [`game::Category`] of a new [`Game`].
    pub category: game::Category,

    /// [`game::Condition`] of a new [`Game`].
    pub condition: game::Condition,
}

impl<Db> Command<AddGame> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Allocate<game::Id>,
            Ok = game::Id,
            Err = Traced<database::Error>,
        > + Database<Insert<Game>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Game;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: AddGame) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AddGame {
            name,
            description,
            category,
            condition,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let game = Game {
            id: tx
                .execute(Allocate::new())
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?,
            name,
            description,
            category,
            condition,
            entered_at: DateTime::now().coerce(),
            is_available: true,
        };

        tx.execute(Insert(game.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(game)
    }
}

/// Error of [`AddGame`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::fixture,
        domain::game,
        query::{self, Query as _},
    };

    #[tokio::test]
    async fn adds_available_game() {
        let svc = fixture::service();

        let g = fixture::game(&svc, "Chess").await;

        assert!(g.is_available);
        assert_eq!(g.condition, game::Condition::Good);
        let found = svc
            .execute(query::game::ById::by(g.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.name.to_string(), "Chess");
        assert_eq!(found.category.to_string(), "Strategy");
    }
}
