//! [`Command`] for editing a [`Game`] in the catalog.

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{game, Game},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for editing a [`Game`] in the catalog.
///
/// [`None`] fields are left untouched. [`Game::is_available`] is never
/// changed here, as it follows the borrowings only.
#[derive(Clone, Debug)]
pub struct UpdateGame {
    /// ID of the [`Game`] to edit.
    pub game_id: game::Id,

    /// New [`game::Name`] of the [`Game`].
    pub name: Option<game::Name>,

    /// New [`game::Description`] of the [`Game`].
    pub description: Option<game::Description>,

    /// New [`game::Category`] of the [`Game`].
    pub category: Option<game::Category>,

    /// New [`game::Condition`] of the [`Game`].
    pub condition: Option<game::Condition>,
}

impl<Db> Command<UpdateGame> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Game, game::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Game>, game::Id>>,
            Ok = Option<Game>,
            Err = Traced<database::Error>,
        > + Database<Update<Game>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Game;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: UpdateGame) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateGame {
            game_id,
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

        if let Some(name) = name {
            game.name = name;
        }
        if let Some(description) = description {
            game.description = description;
        }
        if let Some(category) = category {
            game.category = category;
        }
        if let Some(condition) = condition {
            game.condition = condition;
        }

        tx.execute(Update(game.clone()))
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

/// Error of [`UpdateGame`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Game`] with the provided ID does not exist.
    #[display("`Game(id: {_0})` does not exist")]
    GameNotExists(#[error(not(source))] game::Id),
}

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::{command::fixture, domain::game};

    use super::{Command as _, ExecutionError as E, UpdateGame};

    #[tokio::test]
    async fn edits_catalog_fields() {
        let svc = fixture::service();
        let g = fixture::game(&svc, "Chess").await;

        let updated = svc
            .execute(UpdateGame {
                game_id: g.id,
                name: None,
                description: None,
                category: Some(game::Category::new("Classic").unwrap()),
                condition: Some(game::Condition::Fair),
            })
            .await
            .unwrap();

        assert_eq!(updated.name, g.name);
        assert_eq!(updated.category.to_string(), "Classic");
        assert_eq!(updated.condition, game::Condition::Fair);
    }

    #[tokio::test]
    async fn keeps_availability_of_borrowed_game() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let g = fixture::game(&svc, "Chess").await;
        let now = DateTime::now();
        _ = fixture::lend(&svc, &u, &g, now, now + fixture::DAY).await;

        let updated = svc
            .execute(UpdateGame {
                game_id: g.id,
                name: Some(game::Name::new("Chess 2").unwrap()),
                description: None,
                category: None,
                condition: None,
            })
            .await
            .unwrap();

        assert!(!updated.is_available);
    }

    #[tokio::test]
    async fn fails_for_unknown_game() {
        let svc = fixture::service();

        let err = svc
            .execute(UpdateGame {
                game_id: game::Id::new(7).unwrap(),
                name: None,
                description: None,
                category: None,
                condition: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::GameNotExists(_)), "{err}");
    }
}
