//! [`Query`] collection related to a single [`Borrowing`].

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    domain::{borrowing, game, user, Borrowing, Game, User},
    infra::{database, Database},
    Query, Service,
};

use super::DatabaseQuery;

/// Queries a [`Borrowing`] by its [`borrowing::Id`].
pub type ById = DatabaseQuery<By<Option<Borrowing>, borrowing::Id>>;

/// [`Query`] for a [`Borrowing`] along with its [`User`] and [`Game`].
#[derive(Clone, Copy, Debug)]
pub struct Details {
    /// ID of the [`Borrowing`] to look up.
    pub borrowing_id: borrowing::Id,
}

/// Output of the [`Details`] [`Query`].
#[derive(Clone, Debug)]
pub struct Output {
    /// Looked up [`Borrowing`].
    pub borrowing: Borrowing,

    /// [`User`] who borrowed the [`Game`].
    pub user: User,

    /// Borrowed [`Game`].
    pub game: Game,
}

impl<Db> Query<Details> for Service<Db>
where
    Db: Database<
            Select<By<Option<Borrowing>, borrowing::Id>>,
            Ok = Option<Borrowing>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Game>, game::Id>>,
            Ok = Option<Game>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Option<Output>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Details { borrowing_id }: Details,
    ) -> Result<Self::Ok, Self::Err> {
        let Some(borrowing) = self
            .database()
            .execute(Select(By::<Option<Borrowing>, _>::new(borrowing_id)))
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };

        let user = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(borrowing.user_id)))
            .await
            .map_err(tracerr::wrap!())?;
        let game = self
            .database()
            .execute(Select(By::<Option<Game>, _>::new(borrowing.game_id)))
            .await
            .map_err(tracerr::wrap!())?;

        // Both are guarded by foreign keys.
        Ok(user.zip(game).map(|(user, game)| Output {
            borrowing,
            user,
            game,
        }))
    }
}

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::{command::fixture, domain::borrowing, query::Query as _};

    use super::Details;

    #[tokio::test]
    async fn joins_user_and_game() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let g = fixture::game(&svc, "Chess").await;
        let now = DateTime::now();
        let b = fixture::lend(&svc, &u, &g, now, now + fixture::DAY).await;

        let details = svc
            .execute(Details {
                borrowing_id: b.id,
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(details.borrowing.id, b.id);
        assert_eq!(details.user.email, u.email);
        assert_eq!(details.game.name, g.name);

        let missing = svc
            .execute(Details {
                borrowing_id: borrowing::Id::new(100).unwrap(),
            })
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
