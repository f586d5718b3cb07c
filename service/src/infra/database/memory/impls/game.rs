//! [`Game`]-related [`Database`] implementations.

use common::operations::{Allocate, By, Delete, Insert, Lock, Select, Update};
use itertools::Itertools as _;
use tracerr::Traced;

use crate::{
    domain::{game, Game},
    infra::{
        database::{
            self,
            memory::{Connection, Error},
            Memory,
        },
        Database,
    },
    read,
};

use super::{fuzzy_matches, paginate};

impl<C> Database<Allocate<game::Id>> for Memory<C>
where
    C: Connection,
{
    type Ok = game::Id;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Allocate<game::Id>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(|s| {
            s.sequences.games += 1;
            Ok(game::Id::new(s.sequences.games)
                .expect("sequence starts from 1"))
        })
        .await
    }
}

impl<C> Database<Select<By<Option<Game>, game::Id>>> for Memory<C>
where
    C: Connection,
{
    type Ok = Option<Game>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Game>, game::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.read(|s| s.games.get(&id).cloned()).await
    }
}

impl<C> Database<Select<By<Vec<game::Category>, ()>>> for Memory<C>
where
    C: Connection,
{
    type Ok = Vec<game::Category>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<game::Category>, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.read(|s| {
            s.games
                .values()
                .map(|g| g.category.clone())
                .sorted()
                .dedup()
                .collect()
        })
        .await
    }
}

impl<C> Database<Insert<Game>> for Memory<C>
where
    C: Connection,
    Self: Database<Update<Game>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(game): Insert<Game>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(game)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Game>> for Memory<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(game): Update<Game>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(|s| {
            _ = s.games.insert(game.id, game);
            Ok(())
        })
        .await
    }
}

impl<C> Database<Delete<By<Game, game::Id>>> for Memory<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Game, game::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.write(|s| {
            if s.borrowings.values().any(|b| b.game_id == id) {
                return Err(Error::ForeignKeyViolation(
                    "borrowings_game_id_fkey",
                ));
            }
            s.alerts.retain(|_, a| a.game_id != id);
            _ = s.games.remove(&id);
            Ok(())
        })
        .await
    }
}

impl<C> Database<Lock<By<Game, game::Id>>> for Memory<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Game, game::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Writers are serialized already.
        Ok(())
    }
}

impl<C> Database<Select<By<read::game::list::Page, read::game::list::Selector>>>
    for Memory<C>
where
    C: Connection,
{
    type Ok = read::game::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::game::list::Page, read::game::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::game::list::Selector { arguments, filter } =
            by.into_inner();
        self.read(|s| {
            paginate(&s.games, &arguments, |g| matches(g, &filter))
        })
        .await
    }
}

impl<C>
    Database<
        Select<By<read::game::list::TotalCount, read::game::list::Filter>>,
    > for Memory<C>
where
    C: Connection,
{
    type Ok = read::game::list::TotalCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::game::list::TotalCount, read::game::list::Filter>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let filter = by.into_inner();
        self.read(|s| {
            let count =
                s.games.values().filter(|g| matches(g, &filter)).count();
            i32::try_from(count).unwrap_or(i32::MAX).into()
        })
        .await
    }
}

/// Checks whether the provided [`Game`] matches the given filter.
fn matches(game: &Game, filter: &read::game::list::Filter) -> bool {
    let read::game::list::Filter {
        name,
        category,
        is_available,
    } = filter;
    name.as_ref()
        .map_or(true, |n| fuzzy_matches(game.name.as_ref(), n))
        && category.as_ref().map_or(true, |c| &game.category == c)
        && is_available.map_or(true, |a| game.is_available == a)
}
