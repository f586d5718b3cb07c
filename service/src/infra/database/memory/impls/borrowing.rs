//! [`Borrowing`]-related [`Database`] implementations.

use std::ops::Range;

use common::{
    operations::{Allocate, By, Insert, Lock, Select, Update},
    DateTime,
};
use tracerr::Traced;

use crate::{
    domain::{borrowing, game, user, Borrowing},
    infra::{
        database::{
            self,
            memory::{Connection, Error},
            Memory, BORROWINGS_OPEN_GAME_KEY,
        },
        Database,
    },
    read::{self, borrowing::Open},
};

use super::paginate;

impl<C> Database<Allocate<borrowing::Id>> for Memory<C>
where
    C: Connection,
{
    type Ok = borrowing::Id;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Allocate<borrowing::Id>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(|s| {
            s.sequences.borrowings += 1;
            Ok(borrowing::Id::new(s.sequences.borrowings)
                .expect("sequence starts from 1"))
        })
        .await
    }
}

impl<C> Database<Select<By<Option<Borrowing>, borrowing::Id>>> for Memory<C>
where
    C: Connection,
{
    type Ok = Option<Borrowing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Borrowing>, borrowing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.read(|s| s.borrowings.get(&id).copied()).await
    }
}

impl<C> Database<Select<By<Option<Open<Borrowing>>, game::Id>>> for Memory<C>
where
    C: Connection,
{
    type Ok = Option<Open<Borrowing>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Open<Borrowing>>, game::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let game_id = by.into_inner();
        self.read(|s| {
            s.borrowings
                .values()
                .find(|b| b.game_id == game_id && !b.is_returned())
                .copied()
                .map(Open)
        })
        .await
    }
}

impl<C> Database<Select<By<Vec<Open<Borrowing>>, user::Id>>> for Memory<C>
where
    C: Connection,
{
    type Ok = Vec<Open<Borrowing>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Open<Borrowing>>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let user_id = by.into_inner();
        self.read(|s| {
            s.borrowings
                .values()
                .filter(|b| b.user_id == user_id && !b.is_returned())
                .copied()
                .map(Open)
                .collect()
        })
        .await
    }
}

impl<C>
    Database<Select<By<Vec<Open<Borrowing>>, Range<borrowing::DueDateTime>>>>
    for Memory<C>
where
    C: Connection,
{
    type Ok = Vec<Open<Borrowing>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<Open<Borrowing>>, Range<borrowing::DueDateTime>>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let range = by.into_inner();
        self.read(|s| {
            s.borrowings
                .values()
                .filter(|b| !b.is_returned() && range.contains(&b.due_at))
                .copied()
                .map(Open)
                .collect()
        })
        .await
    }
}

impl<C> Database<Insert<Borrowing>> for Memory<C>
where
    C: Connection,
    Self: Database<Update<Borrowing>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(borrowing): Insert<Borrowing>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(borrowing))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Borrowing>> for Memory<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(borrowing): Update<Borrowing>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(|s| {
            if !s.users.contains_key(&borrowing.user_id) {
                return Err(Error::ForeignKeyViolation(
                    "borrowings_user_id_fkey",
                ));
            }
            if !s.games.contains_key(&borrowing.game_id) {
                return Err(Error::ForeignKeyViolation(
                    "borrowings_game_id_fkey",
                ));
            }
            if !borrowing.is_returned()
                && s.borrowings.values().any(|b| {
                    b.id != borrowing.id
                        && b.game_id == borrowing.game_id
                        && !b.is_returned()
                })
            {
                return Err(Error::UniqueViolation(BORROWINGS_OPEN_GAME_KEY));
            }
            _ = s.borrowings.insert(borrowing.id, borrowing);
            Ok(())
        })
        .await
    }
}

impl<C> Database<Lock<By<Borrowing, borrowing::Id>>> for Memory<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Borrowing, borrowing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Writers are serialized already.
        Ok(())
    }
}

impl<C>
    Database<
        Select<
            By<read::borrowing::list::Page, read::borrowing::list::Selector>,
        >,
    > for Memory<C>
where
    C: Connection,
{
    type Ok = read::borrowing::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::borrowing::list::Page, read::borrowing::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::borrowing::list::Selector { arguments, filter } =
            by.into_inner();
        let now = DateTime::now();
        self.read(|s| {
            paginate(&s.borrowings, &arguments, |b| matches(b, &filter, now))
        })
        .await
    }
}

impl<C>
    Database<
        Select<
            By<
                read::borrowing::list::TotalCount,
                read::borrowing::list::Filter,
            >,
        >,
    > for Memory<C>
where
    C: Connection,
{
    type Ok = read::borrowing::list::TotalCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<
                read::borrowing::list::TotalCount,
                read::borrowing::list::Filter,
            >,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let filter = by.into_inner();
        let now = DateTime::now();
        self.read(|s| {
            let count = s
                .borrowings
                .values()
                .filter(|b| matches(b, &filter, now))
                .count();
            i32::try_from(count).unwrap_or(i32::MAX).into()
        })
        .await
    }
}

/// Checks whether the provided [`Borrowing`] matches the given filter at the
/// given moment.
fn matches(
    borrowing: &Borrowing,
    filter: &read::borrowing::list::Filter,
    now: DateTime,
) -> bool {
    use read::borrowing::list::Status;

    let read::borrowing::list::Filter {
        user_id,
        game_id,
        status,
    } = *filter;
    user_id.map_or(true, |id| borrowing.user_id == id)
        && game_id.map_or(true, |id| borrowing.game_id == id)
        && status.map_or(true, |st| match st {
            Status::Open => !borrowing.is_returned(),
            Status::Overdue => borrowing.is_overdue_at(now),
            Status::Returned => borrowing.is_returned(),
        })
}
