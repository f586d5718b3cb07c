//! [`User`]-related [`Database`] implementations.

use common::operations::{Allocate, By, Delete, Insert, Lock, Select, Update};
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{
        database::{
            self,
            memory::{Connection, Error},
            Memory, USERS_EMAIL_KEY,
        },
        Database,
    },
    read,
};

use super::{fuzzy_matches, paginate};

impl<C> Database<Allocate<user::Id>> for Memory<C>
where
    C: Connection,
{
    type Ok = user::Id;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Allocate<user::Id>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(|s| {
            s.sequences.users += 1;
            Ok(user::Id::new(s.sequences.users)
                .expect("sequence starts from 1"))
        })
        .await
    }
}

impl<C> Database<Select<By<Option<User>, user::Id>>> for Memory<C>
where
    C: Connection,
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.read(|s| s.users.get(&id).cloned()).await
    }
}

impl<'l, C> Database<Select<By<Option<User>, &'l user::Email>>> for Memory<C>
where
    C: Connection,
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'l user::Email>>,
    ) -> Result<Self::Ok, Self::Err> {
        let email = by.into_inner();
        self.read(|s| s.users.values().find(|u| &u.email == email).cloned())
            .await
    }
}

impl<C> Database<Insert<User>> for Memory<C>
where
    C: Connection,
    Self: Database<Update<User>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(user)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<User>> for Memory<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(user): Update<User>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(|s| {
            if s.users
                .values()
                .any(|u| u.id != user.id && u.email == user.email)
            {
                return Err(Error::UniqueViolation(USERS_EMAIL_KEY));
            }
            _ = s.users.insert(user.id, user);
            Ok(())
        })
        .await
    }
}

impl<C> Database<Delete<By<User, user::Id>>> for Memory<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.write(|s| {
            if s.borrowings.values().any(|b| b.user_id == id) {
                return Err(Error::ForeignKeyViolation(
                    "borrowings_user_id_fkey",
                ));
            }
            s.alerts.retain(|_, a| a.user_id != id);
            _ = s.users.remove(&id);
            Ok(())
        })
        .await
    }
}

impl<C> Database<Lock<By<User, user::Id>>> for Memory<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Writers are serialized already.
        Ok(())
    }
}

impl<C> Database<Select<By<read::user::list::Page, read::user::list::Selector>>>
    for Memory<C>
where
    C: Connection,
{
    type Ok = read::user::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::user::list::Page, read::user::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::user::list::Selector { arguments, filter } =
            by.into_inner();
        self.read(|s| {
            paginate(&s.users, &arguments, |u| matches(u, &filter))
        })
        .await
    }
}

impl<C>
    Database<
        Select<By<read::user::list::TotalCount, read::user::list::Filter>>,
    > for Memory<C>
where
    C: Connection,
{
    type Ok = read::user::list::TotalCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::user::list::TotalCount, read::user::list::Filter>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let filter = by.into_inner();
        self.read(|s| {
            let count =
                s.users.values().filter(|u| matches(u, &filter)).count();
            i32::try_from(count).unwrap_or(i32::MAX).into()
        })
        .await
    }
}

/// Checks whether the provided [`User`] matches the given filter.
fn matches(user: &User, filter: &read::user::list::Filter) -> bool {
    let read::user::list::Filter { name, is_active } = filter;
    name.as_ref()
        .map_or(true, |n| fuzzy_matches(user.name.as_ref(), n))
        && is_active.map_or(true, |a| user.is_active == a)
}
