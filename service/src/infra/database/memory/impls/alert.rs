//! [`Alert`]-related [`Database`] implementations.

use common::operations::{Allocate, By, Delete, Insert, Lock, Select, Update};
use tracerr::Traced;

use crate::{
    domain::{alert, Alert},
    infra::{
        database::{
            self,
            memory::{Connection, Error, State},
            Memory,
        },
        Database,
    },
    read::{
        self,
        alert::{Resolved, Unread},
    },
};

use super::paginate;

impl<C> Database<Allocate<alert::Id>> for Memory<C>
where
    C: Connection,
{
    type Ok = alert::Id;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Allocate<alert::Id>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(|s| {
            s.sequences.alerts += 1;
            Ok(alert::Id::new(s.sequences.alerts)
                .expect("sequence starts from 1"))
        })
        .await
    }
}

impl<C> Database<Select<By<Option<Alert>, alert::Id>>> for Memory<C>
where
    C: Connection,
{
    type Ok = Option<Alert>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Alert>, alert::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.read(|s| s.alerts.get(&id).cloned()).await
    }
}

impl<C> Database<Select<By<Option<Unread<Alert>>, alert::Subject>>>
    for Memory<C>
where
    C: Connection,
{
    type Ok = Option<Unread<Alert>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Unread<Alert>>, alert::Subject>>,
    ) -> Result<Self::Ok, Self::Err> {
        let subject = by.into_inner();
        self.read(|s| {
            s.alerts
                .values()
                .find(|a| !a.is_read && a.subject() == subject)
                .cloned()
                .map(Unread)
        })
        .await
    }
}

impl<C> Database<Select<By<Vec<Alert>, read::alert::list::Filter>>>
    for Memory<C>
where
    C: Connection,
{
    type Ok = Vec<Alert>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Alert>, read::alert::list::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let filter = by.into_inner();
        self.read(|s| {
            s.alerts
                .values()
                .filter(|a| matches(a, &filter))
                .cloned()
                .collect()
        })
        .await
    }
}

impl<C> Database<Insert<Alert>> for Memory<C>
where
    C: Connection,
    Self: Database<Update<Alert>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(alert): Insert<Alert>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(alert)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Alert>> for Memory<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(alert): Update<Alert>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(|s| {
            if !s.users.contains_key(&alert.user_id) {
                return Err(Error::ForeignKeyViolation("alerts_user_id_fkey"));
            }
            if !s.games.contains_key(&alert.game_id) {
                return Err(Error::ForeignKeyViolation("alerts_game_id_fkey"));
            }
            _ = s.alerts.insert(alert.id, alert);
            Ok(())
        })
        .await
    }
}

impl<C> Database<Delete<By<Alert, alert::Id>>> for Memory<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Alert, alert::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.write(|s| {
            _ = s.alerts.remove(&id);
            Ok(())
        })
        .await
    }
}

impl<C> Database<Delete<By<Alert, Resolved>>> for Memory<C>
where
    C: Connection,
{
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Delete<By<Alert, Resolved>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write(|s| {
            let state = &*s;
            let resolved = state
                .alerts
                .values()
                .filter(|a| is_resolved(state, a))
                .map(|a| a.id)
                .collect::<Vec<_>>();
            for id in &resolved {
                _ = s.alerts.remove(id);
            }
            Ok(u64::try_from(resolved.len()).unwrap_or(u64::MAX))
        })
        .await
    }
}

impl<C> Database<Lock<By<Alert, alert::Id>>> for Memory<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Alert, alert::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Writers are serialized already.
        Ok(())
    }
}

impl<C>
    Database<Select<By<read::alert::list::Page, read::alert::list::Selector>>>
    for Memory<C>
where
    C: Connection,
{
    type Ok = read::alert::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::alert::list::Page, read::alert::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::alert::list::Selector { arguments, filter } =
            by.into_inner();
        self.read(|s| {
            paginate(&s.alerts, &arguments, |a| matches(a, &filter))
        })
        .await
    }
}

impl<C>
    Database<
        Select<By<read::alert::list::TotalCount, read::alert::list::Filter>>,
    > for Memory<C>
where
    C: Connection,
{
    type Ok = read::alert::list::TotalCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::alert::list::TotalCount, read::alert::list::Filter>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let filter = by.into_inner();
        self.read(|s| {
            let count =
                s.alerts.values().filter(|a| matches(a, &filter)).count();
            i32::try_from(count).unwrap_or(i32::MAX).into()
        })
        .await
    }
}

/// Checks whether the provided [`Alert`] is generated automatically and has
/// no open [`Borrowing`] of its game by its user anymore.
///
/// [`Borrowing`]: crate::domain::Borrowing
fn is_resolved(state: &State, alert: &Alert) -> bool {
    alert.kind.is_automatic()
        && !state.borrowings.values().any(|b| {
            b.user_id == alert.user_id
                && b.game_id == alert.game_id
                && !b.is_returned()
        })
}

/// Checks whether the provided [`Alert`] matches the given filter.
fn matches(alert: &Alert, filter: &read::alert::list::Filter) -> bool {
    let read::alert::list::Filter {
        user_id,
        game_id,
        kind,
        is_read,
    } = *filter;
    user_id.map_or(true, |id| alert.user_id == id)
        && game_id.map_or(true, |id| alert.game_id == id)
        && kind.map_or(true, |k| alert.kind == k)
        && is_read.map_or(true, |r| alert.is_read == r)
}
