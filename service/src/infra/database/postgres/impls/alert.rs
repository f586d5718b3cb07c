//! [`Alert`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{Allocate, By, Delete, Insert, Lock, Select, Update};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{alert, Alert},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::{
        self,
        alert::{Resolved, Unread},
    },
};

impl<C> Database<Allocate<alert::Id>> for Postgres<C>
where
    C: Connection,
{
    type Ok = alert::Id;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Allocate<alert::Id>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "SELECT nextval('alerts_id_seq')::INT4";
        self.query_one(SQL, &[])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.get(0))
    }
}

impl<C, IDs> Database<Select<By<HashMap<alert::Id, Alert>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[alert::Id]>,
{
    type Ok = HashMap<alert::Id, Alert>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<alert::Id, Alert>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        let ids: &[alert::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        const SQL: &str = "\
            SELECT id, user_id, game_id, kind, message, created_at, is_read \
            FROM alerts \
            WHERE id = ANY($1::INT4[])";
        Ok(self
            .query(SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| {
                let a = from_row(row);
                (a.id, a)
            })
            .collect())
    }
}

impl<C> Database<Select<By<Option<Alert>, alert::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<alert::Id, Alert>, [alert::Id; 1]>>,
        Ok = HashMap<alert::Id, Alert>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Alert>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Alert>, alert::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<C> Database<Select<By<Option<Unread<Alert>>, alert::Subject>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Unread<Alert>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Unread<Alert>>, alert::Subject>>,
    ) -> Result<Self::Ok, Self::Err> {
        let alert::Subject {
            user_id,
            game_id,
            kind,
        } = by.into_inner();

        const SQL: &str = "\
            SELECT id, user_id, game_id, kind, message, created_at, is_read \
            FROM alerts \
            WHERE user_id = $1::INT4 \
              AND game_id = $2::INT4 \
              AND kind = $3::INT2 \
              AND NOT is_read \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&user_id, &game_id, &kind])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row)
            .map(Unread))
    }
}

impl<C> Database<Select<By<Vec<Alert>, read::alert::list::Filter>>>
    for Postgres<C>
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

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![];
        let sql = format!(
            "SELECT id, user_id, game_id, kind, message, created_at, \
                    is_read \
             FROM alerts \
             WHERE TRUE {} \
             ORDER BY id",
            filtering(&filter, &mut ps),
        );
        Ok(self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Alert>> for Postgres<C>
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

impl<C> Database<Update<Alert>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(alert): Update<Alert>,
    ) -> Result<Self::Ok, Self::Err> {
        let Alert {
            id,
            user_id,
            game_id,
            kind,
            message,
            created_at,
            is_read,
        } = alert;

        const SQL: &str = "\
            INSERT INTO alerts (id, user_id, game_id, kind, message, \
                                created_at, is_read) \
            VALUES (\
                $1::INT4, \
                $2::INT4, \
                $3::INT4, \
                $4::INT2, \
                $5::TEXT, \
                $6::TIMESTAMPTZ, \
                $7::BOOL\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET user_id = EXCLUDED.user_id, \
                game_id = EXCLUDED.game_id, \
                kind = EXCLUDED.kind, \
                message = EXCLUDED.message, \
                created_at = EXCLUDED.created_at, \
                is_read = EXCLUDED.is_read";
        self.exec(
            SQL,
            &[
                &id,
                &user_id,
                &game_id,
                &kind,
                &message,
                &created_at,
                &is_read,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Delete<By<Alert, alert::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Alert, alert::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: alert::Id = by.into_inner();

        const SQL: &str = "\
            DELETE FROM alerts \
            WHERE id = $1::INT4";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Delete<By<Alert, Resolved>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Delete<By<Alert, Resolved>>,
    ) -> Result<Self::Ok, Self::Err> {
        let automatic = [alert::Kind::Overdue, alert::Kind::Reminder];

        const SQL: &str = "\
            DELETE FROM alerts AS a \
            WHERE a.kind = ANY($1::INT2[]) \
              AND NOT EXISTS (\
                  SELECT 1 \
                  FROM borrowings AS b \
                  WHERE b.user_id = a.user_id \
                    AND b.game_id = a.game_id \
                    AND b.returned_at IS NULL\
              )";
        self.exec(SQL, &[&automatic.as_slice()])
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Lock<By<Alert, alert::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Alert, alert::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: alert::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM alerts \
            WHERE id = $1::INT4 \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C>
    Database<Select<By<read::alert::list::Page, read::alert::list::Selector>>>
    for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<alert::Id, Alert>, Vec<alert::Id>>>,
        Ok = HashMap<alert::Id, Alert>,
        Err = Traced<database::Error>,
    >,
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

        let limit =
            i32::try_from(arguments.limit()).unwrap_or(i32::MAX - 1) + 1;

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit];

        let cursor_idx = arguments.cursor().map(|c| {
            ps.push(c);
            ps.len()
        });
        let conditions = filtering(&filter, &mut ps);

        let sql = format!(
            "SELECT id \
             FROM alerts \
             WHERE TRUE \
                   {cursor} \
                   {conditions} \
             ORDER BY id {order} \
             LIMIT $1::INT4",
            cursor = cursor_idx.into_iter().format_with("", |idx, f| {
                let op = arguments.kind().operator();
                f(&format_args!("AND id {op} ${idx}::INT4"))
            }),
            order = arguments.kind().order().sql(),
        );
        let rows = self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?;

        let has_more = rows.len() > arguments.limit();
        let ids = rows
            .into_iter()
            .take(arguments.limit())
            .map(|row| row.get("id"))
            .collect::<Vec<alert::Id>>();
        let mut alerts = self
            .execute(Select(By::new(ids.clone())))
            .await
            .map_err(tracerr::wrap!())?;
        let edges = ids
            .into_iter()
            .filter_map(|id| alerts.remove(&id).map(|a| (id, a)));

        Ok(read::alert::list::Page::new(&arguments, edges, has_more))
    }
}

impl<C>
    Database<
        Select<By<read::alert::list::TotalCount, read::alert::list::Filter>>,
    > for Postgres<C>
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

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![];
        let sql = format!(
            "SELECT COUNT(*)::INT4 \
             FROM alerts \
             WHERE TRUE {}",
            filtering(&filter, &mut ps),
        );
        self.query_one(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.get::<_, i32>(0).into())
    }
}

/// Builds an [`Alert`] out of the provided [`Row`].
fn from_row(row: &Row) -> Alert {
    Alert {
        id: row.get("id"),
        user_id: row.get("user_id"),
        game_id: row.get("game_id"),
        kind: row.get("kind"),
        message: row.get("message"),
        created_at: row.get("created_at"),
        is_read: row.get("is_read"),
    }
}

/// Renders SQL conditions of the provided [`read::alert::list::Filter`],
/// pushing its parameters into `ps`.
fn filtering<'a>(
    filter: &'a read::alert::list::Filter,
    ps: &mut Vec<&'a (dyn ToSql + Sync)>,
) -> String {
    let read::alert::list::Filter {
        user_id,
        game_id,
        kind,
        is_read,
    } = filter;

    let mut conditions = vec![];
    if let Some(id) = user_id {
        ps.push(id);
        conditions.push(format!("AND user_id = ${}::INT4", ps.len()));
    }
    if let Some(id) = game_id {
        ps.push(id);
        conditions.push(format!("AND game_id = ${}::INT4", ps.len()));
    }
    if let Some(k) = kind {
        ps.push(k);
        conditions.push(format!("AND kind = ${}::INT2", ps.len()));
    }
    if let Some(r) = is_read {
        ps.push(r);
        conditions.push(format!("AND is_read = ${}::BOOL", ps.len()));
    }
    conditions.join(" ")
}
