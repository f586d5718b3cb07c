//! [`Borrowing`]-related [`Database`] implementations.

use std::{collections::HashMap, ops::Range};

use common::operations::{Allocate, By, Insert, Lock, Select, Update};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{borrowing, game, user, Borrowing},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::{self, borrowing::Open},
};

impl<C> Database<Allocate<borrowing::Id>> for Postgres<C>
where
    C: Connection,
{
    type Ok = borrowing::Id;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Allocate<borrowing::Id>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "SELECT nextval('borrowings_id_seq')::INT4";
        self.query_one(SQL, &[])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.get(0))
    }
}

impl<C, IDs> Database<Select<By<HashMap<borrowing::Id, Borrowing>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[borrowing::Id]>,
{
    type Ok = HashMap<borrowing::Id, Borrowing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<borrowing::Id, Borrowing>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        let ids: &[borrowing::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        const SQL: &str = "\
            SELECT id, user_id, game_id, borrowed_at, due_at, returned_at, \
                   is_overdue \
            FROM borrowings \
            WHERE id = ANY($1::INT4[])";
        Ok(self
            .query(SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| {
                let b = from_row(row);
                (b.id, b)
            })
            .collect())
    }
}

impl<C> Database<Select<By<Option<Borrowing>, borrowing::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<borrowing::Id, Borrowing>, [borrowing::Id; 1]>>,
        Ok = HashMap<borrowing::Id, Borrowing>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Borrowing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Borrowing>, borrowing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<C> Database<Select<By<Option<Open<Borrowing>>, game::Id>>> for Postgres<C>
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

        const SQL: &str = "\
            SELECT id, user_id, game_id, borrowed_at, due_at, returned_at, \
                   is_overdue \
            FROM borrowings \
            WHERE game_id = $1::INT4 \
              AND returned_at IS NULL \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&game_id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row)
            .map(Open))
    }
}

impl<C> Database<Select<By<Vec<Open<Borrowing>>, user::Id>>> for Postgres<C>
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

        const SQL: &str = "\
            SELECT id, user_id, game_id, borrowed_at, due_at, returned_at, \
                   is_overdue \
            FROM borrowings \
            WHERE user_id = $1::INT4 \
              AND returned_at IS NULL \
            ORDER BY due_at";
        Ok(self
            .query(SQL, &[&user_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .map(Open)
            .collect())
    }
}

impl<C>
    Database<Select<By<Vec<Open<Borrowing>>, Range<borrowing::DueDateTime>>>>
    for Postgres<C>
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
        let Range { start, end } = by.into_inner();

        const SQL: &str = "\
            SELECT id, user_id, game_id, borrowed_at, due_at, returned_at, \
                   is_overdue \
            FROM borrowings \
            WHERE due_at >= $1::TIMESTAMPTZ \
              AND due_at < $2::TIMESTAMPTZ \
              AND returned_at IS NULL \
            ORDER BY due_at";
        Ok(self
            .query(SQL, &[&start, &end])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .map(Open)
            .collect())
    }
}

impl<C> Database<Insert<Borrowing>> for Postgres<C>
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

impl<C> Database<Update<Borrowing>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(borrowing): Update<Borrowing>,
    ) -> Result<Self::Ok, Self::Err> {
        let Borrowing {
            id,
            user_id,
            game_id,
            borrowed_at,
            due_at,
            returned_at,
            is_overdue,
        } = borrowing;

        const SQL: &str = "\
            INSERT INTO borrowings (id, user_id, game_id, borrowed_at, \
                                    due_at, returned_at, is_overdue) \
            VALUES (\
                $1::INT4, \
                $2::INT4, \
                $3::INT4, \
                $4::TIMESTAMPTZ, \
                $5::TIMESTAMPTZ, \
                $6::TIMESTAMPTZ, \
                $7::BOOL\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET user_id = EXCLUDED.user_id, \
                game_id = EXCLUDED.game_id, \
                borrowed_at = EXCLUDED.borrowed_at, \
                due_at = EXCLUDED.due_at, \
                returned_at = EXCLUDED.returned_at, \
                is_overdue = EXCLUDED.is_overdue";
        self.exec(
            SQL,
            &[
                &id,
                &user_id,
                &game_id,
                &borrowed_at,
                &due_at,
                &returned_at,
                &is_overdue,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Borrowing, borrowing::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Borrowing, borrowing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: borrowing::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM borrowings \
            WHERE id = $1::INT4 \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C>
    Database<
        Select<
            By<read::borrowing::list::Page, read::borrowing::list::Selector>,
        >,
    > for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<borrowing::Id, Borrowing>, Vec<borrowing::Id>>>,
        Ok = HashMap<borrowing::Id, Borrowing>,
        Err = Traced<database::Error>,
    >,
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
             FROM borrowings \
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
            .collect::<Vec<borrowing::Id>>();
        let mut borrowings = self
            .execute(Select(By::new(ids.clone())))
            .await
            .map_err(tracerr::wrap!())?;
        let edges = ids
            .into_iter()
            .filter_map(|id| borrowings.remove(&id).map(|b| (id, b)));

        Ok(read::borrowing::list::Page::new(&arguments, edges, has_more))
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
    > for Postgres<C>
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

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![];
        let sql = format!(
            "SELECT COUNT(*)::INT4 \
             FROM borrowings \
             WHERE TRUE {}",
            filtering(&filter, &mut ps),
        );
        self.query_one(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.get::<_, i32>(0).into())
    }
}

/// Builds a [`Borrowing`] out of the provided [`Row`].
fn from_row(row: &Row) -> Borrowing {
    Borrowing {
        id: row.get("id"),
        user_id: row.get("user_id"),
        game_id: row.get("game_id"),
        borrowed_at: row.get("borrowed_at"),
        due_at: row.get("due_at"),
        returned_at: row.get("returned_at"),
        is_overdue: row.get("is_overdue"),
    }
}

/// Renders SQL conditions of the provided [`read::borrowing::list::Filter`],
/// pushing its parameters into `ps`.
///
/// Overdue status is computed from `due_at`, never from the stored flag.
fn filtering<'a>(
    filter: &'a read::borrowing::list::Filter,
    ps: &mut Vec<&'a (dyn ToSql + Sync)>,
) -> String {
    use read::borrowing::list::Status;

    let user_idx = filter.user_id.as_ref().map(|id| {
        ps.push(id);
        ps.len()
    });
    let game_idx = filter.game_id.as_ref().map(|id| {
        ps.push(id);
        ps.len()
    });

    format!(
        "{user} {game} {status}",
        user = user_idx.into_iter().format_with("", |idx, f| {
            f(&format_args!("AND user_id = ${idx}::INT4"))
        }),
        game = game_idx.into_iter().format_with("", |idx, f| {
            f(&format_args!("AND game_id = ${idx}::INT4"))
        }),
        status = match filter.status {
            None => "",
            Some(Status::Open) => "AND returned_at IS NULL",
            Some(Status::Overdue) => {
                "AND returned_at IS NULL AND due_at < NOW()"
            }
            Some(Status::Returned) => "AND returned_at IS NOT NULL",
        },
    )
}
