//! [`Game`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{Allocate, By, Delete, Insert, Lock, Select, Update};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tracerr::Traced;

use crate::{
    domain::{game, Game},
    infra::{
        database::{
            self,
            postgres::{Connection, FuzzPattern},
            Postgres,
        },
        Database,
    },
    read,
};

impl<C> Database<Allocate<game::Id>> for Postgres<C>
where
    C: Connection,
{
    type Ok = game::Id;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Allocate<game::Id>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "SELECT nextval('games_id_seq')::INT4";
        self.query_one(SQL, &[])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.get(0))
    }
}

impl<C, IDs> Database<Select<By<HashMap<game::Id, Game>, IDs>>> for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[game::Id]>,
{
    type Ok = HashMap<game::Id, Game>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<game::Id, Game>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        let ids: &[game::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        const SQL: &str = "\
            SELECT id, name, description, category, condition, \
                   entered_at, is_available \
            FROM games \
            WHERE id = ANY($1::INT4[])";
        Ok(self
            .query(SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                let id = row.get("id");
                (
                    id,
                    Game {
                        id,
                        name: row.get("name"),
                        description: row.get("description"),
                        category: row.get("category"),
                        condition: row.get("condition"),
                        entered_at: row.get("entered_at"),
                        is_available: row.get("is_available"),
                    },
                )
            })
            .collect())
    }
}

impl<C> Database<Select<By<Option<Game>, game::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<game::Id, Game>, [game::Id; 1]>>,
        Ok = HashMap<game::Id, Game>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Game>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Game>, game::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<C> Database<Select<By<Vec<game::Category>, ()>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<game::Category>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<game::Category>, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            SELECT DISTINCT category \
            FROM games \
            ORDER BY category";
        Ok(self
            .query(SQL, &[])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| row.get("category"))
            .collect())
    }
}

impl<C> Database<Insert<Game>> for Postgres<C>
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

impl<C> Database<Update<Game>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(game): Update<Game>,
    ) -> Result<Self::Ok, Self::Err> {
        let Game {
            id,
            name,
            description,
            category,
            condition,
            entered_at,
            is_available,
        } = game;

        const SQL: &str = "\
            INSERT INTO games (id, name, description, category, condition, \
                               entered_at, is_available) \
            VALUES (\
                $1::INT4, \
                $2::VARCHAR, \
                $3::TEXT, \
                $4::VARCHAR, \
                $5::INT2, \
                $6::TIMESTAMPTZ, \
                $7::BOOL\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET name = EXCLUDED.name, \
                description = EXCLUDED.description, \
                category = EXCLUDED.category, \
                condition = EXCLUDED.condition, \
                entered_at = EXCLUDED.entered_at, \
                is_available = EXCLUDED.is_available";
        self.exec(
            SQL,
            &[
                &id,
                &name,
                &description,
                &category,
                &condition,
                &entered_at,
                &is_available,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Delete<By<Game, game::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Game, game::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: game::Id = by.into_inner();

        const SQL: &str = "\
            DELETE FROM games \
            WHERE id = $1::INT4";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Lock<By<Game, game::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Game, game::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: game::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM games \
            WHERE id = $1::INT4 \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<read::game::list::Page, read::game::list::Selector>>>
    for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<game::Id, Game>, Vec<game::Id>>>,
        Ok = HashMap<game::Id, Game>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = read::game::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::game::list::Page, read::game::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::game::list::Selector {
            arguments,
            filter:
                read::game::list::Filter {
                    name,
                    category,
                    is_available,
                },
        } = by.into_inner();

        let limit =
            i32::try_from(arguments.limit()).unwrap_or(i32::MAX - 1) + 1;

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit];

        let cursor_idx = arguments.cursor().map(|c| {
            ps.push(c);
            ps.len()
        });
        let name_pattern = name.as_deref().map(FuzzPattern::new);
        let name_pattern_idx = name_pattern.as_ref().map(|n| {
            ps.push(n);
            ps.len()
        });
        let category_idx = category.as_ref().map(|c| {
            ps.push(c);
            ps.len()
        });
        let is_available_idx = is_available.as_ref().map(|a| {
            ps.push(a);
            ps.len()
        });

        let sql = format!(
            "SELECT id \
             FROM games \
             WHERE TRUE \
                   {cursor} \
                   {name_filtering} \
                   {category_filtering} \
                   {is_available_filtering} \
             ORDER BY id {order} \
             LIMIT $1::INT4",
            cursor = cursor_idx.into_iter().format_with("", |idx, f| {
                let op = arguments.kind().operator();
                f(&format_args!("AND id {op} ${idx}::INT4"))
            }),
            order = arguments.kind().order().sql(),
            name_filtering =
                name_pattern_idx.into_iter().format_with("", |idx, f| {
                    f(&format_args!(
                        "AND LOWER(name) SIMILAR TO LOWER(${idx}::VARCHAR)"
                    ))
                }),
            category_filtering =
                category_idx.into_iter().format_with("", |idx, f| {
                    f(&format_args!("AND category = ${idx}::VARCHAR"))
                }),
            is_available_filtering =
                is_available_idx.into_iter().format_with("", |idx, f| {
                    f(&format_args!("AND is_available = ${idx}::BOOL"))
                }),
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
            .collect::<Vec<game::Id>>();
        let mut games = self
            .execute(Select(By::new(ids.clone())))
            .await
            .map_err(tracerr::wrap!())?;
        let edges = ids
            .into_iter()
            .filter_map(|id| games.remove(&id).map(|g| (id, g)));

        Ok(read::game::list::Page::new(&arguments, edges, has_more))
    }
}

impl<C>
    Database<Select<By<read::game::list::TotalCount, read::game::list::Filter>>>
    for Postgres<C>
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
        let read::game::list::Filter {
            name,
            category,
            is_available,
        } = by.into_inner();
        let name_pattern = name.as_deref().map(FuzzPattern::new);

        const SQL: &str = "\
            SELECT COUNT(*)::INT4 \
            FROM games \
            WHERE ($1::VARCHAR IS NULL \
                   OR LOWER(name) SIMILAR TO LOWER($1::VARCHAR)) \
              AND ($2::VARCHAR IS NULL OR category = $2::VARCHAR) \
              AND ($3::BOOL IS NULL OR is_available = $3::BOOL)";
        self.query_one(SQL, &[&name_pattern, &category, &is_available])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.get::<_, i32>(0).into())
    }
}
