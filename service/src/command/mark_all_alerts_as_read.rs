//! [`Command`] for marking all the [`Alert`]s of a [`User`] as read.

use common::operations::{By, Commit, Select, Transact, Transacted, Update};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::User;
use crate::{
    domain::{user, Alert},
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for marking all the unread [`Alert`]s of a [`User`] as read.
///
/// Returns the number of marked [`Alert`]s.
#[derive(Clone, Copy, Debug)]
pub struct MarkAllAlertsAsRead {
    /// ID of the [`User`] whose [`Alert`]s should be marked.
    pub user_id: user::Id,
}

impl<Db> Command<MarkAllAlertsAsRead> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Vec<Alert>, read::alert::list::Filter>>,
            Ok = Vec<Alert>,
            Err = Traced<database::Error>,
        > + Database<Update<Alert>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = usize;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        MarkAllAlertsAsRead { user_id }: MarkAllAlertsAsRead,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let unread = tx
            .execute(Select(By::new(read::alert::list::Filter {
                user_id: Some(user_id),
                is_read: Some(false),
                ..read::alert::list::Filter::default()
            })))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let count = unread.len();

        for mut alert in unread {
            alert.is_read = true;
            tx.execute(Update(alert))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(count)
    }
}

/// Error of [`MarkAllAlertsAsRead`] [`Command`] execution.
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
        command::{fixture, CreateCustomAlert},
        domain::alert,
        query::{self, Query as _},
        read,
    };

    use super::{Command as _, MarkAllAlertsAsRead};

    #[tokio::test]
    async fn marks_only_alerts_of_user() {
        let svc = fixture::service();
        let alice = fixture::user(&svc, "a@x.com").await;
        let bob = fixture::user(&svc, "b@x.com").await;
        let g = fixture::game(&svc, "Chess").await;
        for user_id in [alice.id, alice.id, bob.id] {
            _ = svc
                .execute(CreateCustomAlert {
                    user_id,
                    game_id: g.id,
                    kind: alert::Kind::Custom,
                    message: alert::Message::new("News").unwrap(),
                })
                .await
                .unwrap();
        }

        let count = svc
            .execute(MarkAllAlertsAsRead { user_id: alice.id })
            .await
            .unwrap();

        assert_eq!(count, 2);
        let unread = svc
            .execute(query::alerts::TotalCount::by(read::alert::list::Filter {
                is_read: Some(false),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(i32::from(unread), 1);
    }
}
