//! [`Command`] for deleting an [`Alert`].

use common::operations::{
    By, Commit, Delete, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{alert, Alert},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for deleting an [`Alert`].
#[derive(Clone, Copy, Debug)]
pub struct DeleteAlert {
    /// ID of the [`Alert`] to delete.
    pub alert_id: alert::Id,
}

impl<Db> Command<DeleteAlert> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Alert, alert::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Alert>, alert::Id>>,
            Ok = Option<Alert>,
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<Alert, alert::Id>>,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        DeleteAlert { alert_id }: DeleteAlert,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::new(alert_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        _ = tx
            .execute(Select(By::<Option<Alert>, _>::new(alert_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::AlertNotExists(alert_id))
            .map_err(tracerr::wrap!())?;

        tx.execute(Delete(By::new(alert_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(())
    }
}

/// Error of [`DeleteAlert`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Alert`] with the provided ID does not exist.
    #[display("`Alert(id: {_0})` does not exist")]
    AlertNotExists(#[error(not(source))] alert::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{fixture, CreateCustomAlert},
        domain::alert,
        query::{self, Query as _},
    };

    use super::{Command as _, DeleteAlert, ExecutionError as E};

    #[tokio::test]
    async fn deletes_alert_once() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;
        let g = fixture::game(&svc, "Chess").await;
        let a = svc
            .execute(CreateCustomAlert {
                user_id: u.id,
                game_id: g.id,
                kind: alert::Kind::Custom,
                message: alert::Message::new("Bye").unwrap(),
            })
            .await
            .unwrap();

        svc.execute(DeleteAlert { alert_id: a.id }).await.unwrap();

        let found = svc.execute(query::alert::ById::by(a.id)).await.unwrap();
        assert!(found.is_none());
        let err = svc
            .execute(DeleteAlert { alert_id: a.id })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::AlertNotExists(_)), "{err}");
    }
}
