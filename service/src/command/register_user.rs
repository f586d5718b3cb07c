//! [`Command`] for registering a new [`User`].

use common::{
    operations::{Allocate, By, Commit, Insert, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Email, Name};
use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for registering a new [`User`].
#[derive(Clone, Debug)]
pub struct RegisterUser {
    /// [`Name`] of a new [`User`].
    pub name: user::Name,

    /// [`Email`] of a new [`User`].
    pub email: user::Email,
}

impl<Db> Command<RegisterUser> for Service<Db>
where
    Db: for<'l> Database<
            Select<By<Option<User>, &'l user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Allocate<user::Id>,
            Ok = user::Id,
            Err = Traced<database::Error>,
        > + Database<Insert<User>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: RegisterUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RegisterUser { name, email } = cmd;

        let u = self
            .database()
            .execute(Select(By::new(&email)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if u.is_some() {
            return Err(tracerr::new!(E::EmailOccupied(email)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let user = User {
            id: tx
                .execute(Allocate::new())
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?,
            name,
            email,
            registered_at: DateTime::now().coerce(),
            is_active: true,
        };

        // The same email may be taken concurrently.
        tx.execute(Insert(user.clone()))
            .await
            .map_err(|e| {
                if e.as_ref()
                    .is_unique_violation(Some(database::USERS_EMAIL_KEY))
                {
                    tracerr::new!(E::EmailOccupied(user.email.clone()))
                } else {
                    tracerr::map_from_and_wrap!(=> E)(e)
                }
            })
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(user)
    }
}

/// Error of [`RegisterUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`user::Email`] is already occupied.
    #[display("`{_0}` email is occupied")]
    EmailOccupied(#[error(not(source))] user::Email),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::fixture,
        domain::user,
        query::{self, Query as _},
    };

    use super::{Command as _, ExecutionError as E, RegisterUser};

    #[tokio::test]
    async fn registers_active_user() {
        let svc = fixture::service();

        let u = fixture::user(&svc, "a@x.com").await;

        assert!(u.is_active);
        let found = svc
            .execute(query::user::ById::by(u.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.email, u.email);
    }

    #[tokio::test]
    async fn rejects_duplicate_email_ignoring_case() {
        let svc = fixture::service();
        _ = fixture::user(&svc, "a@x.com").await;

        let err = svc
            .execute(RegisterUser {
                name: user::Name::new("Bob").unwrap(),
                email: user::Email::new("A@X.com").unwrap(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::EmailOccupied(_)), "{err}");
    }
}
