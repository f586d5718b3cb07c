//! [`Command`] for editing a [`User`] profile.

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for editing a [`User`] profile.
///
/// [`None`] fields are left untouched.
#[derive(Clone, Debug)]
pub struct UpdateUser {
    /// ID of the [`User`] to edit.
    pub user_id: user::Id,

    /// New [`user::Name`] of the [`User`].
    pub name: Option<user::Name>,

    /// New [`user::Email`] of the [`User`].
    pub email: Option<user::Email>,

    /// New membership state of the [`User`].
    pub is_active: Option<bool>,
}

impl<Db> Command<UpdateUser> for Service<Db>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + for<'l> Database<
            Select<By<Option<User>, &'l user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<User, user::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Update<User>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: UpdateUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateUser {
            user_id,
            name,
            email,
            is_active,
        } = cmd;

        _ = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;

        if let Some(email) = &email {
            let owner = self
                .database()
                .execute(Select(By::<Option<User>, _>::new(email)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            if owner.is_some_and(|u| u.id != user_id) {
                return Err(tracerr::new!(E::EmailOccupied(email.clone())));
            }
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent edits.
        tx.execute(Lock(By::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut user = tx
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;

        if let Some(name) = name {
            user.name = name;
        }
        if let Some(email) = email {
            user.email = email;
        }
        if let Some(is_active) = is_active {
            user.is_active = is_active;
        }

        tx.execute(Update(user.clone()))
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

/// Error of [`UpdateUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`user::Email`] is occupied by another [`User`].
    #[display("`{_0}` email is occupied")]
    EmailOccupied(#[error(not(source))] user::Email),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use crate::{command::fixture, domain::user};

    use super::{Command as _, ExecutionError as E, UpdateUser};

    #[tokio::test]
    async fn edits_only_provided_fields() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;

        let updated = svc
            .execute(UpdateUser {
                user_id: u.id,
                name: Some(user::Name::new("Alicia").unwrap()),
                email: None,
                is_active: Some(false),
            })
            .await
            .unwrap();

        assert_eq!(updated.name.to_string(), "Alicia");
        assert_eq!(updated.email, u.email);
        assert!(!updated.is_active);
    }

    #[tokio::test]
    async fn keeps_own_email() {
        let svc = fixture::service();
        let u = fixture::user(&svc, "a@x.com").await;

        let updated = svc
            .execute(UpdateUser {
                user_id: u.id,
                name: None,
                email: Some(u.email.clone()),
                is_active: None,
            })
            .await
            .unwrap();

        assert_eq!(updated.email, u.email);
    }

    #[tokio::test]
    async fn rejects_email_of_another_user() {
        let svc = fixture::service();
        _ = fixture::user(&svc, "a@x.com").await;
        let b = fixture::user(&svc, "b@x.com").await;

        let err = svc
            .execute(UpdateUser {
                user_id: b.id,
                name: None,
                email: Some(user::Email::new("a@x.com").unwrap()),
                is_active: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::EmailOccupied(_)), "{err}");
    }

    #[tokio::test]
    async fn fails_for_unknown_user() {
        let svc = fixture::service();

        let err = svc
            .execute(UpdateUser {
                user_id: user::Id::new(42).unwrap(),
                name: None,
                email: None,
                is_active: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), E::UserNotExists(_)), "{err}");
    }
}
