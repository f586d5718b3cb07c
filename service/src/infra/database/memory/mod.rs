//! In-memory [`Database`] implementation.
//!
//! Follows a single-writer discipline: a [`Tx`] holds the write lock from its
//! start until it's committed or dropped, and works on its own snapshot of the
//! [`State`], which replaces the shared one only on commit. Dropping a [`Tx`]
//! without committing discards all its changes.

mod impls;

use std::{collections::BTreeMap, future::Future, sync::Arc};

use derive_more::{Deref, Display, Error as StdError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracerr::Traced;

use crate::{
    domain::{alert, borrowing, game, user, Alert, Borrowing, Game, User},
    infra::database,
};
#[cfg(doc)]
use crate::infra::Database;

/// In-memory [`Database`] client.
#[derive(Clone, Debug, Default, Deref)]
pub struct Memory<T = NonTx>(T);

/// Non-transactional [`Memory`] client.
#[derive(Clone, Debug, Default)]
pub struct NonTx {
    /// Shared [`Storage`].
    storage: Arc<Storage>,
}

/// Transactional [`Memory`] client.
#[derive(Clone, Debug)]
pub struct Tx {
    /// Shared [`Storage`] to commit into.
    storage: Arc<Storage>,

    /// [`Staged`] changes of this [`Tx`], if not committed yet.
    staged: Arc<Mutex<Option<Staged>>>,
}

/// Storage shared by all [`Memory`] clients.
#[derive(Debug, Default)]
struct Storage {
    /// Committed [`State`].
    state: Mutex<State>,

    /// Lock held by a single writer at a time.
    writer: Arc<Mutex<()>>,
}

/// Uncommitted changes of a [`Tx`].
#[derive(Debug)]
struct Staged {
    /// Snapshot of the [`State`] being modified.
    state: State,

    /// Write lock held until the [`Tx`] is committed or dropped.
    _writer: OwnedMutexGuard<()>,
}

/// Contents of a [`Memory`] database.
#[derive(Clone, Debug, Default)]
pub struct State {
    /// Stored [`User`]s.
    pub(crate) users: BTreeMap<user::Id, User>,

    /// Stored [`Game`]s.
    pub(crate) games: BTreeMap<game::Id, Game>,

    /// Stored [`Borrowing`]s.
    pub(crate) borrowings: BTreeMap<borrowing::Id, Borrowing>,

    /// Stored [`Alert`]s.
    pub(crate) alerts: BTreeMap<alert::Id, Alert>,

    /// Last allocated identifiers.
    pub(crate) sequences: Sequences,
}

/// Last values of identifier sequences.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Sequences {
    /// Last [`user::Id`].
    pub(crate) users: i32,

    /// Last [`game::Id`].
    pub(crate) games: i32,

    /// Last [`borrowing::Id`].
    pub(crate) borrowings: i32,

    /// Last [`alert::Id`].
    pub(crate) alerts: i32,
}

impl Memory {
    /// Creates a new empty [`Memory`] database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Memory<Tx> {
    /// Commits this [`Tx`].
    ///
    /// # Errors
    ///
    /// If this [`Tx`] is already committed.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let staged = self
            .staged
            .lock()
            .await
            .take()
            .ok_or(Error::Committed)
            .map_err(tracerr::from_and_wrap!(=> database::Error))?;

        let Staged { state, _writer } = staged;
        *self.storage.state.lock().await = state;
        drop(_writer);

        Ok(())
    }
}

impl NonTx {
    /// Starts a new [`Tx`], waiting for the current writer to finish.
    pub(crate) async fn begin(&self) -> Tx {
        let writer = Arc::clone(&self.storage.writer).lock_owned().await;
        let state = self.storage.state.lock().await.clone();
        Tx {
            storage: Arc::clone(&self.storage),
            staged: Arc::new(Mutex::new(Some(Staged {
                state,
                _writer: writer,
            }))),
        }
    }
}

/// Generic [`Memory`] database connection.
pub trait Connection {
    /// Reads the [`State`] with the provided function.
    ///
    /// # Errors
    ///
    /// If the [`State`] is not accessible anymore.
    fn read<R>(
        &self,
        f: impl FnOnce(&State) -> R,
    ) -> impl Future<Output = Result<R, Traced<database::Error>>>;

    /// Modifies the [`State`] with the provided function.
    ///
    /// The function must leave the [`State`] untouched when returning an
    /// [`Error`].
    ///
    /// # Errors
    ///
    /// If the provided function fails, or the [`State`] is not accessible
    /// anymore.
    fn write<R>(
        &self,
        f: impl FnOnce(&mut State) -> Result<R, Error>,
    ) -> impl Future<Output = Result<R, Traced<database::Error>>>;
}

impl Connection for NonTx {
    async fn read<R>(
        &self,
        f: impl FnOnce(&State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        Ok(f(&*self.storage.state.lock().await))
    }

    async fn write<R>(
        &self,
        f: impl FnOnce(&mut State) -> Result<R, Error>,
    ) -> Result<R, Traced<database::Error>> {
        let _writer = self.storage.writer.lock().await;
        f(&mut *self.storage.state.lock().await)
            .map_err(tracerr::from_and_wrap!(=> database::Error))
    }
}

impl Connection for Tx {
    async fn read<R>(
        &self,
        f: impl FnOnce(&State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        self.staged
            .lock()
            .await
            .as_ref()
            .map(|s| f(&s.state))
            .ok_or(Error::Committed)
            .map_err(tracerr::from_and_wrap!(=> database::Error))
    }

    async fn write<R>(
        &self,
        f: impl FnOnce(&mut State) -> Result<R, Error>,
    ) -> Result<R, Traced<database::Error>> {
        self.staged
            .lock()
            .await
            .as_mut()
            .ok_or(Error::Committed)
            .and_then(|s| f(&mut s.state))
            .map_err(tracerr::from_and_wrap!(=> database::Error))
    }
}

impl<C: Connection> Connection for Memory<C> {
    async fn read<R>(
        &self,
        f: impl FnOnce(&State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        self.0.read(f).await
    }

    async fn write<R>(
        &self,
        f: impl FnOnce(&mut State) -> Result<R, Error>,
    ) -> Result<R, Traced<database::Error>> {
        self.0.write(f).await
    }
}

/// [`Memory`] database [`Error`].
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Unique constraint is violated.
    #[display("Unique constraint `{_0}` is violated")]
    UniqueViolation(#[error(not(source))] &'static str),

    /// Foreign key constraint is violated.
    #[display("Foreign key constraint `{_0}` is violated")]
    ForeignKeyViolation(#[error(not(source))] &'static str),

    /// [`Tx`] is used after being committed.
    #[display("Transaction is already committed")]
    Committed,
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::UniqueViolation(c) => constraint.map_or(true, |x| x == *c),
            Self::ForeignKeyViolation(_) | Self::Committed => false,
        }
    }
}
