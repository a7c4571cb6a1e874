//! Transaction boundary.
//!
//! Every logical write (create, apply, delete) runs inside one backend
//! transaction obtained from a [`Session`]. Store methods take the backend
//! connection (`&mut Session::Conn`), which both a pooled handle and an open
//! transaction dereference to, so the same store code serves reads outside
//! a transaction and writes inside one.

use std::any::Any;
use std::future::Future;
use std::ops::DerefMut;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{debug, warn};

use crate::error::{Result, StorageError};

/// Source of backend connections and transactions.
///
/// # Implementations
///
/// - `SqliteSession`: pooled SQLite connections
/// - `MongoSession`: MongoDB client sessions (transactions need a replica set)
#[async_trait]
pub trait Session: Send + Sync {
    /// Connection type store methods operate on.
    type Conn: Send + 'static;
    /// Non-transactional handle.
    type Handle: DerefMut<Target = Self::Conn> + Send;
    /// Open transaction. Dropping it without commit aborts it.
    type Tx: DerefMut<Target = Self::Conn> + Send;

    async fn acquire(&self) -> Result<Self::Handle>;

    async fn begin(&self) -> Result<Self::Tx>;

    async fn commit(&self, tx: Self::Tx) -> Result<()>;

    async fn rollback(&self, tx: Self::Tx) -> Result<()>;
}

/// Run `work` inside a transaction.
///
/// `work` receives the open transaction and hands it back with its result.
/// The transaction commits iff the result is `Ok`. An `Err`, a panic inside
/// `work`, or exceeding `timeout` aborts it; panics and timeouts surface as
/// [`StorageError::Panicked`] and [`StorageError::Timeout`].
pub async fn use_transaction<S, T, F, Fut>(session: &S, timeout: Duration, work: F) -> Result<T>
where
    S: Session + ?Sized,
    F: FnOnce(S::Tx) -> Fut,
    Fut: Future<Output = (S::Tx, Result<T>)>,
{
    let tx = session.begin().await?;
    debug!("Transaction started");

    // On timeout or panic the in-flight future, and the transaction it owns,
    // is dropped; both backends abort an uncommitted transaction on drop.
    let outcome = tokio::time::timeout(timeout, AssertUnwindSafe(work(tx)).catch_unwind()).await;

    match outcome {
        Err(_) => {
            warn!(timeout = ?timeout, "Transaction timed out, aborted");
            Err(StorageError::Timeout(timeout))
        }
        Ok(Err(panic)) => {
            let message = panic_message(panic.as_ref());
            warn!(message = %message, "Transaction work panicked, aborted");
            Err(StorageError::Panicked(message))
        }
        Ok(Ok((tx, Ok(value)))) => {
            session.commit(tx).await?;
            debug!("Transaction committed");
            Ok(value)
        }
        Ok(Ok((tx, Err(e)))) => {
            if let Err(rollback_err) = session.rollback(tx).await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            debug!(error = %e, "Transaction rolled back");
            Err(e)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
