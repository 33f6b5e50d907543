//! Write serialization queue: one task owns the writer connection and runs submitted jobs
//! strictly one at a time, in submission order.

use crate::error::StoreError;
use futures_util::FutureExt;
use sqlx::{Connection, SqliteConnection};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type Job = Box<dyn for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, ()> + Send>;

enum Message {
    Job(Job),
    Shutdown,
}

fn into_job<F>(f: F) -> Job
where
    F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, ()> + Send + 'static,
{
    Box::new(f)
}

/// Handle to the writer task. Cheap to clone; all clones feed the same FIFO.
#[derive(Clone)]
pub struct WriteQueue {
    tx: mpsc::UnboundedSender<Message>,
    pending: Arc<AtomicUsize>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl WriteQueue {
    /// Start the writer task. It owns `conn` until `shutdown`.
    pub fn spawn(conn: SqliteConnection) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        let handle = tokio::spawn(run(conn, rx));
        WriteQueue {
            tx,
            pending,
            worker: Arc::new(Mutex::new(Some(handle))),
        }
    }

    /// Jobs admitted but not yet finished.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Enqueue `f` and wait for its result. A failing job fails only its own caller; a
    /// panicking one is rolled back and reported as `JobPanicked`.
    /// Dropping the returned future does not cancel a job that was already admitted.
    pub async fn submit<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, StoreError>> + Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let pending = self.pending.clone();
        let job = into_job(move |conn| {
            Box::pin(async move {
                let outcome = AssertUnwindSafe(async { f(&mut *conn).await }).catch_unwind().await;
                let result = match outcome {
                    Ok(result) => result,
                    Err(_) => {
                        abandon_transaction(conn).await;
                        Err(StoreError::JobPanicked)
                    }
                };
                pending.fetch_sub(1, Ordering::SeqCst);
                // caller may have gone away; the write still happened
                let _ = done_tx.send(result);
            })
        });
        let depth = self.pending.fetch_add(1, Ordering::SeqCst) + 1;
        if self.tx.send(Message::Job(job)).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(StoreError::QueueClosed);
        }
        tracing::trace!(pending = depth, "write job queued");
        done_rx.await.map_err(|_| StoreError::QueueClosed)?
    }

    /// Let already-queued jobs finish, then close the writer connection.
    /// Later submissions fail with `QueueClosed`.
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        let handle = self.worker.lock().await.take();
        let Some(handle) = handle else {
            return Ok(());
        };
        let _ = self.tx.send(Message::Shutdown);
        handle.await.map_err(|_| StoreError::QueueClosed)
    }
}

/// After a panicked job: drop whatever transaction it left open so the next job starts clean.
async fn abandon_transaction(conn: &mut SqliteConnection) {
    tracing::error!("write job panicked; rolling back");
    if let Err(e) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
        // "no transaction is active" when the job had not begun one
        tracing::debug!(error = %e, "rollback after panic");
    }
}

async fn run(mut conn: SqliteConnection, mut rx: mpsc::UnboundedReceiver<Message>) {
    while let Some(msg) = rx.recv().await {
        match msg {
            Message::Job(job) => job(&mut conn).await,
            Message::Shutdown => break,
        }
    }
    rx.close();
    if let Err(e) = conn.close().await {
        tracing::warn!(error = %e, "closing writer connection");
    }
    tracing::debug!("write queue stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Executor;

    async fn queue() -> (WriteQueue, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let opts = crate::config::StoreOptions::for_path(&dir.path().join("q.db"))
            .connect_options()
            .unwrap();
        let conn = SqliteConnection::connect_with(&opts).await.unwrap();
        (WriteQueue::spawn(conn), dir)
    }

    #[tokio::test]
    async fn test_jobs_run_in_submission_order() {
        let (q, _dir) = queue().await;
        q.submit(|conn| {
            Box::pin(async move {
                conn.execute("CREATE TABLE log (n INTEGER)").await?;
                Ok(())
            })
        })
        .await
        .unwrap();

        // all twenty are admitted before the writer runs any of them
        let jobs = (0..20i64).map(|n| {
            q.submit(move |conn| {
                Box::pin(async move {
                    sqlx::query("INSERT INTO log (n) VALUES (?)").bind(n).execute(&mut *conn).await?;
                    Ok(n)
                })
            })
        });
        let got: Vec<i64> = futures_util::future::join_all(jobs)
            .await
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(got, (0..20).collect::<Vec<_>>());

        let rows: Vec<i64> = q
            .submit(|conn| {
                Box::pin(async move { Ok(sqlx::query_scalar("SELECT n FROM log ORDER BY rowid").fetch_all(&mut *conn).await?) })
            })
            .await
            .unwrap();
        assert_eq!(rows, (0..20).collect::<Vec<_>>());
        assert_eq!(q.pending(), 0);
    }

    #[tokio::test]
    async fn test_failed_job_does_not_poison_queue() {
        let (q, _dir) = queue().await;
        let err = q
            .submit(|conn| {
                Box::pin(async move {
                    conn.execute("SELECT * FROM missing_table").await?;
                    Ok(())
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Db(_)));
        let n: i64 = q
            .submit(|conn| Box::pin(async move { Ok(sqlx::query_scalar("SELECT 1").fetch_one(&mut *conn).await?) }))
            .await
            .unwrap();
        assert_eq!(n, 1);
    }

    #[tokio::test]
    async fn test_panicking_job_is_rolled_back_and_isolated() {
        let (q, _dir) = queue().await;
        q.submit(|conn| {
            Box::pin(async move {
                sqlx::query("CREATE TABLE log (n INTEGER)").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .await
        .unwrap();

        let err = q
            .submit(|conn| {
                Box::pin(async move {
                    sqlx::query("BEGIN").execute(&mut *conn).await?;
                    sqlx::query("INSERT INTO log (n) VALUES (1)").execute(&mut *conn).await?;
                    let empty: Vec<i64> = Vec::new();
                    Ok(empty[0])
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::JobPanicked));

        // the next job starts outside any transaction and sees nothing from the panicked one
        let n: i64 = q
            .submit(|conn| {
                Box::pin(async move {
                    sqlx::query("BEGIN").execute(&mut *conn).await?;
                    let n = sqlx::query_scalar("SELECT COUNT(*) FROM log").fetch_one(&mut *conn).await?;
                    sqlx::query("COMMIT").execute(&mut *conn).await?;
                    Ok(n)
                })
            })
            .await
            .unwrap();
        assert_eq!(n, 0);
        assert_eq!(q.pending(), 0);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_is_queue_closed() {
        let (q, _dir) = queue().await;
        q.shutdown().await.unwrap();
        q.shutdown().await.unwrap();
        let err = q.submit(|_conn| Box::pin(async move { Ok(()) })).await.unwrap_err();
        assert!(matches!(err, StoreError::QueueClosed));
    }
}
