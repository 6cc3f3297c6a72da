//! Connection pool implementation

use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use coffer_core::{CofferError, DatabaseOptions, EngineHandle, Result, StorageEngine};
use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::config::PoolConfig;
use super::stats::PoolStats;

/// Interval at which the background maintenance task reaps idle connections.
const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(5);

/// Pool-side record of one open handle: identity for logging plus the
/// idle bookkeeping maintenance reads.
struct PooledHandle {
    id: Uuid,
    handle: Arc<dyn EngineHandle>,
    last_used_at: Instant,
}

impl PooledHandle {
    fn new(handle: Arc<dyn EngineHandle>) -> Self {
        Self {
            id: Uuid::new_v4(),
            handle,
            last_used_at: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.last_used_at = Instant::now();
    }
}

/// A connection pool that manages a bounded set of storage-engine handles
///
/// The pool keeps `min_connections` handles open, grows on demand up to
/// `max_connections`, and queues callers fairly beyond that. Connections
/// are automatically returned to the pool when the `PooledConnection`
/// wrapper is dropped, on success and failure paths alike. A background
/// task closes handles that have sat idle longer than the configured
/// timeout, never shrinking the pool below its minimum.
pub struct ConnectionPool {
    /// Pool configuration
    config: PoolConfig,
    /// Storage engine that opens new handles
    engine: Arc<dyn StorageEngine>,
    /// Database the pool opens handles onto
    options: DatabaseOptions,
    /// Available idle connections
    idle: Mutex<VecDeque<PooledHandle>>,
    /// Semaphore bounding live connections; waiters queue in FIFO order
    semaphore: Arc<Semaphore>,
    /// Connections currently borrowed by in-flight operations
    active_count: AtomicUsize,
    /// Acquire calls queued for a connection
    waiting_count: AtomicUsize,
    /// Every handle the pool has opened and not yet closed, busy ones
    /// included; `close()` closes them all unconditionally.
    live: Mutex<Vec<Arc<dyn EngineHandle>>>,
    /// Set once `close()` has begun
    closed: AtomicBool,
    /// Background maintenance task, aborted on close
    maintenance_task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionPool {
    /// Open a new connection pool against `engine`
    ///
    /// Opens `min_connections` handles up front (each open runs the
    /// engine's idempotent provisioning step) and spawns the maintenance
    /// task. Must be called from within a tokio runtime.
    #[tracing::instrument(skip(config, engine, options), fields(database = %options.name))]
    pub async fn open(
        config: PoolConfig,
        engine: Arc<dyn StorageEngine>,
        options: DatabaseOptions,
    ) -> Result<Arc<Self>> {
        let semaphore = Arc::new(Semaphore::new(config.max_connections()));
        let pool = Arc::new(Self {
            config,
            engine,
            options,
            idle: Mutex::new(VecDeque::new()),
            semaphore,
            active_count: AtomicUsize::new(0),
            waiting_count: AtomicUsize::new(0),
            live: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            maintenance_task: Mutex::new(None),
        });

        for _ in 0..pool.config.min_connections() {
            let pooled = pool.open_handle().await?;
            pool.idle.lock().push_back(pooled);
        }
        tracing::info!(
            connections = pool.config.min_connections(),
            "connection pool opened"
        );

        let task = tokio::spawn({
            let pool = Arc::downgrade(&pool);
            async move {
                let mut interval = tokio::time::interval(MAINTENANCE_INTERVAL);
                // The first tick completes immediately; skip it.
                interval.tick().await;
                loop {
                    interval.tick().await;
                    let Some(pool) = pool.upgrade() else { break };
                    pool.maintenance().await;
                }
            }
        });
        *pool.maintenance_task.lock() = Some(task);

        Ok(pool)
    }

    /// Get a connection from the pool
    ///
    /// This will:
    /// 1. Try to get an idle connection from the pool
    /// 2. If none available and under `max_connections`, open a new handle
    /// 3. If at `max_connections`, queue behind earlier callers until a
    ///    connection is released (strict FIFO)
    ///
    /// Fails with `AcquireTimeout` if no connection becomes available
    /// within the configured acquire timeout, and with `PoolClosed` if the
    /// pool is shut down before or while waiting.
    pub async fn acquire(&self) -> Result<PooledConnection<'_>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CofferError::PoolClosed);
        }

        self.waiting_count.fetch_add(1, Ordering::SeqCst);

        let result = tokio::time::timeout(self.config.acquire_timeout(), async {
            // The permit bounds live connections and queues waiters fairly.
            // Closing the pool closes the semaphore, failing every waiter.
            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| CofferError::PoolClosed)?;

            // A close racing with this acquire may have granted the permit
            // before closing the semaphore.
            if self.closed.load(Ordering::SeqCst) {
                return Err(CofferError::PoolClosed);
            }

            let pooled = match self.take_idle() {
                Some(pooled) => pooled,
                // Holding a permit with the idle set empty means the live
                // count is below the maximum.
                None => self.open_handle().await?,
            };

            tracing::trace!(connection_id = %pooled.id, "connection acquired");
            Ok(PooledConnection {
                inner: Some(pooled),
                pool: self,
                _permit: permit,
            })
        })
        .await;

        self.waiting_count.fetch_sub(1, Ordering::SeqCst);

        match result {
            Ok(Ok(conn)) => {
                self.active_count.fetch_add(1, Ordering::SeqCst);
                Ok(conn)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CofferError::AcquireTimeout(format!(
                "no connection became available within {:?}",
                self.config.acquire_timeout()
            ))),
        }
    }

    /// Open a new handle and record it in the live registry
    async fn open_handle(&self) -> Result<PooledHandle> {
        let handle = self.engine.open(&self.options).await?;
        let pooled = PooledHandle::new(handle.clone());
        tracing::debug!(connection_id = %pooled.id, "opened new connection");
        self.live.lock().push(handle);
        Ok(pooled)
    }

    /// Pop an idle connection, discarding any whose handle was closed
    /// underneath the pool. No ordering guarantee among idle connections.
    fn take_idle(&self) -> Option<PooledHandle> {
        loop {
            let pooled = { self.idle.lock().pop_front() };
            match pooled {
                Some(mut pooled) => {
                    if pooled.handle.is_closed() {
                        self.forget(&pooled.handle);
                        continue;
                    }
                    pooled.touch();
                    return Some(pooled);
                }
                None => return None,
            }
        }
    }

    /// Return a connection to the pool
    ///
    /// The freed permit is handed to the head waiter, if any, which pops
    /// the connection straight back out of the idle set.
    fn return_connection(&self, mut pooled: PooledHandle) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);

        // Don't pool handles that are closed or belong to a closed pool.
        if self.closed.load(Ordering::SeqCst) || pooled.handle.is_closed() {
            self.forget(&pooled.handle);
            return;
        }

        pooled.touch();
        tracing::trace!(connection_id = %pooled.id, "connection released");
        self.idle.lock().push_back(pooled);
    }

    /// Drop a handle from the live registry
    fn forget(&self, handle: &Arc<dyn EngineHandle>) {
        self.live.lock().retain(|h| !Arc::ptr_eq(h, handle));
    }

    /// Reap connections that have been idle longer than the idle timeout
    ///
    /// Runs on a fixed interval in the background, and may also be invoked
    /// directly. Never reduces the live connection count below
    /// `min_connections`, regardless of idle time.
    pub async fn maintenance(&self) {
        let reaped = {
            let mut idle = self.idle.lock();
            let mut live = self.active_count.load(Ordering::SeqCst) + idle.len();
            let mut kept = VecDeque::with_capacity(idle.len());
            let mut reaped = Vec::new();
            while let Some(pooled) = idle.pop_front() {
                if live > self.config.min_connections()
                    && pooled.last_used_at.elapsed() > self.config.idle_timeout()
                {
                    live -= 1;
                    reaped.push(pooled);
                } else {
                    kept.push_back(pooled);
                }
            }
            *idle = kept;
            reaped
        };

        for pooled in reaped {
            tracing::debug!(connection_id = %pooled.id, "closing idle connection");
            self.forget(&pooled.handle);
            if let Err(error) = pooled.handle.close().await {
                tracing::warn!(connection_id = %pooled.id, %error, "failed to close idle connection");
            }
        }
    }

    /// Shut the pool down
    ///
    /// Idempotent. Cancels the maintenance task, fails every queued waiter
    /// with `PoolClosed`, and closes every handle the pool has opened,
    /// busy ones included.
    #[tracing::instrument(skip(self))]
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("closing connection pool");

        if let Some(task) = self.maintenance_task.lock().take() {
            task.abort();
        }

        // Queued waiters fail with PoolClosed instead of hanging.
        self.semaphore.close();
        self.idle.lock().clear();

        let handles: Vec<_> = { self.live.lock().drain(..).collect() };
        for handle in handles {
            if let Err(error) = handle.close().await {
                tracing::warn!(%error, "failed to close connection");
            }
        }
    }

    /// Whether `close()` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Get current pool statistics
    pub fn stats(&self) -> PoolStats {
        let idle = self.idle.lock().len();
        let active = self.active_count.load(Ordering::SeqCst);
        let waiting = self.waiting_count.load(Ordering::SeqCst);
        PoolStats::new(self.config.max_connections(), idle, active, waiting)
    }

    /// Get the pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Get the database options the pool opens handles onto
    pub fn options(&self) -> &DatabaseOptions {
        &self.options
    }
}

/// A connection borrowed from the pool
///
/// When dropped, the connection is automatically returned to the pool.
pub struct PooledConnection<'a> {
    inner: Option<PooledHandle>,
    pool: &'a ConnectionPool,
    _permit: OwnedSemaphorePermit,
}

impl<'a> PooledConnection<'a> {
    /// Identifier of the borrowed connection, for logging.
    pub fn id(&self) -> Uuid {
        self.inner.as_ref().expect("connection taken").id
    }

    /// Get the underlying handle as an Arc
    pub fn handle(&self) -> &Arc<dyn EngineHandle> {
        &self.inner.as_ref().expect("connection taken").handle
    }
}

impl<'a> Deref for PooledConnection<'a> {
    type Target = dyn EngineHandle;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref().expect("connection taken").handle.as_ref()
    }
}

impl<'a> Drop for PooledConnection<'a> {
    fn drop(&mut self) {
        // Re-enter the idle set before the permit frees, so the head
        // waiter finds the connection waiting for it.
        if let Some(pooled) = self.inner.take() {
            self.pool.return_connection(pooled);
        }
    }
}
