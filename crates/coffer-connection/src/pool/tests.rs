//! Tests for connection pool functionality

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use coffer_core::{
    CofferError, DatabaseOptions, EngineHandle, Result, StorageEngine, TransactionMode,
    TransactionScope,
};
use parking_lot::Mutex;

use super::config::PoolConfig;
use super::pool::ConnectionPool;
use super::stats::PoolStats;

/// Mock engine handle for testing
struct MockHandle {
    #[allow(dead_code)]
    id: usize,
    closed: AtomicBool,
}

impl MockHandle {
    fn new(id: usize) -> Self {
        Self {
            id,
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl EngineHandle for MockHandle {
    fn engine_name(&self) -> &str {
        "mock"
    }

    async fn begin(
        &self,
        _collections: &[&str],
        _mode: TransactionMode,
    ) -> Result<Box<dyn TransactionScope>> {
        Err(CofferError::Transaction(
            "transactions not supported in mock".into(),
        ))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Mock engine that counts and retains the handles it opens
struct MockEngine {
    counter: AtomicUsize,
    handles: Mutex<Vec<Arc<MockHandle>>>,
}

impl MockEngine {
    fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
            handles: Mutex::new(Vec::new()),
        }
    }

    fn count(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }

    fn open_handle_count(&self) -> usize {
        self.handles.lock().iter().filter(|h| !h.is_closed()).count()
    }
}

#[async_trait]
impl StorageEngine for MockEngine {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn open(&self, _options: &DatabaseOptions) -> Result<Arc<dyn EngineHandle>> {
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        let handle = Arc::new(MockHandle::new(id));
        self.handles.lock().push(handle.clone());
        Ok(handle)
    }
}

fn test_options() -> DatabaseOptions {
    DatabaseOptions::new("pool-test", 1)
}

// =============================================================================
// PoolConfig tests
// =============================================================================

#[test]
fn test_pool_config_creation() {
    let config = PoolConfig::new(2, 10);
    assert_eq!(config.min_connections(), 2);
    assert_eq!(config.max_connections(), 10);
    assert_eq!(config.acquire_timeout(), Duration::from_millis(5_000));
    assert_eq!(config.idle_timeout(), Duration::from_millis(30_000));
}

#[test]
fn test_pool_config_with_timeouts() {
    let config = PoolConfig::new(1, 5)
        .with_acquire_timeout_ms(1000)
        .with_idle_timeout_ms(60000);

    assert_eq!(config.acquire_timeout(), Duration::from_millis(1000));
    assert_eq!(config.idle_timeout(), Duration::from_millis(60000));
}

#[test]
fn test_pool_config_default() {
    let config = PoolConfig::default();
    assert_eq!(config.min_connections(), 2);
    assert_eq!(config.max_connections(), 5);
}

#[test]
#[should_panic(expected = "min_connections must be greater than 0")]
fn test_pool_config_zero_min() {
    PoolConfig::new(0, 5);
}

#[test]
#[should_panic(expected = "min_connections (10) cannot exceed max_connections (5)")]
fn test_pool_config_min_exceeds_max() {
    PoolConfig::new(10, 5);
}

#[test]
fn test_pool_config_serialization() {
    let config = PoolConfig::new(2, 10).with_acquire_timeout_ms(1234);

    let json = serde_json::to_string(&config).expect("serialize");
    let deserialized: PoolConfig = serde_json::from_str(&json).expect("deserialize");

    assert_eq!(deserialized.min_connections(), 2);
    assert_eq!(deserialized.max_connections(), 10);
    assert_eq!(deserialized.acquire_timeout(), Duration::from_millis(1234));
}

// =============================================================================
// PoolStats tests
// =============================================================================

#[test]
fn test_pool_stats_accounting() {
    let stats = PoolStats::new(10, 6, 4, 2);
    assert_eq!(stats.capacity(), 10);
    assert_eq!(stats.total(), 10);
    assert_eq!(stats.idle(), 6);
    assert_eq!(stats.active(), 4);
    assert_eq!(stats.waiting(), 2);

    // A reaped pool's live count sits below its capacity.
    let shrunk = PoolStats::new(10, 1, 2, 0);
    assert_eq!(shrunk.capacity(), 10);
    assert_eq!(shrunk.total(), 3);
}

#[test]
fn test_pool_stats_utilization_is_against_capacity() {
    let stats = PoolStats::new(10, 2, 5, 0);
    assert!((stats.utilization() - 0.5).abs() < 0.001);

    let saturated = PoolStats::new(10, 0, 10, 0);
    assert!((saturated.utilization() - 1.0).abs() < 0.001);

    let empty = PoolStats::default();
    assert!((empty.utilization() - 0.0).abs() < 0.001);
}

#[test]
fn test_pool_stats_saturation() {
    assert!(PoolStats::new(10, 0, 10, 5).is_saturated());
    // Idle headroom or unopened capacity both mean not saturated.
    assert!(!PoolStats::new(10, 5, 5, 0).is_saturated());
    assert!(!PoolStats::new(10, 0, 3, 0).is_saturated());
    assert!(!PoolStats::default().is_saturated());
}

// =============================================================================
// ConnectionPool tests
// =============================================================================

#[tokio::test]
async fn test_pool_prewarms_min_connections() {
    let engine = Arc::new(MockEngine::new());
    let pool = ConnectionPool::open(PoolConfig::new(2, 5), engine.clone(), test_options())
        .await
        .expect("open pool");

    assert_eq!(engine.count(), 2);
    let stats = pool.stats();
    assert_eq!(stats.idle(), 2);
    assert_eq!(stats.active(), 0);

    pool.close().await;
}

#[tokio::test]
async fn test_pool_acquire_reuses_idle() {
    let engine = Arc::new(MockEngine::new());
    let pool = ConnectionPool::open(PoolConfig::new(1, 5), engine.clone(), test_options())
        .await
        .expect("open pool");

    {
        let conn = pool.acquire().await.expect("acquire");
        assert_eq!(conn.engine_name(), "mock");
        assert_eq!(pool.stats().active(), 1);
        assert_eq!(pool.stats().idle(), 0);
    }

    // After drop, the connection is back in the idle set.
    assert_eq!(pool.stats().active(), 0);
    assert_eq!(pool.stats().idle(), 1);

    let _conn = pool.acquire().await.expect("acquire again");
    assert_eq!(engine.count(), 1); // only the pre-warmed handle exists

    pool.close().await;
}

#[tokio::test]
async fn test_pool_grows_on_demand_up_to_max() {
    let engine = Arc::new(MockEngine::new());
    let pool = ConnectionPool::open(PoolConfig::new(1, 3), engine.clone(), test_options())
        .await
        .expect("open pool");

    let c1 = pool.acquire().await.expect("acquire 1");
    let c2 = pool.acquire().await.expect("acquire 2");
    let c3 = pool.acquire().await.expect("acquire 3");

    assert_eq!(engine.count(), 3);
    assert_eq!(pool.stats().active(), 3);
    assert!(pool.stats().is_saturated());

    drop(c1);
    drop(c2);
    drop(c3);
    pool.close().await;
}

#[tokio::test]
async fn test_pool_saturated_acquire_times_out() {
    let engine = Arc::new(MockEngine::new());
    let config = PoolConfig::new(1, 2).with_acquire_timeout_ms(100);
    let pool = ConnectionPool::open(config, engine, test_options())
        .await
        .expect("open pool");

    let _c1 = pool.acquire().await.expect("acquire 1");
    let _c2 = pool.acquire().await.expect("acquire 2");

    let result = pool.acquire().await;
    assert!(matches!(result, Err(CofferError::AcquireTimeout(_))));
    assert!(result.err().unwrap().is_connection_error());

    pool.close().await;
}

#[tokio::test]
async fn test_pool_saturated_acquire_resolves_after_release() {
    let engine = Arc::new(MockEngine::new());
    let config = PoolConfig::new(1, 1).with_acquire_timeout_ms(2_000);
    let pool = ConnectionPool::open(config, engine, test_options())
        .await
        .expect("open pool");

    let held = pool.acquire().await.expect("acquire");

    let waiter = tokio::spawn({
        let pool = Arc::clone(&pool);
        async move { pool.acquire().await.map(|conn| drop(conn)) }
    });

    // Give the waiter time to queue, then release.
    tokio::time::sleep(Duration::from_millis(100)).await;
    drop(held);

    waiter
        .await
        .expect("waiter task")
        .expect("waiter acquires after release");

    pool.close().await;
}

#[tokio::test]
async fn test_pool_waiters_served_in_arrival_order() {
    let engine = Arc::new(MockEngine::new());
    let config = PoolConfig::new(1, 1).with_acquire_timeout_ms(5_000);
    let pool = ConnectionPool::open(config, engine, test_options())
        .await
        .expect("open pool");

    let held = pool.acquire().await.expect("acquire");
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut waiters = Vec::new();
    for label in ["A", "B", "C"] {
        let pool = Arc::clone(&pool);
        let order = Arc::clone(&order);
        waiters.push(tokio::spawn(async move {
            let conn = pool.acquire().await.expect("queued acquire");
            order.lock().push(label);
            // Hold briefly so the next waiter observably runs after us.
            tokio::time::sleep(Duration::from_millis(10)).await;
            drop(conn);
        }));
        // Ensure each waiter is enqueued before the next arrives.
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    drop(held);
    for waiter in waiters {
        waiter.await.expect("waiter task");
    }

    assert_eq!(*order.lock(), vec!["A", "B", "C"]);
    pool.close().await;
}

#[tokio::test]
async fn test_pool_busy_count_never_exceeds_max() {
    let engine = Arc::new(MockEngine::new());
    let config = PoolConfig::new(1, 3).with_acquire_timeout_ms(5_000);
    let pool = ConnectionPool::open(config, engine.clone(), test_options())
        .await
        .expect("open pool");

    let current = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let pool = Arc::clone(&pool);
        let current = Arc::clone(&current);
        let max_seen = Arc::clone(&max_seen);
        tasks.push(tokio::spawn(async move {
            let conn = pool.acquire().await.expect("acquire");
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            max_seen.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            current.fetch_sub(1, Ordering::SeqCst);
            drop(conn);
        }));
    }
    for task in tasks {
        task.await.expect("task");
    }

    assert!(max_seen.load(Ordering::SeqCst) <= 3);
    assert!(engine.count() <= 3);
    pool.close().await;
}

#[tokio::test]
async fn test_maintenance_reaps_idle_but_keeps_min() {
    let engine = Arc::new(MockEngine::new());
    let config = PoolConfig::new(1, 5).with_idle_timeout_ms(50);
    let pool = ConnectionPool::open(config, engine.clone(), test_options())
        .await
        .expect("open pool");

    // Grow to three connections, then return them all.
    {
        let _c1 = pool.acquire().await.expect("acquire 1");
        let _c2 = pool.acquire().await.expect("acquire 2");
        let _c3 = pool.acquire().await.expect("acquire 3");
    }
    assert_eq!(pool.stats().idle(), 3);

    tokio::time::sleep(Duration::from_millis(80)).await;
    pool.maintenance().await;

    assert_eq!(pool.stats().idle(), 1);
    assert_eq!(engine.open_handle_count(), 1);

    // Another pass never goes below the minimum.
    tokio::time::sleep(Duration::from_millis(80)).await;
    pool.maintenance().await;
    assert_eq!(pool.stats().idle(), 1);

    pool.close().await;
}

#[tokio::test]
async fn test_maintenance_spares_recently_used_connections() {
    let engine = Arc::new(MockEngine::new());
    let config = PoolConfig::new(1, 5).with_idle_timeout_ms(10_000);
    let pool = ConnectionPool::open(config, engine.clone(), test_options())
        .await
        .expect("open pool");

    {
        let _c1 = pool.acquire().await.expect("acquire 1");
        let _c2 = pool.acquire().await.expect("acquire 2");
    }
    assert_eq!(pool.stats().idle(), 2);

    pool.maintenance().await;
    assert_eq!(pool.stats().idle(), 2);

    pool.close().await;
}

#[tokio::test]
async fn test_close_rejects_pending_waiters() {
    let engine = Arc::new(MockEngine::new());
    let config = PoolConfig::new(1, 1).with_acquire_timeout_ms(5_000);
    let pool = ConnectionPool::open(config, engine, test_options())
        .await
        .expect("open pool");

    let held = pool.acquire().await.expect("acquire");

    let waiter = tokio::spawn({
        let pool = Arc::clone(&pool);
        async move { pool.acquire().await.map(|conn| drop(conn)) }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    pool.close().await;

    let result = waiter.await.expect("waiter task");
    assert!(matches!(result, Err(CofferError::PoolClosed)));

    drop(held);
}

#[tokio::test]
async fn test_close_closes_all_handles_and_stops_acquire() {
    let engine = Arc::new(MockEngine::new());
    let pool = ConnectionPool::open(PoolConfig::new(2, 5), engine.clone(), test_options())
        .await
        .expect("open pool");

    // One busy, one idle at close time; both get closed.
    let held = pool.acquire().await.expect("acquire");
    pool.close().await;

    assert!(pool.is_closed());
    assert_eq!(engine.open_handle_count(), 0);
    assert!(matches!(pool.acquire().await, Err(CofferError::PoolClosed)));

    drop(held);
    // Closing again is a no-op.
    pool.close().await;
}
