//! Connection pool manager.
//!
//! Owns the bounded collection of connections, the idle registry, the
//! admission semaphore, and the background health sweeper.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                      Pool                        │
//! │  ┌───────────────┐      ┌──────────────────────┐ │
//! │  │ admission     │      │ idle registry        │ │
//! │  │ semaphore     │      │ (VecDeque, FIFO/LIFO)│ │
//! │  │ (capacity)    │      │ + allocated count    │ │
//! │  └───────────────┘      └──────────────────────┘ │
//! │          ▲                        ▲              │
//! │          │ permits                │ mutex        │
//! │  acquire / release        background sweeper     │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! # Admission model
//!
//! Semaphore permits bound concurrent checkouts: a permit is taken when
//! `acquire` starts and held (forgotten) until the connection comes back
//! through release, discard, or guard drop. The allocated count (in-use
//! plus idle connections) lives under the registry mutex, so capacity
//! waiting is decoupled from registry
//! bookkeeping. Idle connections hold no permits, which is what lets a
//! released connection satisfy a parked waiter.
//!
//! No lock is ever held across dial or close I/O.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Semaphore, TryAcquireError};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::{PoolConfig, ReturnOrder};
use crate::error::{Error, Result};
use crate::stats::{Counters, Stats};
use crate::transport::{Connection, Dialer};

// ============================================================================
// Pool State
// ============================================================================

/// Registry state guarded by one mutex.
struct PoolState {
    /// Idle connections, ordered per the return-order policy.
    idle: VecDeque<Connection>,

    /// Connections currently allocated: in-use plus idle. Never exceeds
    /// capacity.
    allocated: usize,
}

/// Shared pool internals behind the [`Pool`] handle.
struct PoolInner {
    config: PoolConfig,
    dialer: Arc<dyn Dialer>,
    semaphore: Semaphore,
    state: Mutex<PoolState>,
    counters: Counters,
    closed: AtomicBool,
}

// ============================================================================
// Pool
// ============================================================================

/// Bounded, health-checked connection pool.
///
/// Cheap to clone; all clones share the same pool. Construct with
/// [`Pool::new`] inside a Tokio runtime (the background sweeper is spawned
/// at construction when a sweep interval is configured).
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use wirepool::{Pool, PoolConfig, TcpDialer};
///
/// let pool = Pool::new(
///     Arc::new(TcpDialer::new("127.0.0.1:9000")),
///     PoolConfig::new().with_capacity(50).with_min_idle(10),
/// )?;
///
/// let mut conn = pool.acquire().await?;
/// conn.write(b"ping").await?;
/// pool.release(conn).await;
/// # Ok::<_, wirepool::Error>(())
/// ```
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

impl Pool {
    /// Creates a pool using the given dial strategy.
    ///
    /// Spawns the background sweeper when `config.sweep_interval` is set;
    /// its first cycle runs immediately, pre-warming toward `min_idle`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration fails validation.
    pub fn new(dialer: Arc<dyn Dialer>, config: PoolConfig) -> Result<Self> {
        config.validate()?;

        let inner = Arc::new(PoolInner {
            semaphore: Semaphore::new(config.capacity),
            state: Mutex::new(PoolState {
                idle: VecDeque::with_capacity(config.capacity),
                allocated: 0,
            }),
            counters: Counters::default(),
            closed: AtomicBool::new(false),
            dialer,
            config,
        });

        if let Some(period) = inner.config.sweep_interval {
            spawn_sweeper(&inner, period);
        }

        info!(
            capacity = inner.config.capacity,
            min_idle = inner.config.min_idle,
            "connection pool started"
        );

        Ok(Self { inner })
    }

    /// Returns the pool configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Returns `true` once the pool has been closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Takes a statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> Stats {
        let idle = self.inner.state.lock().idle.len();
        self.inner.counters.snapshot(idle)
    }

    /// Returns the current idle connection count.
    #[inline]
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.inner.state.lock().idle.len()
    }
}

// ============================================================================
// Pool - Acquire
// ============================================================================

impl Pool {
    /// Checks a connection out of the pool.
    ///
    /// Reuses a healthy idle connection when one is available (per the
    /// configured FIFO/LIFO policy), otherwise dials a new one. When the
    /// pool is exhausted, waits up to `pool_timeout` for a checkout slot
    /// to free. Callers with their own deadline can wrap this future in
    /// [`tokio::time::timeout`]; dropping the future mid-wait or mid-dial
    /// leaks nothing.
    ///
    /// # Errors
    ///
    /// - [`Error::PoolClosed`] after [`close`](Self::close)
    /// - [`Error::PoolTimeout`] when the admission wait times out; no
    ///   admission slot is consumed
    /// - The dial strategy's error, propagated verbatim; the reserved slot
    ///   is released
    pub async fn acquire(&self) -> Result<PooledConnection> {
        let inner = &self.inner;

        if inner.closed.load(Ordering::SeqCst) {
            return Err(Error::PoolClosed);
        }

        // Reserve a checkout turn. Below capacity this never waits.
        let permit = match inner.semaphore.try_acquire() {
            Ok(permit) => permit,
            Err(TryAcquireError::Closed) => return Err(Error::PoolClosed),
            Err(TryAcquireError::NoPermits) => match inner.config.pool_timeout {
                Some(wait) => match time::timeout(wait, inner.semaphore.acquire()).await {
                    Ok(Ok(permit)) => permit,
                    Ok(Err(_closed)) => return Err(Error::PoolClosed),
                    Err(_elapsed) => {
                        inner.counters.incr_timeouts();
                        return Err(Error::pool_timeout(wait.as_millis() as u64));
                    }
                },
                None => inner
                    .semaphore
                    .acquire()
                    .await
                    .map_err(|_| Error::PoolClosed)?,
            },
        };

        // Turn in hand: reuse idle connections, evicting stale ones as we
        // go. The wait above is never restarted; stale evictions retry
        // immediately under the same turn.
        loop {
            if inner.closed.load(Ordering::SeqCst) {
                return Err(Error::PoolClosed);
            }

            let candidate = inner.state.lock().idle.pop_front();

            let Some(mut conn) = candidate else {
                // Nothing idle. A permit holder seeing an empty registry
                // always has spare capacity: in-use connections account
                // for the other permits.
                let reservation = ReserveGuard::new(inner);
                let transport = match inner.dialer.dial().await {
                    Ok(transport) => transport,
                    Err(error) => return Err(error),
                };
                reservation.commit();

                inner.counters.incr_total_created();
                inner.counters.incr_misses();

                let mut conn = Connection::new(transport);
                conn.mark_initialized();
                conn.mark_pooled();
                debug!(conn_id = %conn.id(), "dialed new connection");

                permit.forget();
                return Ok(PooledConnection::new(conn, Arc::clone(inner)));
            };

            if conn.is_stale(
                inner.config.max_conn_age,
                inner.config.idle_timeout,
                Instant::now(),
            ) {
                inner.state.lock().allocated -= 1;
                inner.counters.incr_stale_evicted();
                debug!(conn_id = %conn.id(), "evicting stale connection on acquire");
                if let Err(error) = conn.close().await {
                    debug!(%error, "error closing stale connection");
                }
                continue;
            }

            conn.touch();
            inner.counters.incr_hits();
            permit.forget();
            return Ok(PooledConnection::new(conn, Arc::clone(inner)));
        }
    }
}

// ============================================================================
// Pool - Release
// ============================================================================

impl Pool {
    /// Returns a connection to the pool.
    ///
    /// Never blocks on capacity. A healthy connection goes back to the
    /// idle registry: tail for FIFO, head for LIFO. A stale connection,
    /// or any connection returned after [`close`](Self::close), is closed
    /// and its admission slot freed.
    ///
    /// The health check is time-based only. A caller that hit an I/O error
    /// and suspects the transport is broken should use
    /// [`discard`](Self::discard) instead.
    pub async fn release(&self, mut conn: PooledConnection) {
        let Some(conn) = conn.take() else { return };
        if let Some(mut retired) = self.inner.check_in(conn) {
            debug!(conn_id = %retired.id(), "connection retired on release");
            if let Err(error) = retired.close().await {
                debug!(%error, "error closing retired connection");
            }
        }
    }

    /// Retires a connection without a health check.
    ///
    /// For callers that observed a transport error and do not trust the
    /// connection anymore. The admission slot is freed for a future dial.
    pub async fn discard(&self, mut conn: PooledConnection) {
        let Some(mut conn) = conn.take() else { return };
        debug!(conn_id = %conn.id(), "connection discarded");
        self.inner.retire_slot();
        if let Err(error) = conn.close().await {
            debug!(%error, "error closing discarded connection");
        }
    }
}

// ============================================================================
// Pool - Close
// ============================================================================

impl Pool {
    /// Closes the pool.
    ///
    /// Marks the pool closed (failing parked and future `acquire` calls
    /// with [`Error::PoolClosed`]), stops the sweeper, and drains and
    /// closes every idle connection. Connections currently checked out
    /// stay with their holders; releasing them later retires them.
    ///
    /// Idempotent: a second call is a no-op.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        info!("closing connection pool");
        self.inner.semaphore.close();

        let drained: Vec<Connection> = {
            let mut state = self.inner.state.lock();
            let drained: Vec<Connection> = state.idle.drain(..).collect();
            state.allocated -= drained.len();
            drained
        };

        for mut conn in drained {
            debug!(conn_id = %conn.id(), "closing idle connection");
            if let Err(error) = conn.close().await {
                debug!(%error, "error closing idle connection");
            }
        }
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("config", &self.inner.config)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// PoolInner - Check-in / Retire
// ============================================================================

impl PoolInner {
    /// Synchronous half of release: either re-registers the connection as
    /// idle or unregisters it, returning it for the caller to close.
    ///
    /// Always returns the checkout permit.
    fn check_in(&self, conn: Connection) -> Option<Connection> {
        conn.touch();

        let stale = conn.is_stale(
            self.config.max_conn_age,
            self.config.idle_timeout,
            Instant::now(),
        );
        let closed = self.closed.load(Ordering::SeqCst);

        if closed || stale {
            if stale {
                self.counters.incr_stale_evicted();
            }
            self.retire_slot();
            return Some(conn);
        }

        {
            let mut state = self.state.lock();
            match self.config.return_order {
                ReturnOrder::Fifo => state.idle.push_back(conn),
                ReturnOrder::Lifo => state.idle.push_front(conn),
            }
        }
        self.semaphore.add_permits(1);
        None
    }

    /// Frees one admission slot and its checkout permit.
    fn retire_slot(&self) {
        self.state.lock().allocated -= 1;
        self.semaphore.add_permits(1);
    }

    /// Release path for dropped [`PooledConnection`] guards.
    ///
    /// Same accounting as release; the transport close is spawned when a
    /// runtime is available, otherwise the handle drop closes the socket.
    fn release_on_drop(&self, conn: Connection) {
        if let Some(mut retired) = self.check_in(conn) {
            debug!(conn_id = %retired.id(), "connection retired on drop");
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let _ = retired.close().await;
                });
            }
        }
    }
}

// ============================================================================
// PoolInner - Sweeper
// ============================================================================

impl PoolInner {
    /// One sweep cycle: evict stale idle connections, then warm the idle
    /// registry back up toward `min_idle`.
    async fn sweep(&self) {
        // Eviction. The whole scan happens in one critical section; the
        // closes happen after it.
        let now = Instant::now();
        let stale: Vec<Connection> = {
            let mut state = self.state.lock();
            let mut kept = VecDeque::with_capacity(state.idle.len());
            let mut stale = Vec::new();
            while let Some(conn) = state.idle.pop_front() {
                if conn.is_stale(self.config.max_conn_age, self.config.idle_timeout, now) {
                    stale.push(conn);
                } else {
                    kept.push_back(conn);
                }
            }
            state.idle = kept;
            state.allocated -= stale.len();
            stale
        };

        for mut conn in stale {
            self.counters.incr_stale_evicted();
            debug!(conn_id = %conn.id(), "sweeper evicted stale connection");
            if let Err(error) = conn.close().await {
                debug!(%error, "error closing swept connection");
            }
        }

        // Warm-up. One dial at a time; a failure ends the cycle.
        loop {
            if self.closed.load(Ordering::SeqCst) {
                break;
            }

            let reserved = {
                let mut state = self.state.lock();
                if state.idle.len() < self.config.min_idle
                    && state.allocated < self.config.capacity
                {
                    state.allocated += 1;
                    true
                } else {
                    false
                }
            };
            if !reserved {
                break;
            }

            match self.dialer.dial().await {
                Ok(transport) => {
                    self.counters.incr_total_created();
                    let mut conn = Connection::new(transport);
                    conn.mark_initialized();
                    conn.mark_pooled();
                    let conn_id = conn.id();

                    let rejected = {
                        let mut state = self.state.lock();
                        if self.closed.load(Ordering::SeqCst) {
                            state.allocated -= 1;
                            Some(conn)
                        } else {
                            state.idle.push_back(conn);
                            None
                        }
                    };

                    match rejected {
                        None => debug!(conn_id = %conn_id, "warm-up connection added"),
                        Some(mut conn) => {
                            // Pool closed mid-dial; do not park the
                            // connection in a drained registry.
                            let _ = conn.close().await;
                            break;
                        }
                    }
                }
                Err(error) => {
                    self.state.lock().allocated -= 1;
                    warn!(%error, "warm-up dial failed");
                    break;
                }
            }
        }
    }
}

/// Spawns the background sweeper for a pool.
///
/// The task holds only a weak reference between cycles, so an abandoned
/// pool is freed at the next tick; a closed pool stops the task the same
/// way.
fn spawn_sweeper(inner: &Arc<PoolInner>, period: Duration) {
    let weak = Arc::downgrade(inner);
    tokio::spawn(async move {
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(inner) = weak.upgrade() else { break };
            if inner.closed.load(Ordering::SeqCst) {
                break;
            }
            inner.sweep().await;
        }
        debug!("sweeper stopped");
    });
}

// ============================================================================
// ReserveGuard
// ============================================================================

/// Holds one reserved admission slot during a dial.
///
/// Rolls the reservation back on drop unless committed, which covers the
/// acquiring future being cancelled mid-dial.
struct ReserveGuard<'a> {
    inner: &'a PoolInner,
    armed: bool,
}

impl<'a> ReserveGuard<'a> {
    fn new(inner: &'a PoolInner) -> Self {
        let mut state = inner.state.lock();
        state.allocated += 1;
        debug_assert!(state.allocated <= inner.config.capacity);
        drop(state);
        Self { inner, armed: true }
    }

    fn commit(mut self) {
        self.armed = false;
    }
}

impl Drop for ReserveGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.inner.state.lock().allocated -= 1;
        }
    }
}

// ============================================================================
// PooledConnection
// ============================================================================

/// A checked-out connection.
///
/// Derefs to [`Connection`] for I/O. Hand it back with
/// [`Pool::release`] (or [`Pool::discard`] if the transport is suspect);
/// dropping the guard performs the same release accounting as a safety
/// net, so early returns cannot leak admission slots.
pub struct PooledConnection {
    conn: Option<Connection>,
    inner: Arc<PoolInner>,
}

impl PooledConnection {
    fn new(conn: Connection, inner: Arc<PoolInner>) -> Self {
        Self {
            conn: Some(conn),
            inner,
        }
    }

    /// Takes the connection out of the guard, disarming the drop path.
    fn take(&mut self) -> Option<Connection> {
        self.conn.take()
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection present until release")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection present until release")
    }
}

impl fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("conn", &self.conn)
            .finish_non_exhaustive()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.inner.release_on_drop(conn);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use tokio::io::DuplexStream;
    use uuid::Uuid;

    use crate::transport::Transport;

    /// In-memory dialer: each dial is one side of a fresh duplex pipe.
    #[derive(Default)]
    struct MockDialer {
        /// Far ends, kept alive so pooled connections stay writable.
        peers: Mutex<Vec<DuplexStream>>,
        dials: AtomicUsize,
        fail: AtomicBool,
    }

    impl MockDialer {
        fn dial_count(&self) -> usize {
            self.dials.load(Ordering::SeqCst)
        }

        fn set_fail(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Dialer for MockDialer {
        async fn dial(&self) -> Result<Box<dyn Transport>> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::dial("mock dial refused"));
            }
            self.dials.fetch_add(1, Ordering::SeqCst);
            let (near, far) = tokio::io::duplex(64);
            self.peers.lock().push(far);
            Ok(Box::new(near))
        }
    }

    fn quiet_config() -> PoolConfig {
        PoolConfig::new().without_sweeper()
    }

    fn new_pool(config: PoolConfig) -> (Pool, Arc<MockDialer>) {
        let dialer = Arc::new(MockDialer::default());
        let pool = Pool::new(dialer.clone(), config).expect("pool");
        (pool, dialer)
    }

    fn allocated(pool: &Pool) -> usize {
        pool.inner.state.lock().allocated
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let dialer = Arc::new(MockDialer::default());
        assert!(Pool::new(dialer, PoolConfig::new().with_capacity(0)).is_err());
    }

    #[tokio::test]
    async fn test_acquire_dials_then_reuses() {
        let (pool, dialer) = new_pool(quiet_config());

        let conn = pool.acquire().await.expect("first acquire");
        assert_eq!(dialer.dial_count(), 1);
        assert!(conn.is_pooled());
        assert!(conn.is_initialized());
        pool.release(conn).await;
        assert_eq!(pool.idle_count(), 1);

        let conn = pool.acquire().await.expect("second acquire");
        assert_eq!(dialer.dial_count(), 1, "idle connection must be reused");
        pool.release(conn).await;

        let stats = pool.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.total_created, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_acquire_reuses_released_connection() {
        // Capacity 2, no limits: a parked caller reuses the first release.
        let (pool, _dialer) = new_pool(quiet_config().with_capacity(2).without_pool_timeout());

        let first = pool.acquire().await.expect("first");
        let second = pool.acquire().await.expect("second");
        assert_eq!(allocated(&pool), 2);

        let mut contender = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire().await })
        };

        // The third acquire parks: capacity is exhausted.
        let parked = time::timeout(Duration::from_millis(10), &mut contender).await;
        assert!(parked.is_err(), "third acquire must block at capacity");

        pool.release(first).await;
        let third = contender
            .await
            .expect("join")
            .expect("third acquire after release");
        assert_eq!(allocated(&pool), 2);

        pool.release(second).await;
        pool.release(third).await;

        let stats = pool.stats();
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.total_created, 2);
        assert_eq!(stats.timeouts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_times_out_at_capacity() {
        let (pool, _dialer) = new_pool(
            quiet_config()
                .with_capacity(1)
                .with_pool_timeout(Duration::from_millis(50)),
        );

        let held = pool.acquire().await.expect("acquire");

        let err = pool.acquire().await.expect_err("must time out");
        assert!(matches!(err, Error::PoolTimeout { timeout_ms: 50 }));
        assert_eq!(pool.stats().timeouts, 1);
        // The failed wait consumed no admission slot.
        assert_eq!(allocated(&pool), 1);

        pool.release(held).await;
        let conn = pool.acquire().await.expect("acquire after release");
        pool.release(conn).await;
    }

    #[tokio::test]
    async fn test_dial_failure_frees_reserved_slot() {
        let (pool, dialer) = new_pool(quiet_config());
        dialer.set_fail(true);

        let err = pool.acquire().await.expect_err("dial must fail");
        assert!(matches!(err, Error::Dial { .. }));
        assert_eq!(allocated(&pool), 0);
        assert_eq!(pool.stats().total_created, 0);
        assert_eq!(pool.stats().misses, 0);

        dialer.set_fail(false);
        let conn = pool.acquire().await.expect("acquire after recovery");
        assert_eq!(allocated(&pool), 1);
        pool.release(conn).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_evicts_aged_connection() {
        let (pool, _dialer) = new_pool(
            quiet_config()
                .with_capacity(2)
                .with_max_conn_age(Duration::from_millis(50)),
        );

        let conn = pool.acquire().await.expect("acquire");
        time::advance(Duration::from_millis(60)).await;
        pool.release(conn).await;

        assert_eq!(pool.idle_count(), 0);
        assert_eq!(allocated(&pool), 0);
        assert_eq!(pool.stats().stale_evicted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_skips_stale_idle_connection() {
        let (pool, dialer) = new_pool(
            quiet_config()
                .with_capacity(2)
                .with_idle_timeout(Duration::from_millis(50)),
        );

        let conn = pool.acquire().await.expect("acquire");
        pool.release(conn).await;
        assert_eq!(pool.idle_count(), 1);

        time::advance(Duration::from_millis(60)).await;

        // The idle connection went stale; acquire evicts it and dials.
        let conn = pool.acquire().await.expect("acquire");
        assert_eq!(dialer.dial_count(), 2);
        assert_eq!(pool.stats().stale_evicted, 1);
        assert_eq!(pool.stats().hits, 0);
        assert_eq!(allocated(&pool), 1);
        pool.release(conn).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_idle_connections() {
        let (pool, _dialer) = new_pool(
            PoolConfig::new()
                .with_capacity(2)
                .with_idle_timeout(Duration::from_millis(50))
                .with_sweep_interval(Duration::from_millis(20)),
        );

        let conn = pool.acquire().await.expect("acquire");
        pool.release(conn).await;
        assert_eq!(pool.idle_count(), 1);

        // Let several sweep cycles run past the idle deadline.
        time::sleep(Duration::from_millis(200)).await;

        assert_eq!(pool.idle_count(), 0);
        assert_eq!(allocated(&pool), 0);
        assert_eq!(pool.stats().stale_evicted, 1);
        pool.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_warms_up_to_min_idle() {
        let (pool, dialer) = new_pool(
            PoolConfig::new()
                .with_capacity(3)
                .with_min_idle(2)
                .with_sweep_interval(Duration::from_millis(20)),
        );

        time::sleep(Duration::from_millis(100)).await;

        assert_eq!(pool.idle_count(), 2);
        assert_eq!(allocated(&pool), 2);
        assert_eq!(dialer.dial_count(), 2);
        assert_eq!(pool.stats().total_created, 2);
        pool.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_warmup_respects_capacity() {
        let (pool, _dialer) = new_pool(
            PoolConfig::new()
                .with_capacity(2)
                .with_min_idle(2)
                .with_sweep_interval(Duration::from_millis(20))
                .with_pool_timeout(Duration::from_millis(50)),
        );

        // Hold both slots; warm-up must not allocate past capacity.
        let first = pool.acquire().await.expect("first");
        let second = pool.acquire().await.expect("second");

        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(allocated(&pool), 2);
        assert_eq!(pool.idle_count(), 0);

        pool.release(first).await;
        pool.release(second).await;
        pool.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_warmup_dial_failure_is_nonfatal() {
        let (pool, dialer) = new_pool(
            PoolConfig::new()
                .with_capacity(2)
                .with_min_idle(1)
                .with_sweep_interval(Duration::from_millis(20)),
        );
        dialer.set_fail(true);

        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(allocated(&pool), 0);

        // The sweeper survives the failures and recovers.
        dialer.set_fail(false);
        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(pool.idle_count(), 1);
        pool.close().await;
    }

    #[tokio::test]
    async fn test_fifo_hands_out_oldest_first() {
        let (pool, _dialer) = new_pool(
            quiet_config()
                .with_capacity(3)
                .with_return_order(ReturnOrder::Fifo),
        );

        let a = pool.acquire().await.expect("a");
        let b = pool.acquire().await.expect("b");
        let (id_a, id_b) = (a.id(), b.id());
        pool.release(a).await;
        pool.release(b).await;

        let order: Vec<Uuid> = {
            let first = pool.acquire().await.expect("first");
            let second = pool.acquire().await.expect("second");
            let order = vec![first.id(), second.id()];
            pool.release(first).await;
            pool.release(second).await;
            order
        };
        assert_eq!(order, vec![id_a, id_b]);
    }

    #[tokio::test]
    async fn test_lifo_hands_out_newest_first() {
        let (pool, _dialer) = new_pool(
            quiet_config()
                .with_capacity(3)
                .with_return_order(ReturnOrder::Lifo),
        );

        let a = pool.acquire().await.expect("a");
        let b = pool.acquire().await.expect("b");
        let (id_a, id_b) = (a.id(), b.id());
        pool.release(a).await;
        pool.release(b).await;

        let first = pool.acquire().await.expect("first");
        let second = pool.acquire().await.expect("second");
        assert_eq!(first.id(), id_b);
        assert_eq!(second.id(), id_a);
        pool.release(first).await;
        pool.release(second).await;
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_rejects_acquire() {
        let (pool, _dialer) = new_pool(quiet_config());

        let conn = pool.acquire().await.expect("acquire");
        pool.release(conn).await;
        assert_eq!(pool.idle_count(), 1);

        pool.close().await;
        assert!(pool.is_closed());
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(allocated(&pool), 0);

        let err = pool.acquire().await.expect_err("must fail");
        assert!(matches!(err, Error::PoolClosed));

        // Second close is a no-op.
        pool.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_fails_parked_waiters() {
        let (pool, _dialer) = new_pool(quiet_config().with_capacity(1).without_pool_timeout());

        let held = pool.acquire().await.expect("acquire");

        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire().await })
        };
        // Let the waiter park on the semaphore.
        time::sleep(Duration::from_millis(5)).await;

        pool.close().await;
        let err = waiter.await.expect("join").expect_err("waiter must fail");
        assert!(matches!(err, Error::PoolClosed));

        // The in-use connection retires on release against the closed pool.
        pool.release(held).await;
        assert_eq!(allocated(&pool), 0);
    }

    #[tokio::test]
    async fn test_release_after_close_retires_connection() {
        let (pool, _dialer) = new_pool(quiet_config());

        let conn = pool.acquire().await.expect("acquire");
        pool.close().await;
        pool.release(conn).await;

        assert_eq!(pool.idle_count(), 0);
        assert_eq!(allocated(&pool), 0);
    }

    #[tokio::test]
    async fn test_discard_frees_slot_without_pooling() {
        let (pool, dialer) = new_pool(quiet_config());

        let conn = pool.acquire().await.expect("acquire");
        pool.discard(conn).await;
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(allocated(&pool), 0);

        let conn = pool.acquire().await.expect("acquire");
        assert_eq!(dialer.dial_count(), 2);
        pool.release(conn).await;
    }

    #[tokio::test]
    async fn test_dropped_guard_returns_connection() {
        let (pool, _dialer) = new_pool(quiet_config());

        let conn = pool.acquire().await.expect("acquire");
        drop(conn);

        assert_eq!(pool.idle_count(), 1);
        assert_eq!(allocated(&pool), 1);

        let conn = pool.acquire().await.expect("acquire");
        assert_eq!(pool.stats().hits, 1);
        pool.release(conn).await;
    }

    #[tokio::test]
    async fn test_concurrent_checkouts_stay_bounded() {
        const CAPACITY: usize = 4;
        const TASKS: usize = 16;
        const ROUNDS: usize = 10;

        let (pool, dialer) = new_pool(
            quiet_config()
                .with_capacity(CAPACITY)
                .without_pool_timeout(),
        );

        let mut workers = Vec::new();
        for _ in 0..TASKS {
            let pool = pool.clone();
            workers.push(tokio::spawn(async move {
                for _ in 0..ROUNDS {
                    let conn = pool.acquire().await.expect("acquire");
                    tokio::task::yield_now().await;
                    pool.release(conn).await;
                }
            }));
        }
        for worker in workers {
            worker.await.expect("worker");
        }

        // Bounded admission: never more than CAPACITY connections existed.
        assert!(dialer.dial_count() <= CAPACITY);
        assert!(allocated(&pool) <= CAPACITY);
        let stats = pool.stats();
        assert_eq!(stats.hits + stats.misses, (TASKS * ROUNDS) as u64);
    }

    #[tokio::test]
    async fn test_stats_snapshot_shape() {
        let (pool, _dialer) = new_pool(quiet_config());

        let conn = pool.acquire().await.expect("acquire");
        pool.release(conn).await;

        let stats = pool.stats();
        assert_eq!(stats.idle, 1);
        assert_eq!(stats.total_created, 1);

        let json = serde_json::to_string(&stats).expect("serialize");
        assert!(json.contains("\"total_created\":1"));
    }
}
