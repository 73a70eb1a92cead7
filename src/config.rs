//! Pool configuration.
//!
//! Provides a type-safe interface for configuring pool behavior: capacity,
//! idle warm-up, staleness limits, sweep cadence, and checkout order.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use wirepool::{PoolConfig, ReturnOrder};
//!
//! let config = PoolConfig::new()
//!     .with_capacity(50)
//!     .with_min_idle(10)
//!     .with_pool_timeout(Duration::from_secs(5))
//!     .with_sweep_interval(Duration::from_secs(10))
//!     .with_return_order(ReturnOrder::Fifo);
//! ```
//!
//! Each duration field is independently optional; `None` disables the
//! corresponding behavior (no age limit, no idle limit, no sweeper, no
//! bounded admission wait).

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::Serialize;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default maximum number of connections.
pub const DEFAULT_CAPACITY: usize = 10;

/// Default admission wait timeout.
pub const DEFAULT_POOL_TIMEOUT: Duration = Duration::from_secs(5);

/// Default sweep interval for the background health sweeper.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

// ============================================================================
// ReturnOrder
// ============================================================================

/// Order in which idle connections are handed out relative to insertion.
///
/// With `Lifo` (the default) the most recently released connection is
/// reused first, keeping the working set small and letting the rest age
/// out. `Fifo` cycles through all idle connections evenly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ReturnOrder {
    /// Released connections are reused oldest-first.
    Fifo,
    /// Released connections are reused newest-first.
    #[default]
    Lifo,
}

// ============================================================================
// PoolConfig
// ============================================================================

/// Connection pool configuration.
///
/// Construct with [`PoolConfig::new`] and refine with the `with_*`
/// builder methods. Validated by [`Pool::new`](crate::Pool::new).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolConfig {
    /// Maximum number of connections, in-use plus idle.
    pub capacity: usize,

    /// Minimum number of warm idle connections the sweeper maintains.
    pub min_idle: usize,

    /// Maximum connection lifetime. `None` means connections never expire
    /// by age.
    pub max_conn_age: Option<Duration>,

    /// Maximum idle duration. `None` means connections never expire from
    /// sitting idle.
    pub idle_timeout: Option<Duration>,

    /// Interval between background sweep cycles. `None` disables the
    /// sweeper entirely (no eviction, no warm-up).
    pub sweep_interval: Option<Duration>,

    /// How long `acquire` waits for capacity when the pool is exhausted.
    /// `None` waits indefinitely.
    pub pool_timeout: Option<Duration>,

    /// Order in which idle connections are handed out.
    pub return_order: ReturnOrder,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl PoolConfig {
    /// Creates a configuration with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            min_idle: 0,
            max_conn_age: None,
            idle_timeout: None,
            sweep_interval: Some(DEFAULT_SWEEP_INTERVAL),
            pool_timeout: Some(DEFAULT_POOL_TIMEOUT),
            return_order: ReturnOrder::Lifo,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl PoolConfig {
    /// Sets the maximum number of connections.
    #[inline]
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the minimum warm idle connection count.
    #[inline]
    #[must_use]
    pub fn with_min_idle(mut self, min_idle: usize) -> Self {
        self.min_idle = min_idle;
        self
    }

    /// Sets the maximum connection age.
    #[inline]
    #[must_use]
    pub fn with_max_conn_age(mut self, age: Duration) -> Self {
        self.max_conn_age = Some(age);
        self
    }

    /// Sets the maximum idle duration.
    #[inline]
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Sets the background sweep interval.
    ///
    /// A zero interval disables the sweeper, as does
    /// [`without_sweeper`](Self::without_sweeper).
    #[inline]
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = if interval.is_zero() {
            None
        } else {
            Some(interval)
        };
        self
    }

    /// Disables the background sweeper.
    #[inline]
    #[must_use]
    pub fn without_sweeper(mut self) -> Self {
        self.sweep_interval = None;
        self
    }

    /// Sets the admission wait timeout.
    #[inline]
    #[must_use]
    pub fn with_pool_timeout(mut self, timeout: Duration) -> Self {
        self.pool_timeout = Some(timeout);
        self
    }

    /// Removes the admission wait timeout; `acquire` waits indefinitely.
    #[inline]
    #[must_use]
    pub fn without_pool_timeout(mut self) -> Self {
        self.pool_timeout = None;
        self
    }

    /// Sets the idle checkout order.
    #[inline]
    #[must_use]
    pub fn with_return_order(mut self, order: ReturnOrder) -> Self {
        self.return_order = order;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl PoolConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if capacity is zero or `min_idle` exceeds
    /// capacity.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::config("capacity must be at least 1"));
        }
        if self.min_idle > self.capacity {
            return Err(Error::config(format!(
                "min_idle ({}) exceeds capacity ({})",
                self.min_idle, self.capacity
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
