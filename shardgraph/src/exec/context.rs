// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Execution context: worker pool, configuration and cancellation
//!
//! A context is cheap to clone and can be shared between threads. All
//! partition-parallel stages run on the context's `rayon` pool, so
//! `worker_threads` bounds the parallelism of every compute issued through it.

use log::debug;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::error::ExecutionError;
use crate::config::EngineConfig;

/// Cooperative cancellation flag shared between a caller and running computes.
///
/// Cancellation is observed before materialization begins and at every stage
/// barrier. Work already started inside a stage runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail with `Cancelled` if cancellation was requested
    pub fn check(&self) -> Result<(), ExecutionError> {
        if self.is_cancelled() {
            Err(ExecutionError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Shared state for executing operation graphs
#[derive(Clone)]
pub struct ExecutionContext {
    config: Arc<EngineConfig>,
    pool: Arc<rayon::ThreadPool>,
    cancellation: CancellationToken,
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("config", &self.config)
            .field("threads", &self.pool.current_num_threads())
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish()
    }
}

impl ExecutionContext {
    /// Create a context with its own worker pool
    pub fn new(config: EngineConfig) -> Result<Self, ExecutionError> {
        let mut builder = rayon::ThreadPoolBuilder::new()
            .thread_name(|i| format!("shardgraph-worker-{}", i));
        if let Some(threads) = config.worker_threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder
            .build()
            .map_err(|e| ExecutionError::ThreadPool(e.to_string()))?;

        debug!(
            "Execution context ready with {} worker threads",
            pool.current_num_threads()
        );

        Ok(Self {
            config: Arc::new(config),
            pool: Arc::new(pool),
            cancellation: CancellationToken::new(),
        })
    }

    /// Same pool and configuration, observing a different cancellation token
    pub fn with_cancellation(&self, cancellation: CancellationToken) -> Self {
        Self {
            config: self.config.clone(),
            pool: self.pool.clone(),
            cancellation,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `op` inside the worker pool
    pub fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_respects_worker_threads() {
        let config = EngineConfig {
            worker_threads: Some(2),
            ..EngineConfig::default()
        };
        let ctx = ExecutionContext::new(config).unwrap();
        assert_eq!(ctx.num_threads(), 2);
        assert_eq!(ctx.install(rayon::current_num_threads), 2);
    }

    #[test]
    fn test_cancellation_token_is_shared() {
        let ctx = ExecutionContext::new(EngineConfig::default()).unwrap();
        let token = CancellationToken::new();
        let scoped = ctx.with_cancellation(token.clone());

        assert!(scoped.cancellation().check().is_ok());
        token.cancel();
        assert!(matches!(
            scoped.cancellation().check(),
            Err(ExecutionError::Cancelled)
        ));
        assert!(!ctx.cancellation().is_cancelled());
    }
}
