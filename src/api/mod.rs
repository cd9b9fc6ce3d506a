// src/api/mod.rs
use std::future::Future;

use crate::config::ServiceBase;
use crate::errors::ClientError;
use crate::types::{BacktestRequest, BacktestResponse};

pub mod client;
pub mod lenient_json;

pub use client::{BacktestClient, RetryPolicy};

pub const SYMBOLS_PATH: &str = "symbols";
pub const RUN_BACKTEST_PATH: &str = "run_backtest";
pub const RESULTS_PATH: &str = "results";

/// The two calls the panel makes against the backtest service.
pub trait BacktestService: Send + Sync {
    fn base(&self) -> &ServiceBase;

    fn fetch_symbols(&self) -> impl Future<Output = Result<Vec<String>, ClientError>> + Send;

    fn run_backtest(
        &self,
        request: &BacktestRequest,
    ) -> impl Future<Output = Result<BacktestResponse, ClientError>> + Send;
}
