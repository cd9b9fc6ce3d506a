// src/controller.rs - Owns the form, the pending run and the last result
use tracing::{error, info, warn};

use crate::api::BacktestService;
use crate::config::ServiceBase;
use crate::errors::{ClientError, ErrorKind, RunError};
use crate::form::RequestDraft;
use crate::result_view::ResultView;
use crate::types::{BacktestRequest, BacktestResponse};

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Success(BacktestResponse),
    Failure { kind: ErrorKind, message: String },
}

impl RunOutcome {
    pub fn from_result(result: Result<BacktestResponse, ClientError>) -> Self {
        match result {
            Ok(response) => RunOutcome::Success(response),
            Err(e) => RunOutcome::Failure {
                kind: e.kind(),
                message: e.user_message(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success(_))
    }

    /// Text for the blocking alert shown after a failed run.
    pub fn alert_text(&self) -> Option<String> {
        match self {
            RunOutcome::Success(_) => None,
            RunOutcome::Failure { message, .. } => Some(format!("回测失败：{}", message)),
        }
    }
}

#[derive(Debug, Default)]
pub struct Controller {
    draft: RequestDraft,
    in_flight: Option<BacktestRequest>,
    outcome: Option<RunOutcome>,
    /// out_dir of the request that produced `outcome`; result links are scoped by it.
    outcome_out_dir: String,
    runs_started: u64,
}

impl Controller {
    pub fn new(draft: RequestDraft) -> Self {
        Self {
            draft,
            ..Default::default()
        }
    }

    pub fn draft(&self) -> &RequestDraft {
        &self.draft
    }

    pub fn update(&mut self, edit: impl FnOnce(RequestDraft) -> RequestDraft) {
        let current = std::mem::take(&mut self.draft);
        self.draft = edit(current);
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn runs_started(&self) -> u64 {
        self.runs_started
    }

    pub fn outcome(&self) -> Option<&RunOutcome> {
        self.outcome.as_ref()
    }

    pub fn response(&self) -> Option<&BacktestResponse> {
        match &self.outcome {
            Some(RunOutcome::Success(response)) => Some(response),
            _ => None,
        }
    }

    pub fn result_view(&self, base: &ServiceBase) -> Option<ResultView> {
        self.response()
            .map(|response| ResultView::build(response, &self.outcome_out_dir, base))
    }

    /// Starts a run: rejects a second submit while one is pending, coerces
    /// the form, then marks loading and drops the previous result.
    pub fn begin_run(&mut self) -> Result<BacktestRequest, RunError> {
        if self.in_flight.is_some() {
            warn!("Ignoring submit, a backtest is already running");
            return Err(RunError::AlreadyRunning);
        }

        let request = self.draft.build_request()?;

        self.outcome = None;
        self.outcome_out_dir.clear();
        self.in_flight = Some(request.clone());
        self.runs_started += 1;
        info!(
            "🚀 Run #{} started: {} on {} ({})",
            self.runs_started, request.strategy, request.symbols, request.timeframe
        );
        Ok(request)
    }

    /// Completes the pending run. Loading always ends here, whatever the outcome.
    pub fn finish_run(&mut self, outcome: RunOutcome) {
        let Some(request) = self.in_flight.take() else {
            warn!("Dropping a run completion with no run in flight");
            return;
        };

        match &outcome {
            RunOutcome::Success(response) => {
                let requested = request.symbol_list();
                for symbol in response.results.keys() {
                    if !requested.contains(&symbol) {
                        warn!(
                            "Run {} returned a result for {} which was not requested ({})",
                            response.run_id, symbol, request.symbols
                        );
                    }
                }
            }
            RunOutcome::Failure { kind, message } => {
                error!("回测失败 ({:?}): {}", kind, message);
            }
        }

        self.outcome_out_dir = request.out_dir;
        self.outcome = Some(outcome);
    }

    /// One full submit against `service`.
    pub async fn run<S: BacktestService>(&mut self, service: &S) -> Result<RunOutcome, RunError> {
        let request = self.begin_run()?;
        let result = service.run_backtest(&request).await;
        let outcome = RunOutcome::from_result(result);
        self.finish_run(outcome.clone());
        Ok(outcome)
    }
}
