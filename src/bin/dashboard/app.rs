// src/bin/dashboard/app.rs - App state and the actions bound to keys
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use tracing::{info, warn};

use backtest_panel::api::{BacktestClient, BacktestService};
use backtest_panel::controller::{Controller, RunOutcome};
use backtest_panel::errors::{ErrorKind, RunError};
use backtest_panel::form::{InputKind, ParameterField, RequestDraft};
use backtest_panel::result_view::ResultView;
use backtest_panel::symbols::{SymbolList, SymbolSelector};

use crate::types::{form_rows, AppEvent, FormRow, InputMode};

pub struct App {
    pub client: BacktestClient,
    pub api_base_url: String,
    pub controller: Controller,
    pub symbols: SymbolSelector,
    pub rows: Vec<FormRow>,
    pub selected_row: usize,
    pub input_mode: InputMode,
    pub edit_buffer: String,
    /// Blocking alert; any key dismisses it.
    pub alert: Option<String>,
    pub status_message: Option<String>,
    pub result_scroll: u16,
    pub last_update: Instant,
    events_tx: UnboundedSender<AppEvent>,
    events_rx: UnboundedReceiver<AppEvent>,
}

impl App {
    pub fn new(client: BacktestClient) -> Self {
        let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel();
        let api_base_url = client.base().to_string();

        Self {
            client,
            api_base_url,
            controller: Controller::new(RequestDraft::default()),
            symbols: SymbolSelector::new(),
            rows: form_rows(),
            selected_row: 0,
            input_mode: InputMode::Normal,
            edit_buffer: String::new(),
            alert: None,
            status_message: None,
            result_scroll: 0,
            last_update: Instant::now(),
            events_tx,
            events_rx,
        }
    }

    /// Loads the symbol list once in the background.
    pub fn start_symbol_fetch(&self) {
        let client = self.client.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let list = SymbolList::load(&client).await;
            let _ = tx.send(AppEvent::SymbolsLoaded(list));
        });
    }

    /// Applies every completion that arrived since the last frame.
    pub fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        self.last_update = Instant::now();
        match event {
            AppEvent::SymbolsLoaded(list) => {
                if let SymbolList::Ready(symbols) = &list {
                    info!("Symbol selector ready with {} options", symbols.len());
                }
                self.symbols.resolve(list);
            }
            AppEvent::RunFinished(outcome) => {
                self.alert = outcome.alert_text();
                self.status_message = match &outcome {
                    RunOutcome::Success(response) => Some(format!("✅ {}", response.run_id)),
                    RunOutcome::Failure { .. } => None,
                };
                self.result_scroll = 0;
                self.controller.finish_run(outcome);
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.controller.is_loading()
    }

    pub fn result_view(&self) -> Option<ResultView> {
        self.controller.result_view(self.client.base())
    }

    pub fn selected(&self) -> FormRow {
        self.rows[self.selected_row]
    }

    pub fn select_next_row(&mut self) {
        self.selected_row = (self.selected_row + 1) % self.rows.len();
    }

    pub fn select_previous_row(&mut self) {
        self.selected_row = if self.selected_row == 0 {
            self.rows.len() - 1
        } else {
            self.selected_row - 1
        };
    }

    /// Text shown in the value column for a row.
    pub fn row_value(&self, row: FormRow) -> String {
        let draft = self.controller.draft();
        match row {
            FormRow::Strategy => draft.strategy().label().to_string(),
            FormRow::SymbolPicker => self
                .symbols
                .display_text(draft.value(ParameterField::Symbols)),
            FormRow::Field(field) => draft.value(field).to_string(),
            FormRow::Mode => draft.mode().id().to_string(),
            FormRow::CombMode => draft.comb_mode().id().to_string(),
        }
    }

    /// ←/→ on the selected row: cycle selectors, step numeric fields.
    pub fn cycle_selected(&mut self, direction: i32) {
        match self.selected() {
            FormRow::Strategy => self.controller.update(|d| {
                let next = if direction >= 0 {
                    d.strategy().next()
                } else {
                    d.strategy().previous()
                };
                d.with_strategy(next)
            }),
            FormRow::SymbolPicker => {
                let current = self.controller.draft().value(ParameterField::Symbols).to_string();
                let picked = if direction >= 0 {
                    self.symbols.next_after(&current)
                } else {
                    self.symbols.previous_before(&current)
                }
                .map(str::to_string);
                if let Some(symbol) = picked {
                    self.controller.update(|d| d.with_value(ParameterField::Symbols, symbol));
                }
            }
            FormRow::Mode => self.controller.update(|d| {
                let mode = d.mode().toggle();
                d.with_mode(mode)
            }),
            FormRow::CombMode => self.controller.update(|d| {
                let comb_mode = d.comb_mode().toggle();
                d.with_comb_mode(comb_mode)
            }),
            FormRow::Field(field) => {
                if matches!(field.kind(), InputKind::Number { .. }) {
                    self.controller.update(|d| d.stepped(field, direction));
                }
            }
        }
    }

    pub fn start_editing(&mut self) {
        match self.selected() {
            FormRow::Field(field) => {
                self.edit_buffer = self.controller.draft().value(field).to_string();
                self.input_mode = InputMode::Editing;
            }
            _ => self.cycle_selected(1),
        }
    }

    pub fn handle_edit_char(&mut self, c: char) {
        if self.input_mode == InputMode::Editing {
            self.edit_buffer.push(c);
        }
    }

    pub fn handle_edit_backspace(&mut self) {
        if self.input_mode == InputMode::Editing {
            self.edit_buffer.pop();
        }
    }

    /// Stores the raw text; numbers are only checked when a run is submitted.
    pub fn commit_edit(&mut self) {
        if let FormRow::Field(field) = self.selected() {
            let value = std::mem::take(&mut self.edit_buffer);
            self.controller.update(|d| d.with_value(field, value));
        }
        self.input_mode = InputMode::Normal;
    }

    pub fn cancel_edit(&mut self) {
        self.edit_buffer.clear();
        self.input_mode = InputMode::Normal;
    }

    pub fn submit(&mut self) {
        let request = match self.controller.begin_run() {
            Ok(request) => request,
            Err(RunError::AlreadyRunning) => {
                self.status_message = Some("运行中… please wait".to_string());
                return;
            }
            Err(RunError::Form(e)) => {
                warn!("Form rejected: {}", e);
                self.alert = Some(format!("参数错误：{}", e));
                return;
            }
        };

        self.status_message = None;
        let client = self.client.clone();
        let tx = self.events_tx.clone();

        // The outer task reports even if the request task panics, so the
        // loading state cannot get stuck.
        tokio::spawn(async move {
            let handle = tokio::spawn(async move { client.run_backtest(&request).await });
            let outcome = match handle.await {
                Ok(result) => RunOutcome::from_result(result),
                Err(e) => RunOutcome::Failure {
                    kind: ErrorKind::Transport,
                    message: format!("backtest task aborted: {}", e),
                },
            };
            let _ = tx.send(AppEvent::RunFinished(outcome));
        });
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    pub fn scroll_results(&mut self, delta: i32) {
        self.result_scroll = if delta < 0 {
            self.result_scroll.saturating_sub(delta.unsigned_abs() as u16)
        } else {
            self.result_scroll.saturating_add(delta as u16)
        };
    }
}
