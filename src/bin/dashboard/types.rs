// src/bin/dashboard/types.rs - Type definitions for the dashboard
use backtest_panel::controller::RunOutcome;
use backtest_panel::form::ParameterField;
use backtest_panel::symbols::SymbolList;

/// One row of the form panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormRow {
    Strategy,
    SymbolPicker,
    Field(ParameterField),
    Mode,
    CombMode,
}

impl FormRow {
    pub fn label(&self) -> &'static str {
        match self {
            FormRow::Strategy => "策略",
            FormRow::SymbolPicker => "Symbol List",
            FormRow::Field(field) => field.label(),
            FormRow::Mode => "Mode",
            FormRow::CombMode => "Comb Mode",
        }
    }

    /// Rows cycled with ←/→ rather than typed into.
    pub fn is_selector(&self) -> bool {
        !matches!(self, FormRow::Field(_))
    }
}

pub fn form_rows() -> Vec<FormRow> {
    let mut rows = vec![FormRow::Strategy, FormRow::SymbolPicker];
    rows.extend(
        ParameterField::ALL
            .iter()
            .copied()
            .filter(|f| !matches!(f, ParameterField::Children | ParameterField::InitCash))
            .map(FormRow::Field),
    );
    rows.extend([
        FormRow::Mode,
        FormRow::Field(ParameterField::Children),
        FormRow::CombMode,
        FormRow::Field(ParameterField::InitCash),
    ]);
    rows
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Completions delivered from background tasks to the UI loop.
#[derive(Debug)]
pub enum AppEvent {
    SymbolsLoaded(SymbolList),
    RunFinished(RunOutcome),
}
