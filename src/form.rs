// src/form.rs - Backtest form state: raw field values, coerced at submission
use std::fmt;

use crate::errors::FormError;
use crate::strategy::{CombMode, Strategy};
use crate::types::{BacktestRequest, Mode};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputKind {
    Text,
    Number { step: f64 },
}

/// Free-form fields of the form. Strategy, mode and comb mode are selectors
/// and live on the draft as typed values instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterField {
    Symbols,
    Timeframe,
    Limit,
    LastN,
    Window,
    Period,
    Mult,
    Ratio,
    StopLoss,
    TakeProfit,
    PositionSize,
    OutDir,
    Children,
    InitCash,
}

impl ParameterField {
    pub const ALL: [ParameterField; 14] = [
        ParameterField::Symbols,
        ParameterField::Timeframe,
        ParameterField::Limit,
        ParameterField::LastN,
        ParameterField::Window,
        ParameterField::Period,
        ParameterField::Mult,
        ParameterField::Ratio,
        ParameterField::StopLoss,
        ParameterField::TakeProfit,
        ParameterField::PositionSize,
        ParameterField::OutDir,
        ParameterField::Children,
        ParameterField::InitCash,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ParameterField::Symbols => "Symbols",
            ParameterField::Timeframe => "Timeframe",
            ParameterField::Limit => "Limit",
            ParameterField::LastN => "Last N",
            ParameterField::Window => "Window",
            ParameterField::Period => "Period",
            ParameterField::Mult => "Mult",
            ParameterField::Ratio => "Ratio",
            ParameterField::StopLoss => "Stop Loss",
            ParameterField::TakeProfit => "Take Profit",
            ParameterField::PositionSize => "Position Size",
            ParameterField::OutDir => "Out Dir",
            ParameterField::Children => "Children",
            ParameterField::InitCash => "Init Cash",
        }
    }

    pub fn kind(&self) -> InputKind {
        match self {
            ParameterField::Symbols
            | ParameterField::Timeframe
            | ParameterField::OutDir
            | ParameterField::Children => InputKind::Text,
            ParameterField::Ratio | ParameterField::StopLoss | ParameterField::TakeProfit => {
                InputKind::Number { step: 0.01 }
            }
            ParameterField::PositionSize => InputKind::Number { step: 0.1 },
            ParameterField::InitCash => InputKind::Number { step: 10_000.0 },
            _ => InputKind::Number { step: 1.0 },
        }
    }
}

impl fmt::Display for ParameterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Immutable snapshot of the form. Every setter returns a new draft.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDraft {
    strategy: Strategy,
    mode: Mode,
    comb_mode: CombMode,
    symbols: String,
    timeframe: String,
    limit: String,
    last_n: String,
    window: String,
    period: String,
    mult: String,
    ratio: String,
    stop_loss: String,
    take_profit: String,
    position_size: String,
    out_dir: String,
    children: String,
    init_cash: String,
}

impl Default for RequestDraft {
    fn default() -> Self {
        Self {
            strategy: Strategy::BollingerNarrow,
            mode: Mode::Backtest,
            comb_mode: CombMode::And,
            symbols: "BTC/USD".to_string(),
            timeframe: "4h".to_string(),
            limit: "300".to_string(),
            last_n: "-1".to_string(),
            window: "20".to_string(),
            period: "20".to_string(),
            mult: "2".to_string(),
            ratio: "0.5".to_string(),
            stop_loss: "0.05".to_string(),
            take_profit: "0.1".to_string(),
            position_size: "1.0".to_string(),
            out_dir: "out".to_string(),
            children: String::new(),
            init_cash: String::new(),
        }
    }
}

impl RequestDraft {
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn comb_mode(&self) -> CombMode {
        self.comb_mode
    }

    pub fn value(&self, field: ParameterField) -> &str {
        match field {
            ParameterField::Symbols => &self.symbols,
            ParameterField::Timeframe => &self.timeframe,
            ParameterField::Limit => &self.limit,
            ParameterField::LastN => &self.last_n,
            ParameterField::Window => &self.window,
            ParameterField::Period => &self.period,
            ParameterField::Mult => &self.mult,
            ParameterField::Ratio => &self.ratio,
            ParameterField::StopLoss => &self.stop_loss,
            ParameterField::TakeProfit => &self.take_profit,
            ParameterField::PositionSize => &self.position_size,
            ParameterField::OutDir => &self.out_dir,
            ParameterField::Children => &self.children,
            ParameterField::InitCash => &self.init_cash,
        }
    }

    /// Stores the raw string as typed; nothing is parsed here.
    pub fn with_value(mut self, field: ParameterField, value: impl Into<String>) -> Self {
        let value = value.into();
        match field {
            ParameterField::Symbols => self.symbols = value,
            ParameterField::Timeframe => self.timeframe = value,
            ParameterField::Limit => self.limit = value,
            ParameterField::LastN => self.last_n = value,
            ParameterField::Window => self.window = value,
            ParameterField::Period => self.period = value,
            ParameterField::Mult => self.mult = value,
            ParameterField::Ratio => self.ratio = value,
            ParameterField::StopLoss => self.stop_loss = value,
            ParameterField::TakeProfit => self.take_profit = value,
            ParameterField::PositionSize => self.position_size = value,
            ParameterField::OutDir => self.out_dir = value,
            ParameterField::Children => self.children = value,
            ParameterField::InitCash => self.init_cash = value,
        }
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_comb_mode(mut self, comb_mode: CombMode) -> Self {
        self.comb_mode = comb_mode;
        self
    }

    /// Nudges a numeric field by its step. Leaves unparseable input alone.
    pub fn stepped(self, field: ParameterField, direction: i32) -> Self {
        let InputKind::Number { step } = field.kind() else {
            return self;
        };
        let Ok(current) = self.value(field).trim().parse::<f64>() else {
            return self;
        };
        let next = current + step * direction as f64;
        let decimals = decimals_for_step(step);
        let value = format!("{:.*}", decimals, next);
        self.with_value(field, value)
    }

    /// Coerces every field and assembles the wire request.
    pub fn build_request(&self) -> Result<BacktestRequest, FormError> {
        let symbols = parse_symbols(&self.symbols)?;
        let timeframe = required_text(ParameterField::Timeframe, &self.timeframe)?;

        let (children, comb_mode) = if self.strategy.takes_children() {
            match parse_children(&self.children)? {
                Some(children) => (Some(children), Some(self.comb_mode)),
                None => (None, None),
            }
        } else {
            (None, None)
        };

        let init_cash = if self.init_cash.trim().is_empty() {
            None
        } else {
            Some(parse_number(ParameterField::InitCash, &self.init_cash)?)
        };

        Ok(BacktestRequest {
            mode: self.mode,
            strategy: self.strategy,
            symbols,
            timeframe,
            limit: parse_integer(ParameterField::Limit, &self.limit)?,
            last_n: parse_integer(ParameterField::LastN, &self.last_n)?,
            window: parse_integer(ParameterField::Window, &self.window)?,
            period: parse_integer(ParameterField::Period, &self.period)?,
            mult: parse_number(ParameterField::Mult, &self.mult)?,
            ratio: parse_number(ParameterField::Ratio, &self.ratio)?,
            stop_loss: parse_number(ParameterField::StopLoss, &self.stop_loss)?,
            take_profit: parse_number(ParameterField::TakeProfit, &self.take_profit)?,
            trailing_ma: None,
            position_size: parse_number(ParameterField::PositionSize, &self.position_size)?,
            out_dir: self.out_dir.trim().to_string(),
            children,
            comb_mode,
            init_cash,
        })
    }
}

fn required_text(field: ParameterField, raw: &str) -> Result<String, FormError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FormError::Empty { field });
    }
    Ok(trimmed.to_string())
}

/// The service splits on ',' without trimming, so every entry is cleaned here.
fn parse_symbols(raw: &str) -> Result<String, FormError> {
    let symbols: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if symbols.is_empty() {
        return Err(FormError::Empty {
            field: ParameterField::Symbols,
        });
    }
    Ok(symbols.join(","))
}

fn parse_number(field: ParameterField, raw: &str) -> Result<f64, FormError> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(FormError::InvalidNumber {
            field,
            value: raw.to_string(),
        }),
    }
}

fn parse_integer(field: ParameterField, raw: &str) -> Result<i64, FormError> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Ok(value);
    }
    // "20.5" is a number, just not a usable candle count
    if parse_number(field, raw).is_ok() {
        return Err(FormError::InvalidInteger {
            field,
            value: raw.to_string(),
        });
    }
    Err(FormError::InvalidNumber {
        field,
        value: raw.to_string(),
    })
}

fn parse_children(raw: &str) -> Result<Option<String>, FormError> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<Strategy>().map(|strategy| strategy.id()))
        .collect::<Result<Vec<_>, _>>()?;

    if ids.is_empty() {
        Ok(None)
    } else {
        Ok(Some(ids.join(",")))
    }
}

fn decimals_for_step(step: f64) -> usize {
    let mut decimals = 0;
    let mut scaled = step;
    while scaled.fract().abs() > 1e-9 && decimals < 6 {
        scaled *= 10.0;
        decimals += 1;
    }
    decimals
}
