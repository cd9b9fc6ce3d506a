// src/types.rs
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use crate::errors::FormError;
use crate::strategy::{CombMode, Strategy};

// --- Input ---

/// What the service should produce for each symbol.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Signal chart, trade chart, equity curve and performance metrics.
    #[default]
    Backtest,
    /// Signal chart only.
    Plot,
}

impl Mode {
    pub fn id(&self) -> &'static str {
        match self {
            Mode::Backtest => "backtest",
            Mode::Plot => "plot",
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            Mode::Backtest => Mode::Plot,
            Mode::Plot => Mode::Backtest,
        }
    }
}

impl FromStr for Mode {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "backtest" => Ok(Mode::Backtest),
            "plot" => Ok(Mode::Plot),
            other => Err(FormError::UnknownMode(other.to_string())),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BacktestRequest {
    pub mode: Mode,
    pub strategy: Strategy,
    /// Exchange-pair notation, comma separated for a batch ("BTC/USD,ETH/USD").
    pub symbols: String,
    pub timeframe: String,
    pub limit: i64,
    /// -1 keeps every candle.
    pub last_n: i64,
    pub window: i64,
    pub period: i64,
    pub mult: f64,
    pub ratio: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// Always sent as null; the service ignores it for everything but ma15_breakout.
    pub trailing_ma: Option<String>,
    pub position_size: f64,
    pub out_dir: String,

    // Optional extras, left out of the body unless set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comb_mode: Option<CombMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_cash: Option<f64>,
}

impl BacktestRequest {
    pub fn symbol_list(&self) -> Vec<&str> {
        self.symbols
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

// --- Output ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BacktestResponse {
    pub run_id: String,
    #[serde(default)]
    pub out_dir: String,
    pub results: OrderedMap<SymbolResult>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct SymbolResult {
    pub signals: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backtest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equity_png: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equity_csv: Option<String>,
    /// Metric name -> value. A value is null when the service could not compute it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<OrderedMap<Option<f64>>>,
}

/// JSON object that keeps the service's key order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V>(Vec<(String, V)>);

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Replaces the value in place if the key already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = OrderedMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = OrderedMap(Vec::with_capacity(access.size_hint().unwrap_or(0)));
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}
