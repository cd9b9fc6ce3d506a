// src/strategy.rs - Strategy ids understood by the backtest service
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::FormError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    BollingerNarrow,
    #[serde(rename = "ma15_breakout")]
    Ma15Breakout,
    FollowThrough,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [
        Strategy::BollingerNarrow,
        Strategy::Ma15Breakout,
        Strategy::FollowThrough,
    ];

    /// Wire id, must match the service's strategy registry.
    pub fn id(&self) -> &'static str {
        match self {
            Strategy::BollingerNarrow => "bollinger_narrow",
            Strategy::Ma15Breakout => "ma15_breakout",
            Strategy::FollowThrough => "follow_through",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Strategy::BollingerNarrow => "Bollinger 窄幅",
            Strategy::Ma15Breakout => "MA15 突破",
            Strategy::FollowThrough => "Follow Through",
        }
    }

    /// Only follow-through accepts child strategies.
    pub fn takes_children(&self) -> bool {
        matches!(self, Strategy::FollowThrough)
    }

    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|s| s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn previous(&self) -> Self {
        let idx = Self::ALL.iter().position(|s| s == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Strategy {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|strategy| strategy.id() == s)
            .ok_or_else(|| FormError::UnknownStrategy(s.to_string()))
    }
}

/// How follow-through combines its children's entry signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombMode {
    #[default]
    And,
    Majority,
}

impl CombMode {
    pub fn id(&self) -> &'static str {
        match self {
            CombMode::And => "and",
            CombMode::Majority => "majority",
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            CombMode::And => CombMode::Majority,
            CombMode::Majority => CombMode::And,
        }
    }
}

impl FromStr for CombMode {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "and" => Ok(CombMode::And),
            "majority" => Ok(CombMode::Majority),
            other => Err(FormError::UnknownCombMode(other.to_string())),
        }
    }
}
