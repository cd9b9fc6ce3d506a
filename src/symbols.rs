// src/symbols.rs - Symbol selector backed by the service's symbol list
use tracing::warn;

use crate::api::BacktestService;

pub const LOADING_PLACEHOLDER: &str = "加载币种列表中…";

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SymbolList {
    #[default]
    Loading,
    Ready(Vec<String>),
    /// The fetch failed; the selector stays usable with no options.
    Empty,
}

impl SymbolList {
    /// Fetches once. Failures are logged and collapse to `Empty`.
    pub async fn load<S: BacktestService>(service: &S) -> SymbolList {
        match service.fetch_symbols().await {
            Ok(symbols) => SymbolList::Ready(symbols),
            Err(e) => {
                warn!("获取 symbols 失败, falling back to an empty list: {}", e);
                SymbolList::Empty
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SymbolSelector {
    state: SymbolList,
}

impl SymbolSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SymbolList {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, SymbolList::Loading)
    }

    /// Only the first resolution counts; the list is never refreshed.
    pub fn resolve(&mut self, list: SymbolList) -> bool {
        if !self.is_loading() || matches!(list, SymbolList::Loading) {
            return false;
        }
        self.state = list;
        true
    }

    pub fn options(&self) -> &[String] {
        match &self.state {
            SymbolList::Ready(symbols) => symbols.as_slice(),
            SymbolList::Loading | SymbolList::Empty => &[],
        }
    }

    /// Option after `current`, wrapping. Starts from the first option when
    /// `current` is not in the list.
    pub fn next_after(&self, current: &str) -> Option<&str> {
        let options = self.options();
        if options.is_empty() {
            return None;
        }
        let next = match options.iter().position(|s| s == current.trim()) {
            Some(idx) => (idx + 1) % options.len(),
            None => 0,
        };
        Some(options[next].as_str())
    }

    pub fn previous_before(&self, current: &str) -> Option<&str> {
        let options = self.options();
        if options.is_empty() {
            return None;
        }
        let previous = match options.iter().position(|s| s == current.trim()) {
            Some(0) | None => options.len() - 1,
            Some(idx) => idx - 1,
        };
        Some(options[previous].as_str())
    }

    pub fn display_text(&self, current: &str) -> String {
        match &self.state {
            SymbolList::Loading => LOADING_PLACEHOLDER.to_string(),
            SymbolList::Empty => format!("{} (no symbol list)", current),
            SymbolList::Ready(symbols) => {
                match symbols.iter().position(|s| s == current.trim()) {
                    Some(idx) => format!("{} ({}/{})", current, idx + 1, symbols.len()),
                    None => format!("{} (custom)", current),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready(symbols: &[&str]) -> SymbolSelector {
        let mut selector = SymbolSelector::new();
        selector.resolve(SymbolList::Ready(
            symbols.iter().map(|s| s.to_string()).collect(),
        ));
        selector
    }

    #[test]
    fn test_loading_shows_placeholder_and_no_options() {
        let selector = SymbolSelector::new();
        assert!(selector.is_loading());
        assert!(selector.options().is_empty());
        assert_eq!(selector.display_text("BTC/USD"), LOADING_PLACEHOLDER);
    }

    #[test]
    fn test_failed_fetch_leaves_an_empty_usable_selector() {
        let mut selector = SymbolSelector::new();
        assert!(selector.resolve(SymbolList::Empty));

        assert!(!selector.is_loading());
        assert!(selector.options().is_empty());
        assert_eq!(selector.next_after("BTC/USD"), None);
        assert_eq!(selector.previous_before("BTC/USD"), None);
    }

    #[test]
    fn test_resolves_only_once() {
        let mut selector = ready(&["BTC/USD"]);
        assert!(!selector.resolve(SymbolList::Empty));
        assert_eq!(selector.options(), ["BTC/USD".to_string()]);
    }

    #[test]
    fn test_cycling_wraps_and_recovers_from_custom_values() {
        let selector = ready(&["BTC/USD", "ETH/USD", "SOL/USD"]);

        assert_eq!(selector.next_after("SOL/USD"), Some("BTC/USD"));
        assert_eq!(selector.previous_before("BTC/USD"), Some("SOL/USD"));
        assert_eq!(selector.next_after("DOGE/USD"), Some("BTC/USD"));
        assert_eq!(selector.display_text("ETH/USD"), "ETH/USD (2/3)");
        assert_eq!(selector.display_text("DOGE/USD"), "DOGE/USD (custom)");
    }
}
