// src/result_view.rs - Turns a backtest response into links and metric rows
use std::fmt::Write as _;
use url::Url;

use crate::api::RESULTS_PATH;
use crate::config::ServiceBase;
use crate::types::{BacktestResponse, SymbolResult};

pub const SHARPE_RATIO: &str = "Sharpe Ratio";

const METRIC_LABELS: [(&str, &str); 4] = [
    ("Annualized Return", "年化收益率"),
    ("Annualized Volatility", "年化波动率"),
    ("Max Drawdown", "最大回撤"),
    (SHARPE_RATIO, "夏普比率"),
];

pub fn metric_label(key: &str) -> &str {
    METRIC_LABELS
        .iter()
        .find(|(english, _)| *english == key)
        .map(|(_, localized)| *localized)
        .unwrap_or(key)
}

/// Sharpe ratio is a plain number; every other metric is a fraction shown as a percentage.
pub fn format_metric(key: &str, value: Option<f64>) -> String {
    match value {
        None => "N/A".to_string(),
        Some(v) if key == SHARPE_RATIO => format!("{:.2}", v),
        Some(v) => format!("{:.2}%", v * 100.0),
    }
}

/// Last path component, whichever separator the service host uses.
pub fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// `{base}/results/{run_id}/{file}?base={out_dir}`
pub fn result_url(base: &ServiceBase, run_id: &str, path: &str, out_dir: &str) -> Url {
    let mut url = base.join([RESULTS_PATH, run_id, file_name(path)]);
    url.query_pairs_mut().append_pair("base", out_dir);
    url
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Signals,
    Backtest,
    EquityCurve,
    EquityCsv,
}

impl LinkKind {
    pub fn label(&self) -> &'static str {
        match self {
            LinkKind::Signals => "signals",
            LinkKind::Backtest => "backtest",
            LinkKind::EquityCurve => "equity curve",
            LinkKind::EquityCsv => "equity csv",
        }
    }

    pub fn is_image(&self) -> bool {
        !matches!(self, LinkKind::EquityCsv)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultLink {
    pub kind: LinkKind,
    pub url: Url,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub key: String,
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolGroup {
    pub symbol: String,
    pub links: Vec<ResultLink>,
    /// Empty when the service sent no performance block.
    pub metrics: Vec<MetricRow>,
}

impl SymbolGroup {
    pub fn images(&self) -> impl Iterator<Item = &ResultLink> {
        self.links.iter().filter(|l| l.kind.is_image())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub run_id: String,
    /// Output directory as echoed by the service (informational only).
    pub service_out_dir: String,
    pub groups: Vec<SymbolGroup>,
}

impl ResultView {
    /// `out_dir` is the directory the user asked for, not the service's echo,
    /// which already has the run id appended.
    pub fn build(response: &BacktestResponse, out_dir: &str, base: &ServiceBase) -> Self {
        let groups = response
            .results
            .iter()
            .map(|(symbol, result)| build_group(symbol, result, &response.run_id, out_dir, base))
            .collect();

        Self {
            run_id: response.run_id.clone(),
            service_out_dir: response.out_dir.clone(),
            groups,
        }
    }

    pub fn title(&self) -> String {
        format!("回测结果：{}", self.run_id)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.title());
        if !self.service_out_dir.is_empty() {
            let _ = writeln!(out, "out_dir: {}", self.service_out_dir);
        }

        for group in &self.groups {
            let _ = writeln!(out);
            let _ = writeln!(out, "[{}]", group.symbol);
            for link in &group.links {
                let _ = writeln!(out, "  {:<13} {}", link.kind.label(), link.url);
            }
            for metric in &group.metrics {
                let _ = writeln!(out, "  {:<13} {:>10}", metric.label, metric.value);
            }
        }
        out
    }
}

fn build_group(
    symbol: &str,
    result: &SymbolResult,
    run_id: &str,
    out_dir: &str,
    base: &ServiceBase,
) -> SymbolGroup {
    let sources = [
        (LinkKind::Signals, Some(result.signals.as_str())),
        (LinkKind::Backtest, result.backtest.as_deref()),
        (LinkKind::EquityCurve, result.equity_png.as_deref()),
        (LinkKind::EquityCsv, result.equity_csv.as_deref()),
    ];

    let links = sources
        .into_iter()
        .filter_map(|(kind, path)| {
            path.map(|path| ResultLink {
                kind,
                url: result_url(base, run_id, path, out_dir),
            })
        })
        .collect();

    let metrics = result
        .performance
        .iter()
        .flat_map(|performance| performance.iter())
        .map(|(key, value)| MetricRow {
            key: key.to_string(),
            label: metric_label(key).to_string(),
            value: format_metric(key, *value),
        })
        .collect();

    SymbolGroup {
        symbol: symbol.to_string(),
        links,
        metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderedMap;

    fn base() -> ServiceBase {
        ServiceBase::parse("http://localhost:5000").unwrap()
    }

    #[test]
    fn test_file_name_is_separator_agnostic_and_idempotent() {
        assert_eq!(file_name(r"C:\out\run1\sig.png"), "sig.png");
        assert_eq!(file_name("out/run1/sig.png"), "sig.png");
        assert_eq!(file_name("out\\run1/mixed.png"), "mixed.png");
        assert_eq!(file_name("sig.png"), "sig.png");
        assert_eq!(file_name(file_name("out/run1/sig.png")), "sig.png");
    }

    #[test]
    fn test_metric_formatting() {
        assert_eq!(format_metric("Sharpe Ratio", Some(1.2345)), "1.23");
        assert_eq!(format_metric("Max Drawdown", Some(-0.1567)), "-15.67%");
        assert_eq!(format_metric("Annualized Return", Some(0.5)), "50.00%");
        assert_eq!(format_metric("Sharpe Ratio", None), "N/A");
    }

    #[test]
    fn test_unknown_metric_keeps_raw_label() {
        assert_eq!(metric_label("Sharpe Ratio"), "夏普比率");
        assert_eq!(metric_label("Win Rate"), "Win Rate");
        assert_eq!(format_metric("Win Rate", Some(0.25)), "25.00%");
    }

    #[test]
    fn test_result_url_encodes_out_dir() {
        let url = result_url(&base(), "r1", "out/r1/BTC_USD_signals.png", "my out/dir");
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/results/r1/BTC_USD_signals.png?base=my+out%2Fdir"
        );
    }

    #[test]
    fn test_one_group_per_symbol_with_absent_links_omitted() {
        let mut results = OrderedMap::new();
        results.insert(
            "BTC/USD",
            SymbolResult {
                signals: r"out\r1\BTC_USD_signals.png".to_string(),
                backtest: Some(r"out\r1\BTC_USD_backtest.png".to_string()),
                equity_png: Some(r"out\r1\BTC_USD_equity.png".to_string()),
                ..Default::default()
            },
        );
        results.insert(
            "ETH/USD",
            SymbolResult {
                signals: "out/r1/ETH_USD_signals.png".to_string(),
                ..Default::default()
            },
        );
        let response = BacktestResponse {
            run_id: "r1".to_string(),
            out_dir: "out/r1".to_string(),
            results,
        };

        let view = ResultView::build(&response, "out", &base());

        assert_eq!(view.groups.len(), 2);
        let btc = &view.groups[0];
        assert_eq!(btc.symbol, "BTC/USD");
        assert_eq!(
            btc.images().map(|l| l.kind).collect::<Vec<_>>(),
            vec![LinkKind::Signals, LinkKind::Backtest, LinkKind::EquityCurve]
        );
        assert_eq!(
            btc.links[2].url.as_str(),
            "http://localhost:5000/results/r1/BTC_USD_equity.png?base=out"
        );
        assert!(btc.metrics.is_empty());

        let eth = &view.groups[1];
        assert_eq!(eth.links.len(), 1);
        assert_eq!(eth.links[0].kind, LinkKind::Signals);
    }

    #[test]
    fn test_equity_csv_becomes_a_non_image_link() {
        let mut results = OrderedMap::new();
        results.insert(
            "BTC/USD",
            SymbolResult {
                signals: "out/r3/BTC_USD_signals.png".to_string(),
                equity_csv: Some("out/r3/BTC_USD_equity.csv".to_string()),
                ..Default::default()
            },
        );
        let response = BacktestResponse {
            run_id: "r3".to_string(),
            out_dir: "out/r3".to_string(),
            results,
        };

        let view = ResultView::build(&response, "out", &base());
        let group = &view.groups[0];

        assert_eq!(group.links.len(), 2);
        assert_eq!(group.links[1].kind, LinkKind::EquityCsv);
        assert_eq!(
            group.links[1].url.as_str(),
            "http://localhost:5000/results/r3/BTC_USD_equity.csv?base=out"
        );
        assert_eq!(group.images().count(), 1);
        assert!(view.render_text().contains("equity csv"));
    }

    #[test]
    fn test_metrics_follow_service_order() {
        let performance: OrderedMap<Option<f64>> = [
            ("Annualized Return", Some(0.1234)),
            ("Sharpe Ratio", Some(0.8)),
            ("Max Drawdown", Some(-0.05)),
        ]
        .into_iter()
        .collect();
        let mut results = OrderedMap::new();
        results.insert(
            "BTC/USD",
            SymbolResult {
                signals: "sig.png".to_string(),
                performance: Some(performance),
                ..Default::default()
            },
        );
        let response = BacktestResponse {
            run_id: "r2".to_string(),
            out_dir: String::new(),
            results,
        };

        let view = ResultView::build(&response, "out", &base());
        let rows: Vec<_> = view.groups[0]
            .metrics
            .iter()
            .map(|m| (m.label.as_str(), m.value.as_str()))
            .collect();

        assert_eq!(
            rows,
            vec![("年化收益率", "12.34%"), ("夏普比率", "0.80"), ("最大回撤", "-5.00%")]
        );
        let text = view.render_text();
        assert!(text.starts_with("回测结果：r2\n"));
        assert!(text.contains("[BTC/USD]"));
    }
}
