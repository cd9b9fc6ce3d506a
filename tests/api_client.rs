use backtest_panel::api::{BacktestClient, BacktestService};
use backtest_panel::config::PanelConfig;
use backtest_panel::errors::{ClientError, ErrorKind};
use backtest_panel::form::RequestDraft;
use backtest_panel::symbols::{SymbolList, SymbolSelector};
use mockito::Matcher;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

fn client_for(url: &str, symbol_retries: u32) -> BacktestClient {
    let mut config = PanelConfig::new(url).expect("mock server url should parse");
    config.symbol_retries = symbol_retries;
    config.retry_backoff = Duration::from_millis(5);
    config.timeout = Duration::from_secs(5);
    BacktestClient::new(&config).expect("client should build")
}

#[tokio::test]
async fn fetch_symbols_returns_service_list() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/symbols")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"["BTC/USD", "ETH/USD", "SOL/USD"]"#)
        .create_async()
        .await;

    let client = client_for(&server.url(), 3);
    let symbols = client.fetch_symbols().await.unwrap();

    assert_eq!(symbols, vec!["BTC/USD", "ETH/USD", "SOL/USD"]);
    mock.assert_async().await;
}

#[tokio::test]
async fn fetch_symbols_retries_server_errors_up_to_the_budget() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/symbols")
        .with_status(503)
        .expect(3)
        .create_async()
        .await;

    let client = client_for(&server.url(), 3);
    let err = client.fetch_symbols().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Status);
    mock.assert_async().await;
}

#[tokio::test]
async fn fetch_symbols_times_out_and_retries() {
    // Accepts connections and never answers
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            held.push(stream);
        }
    });

    let mut config = PanelConfig::new(&format!("http://{}", addr)).unwrap();
    config.symbol_retries = 2;
    config.retry_backoff = Duration::from_millis(5);
    config.timeout = Duration::from_millis(200);
    let client = BacktestClient::new(&config).unwrap();

    let err = client.fetch_symbols().await.unwrap_err();

    assert!(matches!(err, ClientError::Timeout { .. }));
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.is_retryable());
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn fetch_symbols_does_not_retry_client_errors() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/symbols")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server.url(), 3);
    assert!(client.fetch_symbols().await.is_err());
    mock.assert_async().await;
}

#[tokio::test]
async fn fetch_symbols_rejects_unexpected_shape() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/symbols")
        .with_status(200)
        .with_body(r#"{"symbols": ["BTC/USD"]}"#)
        .create_async()
        .await;

    let client = client_for(&server.url(), 1);
    let err = client.fetch_symbols().await.unwrap_err();

    assert!(matches!(err, ClientError::Decode { .. }));
    assert_eq!(err.kind(), ErrorKind::Malformed);
}

#[tokio::test]
async fn symbol_selector_falls_back_to_empty_on_failure() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/symbols")
        .with_status(500)
        .create_async()
        .await;

    let client = client_for(&server.url(), 1);
    let list = SymbolList::load(&client).await;
    assert_eq!(list, SymbolList::Empty);

    let mut selector = SymbolSelector::new();
    selector.resolve(list);
    assert!(!selector.is_loading());
    assert!(selector.options().is_empty());
    assert_eq!(selector.next_after("BTC/USD"), None);
}

#[tokio::test]
async fn run_backtest_posts_request_and_tolerates_nan_metrics() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/run_backtest")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "mode": "backtest",
            "strategy": "bollinger_narrow",
            "symbols": "BTC/USD",
            "timeframe": "4h",
            "limit": 300,
            "last_n": -1,
            "trailing_ma": null,
            "out_dir": "out"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "run_id": "bollinger_narrow_1718000000",
                "out_dir": "out/bollinger_narrow_1718000000",
                "results": {
                    "BTC/USD": {
                        "signals": "out/bollinger_narrow_1718000000/BTC_USD_signals.png",
                        "backtest": "out/bollinger_narrow_1718000000/BTC_USD_backtest.png",
                        "equity_csv": "out/bollinger_narrow_1718000000/BTC_USD_equity.csv",
                        "equity_png": "out/bollinger_narrow_1718000000/BTC_USD_equity.png",
                        "performance": {
                            "Annualized Return": 0.0,
                            "Annualized Volatility": 0.0,
                            "Sharpe Ratio": NaN,
                            "Max Drawdown": 0.0
                        }
                    }
                }
            }"#,
        )
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server.url(), 1);
    let request = RequestDraft::default().build_request().unwrap();
    let response = client.run_backtest(&request).await.unwrap();

    assert_eq!(response.run_id, "bollinger_narrow_1718000000");
    let btc = response.results.get("BTC/USD").unwrap();
    assert_eq!(
        btc.equity_csv.as_deref(),
        Some("out/bollinger_narrow_1718000000/BTC_USD_equity.csv")
    );
    let performance = btc.performance.as_ref().unwrap();
    assert_eq!(performance.get("Sharpe Ratio"), Some(&None));
    assert_eq!(performance.get("Max Drawdown"), Some(&Some(0.0)));
    mock.assert_async().await;
}

#[tokio::test]
async fn run_backtest_is_never_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/run_backtest")
        .with_status(500)
        .with_header("content-type", "application/json")
        .with_body(r#"{"message": "KeyError: 'window'"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server.url(), 5);
    let request = RequestDraft::default().build_request().unwrap();
    let err = client.run_backtest(&request).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Status);
    assert_eq!(err.user_message(), "KeyError: 'window'");
    mock.assert_async().await;
}

#[tokio::test]
async fn run_backtest_reports_malformed_success_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/run_backtest")
        .with_status(200)
        .with_body("<html>oops</html>")
        .create_async()
        .await;

    let client = client_for(&server.url(), 1);
    let request = RequestDraft::default().build_request().unwrap();
    let err = client.run_backtest(&request).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Malformed);
}
