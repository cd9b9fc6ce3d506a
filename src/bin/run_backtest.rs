// src/bin/run_backtest.rs - Submit one backtest without the dashboard and print the result
use clap::Parser;
use std::process::ExitCode;
use tracing::error;

use backtest_panel::api::{BacktestClient, BacktestService};
use backtest_panel::config::{setup_stderr_logging, ConnectionArgs};
use backtest_panel::controller::{Controller, RunOutcome};
use backtest_panel::form::{ParameterField, RequestDraft};
use backtest_panel::strategy::{CombMode, Strategy};
use backtest_panel::types::Mode;

#[derive(Parser, Debug)]
#[command(name = "run_backtest")]
#[command(about = "Submit a single backtest to the service and print the charts and metrics")]
struct Args {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Print the service's symbol list and exit
    #[arg(long)]
    list_symbols: bool,

    /// Print the raw JSON response instead of the formatted view
    #[arg(long)]
    json: bool,

    /// backtest (charts + metrics) or plot (signal chart only)
    #[arg(long, default_value = "backtest")]
    mode: String,

    #[arg(long, default_value = "bollinger_narrow")]
    strategy: String,

    /// Comma separated, e.g. "BTC/USD,ETH/USD"
    #[arg(long, default_value = "BTC/USD")]
    symbols: String,

    #[arg(long, default_value = "4h")]
    timeframe: String,

    #[arg(long, default_value = "300")]
    limit: String,

    /// -1 keeps every candle
    #[arg(long, default_value = "-1", allow_hyphen_values = true)]
    last_n: String,

    #[arg(long, default_value = "20")]
    window: String,

    #[arg(long, default_value = "20")]
    period: String,

    #[arg(long, default_value = "2")]
    mult: String,

    #[arg(long, default_value = "0.5")]
    ratio: String,

    #[arg(long, default_value = "0.05")]
    stop_loss: String,

    #[arg(long, default_value = "0.1")]
    take_profit: String,

    #[arg(long, default_value = "1.0")]
    position_size: String,

    #[arg(long, default_value = "out")]
    out_dir: String,

    /// Child strategy ids for follow_through
    #[arg(long, default_value = "")]
    children: String,

    /// and | majority
    #[arg(long, default_value = "and")]
    comb_mode: String,

    /// Starting cash; the service uses 1,000,000 when unset
    #[arg(long, default_value = "")]
    init_cash: String,
}

impl Args {
    fn draft(&self) -> Result<RequestDraft, Box<dyn std::error::Error>> {
        let fields = [
            (ParameterField::Symbols, &self.symbols),
            (ParameterField::Timeframe, &self.timeframe),
            (ParameterField::Limit, &self.limit),
            (ParameterField::LastN, &self.last_n),
            (ParameterField::Window, &self.window),
            (ParameterField::Period, &self.period),
            (ParameterField::Mult, &self.mult),
            (ParameterField::Ratio, &self.ratio),
            (ParameterField::StopLoss, &self.stop_loss),
            (ParameterField::TakeProfit, &self.take_profit),
            (ParameterField::PositionSize, &self.position_size),
            (ParameterField::OutDir, &self.out_dir),
            (ParameterField::Children, &self.children),
            (ParameterField::InitCash, &self.init_cash),
        ];

        let draft = fields.into_iter().fold(
            RequestDraft::default()
                .with_strategy(self.strategy.parse::<Strategy>()?)
                .with_comb_mode(self.comb_mode.parse::<CombMode>()?)
                .with_mode(self.mode.parse::<Mode>()?),
            |draft, (field, value)| draft.with_value(field, value.as_str()),
        );
        Ok(draft)
    }
}

async fn run(args: Args) -> Result<bool, Box<dyn std::error::Error>> {
    let config = args.connection.clone().into_config()?;
    let client = BacktestClient::new(&config)?;

    if args.list_symbols {
        for symbol in client.fetch_symbols().await? {
            println!("{}", symbol);
        }
        return Ok(true);
    }

    let mut controller = Controller::new(args.draft()?);
    let outcome = controller.run(&client).await?;

    match &outcome {
        RunOutcome::Success(response) if args.json => {
            println!("{}", serde_json::to_string_pretty(response)?);
        }
        RunOutcome::Success(_) => {
            if let Some(view) = controller.result_view(client.base()) {
                print!("{}", view.render_text());
            }
        }
        RunOutcome::Failure { .. } => {
            if let Some(alert) = outcome.alert_text() {
                eprintln!("{}", alert);
            }
        }
    }

    Ok(outcome.is_success())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let args = Args::parse();
    setup_stderr_logging(args.connection.debug);

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("run_backtest failed: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
