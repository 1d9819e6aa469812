//! Command line entry point.
//!
//! Usage:
//!   taxlots fifo report --data-path ./history --years 2021 --format csv
//!   taxlots fifo summary --ticker AAPL --year 2021
//!   taxlots fifo xml --taxpayer-info taxpayer.json --xml-path out/kdvp.xml --year 2021
//!   taxlots div-doh xml --taxpayer-info taxpayer.json --xml-path out/div.xml --year 2021
//!   taxlots cash-flows --data-path ./history --years 2021
//!   taxlots serve --data-path ./history --port 8080

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use taxlots::config::Config;
use taxlots::domain::{net_cash_flow, Ticker};
use taxlots::report::{render_table, write_csv};
use taxlots::xml::{self, DivDohXml, KdvpXml, PersonalInfo};
use taxlots::{
    api, CsvHistory, DividendReport, FailurePolicy, FifoPositionReport, HistorySource,
    ReportOptions,
};

/// FIFO capital-gains and dividend reports from broker history exports
#[derive(Parser, Debug)]
#[command(name = "taxlots")]
#[command(about = "FIFO capital-gains and dividend reports from broker history exports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Capital gains realized with FIFO lot matching
    Fifo {
        #[command(subcommand)]
        command: FifoCommand,
    },

    /// Dividend declaration
    DivDoh {
        #[command(subcommand)]
        command: DivDohCommand,
    },

    /// List deposits and withdrawals with their net total
    CashFlows {
        #[arg(long)]
        data_path: Option<PathBuf>,

        /// Comma separated years, e.g. 2020,2021
        #[arg(long, value_delimiter = ',')]
        years: Option<Vec<i32>>,
    },

    /// Serve the JSON dashboard API
    Serve {
        #[arg(long)]
        data_path: Option<PathBuf>,

        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand, Debug)]
enum FifoCommand {
    /// Print the report rows
    Report {
        #[arg(long)]
        data_path: Option<PathBuf>,

        /// Comma separated tax years, e.g. 2020,2021
        #[arg(long, value_delimiter = ',')]
        years: Option<Vec<i32>>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// fail-fast or continue
        #[arg(long)]
        policy: Option<FailurePolicy>,
    },

    /// Describe what was sold of one ticker in one year
    Summary {
        #[arg(long)]
        data_path: Option<PathBuf>,

        #[arg(long)]
        ticker: String,

        #[arg(long)]
        year: i32,
    },

    /// Write the capital-gains declaration
    Xml {
        #[arg(long)]
        taxpayer_info: Option<PathBuf>,

        #[arg(long)]
        xml_path: PathBuf,

        #[arg(long)]
        year: i32,

        #[arg(long)]
        data_path: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum DivDohCommand {
    /// Write the dividend declaration
    Xml {
        #[arg(long)]
        taxpayer_info: Option<PathBuf>,

        #[arg(long)]
        xml_path: PathBuf,

        #[arg(long)]
        year: i32,

        #[arg(long)]
        data_path: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Table,
    Csv,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("invalid configuration")?;

    match cli.command {
        Commands::Fifo { command } => run_fifo(command, &config).await,
        Commands::DivDoh { command } => run_div_doh(command, &config).await,
        Commands::CashFlows { data_path, years } => cash_flows(&config, data_path, years).await,
        Commands::Serve { data_path, port } => serve(&config, data_path, port).await,
    }
}

/// Flag value, else the configured `HISTORY_PATH`.
fn history(config: &Config, data_path: Option<PathBuf>) -> Result<Arc<CsvHistory>> {
    let path = match data_path {
        Some(path) => path,
        None => config.history_path()?.to_path_buf(),
    };
    Ok(Arc::new(CsvHistory::new(path)))
}

fn taxpayer_info(config: &Config, flag: Option<PathBuf>) -> Result<PersonalInfo> {
    let Some(path) = flag.or_else(|| config.taxpayer_info_path.clone()) else {
        bail!("--taxpayer-info or TAXPAYER_INFO_PATH is required");
    };
    PersonalInfo::from_file(&path).context("failed to load taxpayer info")
}

async fn run_fifo(command: FifoCommand, config: &Config) -> Result<()> {
    match command {
        FifoCommand::Report {
            data_path,
            years,
            format,
            policy,
        } => {
            let options = ReportOptions {
                years: years.or_else(|| config.report_years.clone()),
                policy: policy.unwrap_or(config.failure_policy),
                ..config.report_options()
            };
            let report = FifoPositionReport::new(history(config, data_path)?, options)
                .create_report()
                .await?;

            match format {
                OutputFormat::Table => print!("{}", render_table(&report.rows)),
                OutputFormat::Csv => write_csv(&report.rows, std::io::stdout().lock())?,
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            }
            for failure in &report.failures {
                eprintln!("skipped {}: {}", failure.ticker, failure.message);
            }
            Ok(())
        }
        FifoCommand::Summary {
            data_path,
            ticker,
            year,
        } => {
            let ticker = Ticker::new(ticker);
            let report = FifoPositionReport::new(history(config, data_path)?, config.report_options())
                .create_report()
                .await?;
            match report.ticker_summary(&ticker, year) {
                Some(summary) => println!("{}", summary.describe()),
                None => bail!("no realized sales of {} in {}", ticker, year),
            }
            Ok(())
        }
        FifoCommand::Xml {
            taxpayer_info: info_path,
            xml_path,
            year,
            data_path,
        } => {
            let info = taxpayer_info(config, info_path)?;
            let options = ReportOptions {
                years: Some(vec![year]),
                ..config.report_options()
            };
            let report = FifoPositionReport::new(history(config, data_path)?, options)
                .create_report()
                .await?;
            write_document(&KdvpXml::build(&info, &report.ledgers, year), &xml_path)
        }
    }
}

async fn run_div_doh(command: DivDohCommand, config: &Config) -> Result<()> {
    match command {
        DivDohCommand::Xml {
            taxpayer_info: info_path,
            xml_path,
            year,
            data_path,
        } => {
            let info = taxpayer_info(config, info_path)?;
            let dividends = DividendReport::new(history(config, data_path)?, Some(vec![year]))
                .create_report()
                .await?;
            write_document(&DivDohXml::build(&info, &dividends, year), &xml_path)
        }
    }
}

async fn cash_flows(
    config: &Config,
    data_path: Option<PathBuf>,
    years: Option<Vec<i32>>,
) -> Result<()> {
    let mut flows = history(config, data_path)?.read_cash_flows().await?;
    if let Some(years) = years.or_else(|| config.report_years.clone()) {
        flows.retain(|flow| years.contains(&flow.year()));
    }
    flows.sort_by_key(|flow| flow.timestamp);

    for flow in &flows {
        println!(
            "{}  {:<10}  {:>12}",
            flow.timestamp.date(),
            flow.kind.as_str(),
            flow.signed_amount().to_fixed(2)
        );
    }
    println!("NET CASH FLOW: {}", net_cash_flow(&flows).to_fixed(2));
    Ok(())
}

fn write_document(document: &xml::XmlElement, path: &Path) -> Result<()> {
    xml::write_to(document, path).with_context(|| format!("failed to write {}", path.display()))
}

async fn serve(config: &Config, data_path: Option<PathBuf>, port: Option<u16>) -> Result<()> {
    let report = FifoPositionReport::new(history(config, data_path)?, config.report_options())
        .create_report()
        .await?;

    let app = api::create_router(api::AppState::new(report));

    let addr = SocketAddr::from(([127, 0, 0, 1], port.unwrap_or(config.port)));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
