use clap::Parser;
use std::process::ExitCode;
use stewardship::args::{Args, BudgetCommand, Command, LedgerCommand};
use stewardship::{commands, Mode, Result};
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().home().path();

    // When STEWARDSHIP_IN_TEST_MODE is set and non-empty, the tables are kept in memory and no
    // Google API is called.
    let mode = Mode::from_env();
    let today = commands::today();

    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(home, init_args, mode).await?.print(),

        Command::Auth(auth_args) => {
            let config = commands::config(home).await?;
            if auth_args.verify() {
                commands::auth_verify(&config).await?.print()
            } else {
                commands::auth(&config).await?.print()
            }
        }

        Command::Dashboard(dashboard_args) => {
            let config = commands::config(home).await?;
            let mut workbook = commands::open(&config, mode).await?;
            let today = dashboard_args.today.unwrap_or(today);
            commands::dashboard(&mut workbook, today).await?.print()
        }

        Command::Settings(settings_args) => {
            let config = commands::config(home).await?;
            let mut workbook = commands::open(&config, mode).await?;
            commands::settings(&mut workbook, today, settings_args.clone())
                .await?
                .print()
        }

        Command::Budget(budget_args) => {
            let config = commands::config(home).await?;
            let mut workbook = commands::open(&config, mode).await?;
            match budget_args.command() {
                BudgetCommand::Show(args) => {
                    commands::budget_show(&mut workbook, today, args.clone())
                        .await?
                        .print()
                }
                BudgetCommand::Set(args) => commands::budget_set(&mut workbook, today, args.clone())
                    .await?
                    .print(),
                BudgetCommand::Target(args) => {
                    commands::budget_target(&mut workbook, today, args.clone())
                        .await?
                        .print()
                }
            }
        }

        Command::Ledger(ledger_args) => {
            let config = commands::config(home).await?;
            let mut workbook = commands::open(&config, mode).await?;
            match ledger_args.command() {
                LedgerCommand::Add(args) => commands::ledger_add(&mut workbook, today, args.clone())
                    .await?
                    .print(),
                LedgerCommand::List(args) => {
                    commands::ledger_list(&mut workbook, today, args.clone())
                        .await?
                        .print()
                }
            }
        }

        Command::Verse(verse_args) => {
            let config = commands::config(home).await?;
            let mut workbook = commands::open(&config, mode).await?;
            commands::verse(&mut workbook, verse_args.next())
                .await?
                .print()
        }

        Command::Mcp(_mcp_args) => commands::mcp(commands::config(home).await?, mode)
            .await?
            .print(),
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
