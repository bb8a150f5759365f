//! These structs provide the CLI interface for the stewardship CLI. The argument structs of the
//! commands that the MCP server also offers derive `Deserialize` and `JsonSchema` so that the
//! server can take them as tool parameters.

use crate::config::{AuthMethod, Backend};
use crate::model::{Amount, BudgetCategory, BudgetMode};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// stewardship: A family budget dashboard.
///
/// Budgets for ten fixed categories, a daily spending ledger and a handful of settings are kept
/// in three tables of a Google sheet (or of a local SQLite file). This program reads them, adds
/// them up, compares them with your giving and saving goals, and writes your edits back.
///
/// There is also a mode in which an AI agent can use this program through the mcp subcommand.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the home directory and the configuration file.
    ///
    /// This is the first command you should run. For the google_sheets backend you need the URL
    /// of your sheet and a credentials file: either the OAuth client secret downloaded from the
    /// Google Cloud console (--auth oauth) or a service-account key (--auth service-account). The
    /// credentials file is moved into the home directory's .secrets folder.
    ///
    /// With --backend sqlite no credentials are needed and the tables are created right away.
    Init(InitArgs),
    /// Authorize with Google through the OAuth consent flow in your browser.
    Auth(AuthArgs),
    /// Show the dashboard: settings, totals, goal vs actual, rental impact and this month's
    /// spending.
    Dashboard(DashboardArgs),
    /// Show the settings, or change them when any option is given.
    Settings(SettingsArgs),
    /// Show or edit the per-check budget amounts.
    Budget(BudgetArgs),
    /// Add to or list the daily spending ledger.
    Ledger(LedgerArgs),
    /// Show the verse of the day, or pick a new one.
    Verse(VerseArgs),
    /// Run as an MCP server on stdin and stdout.
    Mcp(McpArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where configuration and credentials are held. Defaults to ~/stewardship
    #[arg(long, env = "STEWARDSHIP_HOME", default_value_t = default_home())]
    home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf) -> Self {
        Self {
            log_level,
            home: home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

/// (Not shown): Args for the `stewardship init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// Where the tables are kept.
    #[arg(long, value_enum, default_value_t = Backend::default())]
    backend: Backend,

    /// How to authorize against Google.
    #[arg(long, value_enum, default_value_t = AuthMethod::default())]
    auth: AuthMethod,

    /// The URL of your Google sheet. It looks like this:
    /// https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX
    #[arg(long)]
    sheet_url: Option<String>,

    /// The OAuth client secret or service-account key file.
    #[arg(long)]
    credentials: Option<PathBuf>,
}

impl InitArgs {
    pub fn new(
        backend: Backend,
        auth: AuthMethod,
        sheet_url: Option<String>,
        credentials: Option<PathBuf>,
    ) -> Self {
        Self {
            backend,
            auth,
            sheet_url,
            credentials,
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn auth(&self) -> AuthMethod {
        self.auth
    }

    pub fn sheet_url(&self) -> Option<&str> {
        self.sheet_url.as_deref()
    }

    pub fn credentials(&self) -> Option<&Path> {
        self.credentials.as_deref()
    }
}

/// (Not shown): Args for the `stewardship auth` command.
#[derive(Debug, Parser, Clone)]
pub struct AuthArgs {
    /// Check that the saved credentials still work without opening a browser.
    #[arg(long)]
    verify: bool,
}

impl AuthArgs {
    pub fn new(verify: bool) -> Self {
        Self { verify }
    }

    pub fn verify(&self) -> bool {
        self.verify
    }
}

/// Args for the `stewardship dashboard` command.
#[derive(Debug, Default, Parser, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DashboardArgs {
    /// The date that "this month" is relative to, as YYYY-MM-DD. Defaults to today.
    #[arg(long)]
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

/// Args for the `stewardship settings` command. Options that are left out keep their stored
/// values.
#[derive(Debug, Default, Parser, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SettingsArgs {
    /// Monthly household income, e.g. 6000 or "$6,000.00".
    #[arg(long)]
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub income: Option<Amount>,

    /// The monthly rent that is lost while the rental property is vacant.
    #[arg(long)]
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub rental: Option<Amount>,

    /// Which set of check columns the dashboard uses.
    #[arg(long, value_enum)]
    #[serde(default)]
    pub mode: Option<BudgetMode>,

    /// The tithe goal as a percentage of income.
    #[arg(long)]
    #[serde(default)]
    pub tithe_pct: Option<Decimal>,

    /// The savings goal as a percentage of income.
    #[arg(long)]
    #[serde(default)]
    pub savings_pct: Option<Decimal>,

    /// How many months of expenses the emergency fund should hold.
    #[arg(long)]
    #[serde(default)]
    pub emergency_target_months: Option<Decimal>,

    /// How much the emergency fund holds now.
    #[arg(long)]
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub emergency_current: Option<Amount>,
}

impl SettingsArgs {
    /// True when no option was given, i.e. the settings should only be shown.
    pub fn is_empty(&self) -> bool {
        self.income.is_none()
            && self.rental.is_none()
            && self.mode.is_none()
            && self.tithe_pct.is_none()
            && self.savings_pct.is_none()
            && self.emergency_target_months.is_none()
            && self.emergency_current.is_none()
    }
}

/// (Not shown): Args for the `stewardship budget` command.
#[derive(Debug, Parser, Clone)]
pub struct BudgetArgs {
    #[command(subcommand)]
    command: BudgetCommand,
}

impl BudgetArgs {
    pub fn command(&self) -> &BudgetCommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum BudgetCommand {
    /// Show the four check columns and monthly target of one mode.
    Show(BudgetShowArgs),
    /// Set one check amount of one category.
    Set(BudgetSetArgs),
    /// Set or clear the monthly target of one category.
    Target(BudgetTargetArgs),
}

/// Args for the `stewardship budget show` command.
#[derive(Debug, Default, Parser, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BudgetShowArgs {
    /// The mode to show. Defaults to the mode in settings.
    #[arg(long, value_enum)]
    #[serde(default)]
    pub mode: Option<BudgetMode>,
}

/// Args for the `stewardship budget set` command.
#[derive(Debug, Parser, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BudgetSetArgs {
    /// The category label, e.g. "Savings (Emergency)", or its short key, e.g. savings.
    #[arg(long)]
    #[schemars(with = "String")]
    pub category: BudgetCategory,

    /// Which set of check columns to change.
    #[arg(long, value_enum)]
    pub mode: BudgetMode,

    /// The check number, 1 to 4.
    #[arg(long)]
    pub check: usize,

    /// The new amount, e.g. 150 or "$1,200.00".
    #[arg(long)]
    #[schemars(with = "String")]
    pub amount: Amount,
}

/// Args for the `stewardship budget target` command.
#[derive(Debug, Parser, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BudgetTargetArgs {
    /// The category label or short key.
    #[arg(long)]
    #[schemars(with = "String")]
    pub category: BudgetCategory,

    /// The monthly target. Leave it out to clear the target.
    #[arg(long)]
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub amount: Option<Amount>,
}

/// (Not shown): Args for the `stewardship ledger` command.
#[derive(Debug, Parser, Clone)]
pub struct LedgerArgs {
    #[command(subcommand)]
    command: LedgerCommand,
}

impl LedgerArgs {
    pub fn command(&self) -> &LedgerCommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum LedgerCommand {
    /// Append a transaction to the ledger.
    Add(LedgerAddArgs),
    /// List transactions, newest first, with their totals against the budget.
    List(LedgerListArgs),
}

/// Args for the `stewardship ledger add` command.
#[derive(Debug, Parser, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LedgerAddArgs {
    /// The date of the transaction as YYYY-MM-DD. Defaults to today.
    #[arg(long)]
    #[serde(default)]
    pub date: Option<NaiveDate>,

    /// The category label or short key. Must be one of the ten budget categories.
    #[arg(long)]
    #[schemars(with = "String")]
    pub category: BudgetCategory,

    /// The amount spent, zero or more.
    #[arg(long)]
    #[schemars(with = "String")]
    pub amount: Amount,

    /// An optional note.
    #[arg(long)]
    #[serde(default)]
    pub memo: Option<String>,
}

/// Args for the `stewardship ledger list` command. Without --start, --end or --all the list
/// covers the current month through today.
#[derive(Debug, Default, Parser, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LedgerListArgs {
    /// The first date to include, as YYYY-MM-DD.
    #[arg(long)]
    #[serde(default)]
    pub start: Option<NaiveDate>,

    /// The last date to include, as YYYY-MM-DD.
    #[arg(long)]
    #[serde(default)]
    pub end: Option<NaiveDate>,

    /// Only this category, by label or short key.
    #[arg(long)]
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub category: Option<BudgetCategory>,

    /// List every transaction regardless of date, including those whose date cannot be read.
    #[arg(long)]
    #[serde(default)]
    pub all: bool,

    /// The date that "this month" is relative to. Defaults to today.
    #[arg(long)]
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

/// (Not shown): Args for the `stewardship verse` command.
#[derive(Debug, Parser, Clone)]
pub struct VerseArgs {
    /// Pick a different verse and save the choice.
    #[arg(long)]
    next: bool,
}

impl VerseArgs {
    pub fn new(next: bool) -> Self {
        Self { next }
    }

    pub fn next(&self) -> bool {
        self.next
    }
}

/// (Not shown): Args for the `stewardship mcp` command.
#[derive(Debug, Parser, Clone)]
pub struct McpArgs {}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("stewardship"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or STEWARDSHIP_HOME instead of relying on the default \
                home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("stewardship")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        <Args as CommandFactory>::command().debug_assert();
    }

    #[test]
    fn test_parse_budget_set() {
        let args = Args::try_parse_from([
            "stewardship",
            "--home",
            "/tmp/s",
            "budget",
            "set",
            "--category",
            "savings",
            "--mode",
            "post-rental",
            "--check",
            "2",
            "--amount",
            "$1,200.00",
        ])
        .unwrap();
        assert_eq!(args.common().home().path(), Path::new("/tmp/s"));
        let Command::Budget(budget) = args.command() else {
            panic!("expected budget");
        };
        let BudgetCommand::Set(set) = budget.command() else {
            panic!("expected budget set");
        };
        assert_eq!(set.category, BudgetCategory::SavingsEmergency);
        assert_eq!(set.mode, BudgetMode::PostRental);
        assert_eq!(set.check, 2);
        assert_eq!(set.amount.value(), Decimal::from(1200));
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let result = Args::try_parse_from([
            "stewardship",
            "ledger",
            "add",
            "--category",
            "Coffee",
            "--amount",
            "4",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_args_from_json() {
        let args: SettingsArgs = serde_json::from_value(serde_json::json!({
            "income": "$6,000.00",
            "mode": "Post-Rental",
            "tithe_pct": 12
        }))
        .unwrap();
        assert_eq!(args.income.unwrap().value(), Decimal::from(6000));
        assert_eq!(args.mode, Some(BudgetMode::PostRental));
        assert_eq!(args.tithe_pct, Some(Decimal::from(12)));
        assert!(!args.is_empty());
        assert!(SettingsArgs::default().is_empty());
    }
}
