//! The MCP tools. Each one calls the command of the same purpose and returns its `Out`.

use crate::args::{
    BudgetSetArgs, BudgetShowArgs, BudgetTargetArgs, DashboardArgs, LedgerAddArgs,
    LedgerListArgs, SettingsArgs,
};
use crate::commands;
use crate::mcp::mcp_utils::tool_result;
use crate::mcp::StewardshipServer;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;
use rmcp::{tool, tool_router};
use tracing::info;

#[tool_router(vis = "pub(super)")]
impl StewardshipServer {
    #[tool]
    /// Initialize the stewardship MCP service for this session and return usage instructions. You
    /// **MUST** call this **ONCE** before using other tools so that you have the full usage
    /// instructions. You **MAY** call it more than once if you have forgotten the usage
    /// instructions.
    async fn initialize_service(&self) -> Result<CallToolResult, McpError> {
        let mut initialized = self.initialized.lock().await;
        *initialized = true;
        Ok(CallToolResult::success(vec![rmcp::model::Content::text(
            include_str!("docs/INSTRUCTIONS.md"),
        )]))
    }

    /// Show the dashboard: the settings, each category's budget total in the current mode, the
    /// tithe, rental reserve, savings and living totals, the goal-vs-actual comparison, how much
    /// of income the rental vacancy absorbs, this month's spending by category and the verse.
    ///
    /// `today` (YYYY-MM-DD) decides which month "this month" is and defaults to the current date.
    #[tool]
    async fn dashboard(
        &self,
        Parameters(args): Parameters<DashboardArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: dashboard called");
        let today = args.today.unwrap_or_else(commands::today);
        let out = match self.workbook().await {
            Ok(mut workbook) => commands::dashboard(&mut workbook, today).await,
            Err(e) => Err(e),
        };
        tool_result(out)
    }

    /// Save dashboard settings. Only the fields you pass are changed; the others keep their
    /// stored values. Call it with no fields to read the settings without changing them.
    ///
    /// - `income`, `rental`, `emergency_current`: dollar amounts such as `"6000"` or
    ///   `"$6,000.00"`.
    /// - `mode`: `"Temporary"` (rental vacant) or `"Post-Rental"` (rental rented). This decides
    ///   which check columns the dashboard and ledger comparison use.
    /// - `tithe_pct`, `savings_pct`: goal percentages of income.
    /// - `emergency_target_months`: how many months the emergency fund should cover.
    #[tool]
    async fn save_settings(
        &self,
        Parameters(args): Parameters<SettingsArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: save_settings called");
        let out = match self.workbook().await {
            Ok(mut workbook) => commands::settings(&mut workbook, commands::today(), args).await,
            Err(e) => Err(e),
        };
        tool_result(out)
    }

    /// Show the budget of one mode: each category's four check amounts, their total and the
    /// monthly target. `mode` defaults to the mode in settings.
    #[tool]
    async fn show_budgets(
        &self,
        Parameters(args): Parameters<BudgetShowArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: show_budgets called");
        let out = match self.workbook().await {
            Ok(mut workbook) => {
                commands::budget_show(&mut workbook, commands::today(), args).await
            }
            Err(e) => Err(e),
        };
        tool_result(out)
    }

    /// Set one check amount of one category.
    ///
    /// - `category`: one of the ten budget categories by label (e.g. `"Savings (Emergency)"`) or
    ///   short key (e.g. `"savings"`).
    /// - `mode`: `"Temporary"` or `"Post-Rental"`.
    /// - `check`: 1, 2, 3 or 4.
    /// - `amount`: e.g. `"150"` or `"$1,200.00"`.
    ///
    /// The whole Budgets table is rewritten, so edits made elsewhere since the last read are
    /// overwritten.
    #[tool]
    async fn set_budget_amount(
        &self,
        Parameters(args): Parameters<BudgetSetArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!(
            "MCP: set_budget_amount called for {} check {}",
            args.category, args.check
        );
        let out = match self.workbook().await {
            Ok(mut workbook) => commands::budget_set(&mut workbook, commands::today(), args).await,
            Err(e) => Err(e),
        };
        tool_result(out)
    }

    /// Set the monthly target of one category, or clear it by leaving out `amount`.
    #[tool]
    async fn set_monthly_target(
        &self,
        Parameters(args): Parameters<BudgetTargetArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: set_monthly_target called for {}", args.category);
        let out = match self.workbook().await {
            Ok(mut workbook) => {
                commands::budget_target(&mut workbook, commands::today(), args).await
            }
            Err(e) => Err(e),
        };
        tool_result(out)
    }

    /// Append a transaction to the Daily_Spending ledger.
    ///
    /// - `date`: YYYY-MM-DD, defaults to today.
    /// - `category`: one of the ten budget categories by label or short key. Other names are
    ///   rejected.
    /// - `amount`: the amount spent, zero or more.
    /// - `memo`: optional.
    ///
    /// Transactions are never edited or deleted by this service.
    #[tool]
    async fn add_transaction(
        &self,
        Parameters(args): Parameters<LedgerAddArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: add_transaction called for {}", args.category);
        let out = match self.workbook().await {
            Ok(mut workbook) => commands::ledger_add(&mut workbook, commands::today(), args).await,
            Err(e) => Err(e),
        };
        tool_result(out)
    }

    /// List transactions newest first, with per-category totals compared to the budget of the
    /// current mode.
    ///
    /// - `start`, `end`: an inclusive YYYY-MM-DD range; either may be left out. Transactions whose
    ///   date cannot be read never match a range.
    /// - `category`: only this category.
    /// - `all`: ignore dates entirely.
    ///
    /// With no `start`, `end` or `all`, the list covers the first of this month through today.
    #[tool]
    async fn list_transactions(
        &self,
        Parameters(args): Parameters<LedgerListArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: list_transactions called");
        let out = match self.workbook().await {
            Ok(mut workbook) => {
                commands::ledger_list(&mut workbook, commands::today(), args).await
            }
            Err(e) => Err(e),
        };
        tool_result(out)
    }

    /// Pick a different verse for the dashboard and save the choice.
    #[tool]
    async fn next_verse(&self) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: next_verse called");
        let out = match self.workbook().await {
            Ok(mut workbook) => commands::verse(&mut workbook, true).await,
            Err(e) => Err(e),
        };
        tool_result(out)
    }
}
