//! MCP (Model Context Protocol) server implementation.
//!
//! This module provides an MCP server that exposes the dashboard, the budget editor, the ledger
//! and the verse as tools for AI agent integration. The server communicates via JSON-RPC over
//! stdio.

/// Checks if the server has been initialized and returns an error if not.
macro_rules! require_init {
    ($self:expr) => {
        if !$self.check_initialized().await {
            return Self::uninitialized();
        }
    };
}

mod mcp_utils;
mod tools;

use crate::api::Workbook;
use crate::error::{ErrorType, IntoResult};
use crate::{commands, Config, Mode};
use anyhow::anyhow;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::model::{
    CallToolResult, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::transport::stdio;
use rmcp::ErrorData as McpError;
use rmcp::{tool_handler, ServerHandler, ServiceExt};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{debug, info};

/// An open store and when it was opened.
struct Connection {
    opened: Instant,
    workbook: Workbook,
}

impl Debug for Connection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("opened", &self.opened)
            .finish_non_exhaustive()
    }
}

/// The stewardship MCP server.
#[derive(Debug, Clone)]
pub struct StewardshipServer {
    initialized: Arc<Mutex<bool>>,
    mode: Mode,
    config: Arc<Config>,
    connection: Arc<Mutex<Option<Connection>>>,
    tool_router: ToolRouter<StewardshipServer>,
}

impl StewardshipServer {
    /// Creates a new StewardshipServer with the given configuration. The store is not contacted
    /// until a tool needs it.
    pub fn new(config: Config, mode: Mode) -> Self {
        Self {
            initialized: Arc::new(Mutex::new(false)),
            mode,
            config: Arc::new(config),
            connection: Arc::new(Mutex::new(None)),
            tool_router: Self::tool_router(),
        }
    }

    async fn check_initialized(&self) -> bool {
        *self.initialized.lock().await
    }

    fn uninitialized() -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::error(vec![rmcp::model::Content::text(
            "You have not yet initialized the service. Please call __initialize_service__ first.",
        )]))
    }

    /// The open store, reconnecting when there is none yet or the connection is older than the
    /// configured connection TTL. Holding the guard serializes tool calls against the store.
    async fn workbook(&self) -> crate::Result<MappedMutexGuard<'_, Workbook>> {
        let mut guard = self.connection.lock().await;
        let ttl = self.config.connection_ttl();
        if guard.as_ref().is_none_or(|c| c.opened.elapsed() >= ttl) {
            debug!("Opening a new connection to the store");
            // Drop a stale connection even if reconnecting fails
            *guard = None;
            let workbook = commands::open(&self.config, self.mode).await?;
            *guard = Some(Connection {
                opened: Instant::now(),
                workbook,
            });
        }
        MutexGuard::try_map(guard, |c| c.as_mut().map(|c| &mut c.workbook))
            .map_err(|_| anyhow!("The store connection is missing"))
            .pub_result(ErrorType::Connection)
    }
}

#[tool_handler]
impl ServerHandler for StewardshipServer {
    /// Returns server information sent to the MCP client during initialization.
    ///
    /// Agents tend to treat `instructions` as optional reading, so the full usage text is also
    /// returned by the `initialize_service` tool, which must be called before any other.
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "stewardship".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(include_str!("docs/INTRO.md").into()),
        }
    }
}

/// Transport type for the MCP server.
#[derive(Debug, Default)]
pub(crate) enum Io {
    #[default]
    Stdio,
    /// Mock transport for testing - holds one end of a duplex channel.
    #[cfg(test)]
    Mock(tokio::io::DuplexStream),
}

/// Runs the MCP server with stdio transport or mock transport. This function starts the MCP server
/// and blocks until the client disconnects or an error occurs.
///
/// # Arguments
/// - `config`: The `Config` object
/// - `mode`: Whether we are running with a live Google sheet or with in-memory tables
/// - `io`: Whether we are using stdio as the transport or using mock io for testing
///
pub(crate) async fn run_server(config: Config, mode: Mode, io: Io) -> crate::Result<()> {
    let server = StewardshipServer::new(config, mode);
    info!("Starting MCP server...");

    let service = match io {
        Io::Stdio => server
            .serve(stdio())
            .await
            .map_err(|e| anyhow!("Failed to start MCP server: {e}"))
            .pub_result(ErrorType::Service)?,
        #[cfg(test)]
        Io::Mock(stream) => server
            .serve(stream)
            .await
            .map_err(|e| anyhow!("Failed to start MCP server: {e}"))
            .pub_result(ErrorType::Service)?,
    };

    info!("MCP server running, waiting for requests...");

    // Wait for the server to complete (client disconnects or error)
    service
        .waiting()
        .await
        .map_err(|e| anyhow!("MCP server error: {e}"))
        .pub_result(ErrorType::Service)?;

    info!("MCP server shut down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Sheet, TestSheet, DAILY_SPENDING};
    use crate::test::TestEnv;
    use rmcp::model::CallToolRequestParam;
    use rmcp::ServiceExt;
    use serde_json::{json, Map, Value};
    use tokio::io::duplex;

    fn arguments(value: Value) -> Option<Map<String, Value>> {
        value.as_object().cloned()
    }

    fn text_of(result: &CallToolResult) -> String {
        result
            .content
            .iter()
            .filter_map(|c| c.as_text().map(|t| t.text.clone()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[tokio::test]
    async fn test_server_info_and_tools() {
        let env = TestEnv::new().await;
        let server = StewardshipServer::new(env.config(), Mode::Testing);
        let info = server.get_info();
        assert_eq!(info.server_info.name, "stewardship");
        assert!(info.capabilities.tools.is_some());
        let names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        assert!(names.iter().any(|n| n == "initialize_service"));
        assert!(names.iter().any(|n| n == "dashboard"));
        assert!(!server.check_initialized().await);
    }

    /// Integration test for the MCP server using an in-memory transport.
    #[tokio::test]
    async fn test_mcp_server_integration() {
        // Create duplex channel - one end for server, one for client
        let (client_io, server_io) = duplex(1 << 16);

        // Create test environment (holds TempDir alive for duration of test)
        let env = TestEnv::new().await;
        let config = env.config();

        let server_handle =
            tokio::spawn(
                async move { run_server(config, Mode::Testing, Io::Mock(server_io)).await },
            );

        let client = ().serve(client_io).await.expect("Failed to create client");

        // Tools refuse to work before initialize_service
        let early = client
            .call_tool(CallToolRequestParam {
                name: "dashboard".into(),
                arguments: None,
            })
            .await
            .expect("dashboard call failed");
        assert!(early.is_error.unwrap_or(false));

        let init_result = client
            .call_tool(CallToolRequestParam {
                name: "initialize_service".into(),
                arguments: None,
            })
            .await
            .expect("initialize_service call failed");
        assert!(
            !init_result.is_error.unwrap_or(false),
            "initialize_service returned error: {:?}",
            init_result.content
        );

        let dashboard = client
            .call_tool(CallToolRequestParam {
                name: "dashboard".into(),
                arguments: arguments(json!({ "today": "2025-10-31" })),
            })
            .await
            .expect("dashboard call failed");
        assert!(
            !dashboard.is_error.unwrap_or(false),
            "dashboard returned error: {:?}",
            dashboard.content
        );
        assert!(text_of(&dashboard).contains("Goal vs Actual"));

        let added = client
            .call_tool(CallToolRequestParam {
                name: "add_transaction".into(),
                arguments: arguments(json!({
                    "date": "2025-10-30",
                    "category": "food",
                    "amount": "$9.99",
                    "memo": "added over mcp"
                })),
            })
            .await
            .expect("add_transaction call failed");
        assert!(
            !added.is_error.unwrap_or(false),
            "add_transaction returned error: {:?}",
            added.content
        );

        let set = client
            .call_tool(CallToolRequestParam {
                name: "set_budget_amount".into(),
                arguments: arguments(json!({
                    "category": "Debt",
                    "mode": "Post-Rental",
                    "check": 2,
                    "amount": "125"
                })),
            })
            .await
            .expect("set_budget_amount call failed");
        assert!(
            !set.is_error.unwrap_or(false),
            "set_budget_amount returned error: {:?}",
            set.content
        );

        let bad = client
            .call_tool(CallToolRequestParam {
                name: "set_budget_amount".into(),
                arguments: arguments(json!({
                    "category": "Debt",
                    "mode": "Temporary",
                    "check": 7,
                    "amount": "125"
                })),
            })
            .await
            .expect("set_budget_amount call failed");
        assert!(bad.is_error.unwrap_or(false));

        let verse = client
            .call_tool(CallToolRequestParam {
                name: "next_verse".into(),
                arguments: None,
            })
            .await
            .expect("next_verse call failed");
        assert!(!verse.is_error.unwrap_or(false));

        drop(client);

        let server_result = tokio::time::timeout(std::time::Duration::from_secs(5), server_handle)
            .await
            .expect("Server timed out")
            .expect("Server task panicked");
        assert!(
            server_result.is_ok(),
            "Server returned error: {:?}",
            server_result
        );

        // The writes reached the store
        let rows = TestSheet::new(env.config().spreadsheet_id())
            .get_rows(DAILY_SPENDING)
            .await
            .unwrap();
        let last = rows.last().unwrap();
        assert_eq!(last[3], "added over mcp");
        assert_eq!(last[2], "9.99");
    }

    #[tokio::test]
    async fn test_tools_are_listed() {
        let (client_io, server_io) = duplex(1 << 16);
        let env = TestEnv::new().await;
        let config = env.config();
        let _server_handle =
            tokio::spawn(
                async move { run_server(config, Mode::Testing, Io::Mock(server_io)).await },
            );
        let client = ().serve(client_io).await.expect("Failed to create client");
        let tools = client
            .list_tools(Default::default())
            .await
            .expect("Failed to list tools");
        let mut names: Vec<String> = tools.tools.iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "add_transaction",
                "dashboard",
                "initialize_service",
                "list_transactions",
                "next_verse",
                "save_settings",
                "set_budget_amount",
                "set_monthly_target",
                "show_budgets",
            ]
        );
    }
}
