mod api;
pub mod app;
pub mod args;
pub mod commands;
mod config;
mod db;
mod error;
mod mcp;
pub mod model;
mod utils;

pub use api::{Mode, Workbook};
pub use config::{AuthMethod, Backend, Config};
pub use error::Error;
pub use error::ErrorType;
pub use error::Result;
