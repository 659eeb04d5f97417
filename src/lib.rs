//! # eoka-harvest
//!
//! Harvest detail records from infinite-scroll pages. Each item on the page is
//! clicked once, the JSON response its click triggers is captured, and the
//! overlay it opened is closed again.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use eoka_harvest::{Config, Params, Runner};
//!
//! # #[tokio::main]
//! # async fn main() -> eoka_harvest::Result<()> {
//! let params = Params::new().set("store_url", "https://example.com/store/1");
//! let config = Config::load_with_params("configs/store_menu.yaml", &params)?;
//! let runner = Runner::new(&config.browser).await?;
//! let report = runner.run(&config).await?;
//! println!("Captured {} items", report.processed());
//! runner.close().await?;
//! # Ok(())
//! # }
//! ```

mod config;
pub mod driver;
pub mod harvest;
mod runner;

pub use config::{
    BrowserConfig, Config, CursorMode, DebugConfig, HarvestConfig, NetworkIdle, ParamDef,
    Params, TargetUrl, Viewport,
};
pub use driver::{ElementHandle, EokaDriver, Exchange, ExchangeWatch, PageDriver};
pub use harvest::{
    CorrelatedResponse, HarvestEvent, HarvestReport, HarvestSession, RecoveryOutcome,
};
pub use runner::Runner;

/// Result type for eoka-harvest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during config loading or harvesting.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    /// The initial page could not be loaded. Aborts the harvest.
    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("action failed: {0}")]
    ActionFailed(String),

    #[error("timeout: {0}")]
    Timeout(String),

    /// A matching response arrived but its body is not JSON.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}
