pub mod params;
pub mod schema;

pub use params::{ParamDef, Params};
pub use schema::{
    BrowserConfig, Config, CursorMode, DebugConfig, HarvestConfig, NetworkIdle, TargetUrl,
    Viewport,
};
