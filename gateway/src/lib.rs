pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod postprocess;
pub mod ratelimit;
pub mod routes;
pub mod state;
pub mod test_util;
pub mod validate;

pub use config::Config;
pub use error::{Error, Result};
pub use state::AppState;
