//! Utilities Module
//!
//! Configuration, HTTP, logging and retry helpers shared by the components.

mod http;
pub mod config;
pub mod logging;
pub mod retry;

pub use config::*;
pub use http::*;
pub use retry::*;
