//! CLI command implementations.

mod ask;
mod chunks;
mod config;
mod questions;
mod session;

pub use ask::run_ask;
pub use chunks::run_chunks;
pub use config::run_config;
pub use questions::run_questions;
pub use session::run_session;
