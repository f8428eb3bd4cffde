//! CLI command implementations.

mod agent;
mod config;
mod list;
mod serve;
mod show;

pub use agent::run_agent;
pub use config::run_config;
pub use list::run_list;
pub use serve::run_serve;
pub use show::run_show;
