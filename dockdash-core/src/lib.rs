pub mod config;
pub mod log_filter;
pub mod model;
pub mod runtime;

// Focused-unit metrics and sparklines
pub mod metrics;

// Bulk mode
pub mod bulk;
pub mod selection;

// Shared state, pollers and the keystroke entry point
pub mod dashboard;
pub mod state;
pub mod workers;

pub use config::DashboardConfig;
pub use dashboard::{Dashboard, Handled, Intent};
pub use runtime::{LifecycleAction, RuntimeClient, RuntimeError};
pub use state::DashboardState;
