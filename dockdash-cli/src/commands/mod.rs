mod container;
mod lifecycle;

pub use container::{exec, inspect, logs, ps};
pub use lifecycle::run as run_lifecycle;
