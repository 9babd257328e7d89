use std::sync::Arc;

use dockdash_core::config::DashboardConfig;
use dockdash_core::runtime::{RuntimeClient, RuntimeError};

mod fake;

#[cfg(feature = "docker")]
mod docker;

pub use fake::DemoRuntime;

#[cfg(feature = "docker")]
pub use docker::DockerRuntime;

/// Pick the runtime backend: the simulated one for `--demo`, Docker otherwise
pub async fn connect(
    config: &DashboardConfig,
    demo: bool,
) -> Result<Arc<dyn RuntimeClient>, RuntimeError> {
    if demo {
        return Ok(Arc::new(DemoRuntime::new()));
    }
    docker_runtime(config).await
}

#[cfg(feature = "docker")]
async fn docker_runtime(config: &DashboardConfig) -> Result<Arc<dyn RuntimeClient>, RuntimeError> {
    Ok(Arc::new(DockerRuntime::connect(config).await?))
}

#[cfg(not(feature = "docker"))]
async fn docker_runtime(_config: &DashboardConfig) -> Result<Arc<dyn RuntimeClient>, RuntimeError> {
    Err(RuntimeError::Unreachable {
        message: "built without Docker support; rebuild with --features docker or use --demo".into(),
    })
}
