#![cfg(feature = "docker")]

use std::collections::BTreeMap;

use async_trait::async_trait;
use bollard::container::{
    InspectContainerOptions, ListContainersOptions, LogsOptions, RemoveContainerOptions,
    RestartContainerOptions, StartContainerOptions, Stats, StatsOptions, StopContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::{API_DEFAULT_VERSION, Docker};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;

use dockdash_core::config::DashboardConfig;
use dockdash_core::model::{MountInfo, PortMapping, UnitDetail, UnitSnapshot, UnitState, UnitStats};
use dockdash_core::runtime::{LogStream, RuntimeClient, RuntimeError};

const CONNECT_TIMEOUT_SECS: u64 = 120;

/// Docker Engine API client
pub struct DockerRuntime {
    client: Docker,
    log_tail: usize,
    stop_timeout_secs: u64,
}

fn unreachable_err(e: impl std::fmt::Display) -> RuntimeError {
    RuntimeError::Unreachable {
        message: e.to_string(),
    }
}

/// Map a bollard error for a call on `id`
fn map_err(id: &str, e: BollardError) -> RuntimeError {
    match e {
        BollardError::DockerResponseServerError {
            status_code: 404, ..
        } => RuntimeError::NotFound { id: id.to_string() },
        BollardError::DockerResponseServerError { message, .. } => RuntimeError::Rejected {
            id: id.to_string(),
            message,
        },
        other => unreachable_err(other),
    }
}

impl DockerRuntime {
    /// Connect and ping. `docker_host` picks the endpoint
    /// (`unix://...`, `tcp://...`), falling back to the local defaults.
    pub async fn connect(config: &DashboardConfig) -> Result<Self, RuntimeError> {
        let client = match config.docker_host.as_deref() {
            Some(host) if host.starts_with("unix://") => Docker::connect_with_socket(
                host.trim_start_matches("unix://"),
                CONNECT_TIMEOUT_SECS,
                API_DEFAULT_VERSION,
            ),
            Some(host) if host.starts_with("tcp://") || host.starts_with("http://") => {
                Docker::connect_with_http(host, CONNECT_TIMEOUT_SECS, API_DEFAULT_VERSION)
            }
            _ => Docker::connect_with_local_defaults(),
        }
        .map_err(|e| unreachable_err(format!("failed to connect to Docker: {}", e)))?;

        client
            .ping()
            .await
            .map_err(|e| unreachable_err(format!("Docker ping failed: {}", e)))?;

        Ok(Self {
            client,
            log_tail: config.log_tail,
            stop_timeout_secs: config.stop_timeout_secs,
        })
    }
}

/// CPU usage as a percentage of host capacity, from two cumulative samples
pub fn cpu_percent(total: u64, pre_total: u64, system: u64, pre_system: u64, cpus: u64) -> f64 {
    let cpu_delta = total.saturating_sub(pre_total) as f64;
    let system_delta = system.saturating_sub(pre_system) as f64;
    if cpu_delta <= 0.0 || system_delta <= 0.0 {
        return 0.0;
    }
    cpu_delta / system_delta * cpus.max(1) as f64 * 100.0
}

pub fn mem_percent(usage: u64, limit: u64) -> f64 {
    if limit == 0 {
        return 0.0;
    }
    usage as f64 / limit as f64 * 100.0
}

fn to_unit_stats(stats: &Stats) -> UnitStats {
    let cpus = stats.cpu_stats.online_cpus.unwrap_or_else(|| {
        stats
            .cpu_stats
            .cpu_usage
            .percpu_usage
            .as_ref()
            .map(|v| v.len() as u64)
            .unwrap_or(1)
    });
    let cpu = cpu_percent(
        stats.cpu_stats.cpu_usage.total_usage,
        stats.precpu_stats.cpu_usage.total_usage,
        stats.cpu_stats.system_cpu_usage.unwrap_or(0),
        stats.precpu_stats.system_cpu_usage.unwrap_or(0),
        cpus,
    );

    let mem_usage = stats.memory_stats.usage.unwrap_or(0);
    let mem_limit = stats.memory_stats.limit.unwrap_or(0);

    let (net_rx, net_tx) = stats
        .networks
        .as_ref()
        .map(|nets| {
            nets.values()
                .fold((0, 0), |(rx, tx), n| (rx + n.rx_bytes, tx + n.tx_bytes))
        })
        .unwrap_or((0, 0));

    let mut block_read = 0;
    let mut block_write = 0;
    for entry in stats
        .blkio_stats
        .io_service_bytes_recursive
        .iter()
        .flatten()
    {
        match entry.op.as_str() {
            "Read" | "read" => block_read += entry.value,
            "Write" | "write" => block_write += entry.value,
            _ => {}
        }
    }

    UnitStats {
        cpu_percent: cpu,
        mem_percent: mem_percent(mem_usage, mem_limit),
        mem_usage,
        mem_limit,
        net_rx,
        net_tx,
        block_read,
        block_write,
        pids: stats.pids_stats.current.unwrap_or(0),
    }
}

#[async_trait]
impl RuntimeClient for DockerRuntime {
    fn name(&self) -> &'static str {
        "docker"
    }

    async fn list_units(&self) -> Result<Vec<UnitSnapshot>, RuntimeError> {
        let options = ListContainersOptions::<String> {
            all: true,
            ..Default::default()
        };
        let containers = self
            .client
            .list_containers(Some(options))
            .await
            .map_err(unreachable_err)?;

        Ok(containers
            .into_iter()
            .map(|c| UnitSnapshot {
                id: c.id.unwrap_or_default(),
                name: c
                    .names
                    .and_then(|names| names.into_iter().next())
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_default(),
                image: c.image.unwrap_or_default(),
                status: c.status.unwrap_or_default(),
                state: UnitState::parse(c.state.as_deref().unwrap_or("")),
                ports: c
                    .ports
                    .unwrap_or_default()
                    .into_iter()
                    .map(|p| PortMapping {
                        private_port: p.private_port,
                        public_port: p.public_port,
                        protocol: p.typ.map(|t| t.to_string()).unwrap_or_else(|| "tcp".into()),
                    })
                    .collect(),
                created: c.created.and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
            })
            .collect())
    }

    async fn get_stats(&self, id: &str) -> Result<UnitStats, RuntimeError> {
        let options = StatsOptions {
            stream: false,
            one_shot: false,
        };
        let mut stream = self.client.stats(id, Some(options));
        match stream.next().await {
            Some(Ok(stats)) => Ok(to_unit_stats(&stats)),
            Some(Err(e)) => Err(map_err(id, e)),
            None => Err(RuntimeError::Stream {
                message: format!("no stats returned for {}", id),
            }),
        }
    }

    async fn start(&self, id: &str) -> Result<(), RuntimeError> {
        self.client
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| map_err(id, e))
    }

    async fn stop(&self, id: &str) -> Result<(), RuntimeError> {
        let options = StopContainerOptions {
            t: self.stop_timeout_secs as i64,
        };
        self.client
            .stop_container(id, Some(options))
            .await
            .map_err(|e| map_err(id, e))
    }

    async fn restart(&self, id: &str) -> Result<(), RuntimeError> {
        let options = RestartContainerOptions {
            t: self.stop_timeout_secs as isize,
        };
        self.client
            .restart_container(id, Some(options))
            .await
            .map_err(|e| map_err(id, e))
    }

    async fn remove(&self, id: &str) -> Result<(), RuntimeError> {
        let options = RemoveContainerOptions {
            force: true,
            v: true,
            ..Default::default()
        };
        self.client
            .remove_container(id, Some(options))
            .await
            .map_err(|e| map_err(id, e))
    }

    async fn stream_logs(&self, id: &str) -> Result<LogStream, RuntimeError> {
        // surface a missing container up front rather than as a stream error
        self.client
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| map_err(id, e))?;

        let options = LogsOptions::<String> {
            follow: true,
            stdout: true,
            stderr: true,
            timestamps: true,
            tail: self.log_tail.to_string(),
            ..Default::default()
        };
        let stream = self.client.logs(id, Some(options)).map(|item| {
            item.map(|out| out.to_string())
                .map_err(|e| RuntimeError::Stream {
                    message: e.to_string(),
                })
        });
        Ok(stream.boxed())
    }

    async fn exec(&self, id: &str, command: &str) -> Result<String, RuntimeError> {
        let options = CreateExecOptions {
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            cmd: Some(vec!["/bin/sh", "-c", command]),
            ..Default::default()
        };
        let exec = self
            .client
            .create_exec(id, options)
            .await
            .map_err(|e| map_err(id, e))?;

        let mut output = String::new();
        match self
            .client
            .start_exec(&exec.id, None)
            .await
            .map_err(|e| map_err(id, e))?
        {
            StartExecResults::Attached { output: mut stream, .. } => {
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk.map_err(|e| RuntimeError::Stream {
                        message: e.to_string(),
                    })?;
                    output.push_str(&chunk.to_string());
                }
            }
            StartExecResults::Detached => {}
        }

        let inspect = self
            .client
            .inspect_exec(&exec.id)
            .await
            .map_err(|e| map_err(id, e))?;
        match inspect.exit_code {
            Some(code) if code != 0 => Err(RuntimeError::Exec {
                id: id.to_string(),
                message: format!("exit code {}: {}", code, output.trim_end()),
            }),
            _ => Ok(output),
        }
    }

    async fn inspect(&self, id: &str) -> Result<UnitDetail, RuntimeError> {
        let info = self
            .client
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| map_err(id, e))?;

        let state = info.state.unwrap_or_default();
        let config = info.config.unwrap_or_default();
        let network = info.network_settings.unwrap_or_default();
        let host = info.host_config.unwrap_or_default();

        let mut ports = Vec::new();
        for (port_key, bindings) in network.ports.unwrap_or_default() {
            let (private, proto) = port_key.split_once('/').unwrap_or((port_key.as_str(), "tcp"));
            let Ok(private_port) = private.parse::<u16>() else {
                continue;
            };
            let public_port = bindings
                .unwrap_or_default()
                .into_iter()
                .find_map(|b| b.host_port.and_then(|p| p.parse::<u16>().ok()));
            ports.push(PortMapping {
                private_port,
                public_port,
                protocol: proto.to_string(),
            });
        }
        ports.sort_by_key(|p| p.private_port);

        Ok(UnitDetail {
            id: info.id.unwrap_or_default(),
            name: info.name.unwrap_or_default(),
            image: config.image.unwrap_or_default(),
            created: info.created.unwrap_or_default(),
            status: state.status.map(|s| s.to_string()).unwrap_or_default(),
            running: state.running.unwrap_or(false),
            paused: state.paused.unwrap_or(false),
            restarting: state.restarting.unwrap_or(false),
            pid: state.pid.unwrap_or(0),
            exit_code: state.exit_code.unwrap_or(0),
            started_at: state.started_at.unwrap_or_default(),
            finished_at: state.finished_at.unwrap_or_default(),
            ip_address: network.ip_address.unwrap_or_default(),
            gateway: network.gateway.unwrap_or_default(),
            mac_address: network.mac_address.unwrap_or_default(),
            ports,
            memory_limit: host.memory.unwrap_or(0),
            cpu_shares: host.cpu_shares.unwrap_or(0),
            mounts: info
                .mounts
                .unwrap_or_default()
                .into_iter()
                .map(|m| MountInfo {
                    source: m.source.unwrap_or_default(),
                    destination: m.destination.unwrap_or_default(),
                    kind: m.typ.map(|t| t.to_string()).unwrap_or_default(),
                })
                .collect(),
            env: config.env.unwrap_or_default(),
            labels: config
                .labels
                .unwrap_or_default()
                .into_iter()
                .collect::<BTreeMap<_, _>>(),
        })
    }
}
