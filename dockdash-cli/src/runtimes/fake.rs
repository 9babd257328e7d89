use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use futures_util::StreamExt;
use parking_lot::Mutex;

use dockdash_core::model::{PortMapping, UnitDetail, UnitSnapshot, UnitState, UnitStats};
use dockdash_core::runtime::{LogStream, RuntimeClient, RuntimeError};

struct DemoUnit {
    snapshot: UnitSnapshot,
    base_cpu: f64,
    base_mem: u64,
    /// Start requests for this unit always fail
    broken: bool,
}

/// Simulated containers for `--demo` and for trying the UI without Docker
pub struct DemoRuntime {
    units: Mutex<Vec<DemoUnit>>,
    tick: Mutex<u64>,
    log_interval: Duration,
}

const MEM_LIMIT: u64 = 2 * 1024 * 1024 * 1024;

fn demo_unit(
    id: &str,
    name: &str,
    image: &str,
    state: UnitState,
    port: Option<(u16, u16)>,
    base_cpu: f64,
    base_mem: u64,
) -> DemoUnit {
    let status = if state.is_running() {
        "Up 2 hours".to_string()
    } else {
        "Exited (0) 5 minutes ago".to_string()
    };
    DemoUnit {
        snapshot: UnitSnapshot {
            id: format!("{:0<64}", id),
            name: name.to_string(),
            image: image.to_string(),
            status,
            state,
            ports: port
                .map(|(public, private)| PortMapping {
                    private_port: private,
                    public_port: Some(public),
                    protocol: "tcp".into(),
                })
                .into_iter()
                .collect(),
            created: Some(Utc::now() - ChronoDuration::hours(3)),
        },
        base_cpu,
        base_mem,
        broken: false,
    }
}

impl DemoRuntime {
    pub fn new() -> Self {
        let mut migrate = demo_unit(
            "9f1c",
            "migrate",
            "example/migrate:broken",
            UnitState::Dead,
            None,
            0.0,
            0,
        );
        migrate.broken = true;

        Self {
            units: Mutex::new(vec![
                demo_unit("a31f", "api", "example/api:1.4", UnitState::Running, Some((8080, 80)), 12.0, 150_000_000),
                demo_unit("b7e2", "worker", "example/worker:1.4", UnitState::Running, None, 35.0, 280_000_000),
                demo_unit("c04d", "postgres", "postgres:16", UnitState::Running, Some((5432, 5432)), 8.0, 512_000_000),
                demo_unit("d9a0", "redis", "redis:7", UnitState::Running, Some((6379, 6379)), 3.0, 64_000_000),
                demo_unit("e552", "web", "nginx:1.27", UnitState::Exited, Some((8443, 443)), 1.5, 20_000_000),
                migrate,
            ]),
            tick: Mutex::new(0),
            log_interval: Duration::from_millis(600),
        }
    }

    fn with_unit<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut DemoUnit) -> Result<R, RuntimeError>,
    ) -> Result<R, RuntimeError> {
        let mut units = self.units.lock();
        let unit = units
            .iter_mut()
            .find(|u| u.snapshot.id == id || u.snapshot.name == id || u.snapshot.id.starts_with(id))
            .ok_or_else(|| RuntimeError::NotFound { id: id.to_string() })?;
        f(unit)
    }

    fn set_state(&self, id: &str, state: UnitState) -> Result<(), RuntimeError> {
        self.with_unit(id, |unit| {
            if unit.broken && state.is_running() {
                return Err(RuntimeError::Rejected {
                    id: id.to_string(),
                    message: "exec format error".into(),
                });
            }
            unit.snapshot.status = if state.is_running() {
                "Up Less than a second".into()
            } else {
                "Exited (0) Less than a second ago".into()
            };
            unit.snapshot.state = state;
            Ok(())
        })
    }
}

impl Default for DemoRuntime {
    fn default() -> Self {
        Self::new()
    }
}

fn log_line(name: &str, tick: u64) -> String {
    match name {
        "api" => {
            if tick % 12 == 7 {
                "[ERROR] Connection refused to upstream service".into()
            } else if tick % 8 == 3 {
                "[WARN] High latency detected: 450ms".into()
            } else {
                let routes = ["GET /health 200", "GET /api/users 200", "POST /api/data 201", "GET /api/status 200"];
                routes[(tick as usize) % routes.len()].into()
            }
        }
        "worker" => {
            if tick % 10 == 5 {
                format!("[ERROR] Job {} failed: timeout after 30s", tick)
            } else if tick % 7 == 2 {
                format!("[WARN] Queue depth high: {} pending", 50 + (tick % 30))
            } else {
                format!("processed job id={}", tick)
            }
        }
        "postgres" => {
            if tick % 15 == 10 {
                "[WARN] Slow query detected: 1250ms".into()
            } else {
                let msgs = ["checkpoint complete", "autovacuum: processing", "connection accepted"];
                msgs[(tick as usize) % msgs.len()].into()
            }
        }
        "redis" => {
            let keys = 1000 + (tick % 500);
            let mem = 2.0 + (tick % 10) as f64 * 0.1;
            format!("keys: {}, memory: {:.1}MB", keys, mem)
        }
        _ => format!("tick {}", tick),
    }
}

#[async_trait]
impl RuntimeClient for DemoRuntime {
    fn name(&self) -> &'static str {
        "demo"
    }

    async fn list_units(&self) -> Result<Vec<UnitSnapshot>, RuntimeError> {
        Ok(self.units.lock().iter().map(|u| u.snapshot.clone()).collect())
    }

    async fn get_stats(&self, id: &str) -> Result<UnitStats, RuntimeError> {
        let tick = {
            let mut tick = self.tick.lock();
            *tick += 1;
            *tick
        };
        self.with_unit(id, |unit| {
            if !unit.snapshot.state.is_running() {
                return Ok(UnitStats::default());
            }
            let cpu = (unit.base_cpu + (tick % 10) as f64 * 1.5 - 5.0).max(0.1);
            let mem_usage = unit.base_mem + (tick % 20) * 1_000_000;
            Ok(UnitStats {
                cpu_percent: cpu,
                mem_percent: mem_usage as f64 / MEM_LIMIT as f64 * 100.0,
                mem_usage,
                mem_limit: MEM_LIMIT,
                net_rx: tick * 48_000,
                net_tx: tick * 12_500,
                block_read: 4_096 * tick,
                block_write: 1_024 * tick,
                pids: 4 + tick % 3,
            })
        })
    }

    async fn start(&self, id: &str) -> Result<(), RuntimeError> {
        tokio::time::sleep(Duration::from_millis(250)).await;
        self.set_state(id, UnitState::Running)
    }

    async fn stop(&self, id: &str) -> Result<(), RuntimeError> {
        tokio::time::sleep(Duration::from_millis(300)).await;
        self.set_state(id, UnitState::Exited)
    }

    async fn restart(&self, id: &str) -> Result<(), RuntimeError> {
        tokio::time::sleep(Duration::from_millis(400)).await;
        self.set_state(id, UnitState::Running)
    }

    async fn remove(&self, id: &str) -> Result<(), RuntimeError> {
        tokio::time::sleep(Duration::from_millis(150)).await;
        let mut units = self.units.lock();
        let before = units.len();
        units.retain(|u| !(u.snapshot.id == id || u.snapshot.name == id || u.snapshot.id.starts_with(id)));
        if units.len() == before {
            return Err(RuntimeError::NotFound { id: id.to_string() });
        }
        Ok(())
    }

    async fn stream_logs(&self, id: &str) -> Result<LogStream, RuntimeError> {
        let name = self.with_unit(id, |unit| Ok(unit.snapshot.name.clone()))?;
        let interval = self.log_interval;
        let backlog: Vec<Result<String, RuntimeError>> =
            (0..20).map(|t| Ok(stamped(&log_line(&name, t)))).collect();

        let live = futures_util::stream::unfold(20u64, move |tick| {
            let name = name.clone();
            async move {
                tokio::time::sleep(interval).await;
                Some((Ok(stamped(&log_line(&name, tick))), tick + 1))
            }
        });
        Ok(futures_util::stream::iter(backlog).chain(live).boxed())
    }

    async fn exec(&self, id: &str, command: &str) -> Result<String, RuntimeError> {
        let running = self.with_unit(id, |unit| Ok(unit.snapshot.state.is_running()))?;
        if !running {
            return Err(RuntimeError::Exec {
                id: id.to_string(),
                message: "container is not running".into(),
            });
        }
        tokio::time::sleep(Duration::from_millis(120)).await;
        Ok(format!("$ {}\nok\n", command))
    }

    async fn inspect(&self, id: &str) -> Result<UnitDetail, RuntimeError> {
        self.with_unit(id, |unit| {
            let snap = &unit.snapshot;
            let running = snap.state.is_running();
            let mut labels = BTreeMap::new();
            labels.insert("com.example.demo".to_string(), "true".to_string());
            Ok(UnitDetail {
                id: snap.id.clone(),
                name: format!("/{}", snap.name),
                image: snap.image.clone(),
                created: snap.created_label(),
                status: snap.state.label().to_string(),
                running,
                pid: if running { 4242 } else { 0 },
                ip_address: "172.17.0.2".into(),
                gateway: "172.17.0.1".into(),
                mac_address: "02:42:ac:11:00:02".into(),
                ports: snap.ports.clone(),
                memory_limit: MEM_LIMIT as i64,
                cpu_shares: 1024,
                env: vec!["PATH=/usr/local/bin:/usr/bin:/bin".into()],
                labels,
                ..Default::default()
            })
        })
    }
}

fn stamped(text: &str) -> String {
    format!("{} {}", Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"), text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_lifecycle_round_trip() {
        let rt = DemoRuntime::new();
        rt.stop("api").await.unwrap();
        let units = rt.list_units().await.unwrap();
        let api = units.iter().find(|u| u.name == "api").unwrap();
        assert_eq!(api.state, UnitState::Exited);

        rt.start("api").await.unwrap();
        rt.remove("web").await.unwrap();
        let units = rt.list_units().await.unwrap();
        assert!(units.iter().all(|u| u.name != "web"));
        assert!(matches!(rt.remove("web").await, Err(RuntimeError::NotFound { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_broken_unit_refuses_to_start() {
        let rt = DemoRuntime::new();
        assert!(matches!(
            rt.start("migrate").await,
            Err(RuntimeError::Rejected { .. })
        ));
    }

    #[tokio::test]
    async fn test_stats_only_for_running_units() {
        let rt = DemoRuntime::new();
        let stats = rt.get_stats("postgres").await.unwrap();
        assert!(stats.cpu_percent > 0.0);
        assert!(stats.mem_percent > 0.0 && stats.mem_percent < 100.0);
        assert_eq!(rt.get_stats("web").await.unwrap(), UnitStats::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_logs_start_with_backlog() {
        let rt = DemoRuntime::new();
        let lines: Vec<_> = rt.stream_logs("redis").await.unwrap().take(21).collect().await;
        assert_eq!(lines.len(), 21);
        assert!(lines[0].as_ref().unwrap().contains("keys: 1000"));
    }
}
