use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr};
use futures_util::StreamExt;

use dockdash_core::model::UnitSnapshot;
use dockdash_core::runtime::RuntimeClient;

/// Table for `dockdash ps`, in the runtime's listing order
pub fn format_table(units: &[UnitSnapshot]) -> Vec<String> {
    let name_w = units.iter().map(|u| u.name.len()).max().unwrap_or(0).max(4);
    let image_w = units.iter().map(|u| u.image.len()).max().unwrap_or(0).max(5);

    let mut out = vec![format!(
        "{:<12}  {:<name_w$}  {:<image_w$}  {:<10}  {:<24}  PORTS",
        "CONTAINER ID", "NAME", "IMAGE", "STATE", "STATUS"
    )];
    for u in units {
        out.push(format!(
            "{:<12}  {:<name_w$}  {:<image_w$}  {:<10}  {:<24}  {}",
            u.short_id(),
            u.name,
            u.image,
            u.state.label(),
            u.status,
            u.ports_label()
        ));
    }
    out
}

pub async fn ps(client: Arc<dyn RuntimeClient>) -> Result<()> {
    let units = client.list_units().await.wrap_err("failed to list containers")?;
    if units.is_empty() {
        println!("No containers found");
        return Ok(());
    }
    for line in format_table(&units) {
        println!("{}", line);
    }
    let running = units.iter().filter(|u| u.state.is_running()).count();
    println!("\n{} containers, {} running", units.len(), running);
    Ok(())
}

/// Follow logs until the stream ends or Ctrl-C
pub async fn logs(client: Arc<dyn RuntimeClient>, id: &str) -> Result<()> {
    let mut stream = client
        .stream_logs(id)
        .await
        .wrap_err_with(|| format!("failed to open logs for {}", id))?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            next = stream.next() => match next {
                Some(Ok(chunk)) => print!("{}", if chunk.ends_with('\n') { chunk } else { chunk + "\n" }),
                Some(Err(e)) => return Err(e).wrap_err("log stream failed"),
                None => break,
            },
        }
    }
    Ok(())
}

pub async fn exec(client: Arc<dyn RuntimeClient>, id: &str, cmd: &[String]) -> Result<()> {
    let command = cmd.join(" ");
    let output = client
        .exec(id, &command)
        .await
        .wrap_err_with(|| format!("exec in {} failed", id))?;
    print!("{}", output);
    Ok(())
}

pub async fn inspect(client: Arc<dyn RuntimeClient>, id: &str) -> Result<()> {
    let detail = client
        .inspect(id)
        .await
        .wrap_err_with(|| format!("failed to inspect {}", id))?;
    for line in detail.lines() {
        println!("{}", line);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockdash_core::model::{PortMapping, UnitState};

    #[test]
    fn test_format_table_aligns_columns() {
        let units = vec![
            UnitSnapshot {
                id: "0123456789abcdef".into(),
                name: "web".into(),
                image: "nginx:1.27".into(),
                status: "Up 2 hours".into(),
                state: UnitState::Running,
                ports: vec![PortMapping {
                    private_port: 80,
                    public_port: Some(8080),
                    protocol: "tcp".into(),
                }],
                created: None,
            },
            UnitSnapshot {
                id: "fedcba9876543210".into(),
                name: "postgres".into(),
                image: "postgres:16".into(),
                status: "Exited (0)".into(),
                state: UnitState::Exited,
                ports: Vec::new(),
                created: None,
            },
        ];
        let lines = format_table(&units);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("CONTAINER ID  NAME      IMAGE"));
        assert!(lines[1].starts_with("0123456789ab  web       nginx:1.27"));
        assert!(lines[1].ends_with("8080->80/tcp"));
        assert!(lines[2].ends_with("none"));
    }
}
