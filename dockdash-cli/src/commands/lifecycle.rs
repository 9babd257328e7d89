use std::process::ExitCode;
use std::sync::Arc;

use color_eyre::eyre::{Result, eyre};

use dockdash_core::bulk::{BulkAction, BulkExecutor, BulkProgress};
use dockdash_core::model::UnitId;
use dockdash_core::runtime::RuntimeClient;

/// Turns progress callbacks into one printed line per finished unit
struct ProgressPrinter<'a> {
    ids: &'a [UnitId],
    last: BulkProgress,
}

impl<'a> ProgressPrinter<'a> {
    fn new(ids: &'a [UnitId]) -> Self {
        Self {
            ids,
            last: BulkProgress::default(),
        }
    }

    /// Line for the unit that just finished, if this update finished one
    fn line(&mut self, progress: &BulkProgress) -> Option<String> {
        let finished = progress.processed > self.last.processed;
        let ok = progress.succeeded > self.last.succeeded;
        self.last = progress.clone();
        if !finished {
            return None;
        }
        let id = self.ids.get(progress.processed - 1)?;
        let mark = if ok { "✓" } else { "✗" };
        Some(format!(
            "  [{}/{}] {} {}",
            progress.processed, progress.total, mark, id
        ))
    }
}

fn action_heading(action: BulkAction) -> &'static str {
    match action {
        BulkAction::Start => "Starting",
        BulkAction::Stop => "Stopping",
        BulkAction::Restart => "Restarting",
        BulkAction::Remove => "Deleting",
    }
}

/// `dockdash start|stop|restart|rm <ids...>`
pub async fn run(client: Arc<dyn RuntimeClient>, action: BulkAction, ids: Vec<UnitId>) -> Result<ExitCode> {
    println!("{} {} container(s)...\n", action_heading(action), ids.len());

    let mut printer = ProgressPrinter::new(&ids);
    let result = BulkExecutor::new(client)
        .run(&ids, action, |progress| {
            if let Some(line) = printer.line(progress) {
                println!("{}", line);
            }
        })
        .await
        .map_err(|e| eyre!(e))?;

    println!();
    for (id, err) in &result.failures {
        eprintln!("  {}: {}", id, err);
    }
    println!("{}", result.summary());

    Ok(if result.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printer_reports_each_finished_unit() {
        let ids: Vec<UnitId> = vec!["web".into(), "db".into()];
        let mut printer = ProgressPrinter::new(&ids);

        let start = BulkProgress {
            total: 2,
            current: Some("web".into()),
            ..Default::default()
        };
        assert_eq!(printer.line(&start), None);

        let first = BulkProgress {
            processed: 1,
            succeeded: 1,
            ..start.clone()
        };
        assert_eq!(printer.line(&first).as_deref(), Some("  [1/2] ✓ web"));

        let second = BulkProgress {
            processed: 2,
            failed: 1,
            current: None,
            ..first.clone()
        };
        assert_eq!(printer.line(&second).as_deref(), Some("  [2/2] ✗ db"));
    }
}
