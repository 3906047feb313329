use std::sync::Arc;

use anyhow::Result;
use owo_colors::OwoColorize;
use poolday_core::config::PooldayConfig;
use poolday_core::remote::Remote;
use poolday_core::sync::{SyncCoordinator, SyncRun};

use super::queue::open;
use crate::render::Render;
use crate::utils::tui::with_spinner;

pub async fn run(config: &PooldayConfig, remote: Remote) -> Result<()> {
    let queue = Arc::new(open(config)?);
    let pending = queue.len()?;

    if pending == 0 {
        println!("{}", "Nothing to sync".dimmed());
        return Ok(());
    }

    let coordinator = SyncCoordinator::new(queue, Arc::new(remote), config.remote_timeout()?);

    let run = with_spinner(
        format!("Sending {} service records", pending),
        coordinator.sync(),
    )
    .await?;

    let report = match run {
        SyncRun::Drained(report) => report,
        SyncRun::Coalesced => {
            println!("{}", "A sync is already running".yellow());
            return Ok(());
        }
    };

    println!("{}", report.render());

    if !report.is_clean() {
        anyhow::bail!(
            "{} of {} service records were not sent",
            report.failed.len(),
            report.committed.len() + report.failed.len()
        );
    }

    Ok(())
}
