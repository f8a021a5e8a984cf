use crate::output::print_json;
use anyhow::Context;
use outbox_core::{Connectivity, DrainOutcome, DrainReport, OutboxConfig};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum DrainOutput {
    /// Health check failed; nothing was sent.
    Skipped { health_url: String, pending: usize },
    Drained(DrainReport),
}

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let cfg = super::load_config(root)?;

    let output = super::runtime()?.block_on(drain_once(root, &cfg))?;

    if json {
        return print_json(&output);
    }

    match output {
        DrainOutput::Skipped {
            health_url,
            pending,
        } => {
            println!("API unreachable at {health_url}; {pending} action(s) left queued.");
        }
        DrainOutput::Drained(report) => {
            println!(
                "Replayed {} action(s): {} delivered, {} failed.",
                report.attempted,
                report.delivered,
                report.failures.len()
            );
            for f in &report.failures {
                println!("  dropped {}: {}", f.action.target, f.error);
            }
        }
    }
    Ok(())
}

async fn drain_once(root: &Path, cfg: &OutboxConfig) -> anyhow::Result<DrainOutput> {
    let state = super::probe(cfg)?.check().await;
    let coordinator = super::coordinator(root, cfg, state)?;

    if state == Connectivity::Offline {
        let pending = coordinator.pending().await.context("failed to read queue")?;
        return Ok(DrainOutput::Skipped {
            health_url: cfg.health_url(),
            pending,
        });
    }

    let report = match coordinator.drain().await.context("drain failed")? {
        DrainOutcome::Completed(report) => report,
        DrainOutcome::AlreadyInProgress => DrainReport::default(),
    };
    Ok(DrainOutput::Drained(report))
}
