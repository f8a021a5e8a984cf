use crate::output::print_json;
use anyhow::Context;
use outbox_core::{ActionTarget, Connectivity, OutboxConfig, QueueReason, SubmitOutcome};
use std::path::Path;

pub fn run(
    root: &Path,
    url: &str,
    method: &str,
    body: &str,
    offline: bool,
    json: bool,
) -> anyhow::Result<()> {
    let payload: serde_json::Value =
        serde_json::from_str(body).context("--body must be valid JSON")?;
    let target = ActionTarget::checked(url, method).context("--method must be an HTTP method")?;
    let cfg = super::load_config(root)?;

    let outcome = super::runtime()?.block_on(submit(root, &cfg, target, payload, offline))?;

    if json {
        return print_json(&outcome);
    }

    match outcome {
        SubmitOutcome::Delivered => println!("Delivered."),
        SubmitOutcome::Queued { action, reason } => {
            let why = match reason {
                QueueReason::Offline => "offline".to_string(),
                QueueReason::SubmissionFailed { error } => format!("delivery failed: {error}"),
            };
            println!("Queued {} ({why}).", action.target);
        }
    }
    Ok(())
}

async fn submit(
    root: &Path,
    cfg: &OutboxConfig,
    target: ActionTarget,
    payload: serde_json::Value,
    offline: bool,
) -> anyhow::Result<SubmitOutcome> {
    let initial = if offline {
        Connectivity::Offline
    } else {
        super::probe(cfg)?.check().await
    };
    let coordinator = super::coordinator(root, cfg, initial)?;
    coordinator
        .submit(target, payload)
        .await
        .context("failed to submit action")
}
