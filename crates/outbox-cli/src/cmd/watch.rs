use anyhow::Context;
use outbox_core::{OutboxConfig, OutboxEvent, QueueReason};
use std::path::Path;
use tokio::sync::broadcast::error::RecvError;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let cfg = super::load_config(root)?;
    super::runtime()?.block_on(watch(root, &cfg, json))
}

async fn watch(root: &Path, cfg: &OutboxConfig, json: bool) -> anyhow::Result<()> {
    let probe = super::probe(cfg)?;
    let initial = probe.check().await;
    let coordinator = super::coordinator(root, cfg, initial)?;
    let mut events = coordinator.subscribe_events();

    let pending = coordinator.pending().await.context("failed to read queue")?;
    tracing::info!(
        health_url = %probe.url(),
        state = %initial,
        pending,
        "watching connectivity"
    );

    let probe_task = probe.spawn(coordinator.signal().clone());
    let coordinator_task = coordinator.spawn();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => print_event(&event, json)?,
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "event stream lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    probe_task.abort();
    coordinator_task.abort();
    Ok(())
}

fn print_event(event: &OutboxEvent, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }
    match event {
        OutboxEvent::ConnectivityChanged { state } => println!("connectivity: {state}"),
        OutboxEvent::Queued { target, reason, .. } => match reason {
            QueueReason::Offline => println!("queued {target} (offline)"),
            QueueReason::SubmissionFailed { error } => println!("queued {target} ({error})"),
        },
        OutboxEvent::Delivered { target } => println!("delivered {target}"),
        OutboxEvent::DrainFinished {
            attempted,
            delivered,
            failed,
        } => println!("drained {attempted}: {delivered} delivered, {failed} failed"),
    }
    Ok(())
}
