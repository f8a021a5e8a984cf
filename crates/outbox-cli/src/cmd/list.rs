use crate::output::{print_json, print_table, truncate};
use anyhow::Context;
use chrono::Local;
use outbox_core::{QueueStore, QueuedAction};
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let cfg = super::load_config(root)?;
    let store = super::open_store(root, &cfg)?;
    let actions = super::runtime()?
        .block_on(store.list_all())
        .context("failed to read queue")?;

    if json {
        return print_json(&actions);
    }

    if actions.is_empty() {
        println!("No pending actions.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = actions.iter().map(action_row).collect();
    print_table(&["ENQUEUED", "ID", "TARGET", "PAYLOAD"], &rows);
    println!("\n{} pending", actions.len());
    Ok(())
}

fn action_row(a: &QueuedAction) -> Vec<String> {
    let id = a.id.to_string();
    vec![
        a.enqueued_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S%.3f")
            .to_string(),
        id[..8].to_string(),
        a.target.to_string(),
        truncate(&a.payload.to_string(), 48),
    ]
}
