use crate::output::print_json;
use anyhow::Context;
use outbox_core::QueueStore;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let cfg = super::load_config(root)?;
    let store = super::open_store(root, &cfg)?;

    let cleared = super::runtime()?.block_on(async {
        let n = store.len().await?;
        store.clear_all().await?;
        Ok::<_, outbox_core::OutboxError>(n)
    });
    let cleared = cleared.context("failed to clear queue")?;

    if json {
        return print_json(&serde_json::json!({ "cleared": cleared }));
    }
    println!("Cleared {cleared} pending action(s).");
    Ok(())
}
