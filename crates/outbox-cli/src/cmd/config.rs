use crate::output::print_json;
use anyhow::bail;
use clap::Subcommand;
use outbox_core::config::WarnLevel;
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective config (file values over defaults)
    Show,

    /// Validate the config for common mistakes
    Validate,
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::Validate => validate(root, json),
    }
}

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let cfg = super::load_config(root)?;
    if json {
        return print_json(&cfg);
    }
    println!("api_base_url:        {}", cfg.api_base_url);
    println!("health_path:         {}", cfg.health_path);
    println!("probe_interval_ms:   {}", cfg.probe_interval_ms);
    println!("submit_timeout_secs: {}", cfg.submit_timeout_secs);
    println!("drain_on_start:      {}", cfg.drain_on_start);
    println!("queue_file:          {}", cfg.queue_path(root).display());
    Ok(())
}

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let cfg = super::load_config(root)?;
    let warnings = cfg.validate();
    let errors = warnings
        .iter()
        .filter(|w| w.level == WarnLevel::Error)
        .count();

    if json {
        print_json(&warnings)?;
    } else if warnings.is_empty() {
        println!("Config OK.");
    } else {
        for w in &warnings {
            let tag = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("{tag}: {}", w.message);
        }
    }

    if errors > 0 {
        bail!("config has {errors} error(s)");
    }
    Ok(())
}
