//! Application orchestrator.
//! Loads and merges config, initializes logging, installs the interrupt handler,
//! validates directories, opens the engine and dispatches the subcommand.

use anyhow::Result;
use clap::CommandFactory;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

use sift::cli::{Args, Command};
use sift::config::CONFIG_ENV;
use sift::output as out;
use sift::{
    CancelToken, ClassifyOutcome, Config, Engine, Observer, SiftError, Status,
    default_config_path, ensure_default_config_exists, load_config_from_default_xml,
    load_config_from_xml_env, validate_and_normalize,
};

use crate::logging::init_tracing;

/// Surfaces per-file batch failures on the console.
struct ConsoleObserver {
    json: bool,
}

impl Observer for ConsoleObserver {
    fn on_error(&self, message: &str) {
        if !self.json {
            out::print_warn(message);
        }
    }

    fn on_refresh(&self, dir: &Path) {
        debug!(dir = %dir.display(), "directory counts changed");
    }
}

fn print_config_location() {
    if let Some(explicit) = std::env::var_os(CONFIG_ENV) {
        out::print_info(&format!(
            "Using {CONFIG_ENV} (explicit):\n  {}",
            PathBuf::from(explicit).display()
        ));
        return;
    }
    match default_config_path() {
        Some(p) => {
            out::print_info(&format!("Default sift config path:\n  {}", p.display()));
            if p.exists() {
                out::print_info("A config file already exists at that location.");
            } else {
                out::print_info(
                    "No config file exists there yet. Run without --print-config to create a template.",
                );
            }
        }
        None => out::print_error("Could not determine a default config path"),
    }
}

fn load_config() -> Result<Config> {
    if let Some(cfg) = load_config_from_xml_env()? {
        return Ok(cfg);
    }
    Ok(load_config_from_default_xml()?.unwrap_or_default())
}

/// Run the CLI application.
pub fn run(args: Args) -> Result<()> {
    if args.print_config {
        print_config_location();
        return Ok(());
    }

    let Some(command) = args.command.clone() else {
        Args::command().print_help()?;
        return Ok(());
    };

    if let Some(path) = ensure_default_config_exists() {
        out::print_success(&format!(
            "A template sift config was written to: {}",
            path.display()
        ));
        out::print_info(
            "Edit public_root, private_root, safe_delete_root and metadata_root, then re-run. \
             To use a different file set SIFT_CONFIG.",
        );
        return Ok(());
    }

    let mut cfg = load_config()?;
    args.apply_overrides(&mut cfg);

    let guard = init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json).inspect_err(
        |e| out::print_error(&format!("Failed to initialize logging: {e:#}")),
    )?;
    let guard_slot = Arc::new(Mutex::new(guard));

    let token = CancelToken::new();
    {
        let token = token.clone();
        let guard_slot = Arc::clone(&guard_slot);
        let installed = ctrlc::set_handler(move || {
            if token.is_cancelled() {
                // Second interrupt: stop waiting for the current file.
                if let Ok(mut g) = guard_slot.lock() {
                    let _ = g.take();
                }
                std::process::exit(130);
            }
            token.cancel();
            out::print_warn("Interrupted; finishing the current file...");
        });
        if let Err(e) = installed {
            warn!(error = %e, "interrupt handler not installed");
        }
    }

    debug!(?args, "starting sift");
    let result = execute(&args, command, cfg, token);

    if let Err(e) = &result {
        match e.downcast_ref::<SiftError>() {
            Some(se) => error!(code = se.code(), error = %se, "command failed"),
            None => error!(error = %format!("{e:#}"), "command failed"),
        }
    }

    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }
    result
}

fn execute(args: &Args, command: Command, mut cfg: Config, token: CancelToken) -> Result<()> {
    validate_and_normalize(&mut cfg)?;
    let engine = Engine::open(&cfg)?
        .with_cancel_token(token)
        .with_observer(Arc::new(ConsoleObserver { json: args.json }));
    let json = args.json;

    match command {
        Command::Classify { path, status } => classify(&engine, &path, status, json),
        Command::Status { path } => {
            if path.is_dir() {
                let counts = engine.directory_status(&path)?;
                if json {
                    out::print_json(&counts)?;
                } else {
                    out::print_user(&out::describe_directory(&counts));
                }
            } else {
                let state = engine.file_status(&path);
                if json {
                    out::print_json(&state)?;
                } else {
                    out::print_user(&out::describe_file_state(state));
                }
            }
            Ok(())
        }
        Command::Search { query, root } => {
            let roots: Vec<Status> = match root {
                Some(s) => vec![s],
                None => Status::ALL.to_vec(),
            };
            let mut hits = Vec::new();
            for status in roots {
                hits.extend(engine.search(&query, engine.roots().root(status)));
            }
            if json {
                out::print_json(&hits)?;
            } else {
                for hit in &hits {
                    out::print_user(&hit.display().to_string());
                }
            }
            Ok(())
        }
        Command::CleanupBackups { days } => {
            let days = days.unwrap_or(cfg.backup_retention_days);
            let report = engine.cleanup_backups(days)?;
            if json {
                out::print_json(&report)?;
            } else {
                out::print_success(&format!(
                    "removed {} backup(s) older than {days} day(s) and {} empty dir(s)",
                    report.removed_files, report.removed_dirs
                ));
                if report.failures > 0 {
                    out::print_warn(&format!("{} backup(s) could not be removed", report.failures));
                }
            }
            Ok(())
        }
        Command::Validate => {
            let pruned = engine.validate_paths()?;
            if json {
                out::print_json(&pruned)?;
            } else if pruned.is_empty() {
                out::print_success("metadata matches the filesystem");
            } else {
                for p in &pruned {
                    out::print_user(&p.display().to_string());
                }
                out::print_success(&format!("pruned {} stale entr(ies)", pruned.len()));
            }
            Ok(())
        }
        Command::Stats => {
            let stats = engine.sorting_statistics();
            if json {
                out::print_json(&stats)?;
            } else {
                out::print_user(&format!(
                    "total {}: public {}, private {}, reviewed {}, unreviewed {}",
                    stats.total, stats.public, stats.private, stats.reviewed, stats.unreviewed
                ));
                for (year, (public, private)) in &stats.by_year {
                    out::print_user(&format!("  {year}: public {public}, private {private}"));
                }
            }
            Ok(())
        }
        Command::Recent { days } => {
            let changes = engine.recent_changes(days);
            if json {
                out::print_json(&changes)?;
            } else {
                for c in &changes {
                    out::print_user(&format!(
                        "{}  {:<7}  {}",
                        c.last_reviewed.format("%Y-%m-%d %H:%M"),
                        c.status.as_str(),
                        c.key
                    ));
                }
            }
            Ok(())
        }
        Command::Reindex => {
            let entries = engine.rebuild_index()?;
            if json {
                out::print_json(&serde_json::json!({ "entries": entries }))?;
            } else {
                out::print_success(&format!("index rebuilt with {entries} entr(ies)"));
            }
            Ok(())
        }
    }
}

fn classify(engine: &Engine, path: &Path, status: Status, json: bool) -> Result<()> {
    let outcome = if path.is_dir() {
        let mut progress = |pct: u8| {
            if !json {
                out::print_progress(pct);
            }
        };
        ClassifyOutcome::Batch(engine.batch_classify(path, status.is_public(), &mut progress)?)
    } else {
        engine.classify(path, status.is_public())?
    };

    if json {
        out::print_json(&outcome)?;
    }
    match outcome {
        ClassifyOutcome::File(file) => {
            info!(path = %file.path.display(), status = %status, moved = file.moved, "classified");
            if !json {
                if file.moved {
                    out::print_success(&format!("{status}: moved to {}", file.path.display()));
                } else {
                    out::print_success(&format!("{status}: {}", file.path.display()));
                }
            }
            Ok(())
        }
        ClassifyOutcome::Batch(report) => {
            if !json {
                out::print_success(&format!(
                    "{} of {} file(s) classified {status} ({} moved, {} already in place)",
                    report.processed, report.total, report.moved, report.unchanged
                ));
            }
            if report.cancelled {
                return Err(SiftError::Interrupted.into());
            }
            if !report.failures.is_empty() {
                anyhow::bail!("{} file(s) could not be classified", report.failures.len());
            }
            Ok(())
        }
    }
}
