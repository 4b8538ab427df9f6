// src/lib.rs

pub mod archive;
pub mod cancel;
pub mod classify;
pub mod cli;
pub mod config;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod stage;
pub mod types;

use tracing::{debug, info};

use crate::archive::plan::{default_destination, plan_extract, plan_list, plan_test, render};
use crate::archive::{
    backend_for, backend_for_archive, create_archive, extract_archive, list_archive, plan_create,
    test_archive, CreateRequest, OpContext,
};
use crate::cancel::{install_signal_handlers, CancellationController};
use crate::cli::{CliArgs, Command, CreateArgs};
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::config::load_raw_or_default;
use crate::errors::Result;
use crate::fs::{total_size, FileSystem, RealFileSystem};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - signal handling → cancellation controller
/// - the archive operation selected on the command line
pub async fn run(args: CliArgs) -> Result<()> {
    let mut raw = load_raw_or_default(args.config.as_deref())?;
    apply_overrides(&mut raw, &args.command);
    let cfg = ConfigFile::try_from(raw)?;
    let fs = RealFileSystem;

    if args.dry_run {
        print_dry_run(&cfg, &fs, &args.command)?;
        return Ok(());
    }

    let controller = CancellationController::new(cfg.cancel.options());
    let _signals = install_signal_handlers(controller.handle())?;

    let ctx = OpContext {
        config: &cfg,
        fs: &fs,
        controller: &controller,
    };

    match &args.command {
        Command::Create(create) => {
            let summary = create_archive(ctx, &create.source, create.output.as_deref()).await?;
            println!("{summary}");
            if summary.source_removed {
                println!("removed {}", summary.source.display());
            }
        }
        Command::Extract { archive, directory } => {
            extract_archive(ctx, archive, directory).await?;
            info!(dest = %directory.display(), "extraction complete");
        }
        Command::List { archive } => {
            list_archive(ctx, archive).await?;
        }
        Command::Test { archive } => {
            test_archive(ctx, archive).await?;
            println!("{}: OK", archive.display());
        }
    }

    Ok(())
}

/// Layer `create` flags over the file configuration, before validation.
pub fn apply_overrides(raw: &mut RawConfigFile, command: &Command) {
    let Command::Create(CreateArgs {
        engine,
        level,
        threads,
        no_progress,
        no_two_phase,
        remove_source,
        ..
    }) = command
    else {
        return;
    };

    if let Some(engine) = engine {
        raw.archive.engine = *engine;
    }
    if let Some(level) = level {
        raw.archive.level = *level;
    }
    if let Some(threads) = threads {
        raw.archive.threads = *threads;
    }
    if *no_progress {
        raw.progress.enabled = false;
    }
    if *no_two_phase {
        raw.progress.two_phase = false;
    }
    if *remove_source {
        raw.output.remove_source = true;
    }
}

/// Print the stages a command would run. Nothing is created or spawned.
fn print_dry_run(cfg: &ConfigFile, fs: &dyn FileSystem, command: &Command) -> Result<()> {
    println!("packpipe dry-run");
    println!("  archive.engine = {}", cfg.archive.engine.engine());
    println!("  archive.level = {}", cfg.archive.level);
    println!(
        "  progress = {} (two_phase = {})",
        cfg.progress.enabled, cfg.progress.two_phase
    );
    println!();

    match command {
        Command::Create(create) => {
            let backend = backend_for(&cfg.archive);
            let dest = match &create.output {
                Some(d) => d.clone(),
                None => default_destination(&create.source, backend.as_ref())?,
            };
            let total_bytes = total_size(fs, &create.source)?;
            let request = CreateRequest {
                source: &create.source,
                dest: &dest,
                total_bytes,
                archive: &cfg.archive,
                progress: &cfg.progress,
            };
            let scratch = std::env::temp_dir().join("packpipe-XXXXXX");
            let plan = plan_create(&request, backend.as_ref(), Some(&scratch))?;
            println!("{plan}");
        }
        Command::Extract { archive, directory } => {
            let backend = backend_for_archive(archive, &cfg.archive);
            let spec = plan_extract(
                archive,
                directory,
                backend.as_ref(),
                &cfg.archive,
                &cfg.progress,
            )?;
            println!("{}", render(spec.stages()));
        }
        Command::List { archive } => {
            let backend = backend_for_archive(archive, &cfg.archive);
            println!("{}", render(plan_list(archive, backend.as_ref())?.stages()));
        }
        Command::Test { archive } => {
            let backend = backend_for_archive(archive, &cfg.archive);
            println!("{}", render(plan_test(archive, backend.as_ref())?.stages()));
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
