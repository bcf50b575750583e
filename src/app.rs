//! Application orchestrator.
//! Loads/merges config, initializes logging, builds and validates the
//! operation settings, runs the operation and prints the summary.

use anyhow::{Context, Result, bail};
use clap::CommandFactory;
use dialoguer::Password;
use tracing::{debug, error};

use timefops::cli::{Args, Operation};
use timefops::config::{
    ArchiveDestination, ArchiveSettings, CONFIG_ENV, Config, TimeKind, default_config_path,
    load_config,
};
use timefops::output as out;
use timefops::report::{OperationKind, OperationReport};
use timefops::utils::display_relative;
use timefops::{TimefopsError, archive_items, copy_items, move_items};

use crate::logging::init_tracing;

/// Run the CLI application.
pub fn run(args: Args) -> Result<()> {
    // Handle --print-config before logging init
    if args.print_config {
        print_config_location();
        return Ok(());
    }

    let Some(command) = args.command.as_ref() else {
        Args::command().print_help()?;
        bail!("missing command: choose one of atime, ctime or mtime");
    };

    let mut cfg = match load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            out::print_error(&format!("{e:#}"));
            return Err(e);
        }
    };
    args.apply_overrides(&mut cfg);
    out::set_color_enabled(cfg.color);

    // Hold the guard until exit so the file appender flushes.
    let _guard = init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json, cfg.color)
        .inspect_err(|e| out::print_error(&format!("Failed to initialize logging: {e}")))?;

    let (time_kind, operation) = command.parts();
    debug!(?time_kind, ?operation, "starting timefops");

    match execute(time_kind, operation, &cfg) {
        Ok((report, archive)) => {
            print_report(&report, time_kind, archive.as_ref());
            Ok(())
        }
        Err(e) => {
            if let Some(te) = e.downcast_ref::<TimefopsError>() {
                error!(code = te.code(), kind = te.kind(), "{te}");
            } else {
                error!(error = %format!("{e:#}"), "operation failed");
            }
            out::print_error(&format!("{e:#}"));
            Err(e)
        }
    }
}

/// Build, validate and run one operation. Archive settings are handed back for
/// the dry-run details.
fn execute(
    time_kind: TimeKind,
    operation: &Operation,
    cfg: &Config,
) -> Result<(OperationReport, Option<ArchiveSettings>)> {
    match operation {
        Operation::Move(args) => {
            let settings = args.to_settings(time_kind, cfg);
            settings.validate()?;
            Ok((move_items(&settings)?, None))
        }
        Operation::Copy(args) => {
            let settings = args.to_settings(time_kind, cfg);
            settings.validate()?;
            Ok((copy_items(&settings)?, None))
        }
        Operation::Archive(args) => {
            let prompted = if args.aes { Some(prompt_password()?) } else { None };
            let settings = args.to_settings(time_kind, cfg, prompted)?;
            settings.validate()?;
            if settings.destination == ArchiveDestination::Stdout && !settings.dry_run {
                if atty::is(atty::Stream::Stdout) {
                    return Err(TimefopsError::IncompatibleOptions(
                        "refusing to write an archive to a terminal; redirect stdout or use --archive NAME"
                            .into(),
                    )
                    .into());
                }
                out::reserve_stdout();
            }
            let report = archive_items(&settings)?;
            Ok((report, Some(settings)))
        }
    }
}

fn prompt_password() -> Result<String> {
    Password::new()
        .with_prompt("Archive password")
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()
        .context("read archive password")
}

fn print_config_location() {
    if let Ok(cfg_env) = std::env::var(CONFIG_ENV) {
        out::print_info(&format!("Using {CONFIG_ENV} (explicit):\n  {cfg_env}"));
        return;
    }
    match default_config_path() {
        Some(p) => {
            out::print_info(&format!("Default timefops config path:\n  {}", p.display()));
            if p.exists() {
                out::print_info("A config file exists at that location.");
            } else {
                out::print_info("No config file exists there; built-in defaults are used.");
            }
        }
        None => out::print_error("Could not determine a default config path."),
    }
}

fn print_archive_details(settings: &ArchiveSettings) {
    match &settings.destination {
        ArchiveDestination::Stdout => out::print_user("writing to stdout..."),
        ArchiveDestination::File(p) => {
            out::print_user(&format!("writing to file: '{}'", display_relative(p)))
        }
    }
    if let Some(c) = settings.compression {
        out::print_user(&format!("- using '{c}' compression."));
    }
    if let Some(enc) = &settings.encryption {
        out::print_user(&format!(
            "zip file using AES encryption ({}-bit)",
            enc.strength.bits()
        ));
        out::print_user("password-protection will be set.");
    }
}

fn print_report(report: &OperationReport, time_kind: TimeKind, archive: Option<&ArchiveSettings>) {
    if report.dry_run {
        out::print_user(&format!("\nCreating directories based on {}.\n", time_kind.describe()));
        if let Some(settings) = archive {
            print_archive_details(settings);
        }
        out::print_user("Item list:");
        for item in &report.planned {
            out::print_user(&format!(
                "{}. {} --> {}",
                item.index,
                display_relative(&item.source),
                display_relative(&item.destination)
            ));
        }
        out::print_user(&format!(
            "\n# of items to be {}: {}",
            report.kind.past_tense(),
            report.planned.len()
        ));
        return;
    }

    let what = match report.kind {
        OperationKind::Move => "contents moved",
        OperationKind::Copy => "contents copied",
        OperationKind::Archive => "archive created",
    };
    out::print_success(&format!(
        "{what} -- finished with {} warning(s).",
        report.warning_count()
    ));
}
