use owo_colors::OwoColorize;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

/// Small wrapper around stdout/stderr printing to provide consistent, colored
/// user-facing messages. Colors are enabled only when output is a TTY and not
/// turned off by the user.
static COLOR_ENABLED: AtomicBool = AtomicBool::new(true);
/// Set while an archive is streamed to stdout; every message then goes to stderr.
static STDOUT_RESERVED: AtomicBool = AtomicBool::new(false);

pub fn set_color_enabled(enabled: bool) {
    COLOR_ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn reserve_stdout() {
    STDOUT_RESERVED.store(true, Ordering::Relaxed);
}

pub fn stdout_reserved() -> bool {
    STDOUT_RESERVED.load(Ordering::Relaxed)
}

fn color_for(stream: atty::Stream) -> bool {
    COLOR_ENABLED.load(Ordering::Relaxed) && atty::is(stream)
}

/// Lines meant for stdout; diverted to stderr when stdout carries archive data.
fn emit_out(line: &str) {
    if stdout_reserved() {
        let _ = writeln!(io::stderr(), "{line}");
    } else {
        let _ = writeln!(io::stdout(), "{line}");
    }
}

fn out_stream() -> atty::Stream {
    if stdout_reserved() {
        atty::Stream::Stderr
    } else {
        atty::Stream::Stdout
    }
}

pub fn print_info(msg: &str) {
    if color_for(out_stream()) {
        emit_out(&format!("{} {}", "info:".cyan().bold(), msg));
    } else {
        emit_out(&format!("info: {}", msg));
    }
}

pub fn print_warn(msg: &str) {
    if color_for(atty::Stream::Stderr) {
        eprintln!("{} {}", "warn:".yellow().bold(), msg);
    } else {
        eprintln!("warn: {}", msg);
    }
}

pub fn print_error(msg: &str) {
    if color_for(atty::Stream::Stderr) {
        eprintln!("{} {}", "error:".red().bold(), msg);
    } else {
        eprintln!("error: {}", msg);
    }
}

pub fn print_success(msg: &str) {
    if color_for(out_stream()) {
        emit_out(&format!("{} {}", "ok:".green().bold(), msg));
    } else {
        emit_out(&format!("ok: {}", msg));
    }
}

/// Print a plain user-facing line (no prefix), e.g. the dry-run listing
/// "1. src --> dest" which users may script against.
pub fn print_user(msg: &str) {
    emit_out(msg);
}
