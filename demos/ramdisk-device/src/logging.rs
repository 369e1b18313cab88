//! A small ANSI-colored console logger: one color per level, same
//! `set_logger`/`set_max_level` setup as any embedded-adjacent `log`
//! consumer. The one thing it tags each line with is the IEC device number
//! the current operation concerns, since this demo has no process id to
//! print instead.

use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};

use log::{Level, LevelFilter, Log, Metadata, Record};

static CURRENT_DEVNR: AtomicI32 = AtomicI32::new(-1);

/// Tag subsequent log lines with `devnr` until the next call (or `None` to
/// go back to untagged). Call this around a device operation's body.
pub fn set_current_devnr(devnr: Option<u8>) {
    CURRENT_DEVNR.store(devnr.map(i32::from).unwrap_or(-1), Ordering::Relaxed);
}

struct ConsoleLogger;

fn print_in_color(args: fmt::Arguments, color_code: u8) {
    println!("\u{1B}[{}m{}\u{1B}[0m", color_code, args);
}

impl Log for ConsoleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let color = match record.level() {
            Level::Error => 31, // red
            Level::Warn => 93,  // bright yellow
            Level::Info => 34,  // blue
            Level::Debug => 32, // green
            Level::Trace => 90, // bright black
        };
        let devnr = CURRENT_DEVNR.load(Ordering::Relaxed);
        print_in_color(
            format_args!("[{:>5}][dev {}] {}", record.level(), devnr, record.args()),
            color,
        );
    }

    fn flush(&self) {}
}

pub fn init() {
    static LOGGER: ConsoleLogger = ConsoleLogger;
    log::set_logger(&LOGGER).expect("logger already installed");
    log::set_max_level(match std::env::var("LOG").as_deref() {
        Ok("ERROR") => LevelFilter::Error,
        Ok("WARN") => LevelFilter::Warn,
        Ok("INFO") => LevelFilter::Info,
        Ok("DEBUG") => LevelFilter::Debug,
        Ok("TRACE") => LevelFilter::Trace,
        _ => LevelFilter::Info,
    });
}
