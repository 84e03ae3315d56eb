use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{mpsc, Mutex, OnceLock};
use chrono::Local;

static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

struct Logger {
    file: File,
    tui_tx: Option<mpsc::Sender<String>>,
    prefixes: HashMap<String, u8>, // prefix -> color index
}

// Color indices for TUI rendering (mapped in ui.rs)
pub const COLOR_GRAY: u8 = 1;
pub const COLOR_BLUE: u8 = 2;
pub const COLOR_GREEN: u8 = 3;

/// Initialize the global logger. Truncates `app.log` in `log_dir`.
/// Calls made before this are dropped.
pub fn init(log_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(log_dir)?;
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_dir.join("app.log"))?;

    LOGGER
        .set(Mutex::new(Logger { file, tui_tx: None, prefixes: HashMap::new() }))
        .ok();
    Ok(())
}

fn with_logger(f: impl FnOnce(&mut Logger)) {
    if let Some(logger) = LOGGER.get() {
        let mut l = logger.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut l);
    }
}

/// Wire the TUI log channel.
pub fn set_tui_sender(tx: mpsc::Sender<String>) {
    with_logger(|l| l.tui_tx = Some(tx));
}

/// Register a prefix with a color. Prefixed log calls pick the color up from here.
pub fn register_prefix(prefix: &str, color: u8) {
    with_logger(|l| {
        l.prefixes.insert(prefix.to_string(), color);
    });
}

/// Drop a prefix once nothing logs under it anymore.
pub fn unregister_prefix(prefix: &str) {
    with_logger(|l| {
        l.prefixes.remove(prefix);
    });
}

/// Color registered for `prefix`, if any.
pub fn prefix_color(prefix: &str) -> Option<u8> {
    let logger = LOGGER.get()?;
    let l = logger.lock().unwrap_or_else(|e| e.into_inner());
    l.prefixes.get(prefix).copied()
}

/// TUI lines use \x1f as field separator:
/// level\x1fprefix\x1fcolor\x1ftimestamp\x1fmessage
fn write_log(level: &str, prefix: &str, msg: &str) {
    let ts = Local::now().format("%H:%M:%S").to_string();

    let file_line = if prefix.is_empty() {
        format!("[{}] [{}] {}", ts, level, msg)
    } else {
        format!("[{}] [{}] [{}] {}", ts, level, prefix, msg)
    };

    with_logger(|l| {
        let color = l.prefixes.get(prefix).copied().unwrap_or(0);
        writeln!(l.file, "{}", file_line).ok();
        if let Some(tx) = &l.tui_tx {
            tx.send(format!("{}\x1f{}\x1f{}\x1f{}\x1f{}", level, prefix, color, ts, msg)).ok();
        }
    });
}

pub fn info(msg: &str) {
    write_log("INFO", "", msg);
}

pub fn warn(msg: &str) {
    write_log("WARN", "", msg);
}

pub fn error(msg: &str) {
    write_log("ERROR", "", msg);
}

pub fn info_p(prefix: &str, msg: &str) {
    write_log("INFO", prefix, msg);
}

pub fn warn_p(prefix: &str, msg: &str) {
    write_log("WARN", prefix, msg);
}

pub fn error_p(prefix: &str, msg: &str) {
    write_log("ERROR", prefix, msg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_come_and_go() {
        let dir = tempfile::tempdir().unwrap();
        init(dir.path()).unwrap();
        register_prefix("fleeting", COLOR_BLUE);
        assert_eq!(prefix_color("fleeting"), Some(COLOR_BLUE));
        unregister_prefix("fleeting");
        assert_eq!(prefix_color("fleeting"), None);
    }
}
