use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};

use crate::book::MacroBook;
use crate::logger;
use crate::platform::CaptureProvider;
use crate::settings::Settings;
use crate::types::*;

fn lock(book: &Mutex<MacroBook>) -> MutexGuard<'_, MacroBook> {
    book.lock().unwrap_or_else(|e| e.into_inner())
}

/// Start every macro named in `settings.autostart`.
pub fn restore_autostart(book: &mut MacroBook, settings: &Settings) {
    for (i, row) in book.list().into_iter().enumerate() {
        if !settings.autostart.contains(&row.name) {
            continue;
        }
        if let Some(id) = book.id_at(i) {
            if let Err(e) = book.set_running(id, true) {
                logger::error(&format!("failed to restart {}: {}", row.name, e));
            }
        }
    }
}

/// Where snapshots of the sampling frame are written.
pub fn snapshot_path(profile: &Path) -> PathBuf {
    profile
        .parent()
        .map(|d| d.join("preview.png"))
        .unwrap_or_else(|| PathBuf::from("preview.png"))
}

/// Capture the session's sampling frame into a PNG at `path`.
pub fn snapshot(book: &MacroBook, path: &Path) -> Result<()> {
    let provider = book.provider().as_ref();
    let frame = book
        .session()
        .sampling_frame(provider)
        .ok_or_else(|| anyhow!("no window or region selected"))?;
    let image = provider.capture_region(frame)?;
    image.save(path)?;
    logger::info(&format!("snapshot {} written to {}", frame, path.display()));
    Ok(())
}

/// Turn a window-relative rectangle into the session's captured region.
pub fn select_area(book: &MacroBook, rect: Option<Region>) -> crate::Result<Option<Region>> {
    let region = match rect {
        Some(rect) => Some(book.crop_view()?.region_from_window_rect(rect)),
        None => None,
    };
    book.session().set_region(region);
    Ok(region)
}

fn remember_running(book: &MacroBook, settings: &mut Settings, settings_path: &Path) {
    settings.autostart = book.running_names();
    settings.save(settings_path);
}

/// Apply one command. Returns false on Quit.
pub fn apply(
    cmd: Command,
    book: &Mutex<MacroBook>,
    settings: &mut Settings,
    settings_path: &Path,
) -> bool {
    let mut book = lock(book);
    match cmd {
        Command::Quit => {
            logger::info("shutting down");
            remember_running(&book, settings, settings_path);
            book.stop_all();
            return false;
        }
        Command::Toggle(idx) => {
            let Some(id) = book.id_at(idx) else { return true };
            match book.toggle(id) {
                Ok(state) => logger::info(&format!("macro {} {:?}", id, state)),
                Err(e) => logger::error(&format!("toggle failed: {}", e)),
            }
            remember_running(&book, settings, settings_path);
        }
        Command::Delete(idx) => {
            let Some(id) = book.id_at(idx) else { return true };
            if let Err(e) = book.delete(id) {
                logger::error(&format!("delete failed: {}", e));
            }
            remember_running(&book, settings, settings_path);
        }
        Command::StopAll => {
            book.stop_all();
            logger::info("all macros stopped");
            remember_running(&book, settings, settings_path);
        }
        Command::Save => {
            if let Err(e) = book.save_profile(&settings.profile) {
                logger::error(&e.to_string());
            }
        }
        Command::Reload => {
            if let Err(e) = book.load_profile(&settings.profile) {
                logger::error(&e.to_string());
            }
            remember_running(&book, settings, settings_path);
        }
        Command::SelectWindow { id, title } => {
            if book.provider().bounds_of(id).is_none() {
                logger::warn(&format!("window \"{}\" is gone", title));
                return true;
            }
            book.session().select_window(id, title.clone());
            logger::info(&format!("targeting \"{}\"", title));
            settings.window_title = Some(title);
            settings.save(settings_path);
        }
        Command::SelectArea(rect) => match select_area(&book, rect) {
            Ok(Some(region)) => logger::info(&format!("captured region set to {}", region)),
            Ok(None) => logger::info("captured region cleared, using the whole window"),
            Err(e) => logger::warn(&e.to_string()),
        },
        Command::Snapshot => {
            if let Err(e) = snapshot(&book, &snapshot_path(&settings.profile)) {
                logger::error(&format!("snapshot failed: {}", e));
            }
        }
    }
    true
}

/// Control loop. Runs on a background thread until Quit or until the
/// front-end hangs up.
pub fn orchestrate(
    book: Arc<Mutex<MacroBook>>,
    mut settings: Settings,
    settings_path: PathBuf,
    cmd_rx: mpsc::Receiver<Command>,
) {
    while let Ok(cmd) = cmd_rx.recv() {
        if !apply(cmd, &book, &mut settings, &settings_path) {
            return;
        }
    }
    lock(&book).stop_all();
}
