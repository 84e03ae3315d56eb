use std::sync::{Arc, Mutex, MutexGuard, mpsc};

use chico_core::book::MacroBook;
use chico_core::platform::CaptureProvider;
use chico_core::types::{Command, MacroRow, Region};

use crate::area::AreaPrompt;
use crate::confirm::ConfirmDialog;
use crate::picker::WindowPicker;

pub struct App {
    pub book: Arc<Mutex<MacroBook>>,
    pub selected: usize,
    pub log_visible: bool,
    pub log_messages: Vec<String>,
    pub log_scroll: usize, // scroll offset from bottom (0 = latest)
    pub log_rx: mpsc::Receiver<String>,
    pub cmd_tx: mpsc::Sender<Command>,
    pub confirm: Option<ConfirmDialog>,
    pub picker: Option<WindowPicker>,
    pub area: Option<AreaPrompt>,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        book: Arc<Mutex<MacroBook>>,
        log_rx: mpsc::Receiver<String>,
        cmd_tx: mpsc::Sender<Command>,
    ) -> Self {
        Self {
            book,
            selected: 0,
            log_visible: true,
            log_messages: Vec::new(),
            log_scroll: 0,
            log_rx,
            cmd_tx,
            confirm: None,
            picker: None,
            area: None,
            should_quit: false,
        }
    }

    pub fn book(&self) -> MutexGuard<'_, MacroBook> {
        self.book.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn rows(&self) -> Vec<MacroRow> {
        self.book().list()
    }

    pub fn drain_logs(&mut self) {
        while let Ok(msg) = self.log_rx.try_recv() {
            self.log_messages.push(msg);
        }
    }

    pub fn scroll_log_up(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_add(n);
    }

    pub fn scroll_log_down(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(n);
    }

    pub fn move_up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    pub fn move_down(&mut self) {
        let len = self.book().len();
        if self.selected + 1 < len {
            self.selected += 1;
        }
    }

    /// Keep the cursor on a row after deletes and reloads.
    pub fn clamp_selection(&mut self) {
        let len = self.book().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    fn send(&self, cmd: Command) {
        self.cmd_tx.send(cmd).ok();
    }

    pub fn toggle_selected(&mut self) {
        self.send(Command::Toggle(self.selected));
    }

    pub fn request_delete(&mut self) {
        let name = self.rows().get(self.selected).map(|r| r.name.clone());
        if let Some(name) = name {
            self.confirm = Some(ConfirmDialog::new(format!("Delete \"{}\"?", name), self.selected));
        }
    }

    /// Close the dialog, deleting the macro if Yes was chosen.
    pub fn answer_confirm(&mut self, yes: bool) {
        if let Some(dialog) = self.confirm.take() {
            if yes {
                self.send(Command::Delete(dialog.target));
            }
        }
    }

    pub fn open_picker(&mut self) {
        let windows = self.book().provider().list_windows();
        self.picker = Some(WindowPicker::new(windows));
    }

    pub fn pick_window(&mut self) {
        if let Some(picker) = self.picker.take() {
            if let Some((id, title)) = picker.chosen() {
                self.send(Command::SelectWindow { id: *id, title: title.clone() });
            }
        }
    }

    /// Open the region prompt, prefilled with the current region relative
    /// to the targeted window.
    pub fn open_area(&mut self) {
        let current = {
            let book = self.book();
            let bounds = book
                .session()
                .window()
                .and_then(|w| book.provider().bounds_of(w.id));
            match (book.session().region(), bounds) {
                (Some(r), Some(b)) => Some(Region::new(r.x - b.x, r.y - b.y, r.w, r.h)),
                _ => None,
            }
        };
        self.area = Some(AreaPrompt::new(current));
    }

    /// Send the typed region. Bad input keeps the prompt open with an error.
    pub fn submit_area(&mut self) {
        let Some(prompt) = self.area.as_mut() else { return };
        if let Ok(rect) = prompt.answer() {
            self.area = None;
            self.send(Command::SelectArea(rect));
        }
    }

    pub fn save(&mut self) {
        self.send(Command::Save);
    }

    pub fn reload(&mut self) {
        self.send(Command::Reload);
    }

    pub fn snapshot(&mut self) {
        self.send(Command::Snapshot);
    }

    pub fn stop_all(&mut self) {
        self.send(Command::StopAll);
    }

    pub fn toggle_log(&mut self) {
        self.log_visible = !self.log_visible;
    }

    pub fn quit(&mut self) {
        self.send(Command::Quit);
        self.should_quit = true;
    }
}
