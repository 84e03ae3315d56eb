use std::path::Path;
use std::sync::Arc;

use crate::editor::{CropView, MacroDraft};
use crate::error::{ChicoError, Result};
use crate::logger;
use crate::platform::CaptureProvider;
use crate::runner::{Runner, RunnerContext};
use crate::session::Session;
use crate::store;
use crate::types::*;

struct MacroEntry {
    id: MacroId,
    spec: MacroSpec,
    runner: Runner,
}

impl MacroEntry {
    fn row(&self) -> MacroRow {
        MacroRow {
            id: self.id,
            name: self.spec.name.clone(),
            condition: self.spec.condition.to_string(),
            action: self.spec.action.to_string(),
            state: self.runner.state(),
        }
    }
}

/// Ordered collection of macros and their runners. This is what the
/// front-end talks to.
pub struct MacroBook {
    ctx: RunnerContext,
    entries: Vec<MacroEntry>,
    next_id: u64,
}

impl MacroBook {
    pub fn new(ctx: RunnerContext) -> Self {
        Self { ctx, entries: Vec::new(), next_id: 1 }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.ctx.session
    }

    pub fn provider(&self) -> &Arc<dyn CaptureProvider> {
        &self.ctx.provider
    }

    pub fn crop_view(&self) -> Result<CropView> {
        self.ctx.session.crop_view(self.ctx.provider.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry_mut(&mut self, id: MacroId) -> Result<&mut MacroEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(ChicoError::UnknownMacro(id))
    }

    pub fn get(&self, id: MacroId) -> Option<&MacroSpec> {
        self.entries.iter().find(|e| e.id == id).map(|e| &e.spec)
    }

    pub fn id_at(&self, index: usize) -> Option<MacroId> {
        self.entries.get(index).map(|e| e.id)
    }

    pub fn list(&self) -> Vec<MacroRow> {
        self.entries.iter().map(MacroEntry::row).collect()
    }

    /// Add a macro whose points are already absolute.
    pub fn insert(&mut self, spec: MacroSpec) -> MacroId {
        let id = MacroId(self.next_id);
        self.next_id += 1;
        let runner = Runner::new(self.ctx.clone());
        self.entries.push(MacroEntry { id, spec, runner });
        id
    }

    /// Replace every field of `id`. A running macro is restarted with the new fields.
    pub fn replace(&mut self, id: MacroId, spec: MacroSpec) -> Result<()> {
        let entry = self.entry_mut(id)?;
        let was_running = entry.runner.stop();
        entry.spec = spec;
        if was_running {
            entry.runner.start(&entry.spec);
        }
        Ok(())
    }

    /// Save editor form state: validates, converts crop-relative points to
    /// absolute ones and creates (`id == None`) or updates the macro.
    pub fn create_or_update(&mut self, id: Option<MacroId>, draft: &MacroDraft) -> Result<MacroId> {
        let spec = draft.build(&self.crop_view()?)?;
        match id {
            Some(id) => {
                self.replace(id, spec)?;
                logger::info(&format!("macro {} edited", id));
                Ok(id)
            }
            None => {
                let name = spec.name.clone();
                let id = self.insert(spec);
                logger::info(&format!("macro \"{}\" created", name));
                Ok(id)
            }
        }
    }

    /// Form state for editing `id` under the current crop.
    pub fn draft_for(&self, id: MacroId) -> Result<MacroDraft> {
        let spec = self.get(id).ok_or(ChicoError::UnknownMacro(id))?;
        Ok(MacroDraft::from_spec(spec, &self.crop_view()?))
    }

    /// Remove `id`, stopping it first.
    pub fn delete(&mut self, id: MacroId) -> Result<MacroSpec> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(ChicoError::UnknownMacro(id))?;
        let mut entry = self.entries.remove(idx);
        entry.runner.stop();
        if !self.entries.iter().any(|e| e.spec.name == entry.spec.name) {
            logger::unregister_prefix(&entry.spec.name);
        }
        logger::info(&format!("macro \"{}\" deleted", entry.spec.name));
        Ok(entry.spec)
    }

    /// Start or stop `id`. Returns whether the state changed.
    pub fn set_running(&mut self, id: MacroId, running: bool) -> Result<bool> {
        let entry = self.entry_mut(id)?;
        Ok(if running {
            entry.runner.start(&entry.spec)
        } else {
            entry.runner.stop()
        })
    }

    pub fn toggle(&mut self, id: MacroId) -> Result<MacroState> {
        let running = self.entry_mut(id)?.runner.state() == MacroState::Running;
        self.set_running(id, !running)?;
        Ok(if running { MacroState::Stopped } else { MacroState::Running })
    }

    pub fn stop_all(&mut self) {
        for entry in &mut self.entries {
            entry.runner.stop();
        }
    }

    pub fn running_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.runner.state() == MacroState::Running)
            .map(|e| e.spec.name.clone())
            .collect()
    }

    pub fn save_profile(&self, path: &Path) -> Result<()> {
        store::save(self.entries.iter().map(|e| &e.spec), self.ctx.session.region(), path)
    }

    /// Replace the whole book (and the session region) with the profile at
    /// `path`. Returns the number of macros loaded.
    pub fn load_profile(&mut self, path: &Path) -> Result<usize> {
        let (macros, region) = store::load(path)?;
        self.stop_all();
        for entry in self.entries.drain(..) {
            logger::unregister_prefix(&entry.spec.name);
        }
        self.ctx.session.set_region(region);
        let n = macros.len();
        for spec in macros {
            self.insert(spec);
        }
        logger::info(&format!("loaded {} macro(s) from {}", n, path.display()));
        Ok(n)
    }
}
