use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::editor::CropView;
use crate::error::{ChicoError, Result};
use crate::platform::CaptureProvider;
use crate::types::*;

/// The window macros act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetWindow {
    pub id: WindowId,
    pub title: String,
}

/// Process-wide selection state. The front-end writes it; runners only read.
#[derive(Debug, Default)]
pub struct Session {
    window: RwLock<Option<TargetWindow>>,
    region: RwLock<Option<Region>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn window(&self) -> Option<TargetWindow> {
        read(&self.window).clone()
    }

    pub fn select_window(&self, id: WindowId, title: impl Into<String>) {
        *write(&self.window) = Some(TargetWindow { id, title: title.into() });
    }

    /// Look up a window by title pattern and target it.
    pub fn select_window_by_title(&self, provider: &dyn CaptureProvider, pattern: &str) -> Result<TargetWindow> {
        let (id, title) = provider
            .find_window(pattern)
            .ok_or_else(|| ChicoError::TargetUnavailable(format!("no window matching \"{}\"", pattern)))?;
        self.select_window(id, title.clone());
        Ok(TargetWindow { id, title })
    }

    pub fn clear_window(&self) {
        *write(&self.window) = None;
    }

    pub fn region(&self) -> Option<Region> {
        *read(&self.region)
    }

    pub fn set_region(&self, region: Option<Region>) {
        *write(&self.region) = region;
    }

    fn window_bounds(&self, provider: &dyn CaptureProvider) -> Option<Region> {
        self.window().and_then(|w| provider.bounds_of(w.id))
    }

    /// Mapping between the displayed crop and absolute screen coordinates.
    /// Needs a targeted window even when a region is set.
    pub fn crop_view(&self, provider: &dyn CaptureProvider) -> Result<CropView> {
        let bounds = self
            .window_bounds(provider)
            .ok_or_else(|| ChicoError::Validation("no window selected".into()))?;
        Ok(CropView::new(bounds, self.region()))
    }

    /// Screen area sampled for color checks and previews: the captured
    /// region, else the targeted window's bounds.
    pub fn sampling_frame(&self, provider: &dyn CaptureProvider) -> Option<Region> {
        self.region().or_else(|| self.window_bounds(provider))
    }
}
