//! One-shot "you can swipe" hint and the flag that remembers it was shown.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{info, warn};

/// Durable "hint already shown" flag.
pub trait HintStore {
    fn was_shown(&self) -> bool;
    /// Must be safe to call more than once.
    fn mark_shown(&mut self) -> Result<()>;
}

pub struct FileHintStore {
    path: PathBuf,
}

impl FileHintStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn reset(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("Failed to remove {}", self.path.display()))
            }
        }
    }
}

impl HintStore for FileHintStore {
    fn was_shown(&self) -> bool {
        fs::read_to_string(&self.path).is_ok_and(|flag| flag.trim() == "true")
    }

    fn mark_shown(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&self.path, "true")
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryHintStore {
    shown: bool,
    writes: usize,
}

#[cfg(test)]
impl MemoryHintStore {
    pub fn writes(&self) -> usize {
        self.writes
    }
}

#[cfg(test)]
impl HintStore for MemoryHintStore {
    fn was_shown(&self) -> bool {
        self.shown
    }

    fn mark_shown(&mut self) -> Result<()> {
        self.shown = true;
        self.writes += 1;
        Ok(())
    }
}

/// Hint visibility for one mounted section view. The hide deadline belongs to
/// the view; unmounting drops it so it can never fire afterwards.
#[derive(Debug)]
pub struct SwipeHint {
    duration: Duration,
    hide_at: Option<Instant>,
}

impl SwipeHint {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            hide_at: None,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.hide_at.is_some()
    }

    #[cfg(test)]
    pub fn deadline(&self) -> Option<Instant> {
        self.hide_at
    }

    /// Reads the flag once; shows the hint and records it when not yet shown.
    pub fn mount(&mut self, store: &mut dyn HintStore, now: Instant) {
        self.hide_at = None;
        if store.was_shown() {
            return;
        }
        if let Err(err) = store.mark_shown() {
            warn!("could not persist swipe hint flag: {err:#}");
        }
        info!("showing swipe hint");
        self.hide_at = Some(now + self.duration);
    }

    pub fn tick(&mut self, now: Instant) {
        if self.hide_at.is_some_and(|deadline| now >= deadline) {
            self.hide_at = None;
        }
    }

    pub fn unmount(&mut self) {
        self.hide_at = None;
    }
}
