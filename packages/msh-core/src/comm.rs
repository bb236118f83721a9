//! The two plain text files shared with the encounter counter.
//!
//! - the emulator count file holds the number of running emulators as decimal digits
//! - the encounter trigger file is rewritten with the current unix time after every hunt,
//!   the counter only looks at its modification time
//!
//! Neither file is locked, the last writer wins.

use std::{
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::Context;
use log::warn;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommFiles {
    pub emulator_count: PathBuf,
    pub encounter_trigger: PathBuf,
}

impl Default for CommFiles {
    fn default() -> Self {
        Self {
            emulator_count: PathBuf::from("melon_emulator_count.txt"),
            encounter_trigger: PathBuf::from("encounter_trigger.txt"),
        }
    }
}

impl CommFiles {
    /// Both files inside `dir`, with the default names
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let default = Self::default();
        Self {
            emulator_count: dir.as_ref().join(default.emulator_count),
            encounter_trigger: dir.as_ref().join(default.encounter_trigger),
        }
    }

    /// Create whichever file is missing
    pub fn init(&self, default_count: u32) -> anyhow::Result<()> {
        if !self.emulator_count.exists() {
            self.write_emulator_count(default_count)?;
        }
        if !self.encounter_trigger.exists() {
            fs::write(&self.encounter_trigger, "0")
                .with_context(|| format!("create {}", self.encounter_trigger.display()))?;
        }
        Ok(())
    }

    pub fn write_emulator_count(&self, count: u32) -> anyhow::Result<()> {
        fs::write(&self.emulator_count, count.to_string())
            .with_context(|| format!("write {}", self.emulator_count.display()))
    }

    /// `None` when the file is missing or holds anything but digits
    pub fn read_emulator_count(&self) -> Option<u32> {
        let content = fs::read_to_string(&self.emulator_count).ok()?;
        let content = content.trim();
        if content.is_empty() || !content.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        content.parse().ok()
    }

    pub fn signal_encounter(&self) -> anyhow::Result<()> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        fs::write(&self.encounter_trigger, now.to_string())
            .with_context(|| format!("write {}", self.encounter_trigger.display()))
    }

    fn trigger_modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.encounter_trigger)
            .and_then(|m| m.modified())
            .ok()
    }
}

/// Turns trigger file rewrites into encounter signals
#[derive(Debug)]
pub struct EncounterWatcher {
    files: CommFiles,
    last_modified: Option<SystemTime>,
    primed: bool,
}

impl EncounterWatcher {
    pub fn new(files: CommFiles) -> Self {
        Self {
            files,
            last_modified: None,
            primed: false,
        }
    }

    /// `true` once for every rewrite seen since the previous poll
    ///
    /// The first poll only records the current state, so a trigger written before the
    /// counter started is not counted.
    pub fn poll(&mut self) -> bool {
        let modified = self.files.trigger_modified();
        if !self.primed {
            self.primed = true;
            self.last_modified = modified;
            return false;
        }
        match (modified, self.last_modified) {
            (Some(modified), Some(last)) if modified > last => {
                self.last_modified = Some(modified);
                true
            }
            (Some(modified), None) => {
                self.last_modified = Some(modified);
                true
            }
            _ => false,
        }
    }
}

/// Keeps an amount in step with the emulator count file
#[derive(Debug)]
pub struct CountWatcher {
    files: CommFiles,
    malformed: bool,
}

impl CountWatcher {
    pub fn new(files: CommFiles) -> Self {
        Self {
            files,
            malformed: false,
        }
    }

    /// The count in the file when it differs from `current`
    ///
    /// `current` is whatever amount the caller uses right now, so switching to a hunt saved
    /// with another amount is corrected on the next poll even if the file did not change.
    pub fn poll(&mut self, current: u32) -> Option<u32> {
        let count = self.files.read_emulator_count();
        let malformed = count.is_none() && self.files.emulator_count.exists();
        if malformed && !self.malformed {
            warn!(
                "ignoring malformed emulator count in {}",
                self.files.emulator_count.display()
            );
        }
        self.malformed = malformed;
        count.filter(|&count| count != current)
    }
}
