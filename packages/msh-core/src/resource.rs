//! Task resources
//!
//! A resource dir looks like:
//!
//! ```text
//! resources/
//! ├── manifest.toml
//! └── tasks/
//!     ├── xxx.toml
//!     └── some_group/yyy.toml
//! ```
//!
//! Task files are layered over [`crate::builtin`], a file whose task name matches a builtin
//! replaces it.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{builtin, task::Task};

/// `resources/manifest.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

fn get_task_files(path: impl AsRef<Path>) -> Vec<PathBuf> {
    let mut task_files = vec![];
    if let Ok(read_dir) = fs::read_dir(path) {
        for entry in read_dir.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                task_files.extend(get_task_files(entry.path()));
            } else if file_type.is_file()
                && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
            {
                task_files.push(entry.path());
            }
        }
    }
    task_files.sort();
    task_files
}

#[derive(Debug, Clone)]
pub struct Resource {
    pub root: Option<PathBuf>,
    pub manifest: Option<Manifest>,
    tasks: BTreeMap<String, Task>,
}

impl Resource {
    /// Only the builtin tasks
    pub fn builtin() -> Self {
        Self {
            root: None,
            manifest: None,
            tasks: builtin::tasks()
                .into_iter()
                .map(|t| (t.name.clone(), t))
                .collect(),
        }
    }

    /// Add `tasks`, replacing the ones with the same name
    pub fn with_tasks(mut self, tasks: impl IntoIterator<Item = Task>) -> Self {
        for task in tasks {
            self.tasks.insert(task.name.clone(), task);
        }
        self
    }

    /// Load the resource dir at `root`, `manifest.toml` is optional
    pub fn load(root: impl AsRef<Path>) -> anyhow::Result<Self> {
        let root = root.as_ref().to_owned();
        if !root.exists() {
            anyhow::bail!("Resource root not found: {}", root.display());
        }

        let manifest_path = root.join("manifest.toml");
        let manifest = if manifest_path.exists() {
            let manifest = fs::read_to_string(&manifest_path)?;
            Some(toml::from_str::<Manifest>(&manifest).context("parse manifest.toml")?)
        } else {
            warn!("{} not found", manifest_path.display());
            None
        };

        let mut resource = Self::builtin();
        for task_file in get_task_files(root.join("tasks")) {
            let task = fs::read_to_string(&task_file)?;
            let task = toml::from_str::<Task>(&task)
                .with_context(|| format!("parse task file {}", task_file.display()))?;
            task.validate()
                .with_context(|| format!("check task file {}", task_file.display()))?;
            if resource.tasks.contains_key(&task.name) {
                info!("{} overrides task {}", task_file.display(), task.name);
            }
            resource.tasks.insert(task.name.clone(), task);
        }
        info!(
            "loaded {} tasks from {}",
            resource.tasks.len(),
            root.display()
        );

        resource.root = Some(root);
        resource.manifest = manifest;
        Ok(resource)
    }

    /// [`Resource::load`] when `root` exists, [`Resource::builtin`] otherwise
    pub fn load_or_builtin(root: impl AsRef<Path>) -> anyhow::Result<Self> {
        if root.as_ref().exists() {
            Self::load(root)
        } else {
            info!(
                "{} does not exist, using builtin tasks",
                root.as_ref().display()
            );
            Ok(Self::builtin())
        }
    }

    pub fn get_task(&self, name: impl AsRef<str>) -> Option<&Task> {
        self.tasks.get(name.as_ref())
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn task_names(&self) -> Vec<String> {
        self.tasks.keys().cloned().collect()
    }

    /// Names of the tasks that signal an encounter, sorted
    pub fn hunts(&self) -> Vec<String> {
        self.tasks
            .values()
            .filter(|t| t.is_hunt())
            .map(|t| t.name.clone())
            .collect()
    }

    /// Write every task to `<dir>/<name>.toml`
    pub fn dump(&self, dir: impl AsRef<Path>) -> anyhow::Result<usize> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        for task in self.tasks.values() {
            let path = dir.join(format!("{}.toml", task.name));
            fs::write(&path, toml::to_string_pretty(task)?)
                .with_context(|| format!("write {}", path.display()))?;
        }
        Ok(self.tasks.len())
    }
}
