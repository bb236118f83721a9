use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{ser::PrettyFormatter, Map, Value};
use tracing::{info, warn};

use crate::record::{AppData, PokemonRecord};

/// The counter's JSON file, always rewritten whole
#[derive(Debug, Clone)]
pub struct Store {
    pub path: PathBuf,
    pub data: AppData,
}

fn field<T: DeserializeOwned + Default>(obj: &Map<String, Value>, key: &str) -> T {
    match obj.get(key) {
        None | Some(Value::Null) => T::default(),
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|err| {
            warn!("ignoring invalid {key}: {err}");
            T::default()
        }),
    }
}

/// Decode `json` record by record, skipping the records that do not parse
pub fn decode(json: &str) -> anyhow::Result<AppData> {
    let value: Value = serde_json::from_str(json).context("Invalid JSON data")?;
    let Value::Object(obj) = value else {
        anyhow::bail!("Invalid JSON data: expected an object");
    };

    let mut data = AppData {
        active_hunts: field(&obj, "active_hunts"),
        last_pokemon: field(&obj, "last_pokemon"),
        theme: field(&obj, "theme"),
        sort_by: field(&obj, "sort_by"),
        sort_order: field(&obj, "sort_order"),
        ..Default::default()
    };
    if let Some(Value::Object(pokemon)) = obj.get("pokemon") {
        for (key, value) in pokemon {
            match serde_json::from_value::<PokemonRecord>(value.clone()) {
                Ok(record) => {
                    data.pokemon.insert(key.clone(), record);
                }
                Err(err) => warn!("Skipping invalid Pokémon entry {key}: {err}"),
            }
        }
    }
    Ok(data)
}

/// Pretty JSON with a 4 space indent
pub fn encode(data: &AppData) -> anyhow::Result<String> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    data.serialize(&mut ser)?;
    Ok(String::from_utf8(buf)?)
}

impl Store {
    /// An empty store that will be written to `path`
    pub fn empty(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_owned(),
            data: AppData::default(),
        }
    }

    /// Missing file is an empty store, malformed JSON is an error
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("{} not found, starting empty", path.display());
            return Ok(Self::empty(path));
        }
        let json = fs::read_to_string(path)
            .with_context(|| format!("Could not load data from {}", path.display()))?;
        let data = decode(&json)?;
        info!("loaded {} hunts from {}", data.pokemon.len(), path.display());
        Ok(Self {
            path: path.to_owned(),
            data,
        })
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, encode(&self.data)?)
            .with_context(|| format!("Could not save data to {}", self.path.display()))
    }
}
