use std::{collections::BTreeMap, fmt};

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn now_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).ok()
}

/// Sort key for optional timestamps, missing or malformed ones sort first
pub fn timestamp_key(s: Option<&str>) -> NaiveDateTime {
    s.and_then(parse_timestamp).unwrap_or(NaiveDateTime::MIN)
}

/// The name a sprite is looked up by, `"ralts phase 2"` is `"ralts"`
pub fn base_name(name: &str) -> String {
    name.split(" phase ").next().unwrap_or(name).to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HuntStatus {
    #[default]
    Active,
    Complete,
    Paused,
    Phase,
}

impl HuntStatus {
    pub const ALL: [HuntStatus; 4] = [
        HuntStatus::Active,
        HuntStatus::Complete,
        HuntStatus::Paused,
        HuntStatus::Phase,
    ];

    /// The status the toggle button moves to
    pub fn next(self) -> Self {
        match self {
            HuntStatus::Active => HuntStatus::Complete,
            HuntStatus::Complete => HuntStatus::Paused,
            HuntStatus::Paused => HuntStatus::Active,
            HuntStatus::Phase => HuntStatus::Complete,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HuntStatus::Active => "ACTIVE",
            HuntStatus::Complete => "COMPLETE",
            HuntStatus::Paused => "PAUSED",
            HuntStatus::Phase => "PHASE",
        }
    }
}

impl fmt::Display for HuntStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown statuses read as [`HuntStatus::Active`]
impl From<String> for HuntStatus {
    fn from(s: String) -> Self {
        HuntStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .unwrap_or_default()
    }
}

impl From<HuntStatus> for String {
    fn from(status: HuntStatus) -> Self {
        status.as_str().to_string()
    }
}

fn default_adjustment() -> u32 {
    1
}

fn default_phase() -> u32 {
    1
}

/// One hunt, or one phase of a hunt when `target` is set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PokemonRecord {
    pub name: String,
    #[serde(default)]
    pub encounters: u64,
    /// Encounters added per increment, follows the emulator count
    #[serde(default = "default_adjustment")]
    pub adjustment: u32,
    /// Path of the cached sprite
    #[serde(default)]
    pub sprite_url: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub status: HuntStatus,
    #[serde(default)]
    pub found_date: Option<String>,
    #[serde(default)]
    pub game: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default = "default_phase")]
    pub phase: u32,
    /// The hunt this record is a phase of
    #[serde(default)]
    pub target: Option<String>,
}

impl PokemonRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            encounters: 0,
            adjustment: default_adjustment(),
            sprite_url: None,
            last_updated: None,
            status: HuntStatus::Active,
            found_date: None,
            game: None,
            notes: None,
            method: None,
            phase: default_phase(),
            target: None,
        }
    }

    pub fn last_updated_key(&self) -> NaiveDateTime {
        timestamp_key(self.last_updated.as_deref())
    }

    /// `Ralts (Phase 2) → Kirlia` style card title
    pub fn display_name(&self) -> String {
        let mut name = capitalize(self.name.split_whitespace().next().unwrap_or(&self.name));
        if self.phase > 1 {
            name += &format!(" (Phase {})", self.phase);
        }
        if let Some(target) = &self.target {
            name += &format!(" → {}", capitalize(target));
        }
        name
    }

    pub fn display_status(&self) -> String {
        match self.target {
            Some(_) => format!("Phase {}", self.phase),
            None => self.status.to_string(),
        }
    }
}

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    MostRecent,
    MostEncounters,
}

impl SortBy {
    pub const ALL: [SortBy; 2] = [SortBy::MostRecent, SortBy::MostEncounters];
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortBy::MostRecent => write!(f, "most_recent"),
            SortBy::MostEncounters => write!(f, "most_encounters"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    pub const ALL: [SortOrder; 2] = [SortOrder::Ascending, SortOrder::Descending];
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Ascending => write!(f, "ascending"),
            SortOrder::Descending => write!(f, "descending"),
        }
    }
}

/// Everything persisted by the counter
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppData {
    pub pokemon: BTreeMap<String, PokemonRecord>,
    /// Most recently loaded first
    pub active_hunts: Vec<String>,
    pub last_pokemon: Option<String>,
    pub theme: Theme,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_status_cycle() {
        assert_eq!(HuntStatus::Active.next(), HuntStatus::Complete);
        assert_eq!(HuntStatus::Complete.next(), HuntStatus::Paused);
        assert_eq!(HuntStatus::Paused.next(), HuntStatus::Active);
        assert_eq!(HuntStatus::Phase.next(), HuntStatus::Complete);
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(
            serde_json::to_string(&HuntStatus::Complete).unwrap(),
            "\"COMPLETE\""
        );
        let status: HuntStatus = serde_json::from_str("\"PAUSED\"").unwrap();
        assert_eq!(status, HuntStatus::Paused);
        let status: HuntStatus = serde_json::from_str("\"HATCHING\"").unwrap();
        assert_eq!(status, HuntStatus::Active);
    }

    #[test]
    fn test_record_defaults() {
        let record: PokemonRecord = serde_json::from_str(r#"{"name": "ralts"}"#).unwrap();
        assert_eq!(record, PokemonRecord::new("ralts"));
        assert_eq!(record.phase, 1);
        assert_eq!(record.adjustment, 1);
        assert!(record.target.is_none());
    }

    #[test]
    fn test_timestamps() {
        let ts = now_timestamp();
        assert!(parse_timestamp(&ts).is_some());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(timestamp_key(Some("2024-05-01 10:00:00")) > timestamp_key(None));
        assert_eq!(timestamp_key(Some("garbage")), NaiveDateTime::MIN);
    }

    #[test]
    fn test_display() {
        let mut record = PokemonRecord::new("ralts phase 2");
        record.phase = 2;
        record.target = Some("kirlia".to_string());
        assert_eq!(record.display_name(), "Ralts (Phase 2) → Kirlia");
        assert_eq!(record.display_status(), "Phase 2");
        assert_eq!(base_name(&record.name), "ralts");
        assert_eq!(base_name("Mr. Mime"), "mr. mime");

        let record = PokemonRecord::new("eevee");
        assert_eq!(record.display_name(), "Eevee");
        assert_eq!(record.display_status(), "ACTIVE");
    }
}
