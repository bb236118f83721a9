//! The counter session: which hunt is loaded, its running count and the controls acting on it.
//!
//! Every mutation is saved to the [`Store`] right away.

use std::cmp::Ordering;

use tracing::info;

use crate::{
    odds::{self, HUNT_METHODS},
    record::{now_timestamp, AppData, HuntStatus, PokemonRecord, SortBy, SortOrder, Theme},
    store::Store,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjust {
    Increase,
    Decrease,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HuntFilter {
    #[default]
    All,
    Active,
    Complete,
    Paused,
    Phase,
}

impl HuntFilter {
    pub const ALL: [HuntFilter; 5] = [
        HuntFilter::All,
        HuntFilter::Active,
        HuntFilter::Complete,
        HuntFilter::Paused,
        HuntFilter::Phase,
    ];

    pub fn matches(&self, status: HuntStatus) -> bool {
        match self {
            HuntFilter::All => true,
            HuntFilter::Active => status == HuntStatus::Active,
            HuntFilter::Complete => status == HuntStatus::Complete,
            HuntFilter::Paused => status == HuntStatus::Paused,
            HuntFilter::Phase => status == HuntStatus::Phase,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HuntFilter::All => "All",
            HuntFilter::Active => "Active",
            HuntFilter::Complete => "Completed",
            HuntFilter::Paused => "Paused",
            HuntFilter::Phase => "Phases",
        }
    }
}

#[derive(Debug)]
pub struct Tracker {
    store: Store,
    current: Option<String>,
    count: u64,
    amount: u32,
    game: Option<String>,
    method: String,
}

impl Tracker {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            current: None,
            count: 0,
            amount: 1,
            game: None,
            method: HUNT_METHODS[0].to_string(),
        }
    }

    pub fn data(&self) -> &AppData {
        &self.store.data
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current_record(&self) -> Option<&PokemonRecord> {
        self.current
            .as_ref()
            .and_then(|name| self.store.data.pokemon.get(name))
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// How many encounters one increment adds
    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn set_amount(&mut self, amount: u32) {
        self.amount = amount;
    }

    pub fn game(&self) -> Option<&str> {
        self.game.as_deref()
    }

    pub fn set_game(&mut self, game: impl Into<String>) {
        self.game = Some(game.into());
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn set_method(&mut self, method: impl Into<String>) {
        self.method = method.into();
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.store.save()
    }

    /// Make `name` the current hunt and move it to the front of the active hunts
    pub fn load_pokemon(&mut self, name: &str) {
        let name = name.to_lowercase();
        let data = &mut self.store.data;
        data.active_hunts.retain(|n| *n != name);
        data.active_hunts.insert(0, name.clone());

        match data.pokemon.get(&name) {
            Some(record) => {
                self.count = record.encounters;
                self.amount = record.adjustment;
                if let Some(game) = &record.game {
                    self.game = Some(game.clone());
                }
                if let Some(method) = &record.method {
                    self.method = method.clone();
                }
            }
            None => self.count = 0,
        }
        info!("loaded hunt {name} at {} encounters", self.count);
        self.current = Some(name);
    }

    /// The newest active hunt, or the one open when the counter was last closed
    pub fn most_recent_active(&self) -> Option<String> {
        let data = &self.store.data;
        data.pokemon
            .values()
            .filter(|r| r.status == HuntStatus::Active)
            .max_by_key(|r| r.last_updated_key())
            .map(|r| r.name.clone())
            .or_else(|| {
                data.last_pokemon
                    .clone()
                    .filter(|name| data.pokemon.contains_key(name))
            })
    }

    pub fn load_most_recent(&mut self) -> Option<String> {
        let name = self.most_recent_active()?;
        self.load_pokemon(&name);
        Some(name)
    }

    /// Change the current count and save. With no hunt loaded the first active hunt is
    /// loaded, `false` means there was none and nothing changed.
    pub fn adjust(&mut self, adjust: Adjust) -> anyhow::Result<bool> {
        if self.current.is_none() {
            let Some(first) = self.store.data.active_hunts.first().cloned() else {
                return Ok(false);
            };
            self.load_pokemon(&first);
        }

        let amount = self.amount as u64;
        self.count = match adjust {
            Adjust::Increase => self.count + amount,
            Adjust::Decrease => self.count.saturating_sub(amount),
            Adjust::Reset => 0,
        };
        self.save_current()?;
        Ok(true)
    }

    /// One encounter signal from the controller
    pub fn on_encounter(&mut self) -> anyhow::Result<bool> {
        self.adjust(Adjust::Increase)
    }

    /// Number the next phase of `target` would get
    pub fn next_phase_number(&self, target: &str) -> u32 {
        let target = target.to_lowercase();
        let phases = self
            .store
            .data
            .pokemon
            .values()
            .filter(|r| r.target.as_ref().is_some_and(|t| t.to_lowercase() == target))
            .count();
        phases as u32 + 1
    }

    /// Write the current hunt's count, game and method into its record
    pub fn save_current(&mut self) -> anyhow::Result<()> {
        let Some(name) = self.current.clone() else {
            return Ok(());
        };
        let phase = self.next_phase_number(&name);
        let record = self
            .store
            .data
            .pokemon
            .entry(name.clone())
            .or_insert_with(|| {
                let mut record = PokemonRecord::new(name);
                record.phase = phase;
                record
            });
        record.encounters = self.count;
        record.adjustment = self.amount;
        record.game = self.game.clone();
        record.method = Some(self.method.clone());
        record.last_updated = Some(now_timestamp());
        self.store.save()
    }

    /// Record finding `phased_on` while hunting the current pokemon
    ///
    /// The phase is its own completed record frozen at the current count, the hunt itself
    /// keeps counting. Returns the new record's name.
    pub fn handle_phase(&mut self, phased_on: &str) -> anyhow::Result<Option<String>> {
        let Some(current) = self.current.clone() else {
            return Ok(None);
        };
        let phase = self.next_phase_number(&current);
        let name = format!("{} phase {}", phased_on.trim().to_lowercase(), phase);
        let now = now_timestamp();

        let mut record = PokemonRecord::new(name.clone());
        record.encounters = self.count;
        record.adjustment = self.amount;
        record.game = self.game.clone();
        record.method = Some(self.method.clone());
        record.last_updated = Some(now.clone());
        record.status = HuntStatus::Complete;
        record.found_date = Some(now.clone());
        record.phase = phase;
        record.target = Some(current.clone());

        let pokemon = &mut self.store.data.pokemon;
        pokemon.insert(name.clone(), record);
        if let Some(hunt) = pokemon.get_mut(&current) {
            hunt.phase = phase + 1;
            hunt.last_updated = Some(now);
        }
        info!("{current} phased on {name}");
        self.store.save()?;
        Ok(Some(name))
    }

    pub fn toggle_status(&mut self, name: &str) -> anyhow::Result<Option<HuntStatus>> {
        let name = name.to_lowercase();
        let Some(record) = self.store.data.pokemon.get_mut(&name) else {
            return Ok(None);
        };
        record.status = record.status.next();
        if record.status == HuntStatus::Complete && record.found_date.is_none() {
            record.found_date = Some(now_timestamp());
        }
        let status = record.status;
        self.store.save()?;
        Ok(Some(status))
    }

    pub fn set_notes(&mut self, name: &str, notes: impl Into<String>) -> anyhow::Result<()> {
        let Some(record) = self.store.data.pokemon.get_mut(name) else {
            anyhow::bail!("no hunt named {name}");
        };
        record.notes = Some(notes.into());
        self.store.save()
    }

    pub fn set_sprite(&mut self, name: &str, path: impl Into<String>) {
        if let Some(record) = self.store.data.pokemon.get_mut(name) {
            record.sprite_url = Some(path.into());
        }
    }

    pub fn theme(&self) -> Theme {
        self.store.data.theme
    }

    pub fn toggle_theme(&mut self) -> anyhow::Result<Theme> {
        self.store.data.theme = self.store.data.theme.toggled();
        self.store.save()?;
        Ok(self.store.data.theme)
    }

    pub fn set_sort(&mut self, sort_by: SortBy, sort_order: SortOrder) {
        self.store.data.sort_by = sort_by;
        self.store.data.sort_order = sort_order;
    }

    /// Records passing `filter` whose notes, target or name contain `query`, in display order
    pub fn filtered(&self, filter: HuntFilter, query: &str) -> Vec<&PokemonRecord> {
        let query = query.to_lowercase();
        let contains = |s: &Option<String>| {
            s.as_ref()
                .is_some_and(|s| s.to_lowercase().contains(&query))
        };
        let mut hunts: Vec<&PokemonRecord> = self
            .store
            .data
            .pokemon
            .values()
            .filter(|r| filter.matches(r.status))
            .filter(|r| {
                query.is_empty()
                    || contains(&r.notes)
                    || contains(&r.target)
                    || r.name.to_lowercase().contains(&query)
            })
            .collect();

        let data = &self.store.data;
        let cmp = |a: &&PokemonRecord, b: &&PokemonRecord| -> Ordering {
            match data.sort_by {
                SortBy::MostRecent => a.last_updated_key().cmp(&b.last_updated_key()),
                SortBy::MostEncounters => a.encounters.cmp(&b.encounters),
            }
        };
        match data.sort_order {
            SortOrder::Ascending => hunts.sort_by(cmp),
            SortOrder::Descending => hunts.sort_by(|a, b| cmp(b, a)),
        }
        hunts
    }

    /// `Encounters: 1,234` and, once a method is set, the shiny chance line
    pub fn summary(&self) -> String {
        let mut text = format!("Encounters: {}", odds::format_thousands(self.count));
        if let Some(record) = self.current_record().filter(|r| r.method.is_some()) {
            text += "\n";
            text += &odds::chance_line(odds::record_odds(record), self.count);
        }
        text
    }

    /// Remember the current hunt for the next start and save
    pub fn close(&mut self) -> anyhow::Result<()> {
        self.store.data.last_pokemon = self.current.clone();
        self.store.save()
    }
}

/// Card text for a record in the hunts list
pub fn record_summary(record: &PokemonRecord) -> String {
    let mut text = format!(
        "Encounters: {}",
        odds::format_thousands(record.encounters)
    );
    if record.method.is_some() {
        text += "\n";
        text += &odds::chance_line(odds::record_odds(record), record.encounters);
    }
    if let Some(game) = &record.game {
        text += &format!("\nGame: {game}");
    }
    if record.status == HuntStatus::Complete {
        if let Some(found) = &record.found_date {
            text += &format!("\nFound: {found}");
        }
    }
    text
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use super::*;

    fn tracker(dir: &Path) -> Tracker {
        Tracker::new(Store::load(dir.join("data.json")).unwrap())
    }

    #[test]
    fn test_counting() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = tracker(dir.path());
        // nothing to count on yet
        assert!(!t.adjust(Adjust::Increase).unwrap());

        t.load_pokemon("Ralts");
        assert_eq!(t.current(), Some("ralts"));
        t.set_amount(24);
        t.adjust(Adjust::Increase).unwrap();
        t.adjust(Adjust::Increase).unwrap();
        assert_eq!(t.count(), 48);
        t.set_amount(100);
        t.adjust(Adjust::Decrease).unwrap();
        assert_eq!(t.count(), 0);

        t.set_amount(5);
        t.on_encounter().unwrap();
        let record = t.current_record().unwrap();
        assert_eq!(record.encounters, 5);
        assert_eq!(record.adjustment, 5);
        assert_eq!(record.status, HuntStatus::Active);
        assert_eq!(record.method.as_deref(), Some("Random Encounter"));
        assert!(record.last_updated.is_some());

        t.adjust(Adjust::Reset).unwrap();
        assert_eq!(t.count(), 0);

        // every change is on disk already
        let reloaded = tracker(dir.path());
        assert_eq!(reloaded.data().pokemon["ralts"].encounters, 0);
    }

    #[test]
    fn test_adjust_loads_first_active() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = tracker(dir.path());
        t.load_pokemon("eevee");
        t.set_amount(3);
        t.adjust(Adjust::Increase).unwrap();
        t.close().unwrap();

        let mut t = tracker(dir.path());
        assert_eq!(t.current(), None);
        assert!(t.adjust(Adjust::Increase).unwrap());
        assert_eq!(t.current(), Some("eevee"));
        assert_eq!(t.count(), 6);
    }

    #[test]
    fn test_load_restores_settings() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = tracker(dir.path());
        t.load_pokemon("snorlax");
        t.set_game("HeartGold/SoulSilver");
        t.set_method("Soft Reset");
        t.set_amount(8);
        t.adjust(Adjust::Increase).unwrap();

        t.load_pokemon("sudowoodo");
        assert_eq!(t.count(), 0);
        t.set_method("Other");
        t.set_amount(1);

        t.load_pokemon("snorlax");
        assert_eq!(t.count(), 8);
        assert_eq!(t.amount(), 8);
        assert_eq!(t.method(), "Soft Reset");
        assert_eq!(t.game(), Some("HeartGold/SoulSilver"));
        assert_eq!(t.data().active_hunts, vec!["snorlax", "sudowoodo"]);
    }

    #[test]
    fn test_phase() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = tracker(dir.path());
        assert_eq!(t.handle_phase("zubat").unwrap(), None);

        t.load_pokemon("ralts");
        t.set_amount(100);
        t.adjust(Adjust::Increase).unwrap();

        let name = t.handle_phase("Zubat").unwrap().unwrap();
        assert_eq!(name, "zubat phase 1");
        let phase = &t.data().pokemon[&name];
        assert_eq!(phase.status, HuntStatus::Complete);
        assert_eq!(phase.encounters, 100);
        assert_eq!(phase.target.as_deref(), Some("ralts"));
        assert!(phase.found_date.is_some());
        assert_eq!(t.data().pokemon["ralts"].phase, 2);

        // the hunt keeps counting, the phase stays frozen
        t.adjust(Adjust::Increase).unwrap();
        assert_eq!(t.count(), 200);
        assert_eq!(t.data().pokemon[&name].encounters, 100);

        let name = t.handle_phase("geodude").unwrap().unwrap();
        assert_eq!(name, "geodude phase 2");
        assert_eq!(t.data().pokemon["ralts"].phase, 3);
        assert_eq!(t.next_phase_number("RALTS"), 3);
    }

    #[test]
    fn test_new_hunt_starts_after_phases() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = tracker(dir.path());
        t.load_pokemon("ralts");
        t.handle_phase("zubat").unwrap();
        assert!(!t.data().pokemon.contains_key("ralts"));
        t.adjust(Adjust::Increase).unwrap();
        assert_eq!(t.data().pokemon["ralts"].phase, 2);
    }

    #[test]
    fn test_toggle_status() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = tracker(dir.path());
        t.load_pokemon("ralts");
        t.adjust(Adjust::Increase).unwrap();
        assert_eq!(
            t.toggle_status("Ralts").unwrap(),
            Some(HuntStatus::Complete)
        );
        let found = t.data().pokemon["ralts"].found_date.clone();
        assert!(found.is_some());
        assert_eq!(t.toggle_status("ralts").unwrap(), Some(HuntStatus::Paused));
        assert_eq!(t.toggle_status("ralts").unwrap(), Some(HuntStatus::Active));
        assert_eq!(
            t.toggle_status("ralts").unwrap(),
            Some(HuntStatus::Complete)
        );
        // found date is kept from the first completion
        assert_eq!(t.data().pokemon["ralts"].found_date, found);
        assert_eq!(t.toggle_status("missingno").unwrap(), None);
    }

    #[test]
    fn test_filter_and_sort() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::load(dir.path().join("data.json")).unwrap();
        for (name, encounters, updated, status, notes) in [
            ("ralts", 50, "2025-01-03 00:00:00", HuntStatus::Active, None),
            ("eevee", 500, "2025-01-01 00:00:00", HuntStatus::Complete, Some("Bill's house")),
            ("zubat", 5, "2025-01-02 00:00:00", HuntStatus::Paused, None),
        ] {
            let mut record = PokemonRecord::new(name);
            record.encounters = encounters;
            record.last_updated = Some(updated.to_string());
            record.status = status;
            record.notes = notes.map(str::to_string);
            store.data.pokemon.insert(name.to_string(), record);
        }
        let mut t = Tracker::new(store);
        let names = |hunts: Vec<&PokemonRecord>| -> Vec<String> {
            hunts.into_iter().map(|r| r.name.clone()).collect()
        };

        assert_eq!(
            names(t.filtered(HuntFilter::All, "")),
            vec!["ralts", "zubat", "eevee"]
        );
        t.set_sort(SortBy::MostEncounters, SortOrder::Ascending);
        assert_eq!(
            names(t.filtered(HuntFilter::All, "")),
            vec!["zubat", "ralts", "eevee"]
        );
        assert_eq!(names(t.filtered(HuntFilter::Paused, "")), vec!["zubat"]);
        assert_eq!(names(t.filtered(HuntFilter::All, "BILL")), vec!["eevee"]);
        assert_eq!(names(t.filtered(HuntFilter::All, "alt")), vec!["ralts"]);
        assert!(t.filtered(HuntFilter::Phase, "").is_empty());
    }

    #[test]
    fn test_most_recent_active() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::load(dir.path().join("data.json")).unwrap();
        let mut old = PokemonRecord::new("ralts");
        old.last_updated = Some("2024-01-01 00:00:00".to_string());
        let mut new = PokemonRecord::new("eevee");
        new.last_updated = Some("2025-01-01 00:00:00".to_string());
        let mut done = PokemonRecord::new("zubat");
        done.status = HuntStatus::Complete;
        done.last_updated = Some("2026-01-01 00:00:00".to_string());
        for r in [old, new, done] {
            store.data.pokemon.insert(r.name.clone(), r);
        }
        store.data.last_pokemon = Some("zubat".to_string());
        let mut t = Tracker::new(store);
        assert_eq!(t.load_most_recent().as_deref(), Some("eevee"));

        t.toggle_status("eevee").unwrap();
        t.toggle_status("ralts").unwrap();
        assert_eq!(t.most_recent_active().as_deref(), Some("zubat"));
    }

    #[test]
    fn test_summary() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = tracker(dir.path());
        t.load_pokemon("ralts");
        assert_eq!(t.summary(), "Encounters: 0");
        t.set_game("HeartGold/SoulSilver");
        t.set_amount(1200);
        t.adjust(Adjust::Increase).unwrap();
        assert_eq!(
            t.summary(),
            "Encounters: 1,200\nShiny Chance: 13.63% (1/8,192)"
        );
        let card = record_summary(t.current_record().unwrap());
        assert!(card.ends_with("Game: HeartGold/SoulSilver"));
    }

    #[test]
    fn test_notes_and_theme() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = tracker(dir.path());
        assert!(t.set_notes("ralts", "x").is_err());
        t.load_pokemon("ralts");
        t.adjust(Adjust::Increase).unwrap();
        t.set_notes("ralts", "route 29").unwrap();
        assert_eq!(t.theme(), Theme::Dark);
        assert_eq!(t.toggle_theme().unwrap(), Theme::Light);

        let t = tracker(dir.path());
        assert_eq!(t.data().pokemon["ralts"].notes.as_deref(), Some("route 29"));
        assert_eq!(t.theme(), Theme::Light);
    }
}
