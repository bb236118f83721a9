mod view;

use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
    time::Duration,
};

use iced::{
    widget::{image::Handle, text_editor},
    window, Subscription, Task,
};
use msh::utils::{controller_command, controller_exe, init_logger};
use msh_core::{
    comm::{CountWatcher, EncounterWatcher},
    config::{Config, DEFAULT_CONFIG_FILE},
};
use msh_tracker::{
    odds::{generation, LATEST_GENERATION},
    record::{SortBy, SortOrder, Theme},
    sprite::{SpriteCache, CARD_SPRITE_SIZE, MAIN_SPRITE_SIZE},
    tracker::{Adjust, HuntFilter},
    Store, Tracker,
};
use tracing::{error, info};

/// Emulator count assumed until the controller writes one
const DEFAULT_EMULATOR_COUNT: u32 = 16;
const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Picker {
    NewHunt,
    Phase,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Screen {
    Hunts,
    Species(Picker),
    Notes(String),
}

struct App {
    config_path: PathBuf,
    tracker: Tracker,
    sprites: SpriteCache,
    encounters: EncounterWatcher,
    emulators: CountWatcher,

    screen: Screen,
    /// The hunt `main_sprite` belongs to
    shown: Option<String>,
    main_sprite: Option<Handle>,
    card_sprites: HashMap<String, Handle>,
    requested: HashSet<String>,

    amount_input: String,
    filter: HuntFilter,
    note_query: String,
    species: Vec<String>,
    loading_species: bool,
    species_query: String,
    notes: text_editor::Content,
    status: String,
}

#[derive(Debug, Clone)]
enum Message {
    Tick,
    Adjust(Adjust),
    AmountChanged(String),
    GameSelected(String),
    MethodSelected(String),

    FilterSelected(HuntFilter),
    NoteQueryChanged(String),
    SortBySelected(SortBy),
    SortOrderSelected(SortOrder),
    LoadHunt(String),
    ToggleStatus(String),

    EditNotes(String),
    NotesAction(text_editor::Action),
    SaveNotes,

    OpenPicker(Picker),
    SpeciesLoaded(Vec<String>),
    SpeciesQueryChanged(String),
    SpeciesPicked(String),
    Back,

    SpriteLoaded {
        name: String,
        size: u32,
        res: Result<PathBuf, String>,
    },
    ToggleTheme,
    LaunchController,
    CloseRequested,
}

impl App {
    fn new(config_path: PathBuf) -> Self {
        let config = match Config::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                error!("failed to load {}: {err:#}", config_path.display());
                Config::default()
            }
        };

        let mut status = String::new();
        if let Err(err) = config.comm.init(DEFAULT_EMULATOR_COUNT) {
            error!("failed to initialize communication files: {err:#}");
        }
        let store = match Store::load(&config.counter.data_file) {
            Ok(store) => store,
            Err(err) => {
                status = format!("Could not load data: {err:#}");
                error!("{status}");
                Store::empty(&config.counter.data_file)
            }
        };

        let mut tracker = Tracker::new(store);
        if let Some(name) = tracker.load_most_recent() {
            info!("resuming {name}");
        }

        let mut encounters = EncounterWatcher::new(config.comm.clone());
        encounters.poll();
        let mut emulators = CountWatcher::new(config.comm.clone());
        if let Some(count) = emulators.poll(tracker.amount()) {
            tracker.set_amount(count);
        }

        Self {
            amount_input: tracker.amount().to_string(),
            sprites: SpriteCache::new(&config.counter.cache_dir, &config.counter.api_base),
            config_path,
            tracker,
            encounters,
            emulators,
            screen: Screen::Hunts,
            shown: None,
            main_sprite: None,
            card_sprites: HashMap::new(),
            requested: HashSet::new(),
            filter: HuntFilter::default(),
            note_query: String::new(),
            species: vec![],
            loading_species: false,
            species_query: String::new(),
            notes: text_editor::Content::new(),
            status,
        }
    }

    fn report(&mut self, err: anyhow::Error) {
        error!("{err:#}");
        self.status = format!("Error: {err:#}");
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        let task = self.handle(message);
        Task::batch([task, self.sync_current(), self.request_card_sprites()])
    }

    fn handle(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => self.poll_files(),
            Message::Adjust(adjust) => match self.tracker.adjust(adjust) {
                Ok(true) => {}
                Ok(false) => self.status = "No active hunt, start a new one first".to_string(),
                Err(err) => self.report(err),
            },
            Message::AmountChanged(input) => {
                let input: String = input.chars().filter(char::is_ascii_digit).collect();
                if let Some(amount) = input.parse::<u32>().ok().filter(|n| *n > 0) {
                    self.tracker.set_amount(amount);
                }
                self.amount_input = input;
            }
            Message::GameSelected(game) => {
                if self.tracker.game() != Some(game.as_str()) {
                    // the species list depends on the generation
                    self.species.clear();
                }
                self.tracker.set_game(game);
                if let Err(err) = self.tracker.save_current() {
                    self.report(err);
                }
            }
            Message::MethodSelected(method) => {
                self.tracker.set_method(method);
                if let Err(err) = self.tracker.save_current() {
                    self.report(err);
                }
            }

            Message::FilterSelected(filter) => self.filter = filter,
            Message::NoteQueryChanged(query) => self.note_query = query,
            Message::SortBySelected(sort_by) => {
                let order = self.tracker.data().sort_order;
                self.set_sort(sort_by, order);
            }
            Message::SortOrderSelected(order) => {
                let sort_by = self.tracker.data().sort_by;
                self.set_sort(sort_by, order);
            }
            Message::LoadHunt(name) => {
                self.tracker.load_pokemon(&name);
                if let Err(err) = self.tracker.save() {
                    self.report(err);
                }
                self.screen = Screen::Hunts;
            }
            Message::ToggleStatus(name) => match self.tracker.toggle_status(&name) {
                Ok(Some(status)) => self.status = format!("{name} is now {status}"),
                Ok(None) => {}
                Err(err) => self.report(err),
            },

            Message::EditNotes(name) => {
                let notes = self
                    .tracker
                    .data()
                    .pokemon
                    .get(&name)
                    .and_then(|r| r.notes.clone())
                    .unwrap_or_default();
                self.notes = text_editor::Content::with_text(&notes);
                self.screen = Screen::Notes(name);
            }
            Message::NotesAction(action) => self.notes.perform(action),
            Message::SaveNotes => {
                if let Screen::Notes(name) = &self.screen {
                    let name = name.clone();
                    match self.tracker.set_notes(&name, self.notes.text().trim_end()) {
                        Ok(()) => self.status = format!("Notes saved for {name}"),
                        Err(err) => self.report(err),
                    }
                }
                self.screen = Screen::Hunts;
            }

            Message::OpenPicker(picker) => {
                if picker == Picker::Phase && self.tracker.current().is_none() {
                    self.status = "Load a hunt before recording a phase".to_string();
                    return Task::none();
                }
                self.species_query.clear();
                self.screen = Screen::Species(picker);
                return self.load_species();
            }
            Message::SpeciesLoaded(species) => {
                info!("{} species available", species.len());
                self.species = species;
                self.loading_species = false;
            }
            Message::SpeciesQueryChanged(query) => self.species_query = query,
            Message::SpeciesPicked(name) => {
                let Screen::Species(picker) = self.screen else {
                    return Task::none();
                };
                match picker {
                    Picker::NewHunt => {
                        self.tracker.load_pokemon(&name);
                        match self.tracker.save_current() {
                            Ok(()) => self.status = format!("Started hunting {name}"),
                            Err(err) => self.report(err),
                        }
                    }
                    Picker::Phase => match self.tracker.handle_phase(&name) {
                        Ok(Some(phase)) => self.status = format!("Recorded {phase}"),
                        Ok(None) => {}
                        Err(err) => self.report(err),
                    },
                }
                self.screen = Screen::Hunts;
            }
            Message::Back => self.screen = Screen::Hunts,

            Message::SpriteLoaded { name, size, res } => match res {
                Ok(path) => {
                    let handle = Handle::from_path(&path);
                    if size == MAIN_SPRITE_SIZE {
                        if self.shown.as_deref() == Some(name.as_str()) {
                            self.main_sprite = Some(handle);
                        }
                        self.tracker.set_sprite(&name, path.display().to_string());
                    } else {
                        self.card_sprites.insert(name, handle);
                    }
                }
                Err(err) => error!("failed to load sprite for {name}: {err}"),
            },
            Message::ToggleTheme => {
                if let Err(err) = self.tracker.toggle_theme() {
                    self.report(err);
                }
            }
            Message::LaunchController => {
                let exe = controller_exe();
                match controller_command(&exe, &self.config_path).spawn() {
                    Ok(child) => {
                        info!("started {} (pid {})", exe.display(), child.id());
                        self.status = "Controller launched".to_string();
                    }
                    Err(err) => {
                        self.report(anyhow::anyhow!("failed to start {}: {err}", exe.display()))
                    }
                }
            }
            Message::CloseRequested => {
                if let Err(err) = self.tracker.close() {
                    error!("failed to save on close: {err:#}");
                }
                return iced::exit();
            }
        }
        Task::none()
    }

    /// Follow the emulator count, then count an encounter per trigger rewrite
    fn poll_files(&mut self) {
        if let Some(count) = self.emulators.poll(self.tracker.amount()) {
            info!("amount set to the emulator count {count}");
            self.tracker.set_amount(count);
            self.amount_input = count.to_string();
        }
        if self.encounters.poll() {
            match self.tracker.on_encounter() {
                Ok(true) => {}
                Ok(false) => self.status = "Encounter signaled with no hunt loaded".to_string(),
                Err(err) => self.report(err),
            }
        }
    }

    fn set_sort(&mut self, sort_by: SortBy, order: SortOrder) {
        self.tracker.set_sort(sort_by, order);
        if let Err(err) = self.tracker.save() {
            self.report(err);
        }
    }

    fn load_species(&mut self) -> Task<Message> {
        if !self.species.is_empty() || self.loading_species {
            return Task::none();
        }
        self.loading_species = true;
        let gen = self
            .tracker
            .game()
            .and_then(generation)
            .unwrap_or(LATEST_GENERATION);
        let sprites = self.sprites.clone();
        Task::perform(
            async move { sprites.species_up_to(gen).await },
            Message::SpeciesLoaded,
        )
    }

    fn fetch_sprite(&self, name: String, size: u32) -> Task<Message> {
        let sprites = self.sprites.clone();
        let lookup = name.clone();
        Task::perform(
            async move {
                sprites
                    .fetch_or_fallback(&lookup, size)
                    .await
                    .map_err(|err| format!("{err:#}"))
            },
            move |res| Message::SpriteLoaded {
                name: name.clone(),
                size,
                res,
            },
        )
    }

    /// Follow the tracker when the current hunt changed underneath
    fn sync_current(&mut self) -> Task<Message> {
        let current = self.tracker.current().map(str::to_string);
        if current == self.shown {
            return Task::none();
        }
        self.shown = current.clone();
        self.main_sprite = None;
        self.amount_input = self.tracker.amount().to_string();
        match current {
            Some(name) => self.fetch_sprite(name, MAIN_SPRITE_SIZE),
            None => Task::none(),
        }
    }

    fn request_card_sprites(&mut self) -> Task<Message> {
        let missing: Vec<String> = self
            .tracker
            .filtered(self.filter, &self.note_query)
            .into_iter()
            .map(|r| r.name.clone())
            .filter(|name| !self.requested.contains(name))
            .collect();
        let mut tasks = Vec::with_capacity(missing.len());
        for name in missing {
            self.requested.insert(name.clone());
            tasks.push(self.fetch_sprite(name, CARD_SPRITE_SIZE));
        }
        Task::batch(tasks)
    }

    fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            iced::time::every(POLL_INTERVAL).map(|_| Message::Tick),
            window::close_requests().map(|_| Message::CloseRequested),
        ])
    }

    fn theme(&self) -> iced::Theme {
        match self.tracker.theme() {
            Theme::Dark => iced::Theme::Dark,
            Theme::Light => iced::Theme::Light,
        }
    }
}

fn main() -> iced::Result {
    init_logger();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    iced::application("Shiny Counter", App::update, App::view)
        .subscription(App::subscription)
        .theme(App::theme)
        .window(window::Settings {
            size: iced::Size::new(1100.0, 720.0),
            exit_on_close_request: false,
            ..Default::default()
        })
        .run_with(move || {
            let mut app = App::new(config_path);
            let task = Task::batch([app.sync_current(), app.request_card_sprites()]);
            (app, task)
        })
}
