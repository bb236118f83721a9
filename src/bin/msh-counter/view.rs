use iced::{
    widget::{
        button, column, container, horizontal_space, pick_list, row, scrollable, text,
        text_editor, text_input, Column, Image,
    },
    Alignment, Element, Length,
};
use msh_tracker::{
    odds::{GAMES, HUNT_METHODS},
    record::{capitalize, PokemonRecord, SortBy, SortOrder},
    sprite::{CARD_SPRITE_SIZE, MAIN_SPRITE_SIZE},
    tracker::{record_summary, Adjust, HuntFilter},
};

use crate::{App, Message, Picker, Screen};

/// Species shown at once in the picker
const SPECIES_SHOWN: usize = 60;

impl App {
    pub fn view(&self) -> Element<'_, Message> {
        let body = match &self.screen {
            Screen::Hunts => row![
                container(self.current_panel())
                    .padding(10)
                    .width(Length::FillPortion(2)),
                container(self.hunts_panel())
                    .padding(10)
                    .width(Length::FillPortion(3)),
            ]
            .into(),
            Screen::Species(picker) => self.species_picker(*picker),
            Screen::Notes(name) => self.notes_editor(name),
        };
        column![self.toolbar(), body, text(&self.status).size(14)]
            .spacing(10)
            .padding(10)
            .into()
    }

    fn toolbar(&self) -> Element<'_, Message> {
        row![
            button("New Hunt").on_press(Message::OpenPicker(Picker::NewHunt)),
            button("Phase").on_press_maybe(
                self.tracker
                    .current()
                    .map(|_| Message::OpenPicker(Picker::Phase))
            ),
            horizontal_space(),
            button("Launch Controller").on_press(Message::LaunchController),
            button("Toggle Theme")
                .style(button::secondary)
                .on_press(Message::ToggleTheme),
        ]
        .spacing(10)
        .into()
    }

    fn current_panel(&self) -> Element<'_, Message> {
        let Some(name) = self.tracker.current() else {
            return column![
                text("No hunt loaded").size(24),
                text("Start a new hunt or load one from the list"),
            ]
            .spacing(10)
            .into();
        };

        let sprite: Element<'_, Message> = match &self.main_sprite {
            Some(handle) => Image::new(handle.clone())
                .width(MAIN_SPRITE_SIZE as f32)
                .height(MAIN_SPRITE_SIZE as f32)
                .into(),
            None => container(text("Loading..."))
                .width(MAIN_SPRITE_SIZE as f32)
                .height(MAIN_SPRITE_SIZE as f32)
                .center(MAIN_SPRITE_SIZE as f32)
                .into(),
        };

        let games: Vec<String> = GAMES.iter().map(|(game, _)| game.to_string()).collect();
        let methods: Vec<String> = HUNT_METHODS.iter().map(|m| m.to_string()).collect();

        column![
            text(capitalize(name)).size(28),
            sprite,
            text(self.tracker.summary()).size(18),
            row![
                button(text("-").size(20)).on_press(Message::Adjust(Adjust::Decrease)),
                button(text("+").size(20)).on_press(Message::Adjust(Adjust::Increase)),
                button("Reset")
                    .style(button::danger)
                    .on_press(Message::Adjust(Adjust::Reset)),
            ]
            .spacing(10)
            .align_y(Alignment::Center),
            row![
                text("Amount"),
                text_input("1", &self.amount_input)
                    .on_input(Message::AmountChanged)
                    .width(80.0),
            ]
            .spacing(10)
            .align_y(Alignment::Center),
            pick_list(
                games,
                self.tracker.game().map(str::to_string),
                Message::GameSelected
            )
            .placeholder("Game"),
            pick_list(
                methods,
                Some(self.tracker.method().to_string()),
                Message::MethodSelected
            ),
            button("Notes").on_press(Message::EditNotes(name.to_string())),
        ]
        .spacing(12)
        .into()
    }

    fn hunts_panel(&self) -> Element<'_, Message> {
        let filters = row(HuntFilter::ALL.into_iter().map(|filter| {
            let style = if filter == self.filter {
                button::primary
            } else {
                button::secondary
            };
            button(filter.label())
                .style(style)
                .on_press(Message::FilterSelected(filter))
                .into()
        }))
        .spacing(5);

        let data = self.tracker.data();
        let sorting = row![
            text_input("Search notes...", &self.note_query).on_input(Message::NoteQueryChanged),
            pick_list(SortBy::ALL, Some(data.sort_by), Message::SortBySelected),
            pick_list(SortOrder::ALL, Some(data.sort_order), Message::SortOrderSelected),
        ]
        .spacing(5);

        let records = self.tracker.filtered(self.filter, &self.note_query);
        let cards: Element<'_, Message> = if records.is_empty() {
            text("No hunts").into()
        } else {
            Column::with_children(records.into_iter().map(|r| self.card(r)))
                .spacing(8)
                .into()
        };

        column![filters, sorting, scrollable(cards).height(Length::Fill)]
            .spacing(10)
            .into()
    }

    fn card<'a>(&'a self, record: &'a PokemonRecord) -> Element<'a, Message> {
        let size = CARD_SPRITE_SIZE as f32;
        let sprite: Element<'_, Message> = match self.card_sprites.get(&record.name) {
            Some(handle) => Image::new(handle.clone()).width(size).height(size).into(),
            None => container(text("")).width(size).height(size).into(),
        };

        let mut actions = column![].spacing(5);
        if record.target.is_none() {
            actions = actions.push(button("Load").on_press(Message::LoadHunt(record.name.clone())));
        }
        actions = actions
            .push(button("Notes").on_press(Message::EditNotes(record.name.clone())))
            .push(
                button(text(format!("Mark {}", record.status.next())))
                    .style(button::secondary)
                    .on_press(Message::ToggleStatus(record.name.clone())),
            );

        let mut info = column![
            text(record.display_name()).size(18),
            text(record.display_status()).size(14),
            text(record_summary(record)).size(14),
        ]
        .spacing(2);
        if let Some(notes) = record.notes.as_deref().filter(|n| !n.is_empty()) {
            info = info.push(text(format!("Notes: {notes}")).size(12));
        }

        container(
            row![sprite, info.width(Length::Fill), actions]
                .spacing(10)
                .align_y(Alignment::Center),
        )
        .padding(8)
        .style(container::bordered_box)
        .width(Length::Fill)
        .into()
    }

    fn species_picker(&self, picker: Picker) -> Element<'_, Message> {
        let title = match picker {
            Picker::NewHunt => "New hunt".to_string(),
            Picker::Phase => format!(
                "Phase while hunting {}",
                capitalize(self.tracker.current().unwrap_or_default())
            ),
        };

        let query = self.species_query.trim().to_lowercase();
        let matches: Vec<&String> = self
            .species
            .iter()
            .filter(|s| s.to_lowercase().contains(&query))
            .take(SPECIES_SHOWN)
            .collect();

        let mut list = column![].spacing(4);
        if self.loading_species {
            list = list.push(text("Loading species..."));
        }
        let exact = matches.iter().any(|s| s.to_lowercase() == query);
        if !query.is_empty() && !exact {
            list = list.push(
                button(text(format!("Use \"{}\"", self.species_query.trim())))
                    .style(button::secondary)
                    .on_press(Message::SpeciesPicked(self.species_query.trim().to_string())),
            );
        }
        for species in matches {
            list = list.push(
                button(text(species.as_str()))
                    .width(Length::Fill)
                    .style(button::text)
                    .on_press(Message::SpeciesPicked(species.clone())),
            );
        }

        column![
            row![
                text(title).size(24),
                horizontal_space(),
                button("Back").on_press(Message::Back)
            ],
            text_input("Search Pokémon...", &self.species_query)
                .on_input(Message::SpeciesQueryChanged),
            scrollable(list).height(Length::Fill),
        ]
        .spacing(10)
        .into()
    }

    fn notes_editor<'a>(&'a self, name: &'a str) -> Element<'a, Message> {
        column![
            text(format!("Notes for {}", capitalize(name))).size(24),
            text_editor(&self.notes)
                .on_action(Message::NotesAction)
                .height(Length::Fill),
            row![
                button("Save").on_press(Message::SaveNotes),
                button("Cancel")
                    .style(button::secondary)
                    .on_press(Message::Back),
            ]
            .spacing(10),
        ]
        .spacing(10)
        .into()
    }
}
