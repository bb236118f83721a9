//! msh-tracker is the encounter counter's model: hunt records and their JSON store,
//! shiny odds, the counter session and the sprite cache.

pub mod odds;
pub mod record;
pub mod sprite;
pub mod store;
pub mod tracker;

pub use record::{AppData, HuntStatus, PokemonRecord};
pub use store::Store;
pub use tracker::Tracker;
