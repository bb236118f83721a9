//! Sprites and species names from PokeAPI, cached on disk by name and size.
//!
//! The cache is never evicted.

use std::path::{Path, PathBuf};

use anyhow::Context;
use image::imageops::FilterType;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    odds::generation_range,
    record::{base_name, capitalize},
};

pub const API_BASE_URL: &str = "https://pokeapi.co/api/v2";
pub const DEFAULT_SPRITE_URL: &str =
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/0.png";

pub const MAIN_SPRITE_SIZE: u32 = 150;
pub const CARD_SPRITE_SIZE: u32 = 80;

#[derive(Debug, Deserialize)]
struct Sprites {
    front_shiny: Option<String>,
    front_default: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PokemonResp {
    sprites: Sprites,
}

#[derive(Debug, Deserialize)]
struct NamedResource {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GenerationResp {
    pokemon_species: Vec<NamedResource>,
}

#[derive(Debug, Clone)]
pub struct SpriteCache {
    dir: PathBuf,
    api_base: String,
    default_sprite_url: String,
    client: reqwest::Client,
}

impl SpriteCache {
    pub fn new(dir: impl AsRef<Path>, api_base: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("melon-shiny-hunter")
            .build()
            .unwrap_or_default();
        Self {
            dir: dir.as_ref().to_owned(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            default_sprite_url: DEFAULT_SPRITE_URL.to_string(),
            client,
        }
    }

    pub fn with_default_sprite_url(mut self, url: impl Into<String>) -> Self {
        self.default_sprite_url = url.into();
        self
    }

    /// `<dir>/<base name>_<size>x<size>.png`
    pub fn cache_path(&self, name: &str, size: u32) -> PathBuf {
        self.dir
            .join(format!("{}_{size}x{size}.png", base_name(name)))
    }

    fn fallback_path(&self, size: u32) -> PathBuf {
        self.dir.join(format!("_default_{size}x{size}.png"))
    }

    /// The shiny sprite of `name`, falling back to its normal one
    pub async fn fetch(&self, name: &str, size: u32) -> anyhow::Result<PathBuf> {
        let path = self.cache_path(name, size);
        if path.exists() {
            return Ok(path);
        }

        let base = base_name(name);
        let resp: PokemonResp = self
            .client
            .get(format!("{}/pokemon/{}", self.api_base, base))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .with_context(|| format!("decode pokemon {base}"))?;
        let url = resp
            .sprites
            .front_shiny
            .or(resp.sprites.front_default)
            .ok_or_else(|| anyhow::anyhow!("{base} has no sprite"))?;

        self.download(&url, size, &path).await?;
        info!("cached sprite {}", path.display());
        Ok(path)
    }

    /// The placeholder sprite
    pub async fn fallback(&self, size: u32) -> anyhow::Result<PathBuf> {
        let path = self.fallback_path(size);
        if !path.exists() {
            self.download(&self.default_sprite_url, size, &path).await?;
        }
        Ok(path)
    }

    pub async fn fetch_or_fallback(&self, name: &str, size: u32) -> anyhow::Result<PathBuf> {
        match self.fetch(name, size).await {
            Ok(path) => Ok(path),
            Err(err) => {
                warn!("Error loading image for {name}: {err:#}");
                self.fallback(size).await
            }
        }
    }

    async fn download(&self, url: &str, size: u32, path: &Path) -> anyhow::Result<()> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = path.to_owned();
        tokio::task::spawn_blocking(move || save_resized(&bytes, size, &path))
            .await?
            .with_context(|| format!("decode image from {url}"))
    }

    /// Species introduced in generation `gen`, capitalized
    pub async fn generation_species(&self, gen: u8) -> anyhow::Result<Vec<String>> {
        let resp: GenerationResp = self
            .client
            .get(format!("{}/generation/{}", self.api_base, gen))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp
            .pokemon_species
            .into_iter()
            .map(|s| capitalize(&s.name))
            .collect())
    }

    /// Every species up to generation `gen`, sorted
    ///
    /// A generation that cannot be fetched is filled with `Pokémon <dex number>` placeholders.
    pub async fn species_up_to(&self, gen: u8) -> Vec<String> {
        let mut species = vec![];
        for g in 1..=gen.max(1) {
            match self.generation_species(g).await {
                Ok(names) => species.extend(names),
                Err(err) => {
                    warn!("failed to fetch generation {g}: {err:#}");
                    let (first, last) = generation_range(g);
                    species.extend((first..=last).map(|i| format!("Pokémon {i}")));
                }
            }
        }
        species.sort();
        species.dedup();
        species
    }
}

/// Decode `bytes`, scale them to `size`x`size` and write the png to `path`
fn save_resized(bytes: &[u8], size: u32, path: &Path) -> anyhow::Result<()> {
    let img = image::load_from_memory(bytes)?.resize_exact(size, size, FilterType::Lanczos3);
    img.save(path)
        .with_context(|| format!("save {}", path.display()))
}
