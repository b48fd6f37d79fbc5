//! Games catalog and launching

use std::path::PathBuf;

use pet_launcher_core::{GameEntry, SearchResult};
use thiserror::Error;
use tracing::{info, warn};

use crate::platform;

/// Catalog editing errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Game name must not be empty")]
    EmptyName,

    #[error("Game path must not be empty")]
    EmptyPath,

    #[error("A game named '{0}' already exists")]
    Duplicate(String),

    #[error("No game named '{0}'")]
    NotFound(String),
}

/// Launch errors
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Game not found: {0:?}")]
    NotFound(PathBuf),

    #[error("Failed to launch {path:?}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Editing view over the games list of a config
pub struct Catalog<'a> {
    games: &'a mut Vec<GameEntry>,
}

impl<'a> Catalog<'a> {
    pub fn new(games: &'a mut Vec<GameEntry>) -> Self {
        Self { games }
    }

    /// All entries in menu order
    pub fn list(&self) -> &[GameEntry] {
        self.games.as_slice()
    }

    /// Look a game up by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&GameEntry> {
        self.position(name).map(|i| &self.games[i])
    }

    /// Add a new entry at the end of the list
    pub fn add(&mut self, name: &str, path: &str) -> Result<&GameEntry, CatalogError> {
        let (name, path) = validate(name, path)?;
        if self.position(&name).is_some() {
            return Err(CatalogError::Duplicate(name));
        }

        self.games.push(GameEntry::new(name, path));
        Ok(&self.games[self.games.len() - 1])
    }

    /// Add a search hit under its display name
    pub fn add_from_result(&mut self, result: &SearchResult) -> Result<&GameEntry, CatalogError> {
        let entry = GameEntry::from(result);
        self.add(&entry.name, &entry.path)
    }

    /// Rename an entry and/or point it at a new path
    pub fn edit(
        &mut self,
        name: &str,
        new_name: Option<&str>,
        new_path: Option<&str>,
    ) -> Result<&GameEntry, CatalogError> {
        let index = self
            .position(name)
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))?;

        let (new_name, new_path) = validate(
            new_name.unwrap_or(self.games[index].name.as_str()),
            new_path.unwrap_or(self.games[index].path.as_str()),
        )?;

        // Renaming onto another existing entry is not allowed
        if let Some(other) = self.position(&new_name) {
            if other != index {
                return Err(CatalogError::Duplicate(new_name));
            }
        }

        let entry = &mut self.games[index];
        entry.name = new_name;
        entry.path = new_path;
        Ok(&self.games[index])
    }

    /// Remove an entry, returning it
    pub fn remove(&mut self, name: &str) -> Result<GameEntry, CatalogError> {
        let index = self
            .position(name)
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))?;
        Ok(self.games.remove(index))
    }

    fn position(&self, name: &str) -> Option<usize> {
        let name = name.trim().to_lowercase();
        self.games
            .iter()
            .position(|game| game.name.to_lowercase() == name)
    }
}

fn validate(name: &str, path: &str) -> Result<(String, String), CatalogError> {
    let name = name.trim();
    let path = path.trim();
    if name.is_empty() {
        return Err(CatalogError::EmptyName);
    }
    if path.is_empty() {
        return Err(CatalogError::EmptyPath);
    }
    Ok((name.to_string(), path.to_string()))
}

/// Launch a game detached from this process; returns the child pid.
///
/// Menus are left open so several games can be started in a row.
pub fn launch(entry: &GameEntry) -> Result<u32, LaunchError> {
    let path = PathBuf::from(&entry.path);
    if !path.exists() {
        warn!("Game not found: {:?}", path);
        return Err(LaunchError::NotFound(path));
    }

    let child = platform::spawn_detached(&path)
        .map_err(|source| LaunchError::Spawn { path: path.clone(), source })?;

    info!("Launched {} ({:?}) as pid {}", entry.name, path, child.id());
    Ok(child.id())
}
