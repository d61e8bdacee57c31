use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use space::Area;

use crate::error::PersistenceError;

/// Load every `*.toml` area file under `dir`, recursing into subdirectories.
///
/// Files are read in path order so the result is stable. Area names must be
/// unique across all files.
pub fn load_areas(dir: &Path) -> Result<Vec<Area>, PersistenceError> {
    tracing::info!(dir = %dir.display(), "Loading areas ...");

    let mut files = Vec::new();
    collect_toml_files(dir, &mut files)?;
    files.sort();

    let mut names = BTreeSet::new();
    let mut areas = Vec::with_capacity(files.len());
    for path in files {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            tracing::error!(path = %path.display(), "area file could not be loaded: {}", e);
            e
        })?;
        let area: Area = toml::from_str(&content).map_err(|e| {
            tracing::error!(path = %path.display(), "area file could not be decoded: {}", e);
            PersistenceError::from(e)
        })?;

        if !names.insert(area.name.clone()) {
            return Err(PersistenceError::DuplicateArea(area.name));
        }

        tracing::info!(area = %area.name, rooms = area.rooms.len(), "Loaded area");
        areas.push(area);
    }

    Ok(areas)
}

fn collect_toml_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), PersistenceError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_toml_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            out.push(path);
        }
    }
    Ok(())
}
