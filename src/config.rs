// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::fs;
use std::path::{Path, PathBuf};

use crate::matrix::Dimensions;

mod error;
mod player;
mod show;

pub use error::ShowError;
pub use player::{Device, Player};

/// Parses and validates a show file for the given matrix dimensions.
pub fn parse_show(file: &Path, dimensions: Dimensions) -> Result<crate::show::Show, ShowError> {
    show::Show::deserialize(file)?.to_show(dimensions)
}

/// Recurses into the given path and returns the load result for every show
/// file found, in path order. Invalid shows are reported per file rather
/// than aborting the walk, so a single bad file doesn't hide the rest of the
/// repository.
pub fn get_all_shows(
    path: &Path,
    dimensions: Dimensions,
) -> Result<Vec<(PathBuf, Result<crate::show::Show, ShowError>)>, std::io::Error> {
    let mut shows = Vec::new();

    let mut entries: Vec<PathBuf> = fs::read_dir(path)?
        .collect::<Result<Vec<fs::DirEntry>, std::io::Error>>()?
        .into_iter()
        .map(|entry| entry.path())
        .collect();
    entries.sort();

    for entry in entries {
        if entry.is_dir() {
            shows.extend(get_all_shows(&entry, dimensions)?);
        } else if entry.extension().is_some_and(|ext| ext == "json") {
            let result = parse_show(&entry, dimensions);
            shows.push((entry, result));
        }
    }

    Ok(shows)
}
