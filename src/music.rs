use anyhow::Context;
use itertools::Itertools;
use log::{info, warn};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Background music: every audio file in the music directory, played in
/// order and looped
#[derive(Debug, Default)]
pub struct Playlist {
    tracks: Vec<PathBuf>,
    position: usize,
}

impl Playlist {
    const EXTENSIONS: &'static [&'static str] = &["mp3", "ogg", "wav", "flac"];

    /// Load tracks from a directory. A missing directory means no music,
    /// which is fine
    pub fn load(dir: &Path) -> Self {
        match Self::scan(dir) {
            Ok(tracks) => {
                info!("Loaded {} music tracks from {}", tracks.len(), dir.display());
                Self::new(tracks)
            }
            Err(err) => {
                warn!("No music: {err:#}");
                Self::default()
            }
        }
    }

    pub fn new(tracks: Vec<PathBuf>) -> Self {
        Self {
            tracks,
            position: 0,
        }
    }

    fn scan(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let entries = fs::read_dir(dir).with_context(|| {
            format!("Error reading music directory {}", dir.display())
        })?;
        Ok(entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|extension| extension.to_str())
                    .is_some_and(|extension| {
                        Self::EXTENSIONS
                            .contains(&extension.to_ascii_lowercase().as_str())
                    })
            })
            .sorted()
            .collect())
    }

    pub fn current(&self) -> Option<&Path> {
        self.tracks.get(self.position).map(PathBuf::as_path)
    }

    /// Move to the next track, looping at the end
    pub fn advance(&mut self) -> Option<&Path> {
        if self.tracks.is_empty() {
            return None;
        }
        self.position = (self.position + 1) % self.tracks.len();
        self.current()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
