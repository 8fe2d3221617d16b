use crate::api::models::Track;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueState {
    pub tracks: Vec<Track>,
    pub current_index: Option<usize>,
}

/// Queue snapshot for disk persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedQueueState {
    pub tracks: Vec<Track>,
    pub current_index: Option<usize>,
}

/// Ordered play queue. Duplicates are allowed; the cursor remembers which
/// occurrence is playing so navigation stays cyclic.
#[derive(Debug, Default)]
pub struct PlaybackQueue {
    tracks: Vec<Track>,
    cursor: Option<usize>,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tracks(&mut self, tracks: Vec<Track>) {
        self.tracks = tracks;
        self.cursor = None;
    }

    pub fn add_track(&mut self, track: Track) {
        self.tracks.push(track);
    }

    pub fn remove_track(&mut self, index: usize) -> Option<Track> {
        if index >= self.tracks.len() {
            return None;
        }

        let removed = self.tracks.remove(index);
        if let Some(current) = self.cursor {
            if index < current {
                self.cursor = Some(current - 1);
            } else if index == current {
                self.cursor = None;
            }
        }
        Some(removed)
    }

    pub fn move_track(&mut self, from: usize, to: usize) {
        if from >= self.tracks.len() || to >= self.tracks.len() {
            return;
        }

        let track = self.tracks.remove(from);
        self.tracks.insert(to, track);

        if let Some(current) = self.cursor {
            if from == current {
                self.cursor = Some(to);
            } else if from < current && to >= current {
                self.cursor = Some(current - 1);
            } else if from > current && to <= current {
                self.cursor = Some(current + 1);
            }
        }
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.cursor = None;
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Point the cursor at `index`, or drop it when out of range.
    pub fn set_cursor(&mut self, index: Option<usize>) {
        self.cursor = index.filter(|&i| i < self.tracks.len());
    }

    /// Swap in `resolved` at `index` if that entry is still the same track
    /// and has no playable source yet.
    pub fn resolve_entry(&mut self, index: usize, resolved: &Track) -> bool {
        match self.tracks.get_mut(index) {
            Some(entry) if entry.id == resolved.id && entry.source.is_unresolved() => {
                *entry = resolved.clone();
                true
            }
            _ => false,
        }
    }

    /// Position of `track_id`, preferring the occurrence under the cursor.
    pub fn locate(&self, track_id: &str) -> Option<usize> {
        match self.cursor {
            Some(i) if self.tracks.get(i).is_some_and(|t| t.id == track_id) => Some(i),
            _ => self.tracks.iter().position(|t| t.id == track_id),
        }
    }

    /// The neighbour of `track_id` in `direction`, wrapping at both ends.
    /// `None` when the queue is empty or the track is not in it.
    pub fn neighbor(&self, track_id: &str, direction: Direction) -> Option<(usize, &Track)> {
        let len = self.tracks.len();
        let index = self.locate(track_id)?;
        let target = match direction {
            Direction::Forward => (index + 1) % len,
            Direction::Backward => (index + len - 1) % len,
        };
        self.tracks.get(target).map(|t| (target, t))
    }

    pub fn state(&self) -> QueueState {
        QueueState {
            tracks: self.tracks.clone(),
            current_index: self.cursor,
        }
    }

    pub fn persisted_state(&self) -> PersistedQueueState {
        PersistedQueueState {
            tracks: self.tracks.clone(),
            current_index: self.cursor,
        }
    }

    pub fn restore_from_persisted(&mut self, state: PersistedQueueState) {
        self.tracks = state.tracks;
        self.set_cursor(state.current_index);
    }
}
