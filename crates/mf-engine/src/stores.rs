//! Track, output and settings stores

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use mf_core::{
    AudioBuffer, MasteringSession, MasteringSettings, OutputId, SettingsPatch, Track, TrackId,
};

// ═══════════════════════════════════════════════════════════════════════════════
// TRACKS
// ═══════════════════════════════════════════════════════════════════════════════

struct TrackEntry {
    track: Track,
    audio: Arc<AudioBuffer>,
    sessions: Vec<MasteringSession>,
}

/// Tracks, their decoded audio and their session history
#[derive(Default)]
pub struct TrackStore {
    tracks: RwLock<HashMap<TrackId, TrackEntry>>,
}

impl TrackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, track: Track, audio: AudioBuffer) -> TrackId {
        let id = track.id.clone();
        self.tracks.write().insert(
            id.clone(),
            TrackEntry {
                track,
                audio: Arc::new(audio),
                sessions: Vec::new(),
            },
        );
        id
    }

    pub fn get(&self, id: &TrackId) -> Option<Track> {
        self.tracks.read().get(id).map(|e| e.track.clone())
    }

    pub fn audio(&self, id: &TrackId) -> Option<Arc<AudioBuffer>> {
        self.tracks.read().get(id).map(|e| Arc::clone(&e.audio))
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.tracks.read().contains_key(id)
    }

    /// Edit a track in place; false for unknown ids
    pub fn update(&self, id: &TrackId, edit: impl FnOnce(&mut Track)) -> bool {
        match self.tracks.write().get_mut(id) {
            Some(entry) => {
                edit(&mut entry.track);
                entry.track.touch();
                true
            }
            None => false,
        }
    }

    pub fn add_session(&self, session: MasteringSession) -> bool {
        match self.tracks.write().get_mut(&session.track_id) {
            Some(entry) => {
                entry.sessions.push(session);
                true
            }
            None => false,
        }
    }

    /// Sessions oldest first
    pub fn sessions(&self, id: &TrackId) -> Vec<MasteringSession> {
        self.tracks
            .read()
            .get(id)
            .map(|e| e.sessions.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.tracks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Rendered buffers by output id
#[derive(Default)]
pub struct OutputStore {
    outputs: RwLock<HashMap<OutputId, Arc<AudioBuffer>>>,
}

impl OutputStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, buffer: AudioBuffer) -> OutputId {
        let id = OutputId::new();
        self.outputs.write().insert(id.clone(), Arc::new(buffer));
        id
    }

    pub fn get(&self, id: &OutputId) -> Option<Arc<AudioBuffer>> {
        self.outputs.read().get(id).cloned()
    }

    pub fn remove(&self, id: &OutputId) -> Option<Arc<AudioBuffer>> {
        self.outputs.write().remove(id)
    }

    pub fn len(&self) -> usize {
        self.outputs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SETTINGS
// ═══════════════════════════════════════════════════════════════════════════════

type SettingsSubscriber = Box<dyn Fn(&TrackId, &MasteringSettings) + Send + Sync>;

/// Current mastering settings per track
///
/// Writes are whole-value swaps under the write lock, so readers never see
/// a half-merged EQ. Subscribers run on the writer's thread, one writer at a
/// time and in commit order; they must not write back into this store.
#[derive(Default)]
pub struct SettingsStore {
    settings: RwLock<HashMap<TrackId, MasteringSettings>>,
    subscribers: RwLock<Vec<SettingsSubscriber>>,
    publishing: Mutex<()>,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &TrackId) -> Option<MasteringSettings> {
        self.settings.read().get(id).cloned()
    }

    /// Replace a track's settings
    pub fn set(&self, id: &TrackId, settings: MasteringSettings) {
        let _order = self.publishing.lock();
        self.settings.write().insert(id.clone(), settings.clone());
        self.publish(id, &settings);
    }

    /// Merge a patch into a track's settings (neutral when none yet)
    pub fn apply_patch(&self, id: &TrackId, patch: &SettingsPatch) -> MasteringSettings {
        let _order = self.publishing.lock();
        let next = {
            let mut settings = self.settings.write();
            let current = settings.entry(id.clone()).or_insert_with(MasteringSettings::neutral);
            let next = current.apply_patch(patch);
            *current = next.clone();
            next
        };
        self.publish(id, &next);
        next
    }

    /// Run `subscriber` after every committed change
    pub fn subscribe(&self, subscriber: impl Fn(&TrackId, &MasteringSettings) + Send + Sync + 'static) {
        self.subscribers.write().push(Box::new(subscriber));
    }

    fn publish(&self, id: &TrackId, settings: &MasteringSettings) {
        for subscriber in self.subscribers.read().iter() {
            subscriber(id, settings);
        }
    }
}
