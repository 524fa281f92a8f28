//! Project export/import
//!
//! A project file is the marker set plus global controls and a small
//! metadata block, stored as camelCase JSON. Audio is referenced by path
//! only.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AudiomarkError, Result};
use crate::markers::Marker;
use crate::store::{AppStore, GlobalControls};

/// Version written into new project files.
pub const PROJECT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: String,
}

impl ProjectMetadata {
    fn fresh() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            version: PROJECT_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectData {
    #[serde(default)]
    pub audio_file_path: String,
    #[serde(default)]
    pub markers: Vec<Marker>,
    #[serde(default)]
    pub global_controls: GlobalControls,
    pub metadata: ProjectMetadata,
}

impl ProjectData {
    pub fn new(audio_file_path: impl Into<String>) -> Self {
        Self {
            audio_file_path: audio_file_path.into(),
            markers: Vec::new(),
            global_controls: GlobalControls::default(),
            metadata: ProjectMetadata::fresh(),
        }
    }

    /// Capture the current markers and controls.
    pub fn from_store(store: &AppStore, audio_file_path: impl Into<String>) -> Self {
        Self {
            markers: store.markers.as_slice().to_vec(),
            global_controls: store.global_controls,
            ..Self::new(audio_file_path)
        }
    }

    /// Push markers and controls into a store.
    pub fn apply_to(&self, store: &mut AppStore) -> Result<()> {
        store.load_project(self.markers.clone(), self.global_controls)
    }

    /// Refresh `updatedAt`.
    pub fn touch(&mut self) {
        self.metadata.updated_at = Utc::now();
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and check every marker's `start < end`.
    pub fn from_json(json: &str) -> Result<Self> {
        let project: Self = serde_json::from_str(json)?;
        project.validate()?;
        Ok(project)
    }

    pub fn validate(&self) -> Result<()> {
        for marker in &self.markers {
            marker.check_order()?;
        }
        let mut ids: Vec<&str> = self.markers.iter().map(|m| m.id.as_str()).collect();
        ids.sort_unstable();
        if let Some(pair) = ids.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(AudiomarkError::DuplicateMarker {
                id: pair[0].to_string(),
            });
        }
        Ok(())
    }

    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.touch();
        fs::write(path, self.to_json()?)?;
        info!("[PROJECT] Saved {} markers to {}", self.markers.len(), path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let project = Self::from_json(&content)?;
        info!(
            "[PROJECT] Loaded {} markers from {}",
            project.markers.len(),
            path.display()
        );
        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut store = AppStore::new();
        store.set_duration(60.0);
        store
            .add_marker(Marker::with_id("m1", "Intro", 0.0, 8.0).unwrap().with_color("#3fa"))
            .unwrap();
        store.set_playback_rate(0.75);

        let mut project = ProjectData::from_store(&store, "/music/take.wav");
        project.save(&path).unwrap();

        let loaded = ProjectData::load(&path).unwrap();
        assert_eq!(loaded.audio_file_path, "/music/take.wav");
        assert_eq!(loaded.markers, project.markers);
        assert_eq!(loaded.global_controls.playback_rate, 0.75);
        assert_eq!(loaded.metadata.version, PROJECT_VERSION);

        let mut restored = AppStore::new();
        loaded.apply_to(&mut restored).unwrap();
        assert_eq!(restored.markers.get("m1").unwrap().label, "Intro");
    }

    #[test]
    fn test_json_uses_camel_case() {
        let project = ProjectData::new("a.mp3");
        let json: serde_json::Value = serde_json::from_str(&project.to_json().unwrap()).unwrap();
        assert!(json.get("audioFilePath").is_some());
        assert!(json.get("globalControls").is_some());
        assert!(json["metadata"].get("createdAt").is_some());
        assert_eq!(json["globalControls"]["playbackRate"], 1.0);
    }

    #[test]
    fn test_rejects_inverted_marker() {
        let json = r#"{
            "audioFilePath": "a.wav",
            "markers": [{"id": "x", "start": 9, "end": 3, "name": "Bad"}],
            "globalControls": {"pitch": 0, "volume": 1, "playbackRate": 1},
            "metadata": {"createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-01T00:00:00Z", "version": "1.0.0"}
        }"#;
        assert!(matches!(
            ProjectData::from_json(json),
            Err(AudiomarkError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let mut project = ProjectData::new("a.wav");
        project.markers = vec![
            Marker::with_id("x", "One", 0.0, 1.0).unwrap(),
            Marker::with_id("x", "Two", 2.0, 3.0).unwrap(),
        ];
        assert!(matches!(
            project.validate(),
            Err(AudiomarkError::DuplicateMarker { .. })
        ));
    }
}
