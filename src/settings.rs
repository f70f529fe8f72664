//! Game settings and preferences
//!
//! Persisted separately from the leaderboard, under its own storage key.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{FIELD_HEIGHT, FIELD_WIDTH, MAX_FRAME_DT};
use crate::persistence::{self, Storage};

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Maximum particles for this preset
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 100,
            QualityPreset::Medium => 500,
            QualityPreset::High => 2000,
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Particle budget preset
    pub quality: QualityPreset,
    /// Particle effects (explosions, exhaust, trails)
    pub particles: bool,

    // === Field ===
    pub field_width: f32,
    pub field_height: f32,

    // === Timing ===
    /// Longest frame the simulation will advance in one step
    pub max_frame_dt: f32,
    /// Fixed RNG seed; a fresh one per run when absent
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            particles: true,
            field_width: FIELD_WIDTH,
            field_height: FIELD_HEIGHT,
            max_frame_dt: MAX_FRAME_DT,
            seed: None,
        }
    }
}

impl Settings {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "astro_drift_settings";

    /// Create settings from a quality preset
    pub fn from_preset(preset: QualityPreset) -> Self {
        Self {
            quality: preset,
            ..Self::default()
        }
    }

    /// Field extent as a vector
    pub fn bounds(&self) -> Vec2 {
        Vec2::new(self.field_width, self.field_height)
    }

    /// Effective particle count cap
    pub fn max_particles(&self) -> usize {
        if !self.particles {
            0
        } else {
            self.quality.max_particles()
        }
    }

    /// Replace values that would break the simulation with defaults
    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !(self.field_width.is_finite() && self.field_width > 0.0) {
            self.field_width = defaults.field_width;
        }
        if !(self.field_height.is_finite() && self.field_height > 0.0) {
            self.field_height = defaults.field_height;
        }
        if !(self.max_frame_dt.is_finite() && self.max_frame_dt > 0.0) {
            self.max_frame_dt = defaults.max_frame_dt;
        }
        self
    }

    /// Load settings; absent or corrupt data gives defaults
    pub fn load(storage: &dyn Storage) -> Self {
        match persistence::load_json::<Settings>(storage, Self::STORAGE_KEY) {
            Ok(Some(settings)) => {
                log::info!("Loaded settings");
                settings.sanitized()
            }
            Ok(None) => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(e) => {
                log::warn!("Settings unreadable ({e}), using defaults");
                Self::default()
            }
        }
    }

    /// Save settings
    pub fn save(&self, storage: &mut dyn Storage) {
        match persistence::save_json(storage, Self::STORAGE_KEY, self) {
            Ok(()) => log::info!("Settings saved"),
            Err(e) => log::warn!("Failed to save settings: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStorage;

    #[test]
    fn test_preset_parsing() {
        assert_eq!(QualityPreset::from_str("HIGH"), Some(QualityPreset::High));
        assert_eq!(QualityPreset::from_str("med"), Some(QualityPreset::Medium));
        assert_eq!(QualityPreset::from_str("ultra"), None);
        assert_eq!(QualityPreset::Low.as_str(), "Low");
    }

    #[test]
    fn test_particle_cap() {
        let mut settings = Settings::from_preset(QualityPreset::High);
        assert_eq!(settings.max_particles(), 2000);
        settings.particles = false;
        assert_eq!(settings.max_particles(), 0);
    }

    #[test]
    fn test_defaults_when_absent_or_corrupt() {
        let mut storage = MemoryStorage::new();
        assert_eq!(Settings::load(&storage), Settings::default());
        storage.write(Settings::STORAGE_KEY, "{\"quality\":").expect("write");
        assert_eq!(Settings::load(&storage), Settings::default());
    }

    #[test]
    fn test_save_load_and_partial_json() {
        let mut storage = MemoryStorage::new();
        let settings = Settings {
            seed: Some(42),
            ..Settings::from_preset(QualityPreset::Low)
        };
        settings.save(&mut storage);
        assert_eq!(Settings::load(&storage), settings);

        // Missing fields take defaults, nonsense values are replaced
        storage
            .write(Settings::STORAGE_KEY, "{\"quality\":\"High\",\"field_width\":-5.0}")
            .expect("write");
        let loaded = Settings::load(&storage);
        assert_eq!(loaded.quality, QualityPreset::High);
        assert_eq!(loaded.bounds(), Vec2::new(FIELD_WIDTH, FIELD_HEIGHT));
    }
}
