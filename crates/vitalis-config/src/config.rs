//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vitalis_animation::{AnimationQuality, AnimationSettings, MAX_SPEED};
use vitalis_assets::{LoaderSettings, MemoryTier, RetryPolicy};
use vitalis_geometry::DetailLevel;
use vitalis_lod::{DeadBand, LodSettings, LodThresholds, PlatformProfile};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level viewer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Detail selection and culling.
    pub lod: LodConfig,
    /// Triangle budget.
    pub budget: BudgetConfig,
    /// Model streaming and resident memory.
    pub memory: MemoryConfig,
    /// Animation defaults.
    pub animation: AnimationConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Level-of-detail configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LodConfig {
    /// Distance below which structures render at closeup detail.
    pub near: f32,
    /// Distance below which structures render at near detail.
    pub medium: f32,
    /// Distance below which structures render at medium detail.
    pub far: f32,
    /// Hysteresis band around each threshold.
    pub dead_band: DeadBand,
    /// Crossfade duration between detail levels, seconds.
    pub transition_seconds: f32,
    /// Camera travel that forces a budget reallocation.
    pub realloc_distance: f32,
    /// Frames between reallocations with a still camera.
    pub realloc_interval_frames: u32,
    /// Frames between occlusion passes.
    pub occlusion_interval_frames: u32,
}

/// Triangle budget configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BudgetConfig {
    /// Device class the budget is derived from.
    pub platform: PlatformProfile,
    /// Replaces the platform budget when set.
    pub triangle_budget: Option<u64>,
    /// Selected structures are never starved below this level.
    pub selected_min_level: DetailLevel,
}

/// Model streaming configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MemoryConfig {
    /// Resident model memory class.
    pub memory_tier: MemoryTier,
    /// Replaces the tier's budget when set, in MiB.
    pub memory_budget_mb: Option<u64>,
    /// Downloads allowed at once.
    pub max_concurrent_loads: usize,
    /// Fetch/decode threads.
    pub worker_threads: usize,
    /// First retry delay after a failed load, seconds.
    pub retry_base_seconds: f32,
    /// Longest retry delay, seconds.
    pub retry_max_seconds: f32,
    /// Attempts before a load gives up.
    pub retry_max_attempts: u32,
    /// Directory manifest paths are resolved against.
    pub asset_root: PathBuf,
    /// Manifest file name inside `asset_root`.
    pub manifest_file: String,
}

/// Animation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnimationConfig {
    /// Starting animation quality.
    pub quality: AnimationQuality,
    /// Heart rate, beats per minute.
    pub heart_bpm: f32,
    /// Respiration rate, breaths per minute.
    pub breaths_per_minute: f32,
    /// Playback speed multiplier.
    pub speed: f32,
    /// Blood cell pool size.
    pub blood_particles: usize,
    /// Lymph particle pool size.
    pub lymph_particles: usize,
    /// Nerve pulse pool size.
    pub nerve_pulses: usize,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Frames between frame statistics log lines (0 disables them).
    pub stats_interval_frames: u32,
}

// --- Default implementations ---

impl Default for LodConfig {
    fn default() -> Self {
        let thresholds = LodThresholds::default();
        let lod = LodSettings::default();
        Self {
            near: thresholds.near,
            medium: thresholds.medium,
            far: thresholds.far,
            dead_band: lod.dead_band,
            transition_seconds: lod.transition_seconds,
            realloc_distance: lod.realloc_distance,
            realloc_interval_frames: lod.realloc_interval_frames,
            occlusion_interval_frames: lod.occlusion_interval_frames,
        }
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            platform: PlatformProfile::default(),
            triangle_budget: None,
            selected_min_level: DetailLevel::Near,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        let loader = LoaderSettings::default();
        Self {
            memory_tier: loader.memory_tier,
            memory_budget_mb: None,
            max_concurrent_loads: loader.max_concurrent,
            worker_threads: loader.worker_threads,
            retry_base_seconds: loader.retry.base_delay_seconds,
            retry_max_seconds: loader.retry.max_delay_seconds,
            retry_max_attempts: loader.retry.max_attempts,
            asset_root: PathBuf::from("assets"),
            manifest_file: "manifest.ron".to_string(),
        }
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        let animation = AnimationSettings::default();
        Self {
            quality: animation.quality,
            heart_bpm: animation.heart_bpm,
            breaths_per_minute: animation.breaths_per_minute,
            speed: animation.speed,
            blood_particles: animation.blood.flow.max_particles,
            lymph_particles: animation.lymph.flow.max_particles,
            nerve_pulses: animation.nerve.max_pulses,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            stats_interval_frames: 120,
        }
    }
}

// --- Conversion into subsystem settings ---

impl Config {
    pub fn lod_settings(&self) -> LodSettings {
        LodSettings {
            thresholds: LodThresholds {
                near: self.lod.near,
                medium: self.lod.medium,
                far: self.lod.far,
            },
            dead_band: self.lod.dead_band,
            transition_seconds: self.lod.transition_seconds,
            realloc_distance: self.lod.realloc_distance,
            realloc_interval_frames: self.lod.realloc_interval_frames,
            occlusion_interval_frames: self.lod.occlusion_interval_frames,
            selected_min_level: self.budget.selected_min_level,
            triangle_budget: self
                .budget
                .triangle_budget
                .unwrap_or_else(|| self.budget.platform.triangle_budget()),
        }
    }

    pub fn loader_settings(&self) -> LoaderSettings {
        LoaderSettings {
            memory_tier: self.memory.memory_tier,
            memory_budget_bytes: self.memory.memory_budget_mb.map(|mb| mb * 1024 * 1024),
            max_concurrent: self.memory.max_concurrent_loads,
            worker_threads: self.memory.worker_threads,
            retry: RetryPolicy {
                base_delay_seconds: self.memory.retry_base_seconds,
                max_delay_seconds: self.memory.retry_max_seconds,
                max_attempts: self.memory.retry_max_attempts,
            },
        }
    }

    pub fn animation_settings(&self) -> AnimationSettings {
        let mut settings = AnimationSettings {
            quality: self.animation.quality,
            speed: self.animation.speed,
            heart_bpm: self.animation.heart_bpm,
            breaths_per_minute: self.animation.breaths_per_minute,
            ..AnimationSettings::default()
        };
        settings.blood.flow.max_particles = self.animation.blood_particles;
        settings.lymph.flow.max_particles = self.animation.lymph_particles;
        settings.nerve.max_pulses = self.animation.nerve_pulses;
        settings
    }

    /// Path of the asset manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.memory.asset_root.join(&self.memory.manifest_file)
    }

    /// Per-user config directory, if the platform has one.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vitalis"))
    }

    /// Check values that parse but would break a subsystem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: String| Err(ConfigError::Invalid { field, reason });

        let thresholds = LodThresholds {
            near: self.lod.near,
            medium: self.lod.medium,
            far: self.lod.far,
        };
        if !thresholds.is_valid() {
            return invalid(
                "lod.near/medium/far",
                format!(
                    "must be positive and strictly increasing, got {} / {} / {}",
                    self.lod.near, self.lod.medium, self.lod.far
                ),
            );
        }
        if !self.lod.dead_band.is_valid() {
            return invalid("lod.dead_band", format!("{:?} is out of range", self.lod.dead_band));
        }
        if !self.lod.transition_seconds.is_finite() || self.lod.transition_seconds < 0.0 {
            return invalid("lod.transition_seconds", "must be zero or positive".to_string());
        }
        if self.budget.triangle_budget == Some(0) {
            return invalid("budget.triangle_budget", "must be positive".to_string());
        }
        if self.memory.max_concurrent_loads == 0 {
            return invalid("memory.max_concurrent_loads", "must be at least 1".to_string());
        }
        if self.memory.worker_threads == 0 {
            return invalid("memory.worker_threads", "must be at least 1".to_string());
        }
        if !(self.memory.retry_base_seconds > 0.0
            && self.memory.retry_base_seconds <= self.memory.retry_max_seconds)
        {
            return invalid(
                "memory.retry_base_seconds",
                "must be positive and not above retry_max_seconds".to_string(),
            );
        }
        for (field, rate) in [
            ("animation.heart_bpm", self.animation.heart_bpm),
            ("animation.breaths_per_minute", self.animation.breaths_per_minute),
        ] {
            if !rate.is_finite() || rate <= 0.0 {
                return invalid(field, format!("must be positive, got {rate}"));
            }
        }
        if !(0.0..=MAX_SPEED).contains(&self.animation.speed) {
            return invalid(
                "animation.speed",
                format!("must be within 0..={MAX_SPEED}, got {}", self.animation.speed),
            );
        }
        Ok(())
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("heart_bpm: 75.0"));
        assert!(ron_str.contains("platform: Mobile"));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    /// A file missing whole sections still loads with defaults.
    #[test]
    fn test_missing_field_uses_default() {
        let ron_str = "(lod: (near: 2.0), debug: ())";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.lod.near, 2.0);
        assert_eq!(config.lod.medium, LodConfig::default().medium);
        assert_eq!(config.memory, MemoryConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_defaults_validate() {
        Config::default().validate().unwrap();
    }

    /// Defaults convert to the same settings each subsystem uses on its own.
    #[test]
    fn test_defaults_match_subsystems() {
        let config = Config::default();
        assert_eq!(config.lod_settings(), LodSettings::default());
        assert_eq!(config.animation_settings(), AnimationSettings::default());
        assert_eq!(config.loader_settings().memory_limit(), MemoryTier::Medium.budget_bytes());
    }

    #[test]
    fn test_overrides_convert() {
        let mut config = Config::default();
        config.budget.platform = PlatformProfile::Desktop;
        config.memory.memory_budget_mb = Some(10);
        config.animation.blood_particles = 50;
        assert_eq!(config.lod_settings().triangle_budget, 2_000_000);
        config.budget.triangle_budget = Some(1234);
        assert_eq!(config.lod_settings().triangle_budget, 1234);
        assert_eq!(config.loader_settings().memory_limit(), 10 * 1024 * 1024);
        assert_eq!(config.animation_settings().blood.flow.max_particles, 50);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.lod.medium = config.lod.far;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "lod.near/medium/far", .. })
        ));

        let mut config = Config::default();
        config.animation.heart_bpm = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.memory.worker_threads = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.lod.dead_band = DeadBand::Fraction(1.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.memory.memory_tier = MemoryTier::Low;
        config.lod.dead_band = DeadBand::Absolute(2.0);
        config.animation.quality = AnimationQuality::Educational;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.animation.heart_bpm = 90.0;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.unwrap().animation.heart_bpm, 90.0);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();
        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.ron"), "{{not valid}}").unwrap();
        assert!(matches!(
            Config::load_or_create(dir.path()),
            Err(ConfigError::ParseError(_))
        ));
    }
}
