//! Command-line argument parsing for the Vitalis viewer.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use vitalis_animation::AnimationQuality;
use vitalis_assets::MemoryTier;
use vitalis_lod::PlatformProfile;

use crate::Config;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum QualityArg {
    Off,
    Subtle,
    Standard,
    Educational,
}

impl From<QualityArg> for AnimationQuality {
    fn from(arg: QualityArg) -> Self {
        match arg {
            QualityArg::Off => AnimationQuality::Off,
            QualityArg::Subtle => AnimationQuality::Subtle,
            QualityArg::Standard => AnimationQuality::Standard,
            QualityArg::Educational => AnimationQuality::Educational,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PlatformArg {
    Mobile,
    Tablet,
    Desktop,
}

impl From<PlatformArg> for PlatformProfile {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Mobile => PlatformProfile::Mobile,
            PlatformArg::Tablet => PlatformProfile::Tablet,
            PlatformArg::Desktop => PlatformProfile::Desktop,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MemoryTierArg {
    Low,
    Medium,
    High,
}

impl From<MemoryTierArg> for MemoryTier {
    fn from(arg: MemoryTierArg) -> Self {
        match arg {
            MemoryTierArg::Low => MemoryTier::Low,
            MemoryTierArg::Medium => MemoryTier::Medium,
            MemoryTierArg::High => MemoryTier::High,
        }
    }
}

/// Vitalis viewer command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "vitalis", about = "Headless anatomy LOD and animation viewer")]
pub struct CliArgs {
    /// Animation quality tier.
    #[arg(long, value_enum)]
    pub quality: Option<QualityArg>,

    /// Device class for the triangle budget.
    #[arg(long, value_enum)]
    pub platform: Option<PlatformArg>,

    /// Device class for resident model memory.
    #[arg(long, value_enum)]
    pub memory_tier: Option<MemoryTierArg>,

    /// Number of frames to simulate.
    #[arg(long, default_value_t = 600)]
    pub frames: u32,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(quality) = args.quality {
            self.animation.quality = quality.into();
        }
        if let Some(platform) = args.platform {
            self.budget.platform = platform.into();
        }
        if let Some(tier) = args.memory_tier {
            self.memory.memory_tier = tier.into();
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
