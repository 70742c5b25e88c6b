//! Configuration Vault – reads/writes `~/.wayguide/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use wayguide_nav::NavThresholds;
use wayguide_perception::FusionConfig;
use wayguide_runtime::GuideLoopConfig;
use wayguide_types::GuideError;

/// Which sensor drivers back the rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SensorMode {
    /// Scripted walk + bus route.
    #[default]
    Sim,
    /// Latest-value cells written by external drivers.
    Feed,
}

impl std::fmt::Display for SensorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorMode::Sim => write!(f, "sim"),
            SensorMode::Feed => write!(f, "feed"),
        }
    }
}

impl std::str::FromStr for SensorMode {
    type Err = GuideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sim" => Ok(SensorMode::Sim),
            "feed" => Ok(SensorMode::Feed),
            other => Err(GuideError::Config(format!("unknown sensor mode '{other}'"))),
        }
    }
}

/// Persisted user configuration stored in `~/.wayguide/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sensor_mode: SensorMode,

    /// Position fixes older than this read as "no fix" in feed mode.
    #[serde(default = "default_max_fix_age_ms")]
    pub max_fix_age_ms: u64,

    /// Announce / advance / arrival / off-route radii in metres.
    #[serde(default)]
    pub navigation: NavThresholds,

    #[serde(default)]
    pub fusion: FusionConfig,

    /// Tick periods, warning cooldown and feed deadlines.
    #[serde(default)]
    pub guide_loop: GuideLoopConfig,
}

fn default_max_fix_age_ms() -> u64 {
    5000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sensor_mode: SensorMode::default(),
            max_fix_age_ms: default_max_fix_age_ms(),
            navigation: NavThresholds::default(),
            fusion: FusionConfig::default(),
            guide_loop: GuideLoopConfig::default(),
        }
    }
}

impl Config {
    /// Reject radii and periods the session and loop cannot work with.
    pub fn validate(&self) -> Result<(), GuideError> {
        let nav = &self.navigation;
        for (name, value) in [
            ("announce_m", nav.announce_m),
            ("advance_m", nav.advance_m),
            ("arrival_m", nav.arrival_m),
            ("off_route_m", nav.off_route_m),
            ("stop_arrival_m", nav.stop_arrival_m),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(GuideError::Config(format!(
                    "navigation.{name} must be a positive distance, got {value}"
                )));
            }
        }
        if nav.advance_m > nav.announce_m {
            return Err(GuideError::Config(format!(
                "navigation.advance_m ({}) must not exceed announce_m ({})",
                nav.advance_m, nav.announce_m
            )));
        }
        if self.guide_loop.nav_period_ms == 0 || self.guide_loop.obstacle_period_ms == 0 {
            return Err(GuideError::Config(
                "guide_loop tick periods must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Return the path to `~/.wayguide/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".wayguide").join("config.toml")
}

/// Load the config from disk with `WAYGUIDE_*` overrides applied.
/// Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, GuideError> {
    let mut cfg = load_from(&config_path())?;
    if let Some(cfg) = cfg.as_mut() {
        apply_env_overrides(cfg);
        cfg.validate()?;
    }
    Ok(cfg)
}

/// Load the config from a specific path, without environment overrides.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, GuideError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        GuideError::Config(format!("failed to read {}: {}", path.display(), e))
    })?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| GuideError::Config(format!("failed to parse config: {}", e)))?;
    Ok(Some(cfg))
}

/// Apply `WAYGUIDE_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `WAYGUIDE_SENSOR_MODE` | `sensor_mode` |
/// | `WAYGUIDE_ANNOUNCE_M` | `navigation.announce_m` |
/// | `WAYGUIDE_OFF_ROUTE_M` | `navigation.off_route_m` |
/// | `WAYGUIDE_NAV_PERIOD_MS` | `guide_loop.nav_period_ms` |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("WAYGUIDE_SENSOR_MODE")
        && let Ok(mode) = v.parse::<SensorMode>()
    {
        cfg.sensor_mode = mode;
    }
    if let Ok(v) = std::env::var("WAYGUIDE_ANNOUNCE_M")
        && let Ok(m) = v.parse::<f64>()
    {
        cfg.navigation.announce_m = m;
    }
    if let Ok(v) = std::env::var("WAYGUIDE_OFF_ROUTE_M")
        && let Ok(m) = v.parse::<f64>()
    {
        cfg.navigation.off_route_m = m;
    }
    if let Ok(v) = std::env::var("WAYGUIDE_NAV_PERIOD_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        cfg.guide_loop.nav_period_ms = ms;
    }
}

/// Save the config to disk, creating `~/.wayguide/` if necessary.
pub fn save(cfg: &Config) -> Result<(), GuideError> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), GuideError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            GuideError::Config(format!("failed to create config directory: {}", e))
        })?;
        // Owner-only directory (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(|e| {
                GuideError::Config(format!("failed to set config directory permissions: {}", e))
            })?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| GuideError::Config(format!("failed to serialize config: {}", e)))?;
    let write_err =
        |e: std::io::Error| GuideError::Config(format!("failed to write {}: {}", path.display(), e));
    // Owner-only file (rw-------) on Unix.
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(write_err)?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(write_err)?;
    Ok(())
}
