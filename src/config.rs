//! Effect configuration.
//!
//! Every field has a default so a config file only needs the values it
//! overrides. The file is JSON and lives at `<config_dir>/flourish/config.json`
//! unless a path is given on the command line.

use iced::Color;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable forcing the reduced motion preference ("1"/"true").
pub const REDUCED_MOTION_ENV: &str = "FLOURISH_REDUCED_MOTION";

const CONFIG_DIR_NAME: &str = "flourish";
const CONFIG_FILE_NAME: &str = "config.json";

/// Largest magnitude accepted for any size, speed or distance.
const MAX_TUNING_MAGNITUDE: f64 = 10_000.0;
/// Largest particle capacity of a layer.
const MAX_CAPACITY: usize = 1_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Inclusive range used for randomized jitter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f32,
    pub max: f32,
}

impl Bounds {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        let (low, high) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        if !low.is_finite() || !high.is_finite() || !(high - low).is_finite() {
            return 0.0;
        }
        if (high - low).abs() < f32::EPSILON {
            return low;
        }
        rng.gen_range(low..=high)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailConfig {
    /// Lifetime in reference frames (60 per second).
    pub max_life: f32,
    pub size: Bounds,
    pub speed: Bounds,
    pub drag: f32,
    /// Minimum pointer travel between two bubbles.
    pub spacing: f64,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            max_life: 40.0,
            size: Bounds::new(3.0, 7.0),
            speed: Bounds::new(0.2, 1.2),
            drag: 0.94,
            spacing: 8.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SparkleConfig {
    pub max_life: f32,
    pub size: Bounds,
    pub speed: Bounds,
    /// Downward acceleration in pixels per reference frame squared.
    pub gravity: f32,
    /// Fraction of vertical speed kept after hitting the viewport floor.
    pub bounce: f32,
    pub points: u8,
    pub twinkle_speed: Bounds,
    pub rotation_speed: Bounds,
}

impl Default for SparkleConfig {
    fn default() -> Self {
        Self {
            max_life: 60.0,
            size: Bounds::new(2.0, 5.0),
            speed: Bounds::new(1.0, 3.0),
            gravity: 0.08,
            bounce: 0.6,
            points: 4,
            twinkle_speed: Bounds::new(0.15, 0.35),
            rotation_speed: Bounds::new(-0.1, 0.1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickConfig {
    pub max_life: f32,
    /// Sparkles thrown out radially around the click.
    pub ring_particles: usize,
    pub speed: Bounds,
    pub ring_radius: f32,
    pub ring_growth: f32,
    pub ring_stroke: f32,
    pub glow_radius: f32,
    pub glow_pulse_speed: f32,
}

impl Default for ClickConfig {
    fn default() -> Self {
        Self {
            max_life: 45.0,
            ring_particles: 6,
            speed: Bounds::new(2.0, 4.0),
            ring_radius: 5.0,
            ring_growth: 30.0,
            ring_stroke: 2.0,
            glow_radius: 24.0,
            glow_pulse_speed: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartConfig {
    pub max_life: f32,
    pub count: usize,
    pub size: Bounds,
    /// How far above the origin the hearts travel.
    pub rise: f32,
    pub spread: f32,
    /// Fraction of the remaining distance covered per reference frame.
    pub ease: f32,
}

impl Default for HeartConfig {
    fn default() -> Self {
        Self {
            max_life: 70.0,
            count: 3,
            size: Bounds::new(8.0, 12.0),
            rise: 60.0,
            spread: 30.0,
            ease: 0.08,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Scroll distance producing one sparkle.
    pub pixels_per_sparkle: f64,
    pub max_per_event: usize,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            pixels_per_sparkle: 40.0,
            max_per_event: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientConfig {
    pub interval_ms: u64,
    pub count: usize,
    pub mobile_count: usize,
    pub max_life: f32,
    pub size: Bounds,
    pub drift: Bounds,
}

impl Default for AmbientConfig {
    fn default() -> Self {
        Self {
            interval_ms: 400,
            count: 12,
            mobile_count: 5,
            max_life: 240.0,
            size: Bounds::new(1.0, 3.0),
            drift: Bounds::new(-0.2, 0.2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorConfig {
    pub dot_radius: f32,
    pub ring_radius: f32,
    /// Fraction of the remaining distance the ring covers per reference frame.
    pub ease: f64,
    pub pressed_scale: f32,
    pub color: String,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            dot_radius: 4.0,
            ring_radius: 18.0,
            ease: 0.2,
            pressed_scale: 0.7,
            color: "#B91801".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    /// Particle capacity of each layer on desktop.
    pub capacity: usize,
    pub mobile_capacity: usize,
    /// Viewports narrower than this (logical px) are treated as mobile.
    pub mobile_breakpoint: f64,
    pub frame_interval_ms: u64,
    pub mobile_frame_interval_ms: u64,
    pub reduced_motion: bool,
    pub palette: Vec<String>,
    pub trail: TrailConfig,
    pub sparkle: SparkleConfig,
    pub click: ClickConfig,
    pub heart: HeartConfig,
    pub scroll: ScrollConfig,
    pub ambient: AmbientConfig,
    pub cursor: CursorConfig,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            mobile_capacity: 20,
            mobile_breakpoint: 768.0,
            frame_interval_ms: 16,
            mobile_frame_interval_ms: 33,
            reduced_motion: false,
            palette: vec![
                "#FFD166".to_string(),
                "#EF476F".to_string(),
                "#06D6A0".to_string(),
                "#118AB2".to_string(),
                "#FFFFFF".to_string(),
            ],
            trail: TrailConfig::default(),
            sparkle: SparkleConfig::default(),
            click: ClickConfig::default(),
            heart: HeartConfig::default(),
            scroll: ScrollConfig::default(),
            ambient: AmbientConfig::default(),
            cursor: CursorConfig::default(),
        }
    }
}

impl EffectsConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EffectsConfig = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let json =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_json_str(&json)
    }

    /// Loads the explicit path if given, otherwise the default location when it
    /// exists, otherwise the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            log::info!("EffectsConfig::load: reading {}", path.display());
            return Self::from_path(path);
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                log::info!("EffectsConfig::load: reading {}", path.display());
                Self::from_path(&path)
            }
            _ => {
                log::info!("EffectsConfig::load: no config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Applies overrides coming from the process environment.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = std::env::var(REDUCED_MOTION_ENV) {
            self.reduced_motion = parse_flag(&value);
            log::info!(
                "EffectsConfig::with_env_overrides: reduced_motion={}",
                self.reduced_motion
            );
        }
        self
    }

    fn sanitized(mut self) -> Self {
        if self.capacity == 0 {
            log::warn!("EffectsConfig: capacity 0 is not allowed, using 1");
            self.capacity = 1;
        }
        if self.mobile_capacity == 0 {
            log::warn!("EffectsConfig: mobile_capacity 0 is not allowed, using 1");
            self.mobile_capacity = 1;
        }
        if self.frame_interval_ms == 0 {
            self.frame_interval_ms = 16;
        }
        if self.mobile_frame_interval_ms == 0 {
            self.mobile_frame_interval_ms = self.frame_interval_ms;
        }
        for max_life in [
            &mut self.trail.max_life,
            &mut self.sparkle.max_life,
            &mut self.click.max_life,
            &mut self.heart.max_life,
            &mut self.ambient.max_life,
        ] {
            if !max_life.is_finite() || *max_life < 1.0 {
                log::warn!("EffectsConfig: invalid max_life {max_life}, using 1");
                *max_life = 1.0;
            }
        }
        for capacity in [&mut self.capacity, &mut self.mobile_capacity] {
            if *capacity > MAX_CAPACITY {
                log::warn!("EffectsConfig: capacity {capacity} is too large, using {MAX_CAPACITY}");
                *capacity = MAX_CAPACITY;
            }
        }

        let defaults = Self::default();
        if self.palette.iter().all(|c| parse_hex_color(c).is_none()) {
            log::warn!("EffectsConfig: palette has no usable color, using defaults");
            self.palette = defaults.palette.clone();
        }
        self.sanitize_tuning(&defaults);

        /* Anything beyond the capacity would be evicted right away. */
        let burst_limit = self.capacity;
        for (name, count) in [
            ("click.ring_particles", &mut self.click.ring_particles),
            ("heart.count", &mut self.heart.count),
            ("scroll.max_per_event", &mut self.scroll.max_per_event),
            ("ambient.count", &mut self.ambient.count),
            ("ambient.mobile_count", &mut self.ambient.mobile_count),
        ] {
            if *count > burst_limit {
                log::warn!("EffectsConfig: {name} {count} exceeds capacity, using {burst_limit}");
                *count = burst_limit;
            }
        }
        self
    }

    fn sanitize_tuning(&mut self, defaults: &Self) {
        sanitize_bounds("trail.size", &mut self.trail.size, defaults.trail.size);
        sanitize_bounds("trail.speed", &mut self.trail.speed, defaults.trail.speed);
        sanitize_fraction("trail.drag", &mut self.trail.drag, defaults.trail.drag);
        sanitize_scalar("trail.spacing", &mut self.trail.spacing, defaults.trail.spacing);

        let sparkle = &mut self.sparkle;
        sanitize_bounds("sparkle.size", &mut sparkle.size, defaults.sparkle.size);
        sanitize_bounds("sparkle.speed", &mut sparkle.speed, defaults.sparkle.speed);
        sanitize_bounds(
            "sparkle.twinkle_speed",
            &mut sparkle.twinkle_speed,
            defaults.sparkle.twinkle_speed,
        );
        sanitize_bounds(
            "sparkle.rotation_speed",
            &mut sparkle.rotation_speed,
            defaults.sparkle.rotation_speed,
        );
        sanitize_scalar("sparkle.gravity", &mut sparkle.gravity, defaults.sparkle.gravity);
        sanitize_fraction("sparkle.bounce", &mut sparkle.bounce, defaults.sparkle.bounce);

        let click = &mut self.click;
        sanitize_bounds("click.speed", &mut click.speed, defaults.click.speed);
        sanitize_scalar("click.ring_radius", &mut click.ring_radius, defaults.click.ring_radius);
        sanitize_scalar("click.ring_growth", &mut click.ring_growth, defaults.click.ring_growth);
        sanitize_scalar("click.ring_stroke", &mut click.ring_stroke, defaults.click.ring_stroke);
        sanitize_scalar("click.glow_radius", &mut click.glow_radius, defaults.click.glow_radius);
        sanitize_scalar(
            "click.glow_pulse_speed",
            &mut click.glow_pulse_speed,
            defaults.click.glow_pulse_speed,
        );

        let heart = &mut self.heart;
        sanitize_bounds("heart.size", &mut heart.size, defaults.heart.size);
        sanitize_scalar("heart.rise", &mut heart.rise, defaults.heart.rise);
        sanitize_scalar("heart.spread", &mut heart.spread, defaults.heart.spread);
        sanitize_fraction("heart.ease", &mut heart.ease, defaults.heart.ease);

        sanitize_scalar(
            "scroll.pixels_per_sparkle",
            &mut self.scroll.pixels_per_sparkle,
            defaults.scroll.pixels_per_sparkle,
        );
        sanitize_bounds("ambient.size", &mut self.ambient.size, defaults.ambient.size);
        sanitize_bounds("ambient.drift", &mut self.ambient.drift, defaults.ambient.drift);

        let cursor = &mut self.cursor;
        sanitize_scalar("cursor.dot_radius", &mut cursor.dot_radius, defaults.cursor.dot_radius);
        sanitize_scalar("cursor.ring_radius", &mut cursor.ring_radius, defaults.cursor.ring_radius);
        sanitize_fraction("cursor.ease", &mut cursor.ease, defaults.cursor.ease);
        sanitize_scalar(
            "cursor.pressed_scale",
            &mut cursor.pressed_scale,
            defaults.cursor.pressed_scale,
        );

        sanitize_scalar(
            "mobile_breakpoint",
            &mut self.mobile_breakpoint,
            defaults.mobile_breakpoint,
        );
    }

    /// Colors from the palette that parsed successfully.
    pub fn palette_colors(&self) -> Vec<Color> {
        self.palette
            .iter()
            .filter_map(|c| {
                let color = parse_hex_color(c);
                if color.is_none() {
                    log::warn!("EffectsConfig::palette_colors: ignoring invalid color {c}");
                }
                color
            })
            .collect()
    }
}

fn is_usable<T: Copy + Into<f64>>(value: T) -> bool {
    let value: f64 = value.into();
    value.is_finite() && value.abs() <= MAX_TUNING_MAGNITUDE
}

fn sanitize_scalar<T>(name: &str, value: &mut T, default: T)
where
    T: Copy + Into<f64> + std::fmt::Display,
{
    if !is_usable(*value) {
        log::warn!("EffectsConfig: invalid {name} {value}, using {default}");
        *value = default;
    }
}

/// Values applied as a per-frame factor must stay inside `[0, 1]`.
fn sanitize_fraction<T>(name: &str, value: &mut T, default: T)
where
    T: Copy + Into<f64> + std::fmt::Display,
{
    let fraction: f64 = (*value).into();
    if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
        log::warn!("EffectsConfig: {name} {value} is not in [0, 1], using {default}");
        *value = default;
    }
}

fn sanitize_bounds(name: &str, bounds: &mut Bounds, default: Bounds) {
    if !is_usable(bounds.min) || !is_usable(bounds.max) {
        log::warn!("EffectsConfig: invalid {name} {bounds:?}, using {default:?}");
        *bounds = default;
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut path| {
        path.push(CONFIG_DIR_NAME);
        path.push(CONFIG_FILE_NAME);
        path
    })
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on" | "reduce"
    )
}

/// Parses `#RRGGBB` or `#RRGGBBAA`.
pub fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.trim().strip_prefix('#')?;
    if hex.len() != 6 && hex.len() != 8 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    let r = channel(0)?;
    let g = channel(2)?;
    let b = channel(4)?;
    let a = if hex.len() == 8 { channel(6)? } else { 255 };
    Some(Color::from_rgba8(r, g, b, a as f32 / 255.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_partial_json_fills_defaults() {
        let config =
            EffectsConfig::from_json_str(r#"{ "capacity": 10, "click": { "ring_particles": 8 } }"#)
                .unwrap();
        assert_eq!(config.capacity, 10);
        assert_eq!(config.click.ring_particles, 8);
        assert_eq!(config.click.max_life, ClickConfig::default().max_life);
        assert_eq!(config.mobile_capacity, 20);
        assert_eq!(config.trail, TrailConfig::default());
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let result = EffectsConfig::from_json_str("{ capacity: ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = EffectsConfig::from_path(Path::new("/definitely/not/here.json"));
        assert!(matches!(result, Err(ConfigError::Io(_, _))));
    }

    #[test]
    fn test_zero_capacity_is_sanitized() {
        let config = EffectsConfig::from_json_str(r#"{ "capacity": 0, "trail": { "max_life": -3 } }"#)
            .unwrap();
        assert_eq!(config.capacity, 1);
        assert_eq!(config.trail.max_life, 1.0);
    }

    #[test]
    fn test_non_finite_tuning_falls_back_to_defaults() {
        let config = EffectsConfig::from_json_str(
            r#"{
                "trail": { "speed": { "min": 0.2, "max": 1e39 }, "drag": 4.0 },
                "sparkle": { "size": { "min": -1e39, "max": 2.0 } },
                "heart": { "spread": 1e39, "rise": -1e39 },
                "cursor": { "ease": -0.5 },
                "mobile_breakpoint": 1e300
            }"#,
        )
        .unwrap();
        let defaults = EffectsConfig::default();
        assert_eq!(config.trail.speed, defaults.trail.speed);
        assert_eq!(config.trail.drag, defaults.trail.drag);
        assert_eq!(config.sparkle.size, defaults.sparkle.size);
        assert_eq!(config.heart.spread, defaults.heart.spread);
        assert_eq!(config.heart.rise, defaults.heart.rise);
        assert_eq!(config.cursor.ease, defaults.cursor.ease);
        assert_eq!(config.mobile_breakpoint, defaults.mobile_breakpoint);
        // Values in range are kept
        assert_eq!(config.trail.size, defaults.trail.size);
    }

    #[test]
    fn test_counts_are_capped() {
        let config = EffectsConfig::from_json_str(
            r#"{
                "capacity": 1000000000,
                "mobile_capacity": 30,
                "click": { "ring_particles": 1000000 },
                "heart": { "count": 18446744073709551615 },
                "ambient": { "count": 5000 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.capacity, MAX_CAPACITY);
        assert_eq!(config.mobile_capacity, 30);
        assert_eq!(config.click.ring_particles, MAX_CAPACITY);
        assert_eq!(config.heart.count, MAX_CAPACITY);
        assert_eq!(config.ambient.count, MAX_CAPACITY);

        let config =
            EffectsConfig::from_json_str(r#"{ "click": { "ring_particles": 500 } }"#).unwrap();
        assert_eq!(config.click.ring_particles, 50);
    }

    #[test]
    fn test_bounds_sample_survives_non_finite_range() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(Bounds::new(0.2, f32::INFINITY).sample(&mut rng), 0.0);
        assert_eq!(Bounds::new(f32::NAN, 1.0).sample(&mut rng), 0.0);
        assert_eq!(Bounds::new(-3e38, 3e38).sample(&mut rng), 0.0);
    }

    #[test]
    fn test_parse_hex_color() {
        let color = parse_hex_color("#B91801").unwrap();
        assert!((color.r - 0.725).abs() < 0.01);
        assert!((color.g - 0.094).abs() < 0.01);
        assert_eq!(color.a, 1.0);

        let translucent = parse_hex_color("#FFFFFF80").unwrap();
        assert!((translucent.a - 0.5).abs() < 0.01);

        assert!(parse_hex_color("B91801").is_none());
        assert!(parse_hex_color("#GG0000").is_none());
        assert!(parse_hex_color("#FFF").is_none());
    }

    #[test]
    fn test_bounds_sample_stays_inside() {
        let mut rng = StdRng::seed_from_u64(7);
        let bounds = Bounds::new(2.0, 5.0);
        for _ in 0..100 {
            let v = bounds.sample(&mut rng);
            assert!((2.0..=5.0).contains(&v));
        }

        let reversed = Bounds::new(5.0, 2.0);
        let v = reversed.sample(&mut rng);
        assert!((2.0..=5.0).contains(&v));

        assert_eq!(Bounds::new(3.0, 3.0).sample(&mut rng), 3.0);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag(" TRUE "));
        assert!(parse_flag("reduce"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("no-preference"));
    }
}
