//! Device and accessibility adaptation.
//!
//! Flags are recomputed from raw signals (viewport size, touch input, the
//! reduced motion preference) whenever one of them changes. The engine reads
//! the flags and the derived [`QualityProfile`] once per frame.

use crate::config::EffectsConfig;
use crate::utils::geometry::Extent;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceFlags {
    pub is_touch: bool,
    pub is_mobile: bool,
    pub reduced_motion: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityTier {
    /// Reduced motion requested, nothing animates.
    Still,
    MobileLow,
    DesktopHigh,
}

impl From<DeviceFlags> for QualityTier {
    fn from(flags: DeviceFlags) -> Self {
        if flags.reduced_motion {
            QualityTier::Still
        } else if flags.is_mobile || flags.is_touch {
            QualityTier::MobileLow
        } else {
            QualityTier::DesktopHigh
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityProfile {
    pub tier: QualityTier,
    /// Capacity of every particle layer.
    pub capacity: usize,
    pub frame_interval: Duration,
    /// Number of ambient sparkles the ambient layer is topped up to.
    pub ambient_count: usize,
    pub emission_enabled: bool,
    pub show_cursor: bool,
}

impl QualityProfile {
    pub fn for_flags(flags: DeviceFlags, config: &EffectsConfig) -> Self {
        let tier = QualityTier::from(flags);
        match tier {
            QualityTier::Still => QualityProfile {
                tier,
                capacity: config.mobile_capacity.min(config.capacity),
                frame_interval: Duration::from_millis(config.frame_interval_ms),
                ambient_count: 0,
                emission_enabled: false,
                show_cursor: !flags.is_touch,
            },
            QualityTier::MobileLow => QualityProfile {
                tier,
                capacity: config.mobile_capacity,
                frame_interval: Duration::from_millis(config.mobile_frame_interval_ms),
                ambient_count: config.ambient.mobile_count,
                emission_enabled: true,
                show_cursor: !flags.is_touch,
            },
            QualityTier::DesktopHigh => QualityProfile {
                tier,
                capacity: config.capacity,
                frame_interval: Duration::from_millis(config.frame_interval_ms),
                ambient_count: config.ambient.count,
                emission_enabled: true,
                show_cursor: true,
            },
        }
    }
}

#[derive(Debug)]
pub struct DeviceAdapter {
    mobile_breakpoint: f64,
    viewport: Extent,
    touch_seen: bool,
    reduced_motion_preference: bool,
    flags: DeviceFlags,
}

impl DeviceAdapter {
    pub fn new(viewport: Extent, mobile_breakpoint: f64, reduced_motion: bool) -> Self {
        let mut adapter = Self {
            mobile_breakpoint,
            viewport,
            touch_seen: false,
            reduced_motion_preference: reduced_motion,
            flags: DeviceFlags::default(),
        };
        adapter.flags = adapter.compute();
        log::info!("DeviceAdapter::new: {:?}", adapter.flags);
        adapter
    }

    pub fn flags(&self) -> DeviceFlags {
        self.flags
    }

    /// Returns the new flags when the resize changed them.
    pub fn on_resize(&mut self, viewport: Extent) -> Option<DeviceFlags> {
        self.viewport = viewport;
        self.recompute()
    }

    /// Touch capability is sticky: once a touch is seen the device is a touch device.
    pub fn on_touch(&mut self) -> Option<DeviceFlags> {
        if self.touch_seen {
            return None;
        }
        self.touch_seen = true;
        self.recompute()
    }

    pub fn set_reduced_motion(&mut self, reduced_motion: bool) -> Option<DeviceFlags> {
        self.reduced_motion_preference = reduced_motion;
        self.recompute()
    }

    fn recompute(&mut self) -> Option<DeviceFlags> {
        let flags = self.compute();
        if flags == self.flags {
            return None;
        }
        log::info!("DeviceAdapter: flags changed {:?} -> {:?}", self.flags, flags);
        self.flags = flags;
        Some(flags)
    }

    fn compute(&self) -> DeviceFlags {
        let narrow = !self.viewport.is_empty() && self.viewport.width < self.mobile_breakpoint;
        DeviceFlags {
            is_touch: self.touch_seen,
            is_mobile: narrow || self.touch_seen,
            reduced_motion: self.reduced_motion_preference,
        }
    }
}
