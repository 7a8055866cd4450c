//! Resolution presets and custom-size validation

use crate::config::{
    CUSTOM_MAX_HEIGHT, CUSTOM_MAX_WIDTH, CUSTOM_MIN_HEIGHT, CUSTOM_MIN_WIDTH, RESOLUTION_PRESETS,
};
use crate::error::ShellError;
use crate::preferences::WindowSize;

/// Inclusive bounds accepted for a custom resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomBounds {
    pub min: WindowSize,
    pub max: WindowSize,
}

impl Default for CustomBounds {
    fn default() -> Self {
        Self {
            min: WindowSize::new(CUSTOM_MIN_WIDTH, CUSTOM_MIN_HEIGHT),
            max: WindowSize::new(CUSTOM_MAX_WIDTH, CUSTOM_MAX_HEIGHT),
        }
    }
}

impl CustomBounds {
    pub fn contains(&self, size: WindowSize) -> bool {
        (self.min.width..=self.max.width).contains(&size.width)
            && (self.min.height..=self.max.height).contains(&size.height)
    }

    pub fn validate(&self, width: u32, height: u32) -> Result<WindowSize, ShellError> {
        let size = WindowSize::new(width, height);
        if self.contains(size) {
            Ok(size)
        } else {
            Err(ShellError::InvalidResolution { width, height })
        }
    }

    /// Text shown in the blocking alert when the custom form is rejected
    pub fn rejection_message(&self) -> String {
        format!(
            "Width must be between {} and {}, height between {} and {}.",
            self.min.width, self.max.width, self.min.height, self.max.height
        )
    }
}

/// One row of the resolution dropdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOption {
    Preset { size: WindowSize, active: bool },
    Custom,
}

/// Presets in display order followed by the custom entry. The preset equal
/// to `current` (if any) is marked active.
pub fn options_for(current: WindowSize) -> Vec<ResolutionOption> {
    RESOLUTION_PRESETS
        .iter()
        .map(|&size| ResolutionOption::Preset {
            size,
            active: size == current,
        })
        .chain(std::iter::once(ResolutionOption::Custom))
        .collect()
}
