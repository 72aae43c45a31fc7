use serde::Deserialize;

use crate::error::WorkbenchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberingScope {
    #[default]
    All,
    Selected,
}

/// Largest accepted magnitude of `start_from`.
pub const MAX_START_FROM: u64 = 1_000_000_000;

/// Workspace-wide page numbering. Positions are percentages of the final
/// page box measured from its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct NumberingConfig {
    pub enabled: bool,
    pub x_percent: f64,
    pub y_percent: f64,
    pub start_from: i64,
    pub font_size: f64,
    pub apply_to: NumberingScope,
}

impl Default for NumberingConfig {
    fn default() -> Self {
        NumberingConfig {
            enabled: false,
            x_percent: 50.0,
            y_percent: 95.0,
            start_from: 1,
            font_size: 12.0,
            apply_to: NumberingScope::All,
        }
    }
}

impl NumberingConfig {
    pub fn validate(&self) -> crate::error::Result<()> {
        if !(0.0..=100.0).contains(&self.x_percent) || !(0.0..=100.0).contains(&self.y_percent) {
            return Err(WorkbenchError::config(format!(
                "numbering position must be 0-100%, got ({}, {})",
                self.x_percent, self.y_percent
            )));
        }
        if self.start_from.unsigned_abs() > MAX_START_FROM {
            return Err(WorkbenchError::config(format!(
                "numbering start must lie within +/-{MAX_START_FROM}, got {}",
                self.start_from
            )));
        }
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(WorkbenchError::config(format!(
                "numbering font size must be positive, got {}",
                self.font_size
            )));
        }
        Ok(())
    }

    /// Whether a page with the given selection flag gets a number.
    pub fn applies_to(&self, selected: bool) -> bool {
        self.enabled
            && match self.apply_to {
                NumberingScope::All => true,
                NumberingScope::Selected => selected,
            }
    }

    /// Label drawn on the page at `sequence_index` (0-based).
    pub fn label(&self, sequence_index: usize) -> crate::error::Result<String> {
        i64::try_from(sequence_index)
            .ok()
            .and_then(|index| self.start_from.checked_add(index))
            .map(|n| n.to_string())
            .ok_or_else(|| {
                WorkbenchError::config(format!(
                    "page number overflows: {} + {sequence_index}",
                    self.start_from
                ))
            })
    }
}
