//! Sampling pass options and persistent export settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::util::Result;

/// How curves are reconstructed from samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportMode {
    /// Sample on the fixed-rate grid.
    #[default]
    Sample,
    /// Sample only at keyframes.
    Keys,
}

/// Inputs of one sampling pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplingOptions {
    /// Grid step in frames; below 1 disables the grid.
    pub sampling_rate: i32,
    /// Always include the last frame of the range.
    pub keyframe_at_end: bool,
    /// Re-express bone matrices in rest-pose space.
    pub for_opensim: bool,
    /// Also sample keyframes that fall off the grid.
    pub keep_keyframes: bool,
    pub mode: ExportMode,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            sampling_rate: 1,
            keyframe_at_end: true,
            for_opensim: false,
            keep_keyframes: false,
            mode: ExportMode::Sample,
        }
    }
}

/// Export settings as stored on disk.
///
/// Missing fields take their default, so partial files are fine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub sampling_rate: i32,
    pub keyframe_at_end: bool,
    pub for_opensim: bool,
    pub keep_keyframes: bool,
    pub mode: ExportMode,
    /// Emit curves that stay constant over the whole range.
    pub include_flat_channels: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        let opts = SamplingOptions::default();
        Self {
            sampling_rate: opts.sampling_rate,
            keyframe_at_end: opts.keyframe_at_end,
            for_opensim: opts.for_opensim,
            keep_keyframes: opts.keep_keyframes,
            mode: opts.mode,
            include_flat_channels: false,
        }
    }
}

impl ExportSettings {
    /// Load settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&text)?;
        tracing::debug!(path = %path.display(), ?settings, "loaded export settings");
        Ok(settings)
    }

    /// Write settings as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn to_options(&self) -> SamplingOptions {
        SamplingOptions {
            sampling_rate: self.sampling_rate,
            keyframe_at_end: self.keyframe_at_end,
            for_opensim: self.for_opensim,
            keep_keyframes: self.keep_keyframes,
            mode: self.mode,
        }
    }
}
