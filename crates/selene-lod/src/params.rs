//! Tuning parameters for the LOD forest.

use selene_config::LodConfig;

use crate::LodError;

/// Deepest `max_depth` accepted. A depth-24 patch on a moon-sized body spans
/// centimetres, so its grid spacing is already near the limit of f32 vertex offsets.
pub const MAX_DEPTH_LIMIT: u32 = 24;

/// Split/merge thresholds and per-frame limits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LodParams {
    /// Deepest subdivision level a patch may reach.
    pub max_depth: u32,
    /// Vertices per patch edge.
    pub grid_resolution: u32,
    /// Leaves whose screen-space error exceeds this (pixels) want to split.
    pub split_threshold: f64,
    /// Parents whose children all fall below this (pixels) merge.
    pub merge_threshold: f64,
    /// New child patches that may be created per frame. Each split costs 4.
    pub max_splits_per_frame: u32,
    /// Mesh uploads sharing one staging arena and submission.
    pub meshes_per_batch: u32,
}

impl Default for LodParams {
    fn default() -> Self {
        Self {
            max_depth: 15,
            grid_resolution: 33,
            split_threshold: 2.0,
            merge_threshold: 1.0,
            max_splits_per_frame: 64,
            meshes_per_batch: 64,
        }
    }
}

impl LodParams {
    pub fn validate(&self) -> Result<(), LodError> {
        if self.max_depth > MAX_DEPTH_LIMIT {
            return Err(LodError::InvalidParams(format!(
                "max_depth {} exceeds the limit of {MAX_DEPTH_LIMIT}",
                self.max_depth
            )));
        }
        if !(self.split_threshold.is_finite() && self.split_threshold > 0.0) {
            return Err(LodError::InvalidParams(format!(
                "split_threshold must be positive, got {}",
                self.split_threshold
            )));
        }
        if !(self.merge_threshold.is_finite() && self.merge_threshold >= 0.0) {
            return Err(LodError::InvalidParams(format!(
                "merge_threshold must be non-negative, got {}",
                self.merge_threshold
            )));
        }
        if self.merge_threshold >= self.split_threshold {
            return Err(LodError::InvalidParams(format!(
                "merge_threshold {} must be below split_threshold {}",
                self.merge_threshold, self.split_threshold
            )));
        }
        if self.meshes_per_batch == 0 {
            return Err(LodError::InvalidParams(
                "meshes_per_batch must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<&LodConfig> for LodParams {
    fn from(config: &LodConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            grid_resolution: config.grid_resolution,
            split_threshold: config.split_threshold,
            merge_threshold: config.merge_threshold,
            max_splits_per_frame: config.max_splits_per_frame,
            meshes_per_batch: config.meshes_per_batch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        LodParams::default().validate().unwrap();
    }

    #[test]
    fn test_merge_must_be_below_split() {
        let params = LodParams {
            merge_threshold: 3.0,
            ..LodParams::default()
        };
        assert!(matches!(params.validate(), Err(LodError::InvalidParams(_))));
    }

    #[test]
    fn test_excessive_max_depth_is_rejected() {
        let params = LodParams {
            max_depth: 200,
            ..LodParams::default()
        };
        assert!(matches!(params.validate(), Err(LodError::InvalidParams(_))));

        let deepest = LodParams {
            max_depth: MAX_DEPTH_LIMIT,
            ..LodParams::default()
        };
        deepest.validate().unwrap();
    }

    #[test]
    fn test_zero_batch_is_rejected() {
        let params = LodParams {
            meshes_per_batch: 0,
            ..LodParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_from_config_copies_fields() {
        let config = LodConfig {
            max_depth: 9,
            grid_resolution: 17,
            split_threshold: 4.0,
            merge_threshold: 1.5,
            max_splits_per_frame: 8,
            meshes_per_batch: 16,
        };
        let params = LodParams::from(&config);
        assert_eq!(params.max_depth, 9);
        assert_eq!(params.grid_resolution, 17);
        assert_eq!(params.split_threshold, 4.0);
        assert_eq!(params.merge_threshold, 1.5);
        assert_eq!(params.max_splits_per_frame, 8);
        assert_eq!(params.meshes_per_batch, 16);
    }
}
