use serde::{Deserialize, Serialize};

use crate::constants::MAX_EMIT_PER_BLOCK;
use crate::error::CubemeshError;

/// How the shading stage produces its color output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShadingMode {
    /// `color = normal * 0.5 + 0.5`. No texture or light input needed.
    #[default]
    NormalDebug,
    /// Lambertian diffuse + Blinn-Phong specular over a texture array sample.
    Lit,
}

/// Fixed directional light used by `ShadingMode::Lit`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    /// Direction from the surface toward the light (normalized at use).
    pub light_direction: [f32; 3],
    pub light_color: [f32; 3],
    pub ambient: [f32; 3],
    pub specular_strength: f32,
    pub shininess: f32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            light_direction: [0.4, 1.0, 0.3],
            light_color: [1.0, 0.95, 0.8],
            ambient: [0.15, 0.15, 0.18],
            specular_strength: 0.25,
            shininess: 32.0,
        }
    }
}

/// Encoding of the block placement carried in the task payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlacementKind {
    /// Block-local to world by a translation vector.
    #[default]
    Translation,
    /// Block-local to world by a full model matrix.
    Matrix,
}

/// Sub-pixel temporal jitter applied to rasterized clip positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JitterConfig {
    pub enabled: bool,
    pub render_size: [u32; 2],
    pub display_size: [u32; 2],
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            render_size: [1280, 720],
            display_size: [1280, 720],
        }
    }
}

/// Runtime pipeline configuration, loaded once from RON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub shading: ShadingMode,
    pub lighting: LightingConfig,
    pub placement: PlacementKind,
    /// Emission ceiling per block; must not exceed `MAX_EMIT_PER_BLOCK`.
    pub emit_ceiling: u32,
    pub jitter: JitterConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            shading: ShadingMode::default(),
            lighting: LightingConfig::default(),
            placement: PlacementKind::default(),
            emit_ceiling: MAX_EMIT_PER_BLOCK,
            jitter: JitterConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Check values that would otherwise produce undefined stage behavior.
    pub fn validate(&self) -> Result<(), CubemeshError> {
        if self.emit_ceiling == 0 || self.emit_ceiling > MAX_EMIT_PER_BLOCK {
            return Err(CubemeshError::InvalidConfig(format!(
                "emit_ceiling {} outside 1..={}",
                self.emit_ceiling, MAX_EMIT_PER_BLOCK
            )));
        }
        if self.lighting.light_direction.iter().all(|c| *c == 0.0) {
            return Err(CubemeshError::InvalidConfig(
                "light_direction must be non-zero".to_string(),
            ));
        }
        if self.lighting.shininess <= 0.0 {
            return Err(CubemeshError::InvalidConfig(format!(
                "shininess must be positive, got {}",
                self.lighting.shininess
            )));
        }
        if self.jitter.enabled
            && (self.jitter.render_size.contains(&0) || self.jitter.display_size.contains(&0))
        {
            return Err(CubemeshError::InvalidConfig(
                "jitter render/display sizes must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse and validate a pipeline config from RON.
pub fn load_pipeline_config_from_str(ron_str: &str) -> Result<PipelineConfig, CubemeshError> {
    let options = ron::Options::default();
    let config: PipelineConfig = options
        .from_str(ron_str)
        .map_err(|e| CubemeshError::ConfigParseError(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = load_pipeline_config_from_str("()").expect("defaults parse");
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.emit_ceiling, MAX_EMIT_PER_BLOCK);
        assert_eq!(config.shading, ShadingMode::NormalDebug);
    }

    #[test]
    fn test_partial_config() {
        let ron = r#"(
            shading: Lit,
            placement: Matrix,
            lighting: (shininess: 8.0),
            jitter: (enabled: true, render_size: (960, 540), display_size: (1920, 1080)),
        )"#;
        let config = load_pipeline_config_from_str(ron).expect("config parse");
        assert_eq!(config.shading, ShadingMode::Lit);
        assert_eq!(config.placement, PlacementKind::Matrix);
        assert_eq!(config.lighting.shininess, 8.0);
        assert_eq!(
            config.lighting.light_color,
            LightingConfig::default().light_color
        );
        assert!(config.jitter.enabled);
        assert_eq!(config.jitter.display_size, [1920, 1080]);
    }

    #[test]
    fn test_emit_ceiling_validated() {
        let err = load_pipeline_config_from_str("(emit_ceiling: 0)").unwrap_err();
        assert!(matches!(err, CubemeshError::InvalidConfig(_)));
        let over = format!("(emit_ceiling: {})", MAX_EMIT_PER_BLOCK + 1);
        assert!(load_pipeline_config_from_str(&over).is_err());
        assert!(load_pipeline_config_from_str("(emit_ceiling: 16)").is_ok());
    }

    #[test]
    fn test_zero_light_direction_rejected() {
        let ron = "(lighting: (light_direction: (0.0, 0.0, 0.0)))";
        assert!(matches!(
            load_pipeline_config_from_str(ron),
            Err(CubemeshError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_unknown_mode_is_parse_error() {
        assert!(matches!(
            load_pipeline_config_from_str("(shading: Wireframe)"),
            Err(CubemeshError::ConfigParseError(_))
        ));
    }
}
