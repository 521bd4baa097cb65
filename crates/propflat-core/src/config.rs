//! Pass configuration.
//!
//! Options are plain serde structs so embedders can keep them in the same
//! YAML or JSON files as the rest of their build settings:
//!
//! ```yaml
//! property-collapse-level: module-export
//! chunk-output-type: es-modules
//! modules-rewritten: true
//! module-resolution-mode: webpack
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which names the pass may collapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyCollapseLevel {
    #[default]
    All,
    /// Only properties of rewritten module export namespaces.
    #[serde(alias = "module-exports-only")]
    ModuleExport,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkOutputType {
    #[default]
    GlobalNamespace,
    EsModules,
}

/// How import paths resolve to modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionMode {
    #[default]
    Browser,
    Node,
    Webpack,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CollapseOptions {
    pub property_collapse_level: PropertyCollapseLevel,
    pub chunk_output_type: ChunkOutputType,
    /// CommonJS modules have already been rewritten into global namespaces.
    pub modules_rewritten: bool,
    pub module_resolution_mode: ResolutionMode,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid YAML options: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid JSON options: {0}")]
    Json(#[from] serde_json::Error),
}

impl CollapseOptions {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn with_level(mut self, level: PropertyCollapseLevel) -> Self {
        self.property_collapse_level = level;
        self
    }

    pub fn with_chunk_output_type(mut self, chunk_output_type: ChunkOutputType) -> Self {
        self.chunk_output_type = chunk_output_type;
        self
    }

    pub fn with_modules_rewritten(mut self, mode: ResolutionMode) -> Self {
        self.modules_rewritten = true;
        self.module_resolution_mode = mode;
        self
    }

    /// Dynamic imports only matter when module namespaces may be collapsed
    /// or chunks are emitted as ES modules.
    pub fn tracks_dynamic_imports(&self) -> bool {
        self.property_collapse_level == PropertyCollapseLevel::ModuleExport
            || self.chunk_output_type == ChunkOutputType::EsModules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = CollapseOptions::default();
        assert_eq!(options.property_collapse_level, PropertyCollapseLevel::All);
        assert_eq!(options.chunk_output_type, ChunkOutputType::GlobalNamespace);
        assert!(!options.modules_rewritten);
        assert_eq!(options.module_resolution_mode, ResolutionMode::Browser);
        assert!(!options.tracks_dynamic_imports());
    }

    #[test]
    fn test_from_yaml() {
        let options = CollapseOptions::from_yaml_str(
            "property-collapse-level: module-export\nmodules-rewritten: true\nmodule-resolution-mode: webpack\n",
        )
        .unwrap();
        assert_eq!(
            options.property_collapse_level,
            PropertyCollapseLevel::ModuleExport
        );
        assert!(options.modules_rewritten);
        assert_eq!(options.module_resolution_mode, ResolutionMode::Webpack);
        assert_eq!(options.chunk_output_type, ChunkOutputType::GlobalNamespace);
        assert!(options.tracks_dynamic_imports());
    }

    #[test]
    fn test_from_json_accepts_alias() {
        let options = CollapseOptions::from_json_str(
            r#"{"property-collapse-level": "module-exports-only", "chunk-output-type": "es-modules"}"#,
        )
        .unwrap();
        assert_eq!(
            options.property_collapse_level,
            PropertyCollapseLevel::ModuleExport
        );
        assert_eq!(options.chunk_output_type, ChunkOutputType::EsModules);
    }

    #[test]
    fn test_invalid_options_are_errors() {
        let err = CollapseOptions::from_yaml_str("property-collapse-level: sometimes").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
        assert!(err.to_string().starts_with("invalid YAML options"));

        let err = CollapseOptions::from_json_str("{").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
