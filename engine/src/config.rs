use crate::error::{MapperError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Engine-wide options, usually loaded from a flat TOML file such as
///
/// ```toml
/// max_depth = 8
/// implicit_maps = false
/// flattening = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Global recursion bound applied at the root of every call. `0` = unlimited.
    pub max_depth: usize,
    /// Resolve unconfigured top-level pairs by convention instead of failing.
    pub implicit_maps: bool,
    /// Match `AddressCity` against `Address.City` when no direct match exists.
    pub flattening: bool,
    /// Fail the build instead of warning when a reverse map drops a rule.
    pub strict_reverse: bool,
    /// Fail the build when a configured pair leaves destination members unmapped.
    pub validate_on_build: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 0,
            implicit_maps: false,
            flattening: false,
            strict_reverse: false,
            validate_on_build: false,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read an engine config file. Missing keys take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| MapperError::ConfigLoad {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        toml::from_str(&contents).map_err(|e| MapperError::ConfigLoad {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Like [`load`](Self::load), but an absent file yields `Ok(None)` so
    /// callers can fall back to [`EngineConfig::default`].
    pub fn load_optional<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        Self::load(path).map(Some)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| MapperError::ConfigLoad {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_implicit_maps(mut self, enabled: bool) -> Self {
        self.implicit_maps = enabled;
        self
    }

    pub fn with_flattening(mut self, enabled: bool) -> Self {
        self.flattening = enabled;
        self
    }

    pub fn with_strict_reverse(mut self, enabled: bool) -> Self {
        self.strict_reverse = enabled;
        self
    }

    pub fn with_validate_on_build(mut self, enabled: bool) -> Self {
        self.validate_on_build = enabled;
        self
    }

    /// Root depth limit, `None` when unlimited.
    pub(crate) fn depth_limit(&self) -> Option<usize> {
        (self.max_depth > 0).then_some(self.max_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_when_keys_missing() {
        let config = EngineConfig::from_toml_str("flattening = true").unwrap();
        assert!(config.flattening);
        assert_eq!(config.max_depth, 0);
        assert!(!config.implicit_maps);
        assert_eq!(config.depth_limit(), None);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_depth = 3\nstrict_reverse = true").unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config, EngineConfig::new().with_max_depth(3).with_strict_reverse(true));
        assert_eq!(config.depth_limit(), Some(3));
    }

    #[test]
    fn test_load_errors_carry_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("morph.toml");
        assert!(EngineConfig::load_optional(&missing).unwrap().is_none());
        assert!(matches!(
            EngineConfig::load(&missing),
            Err(MapperError::ConfigLoad { .. })
        ));

        let err = EngineConfig::from_toml_str("max_depth = \"deep\"").unwrap_err();
        assert!(err.to_string().contains("<inline>"));
    }
}
