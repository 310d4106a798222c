//! Engine configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::transform::kernel::{Execution, Kernel};

/// Default number of CLUTs kept in memory.
const DEFAULT_CLUT_CACHE_SIZE: usize = 1;

/// Runtime configuration for the processing engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// CLUTs kept loaded at once. A size of 1 also drops the cached CLUT
    /// when film simulation is switched off.
    pub clut_cache_size: usize,
    /// Base directory for relative CLUT filenames.
    pub clut_dir: Option<PathBuf>,
    /// Split image rows across worker threads.
    pub multithread: bool,
    /// Inner-loop kernel.
    pub kernel: Kernel,
}

impl EngineConfig {
    /// Build from an environment-like lookup. Unset or unparsable values
    /// fall back to defaults.
    ///
    /// - `DARKROOM_CLUT_CACHE_SIZE`: integer, at least 1
    /// - `DARKROOM_CLUT_DIR`: directory path
    /// - `DARKROOM_SINGLE_THREAD`: set to disable row parallelism
    /// - `DARKROOM_SCALAR_KERNEL`: set to force the scalar kernel
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            clut_cache_size: lookup("DARKROOM_CLUT_CACHE_SIZE")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_CLUT_CACHE_SIZE)
                .max(1),
            clut_dir: lookup("DARKROOM_CLUT_DIR")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            multithread: lookup("DARKROOM_SINGLE_THREAD").is_none(),
            kernel: if lookup("DARKROOM_SCALAR_KERNEL").is_some() {
                Kernel::Scalar
            } else {
                Kernel::detect()
            },
        }
    }

    pub fn execution(&self) -> Execution {
        Execution {
            multithread: self.multithread,
            kernel: self.kernel,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> EngineConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_overrides() {
        let c = config_from(&[]);
        assert_eq!(c.clut_cache_size, 1);
        assert_eq!(c.clut_dir, None);
        assert!(c.multithread);
        assert_eq!(c.kernel, Kernel::detect());
    }

    #[test]
    fn test_overrides_are_applied() {
        let c = config_from(&[
            ("DARKROOM_CLUT_CACHE_SIZE", "8"),
            ("DARKROOM_CLUT_DIR", "/usr/share/darkroom/cluts"),
            ("DARKROOM_SINGLE_THREAD", "1"),
            ("DARKROOM_SCALAR_KERNEL", "1"),
        ]);
        assert_eq!(c.clut_cache_size, 8);
        assert_eq!(c.clut_dir, Some(PathBuf::from("/usr/share/darkroom/cluts")));
        assert_eq!(c.execution(), Execution::serial());
    }

    #[test]
    fn test_invalid_cache_size_falls_back() {
        assert_eq!(config_from(&[("DARKROOM_CLUT_CACHE_SIZE", "lots")]).clut_cache_size, 1);
        assert_eq!(config_from(&[("DARKROOM_CLUT_CACHE_SIZE", "0")]).clut_cache_size, 1);
    }
}
