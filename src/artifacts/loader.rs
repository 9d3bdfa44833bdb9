//! Artifact lookup on disk and in memory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::artifacts::{Artifact, ArtifactError, ArtifactSource};

/// Reads artifacts from a Hardhat or Foundry output directory.
///
/// Accepted layouts, relative to `root`:
/// - `contracts/<Name>.sol/<Name>.json` (Hardhat `artifacts/`)
/// - `<Name>.sol/<Name>.json` (Foundry `out/`)
/// - `<Name>.json`
#[derive(Debug)]
pub struct ArtifactDirectory {
    root: PathBuf,
    cache: Mutex<HashMap<String, Arc<Artifact>>>,
}

impl ArtifactDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let file = format!("{}.json", name);
        let source = format!("{}.sol", name);
        vec![
            self.root.join("contracts").join(&source).join(&file),
            self.root.join(&source).join(&file),
            self.root.join(&file),
        ]
    }

    fn read(&self, name: &str) -> Result<Artifact, ArtifactError> {
        let candidates = self.candidates(name);
        let path = candidates
            .iter()
            .find(|p| p.is_file())
            .ok_or_else(|| ArtifactError::NotFound {
                name: name.to_string(),
                searched: candidates
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;

        let content = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let document: Value = serde_json::from_str(&content).map_err(|e| ArtifactError::Invalid {
            name: name.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })?;

        tracing::debug!(artifact = name, path = %path.display(), "Loaded contract artifact");
        Artifact::from_json(name, &document)
    }
}

impl ArtifactSource for ArtifactDirectory {
    fn load(&self, name: &str) -> Result<Arc<Artifact>, ArtifactError> {
        let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(artifact) = cache.get(name) {
            return Ok(artifact.clone());
        }
        let artifact = Arc::new(self.read(name)?);
        cache.insert(name.to_string(), artifact.clone());
        Ok(artifact)
    }
}

/// Fixed set of artifacts held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticArtifacts {
    artifacts: HashMap<String, Arc<Artifact>>,
}

impl StaticArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, artifact: Artifact) -> Self {
        self.artifacts.insert(artifact.name.clone(), Arc::new(artifact));
        self
    }
}

impl ArtifactSource for StaticArtifacts {
    fn load(&self, name: &str) -> Result<Arc<Artifact>, ArtifactError> {
        self.artifacts
            .get(name)
            .cloned()
            .ok_or_else(|| ArtifactError::NotFound {
                name: name.to_string(),
                searched: "in-memory set".to_string(),
            })
    }
}
