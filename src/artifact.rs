//! Artifact persistence for normalized generated code.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::provider::ProviderKind;
use crate::{PortError, PortResult};

/// Default directory for persisted artifacts, relative to the working
/// directory.
pub const DEFAULT_ARTIFACT_DIR: &str = "artifacts";

/// Persists one artifact file per provider identity under a base directory.
///
/// Paths are a pure function of identity and base directory; a new write for
/// the same identity overwrites the prior file. No versioning, no locking:
/// concurrent writers race with last-writer-wins semantics.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    base_dir: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at the given directory.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        ArtifactStore { base_dir: base_dir.into() }
    }

    /// Store rooted at the default artifact directory.
    pub fn default_store() -> Self {
        Self::new(DEFAULT_ARTIFACT_DIR)
    }

    /// Base directory of the store.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Deterministic artifact path for a provider identity. Never depends on
    /// content.
    pub fn path_for(&self, provider: ProviderKind) -> PathBuf {
        self.base_dir.join(format!("optimized_{}.cpp", provider.short()))
    }

    /// Persist `code` for `provider`, overwriting any prior artifact, and
    /// return the resolved path. Directory creation is idempotent.
    pub fn write(&self, code: &str, provider: ProviderKind) -> PortResult<PathBuf> {
        std::fs::create_dir_all(&self.base_dir).map_err(|e| {
            PortError::Message(format!(
                "failed to create artifact directory {}: {e}",
                self.base_dir.display()
            ))
        })?;
        let path = self.path_for(provider);
        std::fs::write(&path, code).map_err(|e| {
            PortError::Message(format!("failed to write artifact {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), bytes = code.len(), "artifact persisted");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_path_is_deterministic_per_identity() {
        let store = ArtifactStore::new("out");
        assert_eq!(store.path_for(ProviderKind::Gpt), PathBuf::from("out/optimized_gpt.cpp"));
        assert_eq!(
            store.path_for(ProviderKind::Claude),
            PathBuf::from("out/optimized_claude.cpp")
        );
        // path never depends on content
        assert_eq!(store.path_for(ProviderKind::Gpt), store.path_for(ProviderKind::Gpt));
    }

    #[test]
    fn test_write_creates_directory_and_file() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("artifacts");
        let store = ArtifactStore::new(&base);
        let path = store.write("int main(){}", ProviderKind::Gpt).unwrap();
        assert!(base.is_dir());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "int main(){}");
    }

    #[test]
    fn test_second_write_replaces_first() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("artifacts"));
        let first = store.write("int main(){return 1;}", ProviderKind::Claude).unwrap();
        let second = store.write("int main(){return 2;}", ProviderKind::Claude).unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read_to_string(&second).unwrap(), "int main(){return 2;}");
        // exactly one file for the identity
        let entries = std::fs::read_dir(store.base_dir()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_directory_creation_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("artifacts"));
        store.write("a", ProviderKind::Gpt).unwrap();
        // base already exists; second write must not error
        store.write("b", ProviderKind::Gpt).unwrap();
    }

    #[test]
    fn test_identities_do_not_collide() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let gpt = store.write("// gpt", ProviderKind::Gpt).unwrap();
        let claude = store.write("// claude", ProviderKind::Claude).unwrap();
        assert_ne!(gpt, claude);
        assert_eq!(std::fs::read_to_string(&gpt).unwrap(), "// gpt");
        assert_eq!(std::fs::read_to_string(&claude).unwrap(), "// claude");
    }
}
