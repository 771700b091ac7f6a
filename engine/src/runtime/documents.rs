//! Workspace-confined document reader
//!
//! All reads go through [`DocumentGuard`], which rejects sensitive paths and
//! anything that resolves outside the workspace.

use sdk::errors::EngineError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Subdirectory of the workspace holding patient records
pub const PATIENTS_DIR: &str = "patients";

/// Extension of patient record files
pub const PATIENT_RECORD_EXTENSION: &str = "txt";

const CAPABILITY: &str = "filesystem";

/// Path validation for document reads
///
/// # Security Model
///
/// 1. Check deny list before canonicalization
/// 2. Canonicalize path to resolve symlinks and .. patterns
/// 3. Check deny list after canonicalization
/// 4. Verify path is within workspace
#[derive(Debug, Clone)]
pub struct DocumentGuard {
    workspace: PathBuf,
    deny_list: Vec<PathBuf>,
}

impl DocumentGuard {
    /// Create a guard for `workspace`, which must exist
    pub fn new(workspace: &Path) -> Result<Self, EngineError> {
        let workspace = workspace.canonicalize().map_err(|e| {
            EngineError::Config(format!(
                "Failed to canonicalize workspace {}: {}",
                workspace.display(),
                e
            ))
        })?;

        let deny_list = [
            ".ssh",
            ".env",
            ".aws/credentials",
            ".gnupg",
            "id_rsa",
            "id_ed25519",
            "credentials",
            "private_key",
        ]
        .into_iter()
        .map(PathBuf::from)
        .collect();

        Ok(Self {
            workspace,
            deny_list,
        })
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Resolve a relative or absolute path to a readable location
    pub fn validate_path(&self, path: &Path) -> Result<PathBuf, EngineError> {
        let target = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        };

        if self.is_denied(&target) {
            return Err(denied(path));
        }

        let canonical = target.canonicalize().map_err(|e| {
            EngineError::capability(
                CAPABILITY,
                format!("Cannot open document {}: {}", path.display(), e),
            )
        })?;

        if self.is_denied(&canonical) {
            return Err(denied(path));
        }

        if !canonical.starts_with(&self.workspace) {
            return Err(EngineError::capability(
                CAPABILITY,
                format!("Document {} is outside the workspace", path.display()),
            ));
        }

        Ok(canonical)
    }

    fn is_denied(&self, path: &Path) -> bool {
        self.deny_list.iter().any(|denied| {
            path.ends_with(denied)
                || path
                    .components()
                    .any(|c| c.as_os_str() == denied.as_os_str())
        })
    }
}

fn denied(path: &Path) -> EngineError {
    EngineError::capability(
        CAPABILITY,
        format!("Access to {} is denied", path.display()),
    )
}

/// Reads documents and patient records from the workspace
#[derive(Debug, Clone)]
pub struct DocumentReader {
    guard: DocumentGuard,
}

impl DocumentReader {
    pub fn new(workspace: &Path) -> Result<Self, EngineError> {
        Ok(Self {
            guard: DocumentGuard::new(workspace)?,
        })
    }

    pub fn workspace(&self) -> &Path {
        self.guard.workspace()
    }

    /// Read a document by path
    pub async fn read_document(&self, file_ref: &str) -> Result<String, EngineError> {
        let path = self.guard.validate_path(Path::new(file_ref))?;
        info!("Reading document: {}", path.display());

        let content = fs::read_to_string(&path).await.map_err(|e| {
            EngineError::capability(
                CAPABILITY,
                format!("Failed to read {}: {}", file_ref, e),
            )
        })?;

        debug!("Read {} bytes from {}", content.len(), path.display());
        Ok(content)
    }

    /// Read `patients/<patient_id>.txt`
    pub async fn read_patient_record(&self, patient_id: &str) -> Result<String, EngineError> {
        let valid = !patient_id.is_empty()
            && patient_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(EngineError::InvalidInput(format!(
                "Invalid patient id '{}'",
                patient_id
            )));
        }

        let relative = Path::new(PATIENTS_DIR)
            .join(patient_id)
            .with_extension(PATIENT_RECORD_EXTENSION);
        let path = self.guard.validate_path(&relative).map_err(|_| {
            EngineError::capability(CAPABILITY, format!("Patient {} not found", patient_id))
        })?;

        fs::read_to_string(&path).await.map_err(|e| {
            EngineError::capability(
                CAPABILITY,
                format!("Failed to read record for patient {}: {}", patient_id, e),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_relative_document() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("visit.txt"), "BP 120/80").await.unwrap();

        let reader = DocumentReader::new(temp.path()).unwrap();
        assert_eq!(reader.read_document("visit.txt").await.unwrap(), "BP 120/80");
    }

    #[tokio::test]
    async fn test_traversal_outside_workspace_rejected() {
        let outer = TempDir::new().unwrap();
        let workspace = outer.path().join("ws");
        fs::create_dir(&workspace).await.unwrap();
        fs::write(outer.path().join("secret.txt"), "nope").await.unwrap();

        let reader = DocumentReader::new(&workspace).unwrap();
        let err = reader.read_document("../secret.txt").await.unwrap_err();

        assert!(err.to_string().contains("outside the workspace"));
    }

    #[tokio::test]
    async fn test_denied_path_rejected() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".env"), "KEY=1").await.unwrap();

        let reader = DocumentReader::new(temp.path()).unwrap();
        let err = reader.read_document(".env").await.unwrap_err();

        assert!(err.to_string().contains("denied"));
    }

    #[tokio::test]
    async fn test_missing_document() {
        let temp = TempDir::new().unwrap();
        let reader = DocumentReader::new(temp.path()).unwrap();

        let err = reader.read_document("absent.txt").await.unwrap_err();
        assert!(matches!(err, EngineError::CapabilityFailure { .. }));
    }

    #[tokio::test]
    async fn test_patient_record() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(PATIENTS_DIR)).await.unwrap();
        fs::write(temp.path().join("patients/patient_001.txt"), "Hypertension")
            .await
            .unwrap();

        let reader = DocumentReader::new(temp.path()).unwrap();
        assert_eq!(
            reader.read_patient_record("patient_001").await.unwrap(),
            "Hypertension"
        );

        let err = reader.read_patient_record("patient_404").await.unwrap_err();
        assert_eq!(err.to_string(), "Patient patient_404 not found");

        let err = reader.read_patient_record("../etc").await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }
}
