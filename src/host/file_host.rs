use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use super::HostBridge;
use crate::errors::AssistantError;
use crate::models::Catalog;

/// Host document kept on disk. Previews go to a sibling `<document>.preview`
/// file so the committed document is only touched on apply.
#[derive(Debug, Clone)]
pub struct FileHost {
    document: PathBuf,
    preview: PathBuf,
    catalog: Catalog,
}

impl FileHost {
    pub fn new(document: impl Into<PathBuf>, catalog: Catalog) -> Self {
        let document = document.into();
        let mut preview = document.clone().into_os_string();
        preview.push(".preview");
        Self { document, preview: PathBuf::from(preview), catalog }
    }

    pub fn load_catalog(path: &Path) -> Result<Catalog, AssistantError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            error!("Failed to read catalog {}: {e}", path.display());
            AssistantError::host(format!("Failed to read catalog {}", path.display()), e)
        })?;
        let mut catalog: Catalog = serde_json::from_str(&raw).map_err(|e| {
            error!("Failed to parse catalog {}: {e}", path.display());
            AssistantError::CatalogParse { path: path.display().to_string(), source: e }
        })?;

        if catalog.components.is_empty() {
            for snippet in &catalog.snippets {
                if !catalog.components.contains(&snippet.name) {
                    catalog.components.push(snippet.name.clone());
                }
            }
        }
        Ok(catalog)
    }

    pub fn document_path(&self) -> &Path {
        &self.document
    }

    pub fn preview_path(&self) -> &Path {
        &self.preview
    }

    pub fn discard_preview(&self) -> Result<(), AssistantError> {
        match fs::remove_file(&self.preview) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                error!("Failed to remove preview {}: {e}", self.preview.display());
                Err(AssistantError::host("Failed to remove preview", e))
            }
        }
    }
}

impl HostBridge for FileHost {
    fn current_code(&self) -> Option<String> {
        match fs::read_to_string(&self.document) {
            Ok(code) if !code.trim().is_empty() => Some(code),
            Ok(_) => None,
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                error!("Failed to read document {}: {e}", self.document.display());
                None
            }
        }
    }

    fn catalog(&self) -> Catalog {
        self.catalog.clone()
    }

    fn preview_code(&mut self, code: &str) -> Result<(), AssistantError> {
        fs::write(&self.preview, code).map_err(|e| {
            error!("Failed to write preview {}: {e}", self.preview.display());
            AssistantError::host("Failed to write preview", e)
        })?;
        info!("Preview written to {}", self.preview.display());
        Ok(())
    }

    fn update_code(&mut self, code: &str) -> Result<(), AssistantError> {
        fs::write(&self.document, code).map_err(|e| {
            error!("Failed to write document {}: {e}", self.document.display());
            AssistantError::host("Failed to write document", e)
        })?;
        if let Err(e) = self.discard_preview() {
            warn!("Document updated but stale preview remains: {e}");
        }
        info!("Document updated at {}", self.document.display());
        Ok(())
    }
}
