pub mod file_host;

use crate::errors::AssistantError;
use crate::models::Catalog;

pub use file_host::FileHost;

/// The document/editor the assistant previews into and commits against.
///
/// The assistant reads context from it only when building seed messages, and
/// mutates it only through `preview_code` and `update_code`.
pub trait HostBridge {
    /// Document content right now, `None` when empty.
    fn current_code(&self) -> Option<String>;

    /// Building blocks the generator may use.
    fn catalog(&self) -> Catalog;

    /// Shows `code` in a transient preview layer without committing it.
    fn preview_code(&mut self, code: &str) -> Result<(), AssistantError>;

    /// Replaces the persisted document content with `code`.
    fn update_code(&mut self, code: &str) -> Result<(), AssistantError>;
}
