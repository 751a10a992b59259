//! Purchase invoice storage.
//!
//! ```text
//! media_dir/
//! └── facturas/
//!     └── 2024/
//!         └── 03/
//!             └── 5f0c…e1.pdf     ← stored as "facturas/2024/03/5f0c…e1.pdf"
//! ```
//!
//! Only the relative path goes into the database.

use std::path::{Path, PathBuf};

use chrono::{Datelike, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use sicarga_core::validation::validate_invoice_filename;

const INVOICE_DIR: &str = "facturas";

/// Writes uploaded invoices under the media root.
#[derive(Debug, Clone)]
pub struct InvoiceStore {
    root: PathBuf,
    max_bytes: usize,
}

impl InvoiceStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        InvoiceStore {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Stores an invoice and returns its path relative to the media root.
    ///
    /// The extension must be pdf, jpg, jpeg or png; the original file name
    /// is otherwise discarded.
    pub async fn save(&self, filename: &str, bytes: &[u8]) -> Result<String, ApiError> {
        let ext = validate_invoice_filename(filename)?;

        if bytes.is_empty() {
            return Err(ApiError::bad_request("factura_compra is empty"));
        }
        if bytes.len() > self.max_bytes {
            return Err(ApiError::PayloadTooLarge(format!(
                "factura_compra exceeds {} bytes",
                self.max_bytes
            )));
        }

        let now = Utc::now();
        let relative = format!(
            "{}/{:04}/{:02}/{}.{}",
            INVOICE_DIR,
            now.year(),
            now.month(),
            Uuid::new_v4().simple(),
            ext
        );
        let absolute = self.root.join(&relative);

        if let Some(dir) = absolute.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| ApiError::Internal(format!("Cannot create {}: {}", dir.display(), e)))?;
        }
        tokio::fs::write(&absolute, bytes)
            .await
            .map_err(|e| ApiError::Internal(format!("Cannot write {}: {}", absolute.display(), e)))?;

        info!(path = %relative, size = bytes.len(), "Invoice stored");
        Ok(relative)
    }

    /// Removes an invoice stored by [`save`](Self::save) whose shipment row
    /// was never written. Paths outside `facturas/` are left alone.
    pub async fn discard(&self, relative: &str) {
        let inside = Path::new(relative)
            .components()
            .all(|part| matches!(part, std::path::Component::Normal(_)));
        if !inside || !relative.starts_with(INVOICE_DIR) {
            warn!(path = %relative, "Refusing to discard path outside the invoice store");
            return;
        }

        match tokio::fs::remove_file(self.root.join(relative)).await {
            Ok(()) => info!(path = %relative, "Orphaned invoice removed"),
            Err(e) => warn!(path = %relative, error = %e, "Cannot remove orphaned invoice"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = InvoiceStore::new(dir.path(), 1024);

        let relative = store.save("Factura Amazon.PDF", b"%PDF-1.4").await.unwrap();
        let now = Utc::now();
        assert!(relative.starts_with(&format!("facturas/{:04}/{:02}/", now.year(), now.month())));
        assert!(relative.ends_with(".pdf"));

        let written = std::fs::read(dir.path().join(&relative)).unwrap();
        assert_eq!(written, b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_discard_removes_only_stored_invoices() {
        let dir = tempfile::tempdir().unwrap();
        let store = InvoiceStore::new(dir.path(), 1024);

        let relative = store.save("factura.jpg", b"\xFF\xD8").await.unwrap();
        store.discard(&relative).await;
        assert!(!dir.path().join(&relative).exists());

        std::fs::write(dir.path().join("sicarga.db"), b"keep").unwrap();
        store.discard("facturas/../sicarga.db").await;
        store.discard("sicarga.db").await;
        assert!(dir.path().join("sicarga.db").exists());
    }

    #[tokio::test]
    async fn test_rejects_extension_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let store = InvoiceStore::new(dir.path(), 4);

        let err = store.save("factura.exe", b"MZ").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation { .. }));

        let err = store.save("factura.png", b"too large").await.unwrap_err();
        assert!(matches!(err, ApiError::PayloadTooLarge(_)));

        let err = store.save("factura.png", b"").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation { .. }));
    }
}
