//! Form bodies and uploaded files.
//!
//! Admin and payment forms may arrive as `multipart/form-data` (with a file)
//! or as plain urlencoded bodies; [`SubmittedForm`] accepts both. Files are
//! written to the upload directory as `<unix millis><.ext>`.

use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Form,
};
use chrono::Utc;
use tokio::{fs, io::AsyncWriteExt};

use crate::errors::{AppError, AppResult};

// ── Text fields ──────────────────────────────────────────────

/// Text fields of a submitted form. Values are trimmed on read.
#[derive(Debug, Clone, Default)]
pub struct FormFields(HashMap<String, String>);

impl From<HashMap<String, String>> for FormFields {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

impl FormFields {
    /// Trimmed value; `None` when missing or blank.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
    }

    /// Trimmed value, or `BadRequest(message)` when missing or blank.
    pub fn require(&self, name: &str, message: &str) -> AppResult<String> {
        self.get(name)
            .map(str::to_owned)
            .ok_or_else(|| AppError::BadRequest(message.to_owned()))
    }

    /// Trimmed value, empty string when missing.
    pub fn text(&self, name: &str) -> String {
        self.get(name).unwrap_or_default().to_owned()
    }
}

// ── Submitted forms ──────────────────────────────────────────

/// A file received in a multipart body, not yet written to disk.
#[derive(Debug, Clone)]
pub struct PendingFile {
    pub original_name: String,
    pub bytes:         Bytes,
}

#[derive(Debug, Default)]
pub struct SubmittedForm {
    pub fields: FormFields,
    files:      HashMap<String, PendingFile>,
}

impl SubmittedForm {
    pub async fn read_multipart(mut multipart: Multipart) -> AppResult<Self> {
        let mut fields = HashMap::new();
        let mut files = HashMap::new();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            match field.file_name().map(str::to_owned) {
                Some(original_name) => {
                    let bytes = field.bytes().await?;
                    // Browsers send an empty part when no file was chosen.
                    if !original_name.is_empty() && !bytes.is_empty() {
                        files.insert(name, PendingFile { original_name, bytes });
                    }
                }
                None => {
                    fields.insert(name, field.text().await?);
                }
            }
        }

        Ok(Self { fields: FormFields(fields), files })
    }

    pub fn take_file(&mut self, name: &str) -> Option<PendingFile> {
        self.files.remove(name)
    }
}

impl<S> FromRequest<S> for SubmittedForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            Self::read_multipart(multipart).await
        } else {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            Ok(Self { fields: FormFields(fields), files: HashMap::new() })
        }
    }
}

// ── Storage ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// Tour cover images.
    Image,
    /// Payment slips: an image or a PDF receipt.
    Slip,
}

impl UploadKind {
    fn allows(self, ext: &str) -> bool {
        let image = matches!(ext, ".jpg" | ".jpeg" | ".png" | ".gif" | ".webp");
        match self {
            UploadKind::Image => image,
            UploadKind::Slip  => image || ext == ".pdf",
        }
    }
}

/// Lowercased, dot-prefixed extension of `name`; empty when there is none.
pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `file` and return the stored filename.
    ///
    /// Files are created exclusively; if another upload already took this
    /// millisecond's name, the stamp is bumped until a free one is found.
    pub async fn save(&self, file: &PendingFile, kind: UploadKind) -> AppResult<String> {
        let ext = extension_of(&file.original_name);
        if !kind.allows(&ext) {
            return Err(AppError::BadRequest("ประเภทไฟล์ไม่รองรับ".into()));
        }

        fs::create_dir_all(&self.dir).await?;

        let mut stamp = Utc::now().timestamp_millis();
        loop {
            let name = format!("{stamp}{ext}");
            let opened = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.dir.join(&name))
                .await;
            match opened {
                Ok(mut out) => {
                    let written = async {
                        out.write_all(&file.bytes).await?;
                        out.flush().await
                    }
                    .await;
                    drop(out);
                    return self.keep_or_discard(name, file.bytes.len(), written).await;
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => stamp += 1,
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// A file whose write failed is removed so no unreferenced partial upload stays behind.
    async fn keep_or_discard(
        &self,
        name: String,
        bytes: usize,
        written: std::io::Result<()>,
    ) -> AppResult<String> {
        match written {
            Ok(()) => {
                tracing::info!(file = %name, bytes, "Stored upload");
                Ok(name)
            }
            Err(err) => {
                tracing::warn!(file = %name, error = %err, "Upload write failed");
                self.remove(&name).await;
                Err(err.into())
            }
        }
    }

    /// Best-effort removal of a previously stored file.
    pub async fn remove(&self, name: &str) {
        // Stored names never contain separators; refuse anything that does.
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return;
        }
        if let Err(err) = fs::remove_file(self.dir.join(name)).await {
            if err.kind() != ErrorKind::NotFound {
                tracing::warn!(file = %name, error = %err, "Could not remove upload");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("tourbooking-{tag}-{}-{nanos}", std::process::id()))
    }

    fn pending(name: &str) -> PendingFile {
        PendingFile {
            original_name: name.into(),
            bytes:         Bytes::from_static(b"\x89PNG fake"),
        }
    }

    #[test]
    fn extensions_are_lowercased_and_dotted() {
        assert_eq!(extension_of("Slip.PNG"), ".png");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
        assert_eq!(extension_of("README"), "");
    }

    #[test]
    fn slips_accept_pdf_but_images_do_not() {
        assert!(UploadKind::Slip.allows(".pdf"));
        assert!(!UploadKind::Image.allows(".pdf"));
        assert!(UploadKind::Image.allows(".webp"));
        assert!(!UploadKind::Image.allows(".exe"));
        assert!(!UploadKind::Image.allows(""));
    }

    #[test]
    fn form_fields_are_trimmed_and_blank_is_missing() {
        let fields = FormFields::from(HashMap::from([
            ("name".to_string(), "  Chiang Mai  ".to_string()),
            ("blank".to_string(), "   ".to_string()),
        ]));
        assert_eq!(fields.get("name"), Some("Chiang Mai"));
        assert_eq!(fields.get("blank"), None);
        assert_eq!(fields.text("absent"), "");
        assert!(matches!(fields.require("blank", "required"), Err(AppError::BadRequest(m)) if m == "required"));
    }

    #[tokio::test]
    async fn failed_write_leaves_no_partial_file() {
        let dir = scratch_dir("partial");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("1700000000000.png"), b"\x89P").unwrap();
        let store = UploadStore::new(&dir);

        let failed = std::io::Error::new(ErrorKind::Other, "disk full");
        let result = store.keep_or_discard("1700000000000.png".into(), 10, Err(failed)).await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        assert!(!dir.join("1700000000000.png").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn uploads_in_the_same_millisecond_get_distinct_names() {
        let dir = scratch_dir("uploads");
        let store = UploadStore::new(&dir);

        let mut names = Vec::new();
        for _ in 0..5 {
            names.push(store.save(&pending("photo.PNG"), UploadKind::Image).await.unwrap());
        }

        let mut unique = names.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), names.len());
        for name in &names {
            assert!(name.ends_with(".png"));
            assert!(name.trim_end_matches(".png").parse::<i64>().is_ok());
            assert!(dir.join(name).exists());
        }

        for name in &names {
            store.remove(name).await;
            assert!(!dir.join(name).exists());
        }
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn disallowed_types_are_not_written() {
        let dir = scratch_dir("reject");
        let store = UploadStore::new(&dir);
        let result = store.save(&pending("payload.exe"), UploadKind::Slip).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(!dir.exists());
    }
}
