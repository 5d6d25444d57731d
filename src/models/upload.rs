// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 EssencialPay

//! In-memory upload blobs and the roles they play in the registration form.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::utils::sanitize_component;

/// MIME type of every compressed output.
pub const JPEG_MIME: &str = "image/jpeg";
/// MIME type accepted for residence proofs besides images.
pub const PDF_MIME: &str = "application/pdf";
/// Raster types the document pickers accept.
pub const IMAGE_MIMES: [&str; 4] = ["image/png", "image/jpeg", "image/jpg", "image/webp"];

/// A user-selected file held in memory: name, declared MIME type and payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read upload file: {:?}", path))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(sanitize_component)
            .unwrap_or_default();
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self { name, mime, bytes })
    }

    /// Payload size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// True when the declared type is one of the accepted raster formats.
    pub fn is_valid_image(&self) -> bool {
        IMAGE_MIMES.contains(&self.mime.as_str())
    }

    /// True for any `image/*` MIME type.
    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

/// Which document slot a file fills in the multipart payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileRole {
    DocumentFront,
    DocumentBack,
    Selfie,
    ResidenceProof,
}

impl FileRole {
    pub const ALL: [FileRole; 4] = [
        FileRole::DocumentFront,
        FileRole::DocumentBack,
        FileRole::Selfie,
        FileRole::ResidenceProof,
    ];

    /// Multipart field name expected by the API.
    pub fn field_name(&self) -> &'static str {
        match self {
            FileRole::DocumentFront => "documentFront",
            FileRole::DocumentBack => "documentBack",
            FileRole::Selfie => "selfie",
            FileRole::ResidenceProof => "residenceProof",
        }
    }

    /// Slug used when a file arrives without a usable name.
    pub fn slug(&self) -> &'static str {
        match self {
            FileRole::DocumentFront => "documento_frente",
            FileRole::DocumentBack => "documento_verso",
            FileRole::Selfie => "selfie",
            FileRole::ResidenceProof => "comprovante_residencia",
        }
    }

    /// Identity-document photos only accept images; the residence proof also takes PDFs.
    pub fn accepts_pdf(&self) -> bool {
        matches!(self, FileRole::ResidenceProof)
    }
}

/// Build a descriptive `.jpg` name for a compressed upload that lacked one.
///
/// The holder's name, when given, is appended so the backend can tell uploads apart.
pub fn descriptive_name(role: FileRole, holder: Option<&str>) -> String {
    let base = match holder.map(str::trim).filter(|h| !h.is_empty()) {
        Some(holder) => sanitize_component(&format!("{}_{}", role.slug(), holder)),
        None => role.slug().to_string(),
    };
    format!("{base}.jpg")
}
