// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 EssencialPay

//! File-selection rules applied before an upload is attached to the form.

use tracing::{info, warn};

use crate::logic::compress::{
    CompressError, CompressionOptions, DEFAULT_UPLOAD_LIMIT_MB, DeviceClass, compress_image,
    fits_upload_limit,
};
use crate::models::upload::{FileRole, PDF_MIME, UploadFile, descriptive_name};

/// Budget requested for identity-document photos before the device cap applies.
pub const DOCUMENT_TARGET_MB: f64 = 3.0;

/// Why a selected file was not attached.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Por favor, selecione uma imagem válida (PNG, JPG, JPEG, WEBP).")]
    NotAnImage,
    #[error("Apenas arquivos PNG, JPG, JPEG, WEBP ou PDF são permitidos")]
    UnsupportedType,
    #[error("Arquivo muito grande. Máximo 5MB.")]
    TooLarge,
    #[error("Erro ao processar a imagem. Por favor, tente novamente.")]
    Compression(#[source] CompressError),
}

/// Accept or reject a file picked for `role`, compressing it when needed.
///
/// - Identity photos (front, back, selfie) must be PNG/JPEG/WEBP and are always
///   compressed with the device preset; a compression failure rejects the file.
/// - Residence proofs may also be PDFs; anything over 5 MB is compressed when it
///   is an image and rejected otherwise.
///
/// Compressed files that arrive without a name get one built from `role` and `holder`.
pub fn prepare_upload(
    role: FileRole,
    file: UploadFile,
    device: DeviceClass,
    holder: Option<&str>,
) -> Result<UploadFile, IntakeError> {
    let options = CompressionOptions::for_device(device, DOCUMENT_TARGET_MB);

    if !role.accepts_pdf() {
        if !file.is_valid_image() {
            return Err(IntakeError::NotAnImage);
        }
        let compressed = compress_image(&file, &options).map_err(|err| {
            warn!(role = role.field_name(), error = %err, "failed to compress document photo");
            IntakeError::Compression(err)
        })?;
        return Ok(named(compressed.file, role, holder));
    }

    if !file.is_valid_image() && file.mime != PDF_MIME {
        return Err(IntakeError::UnsupportedType);
    }
    if fits_upload_limit(&file, DEFAULT_UPLOAD_LIMIT_MB) {
        return Ok(file);
    }
    if !file.is_image() {
        return Err(IntakeError::TooLarge);
    }

    match compress_image(&file, &options) {
        Ok(compressed) => {
            info!(
                role = role.field_name(),
                size = compressed.file.size(),
                "oversized residence proof compressed"
            );
            Ok(named(compressed.file, role, holder))
        }
        Err(err) => {
            warn!(role = role.field_name(), error = %err, "failed to compress residence proof");
            Err(IntakeError::TooLarge)
        }
    }
}

fn named(mut file: UploadFile, role: FileRole, holder: Option<&str>) -> UploadFile {
    if file.name.trim().is_empty() {
        file.name = descriptive_name(role, holder);
    }
    file
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageBuffer, ImageFormat, Rgb, RgbImage};

    use super::*;

    fn png(width: u32, height: u32, name: &str) -> UploadFile {
        let img: RgbImage = ImageBuffer::from_pixel(width, height, Rgb([10, 120, 200]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        UploadFile::new(name, "image/png", buf.into_inner())
    }

    #[test]
    fn document_photos_must_be_images() {
        let pdf = UploadFile::new("rg.pdf", PDF_MIME, vec![1; 10]);
        let err =
            prepare_upload(FileRole::DocumentFront, pdf, DeviceClass::Desktop, None).unwrap_err();
        assert!(matches!(err, IntakeError::NotAnImage));
    }

    #[test]
    fn small_document_photo_passes_through_compression_untouched() {
        let file = png(20, 20, "rg.png");
        let out =
            prepare_upload(FileRole::Selfie, file.clone(), DeviceClass::Mobile, None).unwrap();
        assert_eq!(out, file);
    }

    #[test]
    fn residence_proof_accepts_small_pdf() {
        let pdf = UploadFile::new("conta.pdf", PDF_MIME, vec![1; 1024]);
        let out = prepare_upload(
            FileRole::ResidenceProof,
            pdf.clone(),
            DeviceClass::Desktop,
            None,
        )
        .unwrap();
        assert_eq!(out, pdf);
    }

    #[test]
    fn residence_proof_rejects_other_types_and_large_pdfs() {
        let doc = UploadFile::new("conta.docx", "application/msword", vec![1; 10]);
        assert!(matches!(
            prepare_upload(FileRole::ResidenceProof, doc, DeviceClass::Desktop, None),
            Err(IntakeError::UnsupportedType)
        ));

        let big_pdf = UploadFile::new("conta.pdf", PDF_MIME, vec![1; 6 * 1024 * 1024]);
        assert!(matches!(
            prepare_upload(FileRole::ResidenceProof, big_pdf, DeviceClass::Desktop, None),
            Err(IntakeError::TooLarge)
        ));
    }

    #[test]
    fn undecodable_document_photo_is_rejected() {
        let broken = UploadFile::new("rg.jpg", "image/jpeg", vec![0xAB; 4 * 1024 * 1024]);
        let err = prepare_upload(FileRole::DocumentBack, broken, DeviceClass::Desktop, None)
            .unwrap_err();
        assert!(matches!(err, IntakeError::Compression(CompressError::Decode(_))));
    }

    #[test]
    fn nameless_compressed_upload_gets_descriptive_name() {
        let file = png(4, 4, "");
        let mut out = named(file, FileRole::DocumentFront, Some("Zé Maria"));
        assert_eq!(out.name, "documento_frente_ze_maria.jpg");

        out.name = "kept.jpg".into();
        assert_eq!(named(out, FileRole::DocumentFront, None).name, "kept.jpg");
    }
}
