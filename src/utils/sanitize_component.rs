// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 EssencialPay

//! Produce upload-safe file name components for multipart parts.

/// Name used when nothing survives sanitization.
pub const FALLBACK_NAME: &str = "arquivo";

/// Produce a file name component the backend can store verbatim.
///
/// # Steps
/// - Transliterate Unicode to ASCII with `deunicode` (e.g., "João" → "Joao").
/// - Lowercase; allow ASCII alphanumerics plus `-`, `_`, and `.`; everything else becomes `_`.
/// - Collapse runs of `_` and `.`; drop `_` right before a dot.
/// - Trim leading/trailing `_` and `.`.
///
/// Empty results fall back to [`FALLBACK_NAME`].
pub fn sanitize_component(value: &str) -> String {
    let transliterated = deunicode::deunicode(value).to_ascii_lowercase();
    let mut out = String::with_capacity(transliterated.len());

    for ch in transliterated.chars() {
        let mapped = if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' {
            ch
        } else {
            '_'
        };

        match (mapped, out.chars().last()) {
            ('_', Some('_')) | ('.', Some('.')) => {}
            ('.', Some('_')) => {
                out.pop();
                if !out.ends_with('.') {
                    out.push('.');
                }
            }
            (c, _) => out.push(c),
        }
    }

    let trimmed = out.trim_matches(|c| c == '_' || c == '.');
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{FALLBACK_NAME, sanitize_component};

    // Accents are transliterated and the extension survives.
    #[test]
    fn sanitize_component_transliterates_and_keeps_extension() {
        assert_eq!(
            sanitize_component("Comprovante Água (março).PDF"),
            "comprovante_agua_marco.pdf"
        );
    }

    // Separators collapse to single underscores.
    #[test]
    fn sanitize_component_collapses_separators() {
        assert_eq!(sanitize_component("João  da / Silva"), "joao_da_silva");
    }

    #[test]
    fn sanitize_component_deduplicates_dots() {
        assert_eq!(sanitize_component("foto..frente...jpg"), "foto.frente.jpg");
    }

    // Only punctuation falls back to the default name.
    #[test]
    fn sanitize_component_falls_back_for_empty_names() {
        assert_eq!(sanitize_component(""), FALLBACK_NAME);
        assert_eq!(sanitize_component(" ... "), FALLBACK_NAME);
    }
}
