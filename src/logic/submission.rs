// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 EssencialPay

//! Multipart payload assembly and the API surface the form talks to.
//!
//! Sending the request is left to the caller; this module decides what goes in
//! it, where it goes and how to read the status that comes back.

use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

use crate::logic::formatters::{CEP_DIGITS, only_digits};
use crate::logic::validators::AccountRules;
use crate::models::registration::{FieldErrors, RegistrationFields, RegistrationForm, validate_form};
use crate::models::upload::{FileRole, UploadFile};

/// Text part of the multipart body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextPart {
    pub name: &'static str,
    pub value: String,
}

/// File part of the multipart body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilePart {
    pub name: &'static str,
    pub file: UploadFile,
}

/// Ordered multipart payload for `POST /api/users`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionPayload {
    pub text: Vec<TextPart>,
    pub files: Vec<FilePart>,
}

impl SubmissionPayload {
    /// Validate `form` and lay it out as the API expects.
    ///
    /// The account is sent as `account-dv` when a check digit is present.
    ///
    /// # Errors
    ///
    /// Returns the field errors when the form does not pass validation.
    pub fn build(form: &RegistrationForm, rules: &AccountRules) -> Result<Self, FieldErrors> {
        let errors = validate_form(form, rules);
        if !errors.is_empty() {
            return Err(errors);
        }

        let f = &form.fields;
        let account = if f.account_dv.is_empty() {
            f.account.clone()
        } else {
            format!("{}-{}", f.account, f.account_dv)
        };

        let text = vec![
            part("phone", &f.phone),
            part("fullName", &f.full_name),
            part(
                "accountCategory",
                f.account_category.map(|c| c.as_str()).unwrap_or_default(),
            ),
            part("cpf", &f.cpf),
            part("cnpj", &f.cnpj),
            part("email", &f.email),
            part("state", &f.state),
            part("bankName", &f.bank_name),
            part("accountType", &f.account_type),
            part("agency", &f.agency),
            TextPart {
                name: "account",
                value: account,
            },
            part(
                "documentType",
                f.document_type.map(|d| d.as_str()).unwrap_or_default(),
            ),
        ];

        let files = [
            FileRole::DocumentFront,
            FileRole::DocumentBack,
            FileRole::ResidenceProof,
            FileRole::Selfie,
        ]
        .into_iter()
        .filter_map(|role| {
            form.documents.get(role).map(|file| FilePart {
                name: role.field_name(),
                file: file.clone(),
            })
        })
        .collect();

        Ok(Self { text, files })
    }

    /// Total bytes of all file parts.
    pub fn file_bytes(&self) -> u64 {
        self.files.iter().map(|p| p.file.size()).sum()
    }
}

fn part(name: &'static str, value: &str) -> TextPart {
    TextPart {
        name,
        value: value.to_string(),
    }
}

/// Base URL of the registration API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    base: Url,
}

impl ApiConfig {
    pub const DEFAULT_BASE_URL: &'static str =
        "https://essencialpay-form-backend-production.up.railway.app";

    /// Endpoints are resolved under the base path, so a gateway prefix such as
    /// `https://host/essencial` is kept.
    ///
    /// # Errors
    ///
    /// Returns an error when `base` is not an absolute http(s) URL.
    pub fn new(base: &str) -> Result<Self> {
        let mut base = Url::parse(base).with_context(|| format!("Invalid API base URL: {base}"))?;
        if !matches!(base.scheme(), "http" | "https") || base.host_str().is_none() {
            anyhow::bail!("API base URL must be http(s) with a host: {base}");
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `POST` target for the registration payload.
    pub fn users_endpoint(&self) -> Result<Url> {
        self.base
            .join("api/users")
            .context("Failed to build users endpoint")
    }

    /// `GET` target for the postal-code lookup; `None` unless `cep` has 8 digits.
    pub fn cep_endpoint(&self, cep: &str) -> Option<Url> {
        let digits = only_digits(cep, usize::MAX);
        if digits.len() != CEP_DIGITS {
            return None;
        }
        self.base.join(&format!("api/cep/{digits}")).ok()
    }
}

/// How the caller should react to the API's HTTP status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitStatus {
    Accepted,
    /// 413 or 500: recompress harder or ask for smaller files.
    PayloadTooLarge,
    Rejected(u16),
}

impl SubmitStatus {
    pub fn from_http_status(status: u16) -> Self {
        match status {
            200..=299 => SubmitStatus::Accepted,
            413 | 500 => SubmitStatus::PayloadTooLarge,
            other => SubmitStatus::Rejected(other),
        }
    }

    /// Message shown to the applicant, `None` on success.
    pub fn user_message(&self) -> Option<String> {
        match self {
            SubmitStatus::Accepted => None,
            SubmitStatus::PayloadTooLarge => Some(
                "Arquivos muito grandes. Envie imagens menores e tente novamente.".to_string(),
            ),
            SubmitStatus::Rejected(code) => Some(format!("Erro HTTP: {code}")),
        }
    }
}

/// Address returned by the postal-code lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressLookup {
    pub state: String,
    pub city: String,
    pub neighborhood: String,
    pub street: String,
}

impl AddressLookup {
    /// # Errors
    ///
    /// Returns an error when the body is not a JSON address object.
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body).context("Failed to parse CEP lookup response")
    }

    /// Fill address fields, leaving existing values where the lookup came back empty.
    pub fn apply_to(&self, fields: &mut RegistrationFields) {
        for (target, value) in [
            (&mut fields.state, &self.state),
            (&mut fields.city, &self.city),
            (&mut fields.neighborhood, &self.neighborhood),
            (&mut fields.street, &self.street),
        ] {
            if !value.trim().is_empty() {
                *target = value.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::registration::FormField;
    use crate::models::registration::tests::complete_form;

    #[test]
    fn build_orders_parts_and_joins_account() {
        let payload = SubmissionPayload::build(&complete_form(), &AccountRules::default()).unwrap();

        let names: Vec<_> = payload.text.iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            vec![
                "phone",
                "fullName",
                "accountCategory",
                "cpf",
                "cnpj",
                "email",
                "state",
                "bankName",
                "accountType",
                "agency",
                "account",
                "documentType",
            ]
        );
        let account = payload.text.iter().find(|p| p.name == "account").unwrap();
        assert_eq!(account.value, "1234567-8");
        let category = payload.text.iter().find(|p| p.name == "accountCategory").unwrap();
        assert_eq!(category.value, "pessoa_fisica");

        let files: Vec<_> = payload.files.iter().map(|p| p.name).collect();
        assert_eq!(files, vec!["documentFront", "documentBack", "residenceProof", "selfie"]);
        assert_eq!(payload.file_bytes(), 12);
    }

    #[test]
    fn build_refuses_invalid_forms() {
        let mut form = complete_form();
        form.fields.email = "sem-arroba".into();
        let errors = SubmissionPayload::build(&form, &AccountRules::default()).unwrap_err();
        assert!(errors.contains_key(&FormField::Email));
    }

    #[test]
    fn account_without_dv_is_sent_as_is() {
        let mut form = complete_form();
        form.fields.account = "123456".into();
        form.fields.account_dv.clear();
        let payload = SubmissionPayload::build(&form, &AccountRules::COMBINED).unwrap();
        let account = payload.text.iter().find(|p| p.name == "account").unwrap();
        assert_eq!(account.value, "123456");
    }

    #[test]
    fn endpoints_join_onto_base() {
        let api = ApiConfig::new("http://localhost:8080").unwrap();
        assert_eq!(
            api.users_endpoint().unwrap().as_str(),
            "http://localhost:8080/api/users"
        );
        assert_eq!(
            api.cep_endpoint("01310-100").unwrap().as_str(),
            "http://localhost:8080/api/cep/01310100"
        );
        assert!(api.cep_endpoint("0131").is_none());

        let prefixed = ApiConfig::new("https://gateway.example.com/essencial").unwrap();
        assert_eq!(
            prefixed.users_endpoint().unwrap().as_str(),
            "https://gateway.example.com/essencial/api/users"
        );
        assert_eq!(
            prefixed.cep_endpoint("01310100").unwrap().as_str(),
            "https://gateway.example.com/essencial/api/cep/01310100"
        );
        let slashed = ApiConfig::new("https://gateway.example.com/essencial/").unwrap();
        assert_eq!(slashed, prefixed);
        assert!(ApiConfig::new("ftp://example.com").is_err());
        assert!(ApiConfig::new("not a url").is_err());
    }

    #[test]
    fn status_classification() {
        assert_eq!(SubmitStatus::from_http_status(201), SubmitStatus::Accepted);
        assert_eq!(SubmitStatus::from_http_status(413), SubmitStatus::PayloadTooLarge);
        assert_eq!(SubmitStatus::from_http_status(500), SubmitStatus::PayloadTooLarge);
        assert_eq!(SubmitStatus::from_http_status(400), SubmitStatus::Rejected(400));
        assert!(SubmitStatus::Accepted.user_message().is_none());
        assert_eq!(
            SubmitStatus::Rejected(404).user_message().as_deref(),
            Some("Erro HTTP: 404")
        );
    }

    #[test]
    fn address_lookup_fills_non_empty_fields() {
        let lookup = AddressLookup::from_json(
            r#"{"state":"SP","city":"São Paulo","neighborhood":"","street":"Av. Paulista"}"#,
        )
        .unwrap();
        let mut fields = RegistrationFields {
            neighborhood: "Bela Vista".into(),
            ..Default::default()
        };
        lookup.apply_to(&mut fields);

        assert_eq!(fields.state, "SP");
        assert_eq!(fields.city, "São Paulo");
        assert_eq!(fields.neighborhood, "Bela Vista");
        assert_eq!(fields.street, "Av. Paulista");
        assert!(AddressLookup::from_json("not json").is_err());
    }
}
