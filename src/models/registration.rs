// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 EssencialPay

//! Registration record gathered by the sign-up form and its whole-form validation.
//! Kept UI-agnostic so the same rules serve the form, the CLI and tests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::logic::validators::{
    AccountRules, validate_account, validate_account_check_digit, validate_cnpj, validate_cpf,
    validate_email, validate_phone, validate_pix_key,
};
use crate::models::upload::{FileRole, UploadFile};

/// Individual (CPF) or company (CNPJ) account holder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountCategory {
    #[serde(rename = "pessoa_fisica")]
    PessoaFisica,
    #[serde(rename = "pessoa_juridica")]
    PessoaJuridica,
}

impl AccountCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountCategory::PessoaFisica => "pessoa_fisica",
            AccountCategory::PessoaJuridica => "pessoa_juridica",
        }
    }
}

/// Identity document the applicant photographs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    /// Identity card: front and back photos.
    #[serde(rename = "RG")]
    Rg,
    /// Driver's licence: a single photo.
    #[serde(rename = "CNH")]
    Cnh,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Rg => "RG",
            DocumentType::Cnh => "CNH",
        }
    }
}

/// Text fields of the form, named as the API expects them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationFields {
    pub full_name: String,
    pub phone: String,
    pub account_category: Option<AccountCategory>,
    pub cpf: String,
    pub cnpj: String,
    pub email: String,
    pub state: String,
    pub cep: String,
    pub city: String,
    pub neighborhood: String,
    pub street: String,
    pub number: String,
    pub complement: String,
    pub bank_name: String,
    pub account_type: String,
    pub agency: String,
    pub account: String,
    pub account_dv: String,
    pub pix_key: String,
    pub document_type: Option<DocumentType>,
    pub consent: bool,
}

/// Uploaded files, one slot per [`FileRole`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Documents {
    pub document_front: Option<UploadFile>,
    pub document_back: Option<UploadFile>,
    pub selfie: Option<UploadFile>,
    pub residence_proof: Option<UploadFile>,
}

impl Documents {
    pub fn get(&self, role: FileRole) -> Option<&UploadFile> {
        match role {
            FileRole::DocumentFront => self.document_front.as_ref(),
            FileRole::DocumentBack => self.document_back.as_ref(),
            FileRole::Selfie => self.selfie.as_ref(),
            FileRole::ResidenceProof => self.residence_proof.as_ref(),
        }
    }

    pub fn set(&mut self, role: FileRole, file: Option<UploadFile>) {
        let slot = match role {
            FileRole::DocumentFront => &mut self.document_front,
            FileRole::DocumentBack => &mut self.document_back,
            FileRole::Selfie => &mut self.selfie,
            FileRole::ResidenceProof => &mut self.residence_proof,
        };
        *slot = file;
    }
}

/// Complete registration: text fields plus document uploads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    pub fields: RegistrationFields,
    pub documents: Documents,
}

/// Form fields that can carry a validation error, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FormField {
    FullName,
    Cpf,
    Cnpj,
    AccountCategory,
    Email,
    Phone,
    Cep,
    State,
    City,
    Neighborhood,
    Street,
    Number,
    BankName,
    AccountType,
    Agency,
    Account,
    AccountDv,
    PixKey,
    DocumentType,
    DocumentFront,
    DocumentBack,
    Selfie,
    ResidenceProof,
    Consent,
}

impl FormField {
    /// Bullet shown in the error summary banner.
    pub fn summary_message(&self) -> &'static str {
        match self {
            FormField::FullName => "• Nome completo é obrigatório",
            FormField::Cpf => "• CPF inválido ou não preenchido",
            FormField::Cnpj => "• CNPJ inválido",
            FormField::AccountCategory => "• Tipo de cadastro é obrigatório",
            FormField::Email => "• Email inválido ou não preenchido",
            FormField::Phone => "• Telefone inválido ou não preenchido",
            FormField::Cep => "• CEP inválido ou não preenchido",
            FormField::State => "• Estado é obrigatório",
            FormField::City => "• Cidade é obrigatória",
            FormField::Neighborhood => "• Bairro é obrigatório",
            FormField::Street => "• Rua é obrigatória",
            FormField::Number => "• Número é obrigatório",
            FormField::BankName => "• Nome do banco é obrigatório",
            FormField::AccountType => "• Tipo de conta é obrigatório",
            FormField::Agency => "• Agência é obrigatória",
            FormField::Account => "• Conta bancária inválida ou não preenchida",
            FormField::AccountDv => "• Dígito verificador inválido ou não preenchido",
            FormField::PixKey => "• Chave PIX inválida",
            FormField::DocumentType => "• Tipo de documento é obrigatório",
            FormField::DocumentFront => "• Documento obrigatório não enviado",
            FormField::DocumentBack => "• Verso do documento obrigatório não enviado",
            FormField::Selfie => "• Selfie obrigatória não enviada",
            FormField::ResidenceProof => "• Comprovante de residência obrigatório",
            FormField::Consent => "• Aceite dos termos de uso é obrigatório",
        }
    }
}

/// Field-level messages, ordered by [`FormField`].
pub type FieldErrors = BTreeMap<FormField, String>;

/// Apply the form's submission rules and collect one message per failing field.
///
/// An empty map means the form can be submitted.
pub fn validate_form(form: &RegistrationForm, rules: &AccountRules) -> FieldErrors {
    let f = &form.fields;
    let docs = &form.documents;
    let mut errors = FieldErrors::new();
    let mut fail = |field: FormField, message: &str| {
        errors.insert(field, message.to_string());
    };

    if f.phone.is_empty() {
        fail(FormField::Phone, "Celular é obrigatório");
    } else if !validate_phone(&f.phone) {
        fail(FormField::Phone, "Celular inválido");
    }

    if f.full_name.trim().is_empty() {
        fail(FormField::FullName, "Nome completo é obrigatório");
    }

    match f.account_category {
        None => fail(FormField::AccountCategory, "Selecione o tipo de conta"),
        Some(AccountCategory::PessoaFisica) => {
            if f.cpf.is_empty() {
                fail(FormField::Cpf, "CPF é obrigatório");
            } else if !validate_cpf(&f.cpf) {
                fail(FormField::Cpf, "CPF inválido");
            }
        }
        Some(AccountCategory::PessoaJuridica) => {
            if f.cnpj.is_empty() {
                fail(FormField::Cnpj, "CNPJ é obrigatório");
            } else if !validate_cnpj(&f.cnpj) {
                fail(FormField::Cnpj, "CNPJ inválido");
            }
        }
    }

    if f.email.is_empty() {
        fail(FormField::Email, "Email é obrigatório");
    } else if !validate_email(&f.email) {
        fail(FormField::Email, "Email inválido");
    }

    if f.state.trim().is_empty() {
        fail(FormField::State, "Estado é obrigatório");
    }
    if f.bank_name.trim().is_empty() {
        fail(FormField::BankName, "Nome do banco é obrigatório");
    }
    if f.account_type.trim().is_empty() {
        fail(FormField::AccountType, "Tipo de conta é obrigatório");
    }
    if f.agency.trim().is_empty() {
        fail(FormField::Agency, "Agência é obrigatória");
    }

    if f.account.trim().is_empty() {
        fail(FormField::Account, "Conta é obrigatória");
    } else if !validate_account(&f.account, rules) {
        let range = &rules.account_digits;
        fail(
            FormField::Account,
            &format!("Conta deve ter entre {} e {} dígitos", range.start(), range.end()),
        );
    }

    if let Some(range) = &rules.check_digit_digits {
        if f.account_dv.trim().is_empty() {
            fail(FormField::AccountDv, "Dígito verificador é obrigatório");
        } else if !validate_account_check_digit(&f.account_dv, rules) {
            fail(
                FormField::AccountDv,
                &format!("DV deve ter entre {} e {} dígitos", range.start(), range.end()),
            );
        }
    }

    if !validate_pix_key(&f.pix_key) {
        fail(FormField::PixKey, "Chave PIX inválida");
    }

    match f.document_type {
        Some(DocumentType::Rg) => {
            if docs.document_front.is_none() {
                fail(FormField::DocumentFront, "Obrigatório enviar a frente do RG");
            }
            if docs.document_back.is_none() {
                fail(FormField::DocumentBack, "Obrigatório enviar o verso do RG");
            }
        }
        Some(DocumentType::Cnh) => {
            if docs.document_front.is_none() {
                fail(FormField::DocumentFront, "Obrigatório enviar a foto da CNH");
            }
        }
        None => fail(FormField::DocumentType, "Selecione o tipo de documento"),
    }

    if docs.residence_proof.is_none() {
        fail(FormField::ResidenceProof, "Comprovante de residência é obrigatório");
    }
    if docs.selfie.is_none() {
        fail(FormField::Selfie, "Selfie é obrigatória");
    }
    if !f.consent {
        fail(
            FormField::Consent,
            "Você deve aceitar os termos de uso e política de privacidade",
        );
    }

    errors
}

/// Bullet list for the validation banner, one line per failing field.
pub fn error_summary(errors: &FieldErrors) -> Vec<&'static str> {
    errors.keys().map(FormField::summary_message).collect()
}
