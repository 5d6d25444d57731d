// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 EssencialPay

//! Pure predicates deciding whether a field value is well-formed.
//!
//! Validators accept formatted or raw input; punctuation is stripped where the
//! rule only cares about digits. None of them panic.

use std::ops::RangeInclusive;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::formatters::{CEP_DIGITS, CNPJ_DIGITS, CPF_DIGITS, only_digits};

const CPF_FIRST_WEIGHTS: [u32; 9] = [10, 9, 8, 7, 6, 5, 4, 3, 2];
const CPF_SECOND_WEIGHTS: [u32; 10] = [11, 10, 9, 8, 7, 6, 5, 4, 3, 2];
const CNPJ_FIRST_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const CNPJ_SECOND_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static CPF_MASK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{3}\.[0-9]{3}\.[0-9]{3}-[0-9]{2}$").expect("valid CPF regex")
});
static CNPJ_MASK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{2}\.[0-9]{3}\.[0-9]{3}/[0-9]{4}-[0-9]{2}$").expect("valid CNPJ regex")
});
static PHONE_MASK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\([0-9]{2}\)\s[0-9]{4,5}-[0-9]{4}$").expect("valid phone regex")
});
static RANDOM_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("valid random key regex")
});

/// Modulo-11 check digit: remainder below 2 maps to 0, otherwise `11 - remainder`.
fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    let remainder = sum % 11;
    if remainder < 2 { 0 } else { 11 - remainder }
}

/// Parse exactly `len` digits that are not all identical.
fn checksum_candidate(value: &str, len: usize) -> Option<Vec<u32>> {
    let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != len || digits.iter().all(|d| *d == digits[0]) {
        return None;
    }
    Some(digits)
}

/// Validate a CPF's length and both check digits.
///
/// ```
/// use essencial_form::logic::validators::validate_cpf;
/// assert!(validate_cpf("390.533.447-05"));
/// assert!(!validate_cpf("111.111.111-11"));
/// ```
pub fn validate_cpf(value: &str) -> bool {
    let Some(digits) = checksum_candidate(value, CPF_DIGITS) else {
        return false;
    };
    check_digit(&digits[..9], &CPF_FIRST_WEIGHTS) == digits[9]
        && check_digit(&digits[..10], &CPF_SECOND_WEIGHTS) == digits[10]
}

/// Validate a CNPJ's length and both check digits.
pub fn validate_cnpj(value: &str) -> bool {
    let Some(digits) = checksum_candidate(value, CNPJ_DIGITS) else {
        return false;
    };
    check_digit(&digits[..12], &CNPJ_FIRST_WEIGHTS) == digits[12]
        && check_digit(&digits[..13], &CNPJ_SECOND_WEIGHTS) == digits[13]
}

/// Structural email check: non-blank local part, `@`, domain containing a dot.
///
/// Unusual but RFC-valid addresses may be rejected.
pub fn validate_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// Landline (10) or mobile (11) digit count.
pub fn validate_phone(value: &str) -> bool {
    matches!(only_digits(value, usize::MAX).len(), 10 | 11)
}

/// CEP must carry exactly eight digits.
pub fn validate_cep(value: &str) -> bool {
    only_digits(value, usize::MAX).len() == CEP_DIGITS
}

/// Validate a PIX key by delegating on its shape.
///
/// Blank keys are accepted since the field is optional. Random keys only need
/// to look like 8-4-4-4-12 hex groups; version and variant bits are not checked.
pub fn validate_pix_key(value: &str) -> bool {
    if value.trim().is_empty() {
        return true;
    }
    if value.contains('@') {
        return validate_email(value);
    }
    if CPF_MASK_RE.is_match(value) {
        return validate_cpf(value);
    }
    if CNPJ_MASK_RE.is_match(value) {
        return validate_cnpj(value);
    }
    if PHONE_MASK_RE.is_match(value) {
        return validate_phone(value);
    }
    RANDOM_KEY_RE.is_match(value)
}

/// Length bounds for bank account fields.
///
/// Earlier revisions of the form disagreed on these, so they are configurable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRules {
    /// Allowed digit count for the account number.
    pub account_digits: RangeInclusive<usize>,
    /// Allowed digit count for the separate check digit, `None` when the form has no DV field.
    pub check_digit_digits: Option<RangeInclusive<usize>>,
}

impl AccountRules {
    /// Account of 1–9 digits plus a separate 1–2 digit DV field.
    pub const SPLIT_CHECK_DIGIT: AccountRules = AccountRules {
        account_digits: 1..=9,
        check_digit_digits: Some(1..=2),
    };

    /// Single account field of 6–7 digits, no separate DV.
    pub const COMBINED: AccountRules = AccountRules {
        account_digits: 6..=7,
        check_digit_digits: None,
    };

    /// Parse the `split`/`combined` names used in configuration.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "split" => Some(Self::SPLIT_CHECK_DIGIT),
            "combined" => Some(Self::COMBINED),
            _ => None,
        }
    }

    pub fn requires_check_digit(&self) -> bool {
        self.check_digit_digits.is_some()
    }
}

impl Default for AccountRules {
    fn default() -> Self {
        Self::SPLIT_CHECK_DIGIT
    }
}

/// Account number: digits (and `-` separators) whose digit count fits the rules.
pub fn validate_account(value: &str, rules: &AccountRules) -> bool {
    let value = value.trim();
    value.chars().all(|c| c.is_ascii_digit() || c == '-')
        && rules.account_digits.contains(&only_digits(value, usize::MAX).len())
}

/// Check digit: digits only, length within the rules. Always true when the rules have no DV.
pub fn validate_account_check_digit(value: &str, rules: &AccountRules) -> bool {
    let Some(range) = &rules.check_digit_digits else {
        return true;
    };
    let value = value.trim();
    value.chars().all(|c| c.is_ascii_digit()) && range.contains(&value.len())
}
