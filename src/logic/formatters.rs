// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 EssencialPay

//! Keystroke formatters that re-render raw input into display masks.
//!
//! Every formatter strips non-canonical characters before inserting punctuation,
//! so applying one to its own output is a no-op. Partial input yields a partial
//! mask rather than an error.

pub const CPF_DIGITS: usize = 11;
pub const CNPJ_DIGITS: usize = 14;
pub const PHONE_DIGITS: usize = 11;
pub const CEP_DIGITS: usize = 8;
pub const AGENCY_DIGITS: usize = 4;
pub const ACCOUNT_CHARS: usize = 15;
pub const ACCOUNT_CHECK_DIGITS: usize = 2;

const CPF_MASK: &[(usize, &str)] = &[(3, "."), (6, "."), (9, "-")];
const CNPJ_MASK: &[(usize, &str)] = &[(2, "."), (5, "."), (8, "/"), (12, "-")];
const CEP_MASK: &[(usize, &str)] = &[(5, "-")];

/// Keep only ASCII digits, at most `max` of them.
pub fn only_digits(value: &str, max: usize) -> String {
    value.chars().filter(char::is_ascii_digit).take(max).collect()
}

/// Insert each separator before the digit at its index, once that digit exists.
fn apply_mask(digits: &str, mask: &[(usize, &str)]) -> String {
    let mut out = String::with_capacity(digits.len() + mask.len() * 2);
    for (idx, ch) in digits.chars().enumerate() {
        if let Some((_, sep)) = mask.iter().find(|(pos, _)| *pos == idx) {
            out.push_str(sep);
        }
        out.push(ch);
    }
    out
}

/// Format a CPF as `XXX.XXX.XXX-XX`.
///
/// ```
/// use essencial_form::logic::formatters::format_cpf;
/// assert_eq!(format_cpf("12345678909"), "123.456.789-09");
/// assert_eq!(format_cpf("12345"), "123.45");
/// ```
pub fn format_cpf(value: &str) -> String {
    apply_mask(&only_digits(value, CPF_DIGITS), CPF_MASK)
}

/// Format a CNPJ as `XX.XXX.XXX/XXXX-XX`.
pub fn format_cnpj(value: &str) -> String {
    apply_mask(&only_digits(value, CNPJ_DIGITS), CNPJ_MASK)
}

/// Format a Brazilian phone number as `(DD) XXXXX-XXXX` or `(DD) XXXX-XXXX`.
///
/// The area code is wrapped once a third digit arrives. The dash follows the
/// fifth subscriber digit, except for a complete 10-digit landline where it
/// follows the fourth.
pub fn format_phone(value: &str) -> String {
    let digits = only_digits(value, PHONE_DIGITS);
    if digits.len() <= 2 {
        return digits;
    }

    let (area, subscriber) = digits.split_at(2);
    let split = if digits.len() == 10 { 4 } else { 5 };
    if subscriber.len() > split {
        let (head, tail) = subscriber.split_at(split);
        format!("({area}) {head}-{tail}")
    } else {
        format!("({area}) {subscriber}")
    }
}

/// Format a CEP (postal code) as `XXXXX-XXX`.
pub fn format_cep(value: &str) -> String {
    apply_mask(&only_digits(value, CEP_DIGITS), CEP_MASK)
}

/// Bank agency: digits only, four at most.
pub fn format_agency(value: &str) -> String {
    only_digits(value, AGENCY_DIGITS)
}

/// Bank account: digits and `-` only, fifteen characters at most.
pub fn format_account(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-')
        .take(ACCOUNT_CHARS)
        .collect()
}

/// Account check digit (DV): digits only, two at most.
pub fn format_account_check_digit(value: &str) -> String {
    only_digits(value, ACCOUNT_CHECK_DIGITS)
}

/// Full name: ASCII letters, Latin-1 accented letters and whitespace.
pub fn format_full_name(value: &str) -> String {
    value
        .chars()
        .filter(|c| {
            c.is_ascii_alphabetic() || ('\u{C0}'..='\u{FF}').contains(c) || c.is_whitespace()
        })
        .collect()
}
