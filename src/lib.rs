// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 EssencialPay

//! Client-side core of the EssencialPay terminal sign-up form.
//!
//! - [`logic::formatters`] and [`logic::validators`] mask and check CPF, CNPJ,
//!   phone, CEP, bank and PIX inputs.
//! - [`logic::compress`] shrinks document photos to fit the upload budget.
//! - [`models`] holds the registration record and upload blobs the form gathers.

pub mod config;
pub mod logging;
pub mod logic;
pub mod models;
pub mod utils;
