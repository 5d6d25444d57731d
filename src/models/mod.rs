// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 EssencialPay

//! Domain layer: form fields, selected files and their validation.

pub mod registration;
pub mod upload;
