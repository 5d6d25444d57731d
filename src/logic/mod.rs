// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 EssencialPay

//! Business logic: input masks, document checks, image compression and the
//! rules that turn a filled form into an API submission.

pub mod compress;
pub mod formatters;
pub mod intake;
pub mod submission;
pub mod validators;
pub mod worker;
