// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 EssencialPay

//! Command-line front end for the sign-up form core.
//!
//! ```bash
//! essencial-form format cpf 39053344705
//! essencial-form validate pix-key "+55 (11) 98765-4321"
//! essencial-form compress rg-frente.png selfie.jpg -o out/ --device mobile
//! essencial-form check-form cadastro.json
//! ```
//!
//! Configuration comes from the environment (and a `.env` file when present);
//! see [`essencial_form::config`].

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use tracing::{info, warn};

use essencial_form::config::AppConfig;
use essencial_form::logging;
use essencial_form::logic::compress::{CompressionOptions, DeviceClass};
use essencial_form::logic::formatters::{
    format_account, format_account_check_digit, format_agency, format_cep, format_cnpj,
    format_cpf, format_full_name, format_phone,
};
use essencial_form::logic::intake::{DOCUMENT_TARGET_MB, prepare_upload};
use essencial_form::logic::submission::SubmissionPayload;
use essencial_form::logic::validators::{
    AccountRules, validate_account, validate_account_check_digit, validate_cep, validate_cnpj,
    validate_cpf, validate_email, validate_phone, validate_pix_key,
};
use essencial_form::logic::worker::{CompressJob, CompressionWorker};
use essencial_form::models::registration::{RegistrationFields, RegistrationForm, error_summary};
use essencial_form::models::upload::{FileRole, UploadFile};
use essencial_form::utils::format_bytes;

#[derive(Parser)]
#[command(name = "essencial-form")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply an input mask to a value
    Format { kind: FormatKind, value: String },

    /// Check a value; exits with status 1 when it is invalid
    Validate { kind: CheckKind, value: String },

    /// Compress images for upload
    Compress {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Use the preset for this document slot instead of the device preset
        #[arg(long)]
        role: Option<RoleArg>,

        /// Device class; overrides ESSENCIAL_DEVICE
        #[arg(long, value_parser = parse_device, conflicts_with = "role")]
        device: Option<DeviceClass>,

        /// Size budget in MB, capped by the device class
        #[arg(long, default_value_t = DOCUMENT_TARGET_MB, conflicts_with = "role")]
        target_mb: f64,
    },

    /// Validate a form manifest and show the payload it would send
    CheckForm { manifest: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatKind {
    Cpf,
    Cnpj,
    Phone,
    Cep,
    Agency,
    Account,
    AccountDv,
    Name,
}

#[derive(Clone, Copy, ValueEnum)]
enum CheckKind {
    Cpf,
    Cnpj,
    Email,
    Phone,
    Cep,
    PixKey,
    Account,
    AccountDv,
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    DocumentFront,
    DocumentBack,
    Selfie,
    ResidenceProof,
}

impl From<RoleArg> for FileRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::DocumentFront => FileRole::DocumentFront,
            RoleArg::DocumentBack => FileRole::DocumentBack,
            RoleArg::Selfie => FileRole::Selfie,
            RoleArg::ResidenceProof => FileRole::ResidenceProof,
        }
    }
}

fn parse_device(value: &str) -> Result<DeviceClass, String> {
    DeviceClass::from_name(value).ok_or_else(|| format!("expected mobile or desktop, got {value}"))
}

/// Form manifest: text fields plus file paths keyed by slot.
///
/// Relative paths are resolved against the manifest's directory.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FormManifest {
    fields: RegistrationFields,
    files: HashMap<FileRole, PathBuf>,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let console = logging::init(&config)?;

    let code = match cli.command {
        Commands::Format { kind, value } => {
            println!("{}", format_value(kind, &value));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate { kind, value } => {
            if check_value(kind, &value, &config.account_rules) {
                println!("válido");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("inválido");
                Ok(ExitCode::from(1))
            }
        }
        Commands::Compress {
            inputs,
            output,
            role,
            device,
            target_mb,
        } => {
            let options = match role {
                Some(role) => CompressionOptions::for_role(role.into()),
                None => CompressionOptions::for_device(device.unwrap_or(config.device), target_mb),
            };
            compress_files(&inputs, &output, role.map(FileRole::from), options)
        }
        Commands::CheckForm { manifest } => check_form(&manifest, &config),
    }?;

    if let Some(console) = console {
        for entry in console.entries() {
            eprintln!("{}", serde_json::to_string(&entry)?);
        }
    }
    Ok(code)
}

fn format_value(kind: FormatKind, value: &str) -> String {
    match kind {
        FormatKind::Cpf => format_cpf(value),
        FormatKind::Cnpj => format_cnpj(value),
        FormatKind::Phone => format_phone(value),
        FormatKind::Cep => format_cep(value),
        FormatKind::Agency => format_agency(value),
        FormatKind::Account => format_account(value),
        FormatKind::AccountDv => format_account_check_digit(value),
        FormatKind::Name => format_full_name(value),
    }
}

fn check_value(kind: CheckKind, value: &str, rules: &AccountRules) -> bool {
    match kind {
        CheckKind::Cpf => validate_cpf(value),
        CheckKind::Cnpj => validate_cnpj(value),
        CheckKind::Email => validate_email(value),
        CheckKind::Phone => validate_phone(value),
        CheckKind::Cep => validate_cep(value),
        CheckKind::PixKey => validate_pix_key(value),
        CheckKind::Account => validate_account(value, rules),
        CheckKind::AccountDv => validate_account_check_digit(value, rules),
    }
}

fn compress_files(
    inputs: &[PathBuf],
    output: &Path,
    role: Option<FileRole>,
    options: CompressionOptions,
) -> Result<ExitCode> {
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory: {:?}", output))?;

    let worker = CompressionWorker::with_default_threads();
    let mut pending = HashMap::new();
    for input in inputs {
        let file = UploadFile::from_path(input)?;
        let ticket = worker.submit(CompressJob {
            role: role.unwrap_or(FileRole::DocumentFront),
            file,
            options: options.clone(),
        });
        pending.insert(ticket, input.clone());
    }

    let mut failures = 0usize;
    while !pending.is_empty() {
        let outcome = worker.recv().context("Compression workers stopped unexpectedly")?;
        let Some(input) = pending.remove(&outcome.ticket) else {
            continue;
        };
        match outcome.result {
            Ok(compressed) => {
                let target = output_path(&input, output, &compressed.file.mime);
                if fs::canonicalize(&target).ok() == fs::canonicalize(&input).ok() {
                    warn!(path = ?target, "refusing to overwrite the input file");
                    failures += 1;
                    continue;
                }
                fs::write(&target, &compressed.file.bytes)
                    .with_context(|| format!("Failed to write {:?}", target))?;
                let report = &compressed.report;
                info!(input = ?input, output = ?target, "compressed");
                println!(
                    "{} -> {} ({} -> {}, {})",
                    input.display(),
                    target.display(),
                    format_bytes(report.original_size),
                    format_bytes(report.final_size),
                    size_change(report.reduction_percent())
                );
            }
            Err(err) => {
                eprintln!("{}: {err}", input.display());
                failures += 1;
            }
        }
    }

    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Signed size change for the summary line.
fn size_change(reduction_percent: i64) -> String {
    match reduction_percent {
        0 => "unchanged".to_string(),
        p if p > 0 => format!("-{p}%"),
        p => format!("+{}%", -p),
    }
}

/// `<output>/<stem>.jpg` for JPEG results, the original file name otherwise.
fn output_path(input: &Path, output: &Path, mime: &str) -> PathBuf {
    let name = match (mime, input.file_stem()) {
        ("image/jpeg", Some(stem)) => {
            let mut name = stem.to_os_string();
            name.push(".jpg");
            name
        }
        _ => input.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "imagem.jpg".into()),
    };
    output.join(name)
}

fn load_manifest(path: &Path) -> Result<FormManifest> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {:?}", path))?;
    let mut manifest: FormManifest = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse manifest: {:?}", path))?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    for file in manifest.files.values_mut() {
        if file.is_relative() {
            *file = base.join(&*file);
        }
    }
    Ok(manifest)
}

fn check_form(path: &Path, config: &AppConfig) -> Result<ExitCode> {
    let manifest = load_manifest(path)?;
    let holder = Some(manifest.fields.full_name.as_str());

    let mut form = RegistrationForm {
        fields: manifest.fields.clone(),
        ..Default::default()
    };
    for role in FileRole::ALL {
        let Some(file_path) = manifest.files.get(&role) else {
            continue;
        };
        let file = UploadFile::from_path(file_path)?;
        match prepare_upload(role, file, config.device, holder) {
            Ok(file) => form.documents.set(role, Some(file)),
            Err(err) => eprintln!("{}: {err}", role.field_name()),
        }
    }

    match SubmissionPayload::build(&form, &config.account_rules) {
        Ok(payload) => {
            let endpoint = config.api.users_endpoint()?;
            println!("POST {endpoint}");
            for part in &payload.text {
                println!("  {}: {}", part.name, part.value);
            }
            for part in &payload.files {
                println!(
                    "  {}: {} ({}, {})",
                    part.name,
                    part.file.name,
                    part.file.mime,
                    format_bytes(part.file.size())
                );
            }
            println!("Total: {}", format_bytes(payload.file_bytes()));
            Ok(ExitCode::SUCCESS)
        }
        Err(errors) => {
            println!("Por favor, corrija os seguintes campos:");
            for line in error_summary(&errors) {
                println!("  - {line}");
            }
            Ok(ExitCode::from(1))
        }
    }
}
