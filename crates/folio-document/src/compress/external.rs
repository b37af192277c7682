// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// External optimizer — run a Ghostscript-compatible binary as a subprocess,
// trying each configured candidate name in turn.
//
// The subprocess is awaited through `tokio::process`, so other requests keep
// running while it works. Each attempt yields a structured outcome carrying
// the exit code and captured stderr.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use folio_core::types::CompressionPreset;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Longest stderr excerpt kept per failed attempt.
const MAX_STDERR_CHARS: usize = 2000;

/// How a single candidate binary fared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    /// The binary could not be started (usually: not installed).
    LaunchFailed { reason: String },
    ExitedWithFailure { code: Option<i32>, stderr: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub binary: String,
    pub outcome: AttemptOutcome,
}

/// Result of walking the candidate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// `binary` exited with status 0; earlier failures are in `attempts`.
    Succeeded { binary: String, attempts: Vec<Attempt> },
    /// Every candidate failed.
    Exhausted { attempts: Vec<Attempt> },
}

impl ChainOutcome {
    /// One-line account of the failed attempts, for logs and error detail.
    pub fn summary(&self) -> String {
        let attempts = match self {
            ChainOutcome::Succeeded { attempts, .. } | ChainOutcome::Exhausted { attempts } => {
                attempts
            }
        };
        if attempts.is_empty() {
            return "no optimizer candidates configured".to_string();
        }
        attempts
            .iter()
            .map(|attempt| match &attempt.outcome {
                AttemptOutcome::Succeeded => format!("{}: ok", attempt.binary),
                AttemptOutcome::LaunchFailed { reason } => {
                    format!("{}: launch failed ({})", attempt.binary, reason)
                }
                AttemptOutcome::ExitedWithFailure { code, .. } => match code {
                    Some(code) => format!("{}: exited with {}", attempt.binary, code),
                    None => format!("{}: terminated by signal", attempt.binary),
                },
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Arguments for a `pdfwrite` pass honouring `preset`, writing `output`.
pub fn optimizer_args(preset: &CompressionPreset, input: &Path, output: &Path) -> Vec<OsString> {
    let dpi = preset.target_dpi;
    let mut args: Vec<OsString> = [
        "-sDEVICE=pdfwrite".to_string(),
        "-dCompatibilityLevel=1.4".to_string(),
        "-dNOPAUSE".to_string(),
        "-dBATCH".to_string(),
        "-dQUIET".to_string(),
        format!("-dPDFSETTINGS={}", preset.profile.pdf_settings()),
        "-dDetectDuplicateImages=true".to_string(),
        "-dCompressFonts=true".to_string(),
        "-dSubsetFonts=true".to_string(),
        "-dDownsampleColorImages=true".to_string(),
        "-dColorImageDownsampleType=/Average".to_string(),
        format!("-dColorImageResolution={dpi}"),
        "-dDownsampleGrayImages=true".to_string(),
        "-dGrayImageDownsampleType=/Average".to_string(),
        format!("-dGrayImageResolution={dpi}"),
        "-dDownsampleMonoImages=true".to_string(),
        "-dMonoImageDownsampleType=/Subsample".to_string(),
        format!("-dMonoImageResolution={dpi}"),
        "-dEncodeColorImages=true".to_string(),
        "-dEncodeGrayImages=true".to_string(),
        "-dEncodeMonoImages=true".to_string(),
        format!("-dJPEGQ={}", preset.image_quality),
        "-dAutoRotatePages=/None".to_string(),
    ]
    .into_iter()
    .map(OsString::from)
    .collect();

    let mut output_arg = OsString::from("-sOutputFile=");
    output_arg.push(output.as_os_str());
    args.push(output_arg);
    args.push(input.as_os_str().to_owned());
    args
}

/// Ordered list of optimizer binaries.
#[derive(Debug, Clone)]
pub struct Optimizer {
    candidates: Vec<String>,
}

impl Optimizer {
    pub fn new(candidates: Vec<String>) -> Self {
        Self { candidates }
    }

    /// Try each candidate with `args` until one exits with status 0.
    #[instrument(skip_all, fields(candidates = self.candidates.len()))]
    pub async fn run(&self, args: &[OsString]) -> ChainOutcome {
        let mut attempts = Vec::new();

        for binary in &self.candidates {
            let outcome = attempt(binary, args).await;
            if outcome == AttemptOutcome::Succeeded {
                info!(binary = %binary, "optimizer succeeded");
                return ChainOutcome::Succeeded {
                    binary: binary.clone(),
                    attempts,
                };
            }
            debug!(binary = %binary, ?outcome, "optimizer candidate failed");
            attempts.push(Attempt {
                binary: binary.clone(),
                outcome,
            });
        }

        let exhausted = ChainOutcome::Exhausted { attempts };
        warn!(summary = %exhausted.summary(), "no optimizer candidate succeeded");
        exhausted
    }
}

async fn attempt(binary: &str, args: &[OsString]) -> AttemptOutcome {
    let result = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Err(err) => AttemptOutcome::LaunchFailed {
            reason: err.to_string(),
        },
        Ok(output) if output.status.success() => AttemptOutcome::Succeeded,
        Ok(output) => AttemptOutcome::ExitedWithFailure {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr)
                .trim()
                .chars()
                .take(MAX_STDERR_CHARS)
                .collect(),
        },
    }
}
