//! Command-line interface definitions.

use std::path::PathBuf;

use clap::Parser;

/// AWS MFA session renewer.
///
/// Prompts for a profile from the shared credentials file, reuses its cached
/// session while it is still valid, and otherwise exchanges an MFA code for a
/// fresh one. The active session is written as `export` lines to an
/// environment file meant to be sourced by the calling shell.
#[derive(Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Path to AWS credentials file [default: ~/.aws/credentials]
    #[arg(short, long, env = "AWS_SHARED_CREDENTIALS_FILE")]
    pub credentials_path: Option<PathBuf>,

    /// Directory holding per-profile session caches [default: ~/.aws/session-data]
    #[arg(short, long, env = "AWS_MFA_SESSION_DIR")]
    pub session_dir: Option<PathBuf>,

    /// File receiving the shell export statements [default: ~/.aws/env]
    #[arg(short, long, env = "AWS_MFA_ENV_FILE")]
    pub env_file: Option<PathBuf>,

    /// Region used for the STS call (falls back to the profile's, then us-east-1)
    #[arg(short, long)]
    pub region: Option<String>,
}
