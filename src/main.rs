//! AWS MFA Session Renewer
//!
//! Keeps short-lived AWS credentials for each profile of the shared credentials
//! file and exports the active one for the calling shell.
//!
//! The program performs the following operations:
//! 1. Parses command-line arguments and resolves the files it works with
//! 2. Lets the user choose a profile from the credentials file
//! 3. Reuses the profile's cached session if it has not expired
//! 4. Otherwise prompts for an MFA code and obtains a new session from STS
//! 5. Writes `export` statements for the session to the environment file
//!
//! Any failure is printed to standard output with its full cause chain and
//! the process exits with status 1.

use anyhow::Result;
use clap::Parser;

mod cli;
mod config;
mod credentials;
mod env;
mod files;
mod profiles;
mod prompt;
mod session;
mod updater;

use cli::Args;
use config::Paths;
use credentials::StsExchanger;
use env::EnvFile;
use profiles::CredentialsFile;
use prompt::TerminalPrompter;
use session::SessionCache;
use updater::SessionUpdater;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // INFO by default, RUST_LOG takes precedence when set.
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(e) = run(Args::parse()).await {
        println!();
        println!("{e:?}");
        std::process::exit(1);
    }
}

/// Resolves the working files and runs one renewal.
///
/// # Errors
///
/// This function will return an error if:
/// * The home directory cannot be determined and a path was left to its default
/// * The credentials file is missing or malformed
/// * The selected profile cannot be renewed or exported
async fn run(args: Args) -> Result<()> {
    let paths = Paths::resolve(&args)?;
    let credentials = CredentialsFile::load(&paths.credentials).await?;

    let updater = SessionUpdater::new(
        credentials.clone(),
        SessionCache::new(paths.session_dir),
        EnvFile::new(paths.env_file),
        StsExchanger::new(credentials, args.region),
        TerminalPrompter::default(),
    );
    updater.run().await?;

    Ok(())
}
