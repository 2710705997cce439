//! Session renewal flow.
//!
//! A run picks a profile, reuses its cached session while still valid, and
//! otherwise trades an MFA code for a new one:
//!
//! 1. The user selects a profile from the credentials file
//! 2. The session cache for that profile is checked for a session that has not expired
//! 3. On a miss, the profile's `aws_mfa_serial` and an MFA code are exchanged for a
//!    new session, which replaces the cache entry
//! 4. The cache entry is read back and written to the environment file
//!
//! The environment file is only touched once a valid session is in hand, so a
//! failed run leaves the previous exports in place.

use anyhow::{Context, Result, ensure};
use log::info;

use crate::{
    credentials::SessionExchanger,
    env::EnvFile,
    profiles::CredentialsFile,
    prompt::Prompter,
    session::{Session, SessionCache},
};

/// Drives one renewal run for a profile chosen interactively.
pub struct SessionUpdater<E, P> {
    /// Parsed credentials file, source of profile names and MFA serials
    credentials: CredentialsFile,
    /// Per-profile session store consulted before any exchange
    cache: SessionCache,
    /// Export file rewritten at the end of every successful run
    env: EnvFile,
    /// Trades an MFA code for a new session
    exchanger: E,
    /// Asks for the profile and the MFA code
    prompter: P,
}

impl<E: SessionExchanger, P: Prompter> SessionUpdater<E, P> {
    /// Wires the flow to its files and collaborators. Nothing is read until [`SessionUpdater::run`].
    pub fn new(
        credentials: CredentialsFile,
        cache: SessionCache,
        env: EnvFile,
        exchanger: E,
        prompter: P,
    ) -> Self {
        Self {
            credentials,
            cache,
            env,
            exchanger,
            prompter,
        }
    }

    /// Asks for a profile and refreshes it.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The bare name of the profile now exported
    /// * `Err(anyhow::Error)` - No profiles exist, the selection was cancelled,
    ///   or [`SessionUpdater::refresh`] failed
    pub async fn run(&self) -> Result<String> {
        let headers = self.credentials.section_headers();
        ensure!(!headers.is_empty(), "No profiles found in credentials file");

        let profile = self.prompter.select_profile(&headers)?;
        self.refresh(&profile).await?;

        Ok(profile)
    }

    /// Makes sure `profile` has a valid cached session and exports it.
    ///
    /// A cached session that has not expired is exported as is and the
    /// exchanger is never called. Otherwise the user is asked for an MFA code,
    /// the new session replaces the cache entry, and the entry is read back
    /// before being exported.
    ///
    /// # Errors
    ///
    /// * The profile name cannot be used as a cache file name
    /// * The profile has no `aws_mfa_serial`
    /// * Prompting, the exchange, or writing the cache or environment file fails
    ///
    /// On error the environment file keeps its previous contents.
    pub async fn refresh(&self, profile: &str) -> Result<Session> {
        // Reject the name before prompting for a code that could not be cached.
        self.cache.path(profile)?;

        match self.cache.load(profile).await {
            Some(session) if !session.is_expired() => {
                info!(
                    "Using cached session for {profile}, expires at {}",
                    session.expiration
                );
            }
            _ => {
                info!("Credentials have expired, renewing...");
                let session = self.renew(profile).await?;
                self.cache.store(profile, &session).await?;
            }
        }

        let session = self
            .cache
            .load(profile)
            .await
            .with_context(|| format!("No cached session for profile {profile}"))?;
        self.env.write(&session).await?;

        info!("Updated session and set env to {profile}!");
        info!("Run `source {}` to use it", self.env.path().display());

        Ok(session)
    }

    /// Exchanges a freshly prompted MFA code for a new session.
    async fn renew(&self, profile: &str) -> Result<Session> {
        let mfa_serial = self
            .credentials
            .mfa_serial(profile)
            .with_context(|| format!("Could not find MFA serial for profile {profile}"))?;
        let code = self.prompter.mfa_code()?;

        let session = self.exchanger.exchange(profile, mfa_serial, &code).await?;
        info!("Success! Credentials expire at: {}", session.expiration);

        Ok(session)
    }
}
