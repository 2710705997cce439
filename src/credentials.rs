//! Exchange of an MFA code for temporary credentials.
//!
//! The long-term keys of the chosen profile sign an STS `GetSessionToken`
//! request carrying the profile's MFA device serial and the code typed by the
//! user. STS picks the validity window of the returned session.

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::{
    BehaviorVersion, Region, default_provider::region::DefaultRegionChain,
    meta::region::RegionProviderChain,
};
use aws_sdk_sts::{Client, config::Credentials};
use log::{debug, info};

use crate::{profiles::CredentialsFile, session::Session};

/// Region used for STS when neither the command line nor the profile names one.
const DEFAULT_REGION: &str = "us-east-1";

/// Exchanges an MFA code for a temporary session.
#[async_trait]
pub trait SessionExchanger {
    /// Obtains a new session for `profile` using the device `mfa_serial` and
    /// the one-time `code`. The code is passed through unchecked.
    ///
    /// # Errors
    ///
    /// Any rejection of the code or serial, and any transport failure, is
    /// returned as is. Nothing is retried.
    async fn exchange(&self, profile: &str, mfa_serial: &str, code: &str) -> Result<Session>;
}

/// Long-term keys of a profile, used only to sign the STS request.
#[derive(Clone)]
pub struct LongTermCredentials {
    credentials: Credentials,
}

impl LongTermCredentials {
    /// Reads `aws_access_key_id` and `aws_secret_access_key` from `profile`.
    ///
    /// # Errors
    ///
    /// Fails naming the profile and the key when either key is missing.
    pub fn from_profile(file: &CredentialsFile, profile: &str) -> Result<Self> {
        let get = |key| {
            file.get(profile, key)
                .map(str::to_string)
                .with_context(|| format!("Missing {key} for profile {profile}"))
        };

        Ok(Self {
            credentials: Credentials::new(
                get("aws_access_key_id")?,
                get("aws_secret_access_key")?,
                None,
                None,
                "mfa-session",
            ),
        })
    }

    pub fn access_key_id(&self) -> &str {
        self.credentials.access_key_id()
    }
}

/// Exchanger backed by STS `GetSessionToken`.
pub struct StsExchanger {
    /// Credentials file holding each profile's long-term keys
    file: CredentialsFile,
    /// Region given on the command line, if any
    region: Option<String>,
}

impl StsExchanger {
    /// Creates an exchanger signing with keys from `file`. `region`, when set,
    /// wins over any region configured for the profile.
    pub fn new(file: CredentialsFile, region: Option<String>) -> Self {
        Self { file, region }
    }
}

#[async_trait]
impl SessionExchanger for StsExchanger {
    async fn exchange(&self, profile: &str, mfa_serial: &str, code: &str) -> Result<Session> {
        let long_term = LongTermCredentials::from_profile(&self.file, profile)?;
        debug!("Signing with access key {}", long_term.access_key_id());

        let config = aws_config::defaults(BehaviorVersion::latest())
            .profile_name(profile)
            .region(region_chain(self.region.clone(), profile))
            .credentials_provider(long_term.credentials)
            .load()
            .await;
        debug!("Using region {:?} for STS", config.region());

        info!("Requesting session token for {profile} with {mfa_serial}");
        let credentials = Client::new(&config)
            .get_session_token()
            .serial_number(mfa_serial)
            .token_code(code)
            .send()
            .await
            .with_context(|| format!("Failed to get session token for profile {profile}"))?
            .credentials()
            .cloned()
            .context("No credentials returned")?;

        Ok(Session::from(&credentials))
    }
}

/// Region resolution order: explicit region, then the environment and the
/// profile's configuration, then [`DEFAULT_REGION`].
fn region_chain(explicit: Option<String>, profile: &str) -> RegionProviderChain {
    RegionProviderChain::first_try(explicit.map(Region::new))
        .or_else(DefaultRegionChain::builder().profile_name(profile).build())
        .or_else(DEFAULT_REGION)
}
