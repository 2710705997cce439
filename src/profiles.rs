//! Shared credentials file reader.
//!
//! The file is parsed once into an ordered list of profiles, each with its
//! own key/value pairs, so lookups never scan raw text:
//!
//! ```ini
//! [dev]
//! aws_access_key_id = AKIA...
//! aws_secret_access_key = ...
//! aws_mfa_serial = arn:aws:iam::123456789012:mfa/dev
//! ```

use std::path::Path;

use anyhow::{Context, Result, anyhow, ensure};
use configparser::ini::Ini;
use tokio::fs;

/// Key naming the MFA device bound to a profile.
pub const MFA_SERIAL_KEY: &str = "aws_mfa_serial";

/// A single `[name]` section and the keys defined under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Section name without brackets, case preserved
    pub name: String,
    /// Keys in file order, as written. Keys with no `=` are dropped
    entries: Vec<(String, String)>,
}

impl Profile {
    /// Looks a key up ignoring ASCII case.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// Parsed credentials file, profiles kept in file order.
#[derive(Debug, Clone, Default)]
pub struct CredentialsFile {
    profiles: Vec<Profile>,
}

impl CredentialsFile {
    /// Reads and parses the credentials file at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file does not exist, cannot be read, or is not valid INI.
    /// Each error names the path.
    pub async fn load(path: &Path) -> Result<Self> {
        ensure!(
            path.exists(),
            "Credentials file not found: {}",
            path.display()
        );
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read credentials file {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Invalid credentials file {}", path.display()))
    }

    /// Parses credentials file content.
    ///
    /// Section names keep their case. A section appearing twice is merged into
    /// its first position, with later keys overriding earlier ones. Only lines
    /// starting with `;` or `#` are comments: values such as ARNs keep every
    /// character after the `=`.
    ///
    /// # Errors
    ///
    /// Fails on a section header without a closing bracket or a key with no
    /// name (`= value`).
    pub fn parse(content: &str) -> Result<Self> {
        let mut ini = Ini::new_cs();
        // Keys above the first header land here and are dropped below.
        ini.set_default_section("");
        ini.set_inline_comment_symbols(Some(&[]));
        let map = ini
            .read(content.to_string())
            .map_err(|e| anyhow!("Failed to parse credentials: {e}"))?;

        let profiles = map
            .into_iter()
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, keys)| Profile {
                name,
                entries: keys
                    .into_iter()
                    .filter_map(|(k, v)| v.map(|v| (k, v)))
                    .collect(),
            })
            .collect();

        Ok(Self { profiles })
    }

    /// Every section header in file order, brackets included.
    pub fn section_headers(&self) -> Vec<String> {
        self.profiles
            .iter()
            .map(|p| format!("[{}]", p.name))
            .collect()
    }

    /// Profile whose section name equals `name` exactly.
    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Value of `key` in profile `name`, if both exist.
    pub fn get(&self, name: &str, key: &str) -> Option<&str> {
        self.profile(name)?.get(key)
    }

    /// MFA device serial configured for `name`.
    pub fn mfa_serial(&self, name: &str) -> Option<&str> {
        self.get(name, MFA_SERIAL_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
[dev]
aws_access_key_id = AKIADEV
aws_secret_access_key = devsecret
aws_mfa_serial = arn:aws:iam::123:mfa/dev

[dev-admin]
aws_access_key_id=AKIAADMIN
AWS_MFA_SERIAL   =   arn:aws:iam::123:mfa/admin

[prod]
aws_access_key_id = AKIAPROD
";

    #[test]
    fn single_profile_scenario() {
        let file = CredentialsFile::parse("[dev]\naws_mfa_serial = arn:aws:iam::123:mfa/dev").unwrap();

        assert_eq!(file.section_headers(), vec!["[dev]"]);
        assert_eq!(file.mfa_serial("dev"), Some("arn:aws:iam::123:mfa/dev"));
    }

    #[test]
    fn headers_keep_file_order_and_case() {
        let file = CredentialsFile::parse("[zeta]\n[Alpha]\nk=v\n[mid]\n").unwrap();

        assert_eq!(file.section_headers(), vec!["[zeta]", "[Alpha]", "[mid]"]);
    }

    #[test]
    fn serial_lookup_tolerates_case_and_spacing() {
        let file = CredentialsFile::parse(SAMPLE).unwrap();

        assert_eq!(file.mfa_serial("dev-admin"), Some("arn:aws:iam::123:mfa/admin"));
    }

    #[test]
    fn prefix_named_profiles_do_not_leak() {
        let file = CredentialsFile::parse(SAMPLE).unwrap();

        assert_eq!(file.mfa_serial("dev"), Some("arn:aws:iam::123:mfa/dev"));
        assert_eq!(file.get("dev", "aws_access_key_id"), Some("AKIADEV"));
        assert_eq!(file.get("dev-admin", "aws_access_key_id"), Some("AKIAADMIN"));
    }

    #[test]
    fn missing_serial_is_none() {
        let file = CredentialsFile::parse(SAMPLE).unwrap();

        assert_eq!(file.mfa_serial("prod"), None);
        assert_eq!(file.mfa_serial("staging"), None);
    }

    #[test]
    fn preamble_keys_are_not_a_profile() {
        let file = CredentialsFile::parse("stray = 1\n[dev]\nk = v\n").unwrap();

        assert_eq!(file.section_headers(), vec!["[dev]"]);
    }

    #[test]
    fn values_keep_comment_characters() {
        let file = CredentialsFile::parse(
            "; whole-line comment\n[b] ; trailing\n# another\nk = a;b#c\naws_mfa_serial=arn:aws:iam::1:mfa/a#b\n",
        )
        .unwrap();

        assert_eq!(file.section_headers(), vec!["[b]"]);
        assert_eq!(file.get("b", "k"), Some("a;b#c"));
        assert_eq!(file.mfa_serial("b"), Some("arn:aws:iam::1:mfa/a#b"));
    }

    #[test]
    fn duplicate_sections_merge_into_first_position() {
        let file =
            CredentialsFile::parse("[a]\nk = 1\nonly_first = x\n[b]\n[a]\nk = 2\n").unwrap();

        assert_eq!(file.section_headers(), vec!["[a]", "[b]"]);
        assert_eq!(file.get("a", "k"), Some("2"));
        assert_eq!(file.get("a", "only_first"), Some("x"));
    }

    #[test]
    fn empty_file_has_no_profiles() {
        let file = CredentialsFile::parse("").unwrap();

        assert!(file.section_headers().is_empty());
    }

    #[tokio::test]
    async fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials");
        std::fs::write(&path, SAMPLE).unwrap();

        let file = CredentialsFile::load(&path).await.unwrap();
        assert_eq!(file.section_headers(), vec!["[dev]", "[dev-admin]", "[prod]"]);
    }

    #[tokio::test]
    async fn load_fails_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope");

        let err = CredentialsFile::load(&path).await.unwrap_err();
        assert!(err.to_string().contains("Credentials file not found"));
    }
}
