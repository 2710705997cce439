//! Temporary session credentials and their per-profile cache.
//!
//! Each profile's most recent session lives in `<dir>/<profile>.session` as a
//! JSON object using the STS field names:
//!
//! ```json
//! {"AccessKeyId":"ASIA...","SecretAccessKey":"...","SessionToken":"...","Expiration":"2024-01-01T12:00:00Z"}
//! ```

use std::{
    path::{Component, Path, PathBuf},
    time::SystemTime,
};

use anyhow::{Context, Result, ensure};
use aws_sdk_sts::types;
use aws_smithy_types::DateTime;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::files::write_private;

/// A temporary credential set obtained with MFA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Session {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    #[serde(with = "expiration")]
    pub expiration: DateTime,
}

impl Session {
    /// True once `now` is strictly past the expiration instant.
    pub fn is_expired_at(&self, now: DateTime) -> bool {
        self.expiration < now
    }

    /// Checks the session against the current wall-clock time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(DateTime::from(SystemTime::now()))
    }
}

impl From<&types::Credentials> for Session {
    fn from(credentials: &types::Credentials) -> Self {
        Self {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().to_string(),
            expiration: *credentials.expiration(),
        }
    }
}

/// `Expiration` is written as RFC 3339. On read it also accepts an offset
/// timestamp, an HTTP date, or a number of epoch milliseconds.
mod expiration {
    use aws_smithy_types::{
        DateTime,
        date_time::{DateTimeParseError, Format},
    };
    use serde::{Deserialize, Deserializer, Serializer, de, ser};

    pub fn serialize<S: Serializer>(value: &DateTime, serializer: S) -> Result<S::Ok, S::Error> {
        let text = value.fmt(Format::DateTime).map_err(ser::Error::custom)?;
        serializer.serialize_str(&text)
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Millis(i64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => parse(&text).map_err(de::Error::custom),
            Raw::Millis(millis) => Ok(DateTime::from_millis(millis)),
        }
    }

    pub(super) fn parse(text: &str) -> Result<DateTime, DateTimeParseError> {
        DateTime::from_str(text, Format::DateTime)
            .or_else(|_| DateTime::from_str(text, Format::DateTimeWithOffset))
            .or_else(|_| DateTime::from_str(text, Format::HttpDate))
    }
}

/// On-disk store of the last session obtained for each profile.
///
/// Nothing is kept in memory: every `load` goes back to disk, so a session
/// stored by one run is seen by the next.
pub struct SessionCache {
    /// Directory holding one `<profile>.session` file per profile
    dir: PathBuf,
}

impl SessionCache {
    /// Creates a cache rooted at `dir`. The directory is created on first `store`.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Location of the cache file for `profile`.
    ///
    /// # Errors
    ///
    /// Fails when the profile name would not stay a single file name inside
    /// the cache directory, e.g. `../x` or `a/b`.
    pub fn path(&self, profile: &str) -> Result<PathBuf> {
        let file_name = format!("{profile}.session");
        let mut components = Path::new(&file_name).components();
        ensure!(
            matches!(
                (components.next(), components.next()),
                (Some(Component::Normal(_)), None)
            ),
            "Profile name {profile:?} cannot be used as a session cache file name"
        );

        Ok(self.dir.join(file_name))
    }

    /// Reads the cached session for `profile`.
    ///
    /// Any failure, from a missing file to JSON without the expected fields,
    /// yields `None`. It never returns an error.
    pub async fn load(&self, profile: &str) -> Option<Session> {
        let path = self
            .path(profile)
            .inspect_err(|e| warn!("{e}"))
            .ok()?;
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!("No cached session at {}: {e}", path.display());
                return None;
            }
        };

        serde_json::from_str(&raw)
            .inspect_err(|e| warn!("Ignoring unreadable session cache {}: {e}", path.display()))
            .ok()
    }

    /// Replaces the cached session for `profile`, creating the cache directory
    /// if needed. The file is readable by its owner only.
    ///
    /// # Errors
    ///
    /// Fails for a profile name rejected by [`SessionCache::path`], an
    /// expiration outside the RFC 3339 range, or any filesystem error.
    pub async fn store(&self, profile: &str, session: &Session) -> Result<()> {
        let path = self.path(profile)?;
        let json = serde_json::to_string(session).context("Failed to serialize session")?;
        write_private(&path, &json).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn session(expiration: DateTime) -> Session {
        Session {
            access_key_id: "ASIAEXAMPLE".into(),
            secret_access_key: "secret/with+chars=".into(),
            session_token: "token".into(),
            expiration,
        }
    }

    #[test]
    fn expiry_is_strict() {
        let at = DateTime::from_secs(1_700_000_000);
        let s = session(at);

        assert!(!s.is_expired_at(at));
        assert!(!s.is_expired_at(DateTime::from_secs(1_699_999_999)));
        assert!(s.is_expired_at(DateTime::from_secs(1_700_000_001)));
    }

    #[test]
    fn expiry_against_wall_clock() {
        let hour = Duration::from_secs(3600);

        assert!(session(DateTime::from(SystemTime::now() - hour)).is_expired());
        assert!(!session(DateTime::from(SystemTime::now() + hour)).is_expired());
    }

    #[test]
    fn serializes_with_sts_field_names() {
        let json = serde_json::to_value(session(DateTime::from_secs(0))).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "AccessKeyId": "ASIAEXAMPLE",
                "SecretAccessKey": "secret/with+chars=",
                "SessionToken": "token",
                "Expiration": "1970-01-01T00:00:00Z",
            })
        );
    }

    #[test]
    fn accepts_other_expiration_encodings() {
        let expected = DateTime::from_secs(1_704_067_200);

        assert_eq!(expiration::parse("2024-01-01T00:00:00Z").unwrap(), expected);
        assert_eq!(expiration::parse("2024-01-01T02:00:00+02:00").unwrap(), expected);
        assert_eq!(expiration::parse("Mon, 01 Jan 2024 00:00:00 GMT").unwrap(), expected);

        let from_millis: Session = serde_json::from_str(
            r#"{"AccessKeyId":"a","SecretAccessKey":"b","SessionToken":"c","Expiration":1704067200000}"#,
        )
        .unwrap();
        assert_eq!(from_millis.expiration, expected);
    }

    #[tokio::test]
    async fn store_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SessionCache::new(dir.path().join("session-data"));
        let stored = session(DateTime::from_secs(1_800_000_000));

        cache.store("dev", &stored).await.unwrap();

        assert_eq!(cache.load("dev").await, Some(stored));
        assert_eq!(cache.load("prod").await, None);
    }

    #[tokio::test]
    async fn store_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SessionCache::new(dir.path().to_path_buf());
        let newer = Session {
            session_token: "newer".into(),
            ..session(DateTime::from_secs(2))
        };

        cache.store("dev", &session(DateTime::from_secs(1))).await.unwrap();
        cache.store("dev", &newer).await.unwrap();

        assert_eq!(cache.load("dev").await, Some(newer));
    }

    #[tokio::test]
    async fn corrupt_cache_is_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SessionCache::new(dir.path().to_path_buf());

        let contents = [
            "not json",
            "{}",
            r#"{"AccessKeyId":1}"#,
            r#"{"AccessKeyId":"a","SecretAccessKey":"b","SessionToken":"c","Expiration":"soon"}"#,
        ];
        for content in contents {
            std::fs::write(cache.path("dev").unwrap(), content).unwrap();
            assert_eq!(cache.load("dev").await, None, "content: {content}");
        }
    }

    #[test]
    fn path_stays_inside_cache_dir() {
        let cache = SessionCache::new(PathBuf::from("/cache"));

        assert_eq!(cache.path("dev").unwrap(), PathBuf::from("/cache/dev.session"));
        assert_eq!(cache.path("..").unwrap(), PathBuf::from("/cache/...session"));
        for name in ["../x", "a/b", "/etc/passwd"] {
            assert!(cache.path(name).is_err(), "name: {name:?}");
        }
    }

    #[tokio::test]
    async fn escaping_profile_is_never_stored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SessionCache::new(dir.path().join("session-data"));

        assert!(cache.store("../x", &session(DateTime::from_secs(0))).await.is_err());
        assert!(!dir.path().join("x.session").exists());
        assert_eq!(cache.load("../x").await, None);
    }

    #[test]
    fn far_future_expiry_displays() {
        let far = session(DateTime::from_millis(253_402_300_800_000));

        assert!(far.expiration.fmt(aws_smithy_types::date_time::Format::DateTime).is_err());
        assert!(!far.is_expired());
        assert_eq!(far.expiration.to_string(), "253402300800");
    }
}
