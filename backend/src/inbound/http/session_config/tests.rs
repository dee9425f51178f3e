//! Unit tests for session configuration parsing.

use std::collections::HashMap;

use mockable::MockEnv;
use rstest::{fixture, rstest};
use tempfile::NamedTempFile;

use super::*;

fn key_file(len: usize) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temporary key file");
    std::fs::write(file.path(), vec![b'k'; len]).expect("write key file");
    file
}

fn mock_env(vars: HashMap<&'static str, String>) -> MockEnv {
    let mut env = MockEnv::new();
    env.expect_string()
        .times(0..)
        .returning(move |key| vars.get(key).cloned());
    env
}

struct ReleaseEnv {
    key: NamedTempFile,
    vars: HashMap<&'static str, String>,
}

impl ReleaseEnv {
    fn with(mut self, name: &'static str, value: &str) -> Self {
        self.vars.insert(name, value.to_owned());
        self
    }

    fn without(mut self, name: &'static str) -> Self {
        self.vars.remove(name);
        self
    }

    fn settings(self, mode: BuildMode) -> Result<SessionSettings, SessionConfigError> {
        let result = session_settings_from_env(&mock_env(self.vars), mode);
        drop(self.key);
        result
    }
}

#[fixture]
fn release_env() -> ReleaseEnv {
    let key = key_file(SESSION_KEY_MIN_LEN);
    let vars = HashMap::from([
        (KEY_FILE_ENV, key.path().to_string_lossy().into_owned()),
        (COOKIE_SECURE_ENV, "1".to_owned()),
        (SAMESITE_ENV, "Strict".to_owned()),
        (ALLOW_EPHEMERAL_ENV, "0".to_owned()),
    ]);
    ReleaseEnv { key, vars }
}

#[rstest]
fn release_settings_with_every_toggle_succeed(release_env: ReleaseEnv) {
    let settings = release_env
        .settings(BuildMode::Release)
        .expect("valid settings");

    assert!(settings.cookie_secure);
    assert_eq!(settings.same_site, SameSite::Strict);
    assert_eq!(settings.ttl_hours, SESSION_TTL_DEFAULT_HOURS);
}

#[rstest]
#[case(COOKIE_SECURE_ENV)]
#[case(SAMESITE_ENV)]
#[case(ALLOW_EPHEMERAL_ENV)]
fn release_requires_explicit_toggles(release_env: ReleaseEnv, #[case] name: &'static str) {
    let err = release_env
        .without(name)
        .settings(BuildMode::Release)
        .err()
        .expect("missing toggle rejected");

    assert!(
        matches!(err, SessionConfigError::MissingEnv { name: missing } if missing == name),
        "{err}"
    );
}

#[rstest]
#[case(COOKIE_SECURE_ENV, "maybe")]
#[case(SAMESITE_ENV, "sometimes")]
#[case(TTL_HOURS_ENV, "0")]
#[case(TTL_HOURS_ENV, "a week")]
fn release_rejects_invalid_values(
    release_env: ReleaseEnv,
    #[case] name: &'static str,
    #[case] value: &str,
) {
    let err = release_env
        .with(name, value)
        .settings(BuildMode::Release)
        .err()
        .expect("invalid value rejected");

    assert!(
        matches!(&err, SessionConfigError::InvalidEnv { name: invalid, .. } if *invalid == name),
        "{err}"
    );
}

#[rstest]
fn release_rejects_ephemeral_keys(release_env: ReleaseEnv) {
    let err = release_env
        .with(ALLOW_EPHEMERAL_ENV, "yes")
        .settings(BuildMode::Release)
        .err()
        .expect("ephemeral rejected");

    assert!(matches!(err, SessionConfigError::EphemeralNotAllowed));
}

#[rstest]
fn release_rejects_insecure_same_site_none(release_env: ReleaseEnv) {
    let err = release_env
        .with(COOKIE_SECURE_ENV, "0")
        .with(SAMESITE_ENV, "None")
        .settings(BuildMode::Release)
        .err()
        .expect("insecure None rejected");

    assert!(matches!(err, SessionConfigError::InsecureSameSiteNone));
}

#[rstest]
fn release_rejects_short_keys(release_env: ReleaseEnv) {
    let short = key_file(32);
    let err = release_env
        .with(KEY_FILE_ENV, &short.path().to_string_lossy())
        .settings(BuildMode::Release)
        .err()
        .expect("short key rejected");

    assert!(matches!(
        err,
        SessionConfigError::KeyTooShort { length: 32, .. }
    ));
}

#[rstest]
fn release_requires_a_readable_key(release_env: ReleaseEnv) {
    let err = release_env
        .with(KEY_FILE_ENV, "/nonexistent/portal/session_key")
        .settings(BuildMode::Release)
        .err()
        .expect("missing key rejected");

    assert!(matches!(err, SessionConfigError::KeyRead { .. }));
}

#[rstest]
fn ttl_can_be_tuned(release_env: ReleaseEnv) {
    let settings = release_env
        .with(TTL_HOURS_ENV, "24")
        .settings(BuildMode::Release)
        .expect("valid settings");

    assert_eq!(settings.ttl_hours, 24);
}

#[rstest]
fn debug_defaults_allow_an_ephemeral_key() {
    let settings = session_settings_from_env(&mock_env(HashMap::new()), BuildMode::Debug)
        .expect("debug defaults");

    assert!(settings.cookie_secure);
    assert_eq!(settings.same_site, SameSite::Lax);
    assert_eq!(settings.ttl_hours, SESSION_TTL_DEFAULT_HOURS);
}

#[rstest]
fn debug_falls_back_on_invalid_values(release_env: ReleaseEnv) {
    let settings = release_env
        .with(SAMESITE_ENV, "unexpected")
        .with(TTL_HOURS_ENV, "-1")
        .settings(BuildMode::Debug)
        .expect("debug falls back");

    assert_eq!(settings.same_site, SameSite::Lax);
    assert_eq!(settings.ttl_hours, SESSION_TTL_DEFAULT_HOURS);
}
