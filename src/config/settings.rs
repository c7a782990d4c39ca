use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use yup_oauth2::ServiceAccountKey;

use crate::auth::credentials::{load_service_account_key, EMULATOR_TOKEN};
use crate::auth::PasswordStorage;
use crate::error::{ConfigResultExt, SeedError};

const DEFAULT_AUTH_URL: &str = "https://identitytoolkit.googleapis.com/";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_PROJECT_ID: &str = "FIXERO_PROJECT_ID";
pub const ENV_DATABASE_URL: &str = "FIXERO_DATABASE_URL";
pub const ENV_ACCESS_TOKEN: &str = "FIXERO_ACCESS_TOKEN";
pub const ENV_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const ENV_AUTH_EMULATOR: &str = "FIREBASE_AUTH_EMULATOR_HOST";
pub const ENV_DATABASE_EMULATOR: &str = "FIREBASE_DATABASE_EMULATOR_HOST";

/// Contents of the optional YAML settings file. Every key may be omitted.
#[derive(Deserialize, Debug, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileSettings {
    pub project_id: Option<String>,
    pub database_url: Option<String>,
    pub credentials: Option<PathBuf>,
    pub access_token: Option<String>,
    pub auth_emulator_host: Option<String>,
    pub database_emulator_host: Option<String>,
    pub password_storage: Option<PasswordStorage>,
    pub request_timeout_secs: Option<u64>,
    pub fixtures: Option<PathBuf>,
    pub confirm: Option<bool>,
}

impl FileSettings {
    pub fn load(path: &Path) -> Result<Self, SeedError> {
        let yml = std::fs::read_to_string(path).config_err(&path.display().to_string())?;
        serde_yaml::from_str(&yml).config_err(&path.display().to_string())
    }
}

/// Values given on the command line. They win over the environment and the settings file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub project_id: Option<String>,
    pub database_url: Option<String>,
    pub credentials: Option<PathBuf>,
    pub access_token: Option<String>,
    pub password_storage: Option<PasswordStorage>,
    pub fixtures: Option<PathBuf>,
    pub confirm: bool,
}

#[derive(Debug, Clone)]
pub enum CredentialSource {
    ServiceAccount(ServiceAccountKey),
    StaticToken(String),
}

/// Fully resolved settings for a seeding run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub project_id: String,
    pub auth_url: Url,
    pub database_url: Url,
    /// Realtime Database namespace, sent as `ns` when talking to the emulator.
    pub database_namespace: Option<String>,
    pub credentials: CredentialSource,
    pub password_storage: PasswordStorage,
    pub request_timeout: Duration,
    pub fixtures: Option<PathBuf>,
    pub confirm: bool,
}

fn emulator_url(host: &str) -> Result<Url, SeedError> {
    let with_scheme = if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    };
    Url::parse(&with_scheme).config_err("emulator host")
}

/// Ensure a trailing slash so `Url::join` appends instead of replacing the last segment.
fn base_url(raw: &str, what: &str) -> Result<Url, SeedError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized).config_err(what)
}

impl Settings {
    /// Merge CLI overrides, environment and settings file (in that precedence).
    pub fn resolve(
        file: FileSettings,
        overrides: Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SeedError> {
        let auth_emulator = env(ENV_AUTH_EMULATOR).or(file.auth_emulator_host);
        let database_emulator = env(ENV_DATABASE_EMULATOR).or(file.database_emulator_host);

        // Against an emulator only an explicit --access-token replaces `owner`;
        // ambient production credentials are never picked up.
        let credentials = if auth_emulator.is_some() || database_emulator.is_some() {
            CredentialSource::StaticToken(
                overrides
                    .access_token
                    .unwrap_or_else(|| EMULATOR_TOKEN.to_string()),
            )
        } else {
            let access_token = overrides
                .access_token
                .or_else(|| env(ENV_ACCESS_TOKEN))
                .or(file.access_token);
            let credentials_path = overrides
                .credentials
                .or_else(|| env(ENV_CREDENTIALS).map(PathBuf::from))
                .or(file.credentials);

            match (access_token, credentials_path) {
                (Some(token), _) => CredentialSource::StaticToken(token),
                (None, Some(path)) => {
                    CredentialSource::ServiceAccount(load_service_account_key(&path)?)
                }
                (None, None) => {
                    return Err(SeedError::Config(format!(
                        "No credentials: pass --credentials, set {} or {}",
                        ENV_CREDENTIALS, ENV_ACCESS_TOKEN
                    )))
                }
            }
        };

        let key_project = match &credentials {
            CredentialSource::ServiceAccount(key) => key.project_id.clone(),
            CredentialSource::StaticToken(_) => None,
        };
        let project_id = overrides
            .project_id
            .or_else(|| env(ENV_PROJECT_ID))
            .or(file.project_id)
            .or(key_project)
            .ok_or_else(|| {
                SeedError::Config(format!("No project id: pass --project or set {}", ENV_PROJECT_ID))
            })?;

        let auth_url = match auth_emulator {
            Some(host) => emulator_url(&host)?
                .join("identitytoolkit.googleapis.com/")
                .config_err("auth emulator url")?,
            None => base_url(DEFAULT_AUTH_URL, "auth url")?,
        };

        let explicit_database_url = overrides
            .database_url
            .or_else(|| env(ENV_DATABASE_URL))
            .or(file.database_url);
        let (database_url, database_namespace) = match (database_emulator, explicit_database_url) {
            (Some(host), _) => (
                emulator_url(&host)?,
                Some(format!("{}-default-rtdb", project_id)),
            ),
            (None, Some(raw)) => (base_url(&raw, "database url")?, None),
            (None, None) => (
                base_url(
                    &format!("https://{}-default-rtdb.firebaseio.com/", project_id),
                    "database url",
                )?,
                None,
            ),
        };

        Ok(Settings {
            project_id,
            auth_url,
            database_url,
            database_namespace,
            credentials,
            password_storage: overrides
                .password_storage
                .or(file.password_storage)
                .unwrap_or_default(),
            request_timeout: Duration::from_secs(
                file.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            fixtures: overrides.fixtures.or(file.fixtures),
            confirm: overrides.confirm || file.confirm.unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_requires_credentials() {
        let overrides = Overrides {
            project_id: Some("fixero".to_string()),
            ..Default::default()
        };
        let err = Settings::resolve(FileSettings::default(), overrides, env_from(&[])).unwrap_err();
        assert!(err.to_string().contains("No credentials"));
    }

    #[test]
    fn test_default_database_url_from_project() {
        let overrides = Overrides {
            project_id: Some("fixero-9e0a9".to_string()),
            access_token: Some("token".to_string()),
            ..Default::default()
        };
        let settings = Settings::resolve(FileSettings::default(), overrides, env_from(&[])).unwrap();
        assert_eq!(
            settings.database_url.as_str(),
            "https://fixero-9e0a9-default-rtdb.firebaseio.com/"
        );
        assert_eq!(settings.auth_url.as_str(), DEFAULT_AUTH_URL);
        assert_eq!(settings.password_storage, PasswordStorage::Hash);
        assert!(!settings.confirm);
    }

    #[test]
    fn test_cli_wins_over_env_and_file() {
        let file = FileSettings {
            project_id: Some("from-file".to_string()),
            database_url: Some("https://file.example.com".to_string()),
            access_token: Some("file-token".to_string()),
            ..Default::default()
        };
        let overrides = Overrides {
            project_id: Some("from-cli".to_string()),
            ..Default::default()
        };
        let env = env_from(&[
            (ENV_PROJECT_ID, "from-env"),
            (ENV_DATABASE_URL, "https://env.example.com"),
        ]);

        let settings = Settings::resolve(file, overrides, env).unwrap();
        assert_eq!(settings.project_id, "from-cli");
        // Trailing slash is added so paths join underneath the base
        assert_eq!(settings.database_url.as_str(), "https://env.example.com/");
        assert!(matches!(settings.credentials, CredentialSource::StaticToken(ref t) if t == "file-token"));
    }

    #[test]
    fn test_emulators_default_to_owner_token() {
        let overrides = Overrides {
            project_id: Some("demo-fixero".to_string()),
            ..Default::default()
        };
        let env = env_from(&[
            (ENV_AUTH_EMULATOR, "127.0.0.1:9099"),
            (ENV_DATABASE_EMULATOR, "127.0.0.1:9000"),
        ]);

        let settings = Settings::resolve(FileSettings::default(), overrides, env).unwrap();
        assert_eq!(
            settings.auth_url.as_str(),
            "http://127.0.0.1:9099/identitytoolkit.googleapis.com/"
        );
        assert_eq!(settings.database_url.as_str(), "http://127.0.0.1:9000/");
        assert_eq!(settings.database_namespace.as_deref(), Some("demo-fixero-default-rtdb"));
        assert!(matches!(settings.credentials, CredentialSource::StaticToken(ref t) if t == EMULATOR_TOKEN));
    }

    #[test]
    fn test_emulator_ignores_ambient_credentials() {
        let file = FileSettings {
            access_token: Some("prod-file-token".to_string()),
            credentials: Some(PathBuf::from("/secrets/prod-key.json")),
            ..Default::default()
        };
        let overrides = Overrides {
            project_id: Some("demo-fixero".to_string()),
            ..Default::default()
        };
        let env = env_from(&[
            (ENV_DATABASE_EMULATOR, "127.0.0.1:9000"),
            (ENV_CREDENTIALS, "/secrets/prod-key.json"),
            (ENV_ACCESS_TOKEN, "prod-env-token"),
        ]);

        // The key file does not exist, so reaching the loader would fail
        let settings = Settings::resolve(file, overrides, env).unwrap();
        assert!(matches!(settings.credentials, CredentialSource::StaticToken(ref t) if t == EMULATOR_TOKEN));
    }

    #[test]
    fn test_emulator_accepts_explicit_cli_token() {
        let overrides = Overrides {
            project_id: Some("demo-fixero".to_string()),
            access_token: Some("custom-admin".to_string()),
            ..Default::default()
        };
        let env = env_from(&[
            (ENV_AUTH_EMULATOR, "127.0.0.1:9099"),
            (ENV_ACCESS_TOKEN, "prod-env-token"),
        ]);

        let settings = Settings::resolve(FileSettings::default(), overrides, env).unwrap();
        assert!(matches!(settings.credentials, CredentialSource::StaticToken(ref t) if t == "custom-admin"));
    }

    #[test]
    fn test_missing_key_file_is_reported() {
        let overrides = Overrides {
            project_id: Some("fixero".to_string()),
            ..Default::default()
        };
        let env = env_from(&[(ENV_CREDENTIALS, "/nonexistent/key.json")]);

        let err = Settings::resolve(FileSettings::default(), overrides, env).unwrap_err();
        assert!(matches!(err, SeedError::Credentials(_)));
    }

    #[test]
    fn test_file_settings_reject_unknown_keys() {
        let result: Result<FileSettings, _> = serde_yaml::from_str("projectt_id: typo\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_example_settings_file_parses() {
        let file: FileSettings =
            serde_yaml::from_str(include_str!("../../settings.example.yml")).unwrap();
        assert_eq!(file.project_id.as_deref(), Some("fixero-9e0a9"));
        assert_eq!(file.password_storage, Some(PasswordStorage::Hash));
    }

    #[test]
    fn test_file_settings_parse() {
        let yml = "project_id: fixero\npassword_storage: omit\nrequest_timeout_secs: 5\nconfirm: true\n";
        let file: FileSettings = serde_yaml::from_str(yml).unwrap();
        assert_eq!(file.password_storage, Some(PasswordStorage::Omit));

        let overrides = Overrides {
            access_token: Some("t".to_string()),
            ..Default::default()
        };
        let settings = Settings::resolve(file, overrides, env_from(&[])).unwrap();
        assert_eq!(settings.request_timeout, Duration::from_secs(5));
        assert!(settings.confirm);
    }
}
