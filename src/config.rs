use std::path::{Path, PathBuf};

use crate::errors::ConfigError;

pub const URL_VAR: &str = "SUPABASE_URL";
pub const ANON_KEY_VAR: &str = "SUPABASE_ANON_KEY";
pub const SESSION_FILE_VAR: &str = "TASKBOARD_SESSION_FILE";

/// Names used by browser builds of the client; accepted as fallbacks.
const VITE_URL_VAR: &str = "VITE_SUPABASE_URL";
const VITE_ANON_KEY_VAR: &str = "VITE_SUPABASE_ANON_KEY";

/// Connection settings for the hosted data platform.
///
/// Both the base URL and the public (anon) key are required; the binary
/// refuses to start without them.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteConfig {
    /// Project base URL without a trailing slash, e.g. `https://xyz.supabase.co`.
    pub url: String,
    pub anon_key: String,
    /// Where the signed-in session is persisted. `None` keeps it in memory only.
    pub session_file: Option<PathBuf>,
}

impl RemoteConfig {
    /// Load from `.env` (if given or found) and the process environment.
    pub fn load(env_file: Option<&Path>) -> Result<Self, ConfigError> {
        match env_file {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::Invalid {
                    name: "--env-file",
                    message: e.to_string(),
                })?;
            }
            None => {
                // A missing .env is normal; variables may come from the shell.
                let _ = dotenvy::dotenv();
            }
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let url = non_empty(URL_VAR)
            .or_else(|| non_empty(VITE_URL_VAR))
            .ok_or(ConfigError::Missing { name: URL_VAR })?;
        let anon_key = non_empty(ANON_KEY_VAR)
            .or_else(|| non_empty(VITE_ANON_KEY_VAR))
            .ok_or(ConfigError::Missing { name: ANON_KEY_VAR })?;

        let parsed = reqwest::Url::parse(url.trim()).map_err(|e| ConfigError::Invalid {
            name: URL_VAR,
            message: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                name: URL_VAR,
                message: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let session_file = non_empty(SESSION_FILE_VAR)
            .map(PathBuf::from)
            .or_else(default_session_file);

        Ok(Self {
            url: url.trim().trim_end_matches('/').to_string(),
            anon_key: anon_key.trim().to_string(),
            session_file,
        })
    }

    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.url)
    }

    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.url)
    }
}

fn default_session_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("taskboard").join("session.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_loads_url_and_key() {
        let config = RemoteConfig::from_lookup(lookup(&[
            (URL_VAR, "https://abc.supabase.co/"),
            (ANON_KEY_VAR, "anon-key"),
            (SESSION_FILE_VAR, "/tmp/session.json"),
        ]))
        .unwrap();
        assert_eq!(config.url, "https://abc.supabase.co");
        assert_eq!(config.anon_key, "anon-key");
        assert_eq!(config.session_file, Some(PathBuf::from("/tmp/session.json")));
        assert_eq!(config.rest_url(), "https://abc.supabase.co/rest/v1");
        assert_eq!(config.auth_url(), "https://abc.supabase.co/auth/v1");
    }

    #[test]
    fn test_missing_url_fails_fast() {
        let err = RemoteConfig::from_lookup(lookup(&[(ANON_KEY_VAR, "anon-key")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { name: URL_VAR }));
    }

    #[test]
    fn test_missing_key_fails_fast() {
        let err = RemoteConfig::from_lookup(lookup(&[(URL_VAR, "https://abc.supabase.co")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing { name: ANON_KEY_VAR }));
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let err = RemoteConfig::from_lookup(lookup(&[
            (URL_VAR, "https://abc.supabase.co"),
            (ANON_KEY_VAR, "   "),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing { name: ANON_KEY_VAR }));
    }

    #[test]
    fn test_vite_prefixed_names_are_accepted() {
        let config = RemoteConfig::from_lookup(lookup(&[
            (VITE_URL_VAR, "http://localhost:54321"),
            (VITE_ANON_KEY_VAR, "local-key"),
        ]))
        .unwrap();
        assert_eq!(config.url, "http://localhost:54321");
        assert_eq!(config.anon_key, "local-key");
    }

    #[test]
    fn test_rejects_unparseable_url() {
        let err = RemoteConfig::from_lookup(lookup(&[
            (URL_VAR, "not a url"),
            (ANON_KEY_VAR, "anon-key"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: URL_VAR, .. }));
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let err = RemoteConfig::from_lookup(lookup(&[
            (URL_VAR, "ftp://abc.supabase.co"),
            (ANON_KEY_VAR, "anon-key"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("ftp"));
    }
}
