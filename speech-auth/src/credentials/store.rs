//! Client credential lookup.

use secrecy::{ExposeSecret, SecretString};

use crate::options::ClientOptions;

/// Environment variable holding the client identifier.
pub const CLIENT_ID_ENV: &str = "RTZR_CLIENT_ID";

/// Environment variable holding the client secret.
pub const CLIENT_SECRET_ENV: &str = "RTZR_CLIENT_SECRET";

/// Client identity presented to the token endpoint.
///
/// Resolved once when a token provider is constructed and never modified afterwards.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: SecretString,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::from(client_secret.into()),
        }
    }

    /// Read credentials from `RTZR_CLIENT_ID` / `RTZR_CLIENT_SECRET`.
    ///
    /// Missing variables resolve to empty strings; validation happens at provider construction.
    pub fn from_env() -> Self {
        Self::new(env_or_empty(CLIENT_ID_ENV), env_or_empty(CLIENT_SECRET_ENV))
    }

    /// Apply explicit overrides from `options` on top of the environment.
    pub fn resolve(options: &ClientOptions) -> Self {
        let env = Self::from_env();
        Self::new(
            options.client_id_or(&env.client_id),
            options.client_secret_or(env.client_secret.expose_secret()),
        )
    }

    pub fn is_complete(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.expose_secret().is_empty()
    }
}

fn env_or_empty(key: &str) -> String {
    std::env::var(key).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    struct EnvGuard {
        saved_vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(vars: &[&str]) -> Self {
            let saved_vars = vars
                .iter()
                .map(|var| (var.to_string(), env::var(var).ok()))
                .collect();
            EnvGuard { saved_vars }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in &self.saved_vars {
                match value {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }

    #[test]
    #[serial]
    fn test_from_env() {
        let _guard = EnvGuard::new(&[CLIENT_ID_ENV, CLIENT_SECRET_ENV]);
        env::set_var(CLIENT_ID_ENV, "env-id");
        env::set_var(CLIENT_SECRET_ENV, "env-secret");

        let creds = Credentials::from_env();
        assert_eq!(creds.client_id, "env-id");
        assert_eq!(creds.client_secret.expose_secret(), "env-secret");
        assert!(creds.is_complete());
    }

    #[test]
    #[serial]
    fn test_options_override_env() {
        let _guard = EnvGuard::new(&[CLIENT_ID_ENV, CLIENT_SECRET_ENV]);
        env::set_var(CLIENT_ID_ENV, "env-id");
        env::set_var(CLIENT_SECRET_ENV, "env-secret");

        let options = ClientOptions::new().with_client_id("explicit-id");
        let creds = Credentials::resolve(&options);
        assert_eq!(creds.client_id, "explicit-id");
        assert_eq!(creds.client_secret.expose_secret(), "env-secret");
    }

    #[test]
    #[serial]
    fn test_missing_env_is_incomplete() {
        let _guard = EnvGuard::new(&[CLIENT_ID_ENV, CLIENT_SECRET_ENV]);
        env::remove_var(CLIENT_ID_ENV);
        env::remove_var(CLIENT_SECRET_ENV);

        assert!(!Credentials::from_env().is_complete());
    }
}
