// ============================================================
// Layer 6 — Secrets
// ============================================================
// The hub token used to download tokenizers. A secret is
// either read from environment variables at the moment it is
// needed, or given directly as a value.
//
// Only the environment-variable form can be written into a
// saved configuration: serializing a plain token fails, so a
// token never ends up in a config file by accident.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::ReaderError;

/// Environment variables checked for the hub token, in order
pub const DEFAULT_TOKEN_ENV_VARS: [&str; 2] = ["HF_API_TOKEN", "HF_TOKEN"];

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Secret {
    /// First set variable wins. `strict` makes "none set" an error.
    EnvVar {
        env_vars: Vec<String>,
        #[serde(default = "strict_by_default")]
        strict:   bool,
    },

    #[serde(skip)]
    Token { value: String },
}

fn strict_by_default() -> bool {
    true
}

impl Secret {
    pub fn from_env_vars(env_vars: &[&str], strict: bool) -> Self {
        Secret::EnvVar {
            env_vars: env_vars.iter().map(|v| v.to_string()).collect(),
            strict,
        }
    }

    pub fn from_token(value: impl Into<String>) -> Self {
        Secret::Token { value: value.into() }
    }

    /// The hub token secret used when none is configured
    pub fn default_hub_token() -> Self {
        Self::from_env_vars(&DEFAULT_TOKEN_ENV_VARS, false)
    }

    /// Resolve the secret to its value.
    /// Ok(None) when no variable is set and the secret is not strict.
    pub fn resolve_value(&self) -> Result<Option<String>, ReaderError> {
        match self {
            Secret::Token { value } => Ok(Some(value.clone())),
            Secret::EnvVar { env_vars, strict } => {
                let found = env_vars
                    .iter()
                    .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()));
                match found {
                    Some(value)        => Ok(Some(value)),
                    None if *strict    => Err(ReaderError::InvalidConfig(format!(
                        "None of the following environment variables are set: {}",
                        env_vars.join(", ")
                    ))),
                    None               => Ok(None),
                }
            }
        }
    }
}

// Never print token values
impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Secret::EnvVar { env_vars, strict } => f
                .debug_struct("EnvVar")
                .field("env_vars", env_vars)
                .field("strict", strict)
                .finish(),
            Secret::Token { .. } => f.write_str("Token(<redacted>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_env_var_secret_round_trips() {
        let secret = Secret::default_hub_token();
        let value  = serde_json::to_value(&secret).unwrap();
        assert_eq!(
            value,
            json!({"type": "env_var", "env_vars": ["HF_API_TOKEN", "HF_TOKEN"], "strict": false})
        );
        let back: Secret = serde_json::from_value(value).unwrap();
        assert_eq!(back, secret);
    }

    #[test]
    fn test_token_secret_cannot_be_serialized() {
        assert!(serde_json::to_value(Secret::from_token("hf_abc")).is_err());
    }

    #[test]
    fn test_token_is_redacted_in_debug_output() {
        let debug = format!("{:?}", Secret::from_token("hf_abc"));
        assert!(!debug.contains("hf_abc"));
    }

    #[test]
    fn test_resolve_value() {
        assert_eq!(Secret::from_token("hf_abc").resolve_value().unwrap().as_deref(), Some("hf_abc"));

        let unset = "EXTRACTIVE_READER_TEST_UNSET_TOKEN";
        assert_eq!(Secret::from_env_vars(&[unset], false).resolve_value().unwrap(), None);
        assert!(Secret::from_env_vars(&[unset], true).resolve_value().is_err());

        // PATH is set in any test environment
        let path = Secret::from_env_vars(&[unset, "PATH"], true).resolve_value().unwrap();
        assert!(path.is_some());
    }

    #[test]
    fn test_strict_defaults_to_true_when_missing() {
        let secret: Secret = serde_json::from_value(json!({"type": "env_var", "env_vars": ["X"]})).unwrap();
        assert_eq!(secret, Secret::from_env_vars(&["X"], true));
    }
}
