use std::collections::HashMap;
use std::path::{Path, PathBuf};

use config::{Config as ConfigLib, ConfigError, Environment, File};
use serde::Deserialize;

use crate::client::SigningCredentials;
use crate::error::ConfigError as ClientConfigError;
use crate::soap::wsse::SignatureSuite;

const DEFAULT_FILE: &str = "config/soap";

/// Client settings loaded from `config/soap.*` and `SOAP_*` variables
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub endpoint: String,
    pub timeout_secs: u64,
    pub signature_suite: SignatureSuite,
    #[serde(default)]
    pub certificate_path: Option<PathBuf>,
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_sources(None)
    }

    pub fn load_with_sources(env_vars: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_FILE, env_vars)
    }

    /// Load from `file` (any supported extension, optional) and the environment
    pub fn load_from(
        file: impl AsRef<Path>,
        env_vars: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = ConfigLib::builder()
            .set_default("timeout_secs", 30)?
            .set_default("signature_suite", "rsa-sha1")?
            .add_source(File::from(file.as_ref()).required(false));

        // If env_vars is provided, we use it instead of system environment
        if let Some(vars) = env_vars {
            for (key, value) in vars {
                builder = builder.set_override(&key, value)?;
            }
        } else {
            // Should be in the format SOAP_ENDPOINT or SOAP_TIMEOUT_SECS
            builder = builder.add_source(
                Environment::with_prefix("SOAP")
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        builder.build()?.try_deserialize()
    }

    /// Read the certificate and key files; both paths or neither must be set
    pub fn signing_credentials(&self) -> Result<Option<SigningCredentials>, ClientConfigError> {
        match (&self.certificate_path, &self.private_key_path) {
            (Some(certificate), Some(private_key)) => Ok(Some(SigningCredentials::new(
                read(certificate)?,
                read(private_key)?,
            ))),
            (None, None) => Ok(None),
            _ => Err(ClientConfigError::invalid_option(
                "signing_credentials",
                "certificate_path and private_key_path must be set together",
            )),
        }
    }
}

fn read(path: &Path) -> Result<Vec<u8>, ClientConfigError> {
    std::fs::read(path).map_err(|source| ClientConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
