use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::session::{SessionError, SessionKeys};

/// JWT signing configuration: where the RS256 key pair lives on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    pub private_key_file: PathBuf,
    pub public_key_file: PathBuf,
}

impl SessionSettings {
    pub fn load_keys(&self) -> Result<SessionKeys, SessionError> {
        SessionKeys::from_pem_files(&self.private_key_file, &self.public_key_file)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub session: SessionSettings,
}

impl Settings {
    /// Loads settings from `gridpoint.json` (optional) overlaid with
    /// `GRIDPOINT__*` environment variables; `.env` is read first when
    /// present.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_file(Path::new("gridpoint"))
    }

    pub fn from_file(path: &Path) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::with_prefix("GRIDPOINT").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_from_json() {
        let settings: Settings = serde_json::from_value(serde_json::json!({
            "session": {
                "private_key_file": "/etc/gridpoint/jwt_private.pem",
                "public_key_file": "/etc/gridpoint/jwt_public.pem"
            }
        }))
        .unwrap();
        assert_eq!(
            settings.session.private_key_file,
            PathBuf::from("/etc/gridpoint/jwt_private.pem")
        );
    }
}
