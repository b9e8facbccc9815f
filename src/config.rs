use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app::Timings;

/// Built-in defaults; also copied to the user config path on first run.
const BLUEPRINT: &str = include_str!("../empire.toml");

#[derive(Debug, Deserialize, Serialize)]
pub struct Settings {
    pub gemini_model: String,
    pub gemini_endpoint: String,
    pub gemini_api_key: Option<String>,
    pub splash_ms: u64,
    pub settle_ms: u64,
    pub stagger_ms: u64,
    pub fade_ms: u64,
    pub reveal_threshold: f32,
    pub generation_timeout_secs: u64,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let user_config_path = get_user_config_path();
        if let Some(path) = &user_config_path {
            ensure_user_config(path);
        }
        Self::load(user_config_path.as_deref(), Path::new("empire.toml"))
    }

    /// Layers, later wins: blueprint, user config, local file, `EMPIRE_*` env.
    pub fn load(user_config: Option<&Path>, local: &Path) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(File::from_str(BLUEPRINT, FileFormat::Toml));
        if let Some(path) = user_config {
            builder = builder.add_source(File::from(path.to_path_buf()).required(false));
        }
        let s = builder
            .add_source(File::from(local.to_path_buf()).required(false))
            .add_source(Environment::with_prefix("EMPIRE"))
            .build()?;

        let mut settings: Settings = s.try_deserialize()?;
        if settings.gemini_api_key.as_deref().is_none_or(str::is_empty) {
            settings.gemini_api_key = std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty());
        }
        Ok(settings)
    }

    pub fn timings(&self) -> Timings {
        Timings {
            splash: Duration::from_millis(self.splash_ms),
            settle: Duration::from_millis(self.settle_ms),
            stagger_step: Duration::from_millis(self.stagger_ms),
            fade: Duration::from_millis(self.fade_ms),
            threshold: self.reveal_threshold.clamp(0.0, 1.0),
        }
    }

    pub fn generation_timeout(&self) -> Option<Duration> {
        (self.generation_timeout_secs > 0).then(|| Duration::from_secs(self.generation_timeout_secs))
    }
}

pub fn get_user_config_path() -> Option<PathBuf> {
    let mut path = dirs::home_dir()?;
    path.push(".config");
    path.push("empire");
    path.push("empire.toml");
    Some(path)
}

fn ensure_user_config(path: &Path) {
    if path.exists() {
        return;
    }
    let written = path
        .parent()
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|_| fs::write(path, BLUEPRINT));
    if let Err(err) = written {
        tracing::warn!(path = %path.display(), error = %err, "could not create user config");
    }
}

pub fn save_api_key(api_key: &str) -> Result<(), anyhow::Error> {
    let user_config_path = get_user_config_path().ok_or_else(|| anyhow::anyhow!("no home directory"))?;
    ensure_user_config(&user_config_path);

    let config_str = fs::read_to_string(&user_config_path).unwrap_or_default();
    let mut doc = config_str.parse::<toml::Table>()?;

    doc.insert("gemini_api_key".to_string(), toml::Value::String(api_key.to_string()));

    fs::write(&user_config_path, doc.to_string())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn blueprint_defaults() {
        let settings = Settings::load(None, Path::new("does-not-exist.toml")).unwrap();
        assert_eq!(settings.gemini_model, "gemini-2.5-flash-image");
        assert_eq!(settings.splash_ms, 800);
        assert_eq!(settings.settle_ms, 100);
        assert_eq!(settings.reveal_threshold, 0.1);
        assert_eq!(settings.generation_timeout(), Some(Duration::from_secs(90)));

        let timings = settings.timings();
        assert_eq!(timings.splash, Duration::from_millis(800));
        assert_eq!(timings.stagger_step, Duration::from_millis(100));
    }

    #[test]
    fn local_file_overrides() {
        let mut local = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(local, "splash_ms = 1500\ngeneration_timeout_secs = 0").unwrap();

        let settings = Settings::load(None, local.path()).unwrap();
        assert_eq!(settings.splash_ms, 1500);
        assert_eq!(settings.settle_ms, 100);
        assert_eq!(settings.generation_timeout(), None);
    }
}
