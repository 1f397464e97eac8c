use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub struct Config {
    pub store_path: PathBuf,
    pub backend_db_path: PathBuf,
    pub data_dir: PathBuf,
    pub api_url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "moneywise").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let store_path = data_dir.join("moneywise.db");
        let backend_db_path = data_dir.join("backend.db");
        let api_url = std::env::var("MONEYWISE_API_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());

        Ok(Config {
            store_path,
            backend_db_path,
            data_dir,
            api_url,
        })
    }

    /// Gemini API key: environment variable first, then a key file in the
    /// data directory. Absent means the AI proxy runs unconfigured and
    /// answers chat requests with an upstream error.
    #[must_use]
    pub fn gemini_api_key(&self) -> Option<String> {
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            let key = key.trim().to_string();
            if !key.is_empty() {
                return Some(key);
            }
        }
        let path = self.data_dir.join("gemini_api_key");
        let key = std::fs::read_to_string(path).ok()?;
        let key = key.trim().to_string();
        if key.is_empty() { None } else { Some(key) }
    }
}
