use std::path::{Path, PathBuf};

use tracing::debug;

use crate::schema::LungscanConfig;

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "lungscan.toml",
    "lungscan.yaml",
    "lungscan.yml",
    "lungscan.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<LungscanConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    parse_config(&raw, path)
        .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./lungscan.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/lungscan/lungscan.{toml,yaml,yml,json}` (user-global)
///
/// Returns `LungscanConfig::default()` if no config file is found. A file that
/// exists but does not parse is an error: the bot must not silently fall back
/// to a different classifier.
pub fn discover_and_load() -> anyhow::Result<LungscanConfig> {
    match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path)
        },
        None => {
            debug!("no config file found, using defaults");
            Ok(LungscanConfig::default())
        },
    }
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/lungscan/
    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/lungscan/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "lungscan").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<LungscanConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::schema::{BackendKind, ReplyStyle},
        lungscan_media::Normalization,
        secrecy::ExposeSecret,
    };

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn load_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "lungscan.toml",
            r#"
[telegram]
token = "123:ABC"
poll_timeout_secs = 10

[classifier]
backend = "local"
reply_style = "summary"

[classifier.local]
model_path = "models/lung.onnx"
normalization = "unit"
"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.telegram.token.expose_secret(), "123:ABC");
        assert_eq!(cfg.telegram.poll_timeout_secs, 10);
        assert_eq!(cfg.classifier.backend, BackendKind::Local);
        assert_eq!(cfg.classifier.reply_style, Some(ReplyStyle::Summary));
        assert_eq!(
            cfg.classifier.local.model_path.as_deref(),
            Some(Path::new("models/lung.onnx"))
        );
        assert_eq!(cfg.classifier.local.normalization, Normalization::Unit);
    }

    #[test]
    fn load_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "lungscan.yaml",
            "classifier:\n  backend: remote\n  remote:\n    endpoint: http://127.0.0.1:9000/predict\n    timeout_secs: 5\n",
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.classifier.backend, BackendKind::Remote);
        assert_eq!(cfg.classifier.remote.timeout_secs, 5);
    }

    #[test]
    fn load_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "lungscan.ini", "backend=local");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "lungscan.toml", "[classifier]\nbackend = \"gpu\"\n");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("lungscan.toml"));
    }

    #[test]
    fn load_missing_file_fails() {
        let err = load_config(Path::new("/nonexistent/lungscan.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
