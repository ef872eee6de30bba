use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides
///
/// `MONTAGE_SERVER_PORT=9000` overrides `server.port`. Keys are split on
/// `_`, so only single-word keys can be overridden from the environment.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("MONTAGE_").split("_"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Backend;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.render.fps, 25);
        assert_eq!(config.render.max_image_inputs, 32);
        assert_eq!(config.fetch.max_concurrent, 4);
        assert_eq!(config.fetch.retry.max_attempts, 3);
        assert!(config.engine.backend.is_none());
        assert!(!config.jobs.retain_failed_workdir);
    }

    #[test]
    fn test_load_config_from_str_sections() {
        let toml = r#"
[server]
port = 9000

[engine]
ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
backend = "videotoolbox"

[render]
fps = 30
seed = 7

[jobs]
work_dir = "/var/lib/montage/work"
retain_failed_workdir = true

[fetch]
calls_per_minute = 10

[fetch.retry]
max_attempts = 5
backoff_multiplier = 1.5
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(
            config.engine.ffmpeg_path,
            PathBuf::from("/opt/ffmpeg/bin/ffmpeg")
        );
        assert_eq!(config.engine.backend, Some(Backend::VideoToolbox));
        assert_eq!(config.render.fps, 30);
        assert_eq!(config.render.seed, Some(7));
        assert_eq!(config.jobs.work_dir, PathBuf::from("/var/lib/montage/work"));
        assert!(config.jobs.retain_failed_workdir);
        assert_eq!(config.fetch.calls_per_minute, 10);
        assert_eq!(config.fetch.retry.max_attempts, 5);
        assert_eq!(config.fetch.retry.initial_delay_ms, 500);
    }

    #[test]
    fn test_load_config_from_str_bad_backend() {
        let toml = r#"
[engine]
backend = "vaapi"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[server]
host = "127.0.0.1"
port = 3000
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
    }
}
