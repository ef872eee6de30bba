use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Frame rate and image input ceiling are positive
/// - Fetch concurrency and rate ceiling are positive
/// - Retry backoff does not shrink
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return invalid("server.port cannot be 0");
    }

    // Render validation
    if config.render.fps == 0 {
        return invalid("render.fps cannot be 0");
    }
    if config.render.max_image_inputs == 0 {
        return invalid("render.max_image_inputs cannot be 0");
    }

    // Fetch validation
    if config.fetch.max_concurrent == 0 {
        return invalid("fetch.max_concurrent cannot be 0");
    }
    if config.fetch.calls_per_minute == 0 {
        return invalid("fetch.calls_per_minute cannot be 0");
    }
    let multiplier = config.fetch.retry.backoff_multiplier;
    if !multiplier.is_finite() || multiplier < 1.0 {
        return invalid("fetch.retry.backoff_multiplier must be at least 1");
    }

    Ok(())
}

fn invalid(message: &str) -> Result<(), ConfigError> {
    Err(ConfigError::ValidationError(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use std::net::IpAddr;

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let config = Config {
            server: ServerConfig {
                host: "0.0.0.0".parse::<IpAddr>().unwrap(),
                port: 0,
            },
            ..Config::default()
        };
        let result = validate_config(&config);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_render_and_fetch_limits() {
        let mut config = Config::default();
        config.render.fps = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.render.max_image_inputs = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.fetch.max_concurrent = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.fetch.calls_per_minute = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_backoff_multiplier() {
        let mut config = Config::default();
        config.fetch.retry.backoff_multiplier = 0.5;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("backoff_multiplier"));

        config.fetch.retry.backoff_multiplier = 1.0;
        assert!(validate_config(&config).is_ok());
    }
}
