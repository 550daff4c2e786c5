use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

pub(super) const DEFAULT_HOST: &str = "0.0.0.0";
pub(super) const DEFAULT_PORT: u16 = 9100;
pub(super) const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
pub(super) const DEFAULT_MAX_IN_FLIGHT: usize = 8;

#[derive(Debug, Deserialize, Default)]
pub(super) struct GatewayConfigFile {
    #[serde(default)]
    pub(super) server: GatewayServerConfig,
}

#[derive(Debug, Deserialize, Default)]
pub(super) struct GatewayServerConfig {
    pub(super) host: Option<String>,
    pub(super) port: Option<u16>,
    pub(super) max_body_bytes: Option<usize>,
    pub(super) max_in_flight: Option<usize>,
}

/// The config file is optional; `None` means built-in defaults.
pub(super) fn resolve_gateway_config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("PIPELINE_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let cwd = env::current_dir().ok()?;
    let direct = cwd.join("pipeline.toml");
    if direct.exists() {
        return Some(direct);
    }
    let nested = cwd.join("pipeline_module").join("pipeline.toml");
    if nested.exists() {
        return Some(nested);
    }
    None
}

pub(super) fn load_gateway_config(path: &Path) -> Result<GatewayConfigFile, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read gateway config: {}", err))?;
    parse_gateway_config(&content)
}

pub(super) fn parse_gateway_config(content: &str) -> Result<GatewayConfigFile, String> {
    toml::from_str::<GatewayConfigFile>(content)
        .map_err(|err| format!("failed to parse gateway config: {}", err))
}

/// Env values win over the file, the file over defaults.
pub(super) fn resolve_listen_address<F>(file: &GatewayConfigFile, lookup: F) -> (String, u16)
where
    F: Fn(&str) -> Option<String>,
{
    let host = lookup("GATEWAY_HOST")
        .filter(|value| !value.trim().is_empty())
        .or_else(|| file.server.host.clone())
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = lookup("GATEWAY_PORT")
        .and_then(|value| value.trim().parse::<u16>().ok())
        .or(file.server.port)
        .unwrap_or(DEFAULT_PORT);
    (host, port)
}

pub(super) fn resolve_max_body_bytes<F>(file: &GatewayConfigFile, lookup: F) -> usize
where
    F: Fn(&str) -> Option<String>,
{
    lookup("GATEWAY_MAX_BODY_BYTES")
        .and_then(|value| value.trim().parse::<usize>().ok())
        .or(file.server.max_body_bytes)
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_MAX_BODY_BYTES)
}

/// Upper bound on pipeline runs executing at once. Zero is ignored.
pub(super) fn resolve_max_in_flight<F>(file: &GatewayConfigFile, lookup: F) -> usize
where
    F: Fn(&str) -> Option<String>,
{
    lookup("GATEWAY_MAX_IN_FLIGHT")
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
        .or(file.server.max_in_flight.filter(|value| *value > 0))
        .unwrap_or(DEFAULT_MAX_IN_FLIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_without_file_or_env() {
        let file = GatewayConfigFile::default();
        assert_eq!(
            resolve_listen_address(&file, no_env),
            (DEFAULT_HOST.to_string(), DEFAULT_PORT)
        );
        assert_eq!(resolve_max_body_bytes(&file, no_env), DEFAULT_MAX_BODY_BYTES);
        assert_eq!(resolve_max_in_flight(&file, no_env), DEFAULT_MAX_IN_FLIGHT);
    }

    #[test]
    fn file_values_apply() {
        let file = parse_gateway_config(
            r#"
            [server]
            host = "127.0.0.1"
            port = 8088
            max_body_bytes = 2048
            max_in_flight = 3
            "#,
        )
        .unwrap();
        assert_eq!(
            resolve_listen_address(&file, no_env),
            ("127.0.0.1".to_string(), 8088)
        );
        assert_eq!(resolve_max_body_bytes(&file, no_env), 2048);
        assert_eq!(resolve_max_in_flight(&file, no_env), 3);
    }

    #[test]
    fn max_in_flight_env_must_be_positive() {
        let file = parse_gateway_config("[server]\nmax_in_flight = 4\n").unwrap();
        let zero = |key: &str| (key == "GATEWAY_MAX_IN_FLIGHT").then(|| "0".to_string());
        assert_eq!(resolve_max_in_flight(&file, zero), 4);
        let two = |key: &str| (key == "GATEWAY_MAX_IN_FLIGHT").then(|| " 2 ".to_string());
        assert_eq!(resolve_max_in_flight(&file, two), 2);
    }

    #[test]
    fn env_overrides_file() {
        let file = parse_gateway_config("[server]\nhost = \"127.0.0.1\"\nport = 8088\n").unwrap();
        let env = |key: &str| match key {
            "GATEWAY_HOST" => Some("10.0.0.5".to_string()),
            "GATEWAY_PORT" => Some("7000".to_string()),
            _ => None,
        };
        assert_eq!(resolve_listen_address(&file, env), ("10.0.0.5".to_string(), 7000));
    }

    #[test]
    fn bad_port_falls_back_to_file() {
        let file = parse_gateway_config("[server]\nport = 8088\n").unwrap();
        let env = |key: &str| (key == "GATEWAY_PORT").then(|| "http".to_string());
        assert_eq!(resolve_listen_address(&file, env).1, 8088);
    }

    #[test]
    fn malformed_file_is_reported() {
        let err = parse_gateway_config("[server\nport = 1").unwrap_err();
        assert!(err.starts_with("failed to parse gateway config"));
    }
}
