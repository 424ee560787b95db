// Environment-variable settings and the `.env` loader.
//
// The bot is configured entirely from the environment: `USER_ID`,
// `USER_NAME` and `HOST` are required; `REPLAYS_FOLDER`, `LEVEL` and
// `SEED` are optional. A `.env` file in the working directory, if present,
// is loaded first — plain `KEY=VALUE` lines, `#` comments, optional
// double quotes around the value. No configuration framework; the format
// is small enough to parse by hand.

use std::fs;
use std::path::PathBuf;

use tracing::warn;

/// Parsed configuration for one bot run.
#[derive(Clone, Debug)]
pub struct Settings {
    pub user_id: String,
    pub user_name: String,
    pub host: String,
    pub replays_folder: Option<PathBuf>,
    pub level: Option<i32>,
    pub seed: Option<i32>,
}

impl Settings {
    /// Read all settings from the environment. Missing required variables
    /// are an error.
    pub fn from_env() -> Result<Settings, String> {
        Ok(Settings {
            user_id: require_env("USER_ID")?,
            user_name: require_env("USER_NAME")?,
            host: require_env("HOST")?,
            replays_folder: std::env::var("REPLAYS_FOLDER").ok().map(PathBuf::from),
            level: env_int("LEVEL")?,
            seed: env_int("SEED")?,
        })
    }
}

fn require_env(name: &str) -> Result<String, String> {
    std::env::var(name).map_err(|_| format!("environment variable {name} not set"))
}

fn env_int(name: &str) -> Result<Option<i32>, String> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|e| format!("invalid integer value for {name}: {e}")),
        Err(_) => Ok(None),
    }
}

/// Load `./.env` into the process environment. Silently does nothing when
/// the file is absent; malformed lines are skipped.
pub fn load_dotenv() {
    let Ok(contents) = fs::read_to_string(".env") else {
        return;
    };
    for line in contents.lines() {
        let line = match line.find('#') {
            Some(comment) => &line[..comment],
            None => line,
        }
        .trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            warn!(line, "skipping malformed .env line");
            continue;
        };
        let key = key.trim();
        let mut value = value.trim();
        if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
            value = &value[1..value.len() - 1];
        }
        std::env::set_var(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment-variable tests mutate process state, so everything runs
    // in one test to avoid interference between parallel tests.
    #[test]
    fn settings_read_required_and_optional_values() {
        std::env::set_var("USER_ID", "u-1");
        std::env::set_var("USER_NAME", "tester");
        std::env::set_var("HOST", "localhost:5001");
        std::env::remove_var("REPLAYS_FOLDER");
        std::env::set_var("LEVEL", "7");
        std::env::remove_var("SEED");

        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.user_id, "u-1");
        assert_eq!(settings.user_name, "tester");
        assert_eq!(settings.host, "localhost:5001");
        assert_eq!(settings.replays_folder, None);
        assert_eq!(settings.level, Some(7));
        assert_eq!(settings.seed, None);

        std::env::set_var("LEVEL", "not-a-number");
        assert!(Settings::from_env().is_err());

        std::env::remove_var("USER_ID");
        std::env::set_var("LEVEL", "1");
        let err = Settings::from_env().unwrap_err();
        assert!(err.contains("USER_ID"), "{err}");
    }
}
