use std::{env, fs, path::Path, time::Duration};

use crate::{errors::Error, Result};

/// Typed configuration, read once at startup.
///
/// Defaults mirror the limits the CRM has always shipped with: 3 s between
/// contact-import attempts, 50 new imports per hour, 20-message history
/// pages, 10 contacts per listing page.
#[derive(Clone, Debug)]
pub struct Config {
    pub bot_token: String,
    /// Always authorized, never removable from the admin registry.
    pub owner_id: i64,
    pub database_path: String,

    /// Mandatory pause before each contact-import attempt.
    pub import_delay: Duration,
    /// Ceiling on new import attempts made by one batch run.
    pub max_imports_per_hour: usize,
    pub history_page_size: usize,
    pub contacts_page_size: usize,
    /// Bound on any single platform call (send, import).
    pub platform_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let bot_token = env_str("CRM_BOT_TOKEN").and_then(non_empty).ok_or_else(|| {
            Error::Config("CRM_BOT_TOKEN environment variable is required".to_string())
        })?;
        let owner_id = env_i64("CRM_OWNER_ID").ok_or_else(|| {
            Error::Config("CRM_OWNER_ID environment variable is required".to_string())
        })?;

        let database_path = env_str("CRM_DATABASE_PATH").unwrap_or_else(|| "crm.db".to_string());

        let import_delay = Duration::from_secs(env_u64("CRM_IMPORT_DELAY_SECS").unwrap_or(3));
        let max_imports_per_hour = env_usize("CRM_MAX_IMPORTS_PER_HOUR").unwrap_or(50);
        let history_page_size = env_usize("CRM_HISTORY_PAGE_SIZE").unwrap_or(20);
        let contacts_page_size = env_usize("CRM_CONTACTS_PAGE_SIZE").unwrap_or(10);
        let platform_timeout =
            Duration::from_secs(env_u64("CRM_PLATFORM_TIMEOUT_SECS").unwrap_or(30));

        if import_delay.is_zero() {
            return Err(Error::Config(
                "CRM_IMPORT_DELAY_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            bot_token,
            owner_id,
            database_path,
            import_delay,
            max_imports_per_hour,
            history_page_size,
            contacts_page_size,
            platform_timeout,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_i64(key: &str) -> Option<i64> {
    env_str(key).and_then(|s| s.trim().parse::<i64>().ok())
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
