use dotenv::dotenv;
use log::*;
use uuid::Uuid;

use std::env;

const DEFAULT_APP_URL: &str = "http://localhost:8000/";
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_TEMPLATE_DIR: &str = "templates";

/**
 * Runtime settings, read from the environment (and `.env` if present)
 */
#[derive(Clone, Debug)]
pub struct Settings {
    /**
     * When unset the polls only live in memory
     */
    pub database_url: Option<String>,
    /**
     * Base URL for shareable links, always ending in `/`
     */
    pub app_url: String,
    pub listen_addr: String,
    pub template_dir: String,
}

impl Settings {
    pub fn from_env() -> Self {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = non_empty("DATABASE_URL");
        if database_url.is_none() {
            warn!("DATABASE_URL is not set, polls will only be kept in memory");
        }

        let mut app_url = non_empty("APP_URL").unwrap_or_else(|| DEFAULT_APP_URL.to_string());
        if !app_url.ends_with('/') {
            app_url.push('/');
        }

        Self {
            database_url,
            app_url,
            listen_addr: non_empty("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
            template_dir: non_empty("TEMPLATE_DIR")
                .unwrap_or_else(|| DEFAULT_TEMPLATE_DIR.to_string()),
        }
    }

    /**
     * The link people can pass around to reach a poll
     */
    pub fn share_url(&self, poll_id: &Uuid) -> String {
        format!("{}view/{}", self.app_url, poll_id)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
