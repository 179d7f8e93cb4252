//! Init command handler

use crate::config::Config;

pub fn cmd_init() -> anyhow::Result<()> {
    if Config::create_default_if_missing()? {
        println!("Created config.toml with default settings.");
        println!("Set [email] resend_api_key (or MIRRO_RESEND_API_KEY) before enabling email.");
    } else {
        println!("config.toml already exists, leaving it untouched.");
    }
    Ok(())
}
