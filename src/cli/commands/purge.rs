//! Purge-tokens command handler

use crate::config::Config;
use crate::db::Store;
use crate::services::scheduler::purge_tokens;

pub async fn cmd_purge_tokens(config: &Config) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let removed = purge_tokens(&store).await?;

    println!("Removed {removed} expired or used reset token(s).");
    Ok(())
}
