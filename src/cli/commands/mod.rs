mod init;
mod purge;

pub use init::cmd_init;
pub use purge::cmd_purge_tokens;
