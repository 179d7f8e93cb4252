pub mod prelude;

pub mod blocked_users;
pub mod event_participants;
pub mod events;
pub mod follows;
pub mod parental_controls;
pub mod password_reset_tokens;
pub mod pin_attempts;
pub mod pin_reset_tokens;
pub mod reports;
pub mod users;
