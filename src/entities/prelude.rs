pub use super::blocked_users::Entity as BlockedUsers;
pub use super::event_participants::Entity as EventParticipants;
pub use super::events::Entity as Events;
pub use super::follows::Entity as Follows;
pub use super::parental_controls::Entity as ParentalControls;
pub use super::password_reset_tokens::Entity as PasswordResetTokens;
pub use super::pin_attempts::Entity as PinAttempts;
pub use super::pin_reset_tokens::Entity as PinResetTokens;
pub use super::reports::Entity as Reports;
pub use super::users::Entity as Users;
