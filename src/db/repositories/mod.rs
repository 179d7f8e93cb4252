pub mod event;
pub mod moderation;
pub mod parental;
pub mod social;
pub mod token;
pub mod user;
