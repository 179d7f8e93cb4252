pub mod email;

pub use email::{EmailMessage, LogMailer, Mailer, ResendClient};
