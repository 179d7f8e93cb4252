pub mod credentials;
pub use credentials::SecretHasher;

pub mod notifications;
pub use notifications::{Notified, Notifier};

pub mod parental_service;
pub mod parental_service_impl;
pub use parental_service::{AgeTransition, ParentalError, ParentalService};
pub use parental_service_impl::SeaOrmParentalService;

pub mod account_service;
pub mod account_service_impl;
pub use account_service::{AccountError, AccountService, LoginOutcome, UserProfile, UserSummary};
pub use account_service_impl::SeaOrmAccountService;

pub mod social_service;
pub mod social_service_impl;
pub use social_service::{ModerationService, SocialError, SocialService};
pub use social_service_impl::SeaOrmSocialService;

pub mod event_service;
pub mod event_service_impl;
pub use event_service::{EventError, EventService};
pub use event_service_impl::SeaOrmEventService;

pub mod scheduler;
pub use scheduler::Scheduler;
