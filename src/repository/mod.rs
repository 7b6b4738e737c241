pub mod auth;
pub mod categories;
pub mod goals;
pub mod sessions;
pub mod timers;
pub mod verification;
