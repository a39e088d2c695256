pub mod auth;
pub mod credits;
pub mod health;
pub mod lists;
pub mod root;
pub mod timezones;
pub mod users;
