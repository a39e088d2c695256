pub mod credit;
pub mod jwt;
pub mod password;
pub mod timezones;
pub mod verification;
