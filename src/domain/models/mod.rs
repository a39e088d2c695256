pub mod credit;
pub mod list;
pub mod user;

pub use credit::{
    CreditAccount, CreditEntryStatus, CreditEntryType, CreditHistoryEntry, CreditHistoryFilter,
    CreditHistoryPage, CreditHistoryQuery,
};
pub use list::{EmailList, ListCounts, ListStatus, VerificationStats};
pub use user::{MIN_PASSWORD_LENGTH, TimezonePreference, User, is_valid_email};
