pub mod authenticate_user;
pub mod lists;
pub mod users;
pub mod verify_single;
