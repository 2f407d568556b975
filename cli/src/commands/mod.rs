pub mod friend;
pub mod member;
pub mod room;
pub mod user;
pub mod watch;
