pub mod refresh_token;
pub mod session;
pub mod token_blacklist;
pub mod user;
