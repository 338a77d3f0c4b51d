pub mod app;
pub mod config;
pub mod constants;
pub mod conversation;
pub mod credentials;
pub mod inference;
pub mod knowledge;
pub mod message;
pub mod paths;
pub mod profile;
pub mod prompt;
pub mod session;
pub mod storage;
pub mod transcript;
