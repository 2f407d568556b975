pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod session;
pub mod storage;
