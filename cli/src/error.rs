use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("No active user. Run `hearthctl user create` or `hearthctl user use <id>` first")]
    NoActiveUser,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
