//! Bootstrap errors

use paybridge_config::ConfigError;
use paybridge_events::EventError;
use paybridge_payments::PaymentError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Events(#[from] EventError),
}

pub type Result<T> = std::result::Result<T, BootstrapError>;
