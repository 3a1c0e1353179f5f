use thiserror::Error;

/// Bitcoin chain operation errors.
#[derive(Debug, Error)]
pub enum BtcError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid address kind: {0}")]
    InvalidAddressKind(String),

    #[error("invalid script: {0}")]
    InvalidScript(String),

    #[error("insufficient funds: balance {balance} sat does not cover fee {fee} sat")]
    InsufficientFunds { balance: u64, fee: u64 },

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("signing error: {0}")]
    SigningError(String),

    #[error("verification failed: {0}")]
    VerificationFailed(String),

    #[error("invalid network: {0}")]
    InvalidNetwork(String),
}
