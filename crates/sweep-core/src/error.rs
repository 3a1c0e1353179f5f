use chain_btc::error::BtcError;
use chain_eth::error::EthError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Invalid network: {0}")]
    InvalidNetwork(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid address kind: {0}")]
    InvalidAddressKind(String),

    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Transaction build failed: {0}")]
    Transaction(String),

    #[error("Chain client error: {0}")]
    Client(String),

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    #[error("Operation cancelled")]
    Cancelled,

    /// The first failure of a batch, tagged with the identifier it hit.
    #[error("Collecting {identifier} failed: {source}")]
    Identifier {
        identifier: Uuid,
        #[source]
        source: Box<SweepError>,
    },
}

impl SweepError {
    /// Attach the identifier whose sweep produced this error.
    pub fn for_identifier(self, identifier: Uuid) -> Self {
        match self {
            tagged @ SweepError::Identifier { .. } => tagged,
            other => SweepError::Identifier {
                identifier,
                source: Box::new(other),
            },
        }
    }

    /// The identifier a batch failed at, if the error carries one.
    pub fn identifier(&self) -> Option<Uuid> {
        match self {
            SweepError::Identifier { identifier, .. } => Some(*identifier),
            _ => None,
        }
    }

    /// The error with any identifier tag removed.
    pub fn root(&self) -> &SweepError {
        match self {
            SweepError::Identifier { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<BtcError> for SweepError {
    fn from(e: BtcError) -> Self {
        match e {
            BtcError::InvalidNetwork(msg) => SweepError::InvalidNetwork(msg),
            BtcError::InvalidAddress(msg) => SweepError::InvalidAddress(msg),
            BtcError::InvalidAddressKind(msg) => SweepError::InvalidAddressKind(msg),
            BtcError::InvalidPrivateKey(msg) => SweepError::InvalidKeyMaterial(msg),
            other => SweepError::Transaction(format!("BTC: {other}")),
        }
    }
}

impl From<EthError> for SweepError {
    fn from(e: EthError) -> Self {
        match e {
            EthError::InvalidPrivateKey(msg) => SweepError::InvalidKeyMaterial(msg),
            EthError::InvalidAddress(msg) => SweepError::InvalidAddress(msg),
            EthError::UnsupportedNetwork(msg) => SweepError::InvalidNetwork(msg),
        }
    }
}

impl From<serde_json::Error> for SweepError {
    fn from(e: serde_json::Error) -> Self {
        SweepError::Config(e.to_string())
    }
}
