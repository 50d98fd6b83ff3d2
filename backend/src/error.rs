use thiserror::Error;

/// How a failure should steer the retry executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The active endpoint is throttling; fail over before retrying.
    RateLimited,
    /// Worth another attempt against the same endpoint.
    Transient,
    /// Retrying cannot change the outcome.
    Permanent,
}

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("{operation} failed after {attempts} attempt(s): {source}")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<ReconcileError>,
    },

    #[error("No pool found for {asset}/{reference}")]
    PoolNotFound { asset: String, reference: String },

    #[error("Invalid vault data for {vault}: {reason}")]
    InvalidVaultData { vault: String, reason: String },

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Invalid pool state: {0}")]
    InvalidPoolState(String),

    #[error("Pool {pool} does not match the requested pair: {reason}")]
    PoolMismatch { pool: String, reason: String },

    #[error("Invalid mint account {mint}: {reason}")]
    InvalidMint { mint: String, reason: String },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Token mint address is empty (entry {position})")]
    EmptyAssetIdentifier { position: usize },

    #[error("Solana RPC error: {message}")]
    Rpc { class: FailureClass, message: String },

    #[error("HTTP error: {message}")]
    Http { class: FailureClass, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No RPC endpoints configured")]
    NoEndpoints,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReconcileError {
    pub fn classify(&self) -> FailureClass {
        match self {
            ReconcileError::Rpc { class, .. } | ReconcileError::Http { class, .. } => *class,
            ReconcileError::RetryExhausted { source, .. } => source.classify(),
            ReconcileError::AccountNotFound(_) | ReconcileError::Io(_) => FailureClass::Transient,
            ReconcileError::PoolNotFound { .. }
            | ReconcileError::InvalidVaultData { .. }
            | ReconcileError::InvalidPoolState(_)
            | ReconcileError::PoolMismatch { .. }
            | ReconcileError::InvalidMint { .. }
            | ReconcileError::InvalidAddress(_)
            | ReconcileError::EmptyAssetIdentifier { .. }
            | ReconcileError::Parse(_)
            | ReconcileError::NoEndpoints
            | ReconcileError::Config(_) => FailureClass::Permanent,
        }
    }

    /// Build an HTTP error from a response status code.
    pub fn http_status(status: u16, context: &str) -> Self {
        ReconcileError::Http {
            class: classify_status(status),
            message: format!("{} returned HTTP {}", context, status),
        }
    }
}

/// Map an HTTP status to a failure class.
pub fn classify_status(status: u16) -> FailureClass {
    match status {
        429 => FailureClass::RateLimited,
        408 | 500..=599 => FailureClass::Transient,
        _ => FailureClass::Permanent,
    }
}

/// Fallback for transports that only surface a message.
pub fn classify_message(message: &str) -> FailureClass {
    let lower = message.to_ascii_lowercase();
    if lower.contains("429") || lower.contains("too many requests") || lower.contains("rate limit") {
        FailureClass::RateLimited
    } else {
        FailureClass::Transient
    }
}

impl From<reqwest::Error> for ReconcileError {
    fn from(e: reqwest::Error) -> Self {
        let class = match e.status() {
            Some(status) => classify_status(status.as_u16()),
            None if e.is_decode() => FailureClass::Permanent,
            None => FailureClass::Transient,
        };
        ReconcileError::Http {
            class,
            message: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
