use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Could not initialize payment gateway client: {0}")]
    Initialization(String),
    /// Timeouts and connection failures. Never a statement about the order itself.
    #[error("Network error, please retry. {0}")]
    Network(String),
    #[error("Payment gateway rejected the request. Code {code}. {message}")]
    Rejected { code: i64, message: String },
    #[error("Payment gateway returned an unparseable response")]
    UnparseableResponse,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Invalid param format")]
    InvalidParam,
}

impl GatewayError {
    /// The short reason string that is safe to show to a customer or return to the gateway.
    pub fn public_message(&self) -> String {
        match self {
            Self::Initialization(_) | Self::Network(_) => "network error, please retry".to_string(),
            Self::Rejected { message, .. } => message.clone(),
            Self::UnparseableResponse => "unparseable payment gateway response".to_string(),
            Self::InvalidSignature => "Invalid signature".to_string(),
            Self::InvalidParam => "Invalid param format".to_string(),
        }
    }
}
