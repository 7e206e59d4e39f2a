use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use card_shop_engine::{CatalogError, OrderFlowError, StoreError};
use log::error;
use pay_gateway::GatewayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Payload deserialization error")]
    CouldNotDeserializePayload,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    Conflict(String),
    #[error("A valid X-Admin-Token header is required.")]
    AdminTokenRequired,
    #[error("{}", .0.public_message())]
    PaymentGatewayError(#[from] GatewayError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::CouldNotDeserializePayload => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::AdminTokenRequired => StatusCode::UNAUTHORIZED,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::PaymentGatewayError(e) => match e {
                GatewayError::InvalidSignature | GatewayError::InvalidParam => StatusCode::BAD_REQUEST,
                GatewayError::Network(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            error!("💻️ {self}");
        }
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "success": false, "error": self.to_string() }).to_string())
    }
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::CardSecretSold(_) | StoreError::OrderDeletionForbidden(_) | StoreError::Duplicate(_) => {
                Self::Conflict(e.to_string())
            },
            StoreError::InvalidRecord(_) => Self::ValidationError(e.to_string()),
            _ => Self::BackendError(format!("Database error: {e}")),
        }
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::DatabaseError(e) => e.into(),
            OrderFlowError::ProductNotFound(_) | OrderFlowError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            OrderFlowError::InvalidOrderState(_) => Self::Conflict(e.to_string()),
            OrderFlowError::ProductUnavailable(_) |
            OrderFlowError::OutOfStock(_) |
            OrderFlowError::InvalidQuantity(_) |
            OrderFlowError::InvalidContactInfo |
            OrderFlowError::PaymentMismatch(_) => Self::ValidationError(e.to_string()),
        }
    }
}

impl From<CatalogError> for ServerError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::DatabaseError(e) => e.into(),
            CatalogError::ProductNotFound(_) | CatalogError::CardSecretNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            CatalogError::InvalidProduct(_) => Self::ValidationError(e.to_string()),
        }
    }
}
