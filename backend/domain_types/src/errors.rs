pub type CustomResult<T, E> = error_stack::Result<T, E>;

#[derive(Debug, thiserror::Error, PartialEq, Clone)]
pub enum ApiClientError {
    #[error("Header map construction failed")]
    HeaderMapConstructionFailed,
    #[error("Invalid proxy configuration")]
    InvalidProxyConfiguration,
    #[error("Client construction failed")]
    ClientConstructionFailed,
    #[error("URL encoding of request payload failed")]
    UrlEncodingFailed,
    #[error("Failed to send request to gateway {0}")]
    RequestNotSent(String),
    #[error("Failed to decode response")]
    ResponseDecodingFailed,
    #[error("Server responded with Request Timeout")]
    RequestTimeoutReceived,
    #[error("Server responded with unexpected response")]
    UnexpectedServerResponse,
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("Failed to obtain authentication type")]
    FailedToObtainAuthType,
    #[error("Missing required field: {field_name}")]
    MissingRequiredField { field_name: &'static str },
    #[error("Failed to encode gateway request")]
    RequestEncodingFailed,
    #[error("Failed to deserialize gateway response")]
    ResponseDeserializationFailed,
    #[error("Failed at gateway processing step")]
    ProcessingStepFailed,
    #[error("Gateway reported a mismatched transaction: {0}")]
    IntegrityCheckFailed(String),
}

/// Failure taxonomy of the verification service. Only `GatewayUnreachable`
/// is transient from the caller's point of view.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("Gateway secret key is not configured")]
    MissingConfiguration,
    #[error("No payment record found for the given reference")]
    RecordNotFound,
    #[error("Gateway could not be reached")]
    GatewayUnreachable,
    #[error("Gateway rejected the transaction: {code}: {message}")]
    GatewayRejection { code: String, message: String },
    #[error("Gateway payload does not match the payment record: {0}")]
    IntegrityCheckFailed(String),
    #[error("Payment storage failed")]
    StorageError,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StorageError {
    #[error("No record found for reference {reference}")]
    NotFound { reference: String },
    #[error("A record already exists for reference {reference}")]
    DuplicateReference { reference: String },
    #[error("Illegal status transition {from} -> {to} for reference {reference}")]
    IllegalTransition {
        reference: String,
        from: crate::payment::PaymentStatus,
        to: crate::payment::PaymentStatus,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ParsingError {
    #[error("Failed to parse struct: {0}")]
    StructParseFailure(&'static str),
}
