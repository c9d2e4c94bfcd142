use secrecy::SecretString;

use crate::types::Connectors;

/// Credentials handed to a connector integration. Paystack authenticates
/// every verification call with a bearer secret key.
#[derive(Clone, Debug)]
pub enum ConnectorAuthType {
    HeaderKey { api_key: SecretString },
    NoKey,
}

/// Error payload extracted from a non-2xx gateway response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub status_code: u16,
    pub code: String,
    pub message: String,
    pub reason: Option<String>,
}

/// Carrier for one connector call: request data in, response (or gateway
/// error) out. `Flow` is a marker type selecting the integration.
#[derive(Debug, Clone)]
pub struct RouterData<Flow, Req, Resp> {
    pub connectors: Connectors,
    pub connector_auth_type: ConnectorAuthType,
    pub reference_id: String,
    pub request: Req,
    pub response: Result<Resp, ErrorResponse>,
    flow: std::marker::PhantomData<Flow>,
}

impl<Flow, Req, Resp> RouterData<Flow, Req, Resp> {
    pub fn new(
        connectors: Connectors,
        connector_auth_type: ConnectorAuthType,
        reference_id: String,
        request: Req,
    ) -> Self {
        Self {
            connectors,
            connector_auth_type,
            reference_id,
            request,
            response: Err(ErrorResponse {
                status_code: 0,
                code: "NO_RESPONSE".to_string(),
                message: "no gateway call has been made yet".to_string(),
                reason: None,
            }),
            flow: std::marker::PhantomData,
        }
    }
}
