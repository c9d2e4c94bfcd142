pub mod transformers;

use domain_types::{
    connector_flow::Verify,
    connector_types::{PaymentsVerifyData, VerifyResponseData},
    errors::{ConnectorError, CustomResult},
    request::{Headers, Maskable, Method},
    router_data::{ConnectorAuthType, ErrorResponse, RouterData},
    types::Connectors,
    utils::ByteSliceExt,
};
use error_stack::ResultExt;
use interfaces::api::{ConnectorCommon, ConnectorIntegration, Response};
use secrecy::ExposeSecret;

use self::transformers as paystack;

pub(crate) mod headers {
    pub(crate) const AUTHORIZATION: &str = "Authorization";
}

pub struct Paystack;

impl Paystack {
    pub fn new() -> &'static Self {
        &Self
    }
}

impl ConnectorCommon for Paystack {
    fn id(&self) -> &'static str {
        "paystack"
    }

    fn base_url<'a>(&self, connectors: &'a Connectors) -> &'a str {
        connectors.paystack.base_url.as_ref()
    }

    fn get_auth_header(
        &self,
        auth_type: &ConnectorAuthType,
    ) -> CustomResult<Headers, ConnectorError> {
        match auth_type {
            ConnectorAuthType::HeaderKey { api_key } => Ok(vec![(
                headers::AUTHORIZATION.to_string(),
                Maskable::Masked(format!("Bearer {}", api_key.expose_secret())),
            )]),
            ConnectorAuthType::NoKey => {
                Err(error_stack::report!(ConnectorError::FailedToObtainAuthType))
            }
        }
    }

    fn build_error_response(&self, res: Response) -> CustomResult<ErrorResponse, ConnectorError> {
        let response: paystack::PaystackErrorResponse = res
            .response
            .parse_struct("PaystackErrorResponse")
            .change_context(ConnectorError::ResponseDeserializationFailed)?;

        Ok(ErrorResponse {
            status_code: res.status_code,
            code: response
                .code
                .unwrap_or_else(|| "verification_failed".to_string()),
            message: response.message.clone(),
            reason: Some(response.message),
        })
    }
}

impl ConnectorIntegration<Verify, PaymentsVerifyData, VerifyResponseData> for Paystack {
    fn get_http_method(&self) -> Method {
        Method::Get
    }

    fn get_headers(
        &self,
        req: &RouterData<Verify, PaymentsVerifyData, VerifyResponseData>,
    ) -> CustomResult<Headers, ConnectorError> {
        self.get_auth_header(&req.connector_auth_type)
    }

    fn get_url(
        &self,
        req: &RouterData<Verify, PaymentsVerifyData, VerifyResponseData>,
    ) -> CustomResult<String, ConnectorError> {
        Ok(format!(
            "{}/transaction/verify/{}",
            self.base_url(&req.connectors),
            req.request.lookup_reference()
        ))
    }

    fn handle_response(
        &self,
        data: &RouterData<Verify, PaymentsVerifyData, VerifyResponseData>,
        res: Response,
    ) -> CustomResult<RouterData<Verify, PaymentsVerifyData, VerifyResponseData>, ConnectorError>
    {
        let response: paystack::PaystackVerifyResponse = res
            .response
            .parse_struct("PaystackVerifyResponse")
            .change_context(ConnectorError::ResponseDeserializationFailed)?;

        let mut router_data = data.clone();
        router_data.response = match VerifyResponseData::try_from(response) {
            Ok(verified) => Ok(verified),
            Err(gateway_error) => Err(ErrorResponse {
                status_code: res.status_code,
                ..gateway_error
            }),
        };
        Ok(router_data)
    }
}
