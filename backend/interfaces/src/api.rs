use domain_types::{
    errors::{ConnectorError, CustomResult},
    request::{Headers, Method, Request, RequestContent},
    router_data::{ConnectorAuthType, ErrorResponse, RouterData},
    types::Connectors,
};

/// Raw response captured from a gateway call before any decoding.
#[derive(Debug, Clone)]
pub struct Response {
    pub headers: Option<http::HeaderMap>,
    pub response: bytes::Bytes,
    pub status_code: u16,
}

/// Gateway-wide behavior shared by every flow of one connector.
pub trait ConnectorCommon {
    fn id(&self) -> &'static str;

    fn base_url<'a>(&self, connectors: &'a Connectors) -> &'a str;

    /// Bearer/header credentials for the gateway, derived from the
    /// configured auth type. Fails when the deployment has no credentials.
    fn get_auth_header(
        &self,
        auth_type: &ConnectorAuthType,
    ) -> CustomResult<Headers, ConnectorError>;

    fn build_error_response(&self, res: Response) -> CustomResult<ErrorResponse, ConnectorError>;
}

/// One gateway operation, selected by the `Flow` marker type. Mirrors the
/// request/response split of the wire call: URL and headers are assembled
/// first, the raw response is folded back into the carrier afterwards.
pub trait ConnectorIntegration<Flow, Req, Resp>: ConnectorCommon {
    fn get_http_method(&self) -> Method {
        Method::Post
    }

    fn get_headers(
        &self,
        req: &RouterData<Flow, Req, Resp>,
    ) -> CustomResult<Headers, ConnectorError>;

    fn get_url(&self, req: &RouterData<Flow, Req, Resp>) -> CustomResult<String, ConnectorError>;

    fn get_request_body(
        &self,
        _req: &RouterData<Flow, Req, Resp>,
    ) -> CustomResult<Option<RequestContent>, ConnectorError> {
        Ok(None)
    }

    fn build_request(
        &self,
        req: &RouterData<Flow, Req, Resp>,
    ) -> CustomResult<Request, ConnectorError> {
        let mut request = Request::new(self.get_http_method(), self.get_url(req)?)
            .with_headers(self.get_headers(req)?);
        request.body = self.get_request_body(req)?;
        Ok(request)
    }

    fn handle_response(
        &self,
        data: &RouterData<Flow, Req, Resp>,
        res: Response,
    ) -> CustomResult<RouterData<Flow, Req, Resp>, ConnectorError>;

    fn get_error_response(&self, res: Response) -> CustomResult<ErrorResponse, ConnectorError> {
        self.build_error_response(res)
    }
}

pub type BoxedConnectorIntegration<'a, Flow, Req, Resp> =
    Box<&'a (dyn ConnectorIntegration<Flow, Req, Resp> + Send + Sync)>;
