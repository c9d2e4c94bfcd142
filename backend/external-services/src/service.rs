use std::{str::FromStr, time::Duration};

use domain_types::{
    errors::{ApiClientError, ConnectorError, CustomResult},
    request::{Headers, Maskable, Method, Request, RequestContent},
    router_data::RouterData,
    types::Proxy,
};
use error_stack::{report, ResultExt};
use interfaces::api::{BoxedConnectorIntegration, Response};
use once_cell::sync::OnceCell;
use reqwest::Client;
use serde_json::json;
use tracing::field::Empty;

/// Drive one connector flow end to end: build the request from the
/// integration, call the gateway, and fold the raw response back through
/// `handle_response` / `get_error_response`.
pub async fn execute_connector_processing_step<F, Req, Resp>(
    proxy: &Proxy,
    connector: BoxedConnectorIntegration<'static, F, Req, Resp>,
    router_data: RouterData<F, Req, Resp>,
) -> CustomResult<RouterData<F, Req, Resp>, ConnectorError>
where
    F: Clone,
    Req: Clone + std::fmt::Debug,
    Resp: Clone + std::fmt::Debug,
{
    let span = tracing::info_span!(
        "outgoing_gateway_call",
        url = Empty,
        method = Empty,
        request_headers = Empty,
        status_code = Empty,
        latency = Empty,
    );
    let _enter = span.enter();
    let start = tokio::time::Instant::now();

    let request = connector.build_request(&router_data)?;
    let url = request.url.clone();
    let method = request.method;

    tracing::Span::current().record("url", tracing::field::display(&url));
    tracing::Span::current().record("method", tracing::field::display(method));
    tracing::Span::current().record(
        "request_headers",
        tracing::field::display(masked_header_log(&request.headers)),
    );

    let mut router_data = router_data;
    let response = call_gateway_api(proxy, request)
        .await
        .inspect_err(|err| {
            tracing::info!(tags = "NETWORK_ERROR", error = ?err, "failed getting response from gateway");
        })
        .change_context(ConnectorError::ProcessingStepFailed)?;

    let router_data = match response {
        Ok(body) => {
            tracing::Span::current().record("status_code", body.status_code);
            connector.handle_response(&router_data, body)?
        }
        Err(body) => {
            tracing::Span::current().record("status_code", body.status_code);
            let error = connector.get_error_response(body)?;
            router_data.response = Err(error);
            router_data
        }
    };

    tracing::Span::current().record("latency", start.elapsed().as_millis());
    tracing::info!(log_type = "api", "outgoing gateway call completed");
    Ok(router_data)
}

fn masked_header_log(headers: &Headers) -> serde_json::Value {
    let map = headers
        .iter()
        .fold(serde_json::Map::new(), |mut acc, (name, value)| {
            let logged = match value {
                Maskable::Masked(_) => json!("*** masked ***"),
                Maskable::Normal(value) => json!(value),
            };
            acc.insert(name.clone(), logged);
            acc
        });
    serde_json::Value::Object(map)
}

/// `Ok(Ok)` is a 2xx body, `Ok(Err)` a 4xx/5xx body; transport failures
/// surface as the outer error.
pub async fn call_gateway_api(
    proxy: &Proxy,
    request: Request,
) -> CustomResult<Result<Response, Response>, ApiClientError> {
    let url =
        reqwest::Url::parse(&request.url).change_context(ApiClientError::UrlEncodingFailed)?;

    let should_bypass_proxy = proxy.bypass_proxy_urls.contains(&url.to_string());
    let client = get_base_client(proxy, should_bypass_proxy)?;

    let headers = request.headers.construct_header_map()?;

    let request_builder = match request.method {
        Method::Get => client.get(url),
        Method::Post => {
            let builder = client.post(url);
            match request.body {
                Some(RequestContent::Json(payload)) => builder.json(&payload),
                Some(RequestContent::FormUrlEncoded(fields)) => builder.form(&fields),
                None => builder,
            }
        }
    }
    .headers(headers);

    let response = request_builder.send().await.map_err(|error| {
        let api_error = if error.is_timeout() {
            ApiClientError::RequestTimeoutReceived
        } else {
            ApiClientError::RequestNotSent(error.to_string())
        };
        tracing::info!(tags = "REQUEST_FAILURE", "unable to send request to gateway");
        report!(api_error)
    })?;

    handle_response(response).await
}

static NON_PROXIED_CLIENT: OnceCell<Client> = OnceCell::new();
static PROXIED_CLIENT: OnceCell<Client> = OnceCell::new();

fn get_base_client(
    proxy_config: &Proxy,
    should_bypass_proxy: bool,
) -> CustomResult<Client, ApiClientError> {
    Ok(if should_bypass_proxy
        || (proxy_config.http_url.is_none() && proxy_config.https_url.is_none())
    {
        &NON_PROXIED_CLIENT
    } else {
        &PROXIED_CLIENT
    }
    .get_or_try_init(|| {
        get_client_builder(proxy_config, should_bypass_proxy)?
            .build()
            .change_context(ApiClientError::ClientConstructionFailed)
            .inspect_err(|err| {
                tracing::error!(tags = "ERROR", error = ?err, "failed to construct base client");
            })
    })?
    .clone())
}

fn get_client_builder(
    proxy_config: &Proxy,
    should_bypass_proxy: bool,
) -> CustomResult<reqwest::ClientBuilder, ApiClientError> {
    let mut client_builder = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .pool_idle_timeout(Duration::from_secs(
            proxy_config
                .idle_pool_connection_timeout
                .unwrap_or_default(),
        ));

    if should_bypass_proxy {
        return Ok(client_builder);
    }

    // Proxy all HTTPS traffic through the configured HTTPS proxy
    if let Some(url) = proxy_config.https_url.as_ref() {
        client_builder = client_builder.proxy(
            reqwest::Proxy::https(url).change_context(ApiClientError::InvalidProxyConfiguration)?,
        );
    }

    // Proxy all HTTP traffic through the configured HTTP proxy
    if let Some(url) = proxy_config.http_url.as_ref() {
        client_builder = client_builder.proxy(
            reqwest::Proxy::http(url).change_context(ApiClientError::InvalidProxyConfiguration)?,
        );
    }

    Ok(client_builder)
}

async fn handle_response(
    response: reqwest::Response,
) -> CustomResult<Result<Response, Response>, ApiClientError> {
    let status_code = response.status().as_u16();
    let headers = Some(response.headers().to_owned());

    match status_code {
        200..=202 | 204 | 302 => {
            let body = response
                .bytes()
                .await
                .change_context(ApiClientError::ResponseDecodingFailed)?;
            Ok(Ok(Response {
                headers,
                response: body,
                status_code,
            }))
        }
        400..=599 => {
            let body = response
                .bytes()
                .await
                .change_context(ApiClientError::ResponseDecodingFailed)?;
            Ok(Err(Response {
                headers,
                response: body,
                status_code,
            }))
        }
        _ => {
            tracing::info!(tags = "UNEXPECTED_RESPONSE", "unexpected response from gateway");
            Err(report!(ApiClientError::UnexpectedServerResponse))
        }
    }
}

pub(super) trait HeaderExt {
    fn construct_header_map(self) -> CustomResult<reqwest::header::HeaderMap, ApiClientError>;
}

impl HeaderExt for Headers {
    fn construct_header_map(self) -> CustomResult<reqwest::header::HeaderMap, ApiClientError> {
        use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

        self.into_iter().try_fold(
            HeaderMap::new(),
            |mut header_map, (header_name, header_value)| {
                let header_name = HeaderName::from_str(&header_name)
                    .change_context(ApiClientError::HeaderMapConstructionFailed)?;
                let is_masked = header_value.is_masked();
                let mut header_value = HeaderValue::from_str(&header_value.into_inner())
                    .change_context(ApiClientError::HeaderMapConstructionFailed)?;
                header_value.set_sensitive(is_masked);
                header_map.append(header_name, header_value);
                Ok(header_map)
            },
        )
    }
}
