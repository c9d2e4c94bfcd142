use secrecy::SecretString;

#[derive(Clone, serde::Deserialize, Debug)]
pub struct Connectors {
    pub paystack: ConnectorParams,
}

#[derive(Clone, serde::Deserialize, Debug)]
pub struct ConnectorParams {
    /// base url
    pub base_url: String,
    /// Bearer secret for the verification API. Absent means the gateway is
    /// not configured for this deployment; callers must fail fast.
    #[serde(default)]
    pub secret_key: Option<SecretString>,
}

#[derive(Debug, serde::Deserialize, Clone, Default)]
pub struct Proxy {
    pub http_url: Option<String>,
    pub https_url: Option<String>,
    pub idle_pool_connection_timeout: Option<u64>,
    #[serde(default)]
    pub bypass_proxy_urls: Vec<String>,
}
