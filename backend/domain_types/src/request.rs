#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub enum RequestContent {
    Json(serde_json::Value),
    FormUrlEncoded(Vec<(String, String)>),
}

/// Header values that must never reach the logs are tagged at construction
/// time; the outgoing-call logger replaces them wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Maskable {
    Masked(String),
    Normal(String),
}

impl Maskable {
    pub fn into_inner(self) -> String {
        match self {
            Self::Masked(value) | Self::Normal(value) => value,
        }
    }

    pub fn is_masked(&self) -> bool {
        matches!(self, Self::Masked(_))
    }
}

impl From<String> for Maskable {
    fn from(value: String) -> Self {
        Self::Normal(value)
    }
}

pub type Headers = Vec<(String, Maskable)>;

/// One fully-built outgoing gateway request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Headers,
    pub body: Option<RequestContent>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }
}
