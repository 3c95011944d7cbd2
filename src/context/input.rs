use axum::http::Uri;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Route parameters in the order the route declares them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new(params: Vec<(String, String)>) -> Self {
        Self(params)
    }

    /// Value of the first parameter called `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<Vec<(String, String)>> for Params {
    fn from(params: Vec<(String, String)>) -> Self {
        Self(params)
    }
}

/// Data the client sent: route params, query string and body
#[derive(Debug, Clone, Default)]
pub struct Input {
    pub params: Params,
    pub query: HashMap<String, String>,
    pub body: Bytes,
}

impl Input {
    pub fn new(uri: &Uri, params: Params, body: Bytes) -> Self {
        let query = uri
            .query()
            .and_then(|q| serde_urlencoded::from_str::<HashMap<String, String>>(q).ok())
            .unwrap_or_default();

        Self {
            params,
            query,
            body,
        }
    }

    /// Look up `name` in the route params, then in the query string
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .or_else(|| self.query.get(name).map(String::as_str))
    }

    /// Decode the body as `application/x-www-form-urlencoded`
    pub fn form<T: DeserializeOwned>(&self) -> Result<T, serde_urlencoded::de::Error> {
        serde_urlencoded::from_bytes(&self.body)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}
