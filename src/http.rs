use std::time::Duration;

use reqwest::{Client, header};
use serde_json::Value;
use tracing::debug;

use crate::compression::inflate_zlib;
use crate::config::HttpConfig;
use crate::error::{Error, Result};

/// Per-request options passed through to the HTTP collaborator
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
    /// Inflate the body as zlib before decoding
    pub zlib_mode: bool,
}

impl RequestOptions {
    pub fn json(user_agent: &str) -> Self {
        Self {
            headers: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("User-Agent".to_string(), user_agent.to_string()),
            ],
            zlib_mode: false,
        }
    }

    pub fn with_zlib(mut self, zlib_mode: bool) -> Self {
        self.zlib_mode = zlib_mode;
        self
    }
}

/// Something that can GET a URL and hand back its decoded body.
///
/// `Ok(None)` means the request succeeded but carried no body.
#[async_trait::async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str, options: &RequestOptions) -> Result<Option<Value>>;
}

/// Decode a response body: JSON when it parses, otherwise the text itself
/// (XML danmu is passed through as a string for the host to parse).
pub fn decode_body(bytes: &[u8], zlib_mode: bool) -> Result<Option<Value>> {
    let bytes = if zlib_mode {
        inflate_zlib(bytes)?
    } else {
        bytes.to_vec()
    };

    let text = String::from_utf8_lossy(&bytes);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match serde_json::from_str(trimmed) {
        Ok(value) => Ok(Some(value)),
        Err(_) => Ok(Some(Value::String(trimmed.to_string()))),
    }
}

#[derive(Clone)]
pub struct ReqwestHttp {
    client: Client,
}

impl ReqwestHttp {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl HttpClient for ReqwestHttp {
    async fn get(&self, url: &str, options: &RequestOptions) -> Result<Option<Value>> {
        let mut headers = header::HeaderMap::new();
        for (name, value) in &options.headers {
            let (Ok(name), Ok(value)) = (
                header::HeaderName::from_bytes(name.as_bytes()),
                header::HeaderValue::from_str(value),
            ) else {
                debug!(header = %name, "Skipping invalid header");
                continue;
            };
            headers.insert(name, value);
        }

        debug!(url = %url, zlib = options.zlib_mode, "GET");
        let response = self.client.get(url).headers(headers).send().await?;

        if !response.status().is_success() {
            return Err(Error::HttpStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        decode_body(&bytes, options.zlib_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_json_body() {
        let value = decode_body(br#"{"barrage_list": []}"#, false).unwrap();
        assert_eq!(value, Some(json!({"barrage_list": []})));
    }

    #[test]
    fn test_decode_blank_body_is_none() {
        assert_eq!(decode_body(b"  \n", false).unwrap(), None);
    }

    #[test]
    fn test_decode_xml_body_passes_through() {
        let xml = r#"<?xml version="1.0"?><i><d p="1.2,1,25,16777215">hi</d></i>"#;
        let value = decode_body(xml.as_bytes(), false).unwrap();
        assert_eq!(value, Some(Value::String(xml.to_string())));
    }

    #[test]
    fn test_json_headers() {
        let options = RequestOptions::json("ForwardWidgets/1.0.0");
        assert!(!options.zlib_mode);
        assert!(
            options
                .headers
                .contains(&("User-Agent".to_string(), "ForwardWidgets/1.0.0".to_string()))
        );
        assert!(RequestOptions::json("x").with_zlib(true).zlib_mode);
    }
}
