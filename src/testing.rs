//! In-crate test doubles for the HTTP collaborator.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestOptions};

#[derive(Clone)]
enum Reply {
    Body(Option<Value>),
    Fail,
}

#[derive(Default)]
struct Recorded {
    replies: HashMap<String, Reply>,
    requests: Vec<(String, RequestOptions)>,
}

/// Canned responses by URL; anything unregistered answers 404
#[derive(Clone, Default)]
pub struct FakeHttp {
    inner: Arc<Mutex<Recorded>>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, body: Value) {
        self.set(url, Reply::Body(Some(body)));
    }

    pub fn respond_empty(&self, url: &str) {
        self.set(url, Reply::Body(None));
    }

    pub fn fail(&self, url: &str) {
        self.set(url, Reply::Fail);
    }

    fn set(&self, url: &str, reply: Reply) {
        let mut inner = self.inner.lock().unwrap();
        inner.replies.insert(url.to_string(), reply);
    }

    pub fn requests(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.requests.iter().map(|(url, _)| url.clone()).collect()
    }

    pub fn options_for(&self, url: &str) -> Option<RequestOptions> {
        let inner = self.inner.lock().unwrap();
        inner
            .requests
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, options)| options.clone())
    }
}

#[async_trait::async_trait]
impl HttpClient for FakeHttp {
    async fn get(&self, url: &str, options: &RequestOptions) -> Result<Option<Value>> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push((url.to_string(), options.clone()));

        match inner.replies.get(url) {
            Some(Reply::Body(body)) => Ok(body.clone()),
            Some(Reply::Fail) => Err(Error::HttpStatus {
                status: 500,
                url: url.to_string(),
            }),
            None => Err(Error::HttpStatus {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}
