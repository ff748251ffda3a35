// src/core/net.rs
use std::{collections::HashMap, time::Duration};

use reqwest::blocking::Client;
use url::Url;

use crate::config::consts::{BASE_URL, REQUEST_TIMEOUT_SECS};
use crate::error::FetchError;

/// A fetched document and the URL it ended up at after redirects.
#[derive(Clone, Debug)]
pub struct FetchedPage {
    pub url: String,
    pub body: String,
}

/// One fetch session. Sessions are not shared; each worker owns one.
pub trait Fetcher: Send {
    fn fetch(&mut self, url: &str) -> Result<FetchedPage, FetchError>;
}

impl<F: Fetcher + ?Sized> Fetcher for Box<F> {
    fn fetch(&mut self, url: &str) -> Result<FetchedPage, FetchError> {
        (**self).fetch(url)
    }
}

impl<F: Fetcher + ?Sized> Fetcher for &mut F {
    fn fetch(&mut self, url: &str) -> Result<FetchedPage, FetchError> {
        (**self).fetch(url)
    }
}

/// Blocking HTTP session.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }

    /// `n` independent sessions for a worker window.
    pub fn sessions(user_agent: &str, n: usize) -> Result<Vec<Self>, FetchError> {
        (0..n.max(1)).map(|_| Self::new(user_agent)).collect()
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&mut self, url: &str) -> Result<FetchedPage, FetchError> {
        tracing::debug!(url, "GET");
        let resp = self.client.get(url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status { status: status.as_u16(), url: s!(url) });
        }
        let final_url = resp.url().to_string();
        let body = resp.text()?;
        Ok(FetchedPage { url: final_url, body })
    }
}

/// Serves pages from memory: captured fixtures or a previous run's cache.
/// Keeps a log of every requested URL.
#[derive(Clone, Debug, Default)]
pub struct ReplayFetcher {
    pages: HashMap<String, String>,
    redirects: HashMap<String, String>,
    pub requested: Vec<String>,
}

impl ReplayFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(s!(url), s!(body));
        self
    }

    /// Requests for `from` land on `to`, the way a server redirect would.
    pub fn with_redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(s!(from), s!(to));
        self
    }

    pub fn was_requested(&self, url: &str) -> bool {
        self.requested.iter().any(|u| u == url)
    }
}

impl Fetcher for ReplayFetcher {
    fn fetch(&mut self, url: &str) -> Result<FetchedPage, FetchError> {
        self.requested.push(s!(url));
        let target = self.redirects.get(url).map(String::as_str).unwrap_or(url);
        match self.pages.get(target) {
            Some(body) => Ok(FetchedPage { url: s!(target), body: body.clone() }),
            None => Err(FetchError::NotFound(s!(url))),
        }
    }
}

/// Absolute form of `href` as seen from a page at `base`.
pub fn resolve_href(base: &str, href: &str) -> String {
    let href = href.trim();
    let joined = Url::parse(base)
        .or_else(|_| Url::parse(BASE_URL))
        .and_then(|b| b.join(href));
    match joined {
        Ok(u) => u.to_string(),
        Err(_) => s!(href),
    }
}
