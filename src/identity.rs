use http::HeaderMap;
use http::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderValue, USER_AGENT};
use rand::RngExt;

use crate::error::Error;

const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.4; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
];

const DEFAULT_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Browser identities rotated across attempts.
#[derive(Clone, Debug)]
pub struct IdentityPool {
    user_agents: Vec<HeaderValue>,
}

impl IdentityPool {
    pub fn standard() -> Self {
        Self {
            user_agents: DEFAULT_USER_AGENTS
                .iter()
                .map(|agent| HeaderValue::from_static(agent))
                .collect(),
        }
    }

    pub fn new<I, S>(user_agents: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let user_agents = user_agents
            .into_iter()
            .map(|agent| {
                HeaderValue::from_str(agent.as_ref()).map_err(|source| Error::InvalidHeaderValue {
                    name: USER_AGENT.as_str().to_owned(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if user_agents.is_empty() {
            return Err(Error::InvalidConfig {
                field: "identity_pool",
                message: "at least one user agent is required",
            });
        }
        Ok(Self { user_agents })
    }

    pub fn len(&self) -> usize {
        self.user_agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.user_agents.is_empty()
    }

    pub fn user_agents(&self) -> &[HeaderValue] {
        &self.user_agents
    }

    pub fn pick(&self) -> &HeaderValue {
        let index = match self.user_agents.len() {
            0 | 1 => 0,
            len => rand::rng().random_range(0..len),
        };
        &self.user_agents[index]
    }

    /// Stamps a rotated user agent and browser accept headers onto `headers`,
    /// keeping any the caller set explicitly.
    pub(crate) fn apply(&self, headers: &mut HeaderMap) {
        if !headers.contains_key(USER_AGENT) {
            headers.insert(USER_AGENT, self.pick().clone());
        }
        if !headers.contains_key(ACCEPT) {
            headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
        }
        if !headers.contains_key(ACCEPT_LANGUAGE) {
            headers.insert(
                ACCEPT_LANGUAGE,
                HeaderValue::from_static(DEFAULT_ACCEPT_LANGUAGE),
            );
        }
    }
}

impl Default for IdentityPool {
    fn default() -> Self {
        Self::standard()
    }
}
