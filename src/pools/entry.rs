use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// One line of the pool list: a miner command template for a single pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolEntry(String);

impl PoolEntry {
    /// Returns `None` for blank lines.
    pub fn new(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            None
        } else {
            Some(Self(line.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Web status page of the pool, derived from the first `scheme://host` token.
    /// `stratum+tcp://pool.example.com:3333` becomes `http://pool.example.com/`.
    pub fn status_page_url(&self) -> Option<Url> {
        let host = self
            .0
            .split_whitespace()
            .filter(|token| token.contains("://"))
            .find_map(|token| Url::parse(token).ok()?.host_str().map(str::to_string))?;
        Url::parse(&format!("http://{host}/")).ok()
    }
}

impl fmt::Display for PoolEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Splits a downloaded pool list into entries, keeping source order and
/// dropping blank lines. CRLF line endings are accepted.
pub fn parse_pool_list(body: &str) -> Vec<PoolEntry> {
    body.split('\n').filter_map(PoolEntry::new).collect()
}
