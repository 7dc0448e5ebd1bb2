//! Content hashes with domain separation.
//!
//! Every digest is `sha256(domain || bytes)`, where `domain` is one of the
//! null-terminated prefixes below. Distinct prefixes keep a transcript line
//! from ever colliding with a chain link or a report.

use sha2::{Digest, Sha256};

/// Domain prefix for a single transcript line.
pub const DOMAIN_EVENT_LINE: &[u8] = b"WAYFINDER::EVENT_LINE::V1\0";

/// Domain prefix for linking a transcript line onto the previous digest.
pub const DOMAIN_EVENT_CHAIN: &[u8] = b"WAYFINDER::EVENT_CHAIN::V1\0";

/// Domain prefix for run reports.
pub const DOMAIN_RUN_REPORT: &[u8] = b"WAYFINDER::RUN_REPORT::V1\0";

/// A content-addressed hash with algorithm identifier.
///
/// Format: `"algorithm:hex_digest"` (e.g. `"sha256:abcdef..."`). The inner
/// string always contains a `:` with non-empty text on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash {
    full: String,
    colon: usize,
}

impl ContentHash {
    /// Parse from `"algorithm:hex"`. `None` on a missing colon or an empty
    /// side.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let colon = s.find(':')?;
        if colon == 0 || colon == s.len() - 1 {
            return None;
        }
        Some(Self {
            full: s.to_string(),
            colon,
        })
    }

    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.full[..self.colon]
    }

    #[must_use]
    pub fn hex_digest(&self) -> &str {
        &self.full[self.colon + 1..]
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.full
    }

    fn raw_digest(&self) -> Vec<u8> {
        hex::decode(self.hex_digest()).unwrap_or_default()
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full)
    }
}

/// `sha256(domain || data)` as a [`ContentHash`].
#[must_use]
pub fn canonical_hash(domain: &[u8], data: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(data);
    from_digest(&hasher.finalize())
}

/// Hash chain over `items`:
///
/// - `chain_0 = sha256(DOMAIN_EVENT_LINE || item_0)`
/// - `chain_i = sha256(DOMAIN_EVENT_CHAIN || chain_{i-1} || item_i)`
///
/// Returns every link; the last one identifies the whole sequence. A
/// mismatch between two chains is located at the first differing link.
#[must_use]
pub fn chain_digests<'a>(items: impl IntoIterator<Item = &'a [u8]>) -> Vec<ContentHash> {
    let mut links: Vec<ContentHash> = Vec::new();
    for item in items {
        let link = match links.last() {
            None => canonical_hash(DOMAIN_EVENT_LINE, item),
            Some(prev) => {
                let mut hasher = Sha256::new();
                hasher.update(DOMAIN_EVENT_CHAIN);
                hasher.update(prev.raw_digest());
                hasher.update(item);
                from_digest(&hasher.finalize())
            }
        };
        links.push(link);
    }
    links
}

fn from_digest(bytes: &[u8]) -> ContentHash {
    let full = format!("sha256:{}", hex::encode(bytes));
    ContentHash { colon: 6, full }
}
