//! Access gate for the catalog API.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Decides whether a request carrying `token` may read the catalog.
pub trait AccessPolicy: Send + Sync {
    fn allows(&self, token: Option<&str>) -> bool;
}

/// Every request is allowed.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAccess;

impl AccessPolicy for OpenAccess {
    fn allows(&self, _token: Option<&str>) -> bool {
        true
    }
}

/// Bearer tokens from configuration. Only digests are kept in memory.
#[derive(Debug, Clone)]
pub struct StaticTokens {
    digests: Vec<Vec<u8>>,
}

impl StaticTokens {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            digests: tokens
                .into_iter()
                .map(|token| hash_token(token.as_ref()))
                .collect(),
        }
    }
}

impl AccessPolicy for StaticTokens {
    fn allows(&self, token: Option<&str>) -> bool {
        let Some(token) = token else {
            return false;
        };
        let presented = hash_token(token);
        // Compare against every digest so timing does not reveal which matched.
        self.digests
            .iter()
            .fold(0u8, |hit, digest| {
                hit | digest.as_slice().ct_eq(&presented).unwrap_u8()
            })
            == 1
    }
}

fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}
