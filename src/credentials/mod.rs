//! Credential pool: an ordered, deduplicated list of API keys with a
//! round-robin rotation cursor.
//!
//! The pool is loaded once and never changes afterwards. The only mutable
//! state is the cursor, advanced exclusively through [`CredentialPool::rotate`].
//! There is no per-key health tracking: a key that failed earlier is simply
//! revisited after a full cycle.

use crate::{Error, ErrorContext, Result};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};
use zeroize::Zeroizing;

/// An opaque API secret.
#[derive(Clone)]
pub struct Credential {
    secret: Zeroizing<String>,
}

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Zeroizing::new(secret.into()),
        }
    }

    pub fn expose(&self) -> &str {
        &self.secret
    }

    /// Short, stable identifier safe to put in logs.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.secret.as_bytes());
        digest[..4].iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.fingerprint())
    }
}

pub struct CredentialPool {
    credentials: Vec<Credential>,
    cursor: usize,
}

impl CredentialPool {
    /// Build a pool from an injected list. Duplicates (by content) are dropped,
    /// keeping the first occurrence.
    pub fn new(credentials: Vec<Credential>) -> Self {
        let mut seen = HashSet::new();
        let credentials = credentials
            .into_iter()
            .filter(|c| !c.expose().is_empty() && seen.insert(c.expose().to_string()))
            .collect();
        Self {
            credentials,
            cursor: 0,
        }
    }

    /// Parse a line-delimited list of secrets. Blank lines are ignored.
    pub fn parse(contents: &str) -> Result<Self> {
        let pool = Self::new(
            contents
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(Credential::new)
                .collect(),
        );
        if pool.is_empty() {
            return Err(Error::initialization_with_context(
                "credential source contains no keys",
                ErrorContext::new().with_source("credential_pool"),
            ));
        }
        Ok(pool)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::initialization_with_context(
                format!("cannot read credential file: {}", e),
                ErrorContext::new()
                    .with_details(path.display().to_string())
                    .with_source("credential_pool"),
            )
        })?;
        let pool = Self::parse(&contents).map_err(|e| match e {
            Error::Initialization { message, context } => Error::Initialization {
                message,
                context: context.with_details(path.display().to_string()),
            },
            other => other,
        })?;
        info!(count = pool.size(), path = %path.display(), "loaded credentials");
        Ok(pool)
    }

    pub fn current(&self) -> Option<&Credential> {
        if self.credentials.is_empty() {
            return None;
        }
        self.credentials.get(self.cursor % self.credentials.len())
    }

    pub fn current_index(&self) -> usize {
        self.cursor
    }

    /// Advance the cursor one position, wrapping around the pool.
    pub fn rotate(&mut self) {
        if self.credentials.is_empty() {
            return;
        }
        let from = self.cursor;
        self.cursor = (self.cursor + 1) % self.credentials.len();
        warn!(from, to = self.cursor, pool = self.credentials.len(), "rotated credential");
    }

    pub fn size(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

impl fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPool")
            .field("size", &self.credentials.len())
            .field("cursor", &self.cursor)
            .finish()
    }
}
