//! API key issuance and caller resolution

use crate::clock::Clock;
use crate::store::{redact, AccessStore};
use crate::tier::{Tier, TierLimits};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use syntaxfix_core::{Error, Result};
use tracing::{debug, info};

const KEY_PREFIX: &str = "sfx";
const KEY_RANDOM_BYTES: usize = 16;

/// Stored metadata for an issued key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyRecord {
    pub api_key: String,
    pub tier: Tier,
    pub company: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_case: Option<String>,
    pub created_at: DateTime<Utc>,
    pub active: bool,
    #[serde(default)]
    pub total_fixes: u64,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
}

/// Caller-supplied metadata for a key request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyRequest {
    pub company: String,
    pub email: String,
    #[serde(default)]
    pub use_case: Option<String>,
}

impl KeyRequest {
    pub fn new(company: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            email: email.into(),
            use_case: None,
        }
    }

    fn validated(&self) -> Result<(String, String)> {
        let company = self.company.trim();
        if company.is_empty() {
            return Err(Error::validation("company", "company name is required"));
        }

        let email = self.email.trim();
        if email.is_empty() {
            return Err(Error::validation("email", "contact email is required"));
        }
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => return Err(Error::validation("email", "valid email address required")),
        }

        Ok((company.to_string(), email.to_string()))
    }
}

/// A freshly issued key, returned exactly once
#[derive(Debug, Clone, Serialize)]
pub struct IssuedKey {
    pub api_key: String,
    pub tier: Tier,
    pub limits: TierLimits,
}

/// Who is calling and which quotas apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallerIdentity {
    /// Rate-limit bucket: the key when it is valid, otherwise the address
    pub identifier: String,
    pub tier: Tier,
    /// Set only for a valid, active key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Issues keys and maps callers to tiers
#[derive(Debug, Clone)]
pub struct KeyRegistry {
    store: Arc<dyn AccessStore>,
    clock: Arc<dyn Clock>,
}

impl KeyRegistry {
    pub fn new(store: Arc<dyn AccessStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Issue a free-tier key for a validated request
    pub fn request_quota_upgrade(&self, request: &KeyRequest) -> Result<IssuedKey> {
        self.issue(request, Tier::Free)
    }

    /// Issue a key for an explicit tier
    pub fn issue(&self, request: &KeyRequest, tier: Tier) -> Result<IssuedKey> {
        if tier == Tier::Demo {
            return Err(Error::validation("tier", "demo access does not use keys"));
        }
        let (company, email) = request.validated()?;

        let api_key = generate_key(tier);
        let record = KeyRecord {
            api_key: api_key.clone(),
            tier,
            company: company.clone(),
            email,
            use_case: request
                .use_case
                .as_ref()
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty()),
            created_at: self.clock.now(),
            active: true,
            total_fixes: 0,
            last_used: None,
        };
        self.store.insert_key(record)?;

        info!(company = %company, tier = %tier, "issued api key");
        Ok(IssuedKey {
            api_key,
            tier,
            limits: *tier.limits(),
        })
    }

    /// Mark a key inactive; later calls with it resolve to `demo`
    pub fn deactivate(&self, api_key: &str) -> Result<bool> {
        match self.store.key(api_key)? {
            Some(mut record) => {
                record.active = false;
                self.store.insert_key(record)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Map an optional key and caller address to an identity
    ///
    /// Missing, unknown and inactive keys all resolve to `demo`, bucketed by
    /// address.
    pub fn resolve(&self, api_key: Option<&str>, address: &str) -> Result<CallerIdentity> {
        let api_key = api_key.map(str::trim).filter(|k| !k.is_empty());

        if let Some(key) = api_key {
            match self.store.key(key)? {
                Some(record) if record.active => {
                    return Ok(CallerIdentity {
                        identifier: record.api_key.clone(),
                        tier: record.tier,
                        api_key: Some(record.api_key),
                    });
                }
                Some(_) => debug!(key = %redact(key), "inactive api key, using demo tier"),
                None => debug!(key = %redact(key), "unknown api key, using demo tier"),
            }
        }

        Ok(CallerIdentity {
            identifier: address.to_string(),
            tier: Tier::Demo,
            api_key: None,
        })
    }

    pub fn key(&self, api_key: &str) -> Result<Option<KeyRecord>> {
        self.store.key(api_key)
    }
}

fn generate_key(tier: Tier) -> String {
    let mut bytes = [0u8; KEY_RANDOM_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{KEY_PREFIX}_{tier}_{}", hex::encode(bytes))
}
