//! Cache key derivation.
//!
//! # Key Design
//!
//! - Platform reads: `versions:platform:{hash}`
//! - Environment reads: `versions:environment:{hash}`
//! - Home listing: `versions:environment:home`
//! - Distinct workloads: `versions:environment:distinct_workloads`
//! - Raw reads: `versions:environment:raw:{hash}`
//!
//! `{hash}` is the 128-bit SipHash-1-3 (fixed zero key) of a canonical
//! rendering of the request, as 32 lowercase hex digits. The rendering lists
//! the operation name followed by every field in a fixed order as
//! `;name=len:value`, so it is independent of how the request was built and
//! stays stable across restarts and releases.
//!
//! Paginated reads hash the resolved window rather than the page number, so
//! `page=0` and `page=1` share an entry.

use std::fmt;
use std::hash::Hasher;

use siphasher::sip128::{Hasher128, SipHasher13};

use crate::domain::{Operation, QueryRequest, Raw, RawById, ReadEnvironment, ReadPlatform};

/// Prefix shared by every key this service writes.
pub const CATALOG_PREFIX: &str = "versions:";

const HOME_TAG: &str = "home";
const DISTINCT_WORKLOADS_TAG: &str = "distinct_workloads";
const RAW_SCOPE: &str = "raw:";

// =============================================================================
// Key Families
// =============================================================================

/// Group of keys swept together by one invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    /// Workload listings across a whole platform.
    Platform,
    /// Environment listings, home, distinct workloads and raw reads.
    Environment,
}

impl KeyFamily {
    /// Families affected by a new deployment.
    pub const CATALOG: [Self; 2] = [Self::Platform, Self::Environment];

    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Platform => "versions:platform:",
            Self::Environment => "versions:environment:",
        }
    }
}

// =============================================================================
// Cache Key
// =============================================================================

/// A derived cache key and the family it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    family: KeyFamily,
    key: String,
}

impl CacheKey {
    fn fixed(family: KeyFamily, tag: &str) -> Self {
        Self {
            family,
            key: format!("{}{tag}", family.prefix()),
        }
    }

    fn hashed(family: KeyFamily, scope: &str, canonical: &str) -> Self {
        Self {
            family,
            key: format!("{}{scope}{}", family.prefix(), content_hash(canonical)),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub const fn family(&self) -> KeyFamily {
        self.family
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.key)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.key
    }
}

// =============================================================================
// Canonical Rendering
// =============================================================================

/// Builds the canonical text for a request, field by field.
struct Canonical(String);

impl Canonical {
    fn new(operation: Operation) -> Self {
        Self(operation.as_str().to_string())
    }

    fn field(mut self, name: &str, value: impl fmt::Display) -> Self {
        let value = value.to_string();
        self.0.push_str(&format!(";{name}={}:{value}", value.len()));
        self
    }

    fn finish(self) -> String {
        self.0
    }
}

fn content_hash(canonical: &str) -> String {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write(canonical.as_bytes());
    format!("{:032x}", hasher.finish128().as_u128())
}

// =============================================================================
// Per-Request Keys
// =============================================================================

/// Requests whose results are cached under a derived key.
pub trait KeyedRequest {
    fn cache_key(&self) -> CacheKey;
}

impl KeyedRequest for ReadEnvironment {
    fn cache_key(&self) -> CacheKey {
        let window = self.window();
        let canonical = Canonical::new(Operation::ReadEnvironment)
            .field("workload", &self.workload)
            .field("platform", &self.platform)
            .field("environment", &self.environment)
            .field("offset", window.offset)
            .field("limit", window.limit)
            .finish();
        CacheKey::hashed(KeyFamily::Environment, "", &canonical)
    }
}

impl KeyedRequest for ReadPlatform {
    fn cache_key(&self) -> CacheKey {
        let window = self.window();
        let canonical = Canonical::new(Operation::ReadPlatform)
            .field("workload", &self.workload)
            .field("platform", &self.platform)
            .field("offset", window.offset)
            .field("limit", window.limit)
            .finish();
        CacheKey::hashed(KeyFamily::Platform, "", &canonical)
    }
}

impl KeyedRequest for Raw {
    fn cache_key(&self) -> CacheKey {
        let canonical = Canonical::new(Operation::Raw)
            .field("workload", &self.workload)
            .field("platform", &self.platform)
            .field("environment", &self.environment)
            .field("version", &self.version)
            .finish();
        CacheKey::hashed(KeyFamily::Environment, RAW_SCOPE, &canonical)
    }
}

impl KeyedRequest for RawById {
    fn cache_key(&self) -> CacheKey {
        let canonical = Canonical::new(Operation::RawById)
            .field("versions_id", self.versions_id)
            .finish();
        CacheKey::hashed(KeyFamily::Environment, RAW_SCOPE, &canonical)
    }
}

/// Key of the home listing.
#[must_use]
pub fn home_key() -> CacheKey {
    CacheKey::fixed(KeyFamily::Environment, HOME_TAG)
}

/// Key of the distinct workload listing.
#[must_use]
pub fn distinct_workloads_key() -> CacheKey {
    CacheKey::fixed(KeyFamily::Environment, DISTINCT_WORKLOADS_TAG)
}

impl QueryRequest {
    /// Cache key for read requests, `None` for writes.
    #[must_use]
    pub fn cache_key(&self) -> Option<CacheKey> {
        match self {
            Self::Create(_) => None,
            Self::ReadEnvironment(request) => Some(request.cache_key()),
            Self::ReadPlatform(request) => Some(request.cache_key()),
            Self::ReadHome => Some(home_key()),
            Self::ReadDistinctWorkloads => Some(distinct_workloads_key()),
            Self::Raw(request) => Some(request.cache_key()),
            Self::RawById(request) => Some(request.cache_key()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
