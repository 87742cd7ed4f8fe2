//! Supported (api key, version) pairs.
//!
//! Each API is served at exactly one version. A request naming any other
//! version, or any other API, receives the unsupported response.
//!
//! | API | Version |
//! |-----|---------|
//! | Produce | 9 |
//! | Fetch | 12 |
//! | Metadata | 9 |
//! | OffsetCommit | 1 |
//! | OffsetFetch | 1 |
//! | ApiVersions | 4 |

use super::request::ApiKey;
use super::response::ApiVersionData;

/// Supported API version range for a specific API.
#[derive(Debug, Clone, Copy)]
pub struct SupportedVersion {
    pub api_key: ApiKey,
    pub min_version: i16,
    pub max_version: i16,
}

impl SupportedVersion {
    pub const fn new(api_key: ApiKey, min_version: i16, max_version: i16) -> Self {
        Self {
            api_key,
            min_version,
            max_version,
        }
    }

    pub const fn supports(&self, version: i16) -> bool {
        version >= self.min_version && version <= self.max_version
    }

    pub const fn to_api_version_data(&self) -> ApiVersionData {
        ApiVersionData {
            api_key: self.api_key,
            min_version: self.min_version,
            max_version: self.max_version,
        }
    }
}

pub const SUPPORTED_VERSIONS: &[SupportedVersion] = &[
    SupportedVersion::new(ApiKey::Produce, 9, 9),
    SupportedVersion::new(ApiKey::Fetch, 12, 12),
    SupportedVersion::new(ApiKey::Metadata, 9, 9),
    SupportedVersion::new(ApiKey::OffsetCommit, 1, 1),
    SupportedVersion::new(ApiKey::OffsetFetch, 1, 1),
    SupportedVersion::new(ApiKey::ApiVersions, 4, 4),
];

/// API version entries advertised in the ApiVersions response.
pub fn default_api_versions() -> Vec<ApiVersionData> {
    SUPPORTED_VERSIONS
        .iter()
        .map(|v| v.to_api_version_data())
        .collect()
}

fn find_version(api_key: ApiKey) -> Option<&'static SupportedVersion> {
    SUPPORTED_VERSIONS.iter().find(|v| v.api_key == api_key)
}

pub fn is_version_supported(api_key: ApiKey, version: i16) -> bool {
    find_version(api_key)
        .map(|v| v.supports(version))
        .unwrap_or(false)
}
