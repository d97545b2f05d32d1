//! Manifest of declared API contracts (`.stricture-manifest.yml`).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{StrictureError, StrictureResult};

pub const DEFAULT_MANIFEST_FILE: &str = ".stricture-manifest.yml";

/// One declared contract.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contract {
    pub id: String,
    pub endpoint: String,
    pub method: String,
}

impl Contract {
    /// True when this contract declares `method endpoint`. Methods compare
    /// case-insensitively, path parameters (`:id`, `{id}`, `<id>`) compare
    /// equal to each other, and trailing slashes are ignored.
    pub fn matches(&self, method: &str, endpoint: &str) -> bool {
        let method_matches = self.method.trim().is_empty()
            || self.method.trim().eq_ignore_ascii_case(method.trim());
        method_matches && normalize_endpoint(&self.endpoint) == normalize_endpoint(endpoint)
    }
}

/// The top-level manifest document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub manifest_version: String,
    pub contracts: Vec<Contract>,
}

impl Manifest {
    /// Deserialize YAML bytes and validate the result.
    pub fn parse(data: &[u8]) -> StrictureResult<Self> {
        let manifest: Manifest = serde_yaml::from_slice(data)
            .map_err(|e| StrictureError::ManifestInvalid(format!("parse manifest yaml: {e}")))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Read and parse a manifest file. A missing file is `ManifestNotFound`;
    /// any other read failure is `Io`.
    pub fn load(path: impl AsRef<Path>) -> StrictureResult<Self> {
        let path = path.as_ref();
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StrictureError::ManifestNotFound(path.display().to_string()));
            }
            Err(err) => return Err(StrictureError::Io(err)),
        };
        Self::parse(&data)
    }

    pub fn validate(&self) -> StrictureResult<()> {
        if self.manifest_version.trim().is_empty() {
            return Err(StrictureError::ManifestInvalid(
                "validate manifest: manifest_version is blank".to_string(),
            ));
        }
        if self.contracts.is_empty() {
            return Err(StrictureError::ManifestInvalid(
                "validate manifest: no contracts declared".to_string(),
            ));
        }
        if let Some(pos) = self.contracts.iter().position(|c| c.id.trim().is_empty()) {
            return Err(StrictureError::ManifestInvalid(format!(
                "validate manifest: contract #{} has a blank id",
                pos + 1
            )));
        }
        Ok(())
    }

    /// The first contract declaring `method endpoint`.
    pub fn find_contract(&self, method: &str, endpoint: &str) -> Option<&Contract> {
        self.contracts.iter().find(|c| c.matches(method, endpoint))
    }
}

fn normalize_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    let segments: Vec<&str> = trimmed
        .split('/')
        .map(|segment| {
            let is_param = segment.starts_with(':')
                || (segment.starts_with('{') && segment.ends_with('}'))
                || (segment.starts_with('<') && segment.ends_with('>'));
            if is_param {
                "{}"
            } else {
                segment
            }
        })
        .collect();
    let joined = segments.join("/");
    if joined.is_empty() {
        "/".to_string()
    } else {
        joined
    }
}
