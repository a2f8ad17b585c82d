use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::defaults::DEFAULT_START_INDEX;

/// View attached to a configured asset.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AssetKind {
    /// Publish/subscribe channel.
    #[default]
    Topic,
    /// Channel with an indexed log.
    Indexed,
}

/// One asset to mount at startup.
///
/// On the command line an asset is written `/path`, `/path=topic` or
/// `/path=indexed`. Configuration files may also set `start_index`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AssetSpec {
    /// Slash-separated asset path, e.g. `/market/prices`.
    pub path: String,
    /// View to attach.
    #[serde(default)]
    pub kind: AssetKind,
    /// First index assigned by an indexed log. Ignored for topics.
    #[serde(default = "crate::defaults::default_start_index")]
    pub start_index: u64,
}

impl AssetSpec {
    /// Builds a spec with the default start index.
    #[must_use]
    pub fn new(path: impl Into<String>, kind: AssetKind) -> Self {
        Self {
            path: path.into(),
            kind,
            start_index: DEFAULT_START_INDEX,
        }
    }

    /// Path segments below the root.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|segment| !segment.is_empty())
    }

    /// Checks that the path is absolute and has no empty segments.
    ///
    /// # Errors
    ///
    /// Returns [`AssetSpecError::InvalidPath`] describing the offending path.
    pub fn validate(&self) -> Result<(), AssetSpecError> {
        validate_path(&self.path)
    }
}

impl fmt::Display for AssetSpec {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}={}", self.path, self.kind)
    }
}

impl FromStr for AssetSpec {
    type Err = AssetSpecError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (path, kind) = match input.split_once('=') {
            Some((path, raw_kind)) => {
                let kind = raw_kind
                    .parse::<AssetKind>()
                    .map_err(|_| AssetSpecError::UnknownKind(raw_kind.to_owned()))?;
                (path, kind)
            }
            None => (input, AssetKind::Topic),
        };
        validate_path(path)?;
        Ok(Self::new(path, kind))
    }
}

fn validate_path(path: &str) -> Result<(), AssetSpecError> {
    let Some(relative) = path.strip_prefix('/') else {
        return Err(AssetSpecError::InvalidPath(path.to_owned()));
    };
    if relative.is_empty() || relative.split('/').any(str::is_empty) {
        return Err(AssetSpecError::InvalidPath(path.to_owned()));
    }
    Ok(())
}

/// Errors raised while parsing or validating an [`AssetSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetSpecError {
    /// The path was relative, empty or contained an empty segment.
    #[error("asset path '{0}' must be absolute with non-empty segments")]
    InvalidPath(String),
    /// The kind after `=` was not recognised.
    #[error("unknown asset kind '{0}'; expected 'topic' or 'indexed'")]
    UnknownKind(String),
}
