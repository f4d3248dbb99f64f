//! usage file: loading, version check and skeleton creation
use crate::usage_data::{UsageData, UsageDataMap};
use crate::value::{attribute_map_from_yaml, scalar_text, AttributeMap};
use std::path::{Path, PathBuf};

pub const MIN_USAGE_FILE_VERSION: &str = "0.1";
pub const MAX_USAGE_FILE_VERSION: &str = "0.1";

#[derive(serde::Deserialize)]
struct UsageFileDocument {
    #[serde(default)]
    version: serde_yaml::Value,
    #[serde(default)]
    resource_usage: serde_yaml::Value,
}

#[derive(serde::Serialize)]
struct Skeleton<'a> {
    version: &'a str,
    resource_usage: AttributeMap,
}

/// Load existing usage data
///
/// An empty path yields no data. With `create_if_missing` a skeleton file is written first when there is no
/// file at `path`.
pub fn load_from_file(path: &Path, create_if_missing: bool) -> Result<UsageDataMap, UsageFileError> {
    if path.as_os_str().is_empty() {
        return Ok(UsageDataMap::new());
    }

    if create_if_missing && !path.exists() {
        tracing::debug!(path = %path.display(), "usage file does not exist, creating it");
        write_skeleton(path)?;
    }

    tracing::info!(path = %path.display(), "loading usage file");
    let contents = std::fs::read_to_string(path).map_err(|source| UsageFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse(&contents)
}

/// Parse the contents of a usage file
pub fn parse(contents: &str) -> Result<UsageDataMap, UsageFileError> {
    let document: UsageFileDocument = serde_yaml::from_str(contents)?;

    let version = scalar_text(&document.version).unwrap_or_default();
    if !check_version(&version) {
        return Err(UsageFileError::UnsupportedVersion {
            found: version,
            min: MIN_USAGE_FILE_VERSION,
            max: MAX_USAGE_FILE_VERSION,
        });
    }

    let resource_usage = match document.resource_usage {
        serde_yaml::Value::Null => serde_yaml::Mapping::new(),
        serde_yaml::Value::Mapping(mapping) => mapping,
        other => {
            return Err(UsageFileError::Malformed(format!(
                "resource_usage must be a mapping, found {other:?}"
            )))
        }
    };

    let mut usage = UsageDataMap::with_capacity(resource_usage.len());
    for (address, attributes) in resource_usage {
        let Some(address) = scalar_text(&address) else {
            return Err(UsageFileError::Malformed(format!(
                "resource address {address:?} is not a scalar"
            )));
        };

        let attributes = match attributes {
            serde_yaml::Value::Null => AttributeMap::new(),
            serde_yaml::Value::Mapping(mapping) => attribute_map_from_yaml(mapping)
                .map_err(|e| UsageFileError::Malformed(format!("{address}: {}", e.0)))?,
            other => {
                return Err(UsageFileError::Malformed(format!(
                    "{address}: attributes must be a mapping, found {other:?}"
                )))
            }
        };

        tracing::trace!(%address, count = attributes.len(), "existing usage");
        usage.insert(address.clone(), UsageData::new(address, attributes));
    }

    Ok(usage)
}

fn write_skeleton(path: &Path) -> Result<(), UsageFileError> {
    let skeleton = serde_yaml::to_string(&Skeleton {
        version: MAX_USAGE_FILE_VERSION,
        resource_usage: AttributeMap::new(),
    })?;

    write_private(path, skeleton.as_bytes()).map_err(|source| UsageFileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a file only readable by its owner
pub(crate) fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.flush()
}

/// `min ≤ version ≤ max`, compared as semantic versions (a leading `v` is optional)
pub fn check_version(version: &str) -> bool {
    let (Some(version), Some(min), Some(max)) = (
        parse_version(version),
        parse_version(MIN_USAGE_FILE_VERSION),
        parse_version(MAX_USAGE_FILE_VERSION),
    ) else {
        return false;
    };

    min <= version && version <= max
}

/// `major[.minor[.patch]]` with missing components as zero
fn parse_version(version: &str) -> Option<(u64, u64, u64)> {
    let version = version.trim();
    let version = version.strip_prefix('v').unwrap_or(version);

    let mut components = [0u64; 3];
    let mut count = 0;
    for part in version.split('.') {
        if count == components.len() || part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        components[count] = part.parse().ok()?;
        count += 1;
    }

    Some((components[0], components[1], components[2]))
}

#[derive(thiserror::Error, Debug)]
pub enum UsageFileError {
    #[error("Unable to access usage file {}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Unable to parse usage file")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid usage file version {found:?}. Supported versions are {min} ≤ x ≤ {max}")]
    UnsupportedVersion {
        found: String,
        min: &'static str,
        max: &'static str,
    },
    #[error("Malformed usage file: {0}")]
    Malformed(String),
}
