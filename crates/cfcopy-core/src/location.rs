use eyre::{bail, Result};
use std::fmt;
use std::str::FromStr;

use crate::store::ObjectPath;

/// Parsed `REGION:container/key` object location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub region: String,
    pub container: String,
    pub key: String,
}

impl ObjectLocation {
    /// Parses a `REGION:container/key` string.
    ///
    /// The key may itself contain `/` (pseudo-directories); only the first `/`
    /// after the container separates it from the key.
    pub fn parse(raw: &str) -> Result<Self> {
        let (region, rest) = match raw.split_once(':') {
            Some(parts) => parts,
            None => bail!("object location must look like REGION:container/key (got {})", raw),
        };
        if region.is_empty() {
            bail!("object location region cannot be empty: {}", raw);
        }

        let (container, key) = match rest.split_once('/') {
            Some(parts) => parts,
            None => bail!("object location missing object key: {}", raw),
        };
        if container.is_empty() {
            bail!("object location container cannot be empty: {}", raw);
        }
        if key.is_empty() {
            bail!("object location key cannot be empty: {}", raw);
        }

        Ok(Self {
            region: region.to_ascii_uppercase(),
            container: container.to_string(),
            key: key.to_string(),
        })
    }

    pub fn as_path(&self) -> ObjectPath<'_> {
        ObjectPath::new(&self.region, &self.container, &self.key)
    }
}

impl From<ObjectPath<'_>> for ObjectLocation {
    fn from(path: ObjectPath<'_>) -> Self {
        Self {
            region: path.region.to_string(),
            container: path.container.to_string(),
            key: path.key.to_string(),
        }
    }
}

impl FromStr for ObjectLocation {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.region, self.container, self.key)
    }
}
