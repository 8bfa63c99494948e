//! Connection descriptors
//!
//! A descriptor is `<scheme>:<rest>`:
//!
//! | descriptor | backend |
//! |------------|---------|
//! | `mem:` | fresh private in-memory store |
//! | `mem:<name>` | in-process store shared by every handle opened with `<name>` |
//! | `etcd:<host:port>[,<host:port>...]` | cluster-coordinated store |

use std::fmt;
use std::str::FromStr;

use hmkv_core::{KviError, KviResult};

/// Scheme of the in-process backend
pub const MEM_SCHEME: &str = "mem";

/// Scheme of the cluster backend
pub const ETCD_SCHEME: &str = "etcd";

/// Backend selected by a descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// In-process store, private when `name` is `None`
    Memory {
        /// Registry name shared by handles, if any
        name: Option<String>,
    },
    /// Cluster store reached through its client endpoints
    Etcd {
        /// `host:port` pairs in the order given
        endpoints: Vec<String>,
    },
}

/// A parsed connection descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    backend: Backend,
}

impl Descriptor {
    /// Parse a descriptor string
    ///
    /// # Errors
    ///
    /// Returns `Connection` when the scheme separator is missing, the scheme
    /// is unknown, or an endpoint list is empty or malformed.
    pub fn parse(s: &str) -> KviResult<Self> {
        let (scheme, rest) = s.split_once(':').ok_or_else(|| {
            KviError::connection(format!("descriptor '{}' has no scheme", s))
        })?;

        let backend = match scheme {
            MEM_SCHEME => Backend::Memory {
                name: (!rest.is_empty()).then(|| rest.to_string()),
            },
            ETCD_SCHEME => Backend::Etcd {
                endpoints: parse_endpoints(rest)?,
            },
            other => {
                return Err(KviError::connection(format!(
                    "unknown backend scheme '{}'",
                    other
                )))
            }
        };
        Ok(Self { backend })
    }

    /// Selected backend
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Scheme name of the selected backend
    pub fn scheme(&self) -> &'static str {
        match self.backend {
            Backend::Memory { .. } => MEM_SCHEME,
            Backend::Etcd { .. } => ETCD_SCHEME,
        }
    }
}

impl FromStr for Descriptor {
    type Err = KviError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.backend {
            Backend::Memory { name } => {
                write!(f, "{}:{}", MEM_SCHEME, name.as_deref().unwrap_or(""))
            }
            Backend::Etcd { endpoints } => write!(f, "{}:{}", ETCD_SCHEME, endpoints.join(",")),
        }
    }
}

fn parse_endpoints(rest: &str) -> KviResult<Vec<String>> {
    let endpoints: Vec<String> = rest
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if endpoints.is_empty() {
        return Err(KviError::connection("etcd descriptor lists no endpoints"));
    }
    for endpoint in &endpoints {
        let valid = endpoint
            .rsplit_once(':')
            .map(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
            .unwrap_or(false);
        if !valid {
            return Err(KviError::connection(format!(
                "endpoint '{}' is not host:port",
                endpoint
            )));
        }
    }
    Ok(endpoints)
}
