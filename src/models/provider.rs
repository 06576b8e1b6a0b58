// Provider discovery records

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A registered candidate as seen by one discovery pass
///
/// Descriptors are rebuilt on every pass and never cached, so a reload
/// always reflects the current registration table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Fully-qualified name of the candidate
    pub name: String,
    /// Candidate implements the `DevServeProvider` capability
    pub implements_provider: bool,
    /// Candidate can be built without arguments
    pub has_default_constructor: bool,
}

impl ProviderDescriptor {
    pub fn new(name: impl Into<String>, implements_provider: bool, has_default_constructor: bool) -> Self {
        Self {
            name: name.into(),
            implements_provider,
            has_default_constructor,
        }
    }

    pub fn qualifies(&self) -> bool {
        self.implements_provider && self.has_default_constructor
    }
}

/// Information handed to a provider constructor on each discovery pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderContext {
    /// Module set the provider may rescan for freshly built artifacts
    pub classpath: Vec<PathBuf>,
    /// Generation the engine built from this pass will receive
    pub generation: u64,
}

impl ProviderContext {
    pub fn new(classpath: Vec<PathBuf>, generation: u64) -> Self {
        Self {
            classpath,
            generation,
        }
    }
}
