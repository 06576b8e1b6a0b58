// Provider discovery for DevServe
// Validates an explicit registration table and builds the single provider

//! # Provider Registry
//!
//! DevServe needs exactly one object able to produce a GraphQL engine. Instead
//! of scanning compiled code for a marker, the hosting application registers
//! its candidates up front:
//!
//! ```rust,ignore
//! let mut registry = ProviderRegistry::new();
//! registry.register::<MyDevServeProvider>();
//! ```
//!
//! Every call to [`ProviderRegistry::discover`] is a full pass over the table:
//!
//! 1. Build a [`ProviderDescriptor`] for each in-scope candidate
//! 2. Skip (with a warning) candidates that do not qualify
//! 3. Require exactly one qualifying candidate
//! 4. Construct it
//!
//! Nothing is cached between passes. Construction may have side effects, so
//! `discover` should only run when a fresh engine is actually wanted.
//!
//! ## Rust Learning Notes:
//!
//! ### Type-Erased Constructors
//! Candidates of different concrete types live in one `Vec` by storing a
//! boxed closure (`Arc<dyn Fn(..) -> .. + Send + Sync>`) that knows how to
//! build each one. `register::<P>()` captures `P::default` in such a closure.
//!
//! ### `std::any::type_name`
//! Gives a readable, fully-qualified name for a type, used as the candidate
//! name in logs and error messages.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::traits::{ConstructionError, DevServeProvider};
use crate::models::{ProviderContext, ProviderDescriptor};

/// Name of the capability every candidate must implement
pub const PROVIDER_CAPABILITY: &str = "DevServeProvider";

/// Boxed provider constructor stored in the registration table
pub type ProviderConstructor =
    Arc<dyn Fn(&ProviderContext) -> Result<Box<dyn DevServeProvider>, ConstructionError> + Send + Sync>;

/// Errors from a discovery pass
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error(
        "No registered candidate implements {capability}. \
         Register a type that implements {capability} and Default with ProviderRegistry::register."
    )]
    NotFound { capability: String },

    #[error(
        "Multiple {capability} candidates registered: [{}]. \
         Only one provider should be registered per application.",
        .candidates.join(", ")
    )]
    Ambiguous {
        capability: String,
        candidates: Vec<String>,
    },

    #[error("Failed to construct provider {name}: {source}")]
    Construction {
        name: String,
        #[source]
        source: ConstructionError,
    },
}

/// How a registered candidate can be used
#[derive(Clone)]
enum CandidateKind {
    /// Implements the capability and can be built without arguments
    Provider(ProviderConstructor),
    /// Declared but unusable; kept so discovery can report why it was skipped
    Declared {
        implements_provider: bool,
        has_default_constructor: bool,
    },
}

#[derive(Clone)]
struct Candidate {
    name: String,
    kind: CandidateKind,
}

impl Candidate {
    fn descriptor(&self) -> ProviderDescriptor {
        match &self.kind {
            CandidateKind::Provider(_) => ProviderDescriptor::new(&self.name, true, true),
            CandidateKind::Declared {
                implements_provider,
                has_default_constructor,
            } => ProviderDescriptor::new(&self.name, *implements_provider, *has_default_constructor),
        }
    }
}

/// Explicit table of provider candidates
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    candidates: Vec<Candidate>,
    accept_prefixes: Vec<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider type built through `Default`
    pub fn register<P>(&mut self) -> &mut Self
    where
        P: DevServeProvider + Default + 'static,
    {
        let name = std::any::type_name::<P>();
        self.register_fn(name, |_ctx| Ok(Box::new(P::default()) as Box<dyn DevServeProvider>))
    }

    /// Register a provider under `name` with an explicit constructor
    pub fn register_fn<F>(&mut self, name: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(&ProviderContext) -> Result<Box<dyn DevServeProvider>, ConstructionError> + Send + Sync + 'static,
    {
        let name = name.into();
        debug!("Registered provider candidate {}", name);
        self.candidates.push(Candidate {
            name,
            kind: CandidateKind::Provider(Arc::new(constructor)),
        });
        self
    }

    /// Record a candidate that was declared but cannot be used as a provider
    ///
    /// If the descriptor claims to qualify it is still skipped: a provider
    /// needs a constructor, so use `register` or `register_fn` instead.
    pub fn register_descriptor(&mut self, descriptor: ProviderDescriptor) -> &mut Self {
        self.candidates.push(Candidate {
            name: descriptor.name,
            kind: CandidateKind::Declared {
                implements_provider: descriptor.implements_provider,
                has_default_constructor: descriptor.has_default_constructor,
            },
        });
        self
    }

    /// Limit discovery to candidates whose name starts with one of `prefixes`
    pub fn with_accept_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accept_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    fn in_scope(&self, name: &str) -> bool {
        self.accept_prefixes.is_empty() || self.accept_prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }

    /// Descriptors for every in-scope candidate, in registration order
    pub fn scan(&self) -> Vec<ProviderDescriptor> {
        self.candidates
            .iter()
            .filter(|c| self.in_scope(&c.name))
            .map(Candidate::descriptor)
            .collect()
    }

    /// Find the single qualifying candidate and construct it
    ///
    /// Returns the candidate name alongside the provider instance.
    pub fn discover(&self, ctx: &ProviderContext) -> Result<(String, Box<dyn DevServeProvider>), DiscoveryError> {
        debug!("🔍 Scanning {} registered provider candidate(s)", self.candidates.len());

        let mut qualifying: Vec<(&str, &ProviderConstructor)> = Vec::new();
        for candidate in self.candidates.iter().filter(|c| self.in_scope(&c.name)) {
            match &candidate.kind {
                CandidateKind::Provider(constructor) => qualifying.push((&candidate.name, constructor)),
                CandidateKind::Declared {
                    implements_provider: false,
                    ..
                } => {
                    warn!(
                        "Skipping {}: declared as a provider but does not implement {}",
                        candidate.name, PROVIDER_CAPABILITY
                    );
                }
                CandidateKind::Declared { .. } => {
                    warn!(
                        "Skipping {}: no no-argument constructor. {} implementations must be constructible without arguments.",
                        candidate.name, PROVIDER_CAPABILITY
                    );
                }
            }
        }

        match qualifying.as_slice() {
            [] => Err(DiscoveryError::NotFound {
                capability: PROVIDER_CAPABILITY.to_string(),
            }),
            [(name, constructor)] => {
                info!("📦 Found provider: {}", name);
                let provider = constructor(ctx).map_err(|source| DiscoveryError::Construction {
                    name: name.to_string(),
                    source,
                })?;
                Ok((name.to_string(), provider))
            }
            many => Err(DiscoveryError::Ambiguous {
                capability: PROVIDER_CAPABILITY.to_string(),
                candidates: many.iter().map(|(name, _)| name.to_string()).collect(),
            }),
        }
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("candidates", &self.scan())
            .field("accept_prefixes", &self.accept_prefixes)
            .finish()
    }
}
