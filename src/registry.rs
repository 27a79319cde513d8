//! Explicit factory table mapping descriptor schemes to constructors.
//!
//! The registry is built once at process start and passed to whatever
//! assembles the serving pipeline. Registration is a plain function call,
//! so the set of available components is visible at the construction site
//! rather than depending on load order or import side effects.

use std::collections::HashMap;

use crate::descriptor::{ConfigError, Descriptor};
use crate::receiver::GithubReceiver;
use crate::transform::{CommitsTransformer, RepoTransformer, Transform};

type ReceiverCtor = fn(&Descriptor) -> Result<GithubReceiver, ConfigError>;
type TransformCtor = fn(&Descriptor) -> Result<Box<dyn Transform>, ConfigError>;

/// Maps descriptor schemes to component constructors.
pub struct Registry {
    receivers: HashMap<&'static str, ReceiverCtor>,
    transformers: HashMap<&'static str, TransformCtor>,
}

impl Registry {
    /// An empty registry with no schemes registered.
    pub fn new() -> Self {
        Registry {
            receivers: HashMap::new(),
            transformers: HashMap::new(),
        }
    }

    /// A registry with the built-in schemes: `github`, `githubcommits`,
    /// `githubrepo`.
    pub fn with_defaults() -> Self {
        let mut registry = Registry::new();

        registry.register_receiver("github", GithubReceiver::from_descriptor);
        registry.register_transformer("githubcommits", |d| {
            Ok(Box::new(CommitsTransformer::from_descriptor(d)?))
        });
        registry.register_transformer("githubrepo", |d| {
            Ok(Box::new(RepoTransformer::from_descriptor(d)?))
        });

        registry
    }

    pub fn register_receiver(&mut self, scheme: &'static str, ctor: ReceiverCtor) {
        self.receivers.insert(scheme, ctor);
    }

    pub fn register_transformer(&mut self, scheme: &'static str, ctor: TransformCtor) {
        self.transformers.insert(scheme, ctor);
    }

    /// Constructs a receiver from a descriptor URI.
    pub fn receiver(&self, uri: &str) -> Result<GithubReceiver, ConfigError> {
        let descriptor = Descriptor::parse(uri)?;
        let ctor = self
            .receivers
            .get(descriptor.scheme())
            .ok_or_else(|| ConfigError::UnknownScheme {
                scheme: descriptor.scheme().to_string(),
            })?;
        ctor(&descriptor)
    }

    /// Constructs a transformation from a descriptor URI.
    pub fn transformer(&self, uri: &str) -> Result<Box<dyn Transform>, ConfigError> {
        let descriptor = Descriptor::parse(uri)?;
        let ctor = self
            .transformers
            .get(descriptor.scheme())
            .ok_or_else(|| ConfigError::UnknownScheme {
                scheme: descriptor.scheme().to_string(),
            })?;
        ctor(&descriptor)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::with_defaults()
    }
}
