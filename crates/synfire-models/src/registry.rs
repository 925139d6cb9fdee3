//! The model registry: names, placement traits, and constructors.

use std::error::Error;
use std::fmt;

use indexmap::IndexMap;
use synfire_core::{ModelId, Node};

/// Constructor producing a fresh instance of one model.
pub type NodeCtor = Box<dyn Fn() -> Box<dyn Node> + Send + Sync>;

/// Placement-relevant traits of a model.
///
/// These four flags select the sharding strategy: global receivers go
/// round-robin over recording ranks, proxied models shard over
/// simulating ranks, proxy-less models replicate one instance per
/// thread, and `one_per_rank` devices get a single instance on thread 0
/// of every rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelTraits {
    /// The model participates in ordinary distributed simulation via
    /// lightweight proxies on non-owning ranks.
    pub has_proxies: bool,
    /// The model can receive remote "global" signals and belongs on
    /// recording ranks when any are configured.
    pub global_receiver: bool,
    /// The model emits events with non-uniform (off-grid) timing.
    pub off_grid: bool,
    /// Exactly one instance per rank, independent of thread count.
    pub one_per_rank: bool,
}

impl Default for ModelTraits {
    fn default() -> Self {
        Self {
            has_proxies: true,
            global_receiver: false,
            off_grid: false,
            one_per_rank: false,
        }
    }
}

struct ModelEntry {
    name: String,
    traits: ModelTraits,
    ctor: NodeCtor,
}

/// Registry of node models known to the kernel.
///
/// Models are registered once at kernel construction and assigned
/// sequential [`ModelId`]s. The registry is the only component allowed
/// to construct nodes; placement asks it for instances and hands them
/// to the store.
#[derive(Default)]
pub struct ModelRegistry {
    models: Vec<ModelEntry>,
    by_name: IndexMap<String, ModelId>,
}

impl ModelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model under a unique name.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateName`] if the name is already taken.
    pub fn register(
        &mut self,
        name: &str,
        traits: ModelTraits,
        ctor: NodeCtor,
    ) -> Result<ModelId, RegistryError> {
        if self.by_name.contains_key(name) {
            return Err(RegistryError::DuplicateName {
                name: name.to_owned(),
            });
        }
        let id = ModelId(self.models.len() as u32);
        self.models.push(ModelEntry {
            name: name.to_owned(),
            traits,
            ctor,
        });
        self.by_name.insert(name.to_owned(), id);
        Ok(id)
    }

    /// The traits of a registered model.
    pub fn traits(&self, model: ModelId) -> Option<ModelTraits> {
        self.models.get(model.0 as usize).map(|e| e.traits)
    }

    /// The name of a registered model.
    pub fn name(&self, model: ModelId) -> Option<&str> {
        self.models.get(model.0 as usize).map(|e| e.name.as_str())
    }

    /// Resolve a model name to its ID.
    pub fn id_of(&self, name: &str) -> Option<ModelId> {
        self.by_name.get(name).copied()
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether no models are registered.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Construct a fresh instance of a model.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownModel`] for an unregistered ID.
    pub fn instantiate(&self, model: ModelId) -> Result<Box<dyn Node>, RegistryError> {
        let entry = self
            .models
            .get(model.0 as usize)
            .ok_or(RegistryError::UnknownModel { model })?;
        Ok((entry.ctor)())
    }
}

/// Errors from model registration and instantiation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// A model with this name is already registered.
    DuplicateName {
        /// The contested name.
        name: String,
    },
    /// The model ID is not registered.
    UnknownModel {
        /// The unrecognised ID.
        model: ModelId,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateName { name } => write!(f, "model '{name}' already registered"),
            Self::UnknownModel { model } => write!(f, "unknown model id {model}"),
        }
    }
}

impl Error for RegistryError {}

#[cfg(test)]
mod tests {
    use super::*;
    use synfire_core::{NodeError, PropertyMap};

    struct Blank;

    impl Node for Blank {
        fn init_state(&mut self) {}
        fn init_buffers(&mut self) -> Result<(), NodeError> {
            Ok(())
        }
        fn calibrate(&mut self) -> Result<(), NodeError> {
            Ok(())
        }
        fn apply_status(&mut self, _props: &PropertyMap) -> Result<(), NodeError> {
            Ok(())
        }
    }

    fn blank_ctor() -> NodeCtor {
        Box::new(|| Box::new(Blank))
    }

    #[test]
    fn registers_sequential_ids() {
        let mut reg = ModelRegistry::new();
        let a = reg.register("a", ModelTraits::default(), blank_ctor()).unwrap();
        let b = reg.register("b", ModelTraits::default(), blank_ctor()).unwrap();
        assert_eq!(a, ModelId(0));
        assert_eq!(b, ModelId(1));
        assert_eq!(reg.id_of("b"), Some(b));
        assert_eq!(reg.name(a), Some("a"));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut reg = ModelRegistry::new();
        reg.register("a", ModelTraits::default(), blank_ctor()).unwrap();
        assert_eq!(
            reg.register("a", ModelTraits::default(), blank_ctor()),
            Err(RegistryError::DuplicateName { name: "a".into() })
        );
    }

    #[test]
    fn instantiate_unknown_model_fails() {
        let reg = ModelRegistry::new();
        assert!(matches!(
            reg.instantiate(ModelId(0)),
            Err(RegistryError::UnknownModel { .. })
        ));
    }

    #[test]
    fn instantiate_constructs_fresh_nodes() {
        let mut reg = ModelRegistry::new();
        let id = reg.register("a", ModelTraits::default(), blank_ctor()).unwrap();
        let node = reg.instantiate(id).unwrap();
        assert!(!node.is_frozen());
    }
}
