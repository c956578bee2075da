//! Registry configuration.

/// Options controlling how a registry is initialized and dispatched.
///
/// # Example
///
/// ```
/// use tether_registry::BindingConfig;
///
/// let config = BindingConfig::default()
///     .with_normalize_getters(false)
///     .with_strict_arity(false);
/// assert!(config.root_class);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingConfig {
    /// Expose getters under their normalized property names.
    pub normalize_getters: bool,
    /// Register the built-in introspection classes and give every other
    /// class a back-reference to the root class.
    pub root_class: bool,
    /// Reject calls whose argument count differs from the declared arity.
    pub strict_arity: bool,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            normalize_getters: true,
            root_class: true,
            strict_arity: true,
        }
    }
}

impl BindingConfig {
    pub fn with_normalize_getters(mut self, enabled: bool) -> Self {
        self.normalize_getters = enabled;
        self
    }

    pub fn with_root_class(mut self, enabled: bool) -> Self {
        self.root_class = enabled;
        self
    }

    pub fn with_strict_arity(mut self, enabled: bool) -> Self {
        self.strict_arity = enabled;
        self
    }
}
