//! Tether registry crate.
//!
//! Holds the class and function registry, the per-class binding tables
//! produced by [`Registry::initialize_all`], and the [`Router`] that
//! dispatches dynamic calls against them.
//!
//! ```
//! use tether_core::Dynamic;
//! use tether_registry::{ClassBuilder, Registry, Router};
//!
//! struct Counter {
//!     value: i64,
//! }
//!
//! let mut registry = Registry::new();
//! let class = registry
//!     .register_class(
//!         ClassBuilder::<Counter>::new("Counter")
//!             .constructor(|_| Ok(Counter { value: 0 }))
//!             .params(&[])
//!             .property(
//!                 "getValue",
//!                 "setValue",
//!                 |c: &Counter| c.value,
//!                 |c: &mut Counter, v: i64| c.value = v,
//!             )
//!             .build(),
//!     )
//!     .unwrap();
//!
//! let mut router = Router::new(registry.initialize_all());
//! let counter = router.construct(class, vec![]).unwrap();
//! router.set(counter, "value", Dynamic::Int(3)).unwrap();
//! assert_eq!(router.get(counter, "value").unwrap(), Dynamic::Int(3));
//! ```

mod binding;
mod class_entry;
mod config;
mod reflect;
pub mod registry;
mod router;

pub use binding::{Accessor, AccessorId, Bindings, ClassBinding, FREE_MEMBER, NamedType};
pub use class_entry::{ClassBuilder, ClassEntry, FunctionBuilder};
pub use config::BindingConfig;
pub use reflect::{
    DynamicVisitor, ROOT_CLASS, ReflectVisitor, RootObject, TYPE_IDENTITY_CLASS, TypeDetail,
};
pub use registry::{FunctionEntry, Registry, global};
pub use router::{Router, Target};
