//! Tether evaluator.
//!
//! Evaluates parsed binding expressions against a tree of named contexts
//! and keeps bindings live: writes into a context re-evaluate and notify
//! every subscription that can see it.
//!
//! - [`numeric`] implements the coercion rules shared by all operations.
//! - [`operations`] holds the built-in operations and custom registration.
//! - [`context`] and [`scope`] model the context tree and shadowing.
//! - [`evaluate`] is the pure tree-walking evaluator.
//! - [`mutation`] writes values at paths.
//! - [`engine`] ties it together with subscriptions and the settle loop.

pub mod config;
pub mod context;
pub mod engine;
pub mod evaluate;
pub mod mutation;
pub mod numeric;
pub mod operations;
pub mod scope;
pub mod subscription;

pub use config::{ConfigError, EngineConfig};
pub use context::{Context, ContextTree, Hierarchy, NodeId, SenderId, TreeError};
pub use engine::{Bound, Engine};
pub use evaluate::{evaluate, evaluate_template, lookup_path};
pub use mutation::{write_path, MutationError, MutationOutcome, WritePolicy};
pub use operations::{Builtin, OperationFn, OperationRegistry, RegistryError};
pub use scope::{resolve_scope, resolve_scope_for_sender, Scope, ScopedContext};
pub use subscription::{Callback, Effects, SubscriptionId, Watched};
