//! Engine: owns the context tree, the operation registry and the live
//! subscriptions, and runs the notification cascade after every write.
//!
//! A write notifies each subscription whose expression references the
//! written context id and whose scope resolves that id to the written
//! context. Delivery works on a snapshot of those subscriptions. Callbacks
//! request follow-up work through [`Effects`]:
//!
//! - unbinds and detaches cancel delivery to the affected subscriptions at
//!   once;
//! - detached nodes are removed from the tree after the snapshot has been
//!   delivered;
//! - queued writes run afterwards in FIFO order, each with its own
//!   snapshot, until the queue drains or `max_settle_writes` is reached.

use std::collections::{BTreeSet, VecDeque};

use log::{debug, trace, warn};
use tether_core::{parse, parse_path, parse_template, Expr, Template, Value};

use crate::config::EngineConfig;
use crate::context::{Context, ContextTree, NodeId, SenderId, TreeError};
use crate::evaluate::{evaluate, evaluate_template};
use crate::mutation::{path_unreachable, write_path, MutationError, MutationOutcome, WritePolicy};
use crate::operations::OperationRegistry;
use crate::scope::{resolve_scope, resolve_scope_for_sender, Scope};
use crate::subscription::{
    Callback, Command, Effects, PendingWrite, SubscriptionId, SubscriptionStore, Watched,
};

/// Initial value of a binding and the subscription keeping it live.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    /// `None` when the text did not parse: the text is passed through as a
    /// constant and nothing is watched.
    pub subscription: Option<SubscriptionId>,
    pub value: Value,
}

#[derive(Default)]
pub struct Engine {
    tree: ContextTree,
    registry: OperationRegistry,
    subscriptions: SubscriptionStore,
    config: EngineConfig,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Engine {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tree(&self) -> &ContextTree {
        &self.tree
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Register custom operations here.
    pub fn registry_mut(&mut self) -> &mut OperationRegistry {
        &mut self.registry
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    // ──────────────────────────────────────────────
    // Tree
    // ──────────────────────────────────────────────

    pub fn attach(&mut self, parent: Option<NodeId>) -> Result<NodeId, TreeError> {
        let node = self.tree.attach(parent)?;
        debug!("attached node {:?} under {:?}", node, parent);
        Ok(node)
    }

    /// Detach `node` and its subtree, releasing their subscriptions.
    /// Returns the number of nodes removed.
    pub fn detach(&mut self, node: NodeId) -> usize {
        let removed: BTreeSet<NodeId> = self.tree.detach(node).into_iter().collect();
        let released = self.subscriptions.remove_for_nodes(&removed);
        debug!(
            "detached {} node(s) at {:?}, released {} subscription(s)",
            removed.len(),
            node,
            released
        );
        removed.len()
    }

    /// Declare `context` on `node`, replacing a same-id declaration there.
    /// Subscribers that now resolve the id to this context are notified.
    /// Returns the number of callbacks invoked.
    pub fn declare_context(&mut self, node: NodeId, context: Context) -> Result<usize, TreeError> {
        let id = context.id.clone();
        let replaced = self.tree.declare(node, context)?;
        debug!(
            "{} context '{}' on {:?}",
            if replaced.is_some() { "replaced" } else { "declared" },
            id,
            node
        );
        let snapshot = self.affected(node, &id);
        Ok(self.settle(snapshot))
    }

    /// Drop a declared context and re-notify the subscribers that saw it.
    /// `None` when `node` does not declare `id`.
    pub fn remove_context(&mut self, node: NodeId, id: &str) -> Option<usize> {
        let snapshot = self.affected(node, id);
        self.tree.remove_context(node, id)?;
        debug!("removed context '{}' from {:?}", id, node);
        Some(self.settle(snapshot))
    }

    pub fn scope(&self, node: NodeId) -> Scope<'_> {
        resolve_scope(&self.tree, node)
    }

    // ──────────────────────────────────────────────
    // Evaluation
    // ──────────────────────────────────────────────

    fn parse_logged(&self, text: &str) -> Expr {
        let expr = parse(text);
        if let Expr::Invalid { reason, .. } = &expr {
            if self.config.log_parse_failures {
                warn!("invalid binding expression '{}': {}", text, reason);
            }
        }
        expr
    }

    fn parse_template_logged(&self, text: &str) -> Template {
        let template = parse_template(text);
        if self.config.log_parse_failures {
            for (segment, reason) in template.failures() {
                warn!("invalid interpolation '{}' in '{}': {}", segment, text, reason);
            }
        }
        template
    }

    /// One-shot evaluation of `text` in the scope of `node`.
    pub fn evaluate_text(&self, node: NodeId, text: &str) -> Value {
        let expr = self.parse_logged(text);
        evaluate(&expr, &self.scope(node), &self.registry)
    }

    /// One-shot rendering of an interpolated template.
    pub fn evaluate_template_text(&self, node: NodeId, text: &str) -> Value {
        let template = self.parse_template_logged(text);
        evaluate_template(&template, &self.scope(node), &self.registry)
    }

    /// Evaluate in the scope of `node` extended with the implicit contexts
    /// `sender` registered on `node` and its ancestors.
    pub fn evaluate_for_sender(&self, node: NodeId, sender: SenderId, text: &str) -> Value {
        let expr = self.parse_logged(text);
        let scope = resolve_scope_for_sender(&self.tree, node, sender);
        evaluate(&expr, &scope, &self.registry)
    }

    pub fn add_implicit_context(
        &mut self,
        node: NodeId,
        sender: SenderId,
        context: Context,
    ) -> Result<(), TreeError> {
        trace!("implicit context '{}' from {:?} on {:?}", context.id, sender, node);
        self.tree.set_implicit(node, sender, context)
    }

    pub fn clear_implicit_contexts(&mut self, sender: SenderId) -> usize {
        self.tree.clear_implicit(sender)
    }

    fn evaluate_watched(&self, node: NodeId, watched: &Watched) -> Value {
        let scope = self.scope(node);
        match watched {
            Watched::Expr(expr) => evaluate(expr, &scope, &self.registry),
            Watched::Template(template) => evaluate_template(template, &scope, &self.registry),
        }
    }

    // ──────────────────────────────────────────────
    // Bindings
    // ──────────────────────────────────────────────

    /// Bind `text` for `node`: returns its current value and, when the text
    /// parses, a subscription that calls `callback` after relevant writes.
    pub fn bind<F>(&mut self, node: NodeId, text: &str, callback: F) -> Result<Bound, TreeError>
    where
        F: FnMut(&Value, &mut Effects) + 'static,
    {
        let expr = self.parse_logged(text);
        if expr.is_invalid() {
            return Ok(Bound {
                subscription: None,
                value: Value::String(text.to_string()),
            });
        }
        self.subscribe(node, Watched::Expr(expr), Box::new(callback))
    }

    /// Bind an interpolated template such as `"Hi @{user.name}"`.
    pub fn bind_template<F>(
        &mut self,
        node: NodeId,
        text: &str,
        callback: F,
    ) -> Result<Bound, TreeError>
    where
        F: FnMut(&Value, &mut Effects) + 'static,
    {
        let template = self.parse_template_logged(text);
        if !template.expressions().any(|e| !e.is_invalid()) {
            if !self.tree.contains(node) {
                return Err(TreeError::UnknownNode(node));
            }
            let value = evaluate_template(&template, &Scope::default(), &self.registry);
            return Ok(Bound {
                subscription: None,
                value,
            });
        }
        self.subscribe(node, Watched::Template(template), Box::new(callback))
    }

    fn subscribe(
        &mut self,
        node: NodeId,
        watched: Watched,
        callback: Callback,
    ) -> Result<Bound, TreeError> {
        if !self.tree.contains(node) {
            return Err(TreeError::UnknownNode(node));
        }
        let value = self.evaluate_watched(node, &watched);
        let id = self.subscriptions.insert(node, watched, callback);
        trace!("subscription {:?} on {:?}", id, node);
        Ok(Bound {
            subscription: Some(id),
            value,
        })
    }

    /// Swap the watched text of a live subscription, keeping its callback.
    /// Returns the new value, or `None` for an unknown subscription. Text
    /// that fails to parse ends the subscription and is returned verbatim.
    pub fn rebind(&mut self, id: SubscriptionId, text: &str) -> Option<Value> {
        let (node, is_template) = {
            let sub = self.subscriptions.get(id)?;
            (sub.node, matches!(sub.watched, Watched::Template(_)))
        };
        let watched = if is_template {
            Watched::Template(self.parse_template_logged(text))
        } else {
            let expr = self.parse_logged(text);
            if expr.is_invalid() {
                self.subscriptions.remove(id);
                return Some(Value::String(text.to_string()));
            }
            Watched::Expr(expr)
        };
        let value = self.evaluate_watched(node, &watched);
        if let Some(sub) = self.subscriptions.get_mut(id) {
            sub.watched = watched;
        }
        Some(value)
    }

    pub fn unbind(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.remove(id)
    }

    // ──────────────────────────────────────────────
    // Mutation
    // ──────────────────────────────────────────────

    /// Write `value` at `path` inside the context `context_id` visible from
    /// `origin`, then notify affected subscribers. Uses the configured
    /// default policy.
    pub fn set_at_path(
        &mut self,
        origin: NodeId,
        context_id: &str,
        path: &str,
        value: Value,
    ) -> Result<MutationOutcome, MutationError> {
        let policy = self.config.default_policy;
        self.set_at_path_with(origin, context_id, path, value, policy)
    }

    pub fn set_at_path_with(
        &mut self,
        origin: NodeId,
        context_id: &str,
        path: &str,
        value: Value,
        policy: WritePolicy,
    ) -> Result<MutationOutcome, MutationError> {
        let owner = self.apply_write(origin, context_id, path, value, policy)?;
        let snapshot = self.affected(owner, context_id);
        let notified = self.settle(snapshot);
        Ok(MutationOutcome { owner, notified })
    }

    fn apply_write(
        &mut self,
        origin: NodeId,
        context_id: &str,
        path_text: &str,
        value: Value,
        policy: WritePolicy,
    ) -> Result<NodeId, MutationError> {
        let path = parse_path(path_text).map_err(|e| MutationError::InvalidPath {
            path: path_text.to_string(),
            reason: e.to_string(),
        })?;
        let owner = self
            .scope(origin)
            .lookup(context_id)
            .and_then(|entry| entry.owner)
            .ok_or_else(|| MutationError::TargetMissing {
                context_id: context_id.to_string(),
                node: origin,
            })?;
        let context = self
            .tree
            .context_mut(owner, context_id)
            .ok_or_else(|| MutationError::TargetMissing {
                context_id: context_id.to_string(),
                node: origin,
            })?;
        if !write_path(&mut context.value, &path, value, policy) {
            return Err(path_unreachable(context_id, &path));
        }
        debug!("wrote '{}' at '{}' on {:?}", context_id, path_text, owner);
        Ok(owner)
    }

    /// Subscriptions referencing `context_id` whose scope resolves it to the
    /// context declared on `owner`.
    fn affected(&self, owner: NodeId, context_id: &str) -> Vec<SubscriptionId> {
        self.subscriptions
            .iter()
            .filter(|(_, sub)| sub.watched.references(context_id))
            .filter(|(_, sub)| {
                self.scope(sub.node)
                    .lookup(context_id)
                    .map_or(false, |entry| entry.owner == Some(owner))
            })
            .map(|(id, _)| id)
            .collect()
    }

    // ──────────────────────────────────────────────
    // Settle loop
    // ──────────────────────────────────────────────

    fn settle(&mut self, first: Vec<SubscriptionId>) -> usize {
        let mut queue: VecDeque<PendingWrite> = VecDeque::new();
        let mut notified = self.deliver(first, &mut queue);
        let mut processed = 0usize;

        while let Some(write) = queue.pop_front() {
            if processed >= self.config.max_settle_writes {
                warn!(
                    "settle limit of {} writes reached, dropping {} queued write(s)",
                    self.config.max_settle_writes,
                    queue.len() + 1
                );
                break;
            }
            processed += 1;
            let policy = write.policy.unwrap_or(self.config.default_policy);
            let applied = self.apply_write(
                write.origin,
                &write.context_id,
                &write.path,
                write.value,
                policy,
            );
            match applied {
                Ok(owner) => {
                    let snapshot = self.affected(owner, &write.context_id);
                    notified += self.deliver(snapshot, &mut queue);
                }
                Err(e) => warn!("queued write dropped: {}", e),
            }
        }
        notified
    }

    /// Notify every subscription in `snapshot` that is still live, then
    /// apply the rebinds and detaches callbacks requested. Returns the
    /// callbacks run.
    fn deliver(
        &mut self,
        snapshot: Vec<SubscriptionId>,
        queue: &mut VecDeque<PendingWrite>,
    ) -> usize {
        let mut cancelled: BTreeSet<SubscriptionId> = BTreeSet::new();
        let mut rebinds: Vec<(SubscriptionId, String)> = Vec::new();
        let mut detaches: Vec<NodeId> = Vec::new();
        let mut notified = 0;

        for id in snapshot {
            if cancelled.contains(&id) {
                continue;
            }
            let Some((node, value)) = self
                .subscriptions
                .get(id)
                .map(|sub| (sub.node, self.evaluate_watched(sub.node, &sub.watched)))
            else {
                continue;
            };
            let Some(mut callback) = self.subscriptions.take_callback(id) else {
                continue;
            };
            trace!("notifying {:?} on {:?} with {}", id, node, value);
            let mut effects = Effects::new(id, node);
            callback(&value, &mut effects);
            self.subscriptions.restore_callback(id, callback);
            notified += 1;

            for command in effects.into_commands() {
                match command {
                    Command::Write(write) => queue.push_back(write),
                    Command::Unbind(sub) => {
                        cancelled.insert(sub);
                        self.subscriptions.remove(sub);
                    }
                    Command::Rebind(sub, text) => rebinds.push((sub, text)),
                    Command::Detach(root) => {
                        let doomed: BTreeSet<NodeId> =
                            self.tree.subtree(root).into_iter().collect();
                        cancelled.extend(self.subscriptions.ids_for_nodes(&doomed));
                        detaches.push(root);
                    }
                }
            }
        }

        for (sub, text) in rebinds {
            if self.rebind(sub, &text).is_none() {
                debug!("rebind of {:?} skipped, subscription is gone", sub);
            }
        }
        for root in detaches {
            self.detach(root);
        }
        debug!("delivered {} notification(s)", notified);
        notified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Recorded = Rc<RefCell<Vec<Value>>>;

    fn recorder() -> (Recorded, impl FnMut(&Value, &mut Effects) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, move |v: &Value, _: &mut Effects| sink.borrow_mut().push(v.clone()))
    }

    fn engine_with_root(value: serde_json::Value) -> (Engine, NodeId) {
        let mut engine = Engine::new();
        let root = engine.attach(None).unwrap();
        engine
            .declare_context(root, Context::new("a", Value::from(value)))
            .unwrap();
        (engine, root)
    }

    #[test]
    fn bind_returns_initial_value() {
        let (mut engine, root) = engine_with_root(json!({"x": 1}));
        let (_, cb) = recorder();
        let bound = engine.bind(root, "a.x", cb).unwrap();
        assert_eq!(bound.value, Value::int(1));
        assert!(bound.subscription.is_some());
    }

    #[test]
    fn invalid_text_binds_as_constant() {
        let (mut engine, root) = engine_with_root(json!({}));
        let (_, cb) = recorder();
        let bound = engine.bind(root, "sum(a.x", cb).unwrap();
        assert_eq!(bound.subscription, None);
        assert_eq!(bound.value, Value::string("sum(a.x"));
        assert_eq!(engine.subscription_count(), 0);
    }

    #[test]
    fn write_notifies_once_per_subscription() {
        let (mut engine, root) = engine_with_root(json!({"x": 1}));
        let (seen, cb) = recorder();
        engine.bind(root, "sum(a.x, a.x, a.y)", cb).unwrap();
        let outcome = engine.set_at_path(root, "a", "x", Value::int(5)).unwrap();
        assert_eq!(outcome.owner, root);
        assert_eq!(outcome.notified, 1);
        assert_eq!(seen.borrow().as_slice(), &[Value::Null]);
        engine.set_at_path(root, "a", "y", Value::int(1)).unwrap();
        assert_eq!(seen.borrow().last(), Some(&Value::int(11)));
    }

    #[test]
    fn unrelated_context_does_not_notify() {
        let (mut engine, root) = engine_with_root(json!({"x": 1}));
        engine
            .declare_context(root, Context::new("b", Value::int(0)))
            .unwrap();
        let (seen, cb) = recorder();
        engine.bind(root, "a.x", cb).unwrap();
        engine.set_at_path(root, "b", "", Value::int(3)).unwrap();
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn mutation_errors() {
        let (mut engine, root) = engine_with_root(json!({"x": 1}));
        assert!(matches!(
            engine.set_at_path(root, "missing", "x", Value::Null),
            Err(MutationError::TargetMissing { .. })
        ));
        assert!(matches!(
            engine.set_at_path(root, "a", "x..y", Value::Null),
            Err(MutationError::InvalidPath { .. })
        ));
        assert!(matches!(
            engine.set_at_path_with(root, "a", "x.y", Value::Null, WritePolicy::Existing),
            Err(MutationError::PathUnreachable { .. })
        ));
    }

    #[test]
    fn oversized_index_is_unreachable() {
        let (mut engine, root) = engine_with_root(json!({"list": []}));
        let (seen, cb) = recorder();
        engine.bind(root, "a.list", cb).unwrap();
        let path = format!("list[{}]", usize::MAX);
        assert!(matches!(
            engine.set_at_path(root, "a", &path, Value::int(1)),
            Err(MutationError::PathUnreachable { .. })
        ));
        assert!(matches!(
            engine.set_at_path(root, "a", "list[4000000000]", Value::int(1)),
            Err(MutationError::PathUnreachable { .. })
        ));
        assert!(seen.borrow().is_empty());
        assert_eq!(engine.evaluate_text(root, "a.list"), Value::from(json!([])));
    }

    #[test]
    fn rebind_swaps_expression() {
        let (mut engine, root) = engine_with_root(json!({"x": 1, "y": 2}));
        let (seen, cb) = recorder();
        let id = engine.bind(root, "a.x", cb).unwrap().subscription.unwrap();
        assert_eq!(engine.rebind(id, "a.y"), Some(Value::int(2)));
        engine.set_at_path(root, "a", "y", Value::int(3)).unwrap();
        assert_eq!(seen.borrow().as_slice(), &[Value::int(3)]);

        assert_eq!(engine.rebind(id, "a.("), Some(Value::string("a.(")));
        assert_eq!(engine.rebind(id, "a.x"), None);
    }

    #[test]
    fn unbind_stops_notifications() {
        let (mut engine, root) = engine_with_root(json!({"x": 1}));
        let (seen, cb) = recorder();
        let id = engine.bind(root, "a.x", cb).unwrap().subscription.unwrap();
        assert!(engine.unbind(id));
        engine.set_at_path(root, "a", "x", Value::int(2)).unwrap();
        assert!(seen.borrow().is_empty());
        assert!(!engine.unbind(id));
    }

    #[test]
    fn settle_limit_drops_excess_writes() {
        let mut engine = Engine::with_config(EngineConfig {
            max_settle_writes: 3,
            ..EngineConfig::default()
        });
        let root = engine.attach(None).unwrap();
        engine
            .declare_context(root, Context::new("n", Value::int(0)))
            .unwrap();
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        engine
            .bind(root, "n", move |v: &Value, fx: &mut Effects| {
                *counter.borrow_mut() += 1;
                let next = crate::operations::Builtin::Sum.apply(&[v.clone(), Value::int(1)]);
                fx.set_at_path("n", "", next);
            })
            .unwrap();
        let outcome = engine.set_at_path(root, "n", "", Value::int(1)).unwrap();
        assert_eq!(outcome.notified, 4);
        assert_eq!(*count.borrow(), 4);
        assert_eq!(engine.evaluate_text(root, "n"), Value::int(4));
    }

    #[test]
    fn bind_on_unknown_node_fails() {
        let mut engine = Engine::new();
        let node = engine.attach(None).unwrap();
        engine.detach(node);
        let (_, cb) = recorder();
        assert_eq!(
            engine.bind(node, "a", cb),
            Err(TreeError::UnknownNode(node))
        );
    }
}
