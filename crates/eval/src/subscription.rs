//! Subscriptions and the effects callbacks may request while being notified.
//!
//! Callbacks never get access to the engine. They record what they want
//! done on an [`Effects`] buffer, and the engine applies those requests once
//! the callback has returned.

use std::collections::{BTreeMap, BTreeSet};

use tether_core::{Expr, Template, Value};

use crate::context::NodeId;
use crate::mutation::WritePolicy;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Invoked with the re-evaluated value after every write that can affect it.
pub type Callback = Box<dyn FnMut(&Value, &mut Effects)>;

/// What a subscription re-evaluates.
#[derive(Debug, Clone, PartialEq)]
pub enum Watched {
    Expr(Expr),
    Template(Template),
}

impl Watched {
    pub fn context_ids(&self) -> BTreeSet<&str> {
        match self {
            Watched::Expr(expr) => expr.context_ids(),
            Watched::Template(template) => template
                .expressions()
                .flat_map(|e| e.context_ids())
                .collect(),
        }
    }

    pub fn references(&self, context_id: &str) -> bool {
        self.context_ids().contains(context_id)
    }
}

pub(crate) struct Subscription {
    pub(crate) node: NodeId,
    pub(crate) watched: Watched,
    /// `None` only while the callback is running.
    pub(crate) callback: Option<Callback>,
}

// ──────────────────────────────────────────────
// Store
// ──────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct SubscriptionStore {
    next_id: u64,
    entries: BTreeMap<SubscriptionId, Subscription>,
}

impl SubscriptionStore {
    pub(crate) fn insert(
        &mut self,
        node: NodeId,
        watched: Watched,
        callback: Callback,
    ) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.entries.insert(
            id,
            Subscription {
                node,
                watched,
                callback: Some(callback),
            },
        );
        id
    }

    pub(crate) fn get(&self, id: SubscriptionId) -> Option<&Subscription> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: SubscriptionId) -> Option<&mut Subscription> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (SubscriptionId, &Subscription)> {
        self.entries.iter().map(|(id, s)| (*id, s))
    }

    pub(crate) fn ids_for_nodes(&self, nodes: &BTreeSet<NodeId>) -> Vec<SubscriptionId> {
        self.iter()
            .filter(|(_, s)| nodes.contains(&s.node))
            .map(|(id, _)| id)
            .collect()
    }

    pub(crate) fn remove_for_nodes(&mut self, nodes: &BTreeSet<NodeId>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, s| !nodes.contains(&s.node));
        before - self.entries.len()
    }

    pub(crate) fn take_callback(&mut self, id: SubscriptionId) -> Option<Callback> {
        self.entries.get_mut(&id)?.callback.take()
    }

    pub(crate) fn restore_callback(&mut self, id: SubscriptionId, callback: Callback) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.callback = Some(callback);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

// ──────────────────────────────────────────────
// Effects
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PendingWrite {
    pub(crate) origin: NodeId,
    pub(crate) context_id: String,
    pub(crate) path: String,
    pub(crate) value: Value,
    pub(crate) policy: Option<WritePolicy>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Write(PendingWrite),
    Detach(NodeId),
    Unbind(SubscriptionId),
    Rebind(SubscriptionId, String),
}

/// Requests recorded by a callback during notification.
#[derive(Debug)]
pub struct Effects {
    subscription: SubscriptionId,
    node: NodeId,
    commands: Vec<Command>,
}

impl Effects {
    pub(crate) fn new(subscription: SubscriptionId, node: NodeId) -> Self {
        Effects {
            subscription,
            node,
            commands: Vec::new(),
        }
    }

    /// The subscription being notified.
    pub fn subscription(&self) -> SubscriptionId {
        self.subscription
    }

    /// The node that owns the subscription being notified.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Queue a write addressed from the subscriber's node. It runs after
    /// the current notification round.
    pub fn set_at_path(
        &mut self,
        context_id: impl Into<String>,
        path: impl Into<String>,
        value: Value,
    ) {
        self.push_write(self.node, context_id.into(), path.into(), value, None);
    }

    /// Queue a write addressed from `origin` with an explicit policy.
    pub fn set_at_path_with(
        &mut self,
        origin: NodeId,
        context_id: impl Into<String>,
        path: impl Into<String>,
        value: Value,
        policy: WritePolicy,
    ) {
        self.push_write(origin, context_id.into(), path.into(), value, Some(policy));
    }

    fn push_write(
        &mut self,
        origin: NodeId,
        context_id: String,
        path: String,
        value: Value,
        policy: Option<WritePolicy>,
    ) {
        self.commands.push(Command::Write(PendingWrite {
            origin,
            context_id,
            path,
            value,
            policy,
        }));
    }

    /// Detach `node` and its subtree. Their subscriptions stop receiving
    /// notifications immediately.
    pub fn detach(&mut self, node: NodeId) {
        self.commands.push(Command::Detach(node));
    }

    pub fn unbind(&mut self, subscription: SubscriptionId) {
        self.commands.push(Command::Unbind(subscription));
    }

    /// Swap the text `subscription` watches once the current notification
    /// round is over. Later writes re-evaluate the new text.
    pub fn rebind(&mut self, subscription: SubscriptionId, text: impl Into<String>) {
        self.commands.push(Command::Rebind(subscription, text.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub(crate) fn into_commands(self) -> Vec<Command> {
        self.commands
    }
}
