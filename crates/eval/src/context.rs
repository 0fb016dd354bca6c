//! Context tree: an arena of consumer nodes, each declaring named contexts.
//!
//! Consumers (the surrounding UI tree) hold [`NodeId`] handles into the
//! arena instead of references. Handles are generational so a handle to a
//! detached node never aliases a node attached later in the same slot.

use tether_core::Value;

/// A named value tree visible to its owning node and that node's
/// descendants, unless shadowed by a nearer context with the same id.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    pub id: String,
    pub value: Value,
}

impl Context {
    pub fn new(id: impl Into<String>, value: impl Into<Value>) -> Self {
        Context {
            id: id.into(),
            value: value.into(),
        }
    }
}

/// Generational handle to a consumer node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// Identity of whatever dispatched an event carrying implicit contexts.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct SenderId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("unknown or detached node {0:?}")]
    UnknownNode(NodeId),
}

/// Read-only queries the scope resolver issues against the consumer tree.
pub trait Hierarchy {
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Contexts declared on `node` itself, in declaration order.
    fn declared_contexts(&self, node: NodeId) -> &[Context];

    /// The implicit context `sender` registered on `node`, if any.
    fn implicit_context(&self, node: NodeId, sender: SenderId) -> Option<&Context>;
}

// ──────────────────────────────────────────────
// Arena
// ──────────────────────────────────────────────

#[derive(Debug, Default)]
struct NodeData {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    contexts: Vec<Context>,
    implicit: Vec<(SenderId, Context)>,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    data: Option<NodeData>,
}

#[derive(Debug, Default)]
pub struct ContextTree {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
}

impl ContextTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&self, id: NodeId) -> Option<&NodeData> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.data.as_ref()
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.data.as_mut()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.data.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attach a new node under `parent` (or as a root).
    pub fn attach(&mut self, parent: Option<NodeId>) -> Result<NodeId, TreeError> {
        if let Some(p) = parent {
            if !self.contains(p) {
                return Err(TreeError::UnknownNode(p));
            }
        }
        let data = NodeData {
            parent,
            ..NodeData::default()
        };
        let id = match self.free_list.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.data = Some(data);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    data: Some(data),
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        };
        if let Some(p) = parent.and_then(|p| self.node_mut(p)) {
            p.children.push(id);
        }
        Ok(id)
    }

    /// `node` followed by all of its descendants (pre-order). Empty when
    /// the node is unknown.
    pub fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(data) = self.node(id) {
                out.push(id);
                stack.extend(data.children.iter().rev().copied());
            }
        }
        out
    }

    /// Detach `node` and its whole subtree, dropping their contexts.
    /// Returns the removed handles.
    pub fn detach(&mut self, node: NodeId) -> Vec<NodeId> {
        let removed = self.subtree(node);
        if removed.is_empty() {
            return removed;
        }
        if let Some(parent) = self.parent(node) {
            if let Some(p) = self.node_mut(parent) {
                p.children.retain(|c| *c != node);
            }
        }
        for id in &removed {
            let slot = &mut self.slots[id.index as usize];
            slot.data = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free_list.push(id.index);
        }
        removed
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Declare `context` on `node`, replacing a same-id context already
    /// declared there. Returns the replaced value.
    pub fn declare(&mut self, node: NodeId, context: Context) -> Result<Option<Value>, TreeError> {
        let data = self.node_mut(node).ok_or(TreeError::UnknownNode(node))?;
        match data.contexts.iter_mut().find(|c| c.id == context.id) {
            Some(existing) => Ok(Some(std::mem::replace(&mut existing.value, context.value))),
            None => {
                data.contexts.push(context);
                Ok(None)
            }
        }
    }

    pub fn remove_context(&mut self, node: NodeId, id: &str) -> Option<Context> {
        let data = self.node_mut(node)?;
        let pos = data.contexts.iter().position(|c| c.id == id)?;
        Some(data.contexts.remove(pos))
    }

    pub fn context_mut(&mut self, node: NodeId, id: &str) -> Option<&mut Context> {
        self.node_mut(node)?.contexts.iter_mut().find(|c| c.id == id)
    }

    /// Register the implicit context `sender` exposes at `node`, replacing
    /// whatever that sender registered there before.
    pub fn set_implicit(
        &mut self,
        node: NodeId,
        sender: SenderId,
        context: Context,
    ) -> Result<(), TreeError> {
        let data = self.node_mut(node).ok_or(TreeError::UnknownNode(node))?;
        match data.implicit.iter_mut().find(|(s, _)| *s == sender) {
            Some(entry) => entry.1 = context,
            None => data.implicit.push((sender, context)),
        }
        Ok(())
    }

    /// Drop every implicit context registered by `sender`.
    pub fn clear_implicit(&mut self, sender: SenderId) -> usize {
        let mut cleared = 0;
        for slot in &mut self.slots {
            if let Some(data) = slot.data.as_mut() {
                let before = data.implicit.len();
                data.implicit.retain(|(s, _)| *s != sender);
                cleared += before - data.implicit.len();
            }
        }
        cleared
    }
}

impl Hierarchy for ContextTree {
    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    fn declared_contexts(&self, node: NodeId) -> &[Context] {
        self.node(node).map(|n| n.contexts.as_slice()).unwrap_or(&[])
    }

    fn implicit_context(&self, node: NodeId, sender: SenderId) -> Option<&Context> {
        self.node(node)?
            .implicit
            .iter()
            .find(|(s, _)| *s == sender)
            .map(|(_, c)| c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_and_query() {
        let mut tree = ContextTree::new();
        let root = tree.attach(None).unwrap();
        let child = tree.attach(Some(root)).unwrap();
        assert_eq!(tree.parent(child), Some(root));
        assert_eq!(tree.parent(root), None);
        assert_eq!(tree.children(root), &[child]);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn detach_removes_subtree_and_invalidates_handles() {
        let mut tree = ContextTree::new();
        let root = tree.attach(None).unwrap();
        let a = tree.attach(Some(root)).unwrap();
        let b = tree.attach(Some(a)).unwrap();
        let removed = tree.detach(a);
        assert_eq!(removed, vec![a, b]);
        assert!(!tree.contains(b));
        assert!(tree.children(root).is_empty());

        // The freed slot is reused with a new generation.
        let c = tree.attach(Some(root)).unwrap();
        assert_ne!(c, a);
        assert_ne!(c, b);
        assert!(!tree.contains(a));
        assert_eq!(tree.attach(Some(a)), Err(TreeError::UnknownNode(a)));
    }

    #[test]
    fn declare_replaces_same_id() {
        let mut tree = ContextTree::new();
        let root = tree.attach(None).unwrap();
        assert_eq!(tree.declare(root, Context::new("a", Value::int(1))), Ok(None));
        assert_eq!(
            tree.declare(root, Context::new("a", Value::int(2))),
            Ok(Some(Value::int(1)))
        );
        assert_eq!(tree.declared_contexts(root).len(), 1);
        assert_eq!(tree.declared_contexts(root)[0].value, Value::int(2));
    }

    #[test]
    fn implicit_contexts_replace_per_sender() {
        let mut tree = ContextTree::new();
        let root = tree.attach(None).unwrap();
        let sender = SenderId(7);
        tree.set_implicit(root, sender, Context::new("item", Value::int(1)))
            .unwrap();
        tree.set_implicit(root, sender, Context::new("item", Value::int(2)))
            .unwrap();
        assert_eq!(
            tree.implicit_context(root, sender).map(|c| &c.value),
            Some(&Value::int(2))
        );
        assert_eq!(tree.clear_implicit(sender), 1);
        assert!(tree.implicit_context(root, sender).is_none());
    }
}
