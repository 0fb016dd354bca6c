//! Scope resolution: the ordered list of contexts a consumer can see.

use std::collections::BTreeSet;

use crate::context::{Context, Hierarchy, NodeId, SenderId};

/// A context as seen from some consumer, tagged with where it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScopedContext<'a> {
    /// Declaring node, or `None` for contexts supplied without a tree.
    pub owner: Option<NodeId>,
    pub context: &'a Context,
    pub implicit: bool,
}

/// Contexts visible at one point of the tree, nearest first. Ids are
/// unique: shadowed ancestors are excluded.
#[derive(Debug, Clone, Default)]
pub struct Scope<'a> {
    entries: Vec<ScopedContext<'a>>,
}

impl<'a> Scope<'a> {
    /// A free-standing scope over a flat list. Later duplicates of an id
    /// are ignored.
    pub fn from_contexts(contexts: &'a [Context]) -> Self {
        let mut scope = Scope::default();
        let mut seen = BTreeSet::new();
        for context in contexts {
            scope.push(&mut seen, None, context, false);
        }
        scope
    }

    fn push(
        &mut self,
        seen: &mut BTreeSet<&'a str>,
        owner: Option<NodeId>,
        context: &'a Context,
        implicit: bool,
    ) {
        if seen.insert(context.id.as_str()) {
            self.entries.push(ScopedContext {
                owner,
                context,
                implicit,
            });
        }
    }

    pub fn lookup(&self, id: &str) -> Option<&ScopedContext<'a>> {
        self.entries.iter().find(|e| e.context.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScopedContext<'a>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> Vec<&'a str> {
        self.entries.iter().map(|e| e.context.id.as_str()).collect()
    }
}

fn ancestors<H: Hierarchy>(tree: &H, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    std::iter::successors(Some(node), move |n| tree.parent(*n))
}

/// Walk from `node` to the root, keeping the nearest context per id.
pub fn resolve_scope<H: Hierarchy>(tree: &H, node: NodeId) -> Scope<'_> {
    let mut scope = Scope::default();
    let mut seen = BTreeSet::new();
    for n in ancestors(tree, node) {
        for context in tree.declared_contexts(n) {
            scope.push(&mut seen, Some(n), context, false);
        }
    }
    scope
}

/// Like [`resolve_scope`], followed by the implicit contexts `sender`
/// registered on `node` and its ancestors (nearest first). Ordinary
/// contexts win on id collision.
pub fn resolve_scope_for_sender<H: Hierarchy>(
    tree: &H,
    node: NodeId,
    sender: SenderId,
) -> Scope<'_> {
    let mut scope = Scope::default();
    let mut seen = BTreeSet::new();
    for n in ancestors(tree, node) {
        for context in tree.declared_contexts(n) {
            scope.push(&mut seen, Some(n), context, false);
        }
    }
    for n in ancestors(tree, node) {
        if let Some(context) = tree.implicit_context(n, sender) {
            scope.push(&mut seen, Some(n), context, true);
        }
    }
    scope
}
