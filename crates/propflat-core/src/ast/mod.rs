//! Mutable JavaScript syntax tree.
//!
//! Nodes live in an `id_arena` arena and are addressed by [`NodeId`]
//! handles. Parent links and ordered child lists are kept on each node so
//! that rewrites can walk up to the enclosing statement, splice siblings and
//! replace subtrees in place. A detached node stays in the arena; it simply
//! has no parent.
//!
//! Structural edits that matter to later scope bookkeeping are recorded with
//! [`Ast::report_change_to_enclosing_scope`].

pub mod builder;
mod node;
pub mod printer;
pub mod util;

pub use node::{JsDoc, Node, NodeId, NodeProps, Token};

use id_arena::Arena;
use rustc_hash::FxHashSet;

pub struct Ast {
    nodes: Arena<Node>,
    root: NodeId,
    changed_scopes: FxHashSet<NodeId>,
}

impl Ast {
    /// Create a tree holding a single empty `SCRIPT`.
    pub fn new() -> Self {
        let mut nodes = Arena::new();
        let root = nodes.alloc(Node::new(Token::Script));
        Self {
            nodes,
            root,
            changed_scopes: FxHashSet::default(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        self.nodes.alloc(node)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn token(&self, id: NodeId) -> Token {
        self.nodes[id].token
    }

    pub fn is(&self, id: NodeId, token: Token) -> bool {
        self.nodes[id].token == token
    }

    /// String payload of a node, or `""` when it has none.
    pub fn string(&self, id: NodeId) -> &str {
        self.nodes[id].string.as_deref().unwrap_or("")
    }

    pub fn set_string(&mut self, id: NodeId, value: impl Into<String>) {
        self.nodes[id].string = Some(value.into());
    }

    pub fn has_prop(&self, id: NodeId, prop: NodeProps) -> bool {
        self.nodes[id].props.contains(prop)
    }

    pub fn set_prop(&mut self, id: NodeId, prop: NodeProps, value: bool) {
        self.nodes[id].props.set(prop, value);
    }

    pub fn jsdoc(&self, id: NodeId) -> Option<JsDoc> {
        self.nodes[id].jsdoc
    }

    pub fn set_jsdoc(&mut self, id: NodeId, jsdoc: Option<JsDoc>) {
        self.nodes[id].jsdoc = jsdoc;
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    /// The `n`th ancestor: `ancestor(id, 1)` is the parent.
    pub fn ancestor(&self, id: NodeId, n: usize) -> Option<NodeId> {
        let mut current = Some(id);
        for _ in 0..n {
            current = current.and_then(|c| self.parent(c));
        }
        current
    }

    pub fn grandparent(&self, id: NodeId) -> Option<NodeId> {
        self.ancestor(id, 2)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].children.first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].children.last().copied()
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.nodes[id].children.len()
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        !self.nodes[id].children.is_empty()
    }

    fn index_in_parent(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(id)?;
        let index = self.nodes[parent].children.iter().position(|&c| c == id)?;
        Some((parent, index))
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.index_in_parent(id)?;
        self.nodes[parent].children.get(index + 1).copied()
    }

    pub fn previous(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .and_then(|i| self.nodes[parent].children.get(i).copied())
    }

    pub fn is_first_child_of(&self, id: NodeId, parent: NodeId) -> bool {
        self.first_child(parent) == Some(id)
    }

    /// Climb to the node that sits directly in a `SCRIPT` or `BLOCK`.
    pub fn enclosing_statement(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let parent = self.parent(current)?;
            if self.token(parent).is_statement_block() {
                return Some(current);
            }
            current = parent;
        }
    }

    /// Nearest enclosing `FUNCTION` or `SCRIPT`, including `id` itself.
    pub fn enclosing_scope_root(&self, id: NodeId) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(c) = current {
            if matches!(self.token(c), Token::Function | Token::Script) {
                return Some(c);
            }
            current = self.parent(c);
        }
        None
    }

    /// Pre-order walk of the subtree rooted at `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.nodes[n].children.iter().rev().copied());
        }
        out
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    pub fn add_child_to_back(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(self.parent(child).is_none(), "child is still attached");
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    pub fn add_child_to_front(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(self.parent(child).is_none(), "child is still attached");
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.insert(0, child);
    }

    /// Remove `id` from its parent. Detaching an already detached node is a
    /// no-op.
    pub fn detach(&mut self, id: NodeId) -> NodeId {
        if let Some((parent, index)) = self.index_in_parent(id) {
            self.nodes[parent].children.remove(index);
        }
        self.nodes[id].parent = None;
        id
    }

    /// Put the detached `replacement` where `id` is, detaching `id`.
    pub fn replace_with(&mut self, id: NodeId, replacement: NodeId) {
        if self.parent(replacement).is_some() {
            self.detach(replacement);
        }
        if let Some((parent, index)) = self.index_in_parent(id) {
            self.nodes[parent].children[index] = replacement;
            self.nodes[replacement].parent = Some(parent);
        }
        self.nodes[id].parent = None;
    }

    pub fn insert_before(&mut self, new: NodeId, existing: NodeId) {
        if let Some((parent, index)) = self.index_in_parent(existing) {
            self.detach(new);
            self.nodes[parent].children.insert(index, new);
            self.nodes[new].parent = Some(parent);
        }
    }

    pub fn insert_after(&mut self, new: NodeId, existing: NodeId) {
        if let Some((parent, index)) = self.index_in_parent(existing) {
            self.detach(new);
            self.nodes[parent].children.insert(index + 1, new);
            self.nodes[new].parent = Some(parent);
        }
    }

    /// Deep copy of a subtree. The copy is detached.
    pub fn clone_tree(&mut self, id: NodeId) -> NodeId {
        let mut copy = self.nodes[id].clone();
        copy.parent = None;
        copy.children = Vec::new();
        let new_id = self.nodes.alloc(copy);
        let children = self.nodes[id].children.clone();
        for child in children {
            let child_copy = self.clone_tree(child);
            self.add_child_to_back(new_id, child_copy);
        }
        new_id
    }

    // ------------------------------------------------------------------
    // Change bookkeeping
    // ------------------------------------------------------------------

    /// Record that the function or script enclosing `id` changed. Detached
    /// subtrees have no enclosing scope and are ignored.
    pub fn report_change_to_enclosing_scope(&mut self, id: NodeId) {
        if let Some(scope) = self.enclosing_scope_root(id) {
            if self.is_attached(scope) {
                self.changed_scopes.insert(scope);
            }
        }
    }

    /// Whether `id` is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current == self.root
    }

    pub fn changed_scopes(&self) -> &FxHashSet<NodeId> {
        &self.changed_scopes
    }

    pub fn has_changes(&self) -> bool {
        !self.changed_scopes.is_empty()
    }

    pub fn clear_changes(&mut self) {
        self.changed_scopes.clear();
    }
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Ast {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ast")
            .field("nodes", &self.nodes.len())
            .field("changed_scopes", &self.changed_scopes.len())
            .finish()
    }
}
