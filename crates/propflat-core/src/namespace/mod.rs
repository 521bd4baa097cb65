//! Forest of global dotted names.
//!
//! Every distinct global path (`a`, `a.b`, `a.b.c`) is a [`Name`] in an
//! arena; every occurrence of a path in the tree is a [`Ref`] in a second
//! arena. Refs hold [`NodeId`] handles into the [`Ast`], so relocating a
//! declaration during a rewrite only means updating the handle
//! ([`NameForest::update_ref_node`]).
//!
//! The forest is built by a collector upstream of the collapse pass. The
//! collapsibility verdicts below have defaults derived from the occurrence
//! counters, and each one can be overridden per name by the collector.

use crate::ast::{Ast, JsDoc, NodeId, Token};
use bitflags::bitflags;
use id_arena::{Arena, Id};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type NameId = Id<Name>;
pub type RefId = Id<Ref>;

/// Role of one occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefType {
    /// The occurrence that establishes the name's value.
    Declaration,
    SetFromGlobal,
    SetFromLocal,
    /// A read that may capture the value under another binding.
    AliasingGet,
    DeleteProp,
    OtherGet,
}

impl RefType {
    pub fn is_set(self) -> bool {
        matches!(
            self,
            RefType::Declaration | RefType::SetFromGlobal | RefType::SetFromLocal
        )
    }

    pub fn is_get(self) -> bool {
        matches!(self, RefType::AliasingGet | RefType::OtherGet)
    }
}

#[derive(Debug, Clone)]
pub struct Ref {
    /// Tree location; `None` once the occurrence has been removed.
    pub node: Option<NodeId>,
    pub ref_type: RefType,
    /// The other half of a dual-role occurrence (`c = a.b = 1`).
    pub twin: Option<RefId>,
    pub name: NameId,
}

impl Ref {
    pub fn is_set(&self) -> bool {
        self.ref_type.is_set()
    }
}

/// Verdict on whether references to a name may be replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Inlinability {
    InlineCompletely,
    InlineButKeepDeclaration,
    DoNotInline,
}

impl Inlinability {
    pub fn can_collapse(self) -> bool {
        !matches!(self, Inlinability::DoNotInline)
    }
}

impl fmt::Display for Inlinability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Inlinability::InlineCompletely => "INLINE_COMPLETELY",
            Inlinability::InlineButKeepDeclaration => "INLINE_BUT_KEEP_DECLARATION",
            Inlinability::DoNotInline => "DO_NOT_INLINE",
        })
    }
}

/// Shape of the value a name's declaration establishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NameKind {
    ObjectLit,
    Function,
    Class,
    /// Defined through a getter or setter.
    GetSet,
    #[default]
    Other,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct NameFlags: u8 {
        /// Declared as an object literal used purely as a container.
        const NAMESPACE_OBJECT_LIT = 1 << 0;
        const MODULE_EXPORT = 1 << 1;
        /// Object literal keys must survive even when their values are hoisted.
        const KEEP_KEYS = 1 << 2;
        /// The author opted out of collapsing (`@nocollapse`).
        const COLLAPSING_DENIED = 1 << 3;
    }
}

#[derive(Debug, Clone)]
pub struct Name {
    full_name: String,
    base_name: String,
    parent: Option<NameId>,
    props: Vec<NameId>,
    refs: Vec<RefId>,
    declaration: Option<RefId>,
    pub kind: NameKind,
    pub flags: NameFlags,
    pub jsdoc: Option<JsDoc>,
    pub aliasing_gets: usize,
    pub local_sets: usize,
    pub global_sets: usize,
    pub delete_props: usize,
    pub total_gets: usize,
    inlinability: Option<Inlinability>,
    child_inlinability: Option<Inlinability>,
    can_eliminate: Option<bool>,
}

impl Name {
    fn new(full_name: &str, parent: Option<NameId>) -> Self {
        let base_name = full_name
            .rsplit_once('.')
            .map_or(full_name, |(_, base)| base)
            .to_string();
        Self {
            full_name: full_name.to_string(),
            base_name,
            parent,
            props: Vec::new(),
            refs: Vec::new(),
            declaration: None,
            kind: NameKind::Other,
            flags: NameFlags::empty(),
            jsdoc: None,
            aliasing_gets: 0,
            local_sets: 0,
            global_sets: 0,
            delete_props: 0,
            total_gets: 0,
            inlinability: None,
            child_inlinability: None,
            can_eliminate: None,
        }
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn parent(&self) -> Option<NameId> {
        self.parent
    }

    pub fn props(&self) -> &[NameId] {
        &self.props
    }

    pub fn refs(&self) -> &[RefId] {
        &self.refs
    }

    pub fn declaration(&self) -> Option<RefId> {
        self.declaration
    }

    /// A bare identifier rather than a dotted path.
    pub fn is_simple_name(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_namespace_object_lit(&self) -> bool {
        self.flags.contains(NameFlags::NAMESPACE_OBJECT_LIT)
    }

    pub fn is_module_export(&self) -> bool {
        self.flags.contains(NameFlags::MODULE_EXPORT)
    }

    pub fn should_keep_keys(&self) -> bool {
        self.flags.contains(NameFlags::KEEP_KEYS)
    }

    pub fn is_collapsing_explicitly_denied(&self) -> bool {
        self.flags.contains(NameFlags::COLLAPSING_DENIED)
    }

    pub fn is_function_or_class(&self) -> bool {
        matches!(self.kind, NameKind::Function | NameKind::Class)
    }

    pub fn is_get_or_set_definition(&self) -> bool {
        self.kind == NameKind::GetSet
    }
}

/// Builds the forest for a tree. Implemented by whatever front end knows
/// how global names are declared in its input.
pub trait NameCollector {
    fn collect(&self, ast: &Ast) -> NameForest;
}

/// The forest plus its full-name index.
#[derive(Debug, Default)]
pub struct NameForest {
    names: Arena<Name>,
    refs: Arena<Ref>,
    index: IndexMap<String, NameId>,
    roots: Vec<NameId>,
}

impl NameForest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `full_name`, creating it and any missing ancestors.
    pub fn get_or_create(&mut self, full_name: &str) -> NameId {
        if let Some(&id) = self.index.get(full_name) {
            return id;
        }
        let parent = full_name
            .rsplit_once('.')
            .map(|(prefix, _)| self.get_or_create(prefix));
        let id = self.names.alloc(Name::new(full_name, parent));
        self.index.insert(full_name.to_string(), id);
        match parent {
            Some(parent) => self.names[parent].props.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn get(&self, full_name: &str) -> Option<NameId> {
        self.index.get(full_name).copied()
    }

    pub fn contains(&self, full_name: &str) -> bool {
        self.index.contains_key(full_name)
    }

    pub fn name(&self, id: NameId) -> &Name {
        &self.names[id]
    }

    pub fn name_mut(&mut self, id: NameId) -> &mut Name {
        &mut self.names[id]
    }

    pub fn reference(&self, id: RefId) -> &Ref {
        &self.refs[id]
    }

    /// Top-level names in the order they were first seen.
    pub fn roots(&self) -> &[NameId] {
        &self.roots
    }

    /// Every name in creation order.
    pub fn names(&self) -> impl Iterator<Item = NameId> + '_ {
        self.index.values().copied()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Record an occurrence of `name` at `node`. The first declaration
    /// becomes the name's declaration; later ones count as global sets.
    pub fn add_ref(&mut self, name: NameId, node: NodeId, ref_type: RefType) -> RefId {
        let ref_type = if ref_type == RefType::Declaration && self.names[name].declaration.is_some() {
            RefType::SetFromGlobal
        } else {
            ref_type
        };
        let id = self.refs.alloc(Ref {
            node: Some(node),
            ref_type,
            twin: None,
            name,
        });
        let entry = &mut self.names[name];
        entry.refs.push(id);
        match ref_type {
            RefType::Declaration => {
                entry.declaration = Some(id);
                entry.global_sets += 1;
            }
            RefType::SetFromGlobal => entry.global_sets += 1,
            RefType::SetFromLocal => entry.local_sets += 1,
            RefType::AliasingGet => {
                entry.aliasing_gets += 1;
                entry.total_gets += 1;
            }
            RefType::DeleteProp => entry.delete_props += 1,
            RefType::OtherGet => entry.total_gets += 1,
        }
        id
    }

    /// Promote an existing ref to be the declaration.
    pub fn set_declaration(&mut self, name: NameId, reference: RefId) {
        debug_assert!(self.names[name].refs.contains(&reference));
        self.names[name].declaration = Some(reference);
    }

    /// Link two refs that share one syntactic occurrence.
    pub fn pair_twins(&mut self, a: RefId, b: RefId) {
        self.refs[a].twin = Some(b);
        self.refs[b].twin = Some(a);
    }

    pub fn update_ref_node(&mut self, reference: RefId, node: Option<NodeId>) {
        self.refs[reference].node = node;
    }

    /// Record that `node`, a copy of the declared value's position, now
    /// reads the name.
    pub fn add_aliasing_get_cloned_from_declaration(&mut self, name: NameId, node: NodeId) -> RefId {
        self.add_ref(name, node, RefType::AliasingGet)
    }

    pub fn first_ref(&self, name: NameId) -> Option<RefId> {
        self.names[name].refs.first().copied()
    }

    pub fn declaration_node(&self, name: NameId) -> Option<NodeId> {
        self.names[name]
            .declaration
            .and_then(|decl| self.refs[decl].node)
    }

    // ------------------------------------------------------------------
    // Verdict overrides
    // ------------------------------------------------------------------

    pub fn set_kind(&mut self, name: NameId, kind: NameKind) {
        self.names[name].kind = kind;
    }

    pub fn insert_flags(&mut self, name: NameId, flags: NameFlags) {
        self.names[name].flags.insert(flags);
    }

    pub fn set_jsdoc(&mut self, name: NameId, jsdoc: Option<JsDoc>) {
        self.names[name].jsdoc = jsdoc;
    }

    pub fn set_inlinability(&mut self, name: NameId, verdict: Inlinability) {
        self.names[name].inlinability = Some(verdict);
    }

    pub fn set_child_inlinability(&mut self, name: NameId, verdict: Inlinability) {
        self.names[name].child_inlinability = Some(verdict);
    }

    pub fn set_can_eliminate(&mut self, name: NameId, can_eliminate: bool) {
        self.names[name].can_eliminate = Some(can_eliminate);
    }

    // ------------------------------------------------------------------
    // Verdicts
    // ------------------------------------------------------------------

    /// Whether references to `name` itself may be collapsed.
    pub fn can_collapse_or_inline(&self, name: NameId) -> Inlinability {
        let entry = &self.names[name];
        if let Some(verdict) = entry.inlinability {
            return verdict;
        }
        // `delete a$b` is a no-op on a variable, so deleted names stay put.
        if entry.is_collapsing_explicitly_denied()
            || entry.is_get_or_set_definition()
            || entry.delete_props > 0
        {
            return Inlinability::DoNotInline;
        }
        if let Some(parent) = entry.parent {
            if !self.can_collapse_or_inline_child_names(parent).can_collapse() {
                return Inlinability::DoNotInline;
            }
        }
        if entry.aliasing_gets > 0 {
            Inlinability::InlineButKeepDeclaration
        } else {
            Inlinability::InlineCompletely
        }
    }

    /// Whether the children of `name` may be collapsed.
    pub fn can_collapse_or_inline_child_names(&self, name: NameId) -> Inlinability {
        let entry = &self.names[name];
        if let Some(verdict) = entry.child_inlinability {
            return verdict;
        }
        let twinned_declaration = entry
            .declaration
            .is_some_and(|decl| self.refs[decl].twin.is_some());
        if entry.is_collapsing_explicitly_denied()
            || matches!(entry.kind, NameKind::Other | NameKind::GetSet)
            || entry.global_sets != 1
            || entry.local_sets != 0
            || entry.delete_props != 0
            || twinned_declaration
            || (entry.aliasing_gets > 0 && !entry.is_function_or_class())
        {
            return Inlinability::DoNotInline;
        }
        match entry.parent {
            Some(parent) if !self.can_collapse_or_inline_child_names(parent).can_collapse() => {
                Inlinability::DoNotInline
            }
            _ => Inlinability::InlineCompletely,
        }
    }

    /// Read or set only from local scopes, never declared globally.
    pub fn needs_to_be_stubbed(&self, name: NameId) -> bool {
        let entry = &self.names[name];
        entry.global_sets == 0 && entry.local_sets > 0 && !entry.is_collapsing_explicitly_denied()
    }

    /// Whether the declared object literal can be dropped once its
    /// properties are hoisted.
    pub fn can_eliminate(&self, name: NameId) -> bool {
        let entry = &self.names[name];
        if let Some(can_eliminate) = entry.can_eliminate {
            return can_eliminate;
        }
        entry.total_gets == 0
            && self.can_collapse_or_inline_child_names(name).can_collapse()
            && entry
                .props
                .iter()
                .all(|&prop| self.can_collapse_or_inline(prop).can_collapse())
    }

    /// `a.b;` as a whole statement, with no other occurrence.
    pub fn is_simple_stub_declaration(&self, name: NameId, ast: &Ast) -> bool {
        let entry = &self.names[name];
        match entry.refs.as_slice() {
            [only] => self.refs[*only]
                .node
                .and_then(|node| ast.parent(node))
                .is_some_and(|parent| ast.is(parent, Token::ExprResult)),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forest_with_namespace() -> (Ast, NameForest, NameId, NameId) {
        let mut ast = Ast::new();
        let mut forest = NameForest::new();
        let a_node = ast.new_name("a");
        let ab_node = ast.new_qname("a.b");

        let a = forest.get_or_create("a");
        forest.set_kind(a, NameKind::ObjectLit);
        forest.add_ref(a, a_node, RefType::Declaration);
        let ab = forest.get_or_create("a.b");
        forest.add_ref(ab, ab_node, RefType::Declaration);
        (ast, forest, a, ab)
    }

    #[test]
    fn test_get_or_create_builds_ancestors_in_order() {
        let mut forest = NameForest::new();
        let abc = forest.get_or_create("a.b.c");
        let a = forest.get("a").unwrap();
        let ab = forest.get("a.b").unwrap();

        assert_eq!(forest.roots(), &[a]);
        assert_eq!(forest.name(a).props(), &[ab]);
        assert_eq!(forest.name(ab).props(), &[abc]);
        assert_eq!(forest.name(abc).base_name(), "c");
        assert_eq!(forest.name(abc).parent(), Some(ab));
        assert!(forest.name(a).is_simple_name());
        assert!(!forest.name(abc).is_simple_name());

        let names: Vec<&str> = forest.names().map(|n| forest.name(n).full_name()).collect();
        assert_eq!(names, vec!["a", "a.b", "a.b.c"]);
        assert_eq!(forest.get_or_create("a.b"), ab);
        assert_eq!(forest.len(), 3);
    }

    #[test]
    fn test_add_ref_counts_by_role() {
        let mut ast = Ast::new();
        let mut forest = NameForest::new();
        let name = forest.get_or_create("x");
        let nodes: Vec<NodeId> = (0..6).map(|_| ast.new_name("x")).collect();

        let decl = forest.add_ref(name, nodes[0], RefType::Declaration);
        let second = forest.add_ref(name, nodes[1], RefType::Declaration);
        forest.add_ref(name, nodes[2], RefType::SetFromLocal);
        forest.add_ref(name, nodes[3], RefType::AliasingGet);
        forest.add_ref(name, nodes[4], RefType::OtherGet);
        forest.add_ref(name, nodes[5], RefType::DeleteProp);

        let entry = forest.name(name);
        assert_eq!(entry.declaration(), Some(decl));
        assert_eq!(forest.reference(second).ref_type, RefType::SetFromGlobal);
        assert_eq!(entry.global_sets, 2);
        assert_eq!(entry.local_sets, 1);
        assert_eq!(entry.aliasing_gets, 1);
        assert_eq!(entry.total_gets, 2);
        assert_eq!(entry.delete_props, 1);
        assert_eq!(forest.first_ref(name), Some(decl));
    }

    #[test]
    fn test_default_verdicts_for_a_clean_namespace() {
        let (_ast, forest, a, ab) = forest_with_namespace();
        assert_eq!(
            forest.can_collapse_or_inline_child_names(a),
            Inlinability::InlineCompletely
        );
        assert!(forest.can_collapse_or_inline(ab).can_collapse());
        assert!(forest.can_eliminate(a));
        // `a.b` has kind Other, so its own children stay put.
        assert_eq!(
            forest.can_collapse_or_inline_child_names(ab),
            Inlinability::DoNotInline
        );
    }

    #[test]
    fn test_aliasing_blocks_children_unless_function() {
        let (mut ast, mut forest, a, ab) = forest_with_namespace();
        let alias_site = ast.new_name("a");
        forest.add_ref(a, alias_site, RefType::AliasingGet);

        assert!(!forest.can_collapse_or_inline_child_names(a).can_collapse());
        assert!(!forest.can_collapse_or_inline(ab).can_collapse());
        assert!(!forest.can_eliminate(a));

        forest.set_kind(a, NameKind::Function);
        assert!(forest.can_collapse_or_inline_child_names(a).can_collapse());
        assert_eq!(
            forest.can_collapse_or_inline(a),
            Inlinability::InlineButKeepDeclaration
        );
    }

    #[test]
    fn test_overrides_win() {
        let (_ast, mut forest, a, ab) = forest_with_namespace();
        forest.set_child_inlinability(a, Inlinability::DoNotInline);
        assert!(!forest.can_collapse_or_inline(ab).can_collapse());

        forest.set_inlinability(ab, Inlinability::InlineCompletely);
        assert!(forest.can_collapse_or_inline(ab).can_collapse());

        forest.set_can_eliminate(a, true);
        assert!(forest.can_eliminate(a));
    }

    #[test]
    fn test_denied_and_getset_names_never_collapse() {
        let (_ast, mut forest, a, ab) = forest_with_namespace();
        forest.insert_flags(ab, NameFlags::COLLAPSING_DENIED);
        assert!(!forest.can_collapse_or_inline(ab).can_collapse());
        assert!(forest.name(ab).is_collapsing_explicitly_denied());

        forest.set_kind(a, NameKind::GetSet);
        assert!(!forest.can_collapse_or_inline(a).can_collapse());
    }

    #[test]
    fn test_deleted_names_never_collapse() {
        let (mut ast, mut forest, a, ab) = forest_with_namespace();
        let deleted = ast.new_qname("a.b");
        forest.add_ref(ab, deleted, RefType::DeleteProp);

        assert_eq!(forest.can_collapse_or_inline(ab), Inlinability::DoNotInline);
        assert!(!forest.can_eliminate(a));
    }

    #[test]
    fn test_stub_and_twin_bookkeeping() {
        let mut ast = Ast::new();
        let mut forest = NameForest::new();
        let name = forest.get_or_create("a.b");
        let node = ast.new_qname("a.b");
        let stmt = ast.new_expr_result(node);
        ast.push_statement(stmt);
        let only = forest.add_ref(name, node, RefType::OtherGet);
        assert!(forest.is_simple_stub_declaration(name, &ast));
        assert!(!forest.needs_to_be_stubbed(name));

        let local = ast.new_qname("a.b");
        let set = forest.add_ref(name, local, RefType::SetFromLocal);
        assert!(!forest.is_simple_stub_declaration(name, &ast));
        assert!(forest.needs_to_be_stubbed(name));

        forest.pair_twins(only, set);
        assert_eq!(forest.reference(only).twin, Some(set));
        assert_eq!(forest.reference(set).twin, Some(only));

        forest.update_ref_node(set, None);
        assert_eq!(forest.reference(set).node, None);
    }

    #[test]
    fn test_inlinability_display() {
        assert_eq!(Inlinability::InlineCompletely.to_string(), "INLINE_COMPLETELY");
        assert_eq!(Inlinability::DoNotInline.to_string(), "DO_NOT_INLINE");
        assert!(Inlinability::InlineButKeepDeclaration.can_collapse());
    }
}
