// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Shapes and the runtime-wide property tree.
//!
//! A [`Shape`] describes one property: its id, attributes, accessor ops,
//! slot and short id. Shapes live as nodes in a [`PropertyTree`], an arena
//! where each node points at its parent and the root is the empty shape.
//! A node's full chain, read from a terminal node back to the root, is the
//! ordered property layout of every object whose scope ends at that node.
//!
//! Children are deduplicated on their complete content, so objects that
//! add the same properties in the same order converge on the same node.
//! Nodes are reference counted: each child holds its parent and each
//! owning scope holds its terminal node. A node whose count drops to zero
//! is freed and its arena slot recycled under a new generation, which
//! invalidates every stale [`ShapeId`] pointing at it.

use crate::context::Context;
use crate::error::Result;
use crate::id::PropertyId;
use crate::object::ObjectRef;
use crate::value::Value;
use rustc_hash::FxHashMap;
use spacey_macros::bitflags;
use std::fmt;
use std::hash::{Hash, Hasher};
use tracing::trace;

bitflags! {
    /// Property attributes.
    pub Attrs: u8 {
        /// Visible to enumeration.
        ENUMERATE = 0x01,
        /// Not writable.
        READONLY = 0x02,
        /// Not configurable: can't be deleted or redefined.
        PERMANENT = 0x04,
        /// The getter is a script-visible function object.
        GETTER = 0x10,
        /// The setter is a script-visible function object.
        SETTER = 0x20,
        /// No slot; every access goes through the getter and setter.
        SHARED = 0x40,
    }
}

bitflags! {
    /// Shape flags that are not property attributes.
    pub ShapeFlags: u8 {
        /// `shortid` is passed to the getter and setter instead of the id.
        HAS_SHORTID = 0x01,
    }
}

/// Native property hook: `(cx, receiver, id, value)`.
pub type NativePropertyOp = fn(&mut Context, ObjectRef, &PropertyId, &mut Value) -> Result<()>;

/// A getter or setter attached to a shape.
#[derive(Clone, Copy)]
pub enum PropertyOp {
    /// No hook; data lives in the slot.
    Stub,
    /// Dispatch to the holder class's property hook.
    Class,
    /// A native function.
    Native(NativePropertyOp),
    /// A script-visible function object (with `GETTER`/`SETTER`).
    Function(ObjectRef),
}

impl PropertyOp {
    /// True for the default stub.
    pub fn is_stub(&self) -> bool {
        matches!(self, PropertyOp::Stub)
    }

    /// The function object, if any.
    pub fn as_function(&self) -> Option<ObjectRef> {
        match self {
            PropertyOp::Function(o) => Some(*o),
            _ => None,
        }
    }

    fn tag(&self) -> u8 {
        match self {
            PropertyOp::Stub => 0,
            PropertyOp::Class => 1,
            PropertyOp::Native(_) => 2,
            PropertyOp::Function(_) => 3,
        }
    }
}

impl PartialEq for PropertyOp {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropertyOp::Stub, PropertyOp::Stub) => true,
            (PropertyOp::Class, PropertyOp::Class) => true,
            (PropertyOp::Native(a), PropertyOp::Native(b)) => *a as usize == *b as usize,
            (PropertyOp::Function(a), PropertyOp::Function(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for PropertyOp {}

impl Hash for PropertyOp {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u8(self.tag());
        match self {
            PropertyOp::Native(f) => (*f as usize).hash(state),
            PropertyOp::Function(o) => o.hash(state),
            _ => {}
        }
    }
}

impl fmt::Debug for PropertyOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyOp::Stub => write!(f, "Stub"),
            PropertyOp::Class => write!(f, "Class"),
            PropertyOp::Native(op) => write!(f, "Native({:#x})", *op as usize),
            PropertyOp::Function(o) => write!(f, "Function({:?})", o),
        }
    }
}

/// One property descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Shape {
    /// Property id.
    pub id: PropertyId,
    /// Getter.
    pub getter: PropertyOp,
    /// Setter.
    pub setter: PropertyOp,
    /// Slot holding the value, or `None` for shared properties.
    pub slot: Option<u32>,
    /// Attributes.
    pub attrs: Attrs,
    /// Flags.
    pub flags: ShapeFlags,
    /// Id passed to hooks when `HAS_SHORTID` is set.
    pub shortid: i32,
}

impl Shape {
    /// A plain data property.
    pub fn data(id: PropertyId, attrs: Attrs) -> Self {
        Self {
            id,
            getter: PropertyOp::Stub,
            setter: PropertyOp::Stub,
            slot: None,
            attrs,
            flags: ShapeFlags::empty(),
            shortid: 0,
        }
    }

    /// True if the value lives in a slot.
    pub fn has_slot(&self) -> bool {
        self.slot.is_some()
    }

    /// True unless the property has script getter or setter functions.
    pub fn is_data_descriptor(&self) -> bool {
        !self.is_accessor_descriptor()
    }

    /// True if the property has script getter or setter functions.
    pub fn is_accessor_descriptor(&self) -> bool {
        self.attrs.intersects(Attrs::GETTER | Attrs::SETTER)
    }

    /// Writable.
    pub fn writable(&self) -> bool {
        !self.attrs.contains(Attrs::READONLY)
    }

    /// Enumerable.
    pub fn enumerable(&self) -> bool {
        self.attrs.contains(Attrs::ENUMERATE)
    }

    /// Configurable.
    pub fn configurable(&self) -> bool {
        !self.attrs.contains(Attrs::PERMANENT)
    }

    /// Shared and permanent: a prototype property standing in for an own
    /// property of every instance.
    pub fn is_shared_permanent(&self) -> bool {
        self.attrs.contains(Attrs::SHARED | Attrs::PERMANENT)
    }

    /// True if the getter is the stub.
    pub fn has_default_getter(&self) -> bool {
        self.getter.is_stub()
    }

    /// True if the setter is the stub.
    pub fn has_default_setter(&self) -> bool {
        self.setter.is_stub()
    }

    /// True if the getter is a script function.
    pub fn has_getter_value(&self) -> bool {
        self.attrs.contains(Attrs::GETTER)
    }

    /// True if the setter is a script function.
    pub fn has_setter_value(&self) -> bool {
        self.attrs.contains(Attrs::SETTER)
    }

    /// The getter function as a value, or undefined.
    pub fn getter_value(&self) -> Value {
        match (self.has_getter_value(), self.getter) {
            (true, PropertyOp::Function(o)) => Value::Object(o),
            _ => Value::Undefined,
        }
    }

    /// The setter function as a value, or undefined.
    pub fn setter_value(&self) -> Value {
        match (self.has_setter_value(), self.setter) {
            (true, PropertyOp::Function(o)) => Value::Object(o),
            _ => Value::Undefined,
        }
    }

    /// The id passed to hooks.
    pub fn user_id(&self) -> PropertyId {
        if self.flags.contains(ShapeFlags::HAS_SHORTID) {
            PropertyId::Int(self.shortid)
        } else {
            self.id.clone()
        }
    }
}

/// Handle to a node in the [`PropertyTree`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId {
    index: u32,
    generation: u32,
}

impl ShapeId {
    /// The root: no properties.
    pub const EMPTY: ShapeId = ShapeId {
        index: 0,
        generation: 0,
    };

    /// True for the root.
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Arena index.
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Debug for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shape#{}.{}", self.index, self.generation)
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

#[derive(Debug)]
struct Node {
    shape: Option<Shape>,
    parent: Option<ShapeId>,
    refs: u32,
    generation: u32,
    depth: u32,
}

/// Counters describing the tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Live nodes, not counting the root.
    pub live: usize,
    /// Nodes ever created.
    pub created: u64,
    /// Nodes freed.
    pub freed: u64,
    /// Child requests answered by an existing node.
    pub hits: u64,
}

/// Arena of shared shape nodes.
#[derive(Debug)]
pub struct PropertyTree {
    nodes: Vec<Node>,
    free: Vec<u32>,
    kids: FxHashMap<(ShapeId, Shape), ShapeId>,
    hash_threshold: usize,
    stats: TreeStats,
}

impl PropertyTree {
    /// An empty tree. Scopes with at least `hash_threshold` properties
    /// build a lookup table.
    pub fn new(hash_threshold: usize) -> Self {
        Self {
            nodes: vec![Node {
                shape: None,
                parent: None,
                refs: 0,
                generation: 0,
                depth: 0,
            }],
            free: Vec::new(),
            kids: FxHashMap::default(),
            hash_threshold,
            stats: TreeStats::default(),
        }
    }

    fn node(&self, id: ShapeId) -> Option<&Node> {
        let node = self.nodes.get(id.index as usize)?;
        (node.generation == id.generation && (id.is_empty() || node.shape.is_some())).then_some(node)
    }

    fn node_mut(&mut self, id: ShapeId) -> Option<&mut Node> {
        let node = self.nodes.get_mut(id.index as usize)?;
        (node.generation == id.generation && (id.is_empty() || node.shape.is_some())).then_some(node)
    }

    /// True if `id` names a live node.
    pub fn contains(&self, id: ShapeId) -> bool {
        self.node(id).is_some()
    }

    /// The shape at `id`, or `None` for the root or a freed node.
    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.node(id)?.shape.as_ref()
    }

    /// The parent of `id`.
    pub fn parent(&self, id: ShapeId) -> Option<ShapeId> {
        self.node(id)?.parent
    }

    /// Number of properties in the chain ending at `id`.
    pub fn depth(&self, id: ShapeId) -> usize {
        self.node(id).map_or(0, |n| n.depth as usize)
    }

    /// Reference count of `id`.
    pub fn refs(&self, id: ShapeId) -> u32 {
        self.node(id).map_or(0, |n| n.refs)
    }

    /// Table threshold for scopes.
    pub fn hash_threshold(&self) -> usize {
        self.hash_threshold
    }

    /// Counters.
    pub fn stats(&self) -> TreeStats {
        self.stats
    }

    /// Find or create the child of `parent` described by `shape`.
    ///
    /// A new child holds its parent. The caller must hold the returned node
    /// (directly or through a child of its own) or it stays unreferenced.
    pub fn get_child(&mut self, parent: ShapeId, shape: Shape) -> Result<ShapeId> {
        debug_assert!(self.contains(parent), "stale parent {:?}", parent);
        let key = (parent, shape);
        if let Some(&kid) = self.kids.get(&key) {
            self.stats.hits += 1;
            return Ok(kid);
        }
        let (parent, shape) = key;
        let depth = self.depth(parent) as u32 + 1;
        self.kids.try_reserve(1)?;
        let id = match self.free.pop() {
            Some(index) => {
                let node = &mut self.nodes[index as usize];
                node.shape = Some(shape.clone());
                node.parent = Some(parent);
                node.refs = 0;
                node.depth = depth;
                ShapeId {
                    index,
                    generation: node.generation,
                }
            }
            None => {
                self.nodes.try_reserve(1)?;
                let index = self.nodes.len() as u32;
                self.nodes.push(Node {
                    shape: Some(shape.clone()),
                    parent: Some(parent),
                    refs: 0,
                    generation: 0,
                    depth,
                });
                ShapeId {
                    index,
                    generation: 0,
                }
            }
        };
        self.kids.insert((parent, shape), id);
        self.hold(parent);
        self.stats.created += 1;
        self.stats.live += 1;
        trace!(?id, ?parent, depth, "new shape");
        Ok(id)
    }

    /// Add a reference to `id`.
    pub fn hold(&mut self, id: ShapeId) {
        if id.is_empty() {
            return;
        }
        if let Some(node) = self.node_mut(id) {
            node.refs += 1;
        }
    }

    /// Drop a reference to `id`, freeing it and then its ancestors as their
    /// counts reach zero.
    pub fn release(&mut self, id: ShapeId) {
        let mut cur = id;
        while !cur.is_empty() {
            let Some(node) = self.node_mut(cur) else {
                return;
            };
            debug_assert!(node.refs > 0, "over-released {:?}", cur);
            node.refs = node.refs.saturating_sub(1);
            if node.refs > 0 {
                return;
            }
            let shape = node.shape.take();
            let parent = node.parent.take();
            node.generation = node.generation.wrapping_add(1);
            self.free.push(cur.index);
            self.stats.freed += 1;
            self.stats.live -= 1;
            match (shape, parent) {
                (Some(shape), Some(parent)) => {
                    self.kids.remove(&(parent, shape));
                    cur = parent;
                }
                _ => return,
            }
        }
    }

    /// Walk the chain ending at `last`, newest property first.
    pub fn chain(&self, last: ShapeId) -> Chain<'_> {
        Chain {
            tree: self,
            cur: last,
        }
    }

    /// Linear search of the chain ending at `last`.
    pub fn search(&self, last: ShapeId, id: &PropertyId) -> Option<ShapeId> {
        self.chain(last).find(|(_, s)| s.id == *id).map(|(sid, _)| sid)
    }
}

/// Iterator over a shape chain, newest first.
pub struct Chain<'a> {
    tree: &'a PropertyTree,
    cur: ShapeId,
}

impl<'a> Iterator for Chain<'a> {
    type Item = (ShapeId, &'a Shape);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.tree.node(self.cur)?;
        let shape = node.shape.as_ref()?;
        let id = self.cur;
        self.cur = node.parent.unwrap_or(ShapeId::EMPTY);
        Some((id, shape))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(name: &str, slot: u32) -> Shape {
        Shape {
            slot: Some(slot),
            ..Shape::data(PropertyId::from(name), Attrs::ENUMERATE)
        }
    }

    #[test]
    fn test_children_are_deduplicated() {
        let mut tree = PropertyTree::new(6);
        let a1 = tree.get_child(ShapeId::EMPTY, data("a", 0)).unwrap();
        let a2 = tree.get_child(ShapeId::EMPTY, data("a", 0)).unwrap();
        assert_eq!(a1, a2);
        assert_eq!(tree.stats().hits, 1);

        let b = tree.get_child(a1, data("b", 1)).unwrap();
        assert_eq!(tree.parent(b), Some(a1));
        assert_eq!(tree.depth(b), 2);
        assert_eq!(tree.refs(a1), 1);
    }

    #[test]
    fn test_content_differences_fork() {
        let mut tree = PropertyTree::new(6);
        let a = tree.get_child(ShapeId::EMPTY, data("a", 0)).unwrap();
        let ro = Shape {
            attrs: Attrs::READONLY,
            ..data("a", 0)
        };
        let a_ro = tree.get_child(ShapeId::EMPTY, ro).unwrap();
        assert_ne!(a, a_ro);
    }

    #[test]
    fn test_release_frees_unreferenced_chain() {
        let mut tree = PropertyTree::new(6);
        let a = tree.get_child(ShapeId::EMPTY, data("a", 0)).unwrap();
        let b = tree.get_child(a, data("b", 1)).unwrap();
        tree.hold(b);
        assert_eq!(tree.stats().live, 2);

        tree.release(b);
        assert!(!tree.contains(a));
        assert!(!tree.contains(b));
        assert_eq!(tree.stats().live, 0);

        // Recycled slot gets a fresh generation
        let c = tree.get_child(ShapeId::EMPTY, data("c", 0)).unwrap();
        assert_ne!(c, a);
        assert_ne!(c, b);
        assert!(tree.get(a).is_none());
    }

    #[test]
    fn test_chain_and_search() {
        let mut tree = PropertyTree::new(6);
        let a = tree.get_child(ShapeId::EMPTY, data("a", 0)).unwrap();
        let b = tree.get_child(a, data("b", 1)).unwrap();
        let ids: Vec<_> = tree.chain(b).map(|(_, s)| s.id.to_string()).collect();
        assert_eq!(ids, ["b", "a"]);
        assert_eq!(tree.search(b, &PropertyId::from("a")), Some(a));
        assert_eq!(tree.search(b, &PropertyId::from("z")), None);
    }

    #[test]
    fn test_shortid_user_id() {
        let shape = Shape {
            flags: ShapeFlags::HAS_SHORTID,
            shortid: 4,
            ..Shape::data(PropertyId::from("x"), Attrs::SHARED)
        };
        assert_eq!(shape.user_id(), PropertyId::Int(4));
        assert!(shape.is_data_descriptor());
        assert!(!shape.has_slot());
    }
}
