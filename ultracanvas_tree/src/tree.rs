// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core tree implementation: structure, geometry, queries.

use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};

use kurbo::{Point, Rect};
use smallvec::SmallVec;

use crate::types::{ElementFlags, ElementId, ElementKind, LocalElement, TreeError};

static NEXT_TREE_STAMP: AtomicU32 = AtomicU32::new(1);

/// The element tree of one window.
///
/// A tree always has a root container, created by [`Tree::new`]. Further elements are
/// inserted under a container or as floating roots, and every mutation takes effect
/// immediately; there is no commit step because nothing derived is cached.
///
/// ## Example
///
/// ```rust
/// use kurbo::{Point, Rect};
/// use ultracanvas_tree::{LocalElement, Tree};
///
/// let mut tree = Tree::new(LocalElement::container("window", Rect::new(0.0, 0.0, 300.0, 200.0)));
/// let panel = tree
///     .insert(tree.root(), LocalElement::container("panel", Rect::new(50.0, 50.0, 250.0, 150.0)))
///     .unwrap();
/// let label = tree
///     .insert(panel, LocalElement::leaf("label", Rect::new(10.0, 10.0, 60.0, 30.0)))
///     .unwrap();
///
/// // Bounds are parent-relative; window coordinates are derived.
/// assert_eq!(tree.absolute_bounds(label), Some(Rect::new(60.0, 60.0, 110.0, 80.0)));
/// assert_eq!(tree.to_local(label, Point::new(70.0, 65.0)), Some(Point::new(10.0, 5.0)));
/// ```
pub struct Tree {
    stamp: u32,
    /// slots
    nodes: Vec<Option<Node>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
    root: ElementId,
}

impl core::fmt::Debug for Tree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        f.debug_struct("Tree")
            .field("stamp", &self.stamp)
            .field("root", &self.root)
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &self.free_list.len())
            .finish_non_exhaustive()
    }
}

/// Result of a hit test.
#[derive(Clone, Debug)]
pub struct Hit {
    /// The deepest matching element.
    pub element: ElementId,
    /// Path from the starting element to `element` (inclusive).
    pub path: SmallVec<[ElementId; 8]>,
}

/// Filters applied to hit-test candidates.
///
/// Filters decide whether an element may be *returned*; they never stop the walk from
/// descending into its children. Invisible elements are always skipped together with their
/// subtrees, whatever the filter says.
#[derive(Clone, Copy, Debug)]
pub struct QueryFilter {
    /// Flags a candidate must have.
    pub required_flags: ElementFlags,
    /// Flags a candidate must not have.
    pub excluded_flags: ElementFlags,
}

// `ElementFlags::default()` is `VISIBLE`, so the empty filter is spelled out.
impl Default for QueryFilter {
    fn default() -> Self {
        Self {
            required_flags: ElementFlags::empty(),
            excluded_flags: ElementFlags::empty(),
        }
    }
}

impl QueryFilter {
    /// Create a new empty filter (every visible element qualifies).
    pub fn new() -> Self {
        Self::default()
    }

    /// Only visible elements.
    pub fn visible(mut self) -> Self {
        self.required_flags |= ElementFlags::VISIBLE;
        self
    }

    /// Only focusable elements.
    pub fn focusable(mut self) -> Self {
        self.required_flags |= ElementFlags::FOCUSABLE;
        self
    }

    /// Exclude disabled elements.
    pub fn enabled(mut self) -> Self {
        self.excluded_flags |= ElementFlags::DISABLED;
        self
    }

    /// Check if an element's flags satisfy this filter.
    pub fn matches(&self, flags: ElementFlags) -> bool {
        flags.contains(self.required_flags) && !flags.intersects(self.excluded_flags)
    }
}

#[derive(Clone, Debug)]
struct Node {
    generation: u32,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    local: LocalElement,
}

impl Node {
    fn new(generation: u32, local: LocalElement) -> Self {
        Self {
            generation,
            parent: None,
            children: Vec::new(),
            local,
        }
    }
}

impl Tree {
    /// Create a tree whose root is `root`. The root is always a container.
    pub fn new(mut root: LocalElement) -> Self {
        root.kind = ElementKind::Container;
        let stamp = NEXT_TREE_STAMP.fetch_add(1, Ordering::Relaxed);
        let mut tree = Self {
            stamp,
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            root: ElementId::new(0, 0, stamp),
        };
        tree.root = tree.alloc(root);
        tree
    }

    /// The window root.
    pub fn root(&self) -> ElementId {
        self.root
    }

    /// Stamp shared by every id this tree issues.
    pub fn stamp(&self) -> u32 {
        self.stamp
    }

    /// Number of live elements, floating subtrees included.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// A tree always holds at least its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    fn alloc(&mut self, local: LocalElement) -> ElementId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(generation, local));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ElementId uses 32-bit slots."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(Node::new(generation, local)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ElementId uses 32-bit slots."
            )]
            ((self.nodes.len() - 1) as u32, generation)
        };
        ElementId::new(idx, generation, self.stamp)
    }

    /// Insert a new element under the container `parent`.
    pub fn insert(&mut self, parent: ElementId, local: LocalElement) -> Result<ElementId, TreeError> {
        self.check_container(parent)?;
        let id = self.alloc(local);
        self.link_parent(id, parent);
        Ok(id)
    }

    /// Insert a new element with no parent.
    ///
    /// Its bounds are interpreted in window space. Attach it later with [`Tree::attach`],
    /// or keep it floating (popups stay floating for their whole life).
    pub fn insert_detached(&mut self, local: LocalElement) -> ElementId {
        self.alloc(local)
    }

    /// Attach a parentless element under the container `parent`.
    pub fn attach(&mut self, child: ElementId, parent: ElementId) -> Result<(), TreeError> {
        self.check(child)?;
        self.check_container(parent)?;
        if child == self.root {
            return Err(TreeError::Root);
        }
        if let Some(current) = self.node(child).parent {
            return Err(TreeError::AlreadyAttached {
                child,
                parent: current,
            });
        }
        if self.is_in_subtree(parent, child) {
            return Err(TreeError::Cycle { child, parent });
        }
        self.link_parent(child, parent);
        Ok(())
    }

    /// Detach an element from its parent, leaving it floating.
    ///
    /// Returns `Ok(false)` when it was already parentless.
    pub fn detach(&mut self, child: ElementId) -> Result<bool, TreeError> {
        self.check(child)?;
        if child == self.root {
            return Err(TreeError::Root);
        }
        match self.node(child).parent {
            Some(parent) => {
                self.unlink_parent(child, parent);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove an element and its subtree, returning every removed id (pre-order).
    pub fn remove(&mut self, id: ElementId) -> Result<Vec<ElementId>, TreeError> {
        self.check(id)?;
        if id == self.root {
            return Err(TreeError::Root);
        }
        if let Some(parent) = self.node(id).parent {
            self.unlink_parent(id, parent);
        }
        let removed: Vec<ElementId> = self.depth_first(id).collect();
        for dead in &removed {
            self.nodes[dead.idx()] = None;
            self.free_list.push(dead.idx());
        }
        Ok(removed)
    }

    /// Returns true if `id` refers to a live element of this tree.
    pub fn is_alive(&self, id: ElementId) -> bool {
        id.tree == self.stamp
            && self
                .nodes
                .get(id.idx())
                .and_then(|n| n.as_ref())
                .is_some_and(|n| n.generation == id.generation)
    }

    /// Local data of a live element.
    pub fn local(&self, id: ElementId) -> Option<&LocalElement> {
        self.node_opt(id).map(|n| &n.local)
    }

    /// Identifier of a live element.
    pub fn identifier(&self, id: ElementId) -> Option<&str> {
        self.node_opt(id).map(|n| n.local.identifier.as_str())
    }

    /// Parent-relative bounds of a live element.
    pub fn bounds(&self, id: ElementId) -> Option<Rect> {
        self.node_opt(id).map(|n| n.local.bounds)
    }

    /// Z-index of a live element.
    pub fn z_index(&self, id: ElementId) -> Option<i32> {
        self.node_opt(id).map(|n| n.local.z_index)
    }

    /// Flags of a live element.
    pub fn flags(&self, id: ElementId) -> Option<ElementFlags> {
        self.node_opt(id).map(|n| n.local.flags)
    }

    /// Whether a live element is a container.
    pub fn is_container(&self, id: ElementId) -> bool {
        self.node_opt(id)
            .is_some_and(|n| n.local.kind == ElementKind::Container)
    }

    /// Parent of a live element, or `None` for roots and stale ids.
    pub fn parent_of(&self, id: ElementId) -> Option<ElementId> {
        self.node_opt(id).and_then(|n| n.parent)
    }

    /// Children of an element, or an empty slice if the id is stale.
    pub fn children_of(&self, id: ElementId) -> &[ElementId] {
        self.node_opt(id).map_or(&[], |n| n.children.as_slice())
    }

    /// The parentless ancestor of `id` (the root, or a floating root).
    pub fn top_of(&self, id: ElementId) -> Option<ElementId> {
        self.ancestors(id).last()
    }

    /// Iterate `id` and then its ancestors, ending at its top.
    pub fn ancestors(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        let start = self.is_alive(id).then_some(id);
        core::iter::successors(start, move |&cur| self.parent_of(cur))
    }

    /// Whether `id` lies in the subtree rooted at `subtree` (inclusive).
    pub fn is_in_subtree(&self, id: ElementId, subtree: ElementId) -> bool {
        self.ancestors(id).any(|a| a == subtree)
    }

    /// Find the first live element with the given identifier.
    pub fn find_by_identifier(&self, identifier: &str) -> Option<ElementId> {
        self.nodes.iter().enumerate().find_map(|(idx, slot)| {
            let node = slot.as_ref()?;
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ElementId uses 32-bit slots."
            )]
            let slot = idx as u32;
            (node.local.identifier == identifier)
                .then(|| ElementId::new(slot, node.generation, self.stamp))
        })
    }

    /// Update parent-relative bounds.
    pub fn set_bounds(&mut self, id: ElementId, bounds: Rect) {
        if let Some(n) = self.node_opt_mut(id) {
            n.local.bounds = bounds;
        }
    }

    /// Update z-index.
    pub fn set_z_index(&mut self, id: ElementId, z_index: i32) {
        if let Some(n) = self.node_opt_mut(id) {
            n.local.z_index = z_index;
        }
    }

    /// Replace flags.
    pub fn set_flags(&mut self, id: ElementId, flags: ElementFlags) {
        if let Some(n) = self.node_opt_mut(id) {
            n.local.flags = flags;
        }
    }

    /// Show or hide an element (and with it, its subtree).
    pub fn set_visible(&mut self, id: ElementId, visible: bool) {
        if let Some(n) = self.node_opt_mut(id) {
            n.local.flags.set(ElementFlags::VISIBLE, visible);
        }
    }

    /// Enable or disable an element.
    pub fn set_disabled(&mut self, id: ElementId, disabled: bool) {
        if let Some(n) = self.node_opt_mut(id) {
            n.local.flags.set(ElementFlags::DISABLED, disabled);
        }
    }

    /// Whether the element and every ancestor are visible.
    pub fn is_effectively_visible(&self, id: ElementId) -> bool {
        self.is_alive(id)
            && self.ancestors(id).all(|a| {
                self.flags(a)
                    .is_some_and(|f| f.contains(ElementFlags::VISIBLE))
            })
    }

    /// Origin of an element in window coordinates.
    pub fn absolute_origin(&self, id: ElementId) -> Option<Point> {
        if !self.is_alive(id) {
            return None;
        }
        let mut origin = Point::ZERO;
        for a in self.ancestors(id) {
            origin += self.node(a).local.bounds.origin().to_vec2();
        }
        Some(origin)
    }

    /// Bounds of an element in window coordinates.
    pub fn absolute_bounds(&self, id: ElementId) -> Option<Rect> {
        let origin = self.absolute_origin(id)?;
        Some(Rect::from_origin_size(origin, self.node(id).local.bounds.size()))
    }

    /// Convert a window-space point into the element's local space.
    pub fn to_local(&self, id: ElementId, window_point: Point) -> Option<Point> {
        let origin = self.absolute_origin(id)?;
        Some(window_point - origin.to_vec2())
    }

    /// Find the deepest element under `point` (window space) in the subtree of `from`.
    pub fn hit_test(&self, from: ElementId, point: Point, filter: QueryFilter) -> Option<Hit> {
        if !self.is_alive(from) {
            return None;
        }
        let parent_origin = match self.parent_of(from) {
            Some(p) => self.absolute_origin(p)?,
            None => Point::ZERO,
        };
        let mut path = SmallVec::new();
        if self.hit_walk(from, point - parent_origin.to_vec2(), filter, &mut path) {
            let element = *path.last()?;
            Some(Hit { element, path })
        } else {
            None
        }
    }

    fn hit_walk(
        &self,
        id: ElementId,
        point: Point,
        filter: QueryFilter,
        path: &mut SmallVec<[ElementId; 8]>,
    ) -> bool {
        let node = self.node(id);
        let flags = node.local.flags;
        if !flags.contains(ElementFlags::VISIBLE) {
            return false;
        }
        let inside = node.local.bounds.contains(point);
        if flags.contains(ElementFlags::CLIP_TO_BOUNDS) && !inside {
            return false;
        }
        path.push(id);
        let local = point - node.local.bounds.origin().to_vec2();
        for child in self.front_to_back(id) {
            if self.hit_walk(child, local, filter, path) {
                return true;
            }
        }
        if inside && filter.matches(flags) {
            return true;
        }
        path.pop();
        false
    }

    /// Children of `id` in hit order: higher z first, then later siblings first.
    pub fn front_to_back(&self, id: ElementId) -> SmallVec<[ElementId; 16]> {
        let mut order: SmallVec<[ElementId; 16]> =
            self.children_of(id).iter().rev().copied().collect();
        order.sort_by_key(|&c| core::cmp::Reverse(self.node(c).local.z_index));
        order
    }

    /// Children of `id` in paint order: lower z first, then earlier siblings first.
    pub fn paint_order(&self, id: ElementId) -> SmallVec<[ElementId; 16]> {
        let mut order: SmallVec<[ElementId; 16]> = self.children_of(id).iter().copied().collect();
        order.sort_by_key(|&c| self.node(c).local.z_index);
        order
    }

    /// Pre-order depth-first iterator over the subtree rooted at `from`.
    pub fn depth_first(&self, from: ElementId) -> DepthFirst<'_> {
        let mut stack = Vec::new();
        if self.is_alive(from) {
            stack.push(from);
        }
        DepthFirst { tree: self, stack }
    }

    /// Get the next element in depth-first order, or `None` at the end of the subtree
    /// containing `current` (or if `current` is stale). Does not wrap.
    pub fn next_depth_first(&self, current: ElementId) -> Option<ElementId> {
        if !self.is_alive(current) {
            return None;
        }
        if let Some(&first_child) = self.node(current).children.first() {
            return Some(first_child);
        }
        let mut node = current;
        while let Some(parent) = self.parent_of(node) {
            if let Some(next_sibling) = self.next_sibling(node) {
                return Some(next_sibling);
            }
            node = parent;
        }
        None
    }

    /// Get the previous element in depth-first order. Does not wrap.
    pub fn prev_depth_first(&self, current: ElementId) -> Option<ElementId> {
        if !self.is_alive(current) {
            return None;
        }
        if let Some(prev_sibling) = self.prev_sibling(current) {
            return Some(self.last_in_subtree(prev_sibling));
        }
        self.parent_of(current)
    }

    fn next_sibling(&self, node: ElementId) -> Option<ElementId> {
        let siblings = &self.node(self.parent_of(node)?).children;
        let pos = siblings.iter().position(|&id| id == node)?;
        siblings.get(pos + 1).copied()
    }

    fn prev_sibling(&self, node: ElementId) -> Option<ElementId> {
        let siblings = &self.node(self.parent_of(node)?).children;
        let pos = siblings.iter().position(|&id| id == node)?;
        pos.checked_sub(1).and_then(|p| siblings.get(p).copied())
    }

    fn last_in_subtree(&self, mut node: ElementId) -> ElementId {
        while let Some(&last) = self.node(node).children.last() {
            node = last;
        }
        node
    }

    // --- internals ---

    fn check(&self, id: ElementId) -> Result<(), TreeError> {
        if id.tree != self.stamp {
            return Err(TreeError::Foreign(id));
        }
        if !self.is_alive(id) {
            return Err(TreeError::Stale(id));
        }
        Ok(())
    }

    fn check_container(&self, id: ElementId) -> Result<(), TreeError> {
        self.check(id)?;
        if !self.is_container(id) {
            return Err(TreeError::NotAContainer(id));
        }
        Ok(())
    }

    fn node(&self, id: ElementId) -> &Node {
        self.nodes[id.idx()]
            .as_ref()
            .expect("live ids always point at an occupied slot")
    }

    fn node_mut(&mut self, id: ElementId) -> &mut Node {
        self.nodes[id.idx()]
            .as_mut()
            .expect("live ids always point at an occupied slot")
    }

    fn node_opt(&self, id: ElementId) -> Option<&Node> {
        if !self.is_alive(id) {
            return None;
        }
        self.nodes.get(id.idx())?.as_ref()
    }

    fn node_opt_mut(&mut self, id: ElementId) -> Option<&mut Node> {
        if !self.is_alive(id) {
            return None;
        }
        self.nodes.get_mut(id.idx())?.as_mut()
    }

    fn link_parent(&mut self, id: ElementId, parent: ElementId) {
        self.node_mut(parent).children.push(id);
        self.node_mut(id).parent = Some(parent);
    }

    fn unlink_parent(&mut self, id: ElementId, parent: ElementId) {
        self.node_mut(parent).children.retain(|c| *c != id);
        self.node_mut(id).parent = None;
    }
}

/// Pre-order depth-first iterator returned by [`Tree::depth_first`].
#[derive(Debug)]
pub struct DepthFirst<'a> {
    tree: &'a Tree,
    stack: Vec<ElementId>,
}

impl Iterator for DepthFirst<'_> {
    type Item = ElementId;

    fn next(&mut self) -> Option<ElementId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children_of(id).iter().rev().copied());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn window() -> Tree {
        Tree::new(LocalElement::container(
            "window",
            Rect::new(0.0, 0.0, 400.0, 300.0),
        ))
    }

    #[test]
    fn insert_and_hit_test() {
        let mut tree = window();
        let root = tree.root();
        let _a = tree
            .insert(root, LocalElement::leaf("a", Rect::new(10.0, 10.0, 60.0, 60.0)))
            .unwrap();
        let b = tree
            .insert(
                root,
                LocalElement::leaf("b", Rect::new(40.0, 40.0, 120.0, 120.0)).with_z_index(10),
            )
            .unwrap();

        let hit = tree
            .hit_test(root, Point::new(50.0, 50.0), QueryFilter::new().visible())
            .unwrap();
        assert_eq!(hit.element, b, "topmost by z should win");
        assert_eq!(hit.path.first().copied(), Some(root));
        assert_eq!(hit.path.last().copied(), Some(b));
    }

    #[test]
    fn empty_filter_accepts_plain_visible_elements() {
        let filter = QueryFilter::new();
        assert!(filter.matches(ElementFlags::VISIBLE));
        assert!(filter.matches(ElementFlags::VISIBLE | ElementFlags::DISABLED));
        assert!(!filter.enabled().matches(ElementFlags::VISIBLE | ElementFlags::DISABLED));

        let tree = window();
        let root = tree.root();
        let hit = tree.hit_test(root, Point::new(5.0, 5.0), QueryFilter::new());
        assert_eq!(hit.map(|h| h.element), Some(root));
    }

    #[test]
    fn later_sibling_wins_at_equal_z() {
        let mut tree = window();
        let root = tree.root();
        let _first = tree
            .insert(root, LocalElement::leaf("first", Rect::new(0.0, 0.0, 50.0, 50.0)))
            .unwrap();
        let second = tree
            .insert(root, LocalElement::leaf("second", Rect::new(0.0, 0.0, 50.0, 50.0)))
            .unwrap();
        let hit = tree
            .hit_test(root, Point::new(5.0, 5.0), QueryFilter::new())
            .unwrap();
        assert_eq!(hit.element, second);
    }

    #[test]
    fn deeper_element_wins_over_container() {
        let mut tree = window();
        let root = tree.root();
        let panel = tree
            .insert(
                root,
                LocalElement::container("panel", Rect::new(100.0, 100.0, 300.0, 200.0)),
            )
            .unwrap();
        let child = tree
            .insert(panel, LocalElement::leaf("child", Rect::new(10.0, 10.0, 50.0, 50.0)))
            .unwrap();
        let hit = tree
            .hit_test(root, Point::new(120.0, 120.0), QueryFilter::new())
            .unwrap();
        assert_eq!(hit.element, child);
        assert_eq!(hit.path.as_slice(), &[root, panel, child]);

        // Inside the panel but not the child.
        let hit = tree
            .hit_test(root, Point::new(250.0, 180.0), QueryFilter::new())
            .unwrap();
        assert_eq!(hit.element, panel);
    }

    #[test]
    fn clip_to_bounds_blocks_overflowing_children() {
        let mut tree = window();
        let root = tree.root();
        let open = tree
            .insert(root, LocalElement::container("open", Rect::new(0.0, 0.0, 50.0, 50.0)))
            .unwrap();
        let spill = tree
            .insert(open, LocalElement::leaf("spill", Rect::new(40.0, 40.0, 90.0, 90.0)))
            .unwrap();
        let hit = tree
            .hit_test(root, Point::new(70.0, 70.0), QueryFilter::new())
            .unwrap();
        assert_eq!(hit.element, spill, "non-clipping containers let children overflow");

        tree.set_flags(open, ElementFlags::VISIBLE | ElementFlags::CLIP_TO_BOUNDS);
        let hit = tree
            .hit_test(root, Point::new(70.0, 70.0), QueryFilter::new())
            .unwrap();
        assert_eq!(hit.element, root, "clipped overflow falls through to the root");
    }

    #[test]
    fn invisible_subtree_is_skipped() {
        let mut tree = window();
        let root = tree.root();
        let panel = tree
            .insert(root, LocalElement::container("panel", Rect::new(0.0, 0.0, 100.0, 100.0)))
            .unwrap();
        let child = tree
            .insert(panel, LocalElement::leaf("child", Rect::new(0.0, 0.0, 100.0, 100.0)))
            .unwrap();
        tree.set_visible(panel, false);
        let hit = tree
            .hit_test(root, Point::new(10.0, 10.0), QueryFilter::new().visible())
            .unwrap();
        assert_eq!(hit.element, root);
        assert!(!tree.is_effectively_visible(child));
    }

    #[test]
    fn filter_selects_candidate_but_walk_descends() {
        let mut tree = window();
        let root = tree.root();
        let panel = tree
            .insert(root, LocalElement::container("panel", Rect::new(0.0, 0.0, 100.0, 100.0)))
            .unwrap();
        let field = tree
            .insert(
                panel,
                LocalElement::leaf("field", Rect::new(10.0, 10.0, 90.0, 30.0)).focusable(),
            )
            .unwrap();
        let filter = QueryFilter::new().visible().focusable();
        assert_eq!(
            tree.hit_test(root, Point::new(20.0, 20.0), filter)
                .map(|h| h.element),
            Some(field)
        );
        assert!(tree.hit_test(root, Point::new(20.0, 50.0), filter).is_none());
    }

    #[test]
    fn attach_rejections() {
        let mut tree = window();
        let root = tree.root();
        let leaf = tree
            .insert(root, LocalElement::leaf("leaf", Rect::new(0.0, 0.0, 10.0, 10.0)))
            .unwrap();
        let panel = tree
            .insert(root, LocalElement::container("panel", Rect::new(0.0, 0.0, 10.0, 10.0)))
            .unwrap();

        assert_eq!(
            tree.attach(leaf, panel),
            Err(TreeError::AlreadyAttached {
                child: leaf,
                parent: root
            })
        );
        assert_eq!(
            tree.attach(leaf, root),
            Err(TreeError::AlreadyAttached {
                child: leaf,
                parent: root
            }),
            "attaching to the container that already has it is rejected"
        );

        let floating = tree.insert_detached(LocalElement::leaf("floating", Rect::ZERO));
        assert_eq!(tree.attach(floating, leaf), Err(TreeError::NotAContainer(leaf)));
        assert_eq!(tree.attach(root, panel), Err(TreeError::Root));

        assert!(tree.detach(panel).unwrap());
        let inner = tree
            .insert(panel, LocalElement::container("inner", Rect::ZERO))
            .unwrap();
        assert_eq!(
            tree.attach(panel, inner),
            Err(TreeError::Cycle {
                child: panel,
                parent: inner
            })
        );

        let other = window();
        assert_eq!(
            tree.attach(other.root(), panel),
            Err(TreeError::Foreign(other.root()))
        );

        assert!(tree.attach(floating, panel).is_ok());
        assert_eq!(tree.parent_of(floating), Some(panel));
    }

    #[test]
    fn remove_returns_subtree_and_reuses_slots() {
        let mut tree = window();
        let root = tree.root();
        let panel = tree
            .insert(root, LocalElement::container("panel", Rect::ZERO))
            .unwrap();
        let a = tree.insert(panel, LocalElement::leaf("a", Rect::ZERO)).unwrap();
        let b = tree.insert(panel, LocalElement::leaf("b", Rect::ZERO)).unwrap();

        let removed = tree.remove(panel).unwrap();
        assert_eq!(removed, vec![panel, a, b]);
        assert!(!tree.is_alive(a));
        assert!(tree.children_of(root).is_empty());
        assert_eq!(tree.remove(root), Err(TreeError::Root));
        assert_eq!(tree.remove(a), Err(TreeError::Stale(a)));

        let reused = tree.insert(root, LocalElement::leaf("c", Rect::ZERO)).unwrap();
        assert!(tree.is_alive(reused));
        assert!(!tree.is_alive(b), "old generations stay stale after slot reuse");
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn absolute_geometry_follows_parent_moves() {
        let mut tree = window();
        let root = tree.root();
        let panel = tree
            .insert(root, LocalElement::container("panel", Rect::new(20.0, 20.0, 220.0, 120.0)))
            .unwrap();
        let child = tree
            .insert(panel, LocalElement::leaf("child", Rect::new(5.0, 5.0, 25.0, 15.0)))
            .unwrap();
        assert_eq!(tree.absolute_origin(child), Some(Point::new(25.0, 25.0)));

        tree.set_bounds(panel, Rect::new(100.0, 0.0, 300.0, 100.0));
        assert_eq!(
            tree.absolute_bounds(child),
            Some(Rect::new(105.0, 5.0, 125.0, 15.0))
        );
        let hit = tree
            .hit_test(panel, Point::new(110.0, 10.0), QueryFilter::new())
            .unwrap();
        assert_eq!(hit.element, child, "hit testing from a nested start uses window space");
    }

    #[test]
    fn depth_first_traversal() {
        let mut tree = window();
        let root = tree.root();
        let a = tree.insert(root, LocalElement::container("a", Rect::ZERO)).unwrap();
        let a1 = tree.insert(a, LocalElement::leaf("a1", Rect::ZERO)).unwrap();
        let b = tree.insert(root, LocalElement::leaf("b", Rect::ZERO)).unwrap();

        let order: Vec<_> = tree.depth_first(root).collect();
        assert_eq!(order, vec![root, a, a1, b]);
        assert_eq!(tree.next_depth_first(a1), Some(b));
        assert_eq!(tree.next_depth_first(b), None);
        assert_eq!(tree.prev_depth_first(b), Some(a1));
        assert_eq!(tree.prev_depth_first(a), Some(root));
        assert_eq!(tree.find_by_identifier("a1"), Some(a1));
        assert_eq!(tree.top_of(a1), Some(root));
    }

    #[test]
    fn paint_and_hit_orders_are_mirrors() {
        let mut tree = window();
        let root = tree.root();
        let low = tree
            .insert(root, LocalElement::leaf("low", Rect::ZERO).with_z_index(-1))
            .unwrap();
        let x = tree.insert(root, LocalElement::leaf("x", Rect::ZERO)).unwrap();
        let y = tree.insert(root, LocalElement::leaf("y", Rect::ZERO)).unwrap();
        assert_eq!(tree.paint_order(root).as_slice(), &[low, x, y]);
        assert_eq!(tree.front_to_back(root).as_slice(), &[y, x, low]);
    }
}
