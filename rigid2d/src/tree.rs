// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Dynamic AABB tree
//!
//! A balanced bounding-volume hierarchy mapping proxy ids to fattened
//! bounding boxes and opaque payloads. Leaves hold proxies; internal nodes
//! hold the union of their children. The tree knows nothing about physics:
//! the broadphase stores fixture handles as payloads, other callers may store
//! anything `Copy`.
//!
//! # Fat AABBs
//!
//! Every leaf box is the caller's tight box grown by
//! [`AABB_EXTENSION`](crate::config::settings::AABB_EXTENSION) and, when it
//! moves, extended along the predicted displacement. Moves that stay inside
//! the fat box are free; only escaping proxies are re-inserted.
//!
//! # Balance
//!
//! Insertion picks a sibling with the perimeter (2D surface-area) heuristic
//! and every structural change walks back to the root applying AVL-style
//! rotations, which keeps the height logarithmic and queries at
//! O(log n + k).

use crate::config::settings::{AABB_EXTENSION, AABB_MULTIPLIER};
use crate::math::{Aabb, RayCastInput, Vec2};

const NULL_NODE: usize = usize::MAX;

/// Identifier of a leaf in a [`DynamicTree`]
///
/// Node slots are recycled; the generation makes an id held past
/// [`DynamicTree::remove`] stop resolving instead of aliasing whatever
/// leaf reuses the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyId {
    index: u32,
    generation: u32,
}

impl ProxyId {
    /// Placeholder for a fixture whose proxy is not created yet
    pub(crate) const NULL: ProxyId = ProxyId {
        index: u32::MAX,
        generation: 0,
    };

    /// Raw node index
    pub fn raw(&self) -> u32 {
        self.index
    }

    /// Generation of the node slot when the proxy was created
    pub fn generation(&self) -> u32 {
        self.generation
    }

    fn node(&self) -> usize {
        self.index as usize
    }
}

#[derive(Debug, Clone)]
struct TreeNode<T> {
    aabb: Aabb,
    payload: Option<T>,
    parent: usize,
    child1: usize,
    child2: usize,
    /// Leaf = 0, free node = -1
    height: i32,
    /// Bumped every time the slot is freed
    generation: u32,
}

impl<T> TreeNode<T> {
    fn empty() -> Self {
        TreeNode {
            aabb: Aabb::default(),
            payload: None,
            parent: NULL_NODE,
            child1: NULL_NODE,
            child2: NULL_NODE,
            height: -1,
            generation: 0,
        }
    }

    fn is_leaf(&self) -> bool {
        self.child1 == NULL_NODE
    }
}

/// Balanced AABB tree keyed by [`ProxyId`]
///
/// # Examples
///
/// ```
/// use rigid2d::math::{Aabb, Vec2};
/// use rigid2d::tree::DynamicTree;
///
/// let mut tree = DynamicTree::new();
/// let id = tree.insert(Aabb::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0)), "crate");
///
/// let mut hits = Vec::new();
/// tree.query(&Aabb::new(Vec2::new(0.5, 0.5), Vec2::new(2.0, 2.0)), |proxy| {
///     hits.push(proxy);
///     true
/// });
/// assert_eq!(hits, vec![id]);
/// assert_eq!(*tree.payload(id), "crate");
/// ```
#[derive(Debug, Clone)]
pub struct DynamicTree<T: Copy> {
    nodes: Vec<TreeNode<T>>,
    free_list: Vec<usize>,
    root: usize,
    proxy_count: usize,
}

impl<T: Copy> DynamicTree<T> {
    /// Create an empty tree
    pub fn new() -> Self {
        DynamicTree {
            nodes: Vec::with_capacity(16),
            free_list: Vec::new(),
            root: NULL_NODE,
            proxy_count: 0,
        }
    }

    /// Insert a proxy for `aabb`, fattened by the standard margin
    pub fn insert(&mut self, aabb: Aabb, payload: T) -> ProxyId {
        let id = self.allocate_node();
        {
            let node = &mut self.nodes[id];
            node.aabb = aabb.expanded(AABB_EXTENSION);
            node.payload = Some(payload);
            node.height = 0;
        }
        self.insert_leaf(id);
        self.proxy_count += 1;
        self.proxy_id(id)
    }

    /// Remove a proxy
    ///
    /// # Panics
    ///
    /// Panics if `proxy` is not a live leaf of this tree.
    pub fn remove(&mut self, proxy: ProxyId) {
        let id = self.checked_leaf(proxy);
        self.remove_leaf(id);
        self.free_node(id);
        self.proxy_count -= 1;
    }

    /// Move a proxy to a new tight AABB
    ///
    /// Does nothing and returns `false` while the fat AABB still contains
    /// `aabb`. Otherwise the proxy is re-inserted with a fresh fat AABB that
    /// is extended along `displacement`, and `true` is returned so the
    /// caller can look for new pairs.
    ///
    /// # Panics
    ///
    /// Panics if `proxy` is not a live leaf of this tree.
    pub fn move_proxy(&mut self, proxy: ProxyId, aabb: Aabb, displacement: Vec2) -> bool {
        let id = self.checked_leaf(proxy);
        if self.nodes[id].aabb.contains(&aabb) {
            return false;
        }

        self.remove_leaf(id);

        let mut fat = aabb.expanded(AABB_EXTENSION);
        let d = displacement * AABB_MULTIPLIER;
        if d.x < 0.0 {
            fat.lower.x += d.x;
        } else {
            fat.upper.x += d.x;
        }
        if d.y < 0.0 {
            fat.lower.y += d.y;
        } else {
            fat.upper.y += d.y;
        }
        self.nodes[id].aabb = fat;

        self.insert_leaf(id);
        true
    }

    /// Payload stored with a proxy
    pub fn payload(&self, proxy: ProxyId) -> &T {
        let id = self.checked_leaf(proxy);
        match &self.nodes[id].payload {
            Some(payload) => payload,
            None => unreachable!("leaf without payload"),
        }
    }

    /// Fat AABB of a proxy
    pub fn fat_aabb(&self, proxy: ProxyId) -> Aabb {
        self.nodes[self.checked_leaf(proxy)].aabb
    }

    /// Whether the fat AABBs of two proxies overlap
    pub fn test_overlap(&self, a: ProxyId, b: ProxyId) -> bool {
        self.fat_aabb(a).overlaps(&self.fat_aabb(b))
    }

    /// Whether `proxy` refers to a live leaf
    pub fn contains(&self, proxy: ProxyId) -> bool {
        self.nodes
            .get(proxy.node())
            .map(|n| n.height == 0 && n.payload.is_some() && n.generation == proxy.generation)
            .unwrap_or(false)
    }

    /// Number of live proxies
    pub fn proxy_count(&self) -> usize {
        self.proxy_count
    }

    /// Height of the tree, 0 for an empty tree or a single leaf
    pub fn height(&self) -> i32 {
        if self.root == NULL_NODE {
            0
        } else {
            self.nodes[self.root].height
        }
    }

    /// Largest height difference between the children of any internal node
    pub fn max_balance(&self) -> i32 {
        self.nodes
            .iter()
            .filter(|n| n.height > 1)
            .map(|n| (self.nodes[n.child2].height - self.nodes[n.child1].height).abs())
            .max()
            .unwrap_or(0)
    }

    /// Visit every proxy whose fat AABB overlaps `aabb`
    ///
    /// The visitor returns `false` to stop the traversal early.
    pub fn query<F>(&self, aabb: &Aabb, mut visit: F)
    where
        F: FnMut(ProxyId) -> bool,
    {
        if self.root == NULL_NODE {
            return;
        }
        let mut stack = Vec::with_capacity(64);
        stack.push(self.root);

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if !node.aabb.overlaps(aabb) {
                continue;
            }
            if node.is_leaf() {
                if !visit(self.proxy_id(id)) {
                    return;
                }
            } else {
                stack.push(node.child1);
                stack.push(node.child2);
            }
        }
    }

    /// Cast a segment against the proxies' fat AABBs
    ///
    /// The visitor receives the current (possibly clipped) input and the
    /// proxy, and returns: `0` to stop, a negative value to ignore the
    /// proxy, or a fraction to clip the segment to.
    pub fn ray_cast<F>(&self, input: &RayCastInput, mut visit: F)
    where
        F: FnMut(&RayCastInput, ProxyId) -> f64,
    {
        if self.root == NULL_NODE {
            return;
        }
        let p1 = input.p1;
        let p2 = input.p2;
        let r = (p2 - p1).normalize();
        if r == Vec2::ZERO {
            return;
        }

        // Separating axis for the segment
        let v = Vec2::scalar_cross(1.0, r);
        let abs_v = v.abs();

        let mut max_fraction = input.max_fraction;
        let segment_aabb = |fraction: f64| {
            let t = p1 + (p2 - p1) * fraction;
            Aabb::new(p1.min(t), p1.max(t))
        };
        let mut seg = segment_aabb(max_fraction);

        let mut stack = Vec::with_capacity(64);
        stack.push(self.root);

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if !node.aabb.overlaps(&seg) {
                continue;
            }

            let c = node.aabb.center();
            let h = node.aabb.extents();
            let separation = v.dot(p1 - c).abs() - abs_v.dot(h);
            if separation > 0.0 {
                continue;
            }

            if node.is_leaf() {
                let sub = RayCastInput {
                    p1,
                    p2,
                    max_fraction,
                };
                let value = visit(&sub, self.proxy_id(id));
                if value == 0.0 {
                    return;
                }
                if value > 0.0 {
                    max_fraction = value;
                    seg = segment_aabb(max_fraction);
                }
            } else {
                stack.push(node.child1);
                stack.push(node.child2);
            }
        }
    }

    /// Check structural invariants, returning a description of the first violation
    pub fn validate(&self) -> Result<(), String> {
        if self.root != NULL_NODE && self.nodes[self.root].parent != NULL_NODE {
            return Err("root has a parent".into());
        }
        let mut leaves = 0;
        self.validate_node(self.root, &mut leaves)?;
        if leaves != self.proxy_count {
            return Err(format!(
                "found {} leaves but {} proxies are registered",
                leaves, self.proxy_count
            ));
        }
        let live = self.nodes.len() - self.free_list.len();
        let expected = if leaves == 0 { 0 } else { 2 * leaves - 1 };
        if live != expected {
            return Err(format!("{} live nodes for {} leaves", live, leaves));
        }
        Ok(())
    }

    fn validate_node(&self, id: usize, leaves: &mut usize) -> Result<(), String> {
        if id == NULL_NODE {
            return Ok(());
        }
        let node = &self.nodes[id];
        if node.is_leaf() {
            if node.child2 != NULL_NODE || node.height != 0 || node.payload.is_none() {
                return Err(format!("malformed leaf {}", id));
            }
            *leaves += 1;
            return Ok(());
        }

        let (c1, c2) = (node.child1, node.child2);
        if self.nodes[c1].parent != id || self.nodes[c2].parent != id {
            return Err(format!("children of node {} have wrong parent", id));
        }
        let height = 1 + self.nodes[c1].height.max(self.nodes[c2].height);
        if node.height != height {
            return Err(format!("node {} height {} != {}", id, node.height, height));
        }
        let aabb = self.nodes[c1].aabb.union(&self.nodes[c2].aabb);
        if aabb != node.aabb {
            return Err(format!("node {} does not bound its children", id));
        }
        self.validate_node(c1, leaves)?;
        self.validate_node(c2, leaves)
    }

    fn checked_leaf(&self, proxy: ProxyId) -> usize {
        let id = proxy.node();
        assert!(
            self.contains(proxy),
            "proxy {:?} is not a live leaf of this tree",
            proxy
        );
        id
    }

    fn proxy_id(&self, id: usize) -> ProxyId {
        ProxyId {
            index: id as u32,
            generation: self.nodes[id].generation,
        }
    }

    fn allocate_node(&mut self) -> usize {
        if let Some(id) = self.free_list.pop() {
            let generation = self.nodes[id].generation;
            self.nodes[id] = TreeNode {
                generation,
                ..TreeNode::empty()
            };
            return id;
        }
        self.nodes.push(TreeNode::empty());
        self.nodes.len() - 1
    }

    fn free_node(&mut self, id: usize) {
        let generation = self.nodes[id].generation.wrapping_add(1);
        self.nodes[id] = TreeNode {
            generation,
            ..TreeNode::empty()
        };
        self.free_list.push(id);
    }

    fn insert_leaf(&mut self, leaf: usize) {
        if self.root == NULL_NODE {
            self.root = leaf;
            self.nodes[leaf].parent = NULL_NODE;
            return;
        }

        // Find the best sibling
        let leaf_aabb = self.nodes[leaf].aabb;
        let mut index = self.root;
        while !self.nodes[index].is_leaf() {
            let child1 = self.nodes[index].child1;
            let child2 = self.nodes[index].child2;

            let area = self.nodes[index].aabb.perimeter();
            let combined_area = self.nodes[index].aabb.union(&leaf_aabb).perimeter();

            // Cost of creating a new parent for this node and the new leaf
            let cost = 2.0 * combined_area;
            // Minimum cost of pushing the leaf further down the tree
            let inheritance = 2.0 * (combined_area - area);

            let cost1 = self.descend_cost(child1, &leaf_aabb) + inheritance;
            let cost2 = self.descend_cost(child2, &leaf_aabb) + inheritance;

            if cost < cost1 && cost < cost2 {
                break;
            }
            index = if cost1 < cost2 { child1 } else { child2 };
        }
        let sibling = index;

        let old_parent = self.nodes[sibling].parent;
        let new_parent = self.allocate_node();
        {
            let sibling_aabb = self.nodes[sibling].aabb;
            let sibling_height = self.nodes[sibling].height;
            let node = &mut self.nodes[new_parent];
            node.parent = old_parent;
            node.aabb = leaf_aabb.union(&sibling_aabb);
            node.height = sibling_height + 1;
            node.child1 = sibling;
            node.child2 = leaf;
        }
        if old_parent != NULL_NODE {
            self.replace_child(old_parent, sibling, new_parent);
        } else {
            self.root = new_parent;
        }
        self.nodes[sibling].parent = new_parent;
        self.nodes[leaf].parent = new_parent;

        self.refit_upwards(self.nodes[leaf].parent);
    }

    fn descend_cost(&self, child: usize, leaf_aabb: &Aabb) -> f64 {
        let node = &self.nodes[child];
        let combined = leaf_aabb.union(&node.aabb).perimeter();
        if node.is_leaf() {
            combined
        } else {
            combined - node.aabb.perimeter()
        }
    }

    fn remove_leaf(&mut self, leaf: usize) {
        if leaf == self.root {
            self.root = NULL_NODE;
            return;
        }

        let parent = self.nodes[leaf].parent;
        let grand_parent = self.nodes[parent].parent;
        let sibling = if self.nodes[parent].child1 == leaf {
            self.nodes[parent].child2
        } else {
            self.nodes[parent].child1
        };

        if grand_parent != NULL_NODE {
            self.replace_child(grand_parent, parent, sibling);
            self.nodes[sibling].parent = grand_parent;
            self.free_node(parent);
            self.refit_upwards(grand_parent);
        } else {
            self.root = sibling;
            self.nodes[sibling].parent = NULL_NODE;
            self.free_node(parent);
        }
        self.nodes[leaf].parent = NULL_NODE;
    }

    fn replace_child(&mut self, parent: usize, old: usize, new: usize) {
        let node = &mut self.nodes[parent];
        if node.child1 == old {
            node.child1 = new;
        } else {
            debug_assert_eq!(node.child2, old);
            node.child2 = new;
        }
    }

    fn refit_upwards(&mut self, start: usize) {
        let mut index = start;
        while index != NULL_NODE {
            index = self.balance(index);

            let child1 = self.nodes[index].child1;
            let child2 = self.nodes[index].child2;
            let height = 1 + self.nodes[child1].height.max(self.nodes[child2].height);
            let aabb = self.nodes[child1].aabb.union(&self.nodes[child2].aabb);
            self.nodes[index].height = height;
            self.nodes[index].aabb = aabb;

            index = self.nodes[index].parent;
        }
    }

    /// Rotate `a` if its children's heights differ by more than one,
    /// returning the index of the new subtree root
    fn balance(&mut self, a: usize) -> usize {
        if self.nodes[a].is_leaf() || self.nodes[a].height < 2 {
            return a;
        }

        let b = self.nodes[a].child1;
        let c = self.nodes[a].child2;
        let balance = self.nodes[c].height - self.nodes[b].height;

        if balance > 1 {
            self.rotate_up(a, c, b, false)
        } else if balance < -1 {
            self.rotate_up(a, b, c, true)
        } else {
            a
        }
    }

    /// Promote `up` (a child of `a`) to take `a`'s place; `other` is `a`'s
    /// remaining child. `up_is_child1` says which slot of `a` `up` occupied.
    fn rotate_up(&mut self, a: usize, up: usize, other: usize, up_is_child1: bool) -> usize {
        let f = self.nodes[up].child1;
        let g = self.nodes[up].child2;

        // Swap a and up
        self.nodes[up].child1 = a;
        self.nodes[up].parent = self.nodes[a].parent;
        self.nodes[a].parent = up;

        let up_parent = self.nodes[up].parent;
        if up_parent != NULL_NODE {
            self.replace_child(up_parent, a, up);
        } else {
            self.root = up;
        }

        // Keep the taller grandchild under `up`, hand the shorter one to `a`
        let (keep, give) = if self.nodes[f].height > self.nodes[g].height {
            (f, g)
        } else {
            (g, f)
        };
        self.nodes[up].child2 = keep;
        if up_is_child1 {
            self.nodes[a].child1 = give;
        } else {
            self.nodes[a].child2 = give;
        }
        self.nodes[give].parent = a;

        let a_aabb = self.nodes[other].aabb.union(&self.nodes[give].aabb);
        let a_height = 1 + self.nodes[other].height.max(self.nodes[give].height);
        self.nodes[a].aabb = a_aabb;
        self.nodes[a].height = a_height;

        self.nodes[up].aabb = a_aabb.union(&self.nodes[keep].aabb);
        self.nodes[up].height = 1 + a_height.max(self.nodes[keep].height);

        up
    }
}

impl<T: Copy> Default for DynamicTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic scatter of boxes without pulling in an RNG
    fn scattered_box(i: usize) -> Aabb {
        let x = ((i * 7919) % 1000) as f64 * 0.37 - 180.0;
        let y = ((i * 104_729) % 997) as f64 * 0.41 - 200.0;
        let w = 0.2 + (i % 5) as f64 * 0.3;
        Aabb::from_center(Vec2::new(x, y), Vec2::new(w, w * 0.5))
    }

    #[test]
    fn test_full_extent_query_returns_each_proxy_once() {
        let mut tree = DynamicTree::new();
        let n = 500;
        let ids: Vec<ProxyId> = (0..n).map(|i| tree.insert(scattered_box(i), i)).collect();
        tree.validate().unwrap();

        let everything = Aabb::new(Vec2::new(-1e4, -1e4), Vec2::new(1e4, 1e4));
        let mut found = Vec::new();
        tree.query(&everything, |proxy| {
            found.push(proxy);
            true
        });
        found.sort();
        let mut expected = ids.clone();
        expected.sort();
        assert_eq!(found, expected);

        // Remove a proxy and make sure it disappears from queries
        tree.remove(ids[42]);
        tree.validate().unwrap();
        let mut found = Vec::new();
        tree.query(&everything, |proxy| {
            found.push(proxy);
            true
        });
        assert_eq!(found.len(), n - 1);
        assert!(!found.contains(&ids[42]));
    }

    #[test]
    fn test_height_stays_logarithmic() {
        let mut tree = DynamicTree::new();
        // Sorted insertion is the worst case for an unbalanced tree
        for i in 0..1024 {
            let c = Vec2::new(i as f64, 0.0);
            tree.insert(Aabb::from_center(c, Vec2::new(0.4, 0.4)), i);
        }
        tree.validate().unwrap();
        // A perfectly balanced tree has height 10
        assert!(tree.height() <= 20, "height {}", tree.height());
    }

    #[test]
    fn test_small_moves_keep_fat_aabb() {
        let mut tree = DynamicTree::new();
        let aabb = Aabb::from_center(Vec2::ZERO, Vec2::new(0.5, 0.5));
        let id = tree.insert(aabb, ());

        let nudged = Aabb::from_center(Vec2::new(0.05, 0.0), Vec2::new(0.5, 0.5));
        assert!(!tree.move_proxy(id, nudged, Vec2::new(0.05, 0.0)));

        let far = Aabb::from_center(Vec2::new(3.0, 0.0), Vec2::new(0.5, 0.5));
        assert!(tree.move_proxy(id, far, Vec2::new(3.0, 0.0)));
        let fat = tree.fat_aabb(id);
        assert!(fat.contains(&far));
        // Predictive extension in the direction of travel only
        assert!(fat.upper.x > far.upper.x + 3.0);
        assert!((fat.lower.x - (far.lower.x - AABB_EXTENSION)).abs() < 1e-12);
        tree.validate().unwrap();
    }

    #[test]
    fn test_degenerate_aabb_gets_margin() {
        let mut tree = DynamicTree::new();
        let point = Aabb::new(Vec2::new(1.0, 1.0), Vec2::new(1.0, 1.0));
        let id = tree.insert(point, ());
        let fat = tree.fat_aabb(id);
        assert!(fat.extents().x >= AABB_EXTENSION);
        assert!(fat.extents().y >= AABB_EXTENSION);
    }

    #[test]
    fn test_ray_cast_visits_crossed_proxies() {
        let mut tree = DynamicTree::new();
        let hit = tree.insert(Aabb::from_center(Vec2::new(5.0, 0.0), Vec2::new(1.0, 1.0)), 1);
        let _miss = tree.insert(Aabb::from_center(Vec2::new(5.0, 10.0), Vec2::new(1.0, 1.0)), 2);

        let input = RayCastInput {
            p1: Vec2::new(0.0, 0.0),
            p2: Vec2::new(10.0, 0.0),
            max_fraction: 1.0,
        };
        let mut visited = Vec::new();
        tree.ray_cast(&input, |sub, proxy| {
            visited.push(proxy);
            sub.max_fraction
        });
        assert_eq!(visited, vec![hit]);
    }

    #[test]
    fn test_churn_keeps_invariants() {
        let mut tree = DynamicTree::new();
        let mut ids: Vec<ProxyId> = (0..200).map(|i| tree.insert(scattered_box(i), i)).collect();
        for step in 0..200 {
            let i = (step * 31) % ids.len();
            let moved = scattered_box(step + 1000);
            tree.move_proxy(ids[i], moved, Vec2::new(1.0, -1.0));
            if step % 3 == 0 {
                let victim = ids.swap_remove((step * 17) % ids.len());
                tree.remove(victim);
                ids.push(tree.insert(scattered_box(step + 5000), step));
            }
        }
        tree.validate().unwrap();
        assert_eq!(tree.proxy_count(), 200);
        assert!(tree.height() <= 24, "height {}", tree.height());
    }

    #[test]
    #[should_panic(expected = "is not a live leaf")]
    fn test_removing_unknown_proxy_panics() {
        let mut tree = DynamicTree::new();
        let id = tree.insert(Aabb::from_center(Vec2::ZERO, Vec2::new(1.0, 1.0)), ());
        tree.remove(id);
        tree.remove(id);
    }

    #[test]
    fn test_stale_proxy_does_not_alias_reused_slot() {
        let mut tree = DynamicTree::new();
        let unit = Vec2::new(1.0, 1.0);
        let old = tree.insert(Aabb::from_center(Vec2::ZERO, unit), 1);
        tree.remove(old);
        let new = tree.insert(Aabb::from_center(Vec2::new(10.0, 0.0), unit), 2);

        assert_eq!(new.raw(), old.raw());
        assert_ne!(new, old);
        assert!(!tree.contains(old));
        assert!(tree.contains(new));
        assert_eq!(*tree.payload(new), 2);
    }

    #[test]
    #[should_panic(expected = "is not a live leaf")]
    fn test_stale_proxy_payload_panics() {
        let mut tree = DynamicTree::new();
        let unit = Vec2::new(1.0, 1.0);
        let old = tree.insert(Aabb::from_center(Vec2::ZERO, unit), 1);
        tree.remove(old);
        tree.insert(Aabb::from_center(Vec2::ZERO, unit), 2);
        tree.payload(old);
    }
}
