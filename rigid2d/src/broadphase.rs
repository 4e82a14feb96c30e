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
//! Broadphase: candidate pairs from overlapping fat AABBs
//!
//! Each simulation space ([`MapId`]) gets its own [`DynamicTree`]; fixtures
//! in different maps never interact. Proxies whose fat AABB had to grow are
//! remembered in a move buffer, and [`BroadPhase::find_new_pairs`] queries
//! only those against their tree.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::arena::FixtureHandle;
use crate::math::{Aabb, RayCastInput, Vec2};
use crate::tree::{DynamicTree, ProxyId};

/// Identifier of an independent simulation space
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct MapId(pub u32);

/// Broadphase over any number of maps
#[derive(Debug, Default)]
pub struct BroadPhase {
    trees: BTreeMap<MapId, DynamicTree<FixtureHandle>>,
    move_buffer: BTreeSet<(MapId, ProxyId)>,
}

impl BroadPhase {
    /// Create an empty broadphase
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fixture's AABB, creating the map's tree on first use
    pub fn create_proxy(&mut self, map: MapId, aabb: Aabb, fixture: FixtureHandle) -> ProxyId {
        let proxy = self.trees.entry(map).or_default().insert(aabb, fixture);
        self.move_buffer.insert((map, proxy));
        proxy
    }

    /// Remove a proxy
    ///
    /// # Panics
    ///
    /// Panics if the map or proxy is unknown.
    pub fn destroy_proxy(&mut self, map: MapId, proxy: ProxyId) {
        self.move_buffer.remove(&(map, proxy));
        let tree = self.tree_mut(map);
        tree.remove(proxy);
        if tree.proxy_count() == 0 {
            self.trees.remove(&map);
        }
    }

    /// Update a proxy after its fixture moved
    ///
    /// Returns whether the fat AABB was enlarged, in which case the proxy
    /// is looked at again by the next [`find_new_pairs`](Self::find_new_pairs).
    pub fn move_proxy(
        &mut self,
        map: MapId,
        proxy: ProxyId,
        aabb: Aabb,
        displacement: Vec2,
    ) -> bool {
        let enlarged = self.tree_mut(map).move_proxy(proxy, aabb, displacement);
        if enlarged {
            self.move_buffer.insert((map, proxy));
        }
        enlarged
    }

    /// Force a proxy to be reconsidered for pairing, e.g. after a filter
    /// change
    pub fn touch_proxy(&mut self, map: MapId, proxy: ProxyId) {
        assert!(
            self.tree(map).map_or(false, |t| t.contains(proxy)),
            "touching unknown proxy {:?} in {:?}",
            proxy,
            map
        );
        self.move_buffer.insert((map, proxy));
    }

    /// Candidate pairs involving any proxy moved since the last call
    ///
    /// Pairs are ordered `(lower, higher)` by fixture handle, sorted and
    /// unique. `filter` decides whether a pair is wanted; it is called at
    /// most once per unordered pair.
    pub fn find_new_pairs<F>(&mut self, mut filter: F) -> Vec<(FixtureHandle, FixtureHandle)>
    where
        F: FnMut(FixtureHandle, FixtureHandle) -> bool,
    {
        let mut candidates = Vec::new();
        let moved = std::mem::take(&mut self.move_buffer);

        for &(map, query_proxy) in &moved {
            let Some(tree) = self.trees.get(&map) else {
                continue;
            };
            if !tree.contains(query_proxy) {
                continue;
            }
            let fat = tree.fat_aabb(query_proxy);
            let query_fixture = *tree.payload(query_proxy);

            tree.query(&fat, |proxy| {
                if proxy == query_proxy {
                    return true;
                }
                // Both moved: only the lower proxy reports the pair
                if proxy < query_proxy && moved.contains(&(map, proxy)) {
                    return true;
                }
                let fixture = *tree.payload(proxy);
                let pair = if fixture < query_fixture {
                    (fixture, query_fixture)
                } else {
                    (query_fixture, fixture)
                };
                candidates.push(pair);
                true
            });
        }

        candidates.sort_unstable();
        candidates.dedup();
        candidates.retain(|&(a, b)| filter(a, b));
        candidates
    }

    /// Visit fixtures whose fat AABB overlaps `aabb` in `map`
    pub fn query<F>(&self, map: MapId, aabb: &Aabb, mut visit: F)
    where
        F: FnMut(FixtureHandle) -> bool,
    {
        if let Some(tree) = self.trees.get(&map) {
            tree.query(aabb, |proxy| visit(*tree.payload(proxy)));
        }
    }

    /// Cast a segment against the fat AABBs in `map`
    ///
    /// The visitor follows the [`DynamicTree::ray_cast`] contract.
    pub fn ray_cast<F>(&self, map: MapId, input: &RayCastInput, mut visit: F)
    where
        F: FnMut(&RayCastInput, FixtureHandle) -> f64,
    {
        if let Some(tree) = self.trees.get(&map) {
            tree.ray_cast(input, |sub, proxy| visit(sub, *tree.payload(proxy)));
        }
    }

    /// Whether two proxies' fat AABBs overlap
    pub fn test_overlap(&self, map: MapId, a: ProxyId, b: ProxyId) -> bool {
        match self.tree(map) {
            Some(tree) => tree.test_overlap(a, b),
            None => panic!("unknown map {:?}", map),
        }
    }

    /// Fat AABB of a proxy
    pub fn fat_aabb(&self, map: MapId, proxy: ProxyId) -> Aabb {
        match self.tree(map) {
            Some(tree) => tree.fat_aabb(proxy),
            None => panic!("unknown map {:?}", map),
        }
    }

    /// Total proxies across all maps
    pub fn proxy_count(&self) -> usize {
        self.trees.values().map(|t| t.proxy_count()).sum()
    }

    /// Tree backing a map, if any fixture lives there
    pub fn tree(&self, map: MapId) -> Option<&DynamicTree<FixtureHandle>> {
        self.trees.get(&map)
    }

    fn tree_mut(&mut self, map: MapId) -> &mut DynamicTree<FixtureHandle> {
        match self.trees.get_mut(&map) {
            Some(tree) => tree,
            None => panic!("unknown map {:?}", map),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;

    fn handles(n: usize) -> Vec<FixtureHandle> {
        let mut arena: Arena<FixtureHandle, ()> = Arena::new();
        (0..n).map(|_| arena.insert(())).collect()
    }

    fn unit_box(x: f64, y: f64) -> Aabb {
        Aabb::from_center(Vec2::new(x, y), Vec2::new(0.5, 0.5))
    }

    #[test]
    fn test_pairs_are_unique_and_ordered() {
        let f = handles(3);
        let mut bp = BroadPhase::new();
        bp.create_proxy(MapId(0), unit_box(0.0, 0.0), f[0]);
        bp.create_proxy(MapId(0), unit_box(0.8, 0.0), f[1]);
        bp.create_proxy(MapId(0), unit_box(10.0, 0.0), f[2]);

        let pairs = bp.find_new_pairs(|_, _| true);
        assert_eq!(pairs, vec![(f[0], f[1])]);

        // Nothing moved since
        assert!(bp.find_new_pairs(|_, _| true).is_empty());
    }

    #[test]
    fn test_maps_are_isolated() {
        let f = handles(2);
        let mut bp = BroadPhase::new();
        bp.create_proxy(MapId(0), unit_box(0.0, 0.0), f[0]);
        bp.create_proxy(MapId(1), unit_box(0.0, 0.0), f[1]);
        assert!(bp.find_new_pairs(|_, _| true).is_empty());
        assert_eq!(bp.proxy_count(), 2);
    }

    #[test]
    fn test_filter_rejects_pairs() {
        let f = handles(2);
        let mut bp = BroadPhase::new();
        bp.create_proxy(MapId(0), unit_box(0.0, 0.0), f[0]);
        bp.create_proxy(MapId(0), unit_box(0.2, 0.0), f[1]);
        assert!(bp.find_new_pairs(|_, _| false).is_empty());
    }

    #[test]
    fn test_move_into_overlap_reports_pair() {
        let f = handles(2);
        let mut bp = BroadPhase::new();
        let a = bp.create_proxy(MapId(0), unit_box(0.0, 0.0), f[0]);
        bp.create_proxy(MapId(0), unit_box(5.0, 0.0), f[1]);
        assert!(bp.find_new_pairs(|_, _| true).is_empty());

        // Small move stays inside the fat box
        assert!(!bp.move_proxy(MapId(0), a, unit_box(0.05, 0.0), Vec2::new(0.05, 0.0)));
        assert!(bp.move_proxy(MapId(0), a, unit_box(4.5, 0.0), Vec2::new(4.45, 0.0)));
        assert_eq!(bp.find_new_pairs(|_, _| true), vec![(f[0], f[1])]);
    }

    #[test]
    fn test_degenerate_aabb_still_fat() {
        let f = handles(1);
        let mut bp = BroadPhase::new();
        let point = Aabb::new(Vec2::new(1.0, 1.0), Vec2::new(1.0, 1.0));
        let proxy = bp.create_proxy(MapId(0), point, f[0]);
        let fat = bp.fat_aabb(MapId(0), proxy);
        assert!(fat.perimeter() > 0.0);
        assert!(fat.contains(&point));
    }

    #[test]
    fn test_destroyed_proxy_not_queried() {
        let f = handles(2);
        let mut bp = BroadPhase::new();
        let a = bp.create_proxy(MapId(0), unit_box(0.0, 0.0), f[0]);
        bp.create_proxy(MapId(0), unit_box(0.5, 0.0), f[1]);
        bp.destroy_proxy(MapId(0), a);
        assert!(bp.find_new_pairs(|_, _| true).is_empty());

        let mut seen = Vec::new();
        bp.query(MapId(0), &unit_box(0.0, 0.0), |fixture| {
            seen.push(fixture);
            true
        });
        assert_eq!(seen, vec![f[1]]);
    }
}
