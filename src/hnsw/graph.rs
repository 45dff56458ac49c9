//! HNSW graph: core data structures and algorithms.
//!
//! Implements the Hierarchical Navigable Small World graph from:
//! "Efficient and robust approximate nearest neighbor search using
//!  Hierarchical Navigable Small World graphs" (Malkov & Yashunin, 2016/2018).
//! This is the same structure the OpenSearch k-NN plugin builds for a
//! `knn_vector` field with `method.name = "hnsw"`.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::distance::SpaceType;
use crate::error::{FfpError, Result};
use crate::vector::EmbeddingVector;

use super::neighbor_queue::{CandidateQueue, Neighbor, ResultSet};

/// Construction and search parameters for an HNSW graph.
#[derive(Debug, Clone, PartialEq)]
pub struct HnswParams {
    /// Max number of connections per node (layers > 0).
    pub m: usize,
    /// Max connections at layer 0 (typically 2 * m).
    pub m_max0: usize,
    /// Number of candidates during construction.
    pub ef_construction: usize,
    /// Number of candidates during search.
    pub ef_search: usize,
    /// Level generation factor: 1 / ln(m).
    pub ml: f64,
    pub max_layers: usize,
    /// Fixed seed for level generation; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self::build(16, 200, 50)
    }
}

impl HnswParams {
    /// Fails unless `m >= 2` and both candidate list sizes are non-zero.
    pub fn new(m: usize, ef_construction: usize, ef_search: usize) -> Result<Self> {
        if m < 2 {
            return Err(FfpError::Config(format!("HNSW m must be at least 2, got {}", m)));
        }
        if ef_construction == 0 || ef_search == 0 {
            return Err(FfpError::Config(
                "HNSW ef_construction and ef_search must be greater than zero".to_string(),
            ));
        }
        Ok(Self::build(m, ef_construction, ef_search))
    }

    fn build(m: usize, ef_construction: usize, ef_search: usize) -> Self {
        Self {
            m,
            m_max0: 2 * m,
            ef_construction,
            ef_search,
            ml: 1.0 / (m as f64).ln(),
            max_layers: 16,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[derive(Debug, Clone)]
struct HnswNode {
    vector: EmbeddingVector,
    /// neighbors[l] is the list of neighbor IDs at layer l.
    neighbors: Vec<Vec<usize>>,
    level: usize,
}

/// The HNSW graph structure.
#[derive(Debug)]
pub struct HnswGraph {
    /// Nodes indexed by internal ID. Slots are None after deletion.
    nodes: Vec<Option<HnswNode>>,
    entry_point: Option<usize>,
    max_level: usize,
    params: HnswParams,
    space: SpaceType,
    rng: StdRng,
    count: usize,
}

impl HnswGraph {
    pub fn new(space: SpaceType, params: HnswParams) -> Self {
        let rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            nodes: Vec::new(),
            entry_point: None,
            max_level: 0,
            params,
            space,
            rng,
            count: 0,
        }
    }

    pub fn space(&self) -> SpaceType {
        self.space
    }

    pub fn params(&self) -> &HnswParams {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn random_level(&mut self) -> usize {
        let r: f64 = self.rng.gen::<f64>().max(f64::MIN_POSITIVE);
        let level = (-r.ln() * self.params.ml).floor() as usize;
        level.min(self.params.max_layers - 1)
    }

    fn node(&self, id: usize) -> Option<&HnswNode> {
        self.nodes.get(id).and_then(|n| n.as_ref())
    }

    fn distance_to(&self, query: &EmbeddingVector, node_id: usize) -> Result<f32> {
        let node = self
            .node(node_id)
            .ok_or_else(|| FfpError::Index(format!("HNSW node {} not found", node_id)))?;
        self.space.distance(query, &node.vector)
    }

    /// SEARCH-LAYER (Algorithm 2): the `ef` closest nodes to `query` reachable
    /// on `layer` from the entry points, closest first.
    fn search_layer(
        &self,
        query: &EmbeddingVector,
        entry_points: &[usize],
        ef: usize,
        layer: usize,
    ) -> Result<Vec<Neighbor>> {
        let mut visited = HashSet::new();
        let mut candidates = CandidateQueue::new();
        let mut results = ResultSet::new();

        for &ep in entry_points {
            let dist = self.distance_to(query, ep)?;
            visited.insert(ep);
            candidates.push(Neighbor::new(ep, dist));
            results.push(Neighbor::new(ep, dist));
        }

        while let Some(current) = candidates.pop_closest() {
            let furthest = results.furthest().map(|n| n.distance).unwrap_or(f32::MAX);
            if current.distance > furthest {
                break;
            }

            let Some(node) = self.node(current.id) else {
                continue;
            };
            let Some(layer_neighbors) = node.neighbors.get(layer) else {
                continue;
            };

            for &neighbor_id in layer_neighbors {
                if !visited.insert(neighbor_id) || self.node(neighbor_id).is_none() {
                    continue;
                }

                let dist = self.distance_to(query, neighbor_id)?;
                let furthest = results.furthest().map(|n| n.distance).unwrap_or(f32::MAX);

                if dist < furthest || results.len() < ef {
                    candidates.push(Neighbor::new(neighbor_id, dist));
                    results.push_bounded(Neighbor::new(neighbor_id, dist), ef);
                }
            }
        }

        Ok(results.into_sorted_vec())
    }

    /// Keep at most `m` of a node's neighbors at `layer`, the closest ones.
    fn prune_neighbors(&mut self, node_id: usize, layer: usize, m: usize) {
        let Some(node) = self.node(node_id) else {
            return;
        };
        let Some(neighbor_ids) = node.neighbors.get(layer) else {
            return;
        };

        let mut scored: Vec<Neighbor> = neighbor_ids
            .iter()
            .filter_map(|&nid| {
                self.node(nid).map(|n| {
                    let dist = self
                        .space
                        .distance(&node.vector, &n.vector)
                        .unwrap_or(f32::MAX);
                    Neighbor::new(nid, dist)
                })
            })
            .collect();
        scored.sort();
        scored.truncate(m);

        if let Some(Some(node)) = self.nodes.get_mut(node_id) {
            node.neighbors[layer] = scored.into_iter().map(|n| n.id).collect();
        }
    }

    /// INSERT (Algorithm 1).
    pub fn insert(&mut self, id: usize, vector: EmbeddingVector) -> Result<()> {
        if self.node(id).is_some() {
            return Err(FfpError::Index(format!("HNSW node {} already present", id)));
        }
        let level = self.random_level();

        if id >= self.nodes.len() {
            self.nodes.resize_with(id + 1, || None);
        }
        self.nodes[id] = Some(HnswNode {
            vector: vector.clone(),
            neighbors: vec![Vec::new(); level + 1],
            level,
        });
        self.count += 1;

        let Some(mut ep_id) = self.entry_point else {
            self.entry_point = Some(id);
            self.max_level = level;
            return Ok(());
        };
        let top = self.max_level;

        // Greedy descent through the layers above the new node's level.
        for l in (level + 1..=top).rev() {
            if let Some(n) = self.search_layer(&vector, &[ep_id], 1, l)?.first() {
                ep_id = n.id;
            }
        }

        for l in (0..=level.min(top)).rev() {
            let m = if l == 0 {
                self.params.m_max0
            } else {
                self.params.m
            };

            let nearest = self.search_layer(&vector, &[ep_id], self.params.ef_construction, l)?;
            let selected: Vec<usize> = nearest
                .iter()
                .filter(|n| n.id != id)
                .take(m)
                .map(|n| n.id)
                .collect();

            if let Some(Some(node)) = self.nodes.get_mut(id) {
                node.neighbors[l] = selected.clone();
            }

            for &neighbor_id in &selected {
                let over_capacity = match self.nodes.get_mut(neighbor_id) {
                    Some(Some(neighbor)) if l < neighbor.neighbors.len() => {
                        neighbor.neighbors[l].push(id);
                        neighbor.neighbors[l].len() > m
                    }
                    _ => false,
                };
                if over_capacity {
                    self.prune_neighbors(neighbor_id, l, m);
                }
            }

            if let Some(n) = nearest.first() {
                ep_id = n.id;
            }
        }

        if level > self.max_level {
            self.entry_point = Some(id);
            self.max_level = level;
        }

        Ok(())
    }

    /// Remove a node and unlink it from its neighbors' lists.
    pub fn remove(&mut self, id: usize) -> Result<()> {
        let Some(node) = self.nodes.get_mut(id).and_then(Option::take) else {
            return Ok(());
        };

        for (layer, neighbors) in node.neighbors.iter().enumerate() {
            for &neighbor_id in neighbors {
                if let Some(Some(neighbor)) = self.nodes.get_mut(neighbor_id) {
                    if let Some(list) = neighbor.neighbors.get_mut(layer) {
                        list.retain(|&n| n != id);
                    }
                }
            }
        }
        self.count -= 1;

        if self.entry_point == Some(id) {
            // Lowest id wins among equal levels so the choice is reproducible.
            self.entry_point = self
                .nodes
                .iter()
                .enumerate()
                .filter_map(|(i, n)| n.as_ref().map(|n| (i, n.level)))
                .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
                .map(|(i, _)| i);
            self.max_level = self
                .entry_point
                .and_then(|ep| self.node(ep).map(|n| n.level))
                .unwrap_or(0);
        }

        Ok(())
    }

    /// K-NN-SEARCH (Algorithm 5) with `ef` candidates on the bottom layer.
    pub fn search_knn(
        &self,
        query: &EmbeddingVector,
        k: usize,
        ef: usize,
    ) -> Result<Vec<Neighbor>> {
        let Some(mut ep_id) = self.entry_point else {
            return Ok(vec![]);
        };

        for l in (1..=self.max_level).rev() {
            if let Some(n) = self.search_layer(query, &[ep_id], 1, l)?.first() {
                ep_id = n.id;
            }
        }

        let mut results = self.search_layer(query, &[ep_id], ef.max(k), 0)?;
        if results.len() < k.min(self.count) {
            // Pruning and removal can leave nodes unreachable from the entry point.
            return self.exact_knn(query, k);
        }
        results.truncate(k);
        Ok(results)
    }

    /// Score every live node.
    fn exact_knn(&self, query: &EmbeddingVector, k: usize) -> Result<Vec<Neighbor>> {
        let mut results = self
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(id, node)| node.as_ref().map(|n| (id, n)))
            .map(|(id, n)| Ok(Neighbor::new(id, self.space.distance(query, &n.vector)?)))
            .collect::<Result<Vec<_>>>()?;
        results.sort();
        results.truncate(k);
        Ok(results)
    }
}
