// src/resolver/graph.rs

//! Dependency graph data structures and structural passes
//!
//! The graph is an arena of [`PluginRecord`] values keyed by their
//! (name, version) spec, with forward edge lists and a reverse index. Maps
//! are ordered so every pass visits nodes in (name, version) order and a
//! resolution run is fully deterministic.
//!
//! Invariant: every non-root node is reachable from the root, except
//! transiently while a removal pass is running.

use crate::record::PluginRecord;
use crate::spec::PluginSpec;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, info};

/// A directed dependency edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    pub target: PluginSpec,
    pub optional: bool,
}

/// Directed graph of plugin records rooted at the synthetic install-set node
#[derive(Debug)]
pub struct DependencyGraph {
    root: PluginSpec,
    nodes: BTreeMap<PluginSpec, PluginRecord>,
    edges: BTreeMap<PluginSpec, Vec<DependencyEdge>>,
    reverse: BTreeMap<PluginSpec, BTreeSet<PluginSpec>>,
}

impl DependencyGraph {
    /// Create a graph containing only the root record
    pub fn new(root: PluginRecord) -> Self {
        let key = root.spec();
        let mut nodes = BTreeMap::new();
        nodes.insert(key.clone(), root);
        Self {
            root: key,
            nodes,
            edges: BTreeMap::new(),
            reverse: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> &PluginSpec {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, key: &PluginSpec) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn get(&self, key: &PluginSpec) -> Option<&PluginRecord> {
        self.nodes.get(key)
    }

    /// All records in (name, version) order
    pub fn records(&self) -> impl Iterator<Item = &PluginRecord> {
        self.nodes.values()
    }

    /// Snapshot of all node keys, for iteration across mutations
    pub fn keys(&self) -> Vec<PluginSpec> {
        self.nodes.keys().cloned().collect()
    }

    /// The currently selected record for a plugin name, if any.
    ///
    /// After conflict resolution at most one version per name remains.
    pub fn find_by_name(&self, name: &str) -> Option<&PluginRecord> {
        self.nodes.values().find(|r| r.name == name)
    }

    pub fn add_node(&mut self, record: PluginRecord) {
        self.nodes.insert(record.spec(), record);
    }

    pub fn add_edge(&mut self, from: &PluginSpec, to: &PluginSpec, optional: bool) {
        self.edges.entry(from.clone()).or_default().push(DependencyEdge {
            target: to.clone(),
            optional,
        });
        self.reverse.entry(to.clone()).or_default().insert(from.clone());
    }

    /// (source, optional) for every edge pointing at `key`
    pub fn incoming(&self, key: &PluginSpec) -> Vec<(PluginSpec, bool)> {
        let mut result = Vec::new();
        if let Some(sources) = self.reverse.get(key) {
            for source in sources {
                if let Some(edges) = self.edges.get(source) {
                    for edge in edges.iter().filter(|e| &e.target == key) {
                        result.push((source.clone(), edge.optional));
                    }
                }
            }
        }
        result
    }

    /// Remove a node together with all of its edges
    pub fn remove_node(&mut self, key: &PluginSpec) {
        self.nodes.remove(key);

        if let Some(outgoing) = self.edges.remove(key) {
            for edge in outgoing {
                if let Some(sources) = self.reverse.get_mut(&edge.target) {
                    sources.remove(key);
                    if sources.is_empty() {
                        self.reverse.remove(&edge.target);
                    }
                }
            }
        }

        if let Some(sources) = self.reverse.remove(key) {
            for source in sources {
                if let Some(edges) = self.edges.get_mut(&source) {
                    edges.retain(|e| &e.target != key);
                    if edges.is_empty() {
                        self.edges.remove(&source);
                    }
                }
            }
        }
    }

    fn reachable_from_root(&self) -> BTreeSet<PluginSpec> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::new();
        seen.insert(self.root.clone());
        queue.push_back(self.root.clone());

        while let Some(key) = queue.pop_front() {
            if let Some(edges) = self.edges.get(&key) {
                for edge in edges {
                    if seen.insert(edge.target.clone()) {
                        queue.push_back(edge.target.clone());
                    }
                }
            }
        }

        seen
    }

    /// Find one pair of nodes sharing a name with differing versions and
    /// collapse it onto the newer one: incoming edges of the older node are
    /// re-pointed at the newer (keeping their optional flags) and the older
    /// node is removed. Returns whether a conflict was found.
    ///
    /// Callers repeat this (with orphan removal in between) until it
    /// returns false; removing one node can surface or resolve others.
    pub fn resolve_version_conflict(&mut self) -> bool {
        let keys = self.keys();
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                if a.name != b.name {
                    continue;
                }
                // Newer wins, no exceptions: a root-requested version gets
                // no preference over a transitively discovered one.
                let (older, newer) = if a.version.is_older_than(&b.version) {
                    (a, b)
                } else {
                    (b, a)
                };
                debug!("version conflict on {}: {} superseded by {}", a.name, older, newer);
                for (source, optional) in self.incoming(older) {
                    self.add_edge(&source, newer, optional);
                }
                self.remove_node(older);
                return true;
            }
        }
        false
    }

    /// Drop every node no longer reachable from the root
    pub fn remove_orphaned(&mut self) {
        let reachable = self.reachable_from_root();
        let doomed: Vec<PluginSpec> = self
            .nodes
            .keys()
            .filter(|k| !reachable.contains(*k))
            .cloned()
            .collect();
        for key in doomed {
            debug!("removing orphaned {}", key);
            self.remove_node(&key);
        }
    }

    /// Remove every non-root node whose incoming edges are all optional,
    /// then drop any orphans that removal leaves behind.
    ///
    /// A dependency is only worth installing when at least one consumer
    /// mandatorily requires it.
    pub fn remove_optional_only(&mut self) {
        let mut doomed = Vec::new();
        for key in self.nodes.keys() {
            if *key == self.root {
                continue;
            }
            if self.incoming(key).iter().all(|(_, optional)| *optional) {
                doomed.push(key.clone());
            }
        }
        for key in doomed {
            info!("removing optional-only dependency {}", key);
            self.remove_node(&key);
        }
        self.remove_orphaned();
    }
}
