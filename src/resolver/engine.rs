// src/resolver/engine.rs

//! The solver fixpoint loop
//!
//! Starting from the requested root plugins, build the transitive dependency
//! graph, collapse version conflicts onto the newest version, prune
//! optional-only and orphaned subtrees, then scan for break constraints. A
//! break forces an upgrade: the minimum required version joins the phantom
//! list and the whole graph is rebuilt from scratch. The loop ends when a
//! pass finds no break.
//!
//! This is a best-effort heuristic, not a complete dependency solver: only
//! mandatory/optional edges and one-directional break constraints are
//! modeled, and conflicts are settled by "newer wins" with no backtracking.

use super::graph::DependencyGraph;
use crate::catalogue::Catalogue;
use crate::error::{Error, Result};
use crate::record::PluginRecord;
use crate::spec::{Dependency, PluginSpec};
use tracing::{debug, info};

/// Hard cap on rebuild iterations. Each pass bumps at least one plugin's
/// selected version, so real metadata converges in a handful of passes.
pub const MAX_SOLVE_ITERATIONS: u32 = 32;

/// Plugin dependency solver
pub struct Solver<'a, C: Catalogue> {
    catalogue: &'a C,
}

impl<'a, C: Catalogue> Solver<'a, C> {
    pub fn new(catalogue: &'a C) -> Self {
        Self { catalogue }
    }

    /// Resolve the full install set for the requested root dependencies.
    ///
    /// Returns the resolved records sorted by (name, version), root
    /// excluded. Exactly one version per name survives.
    pub fn solve(&self, requested: &[Dependency]) -> Result<Vec<PluginRecord>> {
        let mut phantoms: Vec<PluginRecord> = Vec::new();

        for iteration in 1..=MAX_SOLVE_ITERATIONS {
            debug!("resolution pass {}", iteration);
            let mut graph = self.build_graph(requested, &phantoms)?;

            // Collapse version conflicts one at a time; every collapse can
            // orphan a subtree or surface another conflict.
            while graph.resolve_version_conflict() {
                graph.remove_orphaned();
            }

            graph.remove_optional_only();

            let upgrades = self.find_forced_upgrades(&graph)?;
            if upgrades.is_empty() {
                let root = graph.root().clone();
                return Ok(graph
                    .records()
                    .filter(|r| r.spec() != root)
                    .cloned()
                    .collect());
            }

            for record in &upgrades {
                info!("break constraint forces upgrade to {}", record);
            }
            // Re-run with the upgrades as phantom root dependencies. The
            // previous graph is discarded: a newly forced version can
            // reopen conflicts already judged resolved.
            phantoms.extend(upgrades);
        }

        Err(Error::DidNotConverge(MAX_SOLVE_ITERATIONS))
    }

    /// Build the dependency graph for one pass: requested dependencies
    /// first, then accumulated phantoms as forced mandatory children of
    /// the root.
    fn build_graph(
        &self,
        requested: &[Dependency],
        phantoms: &[PluginRecord],
    ) -> Result<DependencyGraph> {
        let root = PluginRecord::root(requested.to_vec());
        let root_key = root.spec();
        let mut graph = DependencyGraph::new(root);
        let mut path = Vec::new();

        for dep in requested {
            self.insert_dependency(&mut graph, &root_key, dep, &mut path)?;
        }
        for phantom in phantoms {
            self.insert_record(&mut graph, &root_key, phantom.clone(), false, &mut path)?;
        }

        Ok(graph)
    }

    fn insert_dependency(
        &self,
        graph: &mut DependencyGraph,
        parent: &PluginSpec,
        dep: &Dependency,
        path: &mut Vec<PluginSpec>,
    ) -> Result<()> {
        // A missing record here is fatal to the whole run: skipping it
        // would silently produce an incomplete install set.
        let record = self.catalogue.resolve(&dep.spec)?;
        self.insert_record(graph, parent, record, dep.optional, path)
    }

    fn insert_record(
        &self,
        graph: &mut DependencyGraph,
        parent: &PluginSpec,
        record: PluginRecord,
        optional: bool,
        path: &mut Vec<PluginSpec>,
    ) -> Result<()> {
        let key = record.spec();

        // A plugin never transitively depends on itself within one pass;
        // only malformed metadata gets here.
        if path.contains(&key) {
            let chain: Vec<String> = path.iter().map(ToString::to_string).collect();
            return Err(Error::DependencyCycle(format!(
                "{} -> {}",
                chain.join(" -> "),
                key
            )));
        }

        // Already expanded elsewhere in the graph: record the new edge and
        // leave the existing subtree alone.
        if graph.contains(&key) {
            graph.add_edge(parent, &key, optional);
            return Ok(());
        }

        graph.add_node(record.clone());
        graph.add_edge(parent, &key, optional);

        path.push(key.clone());
        for dep in &record.dependencies {
            self.insert_dependency(graph, &key, dep, path)?;
        }
        path.pop();

        Ok(())
    }

    /// Scan the settled graph for violated break constraints and resolve
    /// the minimum required version of each violated plugin.
    ///
    /// Only the currently selected version of a name is consulted; a break
    /// declared by a node that a later pass removes still counts. That
    /// ordering is intentional.
    fn find_forced_upgrades(&self, graph: &DependencyGraph) -> Result<Vec<PluginRecord>> {
        let mut upgrades = Vec::new();

        for record in graph.records() {
            for brk in &record.breaks {
                let Some(selected) = graph.find_by_name(&brk.name) else {
                    // Not installed, nothing to break
                    continue;
                };
                if selected.version.is_older_than(&brk.version) {
                    debug!(
                        "{} breaks {} older than {}; selected {} must upgrade",
                        record, brk.name, brk.version, selected
                    );
                    upgrades.push(self.catalogue.resolve(brk)?);
                }
            }
        }

        Ok(upgrades)
    }
}
