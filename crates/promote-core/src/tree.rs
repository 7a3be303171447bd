//! The validated result of a resolution run.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use promote_schema::{PackageIdentity, PackageInfo};
use thiserror::Error;

/// Ways in which resolver output can be internally inconsistent. These
/// indicate a resolver defect, never bad user input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeInvariantError {
    #[error("root {0} is not a resolved node")]
    RootNotResolved(PackageIdentity),

    #[error("{0} is marked as present at the destination but is not a resolved node")]
    InTargetNotResolved(PackageIdentity),

    #[error("edge {from} -> {to} references a node that was not resolved")]
    DanglingEdge {
        from: PackageIdentity,
        to: PackageIdentity,
    },

    #[error("{0} is not reachable from any root")]
    Orphan(PackageIdentity),
}

static NO_DEPENDENCIES: BTreeSet<PackageIdentity> = BTreeSet::new();

/// An immutable promotion plan.
///
/// Edges exist only for nodes whose dependencies were expanded, so a node
/// that was already at the destination can be a leaf here even though the
/// package itself has dependencies.
#[derive(Debug, Clone)]
pub struct ResolutionTree {
    nodes: BTreeMap<PackageIdentity, PackageInfo>,
    roots: BTreeSet<PackageIdentity>,
    in_target: BTreeSet<PackageIdentity>,
    edges: BTreeMap<PackageIdentity, BTreeSet<PackageIdentity>>,
}

impl ResolutionTree {
    /// Build a tree, checking that roots, destination markers and edge
    /// endpoints are all resolved nodes and that every node is reachable
    /// from a root.
    pub fn try_new(
        nodes: impl IntoIterator<Item = PackageInfo>,
        roots: impl IntoIterator<Item = PackageIdentity>,
        in_target: impl IntoIterator<Item = PackageIdentity>,
        edges: impl IntoIterator<Item = (PackageIdentity, PackageIdentity)>,
    ) -> Result<Self, TreeInvariantError> {
        let nodes: BTreeMap<PackageIdentity, PackageInfo> = nodes
            .into_iter()
            .map(|info| (info.identity.clone(), info))
            .collect();

        let roots: BTreeSet<PackageIdentity> = roots.into_iter().collect();
        if let Some(root) = roots.iter().find(|r| !nodes.contains_key(*r)) {
            return Err(TreeInvariantError::RootNotResolved(root.clone()));
        }

        let in_target: BTreeSet<PackageIdentity> = in_target.into_iter().collect();
        if let Some(node) = in_target.iter().find(|n| !nodes.contains_key(*n)) {
            return Err(TreeInvariantError::InTargetNotResolved(node.clone()));
        }

        let mut edge_map: BTreeMap<PackageIdentity, BTreeSet<PackageIdentity>> = BTreeMap::new();
        for (from, to) in edges {
            if !nodes.contains_key(&from) || !nodes.contains_key(&to) {
                return Err(TreeInvariantError::DanglingEdge { from, to });
            }
            edge_map.entry(from).or_default().insert(to);
        }

        let tree = Self {
            nodes,
            roots,
            in_target,
            edges: edge_map,
        };

        let reachable = tree.reachable();
        if let Some(orphan) = tree.nodes.keys().find(|n| !reachable.contains(*n)) {
            return Err(TreeInvariantError::Orphan(orphan.clone()));
        }

        Ok(tree)
    }

    fn reachable(&self) -> HashSet<&PackageIdentity> {
        let mut seen: HashSet<&PackageIdentity> = self.roots.iter().collect();
        let mut queue: VecDeque<&PackageIdentity> = self.roots.iter().collect();
        while let Some(node) = queue.pop_front() {
            for dependency in self.dependencies(node) {
                if seen.insert(dependency) {
                    queue.push_back(dependency);
                }
            }
        }
        seen
    }

    /// All nodes, ordered by id then version.
    pub fn nodes(&self) -> impl Iterator<Item = &PackageInfo> {
        self.nodes.values()
    }

    pub fn roots(&self) -> &BTreeSet<PackageIdentity> {
        &self.roots
    }

    /// Direct dependencies recorded for `identity`; empty when its
    /// dependencies were not expanded.
    pub fn dependencies(&self, identity: &PackageIdentity) -> &BTreeSet<PackageIdentity> {
        self.edges.get(identity).unwrap_or(&NO_DEPENDENCIES)
    }

    /// Whether the package existed at the destination when it was resolved.
    pub fn is_in_target(&self, identity: &PackageIdentity) -> bool {
        self.in_target.contains(identity)
    }

    /// Packages that still have to be transferred, ordered by id then version.
    pub fn packages_to_promote(&self) -> Vec<PackageIdentity> {
        self.nodes
            .keys()
            .filter(|identity| !self.in_target.contains(*identity))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
