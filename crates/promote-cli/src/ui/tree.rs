//! Depth-first rendering of a resolution tree.
//!
//! Roots are walked in id/version order. A package whose dependencies were
//! already printed once is shown again with a `(*)` marker and not
//! expanded a second time, which also keeps cycles finite.

use std::collections::HashSet;
use std::fmt;

use promote_core::tree::ResolutionTree;
use promote_schema::PackageIdentity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLine {
    /// Box-drawing prefix, empty for roots.
    pub prefix: String,
    pub identity: PackageIdentity,
    pub in_destination: bool,
    /// Printed earlier with its dependencies.
    pub repeated: bool,
}

impl TreeLine {
    pub fn markers(&self) -> String {
        let mut markers = String::new();
        if self.in_destination {
            markers.push_str(" (already in destination)");
        }
        if self.repeated {
            markers.push_str(" (*)");
        }
        markers
    }
}

impl fmt::Display for TreeLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} {}{}",
            self.prefix,
            self.identity.id,
            self.identity.version,
            self.markers()
        )
    }
}

pub fn render(tree: &ResolutionTree) -> Vec<TreeLine> {
    let mut lines = Vec::with_capacity(tree.len());
    let mut expanded = HashSet::new();
    for root in tree.roots() {
        walk(tree, root, String::new(), String::new(), &mut expanded, &mut lines);
    }
    lines
}

fn walk<'t>(
    tree: &'t ResolutionTree,
    identity: &'t PackageIdentity,
    prefix: String,
    child_prefix: String,
    expanded: &mut HashSet<&'t PackageIdentity>,
    lines: &mut Vec<TreeLine>,
) {
    let dependencies = tree.dependencies(identity);
    let repeated = !dependencies.is_empty() && expanded.contains(identity);
    lines.push(TreeLine {
        prefix,
        identity: identity.clone(),
        in_destination: tree.is_in_target(identity),
        repeated,
    });
    if repeated || !expanded.insert(identity) {
        return;
    }

    let count = dependencies.len();
    for (index, dependency) in dependencies.iter().enumerate() {
        let last = index + 1 == count;
        let (branch, indent) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        walk(
            tree,
            dependency,
            format!("{child_prefix}{branch}"),
            format!("{child_prefix}{indent}"),
            expanded,
            lines,
        );
    }
}
