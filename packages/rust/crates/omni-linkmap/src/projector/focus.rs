//! Focus-mode visibility.

use std::collections::{BTreeSet, VecDeque};

use crate::protocol::GraphSnapshot;

/// Neighbourhood depth shown in focus mode.
pub const FOCUS_DEPTH: usize = 1;

/// Ids within `depth` hops of `current` over links ∪ backlinks.
///
/// `None` means every node is visible: there is no current node or it is not
/// part of the graph.
#[must_use]
pub fn focus_set(snapshot: &GraphSnapshot, current: Option<&str>, depth: usize) -> Option<BTreeSet<String>> {
    let start = current.filter(|id| snapshot.adjacency_list.contains_key(*id))?;

    let mut visible = BTreeSet::from([start.to_string()]);
    let mut queue = VecDeque::from([(start.to_string(), 0usize)]);
    while let Some((id, level)) = queue.pop_front() {
        if level >= depth {
            continue;
        }
        let Some(node) = snapshot.adjacency_list.get(&id) else {
            continue;
        };
        for neighbor in node.links.iter().chain(&node.backlinks) {
            if snapshot.adjacency_list.contains_key(neighbor) && visible.insert(neighbor.clone()) {
                queue.push_back((neighbor.clone(), level + 1));
            }
        }
    }
    Some(visible)
}
