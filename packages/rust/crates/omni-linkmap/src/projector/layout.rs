//! Seeded force-directed layout.

use std::collections::{BTreeMap, HashMap};

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::protocol::GraphSnapshot;

/// Fixed seed so a given graph always lands in the same place.
pub const LAYOUT_SEED: u64 = 0x6c6f_7265_6d69_7073;
/// Simulation stops once its energy falls below this.
pub const ALPHA_MIN: f64 = 0.01;
/// Energy decay per tick.
pub const ALPHA_DECAY: f64 = 0.05;

const TICK_SECONDS: f32 = 0.016;
const NODE_MASS: f32 = 10.0;
const SCATTER_RADIUS: f64 = 100.0;

/// Number of ticks needed to cool from 1.0 to [`ALPHA_MIN`].
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn tick_count(alpha_min: f64, alpha_decay: f64) -> usize {
    let ticks = (alpha_min.ln() / (1.0 - alpha_decay).ln()).ceil();
    if ticks.is_finite() && ticks > 0.0 {
        ticks as usize
    } else {
        0
    }
}

/// 2D point in layout space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

/// Runs the simulation for one snapshot.
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    width: f64,
    height: f64,
    ticks: usize,
}

impl LayoutEngine {
    /// Layout centred in a `width` x `height` viewport.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ticks: tick_count(ALPHA_MIN, ALPHA_DECAY),
        }
    }

    /// Ticks run per layout.
    #[must_use]
    pub fn ticks(&self) -> usize {
        self.ticks
    }

    /// Resize the viewport.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    fn parameters() -> SimulationParameters {
        SimulationParameters {
            force_charge: 150.0,
            force_spring: 0.05,
            force_max: 100.0,
            node_speed: 3000.0,
            damping_factor: 0.9,
        }
    }

    /// Position every node of `snapshot`.
    ///
    /// Nodes present in `previous` start from their old position; new nodes
    /// are scattered around the centre by a freshly seeded RNG. The result is
    /// re-centred on the viewport centre.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn run(
        &self,
        snapshot: &GraphSnapshot,
        previous: &HashMap<String, Point>,
    ) -> BTreeMap<String, Point> {
        let mut rng = StdRng::seed_from_u64(LAYOUT_SEED);
        let (cx, cy) = (self.width / 2.0, self.height / 2.0);
        let mut graph: ForceGraph<String, ()> = ForceGraph::new(Self::parameters());
        let mut indices: HashMap<&str, DefaultNodeIdx> = HashMap::new();

        for id in snapshot.adjacency_list.keys() {
            let angle = rng.gen_range(0.0..std::f64::consts::TAU);
            let radius = rng.gen_range(0.0..SCATTER_RADIUS);
            let start = previous.get(id).copied().unwrap_or(Point {
                x: cx + radius * angle.cos(),
                y: cy + radius * angle.sin(),
            });
            let idx = graph.add_node(NodeData {
                x: start.x as f32,
                y: start.y as f32,
                mass: NODE_MASS,
                is_anchor: false,
                user_data: id.clone(),
            });
            indices.insert(id.as_str(), idx);
        }
        for (id, node) in &snapshot.adjacency_list {
            for target in node.links.iter().filter(|target| *target != id) {
                if let (Some(&src), Some(&tgt)) =
                    (indices.get(id.as_str()), indices.get(target.as_str()))
                {
                    graph.add_edge(src, tgt, EdgeData::default());
                }
            }
        }

        for _ in 0..self.ticks {
            graph.update(TICK_SECONDS);
        }

        let mut positions = BTreeMap::new();
        graph.visit_nodes(|node| {
            positions.insert(
                node.data.user_data.clone(),
                Point {
                    x: f64::from(node.x()),
                    y: f64::from(node.y()),
                },
            );
        });
        recenter(&mut positions, cx, cy);
        positions
    }
}

#[allow(clippy::cast_precision_loss)]
fn recenter(positions: &mut BTreeMap<String, Point>, cx: f64, cy: f64) {
    if positions.is_empty() {
        return;
    }
    let count = positions.len() as f64;
    let (sum_x, sum_y) = positions
        .values()
        .fold((0.0, 0.0), |(sx, sy), point| (sx + point.x, sy + point.y));
    let (dx, dy) = (cx - sum_x / count, cy - sum_y / count);
    for point in positions.values_mut() {
        point.x += dx;
        point.y += dy;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooling_schedule_matches_decay() {
        assert_eq!(tick_count(ALPHA_MIN, ALPHA_DECAY), 90);
        assert_eq!(tick_count(1.0, ALPHA_DECAY), 0);
    }

    #[test]
    fn empty_snapshot_has_no_positions() {
        let engine = LayoutEngine::new(800.0, 600.0);
        assert!(engine.run(&GraphSnapshot::default(), &HashMap::new()).is_empty());
    }
}
