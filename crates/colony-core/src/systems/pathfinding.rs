//! Tile path graph and A* search.
//!
//! `PathGraph` is an adjacency list over Floor tiles. `PathCache` owns the
//! graph, rebuilds it lazily after invalidation, and keeps a bounded cache of
//! recent search results.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use std::f32::consts::SQRT_2;

use crate::components::TileCoord;
use crate::grid::Grid;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathEdge {
    pub to: TileCoord,
    /// Destination movement cost times step length.
    pub cost: f32,
}

#[derive(Debug, Clone, Default)]
pub struct PathGraph {
    nodes: HashMap<TileCoord, Vec<PathEdge>>,
}

impl PathGraph {
    /// One node per Floor tile. Edges only lead into tiles with nonzero
    /// movement cost, so a character standing on a wall can still step off.
    pub fn build(grid: &Grid) -> Self {
        let mut nodes = HashMap::new();
        for tile in grid.tiles().filter(|t| !t.is_empty()) {
            let from = tile.coord;
            let edges = grid
                .neighbours(from, true)
                .into_iter()
                .flatten()
                .filter(|to| grid.movement_cost(*to) > 0.0)
                .filter(|to| !clips_corner(grid, from, *to))
                .map(|to| {
                    let step = if from.is_diagonal_to(&to) { SQRT_2 } else { 1.0 };
                    PathEdge {
                        to,
                        cost: grid.movement_cost(to) * step,
                    }
                })
                .collect();
            nodes.insert(from, edges);
        }
        Self { nodes }
    }

    pub fn contains(&self, coord: TileCoord) -> bool {
        self.nodes.contains_key(&coord)
    }

    pub fn edges(&self, coord: TileCoord) -> &[PathEdge] {
        self.nodes.get(&coord).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(Vec::len).sum()
    }
}

/// A diagonal step may not squeeze past an impassable orthogonal tile.
fn clips_corner(grid: &Grid, from: TileCoord, to: TileCoord) -> bool {
    if !from.is_diagonal_to(&to) {
        return false;
    }
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    grid.movement_cost(from.offset(dx, 0)) == 0.0 || grid.movement_cost(from.offset(0, dy)) == 0.0
}

/// Tiles to walk, excluding the start.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TilePath {
    tiles: VecDeque<TileCoord>,
    cost: f32,
}

impl TilePath {
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Total edge cost of the whole path as found.
    pub fn cost(&self) -> f32 {
        self.cost
    }

    /// Pops the next tile to walk to.
    pub fn next_tile(&mut self) -> Option<TileCoord> {
        self.tiles.pop_front()
    }

    pub fn peek(&self) -> Option<TileCoord> {
        self.tiles.front().copied()
    }

    pub fn last(&self) -> Option<TileCoord> {
        self.tiles.back().copied()
    }

    pub fn tiles(&self) -> impl Iterator<Item = &TileCoord> {
        self.tiles.iter()
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenNode {
    f: f32,
    h: f32,
    seq: u64,
    coord: TileCoord,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    /// Reversed so the max-heap pops lowest f, then lowest h, then oldest.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.h.total_cmp(&self.h))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A* from `start` to `goal`. With `end_on_tile` unset the search stops on
/// any tile touching the goal, so impassable targets can be approached.
pub fn find_path(
    graph: &PathGraph,
    start: TileCoord,
    goal: TileCoord,
    end_on_tile: bool,
) -> Option<TilePath> {
    if !graph.contains(start) {
        return None;
    }
    if end_on_tile && !graph.contains(goal) {
        return None;
    }

    let reached = |c: TileCoord| c == goal || (!end_on_tile && c.is_neighbour(&goal, true));
    let heuristic = |c: TileCoord| {
        let d = c.distance(&goal);
        if end_on_tile {
            d
        } else {
            (d - SQRT_2).max(0.0)
        }
    };

    if reached(start) {
        return Some(TilePath::default());
    }

    let mut open = BinaryHeap::new();
    let mut g_score: HashMap<TileCoord, f32> = HashMap::new();
    let mut came_from: HashMap<TileCoord, TileCoord> = HashMap::new();
    let mut closed: HashSet<TileCoord> = HashSet::new();
    let mut seq = 0u64;

    g_score.insert(start, 0.0);
    let h = heuristic(start);
    open.push(OpenNode {
        f: h,
        h,
        seq,
        coord: start,
    });

    while let Some(OpenNode { coord: current, .. }) = open.pop() {
        if !closed.insert(current) {
            continue;
        }
        let g = g_score.get(&current).copied().unwrap_or(f32::INFINITY);
        if reached(current) {
            return Some(reconstruct(&came_from, start, current, g));
        }

        for edge in graph.edges(current) {
            if closed.contains(&edge.to) {
                continue;
            }
            let tentative = g + edge.cost;
            if tentative < g_score.get(&edge.to).copied().unwrap_or(f32::INFINITY) {
                came_from.insert(edge.to, current);
                g_score.insert(edge.to, tentative);
                seq += 1;
                let h = heuristic(edge.to);
                open.push(OpenNode {
                    f: tentative + h,
                    h,
                    seq,
                    coord: edge.to,
                });
            }
        }
    }

    None
}

fn reconstruct(
    came_from: &HashMap<TileCoord, TileCoord>,
    start: TileCoord,
    end: TileCoord,
    cost: f32,
) -> TilePath {
    let mut tiles = VecDeque::new();
    let mut current = end;
    while current != start {
        tiles.push_front(current);
        match came_from.get(&current) {
            Some(prev) => current = *prev,
            None => break,
        }
    }
    TilePath { tiles, cost }
}

type PathKey = (TileCoord, TileCoord, bool);

/// Lazily rebuilt path graph plus a bounded result cache.
#[derive(Debug, Clone)]
pub struct PathCache {
    graph: Option<PathGraph>,
    paths: HashMap<PathKey, Option<TilePath>>,
    capacity: usize,
    rebuilds: u64,
}

impl PathCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            graph: None,
            paths: HashMap::new(),
            capacity,
            rebuilds: 0,
        }
    }

    /// Drops the graph and cached results. The graph is rebuilt on next use.
    pub fn invalidate(&mut self) {
        self.graph = None;
        self.paths.clear();
    }

    pub fn is_valid(&self) -> bool {
        self.graph.is_some()
    }

    /// How many times the graph has been built.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    pub fn cache_size(&self) -> usize {
        self.paths.len()
    }

    pub fn graph(&mut self, grid: &Grid) -> &PathGraph {
        if self.graph.is_none() {
            self.rebuilds += 1;
            let graph = PathGraph::build(grid);
            log::debug!(
                "Rebuilt path graph: {} nodes, {} edges",
                graph.node_count(),
                graph.edge_count()
            );
            self.graph = Some(graph);
        }
        self.graph.get_or_insert_with(PathGraph::default)
    }

    pub fn find_path(
        &mut self,
        grid: &Grid,
        start: TileCoord,
        goal: TileCoord,
        end_on_tile: bool,
    ) -> Option<TilePath> {
        let key = (start, goal, end_on_tile);
        if let Some(cached) = self.paths.get(&key) {
            return cached.clone();
        }

        let path = find_path(self.graph(grid), start, goal, end_on_tile);
        if self.capacity > 0 {
            if self.paths.len() >= self.capacity {
                if let Some(&evict) = self.paths.keys().next() {
                    self.paths.remove(&evict);
                }
            }
            self.paths.insert(key, path.clone());
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Installed, TileType};

    fn open_grid(width: u32, height: u32) -> Grid {
        let mut grid = Grid::new(width, height);
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                grid.tile_mut(TileCoord::new(x, y)).unwrap().tile_type = TileType::Floor;
            }
        }
        grid
    }

    fn put_wall(grid: &mut Grid, world: &mut hecs::World, x: i32, y: i32) {
        grid.tile_mut(TileCoord::new(x, y)).unwrap().furniture = Some(Installed {
            entity: world.spawn(()),
            movement_cost: 0.0,
            room_border: true,
        });
    }

    #[test]
    fn test_open_grid_diagonal() {
        let grid = open_grid(10, 10);
        let graph = PathGraph::build(&grid);
        let path = find_path(&graph, TileCoord::new(0, 0), TileCoord::new(9, 9), true).unwrap();

        assert_eq!(path.len(), 9);
        assert!((path.cost() - 9.0 * SQRT_2).abs() < 1e-4);
        assert_eq!(path.last(), Some(TileCoord::new(9, 9)));
        assert_ne!(path.peek(), Some(TileCoord::new(0, 0)));
    }

    #[test]
    fn test_zero_cost_tiles_never_entered() {
        let mut world = hecs::World::new();
        let mut grid = open_grid(3, 3);
        put_wall(&mut grid, &mut world, 1, 1);
        grid.tile_mut(TileCoord::new(2, 2)).unwrap().tile_type = TileType::Empty;

        let graph = PathGraph::build(&grid);
        assert_eq!(graph.node_count(), 8);
        assert!(!graph.contains(TileCoord::new(2, 2)));
        for coord in [TileCoord::new(0, 0), TileCoord::new(1, 0), TileCoord::new(2, 1)] {
            assert!(graph.edges(coord).iter().all(|e| e.to != TileCoord::new(1, 1)));
        }
        // Standing on the wall, the way out is open
        assert!(!graph.edges(TileCoord::new(1, 1)).is_empty());
        assert!(find_path(&graph, TileCoord::new(0, 0), TileCoord::new(1, 1), true).is_none());
    }

    #[test]
    fn test_no_corner_clipping() {
        let mut world = hecs::World::new();
        let mut grid = open_grid(2, 2);
        put_wall(&mut grid, &mut world, 1, 0);

        let graph = PathGraph::build(&grid);
        assert!(graph
            .edges(TileCoord::new(0, 0))
            .iter()
            .all(|e| e.to != TileCoord::new(1, 1)));

        let path = find_path(&graph, TileCoord::new(0, 0), TileCoord::new(1, 1), true).unwrap();
        assert_eq!(path.len(), 2);
        assert!((path.cost() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_walls_force_detour() {
        let mut world = hecs::World::new();
        let mut grid = open_grid(5, 5);
        for y in 0..4 {
            put_wall(&mut grid, &mut world, 2, y);
        }
        let graph = PathGraph::build(&grid);
        let path = find_path(&graph, TileCoord::new(0, 0), TileCoord::new(4, 0), true).unwrap();
        assert!(path.tiles().any(|t| t.y == 4));
        assert!(path.tiles().all(|t| grid.movement_cost(*t) > 0.0));
    }

    #[test]
    fn test_unreachable() {
        let mut world = hecs::World::new();
        let mut grid = open_grid(5, 5);
        for y in 0..5 {
            put_wall(&mut grid, &mut world, 2, y);
        }
        let graph = PathGraph::build(&grid);
        assert!(find_path(&graph, TileCoord::new(0, 0), TileCoord::new(4, 0), true).is_none());
    }

    #[test]
    fn test_end_beside_impassable_goal() {
        let mut world = hecs::World::new();
        let mut grid = open_grid(5, 1);
        put_wall(&mut grid, &mut world, 4, 0);
        let graph = PathGraph::build(&grid);

        assert!(find_path(&graph, TileCoord::new(0, 0), TileCoord::new(4, 0), true).is_none());
        let path = find_path(&graph, TileCoord::new(0, 0), TileCoord::new(4, 0), false).unwrap();
        assert_eq!(path.last(), Some(TileCoord::new(3, 0)));
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn test_already_there() {
        let grid = open_grid(3, 3);
        let graph = PathGraph::build(&grid);
        let path = find_path(&graph, TileCoord::new(1, 1), TileCoord::new(1, 1), true).unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn test_cost_weighted_tiles_avoided() {
        let mut world = hecs::World::new();
        let mut grid = open_grid(3, 3);
        grid.tile_mut(TileCoord::new(1, 0)).unwrap().furniture = Some(Installed {
            entity: world.spawn(()),
            movement_cost: 10.0,
            room_border: false,
        });
        let graph = PathGraph::build(&grid);
        let path = find_path(&graph, TileCoord::new(0, 0), TileCoord::new(2, 0), true).unwrap();
        assert!(!path.tiles().any(|t| *t == TileCoord::new(1, 0)));
    }

    #[test]
    fn test_cache_rebuilds_lazily() {
        let grid = open_grid(4, 4);
        let mut cache = PathCache::new(8);
        assert!(!cache.is_valid());

        cache.find_path(&grid, TileCoord::new(0, 0), TileCoord::new(3, 3), true);
        cache.find_path(&grid, TileCoord::new(0, 0), TileCoord::new(3, 0), true);
        assert_eq!(cache.rebuild_count(), 1);
        assert_eq!(cache.cache_size(), 2);

        cache.invalidate();
        cache.invalidate();
        assert_eq!(cache.cache_size(), 0);
        assert_eq!(cache.rebuild_count(), 1);

        cache.find_path(&grid, TileCoord::new(0, 0), TileCoord::new(3, 3), true);
        assert_eq!(cache.rebuild_count(), 2);
    }

    #[test]
    fn test_cache_hit_and_eviction() {
        let grid = open_grid(4, 4);
        let mut cache = PathCache::new(2);
        let first = cache.find_path(&grid, TileCoord::new(0, 0), TileCoord::new(3, 3), true);
        let again = cache.find_path(&grid, TileCoord::new(0, 0), TileCoord::new(3, 3), true);
        assert_eq!(first, again);
        assert_eq!(cache.cache_size(), 1);

        cache.find_path(&grid, TileCoord::new(0, 0), TileCoord::new(1, 0), true);
        cache.find_path(&grid, TileCoord::new(0, 0), TileCoord::new(2, 0), true);
        assert_eq!(cache.cache_size(), 2);
    }
}
