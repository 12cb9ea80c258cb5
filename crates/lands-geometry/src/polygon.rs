//! Tile set to multipolygon
//!
//! Each tile is a `TILE_SIZE` square anchored at its origin. The union of all
//! squares is computed on a compressed grid made of every distinct tile edge
//! coordinate, so overlapping or unaligned tiles need no special handling.
//! Boundary edges are oriented with the covered side on the left, which makes
//! outer rings counter-clockwise and holes clockwise, and are then chained
//! into closed rings.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use lands_core::{Region, TILE_SIZE, TileCoordinate};
use serde::{Deserialize, Serialize};

/// A vertex in world units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub z: i64,
}

impl Point {
    pub const fn new(x: i64, z: i64) -> Self {
        Self { x, z }
    }
}

/// Closed ring: the first point is repeated as the last
pub type Ring = Vec<Point>;

/// Rendered footprint of a region, meant for an even-odd fill
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiPolygon {
    pub rings: Vec<Ring>,
}

impl MultiPolygon {
    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    pub fn ring_count(&self) -> usize {
        self.rings.len()
    }

    /// Covered area in square world units
    ///
    /// Holes wind opposite to their outer ring, so signed ring areas sum to
    /// the area of the union.
    pub fn area(&self) -> i128 {
        self.rings.iter().map(|ring| signed_area_doubled(ring)).sum::<i128>() / 2
    }

    /// Even-odd point-in-polygon test over all rings
    pub fn contains(&self, x: f64, z: f64) -> bool {
        let mut inside = false;
        for ring in &self.rings {
            for edge in ring.windows(2) {
                let (a, b) = (edge[0], edge[1]);
                let (ax, az, bx, bz) = (a.x as f64, a.z as f64, b.x as f64, b.z as f64);
                if (az > z) != (bz > z) {
                    let crossing = ax + (z - az) * (bx - ax) / (bz - az);
                    if x < crossing {
                        inside = !inside;
                    }
                }
            }
        }
        inside
    }
}

fn signed_area_doubled(ring: &[Point]) -> i128 {
    ring.windows(2)
        .map(|w| w[0].x as i128 * w[1].z as i128 - w[1].x as i128 * w[0].z as i128)
        .sum()
}

/// Geometry of a region's tiles
pub fn region_geometry(region: &Region) -> MultiPolygon {
    region_to_multipolygon(region.tiles())
}

/// Union of the given tiles, traced into closed rings
///
/// Duplicate tiles are ignored. An empty tile set yields no rings.
pub fn region_to_multipolygon<I>(tiles: I) -> MultiPolygon
where
    I: IntoIterator<Item = TileCoordinate>,
{
    let tiles: BTreeSet<TileCoordinate> = tiles.into_iter().collect();
    if tiles.is_empty() {
        return MultiPolygon::default();
    }

    let grid = CompressedGrid::new(&tiles);
    let mut outgoing = grid.boundary_edges();

    let mut rings = Vec::new();
    while let Some(start) = outgoing.keys().next().copied() {
        let Some(first) = take_step(&mut outgoing, start, &Step::ALL) else {
            break;
        };
        rings.push(grid.trace(&mut outgoing, start, first));
    }

    MultiPolygon { rings }
}

/// Direction of one boundary edge on the compressed grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    East,
    North,
    West,
    South,
}

impl Step {
    const ALL: [Step; 4] = [Step::East, Step::North, Step::West, Step::South];

    fn left(self) -> Self {
        match self {
            Step::East => Step::North,
            Step::North => Step::West,
            Step::West => Step::South,
            Step::South => Step::East,
        }
    }

    fn right(self) -> Self {
        match self {
            Step::East => Step::South,
            Step::South => Step::West,
            Step::West => Step::North,
            Step::North => Step::East,
        }
    }

    /// Edges only leave a vertex toward other grid vertices, so this never underflows
    fn apply(self, v: Vertex) -> Vertex {
        match self {
            Step::East => Vertex { row: v.row, col: v.col + 1 },
            Step::North => Vertex { row: v.row + 1, col: v.col },
            Step::West => Vertex { row: v.row, col: v.col - 1 },
            Step::South => Vertex { row: v.row - 1, col: v.col },
        }
    }
}

/// Grid vertex, ordered bottom row first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Vertex {
    row: usize,
    col: usize,
}

type Outgoing = BTreeMap<Vertex, Vec<Step>>;

fn take_step(outgoing: &mut Outgoing, at: Vertex, preference: &[Step]) -> Option<Step> {
    let steps = outgoing.get_mut(&at)?;
    let index = preference
        .iter()
        .find_map(|wanted| steps.iter().position(|s| s == wanted))?;
    let step = steps.swap_remove(index);
    if steps.is_empty() {
        outgoing.remove(&at);
    }
    Some(step)
}

struct CompressedGrid {
    xs: Vec<i64>,
    zs: Vec<i64>,
    /// Covered cells as (col, row)
    cells: HashSet<(usize, usize)>,
}

impl CompressedGrid {
    fn new(tiles: &BTreeSet<TileCoordinate>) -> Self {
        let mut xs = BTreeSet::new();
        let mut zs = BTreeSet::new();
        for tile in tiles {
            let (x, z) = (i64::from(tile.x), i64::from(tile.z));
            xs.extend([x, x + TILE_SIZE]);
            zs.extend([z, z + TILE_SIZE]);
        }
        let xs: Vec<i64> = xs.into_iter().collect();
        let zs: Vec<i64> = zs.into_iter().collect();

        let index = |axis: &[i64], value: i64| axis.binary_search(&value).unwrap_or_else(|i| i);

        let mut cells = HashSet::new();
        for tile in tiles {
            let (x, z) = (i64::from(tile.x), i64::from(tile.z));
            for col in index(&xs, x)..index(&xs, x + TILE_SIZE) {
                for row in index(&zs, z)..index(&zs, z + TILE_SIZE) {
                    cells.insert((col, row));
                }
            }
        }

        Self { xs, zs, cells }
    }

    fn covered(&self, col: usize, row: usize) -> bool {
        self.cells.contains(&(col, row))
    }

    /// Every cell side facing an uncovered neighbour, keyed by its start vertex
    fn boundary_edges(&self) -> Outgoing {
        let mut outgoing = Outgoing::new();
        let mut add = |row, col, step| {
            outgoing
                .entry(Vertex { row, col })
                .or_insert_with(Vec::new)
                .push(step);
        };

        for &(col, row) in &self.cells {
            if row == 0 || !self.covered(col, row - 1) {
                add(row, col, Step::East);
            }
            if !self.covered(col + 1, row) {
                add(row, col + 1, Step::North);
            }
            if !self.covered(col, row + 1) {
                add(row + 1, col + 1, Step::West);
            }
            if col == 0 || !self.covered(col - 1, row) {
                add(row + 1, col, Step::South);
            }
        }
        outgoing
    }

    /// Follow edges from `start` until the ring closes
    ///
    /// Where two rings touch at a single vertex the walk turns left first,
    /// which keeps diagonally adjacent squares in separate rings.
    fn trace(&self, outgoing: &mut Outgoing, start: Vertex, first: Step) -> Ring {
        let mut vertices = vec![start];
        let mut steps = vec![first];
        let mut at = first.apply(start);

        while at != start {
            let last = steps[steps.len() - 1];
            let Some(step) = take_step(outgoing, at, &[last.left(), last, last.right()]) else {
                break;
            };
            vertices.push(at);
            steps.push(step);
            at = step.apply(at);
        }

        // Keep only the vertices where the direction changes
        let n = steps.len();
        let mut ring: Ring = (0..n)
            .filter(|&k| steps[(k + n - 1) % n] != steps[k])
            .map(|k| self.point(vertices[k]))
            .collect();

        if let Some(&first_point) = ring.first() {
            ring.push(first_point);
        }
        ring
    }

    fn point(&self, v: Vertex) -> Point {
        Point::new(self.xs[v.col], self.zs[v.row])
    }
}
