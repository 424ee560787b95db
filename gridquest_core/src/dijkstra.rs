// Dijkstra engine: distance fields and reversed paths over a weight grid.
//
// Classical min-priority-queue shortest path on the 4-connected grid,
// implemented with a `BinaryHeap` (min-heap via `Reverse`, the same pattern
// as the event queue in most of our tooling). Stale heap entries are
// skipped on pop. Entries tie-break on the offset's `(y, x)` order, so the
// search is fully deterministic.
//
// The cost of a path is the sum of the weights of the cells *entered* —
// the start cell's own weight is never paid. An optional early-exit
// predicate stops the search at the first (nearest) matching cell and
// reports it as the destination.
//
// `reversed_path` then walks from the destination back toward the start,
// always stepping to the cheapest neighbor, alternating between two
// direction orders on successive hops so long diagonal routes come out as
// staircases instead of an L. The result is destination-first and excludes
// the start cell, so `path.last()` is the next step to take.
//
// See also: `weights.rs` for how the cost grid is produced.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::grid::{Grid, Offset, DIRECTIONS, EAST, NORTH, SOUTH, WEST};
use crate::weights::infinity;

/// The two neighbor orders alternated while extracting a path. Both are
/// tried cheapest-first; swapping the preference each hop avoids the
/// pathological zig-zag a single fixed order produces.
const MIXED_DIRECTIONS: [[Offset; 4]; 2] = [
    [NORTH, EAST, SOUTH, WEST],
    [WEST, SOUTH, EAST, NORTH],
];

/// Compute the distance field from `start`, stopping early at the first
/// popped cell satisfying `predicate`. Returns the distances and the
/// matching cell, if any. Unreached cells hold `infinity()`.
pub fn distance_map_to<F>(
    weights: &Grid<i32>,
    start: Offset,
    mut predicate: F,
) -> (Grid<i32>, Option<Offset>)
where
    F: FnMut(Offset) -> bool,
{
    assert!(weights.is_in_range(start), "start {start} out of range");

    let inf = infinity(weights.size());
    let mut dist = Grid::new(weights.width(), weights.height(), inf);
    dist[start] = 0;

    let mut queue = BinaryHeap::new();
    queue.push(Reverse((0, start)));
    let mut destination = None;

    while let Some(Reverse((d, p))) = queue.pop() {
        if d > dist[p] {
            continue; // stale entry, already settled cheaper
        }
        if predicate(p) {
            destination = Some(p);
            break;
        }
        for direction in DIRECTIONS {
            let neighbor = p + direction;
            if !dist.is_in_range(neighbor) {
                continue;
            }
            let candidate = d + weights[neighbor];
            if candidate < dist[neighbor] {
                dist[neighbor] = candidate;
                queue.push(Reverse((candidate, neighbor)));
            }
        }
    }

    (dist, destination)
}

/// Fill the whole distance field, ignoring any destination.
pub fn distance_map(weights: &Grid<i32>, start: Offset) -> Grid<i32> {
    distance_map_to(weights, start, |_| false).0
}

/// Shortest path from `start` to the nearest cell matching `predicate`,
/// reversed: the first element is the destination, the last element is
/// 4-adjacent to `start`. Empty when nothing matches, when the match is
/// unreachable, or when `start` itself matches.
pub fn reversed_path<F>(weights: &Grid<i32>, start: Offset, predicate: F) -> Vec<Offset>
where
    F: FnMut(Offset) -> bool,
{
    let (dist, destination) = distance_map_to(weights, start, predicate);
    let mut path = Vec::new();

    if let Some(mut current) = destination {
        if dist[current] < infinity(weights.size()) {
            let mut toggle = false;
            while current != start {
                path.push(current);
                current = MIXED_DIRECTIONS[toggle as usize]
                    .iter()
                    .map(|&direction| current + direction)
                    .filter(|&p| dist.is_in_range(p))
                    .min_by_key(|&p| dist[p])
                    .expect("a settled cell always has an in-range neighbor");
                toggle = !toggle;
            }
        }
    }

    path
}
