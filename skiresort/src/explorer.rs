use std::fmt;

use rayon::prelude::*;
use strum::IntoEnumIterator;

use crate::grid::{Coordinate, Direction, DirectionIter, Grid};

/// A maximal strictly-descending path, stored from its highest cell down to
/// the cell where the descent stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    cells: Vec<Coordinate>,
}

impl Route {
    pub fn cells(&self) -> &[Coordinate] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn start(&self) -> Coordinate {
        self.cells[0]
    }

    pub fn end(&self) -> Coordinate {
        self.cells[self.cells.len() - 1]
    }

    pub fn elevation_drop(&self, grid: &Grid) -> i64 {
        drop_between(grid, &self.cells)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.cells {
            write!(f, "{c} -> ")?;
        }
        write!(f, "Finish")
    }
}

fn drop_between(grid: &Grid, cells: &[Coordinate]) -> i64 {
    match (cells.first(), cells.last()) {
        (Some(&first), Some(&last)) => i64::from(grid[first]) - i64::from(grid[last]),
        _ => 0,
    }
}

/// Two passes over `routes`: keep the longest, then among those the ones with
/// the largest drop, and return the earliest survivor.
pub fn select_best(routes: impl IntoIterator<Item = Route>, grid: &Grid) -> Option<Route> {
    let routes = routes.into_iter().collect::<Vec<_>>();

    let max_len = routes.iter().map(Route::len).max()?;
    let longest = routes
        .into_iter()
        .filter(|r| r.len() == max_len)
        .collect::<Vec<_>>();

    let max_drop = longest.iter().map(|r| r.elevation_drop(grid)).max()?;
    longest
        .into_iter()
        .find(|r| r.elevation_drop(grid) == max_drop)
}

/// Best candidate seen so far, seeded with the single-cell route at `start`.
///
/// Every route from `start` has length >= 1 and drop >= 0. If `start` has a
/// lower neighbor its routes are all longer than the seed; otherwise its only
/// route is the seed itself. So the seed never outlives a real route.
#[derive(Debug)]
struct BestTracker {
    len: usize,
    drop: i64,
    cells: Vec<Coordinate>,
}

impl BestTracker {
    fn new(start: Coordinate) -> Self {
        Self {
            len: 1,
            drop: 0,
            cells: vec![start],
        }
    }

    // Only a strictly better (length, drop) replaces the incumbent, so the
    // earliest of equal candidates wins.
    fn offer(&mut self, cells: &[Coordinate], drop: i64) {
        if (cells.len(), drop) > (self.len, self.drop) {
            self.len = cells.len();
            self.drop = drop;
            self.cells = cells.to_vec();
        }
    }

    fn merge(&mut self, other: BestTracker) {
        if (other.len, other.drop) > (self.len, self.drop) {
            *self = other;
        }
    }

    fn into_route(self) -> Route {
        Route { cells: self.cells }
    }
}

struct Frame {
    directions: DirectionIter,
    extended: bool,
}

impl Frame {
    fn new() -> Self {
        Self {
            directions: Direction::iter(),
            extended: false,
        }
    }
}

/// Exhaustive depth-first enumeration of every maximal descending route.
///
/// The number of routes grows exponentially with the length and branching of
/// descending chains, and nothing here bounds it. `best_route` keeps a single
/// candidate while enumerating; `routes` materializes all of them.
#[derive(Debug, Clone, Copy)]
pub struct RouteExplorer<'g> {
    grid: &'g Grid,
}

impl<'g> RouteExplorer<'g> {
    pub fn new(grid: &'g Grid) -> Self {
        Self { grid }
    }

    /// Calls `visit` with every maximal route starting at `start`, in
    /// west, east, north, south branching order.
    pub fn visit_routes_from<F>(&self, start: Coordinate, mut visit: F)
    where
        F: FnMut(&[Coordinate]),
    {
        if !self.grid.contains(start) {
            return;
        }

        let mut path = vec![start];
        let mut frames = vec![Frame::new()];

        while let Some(frame) = frames.last_mut() {
            let Some(&current) = path.last() else {
                break;
            };
            let elevation = self.grid[current];

            let next = frame
                .directions
                .by_ref()
                .filter_map(|d| self.grid.neighbor(current, d))
                .find(|n| self.grid[*n] < elevation);

            match next {
                Some(next) => {
                    frame.extended = true;
                    path.push(next);
                    frames.push(Frame::new());
                }
                None => {
                    if !frame.extended {
                        visit(&path);
                    }
                    frames.pop();
                    path.pop();
                }
            }
        }
    }

    pub fn routes_from(&self, start: Coordinate) -> Vec<Route> {
        let mut routes = Vec::new();
        self.visit_routes_from(start, |cells| {
            routes.push(Route {
                cells: cells.to_vec(),
            })
        });

        tracing::trace!(%start, count = routes.len(), "enumerated routes");

        routes
    }

    /// Every maximal route, starting cells taken row by row.
    pub fn routes(&self) -> Vec<Route> {
        self.grid
            .coordinates()
            .flat_map(|start| self.routes_from(start))
            .collect()
    }

    /// Same routes in the same order as [`RouteExplorer::routes`], with the
    /// starting cells spread over the rayon pool.
    pub fn par_routes(&self) -> Vec<Route> {
        let starts = self.grid.coordinates().collect::<Vec<_>>();
        starts
            .par_iter()
            .map(|&start| self.routes_from(start))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    }

    fn best_from(&self, start: Coordinate, tracker: &mut BestTracker) {
        self.visit_routes_from(start, |cells| {
            tracker.offer(cells, drop_between(self.grid, cells))
        });
    }

    /// The longest route, ties broken by the largest drop and then by
    /// enumeration order.
    pub fn best_route(&self) -> Route {
        // A grid always has a cell at the origin.
        let mut tracker = BestTracker::new(Coordinate::new(0, 0));
        for start in self.grid.coordinates() {
            self.best_from(start, &mut tracker);
        }

        let best = tracker.into_route();
        self.log_best(&best);
        best
    }

    pub fn par_best_route(&self) -> Route {
        let starts = self.grid.coordinates().collect::<Vec<_>>();
        let per_start = starts
            .par_iter()
            .map(|&start| {
                let mut tracker = BestTracker::new(start);
                self.best_from(start, &mut tracker);
                tracker
            })
            .collect::<Vec<_>>();

        let mut tracker = BestTracker::new(Coordinate::new(0, 0));
        for candidate in per_start {
            tracker.merge(candidate);
        }

        let best = tracker.into_route();
        self.log_best(&best);
        best
    }

    fn log_best(&self, route: &Route) {
        tracing::debug!(
            start = %route.start(),
            end = %route.end(),
            len = route.len(),
            drop = route.elevation_drop(self.grid),
            "selected best route"
        );
    }
}
