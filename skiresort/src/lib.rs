use anyhow::Result;

pub mod explorer;
pub mod grid;

pub use explorer::{select_best, Route, RouteExplorer};
pub use grid::{Coordinate, Direction, Elevation, Grid, GridParseError};

/// Parses a map and finds its best route. Parse failures come back as a
/// [`GridParseError`] inside the `anyhow::Error`.
pub fn get_best_route(input: &str, parallel: bool) -> Result<(Grid, Route)> {
    let grid: Grid = input.parse()?;
    let explorer = RouteExplorer::new(&grid);

    let route = if parallel {
        explorer.par_best_route()
    } else {
        explorer.best_route()
    };

    Ok((grid, route))
}
