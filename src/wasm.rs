use wasm_bindgen::prelude::wasm_bindgen;

use crate::grid::Grid;

/// Parse and solve a puzzle definition, returning the solved grid as text.
///
/// Returns `undefined` if the definition is invalid or no solution was found.
#[wasm_bindgen]
pub fn solve_puzzle(definition: &str) -> Option<String> {
    let mut grid: Grid = definition.parse().ok()?;
    match grid.solve() {
        Ok(true) => Some(grid.to_string()),
        _ => None,
    }
}
