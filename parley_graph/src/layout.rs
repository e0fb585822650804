//! Deterministic initial placement for freshly decoded graphs.

use parley_data::Position;
use serde::{Deserialize, Serialize};

/// Grid parameters: nodes run left to right and wrap to a new row once `x` passes `wrap_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub origin_x: f64,
    pub origin_y: f64,
    pub column_step: f64,
    pub row_step: f64,
    pub wrap_at: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            origin_x: 100.0,
            origin_y: 100.0,
            column_step: 350.0,
            row_step: 400.0,
            wrap_at: 1000.0,
        }
    }
}

impl LayoutConfig {
    pub fn grid(&self) -> GridLayout<'_> {
        GridLayout {
            config: self,
            x: self.origin_x,
            y: self.origin_y,
        }
    }
}

/// Endless iterator of grid positions in enumeration order.
#[derive(Debug, Clone)]
pub struct GridLayout<'a> {
    config: &'a LayoutConfig,
    x: f64,
    y: f64,
}

impl Iterator for GridLayout<'_> {
    type Item = Position;

    fn next(&mut self) -> Option<Position> {
        let current = Position::new(self.x, self.y);
        self.x += self.config.column_step;
        if self.x > self.config.wrap_at {
            self.x = self.config.origin_x;
            self.y += self.config.row_step;
        }
        Some(current)
    }
}
