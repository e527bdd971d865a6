//! Pixel geometry of the heatmap grid
//!
//! All coordinates here are in content space: the full `max_columns` wide
//! region before the pan offset is applied.

use super::blob_size::{Limited, limit, transform_bucket_size};
use super::bucket_matrix::BucketMatrix;
use shared::GridSection;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Row is the swimlane, column the bucket. Either may fall outside the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub row: i32,
    pub column: i32,
}

impl Cell {
    pub const fn new(row: i32, column: i32) -> Self {
        Self { row, column }
    }
}

/// Scan direction when looking for the first cell whose blob is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridGeometry {
    pub grid_size: u32,
    pub gutter_size: u32,
    pub max_columns: usize,
}

impl GridGeometry {
    pub fn from_config(grid: &GridSection) -> Self {
        Self {
            grid_size: grid.grid_size,
            gutter_size: grid.gutter_size,
            max_columns: grid.max_columns,
        }
    }

    fn grid(&self) -> f64 {
        f64::from(self.grid_size)
    }

    /// Swimlane height: a gutter above and below one row of cells.
    pub fn lane_height(&self) -> f64 {
        f64::from(2 * self.gutter_size + self.grid_size)
    }

    /// Width of the whole scrollable region.
    pub fn region_width(&self) -> f64 {
        self.max_columns as f64 * self.grid()
    }

    /// Largest radius that still leaves a one pixel margin inside a cell.
    pub fn max_blob_radius(&self) -> f64 {
        f64::from((self.grid_size.saturating_sub(1)) / 2)
    }

    pub fn blob_radius(&self, count: u32) -> Limited {
        let maximum = self.max_blob_radius();
        limit(transform_bucket_size(count, maximum), maximum)
    }

    pub fn coords_to_cell(&self, point: Point) -> Cell {
        Cell {
            row: (point.y / self.lane_height()).floor() as i32,
            column: (point.x / self.grid()).floor() as i32,
        }
    }

    /// Top-left corner of the cell's lane slot.
    pub fn cell_to_coords(&self, cell: Cell) -> Point {
        Point {
            x: f64::from(cell.column) * self.grid(),
            y: f64::from(cell.row) * self.lane_height(),
        }
    }

    /// Blob centre, aligned to half pixels so one pixel outlines stay crisp.
    pub fn blob_center(&self, cell: Cell) -> Point {
        let origin = self.cell_to_coords(cell);
        let half = f64::from(self.grid_size / 2);
        Point {
            x: origin.x + 0.5 + half,
            y: origin.y + 0.5 + f64::from(self.gutter_size) + half,
        }
    }

    /// Cell containing `point`, corrected when the blob in that cell is not
    /// actually visible at `point`.
    ///
    /// Scanning `Left` from the viewport's left edge: if the edge has already
    /// passed the blob's right side, the first visible blob is one column
    /// further right. Scanning `Right` mirrors this.
    pub fn find_cell_with_visible_blob(
        &self,
        point: Point,
        direction: Direction,
        buckets: &BucketMatrix,
    ) -> Cell {
        let cell = self.coords_to_cell(point);
        let radius = self.blob_radius(buckets.value(cell.row, cell.column)).value;
        if radius <= 0.0 {
            return cell;
        }

        let center_x = self.cell_to_coords(cell).x + self.grid() / 2.0;
        match direction {
            Direction::Left if point.x > center_x + radius => Cell::new(cell.row, cell.column + 1),
            Direction::Right if point.x < center_x - radius => Cell::new(cell.row, cell.column - 1),
            _ => cell,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn geometry() -> GridGeometry {
        GridGeometry::from_config(&GridSection::default())
    }

    #[test]
    fn default_lane_is_78_pixels() {
        assert_eq!(geometry().lane_height(), 78.0);
        assert_eq!(geometry().region_width(), 2880.0);
        assert_eq!(geometry().max_blob_radius(), 14.0);
    }

    #[test]
    fn coordinates_map_to_cells() {
        let geometry = geometry();
        assert_eq!(geometry.coords_to_cell(Point::new(0.0, 0.0)), Cell::new(0, 0));
        assert_eq!(geometry.coords_to_cell(Point::new(29.9, 77.9)), Cell::new(0, 0));
        assert_eq!(geometry.coords_to_cell(Point::new(30.0, 78.0)), Cell::new(1, 1));
        assert_eq!(geometry.coords_to_cell(Point::new(-1.0, 10.0)), Cell::new(0, -1));
    }

    #[test]
    fn blob_center_sits_inside_the_cell() {
        let center = geometry().blob_center(Cell::new(1, 2));
        assert_eq!(center, Point::new(75.5, 78.0 + 24.0 + 15.5));
    }

    #[test]
    fn empty_cell_is_returned_unchanged() {
        let buckets = BucketMatrix::from_rows([vec![0, 0, 0]], 3);
        let cell = geometry().find_cell_with_visible_blob(
            Point::new(40.0, 10.0),
            Direction::Left,
            &buckets,
        );
        assert_eq!(cell, Cell::new(0, 1));
    }

    #[test]
    fn left_scan_skips_a_blob_already_scrolled_past() {
        // Single difference: radius 2 around x = 45.
        let buckets = BucketMatrix::from_rows([vec![0, 1, 0]], 3);
        let geometry = geometry();
        let passed = geometry.find_cell_with_visible_blob(
            Point::new(50.0, 10.0),
            Direction::Left,
            &buckets,
        );
        assert_eq!(passed, Cell::new(0, 2));

        let visible = geometry.find_cell_with_visible_blob(
            Point::new(46.0, 10.0),
            Direction::Left,
            &buckets,
        );
        assert_eq!(visible, Cell::new(0, 1));
    }

    #[test]
    fn right_scan_skips_a_blob_not_yet_reached() {
        let buckets = BucketMatrix::from_rows([vec![0, 1, 0]], 3);
        let cell = geometry().find_cell_with_visible_blob(
            Point::new(35.0, 10.0),
            Direction::Right,
            &buckets,
        );
        assert_eq!(cell, Cell::new(0, 0));
    }

    proptest! {
        #[test]
        fn cell_origin_maps_back_to_the_cell(row in 0i32..50, column in 0i32..96) {
            let geometry = geometry();
            let cell = Cell::new(row, column);
            prop_assert_eq!(geometry.coords_to_cell(geometry.cell_to_coords(cell)), cell);
            prop_assert_eq!(geometry.coords_to_cell(geometry.blob_center(cell)), cell);
        }

        #[test]
        fn pixel_lies_within_its_cell(x in 0.0f64..5000.0, y in 0.0f64..2000.0) {
            let geometry = geometry();
            let origin = geometry.cell_to_coords(geometry.coords_to_cell(Point::new(x, y)));
            let (dx, dy) = (x - origin.x, y - origin.y);
            prop_assert!((-1e-9..f64::from(geometry.grid_size) + 1e-9).contains(&dx));
            prop_assert!((-1e-9..geometry.lane_height() + 1e-9).contains(&dy));
        }
    }
}
