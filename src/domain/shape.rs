/// Placeable shapes: footprints of cell offsets relative to an origin.

use super::geometry::Cell;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shape {
    pub name: &'static str,
    pub offsets: Vec<(i32, i32)>,
}

impl Shape {
    pub fn new(name: &'static str, offsets: &[(i32, i32)]) -> Self {
        Shape { name, offsets: offsets.to_vec() }
    }

    /// Stock palette offered by the sandbox, cycled with a key.
    pub fn palette() -> Vec<Shape> {
        vec![
            Shape::new("single", &[(0, 0)]),
            Shape::new("bar", &[(0, 0), (1, 0)]),
            Shape::new("line", &[(0, 0), (1, 0), (2, 0)]),
            Shape::new("ell", &[(0, 0), (1, 0), (0, 1)]),
            Shape::new("square", &[(0, 0), (1, 0), (0, 1), (1, 1)]),
        ]
    }

    /// Quarter turn clockwise about the origin: (x, y) → (y, -x).
    pub fn rotated_cw(&self) -> Shape {
        Shape {
            name: self.name,
            offsets: self.offsets.iter().map(|&(x, y)| (y, -x)).collect(),
        }
    }

    /// Absolute cells when placed at `origin`.
    pub fn footprint(&self, origin: Cell) -> Vec<Cell> {
        self.offsets.iter().map(|&(dx, dy)| origin.offset(dx, dy)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn footprint_is_origin_relative() {
        let s = Shape::new("bar", &[(0, 0), (1, 0)]);
        assert_eq!(s.footprint(Cell::new(3, 4)), vec![Cell::new(3, 4), Cell::new(4, 4)]);
    }

    #[test]
    fn four_rotations_restore_shape() {
        let s = Shape::new("ell", &[(0, 0), (1, 0), (0, 1)]);
        let r = s.rotated_cw().rotated_cw().rotated_cw().rotated_cw();
        assert_eq!(r, s);
        assert_eq!(s.rotated_cw().offsets, vec![(0, 0), (0, -1), (1, 0)]);
    }
}
