//! Geometry primitives shared by the parser and layout analyzer.
//!
//! PDF user space has its origin at the bottom-left of a page with Y growing
//! upward. All coordinates in this crate stay in that space until the
//! package serializer converts to output units.

use serde::{Deserialize, Serialize};

/// A point in PDF user space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle with `x0 <= x1` and `y0 <= y1`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    /// Create a rectangle, normalizing corner order.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn from_points(a: Point, b: Point) -> Self {
        Self::new(a.x, a.y, b.x, b.y)
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn center_x(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }

    pub fn center_y(&self) -> f32 {
        (self.y0 + self.y1) / 2.0
    }

    /// Smallest rectangle containing both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x0 <= other.x1 && other.x0 <= self.x1 && self.y0 <= other.y1 && other.y0 <= self.y1
    }

    /// Horizontal overlap length with another rectangle (0 when disjoint).
    pub fn x_overlap(&self, other: &Rect) -> f32 {
        (self.x1.min(other.x1) - self.x0.max(other.x0)).max(0.0)
    }

    /// Clamp this rectangle into `bounds`.
    pub fn clamped_to(&self, bounds: &Rect) -> Rect {
        Rect {
            x0: self.x0.clamp(bounds.x0, bounds.x1),
            y0: self.y0.clamp(bounds.y0, bounds.y1),
            x1: self.x1.clamp(bounds.x0, bounds.x1),
            y1: self.y1.clamp(bounds.y0, bounds.y1),
        }
    }
}

/// A 2D affine transformation matrix `[a b c d e f]` as used by the `cm` and
/// `Tm` operators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self * other` in PDF convention: applying the result is equivalent to
    /// applying `self` first, then `other`.
    pub fn concat(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn transform_point(&self, p: Point) -> Point {
        Point {
            x: self.a * p.x + self.c * p.y + self.e,
            y: self.b * p.x + self.d * p.y + self.f,
        }
    }

    /// Bounding box of a transformed rectangle.
    pub fn transform_rect(&self, r: &Rect) -> Rect {
        let corners = [
            self.transform_point(Point::new(r.x0, r.y0)),
            self.transform_point(Point::new(r.x1, r.y0)),
            self.transform_point(Point::new(r.x0, r.y1)),
            self.transform_point(Point::new(r.x1, r.y1)),
        ];
        let mut out = Rect::from_points(corners[0], corners[1]);
        out = out.union(&Rect::from_points(corners[2], corners[3]));
        out
    }

    /// Effective vertical scale factor, used to compute rendered font sizes.
    pub fn vertical_scale(&self) -> f32 {
        (self.b * self.b + self.d * self.d).sqrt()
    }

    /// Effective horizontal scale factor.
    pub fn horizontal_scale(&self) -> f32 {
        (self.a * self.a + self.c * self.c).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_normalizes_corners() {
        let r = Rect::new(10.0, 20.0, 5.0, 2.0);
        assert_eq!(r.x0, 5.0);
        assert_eq!(r.y0, 2.0);
        assert_eq!(r.width(), 5.0);
        assert_eq!(r.height(), 18.0);
    }

    #[test]
    fn test_rect_union_and_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 20.0, 20.0);
        let u = a.union(&b);
        assert_eq!(u, Rect::new(0.0, 0.0, 20.0, 20.0));
        assert!(a.intersects(&b));
        assert_eq!(a.x_overlap(&b), 5.0);

        let c = Rect::new(30.0, 30.0, 40.0, 40.0);
        assert!(!a.intersects(&c));
        assert_eq!(a.x_overlap(&c), 0.0);
    }

    #[test]
    fn test_matrix_concat_translation() {
        let m = Matrix::translation(5.0, 7.0).concat(&Matrix::translation(1.0, -2.0));
        let p = m.transform_point(Point::new(0.0, 0.0));
        assert_eq!(p, Point::new(6.0, 5.0));
    }

    #[test]
    fn test_matrix_scale_rect() {
        let m = Matrix::new(2.0, 0.0, 0.0, 3.0, 0.0, 0.0);
        let r = m.transform_rect(&Rect::new(1.0, 1.0, 2.0, 2.0));
        assert_eq!(r, Rect::new(2.0, 3.0, 4.0, 6.0));
        assert_eq!(m.vertical_scale(), 3.0);
        assert_eq!(m.horizontal_scale(), 2.0);
    }

    #[test]
    fn test_rotation_preserves_scale() {
        // 90-degree rotation
        let m = Matrix::new(0.0, 1.0, -1.0, 0.0, 0.0, 0.0);
        assert!((m.vertical_scale() - 1.0).abs() < 1e-6);
        let p = m.transform_point(Point::new(1.0, 0.0));
        assert!((p.x - 0.0).abs() < 1e-6 && (p.y - 1.0).abs() < 1e-6);
    }
}
