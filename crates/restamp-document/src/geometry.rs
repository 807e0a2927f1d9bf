// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page-space geometry: rectangles, and PDF transformation matrices on top of
// euclid's `Transform2D`.
//
// All coordinates are in default user space: origin at the bottom-left of the
// media box, x to the right, y upwards.

use euclid::{Box2D, Transform2D, point2, vec2};
use serde::Serialize;

/// Axis-aligned rectangle in page space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl Rect {
    pub fn new(min_x: f32, max_x: f32, min_y: f32, max_y: f32) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// Rectangle spanning two arbitrary corner points.
    pub fn from_corners(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self::new(x0.min(x1), x0.max(x1), y0.min(y1), y0.max(y1))
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            self.min_x.min(other.min_x),
            self.max_x.max(other.max_x),
            self.min_y.min(other.min_y),
            self.max_y.max(other.max_y),
        )
    }

    /// Grow by `margin` on every side.
    pub fn inflate(&self, margin: f32) -> Rect {
        Rect::new(
            self.min_x - margin,
            self.max_x + margin,
            self.min_y - margin,
            self.max_y + margin,
        )
    }

    /// Whether `inner` lies inside `self`, allowing `tolerance` of overhang.
    pub fn contains(&self, inner: &Rect, tolerance: f32) -> bool {
        inner.min_x >= self.min_x - tolerance
            && inner.max_x <= self.max_x + tolerance
            && inner.min_y >= self.min_y - tolerance
            && inner.max_y <= self.max_y + tolerance
    }
}

/// Unit marker for PDF user space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfSpace;

/// PDF transformation matrix `[a b c d e f]`. euclid's `m11 m12 m21 m22 m31
/// m32` are the same six numbers in the same row-vector order, and `a.then(&b)`
/// is the PDF product `a × b`.
pub type Matrix = Transform2D<f32, PdfSpace, PdfSpace>;

/// Length of the transformed unit y vector.
pub fn vertical_scale(matrix: &Matrix) -> f32 {
    matrix.transform_vector(vec2(0.0, 1.0)).length()
}

/// Bounding box of the rectangle `x, y, w, h` after `matrix`.
pub fn transform_rect(matrix: &Matrix, x: f32, y: f32, w: f32, h: f32) -> Rect {
    let corners = Box2D::from_points([point2(x, y), point2(x + w, y + h)]);
    let bounds = matrix.outer_transformed_box(&corners);
    Rect::new(bounds.min.x, bounds.max.x, bounds.min.y, bounds.max.y)
}
