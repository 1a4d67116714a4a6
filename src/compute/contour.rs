//! Marching-squares isoline extraction.
//!
//! The sampled field is treated as a non-periodic lattice: sample `(x, y)` sits
//! at grid coordinate `(x, y)` and the `(width-1) x (height-1)` cells between
//! neighbouring samples are swept in row-major order. A one-cell border of
//! virtual samples surrounds the grid; virtual samples always count as below
//! the threshold, so every contour that reaches the grid edge is closed along
//! it and all output rings are closed.
//!
//! # Saddle cells
//!
//! When diagonally opposite corners agree but adjacent corners differ, the mean
//! of the four corner values decides: above the threshold joins the two above
//! corners through the cell centre, otherwise each above corner is cut off on
//! its own.
//!
//! # Orientation
//!
//! Rings keep the above-threshold region on their left in screen orientation
//! (y pointing down). Rings around above regions have negative
//! [`Polyline::signed_area`], rings around holes positive.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::EngineError;

/// Points closer than this on both axes are treated as the same vertex.
pub const POINT_EPSILON: f32 = 1e-6;

/// Edge-value differences below this interpolate to the edge midpoint.
const FLAT_EDGE_EPSILON: f32 = 1e-12;

const NO_EDGE: usize = usize::MAX;

/// A point in grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Equality within [`POINT_EPSILON`].
    #[inline]
    pub fn approx_eq(&self, other: &Point) -> bool {
        (self.x - other.x).abs() <= POINT_EPSILON && (self.y - other.y).abs() <= POINT_EPSILON
    }
}

/// A closed ring; the last point repeats the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub points: Vec<Point>,
}

impl Polyline {
    /// Start and end coincide.
    pub fn is_closed(&self) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => self.points.len() > 1 && first.approx_eq(last),
            _ => false,
        }
    }

    /// Distinct vertices, not counting the closing point.
    pub fn vertex_count(&self) -> usize {
        if self.is_closed() {
            self.points.len() - 1
        } else {
            self.points.len()
        }
    }

    /// Shoelace area in grid coordinates.
    pub fn signed_area(&self) -> f32 {
        let twice: f32 = self
            .points
            .windows(2)
            .map(|w| w[0].x * w[1].y - w[1].x * w[0].y)
            .sum();
        twice * 0.5
    }
}

/// All rings of one extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contour {
    /// Level the rings were traced at.
    pub threshold: f32,
    /// Rings in deterministic scan order.
    pub polylines: Vec<Polyline>,
}

impl Contour {
    #[inline]
    pub fn len(&self) -> usize {
        self.polylines.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.polylines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Polyline> {
        self.polylines.iter()
    }
}

/// Oriented segment between two lattice edges: (entry, exit).
type Segment = (usize, usize);

/// Sampled field plus its virtual border, addressed in padded coordinates.
///
/// Padded `(px, py)` maps to sample `(px - 1, py - 1)`.
struct Lattice<'a> {
    field: &'a [f32],
    width: usize,
    height: usize,
    threshold: f32,
}

impl Lattice<'_> {
    #[inline]
    fn padded_width(&self) -> usize {
        self.width + 2
    }

    #[inline]
    fn edge_count(&self) -> usize {
        self.padded_width() * (self.height + 2) * 2
    }

    #[inline]
    fn sample(&self, px: usize, py: usize) -> Option<f32> {
        if px == 0 || py == 0 || px > self.width || py > self.height {
            None
        } else {
            Some(self.field[(py - 1) * self.width + px - 1])
        }
    }

    #[inline]
    fn is_above(&self, px: usize, py: usize) -> bool {
        self.sample(px, py).is_some_and(|v| v > self.threshold)
    }

    /// Horizontal edge `(px, py)-(px+1, py)`.
    #[inline]
    fn horizontal(&self, px: usize, py: usize) -> usize {
        (py * self.padded_width() + px) * 2
    }

    /// Vertical edge `(px, py)-(px, py+1)`.
    #[inline]
    fn vertical(&self, px: usize, py: usize) -> usize {
        (py * self.padded_width() + px) * 2 + 1
    }

    /// Threshold crossing on a lattice edge.
    fn crossing(&self, edge: usize) -> Point {
        let node = edge / 2;
        let (px, py) = (node % self.padded_width(), node / self.padded_width());
        let (qx, qy) = if edge % 2 == 0 { (px + 1, py) } else { (px, py + 1) };

        let t = match (self.sample(px, py), self.sample(qx, qy)) {
            (Some(va), Some(vb)) => {
                let span = vb - va;
                if span.abs() < FLAT_EDGE_EPSILON {
                    0.5
                } else {
                    let t = (self.threshold - va) / span;
                    if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.5 }
                }
            }
            // Crossings into the virtual border sit on the real sample.
            (Some(_), None) => 0.0,
            (None, Some(_)) => 1.0,
            (None, None) => 0.5,
        };

        let (ax, ay) = (px as f32 - 1.0, py as f32 - 1.0);
        let (bx, by) = (qx as f32 - 1.0, qy as f32 - 1.0);
        Point::new(ax + t * (bx - ax), ay + t * (by - ay))
    }

    /// Append the oriented segments of padded cell `(cx, cy)`.
    ///
    /// Corners run clockwise from the top-left; edge `i` joins corner `i` to
    /// corner `i + 1`. Walking an edge from a below corner to an above corner
    /// enters the above region, the reverse exits it, and each segment runs
    /// from an entry edge to an exit edge.
    fn cell_segments(&self, cx: usize, cy: usize, out: &mut Vec<Segment>) {
        let corners = [(cx, cy), (cx + 1, cy), (cx + 1, cy + 1), (cx, cy + 1)];
        let above = corners.map(|(x, y)| self.is_above(x, y));

        let case = above
            .iter()
            .enumerate()
            .fold(0u8, |acc, (i, &a)| acc | ((a as u8) << i));
        if case == 0b0000 || case == 0b1111 {
            return;
        }

        let edges = [
            self.horizontal(cx, cy),
            self.vertical(cx + 1, cy),
            self.horizontal(cx, cy + 1),
            self.vertical(cx, cy),
        ];

        if case == 0b0101 || case == 0b1010 {
            let center_above = self.corner_mean(&corners) > self.threshold;
            for i in 0..4 {
                let prev = (i + 3) % 4;
                if center_above && !above[i] {
                    out.push((edges[i], edges[prev]));
                } else if !center_above && above[i] {
                    out.push((edges[prev], edges[i]));
                }
            }
            return;
        }

        let mut entry = NO_EDGE;
        let mut exit = NO_EDGE;
        for i in 0..4 {
            let next = (i + 1) % 4;
            if above[i] != above[next] {
                if above[next] {
                    entry = edges[i];
                } else {
                    exit = edges[i];
                }
            }
        }
        out.push((entry, exit));
    }

    /// Mean of the four corners; virtual corners pull it to -inf.
    fn corner_mean(&self, corners: &[(usize, usize); 4]) -> f32 {
        let mut sum = 0.0;
        for &(x, y) in corners {
            match self.sample(x, y) {
                Some(v) => sum += v,
                None => return f32::NEG_INFINITY,
            }
        }
        sum * 0.25
    }

    /// Collect segments row by row (parallel, order-preserving).
    fn segments(&self) -> Vec<Segment> {
        let rows: Vec<Vec<Segment>> = (0..=self.height)
            .into_par_iter()
            .map(|cy| {
                let mut out = Vec::new();
                for cx in 0..=self.width {
                    self.cell_segments(cx, cy, &mut out);
                }
                out
            })
            .collect();
        rows.into_iter().flatten().collect()
    }

    /// Link segments through shared edges into rings.
    fn stitch(&self, segments: &[Segment]) -> Vec<Polyline> {
        let mut next = vec![NO_EDGE; self.edge_count()];
        for &(entry, exit) in segments {
            next[entry] = exit;
        }

        let mut visited = vec![false; self.edge_count()];
        let mut polylines = Vec::new();

        for &(start, _) in segments {
            if visited[start] {
                continue;
            }
            let mut points = Vec::new();
            let mut edge = start;
            loop {
                visited[edge] = true;
                points.push(self.crossing(edge));
                let following = next[edge];
                if following == start {
                    break;
                }
                if following == NO_EDGE || visited[following] {
                    log::warn!("Contour chain broken at lattice edge {}", edge);
                    break;
                }
                edge = following;
            }
            if let Some(ring) = close_ring(points) {
                polylines.push(ring);
            }
        }

        polylines
    }
}

/// Collapse repeated vertices and close the ring.
///
/// Rings with fewer than three distinct vertices enclose no area and are
/// dropped.
fn close_ring(points: Vec<Point>) -> Option<Polyline> {
    let mut ring: Vec<Point> = Vec::with_capacity(points.len() + 1);
    for p in points {
        if ring.last().is_none_or(|last| !last.approx_eq(&p)) {
            ring.push(p);
        }
    }
    while ring.len() > 1 && ring[ring.len() - 1].approx_eq(&ring[0]) {
        ring.pop();
    }
    if ring.len() < 3 {
        return None;
    }
    ring.push(ring[0]);
    Some(Polyline { points: ring })
}

/// Trace the `threshold` isolines of a row-major `width x height` field.
///
/// Samples strictly greater than `threshold` are inside. A field that is flat
/// at the threshold therefore yields no rings. Output is a pure function of
/// the inputs.
pub fn extract(
    field: &[f32],
    width: usize,
    height: usize,
    threshold: f32,
) -> Result<Contour, EngineError> {
    if field.len() != width * height {
        return Err(EngineError::FieldLengthMismatch {
            expected: width * height,
            actual: field.len(),
        });
    }
    if field.is_empty() {
        return Ok(Contour {
            threshold,
            polylines: Vec::new(),
        });
    }

    let lattice = Lattice {
        field,
        width,
        height,
        threshold,
    };
    let segments = lattice.segments();
    let polylines = lattice.stitch(&segments);

    Ok(Contour {
        threshold,
        polylines,
    })
}
