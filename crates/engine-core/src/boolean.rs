//! Boolean operations on closed paths.
//!
//! Curves are flattened to polygons and clipped with `geo`'s sweep-line
//! boolean ops; the result comes back as straight-edged closed subpaths.
//! Multiple subpaths in one operand combine with even-odd semantics, so a
//! ring inside another ring is a hole.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;

use geo::{Area, BooleanOps, Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::geometry::Point;
use crate::path::{self, Anchor};
use crate::path_codec::{self, Subpath};

/// Rings with less area than this are clipping noise, not geometry.
const SLIVER_AREA: f64 = 1e-7;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BooleanOp {
    Union,
    Subtract,
    Intersect,
    Exclude,
}

impl fmt::Display for BooleanOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BooleanOp::Union => "union",
            BooleanOp::Subtract => "subtract",
            BooleanOp::Intersect => "intersect",
            BooleanOp::Exclude => "exclude",
        })
    }
}

impl FromStr for BooleanOp {
    type Err = BooleanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "union" => Ok(BooleanOp::Union),
            "subtract" | "difference" => Ok(BooleanOp::Subtract),
            "intersect" | "intersection" => Ok(BooleanOp::Intersect),
            "exclude" | "xor" => Ok(BooleanOp::Exclude),
            other => Err(BooleanError::UnknownOp(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BooleanError {
    #[error("boolean operation needs at least two operands, got {0}")]
    TooFewOperands(usize),
    #[error("operand {0} has non-finite coordinates")]
    NonFinite(usize),
    #[error("{op} failed at step {step}")]
    Failed { op: BooleanOp, step: usize },
    #[error("unknown boolean operation: {0}")]
    UnknownOp(String),
}

/// A filled area made of closed subpaths. An empty region is a valid result
/// (for example the intersection of disjoint shapes).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Region {
    pub subpaths: Vec<Subpath>,
}

impl Region {
    pub fn from_anchors(anchors: Vec<Anchor>) -> Self {
        Self {
            subpaths: vec![Subpath {
                anchors,
                closed: true,
            }],
        }
    }

    /// Every subpath of a path string, each treated as closed.
    pub fn from_path_string(d: &str) -> Self {
        let subpaths = path_codec::decode_subpaths(d)
            .into_iter()
            .map(|s| Subpath {
                anchors: s.anchors,
                closed: true,
            })
            .collect();
        Self { subpaths }
    }

    pub fn is_empty(&self) -> bool {
        self.subpaths.iter().all(|s| s.anchors.len() < 3)
    }

    pub fn to_path_string(&self) -> String {
        path_codec::encode_subpaths(&self.subpaths)
    }

    /// Enclosed area with even-odd hole handling.
    pub fn area(&self) -> f64 {
        self.to_multi_polygon(16).unsigned_area()
    }

    fn to_multi_polygon(&self, steps: usize) -> MultiPolygon<f64> {
        self.subpaths
            .iter()
            .filter_map(|s| ring(&s.anchors, steps))
            .fold(MultiPolygon::new(Vec::new()), |acc, poly| {
                let single = MultiPolygon::new(vec![poly]);
                if acc.0.is_empty() { single } else { acc.xor(&single) }
            })
    }

    fn from_multi_polygon(mp: MultiPolygon<f64>) -> Self {
        let mut subpaths = Vec::new();
        for poly in mp {
            let (exterior, interiors) = poly.into_inner();
            for ls in std::iter::once(exterior).chain(interiors) {
                if let Some(sub) = subpath_from_ring(&ls) {
                    subpaths.push(sub);
                }
            }
        }
        Self { subpaths }
    }

    fn is_finite(&self) -> bool {
        self.subpaths
            .iter()
            .all(|s| s.anchors.iter().all(Anchor::is_finite))
    }
}

fn ring(anchors: &[Anchor], steps: usize) -> Option<Polygon<f64>> {
    if anchors.len() < 3 {
        return None;
    }
    let mut pts = path::flatten(anchors, true, steps);
    // `flatten` repeats the first point for closed paths; geo closes rings
    // itself.
    if pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    if pts.len() < 3 {
        return None;
    }
    let coords: Vec<Coord<f64>> = pts.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
    Some(Polygon::new(LineString::new(coords), Vec::new()))
}

fn subpath_from_ring(ls: &LineString<f64>) -> Option<Subpath> {
    let mut pts: Vec<Point> = ls.coords().map(|c| Point::new(c.x, c.y)).collect();
    if pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    if pts.len() < 3 || crate::geometry::signed_area(&pts).abs() < SLIVER_AREA {
        return None;
    }
    Some(Subpath {
        anchors: pts.into_iter().map(|p| Anchor::new(p.x, p.y)).collect(),
        closed: true,
    })
}

/// Boolean engine with a configurable curve flattening density.
#[derive(Clone, Copy, Debug)]
pub struct BooleanEngine {
    pub flatten_steps: usize,
}

impl Default for BooleanEngine {
    fn default() -> Self {
        Self { flatten_steps: 16 }
    }
}

impl BooleanEngine {
    pub fn new(flatten_steps: usize) -> Self {
        Self {
            flatten_steps: flatten_steps.max(1),
        }
    }

    /// Apply `op` to two regions.
    pub fn op(&self, a: &Region, b: &Region, op: BooleanOp) -> Result<Region, BooleanError> {
        self.step(a, b, op, 1)
    }

    /// Left fold over `operands`: `op(op(op(p0, p1), p2), p3)...`. The first
    /// failing step aborts the whole fold.
    pub fn fold(&self, operands: &[Region], op: BooleanOp) -> Result<Region, BooleanError> {
        let [first, rest @ ..] = operands else {
            return Err(BooleanError::TooFewOperands(0));
        };
        if rest.is_empty() {
            return Err(BooleanError::TooFewOperands(1));
        }
        if let Some(i) = operands.iter().position(|r| !r.is_finite()) {
            return Err(BooleanError::NonFinite(i));
        }
        rest.iter()
            .enumerate()
            .try_fold(first.clone(), |acc, (i, next)| self.step(&acc, next, op, i + 1))
    }

    fn step(
        &self,
        a: &Region,
        b: &Region,
        op: BooleanOp,
        step: usize,
    ) -> Result<Region, BooleanError> {
        if !a.is_finite() {
            return Err(BooleanError::NonFinite(step - 1));
        }
        if !b.is_finite() {
            return Err(BooleanError::NonFinite(step));
        }
        let ma = a.to_multi_polygon(self.flatten_steps);
        let mb = b.to_multi_polygon(self.flatten_steps);
        // The sweep can panic on pathological input; surface it as a failed
        // step instead of tearing down the caller.
        let result = panic::catch_unwind(AssertUnwindSafe(|| match op {
            BooleanOp::Union => ma.union(&mb),
            BooleanOp::Subtract => ma.difference(&mb),
            BooleanOp::Intersect => ma.intersection(&mb),
            BooleanOp::Exclude => ma.xor(&mb),
        }));
        match result {
            Ok(mp) => Ok(Region::from_multi_polygon(mp)),
            Err(_) => {
                warn!(%op, step, "boolean operation failed");
                Err(BooleanError::Failed { op, step })
            }
        }
    }
}

/// [`BooleanEngine::op`] with default flattening.
pub fn op(a: &Region, b: &Region, kind: BooleanOp) -> Result<Region, BooleanError> {
    BooleanEngine::default().op(a, b, kind)
}

/// [`BooleanEngine::fold`] with default flattening.
pub fn fold(operands: &[Region], kind: BooleanOp) -> Result<Region, BooleanError> {
    BooleanEngine::default().fold(operands, kind)
}
