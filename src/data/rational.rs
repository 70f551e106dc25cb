use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Zero;

use crate::data::Point;
use crate::exact;
use crate::exact::EPSILON;

/// A sweep point in homogeneous coordinates `(x/w, y/w)`.
///
/// `w == 0.0` marks a literal input point stored verbatim in `x`/`y`.
/// A proper intersection carries `w > 0.0` together with per-coordinate
/// error magnitudes and a snapshot of the two generating segments, from
/// which exact expansions are materialized lazily (and memoized) the first
/// time a filtered comparison comes back ambiguous.
#[derive(Debug, Clone, Default)]
pub struct RationalPoint {
  pub x: f64,
  pub y: f64,
  pub w: f64,
  pub x_err: f64,
  pub y_err: f64,
  pub w_err: f64,
  // Generating segments (bundle canonicals at discovery time); only
  // meaningful while w > 0.
  seg_a: [f64; 4],
  seg_b: [f64; 4],
  exact: bool,
  x_exact: Vec<f64>,
  y_exact: Vec<f64>,
  w_exact: Vec<f64>,
}

impl RationalPoint {
  pub fn literal(p: Point) -> RationalPoint {
    RationalPoint {
      x: p.x,
      y: p.y,
      ..RationalPoint::default()
    }
  }

  /// Builds the intersection of segment `a = (ax, ay) -> (ax2, ay2)` with
  /// segment `b`, given the filtered determinant `det > 0` and the filtered
  /// cross product `a2` of `(b.start - a.end)` with `(b.end - a.end)`,
  /// together with their absolute error bounds.
  ///
  /// The homogeneous coordinates are
  /// `x = ax2 * det + (ax2 - ax) * a2`, `y` analogously, `w = det`.
  pub fn intersection(
    a: [f64; 4],
    b: [f64; 4],
    det: f64,
    det_err: f64,
    a2: f64,
    a2_err: f64,
  ) -> RationalPoint {
    let (x, x_err) = homogeneous_coord(a[0], a[2], det, det_err, a2, a2_err);
    let (y, y_err) = homogeneous_coord(a[1], a[3], det, det_err, a2, a2_err);
    RationalPoint {
      x,
      y,
      w: det,
      x_err,
      y_err,
      w_err: det_err,
      seg_a: a,
      seg_b: b,
      ..RationalPoint::default()
    }
  }

  /// Resets a pooled point to a fresh literal, keeping expansion buffers.
  pub fn reset(&mut self, p: Point) {
    self.x = p.x;
    self.y = p.y;
    self.w = 0.0;
    self.x_err = 0.0;
    self.y_err = 0.0;
    self.w_err = 0.0;
    self.exact = false;
    self.x_exact.clear();
    self.y_exact.clear();
    self.w_exact.clear();
  }

  /// Copies another point's value into this (pooled) one, keeping the
  /// expansion buffers for reuse. Memoized exacts are recomputed on demand.
  pub fn assign(&mut self, other: &RationalPoint) {
    self.x = other.x;
    self.y = other.y;
    self.w = other.w;
    self.x_err = other.x_err;
    self.y_err = other.y_err;
    self.w_err = other.w_err;
    self.seg_a = other.seg_a;
    self.seg_b = other.seg_b;
    self.exact = false;
    self.x_exact.clear();
    self.y_exact.clear();
    self.w_exact.clear();
  }

  #[inline]
  pub fn is_literal(&self) -> bool {
    self.w == 0.0
  }

  /// The point rounded to doubles; at most one ULP off per coordinate for
  /// a true intersection.
  pub fn rounded(&self) -> Point {
    if self.is_literal() {
      Point::new(self.x, self.y)
    } else {
      Point::new(self.x / self.w, self.y / self.w)
    }
  }

  /// Materializes `x_exact`, `y_exact`, `w_exact` from the generating
  /// segments. Idempotent: the expansions are computed once and memoized.
  pub fn make_exact(&mut self) {
    if self.exact || self.is_literal() {
      return;
    }
    let [ax, ay, ax2, ay2] = self.seg_a;
    let [bx, by, bx2, by2] = self.seg_b;
    self.w_exact = exact::perp_dot_exact(ax, ay, ax2, ay2, bx, by, bx2, by2);
    let offset = exact::perp_dot_exact(ax2, ay2, bx, by, ax2, ay2, bx2, by2);
    self.x_exact = exact_coord(ax, ax2, &self.w_exact, &offset);
    self.y_exact = exact_coord(ay, ay2, &self.w_exact, &offset);
    self.exact = true;
  }

  fn numerator(&self, which: Axis) -> Numerator<'_> {
    let (float, expansion) = match which {
      Axis::X => (self.x, &self.x_exact),
      Axis::Y => (self.y, &self.y_exact),
    };
    if self.is_literal() {
      Numerator::Literal(float)
    } else {
      debug_assert!(self.exact);
      Numerator::Expansion(expansion)
    }
  }

  fn denominator(&self) -> Denominator<'_> {
    if self.is_literal() {
      Denominator::One
    } else {
      debug_assert!(self.exact);
      Denominator::Expansion(&self.w_exact)
    }
  }

  /// Exact coordinates as rationals; intended for external validation of
  /// emitted intersection points.
  pub fn exact_value(&mut self) -> (BigRational, BigRational) {
    if self.is_literal() {
      return (rat(self.x), rat(self.y));
    }
    self.make_exact();
    let w = expansion_to_rational(&self.w_exact);
    (
      expansion_to_rational(&self.x_exact) / w.clone(),
      expansion_to_rational(&self.y_exact) / w,
    )
  }
}

#[derive(Clone, Copy)]
enum Axis {
  X,
  Y,
}

enum Numerator<'a> {
  Literal(f64),
  Expansion(&'a [f64]),
}

enum Denominator<'a> {
  One,
  Expansion(&'a [f64]),
}

/// Sweep comparison of `key` against `item`: negative when `key` comes
/// first (above, ties to the left), zero only on exact coincidence.
///
/// Both points may memoize exact expansions as a side effect.
pub fn sweep_delta(key: &mut RationalPoint, item: &mut RationalPoint) -> f64 {
  if key.is_literal() && item.is_literal() {
    let dy = key.y - item.y;
    if dy != 0.0 {
      return dy;
    }
    return key.x - item.x;
  }

  match filtered_axis_delta(key, item, Axis::Y) {
    Some(d) => d,
    None => {
      key.make_exact();
      item.make_exact();
      let dy = exact_axis_delta(key, item, Axis::Y);
      if dy != 0.0 {
        dy
      } else {
        match filtered_axis_delta(key, item, Axis::X) {
          Some(d) => d,
          None => exact_axis_delta(key, item, Axis::X),
        }
      }
    }
  }
}

/// Filtered compare of `key.axis / key.w` against `item.axis / item.w`.
/// Returns `None` when the sign cannot be certified.
fn filtered_axis_delta(key: &RationalPoint, item: &RationalPoint, axis: Axis) -> Option<f64> {
  let (kn, kn_err) = match axis {
    Axis::X => (key.x, key.x_err),
    Axis::Y => (key.y, key.y_err),
  };
  let (inn, in_err) = match axis {
    Axis::X => (item.x, item.x_err),
    Axis::Y => (item.y, item.y_err),
  };
  let (kw, kw_err) = if key.is_literal() { (1.0, 0.0) } else { (key.w, key.w_err) };
  let (iw, iw_err) = if item.is_literal() { (1.0, 0.0) } else { (item.w, item.w_err) };

  let t1 = kn * iw;
  let t2 = inn * kw;
  let det = t1 - t2;
  let bound = 2.0
    * (EPSILON * (t1.abs() + t2.abs())
      + kn_err * iw.abs()
      + iw_err * kn.abs()
      + in_err * kw.abs()
      + kw_err * inn.abs());
  if det.abs() > bound {
    Some(det)
  } else {
    None
  }
}

/// Exact sign of `key.axis * item.w - item.axis * key.w`, both points
/// already materialized.
fn exact_axis_delta(key: &RationalPoint, item: &RationalPoint, axis: Axis) -> f64 {
  let lhs = cross_term(key.numerator(axis), item.denominator());
  let rhs = cross_term(item.numerator(axis), key.denominator());
  let neg: Vec<f64> = rhs.iter().map(|&c| -c).collect();
  exact::approximate(&exact::big_sum(&lhs, &neg))
}

fn cross_term(num: Numerator<'_>, den: Denominator<'_>) -> Vec<f64> {
  match (num, den) {
    (Numerator::Literal(n), Denominator::One) => vec![n],
    (Numerator::Literal(n), Denominator::Expansion(w)) => exact::small_prod(w, n),
    (Numerator::Expansion(e), Denominator::One) => e.to_vec(),
    (Numerator::Expansion(e), Denominator::Expansion(w)) => exact::big_prod(e, w),
  }
}

/// `lo`/`hi` are one axis of segment `a`; computes the homogeneous
/// coordinate `hi * det + (hi - lo) * a2` with a conservative error bound.
fn homogeneous_coord(
  lo: f64,
  hi: f64,
  det: f64,
  det_err: f64,
  a2: f64,
  a2_err: f64,
) -> (f64, f64) {
  let t1 = hi * det;
  let d = hi - lo;
  let t2 = d * a2;
  let v = t1 + t2;
  let err = EPSILON * (t1.abs() + 2.0 * t2.abs() + v.abs())
    + hi.abs() * det_err
    + d.abs() * a2_err;
  (v, 2.0 * err)
}

/// `hi * w_exact + (hi - lo) * offset`, all exact. At most 96 components.
fn exact_coord(lo: f64, hi: f64, w_exact: &[f64], offset: &[f64]) -> Vec<f64> {
  let scaled = exact::small_prod(w_exact, hi);
  let diff = exact::two_diff(hi, lo);
  let shift = exact::big_prod(&diff, offset);
  exact::big_sum(&scaled, &shift)
}

fn rat(x: f64) -> BigRational {
  BigRational::from_float(x).unwrap_or_else(|| BigRational::from_integer(BigInt::zero()))
}

fn expansion_to_rational(e: &[f64]) -> BigRational {
  let mut acc = BigRational::from_integer(BigInt::zero());
  for &c in e {
    acc += rat(c);
  }
  acc
}
