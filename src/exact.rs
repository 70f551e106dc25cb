//! Adaptive-precision arithmetic for the sweep predicates.
//!
//! The building blocks are Shewchuk-style error-free transformations and
//! floating-point expansions: a value represented exactly as a sum of
//! nonoverlapping doubles of decreasing magnitude (stored here smallest
//! component first). `perp_dot_sign` is the one predicate the rest of the
//! crate cares about; it runs a cheap filter first and escalates to exact
//! expansion arithmetic only when the filter cannot certify the sign.

/// Machine epsilon for `f64` rounding, 2⁻⁵³.
pub const EPSILON: f64 = 1.0 / 9007199254740992.0;

/// 2²⁷ + 1, used to split a double into two half-width factors.
pub const SPLITTER: f64 = 134217729.0;

/// First-stage relative error bound for the perp-dot filter.
pub const PERP_ERR_BOUND_1: f64 = (16.0 * EPSILON + 3.0) * EPSILON;

/// Second-stage bound, applied after the two-two-sum refinement.
pub const PERP_ERR_BOUND_2: f64 = (12.0 * EPSILON + 2.0) * EPSILON;

/// Rounding error of `hi = a + b`. Valid for any finite operands.
#[inline]
pub fn two_sum_tail(a: f64, b: f64, hi: f64) -> f64 {
  let bvirt = hi - a;
  let avirt = hi - bvirt;
  let bround = b - bvirt;
  let around = a - avirt;
  around + bround
}

/// Rounding error of `hi = a - b`.
#[inline]
pub fn two_diff_tail(a: f64, b: f64, hi: f64) -> f64 {
  let bvirt = a - hi;
  let avirt = hi + bvirt;
  let bround = bvirt - b;
  let around = a - avirt;
  around + bround
}

#[inline]
fn split(a: f64) -> (f64, f64) {
  let c = SPLITTER * a;
  let hi = c - (c - a);
  (hi, a - hi)
}

/// Rounding error of `hi = a * b`.
#[inline]
pub fn two_product_tail(a: f64, b: f64, hi: f64) -> f64 {
  let (ahi, alo) = split(a);
  let (bhi, blo) = split(b);
  let err = hi - ahi * bhi;
  let err = err - alo * bhi;
  let err = err - ahi * blo;
  alo * blo - err
}

/// Exact difference `a - b` as a 2-expansion.
#[inline]
pub fn two_diff(a: f64, b: f64) -> [f64; 2] {
  let hi = a - b;
  [two_diff_tail(a, b, hi), hi]
}

/// Exact product `a * b` as a 2-expansion.
#[inline]
pub fn two_product(a: f64, b: f64) -> [f64; 2] {
  let hi = a * b;
  [two_product_tail(a, b, hi), hi]
}

/// Sum of two 2-expansions into a 4-expansion (smallest component first).
#[inline]
pub fn two_two_sum(a: [f64; 2], b: [f64; 2]) -> [f64; 4] {
  let i = a[0] + b[0];
  let x0 = two_sum_tail(a[0], b[0], i);
  let j = a[1] + i;
  let t = two_sum_tail(a[1], i, j);
  let k = t + b[1];
  let x1 = two_sum_tail(t, b[1], k);
  let x3 = j + k;
  let x2 = two_sum_tail(j, k, x3);
  [x0, x1, x2, x3]
}

/// Difference of two 2-expansions.
#[inline]
pub fn two_two_diff(a: [f64; 2], b: [f64; 2]) -> [f64; 4] {
  two_two_sum(a, [-b[0], -b[1]])
}

/// Adds two expansions, eliminating zero components.
///
/// Both inputs and the output are nonoverlapping and sorted by increasing
/// magnitude. Writes at most `e.len() + f.len()` components.
pub fn big_sum(e: &[f64], f: &[f64]) -> Vec<f64> {
  let mut h = Vec::with_capacity(e.len() + f.len());
  big_sum_into(e, f, &mut h);
  h
}

/// `big_sum` into a caller-provided buffer (cleared first).
pub fn big_sum_into(e: &[f64], f: &[f64], h: &mut Vec<f64>) {
  h.clear();
  h.reserve(e.len() + f.len());
  let mut ei = 0;
  let mut fi = 0;
  let mut take = |ei: &mut usize, fi: &mut usize| -> Option<f64> {
    match (e.get(*ei), f.get(*fi)) {
      (Some(&ev), Some(&fv)) => {
        if ev.abs() <= fv.abs() {
          *ei += 1;
          Some(ev)
        } else {
          *fi += 1;
          Some(fv)
        }
      }
      (Some(&ev), None) => {
        *ei += 1;
        Some(ev)
      }
      (None, Some(&fv)) => {
        *fi += 1;
        Some(fv)
      }
      (None, None) => None,
    }
  };
  let mut q = match take(&mut ei, &mut fi) {
    Some(v) => v,
    None => return,
  };
  while let Some(next) = take(&mut ei, &mut fi) {
    let sum = q + next;
    let tail = two_sum_tail(q, next, sum);
    if tail != 0.0 {
      h.push(tail);
    }
    q = sum;
  }
  if q != 0.0 || h.is_empty() {
    h.push(q);
  }
}

/// Scales an expansion by a single double, eliminating zeros.
///
/// Writes at most `2 * e.len()` components.
pub fn small_prod(e: &[f64], b: f64) -> Vec<f64> {
  let mut h = Vec::with_capacity(2 * e.len());
  if e.is_empty() || b == 0.0 {
    h.push(0.0);
    return h;
  }
  let p = two_product(e[0], b);
  if p[0] != 0.0 {
    h.push(p[0]);
  }
  let mut q = p[1];
  for &ei in &e[1..] {
    let t = two_product(ei, b);
    let sum1 = q + t[0];
    let tail1 = two_sum_tail(q, t[0], sum1);
    if tail1 != 0.0 {
      h.push(tail1);
    }
    let sum2 = t[1] + sum1;
    let tail2 = two_sum_tail(t[1], sum1, sum2);
    if tail2 != 0.0 {
      h.push(tail2);
    }
    q = sum2;
  }
  if q != 0.0 || h.is_empty() {
    h.push(q);
  }
  h
}

/// Exact product of two expansions: distributes `small_prod` over `f` and
/// folds with `big_sum`. Writes at most `2 * e.len() * f.len()` components.
pub fn big_prod(e: &[f64], f: &[f64]) -> Vec<f64> {
  let mut acc: Vec<f64> = vec![0.0];
  for &fi in f {
    if fi == 0.0 {
      continue;
    }
    let part = small_prod(e, fi);
    acc = big_sum(&acc, &part);
  }
  acc
}

/// Collapses an expansion to a single double. The result carries the exact
/// sign of the expansion (the largest component dominates the sum).
#[inline]
pub fn approximate(e: &[f64]) -> f64 {
  let mut q = 0.0;
  for &c in e {
    q += c;
  }
  q
}

/// Sign of `(a2 - a1) × (b2 - b1)` as a double whose sign is exact.
///
/// The magnitude is only meaningful while the filter stages hold; once the
/// computation escalates, only the sign survives.
#[allow(clippy::too_many_arguments)]
pub fn perp_dot_sign(
  ax1: f64,
  ay1: f64,
  ax2: f64,
  ay2: f64,
  bx1: f64,
  by1: f64,
  bx2: f64,
  by2: f64,
) -> f64 {
  let dax = ax2 - ax1;
  let day = ay2 - ay1;
  let dbx = bx2 - bx1;
  let dby = by2 - by1;

  let hi_a = dax * dby;
  let hi_b = day * dbx;
  let det = hi_a - hi_b;

  // Products of opposite sign (or one of them zero) cannot have the sign
  // of their difference disturbed by rounding.
  if (hi_a >= 0.0 && hi_b <= 0.0) || (hi_a <= 0.0 && hi_b >= 0.0) {
    return det;
  }

  let det_sum = hi_a.abs() + hi_b.abs();
  if det.abs() >= det_sum * PERP_ERR_BOUND_1 {
    return det;
  }

  // Refine with the exact product tails of the rounded differences.
  let lo_a = two_product_tail(dax, dby, hi_a);
  let lo_b = two_product_tail(day, dbx, hi_b);
  let b = two_two_diff([lo_a, hi_a], [lo_b, hi_b]);
  let refined = approximate(&b);
  let exact_diffs = two_diff_tail(ax2, ax1, dax) == 0.0
    && two_diff_tail(ay2, ay1, day) == 0.0
    && two_diff_tail(bx2, bx1, dbx) == 0.0
    && two_diff_tail(by2, by1, dby) == 0.0;
  if exact_diffs || refined.abs() >= det_sum * PERP_ERR_BOUND_2 {
    return refined;
  }

  approximate(&perp_dot_exact(ax1, ay1, ax2, ay2, bx1, by1, bx2, by2))
}

/// Exact expansion of `(a2 - a1) × (b2 - b1)`. At most 16 components.
#[allow(clippy::too_many_arguments)]
pub fn perp_dot_exact(
  ax1: f64,
  ay1: f64,
  ax2: f64,
  ay2: f64,
  bx1: f64,
  by1: f64,
  bx2: f64,
  by2: f64,
) -> Vec<f64> {
  let dax = two_diff(ax2, ax1);
  let day = two_diff(ay2, ay1);
  let dbx = two_diff(bx2, bx1);
  let dby = two_diff(by2, by1);
  let left = big_prod(&dax, &dby);
  let right = big_prod(&day, &dbx);
  let neg: Vec<f64> = right.iter().map(|&c| -c).collect();
  big_sum(&left, &neg)
}
