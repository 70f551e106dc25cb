//! End-to-end scenarios: literal inputs with known decompositions, plus
//! randomized comparisons against naive oracles.

use monotess::{MonotoneRegion, Point, Tessellation};

use num::traits::Zero;
use num::{BigInt, BigRational};
use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn ring(pts: &[(f64, f64)]) -> Vec<Point> {
  pts.iter().map(|&(x, y)| Point::new(x, y)).collect()
}

/// Drives the sweep to completion, auditing the structures at every step.
fn tessellate(rings: Vec<Vec<Point>>) -> Tessellation {
  let mut tess = Tessellation::new(rings);
  let mut steps = 0;
  while tess.step() {
    steps += 1;
    assert!(tess.audit(), "audit failed after step {}", steps);
    assert!(steps < 100_000, "sweep failed to terminate");
  }
  tess
}

fn points(pts: &[Point]) -> Vec<(f64, f64)> {
  pts.iter().map(|p| (p.x, p.y)).collect()
}

fn region_area_2x(region: &MonotoneRegion) -> f64 {
  let boundary = region.boundary();
  let mut sum = 0.0;
  for i in 0..boundary.len() {
    let p = boundary[i];
    let q = boundary[(i + 1) % boundary.len()];
    sum += p.x * q.y - q.x * p.y;
  }
  sum.abs()
}

fn total_area(tess: &Tessellation) -> f64 {
  tess
    .monotone_regions()
    .iter()
    .map(|r| region_area_2x(r) / 2.0)
    .sum()
}

/// P3: both chains of every region are y-sorted (ties by x) and every
/// closed region has enough vertices to bound area.
fn assert_monotone(tess: &Tessellation) {
  for (i, region) in tess.monotone_regions().iter().enumerate() {
    assert!(!region.has_error(), "region {} flagged an error", i);
    for keep in [true, false] {
      let chain: Vec<&monotess::Vertex> = region
        .vertices()
        .iter()
        .filter(|v| v.is_left == keep)
        .collect();
      for w in chain.windows(2) {
        let ok = w[0].y < w[1].y || (w[0].y == w[1].y && w[0].x <= w[1].x);
        assert!(
          ok,
          "region {} chain (is_left={}) not sweep-sorted: {:?}",
          i,
          keep,
          region.vertices()
        );
      }
    }
    if region.is_closed() {
      assert!(region.vertices().len() >= 3, "closed region {} too small", i);
    }
  }
}

////////////////////////////////////////////////////////////////////////////
// Literal scenarios

#[test]
fn convex_square() {
  let tess = tessellate(vec![ring(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)])]);
  assert!(tess.intersection_points().is_empty());
  assert_eq!(tess.monotone_regions().len(), 1);
  let region = &tess.monotone_regions()[0];
  assert!(region.is_closed());
  assert_eq!(region.vertices().len(), 4);
  let lefts = region.vertices().iter().filter(|v| v.is_left).count();
  assert_eq!(lefts, 2);
  assert_eq!(
    points(&region.boundary()),
    vec![(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)]
  );
  assert_monotone(&tess);
}

#[test]
fn bowtie_splits_in_two() {
  let tess = tessellate(vec![ring(&[(0.0, 0.0), (1.0, 1.0), (1.0, 0.0), (0.0, 1.0)])]);
  assert_eq!(points(tess.intersection_points()), vec![(0.5, 0.5)]);
  assert_eq!(tess.monotone_regions().len(), 2);
  for region in tess.monotone_regions() {
    assert!(region.is_closed());
  }
  assert_monotone(&tess);
  let area = total_area(&tess);
  assert!((area - 0.5).abs() < 1e-12, "bowtie area {}", area);
}

#[test]
fn overlapping_l_shapes() {
  let r1 = ring(&[(0.0, 1.0), (0.0, 0.0), (1.0, 0.0), (4.0, 3.0), (4.0, 4.0), (3.0, 4.0)]);
  let r2 = ring(&[(3.0, 0.0), (4.0, 0.0), (4.0, 1.0), (1.0, 4.0), (0.0, 4.0), (0.0, 3.0)]);
  let tess = tessellate(vec![r1, r2]);
  assert_eq!(
    points(tess.intersection_points()),
    vec![(2.0, 1.0), (1.0, 2.0), (3.0, 2.0), (2.0, 3.0)]
  );
  assert_eq!(tess.monotone_regions().len(), 4);
  for region in tess.monotone_regions() {
    assert!(region.is_closed());
  }
  assert_monotone(&tess);
  // each band covers 7, the doubly-covered diamond of area 2 drops out
  let area = total_area(&tess);
  assert!((area - 10.0).abs() < 1e-9, "L-shape area {}", area);
}

#[test]
fn nested_hole_even_odd() {
  let outer = ring(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]);
  let inner = ring(&[(1.0, 1.0), (3.0, 1.0), (3.0, 3.0), (1.0, 3.0)]);
  let tess = tessellate(vec![outer, inner]);
  assert!(tess.intersection_points().is_empty());
  assert_eq!(tess.monotone_regions().len(), 2);
  assert_monotone(&tess);
  let area = total_area(&tess);
  assert!((area - 12.0).abs() < 1e-9, "annulus area {}", area);
}

#[test]
fn collinear_overlap() {
  // The bottom and top edges overlap on x ∈ [1, 2]; the doubled stretches
  // are winding-neutral, so the overlap drops out under even-odd and no
  // intersection points appear.
  let r1 = ring(&[(0.0, 0.0), (2.0, 0.0), (2.0, 1.0), (0.0, 1.0)]);
  let r2 = ring(&[(1.0, 0.0), (3.0, 0.0), (3.0, 1.0), (1.0, 1.0)]);
  let tess = tessellate(vec![r1, r2]);
  assert!(tess.intersection_points().is_empty());
  assert_eq!(tess.monotone_regions().len(), 2);
  assert_monotone(&tess);
  let area = total_area(&tess);
  assert!((area - 2.0).abs() < 1e-9, "overlap area {}", area);
}

#[test]
fn triangle_touching_square_edge() {
  // The triangle's apex rests on the square's left edge: the touch is an
  // endpoint intersection and must not be reported.
  let square = ring(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]);
  let triangle = ring(&[(-1.0, 0.5), (0.0, 1.0), (-1.0, 1.5)]);
  let tess = tessellate(vec![square, triangle]);
  assert!(
    tess.intersection_points().is_empty(),
    "spurious intersections: {:?}",
    tess.intersection_points()
  );
  assert_eq!(tess.monotone_regions().len(), 2);
  assert_monotone(&tess);
  let area = total_area(&tess);
  assert!((area - 4.5).abs() < 1e-9, "touch area {}", area);
}

#[test]
fn empty_and_degenerate_inputs() {
  let tess = tessellate(vec![]);
  assert!(tess.monotone_regions().is_empty());
  assert!(tess.intersection_points().is_empty());

  let tess = tessellate(vec![
    ring(&[(0.0, 0.0), (1.0, 0.0)]),
    ring(&[(5.0, 5.0), (5.0, 5.0), (5.0, 5.0)]),
  ]);
  assert!(tess.monotone_regions().is_empty());
  assert!(tess.intersection_points().is_empty());
}

#[test]
fn duplicate_points_are_skipped() {
  let tess = tessellate(vec![ring(&[
    (0.0, 0.0),
    (0.0, 0.0),
    (1.0, 0.0),
    (1.0, 1.0),
    (1.0, 1.0),
    (0.0, 1.0),
  ])]);
  assert_eq!(tess.monotone_regions().len(), 1);
  let area = total_area(&tess);
  assert!((area - 1.0).abs() < 1e-12);
}

#[test]
fn merge_and_split_reconnect() {
  // Two top lobes merging at (2,1), then splitting again at (2,3): the
  // merge defers closure until the split reconnects both regions.
  let tess = tessellate(vec![ring(&[
    (1.0, 0.0),
    (2.0, 1.0),
    (3.0, 0.0),
    (3.0, 4.0),
    (2.0, 3.0),
    (1.0, 4.0),
  ])]);
  assert!(tess.intersection_points().is_empty());
  assert_eq!(tess.monotone_regions().len(), 2);
  for region in tess.monotone_regions() {
    assert!(region.is_closed());
  }
  assert_monotone(&tess);
  let area = total_area(&tess);
  // hexagon area by shoelace: 6
  assert!((area - 6.0).abs() < 1e-9, "hexagon area {}", area);
}

#[test]
fn merge_then_end() {
  // Merge at (2,1) with a flat bottom: both pending regions close against
  // the bottom edge through the shared diagonal.
  let tess = tessellate(vec![ring(&[
    (1.0, 0.0),
    (2.0, 1.0),
    (3.0, 0.0),
    (3.0, 2.0),
    (1.0, 2.0),
  ])]);
  assert!(tess.intersection_points().is_empty());
  assert_eq!(tess.monotone_regions().len(), 2);
  assert_monotone(&tess);
  let area = total_area(&tess);
  // pentagon area: 2*2 - 1 = 3
  assert!((area - 3.0).abs() < 1e-9, "pentagon area {}", area);
}

////////////////////////////////////////////////////////////////////////////
// Oracles

fn big(x: f64) -> BigRational {
  BigRational::from_float(x).expect("finite")
}

/// Exact proper intersection of two segments, or `None` when they are
/// parallel, share only endpoints, or merely touch at an endpoint.
fn proper_intersection(
  a: (Point, Point),
  b: (Point, Point),
) -> Option<(BigRational, BigRational)> {
  let (p1, p2) = a;
  let (q1, q2) = b;
  let d1x = big(p2.x) - big(p1.x);
  let d1y = big(p2.y) - big(p1.y);
  let d2x = big(q2.x) - big(q1.x);
  let d2y = big(q2.y) - big(q1.y);
  let denom = d1x.clone() * d2y.clone() - d1y.clone() * d2x.clone();
  if denom.is_zero() {
    return None;
  }
  let sx = big(q1.x) - big(p1.x);
  let sy = big(q1.y) - big(p1.y);
  let t = (sx.clone() * d2y - sy.clone() * d2x) / denom.clone();
  let u = (sx * d1y.clone() - sy * d1x.clone()) / denom;
  let zero = BigRational::zero();
  let one = BigRational::from_integer(BigInt::from(1));
  if t <= zero || t >= one || u <= zero || u >= one {
    return None;
  }
  let x = big(p1.x) + d1x * t.clone();
  let y = big(p1.y) + d1y * t;
  Some((x, y))
}

fn ring_edges(ring: &[Point]) -> Vec<(Point, Point)> {
  let mut edges = Vec::new();
  for i in 0..ring.len() {
    let p = ring[i];
    let q = ring[(i + 1) % ring.len()];
    if p != q {
      edges.push((p, q));
    }
  }
  edges
}

fn rational_to_f64(r: &BigRational) -> f64 {
  let num = r.numer();
  let den = r.denom();
  // good enough for the small coordinates used in tests
  let fnum: f64 = num.to_string().parse().unwrap();
  let fden: f64 = den.to_string().parse().unwrap();
  fnum / fden
}

/// P4 oracle: the set of rounded proper pairwise intersections.
fn naive_intersections(rings: &[Vec<Point>]) -> Vec<(f64, f64)> {
  let mut edges = Vec::new();
  for ring in rings {
    if ring.len() >= 3 {
      edges.extend(ring_edges(ring));
    }
  }
  let mut found: Vec<(f64, f64)> = Vec::new();
  for i in 0..edges.len() {
    for j in (i + 1)..edges.len() {
      if let Some((x, y)) = proper_intersection(edges[i], edges[j]) {
        let p = (rational_to_f64(&x), rational_to_f64(&y));
        if !found.contains(&p) {
          found.push(p);
        }
      }
    }
  }
  found.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap().then(a.0.partial_cmp(&b.0).unwrap()));
  found
}

/// Even-odd membership by exact ray casting (horizontal ray to +∞).
fn even_odd_inside(rings: &[Vec<Point>], x: f64, y: f64) -> bool {
  let mut crossings = 0;
  for ring in rings {
    if ring.len() < 3 {
      continue;
    }
    for (p, q) in ring_edges(ring) {
      let (lo, hi) = if p.y < q.y { (p, q) } else { (q, p) };
      if lo.y <= y && y < hi.y {
        // x coordinate of the edge at height y, exactly
        let t = (big(y) - big(lo.y)) / (big(hi.y) - big(lo.y));
        let ex = big(lo.x) + (big(hi.x) - big(lo.x)) * t;
        if ex > big(x) {
          crossings += 1;
        }
      }
    }
  }
  crossings % 2 == 1
}

fn region_contains(region: &MonotoneRegion, x: f64, y: f64) -> bool {
  let boundary = region.boundary();
  if boundary.len() < 3 {
    return false;
  }
  let mut crossings = 0;
  for i in 0..boundary.len() {
    let p = boundary[i];
    let q = boundary[(i + 1) % boundary.len()];
    let (lo, hi) = if p.y < q.y { (p, q) } else { (q, p) };
    if lo.y <= y && y < hi.y {
      let t = (big(y) - big(lo.y)) / (big(hi.y) - big(lo.y));
      let ex = big(lo.x) + (big(hi.x) - big(lo.x)) * t;
      if ex > big(x) {
        crossings += 1;
      }
    }
  }
  crossings % 2 == 1
}

/// P2: sampled coverage equality between the input's even-odd set and the
/// union of output regions. Sample points dodge all input lattice lines.
fn assert_coverage(rings: &[Vec<Point>], tess: &Tessellation, lo: i64, hi: i64) {
  for gx in lo..hi {
    for gy in lo..hi {
      let x = gx as f64 + 0.312_711;
      let y = gy as f64 + 0.477_293;
      let want = even_odd_inside(rings, x, y);
      let hits = tess
        .monotone_regions()
        .iter()
        .filter(|r| region_contains(r, x, y))
        .count();
      assert!(
        hits <= 1,
        "regions overlap at ({}, {}): {} hits",
        x,
        y,
        hits
      );
      assert_eq!(
        hits == 1,
        want,
        "coverage mismatch at ({}, {}) for {:?}",
        x,
        y,
        rings
      );
    }
  }
}

#[test]
fn l_shape_coverage_matches_even_odd() {
  let rings = vec![
    ring(&[(0.0, 1.0), (0.0, 0.0), (1.0, 0.0), (4.0, 3.0), (4.0, 4.0), (3.0, 4.0)]),
    ring(&[(3.0, 0.0), (4.0, 0.0), (4.0, 1.0), (1.0, 4.0), (0.0, 4.0), (0.0, 3.0)]),
  ];
  let tess = tessellate(rings.clone());
  assert_coverage(&rings, &tess, -1, 5);
}

#[test]
fn random_lattice_rings_match_oracles() {
  let mut rng = SmallRng::seed_from_u64(0x5eed);
  for case in 0..60 {
    let n_rings = rng.gen_range(1..3);
    let mut rings = Vec::new();
    for _ in 0..n_rings {
      let len = rng.gen_range(3..8);
      let pts: Vec<Point> = (0..len)
        .map(|_| Point::new(rng.gen_range(0..7) as f64, rng.gen_range(0..7) as f64))
        .collect();
      rings.push(pts);
    }
    let tess = tessellate(rings.clone());
    let got = points(tess.intersection_points());
    let mut got_sorted = got.clone();
    got_sorted
      .sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap().then(a.0.partial_cmp(&b.0).unwrap()));
    let want = naive_intersections(&rings);
    assert_eq!(
      got_sorted, want,
      "case {}: intersections diverge for {:?}",
      case, rings
    );
    assert_coverage(&rings, &tess, -1, 8);
  }
}

#[test_strategy::proptest(ProptestConfig { cases: 64, ..ProptestConfig::default() })]
fn sweep_intersections_match_naive(
  #[strategy(prop::collection::vec((0i64..6, 0i64..6), 3..7))] pts: Vec<(i64, i64)>,
) {
  let r: Vec<Point> = pts.iter().map(|&(x, y)| Point::new(x as f64, y as f64)).collect();
  let rings = vec![r];
  let tess = tessellate(rings.clone());
  let mut got = points(tess.intersection_points());
  got.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap().then(a.0.partial_cmp(&b.0).unwrap()));
  let want = naive_intersections(&rings);
  prop_assert_eq!(got, want);
}

#[test_strategy::proptest(ProptestConfig { cases: 64, ..ProptestConfig::default() })]
fn emitted_points_are_sorted_and_unique(
  #[strategy(prop::collection::vec((0i64..6, 0i64..6), 4..8))] pts: Vec<(i64, i64)>,
) {
  let r: Vec<Point> = pts.iter().map(|&(x, y)| Point::new(x as f64, y as f64)).collect();
  let tess = tessellate(vec![r]);
  let got = points(tess.intersection_points());
  for w in got.windows(2) {
    let ordered = w[0].1 < w[1].1 || (w[0].1 == w[1].1 && w[0].0 < w[1].0);
    prop_assert!(ordered, "unordered or duplicate emission: {:?}", got);
  }
}
