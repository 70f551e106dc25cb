use crate::data::Point;

/// A ring entry position: a vertex whose both (distinct) neighbors lie
/// strictly below-or-right of it. These are the only vertices at which the
/// sweep must insert fresh edges; every other vertex is reached by bend
/// propagation.
#[derive(Debug, Clone, Copy)]
pub struct StartPoint {
  pub ring: u32,
  pub pos: u32,
  pub point: Point,
}

/// Next ring position in direction `dir` whose point differs from the one
/// at `pos`. Returns `None` for all-duplicate rings.
pub fn next_distinct(ring: &[Point], pos: u32, dir: i8) -> Option<u32> {
  let n = ring.len() as i64;
  let here = ring[pos as usize];
  let mut at = pos as i64;
  for _ in 1..n {
    at = (at + dir as i64).rem_euclid(n);
    if ring[at as usize] != here {
      return Some(at as u32);
    }
  }
  None
}

/// Scans every ring for entry positions and returns them sorted by
/// `(y, x, ring, pos)`. Rings with fewer than three distinct points are
/// skipped silently.
pub fn collect_entries(rings: &[Vec<Point>]) -> Vec<StartPoint> {
  let mut entries = Vec::new();
  for (ring_idx, ring) in rings.iter().enumerate() {
    if ring.len() < 3 {
      continue;
    }
    let mut distinct: Vec<u32> = Vec::with_capacity(ring.len());
    for (i, p) in ring.iter().enumerate() {
      match distinct.last() {
        Some(&j) if ring[j as usize] == *p => {}
        _ => distinct.push(i as u32),
      }
    }
    // the ring is implicitly closed; drop a duplicated wrap-around point
    while distinct.len() > 1 && ring[distinct[0] as usize] == ring[*distinct.last().unwrap() as usize]
    {
      distinct.pop();
    }
    let m = distinct.len();
    if m < 3 {
      continue;
    }
    for k in 0..m {
      let prev = ring[distinct[(k + m - 1) % m] as usize];
      let cur = ring[distinct[k] as usize];
      let next = ring[distinct[(k + 1) % m] as usize];
      if prev.below_or_right_of(&cur) && next.below_or_right_of(&cur) {
        entries.push(StartPoint {
          ring: ring_idx as u32,
          pos: distinct[k],
          point: cur,
        });
      }
    }
  }
  entries.sort_by(|a, b| {
    a.point
      .sweep_cmp(&b.point)
      .then(a.ring.cmp(&b.ring))
      .then(a.pos.cmp(&b.pos))
  });
  entries
}
