//! The sweep driver: one `Tessellation` instance owns every arena and
//! advances the Bentley–Ottmann sweep one event per `step()` call.
//!
//! Each step follows the same script: pop the minimum event, collect the
//! contiguous run of status nodes incident to it, settle the region
//! bookkeeping for everything arriving at the event, splice continuation
//! and start edges into bundles ordered by angle below the event, write the
//! bundles back into the status tree, settle the region bookkeeping for
//! everything leaving the event, and finally test the two fresh neighbor
//! pairs at the seam for future crossings.

use std::collections::HashSet;
use std::mem;

use ordered_float::OrderedFloat;

use crate::data::{
  pair_key, BundleId, BundlePool, Edge, EdgeId, EdgeNode, MonotoneRegion, Point, RationalPoint,
};
use crate::exact::{perp_dot_sign, EPSILON, PERP_ERR_BOUND_1};
use crate::splay::{NodeId, SplayTree};
use crate::sweep::queue::{event_at, CrossEntry, EventTree, SweepEvent};
use crate::sweep::start::{collect_entries, next_distinct, StartPoint};

/// Sentinel abscissa: the largest double whose double is still finite, so
/// predicate products against sentinels saturate to ±∞ with correct sign
/// instead of producing NaN.
const LIMIT: f64 = f64::MAX / 2.0;

/// Sweep-line tessellation of a set of rings into y-monotone regions.
///
/// Construct with [`Tessellation::new`], then call [`Tessellation::step`]
/// until it returns `false`; the results accumulate in
/// [`monotone_regions`](Tessellation::monotone_regions) and
/// [`intersection_points`](Tessellation::intersection_points).
pub struct Tessellation {
  pub(crate) rings: Vec<Vec<Point>>,
  pub(crate) edges: Vec<Edge>,
  pub(crate) bundles: BundlePool,
  pub(crate) status: SplayTree<EdgeNode>,
  pub(crate) events: EventTree,
  pub(crate) regions: Vec<MonotoneRegion>,
  intersections: Vec<Point>,
  emitted: HashSet<(OrderedFloat<f64>, OrderedFloat<f64>)>,
  /// Pair keys of crossings already queued between two neighbor bundles;
  /// consumed when the crossing event is processed.
  crossings: HashSet<u64>,
  starts: Vec<StartPoint>,
  next_start: usize,
  // per-step scratch, kept to reuse capacity
  scratch: SweepEvent,
  run_buf: Vec<NodeId>,
  new_edge_buf: Vec<EdgeId>,
  old_buf: Vec<BundleId>,
  merged_buf: Vec<BundleId>,
}

impl Tessellation {
  pub fn new<I>(rings: I) -> Tessellation
  where
    I: IntoIterator,
    I::Item: IntoIterator<Item = Point>,
  {
    let rings: Vec<Vec<Point>> = rings
      .into_iter()
      .map(|ring| ring.into_iter().collect())
      .collect();
    let starts = collect_entries(&rings);
    let mut t = Tessellation {
      rings,
      edges: Vec::new(),
      bundles: BundlePool::default(),
      status: SplayTree::new(),
      events: EventTree::new(),
      regions: Vec::new(),
      intersections: Vec::new(),
      emitted: HashSet::new(),
      crossings: HashSet::new(),
      starts,
      next_start: 0,
      scratch: SweepEvent::default(),
      run_buf: Vec::new(),
      new_edge_buf: Vec::new(),
      old_buf: Vec::new(),
      merged_buf: Vec::new(),
    };
    t.install_sentinels();
    t.schedule_next_start();
    t
  }

  /// Completed and in-progress monotone regions, in creation order.
  pub fn monotone_regions(&self) -> &[MonotoneRegion] {
    &self.regions
  }

  /// Proper self-intersections found so far, in sweep order, rounded to
  /// doubles and deduplicated.
  pub fn intersection_points(&self) -> &[Point] {
    &self.intersections
  }

  pub(crate) fn edge(&self, id: EdgeId) -> &Edge {
    &self.edges[id.0 as usize]
  }

  pub(crate) fn status_bundle(&self, node: NodeId) -> BundleId {
    self.status[node]
      .bundle
      .expect("status nodes always carry a bundle")
  }

  fn install_sentinels(&mut self) {
    for (x, inside) in [(-LIMIT, false), (LIMIT, true)] {
      let eid = EdgeId(self.edges.len() as u32);
      let edge = Edge::new(u32::MAX, 0, 0, 1, Point::new(x, -LIMIT), Point::new(x, LIMIT));
      self.edges.push(edge.clone());
      let b = self.bundles.alloc(&edge);
      self.bundles[b].insert(eid, &edge);
      self.bundles[b].after_is_inside = inside;
      self.edges[eid.0 as usize].bundle = Some(b);
      let (node, _) = self.status.insert_with(|_| 1.0, |item| item.bundle = None);
      self.status[node].bundle = Some(b);
      self.bundles[b].node = Some(node);
    }
  }

  /// Pre-inserts the event for the next pending start point (and all
  /// further starts sharing its exact coordinates).
  fn schedule_next_start(&mut self) {
    if self.next_start >= self.starts.len() {
      return;
    }
    let p = self.starts[self.next_start].point;
    let node = event_at(&mut self.events, &RationalPoint::literal(p));
    while self.next_start < self.starts.len() && self.starts[self.next_start].point == p {
      let sp = self.starts[self.next_start];
      self.events[node].starts.push(sp);
      self.next_start += 1;
    }
  }

  /// Creates a downward edge, stores it, and registers its bend event at
  /// the lower endpoint.
  fn spawn_edge(&mut self, ring: u32, pos: u32, pos2: u32, dir: i8, upper: Point, lower: Point) -> EdgeId {
    let id = EdgeId(self.edges.len() as u32);
    self.edges.push(Edge::new(ring, pos, pos2, dir, upper, lower));
    let node = event_at(&mut self.events, &RationalPoint::literal(lower));
    self.events[node].bends.push(id);
    id
  }

  /// Advances the sweep by one event. Returns `false` once the queue is
  /// exhausted and the tessellation is complete.
  pub fn step(&mut self) -> bool {
    let min = match self.events.first() {
      Some(min) => min,
      None => return false,
    };
    let mut ev = mem::take(&mut self.scratch);
    mem::swap(&mut ev, &mut self.events[min]);
    self.events.remove(min);

    let e_point = ev.point.rounded();

    // 1-2. mark incident bundles, find the contiguous run and its flanks
    let mut run = mem::take(&mut self.run_buf);
    run.clear();
    let mut before: Option<NodeId> = None;
    let mut after: Option<NodeId> = None;
    if ev.has_incident() {
      let mut anchor: Option<NodeId> = None;
      for &eid in &ev.bends {
        if let Some(b) = self.edges[eid.0 as usize].bundle {
          self.bundles[b].seen = true;
          if anchor.is_none() {
            anchor = self.bundles[b].node;
          }
        }
      }
      for ce in &ev.cross {
        for (slot, id) in [(ce.a, ce.a_id), (ce.b, ce.b_id)] {
          let bl = &mut self.bundles[slot];
          if bl.id == id && bl.count() > 0 && bl.node.is_some() {
            bl.seen = true;
            if anchor.is_none() {
              anchor = bl.node;
            }
          }
        }
      }
      if let Some(anchor) = anchor {
        let mut at = anchor;
        loop {
          let p = self.status.prev(at).expect("sentinels bound status walks");
          if self.node_seen(p) {
            at = p;
          } else {
            before = Some(p);
            break;
          }
        }
        let mut at = before.unwrap();
        loop {
          let n = self.status.next(at).expect("sentinels bound status walks");
          if self.node_seen(n) {
            run.push(n);
            at = n;
          } else {
            after = Some(n);
            break;
          }
        }
      }
    }
    ev.before = before;
    ev.after = after;

    // 3. settle regions for everything arriving at the event
    let (mut left_open, mut right_open) = (None, None);
    if !run.is_empty() {
      let (lo, ro) = self.update_status_before(e_point, before.unwrap(), after.unwrap(), &run);
      left_open = lo;
      right_open = ro;
    }

    // 4. consume the crossing pair keys; report the intersection. Entries
    // with two distinct bundles are proper crossings; endpoint touches are
    // recorded with both slots naming the surviving bundle.
    for ce in &ev.cross {
      self.crossings.remove(&ce.key);
    }
    if ev.cross.iter().any(|ce| ce.a_id != ce.b_id) {
      self.emit_intersection(e_point);
    }

    // 5. detach ending edges and follow their rings downward
    let mut new_edges = mem::take(&mut self.new_edge_buf);
    new_edges.clear();
    for &eid in &ev.bends {
      let (ring, pos2, dir, lower, bundle) = {
        let e = self.edge(eid);
        (e.ring, e.pos2, e.dir, e.lower(), e.bundle)
      };
      if let Some(b) = bundle {
        self.bundles[b].remove(eid);
        self.edges[eid.0 as usize].bundle = None;
      }
      if let Some(np) = next_distinct(&self.rings[ring as usize], pos2, dir) {
        let follower = self.rings[ring as usize][np as usize];
        if follower.below_or_right_of(&lower) {
          let id = self.spawn_edge(ring, pos2, np, dir, lower, follower);
          new_edges.push(id);
        }
      }
    }

    // 6. activate ring entries, then keep the start pipeline primed
    let had_starts = !ev.starts.is_empty();
    for i in 0..ev.starts.len() {
      let sp = ev.starts[i];
      for dir in [1i8, -1] {
        if let Some(np) = next_distinct(&self.rings[sp.ring as usize], sp.pos, dir) {
          let follower = self.rings[sp.ring as usize][np as usize];
          if follower.below_or_right_of(&sp.point) {
            let id = self.spawn_edge(sp.ring, sp.pos, np, dir, sp.point, follower);
            new_edges.push(id);
          }
        }
      }
    }
    if had_starts {
      self.schedule_next_start();
    }

    // 7. order the fresh edges left to right below the event
    {
      let edges = &self.edges;
      new_edges.sort_by(|&a, &b| {
        let d = edges[a.0 as usize].angle_delta_from(&edges[b.0 as usize]);
        if d > 0.0 {
          std::cmp::Ordering::Greater
        } else if d < 0.0 {
          std::cmp::Ordering::Less
        } else {
          std::cmp::Ordering::Equal
        }
      });
    }

    // 8. with no incident bundles, probe the status tree for the slot
    if run.is_empty() {
      if new_edges.is_empty() {
        // stale crossing or fully-degenerate event
        self.finish_step(ev, run, new_edges);
        return true;
      }
      let line = self.edge(new_edges[0]).clone();
      let bundles = &self.bundles;
      let (node, created) = self.status.insert_with(
        |item| {
          let b = item.bundle.expect("status nodes always carry a bundle");
          bundles.get(b).delta_from(&line)
        },
        |item| item.bundle = None,
      );
      before = Some(self.status.prev(node).expect("sentinels bound status walks"));
      after = Some(self.status.next(node).expect("sentinels bound status walks"));
      ev.before = before;
      ev.after = after;
      run.push(node);
      if created {
        let first = new_edges.remove(0);
        let b = self.bundles.alloc(&line);
        self.bundles[b].insert(first, &line);
        self.edges[first.0 as usize].bundle = Some(b);
        self.bundles[b].node = Some(node);
        self.status[node].bundle = Some(b);
        if new_edges.is_empty() {
          self.status.splay(node);
        }
      } else {
        // the event point lies on an existing bundle: same situation as a
        // bend, so the arrival pass runs retroactively
        let (lo, ro) = self.update_status_before(e_point, before.unwrap(), after.unwrap(), &run);
        left_open = lo;
        right_open = ro;
      }
    }
    let before = before.unwrap();
    let after = after.unwrap();

    // 9. merge surviving bundles (order reverses below the event) with the
    // fresh edges by angle
    let mut merged = mem::take(&mut self.merged_buf);
    merged.clear();
    let mut old = mem::take(&mut self.old_buf);
    old.clear();
    let mut dead: Vec<BundleId> = Vec::new();
    for &n in run.iter().rev() {
      let b = self.status_bundle(n);
      self.bundles[b].seen = false;
      if self.bundles[b].count() > 0 {
        old.push(b);
      } else {
        dead.push(b);
      }
    }
    let mut ni = 0;
    let mut oi = 0;
    while ni < new_edges.len() || oi < old.len() {
      if oi == old.len() {
        ni = self.start_bundle_group(&new_edges, ni, &mut merged);
      } else if ni == new_edges.len() {
        merged.push(old[oi]);
        oi += 1;
      } else {
        let d = {
          let bundle = &self.bundles[old[oi]];
          let e = self.edge(new_edges[ni]);
          perp_dot_sign(bundle.x, bundle.y, bundle.x2, bundle.y2, e.x, e.y, e.x2, e.y2)
        };
        if d == 0.0 {
          // collinear with a surviving bundle: join it
          let eid = new_edges[ni];
          let edge = self.edge(eid).clone();
          self.bundles[old[oi]].insert(eid, &edge);
          self.edges[eid.0 as usize].bundle = Some(old[oi]);
          ni += 1;
        } else if d > 0.0 {
          ni = self.start_bundle_group(&new_edges, ni, &mut merged);
        } else {
          merged.push(old[oi]);
          oi += 1;
        }
      }
    }

    // 10. write the merged order back into the status nodes
    let mut created_last: Option<NodeId> = None;
    let mut tail: Option<NodeId> = None;
    for (i, &b) in merged.iter().enumerate() {
      let node = if i < run.len() {
        run[i]
      } else {
        let anchor = tail.expect("appends always follow an existing slot");
        let n = self.status.insert_after(anchor);
        self.status[n].bundle = None;
        created_last = Some(n);
        n
      };
      self.status[node].bundle = Some(b);
      self.bundles[b].node = Some(node);
      tail = Some(node);
    }
    if merged.len() < run.len() {
      for &n in &run[merged.len()..] {
        self.status.remove(n);
      }
    }
    if let Some(n) = created_last {
      self.status.splay(n);
    }
    for b in dead {
      self.bundles.free(b);
    }

    // 11. settle regions for everything leaving the event
    self.update_status_after(e_point, before, after, left_open, right_open);

    // 12. the only pairs whose crossings can be news are at the seam
    let bn = self.status.next(before).expect("sentinels bound status walks");
    self.check_neighbors(before, bn);
    let ap = self.status.prev(after).expect("sentinels bound status walks");
    self.check_neighbors(ap, after);

    self.finish_step(ev, run, new_edges);
    self.merged_buf = merged;
    self.old_buf = old;
    true
  }

  fn finish_step(&mut self, ev: SweepEvent, run: Vec<NodeId>, new_edges: Vec<EdgeId>) {
    self.scratch = ev;
    self.run_buf = run;
    self.new_edge_buf = new_edges;
  }

  /// Starts a fresh bundle from `new_edges[ni]`, absorbing the following
  /// collinear edges, and appends it to `merged`. Returns the next index.
  fn start_bundle_group(&mut self, new_edges: &[EdgeId], ni: usize, merged: &mut Vec<BundleId>) -> usize {
    let eid = new_edges[ni];
    let line = self.edge(eid).clone();
    let b = self.bundles.alloc(&line);
    self.bundles[b].insert(eid, &line);
    self.edges[eid.0 as usize].bundle = Some(b);
    let mut next = ni + 1;
    while next < new_edges.len() {
      let (d, edge) = {
        let e = self.edge(new_edges[next]);
        (line.angle_delta_from(e), e.clone())
      };
      if d != 0.0 {
        break;
      }
      self.bundles[b].insert(new_edges[next], &edge);
      self.edges[new_edges[next].0 as usize].bundle = Some(b);
      next += 1;
    }
    merged.push(b);
    next
  }

  fn node_seen(&self, node: NodeId) -> bool {
    match self.status[node].bundle {
      Some(b) => self.bundles[b].seen,
      None => false,
    }
  }

  fn emit_intersection(&mut self, p: Point) {
    if self.emitted.insert((OrderedFloat(p.x), OrderedFloat(p.y))) {
      self.intersections.push(p);
    }
  }

  /// Tests two status neighbors for a crossing strictly below the sweep
  /// position, queuing an event when one is found. Each unordered bundle
  /// pair is tested at most once per adjacency (the memo key is dropped
  /// when the crossing event is consumed).
  fn check_neighbors(&mut self, left: NodeId, right: NodeId) {
    if left == right {
      return;
    }
    let (a, b) = match (self.status[left].bundle, self.status[right].bundle) {
      (Some(a), Some(b)) => (a, b),
      _ => return,
    };
    if a == b {
      return;
    }
    let (sa, sb, a_id, b_id, key, ax_err, bx_err) = {
      let ba = &self.bundles[a];
      let bb = &self.bundles[b];
      (
        ba.segment(),
        bb.segment(),
        ba.id,
        bb.id,
        pair_key(ba, bb),
        ba.x_err,
        bb.x_err,
      )
    };
    if self.crossings.contains(&key) {
      return;
    }

    // x-extent prefilter on interval midpoints
    let amid = (sa[0] + sa[2]) * 0.5;
    let bmid = (sb[0] + sb[2]) * 0.5;
    let aadx = (sa[2] - sa[0]).abs() * 0.5;
    let badx = (sb[2] - sb[0]).abs() * 0.5;
    if (amid - bmid).abs() > (aadx + badx) * (1.0 + 2.0 * EPSILON) + 2.0 * (ax_err + bx_err) {
      return;
    }

    let det = perp_dot_sign(sa[0], sa[1], sa[2], sa[3], sb[0], sb[1], sb[2], sb[3]);
    if det <= 0.0 {
      // parallel, collinear, or diverging below the sweep line
      return;
    }
    let a2 = perp_dot_sign(sa[2], sa[3], sb[0], sb[1], sa[2], sa[3], sb[2], sb[3]);
    if a2 > 0.0 {
      return;
    }
    let b2 = perp_dot_sign(sb[2], sb[3], sa[0], sa[1], sb[2], sb[3], sa[2], sa[3]);
    if b2 < 0.0 {
      return;
    }

    let (point, entry) = if a2 == 0.0 && b2 == 0.0 {
      // both segments end at the crossing; their bend events handle it
      return;
    } else if a2 == 0.0 {
      // the crossing is the left bundle's endpoint: keep only the right one
      (
        RationalPoint::literal(Point::new(sa[2], sa[3])),
        CrossEntry { key, a: b, a_id: b_id, b, b_id },
      )
    } else if b2 == 0.0 {
      (
        RationalPoint::literal(Point::new(sb[2], sb[3])),
        CrossEntry { key, a, a_id, b: a, b_id: a_id },
      )
    } else {
      let det_sum = ((sa[2] - sa[0]) * (sb[3] - sb[1])).abs()
        + ((sa[3] - sa[1]) * (sb[2] - sb[0])).abs();
      let det_err = det_sum * PERP_ERR_BOUND_1 + EPSILON * det.abs();
      let a2_sum = ((sb[0] - sa[2]) * (sb[3] - sa[3])).abs()
        + ((sb[1] - sa[3]) * (sb[2] - sa[2])).abs();
      let a2_err = a2_sum * PERP_ERR_BOUND_1 + EPSILON * a2.abs();
      (
        RationalPoint::intersection(sa, sb, det, det_err, a2, a2_err),
        CrossEntry { key, a, a_id, b, b_id },
      )
    };
    self.crossings.insert(key);
    let node = event_at(&mut self.events, &point);
    self.events[node].cross.push(entry);
  }

  /// Structural audit: thread integrity of both trees plus the alternation
  /// of `after_is_inside` across odd-count bundles along the status order.
  /// Intended for tests; not called on the hot path.
  pub fn audit(&self) -> bool {
    if !self.status.check_threads() || !self.events.check_threads() {
      return false;
    }
    let first = self.status.first();
    let last = self.status.last();
    let mut inside = false;
    for n in self.status.iter() {
      let b = match self.status[n].bundle {
        Some(b) => b,
        None => return false,
      };
      let bundle = &self.bundles[b];
      if bundle.count() == 0 {
        return false;
      }
      if Some(n) == first {
        // left sentinel: outside on its right, not a winding transition
        if bundle.after_is_inside {
          return false;
        }
      } else if Some(n) == last {
        // right sentinel: fixed flag, and the walk must end outside
        if !bundle.after_is_inside || inside {
          return false;
        }
      } else {
        if bundle.is_transition() {
          inside = !inside;
        }
        if bundle.after_is_inside != inside {
          return false;
        }
      }
    }
    true
  }
}
