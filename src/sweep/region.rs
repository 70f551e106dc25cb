//! Region assembly: the winding-transition walk that turns sweep events
//! into y-monotone polygons.
//!
//! Bundles with an odd member count are winding transitions (walls); the
//! inside gap between a left wall and the next right wall is fed by one
//! open region per wall. Normally both walls feed the same region. After a
//! merge the two surviving walls feed distinct regions that share the
//! merge vertex as their pending reconnection; the next vertex on either
//! wall resolves it, producing the classic helper diagonal.
//!
//! `update_status_before` runs against the status order *above* the event
//! (ends, merges, chain passes); `update_status_after` runs against the
//! rewired order *below* it (starts, splits, wall reassignment), writing
//! the new `after_is_inside` flags along the way.

use crate::data::{BundleId, MonotoneRegion, Point, RegionId};
use crate::splay::NodeId;
use crate::sweep::driver::Tessellation;

/// The inside gap currently open while walking arrivals left to right.
enum OpenGap {
  /// Opened before the first arrival: its left wall survives the event.
  Flank,
  /// Opened by an arriving left wall feeding this region.
  Middle(RegionId),
}

impl Tessellation {
  /// Settles every region whose wall arrives at the event: chain passes on
  /// the flanks, ends in pinched gaps, the in/out sides of merges. Returns
  /// the regions left dangling at the event's left and right seams, for
  /// `update_status_after` to reconnect below.
  pub(super) fn update_status_before(
    &mut self,
    e: Point,
    before: NodeId,
    after: NodeId,
    run: &[NodeId],
  ) -> (Option<RegionId>, Option<RegionId>) {
    let mut left_open = None;
    let mut right_open = None;
    let mut s = {
      let b = self.status_bundle(before);
      self.bundles[b].after_is_inside
    };
    let mut open: Option<OpenGap> = if s { Some(OpenGap::Flank) } else { None };

    for &n in run {
      let b = self.status_bundle(n);
      if !self.bundles[b].is_transition() {
        continue;
      }
      let rf = self.wall_region(b);
      if s {
        // in/out: this wall closes the open gap from the right
        match open.take() {
          Some(OpenGap::Flank) => {
            let lw = self.left_wall(before);
            let lf = self.wall_region(lw);
            self.push_vertex(rf, e, false);
            if lf != rf {
              // pending merge: the arriving feed closes against the merge
              // vertex; the surviving feed takes the event vertex over
              self.close_region(rf);
              self.push_vertex(lf, e, false);
              left_open = Some(lf);
            } else {
              left_open = Some(rf);
            }
          }
          Some(OpenGap::Middle(lf)) => {
            if lf != rf {
              self.push_vertex(lf, e, true);
              self.close_region(lf);
              self.push_vertex(rf, e, false);
              self.close_region(rf);
            } else {
              self.push_vertex(rf, e, false);
              self.close_region(rf);
            }
          }
          None => {
            debug_assert!(false, "inside state without an open gap");
            self.regions[rf.0 as usize].has_error = true;
          }
        }
        s = false;
      } else {
        // out/in: this wall opens a gap toward the right
        open = Some(OpenGap::Middle(rf));
        s = true;
      }
    }

    if s {
      match open.take() {
        Some(OpenGap::Middle(lf)) => {
          // the gap's right wall survives below the event
          let rw = self.right_wall(after);
          let rf = self.wall_region(rw);
          self.push_vertex(lf, e, true);
          if lf != rf {
            self.close_region(lf);
            self.push_vertex(rf, e, true);
            right_open = Some(rf);
          } else {
            right_open = Some(lf);
          }
        }
        // spanning gap untouched by any arrival
        Some(OpenGap::Flank) | None => {}
      }
    }
    (left_open, right_open)
  }

  /// Walks the rewired neighborhood below the event: refreshes
  /// `after_is_inside`, reattaches walls to the regions left open by the
  /// arrival pass, spawns regions at starts, splits the enclosing region
  /// at split vertices, and records pending merges.
  pub(super) fn update_status_after(
    &mut self,
    e: Point,
    before: NodeId,
    after: NodeId,
    mut left_open: Option<RegionId>,
    mut right_open: Option<RegionId>,
  ) {
    let s0 = {
      let b = self.status_bundle(before);
      self.bundles[b].after_is_inside
    };
    let mut s = s0;
    let mut new_trans: Vec<BundleId> = Vec::new();
    let mut at = self.status.next(before).expect("sentinels bound status walks");
    while at != after {
      let b = self.status_bundle(at);
      if self.bundles[b].is_transition() {
        s = !s;
        new_trans.push(b);
      }
      self.bundles[b].after_is_inside = s;
      at = self.status.next(at).expect("sentinels bound status walks");
    }

    if s0 && left_open.is_none() {
      // no arrival touched the enclosing gap: fresh walls inside it split it
      debug_assert!(right_open.is_none());
      if !new_trans.is_empty() {
        self.split_gap(e, before, after, &new_trans);
      }
      return;
    }

    let mut s = s0;
    let mut first_gap = s0;
    let mut opener: Option<BundleId> = None;
    for &t in &new_trans {
      if s {
        if first_gap {
          let feed = match left_open.take() {
            Some(feed) => feed,
            None => self.error_region(),
          };
          self.set_wall_region(t, feed);
          first_gap = false;
        } else {
          let o = opener.take().expect("gap closed twice");
          let r = self.new_region_at(e);
          self.set_wall_region(o, r);
          self.set_wall_region(t, r);
        }
        s = false;
      } else {
        opener = Some(t);
        s = true;
      }
    }
    if s {
      if first_gap {
        // the gap spans the whole neighborhood: with feeds dangling on
        // both seams, two regions just united below a merge vertex
        if let (Some(lf), Some(rf)) = (left_open.take(), right_open.take()) {
          self.regions[lf.0 as usize].latest_is_merge = true;
          self.regions[rf.0 as usize].latest_is_merge = true;
        }
      } else {
        let o = opener.take().expect("open gap without opener");
        let feed = match right_open.take() {
          Some(feed) => feed,
          None => self.error_region(),
        };
        self.set_wall_region(o, feed);
      }
    }
  }

  /// A split vertex inside a single gap: the enclosing region (or, after a
  /// merge, the pending pair) continues into the outer legs, every inner
  /// leg starts fresh at the event.
  fn split_gap(&mut self, e: Point, before: NodeId, after: NodeId, new_trans: &[BundleId]) {
    debug_assert!(new_trans.len() % 2 == 0);
    let lw = self.left_wall(before);
    let rw = self.right_wall(after);
    let lf = self.wall_region(lw);
    let rf = self.wall_region(rw);
    let first = new_trans[0];
    let last = *new_trans.last().expect("split has new walls");

    if lf != rf {
      // reconnect through the pending merge vertex; both regions continue
      self.push_vertex(lf, e, false);
      self.push_vertex(rf, e, true);
      self.set_wall_region(first, lf);
      self.set_wall_region(last, rf);
    } else {
      let v = match self.regions[lf.0 as usize].latest() {
        Some(v) => *v,
        None => {
          self.regions[lf.0 as usize].has_error = true;
          crate::data::Vertex {
            x: e.x,
            y: e.y,
            is_left: true,
          }
        }
      };
      if v.is_left {
        // helper on the left chain: the region keeps the rightmost leg,
        // a new region seeded with the helper takes the leftmost one
        self.push_vertex(lf, e, true);
        self.set_wall_region(last, lf);
        let nr = self.seeded_region(v.point(), e, false);
        self.set_wall_region(lw, nr);
        self.set_wall_region(first, nr);
      } else {
        self.push_vertex(lf, e, false);
        self.set_wall_region(first, lf);
        let nr = self.seeded_region(v.point(), e, true);
        self.set_wall_region(rw, nr);
        self.set_wall_region(last, nr);
      }
    }

    let mut i = 1;
    while i + 1 < new_trans.len() {
      let r = self.new_region_at(e);
      self.set_wall_region(new_trans[i], r);
      self.set_wall_region(new_trans[i + 1], r);
      i += 2;
    }
  }

  /// Nearest winding transition at or left of `from` in status order.
  fn left_wall(&self, from: NodeId) -> BundleId {
    let mut at = from;
    loop {
      let b = self.status_bundle(at);
      if self.bundles[b].is_transition() {
        return b;
      }
      at = self.status.prev(at).expect("sentinels bound status walks");
    }
  }

  /// Nearest winding transition at or right of `from` in status order.
  fn right_wall(&self, from: NodeId) -> BundleId {
    let mut at = from;
    loop {
      let b = self.status_bundle(at);
      if self.bundles[b].is_transition() {
        return b;
      }
      at = self.status.next(at).expect("sentinels bound status walks");
    }
  }

  /// The region a wall feeds; a wall without one signals a bookkeeping
  /// inconsistency and gets a fresh flagged region so assembly continues.
  fn wall_region(&mut self, b: BundleId) -> RegionId {
    match self.bundles[b].region {
      Some(r) => r,
      None => {
        let r = self.error_region();
        self.bundles[b].region = Some(r);
        r
      }
    }
  }

  fn set_wall_region(&mut self, b: BundleId, r: RegionId) {
    self.bundles[b].region = Some(r);
  }

  fn add_region(&mut self, region: MonotoneRegion) -> RegionId {
    let id = RegionId(self.regions.len() as u32);
    self.regions.push(region);
    id
  }

  fn new_region_at(&mut self, e: Point) -> RegionId {
    let mut region = MonotoneRegion::default();
    region.push(e, true);
    self.add_region(region)
  }

  fn seeded_region(&mut self, seed: Point, e: Point, is_left: bool) -> RegionId {
    let mut region = MonotoneRegion::default();
    region.push(seed, is_left);
    region.push(e, is_left);
    self.add_region(region)
  }

  fn error_region(&mut self) -> RegionId {
    let mut region = MonotoneRegion::default();
    region.has_error = true;
    self.add_region(region)
  }

  fn push_vertex(&mut self, r: RegionId, e: Point, is_left: bool) {
    self.regions[r.0 as usize].push(e, is_left);
  }

  fn close_region(&mut self, r: RegionId) {
    self.regions[r.0 as usize].closed = true;
  }
}
