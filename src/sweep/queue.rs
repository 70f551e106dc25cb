use crate::data::{sweep_delta, BundleId, EdgeId, RationalPoint};
use crate::splay::{NodeId, SplayTree};
use crate::sweep::start::StartPoint;

/// A crossing recorded between two neighboring bundles.
///
/// Slots may be recycled between discovery and processing, so the entry
/// also carries the bundles' monotonic ids; a slot whose id no longer
/// matches is stale and gets skipped.
#[derive(Debug, Clone, Copy)]
pub struct CrossEntry {
  pub key: u64,
  pub a: BundleId,
  pub a_id: u32,
  pub b: BundleId,
  pub b_id: u32,
}

/// An event of the sweep: a point where edges start, end, or cross.
///
/// Created lazily the first time a producer refers to the point; buckets
/// accumulate until the event is popped. The payload is pooled through the
/// event tree's free list, so all buffers keep their capacity.
#[derive(Debug, Default)]
pub struct SweepEvent {
  pub point: RationalPoint,
  /// Ring entries activating here.
  pub starts: Vec<StartPoint>,
  /// Edges whose lower endpoint is here.
  pub bends: Vec<EdgeId>,
  /// Bundle pairs known to cross here.
  pub cross: Vec<CrossEntry>,
  /// Nearest non-incident neighbors, captured during processing.
  pub before: Option<NodeId>,
  pub after: Option<NodeId>,
}

impl SweepEvent {
  pub fn reset_with(&mut self, point: &RationalPoint) {
    self.point.assign(point);
    self.starts.clear();
    self.bends.clear();
    self.cross.clear();
    self.before = None;
    self.after = None;
  }

  pub fn has_incident(&self) -> bool {
    !self.bends.is_empty() || !self.cross.is_empty()
  }
}

pub type EventTree = SplayTree<SweepEvent>;

/// Finds or creates the event for `point`. Distinct events never compare
/// equal: a duplicate insert lands on the existing node and the caller
/// appends into its buckets. New nodes are splayed to keep lookups cheap.
pub fn event_at(events: &mut EventTree, point: &RationalPoint) -> NodeId {
  let mut key = point.clone();
  let (id, created) = events.insert_with(
    |ev| sweep_delta(&mut key, &mut ev.point),
    |_| {},
  );
  if created {
    events[id].reset_with(point);
    events.splay(id);
  }
  id
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::data::Point;

  fn literal(x: f64, y: f64) -> RationalPoint {
    RationalPoint::literal(Point::new(x, y))
  }

  #[test]
  fn events_pop_in_sweep_order() {
    let mut events = EventTree::new();
    for &(x, y) in &[(1.0, 2.0), (0.0, 0.0), (5.0, 1.0), (-3.0, 1.0), (2.0, 2.0)] {
      event_at(&mut events, &literal(x, y));
    }
    let mut popped = Vec::new();
    while let Some(min) = events.first() {
      popped.push((events[min].point.x, events[min].point.y));
      events.remove(min);
    }
    assert_eq!(
      popped,
      vec![(0.0, 0.0), (-3.0, 1.0), (5.0, 1.0), (1.0, 2.0), (2.0, 2.0)]
    );
  }

  #[test]
  fn duplicate_point_reuses_event() {
    let mut events = EventTree::new();
    let a = event_at(&mut events, &literal(1.0, 1.0));
    events[a].bends.push(EdgeId(0));
    let b = event_at(&mut events, &literal(1.0, 1.0));
    assert_eq!(a, b);
    assert_eq!(events.len(), 1);
    events[b].bends.push(EdgeId(1));
    assert_eq!(events[b].bends.len(), 2);
  }

  #[test]
  fn pooled_event_is_clean_after_reuse() {
    let mut events = EventTree::new();
    let a = event_at(&mut events, &literal(1.0, 1.0));
    events[a].bends.push(EdgeId(0));
    events[a].before = Some(events.first().unwrap());
    events.remove(a);
    let b = event_at(&mut events, &literal(2.0, 2.0));
    assert!(events[b].bends.is_empty());
    assert!(events[b].before.is_none());
    assert_eq!(events[b].point.rounded(), Point::new(2.0, 2.0));
  }
}
