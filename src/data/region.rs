use crate::data::{Point, Vertex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionId(pub u32);

/// One y-monotone output polygon under assembly.
///
/// Vertices are appended in sweep order as the region's two chains grow.
/// A region is created at a start or split vertex, extended by chain
/// passes, and closed when its chains meet at an end vertex or when a
/// pending merge is resolved.
#[derive(Debug, Clone, Default)]
pub struct MonotoneRegion {
  vertices: Vec<Vertex>,
  /// The previous vertex was a merge; the region stays open until a later
  /// event reconnects it.
  pub latest_is_merge: bool,
  pub closed: bool,
  /// A degenerate input made this region's bookkeeping inconsistent; its
  /// vertices may be off by up to one ULP or incomplete.
  pub has_error: bool,
}

impl MonotoneRegion {
  pub fn vertices(&self) -> &[Vertex] {
    &self.vertices
  }

  pub fn is_closed(&self) -> bool {
    self.closed
  }

  pub fn has_error(&self) -> bool {
    self.has_error
  }

  pub fn latest(&self) -> Option<&Vertex> {
    self.vertices.last()
  }

  pub fn push(&mut self, p: Point, is_left: bool) {
    debug_assert!(!self.closed);
    self.vertices.push(Vertex {
      x: p.x,
      y: p.y,
      is_left,
    });
    self.latest_is_merge = false;
  }

  /// The region's boundary as a simple closed polygon: the left chain in
  /// order, then the right chain reversed.
  pub fn boundary(&self) -> Vec<Point> {
    let mut out: Vec<Point> = self
      .vertices
      .iter()
      .filter(|v| v.is_left)
      .map(Vertex::point)
      .collect();
    out.extend(
      self
        .vertices
        .iter()
        .rev()
        .filter(|v| !v.is_left)
        .map(Vertex::point),
    );
    out
  }
}
