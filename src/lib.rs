//! Robust sweep-line decomposition of polygon soups into y-monotone pieces.
//!
//! Feed any collection of rings — self-intersecting, overlapping, holed or
//! degenerate — and the sweep produces simple y-monotone polygons covering
//! the even-odd interior, plus every proper self-intersection point. All
//! orientation decisions go through adaptive-precision predicates, so the
//! result is topologically correct for arbitrary finite double inputs;
//! only newly computed intersection vertices are rounded (by at most one
//! ULP) when written to the output.
//!
//! ```
//! use monotess::{Point, Tessellation};
//!
//! let square = vec![
//!   Point::new(0.0, 0.0),
//!   Point::new(1.0, 0.0),
//!   Point::new(1.0, 1.0),
//!   Point::new(0.0, 1.0),
//! ];
//! let mut tess = Tessellation::new(vec![square]);
//! while tess.step() {}
//!
//! assert!(tess.intersection_points().is_empty());
//! assert_eq!(tess.monotone_regions().len(), 1);
//! assert_eq!(tess.monotone_regions()[0].vertices().len(), 4);
//! ```

mod data;
pub mod exact;
mod splay;
mod sweep;

pub use data::{MonotoneRegion, Point, RationalPoint, Vertex};
pub use sweep::Tessellation;
