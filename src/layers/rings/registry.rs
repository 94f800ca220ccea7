//! Ring shape registry.
//!
//! A static table: adding a shape means adding a line here.

use super::shapes::*;
use super::RingShape;

/// Every available ring shape.
pub static RING_SHAPES: [&dyn RingShape; 13] = [
    &Circle,
    &Square,
    &Triangle,
    &Pentagon,
    &Hexagon,
    &SeptagonOutline,
    &Star5,
    &PlusOutline,
    &KiteOutline,
    &HourglassOutline,
    &CrosshairOutline,
    &OffsetCircle,
    &OffsetCircles,
];

/// Look up a shape by identifier.
///
/// # Example
/// ```
/// use psyviz::layers::rings::ring_shape;
///
/// assert_eq!(ring_shape("hexagon").map(|s| s.display_name()), Some("Hexagon"));
/// assert!(ring_shape("dodecahedron").is_none());
/// ```
pub fn ring_shape(name: &str) -> Option<&'static dyn RingShape> {
    RING_SHAPES.iter().copied().find(|shape| shape.name() == name)
}

/// Look up a shape, falling back to the circle for unknown identifiers.
pub fn ring_shape_or_default(name: &str) -> &'static dyn RingShape {
    ring_shape(name).unwrap_or_else(|| {
        log::warn!("Ring shape '{}' not found, using circle", name);
        RING_SHAPES[0]
    })
}

/// `(display_name, name)` pairs sorted by display name.
pub fn ring_shapes() -> Vec<(&'static str, &'static str)> {
    let mut names: Vec<_> = RING_SHAPES
        .iter()
        .map(|shape| (shape.display_name(), shape.name()))
        .collect();
    names.sort_unstable();
    names
}
