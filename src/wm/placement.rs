//! Placement Module
//!
//! Where a newly mapped window goes: centered under the pointer, then pushed
//! back inside the screen.

use crate::shared::Geometry;

/// Origin that centers `geometry` under `pointer`, clamped so the window and
/// its borders stay on a `screen`-sized display.
pub fn place_under_pointer(pointer: (i32, i32), geometry: &Geometry, screen: (u32, u32)) -> (i32, i32) {
    let x = pointer.0 - (geometry.width / 2) as i32;
    let y = pointer.1 - (geometry.height / 2) as i32;

    (
        clamp_axis(x, geometry.outer_width(), screen.0),
        clamp_axis(y, geometry.outer_height(), screen.1),
    )
}

/// Keep `[origin, origin + extent]` inside `[0, span]`. An extent larger than
/// the span is anchored at 0 rather than given a negative origin.
fn clamp_axis(origin: i32, extent: u32, span: u32) -> i32 {
    let max = i64::from(span) - i64::from(extent);
    if max <= 0 {
        return 0;
    }
    i64::from(origin).clamp(0, max) as i32
}
