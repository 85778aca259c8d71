//! Value types shared between the window manager core and the X11 session.

pub mod geometry;

pub use geometry::Geometry;
