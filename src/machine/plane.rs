//! Working planes and their orientation relative to the XY plane.

use glam::{DMat3, DQuat, DVec3};
use serde::Serialize;

/// One of the three cardinal working planes.
///
/// Each plane's local frame is `(first axis, second axis, normal)`, a
/// right-handed frame obtained by rotating the machine's XYZ frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Plane {
    #[default]
    XY,
    ZX,
    YZ,
}

impl Plane {
    /// Plane selected by a `G17`/`G18`/`G19` code, given in tenths.
    pub fn from_code(tenths: i64) -> Option<Plane> {
        match tenths {
            170 => Some(Plane::XY),
            180 => Some(Plane::ZX),
            190 => Some(Plane::YZ),
            _ => None,
        }
    }

    /// In-plane axis letters, in the plane's local x, y order.
    pub fn axes(self) -> (char, char) {
        match self {
            Plane::XY => ('X', 'Y'),
            Plane::ZX => ('Z', 'X'),
            Plane::YZ => ('Y', 'Z'),
        }
    }

    pub fn normal_axis(self) -> char {
        match self {
            Plane::XY => 'Z',
            Plane::ZX => 'Y',
            Plane::YZ => 'X',
        }
    }

    pub fn normal(self) -> DVec3 {
        self.rotation() * DVec3::Z
    }

    /// Rotation taking the XY plane's basis onto this plane's basis.
    pub fn rotation(self) -> DQuat {
        match self {
            Plane::XY => DQuat::IDENTITY,
            Plane::ZX => DQuat::from_mat3(&DMat3::from_cols(DVec3::Z, DVec3::X, DVec3::Y)),
            Plane::YZ => DQuat::from_mat3(&DMat3::from_cols(DVec3::Y, DVec3::Z, DVec3::X)),
        }
    }

    /// Machine coordinates to plane-local coordinates.
    pub fn to_local(self, point: DVec3) -> DVec3 {
        self.rotation().inverse() * point
    }

    /// Plane-local coordinates to machine coordinates.
    pub fn to_machine(self, point: DVec3) -> DVec3 {
        self.rotation() * point
    }
}
