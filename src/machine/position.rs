//! Axis positions.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Neg, Sub};

use glam::DVec3;
use serde::Serialize;

use crate::word::LetterSet;

/// A value per machine axis.
///
/// The axis set is fixed at construction; updates naming other letters are
/// ignored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Position {
    values: BTreeMap<char, f64>,
}

impl Position {
    /// All `axes` at zero.
    pub fn new(axes: LetterSet) -> Self {
        Self {
            values: axes.iter().map(|axis| (axis, 0.0)).collect(),
        }
    }

    pub fn axes(&self) -> LetterSet {
        self.values.keys().copied().collect()
    }

    pub fn get(&self, axis: char) -> Option<f64> {
        self.values.get(&axis.to_ascii_uppercase()).copied()
    }

    /// Set one axis; `false` if the position has no such axis.
    pub fn set(&mut self, axis: char, value: f64) -> bool {
        match self.values.get_mut(&axis.to_ascii_uppercase()) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Sparse update: axes not in `coords` keep their value.
    pub fn update<I>(&mut self, coords: I)
    where
        I: IntoIterator<Item = (char, f64)>,
    {
        for (axis, value) in coords {
            self.set(axis, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, f64)> + '_ {
        self.values.iter().map(|(axis, value)| (*axis, *value))
    }

    pub fn is_zero(&self) -> bool {
        self.values.values().all(|v| *v == 0.0)
    }

    /// The X, Y and Z components; missing axes read as zero.
    pub fn xyz(&self) -> DVec3 {
        DVec3::new(
            self.get('X').unwrap_or(0.0),
            self.get('Y').unwrap_or(0.0),
            self.get('Z').unwrap_or(0.0),
        )
    }

    fn zip_with(&self, other: &Position, op: impl Fn(f64, f64) -> f64) -> Position {
        Position {
            values: self
                .values
                .iter()
                .map(|(axis, value)| (*axis, op(*value, other.get(*axis).unwrap_or(0.0))))
                .collect(),
        }
    }
}

impl Add for &Position {
    type Output = Position;

    fn add(self, other: &Position) -> Position {
        self.zip_with(other, |a, b| a + b)
    }
}

impl Sub for &Position {
    type Output = Position;

    fn sub(self, other: &Position) -> Position {
        self.zip_with(other, |a, b| a - b)
    }
}

impl Neg for &Position {
    type Output = Position;

    fn neg(self) -> Position {
        Position {
            values: self.values.iter().map(|(axis, v)| (*axis, -v)).collect(),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .values
            .iter()
            .map(|(axis, value)| format!("{}{:.3}", axis, value))
            .collect();
        write!(f, "<Pos: {}>", parts.join(" "))
    }
}
