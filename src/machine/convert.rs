//! Absolute to incremental conversion.

use std::sync::Arc;

use super::{Machine, Position};
use crate::dialect::Dialect;
use crate::error::{GcodeError, Result};
use crate::gcode::{Behavior, DistanceMode, GCode, ModalGroup};

/// Rewrites a stream of absolute-coordinate instructions for a target
/// distance mode.
///
/// A scratch machine held in absolute mode tracks where each instruction
/// leaves the tool. With an incremental target, rapid and linear moves
/// keep only their non-zero axis deltas; other motions cannot be rewritten
/// and are rejected. With an absolute target everything passes through.
#[derive(Debug, Clone)]
pub struct IncrementalConverter {
    machine: Machine,
    target: DistanceMode,
}

impl IncrementalConverter {
    /// Converter starting from the work position `start`.
    pub fn new(dialect: Arc<Dialect>, start: &Position, target: DistanceMode) -> Result<Self> {
        let mut machine = Machine::new(dialect)?;
        machine.process_str("G90")?;
        machine.set_pos(start);
        Ok(Self { machine, target })
    }

    /// Work position of the converted stream so far.
    pub fn pos(&self) -> Position {
        self.machine.pos()
    }

    /// Convert one instruction; `None` when it has nothing left to do.
    pub fn convert(&mut self, gcode: &GCode) -> Result<Option<GCode>> {
        if self.target == DistanceMode::Absolute {
            self.machine.process_gcodes(std::slice::from_ref(gcode))?;
            return Ok(Some(gcode.clone()));
        }

        match gcode.behavior() {
            Behavior::Rapid | Behavior::Linear => self.convert_move(gcode),
            // the output carries its own distance mode
            Behavior::DistanceMode => Ok(None),
            _ if is_motion(gcode) => Err(GcodeError::UnsupportedConversion {
                gcode: gcode.to_string(),
            }),
            _ => {
                self.machine.process_gcodes(std::slice::from_ref(gcode))?;
                Ok(Some(gcode.clone()))
            }
        }
    }

    fn convert_move(&mut self, gcode: &GCode) -> Result<Option<GCode>> {
        let axes = self.machine.axes();
        let start = self.machine.pos();
        self.machine.process_gcodes(std::slice::from_ref(gcode))?;
        let end = self.machine.pos();

        let mut converted = gcode.clone();
        let mut moved = false;
        for letter in gcode.param_letters().intersection(axes).iter() {
            converted.remove_parameter(letter);
            let (Some(from), Some(to)) = (start.get(letter), end.get(letter)) else {
                continue;
            };
            let delta = self.machine.dialect().word(letter, to - from)?;
            if delta.as_f64().is_some_and(|d| d != 0.0) {
                converted.add_parameter(delta)?;
                moved = true;
            }
        }

        let other_params = !converted.param_letters().is_empty();
        Ok((moved || other_params).then_some(converted))
    }

    /// Convert a whole stream, dropping instructions left with nothing to do.
    pub fn convert_all(&mut self, gcodes: &[GCode]) -> Result<Vec<GCode>> {
        let mut converted = Vec::with_capacity(gcodes.len());
        for gcode in gcodes {
            if let Some(gcode) = self.convert(gcode)? {
                converted.push(gcode);
            }
        }
        Ok(converted)
    }
}

fn is_motion(gcode: &GCode) -> bool {
    gcode.modal_group() == Some(ModalGroup::Motion)
        || gcode.behavior() == Behavior::CannedCycle
        || (gcode.behavior() == Behavior::GotoPredefined && !gcode.param_letters().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect;
    use crate::gcode::text_to_gcodes;

    fn converter(dialect: &Arc<Dialect>, target: DistanceMode) -> IncrementalConverter {
        let start = Position::new(dialect.axes());
        IncrementalConverter::new(dialect.clone(), &start, target).unwrap()
    }

    fn convert(c: &mut IncrementalConverter, text: &str) -> Result<Vec<String>> {
        let d = c.machine.dialect().clone();
        let gcodes = text_to_gcodes(text, &d)?;
        let converted = c.convert_all(&gcodes)?;
        Ok(converted.iter().map(|g| g.to_string()).collect())
    }

    #[test]
    fn test_rapid_to_incremental() {
        let d = dialect::builtin("linuxcnc").unwrap();
        let mut c = converter(&d, DistanceMode::Incremental);
        assert_eq!(convert(&mut c, "G0 X10 Y20").unwrap(), vec!["G00 X10 Y20"]);
        assert_eq!(convert(&mut c, "G1 X10 Y25 Z-1").unwrap(), vec!["G01 Y5 Z-1"]);
        assert_eq!(c.pos().get('Y'), Some(25.0));
    }

    #[test]
    fn test_zero_move_dropped() {
        let d = dialect::builtin("linuxcnc").unwrap();
        let mut c = converter(&d, DistanceMode::Incremental);
        convert(&mut c, "G1 X3").unwrap();
        assert!(convert(&mut c, "G1 X3").unwrap().is_empty());
    }

    #[test]
    fn test_non_motion_passes_through() {
        let d = dialect::builtin("linuxcnc").unwrap();
        let mut c = converter(&d, DistanceMode::Incremental);
        assert_eq!(convert(&mut c, "M9").unwrap(), vec!["M09"]);
        assert_eq!(convert(&mut c, "F100").unwrap(), vec!["F100"]);
        assert!(convert(&mut c, "G90").unwrap().is_empty());
    }

    #[test]
    fn test_other_motion_rejected() {
        let d = dialect::builtin("linuxcnc").unwrap();
        let mut c = converter(&d, DistanceMode::Incremental);
        for text in ["G2 X1 Y1 R1", "G81 X1 Y1 Z-1 R1", "G38.2 Z-5", "G28 Z5"] {
            assert!(
                matches!(
                    convert(&mut c, text),
                    Err(GcodeError::UnsupportedConversion { .. })
                ),
                "{}",
                text
            );
        }
    }

    #[test]
    fn test_absolute_target_passes_through() {
        let d = dialect::builtin("linuxcnc").unwrap();
        let mut c = converter(&d, DistanceMode::Absolute);
        assert_eq!(convert(&mut c, "G2 X2 Y0 R1").unwrap(), vec!["G02 R1 X2 Y0"]);
        assert_eq!(c.pos().get('X'), Some(2.0));
    }

    #[test]
    fn test_marlin_keeps_feed_rate() {
        let d = dialect::builtin("marlin2").unwrap();
        let mut c = converter(&d, DistanceMode::Incremental);
        assert_eq!(
            convert(&mut c, "G1 X5 E1 F1500").unwrap(),
            vec!["G01 E1 F1500 X5"]
        );
        assert_eq!(convert(&mut c, "G1 X5 F1200").unwrap(), vec!["G01 F1200"]);
    }
}
