use std::collections::BTreeMap;
use std::fmt;

use super::Plane;
use crate::gcode::{Behavior, DistanceMode, GCode, ModalGroup, ReturnMode, Units, cmp_exec_order};

/// Active instruction per modal group.
///
/// Slots hold modal snapshots, so only the parameters worth remembering
/// are kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mode {
    slots: BTreeMap<ModalGroup, GCode>,
}

impl Mode {
    /// Make `gcode` its group's active instruction, returning the one it
    /// replaced. Instructions outside any group are ignored.
    pub fn set(&mut self, gcode: &GCode) -> Option<GCode> {
        let group = gcode.modal_group()?;
        self.slots.insert(group, gcode.modal_snapshot())
    }

    pub fn get(&self, group: ModalGroup) -> Option<&GCode> {
        self.slots.get(&group)
    }

    pub fn remove(&mut self, group: ModalGroup) -> Option<GCode> {
        self.slots.remove(&group)
    }

    /// Active instructions in group order.
    pub fn iter(&self) -> impl Iterator<Item = &GCode> {
        self.slots.values()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn motion(&self) -> Option<&GCode> {
        self.get(ModalGroup::Motion)
    }

    /// Instruction that bare parameter words re-run: an active canned
    /// cycle, else the motion mode.
    pub fn modal_motion(&self) -> Option<&GCode> {
        self.get(ModalGroup::CannedCycle)
            .filter(|g| g.behavior() == Behavior::CannedCycle)
            .or_else(|| self.motion())
    }

    pub fn plane(&self) -> Plane {
        self.get(ModalGroup::PlaneSelection)
            .and_then(GCode::plane)
            .unwrap_or_default()
    }

    pub fn distance_mode(&self) -> DistanceMode {
        self.get(ModalGroup::Distance)
            .and_then(GCode::distance_mode)
            .unwrap_or(DistanceMode::Absolute)
    }

    /// Arc centre mode; incremental unless `G90.1` is active.
    pub fn arc_distance_mode(&self) -> DistanceMode {
        self.get(ModalGroup::ArcIjkDistance)
            .and_then(GCode::arc_distance_mode)
            .unwrap_or(DistanceMode::Incremental)
    }

    pub fn units(&self) -> Units {
        self.get(ModalGroup::Units)
            .and_then(GCode::units)
            .unwrap_or(Units::Millimeters)
    }

    pub fn return_mode(&self) -> ReturnMode {
        self.get(ModalGroup::CannedCyclesReturn)
            .and_then(GCode::return_mode)
            .unwrap_or(ReturnMode::PreviousLevel)
    }

    /// Active coordinate system, 1 to 9.
    pub fn coordinate_system(&self) -> usize {
        self.get(ModalGroup::CoordinateSystem)
            .and_then(GCode::coordinate_system)
            .unwrap_or(1)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut gcodes: Vec<&GCode> = self.slots.values().collect();
        gcodes.sort_by(|a, b| cmp_exec_order(a, b));
        let parts: Vec<String> = gcodes.iter().map(|g| g.to_string()).collect();
        write!(f, "<Mode: {}>", parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect;
    use crate::gcode::text_to_gcodes;

    fn mode_from(text: &str) -> Mode {
        let d = dialect::builtin("linuxcnc").unwrap();
        let mut mode = Mode::default();
        for gcode in text_to_gcodes(text, &d).unwrap() {
            mode.set(&gcode);
        }
        mode
    }

    #[test]
    fn test_defaults() {
        let mode = Mode::default();
        assert_eq!(mode.plane(), Plane::XY);
        assert_eq!(mode.distance_mode(), DistanceMode::Absolute);
        assert_eq!(mode.arc_distance_mode(), DistanceMode::Incremental);
        assert_eq!(mode.units(), Units::Millimeters);
        assert_eq!(mode.return_mode(), ReturnMode::PreviousLevel);
        assert_eq!(mode.coordinate_system(), 1);
        assert!(mode.motion().is_none());
    }

    #[test]
    fn test_second_instruction_replaces_first() {
        let mut mode = mode_from("G0 G90");
        let d = dialect::builtin("linuxcnc").unwrap();
        let replaced = mode.set(&text_to_gcodes("G1 X3", &d).unwrap()[0]);
        assert_eq!(replaced.map(|g| g.to_string()), Some("G00".to_string()));
        assert_eq!(mode.motion().map(|g| g.name()), Some("LinearMove"));
        assert_eq!(mode.len(), 2);
    }

    #[test]
    fn test_slots_hold_snapshots() {
        let mode = mode_from("G1 X3 G18 G91 G20 G99 G56");
        assert_eq!(mode.motion().unwrap().to_string(), "G01");
        assert_eq!(mode.plane(), Plane::ZX);
        assert_eq!(mode.distance_mode(), DistanceMode::Incremental);
        assert_eq!(mode.units(), Units::Inches);
        assert_eq!(mode.return_mode(), ReturnMode::ToR);
        assert_eq!(mode.coordinate_system(), 3);
    }

    #[test]
    fn test_modal_motion_prefers_canned_cycle() {
        let mut mode = mode_from("G1 X1");
        assert_eq!(mode.modal_motion().map(|g| g.name()), Some("LinearMove"));

        let d = dialect::builtin("linuxcnc").unwrap();
        mode.set(&text_to_gcodes("G81 Z-1 R2", &d).unwrap()[0]);
        assert_eq!(mode.modal_motion().map(|g| g.to_string()), Some("G81 R2 Z-1".into()));

        mode.set(&text_to_gcodes("G80", &d).unwrap()[0]);
        assert_eq!(mode.modal_motion().map(|g| g.name()), Some("LinearMove"));
    }

    #[test]
    fn test_display_in_exec_order() {
        let mode = mode_from("M9 G1 G21 F100");
        assert_eq!(mode.to_string(), "<Mode: F100 M09 G21 G01>");
    }
}
