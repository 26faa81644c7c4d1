//! Machine simulation.
//!
//! A [`Machine`] threads instructions through its state: the active
//! instruction of each modal group, the machine position, and the
//! coordinate system offsets. Positions handed in and out are work
//! coordinates unless a method says otherwise.

pub mod convert;
pub mod mode;
pub mod plane;
pub mod position;

pub use convert::IncrementalConverter;
pub use mode::Mode;
pub use plane::Plane;
pub use position::Position;

use std::fmt;
use std::sync::Arc;

use glam::{DVec2, DVec3};
use serde::Serialize;

use crate::dialect::Dialect;
use crate::error::{GcodeError, Result};
use crate::gcode::{
    ArcDirection, Behavior, DistanceMode, GCode, ModalGroup, ReturnMode, sort_by_exec_order,
};
use crate::parser::{Block, parse_line};
use crate::word::{LetterSet, Word};

/// Number of selectable coordinate systems (`G54` to `G59.3`).
pub const COORDINATE_SYSTEMS: usize = 9;

/// Smallest negative `R^2 - (chord/2)^2` still treated as a half circle.
const RADIUS_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct Machine {
    dialect: Arc<Dialect>,
    /// Machine coordinates.
    abs_pos: Position,
    mode: Mode,
    coord_offsets: Vec<Position>,
    /// `G92` offset, on top of the active coordinate system's.
    offset: Position,
    saved_offset: Option<Position>,
    predefined: [Position; 2],
}

impl Machine {
    /// A machine at the origin, with the dialect's default mode applied.
    pub fn new(dialect: Arc<Dialect>) -> Result<Self> {
        let zero = Position::new(dialect.axes());
        let mut machine = Self {
            abs_pos: zero.clone(),
            mode: Mode::default(),
            coord_offsets: vec![zero.clone(); COORDINATE_SYSTEMS],
            offset: zero.clone(),
            saved_offset: None,
            predefined: [zero.clone(), zero],
            dialect,
        };

        let default_mode = machine.dialect.default_mode().to_string();
        machine.process_str(&default_mode)?;
        log::debug!(
            "new {} machine, axes {}, {}",
            machine.dialect.name(),
            machine.axes(),
            machine.mode
        );
        Ok(machine)
    }

    pub fn dialect(&self) -> &Arc<Dialect> {
        &self.dialect
    }

    pub fn axes(&self) -> LetterSet {
        self.abs_pos.axes()
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Make `gcode` its modal group's active instruction.
    ///
    /// A motion instruction also ends any active canned cycle.
    pub fn set_mode(&mut self, gcode: &GCode) {
        if gcode.modal_group() == Some(ModalGroup::Motion) {
            self.mode.remove(ModalGroup::CannedCycle);
        }
        self.mode.set(gcode);
    }

    /// Work position.
    pub fn pos(&self) -> Position {
        &self.abs_pos - &self.work_offset()
    }

    /// Move to a work position without going through an instruction.
    pub fn set_pos(&mut self, pos: &Position) {
        let abs = pos + &self.work_offset();
        self.abs_pos.update(abs.iter());
    }

    /// Machine position.
    pub fn abs_pos(&self) -> &Position {
        &self.abs_pos
    }

    /// Sparse update of the machine position; work offsets are untouched.
    pub fn set_abs_pos(&mut self, pos: &Position) {
        self.abs_pos.update(pos.iter());
    }

    /// Total offset between machine and work coordinates.
    pub fn work_offset(&self) -> Position {
        let system = &self.coord_offsets[self.mode.coordinate_system() - 1];
        system + &self.offset
    }

    /// Offset of coordinate system `system` (1 to 9).
    pub fn coordinate_offset(&self, system: usize) -> Option<&Position> {
        system
            .checked_sub(1)
            .and_then(|index| self.coord_offsets.get(index))
    }

    pub fn set_coordinate_offset(&mut self, system: usize, offset: &Position) -> Result<()> {
        let slot = system
            .checked_sub(1)
            .and_then(|index| self.coord_offsets.get_mut(index))
            .ok_or_else(|| {
                GcodeError::InvalidMachineState(format!("no coordinate system {}", system))
            })?;
        slot.update(offset.iter());
        Ok(())
    }

    /// The `G92` offset.
    pub fn offset(&self) -> &Position {
        &self.offset
    }

    /// Stored `G28`/`G30` position, in machine coordinates.
    pub fn predefined_position(&self, slot: usize) -> Option<&Position> {
        self.predefined.get(slot)
    }

    /// Axis parameters of `gcode` that this machine has.
    fn axis_params(&self, gcode: &GCode) -> Vec<(char, f64)> {
        let axes = self.axes();
        gcode
            .params()
            .filter(|word| axes.contains(word.letter()))
            .filter_map(|word| word.as_f64().map(|v| (word.letter(), v)))
            .collect()
    }

    /// Work position reached by moving to `coords` in the active distance
    /// mode. Axes not named keep their value.
    pub fn target<I>(&self, coords: I) -> Position
    where
        I: IntoIterator<Item = (char, f64)>,
    {
        let mut target = self.pos();
        match self.mode.distance_mode() {
            DistanceMode::Absolute => target.update(coords),
            DistanceMode::Incremental => {
                for (axis, value) in coords {
                    if let Some(current) = target.get(axis) {
                        target.set(axis, current + value);
                    }
                }
            }
        }
        target
    }

    /// Move along the named axes, in the active distance mode.
    pub fn move_to<I>(&mut self, coords: I)
    where
        I: IntoIterator<Item = (char, f64)>,
    {
        let target = self.target(coords);
        self.set_pos(&target);
    }

    /// Apply one instruction: set its mode, then perform its effect.
    pub fn apply(&mut self, gcode: &GCode) -> Result<()> {
        gcode.validate()?;
        if gcode.behavior() == Behavior::Arc {
            self.arc_center(gcode)?;
        }

        log::trace!("apply {} ({})", gcode, gcode.name());
        self.set_mode(gcode);

        match gcode.behavior() {
            Behavior::Rapid | Behavior::Linear | Behavior::Arc | Behavior::Motion => {
                let coords = self.axis_params(gcode);
                self.move_to(coords);
            }
            Behavior::CannedCycle => self.canned_cycle(gcode),
            Behavior::CoordinateOffset => {
                let system = self.coord_offsets[self.mode.coordinate_system() - 1].clone();
                for (axis, value) in self.axis_params(gcode) {
                    if let (Some(abs), Some(sys)) = (self.abs_pos.get(axis), system.get(axis)) {
                        self.offset.set(axis, abs - sys - value);
                    }
                }
            }
            Behavior::ResetCoordinateOffset => {
                self.saved_offset = gcode.keeps_saved_offset().then(|| self.offset.clone());
                self.offset = Position::new(self.axes());
            }
            Behavior::RestoreCoordinateOffset => {
                if let Some(saved) = &self.saved_offset {
                    self.offset = saved.clone();
                }
            }
            Behavior::GotoPredefined => {
                let coords = self.axis_params(gcode);
                if !coords.is_empty() {
                    self.move_to(coords);
                }
                if let Some(slot) = gcode.predefined_slot() {
                    self.abs_pos = self.predefined[slot].clone();
                }
            }
            Behavior::SetPredefined => {
                if let Some(slot) = gcode.predefined_slot() {
                    self.predefined[slot] = self.abs_pos.clone();
                }
            }
            Behavior::Home => {
                let xyz = LetterSet::parse("XYZ")
                    .unwrap_or_default()
                    .intersection(self.axes());
                let named = gcode.param_letters().intersection(xyz);
                let homed = if named.is_empty() { xyz } else { named };
                self.abs_pos.update(homed.iter().map(|axis| (axis, 0.0)));
            }
            Behavior::Passive
            | Behavior::Dwell
            | Behavior::PlaneSelect
            | Behavior::DistanceMode
            | Behavior::ArcDistanceMode
            | Behavior::Units
            | Behavior::CannedReturn
            | Behavior::CoordinateSystem => {}
        }
        Ok(())
    }

    fn canned_cycle(&mut self, gcode: &GCode) {
        let normal = self.mode.plane().normal_axis();
        let mut coords: Vec<(char, f64)> = self
            .axis_params(gcode)
            .into_iter()
            .filter(|(axis, _)| *axis != normal)
            .collect();
        if self.mode.return_mode() == ReturnMode::ToR
            && let Some(r) = gcode.param_f64('R')
        {
            coords.push((normal, r));
        }

        for _ in 0..gcode.loop_count() {
            self.move_to(coords.iter().copied());
        }
    }

    /// Validate every instruction, then apply them in execution order.
    ///
    /// The machine is left untouched if any of them fails.
    pub fn process_gcodes(&mut self, gcodes: &[GCode]) -> Result<()> {
        for gcode in gcodes {
            gcode.validate()?;
        }
        let mut ordered = gcodes.to_vec();
        sort_by_exec_order(&mut ordered);

        let mut next = self.clone();
        for gcode in &ordered {
            next.apply(gcode)?;
        }
        *self = next;
        Ok(())
    }

    /// The active motion (or canned cycle) re-run with `params`, or `None`
    /// when there are no parameters.
    pub fn modal_gcode(&self, params: &[Word]) -> Result<Option<GCode>> {
        if params.is_empty() {
            return Ok(None);
        }
        let active = self.mode.modal_motion().ok_or_else(|| {
            GcodeError::InvalidMachineState(format!(
                "no motion mode active for modal parameters: {}",
                join_words(params)
            ))
        })?;
        let mut gcode = active.clone();
        for word in params {
            gcode.set_parameter(word.clone())?;
        }
        Ok(Some(gcode))
    }

    pub fn process_block(&mut self, block: &Block) -> Result<()> {
        let mut gcodes = block.gcodes().to_vec();
        if let Some(modal) = self.modal_gcode(block.modal_params())? {
            if let Some(clash) = gcodes
                .iter()
                .find(|g| g.modal_group().is_some() && g.modal_group() == modal.modal_group())
            {
                return Err(GcodeError::InvalidMachineState(format!(
                    "modal parameters {} given alongside {}",
                    join_words(block.modal_params()),
                    clash
                )));
            }
            gcodes.push(modal);
        }
        self.process_gcodes(&gcodes)
    }

    /// Parse and run one line of G-code.
    pub fn process_str(&mut self, text: &str) -> Result<()> {
        let dialect = self.dialect.clone();
        let line = parse_line(text, &dialect)?;
        self.process_block(&line.block)
    }

    /// Centre of the arc `gcode` would move along, in work coordinates.
    ///
    /// IJK offsets follow the arc distance mode. For `R` arcs the centre is
    /// constructed in the active plane; a negative `R` takes the long way
    /// round.
    pub fn arc_center(&self, gcode: &GCode) -> Result<DVec3> {
        let invalid = |reason: &str| GcodeError::InvalidParameterCombination {
            gcode: gcode.to_string(),
            reason: reason.to_string(),
        };
        let direction = gcode
            .arc_direction()
            .ok_or_else(|| invalid("not an arc move"))?;

        let start = self.pos().xyz();
        let end = self.target(self.axis_params(gcode)).xyz();

        let Some(radius) = gcode.param_f64('R') else {
            let absolute = self.mode.arc_distance_mode() == DistanceMode::Absolute;
            let mut center = start;
            for (index, letter) in ['I', 'J', 'K'].into_iter().enumerate() {
                if let Some(value) = gcode.param_f64(letter) {
                    center[index] = if absolute { value } else { start[index] + value };
                }
            }
            return Ok(center);
        };

        let plane = self.mode.plane();
        let local_start = plane.to_local(start);
        let local_end = plane.to_local(end);
        let chord: DVec2 = (local_end - local_start).truncate();
        let length = chord.length();
        if length == 0.0 {
            return Err(invalid("R arc with identical start and end points"));
        }

        let half_sq = radius * radius - (length / 2.0).powi(2);
        if half_sq < -RADIUS_TOLERANCE {
            return Err(invalid("radius too small to reach the end point"));
        }
        let height = half_sq.max(0.0).sqrt();

        // Clockwise arcs shorter than a half circle have their centre to the
        // right of the chord.
        let right = DVec2::new(chord.y, -chord.x) / length;
        let side = match (direction, radius > 0.0) {
            (ArcDirection::Clockwise, true) | (ArcDirection::CounterClockwise, false) => 1.0,
            _ => -1.0,
        };
        let middle = (local_start.truncate() + local_end.truncate()) / 2.0;
        let center = middle + right * height * side;
        Ok(plane.to_machine(center.extend(local_start.z)))
    }

    pub fn snapshot(&self) -> MachineSnapshot {
        let mut active: Vec<&GCode> = self.mode.iter().collect();
        active.sort_by(|a, b| crate::gcode::cmp_exec_order(a, b));
        MachineSnapshot {
            dialect: self.dialect.name().to_string(),
            position: self.pos(),
            machine_position: self.abs_pos.clone(),
            mode: active.iter().map(|g| g.to_string()).collect(),
            plane: self.mode.plane(),
            coordinate_system: self.mode.coordinate_system(),
            offset: self.work_offset(),
        }
    }
}

fn join_words(words: &[Word]) -> String {
    words
        .iter()
        .map(|w| w.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Serializable report of a machine's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineSnapshot {
    pub dialect: String,
    /// Work position.
    pub position: Position,
    pub machine_position: Position,
    /// Active instructions, in execution order.
    pub mode: Vec<String>,
    pub plane: Plane,
    pub coordinate_system: usize,
    /// Total work offset.
    pub offset: Position,
}

impl fmt::Display for MachineSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let axes = |pos: &Position| {
            pos.iter()
                .map(|(axis, value)| format!("{}{:.3}", axis, value))
                .collect::<Vec<_>>()
                .join(" ")
        };
        writeln!(f, "dialect:           {}", self.dialect)?;
        writeln!(f, "position:          {}", axes(&self.position))?;
        writeln!(f, "machine position:  {}", axes(&self.machine_position))?;
        writeln!(f, "mode:              {}", self.mode.join(" "))?;
        writeln!(f, "plane:             {:?}", self.plane)?;
        writeln!(f, "coordinate system: {}", self.coordinate_system)?;
        write!(f, "offset:            {}", axes(&self.offset))
    }
}
