//! Instructions: kinds, instances, dispatch and grouping.

pub mod dispatch;
pub mod group;
pub mod instruction;
pub mod kind;

pub use dispatch::Dispatcher;
pub use group::{split_gcodes, text_to_gcodes, words_to_gcodes};
pub use instruction::{GCode, cmp_exec_order, sort_by_exec_order};
pub use kind::{
    ArcDirection, Behavior, DistanceMode, GCodeKind, ModalGroup, ReturnMode, Units, WordMatcher,
};
