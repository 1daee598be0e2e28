//! Real-time scheduling support
//!
//! EDF selection and the recovery applied to tasks that missed their slot.

pub mod deadline;
pub(crate) mod edf;

pub use deadline::{realign, Realignment, SLOT_ALIGN_TRIES};
