// src/lib.rs
// Point d'entrée de la bibliothèque : ordonnanceur EDF du DSP
#![cfg_attr(not(test), no_std)] // Pas de bibliothèque standard hors tests

// Import de alloc pour Arc/Box/Vec
extern crate alloc;

// Modules
pub mod arch;
pub mod logger;
pub mod pipeline;
pub mod platform;
pub mod scheduler;
pub mod sync;
pub mod time;

// Réexportations
pub use pipeline::{Pipeline, PipelineCmd, PipelineDesc, XrunSink};
pub use platform::SoftPlatform;
pub use scheduler::{
    PassOutcome, Platform, SchedConfig, SchedError, SchedResult, Scheduler, TaskConfig, TaskId,
    TaskState, WorkStatus,
};
