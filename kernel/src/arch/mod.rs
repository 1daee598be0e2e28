// src/arch/mod.rs
// Abstraction d'architecture - contrôleur d'interruptions vu par l'ordonnanceur

pub mod irq;

pub use irq::{Irq, IrqController, IrqError, IrqFlags, IrqHandler, SoftIrqController, MAX_IRQS};
