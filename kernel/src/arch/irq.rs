//! Interrupt control
//!
//! The scheduler never touches interrupt controller registers directly: it
//! requests, clears, registers and enables lines through [`IrqController`],
//! and masks interrupts around its critical sections.
//!
//! [`SoftIrqController`] is the software rendition used on the host: every
//! line is an edge-triggered pending flag plus a handler, and
//! [`SoftIrqController::dispatch`] plays the role of the interrupt entry.

use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use spin::Mutex;

/// Number of software interrupt lines
pub const MAX_IRQS: usize = 32;

/// Interrupt line number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Irq(pub u8);

impl Irq {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Irq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "irq{}", self.0)
    }
}

/// Interrupt handler
pub type IrqHandler = Arc<dyn Fn() + Send + Sync>;

/// Saved interrupt mask state, handed back to [`IrqController::restore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrqFlags(pub u32);

/// Interrupt controller errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqError {
    /// Line outside the controller range
    InvalidLine { irq: Irq, max: usize },
    /// A handler is already installed on this line
    AlreadyRegistered { irq: Irq },
}

impl fmt::Display for IrqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLine { irq, max } => {
                write!(f, "{} out of range (max {})", irq, max)
            }
            Self::AlreadyRegistered { irq } => {
                write!(f, "{} already has a handler", irq)
            }
        }
    }
}

/// Interrupt controller collaborator
pub trait IrqController: Send + Sync {
    /// Install the handler for `irq`
    fn register(&self, irq: Irq, handler: IrqHandler) -> Result<(), IrqError>;

    /// Unmask a single line
    fn enable(&self, irq: Irq);

    /// Mask a single line
    fn disable(&self, irq: Irq);

    /// Raise the line (software interrupt). Repeated requests coalesce.
    fn request(&self, irq: Irq);

    /// Acknowledge the line
    fn clear(&self, irq: Irq);

    /// Mask local interrupts, returning the state to restore
    fn save_and_mask(&self) -> IrqFlags;

    /// Undo the matching [`IrqController::save_and_mask`]
    fn restore(&self, flags: IrqFlags);
}

/// One software line
struct IrqLine {
    handler: Mutex<Option<IrqHandler>>,
    enabled: AtomicBool,
    pending: AtomicBool,
}

impl IrqLine {
    const fn new() -> Self {
        Self {
            handler: Mutex::new(None),
            enabled: AtomicBool::new(false),
            pending: AtomicBool::new(false),
        }
    }
}

/// Software interrupt controller
///
/// Masking is a nesting counter: lines stay pending while any context holds
/// the mask, and are delivered by the next [`SoftIrqController::dispatch`].
pub struct SoftIrqController {
    lines: [IrqLine; MAX_IRQS],
    mask_depth: AtomicU32,
}

impl SoftIrqController {
    pub fn new() -> Self {
        Self {
            lines: core::array::from_fn(|_| IrqLine::new()),
            mask_depth: AtomicU32::new(0),
        }
    }

    fn line(&self, irq: Irq) -> Option<&IrqLine> {
        self.lines.get(irq.index())
    }

    /// Is the line raised and not yet acknowledged?
    pub fn is_pending(&self, irq: Irq) -> bool {
        self.line(irq)
            .map(|l| l.pending.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    pub fn is_enabled(&self, irq: Irq) -> bool {
        self.line(irq)
            .map(|l| l.enabled.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    /// Is any context holding the local interrupt mask?
    pub fn is_masked(&self) -> bool {
        self.mask_depth.load(Ordering::Acquire) > 0
    }

    /// Interrupt entry: run the handler of every pending, enabled line once.
    ///
    /// Handlers acknowledge their own line (edge-triggered), so a line raised
    /// again while its handler runs is delivered on the next call. Returns
    /// the number of handlers run; nothing is delivered while masked.
    pub fn dispatch(&self) -> usize {
        if self.is_masked() {
            return 0;
        }

        let mut delivered = 0;
        for line in self.lines.iter() {
            if !line.enabled.load(Ordering::Acquire) || !line.pending.load(Ordering::Acquire) {
                continue;
            }

            let handler = line.handler.lock().clone();
            match handler {
                Some(handler) => {
                    handler();
                    delivered += 1;
                }
                // Spurious: nobody to acknowledge it.
                None => line.pending.store(false, Ordering::Release),
            }
        }
        delivered
    }
}

impl Default for SoftIrqController {
    fn default() -> Self {
        Self::new()
    }
}

impl IrqController for SoftIrqController {
    fn register(&self, irq: Irq, handler: IrqHandler) -> Result<(), IrqError> {
        let line = self.line(irq).ok_or(IrqError::InvalidLine { irq, max: MAX_IRQS })?;
        let mut slot = line.handler.lock();
        if slot.is_some() {
            return Err(IrqError::AlreadyRegistered { irq });
        }
        *slot = Some(handler);
        Ok(())
    }

    fn enable(&self, irq: Irq) {
        if let Some(line) = self.line(irq) {
            line.enabled.store(true, Ordering::Release);
        }
    }

    fn disable(&self, irq: Irq) {
        if let Some(line) = self.line(irq) {
            line.enabled.store(false, Ordering::Release);
        }
    }

    fn request(&self, irq: Irq) {
        if let Some(line) = self.line(irq) {
            line.pending.store(true, Ordering::Release);
        }
    }

    fn clear(&self, irq: Irq) {
        if let Some(line) = self.line(irq) {
            line.pending.store(false, Ordering::Release);
        }
    }

    fn save_and_mask(&self) -> IrqFlags {
        IrqFlags(self.mask_depth.fetch_add(1, Ordering::AcqRel))
    }

    fn restore(&self, _flags: IrqFlags) {
        self.mask_depth.fetch_sub(1, Ordering::AcqRel);
    }
}
