pub mod irq_lock;

pub use irq_lock::{InterruptGuard, IrqSpinLock, IrqSpinLockGuard};
