//! IRQ-safe spinlock
//!
//! `spin::Mutex` taken with local interrupts masked, so an interrupt handler
//! on the same core can never observe (or deadlock on) a half-updated value.
//! Hold times must stay short and bounded.

use crate::arch::{IrqController, IrqFlags};
use core::ops::{Deref, DerefMut};
use spin::{Mutex, MutexGuard};

/// Keeps local interrupts masked until dropped
pub struct InterruptGuard<'a> {
    irq: &'a dyn IrqController,
    flags: IrqFlags,
}

impl<'a> InterruptGuard<'a> {
    pub fn new(irq: &'a dyn IrqController) -> Self {
        let flags = irq.save_and_mask();
        Self { irq, flags }
    }
}

impl Drop for InterruptGuard<'_> {
    fn drop(&mut self) {
        self.irq.restore(self.flags);
    }
}

/// Spinlock that masks interrupts while held
pub struct IrqSpinLock<T> {
    inner: Mutex<T>,
}

impl<T> IrqSpinLock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Mask interrupts, then take the lock
    pub fn lock_irq<'a>(&'a self, irq: &'a dyn IrqController) -> IrqSpinLockGuard<'a, T> {
        let mask = InterruptGuard::new(irq);
        let guard = self.inner.lock();
        IrqSpinLockGuard { guard, _mask: mask }
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

/// Guard returned by [`IrqSpinLock::lock_irq`]
///
/// Field order matters: the lock is released before interrupts are
/// restored.
pub struct IrqSpinLockGuard<'a, T> {
    guard: MutexGuard<'a, T>,
    _mask: InterruptGuard<'a>,
}

impl<T> Deref for IrqSpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for IrqSpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::SoftIrqController;

    #[test]
    fn test_lock_masks_interrupts() {
        let ctrl = SoftIrqController::new();
        let lock = IrqSpinLock::new(5u32);
        {
            let mut value = lock.lock_irq(&ctrl);
            assert!(ctrl.is_masked());
            *value += 1;
        }
        assert!(!ctrl.is_masked());
        assert_eq!(lock.into_inner(), 6);
    }

    #[test]
    fn test_nested_interrupt_guards() {
        let ctrl = SoftIrqController::new();
        let outer = InterruptGuard::new(&ctrl);
        {
            let _inner = InterruptGuard::new(&ctrl);
        }
        assert!(ctrl.is_masked());
        drop(outer);
        assert!(!ctrl.is_masked());
    }
}
