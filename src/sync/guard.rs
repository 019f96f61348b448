use std::cell::Cell;
use std::rc::Rc;

/// Shared "we are writing" flag. The coordinator engages it around its own
/// editor writes; a host adapter holding a clone can check it to recognize
/// change notifications caused by those writes.
#[derive(Debug, Clone, Default)]
pub struct WriteFlag(Rc<Cell<bool>>);

impl WriteFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_engaged(&self) -> bool {
        self.0.get()
    }

    /// Engage the flag until the returned guard is dropped.
    pub fn engage(&self) -> WriteGuard {
        self.0.set(true);
        WriteGuard(Rc::clone(&self.0))
    }
}

/// Releases the write flag on drop.
#[derive(Debug)]
pub struct WriteGuard(Rc<Cell<bool>>);

impl Drop for WriteGuard {
    fn drop(&mut self) {
        self.0.set(false);
    }
}
