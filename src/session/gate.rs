use std::cell::Cell;

/// Latched "both engines are executable" flag.
#[derive(Debug, Default)]
pub struct ReadinessGate {
    open: Cell<bool>,
}

impl ReadinessGate {
    /// Whether scene-dependent work may run.
    pub fn is_open(&self) -> bool {
        self.open.get()
    }

    /// Open the gate. Returns true only for the call that actually opened it.
    pub fn open(&self) -> bool {
        !self.open.replace(true)
    }
}
