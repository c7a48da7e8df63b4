/// Kinds of events the period scheduler can process.
///
/// Only `PeriodUpdate` is ever scheduled today; the failure and recovery
/// kinds are reserved hook points and their handlers may be no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    PeriodUpdate,
    ConnectionFailure,
    LinkFailure,
    NodeFailure,
    FiberFailure,
    LinkRecovery,
    NodeRecovery,
    FiberRecovery,
}

#[derive(Debug, Clone, Copy)]
pub struct Event {
    kind: EventKind,
    time: f64,
}

impl Event {
    pub fn new(kind: EventKind, time: f64) -> Self {
        Event { kind, time }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn time(&self) -> f64 {
        self.time
    }
}
