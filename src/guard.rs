/// Busy state of one kind of request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchGuard {
    #[default]
    Idle,
    InFlight,
}

impl FetchGuard {
    /// Idle -> InFlight. Returns false (and changes nothing) if already in flight.
    pub fn try_begin(&mut self) -> bool {
        match self {
            FetchGuard::Idle => {
                *self = FetchGuard::InFlight;
                true
            }
            FetchGuard::InFlight => false,
        }
    }

    /// InFlight -> Idle, on success and on failure alike
    pub fn finish(&mut self) {
        *self = FetchGuard::Idle;
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, FetchGuard::InFlight)
    }
}

/// Fires exactly once; later attempts are refused
#[derive(Debug, Default)]
pub struct InitLatch {
    fired: bool,
}

impl InitLatch {
    pub fn try_fire(&mut self) -> bool {
        !std::mem::replace(&mut self.fired, true)
    }
}
