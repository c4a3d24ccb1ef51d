/// Debounce gate allowing at most one snapshot upload at a time.
///
/// `Sending` covers encode + request; `CoolingDown` holds the gate shut
/// for a fixed delay after the request settles, whatever its outcome.
/// Only the uploader transitions the gate; everyone else reads it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum UploadGate {
    #[default]
    Idle,
    Sending,
    CoolingDown {
        until_ms: f64,
    },
}

impl UploadGate {
    /// True from the moment an upload starts until its cool-down ends.
    pub fn is_in_flight(&self) -> bool {
        !matches!(self, UploadGate::Idle)
    }

    /// True only while the request itself is outstanding.
    pub fn is_sending(&self) -> bool {
        matches!(self, UploadGate::Sending)
    }

    /// Claims the gate. Returns false if an upload is already in flight.
    pub(crate) fn try_begin(&mut self) -> bool {
        if self.is_in_flight() {
            return false;
        }
        *self = UploadGate::Sending;
        true
    }

    /// Marks the request settled at `now_ms` and starts the cool-down.
    pub(crate) fn settle(&mut self, now_ms: f64, cooldown_ms: f64) {
        *self = UploadGate::CoolingDown {
            until_ms: now_ms + cooldown_ms,
        };
    }

    /// Reopens the gate once the cool-down has elapsed.
    pub(crate) fn release_if_due(&mut self, now_ms: f64) -> bool {
        match *self {
            UploadGate::CoolingDown { until_ms } if now_ms >= until_ms => {
                *self = UploadGate::Idle;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_idle() {
        let gate = UploadGate::default();
        assert!(!gate.is_in_flight());
        assert!(!gate.is_sending());
    }

    #[test]
    fn test_begin_claims_once() {
        let mut gate = UploadGate::default();
        assert!(gate.try_begin());
        assert!(gate.is_in_flight());
        assert!(gate.is_sending());
        assert!(!gate.try_begin());
    }

    #[test]
    fn test_settle_clears_sending_but_stays_in_flight() {
        let mut gate = UploadGate::default();
        gate.try_begin();
        gate.settle(500.0, 1000.0);
        assert!(!gate.is_sending());
        assert!(gate.is_in_flight());
        assert!(!gate.try_begin());
    }

    #[test]
    fn test_release_waits_for_full_cooldown() {
        let mut gate = UploadGate::default();
        gate.try_begin();
        gate.settle(500.0, 1000.0);

        assert!(!gate.release_if_due(1499.9));
        assert!(gate.is_in_flight());

        assert!(gate.release_if_due(1500.0));
        assert_eq!(gate, UploadGate::Idle);
        assert!(gate.try_begin());
    }

    #[test]
    fn test_release_does_not_touch_sending_gate() {
        let mut gate = UploadGate::default();
        gate.try_begin();
        assert!(!gate.release_if_due(f64::MAX));
        assert!(gate.is_sending());
    }
}
