//! Cycle-count alarms for time-sensitive cartridge hardware.
//!
//! Alarms are cooperative: they fire only when the embedding machine
//! advances the emulated clock, never from a real-time timer. Alarms due at
//! the same cycle fire in insertion order.

use serde::{Deserialize, Serialize};

/// What an alarm does when it fires. Deliberately an enum rather than a
/// callback so schedules survive serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum AlarmKind {
    /// The Epyx Fastload capacitor finished charging; ROM switches off.
    EpyxRomOff,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct Alarm {
    kind: AlarmKind,
    due: u64,
}

/// Pending alarms, ordered by insertion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct AlarmScheduler {
    pending: Vec<Alarm>,
}

impl AlarmScheduler {
    /// Schedule `kind` to fire once the clock reaches `due`.
    ///
    /// Callers reschedule with `unset` followed by `set`, the same way the
    /// hardware handlers re-arm themselves.
    pub(crate) fn set(&mut self, kind: AlarmKind, due: u64) {
        self.pending.push(Alarm { kind, due });
    }

    /// Cancel every pending alarm of this kind. Idempotent.
    pub(crate) fn unset(&mut self, kind: AlarmKind) {
        self.pending.retain(|alarm| alarm.kind != kind);
    }

    pub(crate) fn is_pending(&self, kind: AlarmKind) -> bool {
        self.pending.iter().any(|alarm| alarm.kind == kind)
    }

    /// Remove and return the first alarm (in insertion order) that is due
    /// at or before `clock`. The caller loops until this returns `None` so
    /// that one alarm's handler may re-arm another.
    pub(crate) fn pop_due(&mut self, clock: u64) -> Option<AlarmKind> {
        let index = self.pending.iter().position(|alarm| alarm.due <= clock)?;
        Some(self.pending.remove(index).kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_only_once_due() {
        let mut alarms = AlarmScheduler::default();
        alarms.set(AlarmKind::EpyxRomOff, 512);

        assert_eq!(None, alarms.pop_due(511));
        assert_eq!(Some(AlarmKind::EpyxRomOff), alarms.pop_due(512));
        assert_eq!(None, alarms.pop_due(512));
    }

    #[test]
    fn unset_is_idempotent() {
        let mut alarms = AlarmScheduler::default();
        alarms.set(AlarmKind::EpyxRomOff, 100);

        alarms.unset(AlarmKind::EpyxRomOff);
        alarms.unset(AlarmKind::EpyxRomOff);

        assert!(!alarms.is_pending(AlarmKind::EpyxRomOff));
        assert_eq!(None, alarms.pop_due(u64::MAX));
    }

    #[test]
    fn simultaneous_alarms_fire_in_insertion_order() {
        let mut alarms = AlarmScheduler::default();
        alarms.set(AlarmKind::EpyxRomOff, 50);
        alarms.set(AlarmKind::EpyxRomOff, 50);

        assert_eq!(Some(AlarmKind::EpyxRomOff), alarms.pop_due(50));
        assert_eq!(Some(AlarmKind::EpyxRomOff), alarms.pop_due(50));
        assert_eq!(None, alarms.pop_due(50));
    }

    #[test]
    fn reschedule_replaces_old_deadline() {
        let mut alarms = AlarmScheduler::default();
        alarms.set(AlarmKind::EpyxRomOff, 100);

        alarms.unset(AlarmKind::EpyxRomOff);
        alarms.set(AlarmKind::EpyxRomOff, 300);

        assert_eq!(None, alarms.pop_due(200));
        assert_eq!(Some(AlarmKind::EpyxRomOff), alarms.pop_due(300));
    }
}
