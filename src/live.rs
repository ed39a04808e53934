use chrono::{DateTime, Duration, Utc};

pub const HEARTBEAT_QUIET_SECONDS: i64 = 45;

// Mutation notifications are signals, never deltas: each one means "refetch
// and reassemble".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    EntryCreated,
    EntryStopped,
    EntryChanged,
    EntryDeleted,
    HeartbeatTimeout,
    ConnectionLost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Active,
    Reconciling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Refetch { seq: u64 },
    Resubscribe,
    StartTicking,
    StopTicking,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Applied { effects: Vec<Effect> },
    Stale,
}

#[derive(Debug, Clone)]
pub struct LiveCoordinator {
    phase: Phase,
    ticking: bool,
    issued_seq: u64,
    completed_seq: u64,
    last_signal_at: DateTime<Utc>,
}

impl LiveCoordinator {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            phase: Phase::Idle,
            ticking: false,
            issued_seq: 0,
            completed_seq: 0,
            last_signal_at: now,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_ticking(&self) -> bool {
        self.ticking
    }

    pub fn on_signal(&mut self, signal: Signal, now: DateTime<Utc>) -> Vec<Effect> {
        self.last_signal_at = now;

        let mut effects = Vec::new();
        if signal == Signal::ConnectionLost {
            effects.push(Effect::Resubscribe);
        }

        self.issued_seq += 1;
        self.phase = Phase::Reconciling;
        effects.push(Effect::Refetch {
            seq: self.issued_seq,
        });
        effects
    }

    // The display tick re-evaluates elapsed time only; it never refetches.
    pub fn tick_reassembles(&self) -> bool {
        self.phase == Phase::Active
    }

    pub fn completed(&mut self, seq: u64, has_open_entry: bool) -> Completion {
        if seq <= self.completed_seq {
            return Completion::Stale;
        }
        self.completed_seq = seq;

        if self.completed_seq == self.issued_seq {
            self.phase = if has_open_entry {
                Phase::Active
            } else {
                Phase::Idle
            };
        }

        // Ticking follows the freshest applied snapshot, even while a newer
        // refetch is still in flight.
        let mut effects = Vec::new();
        match (has_open_entry, self.ticking) {
            (true, false) => {
                self.ticking = true;
                effects.push(Effect::StartTicking);
            }
            (false, true) => {
                self.ticking = false;
                effects.push(Effect::StopTicking);
            }
            _ => {}
        }

        Completion::Applied { effects }
    }

    // A quiet subscription is indistinguishable from a dead one; treat the
    // elapsed window as a mutation signal.
    pub fn poll_heartbeat(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        if now - self.last_signal_at >= Duration::seconds(HEARTBEAT_QUIET_SECONDS) {
            self.on_signal(Signal::HeartbeatTimeout, now)
        } else {
            Vec::new()
        }
    }

    pub fn teardown(&mut self) -> Vec<Effect> {
        if self.ticking {
            self.ticking = false;
            vec![Effect::StopTicking]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc, Weekday};

    use crate::domain::{EntrySource, Sheet, normalize_tags};
    use crate::projection::{WeekView, assemble};

    use super::{Completion, Effect, HEARTBEAT_QUIET_SECONDS, LiveCoordinator, Phase, Signal};

    fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, minute, second).unwrap()
    }

    fn refetch_seq(effects: &[Effect]) -> u64 {
        effects
            .iter()
            .find_map(|effect| match effect {
                Effect::Refetch { seq } => Some(*seq),
                _ => None,
            })
            .expect("signal must issue a refetch")
    }

    fn view_of(sheet: &Sheet, now: DateTime<Utc>) -> WeekView {
        assemble(
            &sheet.list_entries("ada"),
            "ada",
            now,
            &Utc,
            Weekday::Mon,
        )
        .expect("assemble")
    }

    // "stop old, start new" delivered in either order must converge on the
    // store's final state: exactly the new entry active, the old one closed.
    fn converges_for(order: [Signal; 2]) {
        let mut sheet = Sheet::new("ada");
        sheet
            .start_entry("Old task".to_string(), normalize_tags(["work"]), at(9, 0, 0))
            .expect("start old");
        sheet.stop_entry(at(9, 30, 0)).expect("stop old");
        sheet
            .start_entry("New task".to_string(), normalize_tags(["work"]), at(9, 30, 0))
            .expect("start new");

        let now = at(9, 30, 5);
        let mut coordinator = LiveCoordinator::new(at(9, 0, 0));

        let first_seq = refetch_seq(&coordinator.on_signal(order[0], now));
        let second_seq = refetch_seq(&coordinator.on_signal(order[1], now));
        assert_eq!(coordinator.phase(), Phase::Reconciling);

        // Both refetches read the store as it is now; completions land in
        // issue order here, the stale test covers the reverse.
        let mut rendered = None;
        for seq in [first_seq, second_seq] {
            let view = view_of(&sheet, now);
            let has_open = view.current.is_some();
            if let Completion::Applied { .. } = coordinator.completed(seq, has_open) {
                rendered = Some(view);
            }
        }

        let rendered = rendered.expect("a view must render");
        let current = rendered.current.expect("new entry is active");
        assert_eq!(current.title, "New task");
        assert_eq!(current.started, at(9, 30, 0));
        assert_eq!(coordinator.phase(), Phase::Active);

        let old_group = rendered.days[0]
            .groups
            .iter()
            .find(|group| group.key.title == "Old task")
            .expect("old task still listed");
        assert!(!old_group.has_active_member);
    }

    #[test]
    fn stop_then_start_signals_converge() {
        converges_for([Signal::EntryStopped, Signal::EntryCreated]);
    }

    #[test]
    fn start_then_stop_signals_converge() {
        converges_for([Signal::EntryCreated, Signal::EntryStopped]);
    }

    #[test]
    fn stale_completion_is_discarded() {
        let mut coordinator = LiveCoordinator::new(at(9, 0, 0));
        let first = refetch_seq(&coordinator.on_signal(Signal::EntryCreated, at(9, 0, 1)));
        let second = refetch_seq(&coordinator.on_signal(Signal::EntryChanged, at(9, 0, 2)));
        assert!(first < second);

        assert!(matches!(
            coordinator.completed(second, true),
            Completion::Applied { .. }
        ));
        assert_eq!(coordinator.completed(first, false), Completion::Stale);
        // The stale snapshot must not flip the machine back.
        assert_eq!(coordinator.phase(), Phase::Active);
        assert!(coordinator.is_ticking());
    }

    #[test]
    fn tick_reassembles_only_while_active() {
        let mut coordinator = LiveCoordinator::new(at(9, 0, 0));
        assert!(!coordinator.tick_reassembles());

        let seq = refetch_seq(&coordinator.on_signal(Signal::EntryCreated, at(9, 0, 1)));
        assert!(!coordinator.tick_reassembles());

        coordinator.completed(seq, true);
        assert!(coordinator.tick_reassembles());

        let seq = refetch_seq(&coordinator.on_signal(Signal::EntryStopped, at(9, 5, 0)));
        assert!(!coordinator.tick_reassembles());
        coordinator.completed(seq, false);
        assert!(!coordinator.tick_reassembles());
    }

    #[test]
    fn going_idle_cancels_the_tick() {
        let mut coordinator = LiveCoordinator::new(at(9, 0, 0));
        let seq = refetch_seq(&coordinator.on_signal(Signal::EntryCreated, at(9, 0, 1)));
        let Completion::Applied { effects } = coordinator.completed(seq, true) else {
            panic!("completion must apply");
        };
        assert_eq!(effects, vec![Effect::StartTicking]);

        let seq = refetch_seq(&coordinator.on_signal(Signal::EntryStopped, at(9, 10, 0)));
        let Completion::Applied { effects } = coordinator.completed(seq, false) else {
            panic!("completion must apply");
        };
        assert_eq!(effects, vec![Effect::StopTicking]);
        assert!(!coordinator.is_ticking());
    }

    #[test]
    fn heartbeat_timeout_forces_reconciliation() {
        let started = at(9, 0, 0);
        let mut coordinator = LiveCoordinator::new(started);

        let quiet = Duration::seconds(HEARTBEAT_QUIET_SECONDS);
        assert!(coordinator.poll_heartbeat(started + quiet - Duration::seconds(1)).is_empty());

        let effects = coordinator.poll_heartbeat(started + quiet);
        assert_eq!(effects, vec![Effect::Refetch { seq: 1 }]);
        assert_eq!(coordinator.phase(), Phase::Reconciling);

        // The timeout itself counts as a signal; the window restarts.
        assert!(coordinator.poll_heartbeat(started + quiet + Duration::seconds(1)).is_empty());
    }

    #[test]
    fn connection_loss_resubscribes_and_refetches() {
        let mut coordinator = LiveCoordinator::new(at(9, 0, 0));
        let effects = coordinator.on_signal(Signal::ConnectionLost, at(9, 1, 0));
        assert_eq!(
            effects,
            vec![Effect::Resubscribe, Effect::Refetch { seq: 1 }]
        );
    }

    #[test]
    fn teardown_stops_a_running_tick() {
        let mut coordinator = LiveCoordinator::new(at(9, 0, 0));
        let seq = refetch_seq(&coordinator.on_signal(Signal::EntryCreated, at(9, 0, 1)));
        coordinator.completed(seq, true);
        assert!(coordinator.is_ticking());

        assert_eq!(coordinator.teardown(), vec![Effect::StopTicking]);
        assert!(coordinator.teardown().is_empty());
    }
}
