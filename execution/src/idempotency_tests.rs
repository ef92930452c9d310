//! Idempotency tests for round settlement and persistence.
//!
//! These tests verify that repeated or re-entrant requests never apply money twice, and that a
//! failing store never loses in-memory state.

#[cfg(test)]
mod tests {
    use crate::events::TableEvent;
    use crate::mocks::{Memory, ScriptedOutcome};
    use crate::outcome::OutcomeProvider;
    use crate::table::{Table, TableConfig, TableError};
    use crate::trajectory::{RollStart, TrajectoryConfig, TrajectorySimulator};
    use crate::wheel::{SlotLocator, StaticWheel, WheelGeometry};
    use glam::Vec3;
    use roulette_types::casino::{BetLayout, RoundPhase, SlotId};
    use std::time::Duration;

    const TICK: Duration = Duration::from_millis(50);

    type TestTable = Table<ScriptedOutcome, StaticWheel, Memory>;

    fn create_table(numbers: &[u8], store: Memory) -> TestTable {
        Table::new(
            TableConfig {
                deterministic_seed: Some(9),
                ..TableConfig::default()
            },
            WheelGeometry::circular(Vec3::ZERO, 2.0, 6, 0.1),
            ScriptedOutcome::new(numbers.iter().copied()),
            StaticWheel::new(Vec3::ZERO, 1.6, 0.05),
            store,
        )
        .expect("table should build")
    }

    fn run_until(table: &mut TestTable, phase: RoundPhase) {
        for _ in 0..10_000 {
            if table.phase() == phase {
                return;
            }
            table.tick(TICK).expect("tick should succeed");
        }
        panic!("table never reached {phase}");
    }

    fn count(events: &[TableEvent], predicate: impl Fn(&TableEvent) -> bool) -> usize {
        events.iter().filter(|event| predicate(event)).count()
    }

    #[test]
    fn test_second_confirm_is_rejected() {
        let mut table = create_table(&[4, 6], Memory::new());
        table
            .place_bet(SlotId::from("s4"), BetLayout::Straight { number: 4 }, 10)
            .unwrap();
        assert_eq!(table.confirm(), Ok(4));
        assert_eq!(
            table.confirm(),
            Err(TableError::BettingClosed {
                phase: RoundPhase::Spinning
            })
        );
        assert_eq!(table.winning_number(), Some(4));
        assert_eq!(table.stats().total_spins, 1);
    }

    #[test]
    fn test_settlement_applies_once() {
        let mut table = create_table(&[4], Memory::new());
        table
            .place_bet(SlotId::from("s4"), BetLayout::Straight { number: 4 }, 10)
            .unwrap();
        table.confirm().unwrap();
        run_until(&mut table, RoundPhase::Settlement);
        let balance = table.account().balance;
        assert_eq!(balance, 990 + 350 + 10);

        // Keep ticking inside the hold
        for _ in 0..20 {
            table.tick(TICK).unwrap();
        }
        assert_eq!(table.phase(), RoundPhase::Settlement);
        assert_eq!(table.account().balance, balance);
        assert_eq!(table.stats().total_spins, 1);
        assert_eq!(table.stats().total_wins, 1);

        let events = table.drain_events();
        assert_eq!(count(&events, |e| matches!(e, TableEvent::Settled(_))), 1);
    }

    #[test]
    fn test_settled_round_is_not_resettled_after_restart() {
        let store = Memory::new();
        {
            let mut table = create_table(&[4], store.clone());
            table
                .place_bet(SlotId::from("s4"), BetLayout::Straight { number: 4 }, 10)
                .unwrap();
            table.confirm().unwrap();
            run_until(&mut table, RoundPhase::Settlement);
        }
        let table = create_table(&[], store);
        assert_eq!(table.account().balance, 1_350);
        assert_eq!(table.account().in_flight_stake, 0);
        assert_eq!(table.wagers().count(), 0);
        assert_eq!(table.phase(), RoundPhase::Betting);
    }

    #[test]
    fn test_restart_mid_spin_reopens_wagers() {
        let store = Memory::new();
        {
            let mut table = create_table(&[4], store.clone());
            table
                .place_bet(SlotId::from("red"), BetLayout::RedBlack { red: true }, 40)
                .unwrap();
            table.confirm().unwrap();
            table.tick(TICK).unwrap();
            assert_eq!(table.phase(), RoundPhase::Spinning);
        }
        let mut table = create_table(&[], store);
        assert_eq!(table.phase(), RoundPhase::Betting);
        assert_eq!(table.account().in_flight_stake, 40);
        assert_eq!(table.stats().total_spins, 1);
        assert_eq!(table.reset_bets(), Ok(40));
        assert_eq!(table.account().balance, 1_000);
    }

    #[test]
    fn test_override_is_one_shot() {
        let mut table = create_table(&[11, 12], Memory::new());
        table.set_override(30).unwrap();
        assert_eq!(table.confirm(), Ok(30));
        run_until(&mut table, RoundPhase::Settlement);
        run_until(&mut table, RoundPhase::Betting);
        assert_eq!(table.confirm(), Ok(11));
    }

    #[test]
    fn test_last_override_wins() {
        let mut outcome = ScriptedOutcome::default();
        outcome.set_override(3).unwrap();
        outcome.set_override(9).unwrap();
        assert_eq!(outcome.draw_number().unwrap().number, 9);
        assert!(outcome.draw_number().is_err());
    }

    #[test]
    fn test_simulator_rejects_reentrant_roll() {
        let wheel = StaticWheel::new(Vec3::ZERO, 1.6, 0.05);
        let mut sim = TrajectorySimulator::from_seed(
            TrajectoryConfig::default(),
            WheelGeometry::circular(Vec3::ZERO, 2.0, 6, 0.1),
            Some(1),
        );
        let first = wheel.slot_position(5, 0.0).unwrap();
        let second = wheel.slot_position(6, 0.0).unwrap();
        assert_eq!(sim.start_rolling(5, first), RollStart::Started);
        sim.step(0.1, first).unwrap();
        let position = sim.position();
        assert_eq!(sim.start_rolling(6, second), RollStart::AlreadyRolling);
        assert_eq!(sim.position(), position);

        let mut finished = None;
        for _ in 0..10_000 {
            match sim.step(0.05, first) {
                Some(step) => {
                    if step.finished.is_some() {
                        finished = step.finished;
                    }
                }
                None => break,
            }
        }
        assert_eq!(finished, Some(5));
        assert_eq!(sim.position(), first);
    }

    #[test]
    fn test_failed_write_keeps_state_and_retries() {
        let store = Memory::new();
        let mut table = create_table(&[], store.clone());
        table
            .place_bet(SlotId::from("s1"), BetLayout::Straight { number: 1 }, 100)
            .unwrap();
        assert_eq!(store.saves(), 1);

        store.set_fail_writes(true);
        table
            .place_bet(SlotId::from("s2"), BetLayout::Straight { number: 2 }, 100)
            .unwrap();
        table
            .place_bet(SlotId::from("s3"), BetLayout::Straight { number: 3 }, 100)
            .unwrap();
        assert!(table.is_dirty());
        assert_eq!(table.account().balance, 700);
        assert_eq!(store.snapshot().unwrap().account.balance, 900);

        let events = table.drain_events();
        assert_eq!(
            count(&events, |e| matches!(e, TableEvent::PersistenceFailed { .. })),
            1
        );

        // Retries wait for the backoff interval
        store.set_fail_writes(false);
        table.tick(Duration::from_millis(500)).unwrap();
        assert!(table.is_dirty());
        table.tick(Duration::from_millis(500)).unwrap();
        assert!(!table.is_dirty());

        let saved = store.snapshot().unwrap();
        assert_eq!(saved.account.balance, 700);
        assert_eq!(saved.account.in_flight_stake, 300);
        assert_eq!(saved.wagers.len(), 3);
        let events = table.drain_events();
        assert_eq!(
            count(&events, |e| matches!(e, TableEvent::PersistenceRecovered)),
            1
        );
    }

    #[test]
    fn test_settlement_survives_failing_store() {
        let store = Memory::new();
        let mut table = create_table(&[7], store.clone());
        table
            .place_bet(SlotId::from("s7"), BetLayout::Straight { number: 7 }, 100)
            .unwrap();
        store.set_fail_writes(true);
        table.confirm().unwrap();
        run_until(&mut table, RoundPhase::Settlement);
        assert_eq!(table.account().balance, 4_500);
        assert!(!table.suspend());
        assert_eq!(store.snapshot().unwrap().account.balance, 900);

        store.set_fail_writes(false);
        assert!(table.suspend());
        let saved = store.snapshot().unwrap();
        assert_eq!(saved.account.balance, 4_500);
        assert!(saved.wagers.is_empty());
    }

    #[test]
    fn test_rejected_requests_do_not_persist() {
        let store = Memory::new();
        let mut table = create_table(&[2], store.clone());
        assert!(table
            .place_bet(SlotId::from("s1"), BetLayout::Straight { number: 40 }, 10)
            .is_err());
        assert!(table.set_override(99).is_err());
        assert_eq!(store.saves(), 0);
        table.confirm().unwrap();
        let saves = store.saves();
        assert!(table.reset_bets().is_err());
        assert!(table.add_free_credit().is_err());
        assert_eq!(store.saves(), saves);
    }
}
