//! Integration tests for full table rounds.
//!
//! These tests drive a table from bet placement through the roll and settlement
//! back to an open betting phase.

#[cfg(test)]
mod tests {
    use crate::events::TableEvent;
    use crate::mocks::{Memory, ScriptedOutcome};
    use crate::round_scheduler::PhaseConfig;
    use crate::table::{Table, TableConfig};
    use crate::wheel::{SlotLocator, StaticWheel, WheelGeometry};
    use glam::Vec3;
    use roulette_types::casino::{BetLayout, RoundPhase, SlotId};
    use std::time::Duration;

    const TICK: Duration = Duration::from_millis(50);

    type TestTable = Table<ScriptedOutcome, StaticWheel, Memory>;

    fn wheel() -> StaticWheel {
        StaticWheel::new(Vec3::ZERO, 1.6, 0.05)
    }

    fn create_table(config: TableConfig, numbers: &[u8], store: Memory) -> TestTable {
        Table::new(
            config,
            WheelGeometry::circular(Vec3::ZERO, 2.0, 8, 0.1),
            ScriptedOutcome::new(numbers.iter().copied()),
            wheel(),
            store,
        )
        .expect("table should build")
    }

    fn seeded_config() -> TableConfig {
        TableConfig {
            deterministic_seed: Some(42),
            ..TableConfig::default()
        }
    }

    /// Tick until the table reaches `phase`, failing the test if it never does.
    fn run_until(table: &mut TestTable, phase: RoundPhase) {
        for _ in 0..10_000 {
            if table.phase() == phase {
                return;
            }
            table.tick(TICK).expect("tick should succeed");
        }
        panic!("table never reached {phase}");
    }

    fn settled_events(events: &[TableEvent]) -> usize {
        events
            .iter()
            .filter(|event| matches!(event, TableEvent::Settled(_)))
            .count()
    }

    #[test]
    fn test_straight_win_pays_35_to_1() {
        let store = Memory::new();
        let mut table = create_table(seeded_config(), &[17], store.clone());
        table
            .place_bet(SlotId::from("s17"), BetLayout::Straight { number: 17 }, 100)
            .unwrap();
        assert_eq!(table.confirm(), Ok(17));
        run_until(&mut table, RoundPhase::Settlement);

        assert_eq!(table.account().balance, 4_500);
        assert_eq!(table.account().in_flight_stake, 0);
        assert_eq!(table.account().last_settlement, 3_500);
        assert_eq!(table.stats().total_spins, 1);
        assert_eq!(table.stats().total_wins, 1);
        assert_eq!(table.stats().total_profit, 3_500);

        // Resolved wagers are not written once the round is settled
        let saved = store.snapshot().unwrap();
        assert_eq!(saved.account.balance, 4_500);
        assert!(saved.wagers.is_empty());
    }

    #[test]
    fn test_outside_loss_keeps_balance() {
        let mut table = create_table(seeded_config(), &[17], Memory::new());
        table
            .place_bet(SlotId::from("red"), BetLayout::RedBlack { red: true }, 100)
            .unwrap();
        table.confirm().unwrap();
        run_until(&mut table, RoundPhase::Settlement);

        assert_eq!(table.account().balance, 900);
        assert_eq!(table.account().in_flight_stake, 0);
        assert_eq!(table.account().last_settlement, -100);
        assert_eq!(table.stats().total_wins, 0);
        assert_eq!(table.stats().total_profit, -100);
    }

    #[test]
    fn test_mixed_wagers_settle_together() {
        let mut table = create_table(seeded_config(), &[17], Memory::new());
        table
            .place_bet(SlotId::from("s17"), BetLayout::Straight { number: 17 }, 10)
            .unwrap();
        table
            .place_bet(SlotId::from("red"), BetLayout::RedBlack { red: true }, 100)
            .unwrap();
        table
            .place_bet(SlotId::from("odd"), BetLayout::EvenOdd { even: false }, 100)
            .unwrap();
        assert_eq!(table.account().balance, 790);
        table.confirm().unwrap();
        table.drain_events();
        run_until(&mut table, RoundPhase::Settlement);

        // 350 + 100 won, 100 lost, 110 of winning stake returned
        assert_eq!(table.account().balance, 1_350);
        assert_eq!(table.account().last_settlement, 350);

        let events = table.drain_events();
        let summary = events
            .iter()
            .find_map(|event| match event {
                TableEvent::Settled(summary) => Some(summary.clone()),
                _ => None,
            })
            .expect("settled event");
        assert_eq!(summary.number, 17);
        assert_eq!(summary.total_winnings, 450);
        assert_eq!(summary.total_lost, 100);
        assert_eq!(summary.returned_stake, 110);
        assert_eq!(summary.net, 350);
        let resolved = events
            .iter()
            .filter(|event| matches!(event, TableEvent::WagerResolved { .. }))
            .count();
        assert_eq!(resolved, 3);
    }

    #[test]
    fn test_zero_loses_every_outside_bet() {
        let mut table = create_table(seeded_config(), &[0], Memory::new());
        for (slot, layout) in [
            ("red", BetLayout::RedBlack { red: true }),
            ("black", BetLayout::RedBlack { red: false }),
            ("even", BetLayout::EvenOdd { even: true }),
            ("low", BetLayout::HighLow { high: false }),
            ("c1", BetLayout::Column { index: 0 }),
            ("d1", BetLayout::Dozen { index: 0 }),
        ] {
            table.place_bet(SlotId::from(slot), layout, 10).unwrap();
        }
        table.confirm().unwrap();
        run_until(&mut table, RoundPhase::Settlement);
        assert_eq!(table.account().balance, 940);
        assert_eq!(table.account().last_settlement, -60);
    }

    #[test]
    fn test_ball_lands_exactly_on_pocket() {
        let mut table = create_table(seeded_config(), &[26], Memory::new());
        table.confirm().unwrap();
        table.drain_events();
        run_until(&mut table, RoundPhase::Settlement);

        let pocket = wheel().slot_position(26, 0.0).unwrap();
        assert_eq!(table.ball_position(), pocket);

        let events = table.drain_events();
        let finished: Vec<u8> = events
            .iter()
            .filter_map(|event| match event {
                TableEvent::RollingFinished { number } => Some(*number),
                _ => None,
            })
            .collect();
        assert_eq!(finished, vec![26]);
        let last_sample = events
            .iter()
            .filter_map(|event| match event {
                TableEvent::BallMoved(sample) => Some(*sample),
                _ => None,
            })
            .last()
            .expect("ball samples");
        assert_eq!(last_sample.position, pocket);
    }

    #[test]
    fn test_settlement_events_precede_phase_change() {
        let mut table = create_table(seeded_config(), &[5], Memory::new());
        table
            .place_bet(SlotId::from("s5"), BetLayout::Straight { number: 5 }, 1)
            .unwrap();
        table.confirm().unwrap();
        table.drain_events();
        run_until(&mut table, RoundPhase::Settlement);

        let events = table.drain_events();
        let settled = events
            .iter()
            .position(|event| matches!(event, TableEvent::Settled(_)))
            .unwrap();
        let phase = events
            .iter()
            .position(|event| {
                matches!(
                    event,
                    TableEvent::PhaseChanged {
                        phase: RoundPhase::Settlement,
                        ..
                    }
                )
            })
            .unwrap();
        let resolved = events
            .iter()
            .position(|event| matches!(event, TableEvent::WagerResolved { .. }))
            .unwrap();
        assert!(resolved < settled);
        assert!(settled < phase);
    }

    #[test]
    fn test_round_cycles_back_to_betting() {
        let store = Memory::new();
        let mut table = create_table(seeded_config(), &[3, 8], store.clone());
        table
            .place_bet(SlotId::from("s3"), BetLayout::Straight { number: 3 }, 10)
            .unwrap();
        table.confirm().unwrap();
        run_until(&mut table, RoundPhase::Settlement);
        assert!(!table.is_betting_enabled());
        assert!(table.add_free_credit().is_err());

        run_until(&mut table, RoundPhase::Betting);
        assert_eq!(table.round_id(), 1);
        assert_eq!(table.winning_number(), None);
        assert_eq!(table.wagers().count(), 0);
        assert!(table.is_betting_enabled());

        // Second round uses the next scripted number
        table
            .place_bet(SlotId::from("street"), BetLayout::Street { start: 7 }, 10)
            .unwrap();
        assert_eq!(table.confirm(), Ok(8));
        run_until(&mut table, RoundPhase::Settlement);
        assert_eq!(table.stats().total_spins, 2);
        assert_eq!(table.stats().total_wins, 2);
        // 990 + 360 after round one, then 1_340 + 110 + 10
        assert_eq!(table.account().balance, 1_460);
        assert_eq!(store.snapshot().unwrap().stats.total_spins, 2);
    }

    #[test]
    fn test_settlement_hold_respects_config() {
        let config = TableConfig {
            phases: PhaseConfig::new(500, 60_000),
            ..seeded_config()
        };
        let mut table = create_table(config, &[1], Memory::new());
        table.confirm().unwrap();
        run_until(&mut table, RoundPhase::Settlement);
        for _ in 0..9 {
            table.tick(TICK).unwrap();
        }
        assert_eq!(table.phase(), RoundPhase::Settlement);
        table.tick(TICK).unwrap();
        assert_eq!(table.phase(), RoundPhase::Betting);
    }

    #[test]
    fn test_spin_timeout_settles_on_fixed_number() {
        let config = TableConfig {
            phases: PhaseConfig::new(3_000, 500),
            ..seeded_config()
        };
        let mut table = create_table(config, &[17], Memory::new());
        table
            .place_bet(SlotId::from("s17"), BetLayout::Straight { number: 17 }, 100)
            .unwrap();
        table.confirm().unwrap();
        table.drain_events();
        for _ in 0..5 {
            table.tick(Duration::from_millis(100)).unwrap();
        }
        assert_eq!(table.phase(), RoundPhase::Settlement);
        assert_eq!(table.account().balance, 4_500);

        let events = table.drain_events();
        assert!(events
            .iter()
            .any(|event| matches!(event, TableEvent::SpinTimedOut { elapsed_ms: 500 })));
        assert!(!events
            .iter()
            .any(|event| matches!(event, TableEvent::RollingFinished { .. })));
        assert_eq!(settled_events(&events), 1);

        // The abandoned roll does not resume
        for _ in 0..100 {
            table.tick(TICK).unwrap();
        }
        let later = table.drain_events();
        assert!(!later
            .iter()
            .any(|event| matches!(event, TableEvent::BallMoved(_))));
    }

    #[test]
    fn test_reset_then_confirm_spins_without_wagers() {
        let mut table = create_table(seeded_config(), &[12], Memory::new());
        table
            .place_bet(SlotId::from("d1"), BetLayout::Dozen { index: 0 }, 250)
            .unwrap();
        assert_eq!(table.reset_bets(), Ok(250));
        table.confirm().unwrap();
        run_until(&mut table, RoundPhase::Settlement);
        assert_eq!(table.account().balance, 1_000);
        assert_eq!(table.account().last_settlement, 0);
        assert_eq!(table.stats().total_spins, 1);
        assert_eq!(table.stats().total_wins, 0);
    }

    #[test]
    fn test_free_credit_funds_next_bet() {
        let config = TableConfig {
            starting_balance: 0,
            ..seeded_config()
        };
        let mut table = create_table(config, &[], Memory::new());
        assert!(table
            .place_bet(SlotId::from("red"), BetLayout::RedBlack { red: true }, 10)
            .is_err());
        assert_eq!(table.add_free_credit(), Ok(1_000));
        assert_eq!(
            table.place_bet(SlotId::from("red"), BetLayout::RedBlack { red: true }, 10),
            Ok(10)
        );
    }

    #[test]
    fn test_restart_mid_betting_then_spin() {
        let store = Memory::new();
        {
            let mut table = create_table(seeded_config(), &[], store.clone());
            table
                .place_bet(SlotId::from("split"), BetLayout::Split { first: 17, second: 20 }, 50)
                .unwrap();
            table
                .place_bet(SlotId::from("split"), BetLayout::Split { first: 17, second: 20 }, 50)
                .unwrap();
        }

        let mut table = create_table(seeded_config(), &[20], store);
        assert_eq!(table.account().balance, 900);
        assert_eq!(table.account().in_flight_stake, 100);
        assert_eq!(table.wagers().next().unwrap().chips.len(), 2);
        table.confirm().unwrap();
        run_until(&mut table, RoundPhase::Settlement);
        // 17 to 1 on 100, plus the stake back
        assert_eq!(table.account().balance, 900 + 1_700 + 100);
    }
}
