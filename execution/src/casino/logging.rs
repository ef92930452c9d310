use super::roulette::WagerOutcome;
use serde_json::{json, Value};
use std::fmt::Write;

pub fn clamp_i64(value: i128) -> i64 {
    value.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

pub fn format_number_list(numbers: &[u8]) -> String {
    let mut out = String::with_capacity(numbers.len().saturating_mul(3));
    for (idx, number) in numbers.iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        let _ = write!(out, "{}", number);
    }
    out
}

/// JSON array of per-slot results, for the settlement log line.
pub fn format_resolved(outcomes: &[WagerOutcome]) -> String {
    let entries: Vec<Value> = outcomes
        .iter()
        .map(|outcome| json!({ "label": outcome.slot.as_str(), "pnl": outcome.pnl() }))
        .collect();
    Value::Array(entries).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use roulette_types::casino::{BetKind, SlotId};

    #[test]
    fn test_clamp_i64() {
        assert_eq!(clamp_i64(i128::MAX), i64::MAX);
        assert_eq!(clamp_i64(i128::MIN), i64::MIN);
        assert_eq!(clamp_i64(-5), -5);
    }

    #[test]
    fn test_format_number_list() {
        assert_eq!(format_number_list(&[]), "");
        assert_eq!(format_number_list(&[5, 6, 8, 9]), "5,6,8,9");
    }

    #[test]
    fn test_format_resolved() {
        let outcomes = vec![
            WagerOutcome {
                slot: SlotId::from("s17"),
                kind: BetKind::Straight,
                stake: 100,
                won: true,
                payout: 3_500,
            },
            WagerOutcome {
                slot: SlotId::from("red"),
                kind: BetKind::RedBlack,
                stake: 20,
                won: false,
                payout: 0,
            },
        ];
        assert_eq!(
            format_resolved(&outcomes),
            r#"[{"label":"s17","pnl":3500},{"label":"red","pnl":-20}]"#
        );
    }

    #[test]
    fn test_format_resolved_escapes_labels() {
        let outcomes = vec![WagerOutcome {
            slot: SlotId::from(r#"a"b"#),
            kind: BetKind::Straight,
            stake: 1,
            won: false,
            payout: 0,
        }];
        let line = format_resolved(&outcomes);
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed[0]["label"], r#"a"b"#);
        assert_eq!(parsed[0]["pnl"], -1);
    }
}
