use serde::{Deserialize, Serialize};

/// Phase of a single-table round.
///
/// Phases advance strictly in a cycle: Betting → Spinning → Settlement → Betting.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    #[default]
    Betting = 0,
    Spinning = 1,
    Settlement = 2,
}

impl RoundPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundPhase::Betting => "betting",
            RoundPhase::Spinning => "spinning",
            RoundPhase::Settlement => "settlement",
        }
    }
}

impl TryFrom<u8> for RoundPhase {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RoundPhase::Betting),
            1 => Ok(RoundPhase::Spinning),
            2 => Ok(RoundPhase::Settlement),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
