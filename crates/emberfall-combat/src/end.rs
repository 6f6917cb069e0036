//! End conditions and the victor/defeated split.

use emberfall_protocol::{CombatantId, EndReason};

use crate::CombatSession;

/// Checks the end conditions in precedence order:
///
/// 1. no player ever joined → `AllPlayersDefeated`
/// 2. no player is alive → `AllPlayersDefeated`
/// 3. creatures joined and all are dead → `AllEnemiesDefeated`
/// 4. no creature ever joined → `Timeout`
/// 5. `current_round >= max_rounds` → `Timeout`
///
/// Downed players are alive, so they keep a fight going.
pub fn evaluate_end(session: &CombatSession, max_rounds: u32) -> Option<EndReason> {
    let mut players = session.players().peekable();
    if players.peek().is_none() {
        return Some(EndReason::AllPlayersDefeated);
    }
    if !players.any(|p| p.is_alive) {
        return Some(EndReason::AllPlayersDefeated);
    }
    let mut creatures = session.creatures().peekable();
    if creatures.peek().is_none() {
        return Some(EndReason::Timeout);
    }
    if !creatures.any(|c| c.is_alive) {
        return Some(EndReason::AllEnemiesDefeated);
    }
    if session.current_round >= max_rounds {
        return Some(EndReason::Timeout);
    }
    None
}

/// `(victors, defeated)` for an ended session.
///
/// Players win `AllEnemiesDefeated` and every creature is defeated. Living
/// creatures win `AllPlayersDefeated` and every player is defeated. A
/// timeout has no victors and no defeated.
pub fn standings(session: &CombatSession) -> (Vec<CombatantId>, Vec<CombatantId>) {
    match session.end_reason {
        Some(EndReason::AllEnemiesDefeated) => (
            session.players().filter(|p| p.is_alive).map(|p| p.id).collect(),
            session.creatures().map(|c| c.id).collect(),
        ),
        Some(EndReason::AllPlayersDefeated) => (
            session.creatures().filter(|c| c.is_alive).map(|c| c.id).collect(),
            session.players().map(|p| p.id).collect(),
        ),
        Some(EndReason::Timeout) | None => (Vec::new(), Vec::new()),
    }
}
