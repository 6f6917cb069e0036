//! Timed status effects and their per-round tick.
//!
//! This module only knows about hit points as plain integers, so it can be
//! tested without building a combatant. [`Combatant`](crate::Combatant)
//! wraps the tick and turns the hp change into downed/death transitions.

use std::fmt;

use emberfall_protocol::CombatantId;
use serde::{Deserialize, Serialize};

/// The stateful effect kinds. Instant effects (`damage`, `heal`) never
/// become a [`StatusEffect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// Damage over time.
    Dot,
    /// Healing over time.
    Hot,
    /// Adds `value` to outgoing damage.
    Buff,
    /// Subtracts `value` from outgoing damage.
    Debuff,
    /// The combatant skips its action.
    Stun,
    Root,
    /// Initiative counts as half when ordering a round.
    Slow,
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Dot => "dot",
            Self::Hot => "hot",
            Self::Buff => "buff",
            Self::Debuff => "debuff",
            Self::Stun => "stun",
            Self::Root => "root",
            Self::Slow => "slow",
        };
        f.write_str(s)
    }
}

/// One active effect on a combatant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    /// The ability that applied it.
    pub name: String,
    pub kind: StatusKind,
    pub value: i32,
    /// Always > 0 while the effect is in the list.
    pub remaining_rounds: u32,
    pub source_id: CombatantId,
}

impl StatusEffect {
    fn same_slot(&self, other: &StatusEffect) -> bool {
        self.name == other.name && self.kind == other.kind
    }
}

/// What one tick did to the hp it was given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub damage: i32,
    pub healing: i32,
    /// Names of the effects that ran out this tick.
    pub expired: Vec<String>,
}

/// The ordered set of effects on one combatant.
///
/// At most one entry exists per `(name, kind)` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusEffects(Vec<StatusEffect>);

impl StatusEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `effect`, replacing an existing one with the same name and
    /// kind in place. Re-applying therefore resets the duration and never
    /// duplicates. Effects with no rounds left are ignored.
    pub fn apply(&mut self, effect: StatusEffect) {
        if effect.remaining_rounds == 0 {
            return;
        }
        match self.0.iter_mut().find(|e| e.same_slot(&effect)) {
            Some(existing) => *existing = effect,
            None => self.0.push(effect),
        }
    }

    pub fn has(&self, kind: StatusKind) -> bool {
        self.0.iter().any(|e| e.kind == kind)
    }

    /// Sum of `value` across every effect of `kind`.
    pub fn total(&self, kind: StatusKind) -> i32 {
        self.0
            .iter()
            .filter(|e| e.kind == kind)
            .fold(0i32, |acc, e| acc.saturating_add(e.value))
    }

    pub fn get(&self, name: &str, kind: StatusKind) -> Option<&StatusEffect> {
        self.0.iter().find(|e| e.name == name && e.kind == kind)
    }

    /// Applies every dot and hot to `hp`, then counts all effects down by
    /// one round and drops the ones that reach zero.
    ///
    /// A dot never pushes hp below 0 and never touches hp that is already
    /// at or below 0. A hot never lifts hp above `max_hp`.
    pub fn tick(&mut self, hp: &mut i32, max_hp: i32) -> TickReport {
        let mut report = TickReport::default();

        for effect in &self.0 {
            let value = effect.value.max(0);
            match effect.kind {
                StatusKind::Dot if *hp > 0 => {
                    let after = hp.saturating_sub(value).max(0);
                    report.damage += *hp - after;
                    *hp = after;
                }
                StatusKind::Hot => {
                    let after = hp.saturating_add(value).min(max_hp);
                    if after > *hp {
                        report.healing += after - *hp;
                        *hp = after;
                    }
                }
                _ => {}
            }
        }

        for effect in &mut self.0 {
            effect.remaining_rounds = effect.remaining_rounds.saturating_sub(1);
        }
        self.0.retain(|e| {
            if e.remaining_rounds == 0 {
                report.expired.push(e.name.clone());
                false
            } else {
                true
            }
        });

        report
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusEffect> {
        self.0.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|e| e.name.clone()).collect()
    }
}
