//! Combat session: lifecycle state machine and the action queue.

use std::fmt;

use emberfall_protocol::{CombatantId, CombatantSnapshot, EndReason, LocationId, SessionId};
use serde::{Deserialize, Serialize};

use crate::{AbilityCatalog, CombatAction, CombatError, Combatant, ability_for};

/// The lifecycle state of a session.
///
/// ```text
/// Waiting → Active → Ended
/// ```
///
/// - **Waiting**: created, but not yet holding a living player and a
///   living creature. Never timed.
/// - **Active**: rounds are processed whenever the round timer elapses.
/// - **Ended**: an end condition was met. Terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Waiting,
    Active,
    Ended,
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn is_ended(&self) -> bool {
        matches!(self, Self::Ended)
    }

    /// The only state reachable from this one.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Waiting => Some(Self::Active),
            Self::Active => Some(Self::Ended),
            Self::Ended => None,
        }
    }

    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "Waiting"),
            Self::Active => write!(f, "Active"),
            Self::Ended => write!(f, "Ended"),
        }
    }
}

/// One fight at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatSession {
    pub id: SessionId,
    pub location_id: LocationId,
    pub state: SessionState,
    /// Rounds processed so far.
    pub current_round: u32,
    /// Engine clock (ms) at which the current round opened.
    pub round_start_ms: u64,
    pub combatants: Vec<Combatant>,
    /// At most one per combatant, in submission order.
    pub pending_actions: Vec<CombatAction>,
    /// Set exactly when `state` is `Ended`.
    pub end_reason: Option<EndReason>,
    next_action_id: u64,
}

impl CombatSession {
    pub fn new(id: SessionId, location_id: LocationId) -> Self {
        Self {
            id,
            location_id,
            state: SessionState::Waiting,
            current_round: 0,
            round_start_ms: 0,
            combatants: Vec::new(),
            pending_actions: Vec::new(),
            end_reason: None,
            next_action_id: 1,
        }
    }

    pub fn combatant(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.id == id)
    }

    pub fn combatant_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.combatants.iter_mut().find(|c| c.id == id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.iter().filter(|c| c.is_player())
    }

    pub fn creatures(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.iter().filter(|c| c.is_creature())
    }

    /// Whether both sides have someone alive.
    pub fn is_ready(&self) -> bool {
        self.players().any(|c| c.is_alive) && self.creatures().any(|c| c.is_alive)
    }

    /// Adds a combatant. The session activates, with its first round
    /// opening at `now_ms`, the moment it holds a living player and a
    /// living creature. Returns `true` if this call activated it.
    ///
    /// # Errors
    /// - [`CombatError::SessionEnded`] after the fight is over
    /// - [`CombatError::AlreadyInSession`] for a duplicate id
    pub fn add_combatant(&mut self, combatant: Combatant, now_ms: u64) -> Result<bool, CombatError> {
        if self.state.is_ended() {
            return Err(CombatError::SessionEnded(self.id));
        }
        if self.combatant(combatant.id).is_some() {
            return Err(CombatError::AlreadyInSession(combatant.id, self.id));
        }

        tracing::info!(
            session_id = %self.id,
            combatant_id = %combatant.id,
            kind = %combatant.kind,
            combatants = self.combatants.len() + 1,
            "combatant joined"
        );
        self.combatants.push(combatant);

        if self.state == SessionState::Waiting && self.is_ready() {
            self.transition(SessionState::Active)?;
            self.round_start_ms = now_ms;
            tracing::info!(session_id = %self.id, location_id = %self.location_id, "combat started");
            return Ok(true);
        }
        Ok(false)
    }

    /// Adds a batch of combatants, all or none. Returns `true` if the
    /// batch activated the session.
    ///
    /// # Errors
    /// As [`add_combatant`](Self::add_combatant), checked for the whole
    /// batch (duplicates within it included) before anyone is added.
    pub fn add_combatants(&mut self, combatants: Vec<Combatant>, now_ms: u64) -> Result<bool, CombatError> {
        if self.state.is_ended() {
            return Err(CombatError::SessionEnded(self.id));
        }
        for (i, c) in combatants.iter().enumerate() {
            if self.combatant(c.id).is_some() || combatants[..i].iter().any(|o| o.id == c.id) {
                return Err(CombatError::AlreadyInSession(c.id, self.id));
            }
        }
        let mut activated = false;
        for c in combatants {
            activated |= self.add_combatant(c, now_ms)?;
        }
        Ok(activated)
    }

    /// Validates `action` and queues it for the next round, replacing any
    /// action the same combatant already queued. Returns the assigned
    /// action id.
    ///
    /// Actions may be queued while the session is still waiting.
    ///
    /// # Errors
    /// See [`CombatError`]: ended session, unknown, dead or downed actor,
    /// unknown or unlearned ability, cooldown, insufficient mana or
    /// stamina, unknown target.
    pub fn queue_action(&mut self, mut action: CombatAction, catalog: &dyn AbilityCatalog) -> Result<u64, CombatError> {
        if self.state.is_ended() {
            return Err(CombatError::SessionEnded(self.id));
        }
        let actor = self
            .combatant(action.combatant_id)
            .ok_or(CombatError::CombatantNotFound(action.combatant_id, self.id))?;
        if !actor.is_alive || actor.is_downed {
            return Err(CombatError::Incapacitated(actor.id));
        }
        if !actor.knows(&action.ability_id) {
            return Err(CombatError::AbilityNotKnown {
                combatant: actor.id,
                ability: action.ability_id,
            });
        }
        let ability = ability_for(catalog, actor, &action.ability_id)
            .ok_or_else(|| CombatError::UnknownAbility(action.ability_id.clone()))?;
        if let Some(rounds) = actor.cooldown(&ability.id) {
            return Err(CombatError::OnCooldown {
                ability: ability.id,
                rounds,
            });
        }
        if actor.mana < ability.mana_cost {
            return Err(CombatError::InsufficientMana {
                needed: ability.mana_cost,
                available: actor.mana,
            });
        }
        if actor.stamina < ability.stamina_cost {
            return Err(CombatError::InsufficientStamina {
                needed: ability.stamina_cost,
                available: actor.stamina,
            });
        }
        if let Some(target) = action.target_id {
            if self.combatant(target).is_none() {
                return Err(CombatError::TargetNotFound(target));
            }
        }

        action.action_id = self.next_action_id();
        let slot = self
            .pending_actions
            .iter()
            .position(|queued| queued.combatant_id == action.combatant_id);
        tracing::debug!(
            session_id = %self.id,
            combatant_id = %action.combatant_id,
            ability = %action.ability_id,
            action_id = action.action_id,
            replaced = slot.is_some(),
            "action queued"
        );
        let id = action.action_id;
        // A resubmission keeps the combatant's original place in the queue.
        match slot {
            Some(i) => self.pending_actions[i] = action,
            None => self.pending_actions.push(action),
        }
        Ok(id)
    }

    pub fn pending_action(&self, combatant: CombatantId) -> Option<&CombatAction> {
        self.pending_actions
            .iter()
            .find(|a| a.combatant_id == combatant)
    }

    pub fn next_action_id(&mut self) -> u64 {
        let id = self.next_action_id;
        self.next_action_id += 1;
        id
    }

    /// Moves to `Ended` with `reason`.
    ///
    /// # Errors
    /// [`CombatError::InvalidTransition`] unless the session is active.
    pub fn end(&mut self, reason: EndReason) -> Result<(), CombatError> {
        self.transition(SessionState::Ended)?;
        self.end_reason = Some(reason);
        self.pending_actions.clear();
        tracing::info!(
            session_id = %self.id,
            %reason,
            rounds = self.current_round,
            "combat ended"
        );
        Ok(())
    }

    fn transition(&mut self, target: SessionState) -> Result<(), CombatError> {
        if !self.state.can_transition_to(target) {
            return Err(CombatError::InvalidTransition {
                from: self.state,
                to: target,
            });
        }
        self.state = target;
        Ok(())
    }

    /// Whether the current round's timer has run out.
    pub fn round_elapsed(&self, now_ms: u64, round_duration_ms: u64) -> bool {
        self.state.is_active() && now_ms.saturating_sub(self.round_start_ms) >= round_duration_ms
    }

    pub fn snapshots(&self) -> Vec<CombatantSnapshot> {
        self.combatants.iter().map(Combatant::snapshot).collect()
    }
}
