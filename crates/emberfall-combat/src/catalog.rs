//! The read-only ability catalog.

use std::collections::HashMap;

use emberfall_protocol::AbilityId;
use emberfall_rng::DiceFormula;

use crate::{Ability, CatalogError, Combatant};

/// Looks abilities up by id. The engine never mutates a catalog.
pub trait AbilityCatalog: Send + Sync {
    fn find_by_id(&self, id: &AbilityId) -> Option<Ability>;
}

/// Resolves `id` for `actor`: the built-in basic attack is synthesized
/// from the actor's stats, everything else comes from `catalog`.
pub fn ability_for(catalog: &dyn AbilityCatalog, actor: &Combatant, id: &AbilityId) -> Option<Ability> {
    if id.as_str() == crate::BASIC_ATTACK_ID {
        return Some(Ability::basic_attack(actor.base_damage));
    }
    catalog.find_by_id(id)
}

/// A catalog held in memory, validated as it is built.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    abilities: HashMap<AbilityId, Ability>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON array of abilities.
    ///
    /// ```
    /// use emberfall_combat::{AbilityCatalog, InMemoryCatalog};
    ///
    /// let catalog = InMemoryCatalog::from_json(
    ///     r#"[{ "id": "fireball", "base_damage": 12, "damage_dice": "2d6+1", "effects": ["damage"] }]"#,
    /// )
    /// .unwrap();
    /// assert!(catalog.find_by_id(&"fireball".into()).is_some());
    /// ```
    ///
    /// # Errors
    /// [`CatalogError::Parse`] for bad JSON or unknown effect tokens, and
    /// anything [`insert`](Self::insert) rejects.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let abilities: Vec<Ability> = serde_json::from_str(json)?;
        Self::from_abilities(abilities)
    }

    pub fn from_abilities(abilities: impl IntoIterator<Item = Ability>) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for ability in abilities {
            catalog.insert(ability)?;
        }
        tracing::debug!(abilities = catalog.len(), "ability catalog loaded");
        Ok(catalog)
    }

    /// Adds one ability after validating it.
    ///
    /// # Errors
    /// - [`CatalogError::Duplicate`] if the id is taken, including by
    ///   `basic_attack`
    /// - [`CatalogError::InvalidDice`] for a formula that does not parse
    /// - [`CatalogError::Invalid`] for negative costs
    pub fn insert(&mut self, ability: Ability) -> Result<(), CatalogError> {
        if ability.is_basic_attack() || self.abilities.contains_key(&ability.id) {
            return Err(CatalogError::Duplicate(ability.id));
        }
        if let Some(formula) = &ability.damage_dice {
            if let Err(source) = DiceFormula::parse(formula) {
                return Err(CatalogError::InvalidDice {
                    ability: ability.id,
                    source,
                });
            }
        }
        if ability.mana_cost < 0 || ability.stamina_cost < 0 {
            return Err(CatalogError::Invalid {
                ability: ability.id,
                reason: "costs must not be negative".into(),
            });
        }
        self.abilities.insert(ability.id.clone(), ability);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.abilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
    }
}

impl AbilityCatalog for InMemoryCatalog {
    fn find_by_id(&self, id: &AbilityId) -> Option<Ability> {
        self.abilities.get(id).cloned()
    }
}
