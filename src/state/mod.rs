//! The game state model and its primitive mutation surface.
//!
//! All mutation goes through the named transition methods here
//! (`move_card`, `adjust_life`, `add_counters`, ...). Deterministic
//! resolution and oracle-applied verdicts both call these and nothing
//! else, so every change lands in the log and passes the same
//! validation.
//!
//! Zone changes follow the physical-object rule: the old instance is
//! retired and a fresh `InstanceId` is allocated in the destination
//! zone. References held by stack entries therefore go stale when
//! their object moves, which is what makes fizzling checkable.

mod player_state;

pub use player_state::PlayerState;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::cards::{CardCatalog, CardDefinition, CardId, CardInstance, InstanceId};
use crate::core::{ChangeLog, GameRng, LogEntry, ManaColor, Phase, PlayerId, PlayerMap};
use crate::engine::stack::StackEntry;
use crate::error::EngineError;
use crate::zones::{ZoneId, ZoneKind, ZoneManager, ZonePosition};

/// Name of the replacement effect that exiles cards headed to an
/// opponent's graveyard.
const VOID_LEYLINE: &str = "Leyline of the Void";

/// Terminal result of a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameResult {
    Winner(PlayerId),
    Draw,
}

/// Combat assignments for the current turn.
#[derive(Clone, Debug, Default)]
pub struct CombatState {
    pub attackers: Vec<InstanceId>,
    /// blocker -> attacker being blocked.
    pub blocks: FxHashMap<InstanceId, InstanceId>,
}

impl CombatState {
    /// Blockers assigned to one attacker.
    pub fn blockers_of(&self, attacker: InstanceId) -> impl Iterator<Item = InstanceId> + '_ {
        self.blocks
            .iter()
            .filter(move |(_, &a)| a == attacker)
            .map(|(&b, _)| b)
    }

    pub fn clear(&mut self) {
        self.attackers.clear();
        self.blocks.clear();
    }
}

/// Complete state of one game in a match.
#[derive(Clone, Debug)]
pub struct GameState {
    pub catalog: CardCatalog,
    pub players: PlayerMap<PlayerState>,
    pub zones: ZoneManager,
    cards: FxHashMap<InstanceId, CardInstance>,
    pub stack: Vec<StackEntry>,
    pub combat: CombatState,
    pub active_player: PlayerId,
    pub priority_player: PlayerId,
    pub phase: Phase,
    pub turn: u32,
    /// Cards drawn during the current draw step, per player. The first
    /// such draw is exempt from draw-punisher triggers.
    pub draw_step_draws: PlayerMap<u32>,
    pub rng: GameRng,
    pub log: ChangeLog,
    pub result: Option<GameResult>,
    next_instance: u32,
}

impl GameState {
    /// Create a game with both libraries populated (unshuffled) from
    /// decklists of catalog names.
    ///
    /// Fails with `IllegalAction` if a decklist names a card missing
    /// from the catalog.
    pub fn new(
        catalog: CardCatalog,
        decks: &PlayerMap<Vec<String>>,
        seed: u64,
    ) -> Result<Self, EngineError> {
        let mut state = Self {
            catalog,
            players: PlayerMap::new(|_| PlayerState::new()),
            zones: ZoneManager::new(),
            cards: FxHashMap::default(),
            stack: Vec::new(),
            combat: CombatState::default(),
            active_player: PlayerId::new(0),
            priority_player: PlayerId::new(0),
            phase: Phase::Untap,
            turn: 1,
            draw_step_draws: PlayerMap::with_value(0),
            rng: GameRng::new(seed),
            log: ChangeLog::new(),
            result: None,
            next_instance: 0,
        };

        for player in PlayerId::both() {
            for name in &decks[player] {
                let card = state
                    .catalog
                    .id_of(name)
                    .ok_or_else(|| EngineError::illegal(format!("unknown card name {name:?}")))?;
                state.new_card(card, player, ZoneId::library(player), ZonePosition::Top)?;
            }
        }
        Ok(state)
    }

    // ------------------------------------------------------------------
    // Lookup helpers
    // ------------------------------------------------------------------

    /// Get a card instance.
    pub fn card(&self, id: InstanceId) -> Result<&CardInstance, EngineError> {
        self.cards
            .get(&id)
            .ok_or_else(|| EngineError::illegal(format!("card {id} does not exist")))
    }

    /// Get a card instance mutably.
    pub fn card_mut(&mut self, id: InstanceId) -> Result<&mut CardInstance, EngineError> {
        self.cards
            .get_mut(&id)
            .ok_or_else(|| EngineError::illegal(format!("card {id} does not exist")))
    }

    /// True if the instance still exists (it is retired on zone change).
    #[must_use]
    pub fn exists(&self, id: InstanceId) -> bool {
        self.cards.contains_key(&id)
    }

    /// The printed definition behind an instance.
    pub fn definition(&self, id: InstanceId) -> Result<&CardDefinition, EngineError> {
        let card = self.card(id)?;
        self.catalog
            .get(card.card)
            .ok_or_else(|| self.invariant_violation(format!("instance {id} has unknown card id")))
    }

    /// The printed name behind an instance, for log messages.
    #[must_use]
    pub fn name_of(&self, id: InstanceId) -> String {
        self.definition(id)
            .map_or_else(|_| format!("{id}"), |d| d.name.clone())
    }

    /// All instances on the battlefield.
    pub fn battlefield(&self) -> impl Iterator<Item = &CardInstance> + '_ {
        self.zones
            .cards_in(ZoneId::battlefield())
            .iter()
            .filter_map(|id| self.cards.get(id))
    }

    /// Battlefield instances controlled by one player.
    pub fn battlefield_of(&self, player: PlayerId) -> impl Iterator<Item = &CardInstance> + '_ {
        self.battlefield().filter(move |c| c.controller == player)
    }

    /// Creatures controlled by one player.
    pub fn creatures_of(&self, player: PlayerId) -> impl Iterator<Item = &CardInstance> + '_ {
        self.battlefield_of(player).filter(|c| {
            self.catalog
                .get(c.card)
                .is_some_and(CardDefinition::is_creature)
        })
    }

    /// A controlled battlefield permanent by name, if any.
    #[must_use]
    pub fn find_on_battlefield(&self, player: PlayerId, name: &str) -> Option<&CardInstance> {
        self.battlefield_of(player)
            .find(|c| self.catalog.get(c.card).is_some_and(|d| d.name == name))
    }

    /// Cards in a player's hand.
    pub fn hand_of(&self, player: PlayerId) -> impl Iterator<Item = &CardInstance> + '_ {
        self.zones
            .cards_in(ZoneId::hand(player))
            .iter()
            .filter_map(|id| self.cards.get(id))
    }

    #[must_use]
    pub fn hand_size(&self, player: PlayerId) -> usize {
        self.zones.size(ZoneId::hand(player))
    }

    /// Power after +1/+1 and -1/-1 counters.
    pub fn effective_power(&self, id: InstanceId) -> Result<i32, EngineError> {
        let card = self.card(id)?;
        let base = self.definition(id)?.power.unwrap_or(0);
        Ok(base + card.counters_of("+1/+1") as i32 - card.counters_of("-1/-1") as i32)
    }

    /// Toughness after +1/+1 and -1/-1 counters.
    pub fn effective_toughness(&self, id: InstanceId) -> Result<i32, EngineError> {
        let card = self.card(id)?;
        let base = self.definition(id)?.toughness.unwrap_or(0);
        Ok(base + card.counters_of("+1/+1") as i32 - card.counters_of("-1/-1") as i32)
    }

    // ------------------------------------------------------------------
    // Primitive transitions
    // ------------------------------------------------------------------

    /// Record a log entry at the current turn and phase.
    pub fn note(&mut self, detail: impl Into<String>) -> LogEntry {
        let entry = self.log.record(self.turn, self.phase, detail);
        debug!(entry = %entry, "state change");
        entry
    }

    /// Create a brand-new card object directly in a zone. Used at
    /// setup and for token creation.
    pub fn new_card(
        &mut self,
        card: CardId,
        owner: PlayerId,
        zone: ZoneId,
        position: ZonePosition,
    ) -> Result<InstanceId, EngineError> {
        let definition = self
            .catalog
            .get(card)
            .ok_or_else(|| EngineError::illegal(format!("unknown card id {card}")))?;
        let is_token = definition.is_token;
        let is_creature = definition.is_creature();
        let loyalty = definition.loyalty;

        let id = self.allocate_id();
        let mut instance = CardInstance::new(id, card, owner, zone, self.turn);
        instance.is_token = is_token;
        if zone.kind == ZoneKind::Battlefield {
            if is_creature {
                instance.sick = true;
            }
            if let Some(loyalty) = loyalty {
                instance.add_counters("loyalty", loyalty.max(0) as u32);
            }
        }
        self.cards.insert(id, instance);
        self.zones.add(id, zone, position)?;
        Ok(id)
    }

    /// Move a card to another zone, retiring the old instance and
    /// returning the fresh one.
    ///
    /// Applies zone-change replacement effects before the move is
    /// recorded, so the log never shows the card reaching the replaced
    /// destination.
    pub fn move_card(
        &mut self,
        id: InstanceId,
        dest: ZoneId,
        position: ZonePosition,
    ) -> Result<(InstanceId, LogEntry), EngineError> {
        let old = self.card(id)?.clone();
        let dest = self.rewrite_destination(old.zone, dest);
        if old.zone == dest {
            let entry = self.note(format!("{} stays in {}", self.name_of(id), dest));
            return Ok((id, entry));
        }

        let name = self.name_of(id);
        let source = old.zone;
        self.zones.remove(id);
        self.cards.remove(&id);

        let definition = self
            .catalog
            .get(old.card)
            .ok_or_else(|| self.invariant_violation(format!("instance {id} has unknown card id")))?;
        let is_creature = definition.is_creature();
        let loyalty = definition.loyalty;

        let fresh = self.allocate_id();
        let mut instance = CardInstance::new(fresh, old.card, old.owner, dest, self.turn);
        instance.is_token = old.is_token;
        if dest.kind == ZoneKind::Battlefield {
            if is_creature {
                instance.sick = true;
            }
            if let Some(loyalty) = loyalty {
                instance.add_counters("loyalty", loyalty.max(0) as u32);
            }
        }
        self.cards.insert(fresh, instance);
        self.zones.add(fresh, dest, position)?;

        let entry = self.note(format!("{name} moves from {source} to {dest}"));
        Ok((fresh, entry))
    }

    /// Remove a card object from the game entirely (tokens ceasing to
    /// exist). Not a zone change; nothing replaces it.
    pub fn remove_card(&mut self, id: InstanceId) -> Result<LogEntry, EngineError> {
        let name = self.name_of(id);
        if self.zones.remove(id).is_none() || self.cards.remove(&id).is_none() {
            return Err(self.invariant_violation(format!("removing untracked card {id}")));
        }
        Ok(self.note(format!("{name} ceases to exist")))
    }

    /// Change a player's life total by `delta`.
    pub fn adjust_life(&mut self, player: PlayerId, delta: i32) -> LogEntry {
        self.players[player].life += delta;
        let life = self.players[player].life;
        let verb = if delta < 0 { "loses" } else { "gains" };
        self.note(format!("{player} {verb} {} life ({life})", delta.abs()))
    }

    /// Give a player poison counters.
    pub fn add_poison(&mut self, player: PlayerId, n: u32) -> LogEntry {
        self.players[player].poison += n;
        let total = self.players[player].poison;
        self.note(format!("{player} gets {n} poison counter(s) ({total})"))
    }

    /// Add counters of one kind to a card.
    pub fn add_counters(
        &mut self,
        id: InstanceId,
        kind: &str,
        n: u32,
    ) -> Result<LogEntry, EngineError> {
        let name = self.name_of(id);
        self.card_mut(id)?.add_counters(kind, n);
        Ok(self.note(format!("{name} gets {n} {kind} counter(s)")))
    }

    /// Remove up to `n` counters of one kind from a card.
    pub fn remove_counters(
        &mut self,
        id: InstanceId,
        kind: &str,
        n: u32,
    ) -> Result<LogEntry, EngineError> {
        let name = self.name_of(id);
        let removed = self.card_mut(id)?.remove_counters(kind, n);
        Ok(self.note(format!("{name} loses {removed} {kind} counter(s)")))
    }

    /// Tap or untap a permanent.
    pub fn set_tapped(&mut self, id: InstanceId, tapped: bool) -> Result<LogEntry, EngineError> {
        let name = self.name_of(id);
        self.card_mut(id)?.tapped = tapped;
        let verb = if tapped { "taps" } else { "untaps" };
        Ok(self.note(format!("{name} {verb}")))
    }

    /// Mark damage on a creature or planeswalker.
    pub fn mark_damage(
        &mut self,
        id: InstanceId,
        amount: i32,
        deathtouch: bool,
    ) -> Result<LogEntry, EngineError> {
        if amount < 0 {
            return Err(self.invariant_violation(format!("negative damage {amount} to {id}")));
        }
        let name = self.name_of(id);
        let is_planeswalker = self.definition(id)?.is_planeswalker();
        if is_planeswalker {
            self.remove_counters(id, "loyalty", amount as u32)?;
        }
        let card = self.card_mut(id)?;
        card.damage += amount;
        if deathtouch && amount > 0 {
            card.deathtouched = true;
        }
        Ok(self.note(format!("{name} is dealt {amount} damage")))
    }

    /// Add mana to a player's pool.
    pub fn add_mana(&mut self, player: PlayerId, color: ManaColor, n: u8) -> LogEntry {
        self.players[player].mana.add(color, n);
        self.note(format!("{player} adds {n} {color:?} mana"))
    }

    /// Empty both mana pools. Happens at the end of every step.
    pub fn clear_mana_pools(&mut self) {
        for player in PlayerId::both() {
            self.players[player].mana.clear();
        }
    }

    /// Draw `n` cards. Drawing from an empty library sets the deck-out
    /// flag; the next state-based-action pass turns it into a loss.
    pub fn draw_cards(
        &mut self,
        player: PlayerId,
        n: usize,
    ) -> Result<Vec<InstanceId>, EngineError> {
        let mut drawn = Vec::with_capacity(n);
        for _ in 0..n {
            let Some(top) = self.zones.top(ZoneId::library(player)) else {
                self.players[player].drew_from_empty = true;
                self.note(format!("{player} attempts to draw from an empty library"));
                break;
            };
            let (fresh, _) = self.move_card(top, ZoneId::hand(player), ZonePosition::Top)?;
            if self.phase == Phase::Draw {
                self.draw_step_draws[player] += 1;
            }
            drawn.push(fresh);
        }
        Ok(drawn)
    }

    /// Discard a card from hand to its owner's graveyard.
    pub fn discard(
        &mut self,
        player: PlayerId,
        id: InstanceId,
    ) -> Result<(InstanceId, LogEntry), EngineError> {
        if !self.zones.is_in(id, ZoneId::hand(player)) {
            return Err(EngineError::illegal(format!(
                "{} cannot discard {id}: not in hand",
                player
            )));
        }
        let name = self.name_of(id);
        let owner = self.card(id)?.owner;
        let (fresh, _) = self.move_card(id, ZoneId::graveyard(owner), ZonePosition::Top)?;
        let entry = self.note(format!("{player} discards {name}"));
        Ok((fresh, entry))
    }

    /// Record a concession. The state-based-action pass converts it
    /// into the terminal result.
    pub fn concede(&mut self, player: PlayerId) -> LogEntry {
        self.players[player].has_lost = Some("conceded".into());
        self.note(format!("{player} concedes"))
    }

    // ------------------------------------------------------------------
    // Replacement effects
    // ------------------------------------------------------------------

    /// Rewrite a zone-change destination through active replacement
    /// effects. Currently: cards headed to a graveyard are exiled
    /// instead while the graveyard owner's opponent controls a void
    /// leyline.
    #[must_use]
    fn rewrite_destination(&self, source: ZoneId, dest: ZoneId) -> ZoneId {
        let _ = source;
        if dest.kind == ZoneKind::Graveyard {
            if let Some(owner) = dest.owner {
                if self
                    .find_on_battlefield(owner.opponent(), VOID_LEYLINE)
                    .is_some()
                {
                    return ZoneId::exile();
                }
            }
        }
        dest
    }

    // ------------------------------------------------------------------
    // Integrity
    // ------------------------------------------------------------------

    /// Build an `InvariantViolation` carrying a dump of this state.
    #[must_use]
    pub fn invariant_violation(&self, detail: impl Into<String>) -> EngineError {
        EngineError::InvariantViolation {
            detail: detail.into(),
            dump: self.dump(),
        }
    }

    /// A human-readable dump of the interesting parts of the state.
    #[must_use]
    pub fn dump(&self) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        let _ = writeln!(out, "turn {} {} active={}", self.turn, self.phase, self.active_player);
        for player in PlayerId::both() {
            let ps = &self.players[player];
            let _ = writeln!(
                out,
                "{player}: {} life, {} poison, hand {}, library {}, graveyard {}",
                ps.life,
                ps.poison,
                self.hand_size(player),
                self.zones.size(ZoneId::library(player)),
                self.zones.size(ZoneId::graveyard(player)),
            );
        }
        for card in self.battlefield() {
            let _ = writeln!(
                out,
                "  battlefield: {} ({}) controlled by {}",
                self.name_of(card.id),
                card.id,
                card.controller
            );
        }
        for entry in &self.stack {
            let _ = writeln!(out, "  stack: {}", entry.description);
        }
        out
    }

    /// Cross-check the zone manager against the instance table.
    pub fn verify_integrity(&self) -> Result<(), EngineError> {
        self.zones.verify()?;
        for (&id, card) in &self.cards {
            if self.zones.zone_of(id) != Some(card.zone) {
                return Err(self.invariant_violation(format!(
                    "instance {id} believes it is in {} but the zone manager disagrees",
                    card.zone
                )));
            }
        }
        for entry in &self.stack {
            if !self.zones.is_in(entry.source, ZoneId::stack()) && !entry.is_ability() {
                return Err(self.invariant_violation(format!(
                    "stack entry {:?} has no card on the stack zone",
                    entry.description
                )));
            }
        }
        Ok(())
    }

    fn allocate_id(&mut self) -> InstanceId {
        let id = InstanceId::new(self.next_instance);
        self.next_instance += 1;
        id
    }
}
