//! Mana costs and mana pools.
//!
//! Costs are written in the usual brace notation (`{1}{B}{B}`). Payment
//! is greedy: colored requirements first, then generic from colorless
//! mana, then generic from whatever colors remain.

use serde::{Deserialize, Serialize};

/// The five colors plus colorless.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManaColor {
    White,
    Blue,
    Black,
    Red,
    Green,
    Colorless,
}

impl ManaColor {
    /// All colors, in WUBRG + colorless order.
    pub const ALL: [ManaColor; 6] = [
        ManaColor::White,
        ManaColor::Blue,
        ManaColor::Black,
        ManaColor::Red,
        ManaColor::Green,
        ManaColor::Colorless,
    ];

    const fn index(self) -> usize {
        match self {
            ManaColor::White => 0,
            ManaColor::Blue => 1,
            ManaColor::Black => 2,
            ManaColor::Red => 3,
            ManaColor::Green => 4,
            ManaColor::Colorless => 5,
        }
    }

    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "W" => Some(ManaColor::White),
            "U" => Some(ManaColor::Blue),
            "B" => Some(ManaColor::Black),
            "R" => Some(ManaColor::Red),
            "G" => Some(ManaColor::Green),
            "C" => Some(ManaColor::Colorless),
            _ => None,
        }
    }
}

/// A parsed mana cost: per-color pip counts plus a generic component.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManaCost {
    pips: [u8; 6],
    generic: u8,
}

impl ManaCost {
    /// Parse a brace-notation cost string such as `{1}{B}{B}`.
    ///
    /// Returns `None` for malformed strings or symbols outside the
    /// supported set (no X costs, no hybrid or phyrexian symbols).
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let mut cost = ManaCost::default();
        let mut rest = text;
        while !rest.is_empty() {
            let close = rest.find('}')?;
            if !rest.starts_with('{') {
                return None;
            }
            let symbol = &rest[1..close];
            if let Some(color) = ManaColor::from_symbol(symbol) {
                cost.pips[color.index()] += 1;
            } else {
                cost.generic = cost.generic.checked_add(symbol.parse::<u8>().ok()?)?;
            }
            rest = &rest[close + 1..];
        }
        Some(cost)
    }

    /// A cost of exactly `n` generic mana.
    #[must_use]
    pub fn from_generic(n: u8) -> Self {
        Self {
            pips: [0; 6],
            generic: n,
        }
    }

    /// Converted mana cost (total pips plus generic).
    #[must_use]
    pub fn cmc(&self) -> u32 {
        self.pips.iter().map(|&p| u32::from(p)).sum::<u32>() + u32::from(self.generic)
    }

    /// Pips required of one color.
    #[must_use]
    pub fn pips_of(&self, color: ManaColor) -> u8 {
        self.pips[color.index()]
    }

    /// True if this cost is free.
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.cmc() == 0
    }
}

impl std::fmt::Display for ManaCost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.generic > 0 {
            write!(f, "{{{}}}", self.generic)?;
        }
        for (color, symbol) in ManaColor::ALL.iter().zip(["W", "U", "B", "R", "G", "C"]) {
            for _ in 0..self.pips[color.index()] {
                write!(f, "{{{symbol}}}")?;
            }
        }
        if self.is_free() {
            write!(f, "{{0}}")?;
        }
        Ok(())
    }
}

/// Floating mana available to one player.
///
/// Emptied at the end of every step and phase.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManaPool {
    amounts: [u8; 6],
}

impl ManaPool {
    /// An empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `n` mana of one color.
    pub fn add(&mut self, color: ManaColor, n: u8) {
        self.amounts[color.index()] = self.amounts[color.index()].saturating_add(n);
    }

    /// Mana of one color currently floating.
    #[must_use]
    pub fn amount(&self, color: ManaColor) -> u8 {
        self.amounts[color.index()]
    }

    /// Total mana floating, all colors.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.amounts.iter().map(|&a| u32::from(a)).sum()
    }

    /// True if nothing is floating.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Remove all floating mana.
    pub fn clear(&mut self) {
        self.amounts = [0; 6];
    }

    /// True if the pool can cover `cost`.
    #[must_use]
    pub fn can_pay(&self, cost: &ManaCost) -> bool {
        let mut remaining = 0u32;
        for color in ManaColor::ALL {
            let have = u32::from(self.amount(color));
            let need = u32::from(cost.pips_of(color));
            if have < need {
                return false;
            }
            remaining += have - need;
        }
        remaining >= u32::from(cost.generic)
    }

    /// Pay `cost` from the pool: colored pips first, then generic from
    /// colorless, then generic from remaining colors in WUBRG order.
    ///
    /// Returns `false` (and leaves the pool untouched) if the pool
    /// cannot cover the cost.
    pub fn pay(&mut self, cost: &ManaCost) -> bool {
        if !self.can_pay(cost) {
            return false;
        }
        for color in ManaColor::ALL {
            self.amounts[color.index()] -= cost.pips_of(color);
        }
        let mut generic = cost.generic;
        let spend = generic.min(self.amounts[ManaColor::Colorless.index()]);
        self.amounts[ManaColor::Colorless.index()] -= spend;
        generic -= spend;
        for color in ManaColor::ALL {
            if generic == 0 {
                break;
            }
            let spend = generic.min(self.amounts[color.index()]);
            self.amounts[color.index()] -= spend;
            generic -= spend;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let cost = ManaCost::parse("{1}{B}{B}").unwrap();
        assert_eq!(cost.cmc(), 3);
        assert_eq!(cost.pips_of(ManaColor::Black), 2);
        assert_eq!(cost.pips_of(ManaColor::White), 0);
    }

    #[test]
    fn test_parse_generic_only() {
        let cost = ManaCost::parse("{4}").unwrap();
        assert_eq!(cost.cmc(), 4);
        assert_eq!(cost.pips_of(ManaColor::Black), 0);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(ManaCost::parse("1BB").is_none());
        assert!(ManaCost::parse("{B/R}").is_none());
        assert!(ManaCost::parse("{X}{B}").is_none());
    }

    #[test]
    fn test_display_round_trip() {
        for text in ["{1}{B}{B}", "{2}{B}", "{B}", "{0}"] {
            let cost = ManaCost::parse(text).unwrap();
            assert_eq!(format!("{cost}"), text);
        }
    }

    #[test]
    fn test_can_pay_requires_colored_pips() {
        let mut pool = ManaPool::new();
        pool.add(ManaColor::White, 3);

        let cost = ManaCost::parse("{1}{B}").unwrap();
        assert!(!pool.can_pay(&cost));

        pool.add(ManaColor::Black, 1);
        assert!(pool.can_pay(&cost));
    }

    #[test]
    fn test_pay_prefers_colorless_for_generic() {
        let mut pool = ManaPool::new();
        pool.add(ManaColor::Black, 2);
        pool.add(ManaColor::Colorless, 1);

        let cost = ManaCost::parse("{1}{B}").unwrap();
        assert!(pool.pay(&cost));

        // The generic portion consumed the colorless mana, keeping a
        // black mana floating.
        assert_eq!(pool.amount(ManaColor::Black), 1);
        assert_eq!(pool.amount(ManaColor::Colorless), 0);
    }

    #[test]
    fn test_failed_pay_leaves_pool_untouched() {
        let mut pool = ManaPool::new();
        pool.add(ManaColor::Black, 1);

        let cost = ManaCost::parse("{1}{B}").unwrap();
        assert!(!pool.pay(&cost));
        assert_eq!(pool.amount(ManaColor::Black), 1);
    }
}
