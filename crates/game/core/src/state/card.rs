//! Cards, card sets, and the deck.
//!
//! The regulator treats card matching as an opaque oracle: it asks a card
//! for its owning [`CardSet`] and asks that set whether a selection forms a
//! legal trade. The matching rule itself (three of a kind or one of each,
//! wilds joining either) lives entirely here.

use arrayvec::ArrayVec;

use crate::rng::{PcgRng, RngOracle, compute_seed};
use crate::state::TerritoryId;

/// Number of cards surrendered by one trade-in.
pub const TRADE_SIZE: usize = 3;

/// Insignia printed on a card; names the set the card belongs to.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Insignia {
    Infantry,
    Cavalry,
    Artillery,
    Wild,
}

/// A single territory card.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Card {
    insignia: Insignia,
    targets: Vec<TerritoryId>,
    tradeable: bool,
}

impl Card {
    pub fn new(insignia: Insignia, targets: Vec<TerritoryId>) -> Self {
        Self {
            insignia,
            targets,
            tradeable: true,
        }
    }

    /// A wild card: no territory targets, joins any set.
    pub fn wild() -> Self {
        Self::new(Insignia::Wild, Vec::new())
    }

    pub fn with_tradeable(mut self, tradeable: bool) -> Self {
        self.tradeable = tradeable;
        self
    }

    pub fn insignia(&self) -> Insignia {
        self.insignia
    }

    /// Territories this card grants a placement bonus on.
    pub fn targets(&self) -> &[TerritoryId] {
        &self.targets
    }

    pub fn is_tradeable(&self) -> bool {
        self.tradeable
    }

    /// The owning set of this card, resolvable for every insignia.
    pub fn card_set(&self) -> Option<CardSet> {
        Some(CardSet {
            insignia: self.insignia,
        })
    }
}

/// The set a card belongs to, identified by insignia.
///
/// Acts as the validity oracle for trade selections. Every set applies the
/// same matching rule to the full selection, so a mixed selection is legal
/// exactly when each of its owning sets agrees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CardSet {
    insignia: Insignia,
}

impl CardSet {
    pub fn insignia(&self) -> Insignia {
        self.insignia
    }

    /// Whether `cards` forms a legal trade: exactly three cards that are
    /// three of a kind or one of each insignia, wilds standing in for any.
    pub fn is_valid_trade(&self, cards: &[&Card]) -> bool {
        if cards.len() != TRADE_SIZE {
            return false;
        }
        let wilds = cards
            .iter()
            .filter(|c| c.insignia == Insignia::Wild)
            .count();
        let mut plain: ArrayVec<Insignia, TRADE_SIZE> = cards
            .iter()
            .map(|c| c.insignia)
            .filter(|&i| i != Insignia::Wild)
            .collect();
        plain.sort_unstable();

        let all_same = plain.windows(2).all(|w| w[0] == w[1]);
        if all_same {
            // Covers three of a kind, pairs plus a wild, and all-wild hands.
            return true;
        }
        let mut distinct: Vec<Insignia> = plain.to_vec();
        distinct.dedup();
        distinct.len() + wilds >= TRADE_SIZE
    }

    /// Match-finder: every index triple of `hand` that forms a legal trade,
    /// restricted to individually tradeable cards.
    pub fn find_trade_sets(hand: &[Card]) -> Vec<[usize; TRADE_SIZE]> {
        let mut found = Vec::new();
        for i in 0..hand.len() {
            for j in (i + 1)..hand.len() {
                for k in (j + 1)..hand.len() {
                    let picks = [&hand[i], &hand[j], &hand[k]];
                    if picks.iter().all(|c| c.is_tradeable())
                        && picks
                            .iter()
                            .filter_map(|c| c.card_set())
                            .all(|set| set.is_valid_trade(&picks))
                    {
                        found.push([i, j, k]);
                    }
                }
            }
        }
        found
    }

    /// Whether `hand` contains at least one legal trade.
    pub fn has_trade_set(hand: &[Card]) -> bool {
        !Self::find_trade_sets(hand).is_empty()
    }
}

/// Source of reward cards drawn on conquest.
pub trait Deck {
    /// Draws the top card, `None` once the deck is exhausted.
    fn draw(&mut self) -> Option<Card>;

    /// Cards remaining in the deck.
    fn remaining(&self) -> usize;
}

/// In-memory deck with a deterministic, seed-keyed shuffle.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CardDeck {
    cards: Vec<Card>,
}

impl CardDeck {
    /// Number of wild cards in a standard deck.
    const WILD_COUNT: usize = 2;

    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    /// Builds the standard deck: one card per territory with insignia
    /// cycling infantry / cavalry / artillery, plus two wilds, shuffled by
    /// a Fisher-Yates pass keyed on `seed`.
    pub fn standard(territory_count: u16, seed: u64) -> Self {
        const CYCLE: [Insignia; 3] = [Insignia::Infantry, Insignia::Cavalry, Insignia::Artillery];
        let mut cards: Vec<Card> = (0..territory_count)
            .map(|t| Card::new(CYCLE[usize::from(t) % 3], vec![TerritoryId(t)]))
            .collect();
        cards.extend((0..Self::WILD_COUNT).map(|_| Card::wild()));

        let rng = PcgRng;
        for i in (1..cards.len()).rev() {
            let j = rng.range(compute_seed(seed, i as u64), 0, i as u32) as usize;
            cards.swap(i, j);
        }
        Self { cards }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}

impl Deck for CardDeck {
    fn draw(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    fn remaining(&self) -> usize {
        self.cards.len()
    }
}
