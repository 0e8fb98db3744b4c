use super::{Card, Suit};

use strum::IntoEnumIterator;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::StandardNormal;

/// The lowest index the cut card may be inserted at.
const MIN_CUT_CARD_INDEX: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Slot {
    Card(Card),
    CutCard,
}

/// Represents a shoe in the real world: one or more shuffled decks with a cut
/// card placed somewhere around the middle.
///
/// The shoe never runs dry. Reaching the cut card, or the end of the shoe,
/// rebuilds it with a fresh shuffle and a freshly placed cut card before the
/// next card is dealt.
#[derive(Debug, Clone)]
pub struct Shoe {
    number_of_decks: u8,
    slots: Vec<Slot>,
    current_index: usize,
    number_of_builds: u64,
    rng: StdRng,
}

impl Shoe {
    /// Creates a shuffled shoe drawing its randomness from `rng`.
    pub fn new(number_of_decks: u8, rng: StdRng) -> Shoe {
        let mut shoe = Shoe {
            number_of_decks,
            slots: Vec::with_capacity(number_of_decks as usize * 52 + 1),
            current_index: 0,
            number_of_builds: 0,
            rng,
        };
        shoe.rebuild();
        shoe
    }

    /// Deals the next card, rebuilding first if the shoe is empty or the cut
    /// card is next. The cut card itself is never dealt.
    pub fn deal_card(&mut self) -> Card {
        loop {
            match self.slots.get(self.current_index) {
                Some(Slot::Card(card)) => {
                    let card = *card;
                    self.current_index += 1;
                    return card;
                }
                Some(Slot::CutCard) | None => self.rebuild(),
            }
        }
    }

    /// Deals the next `n` cards in shoe order.
    pub fn draw(&mut self, n: usize) -> Vec<Card> {
        (0..n).map(|_| self.deal_card()).collect()
    }

    /// Number of cards that can still be dealt before the cut card forces a rebuild.
    pub fn cards_before_cut_card(&self) -> usize {
        self.slots[self.current_index..]
            .iter()
            .take_while(|slot| matches!(slot, Slot::Card(_)))
            .count()
    }

    /// Number of playable cards left in the shoe, on either side of the cut card.
    pub fn remaining_cards(&self) -> usize {
        self.slots[self.current_index..]
            .iter()
            .filter(|slot| matches!(slot, Slot::Card(_)))
            .count()
    }

    /// How many times the shoe has been built, including the initial build.
    pub fn number_of_builds(&self) -> u64 {
        self.number_of_builds
    }

    /// Rebuilds the shoe so that cards of the given face values (1 for A up to
    /// 13 for K) are dealt first, in order, with the cut card behind them.
    /// Panics if the decks cannot supply them.
    #[cfg(test)]
    pub(crate) fn shuffle_with_firsts(&mut self, face_values: &[u8]) {
        self.rebuild();
        let mut cards: Vec<Card> = self
            .slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::Card(card) => Some(*card),
                Slot::CutCard => None,
            })
            .collect();
        for (index, &face_value) in face_values.iter().enumerate() {
            let found = cards[index..]
                .iter()
                .position(|card| card.face_value == face_value)
                .expect("The given first cards are invalid");
            cards.swap(index, index + found);
        }
        let cut_card_index = self
            .slots
            .iter()
            .position(|slot| *slot == Slot::CutCard)
            .unwrap_or(cards.len())
            .max(face_values.len());

        self.slots.clear();
        self.slots.extend(cards.into_iter().map(Slot::Card));
        self.slots.insert(cut_card_index, Slot::CutCard);
    }

    /// Collects every deck, shuffles, and inserts the cut card at a position
    /// drawn from a normal distribution centred on the middle of the shoe
    /// (standard deviation of an eighth of the shoe), clamped to
    /// `[2, size - 1]`.
    fn rebuild(&mut self) {
        let mut cards = Vec::with_capacity(self.number_of_decks as usize * 52);
        for _ in 0..self.number_of_decks {
            for suit in Suit::iter() {
                for face_value in 1..=13 {
                    cards.push(Card { face_value, suit });
                }
            }
        }
        cards.shuffle(&mut self.rng);

        let size = cards.len();
        let z: f64 = self.rng.sample(StandardNormal);
        let position = size as f64 / 2.0 + z * size as f64 / 8.0;
        // Truncation toward zero, then clamp. Negative positions land on the lower bound.
        let cut_card_index = (position as i64)
            .max(MIN_CUT_CARD_INDEX as i64)
            .min(size as i64 - 1) as usize;

        self.slots.clear();
        self.slots.extend(cards.into_iter().map(Slot::Card));
        self.slots.insert(cut_card_index, Slot::CutCard);
        self.current_index = 0;
        self.number_of_builds += 1;
    }
}
