use crate::{Error, Result, State};

use super::Card;

const BLACKJACK: u8 = 21;

/// An ordered group of cards. Cards are only ever appended, until the hand is cleared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    pub fn new() -> Hand {
        Hand {
            cards: Vec::with_capacity(3),
        }
    }

    pub fn with_cards(cards: &[Card]) -> Hand {
        Hand {
            cards: cards.to_vec(),
        }
    }

    pub fn receive_card(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn clear(&mut self) {
        self.cards.clear();
    }

    pub fn get_cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Best total: Aces count 11 and drop to 1 one at a time while the total is over 21.
    /// A total over 21 means the hand is bust.
    pub fn score(&self) -> u8 {
        score_of(&self.cards)
    }

    /// Score of the first card alone, which is what a dealer shows.
    pub fn upcard_score(&self) -> u8 {
        score_of(&self.cards[..self.cards.len().min(1)])
    }

    /// A hand is soft while one of its Aces can still count 11 without busting,
    /// i.e. it holds an Ace and its total with every Ace at 1 is at most 11.
    pub fn is_hard(&self) -> bool {
        let has_ace = self.cards.iter().any(|card| card.is_ace());
        let lowest_total: u16 = self
            .cards
            .iter()
            .map(|card| if card.is_ace() { 1 } else { card.blackjack_value() as u16 })
            .sum();
        !(has_ace && lowest_total <= 11)
    }

    /// Two cards of the same rank. Suits are ignored, and a Jack does not pair with a King.
    pub fn can_split(&self) -> bool {
        self.cards.len() == 2 && self.cards[0].face_value == self.cards[1].face_value
    }

    /// Splits a pair into two single-card hands, keeping card order.
    pub fn split(&self) -> Result<(Hand, Hand)> {
        if !self.can_split() {
            return Err(Error::CannotSplit);
        }
        Ok((
            Hand::with_cards(&self.cards[..1]),
            Hand::with_cards(&self.cards[1..]),
        ))
    }

    /// 21 from exactly two cards, the first being an Ace.
    pub fn is_ace_first_natural(&self) -> bool {
        self.cards.len() == 2 && self.cards[0].is_ace() && self.score() == BLACKJACK
    }

    pub fn bust(&self) -> bool {
        self.score() > BLACKJACK
    }

    /// The decision point this hand represents against the given dealer upcard.
    pub fn state(&self, score_dealer: u8) -> State {
        State::new(self.score(), score_dealer, self.is_hard())
    }
}

fn score_of(cards: &[Card]) -> u8 {
    let mut total: u16 = cards.iter().map(|card| card.points() as u16).sum();
    let mut aces = cards.iter().filter(|card| card.is_ace()).count();
    while total > BLACKJACK as u16 && aces > 0 {
        total -= 10;
        aces -= 1;
    }
    total.min(u8::MAX as u16) as u8
}

#[cfg(test)]
mod tests {
    use crate::simulation::Suit;

    use super::*;

    fn card(face_value: u8) -> Card {
        Card {
            face_value,
            suit: Suit::Spade,
        }
    }

    fn hand(face_values: &[u8]) -> Hand {
        let mut hand = Hand::new();
        for &face_value in face_values {
            hand.receive_card(card(face_value));
        }
        hand
    }

    #[test]
    fn ace_and_ten_valued_card_is_soft_21() {
        for ten in 10..=13 {
            for cards in [[1, ten], [ten, 1]] {
                let h = hand(&cards);
                assert_eq!(h.score(), 21);
                assert!(!h.is_hard());
            }
        }
    }

    #[test]
    fn forced_down_aces_are_hard() {
        assert!(hand(&[1, 13, 5]).is_hard());
        assert_eq!(hand(&[1, 13, 5]).score(), 16);
        assert!(hand(&[1, 1, 10]).is_hard());
        assert_eq!(hand(&[1, 1, 10]).score(), 12);
        assert!(hand(&[1, 1, 1, 9, 9]).is_hard());
        assert_eq!(hand(&[1, 1, 1, 9, 9]).score(), 21);
    }

    #[test]
    fn soft_and_hard_totals() {
        let h = hand(&[1, 1]);
        assert_eq!(h.score(), 12);
        assert!(!h.is_hard());

        let h = hand(&[1, 6]);
        assert_eq!(h.score(), 17);
        assert!(!h.is_hard());

        let h = hand(&[9, 8]);
        assert_eq!(h.score(), 17);
        assert!(h.is_hard());

        let h = hand(&[1]);
        assert_eq!(h.score(), 11);
        assert!(!h.is_hard());
    }

    #[test]
    fn bust_scores_exceed_21() {
        let h = hand(&[10, 12, 5]);
        assert_eq!(h.score(), 25);
        assert!(h.bust());
        assert!(h.is_hard());
    }

    #[test]
    fn upcard_score_uses_first_card_only() {
        assert_eq!(hand(&[1, 9]).upcard_score(), 11);
        assert_eq!(hand(&[12, 1]).upcard_score(), 10);
        assert_eq!(hand(&[]).upcard_score(), 0);
    }

    #[test]
    fn can_split_needs_two_cards_of_equal_rank() {
        assert!(hand(&[8, 8]).can_split());
        assert!(hand(&[1, 1]).can_split());
        assert!(!hand(&[11, 13]).can_split());
        assert!(!hand(&[10, 11]).can_split());
        assert!(!hand(&[8, 8, 8]).can_split());
        assert!(!hand(&[8]).can_split());
    }

    #[test]
    fn should_split_successfully() {
        let mut h = Hand::new();
        h.receive_card(Card {
            face_value: 8,
            suit: Suit::Diamond,
        });
        h.receive_card(Card {
            face_value: 8,
            suit: Suit::Club,
        });
        let (first, second) = h.split().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        let concatenated: Vec<Card> = first
            .get_cards()
            .iter()
            .chain(second.get_cards())
            .copied()
            .collect();
        assert_eq!(concatenated, h.get_cards());
    }

    #[test]
    fn split_of_non_pair_fails() {
        assert!(matches!(hand(&[8, 9]).split(), Err(Error::CannotSplit)));
        assert!(matches!(hand(&[8, 8, 2]).split(), Err(Error::CannotSplit)));
    }

    #[test]
    fn ace_first_natural() {
        assert!(hand(&[1, 12]).is_ace_first_natural());
        assert!(!hand(&[12, 1]).is_ace_first_natural());
        assert!(!hand(&[1, 5, 5]).is_ace_first_natural());
    }
}
