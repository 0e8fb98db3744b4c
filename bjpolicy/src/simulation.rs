pub mod hand;
pub mod shoe;
pub mod transitions;

use crate::{Error, Result, Rule};
use bjpolicy_macros::allowed_phase;
use rand::rngs::StdRng;
use strum_macros::EnumIter;

use self::{hand::Hand, shoe::Shoe};

static FACE_VALUE_TO_BLACKJACK_VALUE: [u8; 13] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 10, 10, 10];
static FACE_VALUE_TO_RANK: [&str; 13] = [
    "A", "2", "3", "4", "5", "6", "7", "8", "9", "10", "J", "Q", "K",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum Suit {
    Diamond = 0,
    Club,
    Heart,
    Spade,
}

/// Represents a card in the real world with a suit and a face value.
/// Face values run from 1 (Ace) to 13 (King). Only the face value matters for scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Card {
    pub face_value: u8,
    pub suit: Suit,
}

impl Card {
    /// Value with the Ace counted as 1.
    pub fn blackjack_value(&self) -> u8 {
        FACE_VALUE_TO_BLACKJACK_VALUE[(self.face_value - 1) as usize]
    }

    /// Value with the Ace counted as 11.
    pub fn points(&self) -> u8 {
        if self.is_ace() {
            11
        } else {
            self.blackjack_value()
        }
    }

    pub fn is_ace(&self) -> bool {
        self.face_value == 1
    }

    pub fn rank(&self) -> &'static str {
        FACE_VALUE_TO_RANK[(self.face_value - 1) as usize]
    }
}

impl Default for Card {
    fn default() -> Self {
        Card {
            face_value: 1,
            suit: Suit::Diamond,
        }
    }
}

impl std::fmt::Display for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let suit = match self.suit {
            Suit::Diamond => '♦',
            Suit::Club => '♣',
            Suit::Heart => '♥',
            Suit::Spade => '♠',
        };
        write!(f, "{}{}", self.rank(), suit)
    }
}

impl From<Card> for u8 {
    fn from(card: Card) -> u8 {
        card.suit as u8 * 13 + card.face_value - 1
    }
}

/// The dealer draws below 17, and on a soft 17 when the table says so.
pub fn dealer_should_hit(dealer_hand: &Hand, dealer_hit_on_soft17: bool) -> bool {
    let score = dealer_hand.score();
    if score < 17 {
        true
    } else if score == 17 {
        !dealer_hand.is_hard() && dealer_hit_on_soft17
    } else {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GamePhase {
    DealInitialCards,
    PlayerTurns,
    DealerPlay,
    Settled,
}

/// A blackjack table seating `hands_per_deal` player hands against the dealer.
///
/// Rounds go DealInitialCards -> PlayerTurns -> DealerPlay -> Settled, and
/// `new_round` returns to DealInitialCards. Methods restricted to one phase
/// return `Error::WrongPhase` when called out of turn.
///
/// Seats are the player hands in play. Splitting a seat replaces it with two
/// single-card seats, so the number of seats can grow during PlayerTurns.
#[derive(Debug, Clone)]
pub struct Table {
    rule: Rule,
    current_game_phase: GamePhase,
    shoe: Shoe,
    dealer_hand: Hand,
    seats: Vec<Hand>,
}

impl Table {
    /// Opens a table on a fresh shoe and burns its first card.
    pub fn new(rule: &Rule, rng: StdRng) -> Result<Self> {
        rule.validate()?;
        let mut shoe = Shoe::new(rule.number_of_decks, rng);
        let _burnt = shoe.deal_card();
        Ok(Self {
            rule: *rule,
            current_game_phase: GamePhase::DealInitialCards,
            shoe,
            dealer_hand: Hand::new(),
            seats: Vec::with_capacity(rule.hands_per_deal as usize * 2),
        })
    }

    /// Deals two cards to each player hand in seat order, then two to the dealer.
    #[allowed_phase(DealInitialCards)]
    pub fn deal_initial_cards(&mut self) -> Result<()> {
        self.seats.clear();
        for _ in 0..self.rule.hands_per_deal {
            let mut hand = Hand::new();
            hand.receive_card(self.shoe.deal_card());
            hand.receive_card(self.shoe.deal_card());
            self.seats.push(hand);
        }
        self.dealer_hand.clear();
        self.dealer_hand.receive_card(self.shoe.deal_card());
        self.dealer_hand.receive_card(self.shoe.deal_card());

        self.current_game_phase = GamePhase::PlayerTurns;
        Ok(())
    }

    /// Splits the pair at `seat` into two single-card hands at `seat` and `seat + 1`.
    #[allowed_phase(PlayerTurns)]
    pub fn split_seat(&mut self, seat: usize) -> Result<()> {
        let (first, second) = self.seat(seat)?.split()?;
        self.seats[seat] = first;
        self.seats.insert(seat + 1, second);
        Ok(())
    }

    /// Deals one card to the hand at `seat` and returns it.
    #[allowed_phase(PlayerTurns)]
    pub fn hit_seat(&mut self, seat: usize) -> Result<Card> {
        if seat >= self.seats.len() {
            return Err(Error::NoSuchSeat(seat));
        }
        let card = self.shoe.deal_card();
        self.seats[seat].receive_card(card);
        Ok(card)
    }

    #[allowed_phase(PlayerTurns)]
    pub fn finish_player_turns(&mut self) -> Result<()> {
        self.current_game_phase = GamePhase::DealerPlay;
        Ok(())
    }

    /// Plays the dealer out and returns the dealer's final score.
    #[allowed_phase(DealerPlay)]
    pub fn dealer_plays(&mut self) -> Result<u8> {
        while dealer_should_hit(&self.dealer_hand, self.rule.dealer_hit_on_soft17) {
            let card = self.shoe.deal_card();
            self.dealer_hand.receive_card(card);
        }
        self.current_game_phase = GamePhase::Settled;
        Ok(self.dealer_hand.score())
    }

    /// Clears every hand. The shoe carries over to the next round.
    #[allowed_phase(Settled)]
    pub fn new_round(&mut self) -> Result<()> {
        self.seats.clear();
        self.dealer_hand.clear();
        self.current_game_phase = GamePhase::DealInitialCards;
        Ok(())
    }

    pub fn seat(&self, seat: usize) -> Result<&Hand> {
        self.seats.get(seat).ok_or(Error::NoSuchSeat(seat))
    }

    pub fn number_of_seats(&self) -> usize {
        self.seats.len()
    }

    pub fn dealer_hand(&self) -> &Hand {
        &self.dealer_hand
    }

    /// What the dealer shows: the first dealer card, Ace counting 11.
    pub fn dealer_upcard_score(&self) -> u8 {
        self.dealer_hand.upcard_score()
    }

    pub fn game_phase(&self) -> GamePhase {
        self.current_game_phase
    }

    /// Puts cards of the given face values on top of a freshly built shoe.
    #[cfg(test)]
    pub(crate) fn stack_shoe(&mut self, face_values: &[u8]) {
        self.shoe.shuffle_with_firsts(face_values);
    }
}
