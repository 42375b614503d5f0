//! Vote tallying and the end-of-game check.

use crate::types::{Faction, PlayerRecord};
use rand::seq::IndexedRandom;
use rand::Rng;

/// Living players tied at the highest vote count.
///
/// A count of zero never leads, so nobody is returned when no votes were cast.
/// Counters left on dead players are ignored.
pub fn leaders<F>(players: &[PlayerRecord], votes: F) -> Vec<&PlayerRecord>
where
    F: Fn(&PlayerRecord) -> u32,
{
    let mut max = 0;
    let mut leaders = Vec::new();
    for player in players.iter().filter(|p| p.alive) {
        let count = votes(player);
        if count > max {
            max = count;
            leaders.clear();
            leaders.push(player);
        } else if count == max && max > 0 {
            leaders.push(player);
        }
    }
    leaders
}

/// The player killed overnight: a uniformly random pick among the most targeted
pub fn night_victim<'a, R>(players: &'a [PlayerRecord], rng: &mut R) -> Option<&'a PlayerRecord>
where
    R: Rng + ?Sized,
{
    leaders(players, |p| p.elimination_votes)
        .choose(rng)
        .copied()
}

/// Outcome of a day vote
#[derive(Debug, PartialEq)]
pub enum Verdict<'a> {
    NoVotes,
    Execute(&'a PlayerRecord),
    Tie(Vec<&'a PlayerRecord>),
}

/// Day votes never break ties randomly; two or more leaders mean a tie
pub fn day_verdict(players: &[PlayerRecord]) -> Verdict<'_> {
    let mut leaders = leaders(players, |p| p.execution_votes);
    match leaders.len() {
        0 => Verdict::NoVotes,
        1 => Verdict::Execute(leaders.remove(0)),
        _ => Verdict::Tie(leaders),
    }
}

/// Living players per side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Headcount {
    pub wolves: usize,
    pub others: usize,
}

impl Headcount {
    pub fn of(players: &[PlayerRecord]) -> Self {
        let mut count = Self {
            wolves: 0,
            others: 0,
        };
        for player in players.iter().filter(|p| p.alive) {
            if player.role.is_wolf() {
                count.wolves += 1;
            } else {
                count.others += 1;
            }
        }
        count
    }

    /// The game is over once the wolves are gone or have reached parity
    pub fn winner(self) -> Option<Faction> {
        if self.wolves == 0 {
            Some(Faction::Villagers)
        } else if self.wolves >= self.others {
            Some(Faction::Wolves)
        } else {
            None
        }
    }
}

pub fn winner(players: &[PlayerRecord]) -> Option<Faction> {
    Headcount::of(players).winner()
}
