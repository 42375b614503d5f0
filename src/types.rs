use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque ID types for type safety
pub type GameId = u64;
pub type PlayerId = u64;
pub type UserId = String;
pub type GroupId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Ended,
    Preparing,
    InProgress,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Unassigned,
    Wolf,
    Villager,
    Seer,
}

impl Role {
    pub fn is_wolf(self) -> bool {
        self == Role::Wolf
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Unassigned => "Unassigned",
            Role::Wolf => "Werewolf",
            Role::Villager => "Villager",
            Role::Seer => "Seer",
        };
        f.write_str(name)
    }
}

/// The fixed role multiset dealt at game start. Its length is the table size.
pub const ROLE_SET: [Role; 4] = [Role::Wolf, Role::Villager, Role::Villager, Role::Seer];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Faction {
    Wolves,
    Villagers,
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Faction::Wolves => f.write_str("The werewolves"),
            Faction::Villagers => f.write_str("The villagers"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Prepare,
    Night,
    Day,
    Vote,
    Ended,
}

impl Phase {
    /// Human readable name used in replies
    pub fn label(self) -> &'static str {
        match self {
            Phase::Prepare => "preparation",
            Phase::Night => "night",
            Phase::Day => "day discussion",
            Phase::Vote => "voting",
            Phase::Ended => "ended",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameRecord {
    pub id: GameId,
    pub group_id: GroupId,
    pub status: GameStatus,
    pub player_count: u32,
    pub creator_id: UserId,
    pub winner: Option<Faction>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub user_id: UserId,
    pub game_id: GameId,
    pub sequence: u32,
    pub nickname: String,
    pub role: Role,
    pub alive: bool,
    pub execution_votes: u32,
    pub elimination_votes: u32,
    pub has_acted: bool,
}

impl PlayerRecord {
    /// "#2 Bob" style label for narration
    pub fn label(&self) -> String {
        format!("#{} {}", self.sequence, self.nickname)
    }

    /// Whether a command target (sequence number or nickname) names this player
    pub fn matches_target(&self, target: &str) -> bool {
        let target = target.trim();
        match target.parse::<u32>() {
            Ok(n) if n == self.sequence => true,
            _ => self.nickname == target,
        }
    }
}

/// Fields for a new game row
#[derive(Debug, Clone)]
pub struct NewGame {
    pub group_id: GroupId,
    pub creator_id: UserId,
}

/// Fields for a new player row
#[derive(Debug, Clone)]
pub struct NewPlayer {
    pub user_id: UserId,
    pub game_id: GameId,
    pub sequence: u32,
    pub nickname: String,
}

/// Partial update of a game row; `None` leaves the field untouched
#[derive(Debug, Clone, Default)]
pub struct GamePatch {
    pub status: Option<GameStatus>,
    pub player_count: Option<u32>,
    pub winner: Option<Faction>,
}

/// Partial update of a player row; `None` leaves the field untouched
#[derive(Debug, Clone, Default)]
pub struct PlayerPatch {
    pub sequence: Option<u32>,
    pub role: Option<Role>,
    pub alive: Option<bool>,
    pub execution_votes: Option<u32>,
    pub elimination_votes: Option<u32>,
    pub has_acted: Option<bool>,
}

impl PlayerPatch {
    /// Reset applied to every player at nightfall
    pub fn night_reset() -> Self {
        Self {
            execution_votes: Some(0),
            elimination_votes: Some(0),
            has_acted: Some(false),
            ..Default::default()
        }
    }

    /// Reset applied at the start of each vote round
    pub fn vote_reset() -> Self {
        Self {
            execution_votes: Some(0),
            has_acted: Some(false),
            ..Default::default()
        }
    }

    pub fn killed() -> Self {
        Self {
            alive: Some(false),
            ..Default::default()
        }
    }
}

/// Which counter a vote goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteKind {
    /// Day vote by any living player
    Execution,
    /// Night vote by the wolf
    Elimination,
}
