//! Texts the engine sends to the group and to players.

use crate::config::EngineConfig;
use crate::types::{Faction, PlayerRecord};
use std::time::Duration;

pub const GAME_OVER: &str = "Game over.";
pub const ALREADY_STARTED: &str = "The game has already started.";
pub const DAWN_PEACEFUL: &str = "Dawn breaks. Nobody died last night.";
pub const NOBODY_EXECUTED: &str = "The vote is over. Nobody was executed.";
pub const NIGHT_WHISPER: &str =
    "Night has fallen. Send `identity` to see what you can do tonight.";

pub fn rules(config: &EngineConfig) -> String {
    format!(
        "The game begins! Night falls in {} seconds, check your role in private before then.\n\
         How to play:\n\
         1. Every player sends `identity` to the bot in private\n\
         2. At night the werewolf uses `kill <player>` in private\n\
         3. At night the seer uses `check <player>` in private\n\
         4. During the day, discuss in the group\n\
         5. During the vote, use `vote <player>` or `abstain` in the group",
        config.intro.as_secs()
    )
}

pub fn prepare_timeout(after: Duration) -> String {
    format!(
        "Nobody started the game within {} minutes, closing the lobby.",
        after.as_secs() / 60
    )
}

pub fn nightfall(night: Duration) -> String {
    format!(
        "Night falls! Werewolf and seer, make your moves ({} seconds).",
        night.as_secs()
    )
}

pub fn dawn_death(victim: &PlayerRecord) -> String {
    format!("Dawn breaks. {} died last night.", victim.label())
}

pub fn day_opens(day: u32, discussion: Duration) -> String {
    format!(
        "Day {}: discuss in the group, voting opens in {} seconds.\nCareful not to give yourself away!",
        day,
        discussion.as_secs()
    )
}

pub fn vote_opens(vote: Duration) -> String {
    format!(
        "Voting is open! Use `vote <number|nickname>` or `abstain` ({} seconds).\n\
         Living players who do not vote in time abstain. The dead cannot vote.",
        vote.as_secs()
    )
}

pub fn tie_revote(tied: &[&PlayerRecord], vote: Duration) -> String {
    format!(
        "It's a tie between {}! Second round of voting ({} seconds).",
        names(tied),
        vote.as_secs()
    )
}

pub fn tie_again(tied: &[&PlayerRecord]) -> String {
    format!(
        "The second round is tied again between {}. Nobody was executed.",
        names(tied)
    )
}

pub fn executed(player: &PlayerRecord) -> String {
    format!("The vote is over. {} was executed.", player.label())
}

pub fn game_result(winner: Faction, players: &[PlayerRecord]) -> String {
    format!("Game over! {} win!\n{}", winner, reveal(players))
}

pub fn day_limit(max_days: u32, players: &[PlayerRecord]) -> String {
    format!(
        "The game has lasted {} days and is ended by force.\n{}",
        max_days,
        reveal(players)
    )
}

/// Every player's role, one per line
pub fn reveal(players: &[PlayerRecord]) -> String {
    let mut out = String::from("Roles:");
    for p in players {
        out.push_str(&format!("\n{}: {}", p.label(), p.role));
    }
    out
}

fn names(players: &[&PlayerRecord]) -> String {
    players
        .iter()
        .map(|p| p.label())
        .collect::<Vec<_>>()
        .join(" and ")
}
