//! Group commands that create, fill, start, end and describe a game.

use super::*;
use crate::engine::narration;
use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::Ordering;

async fn already_playing(state: &AppState, user_id: &str) -> Result<bool, CommandError> {
    let rows = state.store.find_players(PlayerFilter::user(user_id)).await?;
    Ok(!rows.is_empty())
}

pub async fn create(state: &AppState, ctx: &CommandContext, nickname: &str) -> CommandResult {
    let group_id = require_group(ctx)?;
    refresh_group_session(state, ctx, group_id).await;

    let nickname = nickname.trim();
    if nickname.is_empty() {
        return Err(CommandError::MissingNickname);
    }
    if already_playing(state, &ctx.user_id).await? {
        return Err(CommandError::AlreadyInGame);
    }
    let busy = state
        .store
        .find_games(GameFilter::active_in_group(group_id))
        .await?;
    if !busy.is_empty() {
        return Err(CommandError::GroupBusy);
    }

    let game = state
        .store
        .create_game(NewGame {
            group_id: group_id.to_string(),
            creator_id: ctx.user_id.clone(),
        })
        .await?;
    state
        .store
        .create_player(NewPlayer {
            user_id: ctx.user_id.clone(),
            game_id: game.id,
            sequence: 1,
            nickname: nickname.to_string(),
        })
        .await?;
    state
        .store
        .update_game(
            game.id,
            GamePatch {
                player_count: Some(1),
                ..Default::default()
            },
        )
        .await?;

    state.manager.open_game(game.id, ctx.session.clone()).await?;
    tracing::info!("Game {} created in group {} by {}", game.id, group_id, ctx.user_id);

    Ok(Some(format!(
        "Game created! Your nickname is {}.\nWaiting for players... (send `join <nickname>` to join)",
        nickname
    )))
}

pub async fn join(state: &AppState, ctx: &CommandContext, nickname: &str) -> CommandResult {
    let group_id = require_group(ctx)?;
    refresh_group_session(state, ctx, group_id).await;

    let nickname = nickname.trim();
    if nickname.is_empty() {
        return Err(CommandError::MissingNickname);
    }
    if already_playing(state, &ctx.user_id).await? {
        return Err(CommandError::AlreadyInGame);
    }

    let game = state
        .store
        .find_games(GameFilter::preparing_in_group(group_id))
        .await?
        .into_iter()
        .next()
        .ok_or(CommandError::NoPreparingGame)?;
    let seats = ROLE_SET.len() as u32;
    if game.player_count >= seats {
        return Err(CommandError::GameFull);
    }

    let count = game.player_count + 1;
    state
        .store
        .create_player(NewPlayer {
            user_id: ctx.user_id.clone(),
            game_id: game.id,
            sequence: count,
            nickname: nickname.to_string(),
        })
        .await?;
    state
        .store
        .update_game(
            game.id,
            GamePatch {
                player_count: Some(count),
                ..Default::default()
            },
        )
        .await?;

    tracing::info!("{} joined game {} as #{}", ctx.user_id, game.id, count);
    Ok(Some(format!(
        "Joined! Your nickname is {}.\nPlayers: {}/{}",
        nickname, count, seats
    )))
}

/// Shuffle the role set over the players and renumber them 1..N in seating order
pub fn deal_roles<R: Rng + ?Sized>(
    players: &[PlayerRecord],
    rng: &mut R,
) -> Vec<(PlayerId, PlayerPatch)> {
    let mut roles = ROLE_SET;
    roles.shuffle(rng);
    players
        .iter()
        .zip(roles)
        .enumerate()
        .map(|(i, (p, role))| {
            let patch = PlayerPatch {
                sequence: Some(i as u32 + 1),
                role: Some(role),
                ..Default::default()
            };
            (p.id, patch)
        })
        .collect()
}

pub async fn start(state: &AppState, ctx: &CommandContext) -> CommandResult {
    let group_id = require_group(ctx)?;
    refresh_group_session(state, ctx, group_id).await;

    let game = state
        .store
        .find_games(GameFilter::preparing_in_group(group_id))
        .await?
        .into_iter()
        .next()
        .ok_or(CommandError::NoPreparingGame)?;
    if game.creator_id != ctx.user_id {
        return Err(CommandError::NotCreator("start"));
    }

    let players = roster(state, game.id).await?;
    match players.len().cmp(&ROLE_SET.len()) {
        Ordering::Less => return Err(CommandError::NotEnoughPlayers),
        Ordering::Greater => return Err(CommandError::TooManyPlayers),
        Ordering::Equal => {}
    }

    let dealt = deal_roles(&players, &mut rand::rng());
    for (id, patch) in dealt {
        state.store.update_player(id, patch).await?;
    }
    state
        .store
        .update_game(
            game.id,
            GamePatch {
                status: Some(GameStatus::InProgress),
                ..Default::default()
            },
        )
        .await?;

    state.manager.start_game(game.id, ctx.session.clone()).await?;
    // The engine has already broadcast the rules to the group
    Ok(None)
}

pub async fn end(state: &AppState, ctx: &CommandContext) -> CommandResult {
    let group_id = require_group(ctx)?;
    refresh_group_session(state, ctx, group_id).await;

    let game = active_game(state, group_id).await?;
    if game.creator_id != ctx.user_id {
        return Err(CommandError::NotCreator("end"));
    }

    let players = roster(state, game.id).await?;
    let result = format!(
        "The game was ended by force.\n{}",
        narration::reveal(&players)
    );

    match state.manager.get_game_state(game.id).await {
        Some(handle) => {
            handle.end_game().await;
            state.manager.remove_game(game.id).await;
        }
        None => {
            tracing::warn!("Game {} has no engine, deleting its rows directly", game.id);
            state.store.remove_players(game.id).await?;
            state.store.remove_game(game.id).await?;
        }
    }

    tracing::info!("Game {} ended by its creator", game.id);
    Ok(Some(result))
}

pub async fn info(state: &AppState, ctx: &CommandContext) -> CommandResult {
    let group_id = require_group(ctx)?;
    refresh_group_session(state, ctx, group_id).await;

    let game = active_game(state, group_id).await?;
    let players = roster(state, game.id).await?;
    let phase = current_phase(state, game.id).await;
    let creator = players
        .iter()
        .find(|p| p.user_id == game.creator_id)
        .map(|p| p.nickname.as_str())
        .unwrap_or("unknown");
    let status = match game.status {
        GameStatus::Preparing => "preparing",
        _ => "in progress",
    };

    let mut out = String::from("Current game:");
    out.push_str(&format!("\nStatus: {}", status));
    out.push_str(&format!(
        "\nPhase: {}",
        phase.map(Phase::label).unwrap_or("unknown")
    ));
    out.push_str(&format!("\nCreator: {}", creator));
    out.push_str(&format!(
        "\nPlayers: {}/{}",
        game.player_count,
        ROLE_SET.len()
    ));
    out.push_str(&format!("\n\nPlayer list:\n{}", player_list(&players)));

    let hint = match phase {
        Some(Phase::Prepare) => Some("Waiting for players, send `join <nickname>` to join."),
        Some(Phase::Night) => Some("It is night, the werewolf and the seer are acting."),
        Some(Phase::Day) => Some("It is day, discuss in the group."),
        Some(Phase::Vote) => Some("Voting is open, use `vote <number|nickname>`."),
        _ => None,
    };
    if let Some(hint) = hint {
        out.push_str(&format!("\n\n{}", hint));
    }

    out.push_str("\n\nCommands:\n`identity` - check your role in private");
    if phase == Some(Phase::Vote) {
        out.push_str("\n`vote <number|nickname>` - vote to execute a player");
        out.push_str("\n`abstain` - skip this vote");
    }
    if game.creator_id == ctx.user_id {
        if game.status == GameStatus::Preparing {
            out.push_str("\n`start` - start the game");
        }
        out.push_str("\n`end` - end the game by force");
    }

    Ok(Some(out))
}
