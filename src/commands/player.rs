//! Commands a seated player uses during the game.

use super::*;

/// Role, phase and roster of the caller's game. Also registers the private chat.
pub async fn identity(state: &AppState, ctx: &CommandContext) -> CommandResult {
    require_private(ctx)?;
    let me = caller(state, &ctx.user_id).await?;

    let handle = state.manager.get_game_state(me.game_id).await;
    let mut out = format!("Your role: {}", me.role);
    if let Some(handle) = handle {
        handle
            .update_player_session(&ctx.user_id, ctx.session.clone())
            .await;
        let phase = handle.phase().await;
        out.push_str(&format!("\nCurrent phase: {}", phase.label()));
        if let Some(tip) = action_tip(me.role, phase) {
            out.push('\n');
            out.push_str(tip);
        }
    }

    let players = roster(state, me.game_id).await?;
    out.push_str(&format!("\n\nPlayers:\n{}", player_list(&players)));
    Ok(Some(out))
}

fn action_tip(role: Role, phase: Phase) -> Option<&'static str> {
    match (phase, role) {
        (Phase::Night, Role::Wolf) => Some("Use `kill <number|nickname>` to choose tonight's victim."),
        (Phase::Night, Role::Seer) => Some("Use `check <number|nickname>` to learn a player's side."),
        (Phase::Night, _) => Some("You are a villager, there is nothing to do at night."),
        (Phase::Vote, _) => Some("Use `vote <number|nickname>` in the group to vote."),
        _ => None,
    }
}

/// Checks shared by the night actions: right role, alive, night, and a running engine
async fn night_actor(
    state: &AppState,
    ctx: &CommandContext,
    role: Role,
) -> Result<PlayerRecord, CommandError> {
    require_private(ctx)?;
    let me = caller(state, &ctx.user_id).await?;
    if me.role != role {
        let name = if role.is_wolf() { "werewolf" } else { "seer" };
        return Err(CommandError::WrongRole(name));
    }
    if !me.alive {
        return Err(CommandError::Dead);
    }

    let handle = state
        .manager
        .get_game_state(me.game_id)
        .await
        .ok_or(CommandError::NotNight)?;
    if handle.phase().await != Phase::Night {
        return Err(CommandError::NotNight);
    }
    handle
        .update_player_session(&ctx.user_id, ctx.session.clone())
        .await;
    Ok(me)
}

pub async fn kill(state: &AppState, ctx: &CommandContext, target: &str) -> CommandResult {
    let me = night_actor(state, ctx, Role::Wolf).await?;

    let players = roster(state, me.game_id).await?;
    let victim = find_target(&players, target)?;
    if !victim.alive {
        return Err(CommandError::TargetDead);
    }
    if !state.store.mark_acted(me.id).await? {
        return Err(CommandError::AlreadyActed);
    }
    state
        .store
        .add_votes(victim.id, VoteKind::Elimination, 1)
        .await?;

    tracing::info!("Game {}: werewolf chose {}", me.game_id, victim.label());
    Ok(Some(format!("You chose {}.", victim.label())))
}

pub async fn check(state: &AppState, ctx: &CommandContext, target: &str) -> CommandResult {
    let me = night_actor(state, ctx, Role::Seer).await?;

    let players = roster(state, me.game_id).await?;
    let suspect = find_target(&players, target)?;
    if !state.store.mark_acted(me.id).await? {
        return Err(CommandError::AlreadyActed);
    }

    tracing::debug!("Game {}: seer checked {}", me.game_id, suspect.label());
    let side = if suspect.role.is_wolf() {
        "a werewolf"
    } else {
        "not a werewolf"
    };
    Ok(Some(format!("{} is {}.", suspect.label(), side)))
}

/// Checks shared by the day actions: in the group, alive, and voting open
async fn voter(state: &AppState, ctx: &CommandContext) -> Result<PlayerRecord, CommandError> {
    let group_id = require_group(ctx)?;
    refresh_group_session(state, ctx, group_id).await;

    let me = caller(state, &ctx.user_id).await?;
    if !me.alive {
        return Err(CommandError::Dead);
    }
    if current_phase(state, me.game_id).await != Some(Phase::Vote) {
        return Err(CommandError::NotVoting);
    }
    Ok(me)
}

pub async fn vote(state: &AppState, ctx: &CommandContext, target: &str) -> CommandResult {
    let me = voter(state, ctx).await?;

    let players = roster(state, me.game_id).await?;
    let condemned = find_target(&players, target)?;
    if !condemned.alive {
        return Err(CommandError::TargetDead);
    }
    if !state.store.mark_acted(me.id).await? {
        return Err(CommandError::AlreadyActed);
    }
    state
        .store
        .add_votes(condemned.id, VoteKind::Execution, 1)
        .await?;

    tracing::info!(
        "Game {}: {} voted for {}",
        me.game_id,
        me.label(),
        condemned.label()
    );
    Ok(Some(format!("Vote for {} recorded.", condemned.label())))
}

pub async fn abstain(state: &AppState, ctx: &CommandContext) -> CommandResult {
    let me = voter(state, ctx).await?;
    if !state.store.mark_acted(me.id).await? {
        return Err(CommandError::AlreadyActed);
    }

    tracing::info!("Game {}: {} abstained", me.game_id, me.label());
    Ok(Some("You abstained.".to_string()))
}
