use super::tally::{self, Verdict};
use super::{narration, GameEngine, TimerKind};
use crate::types::*;

impl GameEngine {
    pub(super) async fn on_timer(&mut self, kind: TimerKind) {
        tracing::debug!("Game {}: {:?} timer fired", self.game.id, kind);
        match kind {
            TimerKind::PrepareTimeout => self.prepare_timed_out().await,
            TimerKind::Nightfall => self.begin_night().await,
            TimerKind::Dawn => self.settle_night().await,
            TimerKind::VoteOpen => self.begin_vote().await,
            TimerKind::VoteClose => self.settle_vote().await,
        }
    }

    pub(super) async fn start(&mut self) -> String {
        if self.phase != Phase::Prepare || self.started {
            return narration::ALREADY_STARTED.to_string();
        }
        self.started = true;
        self.cancel_timer();

        let rules = narration::rules(&self.config);
        self.say(&rules).await;
        self.arm(TimerKind::Nightfall, self.config.intro);

        tracing::info!("Game {} started", self.game.id);
        rules
    }

    async fn prepare_timed_out(&mut self) {
        match self.store.get_game(self.game.id).await {
            Ok(Some(game)) if game.status == GameStatus::Preparing => {
                tracing::info!("Game {} was never started, closing it", self.game.id);
                let notice = narration::prepare_timeout(self.config.prepare_timeout);
                self.say(&notice).await;
                self.teardown().await;
            }
            Ok(Some(_)) => {
                tracing::debug!(
                    "Prepare timeout of game {} ignored, it is no longer preparing",
                    self.game.id
                );
            }
            Ok(None) => {
                tracing::warn!("Game {} vanished from the store, closing it", self.game.id);
                self.teardown().await;
            }
            Err(e) => {
                // No timer is left to retry with
                tracing::error!(
                    "Failed to load game {} on prepare timeout, closing it: {}",
                    self.game.id,
                    e
                );
                let notice = narration::prepare_timeout(self.config.prepare_timeout);
                self.say(&notice).await;
                self.teardown().await;
            }
        }
    }

    async fn begin_night(&mut self) {
        self.phase = Phase::Night;
        self.day += 1;

        if self.day >= self.config.max_days {
            tracing::info!(
                "Game {} reached day {}, ending it by force",
                self.game.id,
                self.day
            );
            let players = self.load_players().await.unwrap_or_default();
            let notice = narration::day_limit(self.config.max_days, &players);
            self.say(&notice).await;
            self.teardown().await;
            return;
        }

        tracing::info!("Game {}: night {} begins", self.game.id, self.day);
        self.say(&narration::nightfall(self.config.night)).await;

        let players = self.load_players().await.unwrap_or_default();
        for player in players.iter().filter(|p| p.alive) {
            self.whisper(&player.user_id, narration::NIGHT_WHISPER).await;
        }
        self.update_players(&players, PlayerPatch::night_reset())
            .await;

        self.arm(TimerKind::Dawn, self.config.night);
    }

    async fn settle_night(&mut self) {
        let players = self.load_players().await.unwrap_or_default();
        let victim = tally::night_victim(&players, &mut rand::rng()).cloned();

        match victim {
            Some(victim) => {
                if let Err(e) = self
                    .store
                    .update_player(victim.id, PlayerPatch::killed())
                    .await
                {
                    tracing::error!("Failed to mark {} dead: {}", victim.label(), e);
                }
                tracing::info!(
                    "Game {}: {} was killed during night {}",
                    self.game.id,
                    victim.label(),
                    self.day
                );
                self.say(&narration::dawn_death(&victim)).await;
            }
            None => self.say(narration::DAWN_PEACEFUL).await,
        }

        if self.check_end().await {
            return;
        }
        self.begin_day().await;
    }

    async fn begin_day(&mut self) {
        self.phase = Phase::Day;
        let message = narration::day_opens(self.day, self.config.day);
        self.say(&message).await;
        self.arm(TimerKind::VoteOpen, self.config.day);
    }

    async fn begin_vote(&mut self) {
        self.phase = Phase::Vote;
        self.revoted = false;

        let players = self.load_players().await.unwrap_or_default();
        self.update_players(&players, PlayerPatch::vote_reset())
            .await;

        self.say(&narration::vote_opens(self.config.vote)).await;
        self.arm(TimerKind::VoteClose, self.config.vote);
    }

    async fn settle_vote(&mut self) {
        let players = self.load_players().await.unwrap_or_default();

        // Silence counts as abstaining
        let silent: Vec<PlayerRecord> = players
            .iter()
            .filter(|p| p.alive && !p.has_acted)
            .cloned()
            .collect();
        self.update_players(
            &silent,
            PlayerPatch {
                has_acted: Some(true),
                ..Default::default()
            },
        )
        .await;

        match tally::day_verdict(&players) {
            Verdict::Tie(tied) if !self.revoted => {
                self.revoted = true;
                tracing::info!("Game {}: vote tied, holding a second round", self.game.id);
                let notice = narration::tie_revote(&tied, self.config.vote);
                self.say(&notice).await;
                self.update_players(&players, PlayerPatch::vote_reset())
                    .await;
                self.arm(TimerKind::VoteClose, self.config.vote);
                return;
            }
            Verdict::Tie(tied) => {
                tracing::info!("Game {}: second vote tied, nobody executed", self.game.id);
                let notice = narration::tie_again(&tied);
                self.say(&notice).await;
            }
            Verdict::Execute(condemned) => {
                if let Err(e) = self
                    .store
                    .update_player(condemned.id, PlayerPatch::killed())
                    .await
                {
                    tracing::error!("Failed to execute {}: {}", condemned.label(), e);
                }
                tracing::info!(
                    "Game {}: {} was executed on day {}",
                    self.game.id,
                    condemned.label(),
                    self.day
                );
                self.say(&narration::executed(condemned)).await;
            }
            Verdict::NoVotes => self.say(narration::NOBODY_EXECUTED).await,
        }

        if self.check_end().await {
            return;
        }
        self.begin_night().await;
    }

    /// Announce the winner and tear down if one side has won
    async fn check_end(&mut self) -> bool {
        let Some(players) = self.load_players().await else {
            return false;
        };
        let Some(winner) = tally::winner(&players) else {
            return false;
        };

        tracing::info!("Game {}: {:?} win", self.game.id, winner);
        self.game.winner = Some(winner);
        self.say(&narration::game_result(winner, &players)).await;
        self.teardown().await;
        true
    }

    /// Idempotent cleanup shared by every way a game can end
    pub(super) async fn teardown(&mut self) -> String {
        if self.torn_down {
            return narration::GAME_OVER.to_string();
        }
        self.torn_down = true;
        self.phase = Phase::Ended;
        self.cancel_timer();

        // A row whose delete fails must not keep its group busy
        self.game.status = GameStatus::Ended;
        let patch = GamePatch {
            status: Some(GameStatus::Ended),
            winner: self.game.winner,
            ..Default::default()
        };
        if let Err(e) = self.store.update_game(self.game.id, patch).await {
            tracing::warn!("Failed to mark game {} ended: {}", self.game.id, e);
        }
        if let Err(e) = self.store.remove_players(self.game.id).await {
            tracing::error!("Failed to remove players of game {}: {}", self.game.id, e);
        }
        if let Err(e) = self.store.remove_game(self.game.id).await {
            tracing::error!("Failed to remove game {}: {}", self.game.id, e);
        }
        tracing::info!("Game {} data cleaned up", self.game.id);

        self.say(narration::GAME_OVER).await;
        self.sessions.clear();
        narration::GAME_OVER.to_string()
    }
}
