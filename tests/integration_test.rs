use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::sleep;
use werewolf::commands::{dispatch, CommandContext, CommandError};
use werewolf::config::EngineConfig;
use werewolf::protocol::ClientMessage;
use werewolf::session::ChannelSession;
use werewolf::state::AppState;
use werewolf::store::{MemoryStore, PlayerFilter, Store};
use werewolf::types::{GameStatus, Phase, PlayerRecord, Role};

const USERS: [&str; 4] = ["alice", "bob", "carol", "dave"];

struct Table {
    state: AppState,
    store: Arc<MemoryStore>,
    group: Arc<ChannelSession>,
    group_rx: UnboundedReceiver<String>,
}

impl Table {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), EngineConfig::default());
        let (group, group_rx) = ChannelSession::pair("group:g1");
        Self {
            state,
            store,
            group,
            group_rx,
        }
    }

    async fn say(&self, user: &str, msg: ClientMessage) -> Result<Option<String>, CommandError> {
        let ctx = CommandContext {
            user_id: user.to_string(),
            group_id: Some("g1".to_string()),
            session: self.group.clone(),
        };
        dispatch(&self.state, &ctx, msg.into()).await
    }

    async fn whisper(
        &self,
        user: &str,
        msg: ClientMessage,
    ) -> (Result<Option<String>, CommandError>, UnboundedReceiver<String>) {
        let (session, rx) = ChannelSession::pair(format!("dm:{}", user));
        let ctx = CommandContext {
            user_id: user.to_string(),
            group_id: None,
            session,
        };
        (dispatch(&self.state, &ctx, msg.into()).await, rx)
    }

    async fn seated(&self) -> Vec<PlayerRecord> {
        let mut all = Vec::new();
        for user in USERS {
            all.extend(
                self.store
                    .find_players(PlayerFilter::user(user))
                    .await
                    .unwrap(),
            );
        }
        all
    }

    async fn by_role(&self, role: Role) -> Vec<PlayerRecord> {
        self.seated()
            .await
            .into_iter()
            .filter(|p| p.role == role)
            .collect()
    }

    fn heard(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(msg) = self.group_rx.try_recv() {
            out.push(msg);
        }
        out
    }

    async fn open_lobby(&self) {
        self.say(
            "alice",
            ClientMessage::Create {
                nickname: "Alice".to_string(),
            },
        )
        .await
        .unwrap();
        for (user, nickname) in [("bob", "Bob"), ("carol", "Carol"), ("dave", "Dave")] {
            self.say(
                user,
                ClientMessage::Join {
                    nickname: nickname.to_string(),
                },
            )
            .await
            .unwrap();
        }
    }
}

/// End-to-end game: a night kill, a tied vote, a decisive re-vote, villagers win
#[tokio::test(start_paused = true)]
async fn test_full_game_flow() {
    let mut table = Table::new();
    table.open_lobby().await;

    let start = table.say("alice", ClientMessage::Start).await.unwrap();
    assert_eq!(start, None, "rules are broadcast, not replied");
    assert!(table.heard()[0].contains("The game begins"));

    let wolf = table.by_role(Role::Wolf).await.remove(0);
    let seer = table.by_role(Role::Seer).await.remove(0);
    let villagers = table.by_role(Role::Villager).await;
    assert_eq!(villagers.len(), 2);

    // Everyone checks their role in private
    let mut whispers = Vec::new();
    for user in USERS {
        let (reply, rx) = table.whisper(user, ClientMessage::Identity).await;
        assert!(reply.unwrap().unwrap().starts_with("Your role: "));
        whispers.push(rx);
    }

    // Night 1: the wolf kills the first villager, the seer finds the wolf
    sleep(Duration::from_secs(31)).await;
    assert!(table.heard().iter().any(|m| m.contains("Night falls")));
    for rx in whispers.iter_mut() {
        assert!(rx.try_recv().is_ok(), "every living player is woken in private");
    }

    let victim = &villagers[0];
    let (reply, _) = table
        .whisper(
            &wolf.user_id,
            ClientMessage::Kill {
                target: victim.sequence.to_string(),
            },
        )
        .await;
    reply.unwrap();
    let (reply, _) = table
        .whisper(
            &seer.user_id,
            ClientMessage::Check {
                target: wolf.nickname.clone(),
            },
        )
        .await;
    assert!(reply.unwrap().unwrap().ends_with("is a werewolf."));

    // Dawn: the victim is announced, day 1 discussion begins
    sleep(Duration::from_secs(120)).await;
    let heard = table.heard();
    assert!(heard
        .iter()
        .any(|m| m.contains(&format!("{} died last night", victim.label()))));
    assert!(heard.iter().any(|m| m.starts_with("Day 1")));

    // Vote: the seer and the wolf accuse each other, the last villager abstains
    sleep(Duration::from_secs(120)).await;
    let survivor = &villagers[1];
    table
        .say(
            &seer.user_id,
            ClientMessage::Vote {
                target: wolf.sequence.to_string(),
            },
        )
        .await
        .unwrap();
    table
        .say(
            &wolf.user_id,
            ClientMessage::Vote {
                target: seer.sequence.to_string(),
            },
        )
        .await
        .unwrap();
    table
        .say(&survivor.user_id, ClientMessage::Abstain)
        .await
        .unwrap();
    let dead = table
        .say(
            &victim.user_id,
            ClientMessage::Vote {
                target: wolf.sequence.to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(dead, CommandError::Dead));

    // Tie: second round, where the villager breaks it
    sleep(Duration::from_secs(30)).await;
    assert!(table.heard().iter().any(|m| m.contains("It's a tie")));
    for (user, target) in [
        (&seer.user_id, &wolf),
        (&survivor.user_id, &wolf),
        (&wolf.user_id, &seer),
    ] {
        table
            .say(
                user,
                ClientMessage::Vote {
                    target: target.sequence.to_string(),
                },
            )
            .await
            .unwrap();
    }

    sleep(Duration::from_secs(30)).await;
    let heard = table.heard();
    assert!(heard
        .iter()
        .any(|m| m.contains(&format!("{} was executed", wolf.label()))));
    assert!(heard.iter().any(|m| m.contains("The villagers win")));
    assert_eq!(heard.last().map(String::as_str), Some("Game over."));

    // Everything about the game is gone
    assert!(table.seated().await.is_empty());
    assert!(table.state.manager.running_games().await.is_empty());
    let info = table.say("alice", ClientMessage::Info).await.unwrap_err();
    assert!(matches!(info, CommandError::NoActiveGame));
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_lobby_is_closed() {
    let mut table = Table::new();
    table
        .say(
            "alice",
            ClientMessage::Create {
                nickname: "Alice".to_string(),
            },
        )
        .await
        .unwrap();
    table
        .say(
            "bob",
            ClientMessage::Join {
                nickname: "Bob".to_string(),
            },
        )
        .await
        .unwrap();

    sleep(Duration::from_secs(301)).await;

    let heard = table.heard();
    assert!(heard.iter().any(|m| m.contains("closing the lobby")));
    assert!(table.seated().await.is_empty());
    assert!(table.state.manager.running_games().await.is_empty());

    // The group is free for a new game
    let reply = table
        .say(
            "bob",
            ClientMessage::Create {
                nickname: "Bob".to_string(),
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert!(reply.contains("Game created"));
}

#[tokio::test(start_paused = true)]
async fn test_forced_end_mid_game() {
    let mut table = Table::new();
    table.open_lobby().await;
    table.say("alice", ClientMessage::Start).await.unwrap();
    sleep(Duration::from_secs(31)).await;
    table.heard();

    let reply = table.say("alice", ClientMessage::End).await.unwrap().unwrap();
    assert!(reply.contains("ended by force"));
    for p in table.by_role(Role::Wolf).await {
        assert!(reply.contains(&format!("{}: Werewolf", p.label())));
    }
    assert_eq!(table.heard(), vec!["Game over.".to_string()]);

    // No timer survives the end of the game
    sleep(Duration::from_secs(600)).await;
    assert!(table.heard().is_empty());
    assert!(table.seated().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_lobby_status_is_reported() {
    let table = Table::new();
    table.open_lobby().await;

    let info = table.say("alice", ClientMessage::Info).await.unwrap().unwrap();
    assert!(info.contains("Status: preparing"));
    assert!(info.contains("`start`"));

    table.say("alice", ClientMessage::Start).await.unwrap();
    let game = table.seated().await[0].game_id;
    let record = table.store.get_game(game).await.unwrap().unwrap();
    assert_eq!(record.status, GameStatus::InProgress);

    let handle = table.state.manager.get_game_state(game).await.unwrap();
    assert_eq!(handle.phase().await, Phase::Prepare);
    let info = table.say("bob", ClientMessage::Info).await.unwrap().unwrap();
    assert!(info.contains("Status: in progress"));
}
