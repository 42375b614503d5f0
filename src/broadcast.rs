use crate::session::SessionRegistry;

/// Where a broadcast goes
#[derive(Debug, Clone, Copy)]
pub enum Audience<'a> {
    /// The shared group channel
    Group,
    /// One participant's private channel
    Player(&'a str),
}

/// Send a message through the registry.
///
/// Never fails: a missing channel or a transport error is logged and the
/// message is dropped, so callers can keep narrating regardless.
pub async fn broadcast(sessions: &mut SessionRegistry, message: &str, audience: Audience<'_>) {
    let session = match audience {
        Audience::Player(user_id) => match sessions.private_session(user_id) {
            Some(s) => s,
            None => {
                tracing::debug!("No private session for {}, dropping message", user_id);
                return;
            }
        },
        Audience::Group => match sessions.group_session() {
            Some(s) => s,
            None => {
                tracing::error!("No available group session for broadcast");
                return;
            }
        },
    };

    if let Err(e) = session.send(message).await {
        tracing::error!("Failed to broadcast message: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ChannelSession;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_group_broadcast_uses_first_session() {
        let mut reg = SessionRegistry::new(Duration::from_secs(300));
        let (first, mut first_rx) = ChannelSession::pair("first");
        let (second, mut second_rx) = ChannelSession::pair("second");
        reg.register_group(first);
        reg.refresh_group(second);

        broadcast(&mut reg, "hello", Audience::Group).await;

        assert_eq!(first_rx.try_recv().unwrap(), "hello");
        assert!(second_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_group_broadcast_skips_expired_session() {
        let mut reg = SessionRegistry::new(Duration::from_secs(300));
        let (stale, mut stale_rx) = ChannelSession::pair("stale");
        reg.register_group(stale);
        tokio::time::advance(Duration::from_secs(200)).await;
        let (fresh, mut fresh_rx) = ChannelSession::pair("fresh");
        reg.refresh_group(fresh);
        tokio::time::advance(Duration::from_secs(150)).await;

        broadcast(&mut reg, "hi", Audience::Group).await;

        assert!(stale_rx.try_recv().is_err());
        assert_eq!(fresh_rx.try_recv().unwrap(), "hi");
    }

    #[tokio::test(start_paused = true)]
    async fn test_private_broadcast_without_session_is_noop() {
        let mut reg = SessionRegistry::new(Duration::from_secs(300));
        let (group, mut group_rx) = ChannelSession::pair("group");
        reg.register_group(group);

        broadcast(&mut reg, "secret", Audience::Player("alice")).await;

        assert!(group_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_private_broadcast_reaches_player() {
        let mut reg = SessionRegistry::new(Duration::from_secs(300));
        let (dm, mut dm_rx) = ChannelSession::pair("dm-alice");
        reg.register_private("alice", dm);

        broadcast(&mut reg, "you are the seer", Audience::Player("alice")).await;

        assert_eq!(dm_rx.try_recv().unwrap(), "you are the seer");
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failure_is_swallowed() {
        let mut reg = SessionRegistry::new(Duration::from_secs(300));
        let (closed, rx) = ChannelSession::pair("closed");
        drop(rx);
        reg.register_group(closed);

        // Must not panic
        broadcast(&mut reg, "anyone?", Audience::Group).await;
        broadcast(&mut SessionRegistry::new(Duration::from_secs(1)), "void", Audience::Group).await;
    }
}
