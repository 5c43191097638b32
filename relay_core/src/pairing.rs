//! Share-code pairing handshake.
//!
//! 1. A asks for a share code and reads it out to B.
//! 2. B sends CONNECTION_REQUEST naming the share code. B gets an origin
//!    code bound to its own connection; A is told that code so it can
//!    address B.
//! 3. A answers with CONNECTION_ACCEPT addressed to B's origin code and a
//!    file list. A gets a fresh origin code, which B receives with the list.
//!
//! Share codes stay valid until their owner disconnects; a code may be
//! used by more than one requester.

use crate::codes::{Destination, OriginCode};
use crate::connection::ConnectionHandle;
use crate::messages::ServerMessage;
use crate::state::RelayState;
use serde_json::Value;

/// REQUEST_SHARE_CODE: publish `conn` under a fresh share code
pub async fn request_share_code(state: &RelayState, conn: &ConnectionHandle) {
    match state.registry.share_codes.issue(conn).await {
        Ok(code) => {
            tracing::info!("Issued share code {} to {}", code, conn.id());
            state
                .send(conn.as_ref(), ServerMessage::share_code(code))
                .await;
        }
        Err(e) => tracing::warn!("Cannot issue share code to {}: {}", conn.id(), e),
    }
}

/// CONNECTION_REQUEST: resolve a share code and introduce the two parties
pub async fn connection_request(
    state: &RelayState,
    conn: &ConnectionHandle,
    destination: Option<Destination>,
) {
    let owner = match destination.as_ref().and_then(Destination::to_share_code) {
        Some(code) => state.registry.share_codes.lookup(&code).await,
        None => None,
    };

    let Some(owner) = owner else {
        tracing::debug!(
            "Connection request from {} for unknown share code {:?}",
            conn.id(),
            destination
        );
        state
            .send(conn.as_ref(), ServerMessage::pairing_refused())
            .await;
        return;
    };

    let origin: OriginCode = match state.registry.origin_codes.issue(conn).await {
        Ok(code) => code,
        Err(e) => {
            tracing::warn!("Cannot issue origin code to {}: {}", conn.id(), e);
            return;
        }
    };

    tracing::info!(
        "Pairing {} with {} via origin {}",
        conn.id(),
        owner.id(),
        origin
    );

    state
        .send(conn.as_ref(), ServerMessage::pairing_accepted(origin.clone()))
        .await;
    state
        .send(owner.as_ref(), ServerMessage::pairing_notice(origin))
        .await;
}

/// CONNECTION_ACCEPT: hand the requester an address for `conn` plus the
/// offered files
pub async fn connection_accept(
    state: &RelayState,
    conn: &ConnectionHandle,
    destination: Option<OriginCode>,
    files: Vec<Value>,
) {
    let Some(destination) = destination else {
        tracing::debug!("Dropping CONNECTION_ACCEPT without destination");
        return;
    };
    let Some(requester) = state.registry.origin_codes.lookup(&destination).await else {
        tracing::debug!(
            "Dropping CONNECTION_ACCEPT for unknown destination {}",
            destination
        );
        return;
    };

    let origin: OriginCode = match state.registry.origin_codes.issue(conn).await {
        Ok(code) => code,
        Err(e) => {
            tracing::warn!("Cannot issue origin code to {}: {}", conn.id(), e);
            return;
        }
    };

    state.stats.add_files_transferred(files.len() as u64);
    tracing::info!(
        "{} accepted {} with {} file(s), reply origin {}",
        conn.id(),
        destination,
        files.len(),
        origin
    );

    state
        .send(
            requester.as_ref(),
            ServerMessage::connection_accepted(origin, files),
        )
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::ShareCode;
    use crate::config::RelayConfig;
    use crate::connection::Connection;
    use crate::connection::testing::RecordingConnection;
    use serde_json::json;

    fn share_destination(code: &Value) -> Option<Destination> {
        serde_json::from_value(code.clone()).ok()
    }

    #[tokio::test]
    async fn test_full_handshake() {
        let state = RelayState::new(RelayConfig::default());
        let a = RecordingConnection::new();
        let b = RecordingConnection::new();

        request_share_code(&state, &a.handle()).await;
        let share = a.sent()[0]["data"].clone();
        assert!(share.is_u64());

        connection_request(&state, &b.handle(), share_destination(&share)).await;
        let ack = b.sent()[0].clone();
        assert_eq!(ack["event"], "CONNECTION_REQUEST");
        assert_eq!(ack["data"]["success"], true);
        let o1 = ack["data"]["AssignedOriginCOde"].as_str().unwrap().to_string();

        let notice = a.sent()[1].clone();
        assert_eq!(notice["event"], "CONNECTION_REQUEST");
        assert_eq!(notice["origin"], o1.as_str());
        assert!(notice.get("data").is_none());

        let resolved = state
            .registry
            .origin_codes
            .lookup(&OriginCode::new(o1.clone()))
            .await
            .unwrap();
        assert_eq!(resolved.id(), b.id());

        connection_accept(
            &state,
            &a.handle(),
            Some(OriginCode::new(o1.clone())),
            vec![json!("a.txt")],
        )
        .await;
        let accept = b.sent()[1].clone();
        assert_eq!(accept["event"], "CONNECTION_ACCEPT");
        assert_eq!(accept["data"], json!({"success": true, "files": ["a.txt"]}));
        let o2 = accept["origin"].as_str().unwrap();
        assert_ne!(o2, o1);

        let resolved = state
            .registry
            .origin_codes
            .lookup(&OriginCode::new(o2))
            .await
            .unwrap();
        assert_eq!(resolved.id(), a.id());
        assert_eq!(state.stats.snapshot().files_transferred, 1);
    }

    #[tokio::test]
    async fn test_unknown_share_code_is_refused() {
        let state = RelayState::new(RelayConfig::default());
        let a = RecordingConnection::new();
        let b = RecordingConnection::new();
        request_share_code(&state, &a.handle()).await;

        connection_request(&state, &b.handle(), share_destination(&json!(1))).await;

        assert_eq!(
            b.sent(),
            vec![json!({"event": "CONNECTION_REQUEST", "data": {"success": false}})]
        );
        // Owner untouched, requester got no address
        assert_eq!(a.sent().len(), 1);
        assert!(state.registry.origin_codes.is_empty().await);
    }

    #[tokio::test]
    async fn test_missing_destination_is_refused() {
        let state = RelayState::new(RelayConfig::default());
        let b = RecordingConnection::new();

        connection_request(&state, &b.handle(), None).await;
        assert_eq!(b.sent()[0]["data"]["success"], false);
    }

    #[tokio::test]
    async fn test_share_code_survives_use() {
        let state = RelayState::new(RelayConfig::default());
        let a = RecordingConnection::new();
        let code = ShareCode::new(555_555);
        state.registry.share_codes.register(code, a.handle()).await;

        for _ in 0..3 {
            let b = RecordingConnection::new();
            connection_request(&state, &b.handle(), share_destination(&json!("555555"))).await;
            assert_eq!(b.sent()[0]["data"]["success"], true);
        }
        // Three notices after reuse
        assert_eq!(a.sent_events(), vec!["CONNECTION_REQUEST"; 3]);
        assert!(state.registry.share_codes.lookup(&code).await.is_some());
    }

    #[tokio::test]
    async fn test_accept_to_unknown_destination_is_dropped() {
        let state = RelayState::new(RelayConfig::default());
        let a = RecordingConnection::new();

        connection_accept(
            &state,
            &a.handle(),
            Some(OriginCode::new("NOPE2345")),
            vec![json!("a.txt")],
        )
        .await;

        assert!(a.sent().is_empty());
        assert!(state.registry.origin_codes.is_empty().await);
        assert_eq!(state.stats.snapshot().files_transferred, 0);
    }
}
