use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tracing::{debug, warn};

use wishlist_rooms::{ConnectionState, RoomRegistry};
use wishlist_types::WishlistSlug;

use crate::error::ServerResult;
use crate::handler::{parse_slug, AppState};

/// Upgrade to a server-push connection joined to the wishlist's room.
///
/// Unknown wishlists are rejected before the upgrade, so rooms only ever
/// exist for stored wishlists.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> ServerResult<Response> {
    let wishlist = state.catalog.find_wishlist(&parse_slug(&slug)?).await?;
    let rooms = state.rooms.clone();
    Ok(ws.on_upgrade(move |socket| async move {
        let (outgoing, incoming) = socket.split();
        run_connection(incoming, outgoing, rooms, wishlist.slug).await;
    }))
}

/// Forward room events to `outgoing` until either side goes away.
///
/// Client messages are read only to notice close frames and errors.
/// Returns the state the connection ended in before it was removed:
/// `Leaving` for a close or hang-up, `Dropped` for a transport failure.
pub(crate) async fn run_connection<R, W, E>(
    mut incoming: R,
    mut outgoing: W,
    rooms: Arc<RoomRegistry>,
    slug: WishlistSlug,
) -> ConnectionState
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    W: Sink<Message> + Unpin,
    W::Error: Display,
    E: Display,
{
    let (mut conn, handle) = rooms.connect(slug.clone());
    if let Err(e) = rooms.join(handle) {
        warn!(%slug, error = %e, "could not join room");
        return conn.state();
    }

    loop {
        tokio::select! {
            event = conn.recv() => {
                let Some(event) = event else { break };
                let text = match event.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(%slug, error = %e, "could not encode room event");
                        continue;
                    }
                };
                if let Err(e) = outgoing.send(Message::Text(text)).await {
                    debug!(%slug, connection = %conn.id(), error = %e, "send failed");
                    let _ = conn.mark_dropped();
                    break;
                }
            }
            message = incoming.next() => match message {
                Some(Ok(Message::Close(_))) | None => {
                    let _ = conn.begin_leave();
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(%slug, connection = %conn.id(), error = %e, "socket error");
                    let _ = conn.mark_dropped();
                    break;
                }
            },
        }
    }

    let ended = conn.state();
    rooms.leave(&slug, conn.id());
    debug!(%slug, connection = %conn.id(), state = ?ended, "connection closed");
    ended
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::time::Duration;

    use futures::channel::mpsc;
    use rust_decimal::Decimal;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    use wishlist_claims::{NewItem, Requester};
    use wishlist_types::UserId;

    use crate::{ServerConfig, WishlistServer};

    /// A socket driven from the test: frames pushed into `to_server` arrive
    /// at the connection, frames it sends land in `from_server`.
    struct FakeClient {
        to_server: mpsc::UnboundedSender<Result<Message, String>>,
        from_server: mpsc::UnboundedReceiver<Message>,
        task: JoinHandle<ConnectionState>,
    }

    fn open(rooms: &Arc<RoomRegistry>, slug: &WishlistSlug) -> FakeClient {
        let (to_server, incoming) = mpsc::unbounded();
        let (outgoing, from_server) = mpsc::unbounded();
        let task = tokio::spawn(run_connection(
            incoming,
            outgoing,
            rooms.clone(),
            slug.clone(),
        ));
        FakeClient {
            to_server,
            from_server,
            task,
        }
    }

    async fn wait_until(condition: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn claim_reaches_socket_and_close_removes_room() {
        let server = WishlistServer::new(ServerConfig::default());
        let state = server.state().clone();
        let owner = UserId::new();
        let wishlist = state
            .catalog
            .create_wishlist(owner, "Party", None)
            .await
            .unwrap();
        let item = state
            .catalog
            .add_item(
                &wishlist.slug,
                owner,
                NewItem {
                    title: "Kite".into(),
                    url: None,
                    price: Decimal::from(15),
                    image_url: None,
                    is_group_gift: false,
                },
            )
            .await
            .unwrap();

        let mut client = open(&state.rooms, &wishlist.slug);
        wait_until(|| state.rooms.contains_room(&wishlist.slug)).await;

        state
            .engine
            .reserve_item(item.id, &Requester::guest("Ivy"))
            .await
            .unwrap();
        let frame = tokio::time::timeout(Duration::from_secs(2), client.from_server.next())
            .await
            .unwrap()
            .unwrap();
        let Message::Text(text) = frame else {
            panic!("expected a text frame, got {frame:?}");
        };
        let event: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            event,
            json!({ "type": "wishlist_updated", "slug": wishlist.slug.as_str() })
        );

        client
            .to_server
            .unbounded_send(Ok(Message::Close(None)))
            .unwrap();
        assert_eq!(client.task.await.unwrap(), ConnectionState::Leaving);
        assert!(!state.rooms.contains_room(&wishlist.slug));
    }

    #[tokio::test]
    async fn socket_error_drops_connection() {
        let rooms = Arc::new(RoomRegistry::default());
        let slug = WishlistSlug::generate();
        let client = open(&rooms, &slug);
        wait_until(|| rooms.contains_room(&slug)).await;

        client
            .to_server
            .unbounded_send(Err("connection reset".into()))
            .unwrap();
        assert_eq!(client.task.await.unwrap(), ConnectionState::Dropped);
        assert!(!rooms.contains_room(&slug));
    }

    #[tokio::test]
    async fn hang_up_counts_as_leaving() {
        let rooms = Arc::new(RoomRegistry::default());
        let slug = WishlistSlug::generate();
        let FakeClient {
            to_server, task, ..
        } = open(&rooms, &slug);
        wait_until(|| rooms.contains_room(&slug)).await;

        drop(to_server);
        assert_eq!(task.await.unwrap(), ConnectionState::Leaving);
        assert_eq!(rooms.room_count(), 0);
    }

    #[tokio::test]
    async fn failed_send_drops_connection() {
        let rooms = Arc::new(RoomRegistry::default());
        let slug = WishlistSlug::generate();
        let FakeClient {
            to_server,
            from_server,
            task,
        } = open(&rooms, &slug);
        wait_until(|| rooms.contains_room(&slug)).await;

        drop(from_server);
        rooms.broadcast(&slug, &wishlist_rooms::RoomEvent::wishlist_updated(slug.clone()));
        assert_eq!(task.await.unwrap(), ConnectionState::Dropped);
        assert!(!rooms.contains_room(&slug));
        drop(to_server);
    }

    async fn request_upgrade(addr: SocketAddr, slug: &str) -> (TcpStream, String) {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "GET /ws/{slug} HTTP/1.1\r\n\
             Host: {addr}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Version: 13\r\n\
             Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n"
        );
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut head = Vec::new();
        let mut buf = [0u8; 512];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before the response head");
            head.extend_from_slice(&buf[..n]);
        }
        (stream, String::from_utf8_lossy(&head).into_owned())
    }

    #[tokio::test]
    async fn upgrade_requires_stored_wishlist() {
        let server = WishlistServer::new(ServerConfig::default());
        let state = server.state().clone();
        let wishlist = state
            .catalog
            .create_wishlist(UserId::new(), "Graduation", None)
            .await
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = server.router();
        tokio::spawn(async move { axum::serve(listener, app).await });

        let unknown = WishlistSlug::generate();
        let (_, head) = request_upgrade(addr, unknown.as_str()).await;
        assert!(head.starts_with("HTTP/1.1 404"), "{head}");
        assert!(!state.rooms.contains_room(&unknown));

        let (stream, head) = request_upgrade(addr, wishlist.slug.as_str()).await;
        assert!(head.starts_with("HTTP/1.1 101"), "{head}");
        wait_until(|| state.rooms.contains_room(&wishlist.slug)).await;

        drop(stream);
        wait_until(|| !state.rooms.contains_room(&wishlist.slug)).await;
    }
}
