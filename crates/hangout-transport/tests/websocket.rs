//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener and a real client so frames actually
//! cross a socket.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use hangout_transport::{
        Connection, DEFAULT_MAX_FRAME_BYTES, Transport, TransportError, WebSocketConnection,
        WebSocketTransport,
    };
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on an OS-assigned port, connects one client and returns both
    /// ends of the connection.
    async fn connected_pair() -> (WebSocketConnection, ClientWs) {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        pair_on(transport).await
    }

    async fn pair_on(mut transport: WebSocketTransport) -> (WebSocketConnection, ClientWs) {
        let addr = transport.local_addr().expect("local addr");

        let server = tokio::spawn(async move { transport.accept().await.expect("should accept") });

        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        let conn = server.await.expect("accept task should complete");
        (conn, client)
    }

    #[tokio::test]
    async fn test_websocket_json_goes_out_as_text_frame() {
        let (conn, mut client) = connected_pair().await;
        assert!(conn.id().into_inner() > 0);

        conn.send(br#"{"event":"connected"}"#).await.expect("send");

        let msg = client.next().await.unwrap().unwrap();
        match msg {
            Message::Text(text) => assert_eq!(text.as_str(), r#"{"event":"connected"}"#),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_websocket_non_utf8_goes_out_as_binary_frame() {
        let (conn, mut client) = connected_pair().await;

        conn.send(&[0xff, 0x00, 0xfe]).await.expect("send");

        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_binary());
        assert_eq!(msg.into_data().as_ref(), &[0xff, 0x00, 0xfe]);
    }

    #[tokio::test]
    async fn test_websocket_recv_accepts_text_and_binary() {
        let (conn, mut client) = connected_pair().await;

        client.send(Message::text("hello")).await.unwrap();
        client
            .send(Message::binary(b"bytes".to_vec()))
            .await
            .unwrap();

        let first = conn.recv().await.expect("recv").expect("data");
        let second = conn.recv().await.expect("recv").expect("data");
        assert_eq!(first, b"hello");
        assert_eq!(second, b"bytes");
    }

    #[tokio::test]
    async fn test_websocket_send_while_recv_is_pending() {
        // The read half is parked waiting for the client while the write
        // half delivers a broadcast. With a single shared lock this would
        // deadlock until the client spoke first.
        let (conn, mut client) = connected_pair().await;
        let conn = std::sync::Arc::new(conn);

        let reader = {
            let conn = std::sync::Arc::clone(&conn);
            tokio::spawn(async move { conn.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(1), conn.send(b"broadcast"))
            .await
            .expect("send must not wait for the reader")
            .expect("send");
        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"broadcast");

        client.send(Message::text("reply")).await.unwrap();
        let got = reader.await.unwrap().expect("recv").expect("data");
        assert_eq!(got, b"reply");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (conn, mut client) = connected_pair().await;

        client.send(Message::Close(None)).await.unwrap();

        let result = conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_default_frame_cap() {
        let transport = WebSocketTransport::bind("127.0.0.1:0").await.unwrap();
        assert_eq!(transport.max_frame_bytes(), DEFAULT_MAX_FRAME_BYTES);
    }

    #[tokio::test]
    async fn test_websocket_oversized_frame_is_refused_and_socket_survives() {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .unwrap()
            .with_max_frame_bytes(8);
        let (conn, mut client) = pair_on(transport).await;

        client.send(Message::text("far too long a frame")).await.unwrap();
        client.send(Message::text("short")).await.unwrap();

        match conn.recv().await {
            Err(TransportError::FrameTooLarge { len, max }) => {
                assert_eq!(len, 20);
                assert_eq!(max, 8);
            }
            other => panic!("expected FrameTooLarge, got {other:?}"),
        }
        let next = conn.recv().await.expect("recv").expect("data");
        assert_eq!(next, b"short");
    }

    #[tokio::test]
    async fn test_websocket_ids_differ_per_connection() {
        let (a, _client_a) = connected_pair().await;
        let (b, _client_b) = connected_pair().await;
        assert_ne!(a.id(), b.id());
    }
}
