//! Integration tests: a real server on an ephemeral port, driven by raw
//! TCP clients and the operator command surface.

use std::time::Duration;

use chatrelay::{ChatServer, Flow, ListenState, MemorySink, dispatch};
use chatrelay_session::ClientSession;
use chatrelay_transport::{
    Connection, Connector, TcpConnection, TcpDialer,
};

// =========================================================================
// Helpers
// =========================================================================

/// Starts a server on an ephemeral port; returns it, its operator
/// display, and the bound port.
async fn start_server() -> (ChatServer<MemorySink>, MemorySink, u32) {
    let sink = MemorySink::new();
    let server = ChatServer::start(0, sink.clone())
        .await
        .expect("server should start");
    let port = u32::from(
        server.local_addr().expect("listening").port(),
    );
    (server, sink, port)
}

async fn connect(port: u32) -> TcpConnection {
    TcpDialer
        .connect("127.0.0.1", port)
        .await
        .expect("should connect")
}

/// Connects and completes the login handshake.
async fn login(port: u32, id: &str) -> TcpConnection {
    let conn = connect(port).await;
    conn.send_line(&format!("#login {id}"))
        .await
        .expect("send login");
    settle().await;
    conn
}

/// Gives the server's tasks a moment to process what was just sent.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(80)).await;
}

async fn recv(conn: &TcpConnection) -> Option<String> {
    tokio::time::timeout(Duration::from_secs(2), conn.recv_line())
        .await
        .expect("recv should not time out")
        .expect("recv should not fail")
}

// =========================================================================
// Login handshake and relay
// =========================================================================

#[tokio::test]
async fn test_login_then_chat_relays_to_all_peers() {
    let (server, sink, port) = start_server().await;

    let alice = login(port, "alice").await;
    let bob = login(port, "bob").await;

    assert!(sink.saw("A new client has connected. Welcome!"));
    assert!(sink.saw("alice has logged on."));
    assert!(sink.saw("bob has logged on."));
    assert_eq!(server.peer_count().await, 2);

    alice.send_line("hi").await.expect("send chat");

    // The relay reaches every peer, the sender included.
    assert_eq!(recv(&alice).await.as_deref(), Some("alice> hi"));
    assert_eq!(recv(&bob).await.as_deref(), Some("alice> hi"));
    settle().await;
    assert!(sink.saw("Message received: hi from alice"));
}

#[tokio::test]
async fn test_first_line_not_login_gets_one_error_then_disconnect() {
    let (server, _sink, port) = start_server().await;

    let conn = connect(port).await;
    conn.send_line("hello without login").await.expect("send");

    // Exactly one error line, then end of stream.
    let error = recv(&conn).await.expect("error line");
    assert!(error.starts_with("ERROR - "));
    assert_eq!(recv(&conn).await, None);

    settle().await;
    assert_eq!(server.peer_count().await, 0);
}

#[tokio::test]
async fn test_second_login_rejected_only_to_that_peer() {
    let (_server, _sink, port) = start_server().await;

    let alice = login(port, "alice").await;
    let bob = login(port, "bob").await;

    alice.send_line("#login again").await.expect("send");
    let error = recv(&alice).await.expect("error line");
    assert!(error.starts_with("ERROR - Login"));

    // Alice is still in: her next chat line reaches bob, and bob never
    // saw the login error.
    alice.send_line("still here").await.expect("send");
    assert_eq!(recv(&bob).await.as_deref(), Some("alice> still here"));
    assert_eq!(recv(&alice).await.as_deref(), Some("alice> still here"));
}

// =========================================================================
// Operator commands
// =========================================================================

#[tokio::test]
async fn test_setport_rejected_while_peer_connected() {
    let (mut server, sink, port) = start_server().await;
    let _alice = login(port, "alice").await;

    let flow = dispatch("#setport 6000", &mut server).await;

    assert_eq!(flow, Flow::Continue);
    assert!(sink.saw("ERROR - the port can only be changed"));
    // The configured port is unchanged.
    assert_eq!(server.port().await, port);
}

#[tokio::test]
async fn test_stop_rejects_new_peers_and_keeps_existing() {
    let (mut server, sink, port) = start_server().await;
    let alice = login(port, "alice").await;

    dispatch("#stop", &mut server).await;
    assert!(sink.saw("Server has stopped listening for connections."));
    assert_eq!(server.state().await, ListenState::Stopped);

    // A newcomer is turned away at admission.
    let rejected = connect(port).await;
    assert_eq!(recv(&rejected).await, None);

    // The existing peer still receives operator broadcasts.
    dispatch("the relay is paused", &mut server).await;
    assert_eq!(
        recv(&alice).await.as_deref(),
        Some("SERVER MESSAGE> the relay is paused")
    );
    assert!(sink.saw("the relay is paused"));
    assert_eq!(server.peer_count().await, 1);
}

#[tokio::test]
async fn test_stop_twice_reports_already_stopped() {
    let (mut server, sink, _port) = start_server().await;

    dispatch("#stop", &mut server).await;
    dispatch("#stop", &mut server).await;

    assert!(sink.saw("ERROR - the server is already stopped"));
    assert_eq!(server.state().await, ListenState::Stopped);
}

#[tokio::test]
async fn test_close_disconnects_every_peer() {
    let (mut server, sink, port) = start_server().await;
    let alice = login(port, "alice").await;
    let bob = login(port, "bob").await;

    dispatch("#close", &mut server).await;

    assert!(sink.saw("The server has closed."));
    assert_eq!(server.state().await, ListenState::Closed);
    assert_eq!(server.peer_count().await, 0);
    assert_eq!(recv(&alice).await, None);
    assert_eq!(recv(&bob).await, None);
}

#[tokio::test]
async fn test_start_after_stop_rebinds_and_admits_again() {
    let (mut server, sink, port) = start_server().await;

    dispatch("#stop", &mut server).await;
    dispatch("#start", &mut server).await;

    assert_eq!(server.state().await, ListenState::Listening);
    assert!(
        sink.lines()
            .iter()
            .filter(|l| l.contains("Server listening for connections"))
            .count()
            >= 2
    );

    // The rebound socket accepts and relays as before.
    let alice = login(port, "alice").await;
    let bob = login(port, "bob").await;
    alice.send_line("back online").await.expect("send");
    assert_eq!(recv(&bob).await.as_deref(), Some("alice> back online"));
}

#[tokio::test]
async fn test_setport_allowed_once_closed() {
    let (mut server, sink, _port) = start_server().await;

    dispatch("#close", &mut server).await;
    dispatch("#setport 6000", &mut server).await;
    dispatch("#getport", &mut server).await;

    assert!(sink.saw("The port has now been set to 6000."));
    assert!(sink.saw("The port is 6000."));
    assert_eq!(server.port().await, 6000);
}

#[tokio::test]
async fn test_start_while_listening_is_rejected() {
    let (mut server, sink, port) = start_server().await;

    dispatch("#start", &mut server).await;

    assert!(sink.saw("ERROR - the server is already listening"));
    // Still on the original socket.
    assert_eq!(
        server.local_addr().map(|a| u32::from(a.port())),
        Some(port)
    );
}

#[tokio::test]
async fn test_quit_closes_peers_and_terminates_flow() {
    let (mut server, sink, port) = start_server().await;
    let alice = login(port, "alice").await;

    let flow = dispatch("#quit", &mut server).await;

    assert_eq!(flow, Flow::Terminate);
    assert!(sink.saw("Terminating the server."));
    assert_eq!(recv(&alice).await, None);
}

#[tokio::test]
async fn test_client_commands_not_recognized_on_server_console() {
    let (mut server, sink, _port) = start_server().await;

    dispatch("#sethost example.org", &mut server).await;
    dispatch("#login", &mut server).await;

    assert_eq!(
        sink.lines()
            .iter()
            .filter(|l| l.contains("not recognized"))
            .count(),
        2
    );
}

// =========================================================================
// Client session end-to-end
// =========================================================================

#[tokio::test]
async fn test_client_session_login_chat_and_reconfigure() {
    let (_server, server_sink, port) = start_server().await;

    let client_sink = MemorySink::new();
    let mut client = ClientSession::new(
        "alice",
        "127.0.0.1",
        port,
        TcpDialer,
        client_sink.clone(),
    );

    client.login().await.expect("client login");
    settle().await;
    assert!(client_sink.saw("alice has logged on."));
    assert!(server_sink.saw("alice has logged on."));

    let bob = login(port, "bob").await;

    // #sethost is illegal while connected.
    dispatch("#sethost 10.0.0.1", &mut client).await;
    assert!(client_sink.saw("ERROR - cannot change the host"));
    assert_eq!(client.host(), "127.0.0.1");

    // Chat flows through to the other peer, tagged.
    let flow = dispatch("hi", &mut client).await;
    assert_eq!(flow, Flow::Continue);
    assert_eq!(recv(&bob).await.as_deref(), Some("alice> hi"));

    // After #logoff the same reconfiguration succeeds.
    dispatch("#logoff", &mut client).await;
    assert!(client_sink.saw("Connection closed."));
    settle().await;
    assert!(server_sink.saw("A client has disconnected. Have a nice day!"));

    dispatch("#sethost 10.0.0.1", &mut client).await;
    dispatch("#gethost", &mut client).await;
    assert_eq!(client.host(), "10.0.0.1");
    assert!(client_sink.saw("The host is 10.0.0.1."));
}

#[tokio::test]
async fn test_client_session_login_failure_stays_down() {
    // Learn a free port, then release it before the client dials.
    let probe = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("probe bind");
    let dead_port =
        u32::from(probe.local_addr().expect("probe addr").port());
    drop(probe);

    let sink = MemorySink::new();
    let mut client = ClientSession::new(
        "alice",
        "127.0.0.1",
        dead_port,
        TcpDialer,
        sink.clone(),
    );

    assert!(client.login().await.is_err());
    assert!(!client.is_connected());

    // A later #login against a live server succeeds.
    let (_server, _server_sink, port) = start_server().await;
    client.set_port(port).expect("set port while down");
    dispatch("#login", &mut client).await;
    assert!(client.is_connected());
    assert!(sink.saw("alice has logged on."));
}
