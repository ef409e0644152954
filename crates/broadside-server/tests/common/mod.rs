use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use broadside_core::test_helpers::standard_fleet;
use broadside_server::build_app;
use broadside_server::config::ServerConfig;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, _state) = build_app(config);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub async fn get_json(&self, path: &str) -> Value {
        reqwest::get(format!("{}{path}", self.base_url()))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}

/// Connect a WebSocket client to the given URL.
pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

/// Connect and consume the `welcome` envelope. Returns the assigned player id.
pub async fn ws_connect_player(server: &TestServer) -> (WsStream, String) {
    let mut stream = ws_connect(&server.ws_url()).await;
    let welcome = ws_read_json(&mut stream).await;
    assert_eq!(welcome["type"], "welcome", "{welcome}");
    let id = welcome["id"].as_str().unwrap().to_string();
    (stream, id)
}

pub async fn ws_send_json(stream: &mut WsStream, value: &Value) {
    stream
        .send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}

pub async fn ws_send_text(stream: &mut WsStream, text: &str) {
    stream.send(Message::Text(text.into())).await.unwrap();
}

/// Read the next JSON envelope (5s timeout).
pub async fn ws_read_json(stream: &mut WsStream) -> Value {
    tokio::time::timeout(Duration::from_secs(5), next_json(stream))
        .await
        .expect("Timed out waiting for WebSocket message")
}

/// Try to read the next JSON envelope, returning None on timeout.
pub async fn ws_try_read_json(stream: &mut WsStream, timeout_ms: u64) -> Option<Value> {
    tokio::time::timeout(Duration::from_millis(timeout_ms), next_json(stream))
        .await
        .ok()
}

/// Read envelopes until one of the given type arrives, returning it.
pub async fn ws_read_type(stream: &mut WsStream, kind: &str) -> Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let value = next_json(stream).await;
            if value["type"] == kind {
                return value;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("Timed out waiting for {kind}"))
}

async fn next_json(stream: &mut WsStream) -> Value {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => return serde_json::from_str(text.as_str()).unwrap(),
            Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
            Some(Err(e)) => panic!("WebSocket error: {e}"),
            None => panic!("WebSocket stream ended"),
            _ => continue,
        }
    }
}

pub fn fleet_json() -> Value {
    serde_json::to_value(standard_fleet()).unwrap()
}

/// Two connected players with an accepted challenge between them.
pub struct Duel {
    pub challenger: WsStream,
    pub challenger_id: String,
    pub challenger_side: String,
    pub accepter: WsStream,
    pub accepter_id: String,
    pub accepter_side: String,
    pub match_id: String,
}

impl Duel {
    pub async fn start(server: &TestServer) -> Self {
        let (mut challenger, challenger_id) = ws_connect_player(server).await;
        let (mut accepter, accepter_id) = ws_connect_player(server).await;

        ws_send_json(
            &mut challenger,
            &json!({"type": "challenge", "target_id": accepter_id}),
        )
        .await;
        let request = ws_read_json(&mut accepter).await;
        assert_eq!(request["type"], "challenge_request");
        assert_eq!(request["from_id"], challenger_id.as_str());

        ws_send_json(
            &mut accepter,
            &json!({"type": "challenge_response", "target_id": challenger_id, "accept": true}),
        )
        .await;

        let forward = ws_read_json(&mut challenger).await;
        assert_eq!(forward["type"], "challenge_response_forward");
        assert_eq!(forward["accept"], true);
        let start_c = ws_read_json(&mut challenger).await;
        let start_a = ws_read_json(&mut accepter).await;
        assert_eq!(start_c["type"], "match_start");
        assert_eq!(start_a["type"], "match_start");
        assert_eq!(start_c["match_id"], start_a["match_id"]);

        Self {
            challenger_side: start_c["your_side"].as_str().unwrap().to_string(),
            accepter_side: start_a["your_side"].as_str().unwrap().to_string(),
            match_id: start_c["match_id"].as_str().unwrap().to_string(),
            challenger,
            challenger_id,
            accepter,
            accepter_id,
        }
    }

    /// Submit the standard fleet for both players and return the side that
    /// moves first.
    pub async fn ready(&mut self) -> String {
        let place = json!({"type": "place_ships", "match_id": self.match_id, "ships": fleet_json()});
        ws_send_json(&mut self.challenger, &place).await;
        let ok = ws_read_json(&mut self.challenger).await;
        assert_eq!(ok["type"], "ships_ok", "{ok}");

        ws_send_json(&mut self.accepter, &place).await;
        let ready_a = ws_read_type(&mut self.accepter, "all_ships_ready").await;
        let ok = ws_read_type(&mut self.accepter, "ships_ok").await;
        assert_eq!(ok["match_id"], self.match_id.as_str());
        let ready_c = ws_read_type(&mut self.challenger, "all_ships_ready").await;

        assert_eq!(ready_c["start_turn"], ready_a["start_turn"]);
        assert_eq!(ready_c["your_side"], self.challenger_side.as_str());
        assert_eq!(ready_a["your_side"], self.accepter_side.as_str());
        ready_c["start_turn"].as_str().unwrap().to_string()
    }

    /// Streams for (first mover, other player), given the starting side.
    pub fn by_turn(&mut self, start_side: &str) -> (&mut WsStream, &mut WsStream) {
        if self.challenger_side == start_side {
            (&mut self.challenger, &mut self.accepter)
        } else {
            (&mut self.accepter, &mut self.challenger)
        }
    }

    pub fn id_for_side(&self, side: &str) -> &str {
        if self.challenger_side == side {
            &self.challenger_id
        } else {
            &self.accepter_id
        }
    }

    pub fn shot(&self, x: i64, y: i64) -> Value {
        json!({"type": "shot_fired", "match_id": self.match_id, "x": x, "y": y})
    }
}

pub fn other_side(side: &str) -> &'static str {
    if side == "A" { "B" } else { "A" }
}
