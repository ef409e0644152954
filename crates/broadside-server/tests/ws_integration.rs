#[allow(dead_code)]
mod common;

use serde_json::json;

use broadside_server::config::{LimitsConfig, MatchesConfig, ServerConfig};
use common::{
    Duel, TestServer, fleet_json, other_side, ws_connect_player, ws_read_json, ws_read_type,
    ws_send_json, ws_send_text, ws_try_read_json,
};

#[tokio::test]
async fn welcome_then_join_ack() {
    let server = TestServer::new().await;
    let (mut stream, id) = ws_connect_player(&server).await;
    assert!(!id.is_empty());

    ws_send_json(&mut stream, &json!({"type": "join", "name": ""})).await;
    let ack = ws_read_json(&mut stream).await;
    assert_eq!(ack["type"], "join_ack");
    assert_eq!(ack["id"], id.as_str());
    assert_eq!(ack["name"], format!("Player-{}", &id[..8]).as_str());

    ws_send_json(&mut stream, &json!({"type": "join", "name": "Alice"})).await;
    let ack = ws_read_json(&mut stream).await;
    assert_eq!(ack["name"], "Alice");
}

#[tokio::test]
async fn unknown_types_are_ignored_and_garbage_is_reported() {
    let server = TestServer::new().await;
    let (mut stream, _) = ws_connect_player(&server).await;

    ws_send_json(&mut stream, &json!({"type": "emote", "kind": "wave"})).await;
    assert!(ws_try_read_json(&mut stream, 200).await.is_none());

    ws_send_text(&mut stream, "not json").await;
    let err = ws_read_json(&mut stream).await;
    assert_eq!(err, json!({"type": "error", "error": "bad_message"}));

    // Connection stays usable after a protocol error.
    ws_send_json(&mut stream, &json!({"type": "join", "name": "Still here"})).await;
    assert_eq!(ws_read_json(&mut stream).await["type"], "join_ack");
}

#[tokio::test]
async fn challenge_to_missing_player_creates_no_match() {
    let server = TestServer::new().await;
    let (mut stream, _) = ws_connect_player(&server).await;

    ws_send_json(&mut stream, &json!({"type": "challenge", "target_id": "ghost"})).await;
    let err = ws_read_json(&mut stream).await;
    assert_eq!(err, json!({"type": "error", "error": "target_not_found"}));

    let games = server.get_json("/api/games").await;
    assert_eq!(games, json!([]));
}

#[tokio::test]
async fn self_challenge_is_rejected() {
    let server = TestServer::new().await;
    let (mut stream, id) = ws_connect_player(&server).await;

    ws_send_json(&mut stream, &json!({"type": "challenge", "target_id": id})).await;
    let err = ws_read_json(&mut stream).await;
    assert_eq!(err["error"], "cannot_challenge_self");
}

#[tokio::test]
async fn declined_challenge_is_forwarded_without_match() {
    let server = TestServer::new().await;
    let (mut x, x_id) = ws_connect_player(&server).await;
    let (mut y, y_id) = ws_connect_player(&server).await;

    ws_send_json(&mut y, &json!({"type": "join", "name": "Yara"})).await;
    ws_read_json(&mut y).await;
    ws_send_json(&mut x, &json!({"type": "join", "name": "Xavi"})).await;
    ws_read_json(&mut x).await;

    ws_send_json(&mut x, &json!({"type": "challenge", "target_id": y_id})).await;
    let request = ws_read_json(&mut y).await;
    assert_eq!(request["type"], "challenge_request");
    assert_eq!(request["from_id"], x_id.as_str());
    assert_eq!(request["from_name"], "Xavi");

    ws_send_json(
        &mut y,
        &json!({"type": "challenge_response", "target_id": x_id, "accept": false}),
    )
    .await;
    let forward = ws_read_json(&mut x).await;
    assert_eq!(forward["type"], "challenge_response_forward");
    assert_eq!(forward["from_id"], y_id.as_str());
    assert_eq!(forward["from_name"], "Yara");
    assert_eq!(forward["accept"], false);
    assert_eq!(forward["target_id"], x_id.as_str());

    assert!(ws_try_read_json(&mut x, 200).await.is_none());
    assert!(ws_try_read_json(&mut y, 100).await.is_none());
    assert_eq!(server.get_json("/api/games").await, json!([]));
}

#[tokio::test]
async fn response_to_departed_challenger_is_an_error() {
    let server = TestServer::new().await;
    let (mut y, _) = ws_connect_player(&server).await;

    ws_send_json(
        &mut y,
        &json!({"type": "challenge_response", "target_id": "gone", "accept": true}),
    )
    .await;
    let err = ws_read_json(&mut y).await;
    assert_eq!(err["error"], "challenger_not_connected");
}

#[tokio::test]
async fn match_start_assigns_opposite_sides() {
    let server = TestServer::new().await;
    let duel = Duel::start(&server).await;
    assert_eq!(other_side(&duel.challenger_side), duel.accepter_side);

    let games = server.get_json("/api/games").await;
    let game = &games[0];
    assert_eq!(game["match_id"], duel.match_id.as_str());
    assert_eq!(game["state"], "awaiting_fleets");
    assert_eq!(game["readyA"], false);
    assert_eq!(
        game[format!("player{}_id", duel.challenger_side)],
        duel.challenger_id.as_str()
    );
}

#[tokio::test]
async fn full_match_miss_then_destroyer_sinks() {
    let server = TestServer::new().await;
    let mut duel = Duel::start(&server).await;
    let start = duel.ready().await;
    let second = other_side(&start);
    let first_id = duel.id_for_side(&start).to_string();
    let second_id = duel.id_for_side(second).to_string();
    let miss = duel.shot(9, 9);
    let hits = [duel.shot(0, 8), duel.shot(1, 8)];
    let (first, other) = duel.by_turn(&start);

    // Miss on open water passes the turn.
    ws_send_json(first, &miss).await;
    for stream in [&mut *first, &mut *other] {
        let result = ws_read_json(stream).await;
        assert_eq!(result["type"], "shot_result");
        assert_eq!(result["hit"], false);
        assert_eq!(result["message"], "miss");
        assert_eq!(result["game_over"], false);
        assert_eq!(result["shooter_id"], first_id.as_str());
        assert_eq!(result["target_id"], second_id.as_str());
        assert_eq!(result["next_turn"], second);
    }

    // Two hits on the 2-cell destroyer sink it.
    for shot in &hits {
        ws_send_json(other, shot).await;
    }
    for stream in [&mut *first, &mut *other] {
        let first_hit = ws_read_json(stream).await;
        assert_eq!(first_hit["hit"], true);
        assert_eq!(first_hit["next_turn"], second);

        let second_hit = ws_read_json(stream).await;
        assert_eq!(second_hit["type"], "shot_result");
        assert_eq!(second_hit["hit"], true);

        let sunk = ws_read_json(stream).await;
        assert_eq!(sunk["type"], "ship_sunk");
        assert_eq!(sunk["ship_type"], "destroyer");
        assert_eq!(sunk["owner_id"], first_id.as_str());
        assert_eq!(sunk["by_id"], second_id.as_str());
    }

    let games = server.get_json("/api/games").await;
    assert_eq!(games[0]["state"], "in_progress");
    assert_eq!(games[0]["turn"], second);
}

#[tokio::test]
async fn out_of_turn_and_repeated_shots_are_rejected() {
    let server = TestServer::new().await;
    let mut duel = Duel::start(&server).await;
    let start = duel.ready().await;
    let carrier = duel.shot(0, 0);
    let (first, other) = duel.by_turn(&start);

    ws_send_json(other, &carrier).await;
    let err = ws_read_json(other).await;
    assert_eq!(err, json!({"type": "shot_error", "error": "not_your_turn"}));

    ws_send_json(first, &carrier).await;
    assert_eq!(ws_read_json(first).await["hit"], true);
    assert_eq!(ws_read_json(other).await["hit"], true);

    ws_send_json(first, &carrier).await;
    let err = ws_read_json(first).await;
    assert_eq!(err, json!({"type": "shot_error", "error": "already_shot"}));
    assert!(ws_try_read_json(other, 200).await.is_none());
}

#[tokio::test]
async fn placement_and_payload_errors() {
    let server = TestServer::new().await;
    let mut duel = Duel::start(&server).await;
    let stream = &mut duel.challenger;

    let mut fleet = fleet_json();
    fleet[0]["x"] = json!(8);
    ws_send_json(
        stream,
        &json!({"type": "place_ships", "match_id": duel.match_id, "ships": fleet}),
    )
    .await;
    let err = ws_read_json(stream).await;
    assert_eq!(err, json!({"type": "ships_error", "error": "out_of_bounds:carrier"}));

    ws_send_json(
        stream,
        &json!({"type": "place_ships", "match_id": duel.match_id, "ships": "lots"}),
    )
    .await;
    assert_eq!(ws_read_json(stream).await["error"], "bad_place_ships");

    ws_send_json(
        stream,
        &json!({"type": "shot_fired", "match_id": duel.match_id, "x": "a", "y": 1}),
    )
    .await;
    let err = ws_read_json(stream).await;
    assert_eq!(err, json!({"type": "error", "error": "bad_shot_payload"}));

    ws_send_json(
        stream,
        &json!({"type": "shot_fired", "match_id": "nope", "x": 1, "y": 1}),
    )
    .await;
    assert_eq!(ws_read_json(stream).await["error"], "match_not_found");

    // Shots before both fleets are in are out of turn.
    ws_send_json(
        stream,
        &json!({"type": "shot_fired", "match_id": duel.match_id, "x": 1, "y": 1}),
    )
    .await;
    assert_eq!(ws_read_json(stream).await["error"], "not_your_turn");

    ws_send_json(
        stream,
        &json!({"type": "place_ships", "match_id": duel.match_id, "ships": fleet_json()}),
    )
    .await;
    assert_eq!(ws_read_json(stream).await["type"], "ships_ok");
    ws_send_json(
        stream,
        &json!({"type": "place_ships", "match_id": duel.match_id, "ships": fleet_json()}),
    )
    .await;
    assert_eq!(ws_read_json(stream).await["error"], "ships_already_placed");
}

#[tokio::test]
async fn disconnect_forfeits_to_opponent() {
    let server = TestServer::new().await;
    let mut duel = Duel::start(&server).await;
    duel.ready().await;

    duel.challenger.close(None).await.unwrap();

    let forfeit = ws_read_type(&mut duel.accepter, "match_forfeit").await;
    assert_eq!(forfeit["match_id"], duel.match_id.as_str());
    assert_eq!(forfeit["winner_id"], duel.accepter_id.as_str());
    assert_eq!(forfeit["loser_id"], duel.challenger_id.as_str());

    let games = server.get_json("/api/games").await;
    assert_eq!(games[0]["state"], "finished");
    assert_eq!(games[0]["winner_id"], duel.accepter_id.as_str());

    // The finished match rejects further shots.
    let shot = duel.shot(0, 0);
    ws_send_json(&mut duel.accepter, &shot).await;
    assert_eq!(ws_read_json(&mut duel.accepter).await["error"], "match_finished");
}

#[tokio::test]
async fn disconnect_keeps_match_when_forfeit_disabled() {
    let config = ServerConfig {
        matches: MatchesConfig {
            forfeit_on_disconnect: false,
        },
        ..ServerConfig::default()
    };
    let server = TestServer::from_config(config).await;
    let mut duel = Duel::start(&server).await;

    duel.challenger.close(None).await.unwrap();
    assert!(ws_try_read_json(&mut duel.accepter, 300).await.is_none());

    let games = server.get_json("/api/games").await;
    assert_eq!(games[0]["state"], "awaiting_fleets");
}

#[tokio::test]
async fn connection_cap_rejects_upgrade() {
    let config = ServerConfig {
        limits: LimitsConfig {
            max_ws_connections: 1,
            ..LimitsConfig::default()
        },
        ..ServerConfig::default()
    };
    let server = TestServer::from_config(config).await;
    let (_first, _) = ws_connect_player(&server).await;

    let second = tokio_tungstenite::connect_async(server.ws_url()).await;
    assert!(second.is_err());
}

#[tokio::test]
async fn oversized_frame_closes_connection() {
    let server = TestServer::new().await;
    let (mut stream, id) = ws_connect_player(&server).await;

    let name = "x".repeat(1024);
    ws_send_json(&mut stream, &json!({"type": "join", "name": name})).await;

    // The player disappears from the registry once the read loop exits.
    let mut gone = false;
    for _ in 0..50 {
        let players = server.get_json("/api/players").await;
        if !players.as_array().unwrap().iter().any(|p| p["id"] == id.as_str()) {
            gone = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert!(gone);
}
