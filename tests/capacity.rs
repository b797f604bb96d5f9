mod support;

use support::{connect, is_type, next_matching, player_ids, setup_player};

#[tokio::test]
async fn when_grid_is_full_then_ninth_player_gets_error_and_is_not_added() {
    let (mut observer, observer_id) = connect().await;

    let mut racers = Vec::new();
    for i in 0..8 {
        let (mut ws, _) = connect().await;
        setup_player(&mut ws, &format!("Racer{i}")).await;
        racers.push(ws);
    }

    let full = next_matching(&mut observer, |v| {
        is_type(v, "gameStateUpdate") && player_ids(v).len() == 8
    })
    .await;
    assert!(!player_ids(&full).contains(&observer_id));

    setup_player(&mut observer, "Latecomer").await;

    let error = next_matching(&mut observer, |v| is_type(v, "error")).await;
    assert_eq!(error["message"], "Game is full! Maximum 8 players allowed.");

    let after = next_matching(&mut observer, |v| is_type(v, "gameStateUpdate")).await;
    let ids = player_ids(&after);
    assert_eq!(ids.len(), 8);
    assert!(!ids.contains(&observer_id));

    drop(racers);
}
