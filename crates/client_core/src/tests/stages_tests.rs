use std::sync::{Arc, Mutex};

use tokio::time::Instant;

use super::*;

fn assert_near(actual: Duration, expected: Duration) {
    let diff = if actual > expected {
        actual - expected
    } else {
        expected - actual
    };
    assert!(
        diff <= Duration::from_millis(1),
        "expected ~{expected:?}, got {actual:?}"
    );
}

#[test]
fn stage_table_is_ordered_and_complete() {
    assert_eq!(Stage::ALL.len(), STAGE_COUNT);
    for (index, stage) in Stage::ALL.iter().enumerate() {
        assert_eq!(stage.index(), index);
        assert_eq!(Stage::from_index(index), Some(*stage));
    }
    assert_eq!(Stage::from_index(STAGE_COUNT), None);
    assert_eq!(Stage::Connecting.text(), "Connecting to Traffic AI...");
    assert_eq!(Stage::Generating.tag(), "target");
}

#[tokio::test(start_paused = true)]
async fn timed_stages_tick_in_order_with_fixed_dwell() {
    let sequencer = TimedStages::default();
    let started = Instant::now();
    let mut seen = Vec::new();

    sequencer
        .run(&mut |stage, index| seen.push((stage, index, started.elapsed())))
        .await;

    let indices: Vec<usize> = seen.iter().map(|(_, index, _)| *index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    for (i, (stage, _, at)) in seen.iter().enumerate() {
        assert_eq!(*stage, Stage::ALL[i]);
        assert_near(*at, Duration::from_millis(700) * i as u32);
    }
    assert_near(started.elapsed(), Duration::from_millis(700 * 6));
}

#[tokio::test(start_paused = true)]
async fn run_resolves_only_after_last_dwell() {
    let sequencer = TimedStages::new(Duration::from_millis(50));
    let ticks = Arc::new(Mutex::new(Vec::new()));
    let recorded = ticks.clone();

    let handle = tokio::spawn(async move {
        sequencer
            .run(&mut |_, index| recorded.lock().expect("ticks").push(index))
            .await;
    });

    tokio::time::sleep(Duration::from_millis(260)).await;
    assert_eq!(*ticks.lock().expect("ticks"), vec![0, 1, 2, 3, 4, 5]);
    assert!(!handle.is_finished());

    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.await.expect("sequencer task");
}
