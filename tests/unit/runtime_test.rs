//! Tests for tokio spawner utilities

use retry_lot::core::SchedulerError;
use retry_lot::runtime::tokio_spawner::TokioSpawner;
use tokio::task::JoinSet;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn_into() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());

    let (tx, rx) = tokio::sync::oneshot::channel();
    let mut set = JoinSet::new();
    spawner.spawn_into(&mut set, async move {
        tx.send(123).unwrap();
    });

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
    assert!(set.join_next().await.unwrap().is_ok());
}

#[tokio::test]
async fn test_tokio_spawner_current_inside_runtime() {
    assert!(TokioSpawner::current().is_ok());
}

#[test]
fn test_tokio_spawner_current_outside_runtime() {
    assert!(matches!(
        TokioSpawner::current(),
        Err(SchedulerError::Runtime(_))
    ));
}

#[test]
fn test_tokio_spawner_owned_runtime_block_on() {
    let spawner = TokioSpawner::with_worker_threads(2).unwrap();
    let value = spawner
        .block_on(async {
            tokio::task::spawn(async { 21 * 2 }).await.unwrap()
        })
        .unwrap();
    assert_eq!(value, 42);
}

#[tokio::test]
async fn test_tokio_spawner_block_on_requires_owned_runtime() {
    let spawner = TokioSpawner::current().unwrap();
    assert!(matches!(
        spawner.block_on(async {}),
        Err(SchedulerError::Runtime(_))
    ));
}
