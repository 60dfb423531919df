//! Whole-cluster integration: coordinator plus workers over the hub

use canopy::{values, AttributeObject, ClusterConfig, MemoryHub, SyncNode};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn build_cluster(worker_count: usize) -> (SyncNode, Vec<SyncNode>) {
    let config = ClusterConfig::default();
    let hub = MemoryHub::new();
    let mut coordinator = SyncNode::new(Box::new(hub.register(config.coordinator_name())), true);

    let mut workers = Vec::new();
    for name in config.worker_names(worker_count) {
        let mut worker = SyncNode::new(Box::new(hub.register(&name)), false);
        worker.connect_to(config.coordinator_name()).unwrap();
        coordinator.connect_to(&name).unwrap();
        worker.register_object(Box::new(
            AttributeObject::new("screen").with_attribute("brightness", values![1.0]),
        ));
        workers.push(worker);
    }
    (coordinator, workers)
}

fn run_rounds(coordinator: &mut SyncNode, workers: &mut [SyncNode], rounds: usize) {
    for _ in 0..rounds {
        coordinator.run_iteration();
        for worker in workers.iter_mut() {
            worker.run_iteration();
        }
    }
}

#[test]
fn coordinator_command_lands_on_every_worker() {
    let (mut coordinator, mut workers) = build_cluster(2);
    run_rounds(&mut coordinator, &mut workers, 4);

    for name in ["render_0", "render_1"] {
        assert!(coordinator.send_command_to(name, "screen", "brightness", values![0.25]));
    }
    run_rounds(&mut coordinator, &mut workers, 5);

    for worker in &workers {
        assert_eq!(
            worker.object_attribute("screen", "brightness"),
            Some(values![0.25]),
            "{} missed the command",
            worker.name()
        );
    }
    // The coordinator sees the updated mirrors too.
    for name in ["render_0", "render_1"] {
        assert_eq!(
            coordinator
                .tree()
                .get_value_for_leaf_at(&format!("/{name}/objects/screen/attributes/brightness")),
            Some(values![0.25])
        );
    }
}

#[test]
fn worker_state_flows_between_workers_through_the_coordinator() {
    let (mut coordinator, mut workers) = build_cluster(2);
    run_rounds(&mut coordinator, &mut workers, 4);

    workers[0].set_object_attribute("screen", "brightness", values![0.9]);
    run_rounds(&mut coordinator, &mut workers, 4);

    // render_1 never talks to render_0, yet sees its mirror.
    assert_eq!(
        workers[1]
            .tree()
            .get_value_for_leaf_at("/render_0/objects/screen/attributes/brightness"),
        Some(values![0.9])
    );
}

#[tokio::test]
async fn async_loops_converge_and_stop_on_cancel() {
    let (coordinator, workers) = build_cluster(2);
    let stop = CancellationToken::new();
    let period = Duration::from_millis(5);

    let mut handles = Vec::new();
    for mut node in std::iter::once(coordinator).chain(workers) {
        let stop = stop.clone();
        handles.push(tokio::spawn(async move {
            node.run(period, stop).await;
            node
        }));
    }

    tokio::time::sleep(Duration::from_millis(300)).await;
    stop.cancel();

    let mut nodes = Vec::new();
    for handle in handles {
        nodes.push(handle.await.unwrap());
    }

    // Everyone converged on every worker's mirrored attribute.
    for node in &nodes {
        for name in ["render_0", "render_1"] {
            assert_eq!(
                node.tree()
                    .get_value_for_leaf_at(&format!("/{name}/objects/screen/attributes/brightness")),
                Some(values![1.0]),
                "{} missing {}'s mirror",
                node.name(),
                name
            );
        }
    }
}
