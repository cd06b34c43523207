//! Integration Tests for the Frame Engine
//!
//! These tests verify that the scheduler, invalidation caches and
//! classifiers work together over a real scene tree.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use cadence_core::classify::{CompositeClassifier, HysteresisClassifier, Zone, ZoneMap};
use cadence_core::scene::{Behavior, Frame, HookResult, Hooks, NodeId, SceneGraph, SceneTree, Transition, UpdateScheduler};
use cadence_core::{memoize, InvalidationGroup, SchedulerError};

/// Build a tree where node `i` (for i > 0) hangs under `parents[i - 1]`.
fn tree_from_parents(parents: &[usize]) -> (SceneGraph, Vec<NodeId>) {
    let mut graph = SceneGraph::new();
    let mut nodes = vec![graph.add_root(Transition::new(0.0))];
    for &parent in parents {
        let id = graph.add_child(nodes[parent], Transition::new(1.0)).unwrap();
        nodes.push(id);
    }
    (graph, nodes)
}

/// Every node runs once per frame, strictly after all of its ancestors.
#[test]
fn ancestors_always_run_first() {
    let shapes: [&[usize]; 4] = [
        &[0, 1, 2, 3, 4],
        &[0, 0, 0, 0, 0],
        &[0, 0, 1, 1, 2, 2, 3, 3],
        &[0, 1, 0, 3, 1, 5, 6, 2],
    ];

    for parents in shapes {
        let (mut graph, nodes) = tree_from_parents(parents);
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut scheduler = UpdateScheduler::new();
        for &node in &nodes {
            let log = Rc::clone(&log);
            scheduler.on_update(node, move |_, node| {
                log.borrow_mut().push(node);
                Ok(())
            });
        }

        // Use the deepest node as the reference view.
        let view = *nodes.last().unwrap();
        for frame in 0..3 {
            log.borrow_mut().clear();
            scheduler.update(&mut graph, nodes[0], view, 0.016).unwrap();

            let order = log.borrow();
            assert_eq!(order.len(), nodes.len(), "frame {frame}: every node exactly once");
            for (pos, &node) in order.iter().enumerate() {
                assert!(scheduler.was_updated(node));
                let mut ancestor = graph.parent(node);
                while let Some(a) = ancestor {
                    let apos = order.iter().position(|&n| n == a).unwrap();
                    assert!(apos < pos, "{a:?} ran after its descendant {node:?}");
                    ancestor = graph.parent(a);
                }
            }
        }
    }
}

/// root -> child, root -> other -> grandchild. The child's behavior pulls the
/// grandchild before the main traversal would reach it.
#[test]
fn behavior_pulls_unvisited_dependency() {
    let mut graph = SceneGraph::new();
    let root = graph.add_root(Transition::new(0.0));
    let child = graph.add_child(root, Transition::new(0.0)).unwrap();
    let other = graph.add_child(root, Transition::new(0.0)).unwrap();
    let grandchild = graph.add_child(other, Transition::new(3.0)).unwrap();

    let counter = Rc::new(Cell::new(0_u32));
    let stamps = Rc::new(RefCell::new(Vec::new()));
    let mut scheduler: UpdateScheduler<SceneGraph> = UpdateScheduler::new();

    for (node, label) in [(other, "other"), (grandchild, "grandchild")] {
        let counter = Rc::clone(&counter);
        let stamps = Rc::clone(&stamps);
        scheduler.on_update(node, move |_, _| {
            counter.set(counter.get() + 1);
            stamps.borrow_mut().push((label, counter.get()));
            Ok(())
        });
    }

    {
        let counter = Rc::clone(&counter);
        let stamps = Rc::clone(&stamps);
        scheduler.on_update(child, move |frame, _| {
            let before = counter.get();
            assert!(!frame.is_updated(grandchild));

            frame.ensure_update(grandchild)?;
            assert!(frame.is_updated(grandchild));
            assert!(frame.is_updated(other));
            assert_eq!(frame.tree().world(grandchild), Some(3.0));

            counter.set(counter.get() + 1);
            stamps.borrow_mut().push(("child", counter.get()));
            assert_eq!(counter.get(), before + 3);
            Ok(())
        });
    }

    scheduler.update(&mut graph, root, root, 0.016).unwrap();
    assert_eq!(
        *stamps.borrow(),
        vec![("other", 1), ("grandchild", 2), ("child", 3)]
    );
}

/// A metric memoized per frame feeds a classifier driven from a behavior.
#[test]
fn cached_metric_drives_classifier_from_behavior() {
    struct Proximity {
        camera: NodeId,
        distance: Rc<Cell<f64>>,
        frame_group: InvalidationGroup,
        classifier: HysteresisClassifier,
        entered: Rc<RefCell<Vec<u64>>>,
    }

    impl Hooks<SceneGraph> for Proximity {
        fn update(&mut self, frame: &mut Frame<'_, SceneGraph>, node: NodeId) -> HookResult {
            frame.ensure_update(self.camera)?;
            let camera = frame.tree().world(self.camera).unwrap_or_default();
            let me = frame.tree().world(node).unwrap_or_default();
            self.distance.set((camera - me).abs());
            self.frame_group.invalidate_all();

            self.classifier
                .update(frame.delta_time())
                .map_err(|e| SchedulerError::behavior(node, e))?;
            if self
                .classifier
                .changed_to("near")
                .map_err(|e| SchedulerError::behavior(node, e))?
            {
                self.entered.borrow_mut().push(frame.number());
            }
            Ok(())
        }
    }

    let mut graph = SceneGraph::new();
    let root = graph.add_root(Transition::new(0.0));
    let camera = graph.add_child(root, Transition::new(10.0)).unwrap();
    let label = graph.add_child(root, Transition::new(0.0)).unwrap();

    let distance = Rc::new(Cell::new(0.0));
    let computations = Arc::new(AtomicI32::new(0));
    let frame_group = InvalidationGroup::new("frame");

    let raw = Arc::new(parking_lot::Mutex::new(0.0_f64));
    let metric = {
        let raw = Arc::clone(&raw);
        let computations = Arc::clone(&computations);
        memoize(
            move || {
                computations.fetch_add(1, Ordering::SeqCst);
                *raw.lock()
            },
            &[&frame_group],
        )
    };

    let classifier = {
        let metric = metric.clone();
        let distance = Rc::clone(&distance);
        let raw = Arc::clone(&raw);
        let zones = ZoneMap::starting_with(Zone::new("near"))
            .then(4.0, Zone::new("far"))
            .build()
            .unwrap();
        HysteresisClassifier::new(zones, move || {
            *raw.lock() = distance.get();
            // Read twice; the producer still runs once per invalidation.
            metric.get();
            metric.get()
        })
        .with_margin(0.5)
        .unwrap()
    };

    let entered = Rc::new(RefCell::new(Vec::new()));
    let mut scheduler = UpdateScheduler::new();
    scheduler.add_behavior(
        label,
        Behavior::new(Proximity {
            camera,
            distance: Rc::clone(&distance),
            frame_group: frame_group.clone(),
            classifier,
            entered: Rc::clone(&entered),
        }),
    );

    // Camera approaches the label over several frames.
    for camera_target in [10.0, 6.0, 3.8, 3.0, 2.0, 1.0] {
        graph.set_target(camera, camera_target).unwrap();
        scheduler.update(&mut graph, root, root, 0.016).unwrap();
    }

    // 3.8 sits inside the hysteresis band; the state flips at 3.0 only, and
    // only once.
    assert_eq!(*entered.borrow(), vec![4]);
    assert_eq!(computations.load(Ordering::SeqCst), 6);
}

/// Composite edges seen from a behavior fire on exactly one frame.
#[test]
fn composite_edge_fires_once_across_frames() {
    let mut graph = SceneGraph::new();
    let root = graph.add_root(Transition::new(0.0));

    let a = Rc::new(Cell::new(0.0));
    let b = Rc::new(Cell::new(0.0));
    let binary = |input: &Rc<Cell<f64>>, low: &str, high: &str| {
        let input = Rc::clone(input);
        let zones = ZoneMap::starting_with(Zone::new(low))
            .then(0.5, Zone::new(high))
            .build()
            .unwrap();
        HysteresisClassifier::new(zones, move || input.get())
    };
    let mut composite = CompositeClassifier::new()
        .with("gaze", binary(&a, "away", "toward"))
        .with("reach", binary(&b, "out", "in"));

    let fired = Rc::new(RefCell::new(Vec::new()));
    let mut scheduler = UpdateScheduler::new();
    {
        let fired = Rc::clone(&fired);
        scheduler.on_update(root, move |frame, node| {
            composite
                .update(frame.delta_time())
                .map_err(|e| SchedulerError::behavior(node, e))?;
            let engaged = composite
                .changing_to(&[("gaze", "toward"), ("reach", "in")])
                .map_err(|e| SchedulerError::behavior(node, e))?;
            if engaged {
                fired.borrow_mut().push(frame.number());
            }
            Ok(())
        });
    }

    let script = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (1.0, 1.0), (1.0, 1.0), (0.0, 1.0), (1.0, 1.0)];
    for (gaze, reach) in script {
        a.set(gaze);
        b.set(reach);
        scheduler.update(&mut graph, root, root, 0.016).unwrap();
    }
    assert_eq!(*fired.borrow(), vec![3, 7]);
}

/// Hooks observe raw targets during update and smoothed values after.
#[test]
fn post_update_sees_smoothed_world() {
    struct Follow {
        observed: Rc<RefCell<Vec<(f64, f64)>>>,
    }

    impl Hooks<SceneGraph> for Follow {
        fn update(&mut self, frame: &mut Frame<'_, SceneGraph>, node: NodeId) -> HookResult {
            frame.tree_mut().set_target(node, 4.0)?;
            Ok(())
        }

        fn post_update(&mut self, frame: &mut Frame<'_, SceneGraph>, node: NodeId) -> HookResult {
            let parent = frame.tree().parent(node).ok_or(SchedulerError::UnknownNode(node))?;
            let world = frame.tree().world(node).unwrap_or_default();
            let parent_world = frame.tree().world(parent).unwrap_or_default();
            self.observed.borrow_mut().push((parent_world, world));
            Ok(())
        }
    }

    let mut graph = SceneGraph::new();
    let root = graph.add_root(Transition::new(1.0));
    let child = graph.add_child(root, Transition::with_rate(0.0, 1.0)).unwrap();
    let observed = Rc::new(RefCell::new(Vec::new()));

    let mut scheduler = UpdateScheduler::new();
    scheduler.add_behavior(child, Behavior::new(Follow { observed: Rc::clone(&observed) }));

    for _ in 0..5 {
        scheduler.update(&mut graph, root, root, 1.0).unwrap();
    }
    assert_eq!(
        *observed.borrow(),
        vec![(1.0, 2.0), (1.0, 3.0), (1.0, 4.0), (1.0, 5.0), (1.0, 5.0)]
    );
}
