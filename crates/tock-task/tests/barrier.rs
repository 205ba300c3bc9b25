//! Barrier and ordering guarantees of `TaskScheduler::execute`, exercised
//! against a real worker pool.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use proptest::prelude::*;
use tock_task::{Task, TaskScheduler};

fn counting_leaves(n: usize, counter: &Arc<AtomicUsize>) -> Vec<Task> {
    (0..n)
        .map(|i| {
            let counter = Arc::clone(counter);
            Task::leaf(format!("count-{i}"), move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })
        .collect()
}

#[test]
fn barrier_sees_every_leaf_before_returning() {
    let scheduler = TaskScheduler::new(4).unwrap();
    for n in [0usize, 1, 2, 7, 64, 500] {
        let counter = Arc::new(AtomicUsize::new(0));
        let task = Task::parallel(counting_leaves(n, &counter));
        scheduler.execute(task).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), n, "n = {n}");
    }
}

#[test]
fn sequential_waits_for_nested_barrier() {
    // The parallel group is slow; the leaf after it must still observe
    // every one of its increments.
    let scheduler = TaskScheduler::new(3).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));
    let slow: Vec<Task> = (0..6)
        .map(|_| {
            let counter = Arc::clone(&counter);
            Task::leaf("slow", move || {
                std::thread::sleep(Duration::from_millis(5));
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })
        .collect();
    let seen = Arc::new(AtomicUsize::new(usize::MAX));
    let check = {
        let counter = Arc::clone(&counter);
        let seen = Arc::clone(&seen);
        Task::leaf("check", move || {
            seen.store(counter.load(Ordering::SeqCst), Ordering::SeqCst);
            Ok(())
        })
    };
    scheduler
        .execute(Task::sequential([Task::parallel(slow), check]))
        .unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 6);
}

#[test]
fn aggregated_failure_arrives_after_all_siblings() {
    let scheduler = TaskScheduler::new(2).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));
    let mut children = counting_leaves(20, &counter);
    children.insert(3, Task::leaf("first-bad", || Err("one".into())));
    children.push(Task::leaf("second-bad", || panic!("two")));

    let err = scheduler.execute(Task::parallel(children)).unwrap_err();
    assert_eq!(counter.load(Ordering::SeqCst), 20);
    assert_eq!(err.len(), 2);
    let mut labels: Vec<&str> = err.failures().iter().map(|f| f.task()).collect();
    labels.sort_unstable();
    assert_eq!(labels, ["first-bad", "second-bad"]);
}

#[test]
fn failure_in_first_phase_skips_later_phases() {
    let scheduler = TaskScheduler::new(2).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));
    let task = Task::sequential([
        Task::parallel([Task::leaf("bad", || Err("nope".into()))]),
        Task::parallel(counting_leaves(5, &counter)),
    ]);
    assert!(scheduler.execute(task).is_err());
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

// ── Property tests ─────────────────────────────────────────────────

/// Shape of a task tree; leaves are numbered in depth-first order when
/// the tree is built.
#[derive(Clone, Debug)]
enum Shape {
    Leaf,
    Seq(Vec<Shape>),
}

fn shape() -> impl Strategy<Value = Shape> {
    Just(Shape::Leaf).prop_recursive(4, 48, 5, |inner| {
        prop::collection::vec(inner, 0..5).prop_map(Shape::Seq)
    })
}

fn build(shape: &Shape, next: &mut usize, log: &Arc<Mutex<Vec<usize>>>) -> Task {
    match shape {
        Shape::Leaf => {
            let i = *next;
            *next += 1;
            let log = Arc::clone(log);
            Task::leaf(format!("leaf-{i}"), move || {
                log.lock().unwrap().push(i);
                Ok(())
            })
        }
        Shape::Seq(children) => {
            Task::sequential(children.iter().map(|c| build(c, next, log)).collect::<Vec<_>>())
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn sequential_log_is_depth_first_order(shape in shape()) {
        let scheduler = TaskScheduler::new(2).unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut next = 0;
        let task = build(&shape, &mut next, &log);
        scheduler.execute(task).unwrap();
        let expected: Vec<usize> = (0..next).collect();
        prop_assert_eq!(&*log.lock().unwrap(), &expected);
    }

    #[test]
    fn parallel_of_sequentials_keeps_each_sequence_ordered(
        lens in prop::collection::vec(0usize..8, 0..6),
    ) {
        let scheduler = TaskScheduler::new(3).unwrap();
        let logs: Vec<Arc<Mutex<Vec<usize>>>> =
            lens.iter().map(|_| Arc::new(Mutex::new(Vec::new()))).collect();
        let groups = lens.iter().zip(&logs).map(|(&len, log)| {
            Task::sequential((0..len).map(|i| {
                let log = Arc::clone(log);
                Task::leaf("step", move || {
                    log.lock().unwrap().push(i);
                    Ok(())
                })
            }))
        });
        scheduler.execute(Task::parallel(groups)).unwrap();
        for (len, log) in lens.iter().zip(&logs) {
            let expected: Vec<usize> = (0..*len).collect();
            prop_assert_eq!(&*log.lock().unwrap(), &expected);
        }
    }
}
