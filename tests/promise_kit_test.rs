#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use promise_kit::{
        all, all_settled, any, panic::promisify, race, task, Deferred, Error, Promise, Resolution,
        Settle, Settled, State,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_promise_resolve_across_threads() {
        let promise = Deferred::<i32>::new();
        let consumer = promise.promise();

        let waiter = thread::spawn(move || consumer.wait());
        let producer = thread::spawn(move || promise.fulfill(42));

        producer.join().expect("The producer thread has panicked");
        assert_eq!(waiter.join().expect("The waiter thread has panicked").unwrap(), 42);
    }

    #[test]
    fn test_racing_settlements_agree() {
        let (resolver, promise) = Deferred::<usize>::new().split();
        let barrier = Arc::new(Barrier::new(6));
        let settlers: Vec<_> = (0..6)
            .map(|i| {
                let resolver = resolver.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    if i % 3 == 0 {
                        resolver.reject(Error::msg(format!("reason {i}")));
                    } else {
                        resolver.fulfill(i);
                    }
                })
            })
            .collect();
        let observers: Vec<_> = (0..4)
            .map(|_| {
                let promise = promise.clone();
                thread::spawn(move || format!("{:?}", promise.wait()))
            })
            .collect();
        for settler in settlers {
            settler.join().expect("The settler thread has panicked");
        }
        let seen: Vec<String> = observers
            .into_iter()
            .map(|o| o.join().expect("The observer thread has panicked"))
            .collect();
        assert!(seen.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(seen[0], format!("{:?}", promise.wait()));
    }

    #[test]
    fn test_chain_of_continuations() {
        let source = Deferred::<i32>::new();
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = finished.clone();
        let result = source
            .then(|v| Ok(Resolution::Value(v + 1)))
            .then(|v| {
                if v > 10 {
                    Err(Error::msg("too big"))
                } else {
                    Ok(Resolution::Value(v))
                }
            })
            .catch(|_| Ok(Resolution::Value(-1)))
            .finally(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        source.fulfill(10);
        assert_eq!(result.wait().unwrap(), -1);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_three_levels_of_nesting() {
        let innermost = Deferred::<&'static str>::new();
        let middle = Promise::from_resolution(Resolution::Promise(innermost.promise()));
        let outer = Deferred::<&'static str>::new();
        outer.resolve(Resolution::Promise(middle));
        innermost.fulfill("V");
        assert_eq!(outer.wait().unwrap(), "V");
    }

    #[test]
    fn test_handler_returning_own_promise_rejects() {
        let (tx, rx) = std::sync::mpsc::channel::<Promise<i32>>();
        let gate = Deferred::<i32>::new();
        let derived = gate.then(move |_| Ok(Resolution::Promise(rx.recv().unwrap())));
        tx.send(derived.clone()).unwrap();
        gate.fulfill(0);
        let err = derived.wait().unwrap_err();
        assert!(matches!(err, Error::ChainingCycle(id) if id == derived.id()));
    }

    #[test]
    fn test_combinators_on_mixed_inputs() {
        assert_eq!(
            all(vec![Resolution::Value(1), Resolution::Value(2), Resolution::Value(3)])
                .wait()
                .unwrap(),
            vec![1, 2, 3]
        );

        let rejected = all(vec![
            Resolution::Promise(Promise::fulfilled(1)),
            Resolution::Promise(Promise::rejected(Error::msg("E"))),
            Resolution::Promise(Promise::fulfilled(3)),
        ]);
        assert_eq!(rejected.wait().unwrap_err().to_string(), "E");

        let failed = any(vec![
            Resolution::Promise(Promise::<i32>::rejected(Error::msg("E1"))),
            Resolution::Promise(Promise::rejected(Error::msg("E2"))),
        ])
        .wait()
        .unwrap_err();
        let reasons: Vec<String> = failed
            .as_aggregate()
            .unwrap()
            .errors()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(reasons, vec!["E1", "E2"]);

        let records = all_settled(vec![
            Resolution::Value(1),
            Resolution::Promise(Promise::rejected(Error::msg("E"))),
        ])
        .wait()
        .unwrap();
        assert!(matches!(records[0], Settled::Fulfilled(1)));
        assert!(matches!(&records[1], Settled::Rejected(reason) if reason.to_string() == "E"));
    }

    #[test]
    fn test_race_settles_after_all_branches() {
        let slow = Deferred::<i32>::new();
        let result = race(vec![
            Resolution::Promise(Promise::rejected(Error::msg("fast failure"))),
            Resolution::Promise(slow.promise()),
        ]);
        assert_eq!(result.state(), State::Pending);
        slow.fulfill(1);
        assert_eq!(result.wait().unwrap_err().to_string(), "fast failure");
    }

    #[test]
    fn test_bridges_feed_combinators() {
        let results = all(vec![
            Resolution::Promise(task::spawn(|| Ok(Resolution::Value(1)))),
            Resolution::Promise(promisify::<i32, _, _>(|| 2)),
        ]);
        assert_eq!(block_on(results).unwrap(), vec![1, 2]);

        let faulted = all_settled(vec![
            Resolution::Promise(promisify::<i32, _, _>(|| -> i32 { panic!("fault") })),
            Resolution::Promise(task::spawn(|| Ok(Resolution::Value(3)))),
        ]);
        let records = faulted.wait().unwrap();
        assert_eq!(records[0].reason().unwrap().to_string(), "fault");
        assert_eq!(records[1].value(), Some(&3));
    }

    #[test]
    fn test_await_after_settlement() {
        let promise = Promise::fulfilled(String::from("🍓"));
        let first = block_on(promise.clone()).unwrap();
        let second = block_on(promise).unwrap();
        assert_eq!(first, second);
    }
}
