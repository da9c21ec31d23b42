#[cfg(test)]
mod integration_tests {
    use event_keeper::{
        flags, listener_for, Context, Event, Flags, Log, Logger, MessageEvent, State,
        TextFormatter,
    };
    use std::io::{self, Write};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier, Mutex};
    use std::thread;
    use std::time::Duration;

    // Event carrying a sequence number so listeners can verify ordering
    #[derive(Debug)]
    struct SequenceEvent {
        flag: &'static str,
        seq: usize,
        at: chrono::DateTime<chrono::Utc>,
    }

    impl SequenceEvent {
        fn new(flag: &'static str, seq: usize) -> Self {
            Self {
                flag,
                seq,
                at: chrono::Utc::now(),
            }
        }
    }

    impl Event for SequenceEvent {
        fn flag(&self) -> &str {
            self.flag
        }

        fn timestamp(&self) -> chrono::DateTime<chrono::Utc> {
            self.at
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    // In-memory output shared with the logger
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    // Helper function to create a logger that does not write anywhere
    fn quiet_logger() -> Logger {
        Logger::new(None).without_output()
    }

    // Helper function returning a listener that records sequence numbers
    fn sequence_recorder() -> (
        impl Fn(&Context, &SequenceEvent) + Send + Sync + 'static,
        Arc<Mutex<Vec<usize>>>,
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (
            move |_: &Context, event: &SequenceEvent| sink.lock().unwrap().push(event.seq),
            seen,
        )
    }

    // Helper function returning a listener that counts every delivery
    fn counter() -> (
        impl Fn(&Context, &dyn Event) + Send + Sync + 'static,
        Arc<AtomicUsize>,
    ) {
        let calls = Arc::new(AtomicUsize::new(0));
        let count = Arc::clone(&calls);
        (
            move |_: &Context, _: &dyn Event| {
                count.fetch_add(1, Ordering::SeqCst);
            },
            calls,
        )
    }

    #[test]
    fn test_scenario_a_fifo_delivery() {
        let logger = quiet_logger();
        let (listener, seen) = sequence_recorder();
        logger
            .listen(flags::INFO, "counter", listener_for(listener))
            .unwrap();

        let ctx = Context::new();
        for seq in 0..100 {
            logger.trigger(&ctx, SequenceEvent::new(flags::INFO, seq));
        }
        logger.drain().unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 100);
        assert_eq!(*seen, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_scenario_b_disabled_flag_is_never_delivered() {
        let logger = quiet_logger();
        let (listener, calls) = counter();
        logger.listen(flags::DEBUG, "x", listener).unwrap();

        logger.trigger(&Context::new(), MessageEvent::new(flags::DEBUG, "hidden"));
        logger.drain().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_scenario_c_fan_out() {
        let logger = quiet_logger();
        let (listener_a, calls_a) = counter();
        let (listener_b, calls_b) = counter();
        logger.listen(flags::INFO, "a", listener_a).unwrap();
        logger.listen(flags::INFO, "b", listener_b).unwrap();

        logger.trigger(&Context::new(), MessageEvent::new(flags::INFO, "once"));
        logger.drain().unwrap();

        assert_eq!(calls_a.load(Ordering::SeqCst), 1);
        assert_eq!(calls_b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_scenario_d_removed_listener_is_not_invoked() {
        let logger = quiet_logger();
        let (listener, calls) = counter();
        logger.listen(flags::INFO, "x", listener).unwrap();
        logger.remove_listener(flags::INFO, "x");

        logger.trigger(&Context::new(), MessageEvent::new(flags::INFO, "late"));
        logger.drain().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!logger.has_listener(flags::INFO, "x"));
        assert!(!logger.has_listeners(flags::INFO));
    }

    #[test]
    fn test_scenario_e_worker_survives_listener_panic() {
        let logger = quiet_logger().with_recover_panics(true);
        let calls = Arc::new(AtomicUsize::new(0));
        let count = Arc::clone(&calls);
        logger
            .listen(flags::INFO, "fragile", move |_: &Context, _: &dyn Event| {
                if count.fetch_add(1, Ordering::SeqCst) == 0 {
                    panic!("first delivery fails");
                }
            })
            .unwrap();

        let ctx = Context::new();
        logger.trigger(&ctx, MessageEvent::new(flags::INFO, "first"));
        logger.trigger(&ctx, MessageEvent::new(flags::INFO, "second"));
        logger.drain().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(logger.has_listener(flags::INFO, "fragile"));
    }

    #[test]
    fn test_unrecovered_panic_only_affects_its_own_listener() {
        let logger = quiet_logger().with_recover_panics(false);
        let (healthy, healthy_calls) = counter();
        logger.listen(flags::INFO, "healthy", healthy).unwrap();
        logger
            .listen(flags::INFO, "fatal", |_: &Context, _: &dyn Event| {
                panic!("listener gave up");
            })
            .unwrap();

        let ctx = Context::new();
        logger.trigger(&ctx, MessageEvent::new(flags::INFO, "one"));
        logger.drain().unwrap();
        logger.trigger(&ctx, MessageEvent::new(flags::INFO, "two"));
        logger.drain().unwrap();

        assert_eq!(healthy_calls.load(Ordering::SeqCst), 2);
        logger.close().unwrap();
    }

    #[test]
    fn test_disabling_flag_stops_delivery_to_existing_listeners() {
        let logger = quiet_logger();
        let (listener, calls) = counter();
        logger.listen(flags::INFO, "x", listener).unwrap();

        logger.trigger(&Context::new(), MessageEvent::new(flags::INFO, "before"));
        logger.flags().disable(flags::INFO);
        logger.trigger(&Context::new(), MessageEvent::new(flags::INFO, "after"));
        logger.drain().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_trigger_without_listeners_is_noop() {
        let logger = quiet_logger();
        logger.trigger(&Context::new(), MessageEvent::new(flags::ERROR, "nobody"));
        logger.drain().unwrap();
        assert!(!logger.has_listeners(flags::ERROR));
    }

    #[test]
    fn test_close_twice_and_reuse() {
        let logger = quiet_logger();
        let (listener, calls) = counter();
        logger.listen(flags::INFO, "x", listener).unwrap();
        logger.listen(flags::ERROR, "y", |_: &Context, _: &dyn Event| {}).unwrap();

        logger.trigger(&Context::new(), MessageEvent::new(flags::INFO, "queued"));
        logger.close().unwrap();
        logger.close().unwrap();

        // close delivers what was queued before stopping
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(logger.state(), State::Stopped);
        assert!(!logger.has_listeners(flags::INFO));
        assert!(!logger.has_listeners(flags::ERROR));

        // flags stay cleared until enabled again
        let (listener, calls) = counter();
        logger.listen(flags::INFO, "x", listener).unwrap();
        logger.trigger(&Context::new(), MessageEvent::new(flags::INFO, "ignored"));
        logger.flags().enable(flags::INFO);
        logger.trigger(&Context::new(), MessageEvent::new(flags::INFO, "delivered"));
        logger.drain().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_multithreaded_producers() {
        let logger = Arc::new(quiet_logger());
        let (listener, calls) = counter();
        logger.listen(flags::INFO, "counter", listener).unwrap();

        let mut handles = vec![];
        for thread_id in 0..5 {
            let logger = Arc::clone(&logger);
            handles.push(thread::spawn(move || {
                for i in 0..50 {
                    logger.trigger(
                        &Context::new(),
                        MessageEvent::new(flags::INFO, format!("thread {thread_id} message {i}")),
                    );
                }
            }));
        }
        for handle in handles {
            handle.join().expect("Thread failed");
        }

        logger.drain().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 250);
    }

    #[test]
    fn test_per_producer_order_with_small_queue() {
        let logger = quiet_logger().with_queue_capacity(2);
        let (listener, seen) = sequence_recorder();
        logger
            .listen(flags::INFO, "ordered", listener_for(listener))
            .unwrap();

        for seq in 0..500 {
            logger.trigger(&Context::new(), SequenceEvent::new(flags::INFO, seq));
        }
        logger.drain().unwrap();

        assert_eq!(*seen.lock().unwrap(), (0..500).collect::<Vec<_>>());
    }

    #[test]
    fn test_trigger_does_not_wait_for_listeners() {
        let logger = quiet_logger();
        logger
            .listen(flags::INFO, "slow", |_: &Context, _: &dyn Event| {
                thread::sleep(Duration::from_millis(100));
            })
            .unwrap();

        let started = std::time::Instant::now();
        logger.trigger(&Context::new(), MessageEvent::new(flags::INFO, "fire"));
        assert!(started.elapsed() < Duration::from_millis(100));
        logger.drain().unwrap();
    }

    #[test]
    fn test_listener_can_trigger_other_flags() {
        let logger = Arc::new(quiet_logger());
        let (audit, audit_calls) = counter();
        logger.listen(flags::ERROR, "audit", audit).unwrap();

        let relay = Arc::downgrade(&logger);
        logger
            .listen(flags::INFO, "relay", move |ctx: &Context, _: &dyn Event| {
                if let Some(logger) = relay.upgrade() {
                    logger.trigger(ctx, MessageEvent::new(flags::ERROR, "relayed"));
                }
            })
            .unwrap();

        logger.trigger(&Context::new(), MessageEvent::new(flags::INFO, "start"));
        logger.drain().unwrap();
        logger.drain().unwrap();

        assert_eq!(audit_calls.load(Ordering::SeqCst), 1);
    }

    // Helper function polling `flag` until it is set or `timeout` elapses
    fn wait_for(flag: &AtomicBool, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while std::time::Instant::now() < deadline {
            if flag.load(Ordering::SeqCst) {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        flag.load(Ordering::SeqCst)
    }

    #[test]
    fn test_last_logger_handle_dropped_inside_listener() {
        let logger = Arc::new(quiet_logger());
        let (other, other_calls) = counter();
        logger.listen(flags::ERROR, "other", other).unwrap();

        let handoff = Arc::new(Barrier::new(2));
        let done = Arc::new(AtomicBool::new(false));
        let listener = {
            let weak = Arc::downgrade(&logger);
            let handoff = Arc::clone(&handoff);
            let done = Arc::clone(&done);
            move |_: &Context, _: &dyn Event| {
                let held = weak.upgrade();
                if let Some(logger) = &held {
                    logger.trigger(&Context::new(), MessageEvent::new(flags::ERROR, "queued"));
                }
                handoff.wait();
                handoff.wait();
                // the logger is closed on this thread
                drop(held);
                done.store(true, Ordering::SeqCst);
            }
        };
        logger.listen(flags::INFO, "holder", listener).unwrap();

        logger.trigger(&Context::new(), MessageEvent::new(flags::INFO, "take over"));
        handoff.wait();
        drop(logger);
        handoff.wait();

        assert!(wait_for(&done, Duration::from_secs(5)));
        assert_eq!(other_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_removes_itself_through_shared_logger() {
        let logger = Arc::new(quiet_logger());
        let done = Arc::new(AtomicBool::new(false));
        let listener = {
            let weak = Arc::downgrade(&logger);
            let done = Arc::clone(&done);
            move |_: &Context, _: &dyn Event| {
                if let Some(logger) = weak.upgrade() {
                    logger.remove_listener(flags::INFO, "oneshot");
                }
                done.store(true, Ordering::SeqCst);
            }
        };
        logger.listen(flags::INFO, "oneshot", listener).unwrap();

        logger.trigger(&Context::new(), MessageEvent::new(flags::INFO, "first"));
        assert!(wait_for(&done, Duration::from_secs(5)));
        assert!(!logger.has_listener(flags::INFO, "oneshot"));

        // the removed listener sees nothing further
        done.store(false, Ordering::SeqCst);
        logger.trigger(&Context::new(), MessageEvent::new(flags::INFO, "second"));
        logger.drain().unwrap();
        assert!(!done.load(Ordering::SeqCst));
    }

    #[test]
    fn test_context_reaches_listeners_and_output() {
        let buffer = SharedBuffer::default();
        let logger = Logger::new(None)
            .with_output(buffer.clone())
            .with_formatter(TextFormatter::new().with_timestamp(false));

        let labels = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&labels);
        logger
            .listen(flags::INFO, "labels", move |ctx: &Context, _: &dyn Event| {
                sink.lock()
                    .unwrap()
                    .push(ctx.label("request").unwrap_or_default().to_string());
            })
            .unwrap();

        let ctx = Context::new().with_label("request", "42");
        logger.emit(&ctx, MessageEvent::new(flags::INFO, "handled"));
        logger.drain().unwrap();

        assert_eq!(*labels.lock().unwrap(), vec!["42".to_string()]);
        assert_eq!(buffer.contents(), "[info] request=42 handled\n");
    }

    #[test]
    fn test_log_trait_writes_enabled_levels() {
        let buffer = SharedBuffer::default();
        let logger = Logger::new(None)
            .with_flags("all,-debug".parse::<Flags>().unwrap())
            .with_output(buffer.clone())
            .with_formatter(TextFormatter::new().with_timestamp(false));

        logger.info("Info should appear");
        logger.warning("Warning should appear");
        logger.error("Error should appear");
        logger.fatal("Fatal should appear");
        logger.debug("Debug should NOT appear");

        let contents = buffer.contents();
        assert!(contents.contains("[info] Info should appear"));
        assert!(contents.contains("[warning] Warning should appear"));
        assert!(contents.contains("[error] Error should appear"));
        assert!(contents.contains("[fatal] Fatal should appear"));
        assert!(!contents.contains("Debug should NOT appear"));
    }

    #[test]
    fn test_concurrent_writes_keep_lines_whole() {
        let buffer = SharedBuffer::default();
        let logger = Arc::new(
            Logger::new(None)
                .with_output(buffer.clone())
                .with_formatter(TextFormatter::new().with_timestamp(false)),
        );

        let handles: Vec<_> = (0..4)
            .map(|thread_id| {
                let logger = Arc::clone(&logger);
                thread::spawn(move || {
                    for i in 0..25 {
                        logger.info(format!("writer {thread_id} line {i}"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("Thread failed");
        }

        let contents = buffer.contents();
        assert_eq!(contents.lines().count(), 100);
        assert!(contents.lines().all(|line| line.starts_with("[info] writer ")));
    }

    #[test]
    fn test_logger_drop_stops_workers() {
        let (listener, calls) = counter();
        {
            let logger = quiet_logger();
            logger.listen(flags::INFO, "x", listener).unwrap();
            logger.trigger(&Context::new(), MessageEvent::new(flags::INFO, "before drop"));
            // Logger will be dropped here without explicit close
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_rapid_create_destroy() {
        for i in 0..10 {
            let logger = quiet_logger();
            let (listener, calls) = counter();
            logger.listen(flags::INFO, "x", listener).unwrap();
            logger.trigger(&Context::new(), MessageEvent::new(flags::INFO, format!("Rapid test {i}")));
            logger.close().unwrap();
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }
}
