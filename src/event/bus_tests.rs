use super::*;
use crate::buffer::{Buffer, Position};
use crate::constants::errors;
use crate::error::{ErrorKind, ErrorSeverity, QuillError};
use crate::event::{EventData, SystemEvent, UiEvent};
use std::sync::atomic::AtomicUsize;

fn edit_event(ch: char) -> Event {
    let mut buffer = Buffer::new();
    buffer.insert_char(Position::new(0, 0), ch).unwrap()
}

fn redraw() -> Event {
    Event::ui(UiEvent::Redraw { full: false })
}

fn recorder(bus: &EventBus, kind: EventKind, seen: &Arc<Mutex<Vec<String>>>, tag: &str) {
    let seen = Arc::clone(seen);
    let tag = tag.to_string();
    bus.subscribe(kind, move |e| {
        seen.lock().push(format!("{}:{}", tag, e.subtype()));
        Ok(())
    });
}

#[test]
fn test_publish_dispatches_synchronously() {
    let bus = EventBus::default();
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    bus.subscribe(EventKind::Buffer, move |_| {
        c.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    assert_eq!(bus.publish(edit_event('a')), Delivery::Dispatched(1));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_subscribers_are_scoped_by_kind() {
    let bus = EventBus::default();
    let seen = Arc::new(Mutex::new(Vec::new()));
    recorder(&bus, EventKind::Buffer, &seen, "buf");
    recorder(&bus, EventKind::Ui, &seen, "ui");

    bus.publish(redraw());
    assert_eq!(*seen.lock(), vec!["ui:redraw".to_string()]);
}

#[test]
fn test_unsubscribe() {
    let bus = EventBus::default();
    let id = bus.subscribe(EventKind::Ui, |_| Ok(()));
    assert_eq!(bus.subscriber_count(EventKind::Ui), 1);
    assert!(bus.unsubscribe(id));
    assert!(!bus.unsubscribe(id));
    assert_eq!(bus.publish(redraw()), Delivery::Dispatched(0));
}

#[test]
fn test_batch_defers_and_flushes_buffer_events_first() {
    let bus = EventBus::default();
    let seen = Arc::new(Mutex::new(Vec::new()));
    recorder(&bus, EventKind::Buffer, &seen, "buf");
    recorder(&bus, EventKind::Ui, &seen, "ui");

    bus.begin_batch();
    assert_eq!(bus.publish(redraw()), Delivery::Queued);
    assert_eq!(bus.publish(edit_event('x')), Delivery::Queued);
    assert_eq!(bus.publish(redraw()), Delivery::Queued);
    assert_eq!(bus.publish(edit_event('y')), Delivery::Queued);
    assert!(seen.lock().is_empty());

    assert_eq!(bus.end_batch(), 4);
    assert_eq!(
        *seen.lock(),
        vec![
            "buf:insert_char".to_string(),
            "buf:insert_char".to_string(),
            "ui:redraw".to_string(),
            "ui:redraw".to_string(),
        ]
    );
    assert!(!bus.is_batching());
}

#[test]
fn test_nested_batches_flush_on_outermost_end() {
    let bus = EventBus::default();
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    bus.subscribe(EventKind::Ui, move |_| {
        c.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    bus.begin_batch();
    bus.begin_batch();
    bus.publish(redraw());
    assert_eq!(bus.end_batch(), 0);
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(bus.end_batch(), 1);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unbalanced_end_batch_is_harmless() {
    let bus = EventBus::default();
    assert_eq!(bus.end_batch(), 0);
    assert!(!bus.is_batching());
}

#[test]
fn test_batch_helper() {
    let bus = EventBus::default();
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    bus.subscribe(EventKind::Ui, move |_| {
        c.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let inside = bus.batch(|| {
        bus.publish(redraw());
        bus.publish(redraw());
        count.load(Ordering::SeqCst)
    });
    assert_eq!(inside, 0);
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn test_loop_guard_bounds_recursive_publish() {
    let bus = Arc::new(EventBus::new(BusConfig { max_depth: 3 }));
    let calls = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));
    let live = Arc::new(AtomicUsize::new(0));

    let weak = Arc::downgrade(&bus);
    let (c, m, l) = (Arc::clone(&calls), Arc::clone(&max_seen), Arc::clone(&live));
    bus.subscribe(EventKind::Ui, move |_| {
        c.fetch_add(1, Ordering::SeqCst);
        let depth = l.fetch_add(1, Ordering::SeqCst) + 1;
        m.fetch_max(depth, Ordering::SeqCst);
        if let Some(bus) = weak.upgrade() {
            bus.publish(Event::ui(UiEvent::Redraw { full: true }));
        }
        l.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    });

    assert_eq!(bus.publish(redraw()), Delivery::Dispatched(1));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(max_seen.load(Ordering::SeqCst), 3);
    assert_eq!(bus.dropped_events(), 1);

    // The guard unwinds fully; a fresh publish dispatches again
    assert_eq!(bus.publish(redraw()), Delivery::Dispatched(1));
    assert_eq!(calls.load(Ordering::SeqCst), 6);
}

#[test]
fn test_loop_guard_is_per_kind() {
    let bus = Arc::new(EventBus::new(BusConfig { max_depth: 1 }));
    let buffer_calls = Arc::new(AtomicUsize::new(0));

    let weak = Arc::downgrade(&bus);
    bus.subscribe(EventKind::Ui, move |_| {
        if let Some(bus) = weak.upgrade() {
            bus.publish(edit_event('q'));
        }
        Ok(())
    });
    let b = Arc::clone(&buffer_calls);
    bus.subscribe(EventKind::Buffer, move |_| {
        b.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    bus.publish(redraw());
    assert_eq!(buffer_calls.load(Ordering::SeqCst), 1);
    assert_eq!(bus.dropped_events(), 0);
}

#[test]
fn test_noop_event_is_skipped() {
    let bus = EventBus::default();
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    bus.subscribe(EventKind::Buffer, move |_| {
        c.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let mut event = edit_event('a');
    if let EventData::Buffer(change) = &mut event.data {
        change.curr_state = change.prev_state.clone();
    }
    assert_eq!(bus.publish(event), Delivery::Skipped);
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(bus.log_len(), 0);
}

#[test]
fn test_event_with_error_goes_to_kind_handler() {
    let bus = EventBus::default();
    let dispatched = Arc::new(AtomicUsize::new(0));
    let kind_errors = Arc::new(AtomicUsize::new(0));
    let global_errors = Arc::new(AtomicUsize::new(0));

    let d = Arc::clone(&dispatched);
    bus.subscribe(EventKind::Buffer, move |_| {
        d.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let k = Arc::clone(&kind_errors);
    bus.set_error_handler(EventKind::Buffer, move |err| {
        assert_eq!(err.event_kind(), Some(EventKind::Buffer));
        k.fetch_add(1, Ordering::SeqCst);
    });
    let g = Arc::clone(&global_errors);
    bus.set_global_error_handler(move |_| {
        g.fetch_add(1, Ordering::SeqCst);
    });

    let event = edit_event('a').with_error(QuillError::state_mismatch("bad"));
    assert_eq!(bus.publish(event), Delivery::Rejected);
    assert_eq!(dispatched.load(Ordering::SeqCst), 0);
    assert_eq!(kind_errors.load(Ordering::SeqCst), 1);
    assert_eq!(global_errors.load(Ordering::SeqCst), 0);
    // still recorded for audit
    assert_eq!(bus.log_len(), 1);
}

#[test]
fn test_event_with_error_falls_back_to_global_handler() {
    let bus = EventBus::default();
    let global = Arc::new(Mutex::new(Vec::new()));
    let g = Arc::clone(&global);
    bus.set_global_error_handler(move |err| {
        g.lock().push(err.error.code.clone());
    });

    let event = redraw().with_error(QuillError::new(
        ErrorKind::Io,
        errors::IO_ERROR,
        "disk",
    ));
    bus.publish(event);
    assert_eq!(*global.lock(), vec![errors::IO_ERROR.to_string()]);
}

#[test]
fn test_subscriber_error_is_routed() {
    let bus = EventBus::default();
    let errors_seen = Arc::new(AtomicUsize::new(0));
    bus.subscribe(EventKind::Ui, |_| Err(QuillError::state_mismatch("boom")));
    let later = Arc::new(AtomicUsize::new(0));
    let l = Arc::clone(&later);
    bus.subscribe(EventKind::Ui, move |_| {
        l.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let e = Arc::clone(&errors_seen);
    bus.set_global_error_handler(move |err| {
        assert!(err.error.contains_msg("boom"));
        assert!(err.event.is_some());
        e.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(bus.publish(redraw()), Delivery::Dispatched(2));
    assert_eq!(errors_seen.load(Ordering::SeqCst), 1);
    // one failing subscriber does not starve the rest
    assert_eq!(later.load(Ordering::SeqCst), 1);
}

#[test]
fn test_system_events_bypass_batch() {
    let bus = EventBus::default();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    bus.set_system_handler(move |e| {
        s.lock().push(e.subtype().to_string());
        Ok(())
    });

    bus.begin_batch();
    let delivery = bus.publish(Event::system(SystemEvent::Quit { force: false }));
    assert_eq!(delivery, Delivery::System);
    assert_eq!(*seen.lock(), vec!["quit".to_string()]);
    bus.end_batch();
    assert_eq!(seen.lock().len(), 1);
}

#[test]
fn test_status_event_reaches_system_handler() {
    let bus = EventBus::default();
    let seen = Arc::new(Mutex::new(None));
    let s = Arc::clone(&seen);
    bus.set_system_handler(move |e| {
        if let EventData::System(SystemEvent::Status { message, severity }) = &e.data {
            *s.lock() = Some((message.clone(), *severity));
        }
        Ok(())
    });

    bus.publish(Event::status("saved", ErrorSeverity::Info));
    assert_eq!(
        *seen.lock(),
        Some(("saved".to_string(), ErrorSeverity::Info))
    );
}

#[test]
fn test_shutdown_drops_publishes_silently() {
    let bus = EventBus::default();
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    bus.subscribe(EventKind::Ui, move |_| {
        c.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    bus.begin_batch();
    bus.publish(redraw());
    bus.shutdown();
    assert!(bus.is_shut_down());
    assert_eq!(bus.end_batch(), 0);
    assert_eq!(bus.publish(redraw()), Delivery::Closed);
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_shutdown_during_flush_stops_remaining_events() {
    let bus = EventBus::shared(BusConfig::default());
    let count = Arc::new(AtomicUsize::new(0));
    let inner = Arc::new(Mutex::new(None));
    let (c, nested, signal) = (Arc::clone(&count), Arc::clone(&inner), bus.shutdown_signal());
    let weak = Arc::downgrade(&bus);
    bus.subscribe(EventKind::Ui, move |_| {
        c.fetch_add(1, Ordering::SeqCst);
        signal.trigger();
        if let Some(bus) = weak.upgrade() {
            *nested.lock() = Some(bus.publish(redraw()));
        }
        Ok(())
    });

    bus.begin_batch();
    for _ in 0..3 {
        assert_eq!(bus.publish(redraw()), Delivery::Queued);
    }
    assert_eq!(bus.end_batch(), 3);

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(*inner.lock(), Some(Delivery::Closed));
}

#[test]
fn test_shared_shutdown_signal() {
    let signal = ShutdownSignal::new();
    let bus = EventBus::with_shutdown(BusConfig::default(), signal.clone());
    signal.trigger();
    assert!(bus.is_shut_down());
}

#[test]
fn test_drain_log_returns_recorded_events() {
    let bus = EventBus::default();
    bus.publish(edit_event('a'));
    bus.begin_batch();
    bus.publish(redraw());
    bus.end_batch();

    let log = bus.drain_log();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].kind(), EventKind::Buffer);
    assert_eq!(bus.log_len(), 0);
}

#[test]
fn test_handlers_may_subscribe_during_dispatch() {
    let bus = Arc::new(EventBus::default());
    let weak = Arc::downgrade(&bus);
    bus.subscribe(EventKind::File, move |_| {
        if let Some(bus) = weak.upgrade() {
            bus.subscribe(EventKind::Ui, |_| Ok(()));
        }
        Ok(())
    });

    bus.publish(Event::file(crate::event::FileEvent::Loaded {
        path: "a.txt".into(),
        lines: 1,
    }));
    assert_eq!(bus.subscriber_count(EventKind::Ui), 1);
}
