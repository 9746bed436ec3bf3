use super::*;
use crate::event::{SystemEvent, UiEvent};

fn buffer_with(lines: &[&str]) -> Buffer {
    Buffer::from_lines(lines.iter().map(|s| s.to_string()).collect())
}

fn lines(buffer: &Buffer) -> Vec<&str> {
    buffer.lines().iter().map(String::as_str).collect()
}

#[test]
fn test_new_buffer_is_empty_and_clean() {
    let buffer = Buffer::new();
    assert!(buffer.is_empty());
    assert!(!buffer.is_dirty());
    assert_eq!(buffer.line_count(), 0);
    assert!(buffer.get_row(0).is_none());
}

#[test]
fn test_insert_sequence() {
    let mut buffer = buffer_with(&[""]);
    buffer.insert_char(Position::new(0, 0), 'A');
    buffer.insert_char(Position::new(1, 0), 'B');
    buffer.insert_char(Position::new(1, 0), 'C');
    assert_eq!(lines(&buffer), vec!["ACB"]);
    assert!(buffer.is_dirty());
}

#[test]
fn test_insert_into_empty_buffer_creates_line() {
    let mut buffer = Buffer::new();
    let event = buffer.insert_char(Position::new(0, 0), 'x').unwrap();
    assert_eq!(lines(&buffer), vec!["x"]);
    assert!(event.prev_state().unwrap().lines.is_empty());
}

#[test]
fn test_insert_out_of_range_is_noop() {
    let mut buffer = buffer_with(&["a"]);
    assert!(buffer.insert_char(Position::new(0, 5), 'x').is_none());
    assert_eq!(lines(&buffer), vec!["a"]);
    assert!(!buffer.is_dirty());

    let mut empty = Buffer::new();
    assert!(empty.insert_char(Position::new(0, 3), 'x').is_none());
    assert!(empty.is_empty());
}

#[test]
fn test_insert_clamps_column() {
    let mut buffer = buffer_with(&["ab"]);
    buffer.insert_char(Position::new(40, 0), 'c');
    assert_eq!(lines(&buffer), vec!["abc"]);
}

#[test]
fn test_backspace_deletes_previous_char() {
    let mut buffer = buffer_with(&["AB"]);
    let event = buffer.delete_char(Position::new(1, 0)).unwrap();
    assert_eq!(lines(&buffer), vec!["B"]);
    assert!(!event.changes()[0].is_structural);
}

#[test]
fn test_backspace_at_line_start_joins() {
    let mut buffer = buffer_with(&["A", "B"]);
    let event = buffer.delete_char(Position::new(0, 1)).unwrap();
    assert_eq!(lines(&buffer), vec!["AB"]);
    assert!(event.changes()[0].is_structural);
}

#[test]
fn test_backspace_on_empty_line_drops_it() {
    let mut buffer = buffer_with(&["A", "", "C"]);
    buffer.delete_char(Position::new(0, 1));
    assert_eq!(lines(&buffer), vec!["A", "C"]);
}

#[test]
fn test_join_shifts_later_lines_up() {
    let mut buffer = buffer_with(&["a", "b", "c", "d"]);
    buffer.delete_char(Position::new(0, 2));
    assert_eq!(lines(&buffer), vec!["a", "bc", "d"]);
}

#[test]
fn test_backspace_at_origin_is_noop() {
    let mut buffer = buffer_with(&["abc"]);
    assert!(buffer.delete_char(Position::new(0, 0)).is_none());
    assert_eq!(lines(&buffer), vec!["abc"]);
    assert!(!buffer.is_dirty());
}

#[test]
fn test_backspace_out_of_range_is_noop() {
    let mut buffer = buffer_with(&["abc"]);
    assert!(buffer.delete_char(Position::new(1, 3)).is_none());
    assert!(buffer.delete_char(Position::new(9, 0)).is_none());
    assert_eq!(lines(&buffer), vec!["abc"]);
}

#[test]
fn test_newline_splits_line() {
    let mut buffer = buffer_with(&["hello world", "next"]);
    buffer.insert_newline(Position::new(5, 0));
    assert_eq!(lines(&buffer), vec!["hello", " world", "next"]);
}

#[test]
fn test_newline_at_ends() {
    let mut buffer = buffer_with(&["ab"]);
    buffer.insert_newline(Position::new(2, 0));
    assert_eq!(lines(&buffer), vec!["ab", ""]);
    buffer.insert_newline(Position::new(0, 0));
    assert_eq!(lines(&buffer), vec!["", "ab", ""]);
}

#[test]
fn test_newline_in_empty_buffer_makes_two_lines() {
    let mut buffer = Buffer::new();
    buffer.insert_newline(Position::new(0, 0));
    assert_eq!(lines(&buffer), vec!["", ""]);
    assert!(buffer.insert_newline(Position::new(0, 7)).is_none());
}

#[test]
fn test_newline_then_backspace_round_trips() {
    let original = "aあbいc";
    for x in 0..=original.chars().count() {
        let mut buffer = buffer_with(&[original]);
        buffer.insert_newline(Position::new(x, 0));
        assert_eq!(buffer.line_count(), 2);
        buffer.delete_char(Position::new(0, 1));
        assert_eq!(lines(&buffer), vec![original], "split at {}", x);
    }
}

#[test]
fn test_wide_char_edits_use_char_offsets() {
    let mut buffer = buffer_with(&["あう"]);
    buffer.insert_char(Position::new(1, 0), 'い');
    assert_eq!(lines(&buffer), vec!["あいう"]);
    buffer.delete_char(Position::new(3, 0));
    assert_eq!(lines(&buffer), vec!["あい"]);
}

#[test]
fn test_row_cache_is_evicted_on_edit() {
    let mut buffer = buffer_with(&["abc", "def"]);
    assert_eq!(buffer.get_row(0).unwrap().text(), "abc");
    assert_eq!(buffer.get_row(1).unwrap().text(), "def");
    assert_eq!(buffer.cached_rows(), 2);

    buffer.insert_char(Position::new(0, 0), 'x');
    assert_eq!(buffer.cached_rows(), 1);
    assert_eq!(buffer.get_row(0).unwrap().text(), "xabc");
}

#[test]
fn test_structural_edit_evicts_following_rows() {
    let mut buffer = buffer_with(&["a", "b", "c"]);
    for y in 0..3 {
        buffer.get_row(y);
    }
    buffer.insert_newline(Position::new(1, 1));
    assert_eq!(buffer.cached_rows(), 1);
    assert_eq!(buffer.get_row(2).unwrap().text(), "");
    assert_eq!(buffer.get_row(3).unwrap().text(), "c");
}

#[test]
fn test_cached_rows_match_lines_after_edits() {
    let mut buffer = buffer_with(&["one", "two", "three"]);
    let ops: Vec<Box<dyn Fn(&mut Buffer)>> = vec![
        Box::new(|b| {
            b.insert_char(Position::new(1, 1), 'X');
        }),
        Box::new(|b| {
            b.insert_newline(Position::new(2, 0));
        }),
        Box::new(|b| {
            b.delete_char(Position::new(0, 2));
        }),
        Box::new(|b| {
            b.delete_char(Position::new(2, 1));
        }),
    ];
    for op in ops {
        for y in 0..buffer.line_count() {
            buffer.get_row(y);
        }
        op(&mut buffer);
        for y in 0..buffer.line_count() {
            assert_eq!(buffer.get_row(y).unwrap().text(), buffer.line(y).unwrap());
        }
    }
}

#[test]
fn test_load_content_resets_state() {
    let mut buffer = buffer_with(&["x"]);
    buffer.insert_char(Position::new(0, 0), 'y');
    buffer.get_row(0);
    buffer.load_content(vec!["new".into(), "content".into()]);
    assert_eq!(lines(&buffer), vec!["new", "content"]);
    assert!(!buffer.is_dirty());
    assert_eq!(buffer.cached_rows(), 0);
}

#[test]
fn test_set_dirty_reports_changes_only() {
    let mut buffer = buffer_with(&["x"]);
    assert!(buffer.set_dirty(false).is_none());
    let event = buffer.set_dirty(true).unwrap();
    assert!(event.curr_state().unwrap().is_dirty);
    assert!(!event.prev_state().unwrap().is_dirty);
}

#[test]
fn test_captured_state_is_a_deep_copy() {
    let mut buffer = buffer_with(&["abc"]);
    let state = buffer.capture_state();
    buffer.insert_char(Position::new(0, 0), 'z');
    assert_eq!(state.lines, vec!["abc".to_string()]);
    assert_eq!(state.content, "abc");

    let mut all = buffer.get_all_lines();
    all[0].push('!');
    assert_eq!(buffer.line(0), Some("zabc"));
}

#[test]
fn test_event_prev_state_is_not_aliased() {
    let mut buffer = buffer_with(&["abc"]);
    let first = buffer.insert_char(Position::new(3, 0), 'd').unwrap();
    buffer.insert_char(Position::new(4, 0), 'e');
    assert_eq!(first.prev_state().unwrap().lines, vec!["abc".to_string()]);
    assert_eq!(first.curr_state().unwrap().lines, vec!["abcd".to_string()]);
}

#[test]
fn test_restore_state_replaces_contents() {
    let mut buffer = buffer_with(&["old"]);
    let state = BufferState::from_lines(&["a".to_string(), "b".to_string()], true);
    buffer.restore_state(&state).unwrap();
    assert_eq!(lines(&buffer), vec!["a", "b"]);
    assert!(buffer.is_dirty());
    assert_eq!(buffer.cached_rows(), 2);

    // the restored buffer does not share storage with the state
    buffer.insert_char(Position::new(0, 0), 'z');
    assert_eq!(state.lines[0], "a");
}

#[test]
fn test_restore_from_content_only_state() {
    let mut buffer = buffer_with(&["old", "lines"]);
    let state = BufferState {
        content: "only".into(),
        is_dirty: false,
        lines: Vec::new(),
    };
    buffer.restore_state(&state).unwrap();
    assert_eq!(lines(&buffer), vec!["only"]);
}

#[test]
fn test_restore_rejects_inconsistent_state() {
    let mut buffer = buffer_with(&["keep"]);
    let state = BufferState {
        content: "mismatch".into(),
        is_dirty: false,
        lines: vec!["other".into()],
    };
    assert!(buffer.restore_state(&state).is_err());
    assert_eq!(lines(&buffer), vec!["keep"]);
}

#[test]
fn test_restore_payload_of_wrong_shape_fails() {
    let mut buffer = buffer_with(&["keep"]);
    let payload = EventData::System(SystemEvent::Quit { force: false });
    let err = buffer.restore(&payload).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidStateType);
    assert_eq!(err.code, errors::INVALID_STATE_TYPE);

    let ui = EventData::Ui(UiEvent::Redraw { full: true });
    assert!(buffer.restore(&ui).is_err());
    assert_eq!(lines(&buffer), vec!["keep"]);
}

#[test]
fn test_restore_payload_uses_after_state() {
    let mut source = buffer_with(&["ab"]);
    let event = source.insert_char(Position::new(2, 0), 'c').unwrap();

    let mut target = buffer_with(&["zzz"]);
    let restored = target.restore(&event.data).unwrap();
    assert_eq!(lines(&target), vec!["abc"]);
    assert_eq!(restored.subtype(), "restore");
    assert_eq!(target.capture(), source.capture_state());
}

#[test]
fn test_line_len_counts_chars() {
    let buffer = buffer_with(&["あいう", "abc"]);
    assert_eq!(buffer.line_len(0), 3);
    assert_eq!(buffer.line_len(1), 3);
    assert_eq!(buffer.line_len(5), 0);
}
