use super::*;

#[test]
fn test_new_builds_width_index() {
    let row = Row::new("aあb");
    assert_eq!(row.len(), 3);
    assert_eq!(row.widths(), &[1, 2, 1]);
    assert_eq!(row.positions(), &[0, 1, 3, 4]);
    assert_eq!(row.total_width(), 4);
}

#[test]
fn test_empty_row() {
    let row = Row::new("");
    assert!(row.is_empty());
    assert_eq!(row.positions(), &[0]);
    assert_eq!(row.total_width(), 0);
    assert_eq!(row.screen_position_to_offset(0), 0);
    assert_eq!(row.screen_position_to_offset(10), 0);
    assert_eq!(row.offset_to_screen_position(3), 0);
}

#[test]
fn test_insert_char_clamps_offset() {
    let mut row = Row::new("ab");
    row.insert_char(1, 'X');
    assert_eq!(row.text(), "aXb");
    row.insert_char(99, 'Z');
    assert_eq!(row.text(), "aXbZ");
    row.insert_char(0, 'あ');
    assert_eq!(row.text(), "あaXbZ");
    assert_eq!(row.positions(), &[0, 2, 3, 4, 5, 6]);
}

#[test]
fn test_delete_char_out_of_range_is_ignored() {
    let mut row = Row::new("abc");
    assert_eq!(row.delete_char(3), None);
    assert_eq!(row.delete_char(100), None);
    assert_eq!(row.text(), "abc");
    assert_eq!(row.delete_char(1), Some('b'));
    assert_eq!(row.text(), "ac");
    assert_eq!(row.positions(), &[0, 1, 2]);
}

#[test]
fn test_delete_wide_char_rebuilds_positions() {
    let mut row = Row::new("あいう");
    assert_eq!(row.delete_char(1), Some('い'));
    assert_eq!(row.text(), "あう");
    assert_eq!(row.positions(), &[0, 2, 4]);
}

#[test]
fn test_screen_to_offset_inside_wide_char() {
    let row = Row::new("あいう");
    // "い" starts at column 2 and spans 2..4
    assert_eq!(row.screen_position_to_offset(3), 1);
}

#[test]
fn test_screen_to_offset_boundaries_pick_entering_char() {
    let row = Row::new("あいう");
    assert_eq!(row.screen_position_to_offset(0), 0);
    assert_eq!(row.screen_position_to_offset(1), 0);
    assert_eq!(row.screen_position_to_offset(2), 1);
    assert_eq!(row.screen_position_to_offset(4), 2);
    assert_eq!(row.screen_position_to_offset(5), 2);
}

#[test]
fn test_screen_to_offset_past_end_is_last_char() {
    let row = Row::new("abc");
    assert_eq!(row.screen_position_to_offset(3), 2);
    assert_eq!(row.screen_position_to_offset(50), 2);
}

#[test]
fn test_offset_to_screen_clamps() {
    let row = Row::new("aあb");
    assert_eq!(row.offset_to_screen_position(0), 0);
    assert_eq!(row.offset_to_screen_position(2), 3);
    assert_eq!(row.offset_to_screen_position(3), 4);
    assert_eq!(row.offset_to_screen_position(10), 4);
}

#[test]
fn test_offset_to_screen_is_monotonic() {
    let row = Row::new("aあbいcう漢d");
    for o in 0..row.len() {
        assert!(row.offset_to_screen_position(o) <= row.offset_to_screen_position(o + 1));
    }
}

#[test]
fn test_screen_to_offset_is_left_inverse_on_span_starts() {
    let row = Row::new("xあyいzう漢");
    for o in 0..row.len() {
        let col = row.offset_to_screen_position(o);
        assert_eq!(row.screen_position_to_offset(col), o, "offset {}", o);
    }
}

#[test]
fn test_round_trip_through_screen_is_monotonic() {
    let row = Row::new("aあいbう");
    let mut last = 0;
    for col in 0..row.total_width() + 3 {
        let back = row.offset_to_screen_position(row.screen_position_to_offset(col));
        assert!(back >= last);
        last = back;
    }
}

#[test]
fn test_split_off_and_append() {
    let mut row = Row::new("helloあworld");
    let tail = row.split_off(6);
    assert_eq!(row.text(), "helloあ");
    assert_eq!(tail.text(), "world");
    assert_eq!(row.total_width(), 7);

    row.append(&tail);
    assert_eq!(row.text(), "helloあworld");
    assert_eq!(row.total_width(), 12);
}

#[test]
fn test_visible_slice() {
    let row = Row::new("abあcd");
    assert_eq!(row.visible_slice(0, 10), "abあcd");
    assert_eq!(row.visible_slice(0, 3), "ab");
    assert_eq!(row.visible_slice(0, 4), "abあ");
    // column 3 is the second half of "あ"
    assert_eq!(row.visible_slice(3, 2), "c");
    assert_eq!(row.visible_slice(10, 5), "");
}
