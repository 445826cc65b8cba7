use proptest::prelude::*;

use super::{Buffer, EditOrigin};
use crate::transaction::Bias;

#[test]
fn test_replace_returns_record() {
	let mut buf = Buffer::new("hello world");
	let edit = buf.replace(0..5, "hi", EditOrigin::User);
	assert_eq!(buf.text().to_string(), "hi world");
	assert_eq!(edit.start, 0);
	assert_eq!(edit.deleted, 5);
	assert_eq!(edit.deleted_end(), 5);
	assert_eq!(edit.inserted, "hi");
	assert_eq!(edit.origin, EditOrigin::User);
}

#[test]
fn test_insert_and_delete_wrappers() {
	let mut buf = Buffer::new("abc");
	buf.insert(3, "def", EditOrigin::Sync);
	assert_eq!(buf.text().to_string(), "abcdef");
	let edit = buf.delete(0..3, EditOrigin::User);
	assert_eq!(buf.text().to_string(), "def");
	assert_eq!(edit.deleted, 3);
	assert!(edit.inserted.is_empty());
}

#[test]
fn test_mark_shifts_with_preceding_insert() {
	let mut buf = Buffer::new("hello world");
	let mark = buf.create_mark(6, Bias::Left);
	buf.insert(0, ">> ", EditOrigin::User);
	assert_eq!(buf.mark_pos(mark), Some(9));
	buf.delete(0..3, EditOrigin::User);
	assert_eq!(buf.mark_pos(mark), Some(6));
}

#[test]
fn test_mark_bias_at_insert_point() {
	let mut buf = Buffer::new("ab");
	let left = buf.create_mark(1, Bias::Left);
	let right = buf.create_mark(1, Bias::Right);
	buf.insert(1, "xyz", EditOrigin::User);
	assert_eq!(buf.mark_pos(left), Some(1));
	assert_eq!(buf.mark_pos(right), Some(4));
}

#[test]
fn test_mark_inside_deleted_range() {
	let mut buf = Buffer::new("hello world");
	let mark = buf.create_mark(4, Bias::Left);
	buf.replace(2..6, "xy", EditOrigin::User);
	// Collapses past the replacement text.
	assert_eq!(buf.mark_pos(mark), Some(4));
	assert_eq!(buf.text_of(0..4), "hexy");
}

#[test]
fn test_move_and_release_mark() {
	let mut buf = Buffer::new("abcdef");
	let mark = buf.create_mark(2, Bias::Left);
	buf.move_mark(mark, 5);
	assert_eq!(buf.mark_pos(mark), Some(5));
	buf.move_mark(mark, 100);
	assert_eq!(buf.mark_pos(mark), Some(6));

	buf.release_mark(mark);
	assert_eq!(buf.mark_pos(mark), None);
	buf.release_mark(mark);
	buf.move_mark(mark, 0);
	assert_eq!(buf.mark_pos(mark), None);
}

#[test]
fn test_set_mark_bias() {
	let mut buf = Buffer::new("ab");
	let mark = buf.create_mark(1, Bias::Left);
	buf.set_mark_bias(mark, Bias::Right);
	buf.insert(1, "--", EditOrigin::User);
	assert_eq!(buf.mark_pos(mark), Some(3));
}

#[test]
fn test_create_mark_clamps() {
	let mut buf = Buffer::new("abc");
	let mark = buf.create_mark(99, Bias::Right);
	assert_eq!(buf.mark_pos(mark), Some(3));
}

proptest! {
	/// Two same-bias marks never swap order, whatever gets edited.
	#[test]
	fn prop_marks_keep_relative_order(
		text in "[ -~]{1,60}",
		a in 0usize..60,
		b in 0usize..60,
		edit_start in 0usize..60,
		edit_len in 0usize..10,
		insert in "[ -~]{0,10}",
	) {
		let mut buf = Buffer::new(&text);
		let len = buf.len_chars();
		let (lo, hi) = if a <= b { (a.min(len), b.min(len)) } else { (b.min(len), a.min(len)) };
		let first = buf.create_mark(lo, Bias::Left);
		let second = buf.create_mark(hi, Bias::Left);

		let start = edit_start.min(len);
		let end = (start + edit_len).min(len);
		buf.replace(start..end, &insert, EditOrigin::User);

		let first_pos = buf.mark_pos(first).unwrap();
		let second_pos = buf.mark_pos(second).unwrap();
		prop_assert!(first_pos <= second_pos);
		prop_assert!(second_pos <= buf.len_chars());
	}
}
