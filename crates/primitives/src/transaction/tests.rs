use proptest::prelude::*;

use super::{Bias, Change, ChangeSet, Operation, Transaction};
use crate::Rope;

#[test]
fn test_changeset_retain() {
	let mut cs = ChangeSet::new();
	cs.retain(5);
	assert_eq!(cs.len(), 5);
	assert_eq!(cs.len_after(), 5);
}

#[test]
fn test_changeset_delete() {
	let mut cs = ChangeSet::new();
	cs.delete(2);
	cs.retain(3);
	assert_eq!(cs.len(), 5);
	assert_eq!(cs.len_after(), 3);
}

#[test]
fn test_changeset_apply() {
	let mut doc = Rope::from("hello");
	let mut cs = ChangeSet::new();
	cs.delete(2);
	cs.insert("aa".into());
	cs.retain(3);
	cs.apply(&mut doc);
	assert_eq!(doc.to_string(), "aallo");
}

#[test]
fn test_insert_ordered_before_pending_delete() {
	let mut cs = ChangeSet::new();
	cs.delete(2);
	cs.insert("xy".into());
	let ops = cs.changes();
	assert!(matches!(ops[0], Operation::Insert(_)));
	assert!(matches!(ops[1], Operation::Delete(2)));
}

#[test]
fn test_transaction_replace() {
	let mut doc = Rope::from("hello world");
	let tx = Transaction::replace(doc.slice(..), 0..5, "hi");
	tx.apply(&mut doc);
	assert_eq!(doc.to_string(), "hi world");
}

#[test]
fn test_transaction_change_multiple() {
	let mut doc = Rope::from("one two three");
	let tx = Transaction::change(
		doc.slice(..),
		vec![Change::replace(0, 3, "1"), Change::delete(7, 13)],
	);
	tx.apply(&mut doc);
	assert_eq!(doc.to_string(), "1 two");
}

#[test]
fn test_map_pos_around_edit() {
	let doc = Rope::from("hello world");
	let tx = Transaction::replace(doc.slice(..), 2..6, "xy");
	// Before the edit: unchanged.
	assert_eq!(tx.map_pos(1, Bias::Left), 1);
	// After the edit: shifted by the length delta.
	assert_eq!(tx.map_pos(8, Bias::Left), 6);
	// Inside the deleted range: collapses past the replacement text.
	assert_eq!(tx.map_pos(4, Bias::Left), 4);
	assert_eq!(tx.map_pos(4, Bias::Right), 4);
}

#[test]
fn test_map_pos_bias_at_insert() {
	let doc = Rope::from("ab");
	let tx = Transaction::replace(doc.slice(..), 1..1, "___");
	assert_eq!(tx.map_pos(1, Bias::Left), 1);
	assert_eq!(tx.map_pos(1, Bias::Right), 4);
}

#[test]
fn test_map_pos_bias_at_replace_start() {
	let doc = Rope::from("hello world");
	let tx = Transaction::replace(doc.slice(..), 2..6, "xy");
	assert_eq!(tx.map_pos(2, Bias::Left), 2);
	assert_eq!(tx.map_pos(2, Bias::Right), 4);
}

#[test]
fn test_invert_restores() {
	let original = Rope::from("hello world");
	let mut doc = original.clone();
	let tx = Transaction::replace(doc.slice(..), 0..5, "goodbye");
	tx.apply(&mut doc);
	assert_eq!(doc.to_string(), "goodbye world");

	tx.invert(&original).apply(&mut doc);
	assert_eq!(doc.to_string(), original.to_string());
}

#[test]
fn test_compose_equals_sequential() {
	let doc = Rope::from("hello world");
	let tx1 = Transaction::replace(doc.slice(..), 0..5, "hi");
	let mut mid = doc.clone();
	tx1.apply(&mut mid);
	let tx2 = Transaction::replace(mid.slice(..), 3..8, "earth");

	let mut sequential = mid;
	tx2.apply(&mut sequential);

	let composed = tx1.changes().clone().compose(tx2.changes().clone());
	let mut via_composed = doc;
	composed.apply(&mut via_composed);

	assert_eq!(via_composed.to_string(), sequential.to_string());
	assert_eq!(composed.len(), 11);
	assert_eq!(composed.len_after(), sequential.len_chars());
}

#[test]
fn test_compose_chains() {
	let doc = Rope::from("abcdef");
	let tx1 = Transaction::replace(doc.slice(..), 1..3, "XY");
	let mut mid = doc.clone();
	tx1.apply(&mut mid);
	let tx2 = Transaction::replace(mid.slice(..), 0..2, "");
	let mut end = mid.clone();
	tx2.apply(&mut end);
	let tx3 = Transaction::replace(end.slice(..), 2..2, "!!");

	let composed = tx1
		.changes()
		.clone()
		.compose(tx2.changes().clone())
		.compose(tx3.changes().clone());
	assert_eq!(composed.len(), doc.len_chars());

	let mut sequential = end;
	tx3.apply(&mut sequential);
	let mut via_composed = doc;
	composed.apply(&mut via_composed);

	assert_eq!(via_composed.to_string(), sequential.to_string());
	assert_eq!(composed.len_after(), sequential.len_chars());
}

/// Generates a random ASCII document of variable length.
fn arb_document() -> impl Strategy<Value = Rope> {
	"[ -~\n]{0,200}".prop_map(|s| Rope::from(s.as_str()))
}

/// Generates a sorted, non-overlapping list of changes for a document.
fn arb_changes(doc_len: usize) -> impl Strategy<Value = Vec<Change>> {
	if doc_len == 0 {
		prop::collection::vec(
			any::<Option<String>>().prop_map(|replacement| Change {
				start: 0,
				end: 0,
				replacement: replacement.map(|s| s.chars().take(20).collect()),
			}),
			0..3,
		)
		.boxed()
	} else {
		prop::collection::vec((0..doc_len, 0..=10usize, any::<Option<String>>()), 0..5)
			.prop_map(move |mut items| {
				// Sort by start position and make non-overlapping
				items.sort_by_key(|(pos, _, _)| *pos);
				let mut changes = Vec::new();
				let mut last_end = 0;

				for (pos, delete_len, replacement) in items {
					let start = pos.max(last_end);
					if start >= doc_len {
						break;
					}
					let end = (start + delete_len).min(doc_len);
					changes.push(Change {
						start,
						end,
						replacement: replacement.map(|s| s.chars().take(20).collect()),
					});
					last_end = end;
				}
				changes
			})
			.boxed()
	}
}

/// Document plus two change lists, the second valid against the document
/// produced by the first.
fn arb_compose_inputs() -> impl Strategy<Value = (Rope, Vec<Change>, Vec<Change>)> {
	arb_document()
		.prop_flat_map(|doc| {
			let len = doc.len_chars();
			(Just(doc), arb_changes(len))
		})
		.prop_flat_map(|(doc, first)| {
			let mid_len = Transaction::change(doc.slice(..), first.clone())
				.changes()
				.len_after();
			(Just(doc), Just(first), arb_changes(mid_len))
		})
}

proptest! {
	/// Applying a transaction and then its inverse restores the document.
	#[test]
	fn prop_invert_roundtrip(doc in arb_document()) {
		let doc_len = doc.len_chars();
		let changes = arb_changes(doc_len);

		proptest!(|(changes in changes)| {
			let original = doc.clone();
			let mut modified = doc.clone();

			let tx = Transaction::change(original.slice(..), changes);
			tx.apply(&mut modified);

			tx.invert(&original).apply(&mut modified);

			prop_assert_eq!(
				modified.to_string(),
				original.to_string(),
				"inverse should restore original content"
			);
		});
	}

	/// Composing two change sets matches applying them one after the other.
	#[test]
	fn prop_compose_agreement((doc, first, second) in arb_compose_inputs()) {
		let tx1 = Transaction::change(doc.slice(..), first);
		let mut sequential = doc.clone();
		tx1.apply(&mut sequential);

		let tx2 = Transaction::change(sequential.slice(..), second);
		let composed = tx1.changes().clone().compose(tx2.changes().clone());
		tx2.apply(&mut sequential);

		let mut via_composed = doc.clone();
		composed.apply(&mut via_composed);

		prop_assert_eq!(via_composed.to_string(), sequential.to_string());
		prop_assert_eq!(composed.len(), doc.len_chars());
		prop_assert_eq!(composed.len_after(), sequential.len_chars());
	}

	/// Mapped positions stay within the transformed document.
	#[test]
	fn prop_map_pos_bounds(doc in arb_document()) {
		let doc_len = doc.len_chars();
		let changes = arb_changes(doc_len);

		proptest!(|(changes in changes, pos in 0..=doc_len)| {
			let tx = Transaction::change(doc.slice(..), changes);
			let after = tx.changes().len_after();
			prop_assert!(tx.map_pos(pos, Bias::Left) <= after);
			prop_assert!(tx.map_pos(pos, Bias::Right) <= after);
		});
	}

	/// Mapping preserves relative order for a fixed bias.
	#[test]
	fn prop_map_pos_monotonic(doc in arb_document()) {
		let doc_len = doc.len_chars();
		let changes = arb_changes(doc_len);

		proptest!(|(changes in changes, a in 0..=doc_len, b in 0..=doc_len)| {
			let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
			let tx = Transaction::change(doc.slice(..), changes);
			prop_assert!(tx.map_pos(lo, Bias::Left) <= tx.map_pos(hi, Bias::Left));
			prop_assert!(tx.map_pos(lo, Bias::Right) <= tx.map_pos(hi, Bias::Right));
		});
	}
}
