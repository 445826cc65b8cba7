use std::ops::Range;

/// A position in the text, measured in characters (not bytes).
///
/// This is the canonical coordinate space for stencil.
pub type CharIdx = usize;

/// A length or count in the text, measured in characters (not bytes).
///
/// This is distinct from CharIdx to avoid accidentally passing an index
/// where a length is expected or vice versa.
pub type CharLen = usize;

/// Returns true if `inner` lies entirely within `outer`.
///
/// Both ranges are half-open. An empty `inner` sitting on either boundary of
/// `outer` counts as contained.
#[inline]
pub fn span_contains(outer: &Range<CharIdx>, inner: &Range<CharIdx>) -> bool {
	outer.start <= inner.start && inner.end <= outer.end
}

/// Returns true if the two half-open ranges share at least one position.
///
/// An empty range intersects a range it sits inside of (strictly between the
/// endpoints), but not one it merely touches.
#[inline]
pub fn spans_intersect(a: &Range<CharIdx>, b: &Range<CharIdx>) -> bool {
	if a.start < b.end && b.start < a.end {
		return true;
	}
	(a.is_empty() && b.start < a.start && a.start < b.end)
		|| (b.is_empty() && a.start < b.start && b.start < a.end)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_span_contains() {
		assert!(span_contains(&(2..8), &(2..8)));
		assert!(span_contains(&(2..8), &(3..5)));
		assert!(span_contains(&(2..8), &(2..2)));
		assert!(span_contains(&(2..8), &(8..8)));
		assert!(!span_contains(&(2..8), &(1..3)));
		assert!(!span_contains(&(2..8), &(7..9)));
	}

	#[test]
	fn test_spans_intersect() {
		assert!(spans_intersect(&(2..8), &(7..10)));
		assert!(spans_intersect(&(2..8), &(0..3)));
		assert!(!spans_intersect(&(2..8), &(8..10)));
		assert!(!spans_intersect(&(2..8), &(0..2)));
	}

	#[test]
	fn test_empty_span_intersection() {
		// An empty span strictly inside a range intersects it.
		assert!(spans_intersect(&(4..4), &(2..8)));
		assert!(spans_intersect(&(2..8), &(4..4)));
		// Touching a boundary is not intersection.
		assert!(!spans_intersect(&(2..2), &(2..8)));
		assert!(!spans_intersect(&(8..8), &(2..8)));
		assert!(!spans_intersect(&(3..3), &(5..5)));
	}
}
