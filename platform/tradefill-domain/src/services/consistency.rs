use crate::value_objects::coverage::{Consistency, Coverage};

/// Compares the stored row count with the id span: more rows than ids means
/// duplicates, fewer means gaps.
pub fn check_consistency(coverage: Option<&Coverage>, count: u64) -> Consistency {
    let expected = coverage.map(Coverage::expected_count).unwrap_or(0);
    if count > expected {
        Consistency::Duplicates(count - expected)
    } else if count < expected {
        Consistency::Gaps(expected - count)
    } else {
        Consistency::Verified
    }
}
