/// Aggregated view of session progress, useful for a presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub is_complete: bool,
}

/// A participant's accuracy on test statements.
///
/// `out_of` is the number of test statements in the catalog, not the queue
/// length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreReport {
    pub correct: usize,
    pub out_of: usize,
}
