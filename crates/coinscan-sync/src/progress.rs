//! Progress observation.
//!
//! Purely cosmetic: observers are told how far the run has advanced
//! after each committed batch, in height units. Nothing about
//! correctness depends on them.

/// Observer invoked after each committed batch.
pub trait ProgressObserver: Send {
    /// `completed` heights of `total` have been durably committed in
    /// this run. Called once per batch, with `completed` strictly
    /// increasing up to `total`.
    fn on_progress(&mut self, completed: u64, total: u64);
}

impl<F> ProgressObserver for F
where
    F: FnMut(u64, u64) + Send,
{
    fn on_progress(&mut self, completed: u64, total: u64) {
        self(completed, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_observers() {
        let mut seen = Vec::new();
        {
            let mut observer = |completed: u64, total: u64| seen.push((completed, total));
            observer.on_progress(10, 20);
            observer.on_progress(20, 20);
        }
        assert_eq!(seen, vec![(10, 20), (20, 20)]);
    }
}
