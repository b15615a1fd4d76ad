use analysis_core::{AnalysisError, AnalysisResult};

/// Lazily fitted model slot.
///
/// A model starts `Unfitted`, becomes `Fitted` on first use and returns to
/// `Unfitted` on [`ModelState::clear`].
#[derive(Debug, Clone, PartialEq)]
pub enum ModelState<M> {
    Unfitted,
    Fitted(M),
}

impl<M> Default for ModelState<M> {
    fn default() -> Self {
        ModelState::Unfitted
    }
}

impl<M> ModelState<M> {
    pub fn is_fitted(&self) -> bool {
        matches!(self, ModelState::Fitted(_))
    }

    pub fn get(&self) -> Option<&M> {
        match self {
            ModelState::Fitted(model) => Some(model),
            ModelState::Unfitted => None,
        }
    }

    /// Store `model`, replacing any previous fit.
    pub fn set(&mut self, model: M) {
        *self = ModelState::Fitted(model);
    }

    /// Return the cached model, fitting it with `fit` first if the slot is empty.
    pub fn fit_with<F>(&mut self, fit: F) -> AnalysisResult<&M>
    where
        F: FnOnce() -> AnalysisResult<M>,
    {
        if !self.is_fitted() {
            self.set(fit()?);
        }
        self.get().ok_or_else(|| {
            AnalysisError::CalculationError("Model state is empty after fitting".to_string())
        })
    }

    pub fn clear(&mut self) {
        *self = ModelState::Unfitted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_with_runs_once() {
        let mut state: ModelState<u32> = ModelState::default();
        assert!(!state.is_fitted());

        let mut calls = 0;
        let first = *state
            .fit_with(|| {
                calls += 1;
                Ok(7)
            })
            .unwrap();
        assert_eq!(first, 7);

        let second = *state.fit_with(|| Ok(99)).unwrap();
        assert_eq!(second, 7);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_clear_returns_to_unfitted() {
        let mut state = ModelState::Fitted(1.5);
        state.clear();
        assert_eq!(state, ModelState::Unfitted);
        assert!(state.get().is_none());
    }

    #[test]
    fn test_failed_fit_leaves_state_empty() {
        let mut state: ModelState<f64> = ModelState::Unfitted;
        let result = state.fit_with(|| Err(AnalysisError::CalculationError("boom".to_string())));
        assert!(result.is_err());
        assert!(!state.is_fitted());
    }
}
