//! Ordered step checklist
//!
//! Guidance steps are a sequencing contract. The checklist records which
//! steps have been completed and rejects any completion that is not the
//! next step in order.

use sdk::errors::EngineError;

#[derive(Debug, Clone, Default)]
pub struct StepChecklist {
    steps: Vec<String>,
    completed: usize,
}

impl StepChecklist {
    pub fn new(steps: Vec<String>) -> Self {
        Self {
            steps,
            completed: 0,
        }
    }

    /// Index and text of the next pending step
    pub fn next(&self) -> Option<(usize, &str)> {
        self.steps
            .get(self.completed)
            .map(|step| (self.completed, step.as_str()))
    }

    /// Mark step `index` done; only the next pending step is accepted
    pub fn complete(&mut self, index: usize) -> Result<(), EngineError> {
        if index != self.completed || index >= self.steps.len() {
            return Err(EngineError::InvalidTransition {
                from: format!("step {}", self.completed),
                to: format!("step {}", index),
            });
        }
        self.completed += 1;
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.completed == self.steps.len()
    }

    /// Steps finished so far, in order
    pub fn completed(&self) -> &[String] {
        &self.steps[..self.completed]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checklist() -> StepChecklist {
        StepChecklist::new(vec!["read".into(), "analyze".into(), "verify".into()])
    }

    #[test]
    fn test_in_order_completion() {
        let mut list = checklist();

        assert_eq!(list.next(), Some((0, "read")));
        list.complete(0).unwrap();
        list.complete(1).unwrap();
        assert_eq!(list.completed(), ["read".to_string(), "analyze".to_string()]);
        list.complete(2).unwrap();
        assert!(list.is_complete());
        assert_eq!(list.next(), None);
    }

    #[test]
    fn test_out_of_order_rejected() {
        let mut list = checklist();

        let err = list.complete(1).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
        assert!(list.completed().is_empty());
    }

    #[test]
    fn test_repeat_rejected() {
        let mut list = checklist();
        list.complete(0).unwrap();
        assert!(list.complete(0).is_err());
    }

    #[test]
    fn test_past_end_rejected() {
        let mut list = StepChecklist::new(vec!["only".into()]);
        list.complete(0).unwrap();
        assert!(list.complete(1).is_err());
    }
}
