//! Confirmation gate for destructive operations

use async_trait::async_trait;

use crate::types::JobId;

/// What the user is asked before a desktop is deleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionPrompt {
    pub title: String,
    pub content: String,
    pub job_id: JobId,
}

impl DeletionPrompt {
    /// Standard prompt naming the job
    pub fn for_job(job_id: &JobId) -> Self {
        Self {
            title: "Are you sure?".to_string(),
            content: format!(
                "Are you sure you would like to delete desktop #{}?",
                job_id
            ),
            job_id: job_id.clone(),
        }
    }
}

/// Blocking yes/no confirmation
///
/// Returning `false` covers both "no" and dismissal.
#[async_trait]
pub trait ConfirmDeletion: Send + Sync {
    async fn confirm(&self, prompt: &DeletionPrompt) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_names_job() {
        let prompt = DeletionPrompt::for_job(&JobId::new("4242"));
        assert_eq!(prompt.title, "Are you sure?");
        assert!(prompt.content.contains("#4242"));
    }

    struct Decline;

    #[async_trait]
    impl ConfirmDeletion for Decline {
        async fn confirm(&self, _prompt: &DeletionPrompt) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_confirm_through_trait_object() {
        let gate: &dyn ConfirmDeletion = &Decline;
        let prompt = DeletionPrompt::for_job(&JobId::new("7"));
        assert!(!gate.confirm(&prompt).await);
    }
}
