//! Yes/no confirmation capability used by the duplicate and removal gates.

use std::future::Future;
use std::io::{BufRead, Write};

/// Asks the user a yes/no question and suspends until answered.
///
/// A dismissed or unanswerable prompt resolves to `false`.
pub trait Prompt: Send + Sync {
    fn confirm(&self, question: &str) -> impl Future<Output = bool> + Send;
}

/// Prompts on the terminal. EOF or a read error counts as "no".
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    async fn confirm(&self, question: &str) -> bool {
        let question = question.to_string();
        tokio::task::spawn_blocking(move || {
            print!("{} [y/N] ", question);
            let _ = std::io::stdout().flush();

            let mut line = String::new();
            match std::io::stdin().lock().read_line(&mut line) {
                Ok(0) | Err(_) => false,
                Ok(_) => is_yes(&line),
            }
        })
        .await
        .unwrap_or(false)
    }
}

/// Answers every question the same way (`--yes`, scripted runs).
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Prompt for AutoConfirm {
    async fn confirm(&self, question: &str) -> bool {
        tracing::debug!(question, answer = self.0, "Auto-answered confirmation");
        self.0
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "是" | "確定"
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned answers and records the questions; `false` once exhausted.
    #[derive(Default)]
    pub(crate) struct ScriptedPrompt {
        answers: Mutex<VecDeque<bool>>,
        pub asked: Mutex<Vec<String>>,
    }

    impl ScriptedPrompt {
        pub(crate) fn new(answers: &[bool]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().copied().collect()),
                asked: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn questions(&self) -> Vec<String> {
            self.asked.lock().unwrap().clone()
        }
    }

    impl Prompt for ScriptedPrompt {
        async fn confirm(&self, question: &str) -> bool {
            self.asked.lock().unwrap().push(question.to_string());
            self.answers.lock().unwrap().pop_front().unwrap_or(false)
        }
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(is_yes("是"));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("maybe"));
    }

    #[tokio::test]
    async fn test_scripted_prompt_defaults_to_no() {
        let prompt = ScriptedPrompt::new(&[true]);
        assert!(prompt.confirm("a").await);
        assert!(!prompt.confirm("b").await);
        assert_eq!(prompt.questions(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_auto_confirm() {
        assert!(AutoConfirm(true).confirm("x").await);
        assert!(!AutoConfirm(false).confirm("x").await);
    }
}
