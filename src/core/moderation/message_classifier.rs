// Two-stage offensiveness check.
//
// 1. Lexical: scan the registry snapshot. A hit is final, the external
//    classifier is never called.
// 2. Semantic: ask the external classifier for the most offensive word.
//    A named word is written back into the registry so the next occurrence
//    is caught lexically.
//
// The semantic stage fails open. Any transport error, malformed reply or
// timeout makes the message Clean and is only logged, so an outage of the
// classifier lets offensive messages through that the registry doesn't know.

use super::bad_word_registry::BadWordRegistry;
use super::moderation_models::{validate_term, Detection, Verdict};
use super::moderation_store::ModerationStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Reply the classifier gives when it finds nothing offensive.
pub const NONE_SENTINEL: &str = "none";

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Classifier transport error: {0}")]
    Transport(String),

    #[error("Malformed classifier response: {0}")]
    MalformedResponse(String),

    #[error("Classifier timed out after {0:?}")]
    Timeout(Duration),
}

/// External natural-language classifier.
#[async_trait]
pub trait SemanticClassifier: Send + Sync {
    /// Returns the classifier's free-text verdict for `text`.
    async fn classify_offensive(&self, text: &str) -> Result<String, ClassifierError>;
}

// Lets main pick the provider at runtime.
#[async_trait]
impl SemanticClassifier for Box<dyn SemanticClassifier> {
    async fn classify_offensive(&self, text: &str) -> Result<String, ClassifierError> {
        (**self).classify_offensive(text).await
    }
}

/// Prompt shared by every provider.
pub fn classification_prompt(text: &str) -> String {
    format!(
        "Does the message below contain an offensive word? Count disguised or \
         misspelled forms too. If it does, reply with only the single most \
         offensive word as it appears in the message. If it does not, reply \
         with only \"None\".\n\nMessage: \"{}\"",
        text
    )
}

/// The classifier's reply after sanitizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticVerdict {
    Clean,
    /// `storable` is false when the term is unfit as a registry key.
    Offensive { term: String, storable: bool },
}

/// Read a free-text verdict. The reply is untrusted input.
pub fn parse_verdict(raw: &str) -> SemanticVerdict {
    let cleaned = raw
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '`' | '*' | '.'))
        .to_lowercase();

    if cleaned.is_empty() || cleaned == NONE_SENTINEL {
        return SemanticVerdict::Clean;
    }

    match validate_term(&cleaned) {
        Ok(term) => SemanticVerdict::Offensive {
            term,
            storable: true,
        },
        Err(_) => SemanticVerdict::Offensive {
            term: cleaned,
            storable: false,
        },
    }
}

pub struct MessageClassifier<S: ModerationStore, C: SemanticClassifier> {
    registry: Arc<BadWordRegistry<S>>,
    semantic: C,
    timeout: Duration,
}

impl<S: ModerationStore, C: SemanticClassifier> MessageClassifier<S, C> {
    pub fn new(registry: Arc<BadWordRegistry<S>>, semantic: C, timeout: Duration) -> Self {
        Self {
            registry,
            semantic,
            timeout,
        }
    }

    /// Verdict for a message body. Depends only on the text and the registry.
    pub async fn classify(&self, text: &str) -> Verdict {
        if text.trim().is_empty() {
            return Verdict::Clean;
        }

        if let Some(term) = self.registry.find_in(text).await {
            return Verdict::Offensive(Detection::Lexical { term });
        }

        let raw = match self.ask_semantic(text).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Semantic check failed, treating message as clean");
                return Verdict::Clean;
            }
        };

        match parse_verdict(&raw) {
            SemanticVerdict::Clean => Verdict::Clean,
            SemanticVerdict::Offensive { term, storable } => {
                let stored = storable && self.learn(&term).await;
                Verdict::Offensive(Detection::Semantic { term, stored })
            }
        }
    }

    async fn ask_semantic(&self, text: &str) -> Result<String, ClassifierError> {
        tokio::time::timeout(self.timeout, self.semantic.classify_offensive(text))
            .await
            .map_err(|_| ClassifierError::Timeout(self.timeout))?
    }

    /// Write a detected term back into the registry. Returns whether it is registered now.
    async fn learn(&self, term: &str) -> bool {
        match self.registry.add(term).await {
            Ok(true) => {
                tracing::info!(term, "Detected offensive word added to registry");
                true
            }
            Ok(false) => true,
            Err(e) => {
                tracing::error!(term, error = %e, "Failed to store detected offensive word");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::test_support::ScriptedClassifier;
    use crate::infra::moderation::InMemoryModerationStore;

    const TIMEOUT: Duration = Duration::from_millis(200);

    async fn setup(
        words: &[&str],
        classifier: ScriptedClassifier,
    ) -> (
        Arc<BadWordRegistry<InMemoryModerationStore>>,
        MessageClassifier<InMemoryModerationStore, ScriptedClassifier>,
    ) {
        let registry = Arc::new(BadWordRegistry::new(Arc::new(
            InMemoryModerationStore::new(),
        )));
        for word in words {
            registry.add(word).await.unwrap();
        }
        let classifier = MessageClassifier::new(Arc::clone(&registry), classifier, TIMEOUT);
        (registry, classifier)
    }

    #[tokio::test]
    async fn test_lexical_hit_skips_semantic_stage() {
        let scripted = ScriptedClassifier::replying("idiot");
        let calls = scripted.calls();
        let (_, classifier) = setup(&["spam"], scripted).await;

        let verdict = classifier.classify("this is SPAM").await;

        assert_eq!(
            verdict,
            Verdict::Offensive(Detection::Lexical {
                term: "spam".to_string()
            })
        );
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_text_is_clean_without_calls() {
        let scripted = ScriptedClassifier::replying("idiot");
        let calls = scripted.calls();
        let (_, classifier) = setup(&[], scripted).await;

        assert_eq!(classifier.classify("   ").await, Verdict::Clean);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_none_reply_is_clean() {
        let (registry, classifier) = setup(&[], ScriptedClassifier::replying("None")).await;

        assert_eq!(classifier.classify("have a nice day").await, Verdict::Clean);
        assert!(registry.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_semantic_hit_is_learned() {
        let scripted = ScriptedClassifier::replying("  \"Dumbo\".\n");
        let calls = scripted.calls();
        let (registry, classifier) = setup(&[], scripted).await;

        let verdict = classifier.classify("you dumbo").await;

        assert_eq!(
            verdict,
            Verdict::Offensive(Detection::Semantic {
                term: "dumbo".to_string(),
                stored: true
            })
        );
        assert!(registry.contains("dumbo").await);

        // Second time the lexical stage catches it
        let verdict = classifier.classify("DUMBO again").await;
        assert!(matches!(verdict, Verdict::Offensive(Detection::Lexical { .. })));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_classifier_error_fails_open() {
        let (registry, classifier) = setup(&[], ScriptedClassifier::failing()).await;

        assert_eq!(classifier.classify("anything at all").await, Verdict::Clean);
        assert!(registry.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_classifier_timeout_fails_open() {
        let (_, classifier) = setup(&[], ScriptedClassifier::hanging()).await;

        assert_eq!(classifier.classify("slow network").await, Verdict::Clean);
    }

    #[tokio::test]
    async fn test_oversized_verdict_is_offensive_but_not_stored() {
        let long_reply = "x".repeat(200);
        let (registry, classifier) =
            setup(&[], ScriptedClassifier::replying(&long_reply)).await;

        let verdict = classifier.classify("some text").await;

        assert!(matches!(
            verdict,
            Verdict::Offensive(Detection::Semantic { stored: false, .. })
        ));
        assert!(registry.list().await.is_empty());
    }

    #[test]
    fn test_parse_verdict_variants() {
        assert_eq!(parse_verdict("None"), SemanticVerdict::Clean);
        assert_eq!(parse_verdict(" none. "), SemanticVerdict::Clean);
        assert_eq!(parse_verdict(""), SemanticVerdict::Clean);
        assert_eq!(parse_verdict("\n\t"), SemanticVerdict::Clean);
        assert_eq!(
            parse_verdict("**Jerk**"),
            SemanticVerdict::Offensive {
                term: "jerk".to_string(),
                storable: true
            }
        );
        assert_eq!(
            parse_verdict("first line\nsecond line"),
            SemanticVerdict::Offensive {
                term: "first line\nsecond line".to_string(),
                storable: false
            }
        );
    }

    #[test]
    fn test_prompt_embeds_message() {
        let prompt = classification_prompt("hello there");
        assert!(prompt.contains("Message: \"hello there\""));
        assert!(prompt.contains("\"None\""));
    }
}
