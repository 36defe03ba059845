// Generator adapters: hosted model, offline templates, and the fallback chain.

mod template;
mod upstream;

pub use template::TemplateGenerator;
pub use upstream::UpstreamGenerator;

use async_trait::async_trait;

use crate::domain::entities::GenerationParams;
use crate::domain::errors::GeneratorError;
use crate::domain::ports::Generator;

// Tries the primary generator when configured and falls back to the secondary
// when the primary is unavailable. Credit exhaustion is not masked.
#[derive(Clone)]
pub struct FallbackGenerator<P, F> {
    pub primary: Option<P>,
    pub fallback: F,
}

#[async_trait]
impl<P, F> Generator for FallbackGenerator<P, F>
where
    P: Generator,
    F: Generator,
{
    async fn generate(&self, params: &GenerationParams) -> Result<Vec<String>, GeneratorError> {
        let Some(primary) = &self.primary else {
            return self.fallback.generate(params).await;
        };

        match primary.generate(params).await {
            Ok(results) if !results.is_empty() => Ok(results),
            Ok(_) => {
                tracing::warn!("primary generator returned no results; using fallback");
                self.fallback.generate(params).await
            }
            Err(GeneratorError::Unavailable(reason)) => {
                tracing::warn!(%reason, "primary generator unavailable; using fallback");
                self.fallback.generate(params).await
            }
            Err(GeneratorError::CreditsExhausted) => Err(GeneratorError::CreditsExhausted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::GenerationKind;
    use crate::use_cases::test_support::{StubGenerator, StubOutcome};

    fn params() -> GenerationParams {
        GenerationParams {
            kind: GenerationKind::Opener,
            profile_text: "Marathon runner".to_string(),
            tone: None,
        }
    }

    #[tokio::test]
    async fn when_primary_is_not_configured_then_fallback_is_used() {
        let generator = FallbackGenerator::<StubGenerator, _> {
            primary: None,
            fallback: StubGenerator::returning(&["template"]),
        };

        let results = generator.generate(&params()).await.expect("generate");

        assert_eq!(results, vec!["template"]);
    }

    #[tokio::test]
    async fn when_primary_succeeds_then_fallback_is_not_called() {
        let fallback = StubGenerator::returning(&["template"]);
        let generator = FallbackGenerator {
            primary: Some(StubGenerator::returning(&["model"])),
            fallback: fallback.clone(),
        };

        let results = generator.generate(&params()).await.expect("generate");

        assert_eq!(results, vec!["model"]);
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn when_primary_is_unavailable_then_fallback_results_are_returned() {
        let generator = FallbackGenerator {
            primary: Some(StubGenerator::failing(StubOutcome::Unavailable)),
            fallback: StubGenerator::returning(&["template"]),
        };

        let results = generator.generate(&params()).await.expect("generate");

        assert_eq!(results, vec!["template"]);
    }

    #[tokio::test]
    async fn when_primary_credits_are_exhausted_then_error_is_propagated() {
        let fallback = StubGenerator::returning(&["template"]);
        let generator = FallbackGenerator {
            primary: Some(StubGenerator::failing(StubOutcome::CreditsExhausted)),
            fallback: fallback.clone(),
        };

        let result = generator.generate(&params()).await;

        assert!(matches!(result, Err(GeneratorError::CreditsExhausted)));
        assert_eq!(fallback.calls(), 0);
    }
}
