use crate::domain::entities::GenerationParams;
use crate::domain::errors::GenerationError;
use crate::domain::ports::{Generator, MemberVerifier};
use crate::use_cases::generate::{map_generator_error, validate_params};

// Member generation: no usage counters and no per-run cap.
pub struct MemberGenerateUseCase<V, G> {
    pub verifier: V,
    pub generator: G,
}

impl<V, G> MemberGenerateUseCase<V, G>
where
    V: MemberVerifier,
    G: Generator,
{
    pub async fn execute(
        &self,
        access_token: &str,
        params: GenerationParams,
    ) -> Result<Vec<String>, GenerationError> {
        if !self.verifier.is_member(access_token) {
            return Err(GenerationError::Unauthorized);
        }
        let params = validate_params(params)?;

        let mut results = self
            .generator
            .generate(&params)
            .await
            .map_err(map_generator_error)?;
        results.retain(|item| !item.trim().is_empty());
        if results.is_empty() {
            return Err(GenerationError::GenerationFailed);
        }

        Ok(results)
    }
}
