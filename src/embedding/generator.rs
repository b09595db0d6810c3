//! Strategy-level embedding generation.
//!
//! Wraps the provider client with the four symbol-field strategies plus a
//! generic text entry point. Blank input fast-fails locally with a fixed
//! message and never touches the network; provider failures come back as
//! `EmbeddingResult` values with `success = false`.

use tracing::debug;

use crate::embedding::client::OllamaClient;
use crate::types::EmbeddingResult;

/// Version tag written alongside every stored embedding.
///
/// Bump when the text-assembly strategies change so stale vectors can be
/// told apart from current ones.
pub const EMBEDDING_VERSION: &str = "1";

pub struct EmbeddingGenerator {
    client: OllamaClient,
    model: String,
    batch_size: usize,
}

impl EmbeddingGenerator {
    pub fn new(client: OllamaClient, model: impl Into<String>, batch_size: usize) -> Self {
        Self {
            client,
            model: model.into(),
            batch_size: batch_size.max(1),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    // -- Strategies ---------------------------------------------------------

    /// Embed a symbol name, qualified by its module when one is given.
    pub fn embed_name(&self, name: &str, module: &str) -> EmbeddingResult {
        if name.trim().is_empty() {
            return EmbeddingResult::fail("Empty name");
        }
        self.call(&qualified_name(name, module))
    }

    pub fn embed_signature(&self, signature: &str) -> EmbeddingResult {
        if signature.trim().is_empty() {
            return EmbeddingResult::fail("Empty signature");
        }
        self.call(signature)
    }

    pub fn embed_documentation(&self, documentation: &str) -> EmbeddingResult {
        if documentation.trim().is_empty() {
            return EmbeddingResult::fail("Empty documentation");
        }
        self.call(documentation)
    }

    /// Embed the concatenation of whichever parts are non-blank.
    pub fn embed_combined(&self, name: &str, signature: &str, documentation: &str) -> EmbeddingResult {
        let text = combined_text(name, signature, documentation);
        if text.is_empty() {
            return EmbeddingResult::fail("No content to embed");
        }
        self.call(&text)
    }

    /// The four embedding inputs for one symbol, in name / signature /
    /// documentation / combined order. Feed these through `embed_batch` to
    /// amortize provider round trips; blank entries fast-fail there without
    /// a call.
    pub fn symbol_texts(
        &self,
        name: &str,
        module: &str,
        signature: &str,
        documentation: &str,
    ) -> [String; 4] {
        [
            if name.trim().is_empty() {
                String::new()
            } else {
                qualified_name(name, module)
            },
            signature.to_string(),
            documentation.to_string(),
            combined_text(name, signature, documentation),
        ]
    }

    /// Generic single-text embedding.
    pub fn embed_text(&self, text: &str) -> EmbeddingResult {
        if text.trim().is_empty() {
            return EmbeddingResult::fail("Empty text");
        }
        self.call(text)
    }

    /// Embed many texts, chunked by the configured batch size.
    ///
    /// Returns one result per input, in order. Blank inputs fast-fail in
    /// place without being sent to the provider.
    pub fn embed_batch(&self, texts: &[String]) -> Vec<EmbeddingResult> {
        let mut results: Vec<Option<EmbeddingResult>> = texts
            .iter()
            .map(|t| {
                if t.trim().is_empty() {
                    Some(EmbeddingResult::fail("Empty text"))
                } else {
                    None
                }
            })
            .collect();

        let pending: Vec<usize> = (0..texts.len()).filter(|&i| results[i].is_none()).collect();

        for chunk in pending.chunks(self.batch_size) {
            let inputs: Vec<String> = chunk.iter().map(|&i| texts[i].clone()).collect();
            match self.client.embed(&self.model, &inputs) {
                Ok(embeddings) => {
                    for (&i, embedding) in chunk.iter().zip(embeddings) {
                        results[i] = Some(EmbeddingResult::ok(embedding));
                    }
                }
                Err(e) => {
                    debug!("batch embedding call failed: {e}");
                    for &i in chunk {
                        results[i] = Some(EmbeddingResult::fail(e.clone()));
                    }
                }
            }
        }

        results
            .into_iter()
            .map(|r| r.unwrap_or_else(|| EmbeddingResult::fail("Empty text")))
            .collect()
    }

    // -- Provider management ------------------------------------------------

    /// Non-blocking informational probe of the provider.
    pub fn is_available(&self) -> bool {
        self.client.is_available()
    }

    /// Make sure the configured model is present, pulling it if the provider
    /// supports that. Best-effort; failure is logged, not propagated.
    pub fn ensure_model(&self) {
        if let Err(e) = self.client.pull_model(&self.model) {
            debug!("model pull for '{}' did not complete: {e}", self.model);
        }
    }

    fn call(&self, text: &str) -> EmbeddingResult {
        match self.client.embed(&self.model, &[text.to_string()]) {
            Ok(mut embeddings) => match embeddings.pop() {
                Some(embedding) => EmbeddingResult::ok(embedding),
                None => EmbeddingResult::fail("provider returned no embedding"),
            },
            Err(e) => EmbeddingResult::fail(e),
        }
    }
}

fn qualified_name(name: &str, module: &str) -> String {
    if module.trim().is_empty() {
        name.to_string()
    } else {
        format!("{module}.{name}")
    }
}

/// Non-blank parts joined with newlines; empty when everything is blank.
fn combined_text(name: &str, signature: &str, documentation: &str) -> String {
    [name, signature, documentation]
        .into_iter()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A generator whose provider is unreachable; fast-fail paths must not
    /// depend on it.
    fn offline_generator() -> EmbeddingGenerator {
        let client = OllamaClient::new("http://127.0.0.1:1", 1).unwrap();
        EmbeddingGenerator::new(client, "nomic-embed-text", 32)
    }

    #[test]
    fn blank_name_fast_fails() {
        let gen = offline_generator();
        let result = gen.embed_name("   ", "strutils");
        assert!(!result.success);
        assert_eq!(result.error, "Empty name");
    }

    #[test]
    fn blank_signature_fast_fails() {
        let gen = offline_generator();
        assert_eq!(gen.embed_signature("").error, "Empty signature");
    }

    #[test]
    fn blank_documentation_fast_fails() {
        let gen = offline_generator();
        assert_eq!(gen.embed_documentation("\t\n").error, "Empty documentation");
    }

    #[test]
    fn all_blank_combined_fast_fails() {
        let gen = offline_generator();
        let result = gen.embed_combined("", "  ", "\n");
        assert!(!result.success);
        assert_eq!(result.error, "No content to embed");
    }

    #[test]
    fn blank_text_fast_fails() {
        let gen = offline_generator();
        assert_eq!(gen.embed_text("").error, "Empty text");
    }

    #[test]
    fn provider_failure_is_a_result_not_a_panic() {
        let gen = offline_generator();
        let result = gen.embed_text("parseInt converts a string to an integer");
        assert!(!result.success);
        assert!(result.embedding.is_empty());
        assert!(!result.error.is_empty());
    }

    #[test]
    fn symbol_texts_match_strategy_inputs() {
        let gen = offline_generator();
        let texts = gen.symbol_texts(
            "parseInt",
            "strutils",
            "proc parseInt*(s: string): int",
            "Parses an integer.",
        );
        assert_eq!(texts[0], "strutils.parseInt");
        assert_eq!(texts[1], "proc parseInt*(s: string): int");
        assert_eq!(texts[2], "Parses an integer.");
        assert_eq!(
            texts[3],
            "parseInt\nproc parseInt*(s: string): int\nParses an integer."
        );
    }

    #[test]
    fn symbol_texts_blank_fields_stay_blank() {
        let gen = offline_generator();
        let texts = gen.symbol_texts("walk", "", "iterator walk*(): Node", "");
        assert_eq!(texts[0], "walk");
        assert_eq!(texts[2], "");
        assert_eq!(texts[3], "walk\niterator walk*(): Node");

        let all_blank = gen.symbol_texts("", "", "", "  ");
        assert!(all_blank.iter().all(|t| t.trim().is_empty()));
    }

    #[test]
    fn batch_preserves_order_and_fast_fails_blanks() {
        let gen = offline_generator();
        let texts = vec![
            "first".to_string(),
            "".to_string(),
            "third".to_string(),
        ];
        let results = gen.embed_batch(&texts);
        assert_eq!(results.len(), 3);
        assert_eq!(results[1].error, "Empty text");
        // Non-blank entries hit the dead provider and fail with its message.
        assert!(!results[0].success);
        assert_ne!(results[0].error, "Empty text");
    }
}
