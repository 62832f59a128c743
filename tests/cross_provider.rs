//! Live integration tests against a real OpenAI-compatible endpoint.
//!
//! Run with an API key set:
//! ```bash
//! OPENAI_API_KEY=... cargo test --test cross_provider --features openai -- --ignored
//! ```
//!
//! All tests require a live endpoint and are `#[ignore]` by default.

#![cfg(feature = "openai")]

use argo::prelude::*;
use argo_provider_openai::OpenAiCompatProvider;
use std::sync::Arc;

#[tokio::test]
#[ignore]
async fn openai_answers_a_quick_turn() {
    let api_key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY must be set");
    let provider = OpenAiCompatProvider::new(api_key);

    let assistant = Assistant::builder()
        .provider(Arc::new(provider))
        .build()
        .expect("builder requires only a provider");

    let outcome = assistant
        .send_message("cross-provider-openai", "Say hello in exactly 3 words.", Mode::Quick)
        .await
        .expect("a live OpenAI-compatible endpoint should answer a quick turn");

    assert!(!outcome.final_text.trim().is_empty());
}

#[tokio::test]
#[ignore]
async fn a_local_openai_compatible_server_answers_the_same_way() {
    // Point at a local OpenAI-compatible server (Ollama's /v1 shim, vLLM, ...)
    // instead of OpenAI itself, exercising the same Provider impl against a
    // different endpoint with no bearer token.
    let api_url = std::env::var("LOCAL_OPENAI_COMPAT_URL")
        .unwrap_or_else(|_| "http://localhost:11434/v1/chat/completions".to_string());
    let provider = OpenAiCompatProvider::local(api_url);

    let assistant = Assistant::builder()
        .provider(Arc::new(provider))
        .build()
        .expect("builder requires only a provider");

    let outcome = assistant
        .send_message("cross-provider-local", "Say hello in exactly 3 words.", Mode::Quick)
        .await
        .expect("a local OpenAI-compatible endpoint should answer a quick turn");

    assert!(!outcome.final_text.trim().is_empty());
}
