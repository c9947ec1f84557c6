//! Generation backends: one blocking HTTP call per query.

use anyhow::{anyhow, bail, Result};
use std::time::Duration;

use docrag_core::config::GenerationSettings;
pub use docrag_core::traits::Generator;

mod gemini;
mod openai;

pub use gemini::GeminiGenerator;
pub use openai::OpenAiGenerator;

fn http_client(timeout: Duration, backend: &str) -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| anyhow!("failed to build {backend} HTTP client: {e}"))
}

fn env_key(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|n| std::env::var(n).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

/// Build the backend named by `settings.provider`.
pub fn build_generator(settings: &GenerationSettings) -> Result<Box<dyn Generator>> {
    let timeout = Duration::from_secs(settings.timeout_secs);
    let configured_key = settings.api_key.clone().filter(|k| !k.trim().is_empty());
    match settings.provider.to_ascii_lowercase().as_str() {
        "gemini" | "google" => {
            let key = configured_key
                .or_else(|| env_key(&["GEMINI_API_KEY", "GOOGLE_API_KEY"]))
                .ok_or_else(|| anyhow!("GEMINI_API_KEY must be set for the Gemini provider"))?;
            let mut g = GeminiGenerator::new(key, settings.model.clone(), timeout)?;
            if let Some(url) = &settings.base_url { g = g.with_base_url(url); }
            if let Some(t) = settings.temperature { g = g.with_temperature(t); }
            Ok(Box::new(g))
        }
        "openai" => {
            let key = configured_key.or_else(|| env_key(&["OPENAI_API_KEY"]));
            let mut g = OpenAiGenerator::new(key, settings.model.clone(), timeout)?;
            if let Some(url) = &settings.base_url { g = g.with_base_url(url); }
            if let Some(t) = settings.temperature { g = g.with_temperature(t); }
            Ok(Box::new(g))
        }
        other => bail!("unsupported generation provider '{}'; use gemini or openai", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_provider_is_rejected() {
        let settings = GenerationSettings { provider: "carrier-pigeon".into(), ..GenerationSettings::default() };
        let err = build_generator(&settings).err().expect("should fail");
        assert!(err.to_string().contains("carrier-pigeon"));
    }

    #[test]
    fn configured_key_wins_over_environment() {
        let settings = GenerationSettings { api_key: Some("from-config".into()), ..GenerationSettings::default() };
        let g = build_generator(&settings).expect("gemini with key");
        assert_eq!(g.name(), "gemini");
    }

    #[test]
    fn openai_works_without_key_for_local_servers() {
        let settings = GenerationSettings {
            provider: "openai".into(),
            model: "llama3".into(),
            base_url: Some("http://127.0.0.1:11434/v1".into()),
            ..GenerationSettings::default()
        };
        assert_eq!(build_generator(&settings).expect("openai").name(), "openai");
    }
}
