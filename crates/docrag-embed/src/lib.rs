//! Embedding functions: a candle BERT sentence-transformer and a hashed
//! character-trigram fake for tests and offline development.

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::hash::Hasher;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::Tokenizer;
use twox_hash::XxHash64;

use docrag_core::config::EmbeddingSettings;
use docrag_core::error::Error as CoreError;
pub use docrag_core::traits::Embedder;

mod device;
mod pool;
mod tokenize;

pub use device::select_device;
pub use pool::masked_mean_l2;
pub use tokenize::tokenize_batch;

const DEFAULT_MODEL_DIR: &str = "models/all-MiniLM-L6-v2";

/// Sentence-transformer (BERT family, e.g. all-MiniLM-L6-v2) on candle.
pub struct SentenceEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    pad_id: u32,
    dim: usize,
    max_len: usize,
    id: String,
}

impl SentenceEmbedder {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = select_device();
        tracing::info!(dir = %model_dir.display(), "loading sentence-transformer");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let pad_id = tokenizer.token_to_id("[PAD]").unwrap_or(0);

        let config_path = model_dir.join("config.json");
        let config: BertConfig = serde_json::from_str(
            &std::fs::read_to_string(&config_path).with_context(|| format!("reading {}", config_path.display()))?,
        )?;

        let vb = load_weights(model_dir, &device)?;
        let model = BertModel::load(vb, &config)?;
        let dim = config.hidden_size;
        let name = model_dir.file_name().map_or_else(|| "model".to_string(), |n| n.to_string_lossy().into_owned());
        let max_len = max_len.min(config.max_position_embeddings);
        tracing::info!(model = %name, dim, max_len, "sentence-transformer ready");
        Ok(Self { model, tokenizer, device, pad_id, dim, max_len, id: format!("bert:{name}:d{dim}") })
    }

    fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let (input_ids, attention_mask) =
            tokenize_batch(&self.tokenizer, texts, self.max_len, self.pad_id, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let vectors: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_dtype(candle_core::DType::F32)?.to_vec2()?;
        tracing::debug!(batch = texts.len(), elapsed_ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(vectors)
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    let tensors: HashMap<String, Tensor> = if safetensors.exists() {
        candle_core::safetensors::load(&safetensors, device)?
    } else {
        let pth = model_dir.join("pytorch_model.bin");
        if !pth.exists() {
            return Err(anyhow!("no model.safetensors or pytorch_model.bin in {}", model_dir.display()));
        }
        candle_core::pickle::read_all(&pth)?.into_iter().collect()
    };
    Ok(VarBuilder::from_tensors(tensors, DTYPE, device))
}

impl Embedder for SentenceEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn embed_batch(&self, texts: &[String]) -> docrag_core::error::Result<Vec<Vec<f32>>> {
        self.embed_texts(texts).map_err(|e| CoreError::Embedding(format!("{e:#}")))
    }
}

/// Model-free embedder: signed feature hashing of per-word character trigrams.
///
/// Texts sharing word fragments (`mammal`/`mammals`) land close under cosine,
/// which is enough for deterministic retrieval tests.
pub struct FakeEmbedder {
    dim: usize,
    id: String,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1), id: format!("fake:trigram:d{}", dim.max(1)) }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        let lower = text.to_lowercase();
        for word in lower.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let padded: Vec<char> = std::iter::once(' ').chain(word.chars()).chain(std::iter::once(' ')).collect();
            for gram in padded.windows(3) {
                let mut hasher = XxHash64::with_seed(0);
                for c in gram {
                    hasher.write_u32(*c as u32);
                }
                let h = hasher.finish();
                let idx = (h % self.dim as u64) as usize;
                let sign = if h >> 63 == 1 { -1.0 } else { 1.0 };
                v[idx] += sign;
            }
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            v[0] = 1.0;
        } else {
            for x in &mut v { *x /= norm; }
        }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }
    fn embed_batch(&self, texts: &[String]) -> docrag_core::error::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

fn fake_requested_by_env() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Pick the embedder for this process: the fake when requested by config or
/// `APP_USE_FAKE_EMBEDDINGS=1`, otherwise the sentence-transformer.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    if settings.use_fake || fake_requested_by_env() {
        tracing::info!(dim = settings.fake_dim, "using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(settings.fake_dim)));
    }
    let model_dir = resolve_model_dir(settings.model_dir.as_deref())?;
    Ok(Box::new(SentenceEmbedder::load(&model_dir, settings.max_len)?))
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    first_existing_dir(model_dir_candidates(configured))
}

/// Lookup order: config, `APP_MODEL_DIR`, `MODEL_DIR`, then the bundled default.
fn model_dir_candidates(configured: Option<&str>) -> Vec<(&'static str, PathBuf)> {
    configured
        .map(|d| ("embedding.model_dir", docrag_core::config::expand_path(d)))
        .into_iter()
        .chain(std::env::var("APP_MODEL_DIR").ok().map(|d| ("APP_MODEL_DIR", PathBuf::from(d))))
        .chain(std::env::var("MODEL_DIR").ok().map(|d| ("MODEL_DIR", PathBuf::from(d))))
        .chain(std::iter::once(("default", PathBuf::from(DEFAULT_MODEL_DIR))))
        .collect()
}

fn first_existing_dir(candidates: Vec<(&'static str, PathBuf)>) -> Result<PathBuf> {
    for (origin, dir) in candidates {
        if dir.is_dir() {
            tracing::info!(origin, dir = %dir.display(), "using model directory");
            return Ok(dir);
        }
        tracing::debug!(origin, dir = %dir.display(), "model directory not found");
    }
    Err(anyhow!("Could not locate a sentence-transformer model directory (set embedding.model_dir or APP_MODEL_DIR)"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn fake_vectors_are_unit_length() {
        let e = FakeEmbedder::new(64);
        let v = e.embed_one("hello world").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn fake_is_case_insensitive_and_shares_fragments() {
        let e = FakeEmbedder::new(1024);
        let q = e.embed_one("Mammal").unwrap();
        let near = e.embed_one("mammals").unwrap();
        let far = e.embed_one("granite boulder").unwrap();
        assert!(cosine(&q, &near) > cosine(&q, &far));
        assert_eq!(e.embed_one("MAMMAL").unwrap(), q);
    }

    #[test]
    fn symbol_only_text_still_has_a_direction() {
        let e = FakeEmbedder::new(8);
        let v = e.embed_one("?!?").unwrap();
        assert_eq!(v[0], 1.0);
    }

    #[test]
    fn missing_model_dirs_are_an_error() {
        let candidates = vec![
            ("embedding.model_dir", PathBuf::from("/definitely/not/here")),
            ("default", PathBuf::from("/also/not/here")),
        ];
        let err = first_existing_dir(candidates).unwrap_err();
        assert!(err.to_string().contains("model directory"));
    }

    #[test]
    fn first_existing_model_dir_wins() {
        let existing = std::env::temp_dir();
        let candidates = vec![
            ("embedding.model_dir", PathBuf::from("/definitely/not/here")),
            ("APP_MODEL_DIR", existing.clone()),
            ("default", PathBuf::from(DEFAULT_MODEL_DIR)),
        ];
        assert_eq!(first_existing_dir(candidates).unwrap(), existing);
    }

    #[test]
    fn configured_dir_is_tried_first() {
        let candidates = model_dir_candidates(Some("~/models/mini"));
        assert_eq!(candidates[0].0, "embedding.model_dir");
        assert!(candidates[0].1.ends_with("models/mini"));
        assert_eq!(candidates.last().map(|c| c.0), Some("default"));
    }
}
