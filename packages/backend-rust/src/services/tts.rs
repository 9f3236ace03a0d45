use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{error, warn};

pub const DEFAULT_LANG: &str = "el";
pub const DEFAULT_RATE: &str = "+0%";
pub const DEFAULT_VOICE: &str = "en-US-AriaNeural";
pub const MAX_TEXT_CHARS: usize = 500;
const SYNTH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum TtsError {
    #[error("text must be between 1 and {MAX_TEXT_CHARS} characters")]
    InvalidText,
    #[error("speech synthesis is not configured")]
    NotConfigured,
    #[error("synthesis request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("synthesis endpoint returned HTTP {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("synthesis returned no audio")]
    EmptyAudio,
}

pub fn voice_for(lang: &str) -> &'static str {
    fn lookup(code: &str) -> Option<&'static str> {
        match code {
            "en" | "en-US" => Some("en-US-AriaNeural"),
            "en-GB" => Some("en-GB-SoniaNeural"),
            "el" | "el-GR" => Some("el-GR-AthinaNeural"),
            _ => None,
        }
    }
    lookup(lang)
        .or_else(|| lang.split('-').next().and_then(lookup))
        .unwrap_or(DEFAULT_VOICE)
}

/// Hex sha256 of `text|voice|rate`
pub fn cache_key(text: &str, voice: &str, rate: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{text}|{voice}|{rate}").as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &str, rate: &str) -> Result<Bytes, TtsError>;
}

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    voice: &'a str,
    rate: &'a str,
}

/// Posts `{text, voice, rate}` to an HTTP synthesis service that answers
/// with MP3 bytes.
pub struct HttpSynthesizer {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpSynthesizer {
    pub fn new(endpoint: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(SYNTH_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { endpoint, client }
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str, voice: &str, rate: &str) -> Result<Bytes, TtsError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&SynthesisRequest { text, voice, rate })
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TtsError::HttpStatus(status));
        }
        let audio = resp.bytes().await?;
        if audio.is_empty() {
            return Err(TtsError::EmptyAudio);
        }
        Ok(audio)
    }
}

#[derive(Clone)]
pub struct TtsService {
    cache_dir: PathBuf,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
}

impl TtsService {
    pub fn new(cache_dir: PathBuf, endpoint: Option<String>) -> Self {
        let synthesizer = endpoint.map(|url| Arc::new(HttpSynthesizer::new(url)) as Arc<dyn SpeechSynthesizer>);
        Self::with_synthesizer(cache_dir, synthesizer)
    }

    pub fn with_synthesizer(cache_dir: PathBuf, synthesizer: Option<Arc<dyn SpeechSynthesizer>>) -> Self {
        Self { cache_dir, synthesizer }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn cache_path(&self, text: &str, voice: &str, rate: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.mp3", cache_key(text, voice, rate)))
    }

    /// Returns MP3 audio for `text`, from the disk cache when possible.
    pub async fn speak(&self, text: &str, lang: Option<&str>, rate: Option<&str>) -> Result<Bytes, TtsError> {
        let len = text.chars().count();
        if len == 0 || len > MAX_TEXT_CHARS {
            return Err(TtsError::InvalidText);
        }
        let voice = voice_for(lang.unwrap_or(DEFAULT_LANG));
        let rate = rate.filter(|r| !r.is_empty()).unwrap_or(DEFAULT_RATE);
        let path = self.cache_path(text, voice, rate);

        if let Ok(cached) = tokio::fs::read(&path).await {
            return Ok(Bytes::from(cached));
        }

        let synthesizer = self.synthesizer.as_ref().ok_or(TtsError::NotConfigured)?;
        let audio = synthesizer.synthesize(text, voice, rate).await.map_err(|e| {
            error!(error = %e, voice, "TTS generation failed");
            e
        })?;

        if let Err(e) = self.write_cache(&path, &audio).await {
            warn!(error = %e, path = %path.display(), "failed to cache TTS audio");
        }
        Ok(audio)
    }

    async fn write_cache(&self, path: &Path, audio: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        tokio::fs::write(path, audio).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSynth {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SpeechSynthesizer for CountingSynth {
        async fn synthesize(&self, text: &str, _voice: &str, _rate: &str) -> Result<Bytes, TtsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from(format!("ID3{text}")))
        }
    }

    #[test]
    fn test_voice_lookup() {
        assert_eq!(voice_for("en"), "en-US-AriaNeural");
        assert_eq!(voice_for("en-GB"), "en-GB-SoniaNeural");
        assert_eq!(voice_for("el"), "el-GR-AthinaNeural");
        assert_eq!(voice_for("el-CY"), "el-GR-AthinaNeural");
        assert_eq!(voice_for("fr"), DEFAULT_VOICE);
    }

    #[test]
    fn test_cache_key_deterministic() {
        let a = cache_key("hello", "en-US-AriaNeural", "+0%");
        let b = cache_key("hello", "en-US-AriaNeural", "+0%");
        let c = cache_key("hello", "en-US-AriaNeural", "+10%");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_speak_caches_audio() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Arc::new(CountingSynth {
            calls: AtomicUsize::new(0),
        });
        let service = TtsService::with_synthesizer(dir.path().join("tts"), Some(synth.clone()));

        let first = service.speak("γεια", None, None).await.unwrap();
        let second = service.speak("γεια", None, None).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(synth.calls.load(Ordering::SeqCst), 1);
        assert!(service.cache_path("γεια", "el-GR-AthinaNeural", "+0%").exists());
    }

    #[tokio::test]
    async fn test_speak_validates_text() {
        let dir = tempfile::tempdir().unwrap();
        let service = TtsService::new(dir.path().to_path_buf(), None);
        assert!(matches!(service.speak("", None, None).await, Err(TtsError::InvalidText)));
        let long = "a".repeat(MAX_TEXT_CHARS + 1);
        assert!(matches!(service.speak(&long, None, None).await, Err(TtsError::InvalidText)));
        assert!(matches!(service.speak("hi", Some("en"), None).await, Err(TtsError::NotConfigured)));
    }
}
