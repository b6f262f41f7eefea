use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::SpeechConfig;
use crate::http_client::Transport;

pub const AUDIO_URL_PREFIX: &str = "/audio-cache";

/// Renders text with a voice and returns a servable url for the audio.
pub trait SpeechSynth: Send + Sync {
    fn render(&self, text: &str, voice_id: &str) -> Result<String>;
}

/// ElevenLabs text-to-speech, writing mp3 files into the audio cache dir.
pub struct ElevenLabsClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    api_key: Option<String>,
    model_id: String,
    audio_dir: PathBuf,
}

impl ElevenLabsClient {
    pub fn new(transport: Arc<dyn Transport>, config: &SpeechConfig, audio_dir: PathBuf) -> Self {
        Self {
            transport,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model_id: config.model_id.clone(),
            audio_dir,
        }
    }
}

pub fn audio_file_name() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("stress_{}.mp3", &id[..16])
}

impl SpeechSynth for ElevenLabsClient {
    fn render(&self, text: &str, voice_id: &str) -> Result<String> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("speech api key not configured"))?;
        let url = format!("{}/text-to-speech/{voice_id}", self.base_url);
        let body = json!({
            "text": text,
            "model_id": self.model_id,
            "voice_settings": {"stability": 0.5, "similarity_boost": 0.7}
        });
        let headers = [("xi-api-key", key), ("Content-Type", "application/json")];
        let resp = self
            .transport
            .post_json(&url, &headers, &body)
            .map_err(|err| anyhow!("speech transport error: {err}"))?;
        if !resp.is_success() {
            warn!(status = resp.status, voice = voice_id, "speech synthesis failed");
            bail!("speech synthesis returned {}", resp.status);
        }

        fs::create_dir_all(&self.audio_dir)
            .with_context(|| format!("failed to create {}", self.audio_dir.display()))?;
        let file_name = audio_file_name();
        let path = self.audio_dir.join(&file_name);
        fs::write(&path, &resp.body).with_context(|| format!("failed to write {}", path.display()))?;
        debug!(file = %file_name, bytes = resp.body.len(), "audio cached");
        Ok(format!("{AUDIO_URL_PREFIX}/{file_name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::sync::Mutex;

    use crate::http_client::RawResponse;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(String, Value)>>,
    }

    impl Transport for Recorder {
        fn get(&self, _: &str, _: &[(&str, &str)]) -> Result<RawResponse, String> {
            Err("unused".to_string())
        }

        fn post_json(&self, url: &str, headers: &[(&str, &str)], body: &Value) -> Result<RawResponse, String> {
            assert!(headers.iter().any(|(k, v)| *k == "xi-api-key" && *v == "secret"));
            self.seen.lock().expect("lock").push((url.to_string(), body.clone()));
            Ok(RawResponse::ok(b"ID3fakeaudio".to_vec()))
        }
    }

    fn config(key: Option<&str>) -> SpeechConfig {
        SpeechConfig {
            base_url: "https://speech.test/v1/".to_string(),
            api_key: key.map(str::to_string),
            bookie_voice: "bookie".to_string(),
            skeptic_voice: "skeptic".to_string(),
            model_id: "eleven_turbo_v2".to_string(),
        }
    }

    #[test]
    fn renders_into_audio_cache() {
        let dir = tempfile::tempdir().expect("tempdir");
        let transport = Arc::new(Recorder::default());
        let client = ElevenLabsClient::new(transport.clone(), &config(Some("secret")), dir.path().to_path_buf());
        let url = client.render("Lock it in.", "bookie").expect("render");
        assert!(url.starts_with("/audio-cache/stress_") && url.ends_with(".mp3"));
        let file = dir.path().join(url.trim_start_matches("/audio-cache/"));
        assert_eq!(fs::read(file).expect("audio"), b"ID3fakeaudio");

        let seen = transport.seen.lock().expect("lock");
        assert_eq!(seen[0].0, "https://speech.test/v1/text-to-speech/bookie");
        assert_eq!(seen[0].1["voice_settings"]["similarity_boost"], 0.7);
    }

    #[test]
    fn missing_key_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let client = ElevenLabsClient::new(Arc::new(Recorder::default()), &config(None), dir.path().to_path_buf());
        assert!(client.render("x", "bookie").is_err());
    }
}
