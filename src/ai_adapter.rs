// src/ai_adapter.rs
//! AI enrichment: provider abstraction + file cache + daily limit.
//! Consumers receive the client as an injected capability; when no
//! provider is configured they get an explicit disabled client, never a
//! nullable global.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Text returned by an enrichment provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiText {
    pub text: String,
}

/// Trait object used by the generated adapter and diagnostics.
#[async_trait::async_trait]
pub trait AiClient: Send + Sync {
    /// Generate a short snippet for the prompt, or `None` when the
    /// provider is disabled, limited, or failing.
    async fn generate(&self, prompt: &str) -> Option<AiText>;
    fn provider_name(&self) -> &'static str;
}

pub type DynAiClient = Arc<dyn AiClient>;

/// Config loaded from `config/ai.json`. Reading/parsing failure returns
/// the default (disabled) config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    /// Currently "gemini" is the only real provider.
    pub provider: Option<String>,
    /// Per-day call limit; defaults to 20 if absent.
    pub daily_limit: Option<u32>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: None,
            daily_limit: Some(20),
        }
    }
}

pub fn load_ai_config() -> AiConfig {
    let path = Path::new("config/ai.json");
    match fs::read_to_string(path) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_default(),
        Err(_) => AiConfig::default(),
    }
}

/// Factory: build a client according to config and environment.
///
/// * `AI_TEST_MODE=mock` returns a deterministic mock client.
/// * `enabled == false` returns the disabled client.
/// * Otherwise the Gemini provider wrapped with caching + daily limit.
pub fn build_client_from_config(config: &AiConfig) -> DynAiClient {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        let mock = MockProvider {
            fixed: AiText {
                text: "A hands-on role with real ownership from week one (mock).".to_string(),
            },
        };
        return Arc::new(CachingClient::new(
            mock,
            default_cache_dir(),
            config.daily_limit.unwrap_or(20),
        ));
    }

    if !config.enabled {
        return Arc::new(DisabledClient);
    }

    match config.provider.as_deref() {
        Some("gemini") => {
            let provider = GeminiProvider::new(None);
            Arc::new(CachingClient::new(
                provider,
                default_cache_dir(),
                config.daily_limit.unwrap_or(20),
            ))
        }
        _ => Arc::new(DisabledClient),
    }
}

/// Reads config from disk and builds a client.
pub fn build_ai_client() -> DynAiClient {
    build_client_from_config(&load_ai_config())
}

// ------------------------------------------------------------
// Provider abstraction + concrete providers
// ------------------------------------------------------------

/// Low-level provider doing the real remote call. Separated so the same
/// caching wrapper serves production and tests.
#[async_trait::async_trait]
pub trait Provider: Send + Sync + 'static {
    async fn fetch(&self, prompt: &str) -> Option<AiText>;
    fn name(&self) -> &'static str;
}

/// Gemini provider (generateContent API). Requires `GEMINI_API_KEY`.
pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    /// `model_override`: pass Some("gemini-1.5-pro") to override;
    /// defaults to gemini-1.5-flash.
    pub fn new(model_override: Option<&str>) -> Self {
        let api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
        let http = reqwest::Client::builder()
            .user_agent("opportunity-aggregator/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        let model = model_override.unwrap_or("gemini-1.5-flash").to_string();
        Self {
            http,
            api_key,
            model,
        }
    }
}

#[async_trait::async_trait]
impl Provider for GeminiProvider {
    async fn fetch(&self, prompt: &str) -> Option<AiText> {
        if self.api_key.is_empty() {
            return None;
        }

        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        struct GenerationConfig {
            temperature: f32,
            #[serde(rename = "maxOutputTokens")]
            max_output_tokens: u32,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            contents: Vec<Content<'a>>,
            #[serde(rename = "generationConfig")]
            generation_config: GenerationConfig,
        }
        #[derive(Deserialize)]
        struct Resp {
            candidates: Option<Vec<Candidate>>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: Option<RespContent>,
        }
        #[derive(Deserialize)]
        struct RespContent {
            parts: Option<Vec<RespPart>>,
        }
        #[derive(Deserialize)]
        struct RespPart {
            text: Option<String>,
        }

        let req = Req {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.4,
                max_output_tokens: 120,
            },
        };

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let resp = self.http.post(&url).json(&req).send().await.ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let body: Resp = resp.json().await.ok()?;
        let content = body
            .candidates
            .and_then(|mut c| c.drain(..).next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .and_then(|mut p| p.drain(..).next())
            .and_then(|p| p.text)
            .unwrap_or_default();
        let cleaned = sanitize_snippet(&content);
        if cleaned.is_empty() {
            None
        } else {
            Some(AiText { text: cleaned })
        }
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// Returns `None` always; used when enrichment is disabled.
pub struct DisabledClient;

#[async_trait::async_trait]
impl AiClient for DisabledClient {
    async fn generate(&self, _prompt: &str) -> Option<AiText> {
        None
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic provider for tests/local runs.
#[derive(Clone)]
pub struct MockProvider {
    pub fixed: AiText,
}

#[async_trait::async_trait]
impl Provider for MockProvider {
    async fn fetch(&self, _prompt: &str) -> Option<AiText> {
        Some(self.fixed.clone())
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Caching client wrapper (file cache + daily limit)
// ------------------------------------------------------------

/// File names and counter state are guarded by a `Mutex`. Cache hits do
/// not count against the daily limit; only real provider calls do.
pub struct CachingClient<P: Provider> {
    inner: P,
    cache_dir: PathBuf,
    daily_limit_max: u32,
    counter: Arc<Mutex<DailyCounter>>,
}

impl<P: Provider> CachingClient<P> {
    pub fn new(inner: P, cache_dir: PathBuf, daily_limit_max: u32) -> Self {
        let _ = fs::create_dir_all(&cache_dir);
        let counter = Arc::new(Mutex::new(
            load_daily_counter(&cache_dir).unwrap_or_default(),
        ));
        Self {
            inner,
            cache_dir,
            daily_limit_max,
            counter,
        }
    }

    async fn generate_impl(&self, prompt: &str) -> Option<AiText> {
        let key = cache_key(prompt);
        if let Some(hit) = read_cache_file(&self.cache_dir, &key) {
            return Some(hit);
        }

        {
            let mut g = self.counter.lock().ok()?;
            if g.is_expired() {
                g.reset_to_today();
                let _ = save_daily_counter(&self.cache_dir, &g);
            }
            if g.count >= self.daily_limit_max {
                return None;
            }
        }

        if let Some(mut fresh) = self.inner.fetch(prompt).await {
            fresh.text = sanitize_snippet(&fresh.text);
            if !fresh.text.is_empty() {
                let _ = write_cache_file(&self.cache_dir, &key, &fresh);
                if let Ok(mut g) = self.counter.lock() {
                    g.count = g.count.saturating_add(1);
                    let _ = save_daily_counter(&self.cache_dir, &g);
                }
                return Some(fresh);
            }
        }
        None
    }
}

#[async_trait::async_trait]
impl<P: Provider> AiClient for CachingClient<P> {
    async fn generate(&self, prompt: &str) -> Option<AiText> {
        self.generate_impl(prompt).await
    }
    fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}

// ------------------------------------------------------------
// File cache helpers
// ------------------------------------------------------------

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache/enrich")
}

fn cache_key(prompt: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn cache_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

fn read_cache_file(dir: &Path, key: &str) -> Option<AiText> {
    let path = cache_path(dir, key);
    let mut file = fs::File::open(path).ok()?;
    let mut buf = String::new();
    file.read_to_string(&mut buf).ok()?;
    serde_json::from_str(&buf).ok()
}

fn write_cache_file(dir: &Path, key: &str, value: &AiText) -> io::Result<()> {
    let path = cache_path(dir, key);
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
    let mut f = fs::File::create(&tmp)?;
    f.write_all(json.as_bytes())?;
    fs::rename(tmp, path)?;
    Ok(())
}

// ------------------------------------------------------------
// Daily counter helpers
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DailyCounter {
    date: String,
    count: u32,
}

impl Default for DailyCounter {
    fn default() -> Self {
        Self {
            date: today(),
            count: 0,
        }
    }
}

impl DailyCounter {
    fn is_expired(&self) -> bool {
        self.date != today()
    }
    fn reset_to_today(&mut self) {
        self.date = today();
        self.count = 0;
    }
}

fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

fn counter_path(dir: &Path) -> PathBuf {
    dir.join("daily_count.json")
}

fn load_daily_counter(dir: &Path) -> io::Result<DailyCounter> {
    let s = fs::read_to_string(counter_path(dir))?;
    serde_json::from_str(&s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn save_daily_counter(dir: &Path, dc: &DailyCounter) -> io::Result<()> {
    let p = counter_path(dir);
    let tmp = p.with_extension("json.tmp");
    let s = serde_json::to_string(dc).unwrap_or_else(|_| "{}".to_string());
    let mut f = fs::File::create(&tmp)?;
    f.write_all(s.as_bytes())?;
    fs::rename(tmp, p)?;
    Ok(())
}

// ------------------------------------------------------------
// Snippet hygiene
// ------------------------------------------------------------

/// Single line, ASCII, <=240 chars, collapsed whitespace.
pub fn sanitize_snippet(input: &str) -> String {
    let mut out = String::with_capacity(240);
    let mut prev_space = false;
    for ch in input.chars() {
        let c = match ch {
            '\r' | '\n' | '\t' => ' ',
            c if c.is_ascii() => c,
            _ => ' ',
        };
        if c == ' ' {
            if !prev_space && !out.is_empty() {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
        if out.len() >= 240 {
            break;
        }
    }
    out.trim().to_string()
}
