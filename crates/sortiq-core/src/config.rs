use serde::{Deserialize, Serialize};

/// Per-run video analysis settings.
///
/// Supplied once at extractor construction and never mutated during a run;
/// callers that want different settings build a new extractor.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VideoConfig {
    /// Reject sources whose reported duration exceeds this, in seconds.
    pub max_duration_secs: f64,
    /// Frames extracted per second of source video.
    pub frame_rate: f64,
    /// Hard cap on extracted frames regardless of duration. None = uncapped.
    pub max_frames: Option<u32>,
    /// Predictions below this score are filterable by consumers.
    pub confidence_threshold: f32,
    /// Frames classified concurrently per batch.
    pub batch_size: usize,
    /// Deadline for a single seek-and-capture step, in milliseconds.
    pub seek_timeout_ms: u64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: 60.0,
            frame_rate: 1.0,
            max_frames: Some(30),
            confidence_threshold: 0.5,
            batch_size: 5,
            seek_timeout_ms: 1000,
        }
    }
}

/// One external classification endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointConfig {
    /// Name used in logs and fallback targets (e.g. "primary").
    pub name: String,
    /// Inference URL, POSTed to with a JSON body.
    pub url: String,
    /// Bearer token, if the endpoint requires authentication.
    #[serde(default)]
    pub token: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    30
}

/// Top-level configuration file contents.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SortiqConfig {
    #[serde(default)]
    pub video: VideoConfig,
    /// Classification endpoints, in priority order. The image path queries
    /// up to the first three; the video path uses the first.
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

impl SortiqConfig {
    pub fn load_from_file(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: SortiqConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_config_defaults() {
        let cfg = VideoConfig::default();
        assert_eq!(cfg.frame_rate, 1.0);
        assert_eq!(cfg.batch_size, 5);
        assert_eq!(cfg.seek_timeout_ms, 1000);
        assert_eq!(cfg.max_frames, Some(30));
    }

    #[test]
    fn test_config_parses_partial_toml() {
        let toml_str = r#"
            [video]
            max_duration_secs = 120.0
            frame_rate = 2.0
            batch_size = 8
            confidence_threshold = 0.3
            seek_timeout_ms = 500

            [[endpoints]]
            name = "primary"
            url = "https://example.test/models/waste"
            token = "tok"
        "#;
        let cfg: SortiqConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.video.frame_rate, 2.0);
        assert_eq!(cfg.endpoints.len(), 1);
        assert_eq!(cfg.endpoints[0].name, "primary");
        assert_eq!(cfg.endpoints[0].timeout_secs, 30);
    }
}
