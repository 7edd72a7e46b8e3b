use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::bridge::context::OverlaySettings;
use crate::capture::capture_model::DEFAULT_TRUNCATE_LIMIT;
use crate::capture::region_capture::CaptureSettings;
use crate::geometry::transform::DESKTOP_WIDTH;
use crate::overlay::projector::OverlayStyle;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "ux-overlay",
    version,
    about = "UX audit overlays anchored to captured web pages"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Ollama API endpoint
    #[arg(long, global = true)]
    pub ollama_endpoint: Option<String>,

    /// Ollama model name
    #[arg(long, global = true)]
    pub ollama_model: Option<String>,

    /// Path to config file (default: ux-overlay.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Capture a URL and list its UX issues, reusing a stored report when
    /// the page has not meaningfully changed
    Audit {
        /// URL to audit
        #[arg(long)]
        url: String,

        /// Always run a fresh analysis
        #[arg(long)]
        force: bool,

        /// Issue analyzer: mock or llm
        #[arg(long, default_value = "mock")]
        analyzer: String,
    },

    /// Write a report's snapshot with its annotations drawn in
    Project {
        /// Report id printed by `audit`
        #[arg(long)]
        report: String,

        /// Keep annotations hidden
        #[arg(long)]
        hidden: bool,

        /// Container width in px; scales the snapshot down from desktop width
        #[arg(long)]
        width: Option<f64>,

        /// Output HTML file
        #[arg(short, long)]
        output: String,
    },

    /// Judge whether two HTML captures show the same experience
    Compare {
        /// Earlier HTML capture
        #[arg(long)]
        old: String,

        /// Later HTML capture
        #[arg(long)]
        new: String,

        /// Screenshot (PNG) of the later capture
        #[arg(long)]
        screenshot: Option<String>,

        /// Equivalence judge: mock (markup only) or llm
        #[arg(long, default_value = "mock")]
        analyzer: String,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `ux-overlay.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    #[serde(default = "default_desktop_width")]
    pub desktop_width: f64,

    #[serde(default = "default_outline")]
    pub outline: String,

    #[serde(default = "default_label_background")]
    pub label_background: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            desktop_width: DESKTOP_WIDTH,
            outline: default_outline(),
            label_background: default_label_background(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_capture_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_one")]
    pub device_pixel_ratio: f64,

    #[serde(default = "default_truncate_limit")]
    pub truncate_limit: usize,

    /// Capture script run with node
    pub script: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            device_pixel_ratio: 1.0,
            truncate_limit: DEFAULT_TRUNCATE_LIMIT,
            script: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self { retry_delay_ms: 500 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OllamaConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_dir")]
    pub dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { dir: default_store_dir() }
    }
}

// Serde default helpers
fn default_desktop_width() -> f64 { DESKTOP_WIDTH }
fn default_outline() -> String { OverlayStyle::default().outline }
fn default_label_background() -> String { OverlayStyle::default().label_background }
fn default_capture_timeout_ms() -> u64 { 5000 }
fn default_one() -> f64 { 1.0 }
fn default_truncate_limit() -> usize { DEFAULT_TRUNCATE_LIMIT }
fn default_retry_delay_ms() -> u64 { 500 }
fn default_store_dir() -> String { ".ux-overlay".to_string() }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("ux-overlay.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Config Builders
// ============================================================================

/// Presentation and timing settings for rendering contexts.
pub fn build_overlay_settings(config: &AppConfig) -> OverlaySettings {
    OverlaySettings {
        style: OverlayStyle {
            outline: config.overlay.outline.clone(),
            label_background: config.overlay.label_background.clone(),
            ..OverlayStyle::default()
        },
        capture: CaptureSettings {
            timeout: Duration::from_millis(config.capture.timeout_ms),
            device_pixel_ratio: config.capture.device_pixel_ratio,
        },
        desktop_width: config.overlay.desktop_width,
        retry_delay: Duration::from_millis(config.bridge.retry_delay_ms),
    }
}
