//! Signing page configuration

use serde::{Deserialize, Serialize};

use crate::navigation::NavigationPolicy;
use crate::review::DEFAULT_SCROLL_TOLERANCE;

/// Drawing surface for handwritten signatures
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    /// Line width in canvas pixels
    pub stroke_width: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 500,
            height: 200,
            stroke_width: 2.0,
        }
    }
}

/// Configuration for a signing session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Prefix for every endpoint; empty means same-origin relative paths
    pub base_url: String,
    pub send_otp_path: String,
    pub verify_otp_path: String,
    pub finalize_path: String,
    /// Where the signer is sent once the signature is finalized
    pub success_redirect: String,
    /// Distance from the bottom of content that still counts as "scrolled to the end"
    pub scroll_tolerance: f64,
    pub navigation_policy: NavigationPolicy,
    pub canvas: CanvasConfig,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            send_otp_path: "/otp/send".to_string(),
            verify_otp_path: "/otp/verify".to_string(),
            finalize_path: "/finalize".to_string(),
            success_redirect: "/success".to_string(),
            scroll_tolerance: DEFAULT_SCROLL_TOLERANCE,
            navigation_policy: NavigationPolicy::Strict,
            canvas: CanvasConfig::default(),
        }
    }
}

impl SigningConfig {
    /// Load from `DOCSIGN_*` environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |name: &str| std::env::var(format!("DOCSIGN_{}", name)).ok();

        Self {
            base_url: var("BASE_URL").unwrap_or(defaults.base_url),
            send_otp_path: var("SEND_OTP_PATH").unwrap_or(defaults.send_otp_path),
            verify_otp_path: var("VERIFY_OTP_PATH").unwrap_or(defaults.verify_otp_path),
            finalize_path: var("FINALIZE_PATH").unwrap_or(defaults.finalize_path),
            success_redirect: var("SUCCESS_REDIRECT").unwrap_or(defaults.success_redirect),
            scroll_tolerance: var("SCROLL_TOLERANCE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.scroll_tolerance),
            navigation_policy: var("NAVIGATION_POLICY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.navigation_policy),
            canvas: CanvasConfig {
                width: var("CANVAS_WIDTH")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.canvas.width),
                height: var("CANVAS_HEIGHT")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.canvas.height),
                stroke_width: var("STROKE_WIDTH")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.canvas.stroke_width),
            },
        }
    }

    pub fn send_otp_url(&self) -> String {
        self.endpoint(&self.send_otp_path)
    }

    pub fn verify_otp_url(&self) -> String {
        self.endpoint(&self.verify_otp_path)
    }

    pub fn finalize_url(&self) -> String {
        self.endpoint(&self.finalize_path)
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
