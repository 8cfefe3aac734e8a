// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator configuration resolved once at startup.
//!
//! The WireGuard runtime image is required: the operator refuses to start without
//! it instead of failing every reconciliation pass later. Values come from command
//! line flags, falling back to environment variables.

use crate::constants::{ENV_WIREGUARD_IMAGE, METRICS_SERVER_PORT};
use crate::errors::{Error, Result};
use clap::Parser;

/// Command line interface of the operator binary.
#[derive(Debug, Clone, Parser)]
#[command(name = "wireguard-operator", version, about = "WireGuard VPN Operator for Kubernetes")]
pub struct Cli {
    /// Image of the WireGuard runtime container
    #[arg(long, env = ENV_WIREGUARD_IMAGE)]
    pub wireguard_image: Option<String>,

    /// Port of the metrics and health probe server
    #[arg(long, env = "METRICS_PORT", default_value_t = METRICS_SERVER_PORT)]
    pub metrics_port: u16,
}

/// Validated operator configuration injected into both reconcilers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorConfig {
    pub wireguard_image: String,
    pub metrics_port: u16,
}

impl OperatorConfig {
    /// Build a configuration for the given runtime image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the image reference is empty.
    pub fn new(wireguard_image: impl Into<String>) -> Result<Self> {
        let wireguard_image = wireguard_image.into().trim().to_string();
        if wireguard_image.is_empty() {
            return Err(Error::Configuration(format!(
                "{ENV_WIREGUARD_IMAGE} must name the WireGuard runtime image"
            )));
        }
        Ok(Self {
            wireguard_image,
            metrics_port: METRICS_SERVER_PORT,
        })
    }

    /// Resolve the configuration from parsed command line arguments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when no runtime image was supplied.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let image = cli.wireguard_image.clone().unwrap_or_default();
        let mut config = Self::new(image)?;
        config.metrics_port = cli.metrics_port;
        Ok(config)
    }

    /// Tag of the runtime image, used for the `app.kubernetes.io/version` label.
    #[must_use]
    pub fn image_tag(&self) -> &str {
        image_tag(&self.wireguard_image)
    }
}

/// Extract the tag from an image reference, defaulting to `latest`.
///
/// Registry ports (`registry:5000/wg`) are not mistaken for tags and digests
/// are ignored.
#[must_use]
pub fn image_tag(image: &str) -> &str {
    let without_digest = image.split('@').next().unwrap_or(image);
    let last_segment = without_digest.rsplit('/').next().unwrap_or(without_digest);
    match last_segment.rsplit_once(':') {
        Some((_, tag)) if !tag.is_empty() => tag,
        _ => "latest",
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
