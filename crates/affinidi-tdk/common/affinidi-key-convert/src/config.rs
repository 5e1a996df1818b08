//! Output settings for the [`crate::KeyConverter`]
//!
//! Call [`ConverterConfig::builder`] to create a new configuration.
//!
//! Example: CRLF output without line wrapping:
//! ```rust
//! use affinidi_key_convert::{ConverterConfig, LineEnding};
//! let config = ConverterConfig::builder()
//!     .with_line_width(0)
//!     .with_line_ending(LineEnding::Crlf)
//!     .build();
//! ```

use affinidi_asn1::LineEnding;

/// PEM output settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConverterConfig {
    pub(crate) line_width: usize,
    pub(crate) line_ending: LineEnding,
    pub(crate) jwk_set_separator: String,
}

impl ConverterConfig {
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder::default()
    }

    pub fn line_width(&self) -> usize {
        self.line_width
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    pub fn jwk_set_separator(&self) -> &str {
        &self.jwk_set_separator
    }
}

impl Default for ConverterConfig {
    fn default() -> Self {
        ConverterConfigBuilder::default().build()
    }
}

/// Builder for [`ConverterConfig`]
///
/// - line_width: base64 characters per PEM body line, 0 for a single line (default: 64)
/// - line_ending: line terminator of the PEM output (default: LF)
/// - jwk_set_separator: text between PEM blocks when a JWK Set is converted (default: "\n")
pub struct ConverterConfigBuilder {
    line_width: usize,
    line_ending: LineEnding,
    jwk_set_separator: String,
}

impl Default for ConverterConfigBuilder {
    fn default() -> Self {
        Self {
            line_width: 64,
            line_ending: LineEnding::Lf,
            jwk_set_separator: "\n".to_string(),
        }
    }
}

impl ConverterConfigBuilder {
    /// Set the PEM body line width
    /// Default: 64 characters
    pub fn with_line_width(mut self, line_width: usize) -> Self {
        self.line_width = line_width;
        self
    }

    /// Set the PEM line terminator
    /// Default: LF
    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Set the text placed between PEM blocks of a converted JWK Set
    /// Default: a single newline
    pub fn with_jwk_set_separator(mut self, separator: &str) -> Self {
        self.jwk_set_separator = separator.to_string();
        self
    }

    /// Build the [ConverterConfig]
    pub fn build(self) -> ConverterConfig {
        ConverterConfig {
            line_width: self.line_width,
            line_ending: self.line_ending,
            jwk_set_separator: self.jwk_set_separator,
        }
    }
}
