//! # agentkit-guardrails
//!
//! Ready-made guardrails for the agentkit turn pipeline.
//!
//! ## Overview
//!
//! Every type here implements [`Guardrail`](agentkit_core::traits::Guardrail):
//!
//! - [`ContentFilter`]: banned words, partial or whole-word
//! - [`PiiDetector`]: SSNs, emails, phone numbers, card numbers, IP addresses
//! - [`LengthValidator`]: character-count bounds
//! - [`RateLimitGuardrail`]: sliding-window budget per identifier
//!
//! Input and output variants differ only in their reported name and reason
//! text. [`GuardrailSet`] builds ordered lists from a TOML document.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use agentkit_guardrails::GuardrailSet;
//!
//! let set = GuardrailSet::from_file(Path::new("guardrails.toml"))?;
//! let agent = Agent::builder("Assistant", engine)
//!     .input_guardrails(set.input)
//!     .output_guardrails(set.output)
//!     .build()?;
//! ```

pub mod config;
pub mod content_filter;
pub mod length;
pub mod pii;
pub mod rate_limiter;

pub use config::{GuardrailConfig, GuardrailSet, GuardrailSpec};
pub use content_filter::{ContentFilter, ContentFilterOptions};
pub use length::LengthValidator;
pub use pii::{PiiDetector, PiiType};
pub use rate_limiter::{RateLimitGuardrail, RateLimiter};

// ── Tests ─────────────────────────────────────────────────────────────────────
