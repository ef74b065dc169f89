//! Reply generator implementations and runtime selection.

pub mod openai_compat;

use secrecy::SecretString;
use tracing::{info, warn};

use chatline_core::generation::box_generator::BoxReplyGenerator;
use chatline_core::generation::echo::EchoGenerator;
use chatline_types::config::{GeneratorConfig, GeneratorKind};

use self::openai_compat::OpenAiCompatibleGenerator;

/// Environment variables checked for the generator API key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["CHATLINE_API_KEY", "GROQ_API_KEY"];

/// Read the generator API key from the environment.
///
/// Empty or non-Unicode values are treated as absent.
pub fn resolve_api_key() -> Option<SecretString> {
    API_KEY_ENV_VARS.iter().find_map(|var| match std::env::var(var) {
        Ok(val) if !val.trim().is_empty() => Some(SecretString::from(val)),
        _ => None,
    })
}

/// Build the configured reply generator.
///
/// `openai_compatible` without an API key falls back to the echo generator
/// so the service still starts for local development.
pub fn build_generator(config: &GeneratorConfig, api_key: Option<SecretString>) -> BoxReplyGenerator {
    match (config.kind, api_key) {
        (GeneratorKind::Echo, _) => {
            info!("Using echo reply generator");
            BoxReplyGenerator::new(EchoGenerator)
        }
        (GeneratorKind::OpenAiCompatible, None) => {
            warn!(
                "No API key in {} -- falling back to echo reply generator",
                API_KEY_ENV_VARS.join(" or ")
            );
            BoxReplyGenerator::new(EchoGenerator)
        }
        (GeneratorKind::OpenAiCompatible, Some(key)) => {
            match OpenAiCompatibleGenerator::new(config, key) {
                Ok(generator) => {
                    info!(
                        base_url = %config.base_url,
                        model = %generator.model(),
                        "Using OpenAI-compatible reply generator"
                    );
                    BoxReplyGenerator::new(generator)
                }
                Err(e) => {
                    warn!(error = %e, "Falling back to echo reply generator");
                    BoxReplyGenerator::new(EchoGenerator)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_kind_ignores_key() {
        let config = GeneratorConfig {
            kind: GeneratorKind::Echo,
            ..GeneratorConfig::default()
        };
        let generator = build_generator(&config, Some(SecretString::from("k")));
        assert_eq!(generator.name(), "echo");
    }

    #[test]
    fn test_missing_key_falls_back_to_echo() {
        let generator = build_generator(&GeneratorConfig::default(), None);
        assert_eq!(generator.name(), "echo");
    }

    #[test]
    fn test_key_selects_http_generator() {
        let generator =
            build_generator(&GeneratorConfig::default(), Some(SecretString::from("k")));
        assert_eq!(generator.name(), "openai_compatible");
    }
}
