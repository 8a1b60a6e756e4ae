//! Domain name resolution.
//!
//! Domain names are generated once and then reused for as long as the caller
//! keeps supplying the same name input, so repeated deploys land on the same
//! remote domain.

use tracing::debug;
use uuid::Uuid;

use crate::config::DomainConfig;
use crate::state::{ComponentState, NameInput};

/// Length of the random suffix appended to an explicit name input.
pub const GENERATED_SUFFIX_LEN: usize = 8;

/// Prefix of names generated without a name input.
pub const ANONYMOUS_PREFIX: &str = "es";

/// Length of the random suffix of names generated without a name input.
pub const ANONYMOUS_SUFFIX_LEN: usize = 12;

/// Outcome of resolving the domain name for a deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameResolution {
    /// Domain name to deploy under.
    pub name: String,
    /// Name input to record in state.
    pub name_input: NameInput,
    /// True if the name was taken from prior state.
    pub reused: bool,
}

/// Resolves stable domain names.
#[derive(Debug, Default, Clone, Copy)]
pub struct NameResolver;

impl NameResolver {
    /// Creates a new resolver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Resolves the domain name for `config` given the prior `state`.
    ///
    /// The prior name is reused when the recorded name input matches the
    /// current one; a state written before name inputs were recorded counts
    /// as having no name input.
    #[must_use]
    pub fn resolve(&self, config: &DomainConfig, state: &ComponentState) -> NameResolution {
        let name_input = NameInput::from_option(config.name.as_deref());
        let recorded = state.name_input.clone().unwrap_or(NameInput::Unset);

        if let Some(name) = &state.name
            && recorded == name_input
        {
            debug!("Reusing domain name {name}");
            return NameResolution {
                name: name.clone(),
                name_input,
                reused: true,
            };
        }

        let name = Self::generate(&name_input);
        debug!("Generated domain name {name} for name input {name_input}");

        NameResolution {
            name,
            name_input,
            reused: false,
        }
    }

    /// Generates a fresh name for a name input.
    #[must_use]
    pub fn generate(name_input: &NameInput) -> String {
        match name_input {
            NameInput::Named(base) => format!("{base}-{}", random_suffix(GENERATED_SUFFIX_LEN)),
            NameInput::Unset => {
                format!("{ANONYMOUS_PREFIX}-{}", random_suffix(ANONYMOUS_SUFFIX_LEN))
            }
        }
    }
}

/// Returns `len` lowercase hex characters.
fn random_suffix(len: usize) -> String {
    let mut suffix = Uuid::new_v4().simple().to_string();
    suffix.truncate(len);
    suffix
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_named(name: Option<&str>) -> DomainConfig {
        DomainConfig {
            name: name.map(str::to_string),
            ..DomainConfig::default()
        }
    }

    fn is_generated_from(name: &str, prefix: &str, suffix_len: usize) -> bool {
        name.strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('-'))
            .is_some_and(|suffix| {
                suffix.len() == suffix_len
                    && suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
            })
    }

    #[test]
    fn test_fresh_name_with_input() {
        let resolution = NameResolver::new().resolve(&config_named(Some("logs")), &ComponentState::new());

        assert!(is_generated_from(&resolution.name, "logs", GENERATED_SUFFIX_LEN));
        assert_eq!(resolution.name_input, NameInput::Named(String::from("logs")));
        assert!(!resolution.reused);
    }

    #[test]
    fn test_fresh_name_without_input() {
        let resolution = NameResolver::new().resolve(&config_named(None), &ComponentState::new());

        assert!(is_generated_from(&resolution.name, ANONYMOUS_PREFIX, ANONYMOUS_SUFFIX_LEN));
        assert_eq!(resolution.name_input, NameInput::Unset);
    }

    #[test]
    fn test_fresh_names_differ_between_resolutions() {
        let resolver = NameResolver::new();

        let unnamed = config_named(None);
        let first = resolver.resolve(&unnamed, &ComponentState::new());
        let second = resolver.resolve(&unnamed, &ComponentState::new());
        assert_ne!(first.name, second.name);

        let named = config_named(Some("logs"));
        let named_first = resolver.resolve(&named, &ComponentState::new());
        let named_second = resolver.resolve(&named, &ComponentState::new());
        assert_ne!(named_first.name, named_second.name);
    }

    #[test]
    fn test_reuse_when_input_unchanged() {
        let resolver = NameResolver::new();
        let config = config_named(Some("logs"));
        let first = resolver.resolve(&config, &ComponentState::new());

        let state = ComponentState {
            name: Some(first.name.clone()),
            name_input: Some(first.name_input.clone()),
            ..ComponentState::default()
        };
        let second = resolver.resolve(&config, &state);

        assert_eq!(second.name, first.name);
        assert!(second.reused);
    }

    #[test]
    fn test_reuse_when_both_unset() {
        let state = ComponentState {
            name: Some(String::from("es-0123456789ab")),
            name_input: Some(NameInput::Unset),
            ..ComponentState::default()
        };
        let resolution = NameResolver::new().resolve(&config_named(None), &state);

        assert_eq!(resolution.name, "es-0123456789ab");
    }

    #[test]
    fn test_new_name_when_input_changes() {
        let state = ComponentState {
            name: Some(String::from("logs-abc12345")),
            name_input: Some(NameInput::Named(String::from("logs"))),
            ..ComponentState::default()
        };
        let resolution = NameResolver::new().resolve(&config_named(Some("metrics")), &state);

        assert!(is_generated_from(&resolution.name, "metrics", GENERATED_SUFFIX_LEN));
        assert!(!resolution.reused);
    }

    #[test]
    fn test_new_name_when_input_removed() {
        let state = ComponentState {
            name: Some(String::from("logs-abc12345")),
            name_input: Some(NameInput::Named(String::from("logs"))),
            ..ComponentState::default()
        };
        let resolution = NameResolver::new().resolve(&config_named(None), &state);

        assert!(is_generated_from(&resolution.name, ANONYMOUS_PREFIX, ANONYMOUS_SUFFIX_LEN));
    }

    #[test]
    fn test_legacy_state_without_recorded_input() {
        let state = ComponentState {
            name: Some(String::from("es-0123456789ab")),
            ..ComponentState::default()
        };

        let unnamed = NameResolver::new().resolve(&config_named(None), &state);
        assert_eq!(unnamed.name, "es-0123456789ab");

        let named = NameResolver::new().resolve(&config_named(Some("logs")), &state);
        assert_ne!(named.name, "es-0123456789ab");
    }
}
