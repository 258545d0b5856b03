//! Ordered, immutable set of processors with first-match-wins lookup.

use std::sync::Arc;

use super::command::CommandProcessor;
use super::config::{ProcessorConfig, ProcessorConfigError};
use super::executor::UrlProcessor;

/// Processors in registration order.
///
/// Built once at startup and shared by reference; there is no way to add or
/// remove a processor afterwards.
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    processors: Vec<Arc<dyn UrlProcessor>>,
}

impl ProcessorRegistry {
    pub fn new(processors: Vec<Arc<dyn UrlProcessor>>) -> Self {
        Self { processors }
    }

    /// Build a [`CommandProcessor`] for every definition, preserving order.
    ///
    /// Fails on the first definition that does not validate.
    pub fn from_configs(configs: &[ProcessorConfig]) -> Result<Self, ProcessorConfigError> {
        let processors = configs
            .iter()
            .map(|config| {
                CommandProcessor::from_config(config)
                    .map(|p| Arc::new(p) as Arc<dyn UrlProcessor>)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(processors))
    }

    /// The first processor whose pattern matches `url`, if any.
    pub fn find(&self, url: &str) -> Option<&Arc<dyn UrlProcessor>> {
        self.processors.iter().find(|p| p.matches(url))
    }

    pub fn processors(&self) -> &[Arc<dyn UrlProcessor>] {
        &self.processors
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

impl std::fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.processors.iter().map(|p| p.name()))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::path::Path;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::processing::executor::{ProcessError, ProcessRequest};

    struct StubProcessor {
        name: &'static str,
        matcher: fn(&str) -> bool,
    }

    #[async_trait]
    impl UrlProcessor for StubProcessor {
        fn name(&self) -> &str {
            self.name
        }

        fn target_dir(&self) -> &Path {
            Path::new("/tmp")
        }

        fn matches(&self, url: &str) -> bool {
            (self.matcher)(url)
        }

        async fn process(
            &self,
            _request: &ProcessRequest,
            _cancel: &CancellationToken,
        ) -> Result<(), ProcessError> {
            Ok(())
        }
    }

    fn stub(name: &'static str, matcher: fn(&str) -> bool) -> Arc<dyn UrlProcessor> {
        Arc::new(StubProcessor { name, matcher })
    }

    #[test]
    fn first_registered_match_wins() {
        let registry = ProcessorRegistry::new(vec![
            stub("youtube", |u| u == "https://youtube.com/watch"),
            stub("generic", |_| true),
            stub("shadowed", |u| u == "https://youtube.com/watch"),
        ]);

        let found = registry.find("https://youtube.com/watch").expect("match");
        assert_eq!(found.name(), "youtube");

        let found = registry.find("https://other.com/video").expect("match");
        assert_eq!(found.name(), "generic");
    }

    #[test]
    fn no_match_returns_none() {
        let registry = ProcessorRegistry::new(vec![stub("specific", |u| u == "specific-url")]);
        assert!(registry.find("other-url").is_none());
    }

    #[test]
    fn empty_registry_matches_nothing() {
        let registry = ProcessorRegistry::default();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.find("https://example.com").is_none());
    }

    #[test]
    fn from_configs_preserves_order() {
        let configs = vec![
            ProcessorConfig {
                name: "first".to_string(),
                pattern: "example".to_string(),
                command: "echo".to_string(),
                args: vec![],
                target_dir: Some("/tmp/catcher-first".to_string()),
                isolate: None,
            },
            ProcessorConfig {
                name: "second".to_string(),
                pattern: ".*".to_string(),
                command: "echo".to_string(),
                args: vec![],
                target_dir: Some("/tmp/catcher-second".to_string()),
                isolate: Some(false),
            },
        ];

        let registry = ProcessorRegistry::from_configs(&configs).expect("build");
        let names: Vec<_> = registry.processors().iter().map(|p| p.name()).collect();
        assert_eq!(names, ["first", "second"]);
        assert_eq!(registry.find("https://example.com").unwrap().name(), "first");
        assert_eq!(registry.find("https://other.org").unwrap().name(), "second");
    }

    #[test]
    fn from_configs_rejects_bad_pattern() {
        let configs = vec![ProcessorConfig {
            name: "bad".to_string(),
            pattern: "[invalid".to_string(),
            command: "echo".to_string(),
            args: vec![],
            target_dir: None,
            isolate: None,
        }];
        assert_matches!(
            ProcessorRegistry::from_configs(&configs),
            Err(ProcessorConfigError::InvalidPattern { .. })
        );
    }
}
