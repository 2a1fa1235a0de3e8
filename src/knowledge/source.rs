//! Knowledge source trait used by the supervisor.

use super::{DomainKnowledgeStore, KnowledgeCategory};

/// A source of domain knowledge for the `lookup_knowledge` tool.
pub trait KnowledgeSource: Send + Sync {
    /// Unique name for this source.
    fn source_name(&self) -> &'static str;

    /// Rendered lookup. Unknown categories produce an error string.
    fn lookup(&self, category: &str, query: &str, k: usize) -> String;

    /// Category names this source answers for.
    fn categories(&self) -> Vec<String>;
}

impl KnowledgeSource for DomainKnowledgeStore {
    fn source_name(&self) -> &'static str {
        "domain_knowledge"
    }

    fn lookup(&self, category: &str, query: &str, k: usize) -> String {
        self.format_lookup(category, query, k)
    }

    fn categories(&self) -> Vec<String> {
        KnowledgeCategory::ALL
            .iter()
            .map(|c| c.as_str().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockSource {
        answer: &'static str,
    }

    impl KnowledgeSource for MockSource {
        fn source_name(&self) -> &'static str {
            "mock"
        }

        fn lookup(&self, category: &str, _query: &str, _k: usize) -> String {
            format!("{category}: {}", self.answer)
        }

        fn categories(&self) -> Vec<String> {
            vec!["rules".to_string()]
        }
    }

    #[test]
    fn test_store_is_a_knowledge_source() {
        let store = DomainKnowledgeStore::new();
        let source: &dyn KnowledgeSource = &store;
        assert_eq!(source.source_name(), "domain_knowledge");
        assert_eq!(source.categories().len(), 4);
        assert!(source.lookup("nope", "q", 1).starts_with("Error:"));
    }

    #[test]
    fn test_custom_source_through_trait_object() {
        let source: Box<dyn KnowledgeSource> = Box::new(MockSource { answer: "always" });
        assert_eq!(source.lookup("rules", "q", 1), "rules: always");
        assert_eq!(source.categories(), vec!["rules"]);
    }
}
