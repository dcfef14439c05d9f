//! Bedrock model catalog
//!
//! The admin console offers these models when choosing the default LLM. The
//! catalog is fixed at build time; nothing here calls AWS.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};

struct CatalogEntry {
    model_id: &'static str,
    model_name: &'static str,
    provider_name: &'static str,
    description: &'static str,
    category: &'static str,
}

const TEXT_GENERATION: &str = "TEXT_GENERATION";

const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        model_id: "amazon.nova-micro-v1:0",
        model_name: "Nova Micro",
        provider_name: "Amazon",
        description: "Fast and efficient model for basic text generation tasks",
        category: TEXT_GENERATION,
    },
    CatalogEntry {
        model_id: "amazon.nova-lite-v1:0",
        model_name: "Nova Lite",
        provider_name: "Amazon",
        description: "Lightweight model optimized for speed and efficiency",
        category: TEXT_GENERATION,
    },
    CatalogEntry {
        model_id: "amazon.nova-pro-v1:0",
        model_name: "Nova Pro",
        provider_name: "Amazon",
        description: "Professional-grade model with enhanced capabilities",
        category: TEXT_GENERATION,
    },
    CatalogEntry {
        model_id: "anthropic.claude-3-haiku-20240307-v1:0",
        model_name: "Claude 3 Haiku",
        provider_name: "Anthropic",
        description: "Fast and capable model for a wide range of tasks",
        category: TEXT_GENERATION,
    },
    CatalogEntry {
        model_id: "anthropic.claude-3-sonnet-20240229-v1:0",
        model_name: "Claude 3 Sonnet",
        provider_name: "Anthropic",
        description: "Balanced model offering good performance and capability",
        category: TEXT_GENERATION,
    },
    CatalogEntry {
        model_id: "anthropic.claude-3-opus-20240229-v1:0",
        model_name: "Claude 3 Opus",
        provider_name: "Anthropic",
        description: "Most capable model for complex reasoning tasks",
        category: TEXT_GENERATION,
    },
    CatalogEntry {
        model_id: "meta.llama3-70b-instruct-v1:0",
        model_name: "Llama 3 70B Instruct",
        provider_name: "Meta",
        description: "Large language model optimized for instruction following",
        category: TEXT_GENERATION,
    },
    CatalogEntry {
        model_id: "cohere.command-r-plus-v1:0",
        model_name: "Command R+",
        provider_name: "Cohere",
        description: "Advanced model for complex reasoning and generation",
        category: TEXT_GENERATION,
    },
];

/// A model offered for selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BedrockModel {
    pub model_id: String,
    pub model_name: String,
    pub provider_name: String,
    pub input_modalities: Vec<String>,
    pub output_modalities: Vec<String>,
    pub description: String,
    pub category: String,
}

impl From<&CatalogEntry> for BedrockModel {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            model_id: entry.model_id.to_string(),
            model_name: entry.model_name.to_string(),
            provider_name: entry.provider_name.to_string(),
            input_modalities: vec!["TEXT".to_string()],
            output_modalities: vec!["TEXT".to_string()],
            description: entry.description.to_string(),
            category: entry.category.to_string(),
        }
    }
}

/// Optional filters, both matched case-insensitively.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ModelFilter {
    /// e.g. `TEXT_GENERATION`
    pub category: Option<String>,
    /// e.g. `Anthropic`
    pub provider: Option<String>,
}

impl ModelFilter {
    fn matches(&self, entry: &CatalogEntry) -> bool {
        let field_matches = |wanted: &Option<String>, actual: &str| {
            wanted
                .as_deref()
                .map(str::trim)
                .filter(|w| !w.is_empty())
                .is_none_or(|w| w.eq_ignore_ascii_case(actual))
        };

        field_matches(&self.category, entry.category)
            && field_matches(&self.provider, entry.provider_name)
    }
}

/// Catalog listing for `GET /api/v1/bedrock/models`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ModelCatalogResponse {
    pub success: bool,
    pub models: Vec<BedrockModel>,
    /// Filtered models keyed by provider name.
    pub grouped_models: BTreeMap<String, Vec<BedrockModel>>,
    pub total_count: usize,
    /// Every provider in the catalog, regardless of filters.
    pub available_providers: Vec<String>,
    /// Every category in the catalog, regardless of filters.
    pub available_categories: Vec<String>,
}

/// Filters the catalog.
pub fn list_models(filter: &ModelFilter) -> ModelCatalogResponse {
    let models: Vec<BedrockModel> = CATALOG
        .iter()
        .filter(|entry| filter.matches(entry))
        .map(BedrockModel::from)
        .collect();

    let mut grouped_models: BTreeMap<String, Vec<BedrockModel>> = BTreeMap::new();
    for model in &models {
        grouped_models
            .entry(model.provider_name.clone())
            .or_default()
            .push(model.clone());
    }

    ModelCatalogResponse {
        success: true,
        total_count: models.len(),
        models,
        grouped_models,
        available_providers: distinct(CATALOG.iter().map(|e| e.provider_name)),
        available_categories: distinct(CATALOG.iter().map(|e| e.category)),
    }
}

/// Distinct values in first-seen order.
fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn filter(category: Option<&str>, provider: Option<&str>) -> ModelFilter {
        ModelFilter {
            category: category.map(str::to_string),
            provider: provider.map(str::to_string),
        }
    }

    #[test]
    fn test_unfiltered_lists_whole_catalog() {
        let response = list_models(&ModelFilter::default());

        assert_eq!(response.total_count, 8);
        assert_eq!(response.models.len(), 8);
        assert_eq!(
            response.available_providers,
            vec!["Amazon", "Anthropic", "Meta", "Cohere"]
        );
        assert_eq!(response.available_categories, vec!["TEXT_GENERATION"]);
        assert_eq!(response.grouped_models["Amazon"].len(), 3);
    }

    #[rstest]
    #[case(None, Some("anthropic"), 3)]
    #[case(None, Some("ANTHROPIC"), 3)]
    #[case(Some("text_generation"), None, 8)]
    #[case(Some("text_generation"), Some("meta"), 1)]
    #[case(Some("IMAGE_GENERATION"), None, 0)]
    #[case(None, Some("openai"), 0)]
    #[case(Some(""), Some(""), 8)]
    fn test_filters(
        #[case] category: Option<&str>,
        #[case] provider: Option<&str>,
        #[case] expected: usize,
    ) {
        let response = list_models(&filter(category, provider));

        assert_eq!(response.total_count, expected);
        assert_eq!(
            response.grouped_models.values().map(Vec::len).sum::<usize>(),
            expected
        );
    }

    #[test]
    fn test_available_lists_ignore_filters() {
        let response = list_models(&filter(None, Some("Cohere")));

        assert_eq!(response.total_count, 1);
        assert_eq!(response.grouped_models.keys().collect::<Vec<_>>(), vec!["Cohere"]);
        assert_eq!(response.available_providers.len(), 4);
    }
}
