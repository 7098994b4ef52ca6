//! Checklist suggestions from a hosted model.
//!
//! One templated prompt, one JSON request, no retry. The reply is checked
//! against a fixed shape before any item reaches the caller, and nothing is
//! persisted: the inspector appends what they keep.

use async_trait::async_trait;
use rego_derive::api_model;
use rego_domain::config::SuggestionsConfig;
use rego_domain::status::InspectionType;
use rego_kernel::ServiceError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt::{self, Debug, Write as _};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Upper bound on items per reply, whatever the configuration says.
pub const MAX_SUGGESTIONS: usize = 20;

#[rego_derive::rego_error]
pub enum SuggestionError {
    #[error("Suggestion request failed{}: {source}", format_context(.context))]
    Http { source: reqwest::Error, context: Option<Cow<'static, str>> },

    #[error(
        "Suggestion service replied with an unusable answer{}: {message}",
        format_context(.context)
    )]
    InvalidReply { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal suggestion error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl From<SuggestionError> for ServiceError {
    fn from(err: SuggestionError) -> Self {
        Self::unavailable(err.to_string())
    }
}

/// What the model is told about the inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct CraftContext {
    pub inspection_type: Option<InspectionType>,
    pub craft_name: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub length_meters: Option<f64>,
    pub propulsion: Option<String>,
    pub hull_material: Option<String>,
    /// Descriptions already on the checklist.
    pub existing: Vec<String>,
}

impl CraftContext {
    /// Renders the prompt template.
    #[must_use]
    pub fn prompt(&self, max_items: usize) -> String {
        let kind = self.inspection_type.map_or_else(|| "routine".to_owned(), |t| t.to_string());
        let mut craft = String::new();
        if let Some(length) = self.length_meters {
            let _ = write!(craft, "{length} m ");
        }
        for part in [&self.hull_material, &self.propulsion].into_iter().flatten() {
            let _ = write!(craft, "{part} ");
        }
        craft.push_str("small craft");
        if let Some(name) = &self.craft_name {
            let _ = write!(craft, " named \"{name}\"");
        }
        let maker: Vec<&str> = [&self.make, &self.model]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect();
        if !maker.is_empty() {
            let _ = write!(craft, " ({})", maker.join(" "));
        }

        let mut prompt = format!(
            "Suggest up to {max_items} checklist items for a {kind} safety inspection of a {craft}. \
             Each item is one short, checkable statement."
        );
        if !self.existing.is_empty() {
            let _ = write!(
                prompt,
                " Do not repeat these existing items: {}.",
                self.existing.join("; ")
            );
        }
        prompt
    }
}

/// A proposed item, not yet on the checklist.
#[api_model]
#[derive(Clone, PartialEq, Eq)]
pub struct SuggestedItem {
    pub description: String,
}

#[async_trait]
pub trait ChecklistSuggester: Debug + Send + Sync {
    async fn suggest(&self, context: &CraftContext) -> Result<Vec<SuggestedItem>, SuggestionError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SuggestionRequest<'a> {
    model: &'a str,
    prompt: String,
    max_items: usize,
}

#[derive(Debug, Deserialize)]
struct SuggestionReply {
    items: Vec<SuggestedItem>,
}

/// Client for the configured hosted-model endpoint.
pub struct HostedSuggester {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_items: usize,
}

impl Debug for HostedSuggester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostedSuggester")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("max_items", &self.max_items)
            .finish_non_exhaustive()
    }
}

impl HostedSuggester {
    /// Builds the client, or `None` when no endpoint is configured.
    pub fn from_config(config: &SuggestionsConfig) -> Result<Option<Self>, SuggestionError> {
        let Some(endpoint) = config.endpoint.as_deref().filter(|e| !e.trim().is_empty()) else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .build()
            .context("Building suggestion client")?;
        info!(endpoint, model = %config.model, "Checklist suggestions enabled");
        Ok(Some(Self {
            client,
            endpoint: endpoint.to_owned(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            max_items: config.max_items.clamp(1, MAX_SUGGESTIONS),
        }))
    }
}

#[async_trait]
impl ChecklistSuggester for HostedSuggester {
    #[instrument(skip_all, fields(endpoint = %self.endpoint), err)]
    async fn suggest(&self, context: &CraftContext) -> Result<Vec<SuggestedItem>, SuggestionError> {
        let body = SuggestionRequest {
            model: &self.model,
            prompt: context.prompt(self.max_items),
            max_items: self.max_items,
        };
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let reply: SuggestionReply = request
            .send()
            .await
            .context("Sending suggestion request")?
            .error_for_status()
            .context("Suggestion service status")?
            .json()
            .await
            .context("Decoding suggestion reply")?;
        validate_reply(reply.items, self.max_items)
    }
}

/// Checks the reply shape: 1..=`max_items` items, each with text.
pub fn validate_reply(
    items: Vec<SuggestedItem>,
    max_items: usize,
) -> Result<Vec<SuggestedItem>, SuggestionError> {
    let max_items = max_items.clamp(1, MAX_SUGGESTIONS);
    if items.is_empty() || items.len() > max_items {
        warn!(count = items.len(), max_items, "Suggestion reply has the wrong number of items");
        return Err(SuggestionError::InvalidReply {
            message: format!("expected 1 to {max_items} items, got {}", items.len()).into(),
            context: None,
        });
    }
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let description = item.description.trim();
            if description.is_empty() {
                return Err(SuggestionError::InvalidReply {
                    message: format!("item {index} has an empty description").into(),
                    context: None,
                });
            }
            Ok(SuggestedItem { description: description.to_owned() })
        })
        .collect()
}
