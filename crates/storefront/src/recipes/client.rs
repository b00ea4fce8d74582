//! Messages API client for recipe suggestions.

use std::sync::Arc;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::instrument;

use carniceria_core::Product;

use crate::config::RecipesConfig;

use super::error::{ApiErrorResponse, RecipeError};
use super::types::{ChatRequest, ChatResponse, Message};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const MAX_QUESTION_CHARS: usize = 500;

/// Recipe suggestion client.
#[derive(Clone)]
pub struct RecipeClient {
    inner: Arc<RecipeClientInner>,
}

struct RecipeClientInner {
    client: reqwest::Client,
    model: String,
}

impl RecipeClient {
    /// Create a new recipe client.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Config` if the API key is not a valid header
    /// value or the HTTP client cannot be built.
    pub fn new(config: &RecipesConfig) -> Result<Self, RecipeError> {
        let api_key = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|_| RecipeError::Config("API key is not a valid header value".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("x-api-key", api_key);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| RecipeError::Config(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(RecipeClientInner {
                client,
                model: config.model.clone(),
            }),
        })
    }

    /// Suggest a way to cook `product`, answering the shopper's question.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::EmptyQuestion` for a blank question, or an
    /// error if the API request fails.
    #[instrument(
        skip(self, product, question),
        fields(model = %self.inner.model, product_id = %product.id)
    )]
    pub async fn suggest(&self, product: &Product, question: &str) -> Result<String, RecipeError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RecipeError::EmptyQuestion);
        }
        let question: String = question.chars().take(MAX_QUESTION_CHARS).collect();

        let request = ChatRequest {
            model: self.inner.model.clone(),
            max_tokens: DEFAULT_MAX_TOKENS,
            messages: vec![Message::user(question)],
            system: Some(system_prompt(product)),
        };

        let response = self
            .inner
            .client
            .post(ANTHROPIC_API_URL)
            .json(&request)
            .send()
            .await?;

        let response = self.handle_response(response).await?;
        Ok(response.text())
    }

    /// Handle a non-streaming response.
    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> Result<ChatResponse, RecipeError> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body)
                .map_err(|e| RecipeError::Parse(format!("Failed to parse response: {e}")))
        } else {
            Err(self.handle_error_status(status, response).await)
        }
    }

    /// Handle an error status code.
    async fn handle_error_status(
        &self,
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> RecipeError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return RecipeError::RateLimited(retry_after);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return RecipeError::Unauthorized("Invalid API key".to_string());
        }

        match response.text().await {
            Ok(body) => {
                if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&body) {
                    RecipeError::Api {
                        error_type: api_error.error.error_type,
                        message: api_error.error.message,
                    }
                } else {
                    RecipeError::Api {
                        error_type: "unknown".to_string(),
                        message: body,
                    }
                }
            }
            Err(e) => RecipeError::Http(e),
        }
    }
}

/// System prompt describing the product being viewed.
fn system_prompt(product: &Product) -> String {
    let mut prompt = format!(
        "Sos el asistente de cocina de una carnicería de barrio. El cliente está mirando \
         \"{}\" ({}). Respondé en español rioplatense, en no más de 200 palabras, con una \
         receta o consejo de cocción concreto para este corte. Si la pregunta no tiene que \
         ver con cocinar, respondé amablemente que solo podés ayudar con recetas.",
        product.name,
        product.category.label(),
    );
    if !product.description.trim().is_empty() {
        prompt.push_str("\nDescripción del producto: ");
        prompt.push_str(product.description.trim());
    }
    prompt
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use carniceria_core::{Category, Money, ProductId, SellableBy};
    use chrono::Utc;

    fn product() -> Product {
        Product {
            id: ProductId::new(1),
            name: "Matambre".to_string(),
            description: "Ideal para arrollar".to_string(),
            category: Category::Beef,
            price: Money::new(7500),
            price_per_kilo: None,
            min_kg: None,
            sellable_by: SellableBy::Unit,
            formats: Vec::new(),
            bone_options: Vec::new(),
            featured: false,
            in_stock: true,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_system_prompt_names_product() {
        let prompt = system_prompt(&product());
        assert!(prompt.contains("\"Matambre\" (Vacuno)"));
        assert!(prompt.contains("Ideal para arrollar"));
    }

    #[tokio::test]
    async fn test_blank_question_is_rejected_before_network() {
        let client = RecipeClient::new(&RecipesConfig {
            api_key: secrecy::SecretString::from("test-key"),
            model: "m".to_string(),
        })
        .expect("client");
        let err = client.suggest(&product(), "   ").await.unwrap_err();
        assert!(matches!(err, RecipeError::EmptyQuestion));
    }
}
