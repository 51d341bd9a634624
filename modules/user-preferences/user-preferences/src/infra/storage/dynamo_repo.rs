use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, retry::RetryConfig, timeout::TimeoutConfig};
use aws_sdk_dynamodb::{
    Client,
    error::{ProvideErrorMetadata, SdkError},
    operation::update_item::{UpdateItemError, UpdateItemOutput},
    types::{
        AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ReturnValue,
        ScalarAttributeType, TableStatus,
    },
};
use user_preferences_sdk::Preferences;

use super::record::{self, PARTITION_KEY, UpdateExpression};
use crate::config::DynamoConfig;
use crate::domain::repo::{PreferencesRepository, StoreError};

/// Rounds of "update existing, else create" before a merge gives up.
const MERGE_ROUNDS: usize = 3;

/// Error codes meaning the request does not fit the table, not that the
/// service is down. Item size overflow arrives as `ValidationException`.
const REJECTED_CODES: [&str; 2] = [
    "ValidationException",
    "ItemCollectionSizeLimitExceededException",
];

/// Classify an SDK failure of a data call.
fn store_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let rejection = err
        .code()
        .filter(|code| REJECTED_CODES.contains(code))
        .map(|code| format!("{code}: {}", err.message().unwrap_or("request rejected")));
    match rejection {
        Some(reason) => StoreError::rejected(operation, reason),
        None => StoreError::unavailable(operation, err),
    }
}

/// Preference sets stored one item per user in a DynamoDB table.
///
/// Every write is a single conditional `UpdateItem` or `DeleteItem`; no
/// operation reads before it writes. Retries and timeouts are configured
/// on the SDK client.
#[derive(Clone, Debug)]
pub struct DynamoPreferencesRepository {
    client: Client,
    table_name: String,
}

impl DynamoPreferencesRepository {
    #[must_use]
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Build an SDK client from `config` and wrap it.
    pub async fn connect(config: &DynamoConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(config.operation_timeout())
                    .build(),
            )
            .retry_config(RetryConfig::standard().with_max_attempts(config.max_attempts.max(1)));
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        tracing::info!(
            table = %config.table_name,
            region = %config.region,
            endpoint = config.endpoint.as_deref().unwrap_or("default"),
            "DynamoDB client configured"
        );
        Self::new(Client::new(&sdk_config), config.table_name.clone())
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Create the table (hash key `PK`, on-demand billing) if it is missing
    /// and wait until it is active. Meant for local development.
    ///
    /// # Errors
    /// `Unavailable` if the table cannot be described or created.
    pub async fn ensure_table(&self) -> Result<(), StoreError> {
        const OPERATION: &str = "ensure_table";

        match self
            .client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
        {
            Ok(_) => {
                tracing::debug!(table = %self.table_name, "table already exists");
                return Ok(());
            }
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) => {}
            Err(err) => return Err(StoreError::unavailable(OPERATION, err)),
        }

        let attribute = AttributeDefinition::builder()
            .attribute_name(PARTITION_KEY)
            .attribute_type(ScalarAttributeType::S)
            .build()
            .map_err(|e| StoreError::unavailable(OPERATION, e))?;
        let key = KeySchemaElement::builder()
            .attribute_name(PARTITION_KEY)
            .key_type(KeyType::Hash)
            .build()
            .map_err(|e| StoreError::unavailable(OPERATION, e))?;

        self.client
            .create_table()
            .table_name(&self.table_name)
            .attribute_definitions(attribute)
            .key_schema(key)
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await
            .map_err(|e| StoreError::unavailable(OPERATION, e))?;
        tracing::info!(table = %self.table_name, "created preferences table");

        for _ in 0..30 {
            let status = self
                .client
                .describe_table()
                .table_name(&self.table_name)
                .send()
                .await
                .map_err(|e| StoreError::unavailable(OPERATION, e))?
                .table
                .and_then(|t| t.table_status);
            if status == Some(TableStatus::Active) {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        Err(StoreError::unavailable(
            OPERATION,
            anyhow::anyhow!("table {} did not become active", self.table_name),
        ))
    }

    /// Run a conditional update. `Ok(None)` means the condition did not hold.
    async fn conditional_update(
        &self,
        user_id: &str,
        expr: UpdateExpression,
        return_values: ReturnValue,
        operation: &'static str,
    ) -> Result<Option<UpdateItemOutput>, StoreError> {
        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key(PARTITION_KEY, record::key_attribute(user_id))
            .update_expression(expr.update)
            .set_condition_expression(expr.condition)
            .set_expression_attribute_names(Some(expr.names))
            .set_expression_attribute_values(Some(expr.values))
            .return_values(return_values)
            .send()
            .await;

        match result {
            Ok(out) => Ok(Some(out)),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(UpdateItemError::is_conditional_check_failed_exception) =>
            {
                Ok(None)
            }
            Err(err) => Err(store_error(operation, err)),
        }
    }
}

#[async_trait]
impl PreferencesRepository for DynamoPreferencesRepository {
    async fn get_all(&self, user_id: &str) -> Result<Option<Preferences>, StoreError> {
        let out = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(PARTITION_KEY, record::key_attribute(user_id))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| store_error("get_all", e))?;

        record::preferences_from_item(out.item(), "get_all")
    }

    async fn get_one(&self, user_id: &str, key: &str) -> Result<Option<String>, StoreError> {
        let out = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(PARTITION_KEY, record::key_attribute(user_id))
            .projection_expression("#p.#k")
            .expression_attribute_names("#p", record::PREFERENCES_ATTR)
            .expression_attribute_names("#k", key)
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| store_error("get_one", e))?;

        record::value_from_item(out.item(), key, "get_one")
    }

    async fn replace_all(
        &self,
        user_id: &str,
        preferences: &Preferences,
    ) -> Result<(), StoreError> {
        let expr = UpdateExpression::replace_all(preferences, record::timestamp("replace_all")?);
        // No condition, so None cannot come back
        self.conditional_update(user_id, expr, ReturnValue::None, "replace_all")
            .await?;
        Ok(())
    }

    async fn merge(&self, user_id: &str, patch: &Preferences) -> Result<Preferences, StoreError> {
        for round in 1..=MERGE_ROUNDS {
            let now = record::timestamp("merge")?;

            let existing = UpdateExpression::merge_into_existing(patch, now.clone());
            if let Some(out) = self
                .conditional_update(user_id, existing, ReturnValue::AllNew, "merge")
                .await?
            {
                return record::preferences_from_item(out.attributes(), "merge")?.ok_or_else(
                    || StoreError::malformed("merge", "updated record has no preferences"),
                );
            }

            let create = UpdateExpression::create_from_patch(patch, now);
            if self
                .conditional_update(user_id, create, ReturnValue::None, "merge")
                .await?
                .is_some()
            {
                return Ok(patch.clone());
            }

            tracing::debug!(user_id, round, "preference set created concurrently; retrying merge");
        }

        Err(StoreError::unavailable(
            "merge",
            anyhow::anyhow!("merge did not settle after {MERGE_ROUNDS} rounds"),
        ))
    }

    async fn delete_all(&self, user_id: &str) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key(PARTITION_KEY, record::key_attribute(user_id))
            .send()
            .await
            .map_err(|e| store_error("delete_all", e))?;
        Ok(())
    }

    async fn delete_key(&self, user_id: &str, key: &str) -> Result<(), StoreError> {
        let expr = UpdateExpression::delete_key(key, record::timestamp("delete_key")?);
        if self
            .conditional_update(user_id, expr, ReturnValue::None, "delete_key")
            .await?
            .is_none()
        {
            tracing::debug!(user_id, key, "no preference set to delete from");
        }
        Ok(())
    }
}
