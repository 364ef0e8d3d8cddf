//! Org custom-property definition sync.

use sheriff_config::{CustomProperty, OrganizationConfig};
use sheriff_github::client::DynGitHubClient;
use sheriff_github::types::CustomPropertySchema;

use crate::context::{OrgReporter, ReconcileContext};
use crate::error::ReconcileResult;

/// Wire form of a declared property type.
fn type_str(value_type: sheriff_config::model::PropertyType) -> &'static str {
    match value_type {
        sheriff_config::model::PropertyType::String => "string",
        sheriff_config::model::PropertyType::SingleSelect => "single_select",
        sheriff_config::model::PropertyType::MultiSelect => "multi_select",
    }
}

/// Wire schema for a declared property.
#[must_use]
pub fn to_schema(property: &CustomProperty) -> CustomPropertySchema {
    CustomPropertySchema {
        property_name: property.property_name.clone(),
        value_type: type_str(property.value_type).to_string(),
        required: property.required.unwrap_or(false),
        default_value: property.default_value.as_ref().map(|v| v.to_json()),
        description: property.description.clone(),
        allowed_values: property.allowed_values.clone(),
    }
}

/// Upsert every declared property whose upstream definition is missing or
/// differs, and delete every upstream property the document does not name.
pub async fn sync_custom_properties(
    ctx: &ReconcileContext,
    reporter: &mut OrgReporter,
    client: &DynGitHubClient,
    org: &OrganizationConfig,
) -> ReconcileResult<()> {
    let org_name = org.organization.as_str();
    let upstream = client.list_custom_properties(org_name).await?;

    for property in &org.custom_properties {
        let desired = to_schema(property);
        let current = upstream
            .iter()
            .find(|schema| schema.property_name == desired.property_name);

        if current.is_some_and(|schema| schemas_equal(schema, &desired)) {
            continue;
        }
        reporter.note(format!(
            "Upserting custom property `{}` on `{org_name}`",
            desired.property_name
        ));
        if !ctx.dry_run {
            if let Err(err) = client.upsert_custom_property(org_name, &desired).await {
                tracing::warn!(org = org_name, property = %desired.property_name, error = %err, "custom property upsert failed");
            }
        }
    }

    for schema in &upstream {
        let declared = org
            .custom_properties
            .iter()
            .any(|p| p.property_name == schema.property_name);
        if !declared {
            reporter.note(format!(
                "Deleting custom property `{}` from `{org_name}`",
                schema.property_name
            ));
            if !ctx.dry_run {
                if let Err(err) = client
                    .delete_custom_property(org_name, &schema.property_name)
                    .await
                {
                    tracing::warn!(org = org_name, property = %schema.property_name, error = %err, "custom property delete failed");
                }
            }
        }
    }
    Ok(())
}

/// Deep equality over the fields sheriff manages. Upstream responses carry
/// extra bookkeeping fields that must not count as drift.
fn schemas_equal(a: &CustomPropertySchema, b: &CustomPropertySchema) -> bool {
    a.value_type == b.value_type
        && a.required == b.required
        && a.description == b.description
        && a.default_value == b.default_value
        && a.allowed_values == b.allowed_values
}
