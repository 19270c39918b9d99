use std::collections::HashMap;

use tracing::{info, instrument, warn};

use crate::api::CustomFieldApi;
use crate::error::Result;
use crate::model::{CustomFieldDefinition, FieldIdMap};

/// Fetches the tenant's use case custom field catalog and resolves
/// `requested_names` against it.
///
/// Failing to fetch the catalog is fatal; a requested name missing from it
/// is only a warning and is left out of the map.
#[instrument(level = "info", skip_all, fields(tenant = %tenant))]
pub fn get_custom_field_ids<A: CustomFieldApi + ?Sized>(
    api: &A,
    bearer: &str,
    tenant: &str,
    requested_names: &[String],
) -> Result<FieldIdMap> {
    let catalog = api.fetch_custom_fields(bearer, tenant)?;
    Ok(resolve_field_ids(&catalog, requested_names, tenant))
}

/// Intersects the catalog with the requested names. When the catalog lists
/// a name twice the later entry wins.
pub fn resolve_field_ids(
    catalog: &[CustomFieldDefinition],
    requested_names: &[String],
    tenant: &str,
) -> FieldIdMap {
    let available: HashMap<&str, &str> = catalog
        .iter()
        .map(|field| (field.name.as_str(), field.id.as_str()))
        .collect();

    let mut field_ids = FieldIdMap::new();
    for name in requested_names {
        match available.get(name.as_str()) {
            Some(id) => {
                info!(field = %name, id = %id, "found custom field ID for '{name}'");
                field_ids.insert(name.as_str(), *id);
            }
            None => {
                warn!(field = %name, "custom field '{name}' not found for tenant {tenant}; skipping");
            }
        }
    }

    info!(
        mapped = field_ids.len(),
        requested = requested_names.len(),
        "mapped {} custom field(s) based on the provided list",
        field_ids.len()
    );
    field_ids
}
