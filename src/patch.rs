use tracing::{info, instrument};

use crate::api::{ApiClient, CustomFieldApi};
use crate::config::Config;
use crate::dispatch::{DispatchOptions, DispatchSummary, Dispatcher};
use crate::error::Result;
use crate::fields;
use crate::io::csv_read;
use crate::model::FieldIdMap;

/// Runs the whole update against the service named in `config`.
pub fn patch_use_cases(config: &Config, options: DispatchOptions) -> Result<DispatchSummary> {
    let client = ApiClient::new(&config.base_url)?;
    patch_use_cases_with(&client, config, options)
}

/// Runs the whole update through `api`: token exchange, field resolution,
/// table load and dispatch, in that order.
///
/// A dry run makes no network call at all: the bearer token is left empty
/// and every requested field name stands in for its own identifier.
#[instrument(
    level = "info",
    skip_all,
    fields(tenant = %config.tenant, csv = %config.csv_path.display(), dry_run = options.dry_run)
)]
pub fn patch_use_cases_with<A: CustomFieldApi + ?Sized>(
    api: &A,
    config: &Config,
    options: DispatchOptions,
) -> Result<DispatchSummary> {
    let field_names = &config.custom_field_names;

    let (bearer, field_ids) = if options.dry_run {
        info!("dry run: skipping token exchange and custom field lookup");
        (String::new(), FieldIdMap::identity(field_names))
    } else {
        let bearer = api.exchange_token(&config.api_token, &config.tenant)?;
        let field_ids = fields::get_custom_field_ids(api, &bearer, &config.tenant, field_names)?;
        (bearer, field_ids)
    };

    let table = csv_read::read_and_prepare(&config.csv_path, field_names, config.num_ids)?;
    info!(row_count = table.len(), "prepared {} use case row(s)", table.len());

    let dispatcher = Dispatcher::new(api, &bearer, &config.base_url, &config.tenant, options);
    Ok(dispatcher.run(&table, field_names, &field_ids))
}
