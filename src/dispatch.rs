//! The update loop: one PATCH per (row, field) pair, row-major.
//!
//! Nothing here is fatal. Unresolved fields are skipped, rejected and failed
//! requests are logged, and the loop always runs to the end of the table.

use std::thread;
use std::time::Duration;

use tracing::{error, info, instrument, warn};

use crate::api::{self, CustomFieldApi};
use crate::model::{FieldIdMap, PatchPayload, PatchRequest, Record, RecordTable};

/// Pause after every real request.
pub const DEFAULT_PACE: Duration = Duration::from_millis(500);

/// Knobs for one pass over the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Log every request without sending it.
    pub dry_run: bool,
    /// Pause after each request that was actually sent.
    pub pace: Duration,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            pace: DEFAULT_PACE,
        }
    }
}

/// Outcome counts of a dispatch pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchSummary {
    /// Pairs logged but not sent because of a dry run.
    pub simulated: usize,
    /// Requests answered with a status below 400.
    pub succeeded: usize,
    /// Requests answered with a status of 400 or above.
    pub failed: usize,
    /// Requests that never got an answer.
    pub errored: usize,
    /// Pairs whose field has no resolved identifier.
    pub skipped: usize,
}

impl DispatchSummary {
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed + self.errored
    }
}

/// Context shared by every request of a pass.
pub struct Dispatcher<'a, A: CustomFieldApi + ?Sized> {
    api: &'a A,
    bearer: &'a str,
    base_url: &'a str,
    tenant: &'a str,
    options: DispatchOptions,
}

impl<'a, A: CustomFieldApi + ?Sized> Dispatcher<'a, A> {
    pub fn new(
        api: &'a A,
        bearer: &'a str,
        base_url: &'a str,
        tenant: &'a str,
        options: DispatchOptions,
    ) -> Self {
        Self {
            api,
            bearer,
            base_url,
            tenant,
            options,
        }
    }

    /// Walks rows in table order and, within a row, fields in `field_names`
    /// order.
    #[instrument(
        level = "info",
        skip_all,
        fields(row_count = table.len(), field_count = field_names.len(), dry_run = self.options.dry_run)
    )]
    pub fn run(
        &self,
        table: &RecordTable,
        field_names: &[String],
        field_ids: &FieldIdMap,
    ) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        let total = table.len();
        for (position, record) in table.iter().enumerate() {
            let done = position + 1;
            info!(row = record.index, total, "patching use case {done}/{total}");
            for field_name in field_names {
                self.dispatch_one(record, field_name, field_ids, &mut summary);
            }
        }

        info!(
            simulated = summary.simulated,
            succeeded = summary.succeeded,
            failed = summary.failed,
            errored = summary.errored,
            skipped = summary.skipped,
            "dispatch finished"
        );
        summary
    }

    fn dispatch_one(
        &self,
        record: &Record,
        field_name: &str,
        field_ids: &FieldIdMap,
        summary: &mut DispatchSummary,
    ) {
        let row = record.index;
        let use_case_id = record.use_case_id.as_str();

        let Some(custom_field_id) = field_ids.get(field_name) else {
            warn!(row, use_case_id, field = field_name, "[Row {row}] no custom field ID for '{field_name}'; skipping");
            summary.skipped += 1;
            return;
        };

        let request = build_request(self.base_url, self.tenant, record, field_name, custom_field_id);
        let payload = serde_json::to_string_pretty(&request.payload).unwrap_or_default();

        if self.options.dry_run {
            info!(
                row,
                use_case_id,
                field = field_name,
                "[DRY RUN] [Row {row}] would PATCH to: {}\npayload:\n{payload}",
                request.url
            );
            summary.simulated += 1;
            return;
        }

        info!(
            row,
            use_case_id,
            field = field_name,
            "[Row {row}] sending PATCH to: {}\npayload:\n{payload}",
            request.url
        );

        match self.api.patch_custom_field(self.bearer, &request) {
            Ok(reply) if reply.is_success() => {
                info!(row, use_case_id, field = field_name, status = reply.status, "[Row {row}] PATCH success");
                summary.succeeded += 1;
            }
            Ok(reply) => {
                warn!(
                    row,
                    use_case_id,
                    field = field_name,
                    status = reply.status,
                    "[Row {row}] PATCH failed ({}) | {}",
                    reply.status,
                    reply.body
                );
                summary.failed += 1;
            }
            Err(cause) => {
                error!(
                    row,
                    use_case_id,
                    field = field_name,
                    "[Row {row}] PATCH error for use_case_id={use_case_id}, field={field_name}: {cause}"
                );
                summary.errored += 1;
            }
        }

        if !self.options.pace.is_zero() {
            thread::sleep(self.options.pace);
        }
    }
}

/// Builds the update for one (row, field) pair.
pub fn build_request(
    base_url: &str,
    tenant: &str,
    record: &Record,
    field_name: &str,
    custom_field_id: &str,
) -> PatchRequest {
    PatchRequest {
        url: api::use_case_custom_fields_url(base_url, tenant, &record.use_case_id),
        payload: PatchPayload::new(custom_field_id, record.value(field_name)),
    }
}
