//! The ingestion run: existence check, plan, schema, provisioning, filtered inserts, report.

use tracing::{debug, info, warn};

use crate::error::{IngestionError, IngestionResult};
use crate::schema::plan::{create_table_sql, drop_table_sql, insert_sql};
use crate::schema::{build_schema, plan, table_name_for};
use crate::store::{RelationalStore, StoreSession};
use crate::types::{IngestionReport, PlanOutcome, RawRecord, RawValue, TableSchema};

use super::observability::{IngestionContext, IngestionSeverity, IngestionStats};
use super::quality::RowQualityFilter;
use super::unified::IngestionOptions;

/// Where to put the rows of one upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRequest {
    /// Caller-supplied table name; `None` uses [`crate::schema::DEFAULT_TABLE_NAME`].
    pub table_name: Option<String>,
    /// Drop and recreate the table if it already exists.
    pub force_overwrite: bool,
}

impl TableRequest {
    pub fn new(table_name: Option<&str>, force_overwrite: bool) -> Self {
        Self {
            table_name: table_name.map(str::to_string),
            force_overwrite,
        }
    }

    /// Effective table name after normalization/defaulting.
    pub fn effective_table_name(&self) -> String {
        table_name_for(self.table_name.as_deref())
    }
}

/// Ingest already-parsed records into the store.
///
/// Runs strictly sequentially on one store session, which is dropped (and its connection
/// released) on every exit path. No lock is taken on the table name: two concurrent runs
/// against the same name race on the existence check; use
/// [`crate::execution::IngestionEngine`] to serialize them.
///
/// Errors:
///
/// - [`IngestionError::Validation`] if [`IngestionOptions::min_filled_percent`] is above 100.
/// - [`IngestionError::Conflict`] if the table exists and overwrite was not requested; nothing is
///   touched.
/// - [`IngestionError::EmptyInput`] if no record carries any data; nothing is touched.
/// - [`IngestionError::InvalidColumn`] if the sample headers do not make unique identifiers.
/// - [`IngestionError::Provisioning`] if DROP or CREATE fails.
/// - [`IngestionError::Insertion`] on the first failing row. Without
///   [`IngestionOptions::atomic`], rows inserted before it stay in the table.
///
/// ```rust
/// use sheet2sql::ingestion::{ingest_records, IngestionOptions, TableRequest};
/// use sheet2sql::store::DuckDbStore;
/// use sheet2sql::types::{RawRecord, RawValue};
///
/// # fn main() -> Result<(), sheet2sql::IngestionError> {
/// let store = DuckDbStore::open_in_memory()?;
/// let records = vec![RawRecord::new(vec![
///     ("Name".to_string(), RawValue::Text("Ada".to_string())),
///     ("Age".to_string(), RawValue::Int(36)),
/// ])];
/// let request = TableRequest::new(Some("People"), false);
/// let report = ingest_records(&store, &request, &records, &IngestionOptions::default())?;
/// assert_eq!(report.table_name, "people");
/// assert_eq!(report.rows_inserted, 1);
/// # Ok(())
/// # }
/// ```
pub fn ingest_records(
    store: &dyn RelationalStore,
    request: &TableRequest,
    records: &[RawRecord],
    options: &IngestionOptions,
) -> IngestionResult<IngestionReport> {
    let table = request.effective_table_name();
    let ctx = IngestionContext {
        table_name: table.clone(),
        source: None,
        format: None,
    };
    let result = run(store, &table, request.force_overwrite, records, options);
    notify(options, &ctx, &result);
    result
}

/// Report a finished run to the configured observer, if any.
pub(crate) fn notify(
    options: &IngestionOptions,
    ctx: &IngestionContext,
    result: &IngestionResult<IngestionReport>,
) {
    let Some(obs) = options.observer.as_ref() else {
        return;
    };
    match result {
        Ok(report) => obs.on_success(
            ctx,
            IngestionStats {
                rows_inserted: report.rows_inserted,
                rows_rejected: report.rows_rejected,
            },
        ),
        Err(e) => {
            let sev = IngestionSeverity::for_error(e);
            obs.on_failure(ctx, sev, e);
            if sev >= options.alert_at_or_above {
                obs.on_alert(ctx, sev, e);
            }
        }
    }
}

#[tracing::instrument(
    name = "ingest",
    skip(store, records, options),
    fields(table = %table, records = records.len())
)]
pub(crate) fn run(
    store: &dyn RelationalStore,
    table: &str,
    force_overwrite: bool,
    records: &[RawRecord],
    options: &IngestionOptions,
) -> IngestionResult<IngestionReport> {
    if options.min_filled_percent > 100 {
        return Err(IngestionError::validation(format!(
            "min_filled_percent must be between 0 and 100, got {}",
            options.min_filled_percent
        )));
    }

    let mut session = store.connect()?;

    let exists = session.table_exists(table)?;
    let outcome = plan(exists, force_overwrite);
    if outcome == PlanOutcome::RejectExisting {
        warn!("table exists and overwrite was not requested");
        return Err(IngestionError::Conflict {
            table: table.to_string(),
        });
    }

    let sample = records
        .iter()
        .find(|r| r.has_data())
        .ok_or(IngestionError::EmptyInput)?;
    let schema = build_schema(table, sample)?;
    let filter = RowQualityFilter::new(options.min_filled_percent);

    let counts = if options.atomic {
        session.begin()?;
        match provision_and_insert(session.as_mut(), &schema, outcome, records, sample.len(), filter) {
            Ok(counts) => {
                session.commit()?;
                counts
            }
            Err(e) => {
                if let Err(rb) = session.rollback() {
                    warn!(error = %rb, "rollback failed");
                }
                return Err(e);
            }
        }
    } else {
        provision_and_insert(session.as_mut(), &schema, outcome, records, sample.len(), filter)?
    };

    let message = match outcome {
        PlanOutcome::Overwrite => format!(
            "Existing table overwritten. {} rows inserted into {}",
            counts.inserted, table
        ),
        _ => format!("{} rows inserted into {}", counts.inserted, table),
    };
    info!(
        inserted = counts.inserted,
        rejected = counts.rejected,
        ?outcome,
        "ingestion finished"
    );

    Ok(IngestionReport {
        table_name: table.to_string(),
        columns: schema.columns,
        rows_inserted: counts.inserted,
        rows_rejected: counts.rejected,
        outcome,
        message,
    })
}

#[derive(Debug, Clone, Copy, Default)]
struct RowCounts {
    inserted: usize,
    rejected: usize,
}

fn provision_and_insert(
    session: &mut (dyn StoreSession + '_),
    schema: &TableSchema,
    outcome: PlanOutcome,
    records: &[RawRecord],
    total_columns: usize,
    filter: RowQualityFilter,
) -> IngestionResult<RowCounts> {
    let table = schema.table_name.as_str();

    if outcome == PlanOutcome::Overwrite {
        let sql = drop_table_sql(table);
        debug!(%sql, "dropping table for overwrite");
        session
            .execute(&sql, &[])
            .map_err(|e| IngestionError::Provisioning {
                table: table.to_string(),
                action: "drop existing",
                message: e.to_string(),
            })?;
    }

    let sql = create_table_sql(schema, |t| session.type_name(t));
    debug!(%sql, "creating table");
    session
        .execute(&sql, &[])
        .map_err(|e| IngestionError::Provisioning {
            table: table.to_string(),
            action: "create",
            message: e.to_string(),
        })?;

    let insert = insert_sql(schema);
    let mut counts = RowCounts::default();
    for (idx, record) in records.iter().enumerate() {
        if !filter.accept(record, total_columns) {
            counts.rejected += 1;
            continue;
        }
        let values: Vec<RawValue> = schema
            .columns
            .iter()
            .map(|c| record.get(&c.source).cloned().unwrap_or(RawValue::Empty))
            .collect();
        session
            .execute(&insert, &values)
            .map_err(|e| IngestionError::Insertion {
                table: table.to_string(),
                row: idx + 1,
                message: e.to_string(),
            })?;
        counts.inserted += 1;
    }

    Ok(counts)
}
