use super::domain_result::DomainResult;
use super::row::{JdbcRowProcessingState, JdbcValuesSource};
use crate::error::Result;
use crate::hql::holder::{HolderInstantiator, Row};
use tracing::trace;

/// Drives the row loop: assembles every domain result of each row and
/// hands the tuple to the holder instantiator.
pub struct ListResultsConsumer;

impl ListResultsConsumer {
    pub fn consume(
        source: &mut dyn JdbcValuesSource,
        results: &[DomainResult],
        holder: &HolderInstantiator,
    ) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        while source.next_row()? {
            let state = JdbcRowProcessingState::new(source.current_row());
            let mut tuple = Vec::with_capacity(results.len());
            for result in results {
                tuple.push(result.assemble(&state)?);
            }
            let row = if !holder.is_required() && tuple.len() == 1 {
                Row::Value(tuple.remove(0))
            } else {
                holder.instantiate(tuple)?
            };
            rows.push(row);
        }
        trace!(rows = rows.len(), "consumed result set");
        Ok(rows)
    }
}
