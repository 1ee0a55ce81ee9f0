//! Result graph and row processing.

pub mod assembler;
pub mod consumer;
pub mod converter;
pub mod domain_result;
pub mod row;

pub use assembler::BasicResultAssembler;
pub use consumer::ListResultsConsumer;
pub use converter::{
    converter_for, BasicValueConverter, EnumOrdinalConverter, EnumStringConverter, YesNoConverter,
};
pub use domain_result::{BasicFetch, BasicResult, DomainResult, EntityResult, FetchTiming};
pub use row::{
    JdbcRowProcessingState, JdbcValuesSource, ListJdbcValues, NestedRowProcessingState,
    RowProcessingState,
};
