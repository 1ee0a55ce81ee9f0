//! Result graph: what each selected value is and how it is assembled.

use super::assembler::BasicResultAssembler;
use super::converter::BasicValueConverter;
use super::row::{NestedRowProcessingState, RowProcessingState};
use crate::error::Result;
use crate::value::{EntityInstance, JavaType, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTiming {
    /// Selected by the current statement.
    Immediate,
    /// Loaded later, on access.
    Delayed,
}

/// Pick the assembler for a column read at `position`.
fn choose_assembler(
    position: usize,
    declared: JavaType,
    column_type: JavaType,
    converter: Option<Arc<dyn BasicValueConverter>>,
) -> BasicResultAssembler {
    let natural = converter
        .as_ref()
        .map(|c| c.domain_java_type())
        .unwrap_or(column_type);
    if declared != natural && declared != JavaType::Object {
        BasicResultAssembler::Coercing {
            position,
            converter,
            target: declared,
        }
    } else {
        BasicResultAssembler::Direct {
            position,
            converter,
        }
    }
}

/// A scalar projection.
#[derive(Debug, Clone)]
pub struct BasicResult {
    pub alias: Option<String>,
    pub java_type: JavaType,
    assembler: BasicResultAssembler,
}

impl BasicResult {
    pub fn new(
        position: usize,
        alias: Option<String>,
        java_type: JavaType,
        column_type: JavaType,
        converter: Option<Arc<dyn BasicValueConverter>>,
    ) -> Self {
        Self {
            alias,
            java_type,
            assembler: choose_assembler(position, java_type, column_type, converter),
        }
    }

    pub fn assembler(&self) -> &BasicResultAssembler {
        &self.assembler
    }

    pub fn assemble(&self, state: &dyn RowProcessingState) -> Result<Value> {
        self.assembler.assemble(state)
    }
}

/// A basic attribute of an entity result.
#[derive(Debug, Clone)]
pub struct BasicFetch {
    pub name: String,
    pub timing: FetchTiming,
    pub java_type: JavaType,
    assembler: BasicResultAssembler,
}

impl BasicFetch {
    /// `position` is `None` when the column is not part of the select list.
    pub fn new(
        name: impl Into<String>,
        position: Option<usize>,
        timing: FetchTiming,
        java_type: JavaType,
        column_type: JavaType,
        converter: Option<Arc<dyn BasicValueConverter>>,
        lazy_capable: bool,
    ) -> Self {
        let assembler = match position {
            None if timing == FetchTiming::Delayed && lazy_capable => {
                BasicResultAssembler::UnfetchedBasicPart
            }
            None => BasicResultAssembler::Unfetched,
            Some(position) => choose_assembler(position, java_type, column_type, converter),
        };
        Self {
            name: name.into(),
            timing,
            java_type,
            assembler,
        }
    }

    pub fn assembler(&self) -> &BasicResultAssembler {
        &self.assembler
    }

    pub fn assemble(&self, state: &dyn RowProcessingState) -> Result<Value> {
        self.assembler.assemble(state)
    }
}

/// An entity projection: its identifier and attributes, read from the
/// columns starting at `offset`.
#[derive(Debug, Clone)]
pub struct EntityResult {
    pub entity_name: String,
    pub alias: Option<String>,
    pub offset: usize,
    pub identifier: BasicFetch,
    pub fetches: Vec<BasicFetch>,
}

impl EntityResult {
    /// Number of columns this entity occupies.
    pub fn width(&self) -> usize {
        std::iter::once(&self.identifier)
            .chain(&self.fetches)
            .filter_map(|f| f.assembler.position())
            .map(|p| p + 1)
            .max()
            .unwrap_or(0)
    }

    /// Assemble the entity, or `Null` when the identifier is null (an
    /// unmatched outer join).
    pub fn assemble(&self, state: &dyn RowProcessingState) -> Result<Value> {
        let nested = NestedRowProcessingState::new(state, self.offset);
        let id = self.identifier.assemble(&nested)?;
        if id.is_null() {
            return Ok(Value::Null);
        }
        let mut instance = EntityInstance::new(&self.entity_name).with(&self.identifier.name, id);
        for fetch in &self.fetches {
            instance.set(&fetch.name, fetch.assemble(&nested)?);
        }
        Ok(Value::Entity(Box::new(instance)))
    }
}

#[derive(Debug, Clone)]
pub enum DomainResult {
    Basic(BasicResult),
    Entity(EntityResult),
}

impl DomainResult {
    pub fn alias(&self) -> Option<&str> {
        match self {
            DomainResult::Basic(basic) => basic.alias.as_deref(),
            DomainResult::Entity(entity) => entity.alias.as_deref(),
        }
    }

    /// Declared type name of the result, the entity name for entities.
    pub fn type_name(&self) -> String {
        match self {
            DomainResult::Basic(basic) => basic.java_type.name().to_string(),
            DomainResult::Entity(entity) => entity.entity_name.clone(),
        }
    }

    pub fn assemble(&self, state: &dyn RowProcessingState) -> Result<Value> {
        match self {
            DomainResult::Basic(basic) => basic.assemble(state),
            DomainResult::Entity(entity) => entity.assemble(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::converter::YesNoConverter;
    use crate::results::row::JdbcRowProcessingState;
    use pretty_assertions::assert_eq;

    fn dog_result(offset: usize) -> EntityResult {
        EntityResult {
            entity_name: "Dog".into(),
            alias: Some("d".into()),
            offset,
            identifier: BasicFetch::new("id", Some(0), FetchTiming::Immediate, JavaType::Long, JavaType::Long, None, false),
            fetches: vec![
                BasicFetch::new("name", Some(1), FetchTiming::Immediate, JavaType::String, JavaType::String, None, false),
                BasicFetch::new("bio", None, FetchTiming::Delayed, JavaType::String, JavaType::String, None, true),
                BasicFetch::new("vaccinated", Some(2), FetchTiming::Immediate, JavaType::Boolean, JavaType::String, Some(Arc::new(YesNoConverter)), false),
            ],
        }
    }

    #[test]
    fn test_chooses_assembler_once() {
        let coercing = BasicResult::new(0, None, JavaType::Integer, JavaType::Long, None);
        assert!(matches!(coercing.assembler(), BasicResultAssembler::Coercing { .. }));
        let direct = BasicResult::new(0, None, JavaType::Long, JavaType::Long, None);
        assert!(matches!(direct.assembler(), BasicResultAssembler::Direct { .. }));
        let eager_missing = BasicFetch::new("x", None, FetchTiming::Immediate, JavaType::Long, JavaType::Long, None, true);
        assert!(matches!(eager_missing.assembler(), BasicResultAssembler::Unfetched));
        let not_lazy = BasicFetch::new("x", None, FetchTiming::Delayed, JavaType::Long, JavaType::Long, None, false);
        assert!(matches!(not_lazy.assembler(), BasicResultAssembler::Unfetched));
    }

    #[test]
    fn test_assembles_entity_from_offset() {
        let result = dog_result(1);
        assert_eq!(result.width(), 3);
        let row = vec![
            Value::Int32(99),
            Value::Int64(5),
            Value::String("Rex".into()),
            Value::String("N".into()),
        ];
        let state = JdbcRowProcessingState::new(&row);
        let value = result.assemble(&state).unwrap();
        let dog = value.as_entity().unwrap();
        assert_eq!(dog.get("id"), Some(&Value::Int64(5)));
        assert_eq!(dog.get("name"), Some(&Value::String("Rex".into())));
        assert_eq!(dog.get("bio"), Some(&Value::Unfetched));
        assert_eq!(dog.get("vaccinated"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_null_identifier_is_null_entity() {
        let row = vec![Value::Null, Value::Null, Value::Null];
        let state = JdbcRowProcessingState::new(&row);
        assert_eq!(dog_result(0).assemble(&state).unwrap(), Value::Null);
    }
}
