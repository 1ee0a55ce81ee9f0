use super::{
    Assigned, ForeignGenerator, GeneratorContext, GuidGenerator, IdentifierGenerator,
    IdentityGenerator, IncrementGenerator, SelectGenerator, SequenceGenerator,
    SequenceHiLoGenerator, SequenceIdentityGenerator, TableHiLoGenerator, UuidGenerator,
    UuidHexGenerator,
};
use crate::error::{Error, Result};
use crate::value::{JavaType, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds and configures a generator.
pub type GeneratorConstructor = fn(&GeneratorContext<'_>) -> Result<Arc<dyn IdentifierGenerator>>;

/// Registry of generator strategies by name.
#[derive(Clone)]
pub struct IdentifierGeneratorFactory {
    constructors: BTreeMap<String, GeneratorConstructor>,
}

impl IdentifierGeneratorFactory {
    /// The built-in strategies.
    pub fn standard() -> Self {
        let mut factory = Self {
            constructors: BTreeMap::new(),
        };
        factory.register("assigned", |ctx| Ok(Arc::new(Assigned::configure(ctx))));
        factory.register("sequence", |ctx| Ok(Arc::new(SequenceGenerator::configure(ctx)?)));
        factory.register("seqhilo", |ctx| Ok(Arc::new(SequenceHiLoGenerator::configure(ctx)?)));
        factory.register("hilo", |ctx| Ok(Arc::new(TableHiLoGenerator::configure(ctx)?)));
        factory.register("increment", |ctx| Ok(Arc::new(IncrementGenerator::configure(ctx)?)));
        factory.register("identity", |ctx| Ok(Arc::new(IdentityGenerator::configure(ctx)?)));
        factory.register("sequence-identity", |ctx| {
            Ok(Arc::new(SequenceIdentityGenerator::configure(ctx)?))
        });
        factory.register("select", |ctx| Ok(Arc::new(SelectGenerator::configure(ctx)?)));
        factory.register("foreign", |ctx| Ok(Arc::new(ForeignGenerator::configure(ctx)?)));
        factory.register("guid", |ctx| Ok(Arc::new(GuidGenerator::configure(ctx)?)));
        factory.register("uuid.hex", |ctx| Ok(Arc::new(UuidHexGenerator::configure(ctx))));
        factory.register("uuid", |ctx| Ok(Arc::new(UuidGenerator::configure(ctx))));
        factory
    }

    /// Add or replace a strategy.
    pub fn register(&mut self, strategy: impl Into<String>, constructor: GeneratorConstructor) {
        self.constructors.insert(strategy.into(), constructor);
    }

    pub fn strategies(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Create the generator configured for `ctx`. `native` resolves to the
    /// dialect's preferred strategy.
    pub fn create(&self, ctx: &GeneratorContext<'_>) -> Result<Arc<dyn IdentifierGenerator>> {
        let mut strategy = ctx.identifier.generator.strategy.as_str();
        if strategy == "native" {
            strategy = ctx.dialect.native_identifier_generator_strategy();
        }
        let constructor = self.constructors.get(strategy).ok_or_else(|| {
            Error::Mapping(format!("could not interpret id generator strategy: {}", strategy))
        })?;
        constructor(ctx)
    }
}

impl Default for IdentifierGeneratorFactory {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for IdentifierGeneratorFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.constructors.keys()).finish()
    }
}

/// Convert a generated number to the identifier type.
pub fn create_number(value: i64, java_type: JavaType) -> Result<Value> {
    let out_of_range = || {
        Error::IdentifierGeneration(format!("{} is out of range for {}", value, java_type.name()))
    };
    match java_type {
        JavaType::Long => Ok(Value::Int64(value)),
        JavaType::Integer => i32::try_from(value).map(Value::Int32).map_err(|_| out_of_range()),
        JavaType::Short => i16::try_from(value).map(Value::Int16).map_err(|_| out_of_range()),
        other => Err(Error::IdentifierGeneration(format!(
            "this id generator generates long, integer, short; cannot produce {}",
            other.name()
        ))),
    }
}

/// Convert a value read from the database to the identifier type.
pub fn identifier_from_value(value: Value, java_type: JavaType) -> Result<Value> {
    if java_type.is_integral() {
        let number = value.as_i64().ok_or_else(|| {
            Error::IdentifierGeneration(format!("expected a numeric identifier, got {}", value))
        })?;
        return create_number(number, java_type);
    }
    java_type
        .coerce(value)
        .map_err(|e| Error::IdentifierGeneration(e.to_string()))
}
