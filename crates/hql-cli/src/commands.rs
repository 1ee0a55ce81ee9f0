//! Command implementations. Each command produces a [`Report`] that the
//! formatter renders.

use crate::error::CliError;
use hql_core::hql::HqlQueryPlan;
use hql_core::id::GeneratorDdl;
use hql_core::{Catalog, DialectKind, MappingDocument, SessionFactory, Settings};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Output of one command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
    Split { queries: Vec<String> },
    Translation(Translation),
    Ddl(GeneratorDdl),
    Parsed { ast: String },
}

/// A compiled query plan as printed by `translate` and `filter`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Translation {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_role: Option<String>,
    pub sql: Vec<String>,
    pub query_spaces: Vec<String>,
    pub return_types: Vec<String>,
    pub named_parameters: Vec<String>,
    pub ordinal_parameters: usize,
    pub manipulation: bool,
}

impl Translation {
    fn from_plan(plan: &HqlQueryPlan, collection_role: Option<&str>) -> Self {
        Self {
            query: plan.source_query().to_string(),
            collection_role: collection_role.map(str::to_string),
            sql: plan.sql_strings().to_vec(),
            query_spaces: plan.query_spaces().to_vec(),
            return_types: plan.return_types().to_vec(),
            named_parameters: plan.named_parameters().into_iter().collect(),
            ordinal_parameters: plan.ordinal_parameter_count(),
            manipulation: plan.is_manipulation(),
        }
    }
}

/// Build a session factory from a mapping file, optional properties and
/// an optional dialect override.
pub fn load_factory(
    mapping: &Path,
    properties: Option<&Path>,
    dialect: Option<&str>,
) -> Result<SessionFactory, CliError> {
    let catalog = Catalog::new(MappingDocument::from_path(mapping)?)?;
    let mut settings = match properties {
        Some(path) => Settings::from_path(path)?,
        None => Settings::default(),
    };
    if let Some(dialect) = dialect {
        settings = settings.with_dialect(dialect.parse::<DialectKind>()?);
    }
    info!(mapping = %mapping.display(), dialect = %settings.dialect, "loading mapping");
    Ok(SessionFactory::new(catalog, settings)?)
}

pub fn split(factory: &SessionFactory, query: &str) -> Result<Report, CliError> {
    Ok(Report::Split {
        queries: factory.concrete_queries(query)?,
    })
}

pub fn translate(factory: &SessionFactory, query: &str, shallow: bool) -> Result<Report, CliError> {
    let plan = factory.hql_query_plan(query, shallow)?;
    Ok(Report::Translation(Translation::from_plan(&plan, None)))
}

pub fn filter(factory: &SessionFactory, filter: &str, role: &str, shallow: bool) -> Result<Report, CliError> {
    let plan = factory.filter_query_plan(filter, role, shallow)?;
    Ok(Report::Translation(Translation::from_plan(
        plan.plan(),
        Some(plan.collection_role()),
    )))
}

pub fn ddl(factory: &SessionFactory) -> Result<Report, CliError> {
    Ok(Report::Ddl(factory.generator_ddl()?))
}

/// Parse without a mapping; errors point at the offending token.
pub fn parse(query: &str) -> Result<Report, CliError> {
    let statement = hql_lang::parse(query).map_err(|e| CliError::Parse(e.format_with_source(query)))?;
    Ok(Report::Parsed {
        ast: format!("{:#?}", statement),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hql_core::{CollectionDef, ElementDef, EntityDef, IdentifierDef, JavaType, PropertyDef};
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn mapping_file() -> NamedTempFile {
        let document = MappingDocument::new()
            .with_entity(
                EntityDef::new("Dog", "dogs")
                    .with_identifier(
                        IdentifierDef::new("id", "id", JavaType::Long)
                            .with_generator("sequence", vec![("sequence", "dog_seq")]),
                    )
                    .with_property(PropertyDef::new("name", "name", JavaType::String)),
            )
            .with_entity(
                EntityDef::new("Kennel", "kennels").with_identifier(IdentifierDef::new("id", "id", JavaType::Long)),
            )
            .with_collection(CollectionDef::new("Kennel.dogs", "dogs", "kennel_id", ElementDef::entity("Dog")));
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(document.to_json().unwrap().as_bytes()).unwrap();
        file
    }

    fn properties_file(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_translate_from_files() {
        let mapping = mapping_file();
        let factory = load_factory(mapping.path(), None, None).unwrap();
        let Report::Translation(translation) = translate(&factory, "select d.name from Dog d", false).unwrap() else {
            panic!("expected a translation");
        };
        assert_eq!(
            translation.sql,
            vec!["select dog0_.name as col_0_0_ from dogs dog0_".to_string()]
        );
        assert_eq!(translation.query_spaces, vec!["dogs".to_string()]);
        assert!(!translation.manipulation);
    }

    #[test]
    fn test_filter_reports_role() {
        let mapping = mapping_file();
        let factory = load_factory(mapping.path(), None, None).unwrap();
        let Report::Translation(translation) = filter(&factory, "where this.name = :n", "Kennel.dogs", true).unwrap()
        else {
            panic!("expected a translation");
        };
        assert_eq!(translation.collection_role.as_deref(), Some("Kennel.dogs"));
        assert_eq!(translation.named_parameters, vec!["n".to_string()]);
    }

    #[test]
    fn test_properties_select_dialect() {
        let mapping = mapping_file();
        let properties = properties_file("hibernate.dialect=mysql\n");
        let err = load_factory(mapping.path(), Some(properties.path()), None).unwrap_err();
        assert!(matches!(err, CliError::Core(hql_core::Error::Mapping(_))));

        // an explicit dialect wins over the properties file
        let factory = load_factory(mapping.path(), Some(properties.path()), Some("postgresql")).unwrap();
        let Report::Ddl(ddl) = ddl(&factory).unwrap() else {
            panic!("expected ddl");
        };
        assert_eq!(
            ddl.create,
            vec!["create sequence dog_seq start with 1 increment by 1".to_string()]
        );
    }

    #[test]
    fn test_missing_mapping_file() {
        let err = load_factory(Path::new("/nonexistent/mapping.json"), None, None).unwrap_err();
        assert!(err.to_string().contains("could not read mapping"));
    }

    #[test]
    fn test_parse_error_points_at_source() {
        let err = parse("from Dog d where").unwrap_err();
        let CliError::Parse(message) = err else {
            panic!("expected a parse error");
        };
        assert!(message.starts_with("error: "));
        assert!(message.contains("line 1:"));
    }
}
