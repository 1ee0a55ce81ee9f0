//! Implicit polymorphism: expanding a query over an interface or abstract
//! class into one query per concrete mapped implementor.
//!
//! The scan is textual. A token is treated as a class name when it follows
//! `class`, or follows `from`, `delete`, `update` or `,` and is not followed
//! by `in`, `from` or `)`. Tokens inside the `select` clause are never
//! rewritten, so `select new Foo(...)` is left alone.

use crate::error::Result;
use hql_lang::tokenizer::{self, CLASS_NAME_DELIMITERS};
use tracing::warn;

/// The two capabilities the splitter needs from a session factory.
pub trait ImplementorSource {
    /// The class an import name refers to, or `None` if it names no class.
    fn imported_class_name(&self, name: &str) -> Result<Option<String>>;

    /// Concrete mapped classes to query for `class_name`.
    fn implementors(&self, class_name: &str) -> Result<Vec<String>>;
}

const BEFORE_CLASS_TOKENS: [&str; 4] = ["from", "delete", "update", ","];
const NOT_AFTER_CLASS_TOKENS: [&str; 3] = ["in", "from", ")"];

fn is_possibly_class_name(last: Option<&str>, next: Option<&str>) -> bool {
    match last {
        Some("class") => true,
        Some(last) => {
            BEFORE_CLASS_TOKENS.contains(&last)
                && !next.is_some_and(|next| NOT_AFTER_CLASS_TOKENS.contains(&next))
        }
        None => false,
    }
}

/// Expand `query` into concrete queries, in implementor order.
///
/// Each polymorphic reference becomes a `$clazzN$` placeholder; the result
/// is the product of all placeholder substitutions. A query that names no
/// polymorphic class comes back unchanged; a reference with no persistent
/// implementors yields no queries at all.
pub fn concrete_queries(query: &str, source: &dyn ImplementorSource) -> Result<Vec<String>> {
    let tokens = tokenizer::split(CLASS_NAME_DELIMITERS, query);
    let Some(first) = tokens.first() else {
        return Ok(vec![query.to_string()]);
    };

    let mut placeholders = Vec::new();
    let mut replacements = Vec::new();
    let mut template = String::with_capacity(query.len());
    template.push_str(first);

    let mut in_select = first.eq_ignore_ascii_case("select");
    let mut last: Option<String> = None;
    let mut next: Option<String> = None;
    let mut next_index = 0;
    let mut count = 0;

    for i in 1..tokens.len() {
        if !tokenizer::is_whitespace(tokens[i - 1]) {
            last = Some(tokens[i - 1].to_lowercase());
        }
        if tokens[i].eq_ignore_ascii_case("from") {
            in_select = false;
        }

        let token = tokens[i];
        if tokenizer::is_whitespace(token) && last.is_some() {
            template.push_str(token);
            continue;
        }

        if next_index <= i {
            next_index = i + 1;
            while next_index < tokens.len() {
                let candidate = tokens[next_index].to_lowercase();
                let is_white = tokenizer::is_whitespace(&candidate);
                next = Some(candidate);
                if !is_white {
                    break;
                }
                next_index += 1;
            }
        }

        let process = !in_select
            && tokenizer::is_identifier_start(token)
            && is_possibly_class_name(last.as_deref(), next.as_deref());
        if process {
            if let Some(class_name) = source.imported_class_name(token)? {
                let implementors = source.implementors(&class_name)?;
                let placeholder = format!("$clazz{}$", count);
                count += 1;
                template.push_str(&placeholder);
                placeholders.push(placeholder);
                replacements.push(implementors);
                continue;
            }
        }
        template.push_str(token);
    }

    let results = multiply(&template, &placeholders, &replacements);
    if results.is_empty() {
        warn!(query = %query, "no persistent classes found for query class");
    }
    Ok(results)
}

/// Substitute every placeholder with each of its replacements, one
/// placeholder at a time.
fn multiply(template: &str, placeholders: &[String], replacements: &[Vec<String>]) -> Vec<String> {
    let mut results = vec![template.to_string()];
    for (placeholder, values) in placeholders.iter().zip(replacements) {
        let mut expanded = Vec::with_capacity(values.len() * results.len());
        for value in values {
            for s in &results {
                expanded.push(s.replacen(placeholder.as_str(), value, 1));
            }
        }
        results = expanded;
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    struct Zoo(HashMap<&'static str, Vec<&'static str>>);

    impl Zoo {
        fn new() -> Self {
            let mut map = HashMap::new();
            map.insert("Animal", vec!["Dog", "Cat"]);
            map.insert("Dog", vec!["Dog"]);
            map.insert("Cat", vec!["Cat"]);
            map.insert("Owner", vec!["Person", "Company"]);
            map.insert("Ghost", vec![]);
            Self(map)
        }
    }

    impl ImplementorSource for Zoo {
        fn imported_class_name(&self, name: &str) -> Result<Option<String>> {
            Ok(self.0.contains_key(name).then(|| name.to_string()))
        }

        fn implementors(&self, class_name: &str) -> Result<Vec<String>> {
            Ok(self.0[class_name].iter().map(|s| s.to_string()).collect())
        }
    }

    #[test]
    fn test_class_name_heuristic() {
        assert!(is_possibly_class_name(Some("from"), Some("a")));
        assert!(is_possibly_class_name(Some("from"), None));
        assert!(is_possibly_class_name(Some("class"), Some("in")));
        assert!(!is_possibly_class_name(Some("from"), Some("in")));
        assert!(!is_possibly_class_name(Some(","), Some(")")));
        assert!(!is_possibly_class_name(Some("where"), Some("a")));
        assert!(!is_possibly_class_name(None, None));
    }

    #[test]
    fn test_expands_placeholders_in_order() {
        let queries = concrete_queries("from Animal a, Owner o", &Zoo::new()).unwrap();
        assert_eq!(
            queries,
            vec![
                "from Dog a, Person o",
                "from Cat a, Person o",
                "from Dog a, Company o",
                "from Cat a, Company o",
            ]
        );
    }

    #[test]
    fn test_select_clause_is_untouched() {
        let queries = concrete_queries("select new Dog(a.name) from Animal a", &Zoo::new()).unwrap();
        assert_eq!(
            queries,
            vec![
                "select new Dog(a.name) from Dog a",
                "select new Dog(a.name) from Cat a",
            ]
        );
    }

    #[test]
    fn test_ignores_aliases_and_collection_ranges() {
        let zoo = Zoo::new();
        assert_eq!(
            concrete_queries("from Dog d where d.name = 'Animal'", &zoo).unwrap(),
            vec!["from Dog d where d.name = 'Animal'"]
        );
        assert_eq!(
            concrete_queries("select d from Dog d, Animal in elements(d.friends)", &zoo).unwrap(),
            vec!["select d from Dog d, Animal in elements(d.friends)"]
        );
    }

    #[test]
    fn test_no_implementors_means_no_queries() {
        assert!(concrete_queries("from Ghost", &Zoo::new()).unwrap().is_empty());
    }

    #[test]
    fn test_empty_query() {
        assert_eq!(concrete_queries("", &Zoo::new()).unwrap(), vec![String::new()]);
    }
}
