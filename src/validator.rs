//! Structural validation of generated OpenAPI fragments.
//!
//! A fragment documents one controller, so it usually lacks the document header
//! and may carry its schemas at the top level instead of under `components`.
//! Both are normalised before the document is handed to [`openapiv3`].

use crate::error::{Error, Result};
use log::debug;
use openapiv3::OpenAPI;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;

const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// Parses and validates `yaml` as an OpenAPI 3.0 fragment.
///
/// # Errors
///
/// Returns [`Error::InvalidFragment`] when the text is not YAML, is not a mapping,
/// does not deserialize as an OpenAPI 3.0 document after normalisation, or
/// references a schema it does not define.
pub fn validate_fragment(yaml: &str) -> Result<OpenAPI> {
    let value: Value = serde_yaml::from_str(yaml)
        .map_err(|e| Error::invalid_fragment(format!("not valid YAML: {}", e)))?;

    let Value::Mapping(mapping) = value else {
        return Err(Error::invalid_fragment("top level is not a mapping"));
    };

    let normalized = Value::Mapping(normalize(mapping));

    let defined = defined_schemas(&normalized);
    let mut dangling = BTreeSet::new();
    collect_refs(&normalized, &mut |reference| {
        if let Some(name) = reference.strip_prefix(SCHEMA_REF_PREFIX) {
            if !defined.contains(name) {
                dangling.insert(name.to_string());
            }
        }
    });
    if !dangling.is_empty() {
        let names: Vec<String> = dangling.into_iter().collect();
        return Err(Error::invalid_fragment(format!(
            "unresolved schema reference(s): {}",
            names.join(", ")
        )));
    }

    let document: OpenAPI = serde_yaml::from_value(normalized)
        .map_err(|e| Error::invalid_fragment(format!("not an OpenAPI 3.0 document: {}", e)))?;

    debug!(
        "Fragment valid: {} path(s), {} schema(s)",
        document.paths.paths.len(),
        document
            .components
            .as_ref()
            .map(|c| c.schemas.len())
            .unwrap_or(0)
    );
    Ok(document)
}

/// Fills in the document header and moves top-level `schemas` under `components`.
fn normalize(mut mapping: Mapping) -> Mapping {
    if let Some(Value::Mapping(schemas)) = mapping.remove("schemas") {
        let components = mapping
            .entry(Value::from("components"))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        if let Value::Mapping(components) = components {
            let target = components
                .entry(Value::from("schemas"))
                .or_insert_with(|| Value::Mapping(Mapping::new()));
            if let Value::Mapping(target) = target {
                for (name, schema) in schemas {
                    if !target.contains_key(&name) {
                        target.insert(name, schema);
                    }
                }
            }
        }
    }

    if !mapping.contains_key("openapi") {
        mapping.insert(Value::from("openapi"), Value::from("3.0.3"));
    }
    if !mapping.contains_key("info") {
        let mut info = Mapping::new();
        info.insert(Value::from("title"), Value::from("fragment"));
        info.insert(Value::from("version"), Value::from("0.0.0"));
        mapping.insert(Value::from("info"), Value::Mapping(info));
    }
    if !mapping.contains_key("paths") {
        mapping.insert(Value::from("paths"), Value::Mapping(Mapping::new()));
    }

    mapping
}

fn defined_schemas(document: &Value) -> BTreeSet<String> {
    document
        .get("components")
        .and_then(|c| c.get("schemas"))
        .and_then(Value::as_mapping)
        .map(|schemas| {
            schemas
                .keys()
                .filter_map(|k| k.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn collect_refs(value: &Value, visit: &mut dyn FnMut(&str)) {
    match value {
        Value::Mapping(mapping) => {
            for (key, child) in mapping {
                if key.as_str() == Some("$ref") {
                    if let Some(reference) = child.as_str() {
                        visit(reference);
                    }
                }
                collect_refs(child, visit);
            }
        }
        Value::Sequence(items) => {
            for item in items {
                collect_refs(item, visit);
            }
        }
        Value::Tagged(tagged) => collect_refs(&tagged.value, visit),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER_FRAGMENT: &str = r#"paths:
  /api/orders:
    get:
      tags:
        - Order
      summary: List orders
      operationId: listOrders
      responses:
        '200':
          description: |
            Orders
          content:
            application/json:
              schema:
                type: array
                items:
                  $ref: '#/components/schemas/OrderSummary'
schemas:
  OrderStatus:
    type: string
    enum:
      - OPEN
      - CLOSED
  OrderSummary:
    type: object
    properties:
      id:
        type: integer
        format: int64
      status:
        $ref: '#/components/schemas/OrderStatus'
"#;

    #[test]
    fn test_fragment_with_top_level_schemas_is_valid() {
        let document = validate_fragment(ORDER_FRAGMENT).unwrap();
        assert_eq!(document.openapi, "3.0.3");
        assert!(document.paths.paths.contains_key("/api/orders"));
        let components = document.components.unwrap();
        assert!(components.schemas.contains_key("OrderSummary"));
        assert!(components.schemas.contains_key("OrderStatus"));
    }

    #[test]
    fn test_full_document_is_valid() {
        let yaml = "openapi: 3.0.3\ninfo:\n  title: Users\n  version: 1.0.0\npaths: {}\n";
        let document = validate_fragment(yaml).unwrap();
        assert_eq!(document.info.title, "Users");
    }

    #[test]
    fn test_schema_only_fragment_is_valid() {
        let yaml = "components:\n  schemas:\n    Money:\n      type: number\n";
        assert!(validate_fragment(yaml).is_ok());
    }

    #[test]
    fn test_broken_yaml_is_invalid() {
        let err = validate_fragment("paths:\n  /x:\n    get: [unclosed\n").unwrap_err();
        assert!(err.is_invalid_fragment());
    }

    #[test]
    fn test_non_mapping_is_invalid() {
        let err = validate_fragment("- just\n- a list\n").unwrap_err();
        assert!(err.is_invalid_fragment());
        assert!(err.to_string().contains("mapping"));
    }

    #[test]
    fn test_prose_is_invalid() {
        let err = validate_fragment("Here is the generated YAML for your controller.").unwrap_err();
        assert!(err.is_invalid_fragment());
    }

    #[test]
    fn test_dangling_reference_is_invalid() {
        let yaml = r#"paths:
  /users:
    get:
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/User'
"#;
        let err = validate_fragment(yaml).unwrap_err();
        assert!(err.is_invalid_fragment());
        assert!(err.to_string().contains("User"));
    }
}
