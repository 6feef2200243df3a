use crate::document::DocumentValue;
use crate::error::{FrontschemaError, Result};
use crate::property_path::PropertyPath;
use std::fmt;

pub const X_TEMPLATE: &str = "x-template";
pub const X_TEMPLATE_ITEMS: &str = "x-template-items";
pub const X_FRONTMATTER_PART: &str = "x-frontmatter-part";
pub const X_DERIVED_FROM: &str = "x-derived-from";
pub const X_DERIVED_UNIQUE: &str = "x-derived-unique";
pub const X_EXTRACT_FROM: &str = "x-extract-from";
pub const X_FLATTEN_ARRAYS: &str = "x-flatten-arrays";
pub const X_JMESPATH_FILTER: &str = "x-jmespath-filter";

/// Declared JSON Schema `type` of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Null,
}

impl SchemaType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "string" => Some(SchemaType::String),
            "number" => Some(SchemaType::Number),
            "integer" => Some(SchemaType::Integer),
            "boolean" => Some(SchemaType::Boolean),
            "array" => Some(SchemaType::Array),
            "object" => Some(SchemaType::Object),
            "null" => Some(SchemaType::Null),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SchemaType::String => "string",
            SchemaType::Number => "number",
            SchemaType::Integer => "integer",
            SchemaType::Boolean => "boolean",
            SchemaType::Array => "array",
            SchemaType::Object => "object",
            SchemaType::Null => "null",
        }
    }

    /// Whether `value` is an instance of this type.
    pub fn matches(self, value: &DocumentValue) -> bool {
        match self {
            SchemaType::String => value.is_string(),
            SchemaType::Number => value.is_number(),
            SchemaType::Integer => value.is_i64() || value.is_u64(),
            SchemaType::Boolean => value.is_boolean(),
            SchemaType::Array => value.is_array(),
            SchemaType::Object => value.is_object(),
            SchemaType::Null => value.is_null(),
        }
    }

    /// Read the `type` keyword of a schema node. A list of types (`["string", "null"]`)
    /// yields its first recognized entry.
    pub fn of_node(node: &DocumentValue) -> Option<Self> {
        match node.get("type")? {
            DocumentValue::String(s) => SchemaType::parse(s),
            DocumentValue::Array(types) => types
                .iter()
                .filter_map(|t| t.as_str())
                .find_map(SchemaType::parse),
            _ => None,
        }
    }
}

/// A processing directive attached to a schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    TemplateRef(String),
    TemplateItemsRef(String),
    FrontmatterPart,
    DerivedFrom { source: PropertyPath, unique: bool },
    /// Copy the value at `source` into the field this node describes.
    ExtractFrom { source: PropertyPath },
    /// Flatten one level of nested lists. With a source, the flattened
    /// extraction of that path replaces the node's value.
    FlattenArrays { source: Option<PropertyPath> },
    JmesPathFilter { expression: String },
}

impl Directive {
    pub fn keyword(&self) -> &'static str {
        match self {
            Directive::TemplateRef(_) => X_TEMPLATE,
            Directive::TemplateItemsRef(_) => X_TEMPLATE_ITEMS,
            Directive::FrontmatterPart => X_FRONTMATTER_PART,
            Directive::DerivedFrom { .. } => X_DERIVED_FROM,
            Directive::ExtractFrom { .. } => X_EXTRACT_FROM,
            Directive::FlattenArrays { .. } => X_FLATTEN_ARRAYS,
            Directive::JmesPathFilter { .. } => X_JMESPATH_FILTER,
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::TemplateRef(p) | Directive::TemplateItemsRef(p) => {
                write!(f, "{}: {p}", self.keyword())
            }
            Directive::FrontmatterPart => write!(f, "{}", self.keyword()),
            Directive::DerivedFrom { source, unique } => {
                write!(f, "{}: {source}", self.keyword())?;
                if *unique {
                    write!(f, " (unique)")?;
                }
                Ok(())
            }
            Directive::ExtractFrom { source } => write!(f, "{}: {source}", self.keyword()),
            Directive::FlattenArrays { source: Some(source) } => {
                write!(f, "{}: {source}", self.keyword())
            }
            Directive::FlattenArrays { source: None } => write!(f, "{}", self.keyword()),
            Directive::JmesPathFilter { expression } => {
                write!(f, "{}: {expression}", self.keyword())
            }
        }
    }
}

/// Where a node's directives are evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveScope {
    /// Inside the frontmatter-part items: evaluated against each document,
    /// writing to `target` relative to the document.
    Document { target: PropertyPath },
    /// Evaluated once against the aggregate, writing to the node's own path.
    Aggregate,
}

/// A schema node carrying at least one directive.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveNode {
    /// Location in the data the node describes (`commands[].title`).
    pub path: PropertyPath,
    pub declared_type: Option<SchemaType>,
    pub directives: Vec<Directive>,
    pub scope: DirectiveScope,
}

impl DirectiveNode {
    pub fn is_document_scoped(&self) -> bool {
        matches!(self.scope, DirectiveScope::Document { .. })
    }
}

/// A fully resolved schema plus the directives collected from it in one pass.
#[derive(Debug, Clone)]
pub struct SchemaDefinition {
    root: DocumentValue,
    nodes: Vec<DirectiveNode>,
    frontmatter_part: Option<PropertyPath>,
}

impl SchemaDefinition {
    /// Walk a resolved schema value, collecting and type-checking directives.
    pub fn from_value(root: DocumentValue) -> Result<Self> {
        if !root.is_object() {
            return Err(FrontschemaError::InvalidFormat(
                "schema root must be a mapping".into(),
            ));
        }

        let mut raw_nodes = Vec::new();
        collect_nodes(&root, PropertyPath::root(), &mut raw_nodes)?;

        let mut parts = raw_nodes
            .iter()
            .filter(|n| n.directives.contains(&Directive::FrontmatterPart));
        let frontmatter_part = match parts.next() {
            Some(node) => {
                check_frontmatter_part(node)?;
                Some(node.path.clone())
            }
            None => None,
        };
        for extra in parts {
            log::warn!(
                "Ignoring additional {X_FRONTMATTER_PART} at '{}'; using '{}'",
                extra.path,
                frontmatter_part.as_ref().map(|p| p.to_string()).unwrap_or_default()
            );
        }

        let item_prefix = frontmatter_part.as_ref().map(|p| p.expanded());
        let mut nodes = Vec::with_capacity(raw_nodes.len());
        for mut node in raw_nodes {
            node.scope = match item_prefix
                .as_ref()
                .and_then(|prefix| node.path.strip_prefix(prefix))
            {
                Some(target) => DirectiveScope::Document { target },
                None => DirectiveScope::Aggregate,
            };
            check_node(&node)?;
            nodes.push(node);
        }

        Ok(SchemaDefinition {
            root,
            nodes,
            frontmatter_part,
        })
    }

    pub fn root(&self) -> &DocumentValue {
        &self.root
    }

    pub fn directive_nodes(&self) -> &[DirectiveNode] {
        &self.nodes
    }

    /// Path of the array that receives one element per document.
    pub fn frontmatter_part(&self) -> Option<&PropertyPath> {
        self.frontmatter_part.as_ref()
    }

    pub fn template_ref(&self) -> Option<&str> {
        self.root.get(X_TEMPLATE).and_then(|v| v.as_str())
    }

    pub fn items_template_ref(&self) -> Option<&str> {
        self.root.get(X_TEMPLATE_ITEMS).and_then(|v| v.as_str())
    }

    /// The schema node describing the data at `path`, following
    /// `properties` for keys and `items` for expansions.
    pub fn node_at(&self, path: &PropertyPath) -> Option<&DocumentValue> {
        let mut node = &self.root;
        for segment in path.segments() {
            node = node.get("properties")?.get(segment.key())?;
            if segment.is_expand() {
                node = node.get("items")?;
            }
        }
        Some(node)
    }

    /// The schema each document's header is shaped and validated against.
    pub fn item_schema(&self) -> &DocumentValue {
        self.frontmatter_part
            .as_ref()
            .and_then(|part| self.node_at(&part.expanded()))
            .unwrap_or(&self.root)
    }

    /// Every `default` declared under nested `properties`, outside array items.
    pub fn defaults(&self) -> Vec<(PropertyPath, DocumentValue)> {
        let mut out = Vec::new();
        collect_defaults(&self.root, &PropertyPath::root(), &mut out);
        out
    }
}

fn collect_nodes(
    node: &DocumentValue,
    path: PropertyPath,
    out: &mut Vec<DirectiveNode>,
) -> Result<()> {
    let Some(map) = node.as_object() else {
        return Ok(());
    };

    let directives = parse_directives(node, &path)?;
    if !directives.is_empty() {
        out.push(DirectiveNode {
            path: path.clone(),
            declared_type: SchemaType::of_node(node),
            directives,
            scope: DirectiveScope::Aggregate,
        });
    }

    if let Some(properties) = map.get("properties").and_then(|p| p.as_object()) {
        for (key, child) in properties {
            collect_nodes(child, path.child(key), out)?;
        }
    }

    if !path.is_root() {
        if let Some(items) = map.get("items").filter(|i| i.is_object()) {
            collect_nodes(items, path.expanded(), out)?;
        }
    }

    Ok(())
}

fn parse_directives(node: &DocumentValue, path: &PropertyPath) -> Result<Vec<Directive>> {
    let mut directives = Vec::new();

    if let Some(v) = node.get(X_TEMPLATE) {
        directives.push(Directive::TemplateRef(expect_str(v, X_TEMPLATE, path)?.to_string()));
    }
    if let Some(v) = node.get(X_TEMPLATE_ITEMS) {
        directives.push(Directive::TemplateItemsRef(
            expect_str(v, X_TEMPLATE_ITEMS, path)?.to_string(),
        ));
    }
    if let Some(v) = node.get(X_FRONTMATTER_PART) {
        match v {
            DocumentValue::Bool(true) => directives.push(Directive::FrontmatterPart),
            DocumentValue::Bool(false) => {}
            other => return Err(directive_type_error(X_FRONTMATTER_PART, "boolean", other, path)),
        }
    }
    if let Some(v) = node.get(X_DERIVED_FROM) {
        let source = PropertyPath::parse(expect_str(v, X_DERIVED_FROM, path)?)?;
        let unique = match node.get(X_DERIVED_UNIQUE) {
            None => false,
            Some(DocumentValue::Bool(b)) => *b,
            Some(other) => {
                return Err(directive_type_error(X_DERIVED_UNIQUE, "boolean", other, path))
            }
        };
        directives.push(Directive::DerivedFrom { source, unique });
    }
    if let Some(v) = node.get(X_EXTRACT_FROM) {
        let source = PropertyPath::parse(expect_str(v, X_EXTRACT_FROM, path)?)?;
        directives.push(Directive::ExtractFrom { source });
    }
    if let Some(v) = node.get(X_FLATTEN_ARRAYS) {
        match v {
            DocumentValue::Bool(true) => directives.push(Directive::FlattenArrays { source: None }),
            DocumentValue::Bool(false) => {}
            DocumentValue::String(s) => directives.push(Directive::FlattenArrays {
                source: Some(PropertyPath::parse(s)?),
            }),
            other => {
                return Err(directive_type_error(
                    X_FLATTEN_ARRAYS,
                    "boolean or path string",
                    other,
                    path,
                ))
            }
        }
    }
    if let Some(v) = node.get(X_JMESPATH_FILTER) {
        let expression = expect_str(v, X_JMESPATH_FILTER, path)?;
        if expression.trim().is_empty() {
            return Err(FrontschemaError::InvalidFormat(format!(
                "{X_JMESPATH_FILTER} at '{path}' is empty"
            )));
        }
        directives.push(Directive::JmesPathFilter {
            expression: expression.to_string(),
        });
    }

    Ok(directives)
}

fn expect_str<'v>(value: &'v DocumentValue, keyword: &str, path: &PropertyPath) -> Result<&'v str> {
    value
        .as_str()
        .ok_or_else(|| directive_type_error(keyword, "string", value, path))
}

fn directive_type_error(
    keyword: &str,
    expected: &str,
    got: &DocumentValue,
    path: &PropertyPath,
) -> FrontschemaError {
    FrontschemaError::InvalidFormat(format!(
        "{keyword} at '{}' must be a {expected}, got {}",
        display_node(path),
        crate::document::type_name(got)
    ))
}

fn display_node(path: &PropertyPath) -> String {
    if path.is_root() {
        "<root>".to_string()
    } else {
        path.to_string()
    }
}

fn check_frontmatter_part(node: &DirectiveNode) -> Result<()> {
    if node.path.is_root() || !node.path.is_plain() {
        return Err(FrontschemaError::InvalidFormat(format!(
            "{X_FRONTMATTER_PART} at '{}' must be a property outside any array",
            display_node(&node.path)
        )));
    }
    require_array(node, X_FRONTMATTER_PART)
}

fn require_array(node: &DirectiveNode, keyword: &str) -> Result<()> {
    match node.declared_type {
        Some(SchemaType::Array) | None => Ok(()),
        Some(other) => Err(FrontschemaError::InvalidFormat(format!(
            "{keyword} at '{}' requires an array node, but the schema declares '{}'",
            display_node(&node.path),
            other.as_str()
        ))),
    }
}

/// Type-check the directives on one node against its declared type and scope.
fn check_node(node: &DirectiveNode) -> Result<()> {
    let target = match &node.scope {
        DirectiveScope::Document { target } => target,
        DirectiveScope::Aggregate => &node.path,
    };

    for directive in &node.directives {
        match directive {
            Directive::TemplateRef(_) | Directive::TemplateItemsRef(_) => {
                if !node.path.is_root() {
                    log::debug!(
                        "{} on non-root node '{}' has no effect",
                        directive.keyword(),
                        node.path
                    );
                }
            }
            Directive::FrontmatterPart => {}
            Directive::DerivedFrom { .. } | Directive::FlattenArrays { .. } => {
                require_array(node, directive.keyword())?;
                require_assignable(node, target, directive.keyword())?;
            }
            Directive::ExtractFrom { .. } => {
                require_assignable(node, target, directive.keyword())?;
            }
            Directive::JmesPathFilter { .. } => {
                if node.is_document_scoped() {
                    return Err(FrontschemaError::InvalidFormat(format!(
                        "{X_JMESPATH_FILTER} at '{}' must sit outside the {X_FRONTMATTER_PART} items",
                        node.path
                    )));
                }
                if !node.path.is_plain() {
                    return Err(FrontschemaError::InvalidFormat(format!(
                        "{X_JMESPATH_FILTER} at '{}' cannot sit inside an array",
                        node.path
                    )));
                }
            }
        }
    }
    Ok(())
}

fn require_assignable(node: &DirectiveNode, target: &PropertyPath, keyword: &str) -> Result<()> {
    if target.is_root() || !target.is_plain() {
        return Err(FrontschemaError::InvalidFormat(format!(
            "{keyword} at '{}' does not name an assignable field",
            display_node(&node.path)
        )));
    }
    Ok(())
}

fn collect_defaults(
    node: &DocumentValue,
    path: &PropertyPath,
    out: &mut Vec<(PropertyPath, DocumentValue)>,
) {
    let Some(properties) = node.get("properties").and_then(|p| p.as_object()) else {
        return;
    };
    for (key, child) in properties {
        let child_path = path.child(key);
        if let Some(default) = child.get("default") {
            out.push((child_path.clone(), default.clone()));
        }
        collect_defaults(child, &child_path, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry_schema() -> DocumentValue {
        json!({
            "type": "object",
            "x-template": "registry_template.json",
            "x-template-items": "command_template.json",
            "properties": {
                "version": { "type": "string", "default": "1.0.0" },
                "tools": {
                    "type": "object",
                    "properties": {
                        "availableConfigs": {
                            "type": "array",
                            "x-derived-from": "commands[].c1",
                            "x-derived-unique": true,
                            "items": { "type": "string" }
                        },
                        "commands": {
                            "type": "array",
                            "x-frontmatter-part": true,
                            "items": {
                                "type": "object",
                                "required": ["c1"],
                                "properties": {
                                    "c1": { "type": "string" },
                                    "title": { "type": "string", "x-extract-from": "meta.title" }
                                }
                            }
                        }
                    }
                },
                "unknown": { "type": "string", "x-not-a-directive": 1 }
            }
        })
    }

    #[test]
    fn test_collects_directives_in_one_pass() {
        let schema = SchemaDefinition::from_value(registry_schema()).unwrap();
        let nodes = schema.directive_nodes();
        assert_eq!(nodes.len(), 4);

        assert!(nodes[0].path.is_root());
        assert_eq!(
            nodes[0].directives,
            vec![
                Directive::TemplateRef("registry_template.json".into()),
                Directive::TemplateItemsRef("command_template.json".into()),
            ]
        );

        assert_eq!(nodes[1].path.to_string(), "tools.availableConfigs");
        assert_eq!(
            nodes[1].directives,
            vec![Directive::DerivedFrom {
                source: PropertyPath::parse("commands[].c1").unwrap(),
                unique: true,
            }]
        );
        assert_eq!(nodes[1].scope, DirectiveScope::Aggregate);

        assert_eq!(nodes[2].path.to_string(), "tools.commands");
        assert_eq!(nodes[2].directives, vec![Directive::FrontmatterPart]);

        assert_eq!(nodes[3].path.to_string(), "tools.commands[].title");
        assert_eq!(
            nodes[3].scope,
            DirectiveScope::Document {
                target: PropertyPath::parse("title").unwrap()
            }
        );
    }

    #[test]
    fn test_frontmatter_part_and_template_refs() {
        let schema = SchemaDefinition::from_value(registry_schema()).unwrap();
        assert_eq!(schema.frontmatter_part().unwrap().to_string(), "tools.commands");
        assert_eq!(schema.template_ref(), Some("registry_template.json"));
        assert_eq!(schema.items_template_ref(), Some("command_template.json"));
        assert_eq!(schema.item_schema()["required"], json!(["c1"]));
    }

    #[test]
    fn test_item_schema_defaults_to_root() {
        let schema = SchemaDefinition::from_value(json!({
            "type": "object",
            "properties": { "id": { "type": "string" } }
        }))
        .unwrap();
        assert!(schema.frontmatter_part().is_none());
        assert_eq!(schema.item_schema(), schema.root());
    }

    #[test]
    fn test_defaults_skip_array_items() {
        let schema = SchemaDefinition::from_value(json!({
            "properties": {
                "version": { "default": "1.0.0" },
                "meta": { "properties": { "license": { "default": "MIT" } } },
                "list": { "type": "array", "items": { "properties": { "x": { "default": 1 } } } }
            }
        }))
        .unwrap();
        let defaults: Vec<(String, DocumentValue)> = schema
            .defaults()
            .into_iter()
            .map(|(p, v)| (p.to_string(), v))
            .collect();
        assert_eq!(
            defaults,
            vec![
                ("version".to_string(), json!("1.0.0")),
                ("meta.license".to_string(), json!("MIT")),
            ]
        );
    }

    #[test]
    fn test_derived_from_on_non_array_is_invalid() {
        let err = SchemaDefinition::from_value(json!({
            "properties": {
                "names": { "type": "string", "x-derived-from": "items[].name" }
            }
        }))
        .unwrap_err();
        assert!(matches!(err, FrontschemaError::InvalidFormat(ref m) if m.contains("names")));
    }

    #[test]
    fn test_frontmatter_part_on_object_is_invalid() {
        let err = SchemaDefinition::from_value(json!({
            "properties": { "docs": { "type": "object", "x-frontmatter-part": true } }
        }))
        .unwrap_err();
        assert!(matches!(err, FrontschemaError::InvalidFormat(_)));
    }

    #[test]
    fn test_filter_inside_items_is_invalid() {
        let err = SchemaDefinition::from_value(json!({
            "properties": {
                "docs": {
                    "type": "array",
                    "x-frontmatter-part": true,
                    "items": {
                        "properties": {
                            "f": { "type": "array", "x-jmespath-filter": "[?a]" }
                        }
                    }
                }
            }
        }))
        .unwrap_err();
        assert!(matches!(err, FrontschemaError::InvalidFormat(_)));
    }

    #[test]
    fn test_directive_value_types_are_checked() {
        let err = SchemaDefinition::from_value(json!({
            "properties": { "a": { "type": "array", "x-derived-from": 42 } }
        }))
        .unwrap_err();
        assert!(matches!(err, FrontschemaError::InvalidFormat(_)));

        let err = SchemaDefinition::from_value(json!({
            "properties": { "a": { "type": "array", "x-derived-from": "bad..path" } }
        }))
        .unwrap_err();
        assert!(matches!(err, FrontschemaError::InvalidPath { .. }));
    }

    #[test]
    fn test_false_flags_are_ignored() {
        let schema = SchemaDefinition::from_value(json!({
            "properties": {
                "a": { "type": "array", "x-frontmatter-part": false, "x-flatten-arrays": false }
            }
        }))
        .unwrap();
        assert!(schema.directive_nodes().is_empty());
        assert!(schema.frontmatter_part().is_none());
    }

    #[test]
    fn test_node_at() {
        let schema = SchemaDefinition::from_value(registry_schema()).unwrap();
        let node = schema
            .node_at(&PropertyPath::parse("tools.commands[].title").unwrap())
            .unwrap();
        assert_eq!(node["x-extract-from"], json!("meta.title"));
        assert!(schema
            .node_at(&PropertyPath::parse("tools.missing").unwrap())
            .is_none());
    }

    #[test]
    fn test_schema_type_matches() {
        assert!(SchemaType::Integer.matches(&json!(3)));
        assert!(!SchemaType::Integer.matches(&json!(3.5)));
        assert!(SchemaType::Number.matches(&json!(3.5)));
        assert_eq!(
            SchemaType::of_node(&json!({ "type": ["null", "string"] })),
            Some(SchemaType::Null)
        );
    }
}
