use super::output::serialize;
use super::resolver::TemplateVariableResolver;
use super::{TemplateContent, TemplateDefinition};
use crate::document::DocumentValue;
use crate::error::Result;
use crate::io::DataFormat;
use std::path::Path;

/// Resolves a whole template against the final data and serializes it.
/// Nothing is emitted unless every placeholder resolves.
pub struct TemplateRenderer<'t> {
    resolver: TemplateVariableResolver<'t>,
}

impl<'t> TemplateRenderer<'t> {
    pub fn new(resolver: TemplateVariableResolver<'t>) -> Self {
        TemplateRenderer { resolver }
    }

    /// Structured templates are serialized in `format`; text templates are
    /// emitted as substituted.
    pub fn render(
        &self,
        template: &TemplateDefinition,
        data: &DocumentValue,
        format: DataFormat,
    ) -> Result<String> {
        match template.content() {
            TemplateContent::Structured(value) => {
                let resolved = self.resolver.resolve_value(value, data)?;
                serialize(&resolved, format)
            }
            TemplateContent::Text(text) => self.resolver.resolve_text(text, data),
        }
    }
}

/// Output format: explicit choice, then the output file's extension, then
/// the template's own format.
pub fn select_output_format(
    explicit: Option<DataFormat>,
    output: &Path,
    template: &TemplateDefinition,
) -> DataFormat {
    explicit
        .or_else(|| DataFormat::from_extension(output))
        .unwrap_or_else(|| template.format())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FrontschemaError;
    use crate::io::SerdeDecoder;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn renderer() -> TemplateRenderer<'static> {
        TemplateRenderer::new(TemplateVariableResolver::new().unwrap())
    }

    fn json_template(text: &str) -> TemplateDefinition {
        TemplateDefinition::parse(text, DataFormat::Json, &SerdeDecoder).unwrap()
    }

    #[test]
    fn test_render_text_template() {
        let template =
            TemplateDefinition::parse("{id.full}", DataFormat::Text, &SerdeDecoder).unwrap();
        let data = json!({ "id": { "full": "REQ-001" } });
        assert_eq!(renderer().render(&template, &data, DataFormat::Text).unwrap(), "REQ-001");
    }

    #[test]
    fn test_render_expansion_as_json() {
        let template = json_template(r#"{"vals":["{@items}"]}"#);
        let data = json!({ "items": [{ "v": 1 }, { "v": 2 }] });
        let rendered = renderer().render(&template, &data, DataFormat::Json).unwrap();
        let reparsed: DocumentValue = serde_json::from_str(&rendered).unwrap();
        assert_eq!(reparsed, json!({ "vals": [{ "v": 1 }, { "v": 2 }] }));
    }

    #[test]
    fn test_render_json_template_as_yaml() {
        let template = json_template(r#"{ "version": "{version}", "count": "{n}" }"#);
        let data = json!({ "version": "1.2.0", "n": 2 });
        assert_eq!(
            renderer().render(&template, &data, DataFormat::Yaml).unwrap(),
            "version: 1.2.0\ncount: 2\n"
        );
    }

    #[test]
    fn test_render_aborts_on_missing_variable() {
        let template = json_template(r#"{ "ok": "{a}", "missing": "{b}" }"#);
        let err = renderer()
            .render(&template, &json!({ "a": 1 }), DataFormat::Json)
            .unwrap_err();
        assert!(matches!(
            err,
            FrontschemaError::VariableNotFound { ref variable } if variable == "b"
        ));
    }

    #[test]
    fn test_select_output_format() {
        let template = json_template("{}");
        assert_eq!(
            select_output_format(Some(DataFormat::Xml), Path::new("out.json"), &template),
            DataFormat::Xml
        );
        assert_eq!(
            select_output_format(None, Path::new("out.yml"), &template),
            DataFormat::Yaml
        );
        assert_eq!(
            select_output_format(None, Path::new("out"), &template),
            DataFormat::Json
        );
    }
}
