//! File I/O for constraint models

use super::types::*;
use anyhow::{Context, Result};
use std::path::Path;

/// Serialization format, picked from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Yaml,
    Json,
}

impl ModelFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Ok(ModelFormat::Yaml),
            Some("json") => Ok(ModelFormat::Json),
            _ => anyhow::bail!(
                "Unsupported model file extension: {} (expected .yaml, .yml or .json)",
                path.display()
            ),
        }
    }
}

/// Load a model from a YAML or JSON file
pub fn load_model_from_file<P: AsRef<Path>>(path: P) -> Result<CspModel> {
    let path = path.as_ref();
    let format = ModelFormat::from_path(path)?;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read model file: {}", path.display()))?;

    parse_model(&content, format)
        .with_context(|| format!("Failed to parse model from file: {}", path.display()))
}

/// Parse a model from its textual representation
pub fn parse_model(content: &str, format: ModelFormat) -> Result<CspModel> {
    let model = match format {
        ModelFormat::Yaml => serde_yaml::from_str(content).context("Invalid YAML model")?,
        ModelFormat::Json => serde_json::from_str(content).context("Invalid JSON model")?,
    };
    Ok(model)
}

/// Save a model, choosing the format from the file extension
pub fn save_model_to_file<P: AsRef<Path>>(model: &CspModel, path: P) -> Result<()> {
    let path = path.as_ref();
    let content = match ModelFormat::from_path(path)? {
        ModelFormat::Yaml => serde_yaml::to_string(model).context("Failed to serialize model")?,
        ModelFormat::Json => serde_json::to_string_pretty(model).context("Failed to serialize model")?,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write model file: {}", path.display()))?;

    Ok(())
}

/// Built-in example models, keyed by file stem
pub fn example_models() -> Vec<(&'static str, CspModel)> {
    let small = DomainExpression::Range { from: 1, to: 3 };

    let less_than = CspModel::new("less_than")
        .with_variable("X", small.clone())
        .with_variable("Y", small.clone())
        .with_constraint(ModelConstraint::Expression(relation(
            ExpressionSide::operand(Operand::variable("X")),
            RelationalOperator::Less,
            ExpressionSide::operand(Operand::variable("Y")),
        )));

    let offset = CspModel::new("offset")
        .with_variable("X", small.clone())
        .with_variable("Y", DomainExpression::Range { from: 3, to: 5 })
        .with_constraint(ModelConstraint::Expression(relation(
            ExpressionSide::with_infix(Operand::variable("X"), ArithmeticOperator::Add, 2),
            RelationalOperator::Equal,
            ExpressionSide::operand(Operand::variable("Y")),
        )));

    let colouring = CspModel::new("map_colouring")
        .with_shared_domain(
            "colours",
            DomainExpression::List(vec![
                DomainValue::Text("red".into()),
                DomainValue::Text("green".into()),
                DomainValue::Text("blue".into()),
            ]),
        )
        .with_variable("wa", DomainExpression::Shared("colours".into()))
        .with_variable("nt", DomainExpression::Shared("colours".into()))
        .with_variable("sa", DomainExpression::Shared("colours".into()))
        .with_variable("q", DomainExpression::Shared("colours".into()))
        .with_constraint(ModelConstraint::AllDifferent(vec!["wa".into(), "nt".into(), "sa".into()]))
        .with_constraint(ModelConstraint::AllDifferent(vec!["nt".into(), "sa".into(), "q".into()]));

    let ordered = CspModel::new("ordered_sequence")
        .with_aggregate("s", 4, DomainExpression::Range { from: 1, to: 8 })
        .with_variable("first", DomainExpression::Range { from: 1, to: 8 })
        .with_constraint(ModelConstraint::Repeated {
            aggregate: "s".into(),
            expression: relation(
                ExpressionSide::with_infix(Operand::relative("s", 0), ArithmeticOperator::Add, 1),
                RelationalOperator::Less,
                ExpressionSide::operand(Operand::relative("s", 1)),
            ),
        })
        .with_constraint(ModelConstraint::Ternary(relation(
            ExpressionSide::operand(Operand::variable("first")),
            RelationalOperator::Equal,
            ExpressionSide::operand(Operand::element("s", 0)),
        )));

    vec![
        ("less_than", less_than),
        ("offset", offset),
        ("map_colouring", colouring),
        ("ordered_sequence", ordered),
    ]
}

/// Write the built-in example models into a directory as YAML
pub fn create_example_models<P: AsRef<Path>>(dir: P) -> Result<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    for (stem, model) in example_models() {
        save_model_to_file(&model, dir.join(format!("{}.yaml", stem)))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ModelFormat::from_path(Path::new("a.yml")).unwrap(), ModelFormat::Yaml);
        assert_eq!(ModelFormat::from_path(Path::new("a.json")).unwrap(), ModelFormat::Json);
        assert!(ModelFormat::from_path(Path::new("a.txt")).is_err());
    }

    #[test]
    fn test_save_and_load_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/model.json");
        let (_, model) = example_models().remove(2);

        save_model_to_file(&model, &path).unwrap();
        let loaded = load_model_from_file(&path).unwrap();
        assert_eq!(loaded, model);
    }

    #[test]
    fn test_create_example_models() {
        let dir = tempdir().unwrap();
        create_example_models(dir.path()).unwrap();

        for (stem, model) in example_models() {
            let loaded = load_model_from_file(dir.path().join(format!("{}.yaml", stem))).unwrap();
            assert_eq!(loaded, model);
        }
    }

    #[test]
    fn test_parse_errors_are_reported() {
        assert!(parse_model("name: [unterminated", ModelFormat::Yaml).is_err());
        assert!(parse_model("{}", ModelFormat::Json).is_err());
    }
}
