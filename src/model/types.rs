//! Authored model representation consumed by the solver

use serde::{Deserialize, Serialize};
use std::fmt;

/// A complete constraint model as authored by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CspModel {
    pub name: String,
    #[serde(default)]
    pub shared_domains: Vec<SharedDomain>,
    pub variables: Vec<ModelVariable>,
    #[serde(default)]
    pub constraints: Vec<ModelConstraint>,
}

/// A named domain that several variables can reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedDomain {
    pub name: String,
    pub domain: DomainExpression,
}

/// A model variable: either a single scalar or a fixed-size aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVariable {
    pub name: String,
    #[serde(default)]
    pub kind: VariableKind,
    pub domain: DomainExpression,
}

impl ModelVariable {
    /// Names of the solver-side variables this model variable expands to
    pub fn solver_names(&self) -> Vec<String> {
        match self.kind {
            VariableKind::Singleton => vec![self.name.clone()],
            VariableKind::Aggregate { size } => {
                (0..size).map(|index| element_name(&self.name, index)).collect()
            }
        }
    }
}

/// Solver-side name of an aggregate element (0-based)
pub fn element_name(aggregate: &str, index: usize) -> String {
    format!("{}{}", aggregate, index)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    #[default]
    Singleton,
    Aggregate { size: usize },
}

/// Domain expression, already structured (no textual parsing happens here)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainExpression {
    /// Inclusive integer range
    Range { from: i64, to: i64 },
    List(Vec<DomainValue>),
    Shared(String),
}

/// A model-native domain value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DomainValue {
    Int(i64),
    Text(String),
}

impl fmt::Display for DomainValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainValue::Int(value) => write!(f, "{}", value),
            DomainValue::Text(text) => write!(f, "{}", text),
        }
    }
}

/// Constraints the model author can express
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelConstraint {
    /// A binary relation between two expression sides
    Expression(ConstraintExpression),
    /// A relation routed through a hidden pair variable (binarized ternary)
    Ternary(ConstraintExpression),
    /// An expression instantiated once per index of an aggregate
    Repeated {
        aggregate: String,
        expression: ConstraintExpression,
    },
    /// Pairwise distinct values; aggregate names expand to all elements
    AllDifferent(Vec<String>),
}

/// `left <operator> right`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintExpression {
    pub left: ExpressionSide,
    pub operator: RelationalOperator,
    pub right: ExpressionSide,
}

/// One side of a relation: an operand with an optional arithmetic infix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionSide {
    pub operand: Operand,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infix: Option<Infix>,
}

impl ExpressionSide {
    pub fn operand(operand: Operand) -> Self {
        Self { operand, infix: None }
    }

    pub fn with_infix(operand: Operand, operator: ArithmeticOperator, literal: i64) -> Self {
        Self {
            operand,
            infix: Some(Infix { operator, literal }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Variable(String),
    Element { aggregate: String, index: usize },
    /// `aggregate[i + offset]`, only meaningful inside a repeated constraint
    Relative { aggregate: String, offset: i64 },
    Literal(i64),
}

impl Operand {
    pub fn variable(name: impl Into<String>) -> Self {
        Operand::Variable(name.into())
    }

    pub fn element(aggregate: impl Into<String>, index: usize) -> Self {
        Operand::Element {
            aggregate: aggregate.into(),
            index,
        }
    }

    pub fn relative(aggregate: impl Into<String>, offset: i64) -> Self {
        Operand::Relative {
            aggregate: aggregate.into(),
            offset,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Variable(name) => write!(f, "{}", name),
            Operand::Element { aggregate, index } => write!(f, "{}[{}]", aggregate, index),
            Operand::Relative { aggregate, offset } => match offset {
                0 => write!(f, "{}[i]", aggregate),
                o if *o > 0 => write!(f, "{}[i+{}]", aggregate, o),
                o => write!(f, "{}[i{}]", aggregate, o),
            },
            Operand::Literal(value) => write!(f, "{}", value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Infix {
    pub operator: ArithmeticOperator,
    pub literal: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl fmt::Display for ArithmeticOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            ArithmeticOperator::Add => "+",
            ArithmeticOperator::Subtract => "-",
            ArithmeticOperator::Multiply => "*",
            ArithmeticOperator::Divide => "/",
            ArithmeticOperator::Modulo => "%",
        };
        write!(f, "{}", symbol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationalOperator {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl RelationalOperator {
    /// Whether `left <self> right` holds
    pub fn holds<T: Ord>(self, left: T, right: T) -> bool {
        match self {
            RelationalOperator::Equal => left == right,
            RelationalOperator::NotEqual => left != right,
            RelationalOperator::Less => left < right,
            RelationalOperator::LessOrEqual => left <= right,
            RelationalOperator::Greater => left > right,
            RelationalOperator::GreaterOrEqual => left >= right,
        }
    }
}

impl fmt::Display for RelationalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            RelationalOperator::Equal => "=",
            RelationalOperator::NotEqual => "!=",
            RelationalOperator::Less => "<",
            RelationalOperator::LessOrEqual => "<=",
            RelationalOperator::Greater => ">",
            RelationalOperator::GreaterOrEqual => ">=",
        };
        write!(f, "{}", symbol)
    }
}

impl fmt::Display for ExpressionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.infix {
            Some(infix) => write!(f, "{} {} {}", self.operand, infix.operator, infix.literal),
            None => write!(f, "{}", self.operand),
        }
    }
}

impl fmt::Display for ConstraintExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.operator, self.right)
    }
}

impl CspModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shared_domains: Vec::new(),
            variables: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Add a singleton variable (builder style)
    pub fn with_variable(mut self, name: impl Into<String>, domain: DomainExpression) -> Self {
        self.variables.push(ModelVariable {
            name: name.into(),
            kind: VariableKind::Singleton,
            domain,
        });
        self
    }

    /// Add an aggregate variable of `size` elements
    pub fn with_aggregate(
        mut self,
        name: impl Into<String>,
        size: usize,
        domain: DomainExpression,
    ) -> Self {
        self.variables.push(ModelVariable {
            name: name.into(),
            kind: VariableKind::Aggregate { size },
            domain,
        });
        self
    }

    pub fn with_shared_domain(mut self, name: impl Into<String>, domain: DomainExpression) -> Self {
        self.shared_domains.push(SharedDomain {
            name: name.into(),
            domain,
        });
        self
    }

    pub fn with_constraint(mut self, constraint: ModelConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn variable(&self, name: &str) -> Option<&ModelVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn shared_domain(&self, name: &str) -> Option<&SharedDomain> {
        self.shared_domains.iter().find(|d| d.name == name)
    }
}

/// Convenience constructor for `left op right` between two sides
pub fn relation(left: ExpressionSide, operator: RelationalOperator, right: ExpressionSide) -> ConstraintExpression {
    ConstraintExpression {
        left,
        operator,
        right,
    }
}
