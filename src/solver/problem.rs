//! A single solve: validation, network construction, propagation and extraction

use super::result::{ExtractionPath, Label, SolutionSnapshot, SolveResult, SolveStatistics, SolveStatus};
use crate::config::{ExtractionStrategy, Settings};
use crate::csp::{
    assignment_satisfies, ArcRevisionEngine, AssignmentTable, BacktrackingSearch, CancellationToken,
    ConstraintNetwork, ModelSolverMap, NetworkBuilder, PropagationOutcome, SearchOutcome, Value,
};
use crate::error::{SolverError, SolverResult};
use crate::model::{CspModel, DomainValue, ModelValidator};
use log::{debug, info, warn};
use std::time::Instant;

/// Progress of one solve once the model has been validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveState {
    Built,
    Propagating,
    Inconsistent,
    PropagatedConsistent,
}

struct Transitions<'a> {
    model: &'a str,
    state: SolveState,
}

impl<'a> Transitions<'a> {
    fn enter(&mut self, next: SolveState) {
        debug!("`{}`: {:?} -> {:?}", self.model, self.state, next);
        self.state = next;
    }
}

enum Extraction {
    Assignment(AssignmentTable, ExtractionPath),
    Exhausted,
    LimitReached,
}

/// A model paired with the settings it is solved under
pub struct CspProblem {
    model: CspModel,
    settings: Settings,
    cancellation: CancellationToken,
}

impl CspProblem {
    /// Create a problem; a configured timeout arms the cancellation token
    pub fn new(model: CspModel, settings: Settings) -> Self {
        let cancellation = settings
            .solver
            .timeout()
            .map(CancellationToken::with_timeout)
            .unwrap_or_default();

        Self {
            model,
            settings,
            cancellation,
        }
    }

    /// Replace the cancellation token, e.g. to share one across several solves
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Handle that cancels this problem's solve from another thread
    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// The model being solved
    pub fn model(&self) -> &CspModel {
        &self.model
    }

    /// Settings in effect for this solve
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Solve the model
    ///
    /// Unsatisfiable models yield `Fail`; unsupported constructs and unknown
    /// names abort with an error.
    pub fn solve(&self) -> SolverResult<SolveResult> {
        let start = Instant::now();
        let mut statistics = SolveStatistics::default();

        let report = ModelValidator::validate(&self.model);
        if !report.is_valid() {
            warn!("Model `{}` failed validation with {} problem(s)", self.model.name, report.diagnostics.len());
            return Ok(self.finish(start, SolveStatus::InvalidModel, None, report.diagnostics, statistics));
        }

        let (status, snapshot) = match self.run(&mut statistics) {
            Ok(outcome) => outcome,
            Err(SolverError::Cancelled) => {
                warn!("Solve of `{}` was cancelled", self.model.name);
                (SolveStatus::Cancelled, None)
            }
            Err(e) => return Err(e),
        };

        Ok(self.finish(start, status, snapshot, Vec::new(), statistics))
    }

    fn run(&self, statistics: &mut SolveStatistics) -> SolverResult<(SolveStatus, Option<SolutionSnapshot>)> {
        let (mut network, map) = NetworkBuilder::new(&self.model).build()?;
        statistics.network = Some(network.statistics());

        let mut transitions = Transitions {
            model: &self.model.name,
            state: SolveState::Built,
        };
        transitions.enter(SolveState::Propagating);

        let mut engine = ArcRevisionEngine::new(self.cancellation.clone());
        let outcome = engine.propagate(&mut network);
        statistics.propagation = engine.statistics();

        if outcome? == PropagationOutcome::Inconsistent {
            transitions.enter(SolveState::Inconsistent);
            info!("Model `{}` is unsatisfiable (propagation emptied a domain)", self.model.name);
            return Ok((SolveStatus::Fail, None));
        }
        transitions.enter(SolveState::PropagatedConsistent);

        match self.extract(&network, statistics)? {
            Extraction::Assignment(table, path) => {
                statistics.extraction = Some(path);
                let snapshot = self.snapshot(&map, &table)?;
                Ok((SolveStatus::Success, Some(snapshot)))
            }
            Extraction::Exhausted => {
                info!("Model `{}` is unsatisfiable (search exhausted)", self.model.name);
                Ok((SolveStatus::Fail, None))
            }
            Extraction::LimitReached => {
                warn!(
                    "Search node limit of {} reached for `{}`",
                    self.settings.solver.max_search_nodes.unwrap_or_default(),
                    self.model.name
                );
                Ok((SolveStatus::Cancelled, None))
            }
        }
    }

    fn extract(&self, network: &ConstraintNetwork, statistics: &mut SolveStatistics) -> SolverResult<Extraction> {
        let path = match self.settings.solver.extraction {
            ExtractionStrategy::FirstRemaining => {
                let table = first_remaining(network);
                if assignment_satisfies(network, &table)? {
                    return Ok(Extraction::Assignment(table, ExtractionPath::FirstRemaining));
                }
                info!(
                    "First remaining values of `{}` violate a constraint, falling back to backtracking",
                    self.model.name
                );
                ExtractionPath::FallbackToBacktracking
            }
            ExtractionStrategy::Backtracking => ExtractionPath::Backtracking,
        };

        let mut search = BacktrackingSearch::new(network, self.cancellation.clone())
            .with_node_limit(self.settings.solver.max_search_nodes);
        let outcome = search.run();
        statistics.search = Some(search.statistics());

        Ok(match outcome? {
            SearchOutcome::Solution(table) => Extraction::Assignment(table, path),
            SearchOutcome::Exhausted => Extraction::Exhausted,
            SearchOutcome::LimitReached => Extraction::LimitReached,
        })
    }

    /// Map solver bindings back to model-native labels, in model order
    fn snapshot(&self, map: &ModelSolverMap, table: &AssignmentTable) -> SolverResult<SolutionSnapshot> {
        let mut labels = Vec::with_capacity(map.len());
        for entry in map.entries() {
            let content = table
                .value(entry.variable)
                .ok_or_else(|| SolverError::UnknownVariable(entry.name.clone()))?;
            let value = entry
                .mapper
                .to_model(content)
                .cloned()
                .unwrap_or(DomainValue::Int(content));
            labels.push(Label {
                variable: entry.name.clone(),
                value,
            });
        }
        Ok(SolutionSnapshot::new(self.model.name.clone(), labels))
    }

    fn finish(
        &self,
        start: Instant,
        status: SolveStatus,
        snapshot: Option<SolutionSnapshot>,
        diagnostics: Vec<crate::model::Diagnostic>,
        statistics: SolveStatistics,
    ) -> SolveResult {
        let elapsed = start.elapsed();
        info!("Solved `{}`: {} in {:.3}s", self.model.name, status, elapsed.as_secs_f64());
        SolveResult {
            model: self.model.name.clone(),
            status,
            elapsed,
            snapshot,
            diagnostics,
            statistics,
        }
    }
}

/// Bind every plain variable to the first value left in its domain
fn first_remaining(network: &ConstraintNetwork) -> AssignmentTable {
    let mut table = AssignmentTable::new();
    for (variable, solver_variable) in network.variables().variables() {
        if let Some(&content) = solver_variable.domain.first() {
            table.assign(Value { variable, content });
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UnsupportedConstruct;
    use crate::model::{
        example_models, relation, DomainExpression, ExpressionSide, ModelConstraint, Operand, RelationalOperator,
    };

    fn settings(extraction: ExtractionStrategy) -> Settings {
        let mut settings = Settings::default();
        settings.solver.extraction = extraction;
        settings
    }

    fn example(name: &str) -> CspModel {
        example_models()
            .into_iter()
            .find(|(stem, _)| *stem == name)
            .map(|(_, model)| model)
            .unwrap()
    }

    fn labels(result: &SolveResult) -> Vec<(String, DomainValue)> {
        result
            .snapshot
            .as_ref()
            .unwrap()
            .labels
            .iter()
            .map(|l| (l.variable.clone(), l.value.clone()))
            .collect()
    }

    fn int(name: &str, value: i64) -> (String, DomainValue) {
        (name.to_string(), DomainValue::Int(value))
    }

    #[test]
    fn test_less_than_with_both_strategies() {
        for strategy in [ExtractionStrategy::FirstRemaining, ExtractionStrategy::Backtracking] {
            let result = CspProblem::new(example("less_than"), settings(strategy)).solve().unwrap();
            assert_eq!(result.status, SolveStatus::Success);
            assert_eq!(labels(&result), vec![int("X", 1), int("Y", 2)]);
        }
    }

    #[test]
    fn test_offset_keeps_domains() {
        let result = CspProblem::new(example("offset"), settings(ExtractionStrategy::FirstRemaining))
            .solve()
            .unwrap();
        assert_eq!(result.status, SolveStatus::Success);
        assert_eq!(labels(&result), vec![int("X", 1), int("Y", 3)]);
        assert_eq!(result.statistics.propagation.values_removed, 0);
        assert_eq!(result.statistics.extraction, Some(ExtractionPath::FirstRemaining));
    }

    #[test]
    fn test_empty_domain_fails() {
        let model = CspModel::new("c")
            .with_variable("X", DomainExpression::Range { from: 5, to: 5 })
            .with_variable("Y", DomainExpression::Range { from: 1, to: 3 })
            .with_constraint(ModelConstraint::Expression(relation(
                ExpressionSide::operand(Operand::variable("X")),
                RelationalOperator::Less,
                ExpressionSide::operand(Operand::variable("Y")),
            )));

        let result = CspProblem::new(model, Settings::default()).solve().unwrap();
        assert_eq!(result.status, SolveStatus::Fail);
        assert!(result.snapshot.is_none());
    }

    #[test]
    fn test_pigeonhole_fails() {
        let model = CspModel::new("d")
            .with_aggregate("v", 3, DomainExpression::Range { from: 1, to: 2 })
            .with_constraint(ModelConstraint::AllDifferent(vec!["v".into()]));

        let result = CspProblem::new(model, Settings::default()).solve().unwrap();
        assert_eq!(result.status, SolveStatus::Fail);
    }

    #[test]
    fn test_map_colouring_labels_are_model_values() {
        let result = CspProblem::new(example("map_colouring"), Settings::default()).solve().unwrap();
        assert_eq!(result.status, SolveStatus::Success);

        let snapshot = result.snapshot.unwrap();
        let colour = |name: &str| snapshot.value(name).cloned().unwrap();
        assert_ne!(colour("wa"), colour("nt"));
        assert_ne!(colour("nt"), colour("sa"));
        assert_ne!(colour("sa"), colour("q"));
        assert_eq!(colour("wa"), DomainValue::Text("red".into()));
    }

    #[test]
    fn test_ordered_sequence_includes_aggregate_elements() {
        let result = CspProblem::new(example("ordered_sequence"), Settings::default()).solve().unwrap();
        assert_eq!(result.status, SolveStatus::Success);
        assert_eq!(
            labels(&result),
            vec![int("s0", 1), int("s1", 3), int("s2", 5), int("s3", 7), int("first", 1)]
        );
        let network = result.statistics.network.unwrap();
        assert_eq!(network.variables.encapsulated_variables, 1);
    }

    #[test]
    fn test_first_remaining_falls_back_to_search() {
        let model = CspModel::new("ne")
            .with_variable("X", DomainExpression::Range { from: 1, to: 2 })
            .with_variable("Y", DomainExpression::Range { from: 1, to: 2 })
            .with_constraint(ModelConstraint::Expression(relation(
                ExpressionSide::operand(Operand::variable("X")),
                RelationalOperator::NotEqual,
                ExpressionSide::operand(Operand::variable("Y")),
            )));

        let result = CspProblem::new(model, settings(ExtractionStrategy::FirstRemaining))
            .solve()
            .unwrap();
        assert_eq!(result.status, SolveStatus::Success);
        assert_eq!(labels(&result), vec![int("X", 1), int("Y", 2)]);
        assert_eq!(result.statistics.extraction, Some(ExtractionPath::FallbackToBacktracking));
        assert!(result.statistics.search.is_some());
    }

    #[test]
    fn test_invalid_model_reports_diagnostics() {
        let result = CspProblem::new(CspModel::new("empty"), Settings::default()).solve().unwrap();
        assert_eq!(result.status, SolveStatus::InvalidModel);
        assert!(!result.diagnostics.is_empty());
        assert!(result.statistics.network.is_none());
    }

    #[test]
    fn test_unbounded_range_is_an_invalid_model() {
        let model = CspModel::new("unbounded")
            .with_variable("X", DomainExpression::Range { from: 0, to: i64::MAX });
        let result = CspProblem::new(model, Settings::default()).solve().unwrap();
        assert_eq!(result.status, SolveStatus::InvalidModel);
        assert!(result.diagnostics.iter().any(|d| d.message.contains("more than the limit")));
    }

    #[test]
    fn test_cancelled_before_propagation() {
        let problem = CspProblem::new(example("less_than"), Settings::default());
        problem.cancellation().cancel();

        let result = problem.solve().unwrap();
        assert_eq!(result.status, SolveStatus::Cancelled);
    }

    #[test]
    fn test_node_limit_reports_cancelled() {
        let mut settings = Settings::default();
        settings.solver.max_search_nodes = Some(1);

        let result = CspProblem::new(example("less_than"), settings).solve().unwrap();
        assert_eq!(result.status, SolveStatus::Cancelled);
    }

    #[test]
    fn test_unsupported_ternary_operator_is_an_error() {
        let model = CspModel::new("t")
            .with_variable("A", DomainExpression::Range { from: 1, to: 3 })
            .with_variable("B", DomainExpression::Range { from: 1, to: 3 })
            .with_constraint(ModelConstraint::Ternary(relation(
                ExpressionSide::operand(Operand::variable("A")),
                RelationalOperator::Less,
                ExpressionSide::operand(Operand::variable("B")),
            )));

        let result = CspProblem::new(model, Settings::default()).solve();
        assert!(matches!(
            result,
            Err(SolverError::Unsupported(UnsupportedConstruct::TernaryOperator(_)))
        ));
    }
}
