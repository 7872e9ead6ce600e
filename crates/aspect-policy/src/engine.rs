// engine.rs — Compiled policies and the tree-walking evaluator.
//
// A CompiledPolicy is the bound form of a validate block: every property
// reference has been checked against the resource kind's catalog and every
// literal already coerced to the property's declared type. Evaluating it
// against a resource:
//
// 1. Statements run in source order; the first false one → Failed
// 2. Inside a statement, `&&` short-circuits left to right
// 3. Properties are read only when a comparison needs them
// 4. A missing property, or a value whose runtime type differs from the
//    catalog, → Error (a fault in the data, not a failed check)
// 5. All statements true → Passed
//
// Evaluation is pure: no I/O, no shared state, safe to run from any thread.

use std::cmp::Ordering;

use serde::Serialize;
use thiserror::Error;

use crate::ast::CompareOp;
use crate::resource::{PropertyType, PropertyValue, Resource};

/// Outcome of applying one compiled policy to one resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResourcePolicyExecution {
    Passed,
    Failed,
    /// The predicate could not be evaluated for this resource.
    Error { fault: EvaluationFault },
}

impl ResourcePolicyExecution {
    pub fn is_passed(&self) -> bool {
        matches!(self, ResourcePolicyExecution::Passed)
    }
}

/// A runtime fault raised while reading or comparing a property.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvaluationFault {
    #[error("{resource} has no value for property '{property}'")]
    MissingProperty { resource: String, property: String },

    #[error("property '{property}' of {resource} is declared {expected} but holds a {found} value")]
    TypeMismatch {
        resource: String,
        property: String,
        expected: PropertyType,
        found: PropertyType,
    },

    #[error("policy targets '{expected}' resources but was applied to a '{found}'")]
    ResourceKindMismatch { expected: String, found: String },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PropertyRef {
    pub name: String,
    pub property_type: PropertyType,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BoundOperand {
    Value(PropertyValue),
    Property(PropertyRef),
    /// Right-hand side of `in`.
    List(Vec<PropertyValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BoundComparison {
    pub property: PropertyRef,
    pub op: CompareOp,
    pub operand: BoundOperand,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BoundExpr {
    And(Vec<BoundExpr>),
    Compare(BoundComparison),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BoundStatement {
    pub expr: BoundExpr,
    /// Source text of the statement, for traces and reports.
    pub text: String,
}

/// One statement checked during `evaluate_with_trace`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationStep {
    /// The statement's source text (e.g., `input.Public == false`).
    pub statement: String,
    /// "passed", "failed", or "error: <fault>".
    pub outcome: String,
    /// Whether this step decided the result.
    pub terminal: bool,
}

/// Evaluation result plus the statements checked to reach it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationTrace {
    pub execution: ResourcePolicyExecution,
    pub steps: Vec<EvaluationStep>,
}

impl EvaluationTrace {
    /// The statement that failed or faulted, if any.
    pub fn deciding_statement(&self) -> Option<&str> {
        if self.execution.is_passed() {
            return None;
        }
        self.steps
            .iter()
            .find(|s| s.terminal)
            .map(|s| s.statement.as_str())
    }
}

/// The executable form of one policy file.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPolicy {
    name: String,
    resource_kind: String,
    statements: Vec<BoundStatement>,
}

impl CompiledPolicy {
    pub(crate) fn new(
        name: impl Into<String>,
        resource_kind: impl Into<String>,
        statements: Vec<BoundStatement>,
    ) -> Self {
        Self {
            name: name.into(),
            resource_kind: resource_kind.into(),
            statements,
        }
    }

    /// Name of the compilation unit this policy came from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resource kind this policy validates.
    pub fn resource_kind(&self) -> &str {
        &self.resource_kind
    }

    pub fn statements(&self) -> impl Iterator<Item = &str> {
        self.statements.iter().map(|s| s.text.as_str())
    }

    pub fn evaluate(&self, resource: &dyn Resource) -> ResourcePolicyExecution {
        if let Err(fault) = self.check_kind(resource) {
            return ResourcePolicyExecution::Error { fault };
        }
        for statement in &self.statements {
            match eval(&statement.expr, resource) {
                Ok(true) => {}
                Ok(false) => return ResourcePolicyExecution::Failed,
                Err(fault) => return ResourcePolicyExecution::Error { fault },
            }
        }
        ResourcePolicyExecution::Passed
    }

    /// Same logic as `evaluate()` but records every statement checked.
    pub fn evaluate_with_trace(&self, resource: &dyn Resource) -> EvaluationTrace {
        let mut steps = Vec::new();

        if let Err(fault) = self.check_kind(resource) {
            steps.push(EvaluationStep {
                statement: format!("resource \"{}\"", self.resource_kind),
                outcome: format!("error: {}", fault),
                terminal: true,
            });
            return EvaluationTrace {
                execution: ResourcePolicyExecution::Error { fault },
                steps,
            };
        }

        for statement in &self.statements {
            match eval(&statement.expr, resource) {
                Ok(true) => steps.push(EvaluationStep {
                    statement: statement.text.clone(),
                    outcome: "passed".to_string(),
                    terminal: false,
                }),
                Ok(false) => {
                    steps.push(EvaluationStep {
                        statement: statement.text.clone(),
                        outcome: "failed".to_string(),
                        terminal: true,
                    });
                    return EvaluationTrace {
                        execution: ResourcePolicyExecution::Failed,
                        steps,
                    };
                }
                Err(fault) => {
                    steps.push(EvaluationStep {
                        statement: statement.text.clone(),
                        outcome: format!("error: {}", fault),
                        terminal: true,
                    });
                    return EvaluationTrace {
                        execution: ResourcePolicyExecution::Error { fault },
                        steps,
                    };
                }
            }
        }

        EvaluationTrace {
            execution: ResourcePolicyExecution::Passed,
            steps,
        }
    }

    fn check_kind(&self, resource: &dyn Resource) -> Result<(), EvaluationFault> {
        if resource.kind().eq_ignore_ascii_case(&self.resource_kind) {
            Ok(())
        } else {
            Err(EvaluationFault::ResourceKindMismatch {
                expected: self.resource_kind.clone(),
                found: resource.kind().to_string(),
            })
        }
    }
}

fn eval(expr: &BoundExpr, resource: &dyn Resource) -> Result<bool, EvaluationFault> {
    match expr {
        BoundExpr::And(terms) => {
            for term in terms {
                if !eval(term, resource)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        BoundExpr::Compare(comparison) => eval_comparison(comparison, resource),
    }
}

fn eval_comparison(
    comparison: &BoundComparison,
    resource: &dyn Resource,
) -> Result<bool, EvaluationFault> {
    let left = read(resource, &comparison.property)?;
    let result = match &comparison.operand {
        BoundOperand::Value(right) => compare(&left, comparison.op, right),
        BoundOperand::Property(property) => {
            let right = read(resource, property)?;
            compare(&left, comparison.op, &right)
        }
        BoundOperand::List(items) => items.contains(&left),
    };
    tracing::trace!(
        resource = %resource.identity(),
        property = %comparison.property.name,
        op = %comparison.op,
        result,
        "compared property"
    );
    Ok(result)
}

fn read(resource: &dyn Resource, property: &PropertyRef) -> Result<PropertyValue, EvaluationFault> {
    let value = resource
        .property(&property.name)
        .ok_or_else(|| EvaluationFault::MissingProperty {
            resource: resource.identity().to_string(),
            property: property.name.clone(),
        })?;
    let found = value.property_type();
    if found != property.property_type {
        return Err(EvaluationFault::TypeMismatch {
            resource: resource.identity().to_string(),
            property: property.name.clone(),
            expected: property.property_type,
            found,
        });
    }
    Ok(value)
}

fn compare(left: &PropertyValue, op: CompareOp, right: &PropertyValue) -> bool {
    match op {
        CompareOp::Eq => left == right,
        CompareOp::NotEq => left != right,
        CompareOp::EqIgnoreCase => eq_ignore_case(left, right),
        CompareOp::NotEqIgnoreCase => !eq_ignore_case(left, right),
        CompareOp::Lt => ordering(left, right).is_some_and(Ordering::is_lt),
        CompareOp::LtEq => ordering(left, right).is_some_and(Ordering::is_le),
        CompareOp::Gt => ordering(left, right).is_some_and(Ordering::is_gt),
        CompareOp::GtEq => ordering(left, right).is_some_and(Ordering::is_ge),
        CompareOp::In => match (left, right) {
            (PropertyValue::String(item), PropertyValue::StringSet(set)) => set.contains(item),
            _ => false,
        },
        CompareOp::Contains => match (left, right) {
            (PropertyValue::String(haystack), PropertyValue::String(needle)) => {
                haystack.contains(needle.as_str())
            }
            (PropertyValue::StringSet(set), PropertyValue::String(item)) => set.contains(item),
            _ => false,
        },
    }
}

fn eq_ignore_case(left: &PropertyValue, right: &PropertyValue) -> bool {
    match (left, right) {
        (PropertyValue::String(a), PropertyValue::String(b)) => {
            a.to_lowercase() == b.to_lowercase()
        }
        _ => left == right,
    }
}

fn ordering(left: &PropertyValue, right: &PropertyValue) -> Option<Ordering> {
    match (left, right) {
        (PropertyValue::Number(a), PropertyValue::Number(b)) => a.partial_cmp(b),
        (PropertyValue::String(a), PropertyValue::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
