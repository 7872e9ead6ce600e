// binder.rs — Resolve a parsed policy against a resource kind's catalog.
//
// Binding checks every `input.<Property>` reference against the descriptor,
// type-checks each comparison, and coerces literals to the declared property
// type. Coercions that change a literal's type are allowed but reported as
// warnings; anything that cannot be coerced is an error.
//
// Binding never stops at the first problem: all statements are visited so the
// author sees every unknown property in one pass.

use std::collections::BTreeSet;

use crate::ast::{CompareOp, Comparison, Expr, Literal, LiteralValue, Operand, PolicyAst, PropertyPath};
use crate::diagnostic::{Diagnostic, DiagnosticCode, Span};
use crate::engine::{BoundComparison, BoundExpr, BoundOperand, BoundStatement, PropertyRef};
use crate::resource::{format_number, PropertyType, PropertyValue, ResourceDescriptor};

/// Bind every statement of `ast`. Returns `None` if any error was reported.
pub(crate) fn bind(
    ast: &PolicyAst,
    descriptor: &ResourceDescriptor,
    source: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Vec<BoundStatement>> {
    let mut binder = Binder {
        descriptor,
        diagnostics,
        failed: false,
    };
    let statements: Vec<Option<BoundStatement>> = ast
        .statements
        .iter()
        .map(|statement| {
            binder.expr(&statement.expr).map(|expr| BoundStatement {
                expr,
                text: source
                    .get(statement.span.start..statement.span.end)
                    .unwrap_or_default()
                    .to_string(),
            })
        })
        .collect();

    if binder.failed {
        return None;
    }
    statements.into_iter().collect()
}

struct Binder<'a> {
    descriptor: &'a ResourceDescriptor,
    diagnostics: &'a mut Vec<Diagnostic>,
    failed: bool,
}

impl<'a> Binder<'a> {
    fn error(&mut self, code: DiagnosticCode, message: String, span: Span) {
        self.failed = true;
        self.diagnostics.push(Diagnostic::error(code, message, span));
    }

    fn warning(&mut self, code: DiagnosticCode, message: String, span: Span) {
        self.diagnostics.push(Diagnostic::warning(code, message, span));
    }

    fn expr(&mut self, expr: &Expr) -> Option<BoundExpr> {
        match expr {
            Expr::And(terms) => {
                let bound: Vec<Option<BoundExpr>> = terms.iter().map(|t| self.expr(t)).collect();
                bound.into_iter().collect::<Option<Vec<_>>>().map(BoundExpr::And)
            }
            Expr::Compare(comparison) => self.comparison(comparison).map(BoundExpr::Compare),
        }
    }

    fn comparison(&mut self, comparison: &Comparison) -> Option<BoundComparison> {
        // Resolve both sides before bailing out so both get reported.
        let left = self.property(&comparison.left);
        let right = match &comparison.right {
            Operand::Path(path) => self.property(path),
            _ => None,
        };
        let left = left?;
        let op = comparison.op;

        let operand = match &comparison.right {
            Operand::Path(path) => {
                let right = right?;
                self.check_property_operand(&left, op, &right, path.span)?;
                BoundOperand::Property(right)
            }
            Operand::Literal(literal) => self.literal_operand(&left, op, literal, comparison.op_span)?,
            Operand::List { items, span } => {
                self.list_operand(&left, op, items, *span, comparison.op_span)?
            }
        };

        Some(BoundComparison {
            property: left,
            op,
            operand,
        })
    }

    fn property(&mut self, path: &PropertyPath) -> Option<PropertyRef> {
        let first = path.segments.first()?;
        let Some(descriptor) = self.descriptor.property_named(&first.name) else {
            let suggestion = self
                .descriptor
                .property_like(&first.name)
                .map(|p| format!("; did you mean '{}'?", p.name))
                .unwrap_or_default();
            self.error(
                DiagnosticCode::UnknownProperty,
                format!(
                    "unknown property '{}' on resource type '{}'{}",
                    first.name, self.descriptor.kind, suggestion
                ),
                first.span,
            );
            return None;
        };

        if let Some(member) = path.segments.get(1) {
            self.error(
                DiagnosticCode::NestedProperty,
                format!(
                    "property '{}' is a {} and has no member '{}'",
                    descriptor.name, descriptor.property_type, member.name
                ),
                member.span,
            );
            return None;
        }

        Some(PropertyRef {
            name: descriptor.name.clone(),
            property_type: descriptor.property_type,
        })
    }

    fn check_property_operand(
        &mut self,
        left: &PropertyRef,
        op: CompareOp,
        right: &PropertyRef,
        span: Span,
    ) -> Option<()> {
        use PropertyType::*;
        let ok = match op {
            CompareOp::Eq | CompareOp::NotEq => left.property_type == right.property_type,
            CompareOp::EqIgnoreCase | CompareOp::NotEqIgnoreCase => {
                left.property_type == String && right.property_type == String
            }
            CompareOp::Lt | CompareOp::LtEq | CompareOp::Gt | CompareOp::GtEq => {
                left.property_type == right.property_type
                    && matches!(left.property_type, Number | String)
            }
            CompareOp::In => left.property_type == String && right.property_type == StringSet,
            CompareOp::Contains => {
                matches!(left.property_type, String | StringSet) && right.property_type == String
            }
        };
        if ok {
            return Some(());
        }
        self.error(
            DiagnosticCode::TypeMismatch,
            format!(
                "cannot apply '{}' to '{}' ({}) and '{}' ({})",
                op, left.name, left.property_type, right.name, right.property_type
            ),
            span,
        );
        None
    }

    fn literal_operand(
        &mut self,
        left: &PropertyRef,
        op: CompareOp,
        literal: &Literal,
        op_span: Span,
    ) -> Option<BoundOperand> {
        let target = match op {
            CompareOp::In => {
                self.error(
                    DiagnosticCode::InvalidOperator,
                    "'in' expects a list such as [\"a\", \"b\"] or a string set property"
                        .to_string(),
                    literal.span,
                );
                return None;
            }
            CompareOp::Contains | CompareOp::EqIgnoreCase | CompareOp::NotEqIgnoreCase => {
                let allowed = if op == CompareOp::Contains {
                    matches!(left.property_type, PropertyType::String | PropertyType::StringSet)
                } else {
                    left.property_type == PropertyType::String
                };
                if !allowed {
                    self.invalid_operator(left, op, op_span);
                    return None;
                }
                PropertyType::String
            }
            _ if op.is_ordering() => {
                if !matches!(left.property_type, PropertyType::Number | PropertyType::String) {
                    self.invalid_operator(left, op, op_span);
                    return None;
                }
                left.property_type
            }
            _ => {
                if left.property_type == PropertyType::StringSet {
                    self.error(
                        DiagnosticCode::TypeMismatch,
                        format!(
                            "'{}' is a string set; compare it with a list such as [\"a\"] or use 'contains'",
                            left.name
                        ),
                        literal.span,
                    );
                    return None;
                }
                left.property_type
            }
        };
        self.coerce(literal, target, &left.name).map(BoundOperand::Value)
    }

    fn list_operand(
        &mut self,
        left: &PropertyRef,
        op: CompareOp,
        items: &[Literal],
        span: Span,
        op_span: Span,
    ) -> Option<BoundOperand> {
        match op {
            CompareOp::In if left.property_type != PropertyType::StringSet => {
                let values: Vec<Option<PropertyValue>> = items
                    .iter()
                    .map(|item| self.coerce(item, left.property_type, &left.name))
                    .collect();
                values
                    .into_iter()
                    .collect::<Option<Vec<_>>>()
                    .map(BoundOperand::List)
            }
            CompareOp::Eq | CompareOp::NotEq if left.property_type == PropertyType::StringSet => {
                let values: Vec<Option<PropertyValue>> = items
                    .iter()
                    .map(|item| self.coerce(item, PropertyType::String, &left.name))
                    .collect();
                let set: Option<BTreeSet<std::string::String>> = values
                    .into_iter()
                    .map(|v| match v {
                        Some(PropertyValue::String(s)) => Some(s),
                        _ => None,
                    })
                    .collect();
                set.map(|s| BoundOperand::Value(PropertyValue::StringSet(s)))
            }
            CompareOp::In => {
                self.invalid_operator(left, op, op_span);
                None
            }
            _ => {
                self.error(
                    DiagnosticCode::TypeMismatch,
                    format!(
                        "a list can only be used with 'in', or compared to a string set; '{}' is a {}",
                        left.name, left.property_type
                    ),
                    span,
                );
                None
            }
        }
    }

    fn invalid_operator(&mut self, left: &PropertyRef, op: CompareOp, span: Span) {
        self.error(
            DiagnosticCode::InvalidOperator,
            format!(
                "operator '{}' cannot be applied to '{}' ({})",
                op, left.name, left.property_type
            ),
            span,
        );
    }

    /// Convert a literal to `target`, warning when its written type differs.
    fn coerce(&mut self, literal: &Literal, target: PropertyType, property: &str) -> Option<PropertyValue> {
        let converted = match (&literal.value, target) {
            (LiteralValue::Number(n), PropertyType::Number) => return Some(PropertyValue::Number(*n)),
            (LiteralValue::String(s), PropertyType::String) => {
                return Some(PropertyValue::String(s.clone()))
            }
            (LiteralValue::Boolean(b), PropertyType::Boolean) => {
                return Some(PropertyValue::Boolean(*b))
            }
            (LiteralValue::String(s), PropertyType::Number) => {
                s.trim().parse::<f64>().ok().map(PropertyValue::Number)
            }
            (LiteralValue::Number(n), PropertyType::String) => {
                Some(PropertyValue::String(format_number(*n)))
            }
            (LiteralValue::Boolean(b), PropertyType::String) => {
                Some(PropertyValue::String(b.to_string()))
            }
            (LiteralValue::String(s), PropertyType::Boolean) => {
                if s.eq_ignore_ascii_case("true") {
                    Some(PropertyValue::Boolean(true))
                } else if s.eq_ignore_ascii_case("false") {
                    Some(PropertyValue::Boolean(false))
                } else {
                    None
                }
            }
            _ => None,
        };

        match converted {
            Some(value) => {
                self.warning(
                    DiagnosticCode::ImplicitConversion,
                    format!(
                        "literal {} converted to {} to match property '{}'",
                        literal.value, target, property
                    ),
                    literal.span,
                );
                Some(value)
            }
            None => {
                self.error(
                    DiagnosticCode::TypeMismatch,
                    format!(
                        "literal {} cannot be compared with '{}' ({})",
                        literal.value, property, target
                    ),
                    literal.span,
                );
                None
            }
        }
    }
}
