// compiler.rs — Policy source → CompiledPolicy.
//
// Pipeline for one compilation unit:
//
// 1. Tokenize (lexer errors become diagnostics, scanning continues)
// 2. Parse into a PolicyAst (statement-level recovery at newlines)
// 3. Select the resource descriptor named in the source
// 4. Bind the AST against the descriptor (property lookup, type checks,
//    literal coercion)
// 5. Attach a CompiledPolicy only if no error diagnostic was reported
//
// The compiler holds no state, so compiling the same unit twice always gives
// the same diagnostics and an equivalent policy.

use crate::binder;
use crate::context::CompilationContext;
use crate::diagnostic::{Diagnostic, DiagnosticCode};
use crate::engine::CompiledPolicy;
use crate::lexer;
use crate::parser;
use crate::resource::{ResourceCatalog, ResourceDescriptor};
use crate::unit::CompilationUnit;

/// Compiles policy source into executable predicates.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyCompiler;

impl PolicyCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Compile `unit` against a single resource descriptor.
    ///
    /// The resource named in the source must match `descriptor.kind`
    /// (case-insensitive).
    pub fn compile(&self, unit: CompilationUnit, descriptor: &ResourceDescriptor) -> CompilationContext {
        self.run(unit, |ast, diagnostics| {
            if ast.resource.eq_ignore_ascii_case(&descriptor.kind) {
                Some(descriptor)
            } else {
                diagnostics.push(Diagnostic::error(
                    DiagnosticCode::ResourceMismatch,
                    format!(
                        "policy validates '{}' but is being compiled for '{}'",
                        ast.resource, descriptor.kind
                    ),
                    ast.resource_span,
                ));
                None
            }
        })
    }

    /// Compile `unit`, selecting the descriptor named by its `resource "..."`
    /// header from `catalog`.
    pub fn compile_with_catalog(
        &self,
        unit: CompilationUnit,
        catalog: &ResourceCatalog,
    ) -> CompilationContext {
        self.run(unit, |ast, diagnostics| {
            let found = catalog.get(&ast.resource);
            if found.is_none() {
                let known: Vec<&str> = catalog.kinds().collect();
                diagnostics.push(Diagnostic::error(
                    DiagnosticCode::UnknownResource,
                    format!(
                        "unknown resource type '{}' (known types: {})",
                        ast.resource,
                        if known.is_empty() {
                            "none".to_string()
                        } else {
                            known.join(", ")
                        }
                    ),
                    ast.resource_span,
                ));
            }
            found
        })
    }

    fn run<'a, F>(&self, unit: CompilationUnit, select: F) -> CompilationContext
    where
        F: FnOnce(&crate::ast::PolicyAst, &mut Vec<Diagnostic>) -> Option<&'a ResourceDescriptor>,
    {
        let (tokens, lex_diagnostics) = lexer::tokenize(unit.source());
        let mut diagnostics = lex_diagnostics;

        let ast = parser::parse(&tokens, &mut diagnostics);
        let mut policy = None;
        if let Some(ast) = ast {
            if let Some(descriptor) = select(&ast, &mut diagnostics) {
                if let Some(statements) =
                    binder::bind(&ast, descriptor, unit.source(), &mut diagnostics)
                {
                    policy = Some(CompiledPolicy::new(
                        unit.name(),
                        descriptor.kind.clone(),
                        statements,
                    ));
                }
            }
        }

        let mut context = CompilationContext::new(unit);
        context.extend(diagnostics);
        let context = context.finish(policy);

        tracing::debug!(
            unit = %context.unit().name(),
            errors = context.errors().count(),
            warnings = context.warnings().count(),
            compiled = context.is_success(),
            "compiled policy"
        );
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Severity;
    use crate::engine::ResourcePolicyExecution;
    use crate::resource::{DynamicResource, PropertyType, PropertyValue};

    fn thing() -> ResourceDescriptor {
        ResourceDescriptor::new("Thing", "Test")
            .property("A", PropertyType::Number, "")
            .property("B", PropertyType::Number, "")
            .property("Name", PropertyType::String, "")
            .property("Public", PropertyType::Boolean, "")
            .property("Tags", PropertyType::StringSet, "")
    }

    fn compile(source: &str) -> CompilationContext {
        PolicyCompiler::new().compile(CompilationUnit::from_source("test.policy", source), &thing())
    }

    fn codes(context: &CompilationContext) -> Vec<&'static str> {
        context.diagnostics().iter().map(|d| d.code.as_str()).collect()
    }

    const TWO_STATEMENTS: &str = "resource \"Thing\"\nvalidate {\n    input.A == 1\n    input.B == 2\n}\n";

    #[test]
    fn implicit_and_of_two_statements() {
        let context = compile(TWO_STATEMENTS);
        assert!(context.diagnostics().is_empty(), "{:?}", context.diagnostics());
        let policy = context.policy().unwrap();

        let pass = DynamicResource::new("Thing", "1").with("A", 1i64).with("B", 2i64);
        let fail = DynamicResource::new("Thing", "2").with("A", 1i64).with("B", 3i64);
        let missing = DynamicResource::new("Thing", "3").with("A", 1i64);

        assert_eq!(policy.evaluate(&pass), ResourcePolicyExecution::Passed);
        assert_eq!(policy.evaluate(&fail), ResourcePolicyExecution::Failed);
        assert!(matches!(
            policy.evaluate(&missing),
            ResourcePolicyExecution::Error { .. }
        ));
    }

    #[test]
    fn compiling_twice_is_deterministic() {
        let first = compile(TWO_STATEMENTS);
        let second = compile(TWO_STATEMENTS);
        assert_eq!(first.diagnostics(), second.diagnostics());
        assert_eq!(first.policy(), second.policy());
    }

    #[test]
    fn unknown_property_blocks_the_policy() {
        let context = compile("resource \"Thing\" validate {\n    input.Nope == 1\n}\n");
        assert!(context.has_errors());
        assert!(context.policy().is_none());
        assert_eq!(codes(&context), vec!["ASP0022"]);
        let d = &context.diagnostics()[0];
        assert_eq!(d.span.line, 2);
        assert_eq!(d.span.column, 11);
    }

    #[test]
    fn unknown_property_suggests_spelling() {
        let context = compile("resource \"Thing\" validate {\n    input.name == \"x\"\n}\n");
        assert!(context.diagnostics()[0].message.contains("did you mean 'Name'"));
    }

    #[test]
    fn every_unknown_property_is_reported() {
        let context = compile(
            "resource \"Thing\" validate {\n    input.X == 1\n    input.A == 1 && input.Y == 2\n}\n",
        );
        assert_eq!(codes(&context), vec!["ASP0022", "ASP0022"]);
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let context = compile(
            "# header\nresource \"Thing\"\n\nvalidate {\n    # first\n    input.A == 1   # trailing\n\n}\n",
        );
        assert!(context.is_success(), "{:?}", context.render_diagnostics());
        assert_eq!(context.policy().unwrap().statements().count(), 1);
    }

    #[test]
    fn warnings_still_yield_a_policy() {
        let context = compile("resource \"Thing\" validate {\n    input.A == \"1\"\n}\n");
        assert!(context.is_success());
        assert_eq!(context.warnings().count(), 1);
        assert_eq!(context.diagnostics()[0].severity, Severity::Warning);
        assert_eq!(codes(&context), vec!["ASP0032"]);

        let resource = DynamicResource::new("Thing", "1").with("A", 1i64);
        assert_eq!(
            context.policy().unwrap().evaluate(&resource),
            ResourcePolicyExecution::Passed
        );
    }

    #[test]
    fn case_insensitive_operator() {
        let context = compile("resource \"Thing\" validate {\n    input.Name ~= \"PROD\"\n}\n");
        let policy = context.policy().unwrap();
        let resource = DynamicResource::new("Thing", "1").with("Name", "prod");
        assert_eq!(policy.evaluate(&resource), ResourcePolicyExecution::Passed);

        let strict = compile("resource \"Thing\" validate {\n    input.Name == \"PROD\"\n}\n");
        assert_eq!(
            strict.policy().unwrap().evaluate(&resource),
            ResourcePolicyExecution::Failed
        );
    }

    #[test]
    fn lists_and_sets() {
        let context = compile(
            "resource \"Thing\" validate {\n    input.Name in [\"a\", \"b\"]\n    input.Tags contains \"team\"\n    input.Tags != []\n}\n",
        );
        assert!(context.is_success(), "{:?}", context.render_diagnostics());
        let policy = context.policy().unwrap();

        let ok = DynamicResource::new("Thing", "1")
            .with("Name", "b")
            .with("Tags", PropertyValue::set(["team", "env"]));
        assert_eq!(policy.evaluate(&ok), ResourcePolicyExecution::Passed);

        let bad = DynamicResource::new("Thing", "2")
            .with("Name", "c")
            .with("Tags", PropertyValue::set(["team"]));
        assert_eq!(policy.evaluate(&bad), ResourcePolicyExecution::Failed);
    }

    #[test]
    fn parenthesized_group_may_span_lines() {
        let context = compile(
            "resource \"Thing\" validate {\n    (input.A >= 1 &&\n     input.B < 10)\n}\n",
        );
        assert!(context.is_success(), "{:?}", context.render_diagnostics());
        let resource = DynamicResource::new("Thing", "1").with("A", 3i64).with("B", 12i64);
        assert_eq!(
            context.policy().unwrap().evaluate(&resource),
            ResourcePolicyExecution::Failed
        );
    }

    #[test]
    fn type_errors() {
        let context = compile(
            "resource \"Thing\" validate {\n    input.Public > true\n    input.A == \"one\"\n    input.Tags == \"x\"\n    input.A == input.Name\n}\n",
        );
        assert!(context.policy().is_none());
        assert_eq!(codes(&context), vec!["ASP0031", "ASP0030", "ASP0030", "ASP0030"]);
    }

    #[test]
    fn resource_mismatch_is_an_error() {
        let context = compile("resource \"Other\" validate {\n    input.A == 1\n}\n");
        assert_eq!(codes(&context), vec!["ASP0021"]);
        assert!(!context.is_success());
    }

    #[test]
    fn catalog_selects_descriptor_by_name() {
        let catalog = ResourceCatalog::new().with(thing());
        let compiler = PolicyCompiler::new();

        let ok = compiler.compile_with_catalog(
            CompilationUnit::from_source("a.policy", "resource \"thing\" validate {\n input.A == 1\n}"),
            &catalog,
        );
        assert!(ok.is_success());
        assert_eq!(ok.policy().unwrap().resource_kind(), "Thing");

        let unknown = compiler.compile_with_catalog(
            CompilationUnit::from_source("b.policy", "resource \"Widget\" validate {\n input.A == 1\n}"),
            &catalog,
        );
        assert_eq!(codes(&unknown), vec!["ASP0020"]);
        assert!(unknown.diagnostics()[0].message.contains("Thing"));
    }

    #[test]
    fn syntax_errors_recover_per_line() {
        let context = compile(
            "resource \"Thing\" validate {\n    input.A == \n    input.B = 2\n    input.A == 1\n}\n",
        );
        assert!(context.errors().count() >= 2, "{:?}", context.render_diagnostics());
        assert!(context.policy().is_none());
        assert!(context.render_diagnostics()[0].starts_with("test.policy:2:"));
    }
}
