// context.rs — Everything produced by compiling one unit.

use crate::diagnostic::Diagnostic;
use crate::engine::CompiledPolicy;
use crate::unit::CompilationUnit;

/// The result of compiling one compilation unit: its diagnostics and, when
/// there were no errors, the compiled policy.
///
/// Warnings never block compilation; a context with only warnings still
/// carries a policy.
#[derive(Debug, Clone)]
pub struct CompilationContext {
    unit: CompilationUnit,
    diagnostics: Vec<Diagnostic>,
    policy: Option<CompiledPolicy>,
}

impl CompilationContext {
    pub(crate) fn new(unit: CompilationUnit) -> Self {
        Self {
            unit,
            diagnostics: Vec::new(),
            policy: None,
        }
    }

    pub(crate) fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    /// Sort diagnostics into source order and attach the policy if no errors
    /// were reported.
    pub(crate) fn finish(mut self, policy: Option<CompiledPolicy>) -> Self {
        self.diagnostics.sort_by_key(|d| d.span.start);
        if !self.has_errors() {
            self.policy = policy;
        }
        self
    }

    pub fn unit(&self) -> &CompilationUnit {
        &self.unit
    }

    /// All diagnostics, in source order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// True when a policy was produced.
    pub fn is_success(&self) -> bool {
        self.policy.is_some()
    }

    pub fn policy(&self) -> Option<&CompiledPolicy> {
        self.policy.as_ref()
    }

    pub fn into_policy(self) -> Option<CompiledPolicy> {
        self.policy
    }

    /// One `name:line:col: severity[code]: message` line per diagnostic.
    pub fn render_diagnostics(&self) -> Vec<String> {
        self.diagnostics
            .iter()
            .map(|d| d.render(self.unit.name()))
            .collect()
    }
}
