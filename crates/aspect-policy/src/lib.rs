//! # aspect-policy
//!
//! Rule language compiler and resource model for Aspect cloud policies.
//!
//! A policy is a small text document that constrains the properties of one
//! resource kind:
//!
//! ```text
//! resource "AwsS3Bucket"
//! validate {
//!     input.Public == false
//!     input.Encryption in ["AES256", "aws:kms"]
//! }
//! ```
//!
//! [`PolicyCompiler`] turns a [`CompilationUnit`] into a
//! [`CompilationContext`] holding [`Diagnostic`]s and, when there were no
//! errors, a [`CompiledPolicy`] that evaluates any [`Resource`] to a
//! [`ResourcePolicyExecution`].
//!
//! ## Key invariants
//!
//! - **Explicit catalogs**: every `input.<Property>` is bound against a
//!   [`ResourceDescriptor`]; nothing is looked up by reflection.
//! - **Implicit AND**: statements in a validate block must all hold. There is
//!   no OR operator.
//! - **Predicate iff no errors**: warnings never block compilation; any error
//!   does.
//! - **Faults are data**: a missing or mistyped property yields
//!   `ResourcePolicyExecution::Error`, not a panic or `Err`.

pub mod ast;
mod binder;
pub mod compiler;
pub mod context;
pub mod diagnostic;
pub mod engine;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod resource;
pub mod unit;

pub use compiler::PolicyCompiler;
pub use context::CompilationContext;
pub use diagnostic::{Diagnostic, DiagnosticCode, Severity, Span};
pub use engine::{
    CompiledPolicy, EvaluationFault, EvaluationStep, EvaluationTrace, ResourcePolicyExecution,
};
pub use error::PolicyError;
pub use resource::{
    DynamicResource, PropertyDescriptor, PropertyFormatter, PropertyType, PropertyValue, Resource,
    ResourceCatalog, ResourceDescriptor, ResourceIdentity,
};
pub use unit::CompilationUnit;
