pub mod analysis;
pub mod antiunify;
pub mod ast;
pub mod config;
pub mod detect;
pub mod diagnostics;
pub mod errors;
pub mod fix;
pub mod matchers;
pub mod metrics;
pub mod span;

pub use antiunify::{antiunify, antiunify_nodes, Aunified, AunifyVar, SubValue};
pub use ast::build::Builder;
pub use ast::{Node, NodeId, NodeKind, Tree};
pub use config::CheckerConfig;
pub use detect::check_module;
pub use diagnostics::{
    CollectingDiagnosticHandler, ConsoleDiagnosticHandler, Diagnostic, DiagnosticHandler,
    DiagnosticKind,
};
pub use errors::Error;
pub use span::Span;
