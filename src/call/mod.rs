// ABOUTME: Call module — grammar, validation, bundling, fingerprinting, and repair of call text.
// ABOUTME: Everything here is synchronous except repair, which round-trips to a model.

pub mod args;
pub mod bundle;
pub mod fingerprint;
pub mod parse;
pub mod repair;
pub mod validate;

pub use args::CallArgs;
pub use bundle::split_bundle;
pub use fingerprint::{DuplicateFilter, FilterDecision, ToolCallFingerprint};
pub use parse::{Arg, CallExpr, Expr, Statement, parse_program};
pub use repair::{CallRepairer, extract_call_span};
pub use validate::{parse_single_call, strip_code_fence, validate_call};
