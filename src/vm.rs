// ABOUTME: Embedding surface: construct a VM, run source, inspect tokens/AST/state

use crate::ast::Program;
use crate::builtins::{Arity, BuiltinTable, HostBuiltin};
use crate::config::Config;
use crate::error::{ErrorInfo, PyrlError};
use crate::eval::{Evaluator, TestSummary};
use crate::lexer::tokenize as lex;
use crate::parser::parse as parse_program;
use crate::token::Token;
use std::rc::Rc;

/// A lexed token rendered for the embedding surface: `kind_name()` plus a
/// textual value, independent of the internal `TokenKind` representation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TokenInfo {
    pub kind: &'static str,
    pub value: String,
    pub line: usize,
    pub col: usize,
}

/// The result of `execute()`: whether it succeeded, the last expression's
/// value rendered as a string, anything written via `print`, and structured
/// error detail on failure.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExecutionResult {
    pub ok: bool,
    pub value: Option<String>,
    pub stdout: String,
    pub error: Option<ErrorInfo>,
}

/// A host-embeddable instance of the runtime. Wraps an `Evaluator` and
/// exposes the operation set a caller needs without touching the evaluator
/// or AST types directly.
pub struct Vm {
    evaluator: Evaluator,
}

pub fn create_vm() -> Vm {
    Vm::new()
}

impl Vm {
    pub fn new() -> Self {
        Vm::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Vm { evaluator: Evaluator::new(Rc::new(BuiltinTable::new()), config) }
    }

    pub fn execute(&mut self, source: &str) -> ExecutionResult {
        let program = match parse_program(source) {
            Ok(p) => p,
            Err(e) => {
                return ExecutionResult { ok: false, value: None, stdout: String::new(), error: Some(e.to_info()) };
            }
        };
        match self.evaluator.run_program(&program) {
            Ok(v) => ExecutionResult {
                ok: true,
                value: Some(v.to_string()),
                stdout: self.evaluator.take_stdout(),
                error: None,
            },
            Err(e) => ExecutionResult {
                ok: false,
                value: None,
                stdout: self.evaluator.take_stdout(),
                error: Some(e.to_info()),
            },
        }
    }

    pub fn tokenize(&self, source: &str) -> Result<Vec<TokenInfo>, PyrlError> {
        let tokens = lex(source)?;
        Ok(tokens.iter().map(render_token).collect())
    }

    pub fn parse(&self, source: &str) -> Result<Program, PyrlError> {
        parse_program(source)
    }

    /// Discards user globals and registered tests; built-ins (including any
    /// host-registered via `register_builtin`) survive a reset.
    pub fn reset(&mut self) {
        self.evaluator.reset_globals();
    }

    pub fn get_variables(&self) -> Vec<(String, String)> {
        self.evaluator.snapshot_variables()
    }

    pub fn register_builtin(&self, name: impl Into<String>, arity: Arity, handler: HostBuiltin) {
        self.evaluator.builtins().register_host(name, arity, handler);
    }

    pub fn run_tests(&self) -> TestSummary {
        self.evaluator.run_tests()
    }
}

impl Default for Vm {
    fn default() -> Self {
        Vm::new()
    }
}

fn render_token(t: &Token) -> TokenInfo {
    use crate::token::TokenKind;
    let value = match &t.kind {
        TokenKind::Identifier(s) => s.clone(),
        TokenKind::ScalarVar(s) => format!("${}", s),
        TokenKind::ArrayVar(s) => format!("@{}", s),
        TokenKind::HashVar(s) => format!("%{}", s),
        TokenKind::FuncVar(s) => format!("&{}", s),
        TokenKind::Int(n) => n.to_string(),
        TokenKind::Float(n) => n.to_string(),
        TokenKind::Str(s) | TokenKind::RawStr(s) => s.clone(),
        TokenKind::Regex(_) => String::new(),
        TokenKind::Keyword(_) | TokenKind::Punct(_) | TokenKind::Operator(_) => String::new(),
        TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent | TokenKind::Eof => String::new(),
    };
    TokenInfo { kind: t.kind_name(), value, line: t.span.line, col: t.span.col }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::Arity;

    #[test]
    fn test_execute_reports_stdout_and_value() {
        let mut vm = create_vm();
        let result = vm.execute("print(1 + 2)\n");
        assert!(result.ok);
        assert_eq!(result.stdout, "3\n");
    }

    #[test]
    fn test_execute_reports_error_info() {
        let mut vm = create_vm();
        let result = vm.execute("print($missing)\n");
        assert!(!result.ok);
        let err = result.error.unwrap();
        assert_eq!(err.kind, "NameError");
    }

    #[test]
    fn test_tokenize_renders_scalar_var() {
        let vm = create_vm();
        let tokens = vm.tokenize("$x = 1\n").unwrap();
        assert_eq!(tokens[0].kind, "scalar-var");
        assert_eq!(tokens[0].value, "$x");
    }

    #[test]
    fn test_reset_clears_globals_but_keeps_builtins() {
        let mut vm = create_vm();
        vm.execute("$x = 5\n");
        vm.reset();
        let result = vm.execute("print($x)\n");
        assert!(!result.ok);
        let ok_result = vm.execute("print(len(\"ab\"))\n");
        assert!(ok_result.ok);
    }

    #[test]
    fn test_register_builtin_is_callable_after_registration() {
        let vm = create_vm();
        vm.register_builtin("triple", Arity::Fixed(1), Rc::new(|args, _span| {
            Ok(crate::value::Value::Int(match &args[0] {
                crate::value::Value::Int(n) => n * 3,
                _ => 0,
            }))
        }));
        let mut vm = vm;
        let result = vm.execute("print(triple(4))\n");
        assert!(result.ok);
        assert_eq!(result.stdout, "12\n");
    }
}
