//! Parser tests through the public API, on whole programs rather than
//! single constructs.

extern crate kite;

use kite::parser::ast::*;
use kite::parser::error::ParseError;
use kite::parser::parse_program;

fn parse(source: &str) -> ProgramData {
    parse_program(source).unwrap_or_else(|e| panic!("failed to parse {:?}: {}", source, e))
}

fn parse_error(source: &str) -> ParseError {
    match parse_program(source) {
        Ok(_) => panic!("expected a parse error for {:?}", source),
        Err(e) => e,
    }
}

fn statement_kinds(program: &ProgramData) -> Vec<&'static str> {
    program
        .body()
        .iter()
        .map(|id| match &program.ast.statement(*id).kind {
            StatementType::ExpressionStatement(_) => "expression",
            StatementType::BlockStatement(_) => "block",
            StatementType::EmptyStatement => "empty",
            StatementType::VariableDeclaration(_) => "variable",
            StatementType::FunctionDeclaration(_) => "function",
            StatementType::ClassDeclaration(_) => "class",
            StatementType::IfStatement { .. } => "if",
            StatementType::ForStatement { .. } => "for",
            StatementType::ForOfStatement(_) => "for-of",
            StatementType::ForInStatement(_) => "for-in",
            StatementType::WhileStatement { .. } => "while",
            StatementType::ReturnStatement(_) => "return",
            StatementType::TryStatement { .. } => "try",
            StatementType::SwitchStatement { .. } => "switch",
            StatementType::LabeledStatement { .. } => "label",
            _ => "other",
        })
        .collect()
}

// ============================================================================
// Whole programs
// ============================================================================

mod program_tests {
    use super::*;

    #[test]
    fn test_mixed_program() {
        let program = parse(
            "
            'use strict';
            const limit = 10;
            function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); }
            class Point { constructor(x, y) { this.x = x; this.y = y; } get norm() { return this.x * this.x; } }
            for (let i = 0; i < limit; i++) { if (i % 2) continue; }
            for (const p of [new Point(1, 2)]) {}
            outer: while (true) { break outer; }
            try { fib(3); } catch ({ message }) {} finally {}
            switch (limit) { case 1: break; default: }
            ",
        );
        assert_eq!(
            statement_kinds(&program),
            vec!["expression", "variable", "function", "class", "for", "for-of", "label", "try", "switch"]
        );
    }

    #[test]
    fn test_top_level_return_is_allowed() {
        let program = parse("let a = 1; { let a = 2; } return a;");
        assert_eq!(statement_kinds(&program), vec!["variable", "block", "return"]);
    }

    #[test]
    fn test_script_function_collects_hoisted_vars() {
        let program = parse("var a; for (var i in o) { var b; } function f() { var c; }");
        let script = program.ast.function(program.script);
        assert_eq!(script.form, FunctionForm::Script);
        let mut names: Vec<&str> = script.hoisted_vars.iter().map(|s| &**s).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["a", "b", "i"]);
    }

    #[test]
    fn test_function_shapes() {
        let program = parse("async function* g(a, [b, c] = [], ...rest) { yield await a; }");
        match &program.ast.statement(program.body()[0]).kind {
            StatementType::FunctionDeclaration(f) => {
                let f = program.ast.function(*f);
                assert_eq!(f.id.as_deref(), Some("g"));
                assert!(f.generator);
                assert!(f.is_async);
                assert_eq!(f.params.len(), 2);
                assert!(f.rest.is_some());
                assert!(!f.has_simple_params(&program.ast));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_class_members() {
        let program = parse("class B extends A { constructor() { super(); } static make() {} set v(x) {} }");
        match &program.ast.statement(program.body()[0]).kind {
            StatementType::ClassDeclaration(class) => {
                assert_eq!(class.id.as_deref(), Some("B"));
                assert!(class.super_class.is_some());
                let constructor = class.constructor.map(|c| program.ast.function(c).form);
                assert_eq!(constructor, Some(FunctionForm::ClassConstructor { derived: true }));
                assert_eq!(class.body.len(), 2);
                assert!(class.body[0].static_flag);
                assert_eq!(class.body[1].kind, MethodDefinitionKind::Set);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_node_positions() {
        let program = parse("let a = 1;\n  foo(a);");
        let second = program.ast.statement(program.body()[1]);
        assert_eq!(second.meta.line, 2);
        assert_eq!(second.meta.column, 3);
    }
}

// ============================================================================
// Errors
// ============================================================================

mod error_tests {
    use super::*;

    #[test]
    fn test_error_position_is_first_offending_token() {
        let error = parse_error("let ok = 1;\nlet bad = ;");
        assert_eq!(error.line(), 2);
        assert_eq!(error.column(), 11);
    }

    #[test]
    fn test_lex_errors_surface_as_parse_errors() {
        assert!(matches!(parse_error("let s = \"open"), ParseError::Lex(_)));
        assert!(matches!(parse_error("0b102"), ParseError::Lex(_)));
    }

    #[test]
    fn test_rejected_programs() {
        for source in [
            "let enum = 1;",
            "if (a) else b",
            "a => { return; } => 1",
            "for (let x of a, b) {}",
            "var o = { a: 1 b: 2 };",
            "x = super.y",
            "function* g() { yield = 1; }",
        ] {
            parse_error(source);
        }
    }

    #[test]
    fn test_error_messages_name_expected_token() {
        let error = parse_error("while (x {}");
        let text = error.to_string();
        assert!(text.contains("expected ')'"), "{}", text);
        assert!(text.ends_with("(1:10)"), "{}", text);
    }
}
