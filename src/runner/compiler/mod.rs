//! Syntax tree to expression IR.
//!
//! [`lower_program`] resolves every identifier to a local slot, a captured
//! cell or a global property, and rewrites structured control flow into the
//! labels and loops of [`ir::Expr`].

mod classes;
pub mod ir;
mod lower;
mod lower_expr;
mod patterns;
mod scope;

pub use lower::lower_program;

#[cfg(test)]
mod tests {
    use super::ir::{Binding, Expr, FunctionKind, IrFunction};
    use super::lower_program;
    use crate::error::CompileErrorKind;
    use crate::parser::parse_program;

    fn lower(source: &str) -> IrFunction {
        let program = parse_program(source).unwrap();
        lower_program(&program, None).unwrap()
    }

    fn items(function: &IrFunction) -> &[Expr] {
        match &function.body {
            Expr::Block(items) => items,
            other => panic!("unexpected body {:?}", other),
        }
    }

    fn functions(expr: &Expr, out: &mut Vec<String>) {
        // Shallow walk over the shapes the tests below produce.
        match expr {
            Expr::Function(f) => {
                out.push(f.name.clone());
                functions(&f.body, out);
            }
            Expr::Block(items) => items.iter().for_each(|e| functions(e, out)),
            Expr::Scope { body, .. } | Expr::Return(body) => functions(body, out),
            Expr::Assign(_, value) => functions(value, out),
            Expr::GlobalDeclare { value: Some(value), .. } => functions(value, out),
            Expr::CreateClass { constructor, .. } => functions(constructor, out),
            _ => {}
        }
    }

    #[test]
    fn test_global_declarations() {
        let ir = lower("var a = 1; function f() { return a; } let b = 2;");
        assert_eq!(ir.kind, FunctionKind::Script);
        let declared: Vec<&str> = items(&ir)
            .iter()
            .filter_map(|e| match e {
                Expr::GlobalDeclare { name, .. } => Some(&**name),
                _ => None,
            })
            .collect();
        assert_eq!(declared, vec!["a", "f"]);
        assert!(ir.vars.iter().any(|v| v.name == "b"));
        assert!(!ir.vars.iter().any(|v| v.name == "a"));
    }

    #[test]
    fn test_completion_value_is_last_expression() {
        let ir = lower("1; 2;");
        match items(&ir).last() {
            Some(Expr::Var(Binding::Local(var))) => assert_eq!(ir.vars[*var as usize].name, "%completion"),
            other => panic!("unexpected tail {:?}", other),
        }
        let ir = lower("var x = 1;");
        assert!(matches!(items(&ir).last(), Some(Expr::Constant(_))));
    }

    #[test]
    fn test_function_body_mode_has_locals() {
        let program = parse_program("var t = a + b; return t;").unwrap();
        let ir = lower_program(&program, Some(&["a", "b"])).unwrap();
        assert_eq!(ir.arity, 2);
        let names: Vec<&str> = ir.vars.iter().map(|v| v.name.as_str()).collect();
        assert!(names.starts_with(&["a", "b", "t"]));
        assert!(!items(&ir).iter().any(|e| matches!(e, Expr::GlobalDeclare { .. })));
    }

    #[test]
    fn test_closure_captures() {
        let ir = lower("let n = 0; function inc() { n = n + 1; return n; }");
        let n = ir.vars.iter().position(|v| v.name == "n").unwrap();
        assert!(ir.vars[n].captured);
        let mut found = None;
        for item in items(&ir) {
            if let Expr::GlobalDeclare { value: Some(value), .. } = item {
                if let Expr::Function(f) = &**value {
                    found = Some(f.captures.clone());
                }
            }
        }
        assert_eq!(found, Some(vec![Binding::Local(n as u32)]));
    }

    #[test]
    fn test_function_names_and_arity() {
        let ir = lower("let f = function(a, b = 1, ...c) {}; let g = () => 0; class K { m() {} }");
        let mut names = Vec::new();
        for item in items(&ir) {
            functions(item, &mut names);
        }
        assert!(names.contains(&"f".to_string()));
        assert!(names.contains(&"g".to_string()));
        assert!(names.contains(&"K".to_string()));
        let program = parse_program("(function(a, b = 1, ...c) {})").unwrap();
        let ir = lower_program(&program, None).unwrap();
        let mut arity = None;
        fn find(expr: &Expr, arity: &mut Option<u32>) {
            match expr {
                Expr::Function(f) => *arity = Some(f.arity),
                Expr::Block(items) => items.iter().for_each(|e| find(e, arity)),
                Expr::Assign(_, value) => find(value, arity),
                _ => {}
            }
        }
        find(&ir.body, &mut arity);
        assert_eq!(arity, Some(1));
    }

    #[test]
    fn test_optional_chain_jumps_to_chain_end() {
        let ir = lower("a?.b.c");
        let text = format!("{:?}", ir.body);
        assert!(text.contains("Label("));
        assert!(text.contains("Goto("));
        assert!(text.contains("GlobalGet(\"a\")"));
    }

    #[test]
    fn test_with_statement_is_rejected() {
        let program = parse_program("with (o) { x; }").unwrap();
        let error = lower_program(&program, None).unwrap_err();
        assert_eq!(error.kind, CompileErrorKind::Compile);
        assert_eq!((error.line, error.column), (1, 1));
    }

    #[test]
    fn test_break_outside_loop_is_bind_error() {
        let program = parse_program("if (x) {\n  break;\n}").unwrap();
        let error = lower_program(&program, None).unwrap_err();
        assert_eq!(error.kind, CompileErrorKind::Bind);
        assert_eq!(error.line, 2);
        let program = parse_program("a: { continue a; }").unwrap();
        assert!(lower_program(&program, None).is_err());
    }

    #[test]
    fn test_const_assignment_throws() {
        let ir = lower("const c = 1; c = 2;");
        let throws = items(&ir).iter().any(|e| match e {
            Expr::Assign(_, value) => matches!(&**value, Expr::Block(inner) if matches!(inner.last(), Some(Expr::ThrowError(..)))),
            _ => false,
        });
        assert!(throws);
    }

    #[test]
    fn test_for_of_break_closes_iterator() {
        let ir = lower("for (const x of xs) { break; }");
        let text = format!("{:?}", ir.body);
        assert!(text.contains("IteratorClose"));
        assert!(text.contains("GetIterator"));
    }

    #[test]
    fn test_derived_constructor_returns_this() {
        let ir = lower("class A {} class B extends A { constructor() { super(); } }");
        let text = format!("{:?}", ir.body);
        assert!(text.contains("DerivedConstructor"));
        assert!(text.contains("SuperCall"));
        assert!(text.contains("DerivedResult"));
    }
}
