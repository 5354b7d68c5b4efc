use super::api::parse_program;
use super::ast::*;
use super::error::ParseError;
use super::lexer::Lexer;
use super::token::{Keyword, LexPosition, Punct, TokenKind};

fn tokens(source: &str) -> Vec<TokenKind> {
    let lexer = Lexer::new(source);
    let mut pos = LexPosition::start();
    let mut out = vec![];
    loop {
        let token = lexer.next_token(pos).unwrap();
        if token.kind == TokenKind::Eof {
            return out;
        }
        pos = token.next;
        out.push(token.kind);
    }
}

fn assert_number(source: &str, expected: f64) {
    match tokens(source).as_slice() {
        [TokenKind::Number(n)] => assert_eq!(*n, expected, "for input {}", source),
        other => panic!("expected a single number for {}, got {:?}", source, other),
    }
}

fn assert_parse(source: &str) -> ProgramData {
    match parse_program(source) {
        Ok(program) => program,
        Err(e) => panic!("failed to parse {:?}: {}", source, e),
    }
}

fn assert_parse_error(source: &str) -> ParseError {
    match parse_program(source) {
        Ok(_) => panic!("expected a parse error for {:?}", source),
        Err(e) => e,
    }
}

fn first_expression(program: &ProgramData) -> &ExpressionType {
    match &program.ast.statement(program.body()[0]).kind {
        StatementType::ExpressionStatement(e) => &program.ast.expression(*e).kind,
        other => panic!("expected an expression statement, got {:?}", other),
    }
}

#[test]
fn test_decimal_numbers() {
    assert_number("10", 10.0);
    assert_number("10.001", 10.001);
    assert_number(".5", 0.5);
    assert_number("1e3", 1000.0);
    assert_number("2.5E-1", 0.25);
    assert_number("1_000_000", 1_000_000.0);
}

#[test]
fn test_radix_numbers() {
    assert_number("0x1F", 31.0);
    assert_number("0o17", 15.0);
    assert_number("0b101", 5.0);
    assert_number("017", 15.0);
    assert_number("019", 19.0);
}

#[test]
fn test_invalid_numbers() {
    let lexer = Lexer::new("3in");
    assert!(lexer.next_token(LexPosition::start()).is_err());
    let lexer = Lexer::new("0x");
    assert!(lexer.next_token(LexPosition::start()).is_err());
    let lexer = Lexer::new("1__0");
    assert!(lexer.next_token(LexPosition::start()).is_err());
    let lexer = Lexer::new("10n");
    assert!(lexer.next_token(LexPosition::start()).is_err());
}

#[test]
fn test_string_escapes() {
    assert_eq!(
        tokens(r#"'a\nb' "\x41B\u{43}" '\u{1F600}'"#),
        vec![
            TokenKind::String("a\nb".into()),
            TokenKind::String("ABC".into()),
            TokenKind::String("\u{1F600}".into()),
        ]
    );
    assert_eq!(tokens(r"'😀'"), vec![TokenKind::String("\u{1F600}".into())]);
}

#[test]
fn test_unterminated_string_reports_position() {
    let lexer = Lexer::new("let a;\n  'abc");
    let mut pos = LexPosition::start();
    let error = loop {
        match lexer.next_token(pos) {
            Ok(token) => pos = token.next,
            Err(e) => break e,
        }
    };
    assert_eq!(error.line, 2);
    assert_eq!(error.column, 3);
    assert!(error.message.contains("unterminated"));
}

#[test]
fn test_invalid_escape() {
    let lexer = Lexer::new(r"'\x4'");
    assert!(lexer.next_token(LexPosition::start()).is_err());
}

#[test]
fn test_regex_versus_division() {
    assert_eq!(
        tokens("a / b / c"),
        vec![
            TokenKind::Identifier("a".into()),
            TokenKind::Punct(Punct::Slash),
            TokenKind::Identifier("b".into()),
            TokenKind::Punct(Punct::Slash),
            TokenKind::Identifier("c".into()),
        ]
    );
    assert_eq!(
        tokens("x = /a[/]b/gi"),
        vec![
            TokenKind::Identifier("x".into()),
            TokenKind::Punct(Punct::Assign),
            TokenKind::RegExp {
                pattern: "a[/]b".into(),
                flags: "gi".into()
            },
        ]
    );
    assert_eq!(
        tokens("(1) / 2"),
        vec![
            TokenKind::Punct(Punct::LeftParen),
            TokenKind::Number(1.0),
            TokenKind::Punct(Punct::RightParen),
            TokenKind::Punct(Punct::Slash),
            TokenKind::Number(2.0),
        ]
    );
}

#[test]
fn test_rescan_from_earlier_position() {
    let lexer = Lexer::new("return x");
    let first = lexer.next_token(LexPosition::start()).unwrap();
    assert_eq!(first.kind, TokenKind::Keyword(Keyword::Return));
    let again = lexer.next_token(LexPosition::start()).unwrap();
    assert_eq!(first, again);
}

#[test]
fn test_comments_and_newlines() {
    let lexer = Lexer::new("a /* x\n */ b // c\nd");
    let a = lexer.next_token(LexPosition::start()).unwrap();
    let b = lexer.next_token(a.next).unwrap();
    let d = lexer.next_token(b.next).unwrap();
    assert!(!a.newline_before);
    assert!(b.newline_before);
    assert!(d.newline_before);
    assert_eq!(d.line, 3);
}

#[test]
fn test_optional_chain_punctuator() {
    assert_eq!(
        tokens("a?.b"),
        vec![
            TokenKind::Identifier("a".into()),
            TokenKind::Punct(Punct::QuestionDot),
            TokenKind::Identifier("b".into()),
        ]
    );
    assert_eq!(
        tokens("a?.5:1"),
        vec![
            TokenKind::Identifier("a".into()),
            TokenKind::Punct(Punct::Question),
            TokenKind::Number(0.5),
            TokenKind::Punct(Punct::Colon),
            TokenKind::Number(1.0),
        ]
    );
}

#[test]
fn test_operator_precedence() {
    let program = assert_parse("1 + 2 * 3");
    match first_expression(&program) {
        ExpressionType::BinaryExpression {
            operator: BinaryOperator::Add,
            right,
            ..
        } => assert!(matches!(
            program.ast.expression(*right).kind,
            ExpressionType::BinaryExpression {
                operator: BinaryOperator::Multiply,
                ..
            }
        )),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_exponent_is_right_associative() {
    let program = assert_parse("2 ** 3 ** 2");
    match first_expression(&program) {
        ExpressionType::BinaryExpression {
            operator: BinaryOperator::Exponent,
            left,
            right,
        } => {
            assert!(matches!(
                program.ast.expression(*left).kind,
                ExpressionType::Literal(LiteralType::NumberLiteral(n)) if n == 2.0
            ));
            assert!(matches!(
                program.ast.expression(*right).kind,
                ExpressionType::BinaryExpression { .. }
            ));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_arrow_functions_versus_parenthesized() {
    let program = assert_parse("(a, b) => a + b");
    match first_expression(&program) {
        ExpressionType::FunctionExpression(f) => {
            let function = program.ast.function(*f);
            assert_eq!(function.form, FunctionForm::Arrow);
            assert_eq!(function.params.len(), 2);
            assert!(matches!(function.body, FunctionBody::Expression(_)));
        }
        other => panic!("unexpected {:?}", other),
    }
    let program = assert_parse("(a, b)");
    assert!(matches!(first_expression(&program), ExpressionType::SequenceExpression(_)));
    let program = assert_parse("x => { return x }");
    assert!(matches!(first_expression(&program), ExpressionType::FunctionExpression(_)));
    let program = assert_parse("async (x = 1, ...rest) => await x");
    match first_expression(&program) {
        ExpressionType::FunctionExpression(f) => {
            let function = program.ast.function(*f);
            assert!(function.is_async);
            assert!(function.rest.is_some());
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_abandoned_speculation_leaves_no_nodes() {
    let program = assert_parse("([a, b, c])");
    assert!(matches!(first_expression(&program), ExpressionType::ArrayExpression(_)));
    // The array, its three identifiers, the statement and the script.
    assert_eq!(program.ast.node_count(), 6);
}

#[test]
fn test_var_hoisting_collects_nested_declarations() {
    let program = assert_parse(
        "var a = 1; { var b; } if (x) { for (var i = 0;;) {} } function f() { var inner; } let c;",
    );
    let script = program.ast.function(program.script);
    let names: Vec<&str> = script.hoisted_vars.iter().map(|s| &**s).collect();
    assert_eq!(names, vec!["a", "b", "i"]);
}

#[test]
fn test_destructuring_declarations_and_assignment() {
    let program = assert_parse("let { a, b: [c, d = 2], ...rest } = obj; [x, y] = [y, x];");
    match &program.ast.statement(program.body()[0]).kind {
        StatementType::VariableDeclaration(data) => {
            let mut names = vec![];
            program.ast.bound_names(data.declarations[0].id, &mut names);
            let names: Vec<&str> = names.iter().map(|s| &**s).collect();
            assert_eq!(names, vec!["a", "c", "d", "rest"]);
        }
        other => panic!("unexpected {:?}", other),
    }
    match &program.ast.statement(program.body()[1]).kind {
        StatementType::ExpressionStatement(e) => match &program.ast.expression(*e).kind {
            ExpressionType::AssignmentExpression { left, .. } => assert!(matches!(
                program.ast.pattern(*left).kind,
                PatternType::ArrayPattern { .. }
            )),
            other => panic!("unexpected {:?}", other),
        },
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_object_shorthand_default_only_as_pattern() {
    assert_parse("({ a = 1 } = {})");
}

#[test]
fn test_automatic_semicolon_insertion() {
    let program = assert_parse("let a = 1\nlet b = 2\na\n++b");
    assert_eq!(program.body().len(), 4);
    let program = assert_parse("function f() { return\n1 }");
    match &program.ast.statement(program.body()[0]).kind {
        StatementType::FunctionDeclaration(f) => match &program.ast.function(*f).body {
            FunctionBody::Block(body) => {
                assert!(matches!(
                    program.ast.statement(body[0]).kind,
                    StatementType::ReturnStatement(None)
                ));
                assert_eq!(body.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        },
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_template_literals() {
    let program = assert_parse("`a${1 + 2}b${`c${d}`}e`");
    match first_expression(&program) {
        ExpressionType::TemplateLiteral { quasis, expressions } => {
            assert_eq!(quasis.len(), 3);
            assert_eq!(expressions.len(), 2);
            assert_eq!(quasis[2].cooked.as_deref(), Some("e"));
        }
        other => panic!("unexpected {:?}", other),
    }
    let program = assert_parse(r"tag`\unicode and \u{41}`");
    match first_expression(&program) {
        ExpressionType::TaggedTemplateExpression { quasis, .. } => {
            assert_eq!(quasis[0].cooked, None);
            assert_eq!(&*quasis[0].raw, r"\unicode and \u{41}");
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_parse_error(r"`\unicode`");
}

#[test]
fn test_classes() {
    let program = assert_parse(
        "class A extends B { constructor(x) { super(x); } get v() { return 1 } static make() { return new A() } *gen() {} }",
    );
    match &program.ast.statement(program.body()[0]).kind {
        StatementType::ClassDeclaration(class) => {
            assert_eq!(class.id.as_deref(), Some("A"));
            assert!(class.super_class.is_some());
            let constructor = program.ast.function(class.constructor.unwrap());
            assert_eq!(constructor.form, FunctionForm::ClassConstructor { derived: true });
            assert_eq!(class.body.len(), 3);
            assert_eq!(class.body[0].kind, MethodDefinitionKind::Get);
            assert!(class.body[1].static_flag);
            assert!(program.ast.function(class.body[2].value).generator);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_super_outside_methods_is_rejected() {
    assert_parse_error("function f() { super.x }");
    assert_parse_error("class A { constructor() { super() } }");
}

#[test]
fn test_optional_chaining() {
    let program = assert_parse("a?.b.c(1)?.[d]");
    assert!(matches!(first_expression(&program), ExpressionType::OptionalChain(_)));
}

#[test]
fn test_for_statements() {
    let program = assert_parse("for (const [k, v] of entries) {} for (k in o) ; for (let i = 0, j = 1; i < j; i++) {}");
    let kinds: Vec<&StatementType> = program
        .body()
        .iter()
        .map(|s| &program.ast.statement(*s).kind)
        .collect();
    assert!(matches!(kinds[0], StatementType::ForOfStatement(_)));
    assert!(matches!(kinds[1], StatementType::ForInStatement(_)));
    assert!(matches!(kinds[2], StatementType::ForStatement { .. }));
}

#[test]
fn test_labels_and_jumps() {
    let program = assert_parse("outer: for (;;) { inner: while (x) { continue outer; break inner; } }");
    assert!(matches!(
        program.ast.statement(program.body()[0]).kind,
        StatementType::LabeledStatement { .. }
    ));
}

#[test]
fn test_generators_and_yield() {
    let program = assert_parse("function* g() { const x = yield 1; yield* other(); yield }");
    match &program.ast.statement(program.body()[0]).kind {
        StatementType::FunctionDeclaration(f) => assert!(program.ast.function(*f).generator),
        other => panic!("unexpected {:?}", other),
    }
    // Outside generators `yield` is an ordinary identifier.
    assert_parse("var yield = 1;");
    assert_parse_error("function* g() { var yield; }");
}

#[test]
fn test_errors_carry_expected_and_found() {
    match assert_parse_error("if (a { }") {
        ParseError::Unexpected {
            expected,
            found,
            line,
            column,
        } => {
            assert_eq!(expected, "')'");
            assert_eq!(found, "'{'");
            assert_eq!((line, column), (1, 7));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(assert_parse_error("var s = 'abc"), ParseError::Lex(_)));
    assert_parse_error("const a;");
    assert_parse_error("throw\nx");
    assert_parse_error("import x from 'y'");
    assert_parse_error("a + ");
    assert_parse_error("1 = 2");
}

#[test]
fn test_new_and_member_access() {
    let program = assert_parse("new a.b.C(1).d");
    match first_expression(&program) {
        ExpressionType::MemberExpression { object, .. } => assert!(matches!(
            program.ast.expression(*object).kind,
            ExpressionType::NewExpression { .. }
        )),
        other => panic!("unexpected {:?}", other),
    }
    let program = assert_parse("new X");
    match first_expression(&program) {
        ExpressionType::NewExpression { arguments, .. } => assert!(arguments.is_empty()),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_keywords_as_property_names() {
    assert_parse("o.default = { if: 1, class: 2, 3: 'x', 'y z': 4, [k]: 5 }.if");
}
