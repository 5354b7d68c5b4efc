use std::fmt;
use std::sync::Arc;

/// Where the lexer resumes. Positions are plain values, so the parser can
/// rewind to any position it has seen and scan again.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LexPosition {
    pub offset: usize,
    pub line: u32,
    pub column: u32,
    /// Whether a `/` here starts a regular expression rather than a division.
    pub regex_allowed: bool,
}

impl LexPosition {
    pub fn start() -> Self {
        LexPosition {
            offset: 0,
            line: 1,
            column: 1,
            regex_allowed: true,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Keyword {
    Break,
    Case,
    Catch,
    Class,
    Const,
    Continue,
    Debugger,
    Default,
    Delete,
    Do,
    Else,
    Export,
    Extends,
    False,
    Finally,
    For,
    Function,
    If,
    Import,
    In,
    InstanceOf,
    New,
    Null,
    Return,
    Super,
    Switch,
    This,
    Throw,
    True,
    Try,
    TypeOf,
    Var,
    Void,
    While,
    With,
}

impl Keyword {
    pub fn from_str(word: &str) -> Option<Keyword> {
        Some(match word {
            "break" => Keyword::Break,
            "case" => Keyword::Case,
            "catch" => Keyword::Catch,
            "class" => Keyword::Class,
            "const" => Keyword::Const,
            "continue" => Keyword::Continue,
            "debugger" => Keyword::Debugger,
            "default" => Keyword::Default,
            "delete" => Keyword::Delete,
            "do" => Keyword::Do,
            "else" => Keyword::Else,
            "export" => Keyword::Export,
            "extends" => Keyword::Extends,
            "false" => Keyword::False,
            "finally" => Keyword::Finally,
            "for" => Keyword::For,
            "function" => Keyword::Function,
            "if" => Keyword::If,
            "import" => Keyword::Import,
            "in" => Keyword::In,
            "instanceof" => Keyword::InstanceOf,
            "new" => Keyword::New,
            "null" => Keyword::Null,
            "return" => Keyword::Return,
            "super" => Keyword::Super,
            "switch" => Keyword::Switch,
            "this" => Keyword::This,
            "throw" => Keyword::Throw,
            "true" => Keyword::True,
            "try" => Keyword::Try,
            "typeof" => Keyword::TypeOf,
            "var" => Keyword::Var,
            "void" => Keyword::Void,
            "while" => Keyword::While,
            "with" => Keyword::With,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Break => "break",
            Keyword::Case => "case",
            Keyword::Catch => "catch",
            Keyword::Class => "class",
            Keyword::Const => "const",
            Keyword::Continue => "continue",
            Keyword::Debugger => "debugger",
            Keyword::Default => "default",
            Keyword::Delete => "delete",
            Keyword::Do => "do",
            Keyword::Else => "else",
            Keyword::Export => "export",
            Keyword::Extends => "extends",
            Keyword::False => "false",
            Keyword::Finally => "finally",
            Keyword::For => "for",
            Keyword::Function => "function",
            Keyword::If => "if",
            Keyword::Import => "import",
            Keyword::In => "in",
            Keyword::InstanceOf => "instanceof",
            Keyword::New => "new",
            Keyword::Null => "null",
            Keyword::Return => "return",
            Keyword::Super => "super",
            Keyword::Switch => "switch",
            Keyword::This => "this",
            Keyword::Throw => "throw",
            Keyword::True => "true",
            Keyword::Try => "try",
            Keyword::TypeOf => "typeof",
            Keyword::Var => "var",
            Keyword::Void => "void",
            Keyword::While => "while",
            Keyword::With => "with",
        }
    }

    /// Keywords after which an expression, and so a regular expression, may start.
    fn precedes_expression(&self) -> bool {
        !matches!(
            self,
            Keyword::This | Keyword::Super | Keyword::Null | Keyword::True | Keyword::False
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Punct {
    LeftBrace,
    RightBrace,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Dot,
    Ellipsis,
    Semicolon,
    Comma,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    ShiftLeft,
    ShiftRight,
    UnsignedShiftRight,
    Amp,
    Pipe,
    Caret,
    Bang,
    Tilde,
    AmpAmp,
    PipePipe,
    QuestionQuestion,
    Question,
    QuestionDot,
    Colon,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    StarStarAssign,
    SlashAssign,
    PercentAssign,
    ShiftLeftAssign,
    ShiftRightAssign,
    UnsignedShiftRightAssign,
    AmpAssign,
    PipeAssign,
    CaretAssign,
    AmpAmpAssign,
    PipePipeAssign,
    QuestionQuestionAssign,
    Arrow,
}

impl Punct {
    /// Longest first, so the lexer can take the first match.
    pub(crate) const BY_LENGTH: &'static [(&'static str, Punct)] = &[
        (">>>=", Punct::UnsignedShiftRightAssign),
        ("...", Punct::Ellipsis),
        ("===", Punct::StrictEqual),
        ("!==", Punct::StrictNotEqual),
        ("**=", Punct::StarStarAssign),
        ("<<=", Punct::ShiftLeftAssign),
        (">>=", Punct::ShiftRightAssign),
        (">>>", Punct::UnsignedShiftRight),
        ("&&=", Punct::AmpAmpAssign),
        ("||=", Punct::PipePipeAssign),
        ("??=", Punct::QuestionQuestionAssign),
        ("=>", Punct::Arrow),
        ("==", Punct::Equal),
        ("!=", Punct::NotEqual),
        ("<=", Punct::LessEqual),
        (">=", Punct::GreaterEqual),
        ("**", Punct::StarStar),
        ("++", Punct::PlusPlus),
        ("--", Punct::MinusMinus),
        ("<<", Punct::ShiftLeft),
        (">>", Punct::ShiftRight),
        ("&&", Punct::AmpAmp),
        ("||", Punct::PipePipe),
        ("??", Punct::QuestionQuestion),
        ("?.", Punct::QuestionDot),
        ("+=", Punct::PlusAssign),
        ("-=", Punct::MinusAssign),
        ("*=", Punct::StarAssign),
        ("/=", Punct::SlashAssign),
        ("%=", Punct::PercentAssign),
        ("&=", Punct::AmpAssign),
        ("|=", Punct::PipeAssign),
        ("^=", Punct::CaretAssign),
        ("{", Punct::LeftBrace),
        ("}", Punct::RightBrace),
        ("(", Punct::LeftParen),
        (")", Punct::RightParen),
        ("[", Punct::LeftBracket),
        ("]", Punct::RightBracket),
        (".", Punct::Dot),
        (";", Punct::Semicolon),
        (",", Punct::Comma),
        ("<", Punct::Less),
        (">", Punct::Greater),
        ("+", Punct::Plus),
        ("-", Punct::Minus),
        ("*", Punct::Star),
        ("/", Punct::Slash),
        ("%", Punct::Percent),
        ("&", Punct::Amp),
        ("|", Punct::Pipe),
        ("^", Punct::Caret),
        ("!", Punct::Bang),
        ("~", Punct::Tilde),
        ("?", Punct::Question),
        (":", Punct::Colon),
        ("=", Punct::Assign),
    ];

    pub fn as_str(&self) -> &'static str {
        Punct::BY_LENGTH
            .iter()
            .find(|(_, p)| p == self)
            .map(|(s, _)| *s)
            .unwrap_or("?")
    }

    /// Closers after which an operand has just ended.
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            Punct::RightParen | Punct::RightBracket | Punct::RightBrace | Punct::PlusPlus | Punct::MinusMinus
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Identifier(Arc<str>),
    Keyword(Keyword),
    Punct(Punct),
    Number(f64),
    String(Arc<str>),
    /// A template chunk ending in `` ` `` (tail) or `${`. `cooked` is `None` for invalid escapes.
    Template {
        cooked: Option<Arc<str>>,
        raw: Arc<str>,
        tail: bool,
    },
    RegExp {
        pattern: Arc<str>,
        flags: Arc<str>,
    },
    Eof,
}

impl TokenKind {
    /// Whether a `/` following this token starts a regular expression.
    pub(crate) fn allows_regex_after(&self) -> bool {
        match self {
            TokenKind::Identifier(_)
            | TokenKind::Number(_)
            | TokenKind::String(_)
            | TokenKind::RegExp { .. } => false,
            TokenKind::Template { tail, .. } => !tail,
            TokenKind::Keyword(k) => k.precedes_expression(),
            TokenKind::Punct(p) => !p.ends_operand(),
            TokenKind::Eof => true,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier(name) => write!(f, "identifier '{}'", name),
            TokenKind::Keyword(k) => write!(f, "'{}'", k.as_str()),
            TokenKind::Punct(p) => write!(f, "'{}'", p.as_str()),
            TokenKind::Number(n) => write!(f, "number {}", n),
            TokenKind::String(_) => write!(f, "string literal"),
            TokenKind::Template { .. } => write!(f, "template literal"),
            TokenKind::RegExp { .. } => write!(f, "regular expression"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
    /// A line terminator occurs between the previous token and this one.
    pub newline_before: bool,
    /// Position right after this token.
    pub next: LexPosition,
}

impl Token {
    pub fn is_punct(&self, p: Punct) -> bool {
        self.kind == TokenKind::Punct(p)
    }

    pub fn is_keyword(&self, k: Keyword) -> bool {
        self.kind == TokenKind::Keyword(k)
    }

    /// An identifier token spelled `word` (contextual keywords like `of` or `async`).
    pub fn is_word(&self, word: &str) -> bool {
        matches!(&self.kind, TokenKind::Identifier(name) if &**name == word)
    }
}
