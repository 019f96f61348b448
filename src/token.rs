use logos::Logos;

/// Tokens produced by lexing a Hydra sketch.
///
/// Only the JavaScript subset that live-coded sketches actually use is
/// recognized. Comments are real tokens so the lexer can report their ranges;
/// the parser never sees them.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    // ── Comments ───────────────────────────────────────────────────────
    #[regex(r"//[^\n]*")]
    LineComment,
    #[token("/*", block_comment)]
    BlockComment,

    // ── Keywords ───────────────────────────────────────────────────────
    #[token("let")]
    Let,
    #[token("const")]
    Const,
    #[token("var")]
    Var,
    #[token("return")]
    Return,
    #[token("typeof")]
    Typeof,

    // ── Literals ───────────────────────────────────────────────────────
    #[regex(r"([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"0[xX][0-9a-fA-F]+", |lex| u64::from_str_radix(&lex.slice()[2..], 16).ok().map(|v| v as f64))]
    Number(f64),

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[regex(r"'([^'\\\n]|\\.)*'")]
    Str,

    #[regex(r"`([^`\\]|\\.)*`")]
    Template,

    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*", |lex| lex.slice().to_string())]
    Ident(String),

    // ── Operators ──────────────────────────────────────────────────────
    #[token("=>")]
    Arrow,
    #[token("=")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("==")]
    EqEq,
    #[token("===")]
    EqEqEq,
    #[token("!=")]
    NotEq,
    #[token("!==")]
    NotEqEq,
    #[token("<")]
    Less,
    #[token("<=")]
    LessEq,
    #[token(">")]
    Greater,
    #[token(">=")]
    GreaterEq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("**")]
    StarStar,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("!")]
    Bang,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("??")]
    Nullish,
    #[token("?")]
    Question,
    #[token("?.")]
    OptionalDot,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,
    #[token("...")]
    Spread,

    // ── Delimiters ─────────────────────────────────────────────────────
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
}

impl Token {
    /// Human-readable name for error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Token::LineComment | Token::BlockComment => "comment",
            Token::Let => "'let'",
            Token::Const => "'const'",
            Token::Var => "'var'",
            Token::Return => "'return'",
            Token::Typeof => "'typeof'",
            Token::Number(_) => "number",
            Token::Str => "string",
            Token::Template => "template string",
            Token::Ident(_) => "identifier",
            Token::Arrow => "'=>'",
            Token::Assign => "'='",
            Token::PlusAssign => "'+='",
            Token::MinusAssign => "'-='",
            Token::StarAssign => "'*='",
            Token::SlashAssign => "'/='",
            Token::EqEq => "'=='",
            Token::EqEqEq => "'==='",
            Token::NotEq => "'!='",
            Token::NotEqEq => "'!=='",
            Token::Less => "'<'",
            Token::LessEq => "'<='",
            Token::Greater => "'>'",
            Token::GreaterEq => "'>='",
            Token::Plus => "'+'",
            Token::Minus => "'-'",
            Token::Star => "'*'",
            Token::StarStar => "'**'",
            Token::Slash => "'/'",
            Token::Percent => "'%'",
            Token::PlusPlus => "'++'",
            Token::MinusMinus => "'--'",
            Token::Bang => "'!'",
            Token::AndAnd => "'&&'",
            Token::OrOr => "'||'",
            Token::Nullish => "'??'",
            Token::Question => "'?'",
            Token::OptionalDot => "'?.'",
            Token::Colon => "':'",
            Token::Comma => "','",
            Token::Semicolon => "';'",
            Token::Dot => "'.'",
            Token::Spread => "'...'",
            Token::LParen => "'('",
            Token::RParen => "')'",
            Token::LBracket => "'['",
            Token::RBracket => "']'",
            Token::LBrace => "'{'",
            Token::RBrace => "'}'",
        }
    }
}

/// Consume through the closing `*/`. An unclosed comment swallows the rest
/// of the input and lexes as an error.
fn block_comment(lex: &mut logos::Lexer<Token>) -> bool {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            true
        }
        None => {
            lex.bump(lex.remainder().len());
            false
        }
    }
}

/// A token with its source location (byte offset span).
#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub span: std::ops::Range<usize>,
}
