use std::ops::Range;

use logos::Logos;

use crate::error::{ParseError, Result};
use crate::token::{Spanned, Token};

/// Output of [`lex`]: significant tokens plus the byte ranges of comments.
#[derive(Debug, Clone, Default)]
pub struct Lexed {
    pub tokens: Vec<Spanned>,
    pub comments: Vec<Range<usize>>,
}

/// Tokenize a sketch into spanned tokens, setting comments aside.
pub fn lex(source: &str) -> Result<Lexed> {
    let mut lexed = Lexed::default();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(Token::LineComment | Token::BlockComment) => lexed.comments.push(span),
            Ok(token) => lexed.tokens.push(Spanned { token, span }),
            Err(()) => {
                return Err(ParseError::unrecognized(&source[span.clone()], span));
            }
        }
    }

    Ok(lexed)
}
