//! Source analysis: numeric literal sites and the full analysis pass.
//!
//! Sites are the number literals of the parsed [`Program`], so digits inside
//! strings, comments and identifiers such as `o0` never become controls, and
//! every site has exactly the span the formatter splices.

use std::collections::BTreeMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::ast::{NumberLiteral, Program};
use crate::classifier::{Classifier, ParameterDescriptor};
use crate::error::Result;
use crate::formatter::{self, Replacement, ValueMap};
use crate::groups::{self, ParameterGroup};
use crate::lexer::{self, Lexed};
use crate::parser;
use crate::token::Spanned;

/// Zero-based line/column; columns count chars, not bytes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Position reached after writing `text` starting here.
    pub fn advanced_by(self, text: &str) -> Position {
        let newlines = text.matches('\n').count() as u32;
        if newlines == 0 {
            Position::new(self.line, self.column + text.chars().count() as u32)
        } else {
            let tail = text.rsplit('\n').next().unwrap_or("");
            Position::new(self.line + newlines, tail.chars().count() as u32)
        }
    }
}

/// The document span currently considered live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalRange {
    pub start: Position,
    pub end: Position,
}

impl EvalRange {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Range that exactly covers `text` placed at `start`.
    pub fn covering(start: Position, text: &str) -> Self {
        Self::new(start, start.advanced_by(text))
    }

    /// Whether a literal spanning `[start, end)` is visible. Both boundaries
    /// are exclusive for the literal's start: one beginning exactly at
    /// `self.start` or at `self.end` is left out, as is one running past
    /// `self.end`.
    pub fn admits(&self, start: Position, end: Position) -> bool {
        start > self.start && start < self.end && end <= self.end
    }
}

/// An evaluated block of text and where it sits in the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceBlock {
    pub text: String,
    pub range: EvalRange,
}

impl SourceBlock {
    pub fn new(text: impl Into<String>, start: Position) -> Self {
        let text = text.into();
        let range = EvalRange::covering(start, &text);
        Self { text, range }
    }

    /// A whole document starting at line 0, column 0.
    pub fn document(text: impl Into<String>) -> Self {
        Self::new(text, Position::default())
    }

    /// Document position of a byte offset into `text`.
    pub fn position_of(&self, offset: usize) -> Position {
        let offset = floor_char_boundary(&self.text, offset.min(self.text.len()));
        self.range.start.advanced_by(&self.text[..offset])
    }
}

/// Byte offset of `pos` in a document whose first char is at 0:0. Columns
/// past the end of a line clamp to the line end.
pub fn byte_offset(text: &str, pos: Position) -> usize {
    let mut line_start = 0;
    for _ in 0..pos.line {
        match text[line_start..].find('\n') {
            Some(nl) => line_start += nl + 1,
            None => return text.len(),
        }
    }
    let line_end = text[line_start..]
        .find('\n')
        .map_or(text.len(), |nl| line_start + nl);
    text[line_start..line_end]
        .char_indices()
        .nth(pos.column as usize)
        .map_or(line_end, |(i, _)| line_start + i)
}

fn floor_char_boundary(text: &str, mut offset: usize) -> usize {
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// One numeric literal in a block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericLiteralSite {
    /// Literal text as written, sign included.
    pub raw: String,
    pub value: f64,
    /// Document line of the first character.
    pub line: u32,
    /// Document column of the first character.
    pub column: u32,
    pub byte_len: usize,
    /// Byte offset into the block text.
    pub offset: usize,
}

impl NumericLiteralSite {
    pub fn span(&self) -> Range<usize> {
        self.offset..self.offset + self.byte_len
    }
}

/// Numeric literals of `block` visible inside `range`, ordered by offset.
pub fn find_numeric_literals(
    block: &SourceBlock,
    range: &EvalRange,
) -> Result<Vec<NumericLiteralSite>> {
    let program = parser::parse(&block.text)?;
    let literals = program.number_literals();
    Ok(visible_sites(block, &literals, Some(range))
        .into_iter()
        .map(|(_, site)| site)
        .collect())
}

/// Sites for the literals `filter` admits, each paired with its literal
/// ordinal.
fn visible_sites(
    block: &SourceBlock,
    literals: &[NumberLiteral],
    filter: Option<&EvalRange>,
) -> Vec<(usize, NumericLiteralSite)> {
    literals
        .iter()
        .enumerate()
        .filter_map(|(index, literal)| {
            let start = block.position_of(literal.span.start);
            let end = block.position_of(literal.span.end);
            if filter.is_some_and(|range| !range.admits(start, end)) {
                return None;
            }
            let site = NumericLiteralSite {
                raw: block.text[literal.span.clone()].to_string(),
                value: literal.value,
                line: start.line,
                column: start.column,
                byte_len: literal.span.len(),
                offset: literal.span.start,
            };
            Some((index, site))
        })
        .collect()
}

/// The product of one analysis pass.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub block: SourceBlock,
    /// The range sites were filtered against; the block's own range when
    /// every literal was kept.
    pub range: EvalRange,
    pub program: Program,
    pub tokens: Vec<Spanned>,
    pub sites: Vec<NumericLiteralSite>,
    pub parameters: Vec<ParameterDescriptor>,
    pub groups: Vec<ParameterGroup>,
    /// For each site, the index of the matching literal in
    /// `program.number_literals()`.
    literal_index: Vec<usize>,
}

impl Analysis {
    /// Literal ordinal used by the formatter for a site index.
    pub fn literal_index(&self, site_index: usize) -> Option<usize> {
        self.literal_index.get(site_index).copied()
    }

    pub fn site(&self, site_index: usize) -> Option<&NumericLiteralSite> {
        self.sites.get(site_index)
    }

    /// The block text with the given sites replaced. Unknown site indices
    /// are ignored.
    pub fn rewrite(&self, edits: &BTreeMap<usize, Replacement>) -> String {
        let values: ValueMap = edits
            .iter()
            .filter_map(|(site, replacement)| {
                self.literal_index(*site)
                    .map(|literal| (literal, replacement.clone()))
            })
            .collect();
        formatter::generate_code(Some(&self.program), &self.block.text, Some(&values))
    }
}

/// Runs lexing, parsing, site extraction, classification and grouping.
#[derive(Debug, Clone)]
pub struct Analyzer {
    classifier: Classifier,
}

impl Analyzer {
    pub fn new(classifier: Classifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Analyze a block, keeping every literal in it.
    pub fn analyze(&self, block: SourceBlock) -> Result<Analysis> {
        self.run(block, None)
    }

    /// Analyze a block, keeping only literals `range` admits.
    pub fn analyze_in(&self, block: SourceBlock, range: EvalRange) -> Result<Analysis> {
        self.run(block, Some(range))
    }

    fn run(&self, block: SourceBlock, filter: Option<EvalRange>) -> Result<Analysis> {
        let lexed: Lexed = lexer::lex(&block.text)?;
        let program = parser::parse_lexed(&lexed, block.text.len())?;
        let literals = program.number_literals();
        let (literal_index, sites): (Vec<usize>, Vec<NumericLiteralSite>) =
            visible_sites(&block, &literals, filter.as_ref()).into_iter().unzip();

        let parameters = sites
            .iter()
            .enumerate()
            .map(|(i, site)| self.classifier.classify(&block.text, &lexed.tokens, i, site))
            .collect::<Vec<_>>();
        let groups = groups::detect_groups(&parameters);

        log::debug!(
            "analyzed {} byte block: {} sites, {} groups",
            block.text.len(),
            sites.len(),
            groups.len()
        );

        Ok(Analysis {
            range: filter.unwrap_or(block.range),
            block,
            program,
            tokens: lexed.tokens,
            sites,
            parameters,
            groups,
            literal_index,
        })
    }
}
