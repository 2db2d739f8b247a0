//! Token definitions.

use crate::srcloc::{SourceLoc, SourceRange};

/// What went wrong while scanning an error token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexError {
    /// A byte that starts no token.
    UnexpectedCharacter,
    /// A `/*` comment that runs to the end of the file.
    UnterminatedComment,
    /// A digit run continued by identifier characters, e.g. `123abc`.
    MalformedInteger,
}

impl LexError {
    /// The diagnostic message for this error.
    pub fn message(self) -> &'static str {
        match self {
            Self::UnexpectedCharacter => "unexpected character",
            Self::UnterminatedComment => "unterminated comment",
            Self::MalformedInteger => "malformed integer literal",
        }
    }
}

/// The closed set of token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,

    /// `+`
    Plus,
    /// `++`
    PlusPlus,
    /// `+=`
    PlusEq,
    /// `-`
    Minus,
    /// `--`
    MinusMinus,
    /// `-=`
    MinusEq,
    /// `->`
    Arrow,
    /// `*`
    Star,
    /// `*=`
    StarEq,
    /// `/`
    Slash,
    /// `/=`
    SlashEq,
    /// `%`
    Percent,
    /// `%=`
    PercentEq,
    /// `~`
    Tilde,
    /// `&`
    Amp,
    /// `&&`
    AmpAmp,
    /// `&=`
    AmpEq,
    /// `|`
    Pipe,
    /// `||`
    PipePipe,
    /// `|=`
    PipeEq,
    /// `^`
    Caret,
    /// `^=`
    CaretEq,
    /// `=`
    Eq,
    /// `==`
    EqEq,
    /// `!`
    Bang,
    /// `!=`
    BangEq,
    /// `<`
    Less,
    /// `<<`
    LessLess,
    /// `<<=`
    LessLessEq,
    /// `<=`
    LessEq,
    /// `>`
    Greater,
    /// `>>`
    GreaterGreater,
    /// `>>=`
    GreaterGreaterEq,
    /// `>=`
    GreaterEq,

    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `?`
    Question,
    /// `;`
    Semicolon,
    /// `:`
    Colon,

    /// `void`
    KwVoid,
    /// `int`
    KwInt,
    /// `return`
    KwReturn,
    /// `if`
    KwIf,
    /// `else`
    KwElse,
    /// `do`
    KwDo,
    /// `while`
    KwWhile,
    /// `for`
    KwFor,
    /// `break`
    KwBreak,
    /// `continue`
    KwContinue,
    /// `typedef`
    KwTypedef,

    /// An identifier.
    Identifier,
    /// An integer literal.
    Integer,

    /// An unscannable region; the payload selects the diagnostic.
    Error(LexError),
    /// End of input. Exactly one per token stream, always last.
    Eof,
}

/// A scanned token: a kind plus the region of source it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// The token kind.
    pub kind: TokenKind,
    /// Location of the first byte.
    pub loc: SourceLoc,
    /// Length in bytes.
    pub len: u32,
}

impl Token {
    /// The token's text, sliced out of the source it was scanned from.
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        let begin = self.loc.offset as usize;
        &source[begin..begin + self.len as usize]
    }

    /// The byte range this token covers.
    pub fn range(&self) -> SourceRange {
        SourceRange::new(self.loc.offset, self.loc.offset + self.len)
    }
}

/// Map an identifier spelling to its keyword kind, if it is one.
pub fn keyword(text: &str) -> Option<TokenKind> {
    Some(match text {
        "void" => TokenKind::KwVoid,
        "int" => TokenKind::KwInt,
        "return" => TokenKind::KwReturn,
        "if" => TokenKind::KwIf,
        "else" => TokenKind::KwElse,
        "do" => TokenKind::KwDo,
        "while" => TokenKind::KwWhile,
        "for" => TokenKind::KwFor,
        "break" => TokenKind::KwBreak,
        "continue" => TokenKind::KwContinue,
        "typedef" => TokenKind::KwTypedef,
        _ => return None,
    })
}
