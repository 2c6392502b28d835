//! SQL Lexer - Tokenizes SQL input text into a stream of tokens

use std::{fmt::Display, iter::Peekable, str::Chars};

use crate::error::{Error, Result};

/// Represents a single lexical token in the SQL input
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// SQL reserved keyword
    Keyword(Keyword),
    /// Identifier such as table name or column name.
    /// Quoted identifiers keep their case, bare ones are lower-cased.
    Ident(String),
    /// String literal
    String(String),
    /// Numeric literal (integer or floating-point)
    Number(String),
    /// Positional parameter: `%s` or `?`
    Placeholder,
    /// Operators and punctuation
    OpenParen,
    CloseParen,
    Comma,
    Semicolon,
    Period,
    Equal,
    /// Any other single character (operators the direct grammar never uses)
    Symbol(char),
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Keyword(keyword) => write!(f, "{}", keyword),
            Token::Ident(ident) => write!(f, "\"{}\"", ident),
            Token::String(v) => write!(f, "'{}'", v),
            Token::Number(n) => f.write_str(n),
            Token::Placeholder => f.write_str("%s"),
            Token::OpenParen => f.write_str("("),
            Token::CloseParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
            Token::Semicolon => f.write_str(";"),
            Token::Period => f.write_str("."),
            Token::Equal => f.write_str("="),
            Token::Symbol(c) => write!(f, "{}", c),
        }
    }
}

/// SQL reserved keywords
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Keyword {
    // DDL keywords
    Create,
    Drop,
    Table,
    // DML keywords
    Select,
    From,
    Join,
    Where,
    In,
    Order,
    By,
    Asc,
    Desc,
    Limit,
    Insert,
    Into,
    Values,
    Update,
    Set,
    Delete,
    // Literal keywords
    Null,
}

impl Keyword {
    /// Attempts to parse a string as a keyword (case-insensitive)
    pub fn from_str(ident: &str) -> Option<Keyword> {
        Some(match ident.to_uppercase().as_ref() {
            "CREATE" => Keyword::Create,
            "DROP" => Keyword::Drop,
            "TABLE" => Keyword::Table,
            "SELECT" => Keyword::Select,
            "FROM" => Keyword::From,
            "JOIN" => Keyword::Join,
            "WHERE" => Keyword::Where,
            "IN" => Keyword::In,
            "ORDER" => Keyword::Order,
            "BY" => Keyword::By,
            "ASC" => Keyword::Asc,
            "DESC" => Keyword::Desc,
            "LIMIT" => Keyword::Limit,
            "INSERT" => Keyword::Insert,
            "INTO" => Keyword::Into,
            "VALUES" => Keyword::Values,
            "UPDATE" => Keyword::Update,
            "SET" => Keyword::Set,
            "DELETE" => Keyword::Delete,
            "NULL" => Keyword::Null,
            _ => return None,
        })
    }
}

impl Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format!("{:?}", self).to_uppercase())
    }
}

/// SQL lexical analyzer (lexer/tokenizer)
pub struct Lexer<'a> {
    iter: Peekable<Chars<'a>>,
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        self.scan().transpose()
    }
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given SQL text
    pub fn new(sql_text: &'a str) -> Self {
        Self {
            iter: sql_text.chars().peekable(),
        }
    }

    /// Consumes the next character if it satisfies the predicate
    fn next_if<F: Fn(char) -> bool>(&mut self, predicate: F) -> Option<char> {
        self.iter.peek().filter(|&c| predicate(*c))?;
        self.iter.next()
    }

    /// Consumes consecutive characters while they satisfy the predicate
    fn next_while<F: Fn(char) -> bool>(&mut self, predicate: F) -> Option<String> {
        let mut value = String::new();
        while let Some(c) = self.next_if(&predicate) {
            value.push(c);
        }
        Some(value).filter(|v| !v.is_empty())
    }

    /// Removes whitespace from the input stream
    fn erase_whitespace(&mut self) {
        self.next_while(|c| c.is_whitespace());
    }

    /// Scans and returns the next token
    fn scan(&mut self) -> Result<Option<Token>> {
        self.erase_whitespace();
        match self.iter.peek() {
            Some('\'') => self.scan_quoted('\'').map(|s| Some(Token::String(s))),
            Some('"') => self.scan_quoted('"').map(|s| Some(Token::Ident(s))),
            Some(c) if c.is_ascii_digit() => Ok(self.scan_number()),
            Some(c) if c.is_alphabetic() || *c == '_' => Ok(self.scan_ident()),
            Some(_) => Ok(self.scan_symbol()),
            None => Ok(None),
        }
    }

    /// Scans text enclosed in `quote`; a doubled quote stands for itself
    fn scan_quoted(&mut self, quote: char) -> Result<String> {
        self.iter.next();
        let mut val = String::new();
        loop {
            match self.iter.next() {
                Some(c) if c == quote => {
                    if self.next_if(|c| c == quote).is_none() {
                        break;
                    }
                    val.push(quote);
                }
                Some(c) => val.push(c),
                None => {
                    return Err(Error::Parse(format!(
                        "[Lexer] Unexpected end of quoted text {}{}",
                        quote, val
                    )));
                }
            }
        }
        Ok(val)
    }

    /// Scans a numeric literal (integer or floating-point)
    fn scan_number(&mut self) -> Option<Token> {
        let mut val = self.next_while(|c| c.is_ascii_digit())?;
        if let Some(sep) = self.next_if(|c| c == '.') {
            val.push(sep);
            while let Some(c) = self.next_if(|c| c.is_ascii_digit()) {
                val.push(c);
            }
        }
        Some(Token::Number(val))
    }

    /// Scans an identifier or keyword
    fn scan_ident(&mut self) -> Option<Token> {
        let mut val = self.next_if(|c| c.is_alphabetic() || c == '_')?.to_string();
        while let Some(c) = self.next_if(|c| c.is_alphanumeric() || c == '_') {
            val.push(c);
        }
        // Returns Keyword if matched, otherwise returns as a regular Ident
        Some(Keyword::from_str(&val).map_or(Token::Ident(val.to_lowercase()), Token::Keyword))
    }

    /// Scans a single-character symbol token, or a `%s` placeholder
    fn scan_symbol(&mut self) -> Option<Token> {
        let c = self.iter.next()?;
        Some(match c {
            '%' if self.next_if(|c| c == 's').is_some() => Token::Placeholder,
            '?' => Token::Placeholder,
            '(' => Token::OpenParen,
            ')' => Token::CloseParen,
            ',' => Token::Comma,
            ';' => Token::Semicolon,
            '.' => Token::Period,
            '=' => Token::Equal,
            c => Token::Symbol(c),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Lexer;
    use crate::{
        error::Result,
        sql::parser::lexer::{Keyword, Token},
    };

    #[test]
    fn test_lexer_create_table() -> Result<()> {
        let tokens = Lexer::new(
            r#"CREATE TABLE "tbl" (
                    "id" integer NOT NULL PRIMARY KEY AUTOINCREMENT,
                    "Name" varchar(255) NULL
                );"#,
        )
        .collect::<Result<Vec<_>>>()?;

        assert_eq!(
            tokens,
            vec![
                Token::Keyword(Keyword::Create),
                Token::Keyword(Keyword::Table),
                Token::Ident("tbl".to_string()),
                Token::OpenParen,
                Token::Ident("id".to_string()),
                Token::Ident("integer".to_string()),
                Token::Ident("not".to_string()),
                Token::Keyword(Keyword::Null),
                Token::Ident("primary".to_string()),
                Token::Ident("key".to_string()),
                Token::Ident("autoincrement".to_string()),
                Token::Comma,
                Token::Ident("Name".to_string()),
                Token::Ident("varchar".to_string()),
                Token::OpenParen,
                Token::Number("255".to_string()),
                Token::CloseParen,
                Token::Keyword(Keyword::Null),
                Token::CloseParen,
                Token::Semicolon,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_lexer_insert_into() -> Result<()> {
        let tokens = Lexer::new(r#"INSERT INTO   "tbl" ("a", "b") VALUES (%s, ?)"#)
            .collect::<Result<Vec<_>>>()?;

        assert_eq!(
            tokens,
            vec![
                Token::Keyword(Keyword::Insert),
                Token::Keyword(Keyword::Into),
                Token::Ident("tbl".to_string()),
                Token::OpenParen,
                Token::Ident("a".to_string()),
                Token::Comma,
                Token::Ident("b".to_string()),
                Token::CloseParen,
                Token::Keyword(Keyword::Values),
                Token::OpenParen,
                Token::Placeholder,
                Token::Comma,
                Token::Placeholder,
                Token::CloseParen,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_lexer_select() -> Result<()> {
        let tokens = Lexer::new(r#"select "t"."a" from "t" where "t"."b" >= 'it''s' limit 10;"#)
            .collect::<Result<Vec<_>>>()?;

        assert_eq!(
            tokens,
            vec![
                Token::Keyword(Keyword::Select),
                Token::Ident("t".to_string()),
                Token::Period,
                Token::Ident("a".to_string()),
                Token::Keyword(Keyword::From),
                Token::Ident("t".to_string()),
                Token::Keyword(Keyword::Where),
                Token::Ident("t".to_string()),
                Token::Period,
                Token::Ident("b".to_string()),
                Token::Symbol('>'),
                Token::Equal,
                Token::String("it's".to_string()),
                Token::Keyword(Keyword::Limit),
                Token::Number("10".to_string()),
                Token::Semicolon,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_lexer_unterminated() {
        assert!(Lexer::new("select 'abc").collect::<Result<Vec<_>>>().is_err());
        assert!(Lexer::new("select \"abc").collect::<Result<Vec<_>>>().is_err());
    }
}
