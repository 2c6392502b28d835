use std::collections::BTreeMap;
use std::iter::Peekable;

use crate::error::{Error, Result};
use crate::sql::parser::ast::{Column, Expression, Operator, OrderDirection, Predicate};
use crate::sql::parser::lexer::{Keyword, Lexer, Token};
use crate::sql::schema::{ID_COLUMN, PARTITION_COLUMN};
use crate::sql::types::ColumnType;

pub mod ast;
pub mod lexer;

/// SQL Parser - converts statement text into a canonical query
///
/// Only the bounded grammar the store can execute directly is accepted.
/// A SELECT outside it yields `Error::FallbackRequired`; any other statement
/// outside it yields `Error::Unsupported`.
pub struct Parser<'a> {
    sql: &'a str,
    lexer: Peekable<Lexer<'a>>,
    /// Placeholders seen so far, used to number positional parameters
    params: usize,
    /// Table qualifiers of `tbl.col` references, checked against the statement's table
    qualifiers: Vec<String>,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given SQL input
    pub fn new(input: &'a str) -> Self {
        Parser {
            sql: input,
            lexer: Lexer::new(input).peekable(),
            params: 0,
            qualifiers: Vec::new(),
        }
    }

    /// Parses the input SQL statement into a canonical query
    pub fn parse(&mut self) -> Result<ast::Statement> {
        let is_select = matches!(self.peek(), Ok(Some(Token::Keyword(Keyword::Select))));
        let result = self.parse_statement().and_then(|stmt| {
            self.next_if_token(Token::Semicolon);
            // No tokens allowed after the statement
            match self.peek()? {
                Some(token) => Err(Error::Parse(format!("[Parser] Unexpected token {}", token))),
                None => Ok(stmt),
            }
        });

        match result {
            Ok(stmt) => Ok(stmt),
            Err(Error::Parse(_)) if is_select => Err(Error::FallbackRequired(self.sql.to_string())),
            Err(Error::Parse(msg)) => Err(Error::Unsupported(format!("{}: {}", msg, self.sql.trim()))),
            Err(err) => Err(err),
        }
    }

    /// Parses a statement based on the first token
    fn parse_statement(&mut self) -> Result<ast::Statement> {
        match self.peek()? {
            Some(Token::Keyword(Keyword::Create)) => self.parse_ddl_create_table(),
            Some(Token::Keyword(Keyword::Drop)) => self.parse_ddl_drop_table(),
            Some(Token::Keyword(Keyword::Select)) => self.parse_select(),
            Some(Token::Keyword(Keyword::Insert)) => self.parse_insert(),
            Some(Token::Keyword(Keyword::Update)) => self.parse_update(),
            Some(Token::Keyword(Keyword::Delete)) => self.parse_delete(),
            Some(t) => Err(Error::Parse(format!("[Parser] Unexpected token {}", t))),
            None => Err(Error::Parse("[Parser] Unexpected end of input".to_string())),
        }
    }

    /// Parses CREATE TABLE statement
    fn parse_ddl_create_table(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Create))?;
        self.next_expect(Token::Keyword(Keyword::Table))?;
        let name = self.next_ident()?;
        self.next_expect(Token::OpenParen)?;

        let mut columns = Vec::new();
        loop {
            if let Some(column) = self.parse_ddl_column()? {
                if column.name != ID_COLUMN && column.name != PARTITION_COLUMN {
                    columns.push(column);
                }
            }
            match self.next()? {
                Token::Comma => {}
                Token::CloseParen => break,
                token => return Err(Error::Parse(format!("[Parser] Unexpected token {}", token))),
            }
        }
        Ok(ast::Statement::CreateTable { name, columns })
    }

    /// Parses one column definition in CREATE TABLE
    ///
    /// Only the name and the first word of the type are kept; the store
    /// enforces neither constraints nor type arguments. Table-level
    /// constraints yield None.
    fn parse_ddl_column(&mut self) -> Result<Option<Column>> {
        let name = self.next_ident()?;
        let datatype = match self.peek()? {
            Some(Token::Ident(type_name)) => ColumnType::from_sql(&type_name),
            _ => ColumnType::String,
        };
        let constraint = match name.as_str() {
            "constraint" => true,
            "primary" | "unique" | "foreign" | "check" => match self.peek()? {
                Some(Token::OpenParen) => true,
                Some(Token::Ident(next)) => next == "key",
                _ => false,
            },
            _ => false,
        };

        // Skip the rest of the definition, up to a top-level `,` or `)`
        let mut depth = 0;
        loop {
            match self.peek()? {
                Some(Token::Comma) | Some(Token::CloseParen) if depth == 0 => break,
                Some(Token::OpenParen) => depth += 1,
                Some(Token::CloseParen) => depth -= 1,
                Some(_) => {}
                None => return Err(Error::Parse("[Parser] Unexpected end of input".to_string())),
            }
            self.next()?;
        }

        Ok((!constraint).then_some(Column { name, datatype }))
    }

    /// Parses DROP TABLE statement
    fn parse_ddl_drop_table(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Drop))?;
        self.next_expect(Token::Keyword(Keyword::Table))?;
        Ok(ast::Statement::DropTable {
            name: self.next_ident()?,
        })
    }

    /// Parses SELECT statement
    ///
    /// `SELECT col, ... FROM tbl [WHERE col (= ph | IN (ph, ...))]
    ///  [ORDER BY col [ASC|DESC]] [LIMIT n]`
    fn parse_select(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Select))?;

        let mut columns = Vec::new();
        loop {
            columns.push(self.parse_column_ref()?);
            if self.next_if_token(Token::Comma).is_none() {
                break;
            }
        }

        self.next_expect(Token::Keyword(Keyword::From))?;
        let table_name = self.next_ident()?;

        let predicate = match self.next_if_token(Token::Keyword(Keyword::Where)) {
            Some(_) => Some(self.parse_predicate()?),
            None => None,
        };

        let order_by = match self.next_if_token(Token::Keyword(Keyword::Order)) {
            Some(_) => {
                self.next_expect(Token::Keyword(Keyword::By))?;
                let column = self.parse_column_ref()?;
                let direction = match self.next_if(|t| {
                    matches!(t, Token::Keyword(Keyword::Asc) | Token::Keyword(Keyword::Desc))
                }) {
                    Some(Token::Keyword(Keyword::Desc)) => OrderDirection::Desc,
                    _ => OrderDirection::Asc,
                };
                Some((column, direction))
            }
            None => None,
        };

        let limit = match self.next_if_token(Token::Keyword(Keyword::Limit)) {
            Some(_) => match self.next()? {
                Token::Number(n) => Some(n.parse()?),
                token => {
                    return Err(Error::Parse(format!(
                        "[Parser] Expected limit count, got {}",
                        token
                    )));
                }
            },
            None => None,
        };

        self.check_qualifiers(&table_name)?;
        Ok(ast::Statement::Select {
            table_name,
            columns,
            predicate,
            order_by,
            limit,
        })
    }

    /// Parses INSERT statement
    fn parse_insert(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Insert))?;
        self.next_expect(Token::Keyword(Keyword::Into))?;
        let table_name = self.next_ident()?;

        self.next_expect(Token::OpenParen)?;
        let mut columns = Vec::new();
        loop {
            let column = self.next_ident()?;
            if column == ID_COLUMN || column == PARTITION_COLUMN {
                return Err(Error::Parse(format!(
                    "[Parser] Key column {} is assigned by the store",
                    column
                )));
            }
            columns.push(column);
            match self.next()? {
                Token::CloseParen => break,
                Token::Comma => {}
                token => return Err(Error::Parse(format!("[Parser] Unexpected token {}", token))),
            }
        }

        self.next_expect(Token::Keyword(Keyword::Values))?;
        self.next_expect(Token::OpenParen)?;
        let mut values = Vec::new();
        loop {
            values.push(self.parse_placeholder()?);
            match self.next()? {
                Token::CloseParen => break,
                Token::Comma => {}
                token => return Err(Error::Parse(format!("[Parser] Unexpected token {}", token))),
            }
        }

        if columns.len() != values.len() {
            return Err(Error::Parse(format!(
                "[Parser] {} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        Ok(ast::Statement::Insert {
            table_name,
            columns,
            values,
        })
    }

    /// Parses UPDATE statement
    fn parse_update(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Update))?;
        let table_name = self.next_ident()?;
        self.next_expect(Token::Keyword(Keyword::Set))?;

        let mut columns = BTreeMap::new();
        loop {
            let col = self.parse_column_ref()?;
            self.next_expect(Token::Equal)?;
            let value = match self.next_if_token(Token::Keyword(Keyword::Null)) {
                Some(_) => Expression::Null,
                None => self.parse_placeholder()?,
            };
            if columns.contains_key(&col) {
                return Err(Error::Parse(format!(
                    "[Parser] Duplicate column {} for update",
                    col
                )));
            }
            columns.insert(col, value);
            if self.next_if_token(Token::Comma).is_none() {
                break;
            }
        }

        self.next_expect(Token::Keyword(Keyword::Where))?;
        let column = self.parse_id_column_ref()?;
        self.next_expect(Token::Equal)?;
        let value = self.parse_placeholder()?;

        self.check_qualifiers(&table_name)?;
        Ok(ast::Statement::Update {
            table_name,
            columns,
            where_clause: (column, value),
        })
    }

    /// Parses DELETE statement
    fn parse_delete(&mut self) -> Result<ast::Statement> {
        self.next_expect(Token::Keyword(Keyword::Delete))?;
        self.next_expect(Token::Keyword(Keyword::From))?;
        let table_name = self.next_ident()?;
        self.next_expect(Token::Keyword(Keyword::Where))?;

        let where_clause = self.parse_predicate()?;
        if where_clause.column != ID_COLUMN {
            return Err(Error::Parse(format!(
                "[Parser] Delete must filter on {}, got {}",
                ID_COLUMN, where_clause.column
            )));
        }
        self.check_qualifiers(&table_name)?;
        Ok(ast::Statement::Delete {
            table_name,
            where_clause,
        })
    }

    /// Parses `col = ph` or `col IN (ph, ...)`
    fn parse_predicate(&mut self) -> Result<Predicate> {
        let column = self.parse_column_ref()?;
        match self.next()? {
            Token::Equal => Ok(Predicate {
                column,
                operator: Operator::Equal,
                values: vec![self.parse_placeholder()?],
            }),
            Token::Keyword(Keyword::In) => {
                self.next_expect(Token::OpenParen)?;
                let mut values = Vec::new();
                loop {
                    values.push(self.parse_placeholder()?);
                    match self.next()? {
                        Token::CloseParen => break,
                        Token::Comma => {}
                        token => {
                            return Err(Error::Parse(format!("[Parser] Unexpected token {}", token)));
                        }
                    }
                }
                Ok(Predicate {
                    column,
                    operator: Operator::In,
                    values,
                })
            }
            token => Err(Error::Parse(format!(
                "[Parser] Expected = or IN, got {}",
                token
            ))),
        }
    }

    /// Parses `col` or `tbl.col`, returning the column name
    fn parse_column_ref(&mut self) -> Result<String> {
        let name = self.next_ident()?;
        if self.next_if_token(Token::Period).is_none() {
            return Ok(name);
        }
        self.qualifiers.push(name);
        self.next_ident()
    }

    /// Rejects column references qualified by a table other than `table_name`
    fn check_qualifiers(&self, table_name: &str) -> Result<()> {
        match self.qualifiers.iter().find(|q| *q != table_name) {
            Some(q) => Err(Error::Parse(format!(
                "[Parser] Column qualifier {} does not match table {}",
                q, table_name
            ))),
            None => Ok(()),
        }
    }

    fn parse_id_column_ref(&mut self) -> Result<String> {
        let column = self.parse_column_ref()?;
        if column != ID_COLUMN {
            return Err(Error::Parse(format!(
                "[Parser] Expected filter on {}, got {}",
                ID_COLUMN, column
            )));
        }
        Ok(column)
    }

    /// Expects a placeholder and numbers it
    fn parse_placeholder(&mut self) -> Result<Expression> {
        match self.next()? {
            Token::Placeholder => {
                self.params += 1;
                Ok(Expression::Placeholder(self.params - 1))
            }
            token => Err(Error::Parse(format!(
                "[Parser] Expected placeholder, got {}",
                token
            ))),
        }
    }

    /// Peeks at the next token
    fn peek(&mut self) -> Result<Option<Token>> {
        self.lexer.peek().cloned().transpose()
    }

    /// Consumes and returns the next token
    fn next(&mut self) -> Result<Token> {
        self.lexer
            .next()
            .unwrap_or_else(|| Err(Error::Parse("[Parser] Unexpected end of input".to_string())))
    }

    /// Expects and consumes an identifier
    fn next_ident(&mut self) -> Result<String> {
        match self.next()? {
            Token::Ident(ident) => Ok(ident),
            token => Err(Error::Parse(format!(
                "[Parser] Expected ident, got token {}",
                token
            ))),
        }
    }

    /// Expects a specific token, returns error if different
    fn next_expect(&mut self, expect: Token) -> Result<()> {
        let token = self.next()?;
        if token != expect {
            return Err(Error::Parse(format!(
                "[Parser] Expected token {}, got {}",
                expect, token
            )));
        }
        Ok(())
    }

    /// Consumes next token if it satisfies the predicate
    fn next_if<F: Fn(&Token) -> bool>(&mut self, predicate: F) -> Option<Token> {
        self.peek().unwrap_or(None).filter(|t| predicate(t))?;
        self.next().ok()
    }

    /// Consumes next token if it matches the given token
    fn next_if_token(&mut self, token: Token) -> Option<Token> {
        self.next_if(|t| t == &token)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::Parser;
    use crate::{
        error::{Error, Result},
        sql::{
            parser::ast::{self, Expression, Operator, OrderDirection, Predicate},
            types::ColumnType,
        },
    };

    #[test]
    fn test_parser_create_table() -> Result<()> {
        let sql1 = r#"
            CREATE TABLE "test_create" (
                "id" integer NOT NULL PRIMARY KEY AUTOINCREMENT,
                "str" varchar(255) NOT NULL,
                "dt" datetime NOT NULL,
                "int" integer NULL,
                "bool" boolean NULL,
                "foreign" integer NULL REFERENCES "other" ("id") DEFERRABLE INITIALLY DEFERRED
            );
        "#;
        let stmt1 = Parser::new(sql1).parse()?;
        assert_eq!(
            stmt1,
            ast::Statement::CreateTable {
                name: "test_create".to_string(),
                columns: vec![
                    ast::Column { name: "str".into(), datatype: ColumnType::String },
                    ast::Column { name: "dt".into(), datatype: ColumnType::String },
                    ast::Column { name: "int".into(), datatype: ColumnType::Integer },
                    ast::Column { name: "bool".into(), datatype: ColumnType::Boolean },
                    ast::Column { name: "foreign".into(), datatype: ColumnType::Integer },
                ],
            }
        );

        let sql2 = r#"create   table "t" ("a" real, PRIMARY KEY ("a"), UNIQUE ("a"))"#;
        assert_eq!(
            Parser::new(sql2).parse()?,
            ast::Statement::CreateTable {
                name: "t".to_string(),
                columns: vec![ast::Column { name: "a".into(), datatype: ColumnType::Double }],
            }
        );

        let sql3 = r#"CREATE TABLE "t" ("a" integer"#;
        assert!(matches!(Parser::new(sql3).parse(), Err(Error::Unsupported(_))));
        Ok(())
    }

    #[test]
    fn test_parser_drop_table() -> Result<()> {
        assert_eq!(
            Parser::new(r#"DROP TABLE "t";"#).parse()?,
            ast::Statement::DropTable { name: "t".into() }
        );
        assert!(matches!(
            Parser::new(r#"DROP TABLE "t" CASCADE"#).parse(),
            Err(Error::Unsupported(_))
        ));
        Ok(())
    }

    #[test]
    fn test_parser_insert() -> Result<()> {
        let stmt = Parser::new(r#"INSERT INTO "tbl" ("a", "b") VALUES (%s, %s)"#).parse()?;
        assert_eq!(
            stmt,
            ast::Statement::Insert {
                table_name: "tbl".to_string(),
                columns: vec!["a".to_string(), "b".to_string()],
                values: vec![Expression::Placeholder(0), Expression::Placeholder(1)],
            }
        );

        for sql in [
            r#"INSERT INTO "tbl" ("a", "b") VALUES (%s)"#,
            r#"INSERT INTO "tbl" ("a") VALUES (%s), (%s)"#,
            r#"INSERT INTO "tbl" ("a") VALUES (1)"#,
            r#"INSERT INTO "tbl" ("id", "a") VALUES (%s, %s)"#,
            r#"INSERT INTO "tbl" VALUES (%s)"#,
        ] {
            assert!(matches!(Parser::new(sql).parse(), Err(Error::Unsupported(_))), "{}", sql);
        }
        Ok(())
    }

    #[test]
    fn test_parser_update() -> Result<()> {
        let sql = r#"UPDATE "t" SET "a" = %s, "b" = NULL, "c" = %s WHERE "t"."id" = %s"#;
        let mut columns = BTreeMap::new();
        columns.insert("a".to_string(), Expression::Placeholder(0));
        columns.insert("b".to_string(), Expression::Null);
        columns.insert("c".to_string(), Expression::Placeholder(1));
        assert_eq!(
            Parser::new(sql).parse()?,
            ast::Statement::Update {
                table_name: "t".to_string(),
                columns,
                where_clause: ("id".to_string(), Expression::Placeholder(2)),
            }
        );

        for sql in [
            r#"UPDATE "t" SET "a" = %s WHERE "t"."a" = %s"#,
            r#"UPDATE "t" SET "a" = %s, "a" = %s WHERE "t"."id" = %s"#,
            r#"UPDATE "t" SET "a" = %s"#,
            r#"UPDATE "t" SET "a" = "a" + 1 WHERE "t"."id" = %s"#,
        ] {
            assert!(matches!(Parser::new(sql).parse(), Err(Error::Unsupported(_))), "{}", sql);
        }
        Ok(())
    }

    #[test]
    fn test_parser_delete() -> Result<()> {
        let stmt = Parser::new(r#"DELETE FROM "t" WHERE "t"."id" IN (%s, %s, %s)"#).parse()?;
        assert_eq!(
            stmt,
            ast::Statement::Delete {
                table_name: "t".to_string(),
                where_clause: Predicate {
                    column: "id".to_string(),
                    operator: Operator::In,
                    values: (0..3).map(Expression::Placeholder).collect(),
                },
            }
        );
        assert!(matches!(
            Parser::new(r#"DELETE FROM "t" WHERE "t"."name" = %s"#).parse(),
            Err(Error::Unsupported(_))
        ));
        assert!(matches!(
            Parser::new(r#"DELETE FROM "t""#).parse(),
            Err(Error::Unsupported(_))
        ));
        Ok(())
    }

    #[test]
    fn test_parser_select() -> Result<()> {
        let sql = r#"SELECT "oj_problem"."id", "oj_problem"."title" FROM "oj_problem" WHERE "oj_problem"."id" = %s ORDER BY "oj_problem"."title" ASC LIMIT 10"#;
        assert_eq!(
            Parser::new(sql).parse()?,
            ast::Statement::Select {
                table_name: "oj_problem".to_string(),
                columns: vec!["id".to_string(), "title".to_string()],
                predicate: Some(Predicate {
                    column: "id".to_string(),
                    operator: Operator::Equal,
                    values: vec![Expression::Placeholder(0)],
                }),
                order_by: Some(("title".to_string(), OrderDirection::Asc)),
                limit: Some(10),
            }
        );

        // Suffixes are optional and independent of the predicate
        let sql = r#"select "t"."a" from "t" order by "t"."a" desc;"#;
        assert_eq!(
            Parser::new(sql).parse()?,
            ast::Statement::Select {
                table_name: "t".to_string(),
                columns: vec!["a".to_string()],
                predicate: None,
                order_by: Some(("a".to_string(), OrderDirection::Desc)),
                limit: None,
            }
        );
        Ok(())
    }

    #[test]
    fn test_parser_select_fallback() {
        for sql in [
            r#"SELECT * FROM "t""#,
            r#"SELECT COUNT(*) AS "__count" FROM "t""#,
            r#"SELECT "a"."x" FROM "a" INNER JOIN "b" ON ("a"."id" = "b"."a_id")"#,
            r#"SELECT "t"."a" FROM "t" WHERE "t"."a" = %s AND "t"."b" = %s"#,
            r#"SELECT "t"."a" FROM "t" WHERE "t"."a" > %s"#,
            r#"SELECT "t"."a" FROM "t" ORDER BY "t"."a" ASC, "t"."b" DESC"#,
            r#"SELECT "t"."a" FROM "t" LIMIT 10 OFFSET 5"#,
            r#"SELECT (1) AS "a" FROM "t" WHERE "t"."id" = %s LIMIT 1"#,
        ] {
            assert!(
                matches!(Parser::new(sql).parse(), Err(Error::FallbackRequired(_))),
                "{}",
                sql
            );
        }
    }

    #[test]
    fn test_parser_foreign_qualifier() -> Result<()> {
        for sql in [
            r#"SELECT "u"."a" FROM "t""#,
            r#"SELECT "t"."a" FROM "t" WHERE "u"."id" = %s"#,
            r#"SELECT "t"."a" FROM "t" ORDER BY "u"."a" ASC"#,
        ] {
            assert!(
                matches!(Parser::new(sql).parse(), Err(Error::FallbackRequired(_))),
                "{}",
                sql
            );
        }
        for sql in [
            r#"UPDATE "t" SET "a" = %s WHERE "u"."id" = %s"#,
            r#"UPDATE "t" SET "u"."a" = %s WHERE "t"."id" = %s"#,
            r#"DELETE FROM "t" WHERE "u"."id" IN (%s)"#,
        ] {
            assert!(
                matches!(Parser::new(sql).parse(), Err(Error::Unsupported(_))),
                "{}",
                sql
            );
        }

        // Unqualified and matching references mix freely
        let stmt = Parser::new(r#"SELECT "a", "t"."b" FROM "t" WHERE "id" = %s"#).parse()?;
        assert!(matches!(stmt, ast::Statement::Select { ref columns, .. } if columns.len() == 2));
        Ok(())
    }

    #[test]
    fn test_parser_unknown_statement() {
        assert!(matches!(
            Parser::new("VACUUM").parse(),
            Err(Error::Unsupported(_))
        ));
        assert!(matches!(Parser::new("").parse(), Err(Error::Unsupported(_))));
    }
}
