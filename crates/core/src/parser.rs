//! Recursive-descent parser over the bundled concrete syntax, producing the AST
//! types directly (no separate untyped parse tree) and registering classes and
//! labels in a [`MachineContext`] as it goes, per the class-database and
//! label-index construction-time discipline.

use crate::ast::{Expr, Op, StmtKind};
use crate::class::{ClassDef, FieldDef, MethodDef};
use crate::context::MachineContext;
use crate::errors::{Location, SyntaxError};
use crate::lexer::{Lexer, Token};

pub struct Parser<'a> {
    filename: String,
    tokens: Vec<(Token, u32)>,
    pos: usize,
    ctx: &'a mut MachineContext,
    declared: Vec<String>,
}

/// Parses one source file's worth of class definitions into `ctx`, registering
/// each class (and each label encountered inside it) as it is built. Returns the
/// class names in declaration order, so the driver can pick the first one whose
/// method table contains `main`.
pub fn parse_file(filename: &str, source: &str, ctx: &mut MachineContext) -> Result<Vec<String>, SyntaxError> {
    let tokens = Lexer::new(filename, source).tokenize()?;
    let mut parser = Parser {
        filename: filename.to_string(),
        tokens,
        pos: 0,
        ctx,
        declared: Vec::new(),
    };
    parser.parse_program()?;
    Ok(parser.declared)
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    fn line(&self) -> u32 {
        self.tokens[self.pos].1
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].0.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, reason: impl Into<String>) -> SyntaxError {
        SyntaxError::new(reason, Location::new(self.filename.clone(), self.line()))
    }

    fn expect(&mut self, expected: Token) -> Result<(), SyntaxError> {
        if *self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {expected:?}, found {:?}", self.peek())))
        }
    }

    fn expect_ident(&mut self) -> Result<String, SyntaxError> {
        match self.advance() {
            Token::Ident(name) => Ok(name),
            other => Err(self.error(format!("expected an identifier, found {other:?}"))),
        }
    }

    fn expect_register(&mut self) -> Result<String, SyntaxError> {
        match self.advance() {
            Token::Register(name) => Ok(name),
            other => Err(self.error(format!("expected a register name, found {other:?}"))),
        }
    }

    fn parse_program(&mut self) -> Result<(), SyntaxError> {
        while *self.peek() != Token::Eof {
            self.parse_class()?;
        }
        Ok(())
    }

    fn parse_class(&mut self) -> Result<(), SyntaxError> {
        self.expect(Token::Class)?;
        let name = self.expect_ident()?;
        let parent = if *self.peek() == Token::Extends {
            self.advance();
            Some(self.expect_ident()?)
        } else {
            None
        };
        self.expect(Token::LBrace)?;

        let mut class = ClassDef::new(name, parent);

        while *self.peek() == Token::Var {
            self.advance();
            let field = self.expect_ident()?;
            self.expect(Token::Semi)?;
            class.fields.insert(field.clone(), FieldDef { name: field });
        }

        while *self.peek() == Token::Def {
            let method = self.parse_method()?;
            class.methods.insert(method.name.clone(), method);
        }

        self.expect(Token::RBrace)?;
        self.declared.push(class.name.clone());
        self.ctx.classes.register(class);
        Ok(())
    }

    fn parse_method(&mut self) -> Result<MethodDef, SyntaxError> {
        self.expect(Token::Def)?;
        let name = self.expect_ident()?;
        self.expect(Token::LParen)?;

        let mut params = Vec::new();
        if *self.peek() != Token::RParen {
            params.push(self.expect_register()?);
            while *self.peek() == Token::Comma {
                self.advance();
                params.push(self.expect_register()?);
            }
        }
        self.expect(Token::RParen)?;

        self.expect(Token::LBrace)?;
        let mut items = Vec::new();
        while *self.peek() != Token::RBrace {
            self.parse_stmt(&mut items)?;
        }
        self.expect(Token::RBrace)?;

        let entry = self.link_tail_first(items);
        let entry = entry.ok_or_else(|| self.error(format!("method '{name}' has an empty body")))?;

        Ok(MethodDef { name, params, entry })
    }

    /// Parses one grammar-level statement production, appending it (and, for
    /// `label`, the statement it prefixes) to `out` in textual order.
    fn parse_stmt(&mut self, out: &mut Vec<StmtKind>) -> Result<(), SyntaxError> {
        match self.peek().clone() {
            Token::Label => {
                self.advance();
                let name = self.expect_ident()?;
                self.expect(Token::Colon)?;
                out.push(StmtKind::Label(name));
                self.parse_stmt(out)
            }
            Token::Skip => {
                self.advance();
                self.expect(Token::Semi)?;
                out.push(StmtKind::Skip);
                Ok(())
            }
            Token::Goto => {
                self.advance();
                let label = self.expect_ident()?;
                self.expect(Token::Semi)?;
                out.push(StmtKind::Goto(label));
                Ok(())
            }
            Token::If => {
                self.advance();
                let cond = self.parse_aexp()?;
                self.expect(Token::Goto)?;
                let label = self.expect_ident()?;
                self.expect(Token::Semi)?;
                out.push(StmtKind::If(cond, label));
                Ok(())
            }
            Token::Return => {
                self.advance();
                let expr = self.parse_aexp()?;
                self.expect(Token::Semi)?;
                out.push(StmtKind::Return(expr));
                Ok(())
            }
            Token::PushHandler => {
                self.advance();
                let class_name = self.expect_ident()?;
                let label = self.expect_ident()?;
                self.expect(Token::Semi)?;
                out.push(StmtKind::PushHandler(class_name, label));
                Ok(())
            }
            Token::PopHandler => {
                self.advance();
                self.expect(Token::Semi)?;
                out.push(StmtKind::PopHandler);
                Ok(())
            }
            Token::Throw => {
                self.advance();
                let expr = self.parse_aexp()?;
                self.expect(Token::Semi)?;
                out.push(StmtKind::Throw(expr));
                Ok(())
            }
            Token::MoveException => {
                self.advance();
                let register = self.expect_register()?;
                self.expect(Token::Semi)?;
                out.push(StmtKind::MoveException(register));
                Ok(())
            }
            Token::Print => {
                self.advance();
                self.expect(Token::LParen)?;
                let mut args = vec![self.parse_aexp()?];
                while *self.peek() == Token::Comma {
                    self.advance();
                    args.push(self.parse_aexp()?);
                }
                self.expect(Token::RParen)?;
                self.expect(Token::Semi)?;
                out.push(StmtKind::Print(args));
                Ok(())
            }
            Token::Register(name) => {
                self.advance();
                match self.peek().clone() {
                    Token::Dot => {
                        self.advance();
                        let field = self.expect_ident()?;
                        self.expect(Token::Assign)?;
                        let rhs = self.parse_aexp()?;
                        self.expect(Token::Semi)?;
                        out.push(StmtKind::FieldAssign(Expr::Register(name), field, rhs));
                        Ok(())
                    }
                    Token::Assign => {
                        self.advance();
                        self.parse_register_assignment(name, out)
                    }
                    other => Err(self.error(format!("expected '.' or ':=' after a register, found {other:?}"))),
                }
            }
            other => Err(self.error(format!("expected a statement, found {other:?}"))),
        }
    }

    fn parse_register_assignment(&mut self, register: String, out: &mut Vec<StmtKind>) -> Result<(), SyntaxError> {
        match self.peek().clone() {
            Token::New => {
                self.advance();
                let class_name = self.expect_ident()?;
                self.expect(Token::Semi)?;
                out.push(StmtKind::New(register, class_name));
                Ok(())
            }
            Token::Invoke => {
                self.advance();
                if *self.peek() == Token::Super {
                    self.advance();
                    self.expect(Token::Dot)?;
                    let method = self.expect_ident()?;
                    let args = self.parse_arg_list()?;
                    self.expect(Token::Semi)?;
                    out.push(StmtKind::InvokeSuper(register, method, args));
                    Ok(())
                } else {
                    let receiver = self.parse_aexp()?;
                    self.expect(Token::Dot)?;
                    let method = self.expect_ident()?;
                    let args = self.parse_arg_list()?;
                    self.expect(Token::Semi)?;
                    out.push(StmtKind::Invoke(register, receiver, method, args));
                    Ok(())
                }
            }
            _ => {
                let expr = self.parse_aexp()?;
                self.expect(Token::Semi)?;
                out.push(StmtKind::AssignAExp(register, expr));
                Ok(())
            }
        }
    }

    fn parse_arg_list(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        if *self.peek() != Token::RParen {
            args.push(self.parse_aexp()?);
            while *self.peek() == Token::Comma {
                self.advance();
                args.push(self.parse_aexp()?);
            }
        }
        self.expect(Token::RParen)?;
        Ok(args)
    }

    /// `aexp ::= aexp' ('.' Id)?`
    fn parse_aexp(&mut self) -> Result<Expr, SyntaxError> {
        let primary = self.parse_aexp_primary()?;
        if *self.peek() == Token::Dot {
            self.advance();
            let field = self.expect_ident()?;
            Ok(Expr::Field(Box::new(primary), field))
        } else {
            Ok(primary)
        }
    }

    fn parse_aexp_primary(&mut self) -> Result<Expr, SyntaxError> {
        match self.advance() {
            Token::This => Ok(Expr::This),
            Token::True => Ok(Expr::Bool(true)),
            Token::False => Ok(Expr::Bool(false)),
            Token::Null => Ok(Expr::Null),
            Token::Void => Ok(Expr::Void),
            Token::Register(name) => Ok(Expr::Register(name)),
            Token::Int(value) => Ok(Expr::Int(value)),
            Token::InstanceOf => {
                self.expect(Token::LParen)?;
                let obj = self.parse_aexp()?;
                self.expect(Token::Comma)?;
                let class_name = self.expect_ident()?;
                self.expect(Token::RParen)?;
                Ok(Expr::InstanceOf(Box::new(obj), class_name))
            }
            Token::Plus => self.parse_atomic_op(Op::Add),
            Token::Minus => self.parse_atomic_op(Op::Sub),
            Token::Star => self.parse_atomic_op(Op::Mul),
            Token::Eq => self.parse_atomic_op(Op::Eq),
            other => Err(self.error(format!("expected an expression, found {other:?}"))),
        }
    }

    fn parse_atomic_op(&mut self, op: Op) -> Result<Expr, SyntaxError> {
        let args = self.parse_arg_list()?;
        Ok(Expr::AtomicOp(op, args))
    }

    /// Allocates `items` into the arena in reverse, so every node's `next` is
    /// known at the moment it's created; returns the id of the first statement.
    fn link_tail_first(&mut self, items: Vec<StmtKind>) -> Option<crate::ast::StmtId> {
        let mut next = None;
        for kind in items.into_iter().rev() {
            let label_name = match &kind {
                StmtKind::Label(name) => Some(name.clone()),
                _ => None,
            };
            let id = self.ctx.stmts.alloc(kind, next);
            if let Some(name) = label_name {
                self.ctx.register_label(name, id);
            }
            next = Some(id);
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(src: &str) -> MachineContext {
        let mut ctx = MachineContext::new();
        let _ = parse_file("t.oo", src, &mut ctx).unwrap();
        ctx
    }

    #[test]
    fn parses_a_minimal_class_with_main() {
        let ctx = parsed("class Main extends Object { def main() { print(+(1,2)); return void; } }");
        let main = ctx.classes.get("Main").unwrap();
        assert!(main.methods.contains_key("main"));
    }

    #[test]
    fn field_declarations_and_field_assignment() {
        let ctx = parsed(
            "class Box extends Object { var v; \
             def main() { $a := new Box; $a.v := 42; print($a.v); return void; } }",
        );
        let box_class = ctx.classes.get("Box").unwrap();
        assert!(box_class.fields.contains_key("v"));
    }

    #[test]
    fn goto_and_label_resolve_through_the_context() {
        let ctx = parsed(
            "class Main extends Object { def main() { \
             if =(1,1) goto T; print(0); return void; \
             label T: print(1); return void; } }",
        );
        assert!(ctx.resolve_label("T").is_ok());
    }

    #[test]
    fn invoke_and_invoke_super_parse() {
        let ctx = parsed(
            "class Main extends Object { \
             def main() { $x := invoke $this.id(7); print($x); return void; } \
             def id($n) { return $n; } \
             def delegate() { $y := invoke super.id(1); return $y; } }",
        );
        let main = ctx.classes.get("Main").unwrap();
        assert!(main.methods.contains_key("id"));
        assert!(main.methods.contains_key("delegate"));
    }

    #[test]
    fn handler_statements_parse() {
        let ctx = parsed(
            "class E extends Object {} \
             class Main extends Object { def main() { \
             pushHandler E L; $exc := new E; throw $exc; \
             label L: moveException $e; print(1); popHandler; return void; } }",
        );
        assert!(ctx.classes.get("E").is_some());
    }

    #[test]
    fn unterminated_class_is_a_syntax_error() {
        let mut ctx = MachineContext::new();
        assert!(parse_file("t.oo", "class Main extends Object {", &mut ctx).is_err());
    }
}
