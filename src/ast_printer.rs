use crate::expr::{Expr, LiteralValue};

/// Converts an expression to a parenthesised prefix form.  Debug tooling
/// only (the `--ast` dump); nothing in the pipeline depends on it.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(literal) => match literal {
                LiteralValue::True => "true".into(),

                LiteralValue::False => "false".into(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => s.clone(),

                LiteralValue::Integer(n) => n.to_string(),

                LiteralValue::Real(n) => {
                    if n.fract() == 0.0 {
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }
            },

            // ── grouping ────────────────────────────────────────────────
            Expr::Grouping(inner) => format!("(group {})", Self::print(inner)),

            // ── operators ───────────────────────────────────────────────
            Expr::Unary(operator, right) => {
                format!("({} {})", operator.lexeme, Self::print(right))
            }

            Expr::Binary(left, operator, right) | Expr::Logical(left, operator, right) => {
                format!(
                    "({} {} {})",
                    operator.lexeme,
                    Self::print(left),
                    Self::print(right)
                )
            }

            // ── names and assignment ────────────────────────────────────
            Expr::Variable(_, name) => name.lexeme.clone(),

            Expr::Assign(_, name, value) => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            // ── calls and properties ────────────────────────────────────
            Expr::Call(callee, _, arguments) => {
                let mut s = format!("(call {}", Self::print(callee));
                for argument in arguments {
                    s.push(' ');
                    s.push_str(&Self::print(argument));
                }
                s.push(')');
                s
            }

            Expr::Get(object, name) => format!("(. {} {})", Self::print(object), name.lexeme),

            Expr::Set(object, name, value) => format!(
                "(= (. {} {}) {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),

            Expr::This(_, _) => "this".into(),

            Expr::Super(_, _, method) => format!("(super {})", method.lexeme),

            Expr::Empty => String::new(),
        }
    }
}
