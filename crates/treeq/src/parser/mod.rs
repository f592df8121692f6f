use pest::Parser;
use pest::Span;
use pest::error::{Error, ErrorVariant};
use pest::iterators::{Pair, Pairs};

pub mod ast;

use ast::{BinaryOp, Expr, Key, Literal};

#[derive(pest_derive::Parser)]
#[grammar = "treeq.pest"]
pub struct TreeqParser;

type ParseResult<T> = Result<T, Error<Rule>>;

/// Parse expression text into its syntax tree. An empty expression is `.`.
pub fn parse_expression(input: &str) -> Result<Expr, crate::engine::runtime::Error> {
    TreeqParser::parse_to_ast(input).map_err(|e| {
        crate::engine::runtime::Error::syntax(format!(
            "cannot parse expression [{input}]: {}",
            e.variant.message()
        ))
        .with_source(e)
    })
}

fn custom_error(span: Span<'_>, message: impl Into<String>) -> Error<Rule> {
    Error::new_from_span(ErrorVariant::CustomError { message: message.into() }, span)
}

/// First inner pair with `rule`.
fn child<'i>(pair: &Pair<'i, Rule>, rule: Rule) -> ParseResult<Pair<'i, Rule>> {
    pair.clone()
        .into_inner()
        .find(|p| p.as_rule() == rule)
        .ok_or_else(|| custom_error(pair.as_span(), format!("expected {rule:?}")))
}

fn children<'i>(pair: &Pair<'i, Rule>, rule: Rule) -> impl Iterator<Item = Pair<'i, Rule>> {
    pair.clone().into_inner().filter(move |p| p.as_rule() == rule)
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

impl TreeqParser {
    pub fn parse_to_ast(input: &str) -> ParseResult<Expr> {
        let mut pairs: Pairs<'_, Rule> = Self::parse(Rule::program, input)?;
        let Some(program) = pairs.next() else {
            return Ok(Expr::Identity);
        };
        match children(&program, Rule::pipeline).next() {
            Some(pipeline) => Self::build_pipeline(&pipeline),
            None => Ok(Expr::Identity),
        }
    }

    fn build_pipeline(pair: &Pair<Rule>) -> ParseResult<Expr> {
        let left = Self::build_union(&child(pair, Rule::union_expr)?)?;
        let clause = pair
            .clone()
            .into_inner()
            .find(|p| matches!(p.as_rule(), Rule::as_clause | Rule::pipe_clause));
        let Some(clause) = clause else {
            return Ok(left);
        };
        let body = Self::build_pipeline(&child(&clause, Rule::pipeline)?)?;
        if clause.as_rule() == Rule::as_clause {
            let variable = child(&clause, Rule::variable)?;
            let name = child(&variable, Rule::ident)?.as_str().to_string();
            return Ok(Expr::Bind { source: Box::new(left), name, body: Box::new(body) });
        }
        Ok(Expr::binary(left, BinaryOp::Pipe, body))
    }

    fn fold_left(
        pair: &Pair<Rule>,
        operand: Rule,
        op: BinaryOp,
        build: fn(&Pair<Rule>) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let mut operands = children(pair, operand);
        let first = operands
            .next()
            .ok_or_else(|| custom_error(pair.as_span(), "missing operand"))?;
        let mut expr = build(&first)?;
        for next in operands {
            expr = Expr::binary(expr, op, build(&next)?);
        }
        Ok(expr)
    }

    fn build_union(pair: &Pair<Rule>) -> ParseResult<Expr> {
        Self::fold_left(pair, Rule::assign_expr, BinaryOp::Comma, Self::build_assign)
    }

    // right associative: `.a = .b = 1` is `.a = (.b = 1)`
    fn build_assign(pair: &Pair<Rule>) -> ParseResult<Expr> {
        let left = Self::build_or(&child(pair, Rule::or_expr)?)?;
        let Ok(op) = child(pair, Rule::assign_op) else {
            return Ok(left);
        };
        let right = Self::build_assign(&child(pair, Rule::assign_expr)?)?;
        let op = if op.as_str() == "|=" { BinaryOp::Update } else { BinaryOp::Assign };
        Ok(Expr::binary(left, op, right))
    }

    fn build_or(pair: &Pair<Rule>) -> ParseResult<Expr> {
        Self::fold_left(pair, Rule::and_expr, BinaryOp::Or, Self::build_and)
    }

    fn build_and(pair: &Pair<Rule>) -> ParseResult<Expr> {
        Self::fold_left(pair, Rule::cmp_expr, BinaryOp::And, Self::build_cmp)
    }

    fn build_cmp(pair: &Pair<Rule>) -> ParseResult<Expr> {
        let mut operands = children(pair, Rule::mul_expr);
        let left = operands
            .next()
            .ok_or_else(|| custom_error(pair.as_span(), "missing operand"))?;
        let left = Self::build_mul(&left)?;
        match (child(pair, Rule::cmp_op), operands.next()) {
            (Ok(op), Some(right)) => {
                let op = if op.as_str() == "==" { BinaryOp::Eq } else { BinaryOp::Ne };
                Ok(Expr::binary(left, op, Self::build_mul(&right)?))
            }
            _ => Ok(left),
        }
    }

    fn build_mul(pair: &Pair<Rule>) -> ParseResult<Expr> {
        Self::fold_left(pair, Rule::postfix, BinaryOp::Mul, Self::build_postfix)
    }

    fn build_postfix(pair: &Pair<Rule>) -> ParseResult<Expr> {
        let mut expr = Self::build_primary(&child(pair, Rule::primary)?)?;
        for suffix in children(pair, Rule::suffix) {
            let Some(inner) = suffix.clone().into_inner().next() else {
                continue;
            };
            expr = match inner.as_rule() {
                Rule::dot_key => Expr::Key {
                    target: Box::new(expr),
                    key: Self::build_key(&child(&inner, Rule::path_key)?)?,
                    optional: false,
                },
                Rule::index => {
                    let index = match children(&inner, Rule::pipeline).next() {
                        Some(p) => Some(Box::new(Self::build_pipeline(&p)?)),
                        None => None,
                    };
                    Expr::Index { target: Box::new(expr), index, optional: false }
                }
                Rule::optional => match expr {
                    Expr::Key { target, key, .. } => Expr::Key { target, key, optional: true },
                    Expr::Index { target, index, .. } => Expr::Index { target, index, optional: true },
                    _ => {
                        return Err(custom_error(inner.as_span(), "`?` must follow a path step"));
                    }
                },
                other => {
                    return Err(custom_error(inner.as_span(), format!("unexpected {other:?}")));
                }
            };
        }
        Ok(expr)
    }

    fn build_primary(pair: &Pair<Rule>) -> ParseResult<Expr> {
        let inner = pair
            .clone()
            .into_inner()
            .next()
            .ok_or_else(|| custom_error(pair.as_span(), "empty term"))?;
        match inner.as_rule() {
            Rule::recurse_keys => Ok(Expr::Recurse { include_keys: true }),
            Rule::recurse => Ok(Expr::Recurse { include_keys: false }),
            Rule::root_path => match children(&inner, Rule::path_key).next() {
                Some(key) => Ok(Expr::Key {
                    target: Box::new(Expr::Identity),
                    key: Self::build_key(&key)?,
                    optional: false,
                }),
                None => Ok(Expr::Identity),
            },
            Rule::literal => Self::build_literal(&inner).map(Expr::Literal),
            Rule::variable => Ok(Expr::Variable(child(&inner, Rule::ident)?.as_str().to_string())),
            Rule::collect => match children(&inner, Rule::pipeline).next() {
                Some(p) => Ok(Expr::Collect(Some(Box::new(Self::build_pipeline(&p)?)))),
                None => Ok(Expr::Collect(None)),
            },
            Rule::object => {
                let entries = children(&inner, Rule::object_entry)
                    .map(|entry| Self::build_object_entry(&entry))
                    .collect::<ParseResult<Vec<_>>>()?;
                Ok(Expr::Object(entries))
            }
            Rule::paren => Self::build_pipeline(&child(&inner, Rule::pipeline)?),
            Rule::call => {
                let name = child(&inner, Rule::ident)?.as_str().to_string();
                let args = children(&inner, Rule::pipeline)
                    .map(|p| Self::build_pipeline(&p))
                    .collect::<ParseResult<Vec<_>>>()?;
                Ok(Expr::Call { name, args })
            }
            other => Err(custom_error(inner.as_span(), format!("unexpected {other:?}"))),
        }
    }

    fn build_key(pair: &Pair<Rule>) -> ParseResult<Key> {
        let inner = pair
            .clone()
            .into_inner()
            .next()
            .ok_or_else(|| custom_error(pair.as_span(), "empty key"))?;
        match inner.as_rule() {
            Rule::quoted_key => {
                Ok(Key::Name(unescape(child(&inner, Rule::string_inner)?.as_str())))
            }
            Rule::int_key => inner
                .as_str()
                .parse()
                .map(Key::Index)
                .map_err(|_| custom_error(inner.as_span(), "index out of range")),
            _ => Ok(Key::Name(inner.as_str().to_string())),
        }
    }

    fn build_literal(pair: &Pair<Rule>) -> ParseResult<Literal> {
        let inner = pair
            .clone()
            .into_inner()
            .next()
            .ok_or_else(|| custom_error(pair.as_span(), "empty literal"))?;
        let text = inner.as_str();
        match inner.as_rule() {
            Rule::kw_null => Ok(Literal::Null),
            Rule::kw_true => Ok(Literal::Boolean(true)),
            Rule::kw_false => Ok(Literal::Boolean(false)),
            Rule::integer => text
                .parse()
                .map(Literal::Integer)
                .map_err(|_| custom_error(inner.as_span(), "integer out of range")),
            Rule::float => text
                .parse()
                .map(Literal::Double)
                .map_err(|_| custom_error(inner.as_span(), "invalid number")),
            Rule::string => Ok(Literal::String(unescape(child(&inner, Rule::string_inner)?.as_str()))),
            other => Err(custom_error(inner.as_span(), format!("unexpected {other:?}"))),
        }
    }

    fn build_object_entry(pair: &Pair<Rule>) -> ParseResult<(Expr, Expr)> {
        let key_pair = child(pair, Rule::object_key)?;
        let key_inner = key_pair
            .clone()
            .into_inner()
            .next()
            .ok_or_else(|| custom_error(key_pair.as_span(), "empty object key"))?;
        let (key, name) = match key_inner.as_rule() {
            Rule::ident => {
                let name = key_inner.as_str().to_string();
                (Expr::Literal(Literal::String(name.clone())), Some(name))
            }
            Rule::string => {
                let name = unescape(child(&key_inner, Rule::string_inner)?.as_str());
                (Expr::Literal(Literal::String(name.clone())), Some(name))
            }
            Rule::variable => {
                let name = child(&key_inner, Rule::ident)?.as_str().to_string();
                (Expr::Variable(name.clone()), None)
            }
            _ => (Self::build_pipeline(&child(&key_inner, Rule::pipeline)?)?, None),
        };

        if let Some(value) = children(pair, Rule::or_expr).next() {
            return Ok((key, Self::build_or(&value)?));
        }
        // shorthand: `{a}` is `{a: .a}`, `{$x}` is `{x: $x}`
        match (key, name) {
            (key, Some(name)) => Ok((
                key,
                Expr::Key { target: Box::new(Expr::Identity), key: Key::Name(name), optional: false },
            )),
            (Expr::Variable(var), None) => {
                Ok((Expr::Literal(Literal::String(var.clone())), Expr::Variable(var)))
            }
            _ => Err(custom_error(pair.as_span(), "object entry needs a value")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn key(target: Expr, name: &str) -> Expr {
        Expr::Key { target: Box::new(target), key: Key::Name(name.into()), optional: false }
    }

    #[test]
    fn nested_path_is_left_nested() {
        let ast = TreeqParser::parse_to_ast(".a.b").unwrap();
        assert_eq!(ast, key(key(Expr::Identity, "a"), "b"));
    }

    #[test]
    fn pipe_is_looser_than_comma() {
        let ast = TreeqParser::parse_to_ast(".a, .b | .c").unwrap();
        let Expr::Binary { op: BinaryOp::Pipe, left, .. } = ast else {
            panic!("expected pipe at the root");
        };
        assert!(matches!(*left, Expr::Binary { op: BinaryOp::Comma, .. }));
    }

    #[test]
    fn update_is_not_a_pipe() {
        let ast = TreeqParser::parse_to_ast(".a |= 1").unwrap();
        assert!(matches!(ast, Expr::Binary { op: BinaryOp::Update, .. }));
    }

    #[test]
    fn optional_marks_the_last_step() {
        let ast = TreeqParser::parse_to_ast(".a[0]?").unwrap();
        assert!(matches!(ast, Expr::Index { optional: true, .. }));
    }

    #[test]
    fn object_shorthand() {
        let ast = TreeqParser::parse_to_ast("{a}").unwrap();
        assert_eq!(
            ast,
            Expr::Object(vec![(Expr::Literal(Literal::String("a".into())), key(Expr::Identity, "a"))])
        );
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("..")]
    #[case("...")]
    #[case(".a*")]
    #[case(".\"a b\".c")]
    #[case(".a[]")]
    #[case(".[-1]")]
    #[case(".a as $x | $x")]
    #[case("[.[] | select(. == 1)]")]
    #[case("{a: 1, \"b\": .c, (.d): 2}")]
    #[case(".a.b.0 = 1.5")]
    #[case("format_datetime(\"%Y\"; \"%d\")")]
    #[case(".a and .b or not")]
    #[case(". * {\"x\": null} | unique_by(.name)")]
    fn accepts(#[case] input: &str) {
        assert!(TreeqParser::parse_to_ast(input).is_ok(), "{input}");
    }

    #[rstest]
    #[case(".a |")]
    #[case("[1")]
    #[case("1?")]
    #[case("$")]
    #[case(".a = ")]
    fn rejects(#[case] input: &str) {
        assert!(TreeqParser::parse_to_ast(input).is_err(), "{input}");
    }
}
