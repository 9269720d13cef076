use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_until, take_while1},
    character::complete::{alphanumeric1, char, multispace0},
    combinator::{map, not, opt, peek},
    error::{Error, ErrorKind},
    multi::separated_list0,
    sequence::{delimited, preceded, separated_pair, terminated},
    IResult, Parser,
};

use super::ast::{
    CaseExpression, Expression, FunctionCall, ListComprehension, Literal, Operator,
    OperatorApplication, PropertyAccess,
};
use super::common::{self, ws};

pub fn parse_expression(input: &'_ str) -> IResult<&'_ str, Expression<'_>> {
    parse_logical_or(input)
}

fn parse_logical_or(input: &'_ str) -> IResult<&'_ str, Expression<'_>> {
    let (input, lhs) = parse_logical_and(input)?;

    let mut remaining_input = input;
    let mut final_expression = lhs;

    loop {
        // `OR`/`XOR` must not swallow the start of `ORDER`.
        let res = (
            ws(terminated(
                alt((
                    map(tag_no_case("XOR"), |_| Operator::Xor),
                    map(tag_no_case("OR"), |_| Operator::Or),
                )),
                not(peek(alphanumeric1)),
            )),
            parse_logical_and,
        )
            .parse(remaining_input);

        match res {
            Ok((new_input, (operator, rhs))) => {
                final_expression = Expression::Operator(OperatorApplication {
                    operator,
                    operands: vec![final_expression, rhs],
                });
                remaining_input = new_input;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }

    Ok((remaining_input, final_expression))
}

fn parse_logical_and(input: &'_ str) -> IResult<&'_ str, Expression<'_>> {
    let (input, lhs) = parse_not_expression(input)?;

    let mut remaining_input = input;
    let mut final_expression = lhs;

    loop {
        let res = preceded(
            ws(terminated(tag_no_case("AND"), not(peek(alphanumeric1)))),
            parse_not_expression,
        )
        .parse(remaining_input);

        match res {
            Ok((new_input, rhs)) => {
                final_expression = Expression::Operator(OperatorApplication {
                    operator: Operator::And,
                    operands: vec![final_expression, rhs],
                });
                remaining_input = new_input;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }

    Ok((remaining_input, final_expression))
}

// NOT binds looser than comparisons: `NOT a > 1` negates the comparison.
fn parse_not_expression(input: &'_ str) -> IResult<&'_ str, Expression<'_>> {
    alt((
        map(
            preceded(
                ws(terminated(tag_no_case("NOT"), not(peek(alphanumeric1)))),
                parse_not_expression,
            ),
            |expr| {
                Expression::Operator(OperatorApplication {
                    operator: Operator::Not,
                    operands: vec![expr],
                })
            },
        ),
        parse_comparison_expression,
    ))
    .parse(input)
}

/// Keyword operator followed by a non-identifier character, so `IN` never
/// eats the head of an identifier.
fn keyword_operator<'a>(
    kw: &'static str,
    operator: Operator,
) -> impl Parser<&'a str, Output = Operator, Error = Error<&'a str>> {
    map(
        terminated(tag_no_case(kw), not(peek(alphanumeric1))),
        move |_| operator,
    )
}

fn parse_comparison_operator(input: &str) -> IResult<&str, Operator> {
    alt((
        map(tag(">="), |_| Operator::GreaterThanEqual),
        map(tag("<="), |_| Operator::LessThanEqual),
        map(tag("<>"), |_| Operator::NotEqual),
        // `=~` must come before `=`.
        map(tag("=~"), |_| Operator::RegexMatch),
        map(tag(">"), |_| Operator::GreaterThan),
        map(tag("<"), |_| Operator::LessThan),
        map(tag("="), |_| Operator::Equal),
        map(
            preceded(ws(tag_no_case("STARTS")), tag_no_case("WITH")),
            |_| Operator::StartsWith,
        ),
        map(preceded(ws(tag_no_case("ENDS")), tag_no_case("WITH")), |_| {
            Operator::EndsWith
        }),
        keyword_operator("CONTAINS", Operator::Contains),
        map(
            preceded(
                ws(tag_no_case("NOT")),
                terminated(tag_no_case("IN"), not(peek(alphanumeric1))),
            ),
            |_| Operator::NotIn,
        ),
        keyword_operator("IN", Operator::In),
    ))
    .parse(input)
}

fn parse_comparison_expression(input: &'_ str) -> IResult<&'_ str, Expression<'_>> {
    let (input, lhs) = parse_add_expression(input)?;

    let mut remaining_input = input;
    let mut final_expression = lhs;

    loop {
        let res = (ws(parse_comparison_operator), parse_add_expression).parse(remaining_input);
        match res {
            Ok((new_input, (op, rhs))) => {
                final_expression = Expression::Operator(OperatorApplication {
                    operator: op,
                    operands: vec![final_expression, rhs],
                });
                remaining_input = new_input;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    Ok((remaining_input, final_expression))
}

fn parse_add_operator(input: &str) -> IResult<&str, Operator> {
    alt((
        map(tag("+"), |_| Operator::Addition),
        map(tag("-"), |_| Operator::Subtraction),
    ))
    .parse(input)
}

fn parse_add_expression(input: &'_ str) -> IResult<&'_ str, Expression<'_>> {
    let (input, lhs) = parse_multiply_expression(input)?;

    let mut remaining_input = input;
    let mut final_expression = lhs;

    loop {
        let res = (ws(parse_add_operator), parse_multiply_expression).parse(remaining_input);
        match res {
            Ok((new_input, (op, rhs))) => {
                final_expression = Expression::Operator(OperatorApplication {
                    operator: op,
                    operands: vec![final_expression, rhs],
                });
                remaining_input = new_input;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    Ok((remaining_input, final_expression))
}

fn parse_multiply_operator(input: &str) -> IResult<&str, Operator> {
    alt((
        map(tag("*"), |_| Operator::Multiplication),
        map(tag("/"), |_| Operator::Division),
        map(tag("%"), |_| Operator::Modulo),
    ))
    .parse(input)
}

fn parse_multiply_expression(input: &'_ str) -> IResult<&'_ str, Expression<'_>> {
    let (input, lhs) = parse_power_expression(input)?;

    let mut remaining_input = input;
    let mut final_expression = lhs;

    loop {
        let res = (ws(parse_multiply_operator), parse_power_expression).parse(remaining_input);
        match res {
            Ok((new_input, (op, rhs))) => {
                final_expression = Expression::Operator(OperatorApplication {
                    operator: op,
                    operands: vec![final_expression, rhs],
                });
                remaining_input = new_input;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    Ok((remaining_input, final_expression))
}

fn parse_power_expression(input: &'_ str) -> IResult<&'_ str, Expression<'_>> {
    let (input, lhs) = parse_postfix_expression(input)?;

    let mut remaining_input = input;
    let mut final_expression = lhs;

    loop {
        let res = preceded(ws(tag("^")), parse_postfix_expression).parse(remaining_input);
        match res {
            Ok((new_input, rhs)) => {
                final_expression = Expression::Operator(OperatorApplication {
                    operator: Operator::Exponentiation,
                    operands: vec![final_expression, rhs],
                });
                remaining_input = new_input;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    Ok((remaining_input, final_expression))
}

// Atom plus the optional `IS [NOT] NULL` postfix.
fn parse_postfix_expression(input: &'_ str) -> IResult<&'_ str, Expression<'_>> {
    let (input, expr) = parse_atom(input)?;

    let (input, opt_op) = opt(preceded(
        ws(tag_no_case("IS")),
        alt((
            map(
                preceded(ws(tag_no_case("NOT")), tag_no_case("NULL")),
                |_| Operator::IsNotNull,
            ),
            map(tag_no_case("NULL"), |_| Operator::IsNull),
        )),
    ))
    .parse(input)?;

    match opt_op {
        Some(op) => Ok((
            input,
            Expression::Operator(OperatorApplication {
                operator: op,
                operands: vec![expr],
            }),
        )),
        None => Ok((input, expr)),
    }
}

fn parse_atom(input: &'_ str) -> IResult<&'_ str, Expression<'_>> {
    alt((
        parse_case_expression,
        parse_list_comprehension,
        parse_list_literal,
        parse_map_literal,
        parse_function_call,
        parse_parameter,
        parse_property_access,
        parse_literal_or_variable,
        delimited(ws(char('(')), parse_expression, ws(char(')'))),
    ))
    .parse(input)
}

fn parse_case_expression(input: &'_ str) -> IResult<&'_ str, Expression<'_>> {
    let (input, _) = ws(terminated(tag_no_case("CASE"), not(peek(alphanumeric1)))).parse(input)?;

    // Searched CASE starts directly with WHEN; the simple form carries a
    // subject expression first.
    let (input, subject) = opt(preceded(
        not(peek(ws(tag_no_case::<_, _, Error<&str>>("WHEN")))),
        parse_expression,
    ))
    .parse(input)?;

    let mut when_then = Vec::new();
    let mut remaining_input = input;
    loop {
        let res = preceded(
            ws(tag_no_case("WHEN")),
            separated_pair(parse_expression, ws(tag_no_case("THEN")), parse_expression),
        )
        .parse(remaining_input);
        match res {
            Ok((new_input, pair)) => {
                when_then.push(pair);
                remaining_input = new_input;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    if when_then.is_empty() {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)));
    }

    let (input, else_expr) =
        opt(preceded(ws(tag_no_case("ELSE")), parse_expression)).parse(remaining_input)?;
    let (input, _) = ws(tag_no_case("END")).parse(input)?;

    Ok((
        input,
        Expression::Case(CaseExpression {
            subject: subject.map(Box::new),
            when_then,
            else_expr: else_expr.map(Box::new),
        }),
    ))
}

/// `[x IN list WHERE cond | expr]`. Parsed so the generator can reject it
/// with a descriptive error rather than a grammar failure.
fn parse_list_comprehension(input: &'_ str) -> IResult<&'_ str, Expression<'_>> {
    let (input, _) = ws(char('[')).parse(input)?;
    let (input, variable) = ws(parse_variable_name).parse(input)?;
    let (input, _) = ws(terminated(tag_no_case("IN"), not(peek(alphanumeric1)))).parse(input)?;
    let (input, list) = parse_expression(input)?;
    let (input, filter) =
        opt(preceded(ws(tag_no_case("WHERE")), parse_expression)).parse(input)?;
    let (input, projection) = opt(preceded(ws(char('|')), parse_expression)).parse(input)?;
    let (input, _) = ws(char(']')).parse(input)?;

    Ok((
        input,
        Expression::ListComprehension(Box::new(ListComprehension {
            variable,
            list,
            filter,
            projection,
        })),
    ))
}

pub fn parse_function_call(input: &'_ str) -> IResult<&'_ str, Expression<'_>> {
    let (input, name) = ws(parse_variable_name).parse(input)?;
    let (input, _) = char('(').parse(input)?;
    let (input, distinct) =
        opt(ws(terminated(tag_no_case("DISTINCT"), not(peek(alphanumeric1))))).parse(input)?;
    let (input, args) = separated_list0(ws(char(',')), parse_function_argument).parse(input)?;
    let (input, _) = ws(char(')')).parse(input)?;

    Ok((
        input,
        Expression::FunctionCall(FunctionCall {
            name,
            distinct: distinct.is_some(),
            args,
        }),
    ))
}

// `count(*)` takes the star as a pseudo-variable argument.
fn parse_function_argument(input: &'_ str) -> IResult<&'_ str, Expression<'_>> {
    alt((
        map(ws(tag("*")), |s: &str| Expression::Variable(s)),
        parse_expression,
    ))
    .parse(input)
}

/// Map literal: `{key: value, ...}`.
pub fn parse_map_literal(input: &'_ str) -> IResult<&'_ str, Expression<'_>> {
    let (input, entries) = delimited(
        ws(char('{')),
        separated_list0(
            ws(char(',')),
            separated_pair(ws(common::parse_identifier), char(':'), parse_expression),
        ),
        ws(char('}')),
    )
    .parse(input)?;

    Ok((input, Expression::Map(entries)))
}

pub fn parse_list_literal(input: &'_ str) -> IResult<&'_ str, Expression<'_>> {
    let (input, exprs) = delimited(
        ws(char('[')),
        separated_list0(ws(char(',')), parse_expression),
        ws(char(']')),
    )
    .parse(input)?;

    Ok((input, Expression::List(exprs)))
}

fn is_param_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub fn parse_parameter(input: &'_ str) -> IResult<&'_ str, Expression<'_>> {
    let (input, _) = multispace0.parse(input)?;
    let (input, param) = preceded(tag("$"), take_while1(is_param_char)).parse(input)?;
    Ok((input, Expression::Parameter(param)))
}

/// Identifier usable as a variable or function name: rejects reserved words
/// so clause keywords terminate expressions.
pub fn parse_variable_name(input: &str) -> IResult<&str, &str> {
    let (rest, name) = common::parse_identifier(input)?;
    if common::is_reserved_keyword(name) {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)));
    }
    Ok((rest, name))
}

pub fn parse_property_access(input: &'_ str) -> IResult<&'_ str, Expression<'_>> {
    let (input, _) = multispace0.parse(input)?;
    let (input, base) = parse_variable_name(input)?;
    let (input, _) = char('.').parse(input)?;
    let (input, key) = common::parse_identifier(input)?;

    Ok((input, Expression::PropertyAccess(PropertyAccess { base, key })))
}

pub fn parse_literal_or_variable(input: &'_ str) -> IResult<&'_ str, Expression<'_>> {
    alt((
        map(ws(parse_string_literal), Expression::Literal),
        map(ws(parse_double_quoted_string_literal), Expression::Literal),
        map(ws(parse_numeric), Expression::Literal),
        |input| {
            let (remaining, word) = ws(common::parse_identifier).parse(input)?;
            if word.eq_ignore_ascii_case("null") {
                Ok((remaining, Expression::Literal(Literal::Null)))
            } else if word.eq_ignore_ascii_case("true") {
                Ok((remaining, Expression::Literal(Literal::Boolean(true))))
            } else if word.eq_ignore_ascii_case("false") {
                Ok((remaining, Expression::Literal(Literal::Boolean(false))))
            } else if common::is_reserved_keyword(word) {
                Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)))
            } else {
                Ok((remaining, Expression::Variable(word)))
            }
        },
    ))
    .parse(input)
}

fn parse_numeric(input: &'_ str) -> IResult<&'_ str, Literal<'_>> {
    let (rest, text) = common::parse_numeric_literal(input)?;
    if let Ok(i) = text.parse::<i64>() {
        Ok((rest, Literal::Integer(i)))
    } else if let Ok(f) = text.parse::<f64>() {
        Ok((rest, Literal::Float(f)))
    } else {
        Err(nom::Err::Error(Error::new(input, ErrorKind::Digit)))
    }
}

pub fn parse_string_literal(input: &'_ str) -> IResult<&'_ str, Literal<'_>> {
    let (input, s) = delimited(char('\''), take_until("'"), char('\'')).parse(input)?;
    Ok((input, Literal::String(s)))
}

pub fn parse_double_quoted_string_literal(input: &'_ str) -> IResult<&'_ str, Literal<'_>> {
    let (input, s) = delimited(char('"'), take_until("\""), char('"')).parse(input)?;
    Ok((input, Literal::String(s)))
}
