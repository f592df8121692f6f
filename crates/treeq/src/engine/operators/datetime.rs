//! `format_datetime`, `tz` and `now`.
//!
//! Layouts and formats are strftime patterns; the marker
//! [`RFC3339_LAYOUT`](crate::engine::config::RFC3339_LAYOUT) selects RFC 3339.
//! A single argument is the target format (or zone) and the layout comes from
//! the engine configuration; `f(layout; x)` overrides it.

use super::fresh_candidate;
use crate::compiler::ir::{ExpressionNode, Operation};
use crate::engine::config::RFC3339_LAYOUT;
use crate::engine::context::Context;
use crate::engine::navigator::Navigator;
use crate::engine::runtime::Error;
use crate::model::scalar::is_timestamp;
use crate::model::{NodeId, NodeTree, Scalar, ScalarTag};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone};
use core::fmt::{Display, Write};

pub(crate) fn format_datetime(
    nav: &mut Navigator,
    tree: &mut NodeTree,
    ctx: &Context,
    expr: &ExpressionNode,
) -> Result<Context, Error> {
    let (layout, format) = layout_and_param(nav, tree, ctx, expr, "format")?;
    let mut results = Vec::with_capacity(ctx.len());
    for candidate in ctx {
        let parsed = parse_candidate(tree, candidate.node, &layout)
            .map_err(|e| parse_failure(&candidate.nice_path(), &layout, e))?;
        let text = render(&parsed, &format)?;
        let tag = if is_timestamp(&text) { ScalarTag::Timestamp } else { ScalarTag::Str };
        let id = tree.alloc_scalar(Scalar::new(tag, text));
        results.push(candidate.create_replacement(id));
    }
    Ok(ctx.child_context(results))
}

/// Converts into the named zone, keeping layout and tag.
pub(crate) fn time_zone(
    nav: &mut Navigator,
    tree: &mut NodeTree,
    ctx: &Context,
    expr: &ExpressionNode,
) -> Result<Context, Error> {
    let (layout, zone) = layout_and_param(nav, tree, ctx, expr, "timezone")?;
    let tz: chrono_tz::Tz = zone
        .parse()
        .map_err(|e| Error::environment(format!("could not load tz [{zone}]: {e}")))?;

    let mut results = Vec::with_capacity(ctx.len());
    for candidate in ctx {
        let parsed = parse_candidate(tree, candidate.node, &layout)
            .map_err(|e| parse_failure(&candidate.nice_path(), &layout, e))?;
        let text = render(&parsed.with_timezone(&tz), &layout)?;
        let tag = tree.scalar(tree.resolve(candidate.node)).map_or(ScalarTag::Str, |s| s.tag);
        let id = tree.alloc_scalar(Scalar::new(tag, text));
        results.push(candidate.create_replacement(id));
    }
    Ok(ctx.child_context(results))
}

pub(crate) fn now(nav: &mut Navigator, tree: &mut NodeTree, ctx: &Context) -> Context {
    let now = nav.config().clock.unwrap_or_else(|| Local::now().fixed_offset());
    let id = tree.alloc_scalar(Scalar::timestamp(now.to_rfc3339_opts(SecondsFormat::Secs, true)));
    ctx.single_child_context(fresh_candidate(ctx, id))
}

fn layout_and_param(
    nav: &mut Navigator,
    tree: &mut NodeTree,
    ctx: &Context,
    expr: &ExpressionNode,
    name: &str,
) -> Result<(String, String), Error> {
    match expr.rhs.as_deref() {
        Some(block) if block.operation == Operation::Block => {
            let layout = string_param(nav, tree, ctx, block.lhs.as_deref(), "layout")?;
            let other = string_param(nav, tree, ctx, block.rhs.as_deref(), name)?;
            Ok((layout, other))
        }
        single => {
            let other = string_param(nav, tree, ctx, single, name)?;
            Ok((nav.config().datetime_layout.clone(), other))
        }
    }
}

fn string_param(
    nav: &mut Navigator,
    tree: &mut NodeTree,
    ctx: &Context,
    param: Option<&ExpressionNode>,
    name: &str,
) -> Result<String, Error> {
    let missing = || Error::precondition(format!("could not find {name} for format_datetime"));
    let param = param.ok_or_else(missing)?;
    let out = nav.evaluate(tree, &ctx.read_only_clone(), param)?;
    let first = out.first().ok_or_else(missing)?;
    Ok(scalar_text(tree, first.node))
}

fn scalar_text(tree: &NodeTree, id: NodeId) -> String {
    match tree.scalar(tree.resolve(id)) {
        Some(s) => s.value.clone(),
        None => tree.render(id),
    }
}

fn parse_candidate(
    tree: &NodeTree,
    id: NodeId,
    layout: &str,
) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    parse_datetime(&scalar_text(tree, id), layout)
}

/// Zone-less layouts are read as UTC; date-only layouts as midnight UTC.
pub(crate) fn parse_datetime(
    text: &str,
    layout: &str,
) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    if layout == RFC3339_LAYOUT {
        return DateTime::parse_from_rfc3339(text.trim());
    }
    if let Ok(dt) = DateTime::parse_from_str(text, layout) {
        return Ok(dt);
    }
    match NaiveDateTime::parse_from_str(text, layout) {
        Ok(naive) => Ok(naive.and_utc().fixed_offset()),
        Err(err) => match NaiveDate::parse_from_str(text, layout) {
            Ok(date) => Ok(date.and_time(NaiveTime::MIN).and_utc().fixed_offset()),
            Err(_) => Err(err),
        },
    }
}

fn parse_failure(path: &str, layout: &str, err: chrono::ParseError) -> Error {
    Error::parse(format!("could not parse datetime of [{path}] using layout [{layout}]: {err}"))
        .with_source(err)
}

fn render<Tz: TimeZone>(dt: &DateTime<Tz>, format: &str) -> Result<String, Error>
where
    Tz::Offset: Display,
{
    if format == RFC3339_LAYOUT {
        return Ok(dt.to_rfc3339_opts(SecondsFormat::Secs, true));
    }
    let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(Error::parse(format!("invalid datetime format [{format}]")));
    }
    let mut out = String::new();
    write!(out, "{}", dt.format_with_items(items.iter()))
        .map_err(|_| Error::parse(format!("cannot render datetime with format [{format}]")))?;
    Ok(out)
}
