//! Extends Handlebars with the template helpers: `math`, `compare`,
//! `condition`, `case`, `repeat`, `datetime`, `advanced_datetime` and
//! `custom_datetime`.
//!
//! The helpers are registered once per `TemplateEngine`; rendering only
//! reads the registry.
//!
//! ```rust
//! use notetmpl_lib::datetime::{DateAndTimeUtils, FixedClock};
//! use notetmpl_lib::helpers::TemplateEngine;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let clock = Arc::new(FixedClock::from_unix_millis(1628787894117).unwrap());
//! let engine = TemplateEngine::new(DateAndTimeUtils::new(
//!     "en_GB", "DD/MM/YYYY", "HH:mm", clock,
//! ));
//! let out = engine
//!     .render(r#"{{math 10 "%" 3}} {{case "upper" name}}"#, &json!({"name": "x"}))
//!     .unwrap();
//! assert_eq!(out, "1 X");
//! ```
use crate::attributes::{AttributeDefinition, AttributeParser, ParsedAttributes};
use crate::config::TMPL_VAR_REPEAT_INDEX;
use crate::datetime::{add_duration, add_months, DateAndTimeUtils};
use crate::error::{DateTimeError, NoteError};
use crate::js_value::{
    js_partial_cmp, loose_eq, number_value, parse_float, parse_int, strict_eq, to_js_string,
    truthy,
};
use handlebars::{
    BlockContext, Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext,
    RenderError, RenderErrorReason, Renderable, ScopedJson, StringOutput,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use time::{Duration, Time};

const FORMAT: &str = "format";
const SET_DATE: &str = "set_date";
const SET_TIME: &str = "set_time";
const DELTA_YEARS: &str = "delta_years";
const DELTA_MONTHS: &str = "delta_months";
const DELTA_DAYS: &str = "delta_days";
const DELTA_HOURS: &str = "delta_hours";
const DELTA_MINUTES: &str = "delta_minutes";
const DELTA_SECONDS: &str = "delta_seconds";

static NULL: Value = Value::Null;

/// Positional parameter `i`, `null` when missing.
fn param<'a>(h: &'a Helper, i: usize) -> &'a Value {
    h.param(i).map(|p| p.value()).unwrap_or(&NULL)
}

fn other(msg: String) -> RenderError {
    RenderErrorReason::Other(msg).into()
}

/// `a op b` with `+ - * / ** %`. Division by zero yields `Infinity`,
/// modulo by zero is an error.
pub fn math(a: &Value, op: &Value, b: &Value) -> Result<Value, String> {
    let v1 = parse_float(a);
    let v2 = parse_float(b);
    if v1.is_nan() || v2.is_nan() {
        return Err(format!(
            "Can't convert \"{}\" and \"{}\" to numbers while using math",
            to_js_string(a),
            to_js_string(b)
        ));
    }
    let res = match to_js_string(op).as_str() {
        "+" => v1 + v2,
        "-" => v1 - v2,
        "*" => v1 * v2,
        "/" => v1 / v2,
        "**" => v1.powf(v2),
        "%" if v2 == 0.0 => {
            return Err(format!(
                "Can't compute \"{}\" % \"{}\": % operator used with 0",
                to_js_string(a),
                to_js_string(b)
            ))
        }
        "%" => v1 % v2,
        op => return Err(format!("Invalid operator used with math: {op}")),
    };
    Ok(number_value(res))
}

/// Compares `a` and `b`, e.g. `compare(a, "<=", b)` or `compare(a, "lte", b)`.
pub fn compare(a: &Value, op: &Value, b: &Value) -> Result<bool, String> {
    let ord = || js_partial_cmp(a, b);
    Ok(match to_js_string(op).as_str() {
        "==" | "eq" | "equals" => loose_eq(a, b),
        "===" | "seq" | "strictly-equals" => strict_eq(a, b),
        "!=" | "ne" | "not-equals" => !loose_eq(a, b),
        "!==" | "sne" | "strictly-not-equals" => !strict_eq(a, b),
        "<" | "lt" | "less-than" => ord() == Some(Ordering::Less),
        "<=" | "lte" | "less-than-equals" => {
            matches!(ord(), Some(Ordering::Less | Ordering::Equal))
        }
        ">" | "gt" | "greater-than" => ord() == Some(Ordering::Greater),
        ">=" | "gte" | "greater-than-equals" => {
            matches!(ord(), Some(Ordering::Greater | Ordering::Equal))
        }
        op => return Err(format!("Invalid comparison operator used with compare: {op}")),
    })
}

/// `!a`, `a && b`, `a || b`. The binary operators return one of their
/// operands.
pub fn condition(a: &Value, op: &Value, b: &Value) -> Result<Value, String> {
    Ok(match to_js_string(op).as_str() {
        "!" | "not" => Value::Bool(!truthy(a)),
        "&&" | "and" => {
            if truthy(a) {
                b.clone()
            } else {
                a.clone()
            }
        }
        "||" | "or" => {
            if truthy(a) {
                a.clone()
            } else {
                b.clone()
            }
        }
        op => return Err(format!("Invalid operator used with condition: {op}")),
    })
}

pub fn case(kind: &Value, v: &Value) -> Result<String, String> {
    let s = to_js_string(v);
    match to_js_string(kind).as_str() {
        "upper" => Ok(s.to_uppercase()),
        "lower" => Ok(s.to_lowercase()),
        kind => Err(format!("Invalid case type used with case: {kind}")),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MathHelper;

impl HelperDef for MathHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let res = math(param(h, 0), param(h, 1), param(h, 2)).map_err(other)?;
        Ok(ScopedJson::Derived(res))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CompareHelper;

impl HelperDef for CompareHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let res = compare(param(h, 0), param(h, 1), param(h, 2)).map_err(other)?;
        Ok(ScopedJson::Derived(Value::Bool(res)))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConditionHelper;

impl HelperDef for ConditionHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let res = condition(param(h, 0), param(h, 1), param(h, 2)).map_err(other)?;
        Ok(ScopedJson::Derived(res))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CaseHelper;

impl HelperDef for CaseHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let res = case(param(h, 0), param(h, 1)).map_err(other)?;
        Ok(ScopedJson::Derived(Value::String(res)))
    }
}

/// `{{#repeat n}}...{{/repeat}}` renders its block `n` times. Each iteration
/// sees a copy of the enclosing context plus `repeat_index`.
#[derive(Debug, Clone, Copy)]
pub struct RepeatHelper;

impl HelperDef for RepeatHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let raw = param(h, 0);
        let n = parse_int(raw).ok_or_else(|| {
            other(format!(
                "Can't convert \"{}\" to number while using repeat",
                to_js_string(raw)
            ))
        })?;
        let Some(template) = h.template() else {
            return Ok(());
        };
        let this = match rc.evaluate(ctx, "this")?.as_json() {
            Value::Object(m) => m.clone(),
            _ => Map::new(),
        };

        for i in 0..n.max(0) {
            let mut scope = this.clone();
            scope.insert(TMPL_VAR_REPEAT_INDEX.to_string(), Value::from(i));
            let mut block = BlockContext::new();
            block.set_base_value(Value::Object(scope));
            rc.push_block(block);
            let res = template.render(r, ctx, rc, out);
            rc.pop_block();
            res?;
        }
        Ok(())
    }
}

/// `{{#custom_datetime}}format{{/custom_datetime}}` prints the current
/// instant, formatted with the rendered block.
#[derive(Debug, Clone)]
pub struct CustomDatetimeHelper {
    utils: DateAndTimeUtils,
}

impl HelperDef for CustomDatetimeHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let format = match h.template() {
            Some(t) => {
                let mut buf = StringOutput::new();
                t.render(r, ctx, rc, &mut buf)?;
                buf.into_string().map_err(|e| other(e.to_string()))?
            }
            None => String::new(),
        };
        out.write(&self.utils.current_time(Some(&format)))?;
        Ok(())
    }
}

/// `datetime` and `advanced_datetime`. The latter does not accept
/// `set_date` and `set_time`.
#[derive(Debug, Clone)]
pub struct DatetimeHelper {
    utils: DateAndTimeUtils,
    schema: Vec<AttributeDefinition>,
    with_overrides: bool,
}

impl DatetimeHelper {
    pub fn new(utils: DateAndTimeUtils, with_overrides: bool) -> Self {
        let mut schema = vec![AttributeDefinition::string(
            FORMAT,
            &utils.date_time_format(),
        )];
        if with_overrides {
            schema.push(AttributeDefinition::string(SET_DATE, ""));
            schema.push(AttributeDefinition::string(SET_TIME, ""));
        }
        for delta in [
            DELTA_YEARS,
            DELTA_MONTHS,
            DELTA_DAYS,
            DELTA_HOURS,
            DELTA_MINUTES,
            DELTA_SECONDS,
        ] {
            schema.push(AttributeDefinition::number(delta, 0.0));
        }
        Self {
            utils,
            schema,
            with_overrides,
        }
    }

    /// Applies overrides, then the deltas in the order years, months, days,
    /// hours, minutes, seconds.
    pub fn compute(&self, attrs: &ParsedAttributes) -> Result<String, DateTimeError> {
        let utils = &self.utils;
        let mut now = utils.now();

        if self.with_overrides {
            let set_date = attrs.string(SET_DATE);
            if !set_date.is_empty() {
                now = now.replace_date(utils.parse_date(set_date, utils.date_format())?);
            }
            let set_time = attrs.string(SET_TIME);
            if !set_time.is_empty() {
                let t = utils.parse_time(set_time, utils.time_format())?;
                let t = Time::from_hms(t.hour(), t.minute(), 0)
                    .map_err(|_| DateTimeError::OutOfRange)?;
                now = now.replace_time(t);
            }
        }

        let whole = |name: &str| attrs.number(name).round() as i64;
        now = add_months(now, whole(DELTA_YEARS).saturating_mul(12))?;
        now = add_months(now, whole(DELTA_MONTHS))?;
        now = add_duration(now, millis(whole(DELTA_DAYS) as f64, 86_400_000.0)?)?;
        now = add_duration(now, millis(attrs.number(DELTA_HOURS), 3_600_000.0)?)?;
        now = add_duration(now, millis(attrs.number(DELTA_MINUTES), 60_000.0)?)?;
        now = add_duration(now, millis(attrs.number(DELTA_SECONDS), 1_000.0)?)?;

        Ok(utils.format(now, Some(attrs.string(FORMAT))))
    }
}

/// `amount` units of `unit_ms` milliseconds, rounded to the millisecond.
fn millis(amount: f64, unit_ms: f64) -> Result<Duration, DateTimeError> {
    let ms = (amount * unit_ms).round();
    // Roughly 3 million years.
    if !ms.is_finite() || ms.abs() > 1e17 {
        return Err(DateTimeError::OutOfRange);
    }
    Ok(Duration::milliseconds(ms as i64))
}

impl HelperDef for DatetimeHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let raw: Map<String, Value> = h
            .hash()
            .iter()
            .map(|(k, v)| (k.to_string(), v.value().clone()))
            .collect();
        let attrs = AttributeParser::new(&self.schema)
            .parse(&raw)
            .map_err(|e| other(e.to_string()))?;
        let res = self.compute(&attrs).map_err(|e| other(e.to_string()))?;
        Ok(ScopedJson::Derived(Value::String(res)))
    }
}

/// Handlebars registry with all helpers registered.
#[derive(Debug)]
pub struct TemplateEngine {
    registry: Handlebars<'static>,
    utils: DateAndTimeUtils,
}

impl TemplateEngine {
    pub fn new(utils: DateAndTimeUtils) -> Self {
        let mut hb = Handlebars::new();
        hb.register_helper("math", Box::new(MathHelper));
        hb.register_helper("compare", Box::new(CompareHelper));
        hb.register_helper("condition", Box::new(ConditionHelper));
        hb.register_helper("case", Box::new(CaseHelper));
        hb.register_helper("repeat", Box::new(RepeatHelper));
        hb.register_helper(
            "datetime",
            Box::new(DatetimeHelper::new(utils.clone(), true)),
        );
        hb.register_helper(
            "advanced_datetime",
            Box::new(DatetimeHelper::new(utils.clone(), false)),
        );
        hb.register_helper(
            "custom_datetime",
            Box::new(CustomDatetimeHelper {
                utils: utils.clone(),
            }),
        );
        Self {
            registry: hb,
            utils,
        }
    }

    pub fn utils(&self) -> &DateAndTimeUtils {
        &self.utils
    }

    /// Compiles and renders `template` with `context`.
    pub fn render(&self, template: &str, context: &impl Serialize) -> Result<String, NoteError> {
        log::trace!("Rendering template:\n{}", template);
        Ok(self.registry.render_template(template, context)?)
    }
}
