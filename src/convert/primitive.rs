//! Built-in parsing of step text into primitive values.
//!
//! Every parser tries the invariant form first (`10.5`, `2024-04-03`) and
//! then the configured culture's separators and date order.

use crate::culture::{Culture, DateOrder};
use crate::value::{ParamType, Value};
use std::str::FromStr;
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Iso8601;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const ISO_DATE_TIME: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const ISO_DATE_MINUTES: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

/// Parse `text` into `target`, returning `None` when neither the invariant
/// nor the culture form applies or `target` is not primitive.
pub(crate) fn parse_primitive(text: &str, target: ParamType, culture: &Culture) -> Option<Value> {
    let trimmed = text.trim();
    match target {
        ParamType::Bool => parse_bool(trimmed).map(Value::Bool),
        ParamType::I32 => parse_number::<i32>(trimmed, culture).map(Value::I32),
        ParamType::I64 => parse_number::<i64>(trimmed, culture).map(Value::I64),
        ParamType::U32 => parse_number::<u32>(trimmed, culture).map(Value::U32),
        ParamType::U64 => parse_number::<u64>(trimmed, culture).map(Value::U64),
        ParamType::F32 => parse_number::<f32>(trimmed, culture).map(Value::F32),
        ParamType::F64 => parse_number::<f64>(trimmed, culture).map(Value::F64),
        ParamType::Date => parse_date(trimmed, culture).map(Value::Date),
        ParamType::DateTime => parse_date_time(trimmed, culture).map(Value::DateTime),
        ParamType::Unit
        | ParamType::Text
        | ParamType::Table
        | ParamType::Custom(_) => None,
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_number<T: FromStr>(text: &str, culture: &Culture) -> Option<T> {
    text.parse()
        .ok()
        .or_else(|| culture.to_invariant_number(text).parse().ok())
}

/// Format descriptions for short dates in `culture`, unpadded first.
fn culture_date_formats(culture: &Culture) -> [String; 2] {
    let sep = culture.date_separator();
    let (first, second, third) = match culture.date_order() {
        DateOrder::MonthDayYear => ("month", "day", "year"),
        DateOrder::DayMonthYear => ("day", "month", "year"),
        DateOrder::YearMonthDay => ("year", "month", "day"),
    };
    let unpadded = |field: &str| {
        if field == "year" {
            "[year]".to_owned()
        } else {
            format!("[{field} padding:none]")
        }
    };
    [
        format!("{}{sep}{}{sep}{}", unpadded(first), unpadded(second), unpadded(third)),
        format!("[{first}]{sep}[{second}]{sep}[{third}]"),
    ]
}

fn parse_culture_date(text: &str, culture: &Culture) -> Option<Date> {
    culture_date_formats(culture).iter().find_map(|description| {
        let items = time::format_description::parse(description).ok()?;
        Date::parse(text, items.as_slice()).ok()
    })
}

fn parse_date(text: &str, culture: &Culture) -> Option<Date> {
    Date::parse(text, ISO_DATE)
        .ok()
        .or_else(|| parse_culture_date(text, culture))
}

fn parse_date_time(text: &str, culture: &Culture) -> Option<OffsetDateTime> {
    if let Ok(parsed) = OffsetDateTime::parse(text, &Iso8601::DEFAULT) {
        return Some(parsed);
    }
    [ISO_DATE_TIME, ISO_DATE_MINUTES]
        .into_iter()
        .find_map(|description| PrimitiveDateTime::parse(text, description).ok())
        .map(PrimitiveDateTime::assume_utc)
        .or_else(|| {
            parse_date(text, culture)
                .map(|date| PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_utc())
        })
}
