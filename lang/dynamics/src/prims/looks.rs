//! Speech bubbles, alerts and the sensing reporters.

use super::{control::wait_secs, *};
use std::time::{SystemTime, UNIX_EPOCH};

pub(super) const PRIMS: &[(Selector, Prim)] = &[
    (Selector::Bubble, |proc, world, args| say(proc, world, &args, false)),
    (Selector::DoThink, |proc, world, args| say(proc, world, &args, true)),
    (Selector::DoSayFor, |proc, world, args| say_for(proc, world, &args, false)),
    (Selector::DoThinkFor, |proc, world, args| say_for(proc, world, &args, true)),
    (Selector::Alert, |_, world, args| {
        world.stage.effects().alert(&joined(&args));
        Ok(Outcome::Done)
    }),
    (Selector::Log, |_, world, args| {
        world.stage.effects().log(&joined(&args));
        Ok(Outcome::Done)
    }),
    (Selector::ReportStackSize, |proc, _, _| Ok(Outcome::Report(Value::Number(proc.depth() as f64)))),
    (Selector::ReportFrameCount, |proc, _, _| {
        Ok(Outcome::Report(Value::Number(proc.frame_count() as f64)))
    }),
    (Selector::DoResetTimer, |_, world, _| {
        world.stage.reset_timer();
        Ok(Outcome::Done)
    }),
    (Selector::GetTimer, |_, world, _| Ok(Outcome::Report(Value::Number(world.stage.timer())))),
    (Selector::ReportDate, report_date),
    (Selector::ReportAttributeOf, report_attribute_of),
];

/* ---------------------------------- Looks --------------------------------- */

fn speaker(proc: &Process) -> crate::stage::ReceiverId {
    proc.top().map_or(proc.receiver, |top| top.receiver)
}

fn say(proc: &mut Process, world: &mut World, args: &[Value], thought: bool) -> Result<Outcome> {
    world.stage.bubble(speaker(proc), &arg(args, 0), thought);
    Ok(Outcome::Done)
}

/// Shows the bubble when the block first runs, then waits.
fn say_for(proc: &mut Process, world: &mut World, args: &[Value], thought: bool) -> Result<Outcome> {
    if proc.top().is_some_and(|top| top.start_time.is_none()) {
        world.stage.bubble(speaker(proc), &arg(args, 0), thought);
    }
    match wait_secs(proc, arg(args, 1).to_number()) {
        | true => Ok(Outcome::Done),
        | false => Ok(Outcome::Rearm),
    }
}

/// the items of a variadic input, separated by commas
fn joined(args: &[Value]) -> String {
    match arg(args, 0) {
        | Value::List(list) => {
            list.borrow().items().iter().map(Value::to_string).collect::<Vec<_>>().join(",")
        }
        | other => other.to_string(),
    }
}

/* --------------------------------- Sensing -------------------------------- */

/// A part of the current date and time, in UTC. Months and days of the week
/// count from 1; an unknown choice reports empty text.
fn report_date(_: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let millis = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_millis() as i64);
    let value = match date_part(&arg(&args, 0).to_string(), millis) {
        | Some(part) => Value::Number(part as f64),
        | None => Value::text(""),
    };
    Ok(Outcome::Report(value))
}

fn date_part(choice: &str, millis: i64) -> Option<i64> {
    let days = millis.div_euclid(86_400_000);
    let of_day = millis.rem_euclid(86_400_000) / 1000;
    let (year, month, date) = civil_from_days(days);
    let part = match choice {
        | "year" => year,
        | "month" => month,
        | "date" => date,
        // the epoch was a Thursday
        | "day of week" => (days + 4).rem_euclid(7) + 1,
        | "hour" => of_day / 3600,
        | "minute" => of_day / 60 % 60,
        | "second" => of_day % 60,
        | "time in milliseconds" => millis,
        | _ => return None,
    };
    Some(part)
}

/// year, month and day of a count of days since 1970-01-01
fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

/// a variable of another sprite, or empty text
fn report_attribute_of(_: &mut Process, world: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let name = arg(&args, 0).to_string();
    let value = (world.stage.find(&arg(&args, 1).to_string()))
        .and_then(|sprite| world.stage.frame_of(sprite).local(&name.as_str().into()))
        .unwrap_or_else(|| Value::text(""));
    Ok(Outcome::Report(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn dates_in_utc() {
        // 2024-02-29T13:45:10Z, a Thursday
        let millis = 1_709_214_310_000;
        let parts = ["year", "month", "date", "day of week", "hour", "minute", "second"]
            .map(|choice| date_part(choice, millis).unwrap());
        assert_eq!(parts, [2024, 2, 29, 5, 13, 45, 10]);
        assert_eq!(date_part("fortnight", millis), None);
    }

    #[test]
    fn epoch_is_new_years_day() {
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(-1), (1969, 12, 31));
    }

    #[test]
    fn variadic_text_is_comma_joined() {
        let args = vec![Value::list(vec!["a".into(), Value::Number(2.0)])];
        assert_eq!(joined(&args), "a,2");
    }
}
