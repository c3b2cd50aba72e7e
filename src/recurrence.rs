// Copyright (c) 2025 Coinkeep Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::access::Session;
use crate::engine::{Processor, TransactionDraft};
use crate::errors::{EngineError, EngineResult};
use crate::models::{Recurrence, Template};
use crate::utils::days_in_month;
use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};
use rusqlite::{Connection, params};
use tracing::warn;

/// Marker appended to descriptions of materialized occurrences.
pub const AUTO_MARKER: &str = "[auto]";

pub fn weekday_from_stored(n: i64) -> Option<Weekday> {
    match n {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

pub fn weekday_to_stored(wd: Weekday) -> i64 {
    wd.num_days_from_monday() as i64
}

fn check_interval(template: &Template) -> EngineResult<()> {
    if template.interval < 1 {
        return Err(EngineError::Configuration(format!(
            "template '{}' has interval {}",
            template.name, template.interval
        )));
    }
    if template.recurrence == Recurrence::None {
        return Err(EngineError::Configuration(format!(
            "template '{}' is not recurring",
            template.name
        )));
    }
    Ok(())
}

fn roll_to_weekday(mut date: NaiveDate, anchor: Option<Weekday>) -> NaiveDate {
    if let Some(wd) = anchor {
        while date.weekday() != wd {
            date = date + Duration::days(1);
        }
    }
    date
}

fn anchored_in(template: &Template, year: i32, month: u32) -> EngineResult<NaiveDate> {
    // Day 31 in a 30-day month lands on the 30th; the anchor reasserts
    // itself in longer months.
    let anchor = template.anchor_day.unwrap_or(1);
    let day = anchor.clamp(1, days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        EngineError::Configuration(format!(
            "template '{}': no day {} in {}-{:02}",
            template.name, day, year, month
        ))
    })
}

/// The first due date of a rule that has never produced an occurrence:
/// the start date itself, aligned forward to the anchor if one is set.
fn first_occurrence(template: &Template) -> EngineResult<NaiveDate> {
    let start = template.start_date;
    match template.recurrence {
        Recurrence::None => Err(EngineError::Configuration(format!(
            "template '{}' is not recurring",
            template.name
        ))),
        Recurrence::Daily => Ok(start),
        Recurrence::Weekly => Ok(roll_to_weekday(start, template.anchor_weekday)),
        Recurrence::Monthly | Recurrence::Yearly => {
            if template.anchor_day.is_none() {
                return Ok(start);
            }
            let candidate = anchored_in(template, start.year(), start.month())?;
            if candidate >= start {
                return Ok(candidate);
            }
            let next_month = start.checked_add_months(Months::new(1)).ok_or_else(|| {
                EngineError::Configuration(format!(
                    "template '{}' stepped past the calendar range",
                    template.name
                ))
            })?;
            anchored_in(template, next_month.year(), next_month.month())
        }
    }
}

/// The next due date strictly after `cursor`, where `cursor` is either a
/// committed occurrence or a date before the rule's start. Driven by date
/// comparisons only, so calling the scheduler hourly, daily, or after a
/// month offline yields the same sequence with no duplicates and no gaps.
pub fn next_occurrence(template: &Template, cursor: NaiveDate) -> EngineResult<NaiveDate> {
    check_interval(template)?;
    if cursor < template.start_date {
        return first_occurrence(template);
    }
    match template.recurrence {
        Recurrence::None => Err(EngineError::Configuration(format!(
            "template '{}' is not recurring",
            template.name
        ))),
        Recurrence::Daily => Ok(cursor + Duration::days(template.interval as i64)),
        Recurrence::Weekly => {
            // Earliest date with a full interval of progress that lands on
            // the configured weekday. Once the schedule sits on its
            // weekday the roll is a no-op.
            let stepped = cursor + Duration::days(7 * template.interval as i64);
            Ok(roll_to_weekday(stepped, template.anchor_weekday))
        }
        Recurrence::Monthly => step_months(template, cursor, template.interval),
        Recurrence::Yearly => step_months(template, cursor, template.interval * 12),
    }
}

fn step_months(template: &Template, cursor: NaiveDate, months: u32) -> EngineResult<NaiveDate> {
    let base = cursor
        .checked_add_months(Months::new(months))
        .ok_or_else(|| {
            EngineError::Configuration(format!(
                "template '{}' stepped past the calendar range",
                template.name
            ))
        })?;
    if template.anchor_day.is_none() {
        return Ok(base);
    }
    anchored_in(template, base.year(), base.month())
}

/// Outcome of one template's catch-up pass.
#[derive(Debug)]
pub struct TemplateRun {
    pub template_id: i64,
    pub name: String,
    pub materialized: Vec<NaiveDate>,
    pub error: Option<String>,
}

/// Materialize every missed occurrence of one template up to `today`, in
/// order. `last_run` is persisted after each success, so a failure or
/// crash leaves the failed occurrence due again on the next run.
pub fn run_template(
    conn: &mut Connection,
    session: &Session,
    processor: &dyn Processor,
    template: &mut Template,
    today: NaiveDate,
) -> EngineResult<TemplateRun> {
    let mut run = TemplateRun {
        template_id: template.id,
        name: template.name.clone(),
        materialized: Vec::new(),
        error: None,
    };
    if template.start_date > today {
        return Ok(run);
    }

    let mut cursor = match template.last_run {
        Some(last) => last,
        None => template
            .start_date
            .pred_opt()
            .ok_or_else(|| EngineError::Configuration("date underflow".to_string()))?,
    };

    loop {
        let next = next_occurrence(template, cursor)?;
        if next > today {
            break;
        }
        if next <= cursor {
            return Err(EngineError::Configuration(format!(
                "template '{}' failed to advance past {}",
                template.name, cursor
            )));
        }

        let draft = TransactionDraft {
            date: next,
            account_id: template.account_id,
            amount: template.amount,
            kind: template.kind,
            currency: template.currency.clone(),
            description: format!("{} {}", template.name, AUTO_MARKER),
            category_id: template.category_id,
            template_id: Some(template.id),
        };
        if let Err(err) = processor.create(conn, session, draft) {
            // last_run still names the previous success; this occurrence
            // stays due and is retried on the next scheduler run.
            warn!(template = %template.name, date = %next, "materialization failed: {err}");
            run.error = Some(err.to_string());
            break;
        }

        conn.execute(
            "UPDATE templates SET last_run=?1 WHERE id=?2",
            params![next.to_string(), template.id],
        )?;
        template.last_run = Some(next);
        run.materialized.push(next);
        cursor = next;
    }
    Ok(run)
}

pub fn load_templates_for_user(conn: &Connection, user_id: i64) -> EngineResult<Vec<Template>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, budget_id, user_id, account_id, category_id, kind, amount, currency,
                recurrence, interval, anchor_day, anchor_weekday, start_date, last_run
         FROM templates
         WHERE user_id=?1 AND recurrence != 'none'
         ORDER BY id",
    )?;
    let rows = stmt.query_map(params![user_id], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, i64>(2)?,
            r.get::<_, i64>(3)?,
            r.get::<_, i64>(4)?,
            r.get::<_, Option<i64>>(5)?,
            r.get::<_, String>(6)?,
            r.get::<_, String>(7)?,
            r.get::<_, String>(8)?,
            r.get::<_, String>(9)?,
            r.get::<_, i64>(10)?,
            r.get::<_, Option<i64>>(11)?,
            r.get::<_, Option<i64>>(12)?,
            r.get::<_, String>(13)?,
            r.get::<_, Option<String>>(14)?,
        ))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (
            id,
            name,
            budget_id,
            user_id,
            account_id,
            category_id,
            kind,
            amount,
            currency,
            recurrence,
            interval,
            anchor_day,
            anchor_weekday,
            start_date,
            last_run,
        ) = row?;
        out.push(Template {
            id,
            name,
            budget_id,
            user_id,
            account_id,
            category_id,
            kind: crate::engine::parse_stored_kind(&kind)?,
            amount: crate::engine::parse_stored_decimal(&amount)?,
            currency,
            recurrence: recurrence
                .parse::<Recurrence>()
                .map_err(EngineError::Configuration)?,
            interval: interval.max(0) as u32,
            anchor_day: anchor_day.map(|d| d as u32),
            anchor_weekday: anchor_weekday.and_then(weekday_from_stored),
            start_date: crate::engine::parse_stored_date(&start_date)?,
            last_run: last_run
                .map(|s| crate::engine::parse_stored_date(&s))
                .transpose()?,
        });
    }
    Ok(out)
}

/// One scheduler pass for a user: every recurring template catches up
/// independently; one template's failure never blocks its siblings.
pub fn run_due(
    conn: &mut Connection,
    session: &Session,
    processor: &dyn Processor,
    today: NaiveDate,
) -> EngineResult<Vec<TemplateRun>> {
    let mut templates = load_templates_for_user(conn, session.user_id)?;
    let mut runs = Vec::new();
    for template in &mut templates {
        match run_template(conn, session, processor, template, today) {
            Ok(run) => runs.push(run),
            Err(err) => {
                warn!(template = %template.name, "scheduler pass failed: {err}");
                runs.push(TemplateRun {
                    template_id: template.id,
                    name: template.name.clone(),
                    materialized: Vec::new(),
                    error: Some(err.to_string()),
                });
            }
        }
    }
    Ok(runs)
}
