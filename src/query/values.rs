//! Literal value candidates for the right-hand side of a comparison

use crate::metadata::describe::FieldDescribe;
use crate::query::suggestion::{Suggestion, SuggestionKind};
use chrono::{DateTime, Local};

/// Relative date literals accepted by date and datetime comparisons
const DATE_LITERALS: &[(&str, &str)] = &[
    ("YESTERDAY", "Starts 12:00:00 the day before and continues for 24 hours."),
    ("TODAY", "Starts 12:00:00 of the current day and continues for 24 hours."),
    ("TOMORROW", "Starts 12:00:00 after the current day and continues for 24 hours."),
    ("LAST_WEEK", "Starts 12:00:00 on the first day of the week before the most recent first day of the week and continues for seven full days. First day of the week is determined by your locale."),
    ("THIS_WEEK", "Starts 12:00:00 on the most recent first day of the week before the current day and continues for seven full days. First day of the week is determined by your locale."),
    ("NEXT_WEEK", "Starts 12:00:00 on the most recent first day of the week after the current day and continues for seven full days. First day of the week is determined by your locale."),
    ("LAST_MONTH", "Starts 12:00:00 on the first day of the month before the current day and continues for all the days of that month."),
    ("THIS_MONTH", "Starts 12:00:00 on the first day of the month that the current day is in and continues for all the days of that month."),
    ("NEXT_MONTH", "Starts 12:00:00 on the first day of the month after the month that the current day is in and continues for all the days of that month."),
    ("LAST_90_DAYS", "Starts 12:00:00 of the current day and continues for the last 90 days."),
    ("NEXT_90_DAYS", "Starts 12:00:00 of the current day and continues for the next 90 days."),
    ("LAST_N_DAYS:n", "For the number n provided, starts 12:00:00 of the current day and continues for the last n days."),
    ("NEXT_N_DAYS:n", "For the number n provided, starts 12:00:00 of the current day and continues for the next n days."),
    ("NEXT_N_WEEKS:n", "For the number n provided, starts 12:00:00 of the first day of the next week and continues for the next n weeks."),
    ("N_DAYS_AGO:n", "Starts at 12:00:00 AM on the day n days before the current day and continues for 24 hours. (The range doesn’t include today.)"),
    ("LAST_N_WEEKS:n", "For the number n provided, starts 12:00:00 of the last day of the previous week and continues for the last n weeks."),
    ("N_WEEKS_AGO:n", "Starts at 12:00:00 AM on the first day of the month that started n months before the start of the current month and continues for all the days of that month."),
    ("NEXT_N_MONTHS:n", "For the number n provided, starts 12:00:00 of the first day of the next month and continues for the next n months."),
    ("LAST_N_MONTHS:n", "For the number n provided, starts 12:00:00 of the last day of the previous month and continues for the last n months."),
    ("N_MONTHS_AGO:n", "For the number n provided, starts 12:00:00 of the last day of the previous month and continues for the last n months."),
    ("THIS_QUARTER", "Starts 12:00:00 of the current quarter and continues to the end of the current quarter."),
    ("LAST_QUARTER", "Starts 12:00:00 of the previous quarter and continues to the end of that quarter."),
    ("NEXT_QUARTER", "Starts 12:00:00 of the next quarter and continues to the end of that quarter."),
    ("NEXT_N_QUARTERS:n", "Starts 12:00:00 of the next quarter and continues to the end of the nth quarter."),
    ("LAST_N_QUARTERS:n", "Starts 12:00:00 of the previous quarter and continues to the end of the previous nth quarter."),
    ("N_QUARTERS_AGO:n", "Starts at 12:00:00 AM on the first day of the calendar quarter n quarters before the current calendar quarter and continues to the end of that quarter."),
    ("THIS_YEAR", "Starts 12:00:00 on January 1 of the current year and continues through the end of December 31 of the current year."),
    ("LAST_YEAR", "Starts 12:00:00 on January 1 of the previous year and continues through the end of December 31 of that year."),
    ("NEXT_YEAR", "Starts 12:00:00 on January 1 of the following year and continues through the end of December 31 of that year."),
    ("NEXT_N_YEARS:n", "Starts 12:00:00 on January 1 of the following year and continues through the end of December 31 of the nth year."),
    ("LAST_N_YEARS:n", "Starts 12:00:00 on January 1 of the previous year and continues through the end of December 31 of the previous nth year."),
    ("N_YEARS_AGO:n", "Starts at 12:00:00 AM on January 1 of the calendar year n years before the current calendar year and continues through the end of December 31 of that year."),
    ("THIS_FISCAL_QUARTER", "Starts 12:00:00 on the first day of the current fiscal quarter and continues through the end of the last day of the fiscal quarter. The fiscal year is defined in the company profile under Setup at Company Profile | Fiscal Year."),
    ("LAST_FISCAL_QUARTER", "Starts 12:00:00 on the first day of the last fiscal quarter and continues through the end of the last day of that fiscal quarter. The fiscal year is defined in the company profile under Setup at Company Profile | Fiscal Year."),
    ("NEXT_FISCAL_QUARTER", "Starts 12:00:00 on the first day of the next fiscal quarter and continues through the end of the last day of that fiscal quarter. The fiscal year is defined in the company profile under Setup at Company Profile | Fiscal Year."),
    ("NEXT_N_FISCAL_QUARTERS:n", "Starts 12:00:00 on the first day of the next fiscal quarter and continues through the end of the last day of the nth fiscal quarter. The fiscal year is defined in the company profile under Setup atCompany Profile | Fiscal Year."),
    ("LAST_N_FISCAL_QUARTERS:n", "Starts 12:00:00 on the first day of the last fiscal quarter and continues through the end of the last day of the previous nth fiscal quarter. The fiscal year is defined in the company profile under Setup at Company Profile | Fiscal Year."),
    ("N_FISCAL_QUARTERS_AGO:n", "Starts at 12:00:00 AM on the first day of the fiscal quarter n fiscal quarters before the current fiscal quarter and continues through the end of the last day of that fiscal quarter."),
    ("THIS_FISCAL_YEAR", "Starts 12:00:00 on the first day of the current fiscal year and continues through the end of the last day of the fiscal year. The fiscal year is defined in the company profile under Setup at Company Profile | Fiscal Year."),
    ("LAST_FISCAL_YEAR", "Starts 12:00:00 on the first day of the last fiscal year and continues through the end of the last day of that fiscal year. The fiscal year is defined in the company profile under Setup at Company Profile | Fiscal Year."),
    ("NEXT_FISCAL_YEAR", "Starts 12:00:00 on the first day of the next fiscal year and continues through the end of the last day of that fiscal year. The fiscal year is defined in the company profile under Setup at Company Profile | Fiscal Year."),
    ("NEXT_N_FISCAL_YEARS:n", "Starts 12:00:00 on the first day of the next fiscal year and continues through the end of the last day of the nth fiscal year. The fiscal year is defined in the company profile under Setup at Company Profile | Fiscal Year."),
    ("LAST_N_FISCAL_YEARS:n", "Starts 12:00:00 on the first day of the last fiscal year and continues through the end of the last day of the previous nth fiscal year. The fiscal year is defined in the company profile under Setup at Company Profile | Fiscal Year."),
    ("N_FISCAL_YEARS_AGO:n", "Starts at 12:00:00 AM on the first day of the fiscal year n fiscal years ago and continues through the end of the last day of that fiscal year."),
];

/// Candidate values for `field`: picklist entries, booleans, date literals and
/// `null`. `now` supplies the "Today"/"Now" literals.
pub fn field_values(field: &FieldDescribe, now: &DateTime<Local>) -> Vec<Suggestion> {
    let mut out: Vec<Suggestion> = field
        .picklist_values
        .iter()
        .map(|p| {
            Suggestion::new(
                format!("'{}'", p.value),
                p.display_label(),
                SuggestionKind::PicklistValue,
            )
        })
        .collect();

    match field.field_type.as_str() {
        "boolean" => {
            out.push(Suggestion::keyword("true", " "));
            out.push(Suggestion::keyword("false", " "));
        }
        "date" | "datetime" => {
            if field.field_type == "date" {
                out.push(Suggestion::new(
                    now.format("%Y-%m-%d").to_string(),
                    "Today",
                    SuggestionKind::FieldValue,
                ));
            } else {
                out.push(Suggestion::new(
                    now.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string(),
                    "Now",
                    SuggestionKind::FieldValue,
                ));
            }
            out.extend(
                DATE_LITERALS
                    .iter()
                    .map(|(value, title)| Suggestion::new(*value, *title, SuggestionKind::Variable)),
            );
        }
        _ => {}
    }

    if field.nillable {
        out.push(Suggestion::new("null", "null", SuggestionKind::Null));
    }
    out
}

/// Keep candidates whose value or title contains `term` (case-insensitive).
pub fn matching(candidates: Vec<Suggestion>, term: &str) -> Vec<Suggestion> {
    let term = term.to_lowercase();
    candidates
        .into_iter()
        .filter(|s| s.value.to_lowercase().contains(&term) || s.title.to_lowercase().contains(&term))
        .collect()
}
