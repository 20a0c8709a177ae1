use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

static RE_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").unwrap());

/// Parse a `YYYY-MM-DD` date out of the final path component of `name`,
/// e.g. `memory/2026-01-15.md`. The last valid date wins.
pub fn date_from_filename(name: &str) -> Option<NaiveDate> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    RE_DATE
        .captures_iter(base)
        .filter_map(|cap| {
            let y = cap[1].parse().ok()?;
            let m = cap[2].parse().ok()?;
            let d = cap[3].parse().ok()?;
            NaiveDate::from_ymd_opt(y, m, d)
        })
        .last()
}
