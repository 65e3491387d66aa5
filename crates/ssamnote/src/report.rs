//! Weekly summaries and per-student monthly reports.
//!
//! Both aggregate stored logs and can optionally ask a [`Refiner`] for a
//! prose summary. Generation is best effort: a failure is logged and the
//! caller simply gets no text.

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use crate::record::{LogEntry, Student};
use crate::refine::{RefinementRequest, Refiner};

/// Per-domain log counts, in order of first appearance.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainCounts(Vec<(String, usize)>);

impl DomainCounts {
    pub fn tally<'a>(logs: impl IntoIterator<Item = &'a LogEntry>) -> Self {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for tag in logs.into_iter().flat_map(|log| &log.domain_tags) {
            match counts.iter_mut().find(|(name, _)| name == tag) {
                Some((_, n)) => *n += 1,
                None => counts.push((tag.clone(), 1)),
            }
        }
        Self(counts)
    }

    pub fn get(&self, tag: &str) -> usize {
        self.0
            .iter()
            .find(|(name, _)| name == tag)
            .map_or(0, |(_, n)| *n)
    }

    /// Domains present, in order of first appearance.
    pub fn domains(&self) -> Vec<String> {
        self.0.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(name, n)| (name.as_str(), *n))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ── Weekly summary ─────────────────────────────────────────────────

const WEEKLY_PREFIX: &str = "다음은 이번 주 관찰 기록입니다. 주간 요약을 작성해주세요:";

/// The Monday that starts the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

/// Logs of one Monday-to-Sunday week.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct WeeklySummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub logs: Vec<LogEntry>,
    pub domain_counts: DomainCounts,
    /// Log count for each of the seven days, Monday first.
    pub daily_counts: [(NaiveDate, usize); 7],
}

impl WeeklySummary {
    /// Aggregate the week containing `date` from `logs`.
    pub fn for_week_of(date: NaiveDate, logs: &[LogEntry]) -> Self {
        let start = week_start(date);
        let end = start + Days::new(6);
        let logs: Vec<LogEntry> = logs
            .iter()
            .filter(|log| log.date >= start && log.date <= end)
            .cloned()
            .collect();
        let daily_counts = std::array::from_fn(|i| {
            let day = start + Days::new(i as u64);
            (day, logs.iter().filter(|log| log.date == day).count())
        });
        Self {
            start,
            end,
            domain_counts: DomainCounts::tally(&logs),
            daily_counts,
            logs,
        }
    }

    pub fn log_count(&self) -> usize {
        self.logs.len()
    }

    /// The refinement request that asks for a prose summary, or `None` for
    /// an empty week.
    pub fn summary_request(&self) -> Option<RefinementRequest> {
        if self.logs.is_empty() {
            return None;
        }
        let lines: Vec<&str> = self.logs.iter().map(LogEntry::display_text).collect();
        let raw = format!("{WEEKLY_PREFIX}\n- {}", lines.join("\n- "));
        RefinementRequest::new(raw, Vec::new(), self.domain_counts.domains()).ok()
    }

    /// Ask `refiner` for a prose summary of the week.
    pub async fn generate_summary(&self, refiner: &dyn Refiner) -> Option<String> {
        let request = self.summary_request()?;
        match refiner.refine(request).await {
            Ok(result) => {
                info!("Generated weekly summary for {}..{}", self.start, self.end);
                Some(result.refined_content)
            }
            Err(e) => {
                warn!("Weekly summary unavailable: {e}");
                None
            }
        }
    }
}

// ── Student report ─────────────────────────────────────────────────

/// One student's logs for a calendar month.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct StudentReport {
    pub student: Student,
    pub year: i32,
    pub month: u32,
    pub logs: Vec<LogEntry>,
    pub domain_counts: DomainCounts,
}

impl StudentReport {
    /// Collect the logs naming `student` dated within `year`-`month`.
    pub fn for_month(student: &Student, year: i32, month: u32, logs: &[LogEntry]) -> Self {
        let logs: Vec<LogEntry> = logs
            .iter()
            .filter(|log| {
                log.date.year() == year && log.date.month() == month && log.mentions_student(&student.id)
            })
            .cloned()
            .collect();
        Self {
            student: student.clone(),
            year,
            month,
            domain_counts: DomainCounts::tally(&logs),
            logs,
        }
    }

    /// The refinement request that asks for a developmental report, or
    /// `None` when the month has no logs.
    pub fn report_request(&self) -> Option<RefinementRequest> {
        if self.logs.is_empty() {
            return None;
        }
        let records: Vec<String> = self
            .logs
            .iter()
            .map(|log| format!("[{}] {}", log.date.format("%Y-%m-%d"), log.display_text()))
            .collect();
        let raw = format!(
            "다음은 {} 유아의 {}년 {}월 관찰 기록입니다.\n\
             종합적인 발달 보고서를 작성해주세요. 각 영역별 발달 상황과 특이사항, 향후 지원 방향을 포함해주세요.\n\n\
             기록:\n{}",
            self.student.name,
            self.year,
            self.month,
            records.join("\n")
        );
        RefinementRequest::new(
            raw,
            vec![self.student.name.clone()],
            self.domain_counts.domains(),
        )
        .ok()
    }

    /// Ask `refiner` for the report text: the refined content followed by
    /// the interpretation.
    pub async fn generate_report(&self, refiner: &dyn Refiner) -> Option<String> {
        let request = self.report_request()?;
        match refiner.refine(request).await {
            Ok(result) => {
                info!(
                    "Generated monthly report for student {} ({}-{:02})",
                    self.student.id, self.year, self.month
                );
                Some(format!("{}\n\n{}", result.refined_content, result.interpretation))
            }
            Err(e) => {
                warn!("Monthly report unavailable: {e}");
                None
            }
        }
    }
}
