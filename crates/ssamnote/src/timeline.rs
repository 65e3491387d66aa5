//! Daily timeline: one day's logs grouped under the schedule.

use chrono::NaiveDate;
use serde::Serialize;

use crate::record::{LogEntry, Student, TimeBlock, student_names};

/// A log as shown on the timeline, with student names resolved.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TimelineItem {
    pub log_id: String,
    pub text: String,
    pub interpretation: Option<String>,
    pub student_names: Vec<String>,
    pub domain_tags: Vec<String>,
    pub is_class_wide: bool,
}

/// One time block and the logs written for it.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TimelineSlot {
    pub block: TimeBlock,
    pub items: Vec<TimelineItem>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DayTimeline {
    pub date: NaiveDate,
    pub slots: Vec<TimelineSlot>,
}

impl DayTimeline {
    /// Group `logs` dated `date` under the active blocks, in display order.
    /// Logs for other dates or for unknown blocks are left out.
    pub fn build(
        date: NaiveDate,
        blocks: &[TimeBlock],
        logs: &[LogEntry],
        roster: &[Student],
    ) -> Self {
        let mut active: Vec<&TimeBlock> = blocks.iter().filter(|b| b.is_active).collect();
        active.sort_by_key(|b| b.display_order);

        let slots = active
            .into_iter()
            .map(|block| TimelineSlot {
                block: block.clone(),
                items: logs
                    .iter()
                    .filter(|log| log.date == date && log.block_id == block.id)
                    .map(|log| TimelineItem {
                        log_id: log.id.clone(),
                        text: log.display_text().to_string(),
                        interpretation: log.display_interpretation().map(str::to_string),
                        student_names: student_names(&log.student_ids, roster),
                        domain_tags: log.domain_tags.clone(),
                        is_class_wide: log.is_class_wide,
                    })
                    .collect(),
            })
            .collect();

        Self { date, slots }
    }

    pub fn log_count(&self) -> usize {
        self.slots.iter().map(|s| s.items.len()).sum()
    }

    pub fn slot(&self, block_id: &str) -> Option<&TimelineSlot> {
        self.slots.iter().find(|s| s.block.id == block_id)
    }
}
