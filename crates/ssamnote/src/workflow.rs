//! Note editing workflow.
//!
//! A [`NoteSession`] follows one note from the teacher's first keystroke to
//! a stored log:
//!
//! ```text
//!            cancel
//!           ┌──────┐
//!           ▼      │
//!        Editing ──┘ ──submit──▶ Submitting ──result──▶ Previewing ──save──▶ Saved
//!           ▲                                  │(fallback)   │
//!           └───────────────── go_back ─────────────────────┘
//! ```
//!
//! A failed refinement never strands the session: the draft falls back to
//! the raw note with an empty interpretation and is flagged as degraded, so
//! the teacher can still save. Retrying is always an explicit action.
//!
//! Only one submission may be in flight; [`NoteSession::begin_submit`]
//! refuses a second one while the first is pending. Abandoning that one,
//! by dropping the [`NoteSession::submit`] future or calling
//! [`NoteSession::cancel`], returns the session to `Editing`.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::{RefineError, WorkflowError};
use crate::record::{LogEntry, LogInput, Student, Weather};
use crate::refine::{RefinementRequest, RefinementResult, Refiner};
use crate::store::LogSink;

/// Observable state of a [`NoteSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Editing,
    Submitting,
    Previewing,
    Saved,
}

impl SessionState {
    pub fn name(self) -> &'static str {
        match self {
            SessionState::Editing => "editing",
            SessionState::Submitting => "submitting",
            SessionState::Previewing => "previewing",
            SessionState::Saved => "saved",
        }
    }
}

// ── Draft ──────────────────────────────────────────────────────────

/// A refined (or fallback) text pair the teacher can edit before saving.
///
/// An empty interpretation is a normal state, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditableDraft {
    raw_note: String,
    pub refined_content: String,
    pub interpretation: String,
    degraded: bool,
}

impl EditableDraft {
    /// Draft from a successful refinement.
    pub fn from_result(raw_note: impl Into<String>, result: RefinementResult) -> Self {
        Self {
            raw_note: raw_note.into(),
            refined_content: result.refined_content,
            interpretation: result.interpretation,
            degraded: false,
        }
    }

    /// Draft used when refinement failed: the raw note, untouched, and no
    /// interpretation.
    pub fn fallback(raw_note: impl Into<String>) -> Self {
        let raw_note = raw_note.into();
        Self {
            refined_content: raw_note.clone(),
            raw_note,
            interpretation: String::new(),
            degraded: true,
        }
    }

    /// The note as it was submitted.
    pub fn raw_note(&self) -> &str {
        &self.raw_note
    }

    /// Whether this draft came from the fallback path.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn set_refined_content(&mut self, text: impl Into<String>) {
        self.refined_content = text.into();
    }

    pub fn set_interpretation(&mut self, text: impl Into<String>) {
        self.interpretation = text.into();
    }
}

// ── Session ────────────────────────────────────────────────────────

enum Phase {
    Editing,
    Submitting,
    Previewing(EditableDraft),
    Saved(LogEntry),
}

/// One note-authoring session for a given date and time block.
///
/// Sessions share nothing; two blocks edited side by side are two
/// independent sessions.
pub struct NoteSession {
    date: NaiveDate,
    block_id: String,
    raw_note: String,
    students: Vec<Student>,
    domain_tags: Vec<String>,
    weather: Option<Weather>,
    phase: Phase,
}

impl NoteSession {
    pub fn new(date: NaiveDate, block_id: impl Into<String>) -> Self {
        Self {
            date,
            block_id: block_id.into(),
            raw_note: String::new(),
            students: Vec::new(),
            domain_tags: Vec::new(),
            weather: None,
            phase: Phase::Editing,
        }
    }

    pub fn state(&self) -> SessionState {
        match self.phase {
            Phase::Editing => SessionState::Editing,
            Phase::Submitting => SessionState::Submitting,
            Phase::Previewing(_) => SessionState::Previewing,
            Phase::Saved(_) => SessionState::Saved,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn block_id(&self) -> &str {
        &self.block_id
    }

    pub fn raw_note(&self) -> &str {
        &self.raw_note
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn domain_tags(&self) -> &[String] {
        &self.domain_tags
    }

    /// Whether the submit action is currently available.
    pub fn can_submit(&self) -> bool {
        matches!(self.phase, Phase::Editing) && !self.raw_note.trim().is_empty()
    }

    // ── Editing ──

    pub fn set_raw_note(&mut self, text: impl Into<String>) -> Result<(), WorkflowError> {
        self.require_editing("edit note")?;
        self.raw_note = text.into();
        Ok(())
    }

    /// Add the student if absent, remove it if present.
    pub fn toggle_student(&mut self, student: &Student) -> Result<(), WorkflowError> {
        self.require_editing("select student")?;
        if let Some(pos) = self.students.iter().position(|s| s.id == student.id) {
            self.students.remove(pos);
        } else {
            self.students.push(student.clone());
        }
        Ok(())
    }

    /// Add the tag if absent, remove it if present.
    pub fn toggle_domain_tag(&mut self, tag: &str) -> Result<(), WorkflowError> {
        self.require_editing("select domain tag")?;
        if let Some(pos) = self.domain_tags.iter().position(|t| t == tag) {
            self.domain_tags.remove(pos);
        } else {
            self.domain_tags.push(tag.to_string());
        }
        Ok(())
    }

    pub fn set_weather(&mut self, weather: Option<Weather>) {
        self.weather = weather;
    }

    /// Discard all input and start over. From `Previewing` this also drops
    /// the pending draft; from `Submitting` it abandons the submission, and
    /// a late [`complete_submit`](Self::complete_submit) is then refused.
    /// Not available after saving.
    pub fn cancel(&mut self) -> Result<(), WorkflowError> {
        match self.phase {
            Phase::Editing | Phase::Submitting | Phase::Previewing(_) => {
                self.raw_note.clear();
                self.students.clear();
                self.domain_tags.clear();
                self.phase = Phase::Editing;
                Ok(())
            }
            _ => Err(self.invalid("cancel")),
        }
    }

    // ── Submission ──

    /// Enter `Submitting` and return the request to send.
    pub fn begin_submit(&mut self) -> Result<RefinementRequest, WorkflowError> {
        match self.phase {
            Phase::Editing => {}
            Phase::Submitting => return Err(WorkflowError::SubmissionInFlight),
            _ => return Err(self.invalid("submit")),
        }
        let note = self.raw_note.trim();
        if note.is_empty() {
            return Err(WorkflowError::EmptyNote);
        }
        let request = RefinementRequest::new(
            note,
            self.students.iter().map(|s| s.name.clone()).collect(),
            self.domain_tags.clone(),
        )
        .map_err(|_| WorkflowError::EmptyNote)?;
        self.phase = Phase::Submitting;
        Ok(request)
    }

    /// Leave `Submitting` with the refinement outcome. Failures become a
    /// degraded draft.
    pub fn complete_submit(
        &mut self,
        outcome: Result<RefinementResult, RefineError>,
    ) -> Result<&mut EditableDraft, WorkflowError> {
        if !matches!(self.phase, Phase::Submitting) {
            return Err(self.invalid("complete submission"));
        }
        let note = self.raw_note.trim().to_string();
        let draft = match outcome {
            Ok(result) => EditableDraft::from_result(note, result),
            Err(e) => {
                warn!("Refinement unavailable, keeping the original note: {e}");
                EditableDraft::fallback(note)
            }
        };
        self.phase = Phase::Previewing(draft);
        match &mut self.phase {
            Phase::Previewing(draft) => Ok(draft),
            _ => unreachable!("phase was just set to Previewing"),
        }
    }

    /// Submit the note and wait for the draft.
    ///
    /// If this future is dropped before the refiner answers (a caller-side
    /// timeout, a closed connection), the session goes back to `Editing`
    /// with the note intact.
    pub async fn submit(
        &mut self,
        refiner: &dyn Refiner,
    ) -> Result<&mut EditableDraft, WorkflowError> {
        let request = self.begin_submit()?;
        let outcome = {
            let mut guard = SubmitGuard {
                phase: &mut self.phase,
                armed: true,
            };
            let outcome = refiner.refine(request).await;
            guard.armed = false;
            outcome
        };
        self.complete_submit(outcome)
    }

    /// Re-submit after a degraded draft, discarding it.
    pub async fn retry(
        &mut self,
        refiner: &dyn Refiner,
    ) -> Result<&mut EditableDraft, WorkflowError> {
        match &self.phase {
            Phase::Previewing(draft) if draft.is_degraded() => {}
            _ => return Err(self.invalid("retry")),
        }
        self.phase = Phase::Editing;
        self.submit(refiner).await
    }

    // ── Preview ──

    pub fn draft(&self) -> Option<&EditableDraft> {
        match &self.phase {
            Phase::Previewing(draft) => Some(draft),
            _ => None,
        }
    }

    pub fn draft_mut(&mut self) -> Option<&mut EditableDraft> {
        match &mut self.phase {
            Phase::Previewing(draft) => Some(draft),
            _ => None,
        }
    }

    /// Discard the draft and return to editing with the note and
    /// selections intact.
    pub fn go_back(&mut self) -> Result<(), WorkflowError> {
        if !matches!(self.phase, Phase::Previewing(_)) {
            return Err(self.invalid("go back"));
        }
        self.phase = Phase::Editing;
        Ok(())
    }

    /// The log the current draft would be saved as.
    pub fn log_input(&self) -> Result<LogInput, WorkflowError> {
        let Phase::Previewing(draft) = &self.phase else {
            return Err(self.invalid("save"));
        };
        Ok(LogInput {
            date: self.date,
            block_id: self.block_id.clone(),
            raw_content: draft.raw_note.clone(),
            refined_content: non_empty(&draft.refined_content),
            interpretation: non_empty(&draft.interpretation),
            student_ids: self.students.iter().map(|s| s.id.clone()).collect(),
            domain_tags: self.domain_tags.clone(),
            weather: self.weather,
        })
    }

    /// Hand the draft to persistence. On a sink failure the draft stays in
    /// place so the save can be attempted again.
    pub async fn save(&mut self, sink: &dyn LogSink) -> Result<&LogEntry, WorkflowError> {
        let input = self.log_input()?;
        let class_wide = input.is_class_wide();
        let entry = sink
            .insert(input)
            .await
            .map_err(|e| WorkflowError::SaveFailed(e.to_string()))?;
        info!(
            "Saved log {} for {} block {} (class-wide: {class_wide})",
            entry.id, entry.date, entry.block_id
        );
        self.phase = Phase::Saved(entry);
        match &self.phase {
            Phase::Saved(entry) => Ok(entry),
            _ => unreachable!("phase was just set to Saved"),
        }
    }

    /// The stored log, once saved.
    pub fn saved(&self) -> Option<&LogEntry> {
        match &self.phase {
            Phase::Saved(entry) => Some(entry),
            _ => None,
        }
    }

    fn require_editing(&self, operation: &'static str) -> Result<(), WorkflowError> {
        if matches!(self.phase, Phase::Editing) {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn invalid(&self, operation: &'static str) -> WorkflowError {
        WorkflowError::InvalidTransition {
            operation,
            state: self.state().name(),
        }
    }
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Returns an abandoned submission to `Editing`.
struct SubmitGuard<'a> {
    phase: &'a mut Phase,
    armed: bool,
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        if self.armed && matches!(self.phase, Phase::Submitting) {
            warn!("Submission abandoned before the refiner answered; back to editing");
            *self.phase = Phase::Editing;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RefineConfig;
    use crate::error::{GenerationError, StoreError};
    use crate::generation::CannedGenerator;
    use crate::refine::RefinementService;
    use crate::refine::RefineFuture;
    use crate::store::{MemoryLogStore, SinkFuture};
    use std::sync::Arc;
    use std::time::Duration;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 9).unwrap()
    }

    fn chulsoo() -> Student {
        Student::new("s1", "c1", "철수")
    }

    fn service(generator: CannedGenerator) -> RefinementService {
        RefinementService::new(
            Arc::new(generator),
            RefineConfig::default().with_api_key(Some("sk-test".into())),
        )
    }

    fn session_with_note(note: &str) -> NoteSession {
        let mut session = NoteSession::new(date(), "tb3");
        session.set_raw_note(note).unwrap();
        session
    }

    /// Never answers.
    struct StalledRefiner;

    impl Refiner for StalledRefiner {
        fn refine(&self, _request: RefinementRequest) -> RefineFuture<'_> {
            Box::pin(std::future::pending())
        }
    }

    struct RejectingSink;

    impl LogSink for RejectingSink {
        fn insert(&self, _input: LogInput) -> SinkFuture<'_> {
            Box::pin(async { Err(StoreError::Unavailable("offline".into())) })
        }
    }

    #[tokio::test]
    async fn success_produces_editable_draft() {
        let svc = service(CannedGenerator::returning("김철수가 탑을 쌓았다.", "집중력이 좋다."));
        let mut session = session_with_note("철수가 블록으로 탑을 쌓았다");
        session.toggle_student(&chulsoo()).unwrap();

        let draft = session.submit(&svc).await.unwrap();
        assert!(!draft.is_degraded());
        draft.set_interpretation("수정된 해석");

        assert_eq!(session.state(), SessionState::Previewing);
        let draft = session.draft().unwrap();
        assert_eq!(draft.refined_content, "김철수가 탑을 쌓았다.");
        assert_eq!(draft.interpretation, "수정된 해석");
        assert_eq!(draft.raw_note(), "철수가 블록으로 탑을 쌓았다");
    }

    #[tokio::test]
    async fn failure_falls_back_to_raw_note() {
        let svc = service(CannedGenerator::failing("connection refused"));
        let mut session = session_with_note("철수가 블록으로 탑을 쌓았다");

        let draft = session.submit(&svc).await.unwrap();
        assert!(draft.is_degraded());
        assert_eq!(draft.refined_content, "철수가 블록으로 탑을 쌓았다");
        assert_eq!(draft.interpretation, "");
        assert_eq!(session.state(), SessionState::Previewing);
    }

    #[tokio::test]
    async fn unconfigured_service_also_falls_back() {
        let svc = RefinementService::new(
            Arc::new(CannedGenerator::returning("a", "b")),
            RefineConfig::default(),
        );
        let mut session = session_with_note("점심을 잘 먹었다");
        let draft = session.submit(&svc).await.unwrap();
        assert!(draft.is_degraded());
        assert_eq!(draft.refined_content, "점심을 잘 먹었다");
    }

    #[test]
    fn empty_note_cannot_submit() {
        let mut session = session_with_note("   ");
        assert!(!session.can_submit());
        assert_eq!(session.begin_submit().unwrap_err(), WorkflowError::EmptyNote);
        assert_eq!(session.state(), SessionState::Editing);
    }

    #[test]
    fn second_submission_rejected_while_in_flight() {
        let mut session = session_with_note("메모");
        session.begin_submit().unwrap();
        assert_eq!(session.state(), SessionState::Submitting);
        assert!(!session.can_submit());
        assert_eq!(
            session.begin_submit().unwrap_err(),
            WorkflowError::SubmissionInFlight
        );
        assert!(session.set_raw_note("다른 메모").is_err());
    }

    #[test]
    fn request_carries_trimmed_note_and_context() {
        let mut session = session_with_note("  영희가 노래했다 \n");
        session
            .toggle_student(&Student::new("s2", "c1", "영희"))
            .unwrap();
        session.toggle_domain_tag("예술경험").unwrap();
        let request = session.begin_submit().unwrap();
        assert_eq!(request.raw_note(), "영희가 노래했다");
        assert_eq!(request.student_names(), ["영희".to_string()]);
        assert_eq!(request.domain_tags(), ["예술경험".to_string()]);
    }

    #[test]
    fn toggles_add_and_remove() {
        let mut session = session_with_note("메모");
        session.toggle_student(&chulsoo()).unwrap();
        session.toggle_domain_tag("사회관계").unwrap();
        session.toggle_student(&chulsoo()).unwrap();
        session.toggle_domain_tag("사회관계").unwrap();
        assert!(session.students().is_empty());
        assert!(session.domain_tags().is_empty());
    }

    #[test]
    fn complete_without_begin_is_invalid() {
        let mut session = session_with_note("메모");
        let err = session
            .complete_submit(Err(RefineError::InvalidInput))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    }

    #[test]
    fn generation_error_completes_to_fallback() {
        let mut session = session_with_note("메모");
        session.begin_submit().unwrap();
        let draft = session
            .complete_submit(Err(RefineError::GenerationFailed(
                GenerationError::Malformed("not json".into()),
            )))
            .unwrap();
        assert!(draft.is_degraded());
        assert_eq!(session.state(), SessionState::Previewing);
    }

    #[tokio::test]
    async fn go_back_keeps_input_and_discards_draft() {
        let svc = service(CannedGenerator::returning("기록", "해석"));
        let mut session = session_with_note("메모");
        session.toggle_student(&chulsoo()).unwrap();
        session.submit(&svc).await.unwrap();

        session.go_back().unwrap();
        assert_eq!(session.state(), SessionState::Editing);
        assert!(session.draft().is_none());
        assert_eq!(session.raw_note(), "메모");
        assert_eq!(session.students().len(), 1);
    }

    #[test]
    fn cancel_discards_everything() {
        let mut session = session_with_note("메모");
        session.toggle_domain_tag("자연탐구").unwrap();
        session.cancel().unwrap();
        assert_eq!(session.state(), SessionState::Editing);
        assert!(session.raw_note().is_empty());
        assert!(session.domain_tags().is_empty());
    }

    #[tokio::test]
    async fn cancel_drops_pending_draft() {
        let svc = service(CannedGenerator::returning("기록", "해석"));
        let mut session = session_with_note("메모");
        session.submit(&svc).await.unwrap();

        session.cancel().unwrap();
        assert_eq!(session.state(), SessionState::Editing);
        assert!(session.draft().is_none());
        assert!(session.raw_note().is_empty());
    }

    #[test]
    fn cancel_abandons_manual_submission() {
        let mut session = session_with_note("메모");
        session.begin_submit().unwrap();

        session.cancel().unwrap();
        assert_eq!(session.state(), SessionState::Editing);
        let err = session
            .complete_submit(Err(RefineError::InvalidInput))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn dropped_submission_returns_to_editing() {
        let mut session = session_with_note("철수가 블록으로 탑을 쌓았다");
        session.toggle_student(&chulsoo()).unwrap();

        let timed_out =
            tokio::time::timeout(Duration::from_millis(50), session.submit(&StalledRefiner)).await;
        assert!(timed_out.is_err());

        assert_eq!(session.state(), SessionState::Editing);
        assert_eq!(session.raw_note(), "철수가 블록으로 탑을 쌓았다");
        assert_eq!(session.students().len(), 1);
        assert!(session.can_submit());

        let svc = service(CannedGenerator::returning("김철수가 탑을 쌓았다.", "집중력이 좋다."));
        let draft = session.submit(&svc).await.unwrap();
        assert!(!draft.is_degraded());
    }

    #[tokio::test]
    async fn retry_only_after_degraded_draft() {
        let svc = service(CannedGenerator::new([
            crate::generation::CannedReply::TransportFailure("down".into()),
            crate::generation::CannedReply::Json(serde_json::json!({
                "refinedContent": "기록",
                "interpretation": "해석",
            })),
        ]));
        let mut session = session_with_note("메모");
        assert!(session.submit(&svc).await.unwrap().is_degraded());

        let draft = session.retry(&svc).await.unwrap();
        assert!(!draft.is_degraded());
        assert_eq!(draft.refined_content, "기록");

        let err = session.retry(&svc).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn save_without_students_is_class_wide() {
        let svc = service(CannedGenerator::returning("기록", "해석"));
        let store = MemoryLogStore::new();
        let mut session = session_with_note("다 함께 산책했다");
        session.set_weather(Some(Weather::Cloudy));
        session.submit(&svc).await.unwrap();

        let entry = session.save(&store).await.unwrap();
        assert!(entry.is_class_wide);
        assert_eq!(entry.weather, Some(Weather::Cloudy));
        assert_eq!(session.state(), SessionState::Saved);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn save_with_students_is_not_class_wide() {
        let svc = service(CannedGenerator::returning("기록", "해석"));
        let store = MemoryLogStore::new();
        let mut session = session_with_note("철수가 블록으로 탑을 쌓았다");
        session.toggle_student(&chulsoo()).unwrap();
        session.toggle_domain_tag("자연탐구").unwrap();
        session.submit(&svc).await.unwrap();

        let entry = session.save(&store).await.unwrap().clone();
        assert!(!entry.is_class_wide);
        assert_eq!(entry.student_ids, vec!["s1"]);
        assert_eq!(entry.domain_tags, vec!["자연탐구"]);
        assert_eq!(entry.block_id, "tb3");
        assert_eq!(entry.date, date());
        assert_eq!(session.saved(), Some(&entry));
    }

    #[tokio::test]
    async fn degraded_draft_saves_without_interpretation() {
        let svc = service(CannedGenerator::failing("timeout"));
        let store = MemoryLogStore::new();
        let mut session = session_with_note("낮잠을 푹 잤다");
        session.submit(&svc).await.unwrap();

        let entry = session.save(&store).await.unwrap();
        assert_eq!(entry.raw_content, "낮잠을 푹 잤다");
        assert_eq!(entry.refined_content.as_deref(), Some("낮잠을 푹 잤다"));
        assert_eq!(entry.interpretation, None);
    }

    #[tokio::test]
    async fn edited_text_is_what_gets_saved() {
        let svc = service(CannedGenerator::returning("기록", "해석"));
        let store = MemoryLogStore::new();
        let mut session = session_with_note("메모");
        let draft = session.submit(&svc).await.unwrap();
        draft.set_refined_content("교사가 다듬은 기록");

        let entry = session.save(&store).await.unwrap();
        assert_eq!(entry.refined_content.as_deref(), Some("교사가 다듬은 기록"));
        assert_eq!(entry.interpretation.as_deref(), Some("해석"));
    }

    #[tokio::test]
    async fn sink_failure_keeps_draft() {
        let svc = service(CannedGenerator::returning("기록", "해석"));
        let mut session = session_with_note("메모");
        session.submit(&svc).await.unwrap();

        let err = session.save(&RejectingSink).await.unwrap_err();
        assert!(matches!(err, WorkflowError::SaveFailed(_)));
        assert_eq!(session.state(), SessionState::Previewing);
        assert!(session.draft().is_some());

        let store = MemoryLogStore::new();
        assert!(session.save(&store).await.is_ok());
    }

    #[test]
    fn save_requires_preview() {
        let session = session_with_note("메모");
        assert!(matches!(
            session.log_input(),
            Err(WorkflowError::InvalidTransition { operation: "save", .. })
        ));
    }
}
