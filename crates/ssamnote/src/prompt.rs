//! Prompt construction for note refinement.
//!
//! [`PromptBuilder`] assembles a preamble and `##`-headed sections joined by
//! blank lines; empty sections are skipped. [`build_refinement_prompt`]
//! renders the fixed refinement template on top of it:
//!
//! ```text
//! <role preamble>
//!
//! <task line>
//!
//! ## 규칙
//! 1. ... 4.
//!
//! ## 입력 정보
//! - 교사 메모: "<raw note>"
//! - 관련 유아: <names>          (or "- 전체 학급 활동")
//! - 누리과정 영역: <tags>        (only when tags are present)
//!
//! ## 출력
//! refinedContent: ...
//! interpretation: ...
//! ```

/// Label of the student-context line.
pub const STUDENT_LABEL: &str = "관련 유아";

/// Student-context line used when no child is named.
pub const WHOLE_CLASS_MARKER: &str = "전체 학급 활동";

/// Label of the domain-context line.
pub const DOMAIN_LABEL: &str = "누리과정 영역";

const ROLE_PREAMBLE: &str = "\
당신은 한국 어린이집/유치원 교사의 관찰 기록을 작성하는 전문가입니다.
누리과정(국가수준 유아교육과정)의 평가 언어 체계를 잘 알고 있습니다.";

const TASK: &str = "교사가 작성한 비공식적인 메모를 공식적인 평가 기록으로 변환해주세요.";

const RULES: &str = "\
1. 3인칭 과거형으로 작성 (예: \"~하였다\", \"~보였다\")
2. 객관적이고 긍정적인 톤 유지
3. 유아의 이름은 그대로 사용
4. 발달적 의미와 교사의 후속 지원 계획을 간단히 제시";

const OUTPUT_FIELDS: &str = "\
refinedContent: 공식 관찰 기록 (2-3문장)
interpretation: 발달적 해석 및 지원 계획 (1-2문장)";

/// Builder for multi-section prompts.
///
/// # Example
///
/// ```
/// use ssamnote::prompt::PromptBuilder;
///
/// let prompt = PromptBuilder::new("You write observation records.")
///     .section("Rules", "Past tense.")
///     .section_opt("Tags", None::<String>)
///     .build();
///
/// assert!(prompt.contains("## Rules\nPast tense."));
/// assert!(!prompt.contains("## Tags"));
/// ```
pub struct PromptBuilder {
    sections: Vec<String>,
}

impl PromptBuilder {
    /// Start with a preamble, included as-is.
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            sections: vec![preamble.into()],
        }
    }

    /// Append a `## heading` section. Skipped if `content` is empty.
    pub fn section(mut self, heading: &str, content: impl Into<String>) -> Self {
        let content = content.into();
        if !content.is_empty() {
            self.sections.push(format!("## {heading}\n{content}"));
        }
        self
    }

    /// Append a section only if the content is `Some`.
    pub fn section_opt(self, heading: &str, content: Option<impl Into<String>>) -> Self {
        match content {
            Some(c) => self.section(heading, c),
            None => self,
        }
    }

    /// Append raw text without a heading. Skipped if empty.
    pub fn raw(mut self, content: impl Into<String>) -> Self {
        let content = content.into();
        if !content.is_empty() {
            self.sections.push(content);
        }
        self
    }

    /// Join all sections with blank lines.
    pub fn build(self) -> String {
        self.sections.join("\n\n")
    }
}

/// Render a bulleted list, one `- ` line per item.
fn bullets<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    items
        .into_iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The student-context line: joined names, or the whole-class marker.
pub fn student_context(student_names: &[String]) -> String {
    if student_names.is_empty() {
        WHOLE_CLASS_MARKER.to_string()
    } else {
        format!("{STUDENT_LABEL}: {}", student_names.join(", "))
    }
}

/// The domain-context line, or `None` when there are no tags.
pub fn domain_context(domain_tags: &[String]) -> Option<String> {
    if domain_tags.is_empty() {
        None
    } else {
        Some(format!("{DOMAIN_LABEL}: {}", domain_tags.join(", ")))
    }
}

/// Render the refinement prompt for one note.
///
/// Pure: identical inputs give byte-identical output.
pub fn build_refinement_prompt(
    raw_note: &str,
    student_names: &[String],
    domain_tags: &[String],
) -> String {
    let note_line = format!("교사 메모: \"{raw_note}\"");
    let students = student_context(student_names);
    let domains = domain_context(domain_tags);

    let mut inputs = vec![note_line.as_str(), students.as_str()];
    if let Some(ref line) = domains {
        inputs.push(line);
    }

    PromptBuilder::new(ROLE_PREAMBLE)
        .raw(TASK)
        .section("규칙", RULES)
        .section("입력 정보", bullets(inputs))
        .section("출력", OUTPUT_FIELDS)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn builder_preamble_only() {
        assert_eq!(PromptBuilder::new("Preamble").build(), "Preamble");
    }

    #[test]
    fn builder_skips_empty_sections() {
        let prompt = PromptBuilder::new("P")
            .section("Empty", "")
            .raw("")
            .section("Full", "body")
            .build();
        assert_eq!(prompt, "P\n\n## Full\nbody");
    }

    #[test]
    fn scenario_single_child_no_domains() {
        let raw = "철수가 블록으로 탑을 쌓았다";
        let prompt = build_refinement_prompt(raw, &names(&["철수"]), &[]);
        assert_eq!(prompt.matches(raw).count(), 1);
        assert!(prompt.contains("- 관련 유아: 철수\n"));
        assert!(!prompt.contains(DOMAIN_LABEL));
    }

    #[test]
    fn whole_class_marker_when_no_students() {
        let prompt = build_refinement_prompt("다 함께 노래를 불렀다", &[], &[]);
        assert!(prompt.contains(&format!("- {WHOLE_CLASS_MARKER}\n")));
        assert!(!prompt.contains(STUDENT_LABEL));
    }

    #[test]
    fn names_and_tags_joined() {
        let prompt = build_refinement_prompt(
            "둘이 함께 모래성을 만들었다",
            &names(&["김철수", "이영희"]),
            &names(&["사회관계", "자연탐구"]),
        );
        assert!(prompt.contains("- 관련 유아: 김철수, 이영희\n- 누리과정 영역: 사회관계, 자연탐구\n"));
    }

    #[test]
    fn no_blank_line_left_for_missing_domains() {
        let prompt = build_refinement_prompt("점심을 맛있게 먹었다", &names(&["민준"]), &[]);
        assert!(prompt.contains("- 관련 유아: 민준\n\n## 출력"));
    }

    #[test]
    fn fixed_section_order() {
        let prompt = build_refinement_prompt("메모 내용", &[], &names(&["의사소통"]));
        let role = prompt.find("전문가입니다").unwrap();
        let rules = prompt.find("## 규칙").unwrap();
        let note = prompt.find("교사 메모").unwrap();
        let students = prompt.find(WHOLE_CLASS_MARKER).unwrap();
        let domains = prompt.find(DOMAIN_LABEL).unwrap();
        let output = prompt.find("## 출력").unwrap();
        assert!(role < rules && rules < note && note < students);
        assert!(students < domains && domains < output);
    }

    #[test]
    fn deterministic() {
        let a = build_refinement_prompt("x가 y를 했다", &names(&["x"]), &names(&["예술경험"]));
        let b = build_refinement_prompt("x가 y를 했다", &names(&["x"]), &names(&["예술경험"]));
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn output_fields_named() {
        let prompt = build_refinement_prompt("메모", &[], &[]);
        assert!(prompt.ends_with(OUTPUT_FIELDS));
        assert!(prompt.contains("refinedContent:"));
        assert!(prompt.contains("interpretation:"));
    }
}
