//! 확인 정책
//!
//! 한 번의 실행 동안 "모두 예" / "모두 아니오" 선택을 기억한다.

use crate::ui::{ConfirmAllAnswer, ConfirmAllNoneAnswer, UiBridge};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmKind {
    Overwrite,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Proceed,
    /// 이번 항목만 건너뜀
    SkipThis,
    /// 이번 항목과 이후 같은 종류 항목을 모두 건너뜀
    SkipAll,
    /// 실행 중단 (이미 처리된 항목은 그대로)
    StopRun,
}

#[derive(Debug, Clone)]
pub struct ConfirmPolicy {
    kind: ConfirmKind,
    all: bool,
    none: bool,
}

impl ConfirmPolicy {
    /// `confirm`이 꺼져 있으면 처음부터 "모두 예" 상태
    pub fn new(kind: ConfirmKind, confirm: bool) -> Self {
        Self {
            kind,
            all: !confirm,
            none: false,
        }
    }

    pub fn applies_to_all(&self) -> bool {
        self.all
    }

    pub fn applies_to_none(&self) -> bool {
        self.none
    }

    pub fn decide(&mut self, title: &str, label: &str, ui: &mut dyn UiBridge) -> Verdict {
        if self.all {
            return Verdict::Proceed;
        }
        if self.none {
            return Verdict::SkipThis;
        }

        let verdict = match self.kind {
            ConfirmKind::Overwrite => {
                let question = format!("Overwrite '{}'", label);
                match ui.prompt_confirm_all_none(title, &question, true) {
                    ConfirmAllNoneAnswer::Yes => Verdict::Proceed,
                    ConfirmAllNoneAnswer::All => {
                        self.all = true;
                        Verdict::Proceed
                    }
                    ConfirmAllNoneAnswer::No => Verdict::SkipThis,
                    ConfirmAllNoneAnswer::None => {
                        self.none = true;
                        Verdict::SkipAll
                    }
                    ConfirmAllNoneAnswer::Stop => Verdict::StopRun,
                }
            }
            ConfirmKind::Delete => {
                let question = format!("Delete '{}'", label);
                match ui.prompt_confirm_all(title, &question, true) {
                    ConfirmAllAnswer::Yes => Verdict::Proceed,
                    ConfirmAllAnswer::All => {
                        self.all = true;
                        Verdict::Proceed
                    }
                    ConfirmAllAnswer::No => Verdict::SkipThis,
                    ConfirmAllAnswer::Stop => Verdict::StopRun,
                }
            }
        };
        debug!(kind = ?self.kind, label, ?verdict, "confirmation");
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::scripted::{Answer, ScriptedUi};

    #[test]
    fn test_disabled_confirmation_never_prompts() {
        let mut ui = ScriptedUi::new();
        let mut policy = ConfirmPolicy::new(ConfirmKind::Delete, false);
        for label in ["a", "b", "c"] {
            assert_eq!(policy.decide("Delete", label, &mut ui), Verdict::Proceed);
        }
        assert!(ui.prompts.is_empty());
    }

    #[test]
    fn test_all_answer_is_sticky() {
        let mut ui = ScriptedUi::with_answers(vec![Answer::AllNone(ConfirmAllNoneAnswer::All)]);
        let mut policy = ConfirmPolicy::new(ConfirmKind::Overwrite, true);

        assert_eq!(policy.decide("Copy", "a", &mut ui), Verdict::Proceed);
        assert_eq!(policy.decide("Copy", "b", &mut ui), Verdict::Proceed);
        assert_eq!(policy.decide("Copy", "c", &mut ui), Verdict::Proceed);
        assert_eq!(ui.prompts.len(), 1);
        assert!(policy.applies_to_all());
    }

    #[test]
    fn test_none_answer_skips_rest_without_prompting() {
        let mut ui = ScriptedUi::with_answers(vec![
            Answer::AllNone(ConfirmAllNoneAnswer::No),
            Answer::AllNone(ConfirmAllNoneAnswer::None),
        ]);
        let mut policy = ConfirmPolicy::new(ConfirmKind::Overwrite, true);

        assert_eq!(policy.decide("Copy", "a", &mut ui), Verdict::SkipThis);
        assert_eq!(policy.decide("Copy", "b", &mut ui), Verdict::SkipAll);
        assert_eq!(policy.decide("Copy", "c", &mut ui), Verdict::SkipThis);
        assert_eq!(policy.decide("Copy", "d", &mut ui), Verdict::SkipThis);
        assert_eq!(ui.prompts.len(), 2);
        assert!(policy.applies_to_none());
    }

    #[test]
    fn test_delete_prompt_stop_and_no() {
        let mut ui = ScriptedUi::with_answers(vec![
            Answer::All(ConfirmAllAnswer::No),
            Answer::All(ConfirmAllAnswer::Stop),
        ]);
        let mut policy = ConfirmPolicy::new(ConfirmKind::Delete, true);

        assert_eq!(policy.decide("Delete", "a", &mut ui), Verdict::SkipThis);
        assert_eq!(policy.decide("Delete", "b", &mut ui), Verdict::StopRun);
        assert_eq!(ui.prompts, vec!["Delete: Delete 'a'", "Delete: Delete 'b'"]);
    }
}
