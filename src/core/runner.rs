//! 작업 실행기
//!
//! 항목 하나씩: 확인 → 전송 → 결과 대기 → 처리. worker에는 한 번에 요청
//! 하나만 보내고, 결과를 받기 전에는 다음 항목으로 넘어가지 않는다.

use crate::app::config::Options;
use crate::core::cancel::{wait_for_result, BusyIndicator, Wait};
use crate::core::channel::Request;
use crate::core::jobs::{Job, PlannedItem, Prepared};
use crate::core::worker::{WorkFn, Worker};
use crate::models::operation::{
    ItemResult, OperationProgress, OperationType, ProgressSnapshot, RunOutcome, RunReport,
    SingleOutcome, WorkItem,
};
use crate::ui::UiBridge;
use crate::utils::error::Result;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 실행 간격 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    /// 결과 대기 한 번의 최대 시간
    pub poll_interval: Duration,
    /// kill 후 worker 종료 대기 시간
    pub kill_grace: Duration,
}

impl From<&Options> for RunSettings {
    fn from(options: &Options) -> Self {
        Self {
            poll_interval: options.poll_interval(),
            kill_grace: options.kill_grace(),
        }
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        Self::from(&Options::default())
    }
}

/// 중지 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopKind {
    /// 확인 창에서 중지 (worker는 쉬는 중)
    Prompt,
    /// 취소 키로 중지 (worker는 일시정지된 채 작업 중)
    Cancel,
}

pub struct Runner<'a> {
    ui: &'a mut dyn UiBridge,
    settings: RunSettings,
}

impl<'a> Runner<'a> {
    pub fn new(ui: &'a mut dyn UiBridge, options: &Options) -> Self {
        Self::with_settings(ui, RunSettings::from(options))
    }

    pub fn with_settings(ui: &'a mut dyn UiBridge, settings: RunSettings) -> Self {
        Self { ui, settings }
    }

    pub fn ui(&mut self) -> &mut dyn UiBridge {
        &mut *self.ui
    }

    /// 작업 전체 실행
    ///
    /// worker 시작 실패만 에러로 돌려준다. 항목별 실패는 에러 창에 알리고
    /// `RunReport::failures`에 모은다.
    pub fn run<J: Job + ?Sized>(&mut self, job: &mut J, work: WorkFn) -> Result<RunOutcome> {
        let operation = job.operation();
        let mut report = RunReport::default();

        for failure in job.known_failures() {
            let label = failure.path.display().to_string();
            self.fail_item(
                operation,
                &label,
                failure.path,
                failure.message,
                failure.code,
                &mut report,
            );
        }

        let plan = job.plan();
        if plan.is_empty() {
            return Ok(RunOutcome::Completed(report));
        }

        let mut worker = Worker::spawn(work, self.settings.poll_interval, self.settings.kill_grace)?;
        info!(operation = ?operation, items = plan.len(), "run started");

        let mut progress = match job.total_size() {
            Some(bytes) => OperationProgress::by_size(operation, plan.len(), bytes),
            None => OperationProgress::by_count(operation, plan.len()),
        };
        let mut indicator = BusyIndicator::default();

        for planned in &plan {
            progress.start_item(&planned.label, planned.size);
            self.ui.redraw_progress(&progress.snapshot());

            let mut next = job.prepare(planned, &mut *self.ui);
            loop {
                let dispatched = match next {
                    Prepared::Dispatch(item) => item,
                    Prepared::Skip => {
                        debug!(item = %planned.label, "skipped");
                        report.skipped.push(planned.source.clone());
                        break;
                    }
                    Prepared::Stop => return Ok(self.stop(worker, report, StopKind::Prompt)),
                };

                debug!(item = %dispatched.target(), "dispatch");
                if let Err(e) = worker.send(&Request::Exec(dispatched.clone())) {
                    let code = e.os_code();
                    job.reject(planned);
                    self.fail_planned(operation, planned, e.to_string(), code, &mut report);
                    break;
                }

                match wait_for_result(&mut *self.ui, &mut worker, operation.title(), &mut indicator)
                {
                    Wait::Stopped => return Ok(self.stop(worker, report, StopKind::Cancel)),
                    Wait::Result(ItemResult::Conflict { name }) => {
                        next = job.resolve_conflict(planned, &dispatched, &name, &mut *self.ui);
                    }
                    Wait::Result(ItemResult::Failed { message, code }) => {
                        job.reject(planned);
                        self.fail_planned(operation, planned, message, code, &mut report);
                        break;
                    }
                    Wait::Result(result) => {
                        job.accept(planned, &result);
                        report.processed.push(planned.source.clone());
                        break;
                    }
                }
            }
        }

        worker.finish();
        self.ui.finish_progress();
        info!(
            operation = ?operation,
            processed = report.processed.len(),
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            "run finished"
        );
        Ok(RunOutcome::Completed(report))
    }

    /// 작업 하나를 제목만 있는 진행 창으로 실행 (vfs 압축/해제)
    pub fn run_single(
        &mut self,
        title: &str,
        label: &str,
        item: WorkItem,
        work: WorkFn,
    ) -> Result<SingleOutcome> {
        let mut worker = Worker::spawn(work, self.settings.poll_interval, self.settings.kill_grace)?;
        info!(title, label, "single run started");
        self.ui.redraw_progress(&ProgressSnapshot {
            title: title.to_string(),
            label: label.to_string(),
            percent_size: None,
            percent_count: 0,
            counter: String::new(),
        });

        let outcome = match worker.send(&Request::Exec(item)) {
            Err(e) => {
                worker.finish();
                SingleOutcome::Done(ItemResult::failed(e.to_string(), e.os_code()))
            }
            Ok(()) => {
                let mut indicator = BusyIndicator::default();
                match wait_for_result(&mut *self.ui, &mut worker, title, &mut indicator) {
                    Wait::Stopped => {
                        worker.kill();
                        SingleOutcome::Stopped
                    }
                    Wait::Result(result) => {
                        worker.finish();
                        SingleOutcome::Done(result)
                    }
                }
            }
        };
        self.ui.finish_progress();
        info!(title, stopped = matches!(outcome, SingleOutcome::Stopped), "single run finished");
        Ok(outcome)
    }

    fn stop(&mut self, worker: Worker, report: RunReport, kind: StopKind) -> RunOutcome {
        match kind {
            StopKind::Prompt => worker.finish(),
            StopKind::Cancel => worker.kill(),
        }
        self.ui.finish_progress();
        info!(
            processed = report.processed.len(),
            ?kind,
            "run stopped by user"
        );
        RunOutcome::Stopped(report)
    }

    fn fail_planned(
        &mut self,
        operation: OperationType,
        planned: &PlannedItem,
        message: String,
        code: i32,
        report: &mut RunReport,
    ) {
        self.fail_item(
            operation,
            &planned.label,
            planned.source.clone(),
            message,
            code,
            report,
        );
    }

    fn fail_item(
        &mut self,
        operation: OperationType,
        label: &str,
        path: PathBuf,
        message: String,
        code: i32,
        report: &mut RunReport,
    ) {
        warn!(item = label, code, %message, "item failed");
        self.ui.report_error(&format!(
            "Cannot {}\n{}: {} ({})",
            operation.verb(),
            label,
            message,
            code
        ));
        report.fail(path, message, code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::jobs::{BackupJob, DirSizeJob};
    use crate::models::file_entry::DirSizeInfo;
    use crate::ui::scripted::{Answer, ScriptedUi};
    use crate::ui::ConfirmAnswer;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    fn settings() -> RunSettings {
        RunSettings {
            poll_interval: Duration::from_millis(1),
            kill_grace: Duration::from_millis(500),
        }
    }

    /// "1".."n" 이름의 삭제 항목만 가진 작업
    struct NumberedJob {
        count: usize,
    }

    impl Job for NumberedJob {
        fn operation(&self) -> OperationType {
            OperationType::Delete
        }

        fn plan(&self) -> Vec<PlannedItem> {
            (1..=self.count)
                .map(|n| PlannedItem {
                    item: WorkItem::Delete {
                        path: PathBuf::from(n.to_string()),
                    },
                    label: n.to_string(),
                    source: PathBuf::from(n.to_string()),
                    size: 0,
                })
                .collect()
        }
    }

    fn recording_work(seen: Arc<Mutex<Vec<String>>>, fail_on: &'static str) -> WorkFn {
        Box::new(move |item, _| {
            let target = item.target();
            seen.lock().unwrap().push(target.clone());
            if target == fail_on {
                ItemResult::failed("boom", 5)
            } else {
                ItemResult::Done
            }
        })
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_failure_on_item_two_does_not_abort() {
        let mut ui = ScriptedUi::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let outcome = Runner::with_settings(&mut ui, settings())
            .run(&mut NumberedJob { count: 5 }, recording_work(seen.clone(), "2"))
            .unwrap();

        assert!(!outcome.is_stopped());
        let report = outcome.into_report();
        assert_eq!(report.processed, paths(&["1", "3", "4", "5"]));
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, PathBuf::from("2"));
        assert_eq!(report.failures[0].code, 5);
        assert_eq!(ui.errors, vec!["Cannot delete files\n2: boom (5)"]);
        assert_eq!(seen.lock().unwrap().len(), 5);
        assert_eq!(ui.finished, 1);
    }

    #[test]
    fn test_dir_size_keeps_positions_after_failure() {
        let mut ui = ScriptedUi::new();
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let mut job = DirSizeJob::new(names, Path::new("/base"));
        let work: WorkFn = Box::new(|item, _| match item.target().as_str() {
            "a" => ItemResult::failed("Permission denied", 13),
            name => ItemResult::DirSize(DirSizeInfo {
                size: if name == "b" { 200 } else { 300 },
                ..DirSizeInfo::unknown()
            }),
        });

        let outcome = Runner::with_settings(&mut ui, settings())
            .run(&mut job, work)
            .unwrap();
        assert_eq!(outcome.into_report().failures.len(), 1);

        let sizes: Vec<u64> = job.into_results().iter().map(|info| info.size).collect();
        assert_eq!(sizes, vec![0, 200, 300]);
    }

    #[test]
    fn test_stop_during_item_three() {
        let mut ui = ScriptedUi::with_answers(vec![Answer::Confirm(ConfirmAnswer::Yes)])
            .cancel_on("3");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let outcome = Runner::with_settings(&mut ui, settings())
            .run(&mut NumberedJob { count: 5 }, recording_work(seen.clone(), ""))
            .unwrap();

        assert!(outcome.is_stopped());
        let report = outcome.into_report();
        assert_eq!(report.processed, paths(&["1", "2"]));
        assert!(report.failures.is_empty());
        assert!(ui.errors.is_empty());
        assert_eq!(ui.prompts, vec!["Stop process: Stop \"Delete files\""]);

        let seen = seen.lock().unwrap();
        assert!(!seen.contains(&"4".to_string()));
        assert!(!seen.contains(&"5".to_string()));
    }

    #[test]
    fn test_declined_stop_runs_to_completion() {
        let mut ui =
            ScriptedUi::with_answers(vec![Answer::Confirm(ConfirmAnswer::No)]).cancel_on("2");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let outcome = Runner::with_settings(&mut ui, settings())
            .run(&mut NumberedJob { count: 3 }, recording_work(seen, ""))
            .unwrap();

        assert!(!outcome.is_stopped());
        assert_eq!(outcome.report().processed.len(), 3);
    }

    #[test]
    fn test_panicking_work_is_reported_and_run_continues() {
        let mut ui = ScriptedUi::new();
        let work: WorkFn = Box::new(|item, _| {
            if item.target() == "1" {
                panic!("worker blew up");
            }
            ItemResult::Done
        });
        let outcome = Runner::with_settings(&mut ui, settings())
            .run(&mut NumberedJob { count: 2 }, work)
            .unwrap();

        let report = outcome.into_report();
        assert_eq!(report.processed, paths(&["2"]));
        assert_eq!(report.failures[0].code, -1);
        assert!(ui.errors[0].contains("worker blew up"));
    }

    #[test]
    fn test_conflict_reenters_confirmation() {
        let mut ui = ScriptedUi::with_answers(vec![
            Answer::Confirm(ConfirmAnswer::Yes),
            Answer::Confirm(ConfirmAnswer::No),
        ]);
        let mut job = BackupJob::new(
            vec!["a".to_string(), "b".to_string()],
            Path::new("/base"),
            ".bak",
        );
        let dispatched = Arc::new(Mutex::new(Vec::new()));
        let log = dispatched.clone();
        let work: WorkFn = Box::new(move |item, _| {
            log.lock().unwrap().push(item.clone());
            match item {
                WorkItem::Backup {
                    name,
                    check_exists: true,
                    ..
                } => ItemResult::Conflict {
                    name: format!("{}.bak", name),
                },
                _ => ItemResult::Done,
            }
        });

        let report = Runner::with_settings(&mut ui, settings())
            .run(&mut job, work)
            .unwrap()
            .into_report();

        assert_eq!(report.processed, paths(&["/base/a"]));
        assert_eq!(report.skipped, paths(&["/base/b"]));
        assert_eq!(
            ui.prompts,
            vec!["Backup: Overwrite 'a.bak'", "Backup: Overwrite 'b.bak'"]
        );
        // a: 확인 후 덮어쓰기로 재전송, b: 거절
        assert_eq!(dispatched.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_prompt_stop_returns_stopped() {
        let mut ui = ScriptedUi::with_answers(vec![Answer::Confirm(ConfirmAnswer::Cancel)]);
        let mut job = BackupJob::new(
            vec!["a".to_string(), "b".to_string()],
            Path::new("/base"),
            ".bak",
        );
        let work: WorkFn = Box::new(|item, _| ItemResult::Conflict { name: item.target() });

        let outcome = Runner::with_settings(&mut ui, settings())
            .run(&mut job, work)
            .unwrap();
        assert!(outcome.is_stopped());
        assert!(outcome.report().processed.is_empty());
        assert_eq!(ui.prompts.len(), 1);
    }

    #[test]
    fn test_empty_plan_completes_without_progress() {
        let mut ui = ScriptedUi::new();
        let outcome = Runner::with_settings(&mut ui, settings())
            .run(&mut NumberedJob { count: 0 }, Box::new(|_, _| ItemResult::Done))
            .unwrap();
        assert_eq!(outcome, RunOutcome::Completed(RunReport::default()));
        assert!(ui.progress.is_empty());
    }

    #[test]
    fn test_progress_counts_every_item() {
        let mut ui = ScriptedUi::new();
        Runner::with_settings(&mut ui, settings())
            .run(&mut NumberedJob { count: 4 }, Box::new(|_, _| ItemResult::Done))
            .unwrap();
        let counters: Vec<&str> = ui.progress.iter().map(|p| p.counter.as_str()).collect();
        assert_eq!(counters, vec!["1/4", "2/4", "3/4", "4/4"]);
        assert_eq!(ui.progress[3].percent_count, 100);
        assert_eq!(ui.progress[0].title, "Delete files");
    }

    #[test]
    fn test_run_single_returns_result() {
        let mut ui = ScriptedUi::new();
        let item = WorkItem::Delete {
            path: PathBuf::from("x"),
        };
        let outcome = Runner::with_settings(&mut ui, settings())
            .run_single("Creating vfs", "x.zip", item, Box::new(|_, _| ItemResult::Done))
            .unwrap();
        assert_eq!(outcome, SingleOutcome::Done(ItemResult::Done));
        assert_eq!(ui.progress[0].counter, "");
        assert_eq!(ui.finished, 1);
    }

    #[test]
    fn test_run_single_can_be_stopped() {
        let mut ui = ScriptedUi::with_answers(vec![Answer::Confirm(ConfirmAnswer::Yes)])
            .cancel_on("x.zip");
        let item = WorkItem::Delete {
            path: PathBuf::from("x"),
        };
        let work: WorkFn = Box::new(|_, control| {
            while control.checkpoint().is_ok() {
                std::thread::sleep(Duration::from_millis(1));
            }
            ItemResult::failed("Stopped by user", 0)
        });
        let outcome = Runner::with_settings(&mut ui, settings())
            .run_single("Creating vfs", "x.zip", item, work)
            .unwrap();
        assert_eq!(outcome, SingleOutcome::Stopped);
    }
}
