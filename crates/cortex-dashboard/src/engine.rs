//! Operation Engine (C6): drives the shared state machine for Install,
//! Bench, and Doctor (§4.6). Install alone has the two-phase plan/confirm/
//! execute protocol and elevation capture.
//!
//! The engine depends on three capability sets — planner, executor, audit
//! sink — as trait objects, never concrete types, so tests substitute fakes
//! and the renderer never touches them (§9).

use std::sync::Arc;
use std::time::Duration;

use cortex_audit::AuditSink;
use cortex_core::{AuditAction, AuditOutcome, AuditRecord, CheckResult, OpState, Operation};
use sysinfo::{Disks, System};

use crate::planner::{is_valid_package_name, Planner};
use crate::store::{Store, MAX_INPUT_LEN};
use cortex_executor::{needs_elevation, SandboxExecutor};

const ELEVATION_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const ELEVATION_POLL_INTERVAL: Duration = Duration::from_millis(100);
const STEP_DELAY: Duration = Duration::from_millis(150);

pub struct Engine {
    store: Arc<Store>,
    planner: Arc<dyn Planner>,
    executor: Arc<dyn SandboxExecutor>,
    audit: Arc<dyn AuditSink>,
}

impl Engine {
    pub fn new(
        store: Arc<Store>,
        planner: Arc<dyn Planner>,
        executor: Arc<dyn SandboxExecutor>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            planner,
            executor,
            audit,
        }
    }

    async fn audit(&self, action: AuditAction, target: impl Into<String>, outcome: AuditOutcome) {
        self.audit
            .record(AuditRecord::new(action, target, outcome))
            .await;
    }

    /// Marks the operation FAILED but leaves `pending_commands` untouched —
    /// callers clear it with `clear_pending` only after the matching audit
    /// record is durably written, so a crash between the two leaves a
    /// correct audit trail (§9 Open Question).
    fn fail(&self, message: impl Into<String>) {
        self.store.with_state(|s| {
            s.progress.state = OpState::Failed;
            s.progress.error_message = Some(cortex_core::text::clean_message(&message.into()));
        });
    }

    fn complete(&self, message: impl Into<String>) {
        self.store.with_state(|s| {
            s.progress.state = OpState::Completed;
            s.progress.success_message = Some(message.into());
        });
    }

    fn clear_pending(&self) {
        self.store.with_state(|s| s.pending_commands.clear());
    }

    // ---- Install, phase A --------------------------------------------

    /// `1` pressed on an idle dashboard: open the package-name prompt.
    pub fn begin_install(&self) -> bool {
        self.store.try_start(Operation::Install, 0, OpState::WaitingInput)
    }

    pub fn append_input(&self, ch: char) {
        self.store.with_state(|s| {
            if s.progress.state == OpState::WaitingInput || s.progress.state == OpState::WaitingPassword {
                if s.input_buffer.chars().count() < MAX_INPUT_LEN {
                    s.input_buffer.push(ch);
                }
            }
        });
    }

    pub fn backspace_input(&self) {
        self.store.with_state(|s| {
            if s.progress.state == OpState::WaitingInput || s.progress.state == OpState::WaitingPassword {
                s.input_buffer.pop();
            }
        });
    }

    /// Enter pressed while `WAITING_INPUT`: validate the package name and
    /// either stay put with an error, or move to `PROCESSING` and spawn the
    /// plan worker (§4.6 phase A).
    pub async fn submit_install_input(self: &Arc<Self>) {
        let raw = self
            .store
            .with_state(|s| std::mem::take(&mut s.input_buffer));

        if !is_valid_package_name(&raw) {
            self.store.with_state(|s| {
                s.progress.state = OpState::WaitingInput;
                s.progress.error_message = Some("Invalid package name format".to_string());
                s.input_buffer.clear();
            });
            return;
        }

        self.store.with_state(|s| {
            s.progress.state = OpState::Processing;
            s.current_target = raw.clone();
        });
        self.audit(AuditAction::Install, raw.clone(), AuditOutcome::Started).await;

        let engine = self.clone();
        tokio::spawn(async move { engine.run_plan_phase(raw).await });
    }

    async fn run_plan_phase(self: Arc<Self>, package: String) {
        if !crate::config::has_llm_credentials() {
            self.fail(cortex_core::AppError::MissingCredentials.to_string());
            self.audit(AuditAction::Install, package, AuditOutcome::Failed).await;
            return;
        }

        match self.planner.plan(&package).await {
            Ok(plan) => {
                let n = plan.commands.len();
                self.store.with_state(|s| {
                    s.pending_commands = plan.commands;
                    s.progress.items = vec![
                        format!("Package: {package}"),
                        format!("Commands: {n}"),
                    ];
                    s.progress.state = OpState::WaitingConfirmation;
                });
            }
            Err(err) => {
                self.fail(err.to_string());
                self.audit(AuditAction::Install, package, AuditOutcome::Failed).await;
            }
        }
    }

    // ---- Install, phase B ---------------------------------------------

    /// `y`/`n`/Esc pressed while `WAITING_CONFIRMATION`.
    pub async fn confirm_install(self: &Arc<Self>, confirmed: bool) {
        let package = self.store.with_state(|s| s.current_target.clone());

        if !confirmed {
            self.store.with_state(|s| {
                s.progress.state = OpState::Failed;
                s.progress.error_message = Some("cancelled by user".to_string());
            });
            self.audit(AuditAction::InstallConfirmed, package, AuditOutcome::Cancelled)
                .await;
            self.clear_pending();
            return;
        }

        self.audit(AuditAction::InstallConfirmed, package.clone(), AuditOutcome::Started)
            .await;

        let needs_secret = self.store.with_state(|s| {
            s.pending_commands.iter().any(|c| needs_elevation(c)) && s.cached_elevation_secret.is_none()
        });

        self.store.with_state(|s| {
            s.progress.state = if needs_secret {
                OpState::WaitingPassword
            } else {
                OpState::Processing
            };
        });

        let engine = self.clone();
        tokio::spawn(async move { engine.run_execute_phase(package, needs_secret).await });
    }

    /// Enter pressed while `WAITING_PASSWORD`: stash the secret for the
    /// waiting execute worker to pick up (§4.5 routing rule 3).
    pub fn submit_password(&self) {
        self.store.with_state(|s| {
            let secret = std::mem::take(&mut s.input_buffer);
            s.cached_elevation_secret = Some(secret);
        });
    }

    async fn wait_for_elevation_secret(&self) -> Result<String, &'static str> {
        let deadline = tokio::time::Instant::now() + ELEVATION_TIMEOUT;
        loop {
            if self.store.is_cancelled() {
                return Err("cancelled");
            }
            if let Some(secret) = self.store.with_state(|s| s.cached_elevation_secret.clone()) {
                return Ok(secret);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err("timeout");
            }
            tokio::time::sleep(ELEVATION_POLL_INTERVAL).await;
        }
    }

    async fn run_execute_phase(self: Arc<Self>, package: String, needs_secret: bool) {
        if needs_secret {
            match self.wait_for_elevation_secret().await {
                Ok(_) => {}
                // The synchronous Cancel primitive already performed the
                // FAILED transition and audit write; the worker just stops.
                Err("cancelled") => return,
                Err(_) => {
                    self.fail(cortex_core::AppError::ElevationTimeout.to_string());
                    self.audit(AuditAction::InstallExecute, package, AuditOutcome::Failed)
                        .await;
                    self.clear_pending();
                    return;
                }
            }
        }

        self.store.with_state(|s| s.progress.state = OpState::InProgress);

        let commands = self.store.with_state(|s| s.pending_commands.clone());
        let total = commands.len() as u32;
        self.store.with_state(|s| s.progress.total_steps = total);

        let secret = self.store.with_state(|s| s.cached_elevation_secret.clone());

        for (idx, command) in commands.iter().enumerate() {
            if self.store.is_cancelled() {
                return;
            }

            let step_label = format!("[{}/{}] {}", idx + 1, total, clip(command, 60));
            self.store.with_state(|s| {
                s.progress.current_step = idx as u32;
                s.progress.step_description = step_label.clone();
            });

            let stdin = needs_elevation(command).then(|| secret.clone().unwrap_or_default());
            let result = self.executor.execute(command, stdin.as_deref()).await;

            match result {
                Ok(exec_result) if exec_result.success => {
                    let preview = exec_result.stdout.lines().last().unwrap_or("").trim();
                    self.store.with_state(|s| {
                        s.progress.current_step = idx as u32 + 1;
                        s.progress.step_description = format!("{step_label} — {}", clip(preview, 40));
                    });
                }
                Ok(_) => {
                    self.fail(format!("✗ [{}/{}] Failed", idx + 1, total));
                    self.audit(AuditAction::InstallExecute, package, AuditOutcome::Failed)
                        .await;
                    self.clear_pending();
                    return;
                }
                Err(err) => {
                    self.fail(err.to_string());
                    self.audit(AuditAction::InstallExecute, package, AuditOutcome::Failed)
                        .await;
                    self.clear_pending();
                    return;
                }
            }
        }

        self.complete(format!("{package} installed successfully"));
        self.audit(AuditAction::InstallExecute, package, AuditOutcome::Succeeded)
            .await;
        self.clear_pending();
    }

    // ---- Bench / Doctor -------------------------------------------------

    pub fn begin_bench(self: &Arc<Self>, samplers: Arc<crate::samplers::Samplers>) -> bool {
        let steps: Vec<&str> = vec!["CPU", "Memory", "Disk", "System Info"];
        let started = self.store.try_start(Operation::Bench, steps.len() as u32, OpState::Processing);
        if !started {
            return false;
        }
        self.store.with_state(|s| {
            s.current_target = Operation::Bench.label().to_string();
            s.bench_running = true;
        });
        samplers.enable_all();
        samplers.enable_gpu();

        let engine = self.clone();
        tokio::spawn(async move { engine.run_bench().await });
        true
    }

    async fn run_bench(self: Arc<Self>) {
        self.audit(AuditAction::Bench, Operation::Bench.label(), AuditOutcome::Started)
            .await;

        let steps: Vec<(&str, fn() -> CheckResult)> = vec![
            ("CPU", bench_cpu),
            ("Memory", bench_memory),
            ("Disk", bench_disk),
            ("System Info", bench_system_info),
        ];

        let mut results = Vec::new();
        for (idx, (name, step)) in steps.iter().enumerate() {
            if self.store.is_cancelled() {
                return;
            }
            self.store.with_state(|s| {
                s.progress.current_step = idx as u32;
                s.progress.step_description = format!("Running: {name}");
            });
            tokio::time::sleep(STEP_DELAY).await;
            results.push(step());
        }

        let all_passed = results.iter().all(|r| r.passed);
        self.store.with_state(|s| {
            s.doctor_results = results;
            s.progress.current_step = s.progress.total_steps;
            s.bench_running = false;
        });

        if all_passed {
            self.complete("Benchmark complete");
            self.audit(AuditAction::Bench, Operation::Bench.label(), AuditOutcome::Succeeded)
                .await;
        } else {
            self.fail("Benchmark reported failures");
            self.audit(AuditAction::Bench, Operation::Bench.label(), AuditOutcome::Failed)
                .await;
        }
    }

    pub fn begin_doctor(self: &Arc<Self>, samplers: Arc<crate::samplers::Samplers>) -> bool {
        let steps = doctor_step_names();
        let started = self.store.try_start(Operation::Doctor, steps.len() as u32, OpState::Processing);
        if !started {
            return false;
        }
        self.store.with_state(|s| {
            s.current_target = Operation::Doctor.label().to_string();
            s.doctor_running = true;
        });
        samplers.enable_all();

        let engine = self.clone();
        tokio::spawn(async move { engine.run_doctor().await });
        true
    }

    async fn run_doctor(self: Arc<Self>) {
        self.audit(AuditAction::Doctor, Operation::Doctor.label(), AuditOutcome::Started)
            .await;

        let steps: Vec<(&str, fn() -> CheckResult)> = vec![
            ("Language runtime", doctor_runtime),
            ("Helper libraries", doctor_helper_libs),
            ("Disk usage", doctor_disk_usage),
            ("Memory usage", doctor_memory_usage),
            ("CPU load", doctor_cpu_load),
        ];

        let mut results = Vec::new();
        for (idx, (name, step)) in steps.iter().enumerate() {
            if self.store.is_cancelled() {
                return;
            }
            self.store.with_state(|s| {
                s.progress.current_step = idx as u32;
                s.progress.step_description = format!("Checking: {name}");
            });
            tokio::time::sleep(STEP_DELAY).await;
            results.push(step());
        }

        let all_passed = results.iter().all(|r| r.passed);
        self.store.with_state(|s| {
            s.doctor_results = results;
            s.progress.current_step = s.progress.total_steps;
            s.doctor_running = false;
        });

        if all_passed {
            self.complete("All checks passed");
            self.audit(AuditAction::Doctor, Operation::Doctor.label(), AuditOutcome::Succeeded)
                .await;
        } else {
            self.fail("One or more checks failed");
            self.audit(AuditAction::Doctor, Operation::Doctor.label(), AuditOutcome::Failed)
                .await;
        }
    }

    fn doctor_step_names_for_debug(&self) -> Vec<&'static str> {
        doctor_step_names()
    }

    // ---- Cancel ----------------------------------------------------------

    /// The single cancel primitive (§4.6 Cancel). Marks FAILED, clears
    /// transient buffers, lowers running flags, and records the audit entry
    /// *after* the state mutation so a crash between success and clear still
    /// leaves a correct audit trail (§9 Open Question).
    pub async fn cancel(&self) {
        let target = self.store.with_state(|s| {
            if !s.progress.state.is_active() {
                return None;
            }
            s.progress.state = OpState::Failed;
            s.progress.error_message = Some("cancelled by user".to_string());
            s.input_buffer.clear();
            s.doctor_running = false;
            s.bench_running = false;
            Some(s.current_target.clone())
        });
        self.store.cancel();

        if let Some(target) = target {
            self.audit(AuditAction::Cancel, target, AuditOutcome::Cancelled).await;
            self.clear_pending();
        }
    }
}

fn clip(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}…", s.chars().take(max).collect::<String>())
    } else {
        s.to_string()
    }
}

fn doctor_step_names() -> Vec<&'static str> {
    vec![
        "Language runtime",
        "Helper libraries",
        "Disk usage",
        "Memory usage",
        "CPU load",
    ]
}

fn doctor_runtime() -> CheckResult {
    let found = which_exists("sh");
    if found {
        CheckResult::ok("Language runtime", "/bin/sh available")
    } else {
        CheckResult::fail("Language runtime", "no POSIX shell found on PATH")
    }
}

fn doctor_helper_libs() -> CheckResult {
    let tools = ["curl", "tar"];
    let missing: Vec<&str> = tools.iter().copied().filter(|t| !which_exists(t)).collect();
    if missing.is_empty() {
        CheckResult::ok("Helper libraries", "curl, tar present")
    } else {
        CheckResult::fail("Helper libraries", format!("missing: {}", missing.join(", ")))
    }
}

fn doctor_disk_usage() -> CheckResult {
    let disks = Disks::new_with_refreshed_list();
    let Some(root) = disks.list().iter().find(|d| d.mount_point().as_os_str() == "/") else {
        return CheckResult::ok("Disk usage", "no root filesystem reported");
    };
    let total = root.total_space();
    let available = root.available_space();
    let used_pct = if total == 0 {
        0.0
    } else {
        (1.0 - available as f64 / total as f64) * 100.0
    };
    if used_pct < 90.0 {
        CheckResult::ok("Disk usage", format!("{used_pct:.1}% used"))
    } else {
        CheckResult::fail("Disk usage", format!("{used_pct:.1}% used (threshold 90%)"))
    }
}

fn doctor_memory_usage() -> CheckResult {
    let mut sys = System::new();
    sys.refresh_memory();
    let total = sys.total_memory();
    let used = sys.used_memory();
    let used_pct = if total == 0 {
        0.0
    } else {
        used as f64 / total as f64 * 100.0
    };
    if used_pct < 95.0 {
        CheckResult::ok("Memory usage", format!("{used_pct:.1}% used"))
    } else {
        CheckResult::fail("Memory usage", format!("{used_pct:.1}% used (threshold 95%)"))
    }
}

fn doctor_cpu_load() -> CheckResult {
    let mut sys = System::new();
    sys.refresh_cpu_usage();
    std::thread::sleep(Duration::from_millis(150));
    sys.refresh_cpu_usage();
    let load = sys.global_cpu_usage();
    if load < 90.0 {
        CheckResult::ok("CPU load", format!("{load:.1}%"))
    } else {
        CheckResult::fail("CPU load", format!("{load:.1}% (threshold 90%)"))
    }
}

fn bench_cpu() -> CheckResult {
    let sys = System::new_all();
    let cores = sys.cpus().len();
    let freq = sys.cpus().first().map(|c| c.frequency()).unwrap_or(0);
    let load = sys.global_cpu_usage();
    CheckResult::ok("CPU", format!("{cores} cores @ {freq} MHz, load {load:.1}%"))
}

fn bench_memory() -> CheckResult {
    let mut sys = System::new();
    sys.refresh_memory();
    CheckResult::ok(
        "Memory",
        format!(
            "{} / {} MB used",
            sys.used_memory() / 1024 / 1024,
            sys.total_memory() / 1024 / 1024
        ),
    )
}

fn bench_disk() -> CheckResult {
    let disks = Disks::new_with_refreshed_list();
    let total: u64 = disks.list().iter().map(|d| d.total_space()).sum();
    let available: u64 = disks.list().iter().map(|d| d.available_space()).sum();
    CheckResult::ok(
        "Disk",
        format!(
            "{} / {} GB free",
            available / 1024 / 1024 / 1024,
            total / 1024 / 1024 / 1024
        ),
    )
}

fn bench_system_info() -> CheckResult {
    let os = System::long_os_version().unwrap_or_else(|| "unknown".to_string());
    CheckResult::ok("System Info", os)
}

fn which_exists(exe: &str) -> bool {
    std::process::Command::new("which")
        .arg(exe)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_audit::testing::FakeAuditSink;
    use cortex_executor::ExecutionResult;
    use std::sync::Mutex as StdMutex;

    struct FakePlanner {
        response: StdMutex<Option<anyhow::Result<crate::planner::Plan>>>,
    }

    #[async_trait::async_trait]
    impl Planner for FakePlanner {
        async fn plan(&self, _package: &str) -> anyhow::Result<crate::planner::Plan> {
            self.response
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok(crate::planner::Plan { commands: vec![] }))
        }
    }

    struct FakeExecutor {
        fail_on: Option<String>,
    }

    #[async_trait::async_trait]
    impl SandboxExecutor for FakeExecutor {
        async fn execute(&self, command: &str, _stdin: Option<&str>) -> anyhow::Result<ExecutionResult> {
            let success = self.fail_on.as_deref() != Some(command);
            Ok(ExecutionResult {
                success,
                stdout: "done".to_string(),
            })
        }
    }

    fn make_engine(
        plan: anyhow::Result<crate::planner::Plan>,
        fail_on: Option<String>,
    ) -> (Arc<Engine>, Arc<Store>, Arc<FakeAuditSink>) {
        let store = Arc::new(Store::new());
        let audit = Arc::new(FakeAuditSink::new());
        let planner = Arc::new(FakePlanner {
            response: StdMutex::new(Some(plan)),
        });
        let executor = Arc::new(FakeExecutor { fail_on });
        let engine = Arc::new(Engine::new(store.clone(), planner, executor, audit.clone()));
        (engine, store, audit)
    }

    #[tokio::test]
    async fn invalid_package_name_stays_in_waiting_input() {
        std::env::set_var("ANTHROPIC_API_KEY", "sk-test");
        let (engine, store, _audit) =
            make_engine(Ok(crate::planner::Plan { commands: vec![] }), None);
        engine.begin_install();
        store.with_state(|s| s.input_buffer = "bad name!".to_string());
        engine.submit_install_input().await;
        store.with_state(|s| {
            assert_eq!(s.progress.state, OpState::WaitingInput);
            assert_eq!(s.progress.error_message.as_deref(), Some("Invalid package name format"));
            assert!(s.input_buffer.is_empty());
        });
    }

    #[tokio::test]
    async fn happy_install_round_trip() {
        std::env::set_var("ANTHROPIC_API_KEY", "sk-test");
        let commands = vec![
            "sudo apt-get update".to_string(),
            "sudo apt-get install -y nginx".to_string(),
        ];
        let (engine, store, audit) = make_engine(
            Ok(crate::planner::Plan {
                commands: commands.clone(),
            }),
            None,
        );
        engine.begin_install();
        store.with_state(|s| s.input_buffer = "nginx".to_string());
        engine.submit_install_input().await;

        for _ in 0..50 {
            if store.with_state(|s| s.progress.state) == OpState::WaitingConfirmation {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        store.with_state(|s| assert_eq!(s.pending_commands.len(), 2));

        engine.confirm_install(true).await;
        // Needs elevation: expect WaitingPassword, then supply the secret.
        for _ in 0..50 {
            if store.with_state(|s| s.progress.state) == OpState::WaitingPassword {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        store.with_state(|s| s.input_buffer = "hunter2".to_string());
        engine.submit_password();

        for _ in 0..100 {
            if store.with_state(|s| s.progress.state).is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        store.with_state(|s| {
            assert_eq!(s.progress.state, OpState::Completed);
            assert!(s.progress.success_message.as_deref().unwrap().contains("nginx"));
            assert!(s.pending_commands.is_empty());
        });

        let records = audit.records();
        assert!(records.iter().any(|r| r.action == AuditAction::Install && r.outcome == AuditOutcome::Started));
        assert!(records
            .iter()
            .any(|r| r.action == AuditAction::InstallConfirmed && r.outcome == AuditOutcome::Started));
        assert!(records
            .iter()
            .any(|r| r.action == AuditAction::InstallExecute && r.outcome == AuditOutcome::Succeeded));
    }

    #[tokio::test]
    async fn planner_failure_clears_pending_commands() {
        std::env::set_var("ANTHROPIC_API_KEY", "sk-test");
        let (engine, store, _audit) = make_engine(Err(anyhow::anyhow!("doesn't look valid")), None);
        engine.begin_install();
        store.with_state(|s| s.input_buffer = "mystery".to_string());
        engine.submit_install_input().await;

        for _ in 0..50 {
            if store.with_state(|s| s.progress.state).is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        store.with_state(|s| {
            assert_eq!(s.progress.state, OpState::Failed);
            assert!(s.pending_commands.is_empty());
            let msg = s.progress.error_message.clone().unwrap();
            assert!(msg.len() <= 80);
        });
    }

    #[tokio::test]
    async fn starting_an_operation_while_active_is_a_no_op() {
        let (engine, store, _audit) = make_engine(Ok(crate::planner::Plan { commands: vec![] }), None);
        assert!(engine.begin_install());
        assert!(!engine.begin_install());
        store.with_state(|s| assert_eq!(s.progress.operation, Some(Operation::Install)));
    }

    #[tokio::test]
    async fn cancel_during_execute_stops_before_remaining_commands() {
        let commands = vec!["curl a".to_string(), "curl b".to_string(), "curl c".to_string()];
        let (engine, store, audit) = make_engine(
            Ok(crate::planner::Plan {
                commands: commands.clone(),
            }),
            None,
        );
        std::env::set_var("ANTHROPIC_API_KEY", "sk-test");
        engine.begin_install();
        store.with_state(|s| s.input_buffer = "curl".to_string());
        engine.submit_install_input().await;
        for _ in 0..50 {
            if store.with_state(|s| s.progress.state) == OpState::WaitingConfirmation {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        engine.confirm_install(true).await;
        // No elevation needed: goes straight to InProgress.
        for _ in 0..50 {
            if store.with_state(|s| s.progress.current_step) >= 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        engine.cancel().await;
        for _ in 0..50 {
            if store.with_state(|s| s.progress.state).is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        store.with_state(|s| {
            assert_eq!(s.progress.state, OpState::Failed);
            assert!(s.progress.current_step < 3);
        });
        let records = audit.records();
        assert!(records
            .iter()
            .any(|r| r.action == AuditAction::Cancel && r.outcome == AuditOutcome::Cancelled));
    }

    #[test]
    fn doctor_step_count_matches_step_names() {
        let (engine, _store, _audit) = make_engine(Ok(crate::planner::Plan { commands: vec![] }), None);
        assert_eq!(engine.doctor_step_names_for_debug().len(), 5);
    }
}
