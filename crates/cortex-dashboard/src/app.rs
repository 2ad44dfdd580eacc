//! Wires the Input Reader, Renderer, Sampler Scheduler, and Operation Engine
//! into the interactive dashboard's main loop.

use std::sync::Arc;
use std::time::Duration;

use cortex_audit::{AuditSink, JsonlAuditSink};
use cortex_core::{OpState, Tab};
use cortex_executor::ShellExecutor;
use tracing::info;

use crate::action_map::Action;
use crate::engine::Engine;
use crate::input::{InputReader, RawModeGuard};
use crate::planner::InterpreterPlanner;
use crate::render::Renderer;
use crate::samplers::Samplers;
use crate::scheduler::Scheduler;
use crate::store::Store;

const FRAME_INTERVAL: Duration = Duration::from_millis(100);

/// Exit code the process should return once the dashboard loop ends, per the
/// CLI contract: 0 for a clean quit, 130 for Ctrl-C/SIGINT.
pub struct AppOutcome {
    pub exit_code: i32,
}

pub async fn run(interpreter_path: String) -> anyhow::Result<AppOutcome> {
    let store = Arc::new(Store::new());
    let model_base_url = crate::config::resolve_model_base_url();
    let samplers = Arc::new(Samplers::new(model_base_url));
    samplers.enable_all();

    let audit_path = crate::config::history_db_path()
        .unwrap_or_else(|| std::path::PathBuf::from(".cortex/history.db"));
    let audit: Arc<dyn AuditSink> = Arc::new(JsonlAuditSink::new(audit_path));
    let planner = Arc::new(InterpreterPlanner::new(interpreter_path));
    let executor = Arc::new(ShellExecutor::new());
    let engine = Arc::new(Engine::new(store.clone(), planner, executor, audit));

    let scheduler = Scheduler::spawn(store.clone(), samplers.clone());

    let _raw_mode = RawModeGuard::enter()?;
    let renderer = Renderer::new();

    let store_for_gate = store.clone();
    let (input, mut actions) = InputReader::spawn(move || {
        store_for_gate.with_state(|s| !s.progress.state.is_active())
    });

    let mut exit_code = 0;

    loop {
        renderer.draw(&store, &samplers)?;

        tokio::select! {
            action = actions.recv() => {
                let Some(action) = action else {
                    break;
                };
                match dispatch(action, &store, &engine, &samplers).await {
                    ControlFlow::Continue => {}
                    ControlFlow::Quit(code) => {
                        exit_code = code;
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                // §5: Ctrl-C restores terminal attributes (via `RawModeGuard`'s
                // `Drop`, below) and exits cleanly with 130, regardless of
                // whatever operation was in flight.
                exit_code = 130;
                break;
            }
            _ = tokio::time::sleep(FRAME_INTERVAL) => continue,
        }
    }

    input.stop();
    scheduler.stop();
    renderer.draw(&store, &samplers)?;
    info!(exit_code, "dashboard loop exited");
    Ok(AppOutcome { exit_code })
}

enum ControlFlow {
    Continue,
    Quit(i32),
}

async fn dispatch(
    action: Action,
    store: &Arc<Store>,
    engine: &Arc<Engine>,
    samplers: &Arc<Samplers>,
) -> ControlFlow {
    let op_state = store.with_state(|s| s.progress.state);

    match action {
        Action::Quit if !op_state.is_active() => return ControlFlow::Quit(0),
        Action::ToggleTab => {
            store.with_state(|s| s.current_tab = s.current_tab.toggled());
        }
        Action::BeginInstall if !op_state.is_active() => {
            engine.begin_install();
        }
        Action::BeginBench if !op_state.is_active() => {
            engine.begin_bench(samplers.clone());
        }
        Action::BeginDoctor if !op_state.is_active() => {
            engine.begin_doctor(samplers.clone());
        }
        Action::TypeChar(c) => engine.append_input(c),
        Action::Backspace => engine.backspace_input(),
        Action::Submit => match op_state {
            OpState::WaitingInput => engine.submit_install_input().await,
            OpState::WaitingPassword => engine.submit_password(),
            _ => {}
        },
        Action::Confirm if op_state == OpState::WaitingConfirmation => {
            engine.confirm_install(true).await;
        }
        Action::Deny if op_state == OpState::WaitingConfirmation => {
            engine.confirm_install(false).await;
        }
        Action::Cancel => {
            if op_state == OpState::WaitingConfirmation {
                engine.confirm_install(false).await;
            } else if op_state.is_active() {
                engine.cancel().await;
            } else if store.with_state(|s| s.current_tab) == Tab::Home {
                return ControlFlow::Quit(0);
            }
        }
        _ => {}
    }

    ControlFlow::Continue
}
