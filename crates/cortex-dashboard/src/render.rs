//! Renderer (C4): draws the two-tab dashboard straight onto the alternate
//! screen with `crossterm` queued commands. No intermediate widget tree —
//! the Renderer reads a snapshot of dashboard state and samplers each frame
//! and prints it, the same "poll and paint" shape the scheduler uses to
//! poll samplers.

use std::io::{self, Write};

use crossterm::cursor::MoveTo;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use crossterm::{queue, terminal};

use cortex_core::{OpState, Tab};

use crate::action_map::{ACTIVE_OPERATION_BINDINGS, CONFIRMATION_BINDINGS, HOME_IDLE_BINDINGS};
use crate::samplers::Samplers;
use crate::store::{DashboardState, Store};

const BAR_WIDTH: usize = 30;
const WARNING_PCT: f64 = 70.0;
const CRITICAL_PCT: f64 = 90.0;

/// §4.4 bar rendering rule: `⌊percent/100 × W⌋` filled cells, colored
/// green/yellow/red by the warning/critical thresholds.
fn render_bar(percent: f64, width: usize) -> (String, Color) {
    let clamped = percent.clamp(0.0, 100.0);
    let filled = ((clamped / 100.0) * width as f64).floor() as usize;
    let empty = width.saturating_sub(filled);
    let bar = format!("{}{}", "█".repeat(filled), "░".repeat(empty));
    let color = if clamped >= CRITICAL_PCT {
        Color::Red
    } else if clamped >= WARNING_PCT {
        Color::Yellow
    } else {
        Color::Green
    };
    (bar, color)
}

fn clip(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}…", s.chars().take(max).collect::<String>())
    } else {
        s.to_string()
    }
}

pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Self
    }

    /// Render one frame. Takes the state snapshot under the store's mutex
    /// just long enough to clone it, then paints without holding the lock.
    pub fn draw(&self, store: &Store, samplers: &Samplers) -> io::Result<()> {
        let state = store.with_state(|s| clone_for_render(s));
        let mut out = io::stdout();

        queue!(out, Clear(ClearType::All), MoveTo(0, 0))?;
        self.draw_header(&mut out, &state)?;
        match state.current_tab {
            Tab::Home => self.draw_home(&mut out, &state, samplers)?,
            Tab::Progress => self.draw_progress(&mut out, &state)?,
        }
        self.draw_footer(&mut out, &state)?;
        out.flush()
    }

    fn draw_header(&self, out: &mut impl Write, state: &RenderState) -> io::Result<()> {
        let (cols, _) = terminal::size().unwrap_or((80, 24));
        let home_marker = if state.current_tab == Tab::Home { "[Home]" } else { " Home " };
        let progress_marker = if state.current_tab == Tab::Progress { "[Progress]" } else { " Progress " };
        let clock = chrono::Local::now().format("%H:%M:%S").to_string();
        queue!(
            out,
            SetForegroundColor(Color::Cyan),
            Print(format!("cortex  {home_marker}  {progress_marker}    {clock}\n")),
            Print("-".repeat(cols as usize).to_string()),
            Print("\n"),
            ResetColor,
        )
    }

    fn draw_home(&self, out: &mut impl Write, state: &RenderState, samplers: &Samplers) -> io::Result<()> {
        let system = samplers.system.snapshot();
        let (cpu_bar, cpu_color) = render_bar(system.cpu_pct.into(), BAR_WIDTH);
        queue!(
            out,
            Print("CPU: "),
            SetForegroundColor(cpu_color),
            Print(format!("{cpu_bar} {:.1}%\n", system.cpu_pct)),
            ResetColor,
        )?;

        let ram_pct = if system.ram_total_mb == 0 {
            0.0
        } else {
            system.ram_used_mb as f64 / system.ram_total_mb as f64 * 100.0
        };
        let (ram_bar, ram_color) = render_bar(ram_pct, BAR_WIDTH);
        queue!(
            out,
            Print("RAM: "),
            SetForegroundColor(ram_color),
            Print(format!("{ram_bar} {} / {} MB\n", system.ram_used_mb, system.ram_total_mb)),
            ResetColor,
        )?;

        if let Some(gpu) = &system.gpu {
            let (gpu_bar, gpu_color) = render_bar(gpu.utilization_pct.into(), BAR_WIDTH);
            queue!(
                out,
                Print("GPU: "),
                SetForegroundColor(gpu_color),
                Print(format!("{gpu_bar} {:.1}%   VRAM: {} / {} MB\n", gpu.utilization_pct, gpu.vram_used_mb, gpu.vram_total_mb)),
                ResetColor,
            )?;
        }

        let models = samplers.models.snapshot();
        if models.server_unavailable {
            queue!(out, SetForegroundColor(Color::DarkGrey), Print("model server unavailable\n"), ResetColor)?;
        } else if !models.running.is_empty() {
            let running: Vec<&str> = models.running.iter().take(5).map(|m| m.name.as_str()).collect();
            queue!(out, Print(format!("Running models: {}\n", running.join(", "))))?;
        } else {
            let available: Vec<&str> = models.available.iter().take(3).map(|m| m.name.as_str()).collect();
            queue!(out, Print(format!("Available models: {}\n", available.join(", "))))?;
        }

        let processes = samplers.processes.snapshot();
        queue!(out, Print(format!("Relevant processes: {}\n", processes.len())))?;
        for p in processes.iter().take(8) {
            queue!(out, Print(format!("  {:>7}  {}\n", p.pid, clip(&p.name, 40))))?;
        }

        if !state.doctor_results.is_empty() {
            queue!(out, Print("\nLast report:\n"))?;
            for check in &state.doctor_results {
                let (color, glyph) = if check.passed { (Color::Green, "✓") } else { (Color::Red, "✗") };
                queue!(
                    out,
                    SetForegroundColor(color),
                    Print(format!("  {glyph} {} — {}\n", check.name, check.detail)),
                    ResetColor,
                )?;
            }
        }

        match state.op_state {
            OpState::WaitingInput => {
                queue!(out, Print(format!("\nPackage name: {}\n", state.input_buffer)))?;
                if let Some(msg) = &state.error_message {
                    queue!(out, SetForegroundColor(Color::Red), Print(format!("  {msg}\n")), ResetColor)?;
                }
            }
            OpState::WaitingConfirmation => {
                queue!(out, Print("\nPlan:\n"))?;
                for item in &state.items {
                    queue!(out, Print(format!("  {item}\n")))?;
                }
                queue!(out, Print("\nProceed? (y/n)\n"))?;
            }
            OpState::WaitingPassword => {
                let masked = "*".repeat(state.input_buffer.chars().count());
                queue!(out, Print(format!("\nsudo password: {masked}\n")))?;
            }
            _ => {}
        }

        Ok(())
    }

    fn draw_progress(&self, out: &mut impl Write, state: &RenderState) -> io::Result<()> {
        queue!(out, Print(format!("{}\n", state.operation_label)))?;
        queue!(
            out,
            Print(format!(
                "Step {}/{}: {}\n",
                state.current_step, state.total_steps, state.step_description
            ))
        )?;
        queue!(
            out,
            Print(format!(
                "Elapsed: {:.0}s   ETA: {:.0}s\n",
                state.elapsed_secs, state.eta_secs
            ))
        )?;

        if let Some(msg) = &state.success_message {
            queue!(out, SetForegroundColor(Color::Green), Print(format!("\n{msg}\n")), ResetColor)?;
        }
        if let Some(msg) = &state.error_message {
            queue!(out, SetForegroundColor(Color::Red), Print(format!("\n{msg}\n")), ResetColor)?;
        }
        Ok(())
    }

    fn draw_footer(&self, out: &mut impl Write, state: &RenderState) -> io::Result<()> {
        let bindings = if state.op_state == OpState::WaitingConfirmation {
            CONFIRMATION_BINDINGS
        } else if state.op_state.is_active() {
            ACTIVE_OPERATION_BINDINGS
        } else {
            HOME_IDLE_BINDINGS
        };
        let legend = bindings
            .iter()
            .map(|b| format!("{}: {}", b.key, b.description))
            .collect::<Vec<_>>()
            .join("   ");
        let (_, rows) = terminal::size().unwrap_or((80, 24));
        queue!(out, MoveTo(0, rows.saturating_sub(1)), SetForegroundColor(Color::DarkGrey), Print(legend), ResetColor)
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the renderer needs, cloned out from under the store mutex in
/// one critical section.
struct RenderState {
    current_tab: Tab,
    op_state: OpState,
    operation_label: String,
    current_step: u32,
    total_steps: u32,
    step_description: String,
    items: Vec<String>,
    error_message: Option<String>,
    success_message: Option<String>,
    elapsed_secs: f64,
    eta_secs: f64,
    input_buffer: String,
    doctor_results: Vec<cortex_core::CheckResult>,
}

fn clone_for_render(s: &DashboardState) -> RenderState {
    RenderState {
        current_tab: s.current_tab,
        op_state: s.progress.state,
        operation_label: s.progress.operation_label.clone(),
        current_step: s.progress.current_step,
        total_steps: s.progress.total_steps,
        step_description: s.progress.step_description.clone(),
        items: s.progress.items.clone(),
        error_message: s.progress.error_message.clone(),
        success_message: s.progress.success_message.clone(),
        elapsed_secs: s.progress.elapsed_secs,
        eta_secs: s.progress.eta_secs,
        input_buffer: s.input_buffer.clone(),
        doctor_results: s.doctor_results.clone(),
    }
}
