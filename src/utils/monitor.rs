#[cfg(feature = "cli")]
use std::sync::Mutex;
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessesToUpdate, System};

#[derive(Debug, Clone)]
pub struct PhaseStats {
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
    pub peak_memory_mb: u64,
    pub elapsed_time: Duration,
}

/// 每個階段 (擷取、比對、輸出) 的資源使用紀錄
pub struct RunMonitor {
    #[cfg(feature = "cli")]
    system: Option<Mutex<(System, Pid, u64)>>,
    start_time: Instant,
}

impl RunMonitor {
    #[cfg(feature = "cli")]
    pub fn new(enabled: bool) -> Self {
        let system = if enabled {
            match sysinfo::get_current_pid() {
                Ok(pid) => {
                    let mut system = System::new();
                    system.refresh_memory();
                    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
                    Some(Mutex::new((system, pid, 0)))
                }
                Err(e) => {
                    tracing::warn!("⚠️ System monitoring unavailable: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self {
            system,
            start_time: Instant::now(),
        }
    }

    #[cfg(not(feature = "cli"))]
    pub fn new(_enabled: bool) -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    #[cfg(feature = "cli")]
    pub fn stats(&self) -> Option<PhaseStats> {
        let mut guard = self.system.as_ref()?.lock().ok()?;
        let (system, pid, peak) = &mut *guard;
        system.refresh_processes(ProcessesToUpdate::Some(&[*pid]), true);

        let process = system.process(*pid)?;
        let memory_mb = process.memory() / 1024 / 1024;
        *peak = (*peak).max(memory_mb);

        Some(PhaseStats {
            cpu_usage: process.cpu_usage(),
            memory_usage_mb: memory_mb,
            peak_memory_mb: *peak,
            elapsed_time: self.start_time.elapsed(),
        })
    }

    #[cfg(not(feature = "cli"))]
    pub fn stats(&self) -> Option<PhaseStats> {
        None
    }

    pub fn log_phase(&self, phase: &str) {
        if let Some(stats) = self.stats() {
            tracing::info!(
                "📊 {} - CPU: {:.1}%, Memory: {}MB, Peak: {}MB, Time: {:?}",
                phase,
                stats.cpu_usage,
                stats.memory_usage_mb,
                stats.peak_memory_mb,
                stats.elapsed_time
            );
        }
    }

    pub fn log_final(&self) {
        match self.stats() {
            Some(stats) => tracing::info!(
                "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB",
                stats.elapsed_time,
                stats.peak_memory_mb
            ),
            None => tracing::debug!("Run finished in {:?}", self.elapsed()),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn is_enabled(&self) -> bool {
        self.stats().is_some()
    }
}

impl Default for RunMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
