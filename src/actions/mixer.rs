//! Per-application volume on the rotary knobs.
//!
//! The first six `app_volume` shortcuts of the active profile (by key) are
//! bound to the knobs in [`Knob::ALL`] order. Rotation deltas are summed per
//! knob for a short window and applied as one volume change.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::command::tokenize_command_line;
use crate::automation::{OsAutomation, run_script, scripts};
use crate::config::{ActionType, Configuration};
use crate::device::Knob;
use crate::error::{LdError, Result};
use crate::status::StatusLine;

/// Volume fraction per detent.
pub const STEP_PER_TICK: f64 = 0.03;

/// Largest change applied by one coalesced adjustment.
pub const MAX_STEP: f64 = 0.24;

/// How long deltas are collected before they are applied.
pub const COALESCE_DELAY: Duration = Duration::from_millis(80);

const VOLUME_TIMEOUT: Duration = Duration::from_millis(4500);

/// Reduce a command or path to the process-name token used for matching
/// audio sessions: first token, unquoted, basename, lowercased, without
/// extension.
pub fn normalize_mixer_target(value: &str) -> String {
    let raw = value.trim();
    if raw.is_empty() {
        return String::new();
    }
    let first = tokenize_command_line(raw)
        .into_iter()
        .next()
        .unwrap_or_else(|| raw.to_string());
    let unquoted = first.trim_matches('"').trim();
    let base = unquoted
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(unquoted)
        .to_lowercase();
    match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => base,
    }
}

/// A shortcut bound to a knob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixerAssignment {
    pub key: u8,
    pub label: String,
    pub target: String,
}

impl MixerAssignment {
    fn display_name(&self) -> &str {
        if self.label.is_empty() {
            &self.target
        } else {
            &self.label
        }
    }
}

/// Knob bindings for the active profile.
pub fn mixer_assignments(config: &Configuration) -> BTreeMap<Knob, MixerAssignment> {
    let mut items: Vec<MixerAssignment> = config
        .active_shortcuts()
        .iter()
        .filter(|s| s.action_type == ActionType::AppVolume)
        .map(|s| MixerAssignment {
            key: s.key,
            label: s.label.clone(),
            target: normalize_mixer_target(&s.value),
        })
        .filter(|a| !a.target.is_empty())
        .collect();
    items.sort_by_key(|a| a.key);
    Knob::ALL.into_iter().zip(items).collect()
}

/// Result of one volume change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VolumeReport {
    /// Audio sessions changed.
    #[serde(default)]
    pub sessions: u32,
    /// New volume in percent, when known.
    #[serde(default)]
    pub volume: Option<i32>,
}

/// Changes an application's volume.
#[async_trait]
pub trait VolumeControl: Send + Sync {
    /// Add `step` (fraction of full scale, may be negative) to the volume of
    /// every session matching `target`.
    async fn adjust(&self, target: &str, step: f64) -> Result<VolumeReport>;
}

/// [`VolumeControl`] through the Windows audio session API.
pub struct SessionVolume {
    automation: Arc<dyn OsAutomation>,
}

impl SessionVolume {
    pub fn new(automation: Arc<dyn OsAutomation>) -> Self {
        Self { automation }
    }
}

#[derive(Debug, Deserialize)]
struct ScriptReply {
    ok: bool,
    #[serde(default)]
    reason: Option<String>,
    #[serde(flatten)]
    report: VolumeReport,
}

#[async_trait]
impl VolumeControl for SessionVolume {
    async fn adjust(&self, target: &str, step: f64) -> Result<VolumeReport> {
        if !self.automation.supported() {
            return Err(LdError::Unsupported("Application volume"));
        }
        let token = normalize_mixer_target(target);
        if token.is_empty() {
            return Err(LdError::Automation("invalid mixer target".to_string()));
        }
        let step = step.clamp(-1.0, 1.0);
        if step == 0.0 {
            return Err(LdError::Automation("zero volume change".to_string()));
        }
        let args = ["-Target".to_string(), token, "-Step".to_string(), step.to_string()];
        let out = run_script(self.automation.as_ref(), scripts::VOLUME_ADJUST, &args, VOLUME_TIMEOUT)
            .await?;
        let reply: ScriptReply = serde_json::from_str(&out)
            .map_err(|_| LdError::Automation("invalid mixer response".to_string()))?;
        if reply.ok {
            Ok(reply.report)
        } else {
            Err(LdError::Automation(
                reply.reason.unwrap_or_else(|| "volume change failed".to_string()),
            ))
        }
    }
}

#[derive(Debug, Default)]
struct Pending {
    deltas: HashMap<Knob, i32>,
    timers: HashMap<Knob, JoinHandle<()>>,
}

/// Sums knob deltas and applies them once per [`COALESCE_DELAY`].
pub struct VolumeCoalescer {
    control: Arc<dyn VolumeControl>,
    status: Arc<StatusLine>,
    delay: Duration,
    pending: Arc<Mutex<Pending>>,
}

fn lock(pending: &Mutex<Pending>) -> MutexGuard<'_, Pending> {
    pending.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl VolumeCoalescer {
    pub fn new(control: Arc<dyn VolumeControl>, status: Arc<StatusLine>) -> Self {
        Self {
            control,
            status,
            delay: COALESCE_DELAY,
            pending: Arc::new(Mutex::new(Pending::default())),
        }
    }

    /// Add `delta` to `knob`'s pending total, starting its timer if idle.
    pub fn queue(&self, knob: Knob, assignment: MixerAssignment, delta: i32) {
        let mut pending = lock(&self.pending);
        let total = pending.deltas.entry(knob).or_insert(0);
        *total = total.saturating_add(delta);
        trace!(%knob, delta, total = pending.deltas[&knob], "Volume delta queued");
        if pending.timers.contains_key(&knob) {
            return;
        }

        let shared = Arc::clone(&self.pending);
        let control = Arc::clone(&self.control);
        let status = Arc::clone(&self.status);
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let total = {
                let mut pending = lock(&shared);
                pending.timers.remove(&knob);
                pending.deltas.remove(&knob).unwrap_or(0)
            };
            if total == 0 {
                return;
            }
            let step = (f64::from(total) * STEP_PER_TICK).clamp(-MAX_STEP, MAX_STEP);
            debug!(%knob, total, step, target = %assignment.target, "Applying volume change");
            match control.adjust(&assignment.target, step).await {
                Ok(report) => {
                    let volume = report.volume.map(|v| format!(" ({v}%)")).unwrap_or_default();
                    status.set(format!("[MIX] {}{volume}", assignment.display_name()));
                }
                Err(e) => status.set(format!("[MIX] {}: {e}", assignment.display_name())),
            }
        });
        pending.timers.insert(knob, handle);
    }

    /// Pending (not yet applied) delta for a knob.
    pub fn pending(&self, knob: Knob) -> i32 {
        lock(&self.pending).deltas.get(&knob).copied().unwrap_or(0)
    }

    /// Abort every timer and drop every pending delta.
    pub fn cancel_all(&self) {
        let mut pending = lock(&self.pending);
        for (_, handle) in pending.timers.drain() {
            handle.abort();
        }
        pending.deltas.clear();
        debug!("Pending volume changes cancelled");
    }
}
