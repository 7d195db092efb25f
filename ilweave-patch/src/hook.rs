//! Hook registration and the install/restore lifecycle.
//!
//! The patcher captures each hooked method's original body exactly once,
//! derives the installed body from that snapshot plus the ordered list of
//! currently active edits, and restores the snapshot on unload. Deriving
//! from the snapshot (instead of mutating whatever is installed) is what
//! lets several independent hooks on one target compose and un-compose
//! predictably.

use std::collections::BTreeMap;

use ilweave_il::Body;

use crate::cursor::Cursor;
use crate::error::{Error, Result};

/// Opaque identifier for a patchable method, meaningful only to the host's
/// [`MethodTargets`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetId(String);

impl TargetId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TargetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TargetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The host collaborator that owns method bodies. The patcher never assumes
/// how targets are resolved; it only fetches and replaces bodies through
/// this interface.
pub trait MethodTargets: Send {
    /// Fetch the target's currently active body.
    fn fetch_body(&self, target: &TargetId) -> Result<Body>;

    /// Replace the target's active body.
    fn install_body(&mut self, target: &TargetId, body: Body) -> Result<()>;
}

/// An in-memory method table, for tests and the dry-run CLI.
#[derive(Debug, Default)]
pub struct MemoryTargets {
    methods: BTreeMap<TargetId, Body>,
}

impl MemoryTargets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, target: impl Into<TargetId>, body: Body) {
        self.methods.insert(target.into(), body);
    }

    /// The currently installed body, if the target exists.
    pub fn body(&self, target: &TargetId) -> Option<&Body> {
        self.methods.get(target)
    }
}

impl MethodTargets for MemoryTargets {
    fn fetch_body(&self, target: &TargetId) -> Result<Body> {
        self.methods
            .get(target)
            .cloned()
            .ok_or_else(|| Error::TargetNotFound(target.to_string()))
    }

    fn install_body(&mut self, target: &TargetId, body: Body) -> Result<()> {
        match self.methods.get_mut(target) {
            Some(slot) => {
                *slot = body;
                Ok(())
            }
            None => Err(Error::TargetNotFound(target.to_string())),
        }
    }
}

/// An edit function: runs once per (re)composition against a cursor over a
/// working copy of the target's body.
pub type EditFn = Box<dyn Fn(&mut Cursor<'_>) -> Result<()> + Send + Sync>;

/// Identifies one registered hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(usize);

struct HookRecord {
    id: HookId,
    target: TargetId,
    edit: EditFn,
    active: bool,
}

/// Lifecycle of the patcher as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unloaded,
    Loading,
    Loaded,
    Unloading,
}

/// Per-hook outcome of a [`Patcher::load`].
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Hooks whose edit applied cleanly.
    pub applied: Vec<HookId>,
    /// Hooks skipped, with the reason. A skipped hook leaves its target's
    /// body exactly as the other edits produced it.
    pub skipped: Vec<(HookId, Error)>,
}

impl LoadReport {
    pub fn all_applied(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn is_applied(&self, id: HookId) -> bool {
        self.applied.contains(&id)
    }
}

/// Per-target outcome of a [`Patcher::unload`].
#[derive(Debug, Default)]
pub struct UnloadReport {
    pub restored: Vec<TargetId>,
    pub failed: Vec<(TargetId, Error)>,
}

/// Tracks registered hooks, applies them on [`load`](Patcher::load), and
/// restores original bodies on [`unload`](Patcher::unload).
///
/// The patcher exclusively owns the original-body snapshots; nothing else
/// may replace a hooked target's body while its records exist. `load` and
/// `unload` run on the host's single init/teardown thread, so no locking
/// happens here.
pub struct Patcher {
    targets: Box<dyn MethodTargets>,
    hooks: Vec<HookRecord>,
    originals: BTreeMap<TargetId, Body>,
    next_id: usize,
    state: LifecycleState,
}

impl Patcher {
    pub fn new(targets: Box<dyn MethodTargets>) -> Self {
        Self {
            targets,
            hooks: Vec::new(),
            originals: BTreeMap::new(),
            next_id: 0,
            state: LifecycleState::Unloaded,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// The host collaborator, e.g. to fetch a target's currently installed
    /// body.
    pub fn targets(&self) -> &dyn MethodTargets {
        self.targets.as_ref()
    }

    /// Whether the hook is currently installed.
    pub fn is_active(&self, id: HookId) -> bool {
        self.hooks.iter().any(|h| h.id == id && h.active)
    }

    /// Register an edit against a target. Registration while loaded takes
    /// effect immediately; otherwise the edit applies at the next `load`.
    pub fn hook(
        &mut self,
        target: impl Into<TargetId>,
        edit: impl Fn(&mut Cursor<'_>) -> Result<()> + Send + Sync + 'static,
    ) -> HookId {
        let id = HookId(self.next_id);
        self.next_id += 1;
        let target = target.into();
        self.hooks.push(HookRecord {
            id,
            target: target.clone(),
            edit: Box::new(edit),
            active: false,
        });

        if self.state == LifecycleState::Loaded {
            if self.ensure_snapshot(&target) {
                if let Some(record) = self.hooks.last_mut() {
                    record.active = true;
                }
                let _ = self.recompose(&target);
            } else {
                log::warn!("hook {id:?}: target {target} not found; hook left inactive");
            }
        }
        id
    }

    /// Capture originals, run every registered edit against a working copy
    /// of its target's snapshot, and install the results.
    ///
    /// Failures are per-hook: a missed pattern or unavailable operand skips
    /// that one edit; a missing target deactivates that one hook. Neither
    /// ever aborts the load of independent hooks.
    pub fn load(&mut self) -> LoadReport {
        let mut report = LoadReport::default();
        if self.state == LifecycleState::Loaded {
            log::debug!("load: already loaded");
            return report;
        }
        self.state = LifecycleState::Loading;

        for i in 0..self.hooks.len() {
            let target = self.hooks[i].target.clone();
            if self.ensure_snapshot(&target) {
                self.hooks[i].active = true;
            } else {
                self.hooks[i].active = false;
                report
                    .skipped
                    .push((self.hooks[i].id, Error::TargetNotFound(target.to_string())));
            }
        }

        // Recompose each distinct target once, in first-registration order.
        let mut seen: Vec<TargetId> = Vec::new();
        for i in 0..self.hooks.len() {
            let target = self.hooks[i].target.clone();
            if seen.contains(&target) || !self.originals.contains_key(&target) {
                continue;
            }
            seen.push(target.clone());
            for (id, result) in self.recompose(&target) {
                match result {
                    Ok(()) => report.applied.push(id),
                    Err(e) => report.skipped.push((id, e)),
                }
            }
        }

        self.state = LifecycleState::Loaded;
        report
    }

    /// Deactivate and remove one hook, recomposing its target from the
    /// snapshot plus the remaining active edits.
    pub fn unhook(&mut self, id: HookId) -> bool {
        let Some(pos) = self.hooks.iter().position(|h| h.id == id) else {
            return false;
        };
        let record = self.hooks.remove(pos);
        if self.state == LifecycleState::Loaded && record.active {
            let _ = self.recompose(&record.target);
        }
        true
    }

    /// Restore every captured original body and deactivate all hooks.
    ///
    /// Calling `unload` when nothing is loaded is a guarded no-op, so a
    /// double unload (or an unload racing a never-completed load) never
    /// errors. Snapshots are retained so `load` can run again.
    pub fn unload(&mut self) -> UnloadReport {
        let mut report = UnloadReport::default();
        if self.state != LifecycleState::Loaded {
            log::debug!("unload: nothing installed");
            return report;
        }
        self.state = LifecycleState::Unloading;

        let targets: Vec<TargetId> = self.originals.keys().cloned().collect();
        for target in targets {
            let original = self.originals[&target].clone();
            match self.targets.install_body(&target, original) {
                Ok(()) => report.restored.push(target),
                Err(e) => {
                    log::warn!("failed to restore {target}: {e}");
                    report.failed.push((target, e));
                }
            }
        }

        for record in &mut self.hooks {
            record.active = false;
        }
        self.state = LifecycleState::Unloaded;
        report
    }

    /// Capture `target`'s body as the original snapshot, once. Capturing
    /// twice would record an already-patched body and corrupt restoration.
    fn ensure_snapshot(&mut self, target: &TargetId) -> bool {
        if self.originals.contains_key(target) {
            return true;
        }
        match self.targets.fetch_body(target) {
            Ok(body) => {
                self.originals.insert(target.clone(), body);
                true
            }
            Err(e) => {
                log::warn!("cannot capture original body of {target}: {e}");
                false
            }
        }
    }

    /// Re-derive and install `target`'s body from its snapshot plus all
    /// active edits, in registration order. Each edit runs against a trial
    /// copy and is committed only if it succeeds, so a failing edit leaves
    /// no partial splice behind.
    fn recompose(&mut self, target: &TargetId) -> Vec<(HookId, Result<()>)> {
        let mut outcomes = Vec::new();
        let Some(original) = self.originals.get(target) else {
            return outcomes;
        };
        let mut composed = original.clone();

        for record in self.hooks.iter().filter(|r| r.active && &r.target == target) {
            let mut trial = composed.clone();
            let result = {
                let mut cursor = Cursor::new(&mut trial);
                (record.edit)(&mut cursor)
            };
            match result {
                Ok(()) => {
                    composed = trial;
                    outcomes.push((record.id, Ok(())));
                }
                Err(e) => {
                    log::warn!("hook {:?} on {target}: edit skipped: {e}", record.id);
                    outcomes.push((record.id, Err(e)));
                }
            }
        }

        if let Err(e) = self.targets.install_body(target, composed) {
            log::warn!("failed to install patched body for {target}: {e}");
            let msg = e.to_string();
            return outcomes
                .into_iter()
                .map(|(id, _)| (id, Err(Error::TargetNotFound(msg.clone()))))
                .collect();
        }
        outcomes
    }
}

impl Drop for Patcher {
    fn drop(&mut self) {
        // Same guarantee as an explicit dispose: originals are restored at
        // most once.
        let _ = self.unload();
    }
}
