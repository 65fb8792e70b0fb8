//! In-memory platform and artifact builders shared by the scenario tests.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dropcheck_common::error::{DropcheckError, Result};
use dropcheck_common::types::ResourceName;
use dropcheck_platform::backend::{AppManifest, PlatformBackend};

/// Launch command the stock configuration expects, with irregular spacing.
pub const INSTRUMENTED_START: &str = "./node_modules/.bin/slnodejs run   --useinitialcolor true --token token1 --buildsessionid bs1 ./dist/server.js";

/// Observable state of the fake platform.
#[derive(Default)]
pub struct State {
    pub records: BTreeSet<String>,
    pub apps: BTreeSet<String>,
    pub bindings: BTreeSet<(String, String)>,
    pub calls: Vec<String>,
    pub fail_on: BTreeSet<&'static str>,
    pub panic_on: Option<&'static str>,
    pub trip_on: Option<(&'static str, Arc<AtomicBool>)>,
    pub artifact: Vec<u8>,
    pub logs: String,
    pub last_manifest: Option<AppManifest>,
    pub last_payload: Option<serde_json::Value>,
}

/// Platform that keeps records, apps, and bindings in memory.
///
/// Behaves like the real one where cleanup ordering matters: a bound
/// record cannot be deleted, deleting an app drops its bindings, and a
/// failed push leaves the app behind.
#[derive(Clone, Default)]
pub struct FakePlatform {
    state: Arc<Mutex<State>>,
}

impl FakePlatform {
    /// A platform that serves `artifact` on fetch.
    pub fn serving(artifact: Vec<u8>) -> Self {
        let fake = Self::default();
        fake.state().artifact = artifact;
        fake
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn fail_on(&self, op: &'static str) -> &Self {
        let _ = self.state().fail_on.insert(op);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Operation names in call order, without targets.
    pub fn ops(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| c.split_whitespace().next().unwrap_or_default().to_owned())
            .collect()
    }

    /// Whether nothing provisioned is left on the platform.
    pub fn is_clean(&self) -> bool {
        let state = self.state();
        state.records.is_empty() && state.apps.is_empty() && state.bindings.is_empty()
    }

    fn begin(&self, op: &'static str, target: &str) -> MutexGuard<'_, State> {
        let mut state = self.state();
        state.calls.push(format!("{op} {target}"));
        if let Some((trip, flag)) = &state.trip_on {
            if *trip == op {
                flag.store(true, Ordering::SeqCst);
            }
        }
        if state.panic_on == Some(op) {
            drop(state);
            panic!("injected panic in {op}");
        }
        state
    }
}

fn failure(op: &'static str, message: &str) -> DropcheckError {
    DropcheckError::Platform {
        operation: op,
        message: message.to_owned(),
    }
}

fn check(state: &State, op: &'static str) -> Result<()> {
    if state.fail_on.contains(op) {
        return Err(failure(op, "injected failure"));
    }
    Ok(())
}

impl PlatformBackend for FakePlatform {
    fn create_credential_record(
        &self,
        name: &ResourceName,
        payload: &serde_json::Value,
    ) -> Result<()> {
        let mut state = self.begin("create-service", name.as_str());
        check(&state, "create-service")?;
        if !state.records.insert(name.to_string()) {
            return Err(failure("create-service", "name already taken"));
        }
        state.last_payload = Some(payload.clone());
        Ok(())
    }

    fn delete_credential_record(&self, name: &ResourceName) -> Result<()> {
        let mut state = self.begin("delete-service", name.as_str());
        check(&state, "delete-service")?;
        if state.bindings.iter().any(|(_, r)| r == name.as_str()) {
            return Err(failure("delete-service", "service is still bound"));
        }
        if !state.records.remove(name.as_str()) {
            return Err(failure("delete-service", "service not found"));
        }
        Ok(())
    }

    fn push_app(&self, manifest: &AppManifest) -> Result<()> {
        let mut state = self.begin("push", manifest.name.as_str());
        let _ = state.apps.insert(manifest.name.to_string());
        state.last_manifest = Some(manifest.clone());
        check(&state, "push")
    }

    fn bind(&self, app: &ResourceName, record: &ResourceName) -> Result<()> {
        let mut state = self.begin("bind", app.as_str());
        check(&state, "bind")?;
        if !state.apps.contains(app.as_str()) || !state.records.contains(record.as_str()) {
            return Err(failure("bind", "app or service not found"));
        }
        let _ = state.bindings.insert((app.to_string(), record.to_string()));
        Ok(())
    }

    fn unbind(&self, app: &ResourceName, record: &ResourceName) -> Result<()> {
        let mut state = self.begin("unbind", app.as_str());
        check(&state, "unbind")?;
        if !state.bindings.remove(&(app.to_string(), record.to_string())) {
            return Err(failure("unbind", "binding not found"));
        }
        Ok(())
    }

    fn restart(&self, app: &ResourceName) -> Result<()> {
        let state = self.begin("restart", app.as_str());
        check(&state, "restart")?;
        if !state.apps.contains(app.as_str()) {
            return Err(failure("restart", "app not found"));
        }
        Ok(())
    }

    fn delete_app(&self, app: &ResourceName) -> Result<()> {
        let mut state = self.begin("delete-app", app.as_str());
        check(&state, "delete-app")?;
        if !state.apps.remove(app.as_str()) {
            return Err(failure("delete-app", "app not found"));
        }
        state.bindings.retain(|(a, _)| a != app.as_str());
        Ok(())
    }

    fn fetch_artifact(&self, app: &ResourceName, dest: &Path) -> Result<()> {
        let state = self.begin("fetch", app.as_str());
        check(&state, "fetch")?;
        std::fs::write(dest, &state.artifact).map_err(|e| DropcheckError::Io {
            path: dest.to_path_buf(),
            source: e,
        })
    }

    fn recent_logs(&self, app: &ResourceName) -> Result<String> {
        let state = self.begin("logs", app.as_str());
        Ok(state.logs.clone())
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Gzip-compressed tar stream whose header names are stored verbatim,
/// including a leading `./`.
pub fn droplet(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, body) in entries {
        let mut header = tar::Header::new_old();
        header.as_old_mut().name[..name.len()].copy_from_slice(name.as_bytes());
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        builder.append(&header, *body).expect("append");
    }
    builder.into_inner().expect("finish tar").finish().expect("finish gzip")
}

/// A built Node.js droplet whose `package.json` starts with `start`.
pub fn node_droplet(start: &str) -> Vec<u8> {
    let package = serde_json::json!({
        "name": "with_sealights",
        "scripts": { "start": start },
    })
    .to_string();
    droplet(&[
        ("./app/dist/server.js", b"require('http').createServer().listen(8080)"),
        ("./app/package.json", package.as_bytes()),
        ("./staging_info.yml", b"detected_buildpack: nodejs"),
    ])
}
