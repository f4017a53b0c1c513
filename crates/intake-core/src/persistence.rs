use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use super::error::PersistenceError;
use super::state::DemoHandoff;
use super::state::Persona;
use super::state::WizardData;
use super::state::WizardSession;
use super::state::WizardStep;
use super::state::PERSONA_FIELD;

pub const PERSISTED_WIZARD_VERSION: u8 = 1;

pub const PROGRESS_FILE: &str = "wizard-progress.json";
pub const HANDOFF_FILE: &str = "demo-handoff.json";

/// Durable wizard progress. Persona is not stored separately; it is one of
/// the collected fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedWizard {
    pub version: u8,
    pub current_step: u8,
    pub data: WizardData,
    #[serde(default)]
    pub saved_at_ms: i64,
}

impl PersistedWizard {
    pub fn empty() -> Self {
        Self {
            version: PERSISTED_WIZARD_VERSION,
            current_step: WizardStep::Persona.number(),
            data: BTreeMap::new(),
            saved_at_ms: 0,
        }
    }

    pub fn from_session(session: &WizardSession) -> Self {
        Self {
            version: PERSISTED_WIZARD_VERSION,
            current_step: session.current_step.number(),
            data: session.data.clone(),
            saved_at_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.current_step <= WizardStep::Persona.number()
    }

    pub fn saved_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        if self.saved_at_ms <= 0 {
            return None;
        }
        chrono::DateTime::from_timestamp_millis(self.saved_at_ms)
    }

    pub fn persona(&self) -> Option<Persona> {
        self.data
            .get(PERSONA_FIELD)
            .and_then(|value| value.as_scalar())
            .and_then(Persona::parse)
    }

    /// Step to resume at. Unknown numbers and steps past the persona step
    /// without a persona fall back to step 1.
    pub fn resume_step(&self) -> WizardStep {
        let step = WizardStep::from_number(self.current_step).unwrap_or(WizardStep::Persona);
        if step > WizardStep::Persona && self.persona().is_none() {
            return WizardStep::Persona;
        }
        // Results are never resumed: durable state is cleared on success.
        if step == WizardStep::Results {
            return WizardStep::AiSystemDetails;
        }
        step
    }
}

impl Default for PersistedWizard {
    fn default() -> Self {
        Self::empty()
    }
}

/// Durable progress plus the one-shot demo handoff.
///
/// `load` and `take_handoff` never fail: unreadable or malformed records are
/// logged, discarded and reported as absent.
pub trait WizardStore {
    fn save(&mut self, snapshot: &PersistedWizard) -> Result<(), PersistenceError>;
    fn load(&mut self) -> PersistedWizard;
    /// Removes durable progress and any pending handoff.
    fn clear(&mut self) -> Result<(), PersistenceError>;
    fn put_handoff(&mut self, handoff: &DemoHandoff) -> Result<(), PersistenceError>;
    /// Reads the handoff and deletes it in the same call.
    fn take_handoff(&mut self) -> Option<DemoHandoff>;
}

#[derive(Debug, Clone)]
pub struct FileWizardStore {
    progress_path: PathBuf,
    handoff_path: PathBuf,
}

impl FileWizardStore {
    pub fn open(
        state_dir: impl AsRef<Path>,
        session_dir: impl AsRef<Path>,
    ) -> Result<Self, PersistenceError> {
        let state_dir = state_dir.as_ref();
        let session_dir = session_dir.as_ref();
        std::fs::create_dir_all(state_dir)?;
        std::fs::create_dir_all(session_dir)?;
        Ok(Self {
            progress_path: state_dir.join(PROGRESS_FILE),
            handoff_path: session_dir.join(HANDOFF_FILE),
        })
    }

    pub fn progress_path(&self) -> &Path {
        &self.progress_path
    }

    pub fn handoff_path(&self) -> &Path {
        &self.handoff_path
    }
}

impl WizardStore for FileWizardStore {
    fn save(&mut self, snapshot: &PersistedWizard) -> Result<(), PersistenceError> {
        let encoded = serde_json::to_vec(snapshot).map_err(|err| PersistenceError::Serialize {
            record: "wizard progress",
            message: err.to_string(),
        })?;
        write_private(&self.progress_path, &encoded)?;
        tracing::debug!(
            step = snapshot.current_step,
            fields = snapshot.data.len(),
            "wizard progress saved"
        );
        Ok(())
    }

    fn load(&mut self) -> PersistedWizard {
        match read_record::<PersistedWizard>(&self.progress_path, "wizard progress") {
            Ok(Some(snapshot)) if snapshot.version == PERSISTED_WIZARD_VERSION => snapshot,
            Ok(Some(snapshot)) => {
                tracing::warn!(
                    version = snapshot.version,
                    "unsupported wizard progress version, starting fresh"
                );
                discard(&self.progress_path);
                PersistedWizard::empty()
            }
            Ok(None) => PersistedWizard::empty(),
            Err(err) => {
                tracing::warn!(error = %err, "wizard progress unreadable, starting fresh");
                discard(&self.progress_path);
                PersistedWizard::empty()
            }
        }
    }

    fn clear(&mut self) -> Result<(), PersistenceError> {
        remove_if_present(&self.progress_path)?;
        remove_if_present(&self.handoff_path)?;
        Ok(())
    }

    fn put_handoff(&mut self, handoff: &DemoHandoff) -> Result<(), PersistenceError> {
        let encoded = serde_json::to_vec(handoff).map_err(|err| PersistenceError::Serialize {
            record: "demo handoff",
            message: err.to_string(),
        })?;
        write_private(&self.handoff_path, &encoded)?;
        Ok(())
    }

    fn take_handoff(&mut self) -> Option<DemoHandoff> {
        let record = read_record::<DemoHandoff>(&self.handoff_path, "demo handoff");
        discard(&self.handoff_path);
        match record {
            Ok(handoff) => handoff,
            Err(err) => {
                tracing::warn!(error = %err, "demo handoff unreadable, ignoring");
                None
            }
        }
    }
}

/// In-process store used by tests and embedders without a filesystem.
#[derive(Debug, Clone, Default)]
pub struct MemoryWizardStore {
    pub progress: Option<String>,
    pub handoff: Option<String>,
    pub saves: usize,
}

impl MemoryWizardStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WizardStore for MemoryWizardStore {
    fn save(&mut self, snapshot: &PersistedWizard) -> Result<(), PersistenceError> {
        let encoded =
            serde_json::to_string(snapshot).map_err(|err| PersistenceError::Serialize {
                record: "wizard progress",
                message: err.to_string(),
            })?;
        self.progress = Some(encoded);
        self.saves += 1;
        Ok(())
    }

    fn load(&mut self) -> PersistedWizard {
        let Some(raw) = self.progress.as_deref() else {
            return PersistedWizard::empty();
        };
        match serde_json::from_str::<PersistedWizard>(raw) {
            Ok(snapshot) if snapshot.version == PERSISTED_WIZARD_VERSION => snapshot,
            Ok(_) | Err(_) => {
                tracing::warn!("wizard progress unreadable, starting fresh");
                self.progress = None;
                PersistedWizard::empty()
            }
        }
    }

    fn clear(&mut self) -> Result<(), PersistenceError> {
        self.progress = None;
        self.handoff = None;
        Ok(())
    }

    fn put_handoff(&mut self, handoff: &DemoHandoff) -> Result<(), PersistenceError> {
        let encoded = serde_json::to_string(handoff).map_err(|err| PersistenceError::Serialize {
            record: "demo handoff",
            message: err.to_string(),
        })?;
        self.handoff = Some(encoded);
        Ok(())
    }

    fn take_handoff(&mut self) -> Option<DemoHandoff> {
        let raw = self.handoff.take()?;
        match serde_json::from_str(&raw) {
            Ok(handoff) => Some(handoff),
            Err(err) => {
                tracing::warn!(error = %err, "demo handoff unreadable, ignoring");
                None
            }
        }
    }
}

fn read_record<T>(path: &Path, record: &'static str) -> Result<Option<T>, PersistenceError>
where
    T: for<'de> Deserialize<'de>,
{
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    serde_json::from_slice::<T>(&bytes)
        .map(Some)
        .map_err(|err| PersistenceError::malformed(record, err))
}

fn remove_if_present(path: &Path) -> Result<(), PersistenceError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn discard(path: &Path) {
    if let Err(err) = remove_if_present(path) {
        tracing::warn!(path = %path.display(), error = %err, "failed to discard record");
    }
}

fn write_private(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    let mut opts = OpenOptions::new();
    opts.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    let mut file = opts.open(path)?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(())
}
