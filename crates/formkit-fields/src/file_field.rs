//! File-backed form field
//!
//! Holds an ordered list of [`FileState`]s and drives each file through
//! `Pending -> InProgress -> Success | Failure`. Every change is a pure
//! transform of the current list, applied one at a time:
//!
//! 1. acquire serialization (background lock, or nothing in single-threaded mode)
//! 2. build the new list from the current snapshot (copy-on-write)
//! 3. publish the new snapshot
//! 4. revalidate, staying silent unless an error was already shown
//! 5. run the caller's after-update callback
//!
//! In [`MutationMode::Concurrent`] transforms are queued to a task owned by
//! the field and applied in FIFO order; callers never block. Disposing the
//! field (or dropping it) stops that task and drops queued transforms.

use arc_swap::ArcSwap;
use formkit_common::{FormkitConfig, FormkitError, FormkitResult, MutationMode};
use formkit_validators::{
    collect_invalid, Bounds, FileCountValidator, FileMeta, FileMimeTypeValidator, FileSizeValidator,
    FileState, FileStatus, SharedValidator, ValidationResult, Validator,
};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::field::{Field, ValidationState, ValueField};
use crate::live::LiveValue;

/// Immutable view of a field's files
pub type FileSnapshot<T> = Arc<Vec<FileState<T>>>;

type Transform<T> = Box<dyn FnOnce(&[FileState<T>]) -> Vec<FileState<T>> + Send>;
type AfterUpdate<T> = Box<dyn FnOnce(&[FileState<T>]) + Send>;

/// Validators for a file field
///
/// The count, size and mime slots are typed so the field can describe its
/// constraints to a UI; the lists take anything else.
pub struct FileValidators<T> {
    pub count: Option<FileCountValidator>,
    pub size: Option<FileSizeValidator>,
    pub mime_types: Option<FileMimeTypeValidator>,
    /// Over the derived URI list
    pub value: Vec<SharedValidator<Vec<String>>>,
    /// Applied to each file
    pub per_file: Vec<SharedValidator<T>>,
    /// Applied to all files together
    pub collection: Vec<SharedValidator<[T]>>,
    /// Applied to the state list
    pub state: Vec<SharedValidator<[FileState<T>]>>,
}

impl<T> Default for FileValidators<T> {
    fn default() -> Self {
        Self {
            count: None,
            size: None,
            mime_types: None,
            value: Vec::new(),
            per_file: Vec::new(),
            collection: Vec::new(),
            state: Vec::new(),
        }
    }
}

impl<T: FileMeta + Clone + Send + Sync> FileValidators<T> {
    /// Failures in pass order: value, per-file, collection, state
    fn failures(&self, states: &[FileState<T>], uris: &Vec<String>) -> Vec<ValidationResult> {
        let mut failures = collect_invalid(&self.value, Some(uris));

        for state in states {
            let file = &state.file;
            let slots = self
                .size
                .iter()
                .map(|v| v.validate(Some(file)))
                .chain(self.mime_types.iter().map(|v| v.validate(Some(file))));
            failures.extend(slots.filter(|r| !r.is_valid()));
            failures.extend(collect_invalid(&self.per_file, Some(file)));
        }

        let files: Vec<T> = states.iter().map(|s| s.file.clone()).collect();
        if let Some(count) = &self.count {
            let result = Validator::<[T]>::validate(count, Some(&files[..]));
            if !result.is_valid() {
                failures.push(result);
            }
        }
        failures.extend(collect_invalid(&self.collection, Some(&files[..])));
        failures.extend(collect_invalid(&self.state, Some(states)));
        failures
    }
}

/// URIs of the files that have one, in list order
fn uris_of<T: FileMeta>(states: &[FileState<T>]) -> Vec<String> {
    states
        .iter()
        .filter_map(|s| s.file.uri().map(str::to_string))
        .collect()
}

/// `states` with file `id` moved to `status`
pub fn with_status<T: FileMeta + Clone>(
    states: &[FileState<T>],
    id: &str,
    status: FileStatus,
) -> FormkitResult<Vec<FileState<T>>> {
    let index = states
        .iter()
        .position(|s| s.file.id() == id)
        .ok_or_else(|| FormkitError::UnknownFile(id.to_string()))?;

    let mut next = states.to_vec();
    next[index] = states[index].transition(status)?;
    Ok(next)
}

struct Shared<T> {
    name: String,
    state: ArcSwap<Vec<FileState<T>>>,
    states: LiveValue<FileSnapshot<T>>,
    live: LiveValue<Option<Vec<String>>>,
    validation: ValidationState,
    validators: FileValidators<T>,
    lock: Mutex<()>,
    disposed: AtomicBool,
    count_required: OnceCell<Option<Bounds<usize>>>,
    size_range: OnceCell<Option<Bounds<u64>>>,
    mime_types: OnceCell<Option<BTreeSet<String>>>,
}

impl<T: FileMeta + Clone + Send + Sync + 'static> Shared<T> {
    fn apply(&self, transform: Transform<T>, after: Option<AfterUpdate<T>>, locked: bool) {
        let next = {
            let _guard = locked.then(|| self.lock.lock());
            let previous = self.state.load_full();
            let next: FileSnapshot<T> = Arc::new(transform(&previous));
            debug!(field = %self.name, before = previous.len(), after = next.len(), "file state updated");

            self.state.store(Arc::clone(&next));
            self.states.publish(Arc::clone(&next));

            let silent = self.validation.error_message().is_none();
            self.validate(&next, silent);
            next
        };

        if let Some(after) = after {
            after(&next);
        }
    }

    fn validate(&self, states: &[FileState<T>], silent: bool) -> bool {
        let uris = uris_of(states);
        let failures = self.validators.failures(states, &uris);
        let valid = self.validation.record(&self.name, failures, silent);
        self.live.publish(Some(uris));
        valid
    }
}

enum Job<T> {
    Apply(Transform<T>, Option<AfterUpdate<T>>),
    Flush(oneshot::Sender<()>),
}

enum Serializer<T> {
    Inline,
    Background {
        tx: mpsc::UnboundedSender<Job<T>>,
        worker: Mutex<Option<JoinHandle<()>>>,
    },
}

async fn run_worker<T>(shared: Arc<Shared<T>>, mut rx: mpsc::UnboundedReceiver<Job<T>>)
where
    T: FileMeta + Clone + Send + Sync + 'static,
{
    while let Some(job) = rx.recv().await {
        if shared.disposed.load(Ordering::Acquire) {
            break;
        }
        match job {
            Job::Apply(transform, after) => {
                // a panicking transform leaves the state as it was; a panicking
                // callback runs after the new state is committed
                let applied = panic::catch_unwind(AssertUnwindSafe(|| shared.apply(transform, after, true)));
                if let Err(payload) = applied {
                    warn!(field = %shared.name, reason = panic_reason(payload.as_ref()), "file state update panicked");
                }
            }
            Job::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!(field = %shared.name, "file field worker stopped");
}

fn panic_reason(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown")
}

/// Builder for [`FileFormField`]
pub struct FileFormFieldBuilder<T> {
    name: String,
    mode: MutationMode,
    runtime: Option<Handle>,
    validators: FileValidators<T>,
    initial: Vec<FileState<T>>,
}

impl<T: FileMeta + Clone + Send + Sync + 'static> FileFormFieldBuilder<T> {
    pub fn mode(mut self, mode: MutationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Take the mutation mode from a config
    pub fn config(self, config: &FormkitConfig) -> Self {
        self.mode(config.mutation_mode)
    }

    /// Runtime for the background task. Defaults to the current one.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn count(mut self, validator: FileCountValidator) -> Self {
        self.validators.count = Some(validator);
        self
    }

    pub fn size(mut self, validator: FileSizeValidator) -> Self {
        self.validators.size = Some(validator);
        self
    }

    pub fn mime_types(mut self, validator: FileMimeTypeValidator) -> Self {
        self.validators.mime_types = Some(validator);
        self
    }

    /// Validator over the derived URI list
    pub fn validator(mut self, validator: impl Validator<Vec<String>> + 'static) -> Self {
        self.validators.value.push(Arc::new(validator));
        self
    }

    pub fn per_file(mut self, validator: impl Validator<T> + 'static) -> Self {
        self.validators.per_file.push(Arc::new(validator));
        self
    }

    pub fn collection(mut self, validator: impl Validator<[T]> + 'static) -> Self {
        self.validators.collection.push(Arc::new(validator));
        self
    }

    pub fn state(mut self, validator: impl Validator<[FileState<T>]> + 'static) -> Self {
        self.validators.state.push(Arc::new(validator));
        self
    }

    pub fn validators(mut self, validators: FileValidators<T>) -> Self {
        self.validators = validators;
        self
    }

    /// Files present from the start, in their given status
    pub fn initial(mut self, files: impl IntoIterator<Item = FileState<T>>) -> Self {
        self.initial = files.into_iter().collect();
        self
    }

    /// Concurrent mode needs a tokio runtime, either given or current
    pub fn build(self) -> FormkitResult<FileFormField<T>> {
        let initial: FileSnapshot<T> = Arc::new(self.initial);
        let shared = Arc::new(Shared {
            live: LiveValue::new(Some(uris_of(&initial))),
            state: ArcSwap::new(Arc::clone(&initial)),
            states: LiveValue::new(initial),
            name: self.name,
            validation: ValidationState::new(),
            validators: self.validators,
            lock: Mutex::new(()),
            disposed: AtomicBool::new(false),
            count_required: OnceCell::new(),
            size_range: OnceCell::new(),
            mime_types: OnceCell::new(),
        });

        let serializer = match self.mode {
            MutationMode::SingleThreaded => Serializer::Inline,
            MutationMode::Concurrent => {
                let handle = self
                    .runtime
                    .or_else(|| Handle::try_current().ok())
                    .ok_or_else(|| {
                        FormkitError::misconfigured(
                            "FileFormField",
                            "concurrent mode needs a tokio runtime",
                        )
                    })?;
                let (tx, rx) = mpsc::unbounded_channel();
                let worker = handle.spawn(run_worker(Arc::clone(&shared), rx));
                Serializer::Background {
                    tx,
                    worker: Mutex::new(Some(worker)),
                }
            }
        };

        debug!(field = %shared.name, mode = ?self.mode, "file field created");
        Ok(FileFormField {
            shared,
            serializer,
            mode: self.mode,
        })
    }
}

/// Form field backed by a list of files
///
/// Its value is the URI list derived from the current files and cannot be
/// set directly; use the file operations instead.
pub struct FileFormField<T: FileMeta + Clone + Send + Sync + 'static> {
    shared: Arc<Shared<T>>,
    serializer: Serializer<T>,
    mode: MutationMode,
}

impl<T: FileMeta + Clone + Send + Sync + 'static> FileFormField<T> {
    pub fn builder(name: impl Into<String>) -> FileFormFieldBuilder<T> {
        FileFormFieldBuilder {
            name: name.into(),
            mode: MutationMode::default(),
            runtime: None,
            validators: FileValidators::default(),
            initial: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn mode(&self) -> MutationMode {
        self.mode
    }

    /// Latest committed snapshot
    pub fn current_state(&self) -> FileSnapshot<T> {
        self.shared.state.load_full()
    }

    /// URIs of the current files, recomputed from the current state
    pub fn value(&self) -> Vec<String> {
        uris_of(&self.shared.state.load())
    }

    /// First file still waiting to be processed
    pub fn next_pending(&self) -> Option<T> {
        self.shared
            .state
            .load()
            .iter()
            .find(|s| s.status == FileStatus::Pending)
            .map(|s| s.file.clone())
    }

    /// Apply `transform` to the file list, then run `after` with the result
    ///
    /// In concurrent mode this only enqueues; the change shows up on the
    /// state stream once applied.
    pub fn update<F, A>(&self, transform: F, after: A) -> FormkitResult<()>
    where
        F: FnOnce(&[FileState<T>]) -> Vec<FileState<T>> + Send + 'static,
        A: FnOnce(&[FileState<T>]) + Send + 'static,
    {
        self.submit(Box::new(transform), Some(Box::new(after)))
    }

    /// [`update`](Self::update) without a callback
    pub fn mutate<F>(&self, transform: F) -> FormkitResult<()>
    where
        F: FnOnce(&[FileState<T>]) -> Vec<FileState<T>> + Send + 'static,
    {
        self.submit(Box::new(transform), None)
    }

    /// Append `file` as pending. A file whose id is already present is ignored.
    pub fn add_file(&self, file: T) -> FormkitResult<()> {
        self.add_files(vec![file])
    }

    pub fn add_files(&self, files: Vec<T>) -> FormkitResult<()> {
        let field = self.shared.name.clone();
        self.mutate(move |states| {
            let mut next = states.to_vec();
            for file in files {
                if next.iter().any(|s| s.file.id() == file.id()) {
                    debug!(%field, file = file.id(), "file already present");
                    continue;
                }
                next.push(FileState::pending(file));
            }
            next
        })
    }

    pub fn remove_file(&self, id: impl Into<String>) -> FormkitResult<()> {
        let id = id.into();
        let field = self.shared.name.clone();
        self.mutate(move |states| {
            let next: Vec<_> = states.iter().filter(|s| s.file.id() != id).cloned().collect();
            if next.len() == states.len() {
                warn!(%field, file = %id, "remove of unknown file ignored");
            }
            next
        })
    }

    /// Move a file to `status`. Unknown files and disallowed moves are
    /// logged and leave the list unchanged.
    pub fn set_status(&self, id: impl Into<String>, status: FileStatus) -> FormkitResult<()> {
        let id = id.into();
        let field = self.shared.name.clone();
        self.mutate(move |states| {
            with_status(states, &id, status).unwrap_or_else(|e| {
                warn!(%field, error = %e, "status change rejected");
                states.to_vec()
            })
        })
    }

    pub fn mark_in_progress(&self, id: impl Into<String>) -> FormkitResult<()> {
        self.set_status(id, FileStatus::InProgress)
    }

    pub fn mark_success(&self, id: impl Into<String>) -> FormkitResult<()> {
        self.set_status(id, FileStatus::Success)
    }

    pub fn mark_failure(&self, id: impl Into<String>, reason: impl Into<String>) -> FormkitResult<()> {
        self.set_status(id, FileStatus::Failure(reason.into()))
    }

    /// Send a failed file back to `Pending`
    pub fn retry_file(&self, id: impl Into<String>) -> FormkitResult<()> {
        self.set_status(id, FileStatus::Pending)
    }

    pub fn clear(&self) -> FormkitResult<()> {
        self.mutate(|_| Vec::new())
    }

    /// Run every validation pass against the current files
    pub fn do_validation(&self, silent: bool) -> bool {
        let _guard = matches!(self.mode, MutationMode::Concurrent).then(|| self.shared.lock.lock());
        let states = self.shared.state.load_full();
        self.shared.validate(&states, silent)
    }

    pub fn show_errors(&self) -> bool {
        self.do_validation(false)
    }

    pub fn error_message(&self) -> Option<String> {
        self.shared.validation.error_message()
    }

    pub fn is_valid(&self) -> bool {
        self.shared.validation.is_valid()
    }

    pub fn validation_results(&self) -> Vec<ValidationResult> {
        self.shared.validation.failures()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<FileSnapshot<T>> {
        self.shared.states.subscribe()
    }

    pub fn subscribe_value(&self) -> watch::Receiver<Option<Vec<String>>> {
        self.shared.live.subscribe()
    }

    pub fn subscribe_error(&self) -> watch::Receiver<Option<String>> {
        self.shared.validation.subscribe_error()
    }

    pub fn subscribe_validity(&self) -> watch::Receiver<bool> {
        self.shared.validation.subscribe_validity()
    }

    /// Required file count, from the count validator
    pub fn file_count_required(&self) -> Option<Bounds<usize>> {
        *self
            .shared
            .count_required
            .get_or_init(|| self.shared.validators.count.as_ref().map(FileCountValidator::bounds))
    }

    /// Allowed per-file size, from the size validator
    pub fn file_size(&self) -> Option<Bounds<u64>> {
        *self
            .shared
            .size_range
            .get_or_init(|| self.shared.validators.size.as_ref().map(FileSizeValidator::bounds))
    }

    /// Accepted mime types, from the mime validator
    pub fn acceptable_mime_types(&self) -> Option<&BTreeSet<String>> {
        self.shared
            .mime_types
            .get_or_init(|| {
                self.shared
                    .validators
                    .mime_types
                    .as_ref()
                    .map(|v| v.allowed().clone())
            })
            .as_ref()
    }

    /// Resolves once every mutation submitted before this call has been applied
    pub async fn settled(&self) -> FormkitResult<()> {
        match &self.serializer {
            Serializer::Inline => Ok(()),
            Serializer::Background { tx, .. } => {
                if self.is_disposed() {
                    return Err(self.disposed());
                }
                let (done_tx, done_rx) = oneshot::channel();
                tx.send(Job::Flush(done_tx)).map_err(|_| self.disposed())?;
                done_rx.await.map_err(|_| self.disposed())
            }
        }
    }

    /// Stop the background task. Queued mutations are dropped and later
    /// ones fail with [`FormkitError::Disposed`].
    pub fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Serializer::Background { worker, .. } = &self.serializer {
            if let Some(handle) = worker.lock().take() {
                handle.abort();
            }
        }
        debug!(field = %self.shared.name, "file field disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::Acquire)
    }

    fn submit(&self, transform: Transform<T>, after: Option<AfterUpdate<T>>) -> FormkitResult<()> {
        if self.is_disposed() {
            return Err(self.disposed());
        }
        match &self.serializer {
            Serializer::Inline => {
                self.shared.apply(transform, after, false);
                Ok(())
            }
            Serializer::Background { tx, .. } => tx
                .send(Job::Apply(transform, after))
                .map_err(|_| self.disposed()),
        }
    }

    fn disposed(&self) -> FormkitError {
        FormkitError::Disposed(self.shared.name.clone())
    }
}

impl<T: FileMeta + Clone + Send + Sync + 'static> Drop for FileFormField<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T: FileMeta + Clone + Send + Sync + 'static> ValueField for FileFormField<T> {
    type Value = Vec<String>;

    fn value(&self) -> Option<Vec<String>> {
        Some(FileFormField::value(self))
    }

    fn set_value(&self, _value: Option<Vec<String>>) -> FormkitResult<()> {
        Err(FormkitError::UnsupportedOperation(format!(
            "{}: file field value is derived from its files; use add_file/remove_file",
            self.shared.name
        )))
    }
}

impl<T: FileMeta + Clone + Send + Sync + 'static> Field for FileFormField<T> {
    fn name(&self) -> &str {
        &self.shared.name
    }

    fn do_validation(&self, silent: bool) -> bool {
        FileFormField::do_validation(self, silent)
    }

    fn is_valid(&self) -> bool {
        self.shared.validation.is_valid()
    }

    fn error_message(&self) -> Option<String> {
        self.shared.validation.error_message()
    }

    fn json_value(&self) -> serde_json::Value {
        serde_json::Value::from(FileFormField::value(self))
    }
}
