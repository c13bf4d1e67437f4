use crate::core::errors::{UploadError, WorkflowError};
use crate::core::ports::{FaceComparer, MediaSource, ObjectStore};
use crate::models::{
    ComparisonOutcome, ComparisonResult, ImageSource, LocalImageHandle, Notification, PermissionStatus,
    PickerOptions, PickerResult, Slot, SlotView, StatusMessage, StoredObjectRef, WorkflowPhase,
    WorkflowStateResponse, IMAGE_CONTENT_TYPE,
};
use crate::services::MediaError;
use std::collections::VecDeque;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Per-slot bookkeeping
#[derive(Debug, Default)]
struct SlotState {
    handle: Option<LocalImageHandle>,
    /// Bumped on every successful acquisition
    generation: u64,
    acquisitions_in_flight: u32,
    uploads_in_flight: u32,
    /// Set only once the current handle has been uploaded
    stored: Option<StoredObjectRef>,
}

#[derive(Debug, Default)]
struct WorkflowState {
    selfie: SlotState,
    gallery: SlotState,
    compares_in_flight: u32,
    result: ComparisonResult,
    notifications: VecDeque<Notification>,
}

impl WorkflowState {
    fn slot(&self, slot: Slot) -> &SlotState {
        match slot {
            Slot::Selfie => &self.selfie,
            Slot::Gallery => &self.gallery,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut SlotState {
        match slot {
            Slot::Selfie => &mut self.selfie,
            Slot::Gallery => &mut self.gallery,
        }
    }

    fn generations(&self) -> (u64, u64) {
        (self.selfie.generation, self.gallery.generation)
    }

    fn phase(&self) -> WorkflowPhase {
        if self.compares_in_flight > 0 {
            return WorkflowPhase::Comparing;
        }
        if let Some(slot) = Slot::ALL.into_iter().find(|s| self.slot(*s).uploads_in_flight > 0) {
            return WorkflowPhase::Uploading(slot);
        }
        if let Some(slot) = Slot::ALL.into_iter().find(|s| self.slot(*s).acquisitions_in_flight > 0) {
            return WorkflowPhase::Acquiring(slot);
        }
        match self.result {
            ComparisonResult::Unknown => WorkflowPhase::Idle,
            ComparisonResult::Match => WorkflowPhase::Matched,
            ComparisonResult::NoMatch => WorkflowPhase::NotMatched,
        }
    }

    /// Status follows the phase, so it is gone as soon as a step completes
    fn status(&self) -> Option<StatusMessage> {
        match self.phase() {
            WorkflowPhase::Uploading(slot) => Some(StatusMessage::uploading(&slot.key())),
            WorkflowPhase::Comparing => Some(StatusMessage::comparing()),
            _ => None,
        }
    }

    fn slot_view(&self, slot: Slot) -> SlotView {
        let state = self.slot(slot);
        SlotView {
            slot,
            handle: state.handle.clone(),
            uploaded: state.stored.is_some(),
            uploading: state.uploads_in_flight > 0,
        }
    }
}

/// The upload-and-compare workflow
///
/// Sequences picker → upload → compare against the injected store and
/// comparison service. State lives behind a single async mutex that is
/// released before every network call, so the two slots can upload
/// concurrently without blocking each other.
pub struct FaceCompareWorkflow<S, C> {
    store: S,
    comparer: C,
    similarity_threshold: f32,
    picker_options: PickerOptions,
    state: Mutex<WorkflowState>,
}

impl<S, C> FaceCompareWorkflow<S, C>
where
    S: ObjectStore,
    C: FaceComparer,
{
    pub fn new(store: S, comparer: C, similarity_threshold: f32) -> Self {
        Self {
            store,
            comparer,
            similarity_threshold,
            picker_options: PickerOptions::default(),
            state: Mutex::new(WorkflowState::default()),
        }
    }

    pub fn similarity_threshold(&self) -> f32 {
        self.similarity_threshold
    }

    /// Capture a selfie from the camera and upload it
    pub async fn take_selfie<M>(&self, media: &M) -> Result<StoredObjectRef, WorkflowError>
    where
        M: MediaSource + ?Sized,
    {
        self.acquire(Slot::Selfie, media).await
    }

    /// Pick a gallery image from the library and upload it
    pub async fn pick_image<M>(&self, media: &M) -> Result<StoredObjectRef, WorkflowError>
    where
        M: MediaSource + ?Sized,
    {
        self.acquire(Slot::Gallery, media).await
    }

    /// Acquire an image for `slot` and upload it under the slot's key
    ///
    /// A cancelled picker leaves every piece of state untouched. A
    /// successful pick replaces the slot's handle and clears any previous
    /// comparison result before the upload starts.
    pub async fn acquire<M>(&self, slot: Slot, media: &M) -> Result<StoredObjectRef, WorkflowError>
    where
        M: MediaSource + ?Sized,
    {
        let op = Uuid::new_v4();
        info!("[{}] Acquiring {} image", op, slot);

        if media.request_permission().await == PermissionStatus::Denied {
            return Err(self
                .fail(WorkflowError::PermissionDenied(format!("{} source unavailable", slot)))
                .await);
        }

        self.state.lock().await.slot_mut(slot).acquisitions_in_flight += 1;
        let picked = match slot.source() {
            ImageSource::Camera => media.capture_from_camera(&self.picker_options).await,
            ImageSource::Library => media.pick_from_library(&self.picker_options).await,
        };
        {
            let mut state = self.state.lock().await;
            let slot_state = state.slot_mut(slot);
            slot_state.acquisitions_in_flight = slot_state.acquisitions_in_flight.saturating_sub(1);
        }

        let result = match picked {
            Ok(result) => result,
            Err(MediaError::PermissionDenied(reason)) => {
                return Err(self.fail(WorkflowError::PermissionDenied(reason)).await);
            }
            Err(source) => {
                return Err(self.fail(WorkflowError::AcquisitionFailed { slot, source }).await);
            }
        };
        let handle = match Self::handle_from(slot, result) {
            Ok(handle) => handle,
            Err(err) => return Err(self.fail(err).await),
        };

        debug!("[{}] {} image URI: {}", op, slot, handle);

        {
            let mut state = self.state.lock().await;
            let slot_state = state.slot_mut(slot);
            slot_state.handle = Some(handle);
            slot_state.generation += 1;
            slot_state.stored = None;
            state.result = ComparisonResult::Unknown;
        }

        self.upload(slot, media).await
    }

    /// Pull the first asset's URI out of a picker result
    fn handle_from(slot: Slot, result: PickerResult) -> Result<LocalImageHandle, WorkflowError> {
        if result.canceled {
            return Err(WorkflowError::Cancelled(slot));
        }

        result
            .assets
            .into_iter()
            .next()
            .and_then(|asset| asset.uri)
            .map(|uri| uri.trim().to_string())
            .filter(|uri| !uri.is_empty())
            .map(LocalImageHandle::new)
            .ok_or(WorkflowError::EmptyAcquisition(slot))
    }

    /// Upload the slot's current handle under the slot's fixed key
    ///
    /// Overwrites whatever object is stored at that key. There is no retry;
    /// a failure clears the comparison result and is handed back to the
    /// caller. If the handle was replaced while the upload ran, the outcome
    /// is returned but leaves state and notifications alone.
    pub async fn upload<M>(&self, slot: Slot, media: &M) -> Result<StoredObjectRef, WorkflowError>
    where
        M: MediaSource + ?Sized,
    {
        let key = slot.key();
        let claimed = {
            let mut state = self.state.lock().await;
            let slot_state = state.slot_mut(slot);
            slot_state.handle.clone().map(|handle| {
                slot_state.uploads_in_flight += 1;
                (handle, slot_state.generation)
            })
        };
        let Some((handle, generation)) = claimed else {
            return Err(self.fail(WorkflowError::EmptyAcquisition(slot)).await);
        };

        info!("Uploading {} to object store...", key);

        let outcome = match media.load(&handle).await {
            Ok(bytes) => {
                debug!("Loaded {} bytes from {}", bytes.len(), handle);
                self.store
                    .put(&key, bytes, IMAGE_CONTENT_TYPE)
                    .await
                    .map_err(|e| WorkflowError::UploadFailed { key: key.clone(), source: UploadError::Store(e) })
            }
            Err(MediaError::PermissionDenied(reason)) => Err(WorkflowError::PermissionDenied(reason)),
            Err(e) => Err(WorkflowError::UploadFailed { key: key.clone(), source: UploadError::Load(e) }),
        };

        let mut state = self.state.lock().await;
        let current_generation = {
            let slot_state = state.slot_mut(slot);
            slot_state.uploads_in_flight = slot_state.uploads_in_flight.saturating_sub(1);
            slot_state.generation
        };

        if current_generation != generation {
            match &outcome {
                Ok(_) => warn!("Upload of {} finished for a replaced {} image; not recording it", key, slot),
                Err(err) => warn!("Upload of a replaced {} image failed; ignoring: {}", slot, err),
            }
            return outcome;
        }

        match outcome {
            Ok(stored) => {
                state.slot_mut(slot).stored = Some(stored.clone());
                info!("Successfully uploaded {}", key);
                Ok(stored)
            }
            Err(err) => {
                state.result = ComparisonResult::Unknown;
                drop(state);
                Err(self.fail(err).await)
            }
        }
    }

    /// Compare the uploaded selfie against the uploaded gallery image
    pub async fn compare(&self) -> Result<ComparisonOutcome, WorkflowError> {
        let (source, target, generations) = {
            let mut state = self.state.lock().await;
            let (source, target) = match (state.selfie.stored.clone(), state.gallery.stored.clone()) {
                (Some(source), Some(target)) => (source, target),
                (selfie, gallery) => {
                    let missing: Vec<Slot> = [(Slot::Selfie, selfie), (Slot::Gallery, gallery)]
                        .into_iter()
                        .filter(|(_, stored)| stored.is_none())
                        .map(|(slot, _)| slot)
                        .collect();
                    drop(state);
                    return Err(self.fail(WorkflowError::MissingInputs { missing }).await);
                }
            };

            state.compares_in_flight += 1;
            (source, target, state.generations())
        };

        info!(
            "Comparing {} against {} (threshold {})",
            source.key, target.key, self.similarity_threshold
        );

        let response = self
            .comparer
            .compare(&source, &target, self.similarity_threshold)
            .await;

        let mut state = self.state.lock().await;
        state.compares_in_flight = state.compares_in_flight.saturating_sub(1);

        match response {
            Ok(face_matches) => {
                let outcome = ComparisonOutcome {
                    result: ComparisonResult::from_matched(!face_matches.is_empty()),
                    face_matches,
                    similarity_threshold: self.similarity_threshold,
                    compared_at: chrono::Utc::now(),
                };

                if state.generations() == generations {
                    state.result = outcome.result;
                } else {
                    warn!("Images were replaced during comparison; result not recorded");
                }

                info!(
                    "Comparison finished: {:?} ({} face matches)",
                    outcome.result,
                    outcome.face_matches.len()
                );
                Ok(outcome)
            }
            Err(e) => {
                state.result = ComparisonResult::Unknown;
                drop(state);
                Err(self.fail(WorkflowError::ComparisonFailed(e)).await)
            }
        }
    }

    /// Current phase of the workflow
    pub async fn phase(&self) -> WorkflowPhase {
        self.state.lock().await.phase()
    }

    pub async fn result(&self) -> ComparisonResult {
        self.state.lock().await.result
    }

    pub async fn status(&self) -> Option<StatusMessage> {
        self.state.lock().await.status()
    }

    pub async fn handle(&self, slot: Slot) -> Option<LocalImageHandle> {
        self.state.lock().await.slot(slot).handle.clone()
    }

    /// Take every pending notification; each is delivered once
    pub async fn take_notifications(&self) -> Vec<Notification> {
        self.state.lock().await.notifications.drain(..).collect()
    }

    /// Snapshot the state for rendering, draining pending notifications
    pub async fn state_view(&self) -> WorkflowStateResponse {
        let mut state = self.state.lock().await;
        WorkflowStateResponse {
            phase: state.phase(),
            selfie: state.slot_view(Slot::Selfie),
            gallery: state.slot_view(Slot::Gallery),
            status: state.status().map(|s| s.as_str().to_string()),
            result: state.result,
            result_text: state.result.display_text().map(str::to_string),
            notifications: state.notifications.drain(..).collect(),
        }
    }

    /// Log an error and queue its notification
    async fn fail(&self, err: WorkflowError) -> WorkflowError {
        match &err {
            WorkflowError::Cancelled(_) => info!("{}", err),
            WorkflowError::MissingInputs { missing } => warn!("{} (missing: {:?})", err, missing),
            _ => error!("{}", err),
        }

        self.state.lock().await.notifications.push_back(err.notification());
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FaceMatch, PickedAsset, StoredObjectKey};
    use crate::services::{CompareError, StoreError};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};
    use tokio::sync::Notify;

    type Objects = Arc<StdMutex<HashMap<String, Vec<u8>>>>;

    struct FakeStore {
        objects: Objects,
        fail: bool,
        /// Payloads rejected regardless of `fail`
        failing: Vec<Vec<u8>>,
        /// Payloads whose upload waits for the paired gate
        gates: Vec<(Vec<u8>, Arc<Notify>)>,
    }

    impl FakeStore {
        fn new(objects: Objects) -> Self {
            Self { objects, fail: false, failing: vec![], gates: vec![] }
        }
    }

    #[async_trait]
    impl ObjectStore for FakeStore {
        async fn put(&self, key: &StoredObjectKey, bytes: Vec<u8>, content_type: &str) -> Result<StoredObjectRef, StoreError> {
            assert_eq!(content_type, "image/jpeg");
            if let Some((_, gate)) = self.gates.iter().find(|(payload, _)| *payload == bytes) {
                gate.notified().await;
            }
            if self.fail || self.failing.contains(&bytes) {
                return Err(StoreError::ApiError {
                    status: 503,
                    code: "SlowDown".to_string(),
                    message: "simulated network error".to_string(),
                });
            }
            self.objects.lock().unwrap().insert(key.to_string(), bytes);
            Ok(StoredObjectRef { bucket: "test-bucket".to_string(), key: key.clone(), etag: None })
        }
    }

    /// Matches when both stored objects hold identical bytes
    struct FakeComparer {
        objects: Objects,
        calls: Arc<AtomicUsize>,
        fail: bool,
        gate: Option<Arc<Notify>>,
    }

    impl FakeComparer {
        fn new(objects: Objects) -> Self {
            Self { objects, calls: Arc::default(), fail: false, gate: None }
        }
    }

    #[async_trait]
    impl FaceComparer for FakeComparer {
        async fn compare(&self, source: &StoredObjectRef, target: &StoredObjectRef, threshold: f32) -> Result<Vec<FaceMatch>, CompareError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(threshold, 90.0);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail {
                return Err(CompareError::InvalidResponse("simulated failure".to_string()));
            }
            let objects = self.objects.lock().unwrap();
            let same = objects.get(source.key.as_str()) == objects.get(target.key.as_str());
            Ok(if same {
                vec![FaceMatch { similarity: 99.0, confidence: Some(99.9), bounding_box: None }]
            } else {
                vec![]
            })
        }
    }

    struct ScriptedMedia {
        permission: PermissionStatus,
        picker_gate: Option<Arc<Notify>>,
        camera: StdMutex<VecDeque<PickerResult>>,
        library: StdMutex<VecDeque<PickerResult>>,
        files: HashMap<String, Vec<u8>>,
    }

    impl ScriptedMedia {
        fn new() -> Self {
            Self {
                permission: PermissionStatus::Granted,
                picker_gate: None,
                camera: StdMutex::new(VecDeque::new()),
                library: StdMutex::new(VecDeque::new()),
                files: HashMap::new(),
            }
        }

        fn file(mut self, uri: &str, bytes: &[u8]) -> Self {
            self.files.insert(uri.to_string(), bytes.to_vec());
            self
        }

        fn camera(self, result: PickerResult) -> Self {
            self.camera.lock().unwrap().push_back(result);
            self
        }

        fn library(self, result: PickerResult) -> Self {
            self.library.lock().unwrap().push_back(result);
            self
        }
    }

    #[async_trait]
    impl MediaSource for ScriptedMedia {
        async fn request_permission(&self) -> PermissionStatus {
            self.permission
        }

        async fn capture_from_camera(&self, _options: &PickerOptions) -> Result<PickerResult, MediaError> {
            if let Some(gate) = &self.picker_gate {
                gate.notified().await;
            }
            Ok(self.camera.lock().unwrap().pop_front().unwrap_or_else(PickerResult::canceled))
        }

        async fn pick_from_library(&self, _options: &PickerOptions) -> Result<PickerResult, MediaError> {
            Ok(self.library.lock().unwrap().pop_front().unwrap_or_else(PickerResult::canceled))
        }

        async fn load(&self, handle: &LocalImageHandle) -> Result<Vec<u8>, MediaError> {
            self.files
                .get(handle.uri())
                .cloned()
                .ok_or_else(|| MediaError::EmptyImage(handle.to_string()))
        }
    }

    struct Harness {
        workflow: FaceCompareWorkflow<FakeStore, FakeComparer>,
        objects: Objects,
        calls: Arc<AtomicUsize>,
    }

    impl Harness {
        fn build(store: FakeStore, comparer: FakeComparer) -> Self {
            let objects = store.objects.clone();
            let calls = comparer.calls.clone();
            Harness { workflow: FaceCompareWorkflow::new(store, comparer, 90.0), objects, calls }
        }
    }

    fn harness(store_fails: bool, comparer_fails: bool) -> Harness {
        let objects: Objects = Arc::default();
        let mut store = FakeStore::new(objects.clone());
        store.fail = store_fails;
        let mut comparer = FakeComparer::new(objects);
        comparer.fail = comparer_fails;
        Harness::build(store, comparer)
    }

    #[tokio::test]
    async fn test_end_to_end_match() {
        let h = harness(false, false);
        let media = ScriptedMedia::new()
            .file("A", b"same-face")
            .file("B", b"same-face")
            .camera(PickerResult::with_uri("A"))
            .library(PickerResult::with_uri("B"));

        let selfie = h.workflow.take_selfie(&media).await.unwrap();
        assert_eq!(selfie.key.as_str(), "selfie.jpg");
        let gallery = h.workflow.pick_image(&media).await.unwrap();
        assert_eq!(gallery.key.as_str(), "gallery.jpg");

        let outcome = h.workflow.compare().await.unwrap();
        assert!(outcome.matched());

        let view = h.workflow.state_view().await;
        assert_eq!(view.result_text.as_deref(), Some("Faces match!"));
        assert_eq!(view.phase, WorkflowPhase::Matched);
        assert_eq!(view.status, None);
        assert!(view.notifications.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_leaves_state_unchanged() {
        let h = harness(false, false);
        let media = ScriptedMedia::new()
            .file("A", b"face")
            .file("B", b"face")
            .camera(PickerResult::with_uri("A"))
            .library(PickerResult::with_uri("B"))
            .camera(PickerResult::canceled());

        h.workflow.take_selfie(&media).await.unwrap();
        h.workflow.pick_image(&media).await.unwrap();
        h.workflow.compare().await.unwrap();

        let err = h.workflow.take_selfie(&media).await.unwrap_err();
        assert!(err.is_cancellation());

        assert_eq!(h.workflow.handle(Slot::Selfie).await, Some(LocalImageHandle::new("A")));
        assert_eq!(h.workflow.result().await, ComparisonResult::Match);

        let notifications = h.workflow.take_notifications().await;
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].title, "Selfie Canceled");
        assert!(h.workflow.take_notifications().await.is_empty());
    }

    #[tokio::test]
    async fn test_compare_requires_both_uploads() {
        let h = harness(false, false);
        let media = ScriptedMedia::new()
            .file("A", b"face")
            .camera(PickerResult::with_uri("A"));

        let err = h.workflow.compare().await.unwrap_err();
        assert!(matches!(err, WorkflowError::MissingInputs { ref missing } if missing.len() == 2));

        h.workflow.take_selfie(&media).await.unwrap();
        let err = h.workflow.compare().await.unwrap_err();
        assert!(matches!(err, WorkflowError::MissingInputs { ref missing } if missing == &vec![Slot::Gallery]));

        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_face_matches_is_no_match() {
        let h = harness(false, false);
        let media = ScriptedMedia::new()
            .file("A", b"face-a")
            .file("B", b"face-b")
            .camera(PickerResult::with_uri("A"))
            .library(PickerResult::with_uri("B"));

        h.workflow.take_selfie(&media).await.unwrap();
        h.workflow.pick_image(&media).await.unwrap();
        let outcome = h.workflow.compare().await.unwrap();

        assert!(!outcome.matched());
        assert_eq!(outcome.best_similarity(), None);
        assert_eq!(h.workflow.phase().await, WorkflowPhase::NotMatched);
    }

    #[tokio::test]
    async fn test_reacquired_selfie_overwrites_stored_object() {
        let h = harness(false, false);
        let media = ScriptedMedia::new()
            .file("A", b"face-a")
            .file("B", b"face-b")
            .file("C", b"face-b")
            .camera(PickerResult::with_uri("A"))
            .library(PickerResult::with_uri("B"))
            .camera(PickerResult::with_uri("C"));

        h.workflow.take_selfie(&media).await.unwrap();
        h.workflow.pick_image(&media).await.unwrap();
        assert!(!h.workflow.compare().await.unwrap().matched());

        h.workflow.take_selfie(&media).await.unwrap();
        assert_eq!(h.workflow.result().await, ComparisonResult::Unknown);
        assert_eq!(
            h.objects.lock().unwrap().get("selfie.jpg").map(Vec::as_slice),
            Some(&b"face-b"[..])
        );
        assert!(h.workflow.compare().await.unwrap().matched());
    }

    #[tokio::test]
    async fn test_upload_failure_resets_result_and_status() {
        let h = harness(true, false);
        let media = ScriptedMedia::new()
            .file("A", b"face")
            .camera(PickerResult::with_uri("A"));

        let err = h.workflow.take_selfie(&media).await.unwrap_err();
        assert!(matches!(err, WorkflowError::UploadFailed { .. }));

        assert_eq!(h.workflow.result().await, ComparisonResult::Unknown);
        assert_eq!(h.workflow.status().await, None);
        assert_eq!(h.workflow.phase().await, WorkflowPhase::Idle);

        let view = h.workflow.state_view().await;
        assert!(!view.selfie.uploaded);
        assert_eq!(view.notifications[0].title, "Upload Error");
    }

    #[tokio::test]
    async fn test_comparison_failure_clears_result() {
        let h = harness(false, true);
        let media = ScriptedMedia::new()
            .file("A", b"face")
            .file("B", b"face")
            .camera(PickerResult::with_uri("A"))
            .library(PickerResult::with_uri("B"));

        h.workflow.take_selfie(&media).await.unwrap();
        h.workflow.pick_image(&media).await.unwrap();
        let err = h.workflow.compare().await.unwrap_err();

        assert!(matches!(err, WorkflowError::ComparisonFailed(_)));
        assert_eq!(h.workflow.result().await, ComparisonResult::Unknown);
        assert_eq!(h.workflow.status().await, None);
        assert_eq!(h.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_asset_is_rejected_before_upload() {
        let h = harness(false, false);
        let empty = PickerResult { canceled: false, assets: vec![PickedAsset::default()] };
        let media = ScriptedMedia::new().library(empty).library(PickerResult::default());

        let err = h.workflow.pick_image(&media).await.unwrap_err();
        assert!(matches!(err, WorkflowError::EmptyAcquisition(Slot::Gallery)));
        let err = h.workflow.pick_image(&media).await.unwrap_err();
        assert!(matches!(err, WorkflowError::EmptyAcquisition(Slot::Gallery)));

        assert!(h.objects.lock().unwrap().is_empty());
        assert_eq!(h.workflow.handle(Slot::Gallery).await, None);
    }

    #[tokio::test]
    async fn test_permission_denied() {
        let h = harness(false, false);
        let mut media = ScriptedMedia::new().camera(PickerResult::with_uri("A"));
        media.permission = PermissionStatus::Denied;

        let err = h.workflow.take_selfie(&media).await.unwrap_err();
        assert!(matches!(err, WorkflowError::PermissionDenied(_)));
        assert_eq!(h.workflow.take_notifications().await[0].title, "Permission required");
    }

    #[tokio::test]
    async fn test_upload_without_handle() {
        let h = harness(false, false);
        let media = ScriptedMedia::new();

        let err = h.workflow.upload(Slot::Selfie, &media).await.unwrap_err();
        assert!(matches!(err, WorkflowError::EmptyAcquisition(Slot::Selfie)));
    }
    #[tokio::test]
    async fn test_replaced_upload_failure_keeps_newer_result() {
        let objects: Objects = Arc::default();
        let gate = Arc::new(Notify::new());
        let mut store = FakeStore::new(objects.clone());
        store.failing.push(b"old-face".to_vec());
        store.gates.push((b"old-face".to_vec(), gate.clone()));
        let h = Harness::build(store, FakeComparer::new(objects));

        let media = ScriptedMedia::new()
            .file("A", b"old-face")
            .file("C", b"face")
            .file("B", b"face")
            .camera(PickerResult::with_uri("A"))
            .camera(PickerResult::with_uri("C"))
            .library(PickerResult::with_uri("B"));

        let (stale, matched) = tokio::join!(h.workflow.take_selfie(&media), async {
            tokio::task::yield_now().await;
            h.workflow.take_selfie(&media).await.unwrap();
            h.workflow.pick_image(&media).await.unwrap();
            let matched = h.workflow.compare().await.unwrap().matched();
            gate.notify_one();
            matched
        });

        assert!(matched);
        assert!(matches!(stale, Err(WorkflowError::UploadFailed { .. })));
        assert_eq!(h.workflow.result().await, ComparisonResult::Match);
        assert_eq!(h.workflow.handle(Slot::Selfie).await, Some(LocalImageHandle::new("C")));

        let view = h.workflow.state_view().await;
        assert!(view.selfie.uploaded);
        assert!(view.notifications.is_empty());
    }

    #[tokio::test]
    async fn test_replaced_upload_success_is_not_recorded() {
        let objects: Objects = Arc::default();
        let gate = Arc::new(Notify::new());
        let mut store = FakeStore::new(objects.clone());
        store.gates.push((b"old-face".to_vec(), gate.clone()));
        store.failing.push(b"new-face".to_vec());
        let h = Harness::build(store, FakeComparer::new(objects));

        let media = ScriptedMedia::new()
            .file("A", b"old-face")
            .file("C", b"new-face")
            .camera(PickerResult::with_uri("A"))
            .camera(PickerResult::with_uri("C"));

        let (stale, current) = tokio::join!(h.workflow.take_selfie(&media), async {
            tokio::task::yield_now().await;
            let current = h.workflow.take_selfie(&media).await;
            gate.notify_one();
            current
        });

        assert!(stale.is_ok());
        assert!(matches!(current, Err(WorkflowError::UploadFailed { .. })));
        assert!(!h.workflow.state_view().await.selfie.uploaded);

        let err = h.workflow.compare().await.unwrap_err();
        assert!(matches!(err, WorkflowError::MissingInputs { ref missing } if missing.contains(&Slot::Selfie)));
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_comparison_of_replaced_images_is_not_recorded() {
        let objects: Objects = Arc::default();
        let gate = Arc::new(Notify::new());
        let mut comparer = FakeComparer::new(objects.clone());
        comparer.gate = Some(gate.clone());
        let h = Harness::build(FakeStore::new(objects), comparer);

        let media = ScriptedMedia::new()
            .file("A", b"face")
            .file("B", b"face")
            .file("C", b"other-face")
            .camera(PickerResult::with_uri("A"))
            .library(PickerResult::with_uri("B"))
            .camera(PickerResult::with_uri("C"));

        h.workflow.take_selfie(&media).await.unwrap();
        h.workflow.pick_image(&media).await.unwrap();

        let (outcome, ()) = tokio::join!(h.workflow.compare(), async {
            tokio::task::yield_now().await;
            assert_eq!(h.workflow.phase().await, WorkflowPhase::Comparing);
            h.workflow.take_selfie(&media).await.unwrap();
            gate.notify_one();
        });

        assert!(outcome.is_ok());
        assert_eq!(h.workflow.result().await, ComparisonResult::Unknown);
        assert_eq!(h.workflow.phase().await, WorkflowPhase::Idle);
        assert_eq!(h.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_overlapping_acquisitions_keep_acquiring_phase() {
        let h = harness(false, false);
        let gate = Arc::new(Notify::new());
        let mut waiting = ScriptedMedia::new().file("A", b"face").camera(PickerResult::with_uri("A"));
        waiting.picker_gate = Some(gate.clone());
        let quick = ScriptedMedia::new().file("C", b"face").camera(PickerResult::with_uri("C"));

        let (first, phase_between) = tokio::join!(h.workflow.take_selfie(&waiting), async {
            tokio::task::yield_now().await;
            h.workflow.take_selfie(&quick).await.unwrap();
            let phase = h.workflow.phase().await;
            gate.notify_one();
            phase
        });

        assert_eq!(phase_between, WorkflowPhase::Acquiring(Slot::Selfie));
        assert!(first.is_ok());
        assert_eq!(h.workflow.phase().await, WorkflowPhase::Idle);
        assert_eq!(h.workflow.handle(Slot::Selfie).await, Some(LocalImageHandle::new("A")));
    }
}
