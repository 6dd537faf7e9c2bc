use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use anyhow::{anyhow, bail, Result};
use pitchtrace_core::Vector3;

use crate::{CellAppearance, FrameSnapshot, MeshKind, RenderBackend, ResourceHandle, Transform};

/// Shared count of live resources in a backend.
///
/// Stays readable after the backend itself has been dropped.
#[derive(Debug, Clone, Default)]
pub struct ResourceCounter(Arc<AtomicUsize>);

impl ResourceCounter {
    /// Number of resources currently allocated.
    pub fn live(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn add(&self, n: usize) {
        self.0.fetch_add(n, Ordering::SeqCst);
    }

    fn sub(&self, n: usize) {
        self.0.fetch_sub(n, Ordering::SeqCst);
    }
}

/// State of one resource in a [`HeadlessBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessResource {
    pub kind: MeshKind,
    pub transform: Transform,
    pub path: Vec<Vector3>,
    pub appearance: CellAppearance,
    /// Number of times the path has been uploaded
    pub uploads: usize,
}

/// A backend that keeps the scene in memory without drawing anything.
///
/// Used when no display is available and for inspecting the scene in tests.
#[derive(Debug)]
pub struct HeadlessBackend {
    resources: HashMap<ResourceHandle, HeadlessResource>,
    next_id: u64,
    counter: ResourceCounter,
    width: u32,
    height: u32,
    context_lost: bool,
    frames_drawn: u64,
    contexts_created: u64,
    last_frame: Option<FrameSnapshot>,
    /// Number of upcoming path uploads that fail
    failing_uploads: usize,
}

impl HeadlessBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            resources: HashMap::new(),
            next_id: 0,
            counter: ResourceCounter::default(),
            width,
            height,
            context_lost: false,
            frames_drawn: 0,
            contexts_created: 1,
            last_frame: None,
            failing_uploads: 0,
        }
    }

    /// A handle to the live resource count.
    pub fn counter(&self) -> ResourceCounter {
        self.counter.clone()
    }

    pub fn live_resources(&self) -> usize {
        self.resources.len()
    }

    pub fn resource(&self, handle: ResourceHandle) -> Option<&HeadlessResource> {
        self.resources.get(&handle)
    }

    /// All resources of the given kind.
    pub fn find(&self, kind: MeshKind) -> Vec<&HeadlessResource> {
        self.resources.values().filter(|r| r.kind == kind).collect()
    }

    /// All zone cells, ordered by zone id.
    pub fn cells(&self) -> Vec<(u8, &HeadlessResource)> {
        let mut cells: Vec<_> = self
            .resources
            .values()
            .filter_map(|r| match r.kind {
                MeshKind::ZoneCell { zone_id } => Some((zone_id, r)),
                _ => None,
            })
            .collect();
        cells.sort_by_key(|(id, _)| *id);
        cells
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Number of render contexts acquired, including the initial one.
    pub fn contexts_created(&self) -> u64 {
        self.contexts_created
    }

    pub fn last_frame(&self) -> Option<&FrameSnapshot> {
        self.last_frame.as_ref()
    }

    /// Simulate losing the render context, eg. after a GPU reset.
    pub fn lose_context(&mut self) {
        log::warn!("Headless render context lost");
        self.context_lost = true;
    }

    /// Make the next `n` path uploads fail without losing the context, eg. when
    /// a buffer cannot be allocated.
    pub fn fail_next_uploads(&mut self, n: usize) {
        self.failing_uploads = n;
    }

    fn check_context(&self) -> Result<()> {
        if self.context_lost {
            bail!("render context lost");
        }
        Ok(())
    }

    fn get_mut(&mut self, handle: ResourceHandle) -> Result<&mut HeadlessResource> {
        self.check_context()?;
        self.resources
            .get_mut(&handle)
            .ok_or_else(|| anyhow!("unknown resource {}", handle))
    }
}

impl RenderBackend for HeadlessBackend {
    fn create_mesh(&mut self, kind: MeshKind) -> Result<ResourceHandle> {
        self.check_context()?;
        let handle = ResourceHandle(self.next_id);
        self.next_id += 1;
        self.resources.insert(
            handle,
            HeadlessResource {
                kind,
                transform: Transform::default(),
                path: Vec::new(),
                appearance: CellAppearance::default(),
                uploads: 0,
            },
        );
        self.counter.add(1);
        Ok(handle)
    }

    fn set_transform(&mut self, handle: ResourceHandle, transform: Transform) -> Result<()> {
        self.get_mut(handle)?.transform = transform;
        Ok(())
    }

    fn upload_path(&mut self, handle: ResourceHandle, points: &[Vector3]) -> Result<()> {
        if self.failing_uploads > 0 {
            self.failing_uploads -= 1;
            bail!("failed to allocate {} path vertices", points.len());
        }
        let resource = self.get_mut(handle)?;
        resource.path.clear();
        resource.path.extend_from_slice(points);
        resource.uploads += 1;
        Ok(())
    }

    fn set_cell_appearance(
        &mut self,
        handle: ResourceHandle,
        appearance: CellAppearance,
    ) -> Result<()> {
        self.get_mut(handle)?.appearance = appearance;
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.check_context()?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn draw(&mut self, frame: &FrameSnapshot) -> Result<()> {
        self.check_context()?;
        self.frames_drawn += 1;
        self.last_frame = Some(frame.clone());
        Ok(())
    }

    fn release(&mut self, handle: ResourceHandle) {
        if self.resources.remove(&handle).is_some() {
            self.counter.sub(1);
        }
    }

    fn is_context_lost(&self) -> bool {
        self.context_lost
    }

    fn restore_context(&mut self) -> Result<()> {
        // Everything allocated in the lost context is gone
        self.counter.sub(self.resources.len());
        self.resources.clear();
        self.context_lost = false;
        self.contexts_created += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_tracks_resources() {
        let mut backend = HeadlessBackend::new(100, 100);
        let counter = backend.counter();
        let a = backend.create_mesh(MeshKind::Ball).unwrap();
        let b = backend.create_mesh(MeshKind::Ground).unwrap();
        assert_ne!(a, b);
        assert_eq!(counter.live(), 2);

        backend.release(a);
        backend.release(a);
        assert_eq!(counter.live(), 1);
        drop(backend);
        assert_eq!(counter.live(), 1);
    }

    #[test]
    fn test_context_loss_invalidates_resources() {
        let mut backend = HeadlessBackend::new(100, 100);
        let handle = backend.create_mesh(MeshKind::TrajectoryPath).unwrap();
        backend.lose_context();

        assert!(backend.upload_path(handle, &[Vector3::zeros()]).is_err());
        assert!(backend.create_mesh(MeshKind::Ball).is_err());

        backend.restore_context().unwrap();
        assert!(!backend.is_context_lost());
        assert_eq!(backend.counter().live(), 0);
        assert!(backend.resource(handle).is_none());
        assert_eq!(backend.contexts_created(), 2);
    }

    #[test]
    fn test_upload_replaces_path() {
        let mut backend = HeadlessBackend::new(100, 100);
        let handle = backend.create_mesh(MeshKind::TrajectoryPath).unwrap();
        backend
            .upload_path(handle, &[Vector3::zeros(), Vector3::x()])
            .unwrap();
        backend.upload_path(handle, &[Vector3::y()]).unwrap();
        let resource = backend.resource(handle).unwrap();
        assert_eq!(resource.path, vec![Vector3::y()]);
        assert_eq!(resource.uploads, 2);
    }

    #[test]
    fn test_failed_upload_keeps_context() {
        let mut backend = HeadlessBackend::new(100, 100);
        let handle = backend.create_mesh(MeshKind::TrajectoryPath).unwrap();
        backend.fail_next_uploads(1);

        assert!(backend.upload_path(handle, &[Vector3::zeros()]).is_err());
        assert!(!backend.is_context_lost());
        backend.upload_path(handle, &[Vector3::zeros()]).unwrap();
        assert_eq!(backend.resource(handle).unwrap().uploads, 1);
    }
}
