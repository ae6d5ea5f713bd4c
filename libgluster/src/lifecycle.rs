//! Reference-counted mount lifecycle.
//!
//! [`MountedVolumeDriver`] owns the name → record mapping and turns plugin
//! verbs into at most one physical mount per volume:
//!
//! ```text
//!            Create               Mount (0→1)             Unmount (1→0)
//! Unknown ──────────▶ Created ──────────────▶ Mounted ──────────────▶ Created
//!                        │                      │  ▲                     │
//!                        │ Remove               └──┘ Mount/Unmount       │ Remove
//!                        ▼                      (n→n±1, n ≥ 1)           ▼
//!                     Unknown                                         Unknown
//! ```
//!
//! # Locking
//!
//! The [`DashMap`] guards only insertion and removal of records. Mount,
//! unmount and remove serialize on a per-volume async mutex, so operations on
//! different volumes never wait on each other. Reads take a snapshot of the
//! atomic refcount and never touch the per-volume mutex.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::driver::VolumeDriver;
use crate::error::VolumeError;
use crate::mounter::Mounter;
use crate::plugin::VolumePlugin;
use crate::types::{Capability, CreateRequest, MountRequest, Volume, VolumeState};

/// A single volume record.
#[derive(Debug)]
struct VolumeRecord {
    /// The request the volume was created with.
    request: CreateRequest,
    mountpoint: PathBuf,
    /// Written only while `lock` is held.
    refcount: AtomicUsize,
    /// Set by `remove` under `lock`; holders of a stale `Arc` must bail out.
    removed: AtomicBool,
    lock: Mutex<()>,
}

impl VolumeRecord {
    fn new(request: CreateRequest, mountpoint: PathBuf) -> Self {
        Self {
            request,
            mountpoint,
            refcount: AtomicUsize::new(0),
            removed: AtomicBool::new(false),
            lock: Mutex::new(()),
        }
    }

    fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    fn snapshot(&self) -> Volume {
        let refcount = self.refcount.load(Ordering::Acquire);
        let state = if refcount > 0 {
            VolumeState::Mounted
        } else {
            VolumeState::Created
        };
        Volume {
            name: self.request.name.clone(),
            mountpoint: (refcount > 0).then(|| self.mountpoint.clone()),
            refcount,
            state,
        }
    }
}

/// Generic mounted-volume driver: reference counting around a
/// [`VolumeDriver`]'s hooks and a [`Mounter`].
pub struct MountedVolumeDriver<D, M> {
    driver: D,
    mounter: M,
    /// Directory under which per-volume mountpoints are allocated.
    root: PathBuf,
    volumes: DashMap<String, Arc<VolumeRecord>>,
}

impl<D, M> MountedVolumeDriver<D, M>
where
    D: VolumeDriver,
    M: Mounter,
{
    pub fn new(driver: D, mounter: M, root: impl Into<PathBuf>) -> Self {
        Self {
            driver,
            mounter,
            root: root.into(),
            volumes: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn mounter(&self) -> &M {
        &self.mounter
    }

    /// Look up a live record by name.
    fn record(&self, name: &str) -> Result<Arc<VolumeRecord>, VolumeError> {
        self.volumes
            .get(name)
            .map(|r| Arc::clone(r.value()))
            .filter(|r| !r.is_removed())
            .ok_or_else(|| VolumeError::NotFound(name.to_owned()))
    }

    fn allocate_mountpoint(&self) -> PathBuf {
        self.root.join(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Perform the physical mount for a record whose refcount is zero.
    /// Caller holds the record lock.
    async fn mount_locked(&self, record: &VolumeRecord) -> Result<(), VolumeError> {
        tokio::fs::create_dir_all(&record.mountpoint)
            .await
            .map_err(|e| {
                VolumeError::mount_caused_by(
                    format!("creating mount point {}", record.mountpoint.display()),
                    e,
                )
            })?;

        let req = MountRequest::new(record.request.name.clone(), record.mountpoint.clone());
        self.driver.pre_mount(&req).await?;

        let args = self.driver.mount_options(&record.request);
        self.mounter.mount(&args, &record.mountpoint).await?;
        record.refcount.store(1, Ordering::Release);

        self.driver.post_mount(&req).await;
        Ok(())
    }
}

#[async_trait]
impl<D, M> VolumePlugin for MountedVolumeDriver<D, M>
where
    D: VolumeDriver,
    M: Mounter,
{
    #[instrument(skip(self, options))]
    async fn create(
        &self,
        name: &str,
        options: HashMap<String, String>,
    ) -> Result<(), VolumeError> {
        let request = CreateRequest::new(name, options);
        self.driver.validate(&request)?;

        match self.volumes.entry(request.name.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_removed() {
                    let mountpoint = self.allocate_mountpoint();
                    entry.insert(Arc::new(VolumeRecord::new(request, mountpoint)));
                    info!("volume created");
                    return Ok(());
                }
                if entry.get().request.options != request.options {
                    return Err(VolumeError::AlreadyExists(request.name));
                }
                debug!("volume already exists with identical options");
                Ok(())
            }
            Entry::Vacant(entry) => {
                let mountpoint = self.allocate_mountpoint();
                debug!(mountpoint = %mountpoint.display(), "allocated mount point");
                entry.insert(Arc::new(VolumeRecord::new(request, mountpoint)));
                info!("volume created");
                Ok(())
            }
        }
    }

    #[instrument(skip(self))]
    async fn remove(&self, name: &str) -> Result<(), VolumeError> {
        let record = self.record(name)?;
        let _guard = record.lock.lock().await;
        if record.is_removed() {
            return Err(VolumeError::NotFound(name.to_owned()));
        }

        let refcount = record.refcount.load(Ordering::Acquire);
        if refcount > 0 {
            return Err(VolumeError::InUse {
                name: name.to_owned(),
                refcount,
            });
        }

        record.removed.store(true, Ordering::Release);
        self.volumes
            .remove_if(name, |_, current| Arc::ptr_eq(current, &record));

        match tokio::fs::remove_dir(&record.mountpoint).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                mountpoint = %record.mountpoint.display(),
                error = %e,
                "failed to remove mount point directory",
            ),
        }

        info!("volume removed");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn mount(&self, name: &str, id: &str) -> Result<PathBuf, VolumeError> {
        let record = self.record(name)?;
        let _guard = record.lock.lock().await;
        if record.is_removed() {
            return Err(VolumeError::NotFound(name.to_owned()));
        }

        let refcount = record.refcount.load(Ordering::Acquire);
        if refcount > 0 {
            record.refcount.store(refcount + 1, Ordering::Release);
            debug!(refcount = refcount + 1, "volume already mounted");
            return Ok(record.mountpoint.clone());
        }

        self.mount_locked(&record).await?;
        info!(mountpoint = %record.mountpoint.display(), "volume mounted");
        Ok(record.mountpoint.clone())
    }

    #[instrument(skip(self))]
    async fn unmount(&self, name: &str, id: &str) -> Result<(), VolumeError> {
        let record = self.record(name)?;
        let _guard = record.lock.lock().await;
        if record.is_removed() {
            return Err(VolumeError::NotFound(name.to_owned()));
        }

        let refcount = record.refcount.load(Ordering::Acquire);
        match refcount {
            0 => Err(VolumeError::NotMounted(name.to_owned())),
            1 => {
                // Readers keep seeing Mounted until the filesystem is gone.
                if let Err(e) = self.mounter.unmount(&record.mountpoint).await {
                    warn!(error = %e, "unmount failed, volume stays mounted");
                    return Err(e);
                }
                record.refcount.store(0, Ordering::Release);
                info!(mountpoint = %record.mountpoint.display(), "volume unmounted");
                Ok(())
            }
            n => {
                record.refcount.store(n - 1, Ordering::Release);
                debug!(refcount = n - 1, "released volume consumer");
                Ok(())
            }
        }
    }

    async fn path(&self, name: &str) -> Result<Option<PathBuf>, VolumeError> {
        Ok(self.record(name)?.snapshot().mountpoint)
    }

    async fn get(&self, name: &str) -> Result<Volume, VolumeError> {
        Ok(self.record(name)?.snapshot())
    }

    async fn list(&self) -> Result<Vec<Volume>, VolumeError> {
        let mut volumes: Vec<Volume> = self
            .volumes
            .iter()
            .filter(|entry| !entry.value().is_removed())
            .map(|entry| entry.value().snapshot())
            .collect();
        volumes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(volumes)
    }

    fn capabilities(&self) -> Capability {
        Capability {
            scope: self.driver.scope(),
        }
    }
}
