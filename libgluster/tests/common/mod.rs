use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use libgluster::{Mounter, VolumeError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

/// Mounter double that records every invocation instead of mounting.
#[derive(Default)]
pub struct RecordingMounter {
    pub mounts: AtomicUsize,
    pub unmounts: AtomicUsize,
    pub calls: Mutex<Vec<(Vec<String>, PathBuf)>>,
}

impl RecordingMounter {
    pub fn mount_count(&self) -> usize {
        self.mounts.load(Ordering::SeqCst)
    }

    pub fn unmount_count(&self) -> usize {
        self.unmounts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Mounter for RecordingMounter {
    async fn mount(&self, args: &[String], mountpoint: &Path) -> Result<(), VolumeError> {
        self.calls
            .lock()
            .unwrap()
            .push((args.to_vec(), mountpoint.to_path_buf()));
        self.mounts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn unmount(&self, _mountpoint: &Path) -> Result<(), VolumeError> {
        self.unmounts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Issue one plugin call over the Unix socket and return status and JSON body.
pub async fn post(socket: &Path, path: &str, body: &str) -> (u16, serde_json::Value) {
    let mut stream = UnixStream::connect(socket).await.unwrap();
    let request = format!(
        "POST {path} HTTP/1.1\r\n\
         Host: plugin\r\n\
         Content-Type: application/vnd.docker.plugins.v1+json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {body}",
        body.len()
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    let text = String::from_utf8(buf).unwrap();
    let (head, payload) = text.split_once("\r\n\r\n").unwrap();
    let status = head.split(' ').nth(1).unwrap().parse().unwrap();
    (status, serde_json::from_str(payload).unwrap())
}
