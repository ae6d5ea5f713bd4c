//! GlusterFS driver hooks.
//!
//! [`GlusterFsDriver`] decides where a volume's mount configuration comes
//! from. Exactly one source must be active per volume:
//!
//! ```text
//! process-wide server list   (--servers / SERVERS)
//! driver_opts.servers        (docker volume create -o servers=a,b)
//! driver_opts.glusteropts    (docker volume create -o glusteropts="-s a --volfile-id=v")
//! ```

use async_trait::async_trait;
use tracing::{info, warn};

use crate::driver::VolumeDriver;
use crate::error::VolumeError;
use crate::resolver::{
    OPT_GLUSTEROPTS, OPT_SERVERS, VolumeName, parse_server_list, resolve_mount_args,
};
use crate::types::{CreateRequest, MountRequest, Scope};

/// Driver hooks for GlusterFS FUSE mounts.
#[derive(Debug, Clone, Default)]
pub struct GlusterFsDriver {
    /// Process-wide server list, immutable after construction.
    servers: Vec<String>,
}

impl GlusterFsDriver {
    pub fn new(servers: Vec<String>) -> Self {
        Self { servers }
    }

    pub fn servers(&self) -> &[String] {
        &self.servers
    }
}

#[async_trait]
impl VolumeDriver for GlusterFsDriver {
    fn validate(&self, req: &CreateRequest) -> Result<(), VolumeError> {
        req.validate()?;

        let servers_in_opts = req.options.contains_key(OPT_SERVERS);
        let glusteropts_in_opts = req.options.contains_key(OPT_GLUSTEROPTS);

        if !self.servers.is_empty() && (servers_in_opts || glusteropts_in_opts) {
            return Err(VolumeError::validation(
                "SERVERS is set, options are not allowed",
            ));
        }
        if servers_in_opts && glusteropts_in_opts {
            return Err(VolumeError::validation(
                "servers is set, glusteropts are not allowed",
            ));
        }
        if self.servers.is_empty() && !servers_in_opts && !glusteropts_in_opts {
            return Err(VolumeError::validation(
                "One of SERVERS, driver_opts.servers or driver_opts.glusteropts must be specified",
            ));
        }
        if req
            .options
            .get(OPT_SERVERS)
            .is_some_and(|raw| parse_server_list(raw).is_empty())
        {
            return Err(VolumeError::validation(
                "driver_opts.servers is set but lists no servers",
            ));
        }
        if req
            .options
            .get(OPT_GLUSTEROPTS)
            .is_some_and(|raw| raw.trim().is_empty())
        {
            return Err(VolumeError::validation(
                "driver_opts.glusteropts is set but empty",
            ));
        }

        // glusteropts carries its own --volfile-id, the name is not parsed.
        if !glusteropts_in_opts
            && VolumeName::parse(&req.name).is_some_and(|n| n.volfile_id.is_empty())
        {
            return Err(VolumeError::validation(format!(
                "volume name {} has an empty volfile id",
                req.name
            )));
        }
        Ok(())
    }

    fn mount_options(&self, req: &CreateRequest) -> Vec<String> {
        resolve_mount_args(&self.servers, req)
    }

    async fn pre_mount(&self, req: &MountRequest) -> Result<(), VolumeError> {
        req.validate()?;

        tokio::fs::metadata(&req.mountpoint).await.map_err(|e| {
            VolumeError::mount_caused_by(
                format!("mount point {} is not accessible", req.mountpoint.display()),
                e,
            )
        })?;
        Ok(())
    }

    async fn post_mount(&self, req: &MountRequest) {
        match tokio::fs::metadata(&req.mountpoint).await {
            Ok(_) => info!(
                volume = %req.name,
                mountpoint = %req.mountpoint.display(),
                "successfully mounted volume",
            ),
            Err(e) => warn!(
                volume = %req.name,
                mountpoint = %req.mountpoint.display(),
                error = %e,
                "mount point is not accessible after mount",
            ),
        }
    }

    fn scope(&self) -> Scope {
        Scope::Global
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::ErrorKind;

    fn req(name: &str, opts: &[(&str, &str)]) -> CreateRequest {
        CreateRequest::new(
            name,
            opts.iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect::<HashMap<_, _>>(),
        )
    }

    fn with_servers() -> GlusterFsDriver {
        GlusterFsDriver::new(vec!["server1".into(), "server2".into()])
    }

    #[test]
    fn new_keeps_server_order() {
        assert!(GlusterFsDriver::new(Vec::new()).servers().is_empty());
        assert_eq!(with_servers().servers(), ["server1", "server2"]);
    }

    #[test]
    fn accepts_exactly_one_source() {
        assert!(with_servers().validate(&req("test", &[])).is_ok());

        let driver = GlusterFsDriver::default();
        assert!(driver.validate(&req("test", &[("servers", "server1")])).is_ok());
        assert!(
            driver
                .validate(&req("test", &[("glusteropts", "-s server1")]))
                .is_ok()
        );
    }

    #[test]
    fn rejects_zero_or_multiple_sources() {
        let driver = GlusterFsDriver::default();
        let err = driver.validate(&req("test", &[])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = driver
            .validate(&req(
                "test",
                &[("servers", "server1"), ("glusteropts", "-s server1")],
            ))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "validation error: servers is set, glusteropts are not allowed"
        );

        let err = with_servers()
            .validate(&req("test", &[("servers", "server3")]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "validation error: SERVERS is set, options are not allowed"
        );
        assert!(
            with_servers()
                .validate(&req("test", &[("glusteropts", "-s s")]))
                .is_err()
        );
    }

    #[test]
    fn rejects_blank_source_values() {
        let driver = GlusterFsDriver::default();

        for servers in ["", ",", " , "] {
            let err = driver
                .validate(&req("vol", &[("servers", servers)]))
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
            assert!(err.to_string().contains("servers"), "{err}");
        }

        for opts in ["", "   "] {
            let err = driver
                .validate(&req("vol", &[("glusteropts", opts)]))
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
            assert!(err.to_string().contains("glusteropts"), "{err}");
        }
    }

    #[test]
    fn rejects_empty_name_and_empty_volfile_id() {
        let err = with_servers().validate(&req("", &[])).unwrap_err();
        assert_eq!(err.to_string(), "validation error: volume name cannot be empty");

        assert!(with_servers().validate(&req("/sub", &[])).is_err());
        assert!(
            GlusterFsDriver::default()
                .validate(&req("/sub", &[("glusteropts", "-s a --volfile-id=v")]))
                .is_ok()
        );
    }

    #[test]
    fn mount_options_delegate_to_resolver() {
        let args = with_servers().mount_options(&req("test", &[]));
        assert_eq!(
            args,
            vec![
                "-s",
                "server1",
                "-s",
                "server2",
                "--volfile-id=test",
                "--logger=syslog"
            ]
        );
    }

    #[tokio::test]
    async fn pre_mount_requires_existing_mountpoint() {
        let tmp = tempfile::tempdir().unwrap();
        let driver = GlusterFsDriver::default();

        let ok = MountRequest::new("test", tmp.path());
        assert!(driver.pre_mount(&ok).await.is_ok());

        let missing = MountRequest::new("test", tmp.path().join("missing"));
        let err = driver.pre_mount(&missing).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Mount);
        assert!(err.to_string().contains("is not accessible (caused by:"));
    }

    #[tokio::test]
    async fn pre_mount_validates_request() {
        let driver = GlusterFsDriver::default();
        let err = driver
            .pre_mount(&MountRequest::new("test", ""))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn post_mount_never_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let driver = GlusterFsDriver::default();
        driver
            .post_mount(&MountRequest::new("test", tmp.path()))
            .await;
        driver
            .post_mount(&MountRequest::new("test", tmp.path().join("gone")))
            .await;
    }

    #[test]
    fn volumes_are_global() {
        assert_eq!(GlusterFsDriver::default().scope(), Scope::Global);
    }
}
