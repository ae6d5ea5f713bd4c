//! Mount argument resolution for the `glusterfs` client.
//!
//! Turns a create request plus the process-wide server list into the flat
//! argument list handed to the mount utility. The mountpoint itself is not
//! part of the list; the [`Mounter`](crate::mounter::Mounter) appends it.

use tracing::warn;

use crate::types::CreateRequest;

/// Driver option carrying a comma-separated server list.
pub const OPT_SERVERS: &str = "servers";
/// Driver option carrying a complete, space-separated mount invocation.
pub const OPT_GLUSTEROPTS: &str = "glusteropts";
/// Appended to every argument list so client logs go to syslog.
pub const LOGGER_FLAG: &str = "--logger=syslog";

/// A volume name split into the GlusterFS volfile id and optional subdirectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeName<'a> {
    /// Everything before the first `/`.
    pub volfile_id: &'a str,
    /// Everything after the first `/`, without the leading slash.
    pub subdir: Option<&'a str>,
}

impl<'a> VolumeName<'a> {
    /// Split `name` on its first `/`. Returns `None` for an empty name.
    pub fn parse(name: &'a str) -> Option<Self> {
        if name.is_empty() {
            return None;
        }
        let (volfile_id, subdir) = match name.split_once('/') {
            Some((id, rest)) => (id, Some(rest)),
            None => (name, None),
        };
        Some(Self { volfile_id, subdir })
    }

    fn append_flags(&self, args: &mut Vec<String>) {
        args.push(format!("--volfile-id={}", self.volfile_id));
        if let Some(subdir) = self.subdir {
            args.push(format!("--subdir-mount=/{subdir}"));
        }
    }
}

/// Split a comma-separated server list, trimming entries and dropping empty ones.
pub fn parse_server_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Build the mount utility arguments for `req`.
///
/// Source precedence is `servers` (process-wide) > `options["servers"]` >
/// `options["glusteropts"]`. Server lists become `-s <server>` pairs in order
/// followed by the volfile/subdir flags; `glusteropts` is split on single
/// spaces and used as is. [`LOGGER_FLAG`] is always last.
///
/// Per-volume `servers` go through [`parse_server_list`], so entries are
/// trimmed and empty ones dropped before the `-s` pairs are emitted. Order is
/// otherwise preserved. `servers=" a, ,b"` yields `-s a -s b`, never `-s ""`.
pub fn resolve_mount_args(servers: &[String], req: &CreateRequest) -> Vec<String> {
    let mut args = Vec::new();

    if !servers.is_empty() {
        push_servers(&mut args, servers.iter().map(String::as_str));
        append_volume_flags(&mut args, &req.name);
    } else if let Some(raw) = req.options.get(OPT_SERVERS) {
        push_servers(&mut args, parse_server_list(raw).iter().map(String::as_str));
        append_volume_flags(&mut args, &req.name);
    } else if let Some(opts) = req.options.get(OPT_GLUSTEROPTS) {
        args.extend(opts.split(' ').map(str::to_owned));
    }

    args.push(LOGGER_FLAG.to_owned());
    args
}

fn push_servers<'a>(args: &mut Vec<String>, servers: impl Iterator<Item = &'a str>) {
    for server in servers {
        args.push("-s".to_owned());
        args.push(server.to_owned());
    }
}

fn append_volume_flags(args: &mut Vec<String>, name: &str) {
    match VolumeName::parse(name) {
        Some(parsed) => parsed.append_flags(args),
        None => warn!("resolving mount arguments for an empty volume name, omitting volfile flags"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn req(name: &str, opts: &[(&str, &str)]) -> CreateRequest {
        CreateRequest::new(
            name,
            opts.iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect::<HashMap<_, _>>(),
        )
    }

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn process_wide_servers() {
        let servers = strings(&["s1", "s2"]);
        let args = resolve_mount_args(&servers, &req("myvol", &[]));
        assert_eq!(
            args,
            strings(&["-s", "s1", "-s", "s2", "--volfile-id=myvol", "--logger=syslog"])
        );
    }

    #[test]
    fn servers_from_options() {
        let args = resolve_mount_args(&[], &req("test", &[("servers", "server1,server2")]));
        assert_eq!(
            args,
            strings(&[
                "-s",
                "server1",
                "-s",
                "server2",
                "--volfile-id=test",
                "--logger=syslog"
            ])
        );
    }

    #[test]
    fn glusteropts_used_verbatim() {
        let args = resolve_mount_args(
            &[],
            &req("test/sub", &[("glusteropts", "-s s1 --volfile-id=test")]),
        );
        assert_eq!(args, strings(&["-s", "s1", "--volfile-id=test", "--logger=syslog"]));
    }

    #[test]
    fn subdir_mounts() {
        let servers = strings(&["s1"]);
        let args = resolve_mount_args(&servers, &req("simplevolume/levelone", &[]));
        assert_eq!(
            args,
            strings(&[
                "-s",
                "s1",
                "--volfile-id=simplevolume",
                "--subdir-mount=/levelone",
                "--logger=syslog"
            ])
        );

        let args = resolve_mount_args(&servers, &req("simplevolume/levelone/level2", &[]));
        assert_eq!(args[2], "--volfile-id=simplevolume");
        assert_eq!(args[3], "--subdir-mount=/levelone/level2");
    }

    #[test]
    fn empty_name_omits_volume_flags() {
        let servers = strings(&["s1"]);
        let args = resolve_mount_args(&servers, &req("", &[]));
        assert_eq!(args, strings(&["-s", "s1", "--logger=syslog"]));
    }

    #[test]
    fn logger_flag_is_always_last_and_output_is_stable() {
        let cases = [
            (strings(&["a", "b", "c"]), req("v/x", &[])),
            (Vec::new(), req("v", &[("servers", "a, b,,c")])),
            (Vec::new(), req("v", &[("glusteropts", "-s a --volfile-id=v")])),
            (Vec::new(), req("v", &[])),
        ];
        for (servers, request) in &cases {
            let first = resolve_mount_args(servers, request);
            let second = resolve_mount_args(servers, request);
            assert_eq!(first, second);
            assert_eq!(first.last().map(String::as_str), Some(LOGGER_FLAG));
        }
    }

    #[test]
    fn volume_name_parsing() {
        assert_eq!(
            VolumeName::parse("vol"),
            Some(VolumeName {
                volfile_id: "vol",
                subdir: None
            })
        );
        assert_eq!(
            VolumeName::parse("vol/a/b"),
            Some(VolumeName {
                volfile_id: "vol",
                subdir: Some("a/b")
            })
        );
        assert_eq!(VolumeName::parse(""), None);
    }

    #[test]
    fn server_list_parsing() {
        assert_eq!(parse_server_list(" s1 ,s2,, s3:24007 "), strings(&["s1", "s2", "s3:24007"]));
        assert!(parse_server_list("").is_empty());
    }
}
