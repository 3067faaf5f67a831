//! Engine stage identifiers and constructors for the stages this crate emits.
//!
//! Options are pass-through payloads for the downstream engine. Only the
//! content slots are interpreted by the resolver.

use serde_json::{json, Map, Value};

use super::{ContentSlot, Stage};
use crate::config::UserCustomization;

// ─────────────────────────────────────────────────────────────────────────────
// Stage identifiers
// ─────────────────────────────────────────────────────────────────────────────

pub const BOOTUPD: &str = "org.osbuild.bootupd";
pub const BUILDSTAMP: &str = "org.osbuild.buildstamp";
pub const CONTAINER_DEPLOY: &str = "org.osbuild.container-deploy";
pub const COPY: &str = "org.osbuild.copy";
pub const DRACUT: &str = "org.osbuild.dracut";
pub const KICKSTART: &str = "org.osbuild.kickstart";
pub const LOCALE: &str = "org.osbuild.locale";
pub const MKDIR: &str = "org.osbuild.mkdir";
pub const MKFS_EXT4: &str = "org.osbuild.mkfs.ext4";
pub const MKFS_FAT: &str = "org.osbuild.mkfs.fat";
pub const MKFS_XFS: &str = "org.osbuild.mkfs.xfs";
pub const OSTREE_CONFIG: &str = "org.osbuild.ostree.config";
pub const OSTREE_DEPLOY_CONTAINER: &str = "org.osbuild.ostree.deploy.container";
pub const OSTREE_FILLVAR: &str = "org.osbuild.ostree.fillvar";
pub const OSTREE_INIT_FS: &str = "org.osbuild.ostree.init-fs";
pub const OSTREE_OS_INIT: &str = "org.osbuild.ostree.os-init";
pub const OSTREE_SELINUX: &str = "org.osbuild.ostree.selinux";
pub const QEMU: &str = "org.osbuild.qemu";
pub const RPM: &str = "org.osbuild.rpm";
pub const SELINUX: &str = "org.osbuild.selinux";
pub const SFDISK: &str = "org.osbuild.sfdisk";
pub const SKOPEO: &str = "org.osbuild.skopeo";
pub const TRUNCATE: &str = "org.osbuild.truncate";
pub const USERS: &str = "org.osbuild.users";

/// ostree stateroot used for every deployment.
pub const OSNAME: &str = "default";

const FILE_CONTEXTS: &str = "etc/selinux/targeted/contexts/files/file_contexts";

// ─────────────────────────────────────────────────────────────────────────────
// Input helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Input referencing the whole tree of another pipeline.
pub fn tree_input(pipeline: &str) -> Value {
    json!({
        "type": "org.osbuild.tree",
        "origin": "org.osbuild.pipeline",
        "references": [format!("name:{pipeline}")],
    })
}

/// Input referencing one file produced by another pipeline.
pub fn file_input(pipeline: &str, file: &str) -> Value {
    json!({
        "type": "org.osbuild.files",
        "origin": "org.osbuild.pipeline",
        "references": { format!("name:{pipeline}"): { "file": file } },
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Build root stages
// ─────────────────────────────────────────────────────────────────────────────

/// Unpack the base container as the build root.
pub fn container_deploy() -> Stage {
    Stage::new(CONTAINER_DEPLOY, Value::Null).with_slot(ContentSlot::Containers)
}

/// Install the pipeline's packages.
pub fn rpm(required: bool) -> Stage {
    Stage::new(RPM, json!({})).with_slot(ContentSlot::Packages { required })
}

pub fn selinux() -> Stage {
    Stage::new(SELINUX, json!({ "file_contexts": FILE_CONTEXTS }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Deployment stages
// ─────────────────────────────────────────────────────────────────────────────

pub fn ostree_init_fs() -> Stage {
    Stage::new(OSTREE_INIT_FS, Value::Null)
}

pub fn ostree_os_init() -> Stage {
    Stage::new(OSTREE_OS_INIT, json!({ "osname": OSNAME }))
}

pub fn ostree_config() -> Stage {
    Stage::new(
        OSTREE_CONFIG,
        json!({
            "repo": "/ostree/repo",
            "config": { "sysroot": { "readonly": true, "bootloader": "none" } },
        }),
    )
}

pub fn mkdir(paths: &[&str]) -> Stage {
    let paths: Vec<Value> = paths
        .iter()
        .map(|path| json!({ "path": path, "mode": 0o755 }))
        .collect();
    Stage::new(MKDIR, json!({ "paths": paths }))
}

/// Deploy the base image; the concrete variant is chosen at resolution.
pub fn ostree_deploy(target_imgref: &str, kernel_opts: &[String]) -> Stage {
    Stage::new(
        OSTREE_DEPLOY_CONTAINER,
        json!({
            "osname": OSNAME,
            "target_imgref": target_imgref,
            "mounts": ["/boot", "/boot/efi"],
            "kernel_opts": kernel_opts,
        }),
    )
    .with_slot(ContentSlot::DeploymentSource)
}

pub fn ostree_fillvar() -> Stage {
    Stage::new(
        OSTREE_FILLVAR,
        json!({ "deployment": { "osname": OSNAME, "ref": "ostree/1/1/0" } }),
    )
}

pub fn ostree_selinux() -> Stage {
    Stage::new(
        OSTREE_SELINUX,
        json!({ "deployment": { "osname": OSNAME, "ref": "ostree/1/1/0" } }),
    )
}

/// `users` option map shared by the users and kickstart stages.
pub fn user_options(users: &[UserCustomization]) -> Map<String, Value> {
    let mut map = Map::new();
    for user in users {
        let mut entry = Map::new();
        if let Some(password) = &user.password {
            entry.insert("password".into(), Value::String(password.clone()));
        }
        if let Some(key) = &user.key {
            entry.insert("key".into(), Value::String(key.clone()));
        }
        if !user.groups.is_empty() {
            entry.insert("groups".into(), json!(user.groups));
        }
        map.insert(user.name.clone(), Value::Object(entry));
    }
    map
}

pub fn users(users: &[UserCustomization]) -> Stage {
    Stage::new(USERS, json!({ "users": user_options(users) }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Disk assembly stages
// ─────────────────────────────────────────────────────────────────────────────

pub fn truncate(filename: &str, size: u64) -> Stage {
    Stage::new(TRUNCATE, json!({ "filename": filename, "size": size.to_string() }))
}

pub fn sfdisk() -> Stage {
    Stage::new(
        SFDISK,
        json!({
            "label": "gpt",
            "partitions": [
                { "name": "BIOS-BOOT", "size": 2048, "start": 2048, "bootable": true },
                { "name": "EFI-SYSTEM", "size": 1026048, "start": 4096 },
                { "name": "boot", "size": 2097152, "start": 1030144 },
                { "name": "root", "start": 3127296 },
            ],
        }),
    )
}

pub fn mkfs(stage_type: &str, label: &str) -> Stage {
    Stage::new(stage_type, json!({ "label": label }))
}

pub fn copy_tree(from_pipeline: &str, to: &str) -> Stage {
    Stage::new(
        COPY,
        json!({ "paths": [{ "from": "input://tree/", "to": to }] }),
    )
    .with_input("tree", tree_input(from_pipeline))
}

pub fn bootupd() -> Stage {
    Stage::new(
        BOOTUPD,
        json!({ "deployment": { "osname": OSNAME, "ref": "ostree/1/1/0" }, "static-configs": true }),
    )
}

pub fn qemu(filename: &str, from_pipeline: &str, from_file: &str) -> Stage {
    Stage::new(
        QEMU,
        json!({ "filename": filename, "format": { "type": "qcow2", "compat": "1.1" } }),
    )
    .with_input("image", file_input(from_pipeline, from_file))
}

// ─────────────────────────────────────────────────────────────────────────────
// Installer stages
// ─────────────────────────────────────────────────────────────────────────────

pub fn buildstamp(product: &str) -> Stage {
    Stage::new(
        BUILDSTAMP,
        json!({
            "arch": std::env::consts::ARCH,
            "product": product,
            "version": "",
            "final": true,
            "variant": "",
            "bugurl": "",
        }),
    )
}

pub fn locale(language: &str) -> Stage {
    Stage::new(LOCALE, json!({ "language": language }))
}

/// Build the installer initramfs for the kernel package.
pub fn dracut() -> Stage {
    Stage::new(
        DRACUT,
        json!({
            "modules": ["anaconda", "dmsquash-live", "rdma", "rngd", "multipath"],
        }),
    )
    .with_slot(ContentSlot::NamedPackage {
        name: "kernel".into(),
        option: "kernel".into(),
    })
}

pub fn copy_boot_files(from_pipeline: &str) -> Stage {
    Stage::new(
        COPY,
        json!({
            "paths": [
                { "from": "input://tree/boot/vmlinuz", "to": "tree:///images/pxeboot/vmlinuz" },
                { "from": "input://tree/boot/initramfs.img", "to": "tree:///images/pxeboot/initrd.img" },
            ],
        }),
    )
    .with_input("tree", tree_input(from_pipeline))
}

/// Embed the base image in the ISO tree.
pub fn skopeo(intermediate: Option<String>) -> Stage {
    Stage::new(
        SKOPEO,
        json!({ "destination": { "type": "oci", "path": "/container" } }),
    )
    .with_slot(ContentSlot::TreeSource { intermediate })
}

pub fn kickstart(imgref: &str, users: &[UserCustomization]) -> Stage {
    let mut options = json!({
        "path": "/osbuild-base.ks",
        "ostreecontainer": {
            "url": "/run/install/repo/container",
            "transport": "oci",
            "target_imgref": imgref,
        },
    });
    if !users.is_empty() {
        options["users"] = Value::Object(user_options(users));
    }
    Stage::new(KICKSTART, options)
}
