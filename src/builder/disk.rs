//! Pipeline skeleton for disk images (ami, raw, qcow2).

use crate::config::{ImageType, ManifestConfig};
use crate::manifest::{pipelines, stages, Pipeline};

/// Default disk size when nothing else asks for more.
pub const DEFAULT_SIZE: u64 = 10 * 1024 * 1024 * 1024;

const BASE_KERNEL_OPTS: &[&str] = &["rw", "console=tty0", "console=ttyS0"];

/// Reference the deployed system tracks for updates.
pub fn target_imgref(imgref: &str) -> String {
    format!("ostree-unverified-registry:{imgref}")
}

pub(crate) fn pipelines(config: &ManifestConfig, image_type: ImageType) -> Vec<Pipeline> {
    let mut kernel_opts: Vec<String> = BASE_KERNEL_OPTS.iter().map(|s| s.to_string()).collect();
    if let Some(customizations) = config.customizations() {
        kernel_opts.extend(customizations.kernel_args());
    }

    let build = Pipeline::new(pipelines::BUILD)
        .stage(stages::container_deploy())
        .stage(stages::selinux());

    let deployment = Pipeline::new(pipelines::OSTREE_DEPLOYMENT)
        .built_by(pipelines::BUILD)
        .stage(stages::ostree_init_fs())
        .stage(stages::ostree_os_init())
        .stage(stages::ostree_config())
        .stage(stages::mkdir(&["/boot/efi"]))
        .stage(stages::ostree_deploy(&target_imgref(&config.imgref), &kernel_opts))
        .stage(stages::ostree_fillvar())
        .stage(stages::ostree_selinux());

    let raw_filename = ImageType::Raw.export_filename();
    let image = Pipeline::new(pipelines::IMAGE)
        .built_by(pipelines::BUILD)
        .stage(stages::truncate(raw_filename, DEFAULT_SIZE))
        .stage(stages::sfdisk())
        .stage(stages::mkfs(stages::MKFS_FAT, "EFI-SYSTEM"))
        .stage(stages::mkfs(stages::MKFS_EXT4, "boot"))
        .stage(stages::mkfs(stages::MKFS_XFS, "root"))
        .stage(stages::copy_tree(pipelines::OSTREE_DEPLOYMENT, "mount://root/"))
        .stage(stages::bootupd());

    let mut out = vec![build, deployment, image];
    if image_type == ImageType::Qcow2 {
        out.push(
            Pipeline::new(pipelines::QCOW2)
                .built_by(pipelines::BUILD)
                .stage(stages::qemu(
                    image_type.export_filename(),
                    pipelines::IMAGE,
                    raw_filename,
                )),
        );
    }
    out
}
