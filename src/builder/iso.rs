//! Pipeline skeleton for the installer ISO.
//!
//! The installer environment is package based, so the ISO build root and the
//! anaconda tree install packages. The base container is embedded in the
//! ISO tree and installed by kickstart at install time.

use crate::config::ManifestConfig;
use crate::manifest::{pipelines, stages, Pipeline};

const PRODUCT: &str = "bootc";
const LANGUAGE: &str = "C.UTF-8";

pub(crate) fn pipelines(config: &ManifestConfig) -> Vec<Pipeline> {
    let build = Pipeline::new(pipelines::BUILD)
        .stage(stages::rpm(true))
        .stage(stages::selinux());

    let anaconda = Pipeline::new(pipelines::ANACONDA_TREE)
        .built_by(pipelines::BUILD)
        .stage(stages::rpm(false))
        .stage(stages::buildstamp(PRODUCT))
        .stage(stages::locale(LANGUAGE))
        .stage(stages::dracut());

    let bootiso = Pipeline::new(pipelines::BOOTISO_TREE)
        .built_by(pipelines::BUILD)
        .stage(stages::mkdir(&["/images/pxeboot", "/EFI/BOOT"]))
        .stage(stages::copy_boot_files(pipelines::ANACONDA_TREE))
        .stage(stages::skopeo(None))
        .stage(stages::kickstart(&config.imgref, config.users()));

    vec![build, anaconda, bootiso]
}
