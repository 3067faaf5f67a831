//! Blueprint file loading (`config.toml` / `config.json`).

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use super::{BuildConfig, Customizations, KernelCustomization, UserCustomization};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BlueprintFile {
    customizations: Option<CustomizationsFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CustomizationsFile {
    user: Option<Vec<UserFile>>,
    kernel: Option<KernelFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UserFile {
    name: String,
    password: Option<String>,
    key: Option<String>,
    groups: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct KernelFile {
    append: Option<String>,
}

/// Load a build config from a TOML or JSON blueprint file.
pub fn load_build_config(path: &Path) -> Result<BuildConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading build config '{}'", path.display()))?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let parsed: BlueprintFile = match extension.as_deref() {
        Some("toml") => toml::from_str(&contents)
            .with_context(|| format!("parsing build config '{}'", path.display()))?,
        Some("json") => serde_json::from_str(&contents)
            .with_context(|| format!("parsing build config '{}'", path.display()))?,
        _ => bail!(
            "unsupported build config '{}': expected a .toml or .json file",
            path.display()
        ),
    };

    into_build_config(parsed, path)
}

fn into_build_config(parsed: BlueprintFile, path: &Path) -> Result<BuildConfig> {
    let Some(customizations) = parsed.customizations else {
        return Ok(BuildConfig::default());
    };

    let mut users = Vec::new();
    for user in customizations.user.unwrap_or_default() {
        let name = user.name.trim().to_string();
        if name.is_empty() {
            bail!(
                "invalid build config '{}': user entries require a non-empty name",
                path.display()
            );
        }
        if users.iter().any(|u: &UserCustomization| u.name == name) {
            bail!(
                "invalid build config '{}': user '{}' is defined more than once",
                path.display(),
                name
            );
        }
        users.push(UserCustomization {
            name,
            password: user.password,
            key: user.key,
            groups: user.groups.unwrap_or_default(),
        });
    }

    let kernel = customizations.kernel.map(|kernel| KernelCustomization {
        append: kernel.append,
    });

    Ok(BuildConfig {
        customizations: Some(Customizations { user: users, kernel }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_toml_users() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "config.toml",
            r#"
[[customizations.user]]
name = "tester"
password = "super-secret-password-42"
key = "ssh-ed25519 AAAA"
groups = ["wheel"]

[customizations.kernel]
append = "quiet"
"#,
        );

        let config = load_build_config(&path).unwrap();
        let customizations = config.customizations.unwrap();
        assert_eq!(customizations.user.len(), 1);
        assert_eq!(customizations.user[0].name, "tester");
        assert_eq!(customizations.user[0].groups, vec!["wheel"]);
        assert_eq!(customizations.kernel_args(), vec!["quiet"]);
    }

    #[test]
    fn test_load_json_users() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "config.json",
            r#"{"customizations": {"user": [{"name": "tester", "key": "ssh-ed25519 AAAA"}]}}"#,
        );

        let config = load_build_config(&path).unwrap();
        let customizations = config.customizations.unwrap();
        assert!(customizations.has_users());
        assert_eq!(customizations.user[0].password, None);
    }

    #[test]
    fn test_empty_blueprint() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.toml", "");
        assert_eq!(load_build_config(&path).unwrap(), BuildConfig::default());
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.toml", "[customizations]\nhostname = \"x\"\n");
        assert!(load_build_config(&path).is_err());
    }

    #[test]
    fn test_rejects_duplicate_users() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "config.json",
            r#"{"customizations": {"user": [{"name": "a"}, {"name": " a "}]}}"#,
        );
        let err = load_build_config(&path).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_rejects_unknown_extension() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.yaml", "customizations: {}");
        assert!(load_build_config(&path).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_build_config(Path::new("/does/not/exist/config.toml")).unwrap_err();
        assert!(err.to_string().contains("reading build config"));
    }
}
