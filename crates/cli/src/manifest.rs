use anyhow::{Context, Result};
use cmdtree_metadata::{CommandSpec, CommandSpecs, HelpMetadata, OptionGroupSpec, OptionSpec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MANIFEST_NAME: &str = "cmdtree.json";

/// An application's command table, as stored in `cmdtree.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,

    /// Program name used in usage lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Option groups that apply to every command.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionGroupSpec>,

    #[serde(default)]
    pub commands: CommandSpecs,
}

impl Manifest {
    pub fn program_name(&self) -> &str {
        self.name.as_deref().unwrap_or("cmdtree")
    }
}

#[derive(Debug, Clone)]
pub struct LoadedManifest {
    pub path: PathBuf,
    pub base_dir: PathBuf,
    pub manifest: Manifest,
}

impl LoadedManifest {
    /// Where a relative `module` locator points, taken from the manifest's directory.
    ///
    /// Absolute locators are returned unchanged.
    pub fn locate(&self, locator: &str) -> PathBuf {
        let locator = locator.strip_prefix("./").unwrap_or(locator);
        resolve_against(&self.base_dir, Path::new(locator))
    }
}

/// An explicitly requested manifest does not exist.
#[derive(Debug, thiserror::Error)]
#[error("manifest not found: {}", .0.display())]
pub struct ManifestNotFound(pub PathBuf);

/// Load `manifest_path`, or `cmdtree.json` in the current directory.
///
/// A missing default manifest is `Ok(None)`; a missing explicit one is [`ManifestNotFound`].
pub fn load_manifest(manifest_path: Option<&Path>) -> Result<Option<LoadedManifest>> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;

    let (path, explicit) = match manifest_path {
        Some(p) => (resolve_against(&cwd, p), true),
        None => (cwd.join(DEFAULT_MANIFEST_NAME), false),
    };

    if !path.exists() {
        if explicit {
            return Err(ManifestNotFound(path).into());
        }
        return Ok(None);
    }

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read manifest: {}", path.display()))?;
    let manifest: Manifest = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse manifest JSON: {}", path.display()))?;
    tracing::debug!(path = %path.display(), commands = manifest.commands.len(), "loaded manifest");

    let base_dir = path.parent().map(|p| p.to_path_buf()).unwrap_or(cwd);

    Ok(Some(LoadedManifest {
        path,
        base_dir,
        manifest,
    }))
}

pub fn write_default_manifest(project_dir: &Path, overwrite: bool) -> Result<PathBuf> {
    let dest = project_dir.join(DEFAULT_MANIFEST_NAME);
    if dest.exists() && !overwrite {
        return Ok(dest);
    }

    let project_name = guess_project_name(project_dir).unwrap_or_else(|| "my-cli".to_string());
    let manifest = sample_manifest(&project_name);

    let bytes = serde_json::to_vec_pretty(&manifest).context("failed to serialize manifest")?;
    let mut out = String::from_utf8(bytes).context("manifest is not valid UTF-8")?;
    out.push('\n');

    let tmp = dest.with_extension("tmp");
    fs::write(&tmp, out.as_bytes())
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    if overwrite && dest.exists() {
        fs::remove_file(&dest).with_context(|| format!("failed to remove {}", dest.display()))?;
    }
    fs::rename(&tmp, &dest)
        .with_context(|| format!("failed to move {} into place", dest.display()))?;
    Ok(dest)
}

fn sample_manifest(project_name: &str) -> Manifest {
    let flag = |aliases: &[&str], description: &str| OptionSpec {
        aliases: aliases.iter().map(|a| a.to_string()).collect(),
        description: description.to_string(),
        ..OptionSpec::default()
    };

    let common = OptionGroupSpec {
        title: "Common options".to_string(),
        common: true,
        options: vec![
            OptionSpec {
                early: true,
                ..flag(&["-h", "--help"], "Show help")
            },
            flag(&["--version"], "Show version"),
            OptionSpec {
                has_value: true,
                value_name: Some("level".to_string()),
                allowed_values: Some(
                    ["silent", "warn", "info", "verbose", "debug"]
                        .map(String::from)
                        .to_vec(),
                ),
                default_value: Some("info".to_string()),
                ..flag(&["--loglevel"], "Set log level")
            },
        ],
    };

    let copy_options = OptionGroupSpec {
        title: "Copy options".to_string(),
        common: false,
        options: vec![
            OptionSpec {
                has_value: true,
                value_name: Some("file".to_string()),
                mandatory: true,
                ..flag(&["-o", "--output"], "Destination file")
            },
            flag(&["-f", "--force"], "Overwrite an existing destination"),
        ],
    };

    let mut commands = CommandSpecs::new();
    commands.insert(
        "config".to_string(),
        CommandSpec::module("./commands/config.js")
            .aliases(["conf"])
            .summary("Show or edit configuration"),
    );
    commands.insert(
        "copy".to_string(),
        CommandSpec::group()
            .alias("cp")
            .help(HelpMetadata {
                summary: "Copy files".to_string(),
                examples: vec![format!("{project_name} copy binary a.bin -o b.bin")],
                ..HelpMetadata::default()
            })
            .sub_command(
                "binary",
                CommandSpec::module("./commands/copy.js")
                    .class_name("BinaryCopy")
                    .summary("Copy bytes unchanged")
                    .option_group(copy_options.clone()),
            )
            .sub_command(
                "ascii",
                CommandSpec::module("./commands/copy.js")
                    .class_name("AsciiCopy")
                    .summary("Copy text, converting line endings")
                    .option_group(copy_options),
            ),
    );

    Manifest {
        schema_version: Some(1),
        name: Some(project_name.to_string()),
        version: Some("0.1.0".to_string()),
        description: format!("{project_name} command line"),
        options: vec![common],
        commands,
    }
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn guess_project_name(project_dir: &Path) -> Option<String> {
    // `.` and `..` carry no name; fall back to the current directory.
    let file_name = project_dir.file_name().and_then(|s| s.to_str());
    let direct = file_name.filter(|s| !s.is_empty() && *s != "." && *s != "..");
    if let Some(name) = direct {
        return Some(name.to_string());
    }

    let cwd = std::env::current_dir().ok()?;
    cwd.file_name()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Application;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn make_temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let pid = std::process::id();
        let dir = std::env::temp_dir().join(format!("cmdtree-{prefix}-{pid}-{nanos}"));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn manifest_deserializes_camel_case() {
        let json = r#"{
  "schemaVersion": 1,
  "name": "demo",
  "version": "0.1.0",
  "options": [
    { "title": "Common options",
      "options": [ { "aliases": ["--loglevel"], "hasValue": true, "defaultValue": "info" } ] }
  ],
  "commands": {
    "install": { "aliases": ["i"], "module": "./install.js", "className": "Install" }
  }
}"#;
        let m: Manifest = serde_json::from_str(json).unwrap();
        assert_eq!(m.schema_version, Some(1));
        assert_eq!(m.program_name(), "demo");
        assert_eq!(m.options[0].options[0].default_value.as_deref(), Some("info"));
        let install = &m.commands["install"];
        assert_eq!(install.aliases, ["i"]);
        assert_eq!(install.implementation.as_deref(), Some("./install.js"));
        assert_eq!(install.class_name.as_deref(), Some("Install"));
    }

    #[test]
    fn empty_manifest_uses_defaults() {
        let m: Manifest = serde_json::from_str("{}").unwrap();
        assert!(m.commands.is_empty());
        assert_eq!(m.program_name(), "cmdtree");
    }

    #[test]
    fn write_default_manifest_writes_loadable_application() {
        let dir = make_temp_dir("manifest-defaults");
        let dest = write_default_manifest(&dir, false).unwrap();
        assert!(!dest.with_extension("tmp").exists());

        let loaded = load_manifest(Some(dest.as_path())).unwrap().unwrap();
        let project_name = dir.file_name().unwrap().to_string_lossy();
        assert_eq!(loaded.manifest.schema_version, Some(1));
        assert_eq!(loaded.manifest.program_name(), project_name);
        assert_eq!(loaded.base_dir, dir);

        let app = Application::from_manifest(&loaded.manifest).unwrap();
        let module = app.tree().find_command_module(&["cp", "b"]).unwrap();
        assert_eq!(module.class_name.as_deref(), Some("BinaryCopy"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn locators_resolve_against_manifest_dir() {
        let loaded = LoadedManifest {
            path: PathBuf::from("/srv/app/cmdtree.json"),
            base_dir: PathBuf::from("/srv/app"),
            manifest: Manifest::default(),
        };
        assert_eq!(
            loaded.locate("./commands/copy.js"),
            Path::new("/srv/app/commands/copy.js")
        );
        assert_eq!(loaded.locate("lib/run.js"), Path::new("/srv/app/lib/run.js"));
        assert_eq!(loaded.locate("/opt/x.js"), Path::new("/opt/x.js"));
    }

    #[test]
    fn existing_manifest_is_kept_unless_overwritten() {
        let dir = make_temp_dir("manifest-keep");
        let dest = dir.join(DEFAULT_MANIFEST_NAME);
        fs::write(&dest, "{}").unwrap();

        write_default_manifest(&dir, false).unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "{}");

        write_default_manifest(&dir, true).unwrap();
        assert!(fs::read_to_string(&dest).unwrap().contains("\"commands\""));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn explicit_missing_manifest_is_an_error() {
        let dir = make_temp_dir("manifest-missing");
        let err = load_manifest(Some(dir.join("nope.json").as_path())).unwrap_err();
        assert!(err.downcast_ref::<ManifestNotFound>().is_some());
        let _ = fs::remove_dir_all(&dir);
    }
}
