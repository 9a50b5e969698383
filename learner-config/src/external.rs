//! Objects constructed by code fetched from outside the workspace.

use crate::common::*;
use uri_fs::{is_zip_uri, unzip, uri_basename};

static GITHUB_REPO_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^.+/.+$").unwrap());

/// The boundary to externally defined code.
///
/// Implementations locate a named entrypoint in a module definition and
/// invoke it with serializable arguments. Whatever is loaded runs with the
/// privileges of the process, so implementations are expected to isolate it.
pub trait ModuleLoader {
    type Output;

    /// Load from a definition that already exists on the local disk.
    fn load_local(
        &self,
        hubconf_dir: &Path,
        entrypoint: &str,
        args: &[Value],
        kwargs: &Map<String, Value>,
    ) -> Result<Self::Output>;

    /// Fetch a definition from a `<owner>/<repo>[:tag]` reference into
    /// `hubconf_dir` and load from it.
    fn load_github(
        &self,
        repo: &str,
        hubconf_dir: &Path,
        entrypoint: &str,
        args: &[Value],
        kwargs: &Map<String, Value>,
        force_reload: bool,
    ) -> Result<Self::Output>;
}

/// Describes an object to be loaded from an external module definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalModuleConfig {
    /// Local URI of a zip file or a directory, or remote URI of a zip file.
    #[serde(default)]
    pub uri: Option<String>,
    /// `<repo-owner>/<repo-name>[:tag]`
    #[serde(default)]
    pub github_repo: Option<String>,
    /// Name of the folder in which to extract/copy the definition files.
    #[serde(default)]
    pub name: Option<String>,
    /// Name of a callable present in the definition.
    pub entrypoint: String,
    #[serde(default)]
    pub entrypoint_args: Vec<Value>,
    #[serde(default)]
    pub entrypoint_kwargs: Map<String, Value>,
    /// Force reload of module definition.
    #[serde(default)]
    pub force_reload: bool,
}

impl ExternalModuleConfig {
    pub fn from_uri(uri: impl Into<String>, entrypoint: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            github_repo: None,
            name: None,
            entrypoint: entrypoint.into(),
            entrypoint_args: vec![],
            entrypoint_kwargs: Map::new(),
            force_reload: false,
        }
    }

    pub fn from_github_repo(repo: impl Into<String>, entrypoint: impl Into<String>) -> Self {
        Self {
            uri: None,
            github_repo: Some(repo.into()),
            ..Self::from_uri("", entrypoint)
        }
    }

    pub fn validate_config(&self) -> ConfigResult {
        ensure_config!(
            self.uri.is_some() != self.github_repo.is_some(),
            "must specify one of github_repo and uri"
        );
        if let Some(uri) = &self.uri {
            ensure_config!(!uri.trim().is_empty(), "uri must not be empty");
        }
        if let Some(repo) = &self.github_repo {
            ensure_config!(
                GITHUB_REPO_REGEX.is_match(repo.trim()),
                "github_repo must be in the form <repo-owner>/<repo-name>[:tag], but get '{}'",
                repo
            );
        }
        if let Some(name) = &self.name {
            ensure_config!(!name.trim().is_empty(), "name must not be empty");
        }
        ensure_config!(
            !self.entrypoint.trim().is_empty(),
            "entrypoint must not be empty"
        );
        Ok(())
    }

    /// The directory under `parent` the definition is placed in.
    pub fn hubconf_dir(&self, parent: &Path) -> PathBuf {
        let name = match (&self.name, &self.github_repo, &self.uri) {
            (Some(name), _, _) => name.trim().to_string(),
            (None, Some(repo), _) => {
                let repo = repo.trim();
                let repo = repo.split_once(':').map_or(repo, |(repo, _tag)| repo);
                uri_basename(repo).to_string()
            }
            (None, None, Some(uri)) => {
                let basename = uri_basename(uri.trim());
                Path::new(basename)
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| basename.to_string())
            }
            (None, None, None) => String::new(),
        };
        parent.join(name)
    }

    /// Load the external module.
    ///
    /// With `hubconf_dir` set, the definition found there is used as is.
    /// Otherwise it is fetched under `save_dir` from the configured source.
    pub fn build<L>(
        &self,
        save_dir: &Path,
        hubconf_dir: Option<&Path>,
        loader: &L,
        file_system: &dyn FileSystem,
    ) -> Result<L::Output>
    where
        L: ModuleLoader,
    {
        let args = &self.entrypoint_args;
        let kwargs = &self.entrypoint_kwargs;

        if let Some(hubconf_dir) = hubconf_dir {
            info!(
                "using existing module definition at {}",
                hubconf_dir.display()
            );
            return loader.load_local(hubconf_dir, &self.entrypoint, args, kwargs);
        }

        let hubconf_dir = self.hubconf_dir(save_dir);
        match (&self.github_repo, &self.uri) {
            (Some(repo), _) => {
                info!("fetching module definition from {}", repo);
                loader.load_github(
                    repo.trim(),
                    &hubconf_dir,
                    &self.entrypoint,
                    args,
                    kwargs,
                    self.force_reload,
                )
            }
            (None, Some(uri)) => {
                info!("fetching module definition from {}", uri);
                fetch_definition(uri.trim(), &hubconf_dir, self.force_reload, file_system)?;
                loader.load_local(&hubconf_dir, &self.entrypoint, args, kwargs)
            }
            (None, None) => bail!("must specify one of github_repo and uri"),
        }
    }
}

/// Materialize a definition at `hubconf_dir` from a zip or directory URI.
fn fetch_definition(
    uri: &str,
    hubconf_dir: &Path,
    force_reload: bool,
    file_system: &dyn FileSystem,
) -> Result<()> {
    if hubconf_dir.exists() {
        if !force_reload {
            return Ok(());
        }
        fs::remove_dir_all(hubconf_dir)?;
    }

    if is_zip_uri(uri) {
        let parent = hubconf_dir
            .parent()
            .ok_or_else(|| format_err!("'{}' has no parent", hubconf_dir.display()))?;
        let download_dir = parent.join("downloads");
        let zip_path = file_system.download_if_needed(uri, &download_dir)?;
        let extract_dir = parent.join(format!(
            "{}-extract",
            uri_basename(&hubconf_dir.to_string_lossy())
        ));
        if extract_dir.exists() {
            fs::remove_dir_all(&extract_dir)?;
        }
        unzip(&zip_path, &extract_dir)?;

        // A zip of a single directory is unwrapped.
        let entries: Vec<_> = fs::read_dir(&extract_dir)?.collect::<Result<_, _>>()?;
        let root = match entries.as_slice() {
            [entry] if entry.path().is_dir() => entry.path(),
            _ => extract_dir.clone(),
        };
        fs::rename(&root, hubconf_dir).with_context(|| {
            format!(
                "unable to move '{}' to '{}'",
                root.display(),
                hubconf_dir.display()
            )
        })?;
        if extract_dir.exists() {
            fs::remove_dir_all(&extract_dir)?;
        }
    } else {
        ensure!(
            file_system.file_exists(uri, true)?,
            UriError::NotFound(uri.to_string())
        );
        file_system.sync_from_dir(uri, hubconf_dir)?;
    }
    Ok(())
}
