//! Shared loading for `plan` and `apply`: stack file, parameter
//! resolution, credentials, and the resource graph.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::Context;
use tracing::{debug, info};

use unifi_config::{PARAMETERS, ProvisionSection, ResolvedConfig, StackFile, resolve};
use unifi_graph::{Graph, InitScript};
use unifi_provision::ExecutorSettings;
use unifi_secrets::SecretBundle;

use crate::StackArgs;

#[derive(Debug)]
pub struct LoadedStack {
    pub config: ResolvedConfig,
    pub secrets: SecretBundle,
    pub graph: Graph,
    pub settings: ExecutorSettings,
}

/// Load everything a command needs. The process environment is read here
/// and nowhere else.
pub fn load(args: &StackArgs) -> anyhow::Result<LoadedStack> {
    let environment: HashMap<String, String> = std::env::vars().collect();
    load_with_env(args, &environment)
}

pub fn load_with_env(args: &StackArgs, environment: &HashMap<String, String>) -> anyhow::Result<LoadedStack> {
    let stack = match &args.stack {
        Some(path) => StackFile::from_file(path)
            .with_context(|| format!("failed to read stack file {}", path.display()))?,
        None => StackFile::default(),
    };

    let explicit: BTreeMap<String, String> = stack.explicit_parameters(&args.overrides)?;
    let config = resolve(PARAMETERS, &explicit, environment)?;
    debug!(parameters = config.len(), "configuration resolved");

    let secrets = unifi_secrets::materialize(&config)?;
    let script = read_script(&args.init_script)?;
    let graph = unifi_graph::build(&config, &secrets, &script)?;

    let settings = settings(stack.provision.as_ref())?;
    info!(
        nodes = graph.len(),
        poll_interval = ?settings.poll_interval,
        job_timeout = ?settings.job_timeout,
        "stack loaded"
    );

    Ok(LoadedStack {
        config,
        secrets,
        graph,
        settings,
    })
}

fn read_script(path: &Path) -> anyhow::Result<InitScript> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read init script {} (see --init-script)", path.display()))?;

    let mut script = InitScript::new(contents);
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        script.file_name = name.to_string();
    }
    Ok(script)
}

/// Executor settings from the `[provision]` table. A zero `job_timeout`
/// leaves the init job bounded only by its restart policy.
pub fn settings(section: Option<&ProvisionSection>) -> anyhow::Result<ExecutorSettings> {
    let mut settings = ExecutorSettings::default();
    let Some(section) = section else {
        return Ok(settings);
    };

    if let Some(poll) = section.poll_interval()? {
        settings.poll_interval = poll;
    }
    if let Some(timeout) = section.job_timeout()? {
        settings.job_timeout = (!timeout.is_zero()).then_some(timeout);
    }
    if let Some(timeout) = section.resource_timeout()? {
        settings.resource_timeout = timeout;
    }
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::time::Duration;

    use unifi_config::keys;

    fn section(job_timeout: &str) -> ProvisionSection {
        ProvisionSection {
            poll_interval: Some("250ms".to_string()),
            job_timeout: Some(job_timeout.to_string()),
            resource_timeout: None,
        }
    }

    #[test]
    fn settings_defaults_without_section() {
        assert_eq!(settings(None).unwrap(), ExecutorSettings::default());
    }

    #[test]
    fn settings_from_section() {
        let s = settings(Some(&section("10m"))).unwrap();
        assert_eq!(s.poll_interval, Duration::from_millis(250));
        assert_eq!(s.job_timeout, Some(Duration::from_secs(600)));
        assert_eq!(s.resource_timeout, ExecutorSettings::default().resource_timeout);
    }

    #[test]
    fn zero_job_timeout_defers_to_restart_policy() {
        let s = settings(Some(&section("0"))).unwrap();
        assert_eq!(s.job_timeout, None);
    }

    #[test]
    fn bad_duration_is_an_error() {
        assert!(settings(Some(&section("soon"))).is_err());
    }

    #[test]
    fn load_layers_file_flags_and_environment() {
        let dir = tempfile::tempdir().unwrap();

        let stack_path = dir.path().join("unifi.toml");
        let mut f = std::fs::File::create(&stack_path).unwrap();
        writeln!(f, "[config]\nnamespace = \"from-file\"\ndataSize = \"20Gi\"").unwrap();

        let script_path = dir.path().join("init.sh");
        std::fs::write(&script_path, "#!/bin/bash\nexit 0\n").unwrap();

        let args = StackArgs {
            stack: Some(stack_path),
            overrides: vec!["namespace=from-flag".to_string()],
            init_script: script_path,
        };
        let env = HashMap::from([
            ("UNIFI_NAMESPACE".to_string(), "from-env".to_string()),
            ("UNIFI_TIMEZONE".to_string(), "UTC".to_string()),
        ]);

        let loaded = load_with_env(&args, &env).unwrap();
        assert_eq!(loaded.config.get(keys::NAMESPACE), Some("from-flag"));
        assert_eq!(loaded.config.get(keys::DATA_SIZE), Some("20Gi"));
        assert_eq!(loaded.config.get(keys::TIMEZONE), Some("UTC"));
        assert_eq!(loaded.graph.len(), 6);
    }

    #[test]
    fn missing_script_is_reported() {
        let args = StackArgs {
            stack: None,
            overrides: vec![],
            init_script: PathBuf::from("/nonexistent/init.sh"),
        };
        let err = load_with_env(&args, &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("--init-script"));
    }

    #[test]
    fn shipped_script_reads_credentials_from_environment() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../scripts/init-unifi-db.sh");
        let script = read_script(&path).unwrap();
        assert_eq!(script.file_name, InitScript::DEFAULT_FILE_NAME);

        // The JS heredoc is quoted, so the shell expands nothing inside it.
        assert!(script.contents.contains("<<'JS'"));
        let js = script.contents.split("<<'JS'").nth(1).unwrap();
        assert!(!js.contains("${"));
        assert!(js.contains("pwd: env.UNIFI_DB_PASS"));
    }
}
