//! The `ask` subcommand.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use webask_browser_cdp::{
    CdpConnection, CdpSnapshotProvider, CdpTabSource, ChromeLauncher, DevToolsEndpoint, LaunchStatus,
};
use webask_config::{BrowserDriver, Config, ConfigValidator};
use webask_desktop_input::{
    AppleScriptSnapshotProvider, AppleScriptTabSource, ArboardClipboard, EnigoKeyboard,
};
use webask_engine::{AskOrchestrator, DesktopHandle, InputInjector};
use webask_protocols::{SnapshotProvider, TabSource};

use crate::adapters::{
    apply_overrides, ask_options, block_detector, build_prompt, injector_settings, launch_config,
    proxy_credentials, start_url,
};
use crate::cli::AskArgs;
use crate::output::{render_outcome, save_html, snapshot_path, to_json_string};

/// Run one ask cycle and print its result. Returns the process exit code.
pub(crate) async fn run_ask(
    args: AskArgs,
    mut config: Config,
    cancel: CancellationToken,
) -> Result<i32, Box<dyn std::error::Error>> {
    apply_overrides(&mut config, &args);

    let validation = ConfigValidator::validate(&config);
    for warning in &validation.warnings {
        warn!("{}: {}", warning.path, warning.message);
    }
    if !validation.is_valid() {
        for e in &validation.errors {
            error!("{}: {}", e.path, e.message);
        }
        return Err("invalid configuration".into());
    }

    let options = ask_options(&config)?;
    let mode = options.extraction.mode;
    let prompt = build_prompt(&args.prompt, &config);
    let (tabs, snapshots) = browser_adapters(&config, args.cdp_endpoint.as_deref()).await?;

    let desktop = DesktopHandle::new(ArboardClipboard::new()?, EnigoKeyboard::new()?);
    let mut orchestrator = AskOrchestrator::new(tabs, snapshots, desktop, options)
        .with_detector(block_detector(&config.detector)?)
        .with_injector(InputInjector::new(injector_settings(&config.injector)?));

    info!(target_url = %config.ask.url, "Sending: {}", prompt.rendered());
    let outcome = orchestrator.run(&prompt, &cancel).await;

    if let Some(snapshot) = orchestrator.last_snapshot() {
        let path = snapshot_path(
            args.output_html.as_deref(),
            config.output.save_snapshots,
            &config.output.snapshot_dir,
            prompt.text(),
            &snapshot.url,
        );
        if let Some(path) = path {
            match save_html(&path, &snapshot.raw_html) {
                Ok(()) => info!("Saved page HTML to {}", path.display()),
                Err(e) => warn!("Failed to save page HTML to {}: {}", path.display(), e),
            }
        }
    }

    let rendered = render_outcome(&outcome, mode);
    println!("{}", to_json_string(&rendered, config.output.pretty));

    if let Some(reason) = outcome.failure_reason() {
        warn!(
            attempts = outcome.attempts().len(),
            "Ask failed: {:?}", reason
        );
    }
    Ok(outcome.exit_code())
}

/// Tab source and snapshot provider for the configured driver.
async fn browser_adapters(
    config: &Config,
    cdp_endpoint: Option<&str>,
) -> Result<(Arc<dyn TabSource>, Arc<dyn SnapshotProvider>), Box<dyn std::error::Error>> {
    if config.browser.driver == BrowserDriver::Applescript {
        info!("Using AppleScript browser control");
        return Ok((
            Arc::new(AppleScriptTabSource::default()),
            Arc::new(AppleScriptSnapshotProvider::default()),
        ));
    }

    let base = cdp_endpoint
        .map(str::to_string)
        .unwrap_or_else(|| config.browser.endpoint());
    let endpoint = DevToolsEndpoint::new(&base)?;

    let mut launched = false;
    if config.browser.launch {
        let launcher = ChromeLauncher::new(launch_config(config));
        launched = matches!(
            launcher.ensure_running(&endpoint).await?,
            LaunchStatus::Launched { .. }
        );
    }

    let mut connection = CdpConnection::new(endpoint);
    if let Some(credentials) = proxy_credentials(config) {
        connection = connection.with_proxy_credentials(credentials);
    }
    let connection = Arc::new(connection);

    if launched {
        match start_url(config) {
            Some(url) => {
                if let Err(e) = connection.open_tab(&url).await {
                    warn!("Failed to open start page {}: {}", url, e);
                }
            }
            None => warn!("No start page configured; open the target page in the launched browser"),
        }
    }

    Ok((
        Arc::new(CdpTabSource::new(connection.clone())),
        Arc::new(CdpSnapshotProvider::new(connection)),
    ))
}
